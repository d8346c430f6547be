use async_trait::async_trait;
use respira_core::{OutboundMessage, RespiraResult};

/// A transport that can deliver replies to end users.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Transport name used in logs.
    fn name(&self) -> &str;

    /// Delivers one reply, rendering its [`respira_core::ReplyHint`]
    /// however the transport supports.
    async fn send(&self, message: OutboundMessage) -> RespiraResult<()>;
}
