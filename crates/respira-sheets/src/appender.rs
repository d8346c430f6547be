use async_trait::async_trait;
use respira_core::RespiraResult;

/// A destination that accepts ordered rows of cell values.
///
/// Implementations must tolerate concurrent independent append calls
/// from different sessions; no cross-session ordering is guaranteed.
#[async_trait]
pub trait RowAppender: Send + Sync {
    /// Destination name used in logs (e.g. `"primary"`, `"backup"`).
    fn name(&self) -> &str;

    /// Appends one row to the named sheet within this destination.
    async fn append(&self, sheet: &str, row: &[String]) -> RespiraResult<()>;
}
