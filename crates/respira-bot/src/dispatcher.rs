//! Turn dispatch: entry/cancel commands, per-session sequencing, the
//! handler-fault boundary, and the inactivity sweeper.

use chrono::{Duration, Utc};
use respira_channels::Channel;
use respira_core::{RespiraResult, TurnMessage};
use respira_dialog::{
    advance, is_cancel_command, is_entry_command, prompts, MessageCatalog, RecordFinalizer,
    StepOutcome,
};
use respira_session::{Session, SessionMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Routes inbound turns into the state machine and replies back out.
///
/// Each turn is handled on its own task; the per-session mutex inside
/// [`SessionMap`] keeps turns for one user strictly sequential while a
/// slow append or send for one user never stalls the others.
pub struct Dispatcher {
    channel: Arc<dyn Channel>,
    sessions: Arc<SessionMap>,
    finalizer: Arc<RecordFinalizer>,
    catalog: MessageCatalog,
}

impl Dispatcher {
    /// Creates a dispatcher over the given transport and destinations.
    pub fn new(
        channel: Arc<dyn Channel>,
        sessions: Arc<SessionMap>,
        finalizer: Arc<RecordFinalizer>,
        catalog: MessageCatalog,
    ) -> Self {
        Self {
            channel,
            sessions,
            finalizer,
            catalog,
        }
    }

    /// Consumes inbound turns until the channel closes, spawning one
    /// task per turn.
    pub async fn run(self: Arc<Self>, mut turns: mpsc::Receiver<TurnMessage>) {
        while let Some(turn) = turns.recv().await {
            let dispatcher = self.clone();
            tokio::spawn(async move {
                dispatcher.handle_turn(turn).await;
            });
        }
    }

    /// Processes one inbound turn end to end.
    pub async fn handle_turn(&self, turn: TurnMessage) {
        let text = turn.text().to_string();

        if is_entry_command(&text) {
            self.start_session(&turn).await;
            return;
        }
        if is_cancel_command(&text) {
            self.cancel_session(&turn).await;
            return;
        }

        let Some(handle) = self.sessions.get(turn.user.id).await else {
            // Only entry commands open a conversation.
            debug!(user_id = turn.user.id, "Turn without an active session ignored");
            return;
        };

        let mut session = handle.lock().await;
        match self.process_turn(&mut session, &turn).await {
            Ok(StepOutcome::Continue) => {
                session.touch();
            }
            Ok(StepOutcome::Finalize) => {
                let snapshot = session.clone();
                drop(session);
                self.sessions.remove(turn.user.id).await;
                // Append failures are logged inside; the user already
                // got the finalization message and is never re-prompted.
                let _ = self.finalizer.finalize(&snapshot).await;
            }
            Err(e) => {
                error!(
                    user_id = turn.user.id,
                    user = %turn.user.first_name,
                    state = ?session.state,
                    error = %e,
                    "Dialog handler fault"
                );
                drop(session);
                self.sessions.remove(turn.user.id).await;
                if let Err(e) = self
                    .channel
                    .send(prompts::handler_fault(turn.chat_id))
                    .await
                {
                    warn!(user_id = turn.user.id, error = %e, "Fault apology undeliverable");
                }
            }
        }
    }

    /// Removes and notifies every session idle past `max_idle`, without
    /// finalizing any of them.
    pub async fn sweep_expired(&self, max_idle: Duration) {
        for session in self.sessions.collect_expired(Utc::now(), max_idle).await {
            info!(user = %session.first_name, "Conversation timed out");
            if let Err(e) = self.channel.send(prompts::timed_out(&session)).await {
                warn!(user_id = session.user_id, error = %e, "Timeout goodbye undeliverable");
            }
        }
    }

    /// Runs [`Self::sweep_expired`] on a fixed interval, forever.
    pub async fn run_sweeper(self: Arc<Self>, every: std::time::Duration, max_idle: Duration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            self.sweep_expired(max_idle).await;
        }
    }

    async fn start_session(&self, turn: &TurnMessage) {
        let session = Session::new(turn.chat_id, &turn.user);
        info!(user = %turn.user.first_name, "Conversation started");
        let greeting = prompts::greeting(&session);
        self.sessions.begin(session).await;
        if let Err(e) = self.channel.send(greeting).await {
            warn!(user_id = turn.user.id, error = %e, "Greeting undeliverable");
            self.sessions.remove(turn.user.id).await;
        }
    }

    async fn cancel_session(&self, turn: &TurnMessage) {
        if let Some(handle) = self.sessions.get(turn.user.id).await {
            // Wait out any in-flight turn before discarding.
            let session = handle.lock().await;
            info!(user = %session.first_name, "Conversation cancelled");
            drop(session);
            self.sessions.remove(turn.user.id).await;
        }
        if let Err(e) = self.channel.send(prompts::cancelled(turn.chat_id)).await {
            warn!(user_id = turn.user.id, error = %e, "Cancel reply undeliverable");
        }
    }

    async fn process_turn(
        &self,
        session: &mut Session,
        turn: &TurnMessage,
    ) -> RespiraResult<StepOutcome> {
        let step = {
            let mut rng = rand::thread_rng();
            advance(session, turn, &self.catalog, &mut rng)
        };
        for reply in step.replies {
            self.channel.send(reply).await?;
        }
        Ok(step.outcome)
    }
}
