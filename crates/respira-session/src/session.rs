use chrono::{DateTime, Duration, Utc};
use respira_core::TurnUser;
use serde::{Deserialize, Serialize};

/// The dialog states a session can be in.
///
/// Every tag maps to exactly one question put to the user; the transition
/// logic over these tags lives in `respira-dialog`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogState {
    /// Asking which province the user is in.
    Province,
    /// Asking whether to confirm a delivery or schedule a pickup.
    ChooseBranch,
    /// Confirm branch: did the delivery happen?
    ConfirmDelivery,
    /// Confirm branch: delivery did not happen — wait or report?
    NotDelivered,
    /// Confirm branch: units delivered of the health-service model.
    QuantityDeliveredA,
    /// Confirm branch: units delivered of the previous model.
    QuantityDeliveredB,
    /// Confirm branch: does the user need more PLA filament?
    PlaReceived,
    /// Confirm branch: which filament diameter is needed.
    PlaDiameter,
    /// Confirm branch: were empty coils returned for reuse?
    CoilsReturned,
    /// Confirm branch: how many coils were returned.
    CoilsReturnedQty,
    /// Schedule branch: units ready of the health-service model.
    QuantityPreparedA,
    /// Schedule branch: units ready of the previous model.
    QuantityPreparedB,
    /// Schedule branch: pickup municipality.
    Municipality,
    /// Schedule branch: pickup street address.
    Address,
    /// Schedule branch: pickup time window.
    Schedule,
    /// Schedule branch: contact phone number.
    Phone,
}

/// The two mutually exclusive dialog paths, chosen once at
/// [`DialogState::ChooseBranch`] and fixed for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Branch {
    /// Confirming a delivery that was already attempted.
    Confirm,
    /// Scheduling a future pickup.
    Schedule,
}

/// The fields a dialog accumulates, one owning state each.
///
/// A field is `Some` only after its owning state validated the user's
/// input; no field is ever cleared except by discarding the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectedFields {
    /// Province, free text.
    pub province: Option<String>,
    /// Canonical yes/no: was the delivery confirmed.
    pub delivered: Option<String>,
    /// Units delivered of the health-service model.
    pub qty_delivered_a: Option<i64>,
    /// Units delivered of the previous model.
    pub qty_delivered_b: Option<i64>,
    /// Canonical yes/no: does the user need more PLA.
    pub pla_received: Option<String>,
    /// Canonical filament diameter ("1.75" or "3").
    pub pla_diameter: Option<String>,
    /// Spool count received; recorded out of band by the pickup crew,
    /// never collected in the dialog itself.
    pub pla_qty_received: Option<i64>,
    /// Canonical yes/no: were empty coils returned.
    pub coils_returned: Option<String>,
    /// Number of coils returned for reuse.
    pub coils_returned_qty: Option<i64>,
    /// Units ready for pickup of the health-service model.
    pub qty_prepared_a: Option<i64>,
    /// Units ready for pickup of the previous model.
    pub qty_prepared_b: Option<i64>,
    /// Pickup municipality, free text.
    pub municipality: Option<String>,
    /// Pickup street address, free text.
    pub address: Option<String>,
    /// Canonical pickup time window.
    pub time_window: Option<String>,
    /// Contact phone number.
    pub phone: Option<String>,
}

/// One user's in-progress conversation and its accumulated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Telegram user id; also the session key.
    pub user_id: i64,
    /// Chat to deliver replies to.
    pub chat_id: i64,
    /// First name, captured at session start.
    pub first_name: String,
    /// Last name, captured at session start.
    pub last_name: Option<String>,
    /// Public handle, captured at session start.
    pub handle: Option<String>,
    /// Current dialog state.
    pub state: DialogState,
    /// Branch tag; `None` until [`DialogState::ChooseBranch`] resolves it.
    pub branch: Option<Branch>,
    /// When the session was created.
    pub started_at: DateTime<Utc>,
    /// When the last turn was processed.
    pub last_turn_at: DateTime<Utc>,
    /// Fields collected so far.
    pub fields: CollectedFields,
}

impl Session {
    /// Creates a fresh session for the given user, starting at
    /// [`DialogState::Province`].
    pub fn new(chat_id: i64, user: &TurnUser) -> Self {
        let now = Utc::now();
        Self {
            user_id: user.id,
            chat_id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            handle: user.handle.clone(),
            state: DialogState::Province,
            branch: None,
            started_at: now,
            last_turn_at: now,
            fields: CollectedFields::default(),
        }
    }

    /// Records forward progress, resetting the inactivity clock.
    pub fn touch(&mut self) {
        self.last_turn_at = Utc::now();
    }

    /// How long the session has been idle as of `now`.
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_turn_at
    }
}
