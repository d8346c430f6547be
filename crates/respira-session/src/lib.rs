//! Session data model and per-user session store for the Respira bot.
//!
//! A [`Session`] is one user's in-progress conversation: identity, the
//! current [`DialogState`], the chosen [`Branch`], and the
//! [`CollectedFields`] accumulated turn by turn. The [`SessionMap`] keeps
//! live sessions keyed by user id, with per-session mutual exclusion so a
//! session never processes two turns concurrently.

/// Session struct, dialog state tags, and the collected field set.
pub mod session;
/// Concurrent per-user session store.
pub mod map;

pub use map::SessionMap;
pub use session::{Branch, CollectedFields, DialogState, Session};
