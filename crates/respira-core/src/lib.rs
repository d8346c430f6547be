//! Core types and error definitions for the Respira bot.
//!
//! This crate provides the foundational types shared across all Respira
//! crates: the unified error enum and the inbound/outbound turn types
//! exchanged between the transport channel and the dialog engine.
//!
//! # Main types
//!
//! - [`RespiraError`] — Unified error enum for all Respira subsystems.
//! - [`RespiraResult`] — Convenience alias for `Result<T, RespiraError>`.
//! - [`TurnMessage`] — One inbound conversation turn from an end user.
//! - [`OutboundMessage`] — A reply to be delivered by the transport.
//! - [`ReplyHint`] — Optional quick-reply rendering hint for a reply.

/// Error types.
pub mod error;
/// Inbound and outbound turn types.
pub mod turn;

pub use error::{RespiraError, RespiraResult};
pub use turn::{OutboundMessage, ReplyHint, TurnContact, TurnMessage, TurnUser};
