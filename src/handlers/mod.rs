//! Per-verb check and give implementations.
//!
//! Each module owns one concern: the check functions validate and may
//! rewrite the inbound message; the give functions apply the effect. Both
//! run under the hub lock, called only from the dispatcher.

pub mod chat;
pub mod connect;
pub mod handshake;
pub mod info;
pub mod op;
pub mod private;
pub mod search;
