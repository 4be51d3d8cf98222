//! # nmdc-proto
//!
//! A Rust library for the NMDC (Neo-Modus Direct Connect) hub protocol:
//! `|`-delimited frames, `$`-prefixed verbs with positional arguments,
//! the escape tables for hub-originated payloads, and the lock/key
//! handshake derivation.
//!
//! NMDC predates Unicode-aware clients; the wire is Latin-1. The codec in
//! this crate maps bytes to `char`s one-to-one in both directions, so no
//! byte sequence is lost in transit.
//!
//! ## Quick start
//!
//! ```rust
//! use nmdc_proto::{key_for, Message};
//!
//! let frame = "$ValidateNick alice";
//! let msg: Message = frame.parse().expect("valid NMDC frame");
//! assert_eq!(msg, Message::ValidateNick("alice".into()));
//! assert_eq!(msg.to_string(), frame);
//!
//! // The key a well-behaved client derives from our lock:
//! let expected = key_for("EXTENDEDPROTOCOL_some_lock");
//! assert!(!expected.is_empty());
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod escape;
pub mod lock;
pub mod message;

#[cfg(feature = "tokio")]
pub mod codec;

pub use self::error::ProtoError;
pub use self::escape::{escape, unescape};
pub use self::lock::{generate_lock, key_for, LOCK_PK};
pub use self::message::{Message, MyInfo, SearchQuery, MAX_VERB_LEN};

#[cfg(feature = "tokio")]
pub use self::codec::{NmdcCodec, MAX_FRAME_LEN};
