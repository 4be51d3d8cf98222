//! nmdcd - an NMDC (Neo-Modus Direct Connect) hub.
//!
//! A long-lived TCP endpoint speaking the NMDC protocol: lock/key
//! handshake, nickname admission against a persistent account table,
//! roster and chat fan-out, peer connection brokering, search relay, and
//! an administrative overlay (punishments, history, torrents,
//! verification, remote logging, op chat) driven through in-process bots.
//!
//! Everything hub-visible serializes on one coarse lock; blocking work
//! (SQLite, reverse DNS) runs on a small task-runner pool that holds the
//! same lock per task. See the module docs on [`state::hub`] and
//! [`tasks`] for the model.

pub mod bots;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod network;
pub mod server;
pub mod state;
pub mod tasks;
pub mod telemetry;
