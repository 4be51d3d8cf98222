//! Integration test common infrastructure.
//!
//! Spawns in-process hubs on ephemeral ports and drives them with a
//! frame-level NMDC client.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestHub;
