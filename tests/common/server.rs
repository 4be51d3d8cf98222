//! Test hub management.

#![allow(dead_code)]

use nmdcd::config::{Config, DbType};
use nmdcd::server::{start, Server};
use nmdcd::state::Account;
use nmdcd::state::unix_now;
use std::net::SocketAddr;

/// An in-process hub listening on an ephemeral port.
pub struct TestHub {
    server: Server,
    pub addr: SocketAddr,
}

/// Baseline test configuration: ephemeral port, in-memory storage, no
/// description policy, no MOTD noise.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.hub.listen = "127.0.0.1:0".parse().unwrap();
    config.hub.hubname = "Test Hub".to_string();
    config.hub.motd = Vec::new();
    config.hub.restrictunverifiedusers = false;
    config.hub.cleanuptime = 1;
    config.database.dbfile = ":memory:".to_string();
    config.database.dbtype = DbType::Fallback;
    config
}

impl TestHub {
    /// Spawn with the baseline configuration.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with the baseline configuration after applying `tweak`.
    pub async fn spawn_with(tweak: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let mut config = test_config();
        tweak(&mut config);
        let server = start(config).await?;
        let addr = server.addr;
        Ok(Self { server, addr })
    }

    /// The shared hub handle, for seeding and direct assertions.
    pub fn hub(&self) -> &std::sync::Arc<nmdcd::state::Hub> {
        &self.server.hub
    }

    /// Create an account in storage and memory, as if it had been made on
    /// an earlier run.
    pub async fn add_account(
        &self,
        nick: &str,
        password: &str,
        op: bool,
        verified: bool,
    ) -> anyhow::Result<()> {
        let hub = self.hub();
        let mut conn = hub.db.acquire().await?;
        let now = unix_now();
        let oid = nmdcd::db::accounts::create(&mut conn, nick, now).await?;
        if !password.is_empty() {
            nmdcd::db::accounts::set_password(&mut conn, nick, password).await?;
        }
        if op {
            nmdcd::db::accounts::set_op(&mut conn, nick, true).await?;
        }
        if verified {
            nmdcd::db::accounts::set_verified(&mut conn, nick, true).await?;
        }

        let mut state = hub.state.lock().await;
        state.oids.insert(oid, nick.to_string());
        state.accounts.insert(
            nick.to_string(),
            Account {
                oid,
                nick: nick.to_string(),
                password: password.to_string(),
                args: String::new(),
                op,
                verified,
                creationtime: now,
            },
        );
        Ok(())
    }

    /// Grant a capability tag to an existing account.
    pub async fn grant_args(&self, nick: &str, args: &str) {
        let mut state = self.hub().state.lock().await;
        if let Some(account) = state.accounts.get_mut(nick) {
            account.args = args.to_string();
        }
    }

    pub async fn shutdown(self) {
        self.server.shutdown().await;
    }
}
