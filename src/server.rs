//! Hub lifecycle: build, load, serve, shut down.
//!
//! The order is construct config → open storage → build hub → load
//! accounts/events/torrents and install bots → start the runner pool and
//! housekeeping → accept. Shutdown reverses it. Tests call
//! [`start`] directly with an in-memory database and port 0.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Config;
use crate::db::Database;
use crate::network::Gateway;
use crate::state::events::PunishKind;
use crate::state::{unix_now, Hub};
use crate::tasks::{self, Task};

/// How often expired punishments and connect approvals are swept.
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

/// A running hub.
pub struct Server {
    pub hub: Arc<Hub>,
    /// The bound address; differs from the configured one when port 0 was
    /// asked for.
    pub addr: SocketAddr,
    gateway: JoinHandle<std::io::Result<()>>,
}

/// Bring a hub up from configuration.
pub async fn start(config: Config) -> anyhow::Result<Server> {
    if let Err(errors) = crate::config::validate(&config) {
        for err in &errors {
            error!(error = %err, "Configuration validation failed");
        }
        anyhow::bail!("configuration validation failed with {} error(s)", errors.len());
    }

    let db = Database::new(&config.database.dbfile, config.database.dbtype).await?;
    let hub = Hub::new(config, db);
    hub.setup().await?;

    tasks::spawn_runners(&hub, hub.config.effective_taskrunners());
    info!(
        runners = hub.config.effective_taskrunners(),
        "Task runner pool started"
    );

    spawn_housekeeping(Arc::clone(&hub));

    let gateway = Gateway::bind(hub.config.hub.listen, Arc::clone(&hub)).await?;
    let addr = gateway.local_addr()?;
    let gateway = tokio::spawn(gateway.run());
    info!(hubname = %hub.config.hub.hubname, addr = %addr, "Hub is up");

    Ok(Server { hub, addr, gateway })
}

impl Server {
    /// Graceful shutdown: notify, drain tasks, stop accepting.
    pub async fn shutdown(self) {
        self.hub.shutdown().await;
        let _ = self.gateway.await;
        info!("Hub stopped");
    }
}

/// Periodic sweep of expired punishments and connect-check approvals.
fn spawn_housekeeping(hub: Arc<Hub>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HOUSEKEEPING_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut shutdown = hub.shutdown.subscribe();
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = unix_now();
                    let mut state = hub.state.lock().await;
                    for kind in PunishKind::ALL {
                        let removed = state.events.scrub(kind, now);
                        if !removed.is_empty() {
                            info!(kind = kind.name(), removed = removed.len(), "Expired punishments scrubbed");
                            hub.tasks.submit(Task::ScrubEvents { kind });
                        }
                    }
                    state.connect_checks.retain(|_, &mut until| until > now);
                }
                _ = shutdown.recv() => break,
            }
        }
    });
}
