//! Gateway - TCP listener that accepts incoming connections.
//!
//! The gateway binds the hub socket and spawns one [`Connection`] task
//! per client. Admission (the IP ban check) happens in
//! [`Hub::add_user`] before the client sees a single byte.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::network::Connection;
use crate::state::Hub;

/// The accepting half of the hub.
pub struct Gateway {
    listener: TcpListener,
    hub: Arc<Hub>,
}

impl Gateway {
    /// Bind the gateway to the configured address.
    pub async fn bind(addr: SocketAddr, hub: Arc<Hub>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Gateway listening");
        Ok(Self { listener, hub })
    }

    /// The actual bound address (relevant when the port was 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown.
    pub async fn run(self) -> std::io::Result<()> {
        let mut shutdown = self.hub.shutdown.subscribe();
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => self.accept(stream, addr).await,
                        Err(e) => error!(error = %e, "Failed to accept connection"),
                    }
                }
                _ = shutdown.recv() => {
                    info!("Gateway stopped accepting");
                    return Ok(());
                }
            }
        }
    }

    async fn accept(&self, stream: tokio::net::TcpStream, addr: SocketAddr) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = oneshot::channel();
        match self
            .hub
            .add_user(addr.ip().to_string(), addr.port(), tx, kill_tx)
            .await
        {
            Ok(sid) => {
                let hub = Arc::clone(&self.hub);
                tokio::spawn(async move {
                    Connection::new(sid, stream, rx, kill_rx, hub).run().await;
                });
            }
            Err(e) => {
                // Banned or shutting down; the socket just goes away.
                debug!(addr = %addr, code = e.error_code(), "Connection refused");
            }
        }
    }
}
