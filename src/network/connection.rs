//! Connection - one task per client.
//!
//! A single `select!` loop owns the socket: inbound frames go through the
//! dispatcher (which serializes on the hub lock), outbound frames drain
//! from the session's channel, and the kill signal lets the hub hang up a
//! session it is punishing. Per-session command order is arrival order
//! because this is the only reader.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use nmdc_proto::NmdcCodec;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::dispatch;
use crate::state::{Hub, SessionId};

/// A client connection handler.
pub struct Connection {
    sid: SessionId,
    stream: TcpStream,
    outgoing: mpsc::UnboundedReceiver<String>,
    kill: oneshot::Receiver<()>,
    hub: Arc<Hub>,
}

impl Connection {
    pub fn new(
        sid: SessionId,
        stream: TcpStream,
        outgoing: mpsc::UnboundedReceiver<String>,
        kill: oneshot::Receiver<()>,
        hub: Arc<Hub>,
    ) -> Self {
        Self {
            sid,
            stream,
            outgoing,
            kill,
            hub,
        }
    }

    /// Run until the peer hangs up, the codec rejects the stream, or the
    /// hub kills the session.
    pub async fn run(mut self) {
        info!(session = self.sid, "Client connected");
        let mut framed = Framed::new(self.stream, NmdcCodec::new());
        let mut reason = "connection closed";

        loop {
            tokio::select! {
                frame = framed.next() => {
                    match frame {
                        Some(Ok(frame)) => {
                            dispatch::handle_frame(&self.hub, self.sid, &frame).await;
                        }
                        Some(Err(e)) => {
                            warn!(session = self.sid, error = %e, "Read error");
                            reason = "protocol error";
                            break;
                        }
                        None => break,
                    }
                }
                outbound = self.outgoing.recv() => {
                    match outbound {
                        Some(frame) => {
                            if let Err(e) = framed.send(frame).await {
                                debug!(session = self.sid, error = %e, "Write error");
                                reason = "write error";
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = &mut self.kill => {
                    reason = "closed by hub";
                    break;
                }
            }
        }

        // Flush whatever the hub queued before the teardown raced us.
        while let Ok(frame) = self.outgoing.try_recv() {
            if framed.send(frame).await.is_err() {
                break;
            }
        }

        self.hub.remove_session(self.sid, reason).await;
        info!(session = self.sid, reason = %reason, "Client disconnected");
    }
}
