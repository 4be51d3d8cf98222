//! Per-connection session state and the login stage machine.

use std::collections::HashSet;

use nmdc_proto::{Message, MyInfo};
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::dispatch::Verb;

/// Stable session identifier, assigned at accept time.
pub type SessionId = u64;

/// Where a connection is in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    /// `$Lock` sent, waiting for `$Key`.
    Greeted,
    /// Key accepted, waiting for `$ValidateNick`.
    ValidatingNick,
    /// `$GetPass` sent, waiting for `$MyPass`.
    Authenticating,
    /// `$Hello` sent, waiting for `$Version`/`$GetNickList`/`$MyINFO`.
    Joining,
    /// Fully on the roster.
    Active,
    /// Being torn down; every buffered command is discarded.
    Closed,
}

/// One connected client.
///
/// The session exclusively owns its half of the connection: frames queued
/// on `tx` are written by the connection task, and firing `kill` makes that
/// task hang up. All other fields are mutated only under the hub lock.
pub struct Session {
    pub id: SessionId,
    /// Peer address plus accept counter; stable for the connection's life.
    pub idstring: String,
    pub ip: String,
    tx: mpsc::UnboundedSender<String>,
    kill: Option<oneshot::Sender<()>>,

    pub stage: LoginStage,
    pub nick: String,
    pub op: bool,
    pub verified: bool,
    pub loggedin: bool,
    pub ignore_messages: bool,

    pub description: String,
    pub tag: String,
    pub speed: String,
    pub speed_class: u8,
    pub email: String,
    pub sharesize: u64,
    pub client_version: String,

    /// Nick key into the accounts map; the account itself stays owned by
    /// the hub.
    pub account: Option<String>,
    /// Verbs currently accepted from this session.
    pub validcommands: HashSet<Verb>,

    pub jointime: i64,
    /// History row of the current join, filled in by the worker pool.
    pub joinoid: Option<i64>,
    /// The lock this session was greeted with.
    pub lock: String,
}

impl Session {
    pub fn new(
        id: SessionId,
        ip: String,
        idstring: String,
        lock: String,
        tx: mpsc::UnboundedSender<String>,
        kill: oneshot::Sender<()>,
    ) -> Self {
        Self {
            id,
            idstring,
            ip,
            tx,
            kill: Some(kill),
            stage: LoginStage::Greeted,
            nick: String::new(),
            op: false,
            verified: false,
            loggedin: false,
            ignore_messages: false,
            description: String::new(),
            tag: String::new(),
            speed: String::new(),
            speed_class: 0,
            email: String::new(),
            sharesize: 0,
            client_version: String::new(),
            account: None,
            validcommands: HashSet::from([Verb::Key, Verb::ValidateNick]),
            jointime: 0,
            joinoid: None,
            lock,
        }
    }

    /// Queue one frame for this session. Dropped silently once the
    /// connection task is gone.
    pub fn send(&self, frame: impl Into<String>) {
        let frame = frame.into();
        trace!(target: "nmdcd::sent", to = %self.idstring, frame = %frame, "Data sent");
        let _ = self.tx.send(frame);
    }

    /// Queue a composed message.
    pub fn send_msg(&self, msg: &Message) {
        self.send(msg.to_string());
    }

    /// A handle that can queue frames without going through the session.
    /// Used by the remote-log relay, which runs outside the hub lock.
    pub fn sender(&self) -> mpsc::UnboundedSender<String> {
        self.tx.clone()
    }

    /// Stop accepting commands and make the connection task hang up.
    pub fn close(&mut self) {
        self.ignore_messages = true;
        self.stage = LoginStage::Closed;
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
    }

    /// This session's roster info, as broadcast in `$MyINFO`.
    pub fn myinfo(&self) -> MyInfo {
        MyInfo {
            nick: self.nick.clone(),
            description: self.description.clone(),
            tag: self.tag.clone(),
            speed: self.speed.clone(),
            speed_class: self.speed_class,
            email: self.email.clone(),
            share_size: self.sharesize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (Session, mpsc::UnboundedReceiver<String>, oneshot::Receiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = oneshot::channel();
        let s = Session::new(
            1,
            "1.2.3.4".into(),
            "1.2.3.4:5000#1".into(),
            "EXTENDEDPROTOCOLtest".into(),
            tx,
            kill_tx,
        );
        (s, rx, kill_rx)
    }

    #[test]
    fn starts_in_handshake_whitelist() {
        let (s, _rx, _kill) = session();
        assert_eq!(s.stage, LoginStage::Greeted);
        assert!(s.validcommands.contains(&Verb::Key));
        assert!(s.validcommands.contains(&Verb::ValidateNick));
        assert!(!s.validcommands.contains(&Verb::Chat));
    }

    #[test]
    fn send_queues_frames() {
        let (s, mut rx, _kill) = session();
        s.send("$Hello alice");
        assert_eq!(rx.try_recv().unwrap(), "$Hello alice");
    }

    #[test]
    fn close_fires_kill_once() {
        let (mut s, _rx, mut kill) = session();
        s.close();
        assert!(s.ignore_messages);
        assert_eq!(s.stage, LoginStage::Closed);
        assert!(kill.try_recv().is_ok());
        // A second close is inert.
        s.close();
    }
}
