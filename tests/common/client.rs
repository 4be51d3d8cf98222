//! Test NMDC client.
//!
//! Speaks raw frames over the hub codec and offers the usual
//! send/expect/handshake helpers.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use nmdc_proto::{key_for, Message, NmdcCodec};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// A frame-level test client.
pub struct TestClient {
    framed: Framed<TcpStream, NmdcCodec>,
    pub nick: String,
}

impl TestClient {
    /// Connect to a test hub.
    pub async fn connect(addr: SocketAddr, nick: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            framed: Framed::new(stream, NmdcCodec::new()),
            nick: nick.to_string(),
        })
    }

    /// Send one frame (without the trailing `|`).
    pub async fn send(&mut self, frame: &str) -> anyhow::Result<()> {
        self.framed.send(frame.to_string()).await?;
        Ok(())
    }

    /// Receive one frame, with a timeout.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        match timeout(RECV_TIMEOUT, self.framed.next()).await {
            Ok(Some(Ok(frame))) => Ok(frame),
            Ok(Some(Err(e))) => Err(e.into()),
            Ok(None) => anyhow::bail!("connection closed"),
            Err(_) => anyhow::bail!("timed out waiting for a frame"),
        }
    }

    /// Receive frames until one satisfies `pred`, returning it. Unrelated
    /// traffic (roster broadcasts from other tests' clients) is skipped.
    pub async fn expect(&mut self, what: &str, pred: impl Fn(&str) -> bool) -> anyhow::Result<String> {
        for _ in 0..64 {
            let frame = self.recv().await.map_err(|e| {
                anyhow::anyhow!("while waiting for {what}: {e}")
            })?;
            if pred(&frame) {
                return Ok(frame);
            }
        }
        anyhow::bail!("gave up waiting for {what}")
    }

    /// Assert that no frame satisfying `pred` arrives within `dur`.
    pub async fn expect_silence(
        &mut self,
        what: &str,
        dur: Duration,
        pred: impl Fn(&str) -> bool,
    ) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + dur;
        loop {
            let left = deadline.saturating_duration_since(tokio::time::Instant::now());
            if left.is_zero() {
                return Ok(());
            }
            match timeout(left, self.framed.next()).await {
                Ok(Some(Ok(frame))) => {
                    if pred(&frame) {
                        anyhow::bail!("unexpectedly saw {what}: {frame:?}");
                    }
                }
                Ok(_) => return Ok(()),
                Err(_) => return Ok(()),
            }
        }
    }

    /// A plausible MyINFO for this client.
    pub fn myinfo(&self) -> String {
        format!(
            "$MyINFO $ALL {} testing<++ V:0.868,M:A,H:1/0/0,S:3>$ $DSL\u{1}${}@example.org$1234$",
            self.nick, self.nick
        )
    }

    /// Answer the lock and claim the nick; stops right after
    /// `$ValidateNick` so callers can steer the password step.
    pub async fn begin_handshake(&mut self) -> anyhow::Result<()> {
        let lock_frame = self.expect("$Lock", |f| f.starts_with("$Lock ")).await?;
        let Message::Lock { lock, .. } = Message::parse(&lock_frame)? else {
            anyhow::bail!("not a lock: {lock_frame:?}");
        };
        self.send(&format!("$Key {}", key_for(&lock))).await?;
        let nick = self.nick.clone();
        self.send(&format!("$ValidateNick {}", nick)).await?;
        Ok(())
    }

    /// Finish the handshake after `$Hello`: version, nick list, MyINFO,
    /// then wait for the hub to echo our MyINFO back, which marks login.
    pub async fn finish_handshake(&mut self) -> anyhow::Result<()> {
        let nick = self.nick.clone();
        self.expect("$Hello", move |f| f == format!("$Hello {nick}"))
            .await?;
        self.send("$Version 1,0091").await?;
        self.send("$GetNickList").await?;
        let myinfo = self.myinfo();
        self.send(&myinfo).await?;
        let prefix = format!("$MyINFO $ALL {} ", self.nick);
        self.expect("own MyINFO broadcast", move |f| f.starts_with(&prefix))
            .await?;
        Ok(())
    }

    /// Full handshake for a nick with no password.
    pub async fn handshake(&mut self) -> anyhow::Result<()> {
        self.begin_handshake().await?;
        self.finish_handshake().await
    }

    /// Full handshake through the `$GetPass`/`$MyPass` exchange.
    pub async fn handshake_with_password(&mut self, password: &str) -> anyhow::Result<()> {
        self.begin_handshake().await?;
        self.expect("$GetPass", |f| f == "$GetPass").await?;
        self.send(&format!("$MyPass {}", password)).await?;
        self.finish_handshake().await
    }

    /// Send a public chat line.
    pub async fn chat(&mut self, text: &str) -> anyhow::Result<()> {
        let nick = self.nick.clone();
        self.send(&format!("<{}> {}", nick, text)).await
    }

    /// Send a private message.
    pub async fn pm(&mut self, to: &str, text: &str) -> anyhow::Result<()> {
        let nick = self.nick.clone();
        self.send(&format!("$To: {} From: {} $<{}> {}", to, nick, nick, text))
            .await
    }

    /// Wait for a private message from `from` whose body satisfies `pred`,
    /// returning the body.
    pub async fn expect_pm(
        &mut self,
        from: &str,
        pred: impl Fn(&str) -> bool,
    ) -> anyhow::Result<String> {
        let marker = format!("From: {} $", from);
        let frame = self
            .expect("private message", move |f| {
                if !f.starts_with("$To: ") || !f.contains(&marker) {
                    return false;
                }
                match Message::parse(f) {
                    Ok(Message::PrivateMessage { text, .. }) => pred(&text),
                    _ => false,
                }
            })
            .await?;
        match Message::parse(&frame) {
            Ok(Message::PrivateMessage { text, .. }) => Ok(text),
            _ => anyhow::bail!("not a private message: {frame:?}"),
        }
    }
}
