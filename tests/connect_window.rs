//! Restricted-hub connection brokering and search visibility.

mod common;

use common::{TestClient, TestHub};
use nmdcd::state::unix_now;
use std::time::Duration;

#[tokio::test]
async fn unverified_needs_an_invitation_to_reach_an_op() -> anyhow::Result<()> {
    let hub = TestHub::spawn_with(|c| c.hub.restrictunverifiedusers = true).await?;
    hub.add_account("opA", "pw", true, true).await?;

    let mut op = TestClient::connect(hub.addr, "opA").await?;
    op.handshake_with_password("pw").await?;
    let mut bob = TestClient::connect(hub.addr, "bob").await?;
    bob.handshake().await?;
    op.expect("$Hello bob", |f| f == "$Hello bob").await?;

    // Without an invitation the request is dropped.
    bob.send("$ConnectToMe opA 9.9.9.9:411").await?;
    op.expect_silence(
        "uninvited ConnectToMe",
        Duration::from_millis(500),
        |f| f.starts_with("$ConnectToMe"),
    )
    .await?;

    // The op's RevConnectToMe opens the window...
    op.send("$RevConnectToMe opA bob").await?;
    bob.expect("$RevConnectToMe", |f| f == "$RevConnectToMe opA bob")
        .await?;

    // ...and the same request now goes through.
    bob.send("$ConnectToMe opA 9.9.9.9:411").await?;
    op.expect("$ConnectToMe", |f| f == "$ConnectToMe opA 9.9.9.9:411")
        .await?;

    hub.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn connect_window_expires() -> anyhow::Result<()> {
    let hub = TestHub::spawn_with(|c| c.hub.restrictunverifiedusers = true).await?;

    {
        // The approval map honors its deadline without real sockets.
        let mut state = hub.hub().state.lock().await;
        let now = unix_now();
        state.record_connect_check("bob", "opA", now + 180, now);
        assert!(state.connect_check_valid("bob", "opA", now + 179));
        assert!(!state.connect_check_valid("bob", "opA", now + 181));
        // Recording a new approval scrubs dead ones.
        state.record_connect_check("carl", "opA", now + 360, now + 200);
        assert!(!state.connect_checks.contains_key(&("bob".to_string(), "opA".to_string())));
    }

    hub.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn searches_reach_only_verified_users_on_restricted_hubs() -> anyhow::Result<()> {
    let hub = TestHub::spawn_with(|c| c.hub.restrictunverifiedusers = true).await?;
    hub.add_account("opA", "pw", true, true).await?;
    hub.add_account("vera", "", false, true).await?;

    let mut op = TestClient::connect(hub.addr, "opA").await?;
    op.handshake_with_password("pw").await?;
    let mut vera = TestClient::connect(hub.addr, "vera").await?;
    vera.handshake().await?;
    let mut bob = TestClient::connect(hub.addr, "bob").await?;
    bob.handshake().await?;

    vera.send("$Search 1.2.3.4:412 F?F?0?1?linux").await?;
    op.expect("search", |f| f.starts_with("$Search 1.2.3.4:412 "))
        .await?;
    bob.expect_silence("search leak", Duration::from_millis(500), |f| {
        f.starts_with("$Search")
    })
    .await?;

    // An unverified user's Search is not even accepted.
    bob.send("$Search 5.6.7.8:412 F?F?0?1?warez").await?;
    op.expect_silence(
        "unverified search",
        Duration::from_millis(500),
        |f| f.contains("5.6.7.8"),
    )
    .await?;

    hub.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn search_results_go_to_the_named_recipient_only() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;

    let mut alice = TestClient::connect(hub.addr, "alice").await?;
    alice.handshake().await?;
    let mut bob = TestClient::connect(hub.addr, "bob").await?;
    bob.handshake().await?;
    let mut eve = TestClient::connect(hub.addr, "eve").await?;
    eve.handshake().await?;

    alice
        .send("$SR alice some\\path.ext\u{5}123 2/4\u{5}Test Hub (127.0.0.1:411)\u{5}bob")
        .await?;
    let sr = bob.expect("search result", |f| f.starts_with("$SR ")).await?;
    // The recipient suffix is stripped before forwarding.
    assert!(!sr.ends_with("\u{5}bob"), "got {sr:?}");
    eve.expect_silence("leaked SR", Duration::from_millis(500), |f| {
        f.starts_with("$SR")
    })
    .await?;

    hub.shutdown().await;
    Ok(())
}
