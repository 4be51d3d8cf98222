//! Punishments: bans, silences, stupidify, and admission checks.

mod common;

use common::{TestClient, TestHub};
use nmdcd::state::events::PunishKind;
use nmdcd::state::unix_now;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[tokio::test]
async fn banned_prefix_is_refused_at_accept() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;

    {
        let mut state = hub.hub().state.lock().await;
        state
            .events
            .insert(PunishKind::Ban, "1.2.3.", unix_now() + 3600);
    }

    // A matching address is turned away before the greeting.
    let (tx, _rx) = mpsc::unbounded_channel();
    let (kill, _kill_rx) = oneshot::channel();
    let refused = hub.hub().add_user("1.2.3.4".to_string(), 40000, tx, kill).await;
    assert!(refused.is_err());

    // A non-matching address gets in.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (kill, _kill_rx) = oneshot::channel();
    let admitted = hub.hub().add_user("1.2.4.4".to_string(), 40001, tx, kill).await;
    assert!(admitted.is_ok());
    let greeting = rx.recv().await.unwrap();
    assert!(greeting.starts_with("$Lock "), "got {greeting:?}");

    hub.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn expired_ban_is_scrubbed_on_accept() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;

    {
        let mut state = hub.hub().state.lock().await;
        state
            .events
            .insert(PunishKind::Ban, "1.2.3.", unix_now() - 10);
    }

    let (tx, _rx) = mpsc::unbounded_channel();
    let (kill, _kill_rx) = oneshot::channel();
    assert!(hub
        .hub()
        .add_user("1.2.3.4".to_string(), 40002, tx, kill)
        .await
        .is_ok());

    let state = hub.hub().state.lock().await;
    assert!(state.events.map(PunishKind::Ban).is_empty());
    drop(state);

    hub.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn banned_nick_cannot_validate() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;
    hub.add_account("op1", "pw", true, true).await?;

    let mut op = TestClient::connect(hub.addr, "op1").await?;
    op.handshake_with_password("pw").await?;

    op.pm("AdvancedBot", "ban %victim 1h abuse").await?;
    op.expect_pm("AdvancedBot", |t| t.contains("ban added for <victim>"))
        .await?;

    let mut victim = TestClient::connect(hub.addr, "victim").await?;
    victim.begin_handshake().await?;
    victim
        .expect("ban notice", |f| {
            f.starts_with("<Hub-Security>") && f.contains("currently banned")
        })
        .await?;

    hub.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn ban_kicks_connected_user() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;
    hub.add_account("op1", "pw", true, true).await?;

    let mut op = TestClient::connect(hub.addr, "op1").await?;
    op.handshake_with_password("pw").await?;
    let mut victim = TestClient::connect(hub.addr, "victim").await?;
    victim.handshake().await?;
    op.expect("$Hello victim", |f| f == "$Hello victim").await?;

    op.pm("AdvancedBot", "ban %victim 1h flooding").await?;
    op.expect("kickban notice", |f| {
        f.starts_with("<Hub-Security>") && f.contains("victim is being kickbanned")
    })
    .await?;
    op.expect("$Quit victim", |f| f == "$Quit victim").await?;

    hub.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn silence_blocks_chat_with_notice() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;
    hub.add_account("op1", "pw", true, true).await?;

    let mut op = TestClient::connect(hub.addr, "op1").await?;
    op.handshake_with_password("pw").await?;
    let mut carol = TestClient::connect(hub.addr, "carol").await?;
    carol.handshake().await?;

    op.pm("AdvancedBot", "silence %carol 10m spamming").await?;
    op.expect_pm("AdvancedBot", |t| t.contains("silence added for <carol>"))
        .await?;

    carol.chat("can anyone hear me").await?;
    carol
        .expect("silence notice", |f| {
            f.starts_with("<Hub-Security>") && f.contains("currently silenced")
        })
        .await?;
    op.expect_silence(
        "silenced chat",
        Duration::from_millis(500),
        |f| f.contains("can anyone hear me"),
    )
    .await?;

    // Lifting it (duration 0 means removal) restores chat.
    op.pm("AdvancedBot", "silence %carol 0").await?;
    op.expect_pm("AdvancedBot", |t| t.contains("silence removed for <carol>"))
        .await?;
    carol.chat("back again").await?;
    op.expect("chat line", |f| f == "<carol> back again").await?;

    hub.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn stupidify_garbles_broadcast_chat() -> anyhow::Result<()> {
    // A huge stupidfactor keeps the transform down to the deterministic
    // substitutions, so the broadcast text is predictable.
    let hub = TestHub::spawn_with(|c| {
        c.hub.stupidfactor = 1_000_000;
        c.hub.stupidseed = Some(42);
    })
    .await?;
    hub.add_account("op1", "pw", true, true).await?;

    let mut op = TestClient::connect(hub.addr, "op1").await?;
    op.handshake_with_password("pw").await?;
    let mut dave = TestClient::connect(hub.addr, "dave").await?;
    dave.handshake().await?;

    op.pm("AdvancedBot", "stupidify %dave 10m being smart").await?;
    op.expect_pm("AdvancedBot", |t| t.contains("stupidify added for <dave>"))
        .await?;

    dave.chat("you are great").await?;
    let line = op
        .expect("garbled chat", |f| f.starts_with("<dave> "))
        .await?;
    assert_eq!(line.to_lowercase(), "<dave> you r great", "got {line:?}");

    hub.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn verify_grants_and_announces() -> anyhow::Result<()> {
    let hub = TestHub::spawn_with(|c| c.hub.restrictunverifiedusers = true).await?;
    hub.add_account("op1", "pw", true, true).await?;

    let mut op = TestClient::connect(hub.addr, "op1").await?;
    op.handshake_with_password("pw").await?;
    let mut newbie = TestClient::connect(hub.addr, "newbie").await?;
    newbie.handshake().await?;
    op.expect_pm("AdvancedBot", |t| t.contains("Unverified user joined: <newbie>"))
        .await?;

    op.pm("AdvancedBot", "verify newbie seems fine").await?;
    op.expect_pm("AdvancedBot", |t| t.contains("<newbie> verified by <op1>"))
        .await?;
    // The fresh account has no password, so the hub asks for one.
    newbie
        .expect_pm("AdvancedBot", |t| t.contains("You have been verified"))
        .await?;

    hub.shutdown().await;
    Ok(())
}
