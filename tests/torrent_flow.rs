//! Torrent posting, approval, listing, and removal.

mod common;

use common::{TestClient, TestHub};

fn parse_announced_id(text: &str) -> i64 {
    // "Torrent (id N) added by ..."
    let rest = text.split("(id ").nth(1).expect("announce carries an id");
    rest.split(')')
        .next()
        .and_then(|n| n.parse().ok())
        .expect("announce id is numeric")
}

#[tokio::test]
async fn torrent_lifecycle() -> anyhow::Result<()> {
    let hub = TestHub::spawn_with(|c| c.hub.restrictunverifiedusers = true).await?;
    hub.add_account("opB", "pw", true, true).await?;
    hub.add_account("carol", "", false, true).await?;

    let mut op = TestClient::connect(hub.addr, "opB").await?;
    op.handshake_with_password("pw").await?;
    let mut carol = TestClient::connect(hub.addr, "carol").await?;
    carol.handshake().await?;

    // Post: the poster is told to wait, the ops are told to look.
    carol
        .pm("AdvancedBot", "torrent http://x/y.torrent Linux ISO")
        .await?;
    carol
        .expect_pm("AdvancedBot", |t| t.contains("awaiting on approval"))
        .await?;
    let announce = op
        .expect_pm("AdvancedBot", |t| t.contains("awaiting approval"))
        .await?;
    let oid = parse_announced_id(&announce);

    // Pending postings are invisible to non-ops.
    carol.pm("AdvancedBot", "torrent get").await?;
    let listing = carol
        .expect_pm("AdvancedBot", |t| t.starts_with("Active Torrents:"))
        .await?;
    assert!(!listing.contains("y.torrent"), "got {listing:?}");

    // Ops see the pending row, with its id.
    op.pm("AdvancedBot", "torrent get").await?;
    let listing = op
        .expect_pm("AdvancedBot", |t| t.starts_with("Active Torrents:"))
        .await?;
    assert!(listing.contains("y.torrent"), "got {listing:?}");
    assert!(listing.contains(&format!(" {} ", oid)) || listing.contains(&format!("- {} -", oid)));

    // A duplicate location is refused while the first is pending.
    carol
        .pm("AdvancedBot", "torrent http://x/y.torrent Linux ISO again")
        .await?;
    carol
        .expect_pm("AdvancedBot", |t| t.contains("already been added"))
        .await?;

    // Approval announces to the hub and exposes the entry to everyone.
    op.pm("AdvancedBot", &format!("torrent approve {}", oid))
        .await?;
    op.expect_pm("AdvancedBot", |t| t.contains(&format!("Torrent id {} approved", oid)))
        .await?;
    carol
        .expect("approval broadcast", |f| {
            f.starts_with("<Hub-Security>") && f.contains("y.torrent")
        })
        .await?;
    carol.pm("AdvancedBot", "torrent get").await?;
    let listing = carol
        .expect_pm("AdvancedBot", |t| t.starts_with("Active Torrents:"))
        .await?;
    assert!(listing.contains("y.torrent"), "got {listing:?}");

    // Double approval is an error.
    op.pm("AdvancedBot", &format!("torrent approve {}", oid))
        .await?;
    op.expect_pm("AdvancedBot", |t| t.contains("already approved by <opB>"))
        .await?;

    // Removal takes it off the list and deactivates the row.
    op.pm("AdvancedBot", &format!("torrent remove {}", oid))
        .await?;
    op.expect_pm("AdvancedBot", |t| t.contains(&format!("Torrent id {} removed", oid)))
        .await?;
    carol.pm("AdvancedBot", "torrent get").await?;
    let listing = carol
        .expect_pm("AdvancedBot", |t| t.starts_with("Active Torrents:"))
        .await?;
    assert!(!listing.contains("y.torrent"), "got {listing:?}");

    hub.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn bad_torrent_posts_are_rejected() -> anyhow::Result<()> {
    let hub = TestHub::spawn().await?;
    hub.add_account("carol", "", false, true).await?;

    let mut carol = TestClient::connect(hub.addr, "carol").await?;
    carol.handshake().await?;

    carol
        .pm("AdvancedBot", "torrent gopher://x/y.torrent old tech")
        .await?;
    carol
        .expect_pm("AdvancedBot", |t| t.contains("must start with http://"))
        .await?;

    carol
        .pm("AdvancedBot", "torrent http://x/y.exe not a torrent")
        .await?;
    carol
        .expect_pm("AdvancedBot", |t| t.contains("must end in .torrent"))
        .await?;

    hub.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn unverified_users_cannot_post() -> anyhow::Result<()> {
    let hub = TestHub::spawn_with(|c| c.hub.restrictunverifiedusers = true).await?;

    let mut bob = TestClient::connect(hub.addr, "bob").await?;
    bob.handshake().await?;
    bob.pm("AdvancedBot", "torrent http://x/z.torrent stuff").await?;
    bob.expect_pm("AdvancedBot", |t| t.contains("Only verified users"))
        .await?;

    hub.shutdown().await;
    Ok(())
}
