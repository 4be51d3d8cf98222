//! Torrent posting storage.
//!
//! Rows stay in the table forever; removal just clears the active flag so
//! the posting history survives.

use sqlx::SqliteConnection;

use super::DbError;

/// One row of the `torrents` table.
#[derive(Debug, Clone)]
pub struct TorrentRow {
    pub oid: i64,
    pub addedby: i64,
    pub addedtime: i64,
    pub approvalby: Option<i64>,
    pub approvaltime: Option<i64>,
    pub location: String,
    pub description: String,
}

/// Load the torrents still flagged active.
pub async fn load_active(conn: &mut SqliteConnection) -> Result<Vec<TorrentRow>, DbError> {
    let rows = sqlx::query_as::<_, (i64, i64, i64, Option<i64>, Option<i64>, String, String)>(
        "SELECT oid, addedby, addedtime, approvalby, approvaltime, location, description \
         FROM torrents WHERE active = 1",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(
            |(oid, addedby, addedtime, approvalby, approvaltime, location, description)| {
                TorrentRow {
                    oid,
                    addedby,
                    addedtime,
                    approvalby,
                    approvaltime,
                    location,
                    description,
                }
            },
        )
        .collect())
}

/// Insert a pending posting (active, but unapproved) and return its oid.
pub async fn insert(
    conn: &mut SqliteConnection,
    addedby: i64,
    addedtime: i64,
    location: &str,
    description: &str,
) -> Result<i64, DbError> {
    let result = sqlx::query(
        "INSERT INTO torrents (addedby, addedtime, active, location, description) \
         VALUES (?, ?, 1, ?, ?)",
    )
    .bind(addedby)
    .bind(addedtime)
    .bind(location)
    .bind(description)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Record an op's approval.
pub async fn approve(
    conn: &mut SqliteConnection,
    oid: i64,
    approvalby: i64,
    approvaltime: i64,
) -> Result<(), DbError> {
    sqlx::query("UPDATE torrents SET approvalby = ?, approvaltime = ? WHERE oid = ?")
        .bind(approvalby)
        .bind(approvaltime)
        .bind(oid)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Clear the active flag.
pub async fn deactivate(conn: &mut SqliteConnection, oid: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE torrents SET active = 0 WHERE oid = ?")
        .bind(oid)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbType;
    use crate::db::{accounts, Database};

    #[tokio::test]
    async fn lifecycle() {
        let db = Database::new(":memory:", DbType::Fallback).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let carol = accounts::create(&mut conn, "carol", 1).await.unwrap();
        let op = accounts::create(&mut conn, "opB", 1).await.unwrap();

        let oid = insert(&mut conn, carol, 100, "http://x/y.torrent", "Linux ISO")
            .await
            .unwrap();
        let rows = load_active(&mut conn).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].approvalby.is_none());

        approve(&mut conn, oid, op, 200).await.unwrap();
        let rows = load_active(&mut conn).await.unwrap();
        assert_eq!(rows[0].approvalby, Some(op));
        assert_eq!(rows[0].approvaltime, Some(200));

        deactivate(&mut conn, oid).await.unwrap();
        assert!(load_active(&mut conn).await.unwrap().is_empty());
    }
}
