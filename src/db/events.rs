//! Punishment and history storage.
//!
//! `activeevents` mirrors the in-memory ban/silence/stupidify maps;
//! `events` is the append-only history log. Every punishment change also
//! appends a history row, which is done by the callers in the task layer
//! so the two writes stay visible together under the coarse lock.

use sqlx::SqliteConnection;

use super::DbError;

/// One row of `activeevents`.
#[derive(Debug, Clone)]
pub struct ActiveEventRow {
    pub eventtypeid: i64,
    pub entry: String,
    pub until: i64,
}

/// One row of the history query, noteby already resolved to a nick.
#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub eventtypeid: i64,
    pub noteby: Option<String>,
    pub time: i64,
    pub note: String,
}

/// Delete expired punishments, then load the rest.
pub async fn load_active(
    conn: &mut SqliteConnection,
    now: i64,
) -> Result<Vec<ActiveEventRow>, DbError> {
    sqlx::query("DELETE FROM activeevents WHERE until <= ?")
        .bind(now)
        .execute(&mut *conn)
        .await?;
    let rows = sqlx::query_as::<_, (i64, String, i64)>(
        "SELECT eventtypeid, entry, until FROM activeevents ORDER BY oid",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(eventtypeid, entry, until)| ActiveEventRow {
            eventtypeid,
            entry,
            until,
        })
        .collect())
}

/// Insert or replace an active punishment.
pub async fn upsert_active(
    conn: &mut SqliteConnection,
    eventtypeid: i64,
    entry: &str,
    until: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO activeevents (eventtypeid, entry, until) VALUES (?, ?, ?) \
         ON CONFLICT (eventtypeid, entry) DO UPDATE SET until = excluded.until",
    )
    .bind(eventtypeid)
    .bind(entry)
    .bind(until)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Remove an active punishment.
pub async fn delete_active(
    conn: &mut SqliteConnection,
    eventtypeid: i64,
    entry: &str,
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM activeevents WHERE eventtypeid = ? AND entry = ?")
        .bind(eventtypeid)
        .bind(entry)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Remove every expired punishment of one type, with the same expiry
/// predicate the load path uses.
pub async fn delete_expired(
    conn: &mut SqliteConnection,
    eventtypeid: i64,
    now: i64,
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM activeevents WHERE eventtypeid = ? AND until <= ?")
        .bind(eventtypeid)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Append one history row, returning its oid (used for join rows, whose
/// note is amended on disconnect).
pub async fn append_history(
    conn: &mut SqliteConnection,
    accountid: i64,
    eventtypeid: i64,
    time: i64,
    noteby: Option<i64>,
    note: &str,
) -> Result<i64, DbError> {
    let result = sqlx::query(
        "INSERT INTO events (accountid, eventtypeid, time, noteby, note) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(accountid)
    .bind(eventtypeid)
    .bind(time)
    .bind(noteby)
    .bind(note)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Suffix the session duration to a join row.
pub async fn finish_join(
    conn: &mut SqliteConnection,
    join_oid: i64,
    duration_secs: i64,
) -> Result<(), DbError> {
    sqlx::query("UPDATE events SET note = note || '/' || ? WHERE oid = ?")
        .bind(duration_secs)
        .bind(join_oid)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// History rows for one account, oldest first, optionally filtered by
/// event types, bounded below by `after` and capped at `limit` rows.
pub async fn history_for(
    conn: &mut SqliteConnection,
    accountid: i64,
    after: i64,
    types: &[i64],
    limit: i64,
) -> Result<Vec<HistoryRow>, DbError> {
    let mut sql = String::from(
        "SELECT events.eventtypeid, accounts.nick, events.time, events.note \
         FROM events LEFT JOIN accounts ON events.noteby = accounts.oid \
         WHERE events.accountid = ? AND events.time > ?",
    );
    if !types.is_empty() {
        let placeholders = vec!["?"; types.len()].join(", ");
        sql.push_str(&format!(" AND events.eventtypeid IN ({placeholders})"));
    }
    sql.push_str(" ORDER BY events.time LIMIT ?");

    let mut query = sqlx::query_as::<_, (i64, Option<String>, i64, String)>(&sql)
        .bind(accountid)
        .bind(after);
    for t in types {
        query = query.bind(*t);
    }
    let rows = query.bind(limit).fetch_all(&mut *conn).await?;
    Ok(rows
        .into_iter()
        .map(|(eventtypeid, noteby, time, note)| HistoryRow {
            eventtypeid,
            noteby,
            time,
            note,
        })
        .collect())
}

/// Nicks of accounts whose join history includes an IP starting with
/// `prefix`.
pub async fn logins_from(
    conn: &mut SqliteConnection,
    prefix: &str,
) -> Result<Vec<String>, DbError> {
    let pattern = format!("{}%", prefix.replace('%', ""));
    let rows = sqlx::query_as::<_, (String,)>(
        "SELECT accounts.nick FROM events \
         LEFT JOIN accounts ON events.accountid = accounts.oid \
         WHERE events.eventtypeid = 1 AND events.note LIKE ? \
         GROUP BY accounts.nick",
    )
    .bind(pattern)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(|(nick,)| nick).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbType;
    use crate::db::{accounts, Database};

    #[tokio::test]
    async fn active_events_expire_on_load() {
        let db = Database::new(":memory:", DbType::Fallback).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        upsert_active(&mut conn, 3, "1.2.3.", 100).await.unwrap();
        upsert_active(&mut conn, 4, "%bob", 9_999_999_999).await.unwrap();

        let rows = load_active(&mut conn, 1_000).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entry, "%bob");
    }

    #[tokio::test]
    async fn upsert_replaces_until() {
        let db = Database::new(":memory:", DbType::Fallback).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        upsert_active(&mut conn, 3, "%bob", 2_000).await.unwrap();
        upsert_active(&mut conn, 3, "%bob", 3_000).await.unwrap();
        let rows = load_active(&mut conn, 1_000).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].until, 3_000);
    }

    #[tokio::test]
    async fn join_rows_get_duration_suffix() {
        let db = Database::new(":memory:", DbType::Fallback).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let oid = accounts::create(&mut conn, "alice", 1).await.unwrap();
        let join = append_history(&mut conn, oid, 1, 500, None, "1.2.3.4")
            .await
            .unwrap();
        finish_join(&mut conn, join, 77).await.unwrap();

        let rows = history_for(&mut conn, oid, 0, &[], 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].note, "1.2.3.4/77");
        assert!(rows[0].noteby.is_none());
    }

    #[tokio::test]
    async fn history_filters_by_type() {
        let db = Database::new(":memory:", DbType::Fallback).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let alice = accounts::create(&mut conn, "alice", 1).await.unwrap();
        let op = accounts::create(&mut conn, "op", 1).await.unwrap();
        append_history(&mut conn, alice, 1, 10, None, "1.2.3.4").await.unwrap();
        append_history(&mut conn, alice, 7, 20, Some(op), "troublemaker")
            .await
            .unwrap();

        let notes = history_for(&mut conn, alice, 0, &[7], 10).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].noteby.as_deref(), Some("op"));
        assert_eq!(notes[0].note, "troublemaker");

        let all = history_for(&mut conn, alice, 0, &[], 10).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn ip_login_search() {
        let db = Database::new(":memory:", DbType::Fallback).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let alice = accounts::create(&mut conn, "alice", 1).await.unwrap();
        append_history(&mut conn, alice, 1, 10, None, "12.34.56.78").await.unwrap();

        let hits = logins_from(&mut conn, "12.34.").await.unwrap();
        assert_eq!(hits, vec!["alice".to_string()]);
        assert!(logins_from(&mut conn, "99.").await.unwrap().is_empty());
    }
}
