//! Account storage.
//!
//! Accounts are created on first successful ValidateNick and never deleted
//! by runtime logic; only the password, args, op, and verified columns
//! change afterwards.

use sqlx::SqliteConnection;

use super::DbError;

/// One row of the `accounts` table.
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub oid: i64,
    pub nick: String,
    pub password: String,
    pub args: String,
    pub op: bool,
    pub verified: bool,
    pub creationtime: i64,
}

/// Load every account, oldest first.
pub async fn load_all(conn: &mut SqliteConnection) -> Result<Vec<AccountRow>, DbError> {
    let rows = sqlx::query_as::<_, (i64, String, String, String, bool, bool, i64)>(
        "SELECT oid, nick, password, args, op, verified, creationtime \
         FROM accounts ORDER BY oid",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(
            |(oid, nick, password, args, op, verified, creationtime)| AccountRow {
                oid,
                nick,
                password,
                args,
                op,
                verified,
                creationtime,
            },
        )
        .collect())
}

/// Insert a fresh account and return its oid.
pub async fn create(
    conn: &mut SqliteConnection,
    nick: &str,
    creationtime: i64,
) -> Result<i64, DbError> {
    let result = sqlx::query("INSERT INTO accounts (nick, creationtime) VALUES (?, ?)")
        .bind(nick)
        .bind(creationtime)
        .execute(&mut *conn)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Update the stored password.
pub async fn set_password(
    conn: &mut SqliteConnection,
    nick: &str,
    password: &str,
) -> Result<(), DbError> {
    sqlx::query("UPDATE accounts SET password = ? WHERE nick = ?")
        .bind(password)
        .bind(nick)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Flip the op flag.
pub async fn set_op(conn: &mut SqliteConnection, nick: &str, op: bool) -> Result<(), DbError> {
    sqlx::query("UPDATE accounts SET op = ? WHERE nick = ?")
        .bind(op)
        .bind(nick)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Flip the verified flag.
pub async fn set_verified(
    conn: &mut SqliteConnection,
    nick: &str,
    verified: bool,
) -> Result<(), DbError> {
    sqlx::query("UPDATE accounts SET verified = ? WHERE nick = ?")
        .bind(verified)
        .bind(nick)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Replace the free-form capability args.
pub async fn set_args(conn: &mut SqliteConnection, nick: &str, args: &str) -> Result<(), DbError> {
    sqlx::query("UPDATE accounts SET args = ? WHERE nick = ?")
        .bind(args)
        .bind(nick)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbType;
    use crate::db::Database;

    #[tokio::test]
    async fn create_and_reload() {
        let db = Database::new(":memory:", DbType::Fallback).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let oid = create(&mut conn, "alice", 1000).await.unwrap();
        set_password(&mut conn, "alice", "sekrit").await.unwrap();
        set_op(&mut conn, "alice", true).await.unwrap();
        set_verified(&mut conn, "alice", true).await.unwrap();

        let rows = load_all(&mut conn).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.oid, oid);
        assert_eq!(row.nick, "alice");
        assert_eq!(row.password, "sekrit");
        assert!(row.op);
        assert!(row.verified);
        assert_eq!(row.creationtime, 1000);
    }

    #[tokio::test]
    async fn duplicate_nick_is_rejected() {
        let db = Database::new(":memory:", DbType::Fallback).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        create(&mut conn, "bob", 1).await.unwrap();
        assert!(create(&mut conn, "bob", 2).await.is_err());
    }
}
