//! The task runner pool.
//!
//! Anything that may block (storage, reverse DNS) is queued here instead
//! of running on the connection path. A bounded pool of runners drains the
//! FIFO queue; each runner opens its own storage connection at startup and
//! holds the hub lock for the whole of every task, so tasks serialize
//! against commands and against each other.
//!
//! Tasks carry ids, never references: a session or account can die between
//! submission and execution, so everything is re-resolved under the lock.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::{Row, Sqlite};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use crate::bots::bot_reply;
use crate::db;
use crate::error::HubError;
use crate::state::events::{PunishKind, JOIN_TYPE_ID};
use crate::state::{unix_now, Hub, HubState, SessionId, Torrent};

/// One queued unit of blocking work.
#[derive(Debug)]
pub enum Task {
    /// No-op used to wake runners at shutdown.
    Wake,
    /// First login of a nick: create its account, then record the join.
    CreateAccountAndJoin { sid: SessionId, nick: String, ip: String },
    /// Record a join for an existing account.
    RecordJoin { sid: SessionId, nick: String, ip: String },
    /// Suffix the session duration onto a join history row.
    FinishJoin { join_oid: i64, duration_secs: i64 },
    /// Mirror a punishment insert/update to storage.
    UpsertActiveEvent { kind: PunishKind, entry: String, until: i64 },
    /// Mirror a punishment removal to storage.
    DeleteActiveEvent { kind: PunishKind, entry: String },
    /// Purge expired punishment rows of one kind from storage.
    ScrubEvents { kind: PunishKind },
    /// Append one history row; account and noteby resolve at execution.
    AppendHistory {
        account: String,
        eventtypeid: i64,
        noteby: Option<String>,
        note: String,
    },
    SetAccountPassword { nick: String, password: String },
    SetAccountOp { nick: String, op: bool },
    SetAccountVerified { nick: String, verified: bool },
    SetAccountArgs { nick: String, args: String },
    /// Store a torrent posting and notify the poster and every op.
    AddTorrent {
        sid: SessionId,
        nick: String,
        location: String,
        description: String,
    },
    ApproveTorrent { oid: i64, by: String },
    DeactivateTorrent { oid: i64 },
    /// Fetch and format an account's history for a requester.
    History {
        sid: SessionId,
        nick: String,
        types: Vec<i64>,
        since_secs: i64,
    },
    /// List accounts that have logged in from an IP prefix.
    IpSearch { sid: SessionId, prefix: String },
    /// Run one read-only query for a privileged caller.
    RunQuery { sid: SessionId, sql: String },
    /// Reverse-DNS a user's address for a requester.
    Hostname { sid: SessionId, nick: String, ip: String },
}

/// FIFO queue shared between submitters and the runner pool.
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Task>,
    rx: Mutex<mpsc::UnboundedReceiver<Task>>,
    pending: AtomicUsize,
    exit: AtomicBool,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            pending: AtomicUsize::new(0),
            exit: AtomicBool::new(false),
        }
    }

    /// Queue a task for the runner pool.
    pub fn submit(&self, task: Task) {
        debug!(target: "nmdcd::threading", task = ?task, "Adding task to queue");
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(task).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Tasks submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    fn task_done(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    fn exiting(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }

    /// Wait for the queue to empty, giving up after `timeout`.
    pub async fn drain(&self, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.pending() > 0 {
            if tokio::time::Instant::now() >= deadline {
                warn!("Cleanup taking too long, exiting anyway");
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Tell `runners` runners to stop, waking each with an empty task.
    pub fn stop(&self, runners: usize) {
        self.exit.store(true, Ordering::SeqCst);
        for _ in 0..runners {
            self.submit(Task::Wake);
        }
    }
}

/// Spawn the runner pool.
pub fn spawn_runners(hub: &Arc<Hub>, count: usize) {
    for worker in 0..count {
        let hub = Arc::clone(hub);
        tokio::spawn(task_runner(hub, worker));
    }
}

/// One pool worker: open a dedicated storage connection, then drain tasks
/// until told to exit.
async fn task_runner(hub: Arc<Hub>, worker: usize) {
    debug!(target: "nmdcd::threading", worker, "Task runner started");
    let mut conn = match hub.db.acquire().await {
        Ok(conn) => conn,
        Err(e) => {
            error!(worker, error = %e, "Task runner could not open its storage connection");
            return;
        }
    };

    loop {
        let task = {
            let mut rx = hub.tasks.rx.lock().await;
            rx.recv().await
        };
        let Some(task) = task else { break };

        if matches!(task, Task::Wake) {
            hub.tasks.task_done();
            if hub.tasks.exiting() {
                break;
            }
            continue;
        }

        debug!(target: "nmdcd::threading", worker, task = ?task, "Task runner got task");
        let mut state = hub.state.lock().await;
        if let Err(e) = run_task(&hub, &mut state, &mut conn, task).await {
            warn!(worker, error = %e, "Error while handling task");
        }
        drop(state);
        hub.tasks.task_done();

        if hub.tasks.exiting() {
            break;
        }
    }
    debug!(target: "nmdcd::threading", worker, "Task runner exiting");
}

async fn run_task(
    hub: &Hub,
    state: &mut HubState,
    conn: &mut PoolConnection<Sqlite>,
    task: Task,
) -> Result<(), HubError> {
    match task {
        Task::Wake => {}

        Task::CreateAccountAndJoin { sid, nick, ip } => {
            let now = unix_now();
            let oid = match state.accounts.get(&nick) {
                Some(account) => account.oid,
                None => {
                    let oid = db::accounts::create(conn, &nick, now).await?;
                    state.oids.insert(oid, nick.clone());
                    state.accounts.insert(
                        nick.clone(),
                        crate::state::Account {
                            oid,
                            nick: nick.clone(),
                            password: String::new(),
                            args: String::new(),
                            op: false,
                            verified: false,
                            creationtime: now,
                        },
                    );
                    oid
                }
            };
            if let Some(session) = state.session_mut(sid) {
                session.account = Some(nick.clone());
            }
            record_join(state, conn, sid, oid, &ip).await?;
        }

        Task::RecordJoin { sid, nick, ip } => {
            let Some(oid) = state.account_oid(&nick) else {
                return Ok(());
            };
            record_join(state, conn, sid, oid, &ip).await?;
        }

        Task::FinishJoin { join_oid, duration_secs } => {
            db::events::finish_join(conn, join_oid, duration_secs).await?;
        }

        Task::UpsertActiveEvent { kind, entry, until } => {
            db::events::upsert_active(conn, kind.type_id(), &entry, until).await?;
        }

        Task::DeleteActiveEvent { kind, entry } => {
            db::events::delete_active(conn, kind.type_id(), &entry).await?;
        }

        Task::ScrubEvents { kind } => {
            db::events::delete_expired(conn, kind.type_id(), unix_now()).await?;
        }

        Task::AppendHistory { account, eventtypeid, noteby, note } => {
            let Some(accountid) = state.account_oid(&account) else {
                debug!(account = %account, "Skipping history row: no account");
                return Ok(());
            };
            let noteby_oid = noteby.as_deref().and_then(|nick| state.account_oid(nick));
            db::events::append_history(conn, accountid, eventtypeid, unix_now(), noteby_oid, &note)
                .await?;
        }

        Task::SetAccountPassword { nick, password } => {
            db::accounts::set_password(conn, &nick, &password).await?;
        }

        Task::SetAccountOp { nick, op } => {
            db::accounts::set_op(conn, &nick, op).await?;
        }

        Task::SetAccountVerified { nick, verified } => {
            db::accounts::set_verified(conn, &nick, verified).await?;
        }

        Task::SetAccountArgs { nick, args } => {
            db::accounts::set_args(conn, &nick, &args).await?;
        }

        Task::AddTorrent { sid, nick, location, description } => {
            let botname = hub.config.hub.advancedbotname.clone();
            let Some(addedby) = state.account_oid(&nick) else {
                state.pm(&botname, sid, "Error: undefined error adding torrent");
                return Ok(());
            };
            let now = unix_now();
            match db::torrents::insert(conn, addedby, now, &location, &description).await {
                Ok(oid) => {
                    state.torrents.insert(
                        oid,
                        Torrent {
                            oid,
                            location: location.clone(),
                            description: description.clone(),
                            addedby: nick.clone(),
                            addedtime: now,
                            approvalby: None,
                            approvaltime: None,
                        },
                    );
                    state.pm(&botname, sid, "Torrent added, awaiting on approval by op");
                    let announce = format!(
                        "Torrent (id {}) added by {}, awaiting approval: location={:?} description={:?}",
                        oid, nick, location, description
                    );
                    state.pm_ops(&botname, &announce);
                }
                Err(e) => {
                    debug!(target: "nmdcd::commanderror", error = %e, "Error adding torrent");
                    state.pm(&botname, sid, "Error: undefined error adding torrent");
                }
            }
        }

        Task::ApproveTorrent { oid, by } => {
            let Some(approvalby) = state.account_oid(&by) else {
                return Ok(());
            };
            db::torrents::approve(conn, oid, approvalby, unix_now()).await?;
        }

        Task::DeactivateTorrent { oid } => {
            db::torrents::deactivate(conn, oid).await?;
        }

        Task::History { sid, nick, types, since_secs } => {
            give_history(hub, state, conn, sid, &nick, &types, since_secs).await?;
        }

        Task::IpSearch { sid, prefix } => {
            let hits = db::events::logins_from(conn, &prefix).await?;
            let reply = if hits.is_empty() {
                format!("No logins from {}", prefix)
            } else {
                format!(
                    "The following accounts have logged in from {}: <{}>",
                    prefix,
                    hits.join("> <")
                )
            };
            bot_reply(hub, state, sid, &reply);
        }

        Task::RunQuery { sid, sql } => {
            run_query(hub, state, conn, sid, &sql).await;
        }

        Task::Hostname { sid, nick, ip } => {
            let reply = match ip.parse::<std::net::IpAddr>() {
                Ok(addr) => match hub.resolver.reverse_lookup(addr).await {
                    Ok(lookup) => match lookup.iter().next() {
                        Some(name) => {
                            format!("<{}> using IP {}, hostname {}", nick, ip, name)
                        }
                        None => format!("<{}> using IP {}, hostname lookup failed: no PTR", nick, ip),
                    },
                    Err(e) => format!("<{}> using IP {}, hostname lookup failed: {}", nick, ip, e),
                },
                Err(e) => format!("<{}> using IP {}, hostname lookup failed: {}", nick, ip, e),
            };
            bot_reply(hub, state, sid, &reply);
        }
    }
    Ok(())
}

async fn record_join(
    state: &mut HubState,
    conn: &mut PoolConnection<Sqlite>,
    sid: SessionId,
    accountid: i64,
    ip: &str,
) -> Result<(), HubError> {
    let now = unix_now();
    let join_oid = db::events::append_history(conn, accountid, JOIN_TYPE_ID, now, None, ip).await?;
    if let Some(session) = state.session_mut(sid) {
        session.joinoid = Some(join_oid);
        if session.jointime == 0 {
            session.jointime = now;
        }
    }
    Ok(())
}

/// Per-event-type line templates for the history command.
fn history_line(hub: &Hub, row: &db::HistoryRow) -> String {
    let time = format_time(hub, row.time);
    let noteby = row.noteby.as_deref().unwrap_or("?");
    match row.eventtypeid {
        1 => format!("Logged in on {} from {}", time, row.note),
        3 => format!("Ban change on {} by <{}>: {}", time, noteby, row.note),
        4 => format!("Silence change on {} by <{}>: {}", time, noteby, row.note),
        5 => format!("Stupidify change on {} by <{}>: {}", time, noteby, row.note),
        6 => format!("Verify change on {} by <{}>: {}", time, noteby, row.note),
        7 => format!("Note on {} by <{}>: {}", time, noteby, row.note),
        other => format!("Event type {} on {}: {}", other, time, row.note),
    }
}

/// Render a Unix timestamp with the configured history format, in UTC.
pub fn format_time(hub: &Hub, secs: i64) -> String {
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(dt) => dt.format(&hub.config.hub.historyftime).to_string(),
        None => secs.to_string(),
    }
}

async fn give_history(
    hub: &Hub,
    state: &mut HubState,
    conn: &mut PoolConnection<Sqlite>,
    sid: SessionId,
    nick: &str,
    types: &[i64],
    since_secs: i64,
) -> Result<(), HubError> {
    let botname = hub.config.hub.advancedbotname.clone();
    let Some(account) = state.accounts.get(nick) else {
        state.pm(&botname, sid, &format!("No account exists for <{}>", nick));
        return Ok(());
    };
    let mut lines = vec![format!(
        "History for <{}>, {} {}, account created on {}",
        nick,
        if account.verified { "Verified" } else { "Unverified" },
        if account.op { "Op" } else { "User" },
        format_time(hub, account.creationtime)
    )];
    let accountid = account.oid;
    let after = unix_now() - since_secs;
    let limit = hub.options.read().maxhistoryrows;
    let rows = db::events::history_for(conn, accountid, after, types, limit).await?;
    for row in &rows {
        lines.push(history_line(hub, row));
    }
    bot_reply(hub, state, sid, &lines.join("\n"));
    Ok(())
}

async fn run_query(
    hub: &Hub,
    state: &mut HubState,
    conn: &mut PoolConnection<Sqlite>,
    sid: SessionId,
    sql: &str,
) {
    debug!(target: "nmdcd::sql", sql = %sql, "Executing query");
    match sqlx::query(sql).fetch_all(&mut **conn).await {
        Ok(rows) if rows.is_empty() => {
            bot_reply(hub, state, sid, &format!("Query {:?} returned no rows", sql));
        }
        Ok(rows) => {
            let mut lines = vec![format!("Query {:?} returned:", sql)];
            for row in &rows {
                let rendered: Vec<String> = (0..row.columns().len())
                    .map(|i| render_column(row, i))
                    .collect();
                lines.push(rendered.join("\t"));
            }
            bot_reply(hub, state, sid, &lines.join("\n"));
        }
        Err(e) => {
            bot_reply(hub, state, sid, &format!("Error in command: {}", e));
        }
    }
}

fn render_column(row: &sqlx::sqlite::SqliteRow, i: usize) -> String {
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map_or_else(|| "NULL".to_string(), |x| x.to_string());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return v.map_or_else(|| "NULL".to_string(), |x| x.to_string());
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return v.unwrap_or_else(|| "NULL".to_string());
    }
    "?".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_counts_pending() {
        let queue = TaskQueue::new();
        assert_eq!(queue.pending(), 0);
        queue.submit(Task::Wake);
        queue.submit(Task::FinishJoin { join_oid: 1, duration_secs: 2 });
        assert_eq!(queue.pending(), 2);
        // Drain should give up quickly with nobody consuming.
        queue.drain(Duration::from_millis(150)).await;
        assert_eq!(queue.pending(), 2);
    }

    #[tokio::test]
    async fn stop_wakes_each_runner() {
        let queue = TaskQueue::new();
        queue.stop(3);
        assert_eq!(queue.pending(), 3);
        assert!(queue.exiting());
    }
}
