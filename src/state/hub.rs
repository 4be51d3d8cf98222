//! The Hub - central shared state for the NMDC server.
//!
//! The [`Hub`] is the handle every task shares: configuration, storage,
//! the task queue, and the single coarse lock around [`HubState`].
//!
//! # Concurrency
//!
//! All hub-visible state lives in `HubState` behind one `tokio::sync::Mutex`.
//! The dispatcher holds the lock across a full command (pre-hooks, check,
//! give, post-hooks) and each task runner holds it across a full task, so
//! commands and tasks never interleave. Fan-out writes go through
//! per-session unbounded channels and never block, which keeps command
//! processing free of suspension points; task runners may await storage or
//! DNS while holding the lock, which is the point of the worker pool.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use nmdc_proto::{escape, generate_lock, Message, MyInfo, LOCK_PK};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tracing::{debug, info};

use crate::bots::{Bot, HookTable};
use crate::config::Config;
use crate::db::Database;
use crate::dispatch::{self, GiveOutcome, Verb};
use crate::error::HubError;
use crate::state::events::{EventMaps, EventStatus, PunishKind};
use crate::state::session::{LoginStage, Session, SessionId};
use crate::state::unix_now;
use crate::tasks::{Task, TaskQueue};

/// Pseudo-user that speaks for the hub in public chat.
pub const HUB_SECURITY: &str = "Hub-Security";

/// A persistent account record. Sessions point at accounts by nick; the
/// hub owns the records and never destroys them at runtime.
#[derive(Debug, Clone)]
pub struct Account {
    pub oid: i64,
    pub nick: String,
    pub password: String,
    /// Free-form capability tags, e.g. `PythonBot` grants the scripted
    /// command surface.
    pub args: String,
    pub op: bool,
    pub verified: bool,
    pub creationtime: i64,
}

/// An active torrent posting. Only approved postings are shown to
/// non-ops.
#[derive(Debug, Clone)]
pub struct Torrent {
    pub oid: i64,
    pub location: String,
    pub description: String,
    pub addedby: String,
    pub addedtime: i64,
    pub approvalby: Option<String>,
    pub approvaltime: Option<i64>,
}

/// Options that administrative commands can change at runtime.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub restrictunverifiedusers: bool,
    pub descriptionstart: String,
    pub stupidfactor: u32,
    pub connectchecktime: i64,
    pub maxhistoryrows: i64,
}

impl RuntimeOptions {
    fn from_config(config: &Config) -> Self {
        Self {
            restrictunverifiedusers: config.hub.restrictunverifiedusers,
            descriptionstart: config.hub.descriptionstart.clone(),
            stupidfactor: config.hub.stupidfactor.max(1),
            connectchecktime: config.hub.connectchecktime,
            maxhistoryrows: config.hub.maxhistoryrows,
        }
    }
}

/// A remote-logging subscription: numeric threshold plus a direct line to
/// the op's connection, so the relay never needs the hub lock.
pub struct LogHandler {
    pub level: u8,
    pub tx: mpsc::UnboundedSender<String>,
}

/// Everything behind the coarse lock.
pub struct HubState {
    /// Every connection, by session id.
    pub sessions: HashMap<SessionId, Session>,
    /// Fully logged-in sessions, by nick.
    pub nicks: HashMap<String, SessionId>,
    /// Logged-in ops, by nick.
    pub ops: HashMap<String, SessionId>,
    /// In-process bots, by nick. Bots have no socket.
    pub bots: HashMap<String, std::sync::Arc<dyn Bot>>,
    /// Accounts by nick, plus an oid index into the same records.
    pub accounts: HashMap<String, Account>,
    pub oids: HashMap<i64, String>,
    /// Active punishments.
    pub events: EventMaps,
    /// `(unverified user, op) -> deadline` reverse-connect approvals.
    pub connect_checks: HashMap<(String, String), i64>,
    /// Active torrent postings by oid.
    pub torrents: BTreeMap<i64, Torrent>,
    /// Hook lists registered by bots.
    pub hooks: HookTable,
    /// RNG feeding the stupidify transform and lock generation.
    pub rng: StdRng,
    /// Bumped on every bot reload; hooks from older generations are refused.
    pub reload_version: u64,
    /// The user `##` routes to in op chat.
    pub message_user: Option<SessionId>,
    pub shutting_down: bool,
}

impl HubState {
    pub fn session(&self, sid: SessionId) -> Option<&Session> {
        self.sessions.get(&sid)
    }

    pub fn session_mut(&mut self, sid: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&sid)
    }

    /// Logged-in session using `nick`, if any.
    pub fn by_nick(&self, nick: &str) -> Option<&Session> {
        self.nicks.get(nick).and_then(|sid| self.sessions.get(sid))
    }

    /// True when the nick is taken by a session or a bot.
    pub fn nick_in_use(&self, nick: &str) -> bool {
        self.nicks.contains_key(nick) || self.bots.contains_key(nick)
    }

    /// Stable oid for a nick's account.
    pub fn account_oid(&self, nick: &str) -> Option<i64> {
        self.accounts.get(nick).map(|a| a.oid)
    }

    /// Queue a frame for every logged-in session.
    pub fn broadcast_frame(&self, frame: &str) {
        for session in self.sessions.values() {
            if session.loggedin && !session.ignore_messages {
                session.send(frame.to_string());
            }
        }
    }

    /// Broadcast a chat line.
    pub fn chat_all(&self, nick: &str, text: &str) {
        self.broadcast_frame(&format!("<{}> {}", nick, text));
    }

    /// Broadcast a hub notice in public chat.
    pub fn security_chat(&self, text: &str) {
        self.chat_all(HUB_SECURITY, &escape(text));
    }

    /// Send a hub notice to one session.
    pub fn notice(&self, sid: SessionId, text: &str) {
        if let Some(session) = self.session(sid) {
            session.send(format!("<{}> {}", HUB_SECURITY, escape(text)));
        }
    }

    /// Send a private message from a named sender to one session.
    pub fn pm(&self, from: &str, sid: SessionId, text: &str) {
        if let Some(session) = self.session(sid) {
            let msg = Message::PrivateMessage {
                to: session.nick.clone(),
                from: from.to_string(),
                text: escape(text),
            };
            session.send_msg(&msg);
        }
    }

    /// Send a private message from a named sender to every op.
    pub fn pm_ops(&self, from: &str, text: &str) {
        let sids: Vec<SessionId> = self.ops.values().copied().collect();
        for sid in sids {
            self.pm(from, sid, text);
        }
    }

    /// Roster nicks shown in `$NickList`: logged-in sessions plus bots.
    /// Nicks reserved mid-handshake are not on the roster yet.
    pub fn nicklist(&self) -> Vec<String> {
        let mut nicks: Vec<String> = self
            .nicks
            .iter()
            .filter(|(_, sid)| {
                self.sessions
                    .get(sid)
                    .is_some_and(|session| session.loggedin)
            })
            .map(|(nick, _)| nick.clone())
            .collect();
        nicks.extend(self.bots.keys().cloned());
        nicks.sort();
        nicks
    }

    /// Nicks shown in `$OpList`: op sessions plus op bots.
    pub fn oplist(&self) -> Vec<String> {
        let mut nicks: Vec<String> = self.ops.keys().cloned().collect();
        nicks.extend(
            self.bots
                .values()
                .filter(|bot| bot.is_op())
                .map(|bot| bot.nick().to_string()),
        );
        nicks.sort();
        nicks
    }

    /// Rebroadcast the op list after it changed.
    pub fn give_op_list(&self) {
        let frame = Message::OpList(self.oplist()).to_string();
        self.broadcast_frame(&frame);
    }

    /// The `$MyINFO` for a roster nick, session or bot.
    pub fn myinfo_for(&self, nick: &str) -> Option<MyInfo> {
        if let Some(session) = self.by_nick(nick) {
            return Some(session.myinfo());
        }
        self.bots.get(nick).map(|bot| MyInfo {
            nick: bot.nick().to_string(),
            description: bot.description().to_string(),
            ..MyInfo::default()
        })
    }

    /// Record a reverse-connect approval `(user, op)`, scrubbing expired
    /// entries while here.
    pub fn record_connect_check(&mut self, user: &str, op: &str, deadline: i64, now: i64) {
        self.connect_checks.retain(|_, &mut until| until > now);
        self.connect_checks
            .insert((user.to_string(), op.to_string()), deadline);
    }

    /// True when `(user, op)` holds an unexpired approval.
    pub fn connect_check_valid(&self, user: &str, op: &str, now: i64) -> bool {
        self.connect_checks
            .get(&(user.to_string(), op.to_string()))
            .is_some_and(|&until| until > now)
    }
}

/// The shared hub handle.
pub struct Hub {
    pub config: Config,
    pub db: Database,
    /// The coarse lock.
    pub state: Mutex<HubState>,
    /// Runtime-tunable options, hot-swappable without the state lock.
    pub options: RwLock<RuntimeOptions>,
    /// Remote-logging subscriptions by op nick.
    pub log_handlers: DashMap<String, LogHandler>,
    /// Blocking-work queue drained by the runner pool.
    pub tasks: TaskQueue,
    /// Reverse-DNS resolver for the hostname command.
    pub resolver: hickory_resolver::TokioResolver,
    /// Fired once at shutdown.
    pub shutdown: broadcast::Sender<()>,
    session_counter: AtomicU64,
}

impl Hub {
    /// Build the hub. State starts empty; call [`Hub::setup`] to load from
    /// storage and instantiate bots.
    pub fn new(config: Config, db: Database) -> std::sync::Arc<Hub> {
        let rng = match config.hub.stupidseed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let options = RuntimeOptions::from_config(&config);
        let resolver = hickory_resolver::TokioResolver::builder_tokio()
            .map(|b| b.build())
            .unwrap_or_else(|_| {
                hickory_resolver::TokioResolver::builder_with_config(
                    hickory_resolver::config::ResolverConfig::default(),
                    hickory_resolver::name_server::TokioConnectionProvider::default(),
                )
                .build()
            });
        let (shutdown, _) = broadcast::channel(4);
        std::sync::Arc::new(Hub {
            config,
            db,
            state: Mutex::new(HubState {
                sessions: HashMap::new(),
                nicks: HashMap::new(),
                ops: HashMap::new(),
                bots: HashMap::new(),
                accounts: HashMap::new(),
                oids: HashMap::new(),
                events: EventMaps::default(),
                connect_checks: HashMap::new(),
                torrents: BTreeMap::new(),
                hooks: HookTable::default(),
                rng,
                reload_version: 0,
                message_user: None,
                shutting_down: false,
            }),
            options: RwLock::new(options),
            log_handlers: DashMap::new(),
            tasks: TaskQueue::new(),
            resolver,
            shutdown,
            session_counter: AtomicU64::new(0),
        })
    }

    /// Load accounts, punishments, and torrents from storage and install
    /// the configured bots.
    pub async fn setup(self: &std::sync::Arc<Self>) -> Result<(), HubError> {
        let mut conn = self.db.acquire().await?;
        let now = unix_now();

        let accounts = crate::db::accounts::load_all(&mut conn).await?;
        let active = crate::db::events::load_active(&mut conn, now).await?;
        let torrents = crate::db::torrents::load_active(&mut conn).await?;

        let mut state = self.state.lock().await;
        for row in accounts {
            state.oids.insert(row.oid, row.nick.clone());
            state.accounts.insert(
                row.nick.clone(),
                Account {
                    oid: row.oid,
                    nick: row.nick,
                    password: row.password,
                    args: row.args,
                    op: row.op,
                    verified: row.verified,
                    creationtime: row.creationtime,
                },
            );
        }
        info!(target: "nmdcd::loading", count = state.accounts.len(), "Loaded accounts");
        debug!(
            target: "nmdcd::loadingdebug",
            accounts = ?state.accounts.keys().collect::<Vec<_>>(),
            "Loaded accounts"
        );

        for row in active {
            if let Some(kind) = PunishKind::from_type_id(row.eventtypeid) {
                state.events.insert(kind, &row.entry, row.until);
            }
        }
        for kind in PunishKind::ALL {
            info!(
                target: "nmdcd::loading",
                count = state.events.map(kind).len(),
                kind = kind.name(),
                "Loaded punishments"
            );
        }

        for row in torrents {
            // Only approved rows carry an approver; pending ones stay pending.
            let addedby = state
                .oids
                .get(&row.addedby)
                .cloned()
                .unwrap_or_else(|| "?".to_string());
            let approvalby = row.approvalby.and_then(|oid| state.oids.get(&oid).cloned());
            state.torrents.insert(
                row.oid,
                Torrent {
                    oid: row.oid,
                    location: row.location,
                    description: row.description,
                    addedby,
                    addedtime: row.addedtime,
                    approvalby,
                    approvaltime: row.approvaltime,
                },
            );
        }
        info!(target: "nmdcd::loading", count = state.torrents.len(), "Loaded torrents");

        crate::bots::install_bots(self, &mut state, &self.config.hub.reloadmodules)
            .map_err(HubError::BadArgument)?;
        Ok(())
    }

    /// Accept a new connection: check IP bans, create the session, and
    /// greet it with `$Lock`. `Err(BannedIp)` means the caller must drop
    /// the socket.
    pub async fn add_user(
        &self,
        ip: String,
        port: u16,
        tx: mpsc::UnboundedSender<String>,
        kill: oneshot::Sender<()>,
    ) -> Result<SessionId, HubError> {
        let mut state = self.state.lock().await;
        if state.shutting_down {
            return Err(HubError::Shutdown);
        }
        let now = unix_now();
        if let Some((entry, status)) = state.events.ip_ban_match(&ip, now) {
            match status {
                EventStatus::Active(_) => {
                    debug!(target: "nmdcd::useradderror", ip = %ip, entry = %entry, "Banned IP, disconnecting");
                    return Err(HubError::BannedIp(entry));
                }
                _ => {
                    // Scrub the stale ban on this path, mirroring storage.
                    state.events.remove(PunishKind::Ban, &entry);
                    self.tasks.submit(Task::DeleteActiveEvent {
                        kind: PunishKind::Ban,
                        entry,
                    });
                }
            }
        }

        let counter = self.session_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let sid = counter;
        let idstring = format!("{}:{}#{}", ip, port, counter);
        let lock = generate_lock(&mut state.rng);
        let session = Session::new(sid, ip, idstring.clone(), lock.clone(), tx, kill);
        session.send_msg(&Message::Lock {
            lock,
            pk: LOCK_PK.to_string(),
        });
        state.sessions.insert(sid, session);
        info!(session = %idstring, "User added");
        Ok(sid)
    }

    /// Lock the state and remove one session.
    pub async fn remove_session(&self, sid: SessionId, reason: &str) {
        let mut state = self.state.lock().await;
        remove_user(self, &mut state, sid, reason);
    }

    /// Graceful shutdown: seal the roster, notify everyone, drain the task
    /// queue, then signal every task to stop.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.lock().await;
            state.shutting_down = true;
            state.security_chat("Hub is shutting down");
            let sids: Vec<SessionId> = state.sessions.keys().copied().collect();
            for sid in sids {
                if let Some(session) = state.session_mut(sid) {
                    session.close();
                }
            }
        }
        self.tasks
            .drain(std::time::Duration::from_secs(self.config.hub.cleanuptime))
            .await;
        self.tasks
            .stop(self.config.effective_taskrunners());
        let _ = self.shutdown.send(());
    }
}

/// Complete a login: index the session, apply command sets, run the join
/// broadcast, and record history.
pub fn login_user(hub: &Hub, state: &mut HubState, sid: SessionId) {
    let options = hub.options.read().clone();
    let (nick, ip, has_account, account_verified) = {
        let Some(session) = state.session(sid) else {
            return;
        };
        let account = session
            .account
            .as_ref()
            .and_then(|nick| state.accounts.get(nick));
        (
            session.nick.clone(),
            session.ip.clone(),
            account.is_some(),
            account.is_some_and(|a| a.verified),
        )
    };
    let is_op = state.accounts.get(&nick).is_some_and(|a| a.op);
    {
        let session = state.session_mut(sid).expect("session checked above");
        session.loggedin = true;
        session.stage = LoginStage::Active;
        session.op = is_op;
        session.jointime = unix_now();
        session.validcommands = dispatch::base_user_commands();
        if is_op {
            session.validcommands.extend(dispatch::op_commands());
        }
        if !options.restrictunverifiedusers {
            session
                .validcommands
                .extend(dispatch::verified_user_commands());
        }
    }
    state.nicks.insert(nick.clone(), sid);
    if is_op {
        state.ops.insert(nick.clone(), sid);
    }

    // Tell the roster, then hand the joiner its peers.
    let hello = Message::Hello(nick.clone()).to_string();
    for session in state.sessions.values() {
        if session.loggedin && session.id != sid {
            session.send(hello.clone());
        }
    }
    let peer_infos: Vec<String> = state
        .nicklist()
        .iter()
        .filter(|peer| **peer != nick)
        .filter_map(|peer| state.myinfo_for(peer))
        .map(|info| Message::MyInfo(info).to_string())
        .collect();
    if let Some(session) = state.session(sid) {
        for frame in peer_infos {
            session.send(frame);
        }
    }
    if let Some(info) = state.myinfo_for(&nick) {
        state.broadcast_frame(&Message::MyInfo(info).to_string());
    }
    if is_op {
        state.give_op_list();
    }

    // Account bookkeeping rides the worker pool.
    if has_account {
        hub.tasks.submit(Task::RecordJoin {
            sid,
            nick: nick.clone(),
            ip,
        });
        if account_verified {
            verify_user(hub, state, sid, true);
        }
    } else {
        hub.tasks.submit(Task::CreateAccountAndJoin {
            sid,
            nick: nick.clone(),
            ip,
        });
    }

    let (verified, description) = {
        let session = state.session(sid).expect("session checked above");
        (session.verified, session.description.clone())
    };
    if !verified {
        if options.restrictunverifiedusers {
            state.notice(
                sid,
                "*********\nNOTE: You are an unverified user, you have no search or \
                 download privileges. Make sure you are following the rules, and you \
                 will be verified as soon as an operator can check you. Please be \
                 patient, as there may not be an op around right away.\n*********",
            );
        }
        let botname = hub.config.hub.advancedbotname.clone();
        state.pm_ops(&botname, &format!("Unverified user joined: <{}>", nick));
    }
    if !options.descriptionstart.is_empty()
        && !description
            .to_lowercase()
            .starts_with(&options.descriptionstart.to_lowercase())
    {
        let botname = hub.config.hub.advancedbotname.clone();
        state.pm_ops(
            &botname,
            &format!("<{}> has a bad description: {:?}", nick, description),
        );
    }
    for line in &hub.config.hub.motd {
        state.notice(sid, line);
    }
    info!(nick = %nick, "User logged in");

    let outcome = GiveOutcome::LoggedIn { sid, nick };
    for hook in state.hooks.after_hooks(Verb::LoginUser) {
        hook.after(hub, state, &outcome);
    }
}

/// Remove a session from the hub: deindex it everywhere, close the
/// socket, and note how long the user was connected.
pub fn remove_user(hub: &Hub, state: &mut HubState, sid: SessionId, reason: &str) {
    let Some(session) = state.sessions.get(&sid) else {
        return;
    };
    let nick = session.nick.clone();
    let was_logged_in = session.loggedin;

    for hook in state.hooks.before_hooks(Verb::RemoveUser) {
        // Pre-hooks may veto their own side-effects, never the removal.
        let _ = hook.before(hub, state, sid, Verb::RemoveUser, None);
    }

    let Some(mut session) = state.sessions.remove(&sid) else {
        return;
    };
    session.close();
    if !nick.is_empty() {
        if state.nicks.get(&nick) == Some(&sid) {
            state.nicks.remove(&nick);
        }
        state.ops.remove(&nick);
    }
    if was_logged_in && !nick.is_empty() && !state.shutting_down {
        state.broadcast_frame(&Message::Quit(nick.clone()).to_string());
    }
    if let Some(join_oid) = session.joinoid {
        hub.tasks.submit(Task::FinishJoin {
            join_oid,
            duration_secs: unix_now() - session.jointime,
        });
    }
    info!(session = %session.idstring, reason = %reason, "User removed");

    if was_logged_in && !nick.is_empty() {
        let outcome = GiveOutcome::Removed { sid, nick };
        for hook in state.hooks.after_hooks(Verb::RemoveUser) {
            hook.after(hub, state, &outcome);
        }
    }
}

/// Kick a session with a public ban notice. The actual removal follows
/// through the connection teardown path.
pub fn kick_ban(state: &mut HubState, sid: SessionId, banlength: &str, reason: &str) {
    let Some(session) = state.session(sid) else {
        return;
    };
    let text = format!(
        "{} is being kickbanned for {} because {}",
        session.nick, banlength, reason
    );
    state.security_chat(&text);
    if let Some(session) = state.session_mut(sid) {
        session.close();
    }
}

/// Flip a logged-in session's verified status, adjusting its command set.
pub fn verify_user(hub: &Hub, state: &mut HubState, sid: SessionId, verify: bool) {
    let nick;
    {
        let Some(session) = state.session_mut(sid) else {
            return;
        };
        session.verified = verify;
        if verify {
            session
                .validcommands
                .extend(dispatch::verified_user_commands());
        } else if hub.options.read().restrictunverifiedusers {
            for verb in dispatch::verified_user_commands() {
                session.validcommands.remove(&verb);
            }
        }
        nick = session.nick.clone();
    }
    let prompt = verify
        && state
            .accounts
            .get(&nick)
            .is_some_and(|a| a.password.is_empty());
    if prompt {
        let botname = hub.config.hub.advancedbotname.clone();
        if state.bots.contains_key(&botname) {
            state.pm(
                &botname,
                sid,
                &format!(
                    "You have been verified. Please give your account a password by \
                     sending \"password yourpassword\" to {} (e.g. \"password rosebud\" \
                     sets your password to rosebud).",
                    botname
                ),
            );
        }
    }
}

/// Verify or unverify an account, recording history and updating any
/// logged-in session using it.
pub fn verify_nick(
    hub: &Hub,
    state: &mut HubState,
    nick: &str,
    by: Option<SessionId>,
    note: &str,
    verify: bool,
) -> Result<(), HubError> {
    let Some(account) = state.accounts.get_mut(nick) else {
        return Err(HubError::UnknownAccount(nick.to_string()));
    };
    account.verified = verify;
    let noteby = by
        .and_then(|sid| state.session(sid))
        .map(|s| s.nick.clone());
    hub.tasks.submit(Task::SetAccountVerified {
        nick: nick.to_string(),
        verified: verify,
    });
    hub.tasks.submit(Task::AppendHistory {
        account: nick.to_string(),
        eventtypeid: crate::state::events::VERIFY_TYPE_ID,
        noteby,
        note: format!("{}/{}", if verify { "verify" } else { "unverify" }, note),
    });
    if let Some(&sid) = state.nicks.get(nick) {
        verify_user(hub, state, sid, verify);
    }
    Ok(())
}

/// Grant or revoke op status, effective immediately for a logged-in user.
pub fn make_op(hub: &Hub, state: &mut HubState, nick: &str, op: bool) -> Result<(), HubError> {
    let Some(account) = state.accounts.get_mut(nick) else {
        return Err(HubError::UnknownAccount(nick.to_string()));
    };
    account.op = op;
    hub.tasks.submit(Task::SetAccountOp {
        nick: nick.to_string(),
        op,
    });
    if let Some(&sid) = state.nicks.get(nick) {
        if let Some(session) = state.session_mut(sid) {
            session.op = op;
            if op {
                session.validcommands.extend(dispatch::op_commands());
            } else {
                for verb in dispatch::op_commands() {
                    session.validcommands.remove(&verb);
                }
            }
        }
        if op {
            state.ops.insert(nick.to_string(), sid);
        } else {
            state.ops.remove(nick);
        }
        state.give_op_list();
    }
    Ok(())
}

/// Change an account's password, in memory and in storage.
pub fn change_password(
    hub: &Hub,
    state: &mut HubState,
    nick: &str,
    password: &str,
) -> Result<(), HubError> {
    let Some(account) = state.accounts.get_mut(nick) else {
        return Err(HubError::UnknownAccount(nick.to_string()));
    };
    account.password = password.to_string();
    hub.tasks.submit(Task::SetAccountPassword {
        nick: nick.to_string(),
        password: password.to_string(),
    });
    Ok(())
}

/// Turn unverified-user restriction on or off, adjusting every affected
/// session's command set.
pub fn enforce_verification(hub: &Hub, state: &mut HubState, enforce: bool) {
    {
        let mut options = hub.options.write();
        if options.restrictunverifiedusers == enforce {
            return;
        }
        options.restrictunverifiedusers = enforce;
    }
    for session in state.sessions.values_mut() {
        if !session.loggedin || session.verified {
            continue;
        }
        if enforce {
            for verb in dispatch::verified_user_commands() {
                session.validcommands.remove(&verb);
            }
        } else {
            session
                .validcommands
                .extend(dispatch::verified_user_commands());
        }
    }
}
