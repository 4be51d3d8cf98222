//! The administrative bot.
//!
//! Ops (and for a couple of commands, verified users) drive the hub by
//! private-messaging this bot lines of the form `command args`. Most
//! commands effect immediately under the lock and mirror to storage
//! through the worker pool.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::bots::{bot_reply, Bot};
use crate::state::events::{self, PunishKind, NOTE_TYPE_ID};
use crate::state::{hub as hub_ops, unix_now, EventStatus, Hub, HubState, SessionId};
use crate::tasks::Task;

fn torrent_location_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(http|ftp)://.*\.torrent$").expect("static regex"))
}

/// Commands usable without op status (verified users only).
const NON_OP_COMMANDS: [&str; 2] = ["torrent", "password"];

/// The administrative bot.
pub struct AdminBot {
    nick: String,
}

impl AdminBot {
    pub fn new(nick: String) -> Self {
        Self { nick }
    }

    fn reply(&self, state: &HubState, sid: SessionId, text: &str) {
        state.pm(&self.nick, sid, text);
    }
}

impl Bot for AdminBot {
    fn nick(&self) -> &str {
        &self.nick
    }

    fn description(&self) -> &str {
        "Hub administration"
    }

    fn process_command(&self, hub: &Hub, state: &mut HubState, sid: SessionId, text: &str) {
        let text = text.trim();
        let (command, args) = match text.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (text, ""),
        };

        let (is_op, is_verified) = match state.session(sid) {
            Some(session) => (session.op, session.verified),
            None => return,
        };
        if NON_OP_COMMANDS.contains(&command) {
            if !is_verified {
                return self.reply(
                    state,
                    sid,
                    "Only verified users can get/post torrents or change their password.",
                );
            }
        } else if !is_op {
            return;
        }

        match command {
            "ban" => self.punish(hub, state, sid, args, PunishKind::Ban),
            "silence" => self.punish(hub, state, sid, args, PunishKind::Silence),
            "stupidify" => self.punish(hub, state, sid, args, PunishKind::Stupidify),
            "verify" => self.verify(hub, state, sid, args, true),
            "unverify" => self.verify(hub, state, sid, args, false),
            "note" => self.note(hub, state, sid, args),
            "history" => self.history(hub, state, sid, args),
            "hostname" => self.hostname(hub, state, sid, args),
            "list" => self.list(hub, state, sid, args),
            "torrent" => self.torrent(hub, state, sid, args),
            "password" => self.password(hub, state, sid, args),
            "getpassword" => self.getpassword(hub, state, sid, args),
            "chat" => {
                state.chat_all(&self.nick, &nmdc_proto::escape(args));
            }
            "scrub" => self.scrub(hub, state, sid, args),
            "query" | "dump" | "set-option" | "makeop" | "unmakeop" => {
                self.scripted(hub, state, sid, command, args)
            }
            other => self.reply(state, sid, &format!("Bad command - {}", other)),
        }
    }
}

/// Entry, deadline, reason, and punished nick parsed out of a punishment
/// command.
struct ParsedPunishment {
    entry: String,
    until: i64,
    reason: String,
    punishee: String,
}

impl AdminBot {
    /// Parse `entry duration [reason]`, resolving `<>nick` to the
    /// session's address and validating IP prefixes.
    fn parse_punishment(
        &self,
        state: &HubState,
        args: &str,
    ) -> Result<ParsedPunishment, String> {
        let (entry_raw, rest) = args
            .split_once(char::is_whitespace)
            .ok_or_else(|| "expected: entry duration [reason]".to_string())?;
        let (duration_raw, reason) = match rest.trim().split_once(char::is_whitespace) {
            Some((duration, reason)) => (duration, reason.trim().to_string()),
            None => (rest.trim(), String::new()),
        };
        let seconds =
            events::parse_duration(duration_raw).map_err(|e| e.to_string())?;
        let until = unix_now() + seconds;

        let mut punishee = String::new();
        let entry = if let Some(nick) = entry_raw.strip_prefix('%') {
            punishee = nick.to_string();
            entry_raw.to_string()
        } else if let Some(nick) = entry_raw.strip_prefix("<>") {
            // Punish the address of whoever is using the nick right now.
            punishee = nick.to_string();
            let Some(session) = state.by_nick(nick) else {
                return Err(format!("<{}> is not logged on", nick));
            };
            session.ip.clone()
        } else {
            events::validate_ip_prefix(entry_raw).map_err(|e| e.to_string())?;
            entry_raw.to_string()
        };
        Ok(ParsedPunishment {
            entry,
            until,
            reason,
            punishee,
        })
    }

    fn punish(&self, hub: &Hub, state: &mut HubState, sid: SessionId, args: &str, kind: PunishKind) {
        let parsed = match self.parse_punishment(state, args) {
            Ok(parsed) => parsed,
            Err(error) => return self.reply(state, sid, &format!("Error: {}", error)),
        };
        let now = unix_now();
        let op_nick = state.session(sid).map(|s| s.nick.clone());
        let shown = if parsed.punishee.is_empty() {
            parsed.entry.clone()
        } else {
            parsed.punishee.clone()
        };

        if parsed.until <= now {
            // A deadline in the past is a removal.
            if state.events.remove(kind, &parsed.entry) {
                hub.tasks.submit(Task::DeleteActiveEvent {
                    kind,
                    entry: parsed.entry.clone(),
                });
                if !parsed.punishee.is_empty() {
                    hub.tasks.submit(Task::AppendHistory {
                        account: parsed.punishee.clone(),
                        eventtypeid: kind.type_id(),
                        noteby: op_nick,
                        note: "removed".to_string(),
                    });
                }
                bot_reply(hub, state, sid, &format!("{} removed for <{}>", kind.name(), shown));
            } else {
                self.reply(
                    state,
                    sid,
                    &format!("{} does not exist for <{}>", kind.name(), shown),
                );
            }
            return;
        }

        let updated = matches!(
            state.events.check(kind, &parsed.entry, now),
            EventStatus::Active(_)
        );
        state.events.insert(kind, &parsed.entry, parsed.until);
        hub.tasks.submit(Task::UpsertActiveEvent {
            kind,
            entry: parsed.entry.clone(),
            until: parsed.until,
        });
        if !parsed.punishee.is_empty() {
            hub.tasks.submit(Task::AppendHistory {
                account: parsed.punishee.clone(),
                eventtypeid: kind.type_id(),
                noteby: op_nick,
                note: format!(
                    "{}/{}/{}",
                    if updated { "updated" } else { "added" },
                    parsed.until - now,
                    parsed.reason
                ),
            });
        }

        if kind == PunishKind::Ban {
            // Bans take effect immediately for everyone matching.
            let targets: Vec<SessionId> = state
                .sessions
                .values()
                .filter(|s| {
                    if let Some(nick) = parsed.entry.strip_prefix('%') {
                        s.nick == nick
                    } else {
                        s.ip.starts_with(&parsed.entry)
                    }
                })
                .map(|s| s.id)
                .collect();
            for target in targets {
                hub_ops::kick_ban(state, target, &format!("{}s", parsed.until - now), &parsed.reason);
            }
        }
        info!(kind = kind.name(), entry = %parsed.entry, until = parsed.until, "Punishment stored");
        bot_reply(
            hub,
            state,
            sid,
            &format!(
                "{} {} for <{}>",
                kind.name(),
                if updated { "updated" } else { "added" },
                shown
            ),
        );
    }

    fn verify(&self, hub: &Hub, state: &mut HubState, sid: SessionId, args: &str, verify: bool) {
        let kind = if verify { "verif" } else { "unverif" };
        let Some((nick, note)) = args.split_once(char::is_whitespace) else {
            return self.reply(state, sid, "Error: expected nick and note");
        };
        let Some(account) = state.accounts.get(nick) else {
            return self.reply(
                state,
                sid,
                &format!("Error: {} is not in the account database", nick),
            );
        };
        if account.verified == verify {
            return self.reply(
                state,
                sid,
                &format!("Error: {} is already a {}ied user", nick, kind),
            );
        }
        if hub_ops::verify_nick(hub, state, nick, Some(sid), note.trim(), verify).is_ok() {
            let op_nick = state
                .session(sid)
                .map(|s| s.nick.clone())
                .unwrap_or_default();
            state.pm_ops(
                &self.nick,
                &format!("<{}> {}ied by <{}>", nick, kind, op_nick),
            );
        }
    }

    fn note(&self, hub: &Hub, state: &mut HubState, sid: SessionId, args: &str) {
        let Some((nick, note)) = args.split_once(char::is_whitespace) else {
            return self.reply(state, sid, "Error: expected nick and note");
        };
        if !state.accounts.contains_key(nick) {
            return self.reply(
                state,
                sid,
                &format!("Note NOT added for <{}>: no account", nick),
            );
        }
        let op_nick = state.session(sid).map(|s| s.nick.clone());
        hub.tasks.submit(Task::AppendHistory {
            account: nick.to_string(),
            eventtypeid: NOTE_TYPE_ID,
            noteby: op_nick,
            note: note.trim().to_string(),
        });
        bot_reply(hub, state, sid, &format!("Note added for <{}>", nick));
    }

    /// `history nick [typechars] [days]`; days may be fractional.
    fn history(&self, hub: &Hub, state: &mut HubState, sid: SessionId, args: &str) {
        let parts: Vec<&str> = args.split(' ').collect();
        if args.is_empty() || parts.len() > 3 {
            return self.reply(state, sid, "Error: expected nick [types] [days]");
        }
        let nick = parts[0];
        let typechars = parts.get(1).copied().unwrap_or("");
        let days = parts.get(2).copied().unwrap_or("");
        if !state.accounts.contains_key(nick) {
            return self.reply(
                state,
                sid,
                &format!("Error: <{}> not in account database", nick),
            );
        }
        let types: Vec<i64> = typechars
            .chars()
            .filter_map(|c| c.to_digit(10).map(i64::from))
            .collect();
        let days: f64 = if days.is_empty() {
            365.0
        } else {
            match days.parse() {
                Ok(days) => days,
                Err(_) => {
                    return self.reply(state, sid, "Error: days is not a number");
                }
            }
        };
        hub.tasks.submit(Task::History {
            sid,
            nick: nick.to_string(),
            types,
            since_secs: (days * 86400.0) as i64,
        });
    }

    fn hostname(&self, hub: &Hub, state: &mut HubState, sid: SessionId, args: &str) {
        match state.by_nick(args) {
            Some(session) => hub.tasks.submit(Task::Hostname {
                sid,
                nick: args.to_string(),
                ip: session.ip.clone(),
            }),
            None => self.reply(state, sid, &format!("Error: <{}> not connected", args)),
        }
    }

    fn list(&self, hub: &Hub, state: &mut HubState, sid: SessionId, args: &str) {
        if let Some((kind, lookingfor)) = args.split_once(' ') {
            match kind {
                "ip" => hub.tasks.submit(Task::IpSearch {
                    sid,
                    prefix: lookingfor.to_string(),
                }),
                "nick" => {
                    let needle = lookingfor.to_lowercase();
                    let mut hits: Vec<&str> = state
                        .accounts
                        .keys()
                        .filter(|nick| nick.to_lowercase().contains(&needle))
                        .map(String::as_str)
                        .collect();
                    hits.sort_unstable();
                    let reply = if hits.is_empty() {
                        format!("No accounts have {:?} as a substring", lookingfor)
                    } else {
                        format!(
                            "The following accounts have {:?} as a substring: <{}>",
                            lookingfor,
                            hits.join("> <")
                        )
                    };
                    bot_reply(hub, state, sid, &reply);
                }
                other => self.reply(state, sid, &format!("Bad search type: {:?}", other)),
            }
            return;
        }

        let reply = match args {
            "bans" | "silences" | "stupidifies" => {
                let kind = match args {
                    "bans" => PunishKind::Ban,
                    "silences" => PunishKind::Silence,
                    _ => PunishKind::Stupidify,
                };
                let mut lines = vec![format!("{}:", args)];
                let mut entries: Vec<(&String, &i64)> = state.events.map(kind).iter().collect();
                entries.sort();
                for (entry, &until) in entries {
                    lines.push(format!("{}  -  {}", entry, crate::tasks::format_time(hub, until)));
                }
                lines.join("\n")
            }
            "nicks" => format!("<{}>", state.nicklist().join("> <")),
            "users" => {
                let mut nicks: Vec<&str> = state.nicks.keys().map(|n| n.as_str()).collect();
                nicks.sort_unstable();
                format!("<{}>", nicks.join("> <"))
            }
            "ops" => format!("<{}>", state.oplist().join("> <")),
            "accounts" => {
                let mut nicks: Vec<&str> = state.accounts.keys().map(|n| n.as_str()).collect();
                nicks.sort_unstable();
                format!("<{}>", nicks.join("> <"))
            }
            "unverified" => {
                let descriptionstart = hub.options.read().descriptionstart.to_lowercase();
                let mut items: Vec<String> = state
                    .sessions
                    .values()
                    .filter(|s| s.loggedin && !s.verified)
                    .map(|s| {
                        let mode = s
                            .tag
                            .find("M:")
                            .and_then(|idx| s.tag[idx + 2..].chars().next())
                            .unwrap_or('?');
                        let mut item = format!("M:{} {}", mode, s.nick);
                        if !descriptionstart.is_empty()
                            && !s.description.to_lowercase().starts_with(&descriptionstart)
                        {
                            item = format!("BD {}", item);
                        }
                        item
                    })
                    .collect();
                if items.is_empty() {
                    "No unverified users, that's a w00t!".to_string()
                } else {
                    items.sort();
                    format!("Unverified Users: <{}>", items.join("> <"))
                }
            }
            other => format!("Bad list type: {:?}", other),
        };
        bot_reply(hub, state, sid, &reply);
    }

    fn torrent(&self, hub: &Hub, state: &mut HubState, sid: SessionId, args: &str) {
        let is_op = state.session(sid).is_some_and(|s| s.op);
        if args == "get" {
            let lines: Vec<String> = state
                .torrents
                .values()
                .filter(|t| is_op || t.approvalby.is_some())
                .map(|t| {
                    if is_op {
                        format!(
                            "Posted by <{}> - {} - {} - {}",
                            t.addedby, t.oid, t.location, t.description
                        )
                    } else {
                        format!("Posted by <{}> - {} - {}", t.addedby, t.location, t.description)
                    }
                })
                .collect();
            return self.reply(
                state,
                sid,
                &format!("Active Torrents:\n{}", lines.join("\n")),
            );
        }

        if is_op {
            if let Some((action, oid)) = args.split_once(' ') {
                if action == "approve" || action == "remove" {
                    let Ok(oid) = oid.trim().parse::<i64>() else {
                        return self.reply(state, sid, "Error: torrent id is not a number");
                    };
                    if !state.torrents.contains_key(&oid) {
                        return self.reply(state, sid, "Error: torrent id is not valid");
                    }
                    if action == "approve" {
                        return self.approve_torrent(hub, state, sid, oid);
                    }
                    return self.remove_torrent(hub, state, sid, oid);
                }
            }
        }

        // Anything else is a posting: location then description.
        let Some((location, description)) = args.split_once(char::is_whitespace) else {
            return self.reply(state, sid, "Error: wrong format for torrent post");
        };
        let description = description.trim();
        if !torrent_location_re().is_match(location) {
            return self.reply(
                state,
                sid,
                "Error: torrent location must start with http:// or ftp:// and must end in .torrent",
            );
        }
        if description.is_empty() {
            return self.reply(state, sid, "Error: torrent description is empty");
        }
        if state.torrents.values().any(|t| t.location == location) {
            return self.reply(
                state,
                sid,
                "Error: torrent has already been added (might not be approved yet).",
            );
        }
        let Some(nick) = state.session(sid).map(|s| s.nick.clone()) else {
            return;
        };
        hub.tasks.submit(Task::AddTorrent {
            sid,
            nick,
            location: location.to_string(),
            description: description.to_string(),
        });
    }

    fn approve_torrent(&self, hub: &Hub, state: &mut HubState, sid: SessionId, oid: i64) {
        let op_nick = state
            .session(sid)
            .map(|s| s.nick.clone())
            .unwrap_or_default();
        if let Some(by) = state
            .torrents
            .get(&oid)
            .and_then(|t| t.approvalby.clone())
        {
            return self.reply(
                state,
                sid,
                &format!("Error: torrent already approved by <{}>", by),
            );
        }
        let announce = {
            let Some(torrent) = state.torrents.get_mut(&oid) else {
                return;
            };
            torrent.approvalby = Some(op_nick.clone());
            torrent.approvaltime = Some(unix_now());
            format!(
                "Torrent added by <{}>: {} - {}",
                torrent.addedby, torrent.location, torrent.description
            )
        };
        hub.tasks.submit(Task::ApproveTorrent { oid, by: op_nick });
        state.security_chat(&announce);
        bot_reply(hub, state, sid, &format!("Torrent id {} approved", oid));
    }

    fn remove_torrent(&self, hub: &Hub, state: &mut HubState, sid: SessionId, oid: i64) {
        let op_nick = state
            .session(sid)
            .map(|s| s.nick.clone())
            .unwrap_or_default();
        debug!(target: "nmdcd::torrent", oid, by = %op_nick, "Torrent removed");
        state.torrents.remove(&oid);
        hub.tasks.submit(Task::DeactivateTorrent { oid });
        bot_reply(hub, state, sid, &format!("Torrent id {} removed", oid));
    }

    fn password(&self, hub: &Hub, state: &mut HubState, sid: SessionId, args: &str) {
        let password = args.trim();
        let Some(nick) = state.session(sid).map(|s| s.nick.clone()) else {
            return;
        };
        if hub_ops::change_password(hub, state, &nick, password).is_ok() {
            self.reply(
                state,
                sid,
                &format!("Your password has been changed to: {}", password),
            );
            self.reply(
                state,
                sid,
                "Be sure to use this password when you reconnect to the hub.",
            );
        }
    }

    fn getpassword(&self, _hub: &Hub, state: &mut HubState, sid: SessionId, args: &str) {
        let Some(account) = state.accounts.get(args) else {
            return self.reply(
                state,
                sid,
                &format!("Account doesn't exist for user {:?}", args),
            );
        };
        if account.op {
            return self.reply(state, sid, "Sorry, can't get passwords for ops");
        }
        let reply = format!("User {:?} has password {:?}", args, account.password);
        self.reply(state, sid, &reply);
    }

    fn scrub(&self, hub: &Hub, state: &mut HubState, sid: SessionId, args: &str) {
        let kinds: Vec<PunishKind> = if args.is_empty() {
            PunishKind::ALL.to_vec()
        } else {
            args.chars()
                .filter_map(|c| c.to_digit(10))
                .filter_map(|d| PunishKind::from_type_id(d as i64))
                .collect()
        };
        let now = unix_now();
        for kind in kinds {
            let removed = state.events.scrub(kind, now);
            debug!(kind = kind.name(), removed = removed.len(), "Scrubbed punishments");
            hub.tasks.submit(Task::ScrubEvents { kind });
            bot_reply(hub, state, sid, &format!("{} list scrubbed", kind.name()));
        }
    }

    /// The bounded administrative RPC that replaces in-band code
    /// execution: read-only queries, data dumps, option changes, and op
    /// grants, all gated on the `PythonBot` capability tag.
    fn scripted(&self, hub: &Hub, state: &mut HubState, sid: SessionId, verb: &str, args: &str) {
        let allowed = state
            .session(sid)
            .and_then(|s| s.account.as_deref())
            .and_then(|nick| state.accounts.get(nick))
            .is_some_and(|a| a.args.contains("PythonBot"));
        if !allowed {
            return self.reply(state, sid, "Sorry, no scripted access for you");
        }

        match verb {
            "query" => {
                if !args.trim_start().to_uppercase().starts_with("SELECT") {
                    return self.reply(state, sid, "Error: only SELECT queries are allowed");
                }
                hub.tasks.submit(Task::RunQuery {
                    sid,
                    sql: args.to_string(),
                });
            }
            "dump" => {
                let reply = match args {
                    "accounts" => {
                        let mut lines: Vec<String> = state
                            .accounts
                            .values()
                            .map(|a| {
                                format!(
                                    "{} oid={} op={} verified={} args={:?}",
                                    a.nick, a.oid, a.op, a.verified, a.args
                                )
                            })
                            .collect();
                        lines.sort();
                        lines.join("\n")
                    }
                    "events" => {
                        let mut lines = Vec::new();
                        for kind in PunishKind::ALL {
                            for (entry, until) in state.events.map(kind) {
                                lines.push(format!("{} {} until={}", kind.name(), entry, until));
                            }
                        }
                        lines.sort();
                        lines.join("\n")
                    }
                    "torrents" => state
                        .torrents
                        .values()
                        .map(|t| {
                            format!(
                                "{} {} by={} approved={}",
                                t.oid,
                                t.location,
                                t.addedby,
                                t.approvalby.as_deref().unwrap_or("-")
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n"),
                    other => format!("Bad dump target: {:?}", other),
                };
                bot_reply(hub, state, sid, &reply);
            }
            "set-option" => {
                let Some((name, value)) = args.split_once(char::is_whitespace) else {
                    return self.reply(state, sid, "Error: expected option name and value");
                };
                let value = value.trim();
                let reply = match name {
                    "restrictunverifiedusers" => match value.parse::<bool>() {
                        Ok(on) => {
                            hub_ops::enforce_verification(hub, state, on);
                            format!("restrictunverifiedusers = {}", on)
                        }
                        Err(_) => "Error: expected true or false".to_string(),
                    },
                    "stupidfactor" => match value.parse::<u32>() {
                        Ok(v) if v > 0 => {
                            hub.options.write().stupidfactor = v;
                            format!("stupidfactor = {}", v)
                        }
                        _ => "Error: expected a positive integer".to_string(),
                    },
                    "connectchecktime" => match value.parse::<i64>() {
                        Ok(v) if v > 0 => {
                            hub.options.write().connectchecktime = v;
                            format!("connectchecktime = {}", v)
                        }
                        _ => "Error: expected a positive integer".to_string(),
                    },
                    "maxhistoryrows" => match value.parse::<i64>() {
                        Ok(v) if v > 0 => {
                            hub.options.write().maxhistoryrows = v;
                            format!("maxhistoryrows = {}", v)
                        }
                        _ => "Error: expected a positive integer".to_string(),
                    },
                    "descriptionstart" => {
                        hub.options.write().descriptionstart = value.to_string();
                        format!("descriptionstart = {:?}", value)
                    }
                    other => format!("Bad option: {:?}", other),
                };
                self.reply(state, sid, &reply);
            }
            "makeop" | "unmakeop" => {
                let op = verb == "makeop";
                match hub_ops::make_op(hub, state, args, op) {
                    Ok(()) => bot_reply(
                        hub,
                        state,
                        sid,
                        &format!("<{}> {} an op", args, if op { "is now" } else { "is no longer" }),
                    ),
                    Err(e) => self.reply(state, sid, &format!("Error: {}", e)),
                }
            }
            _ => {}
        }
    }
}
