//! The login handshake: Lock/Key, ValidateNick, MyPass, Version,
//! GetNickList, and MyINFO.
//!
//! Stage transitions are enforced twice: the whitelist only admits the
//! verbs of the current stage, and the give functions replace the
//! whitelist on every transition.

use std::collections::HashSet;

use nmdc_proto::{key_for, Message};
use tracing::{debug, info};

use crate::dispatch::{GiveOutcome, Verb};
use crate::error::{CheckResult, Deny, HubError};
use crate::state::events::PunishKind;
use crate::state::{hub as hub_ops, unix_now};
use crate::state::{EventStatus, Hub, HubState, LoginStage, SessionId};
use crate::tasks::Task;

fn joining_commands() -> HashSet<Verb> {
    HashSet::from([Verb::Version, Verb::GetNickList, Verb::MyInfo])
}

/// Validate a handshake verb.
pub fn check(hub: &Hub, state: &mut HubState, sid: SessionId, msg: Message) -> CheckResult<Message> {
    match msg {
        Message::Key(key) => {
            check_key(state, sid, &key)?;
            Ok(Message::Key(key))
        }
        Message::ValidateNick(nick) => {
            check_validate_nick(hub, state, sid, &nick)?;
            Ok(Message::ValidateNick(nick))
        }
        Message::MyPass(pass) => {
            check_my_pass(state, sid, &pass)?;
            Ok(Message::MyPass(pass))
        }
        Message::MyInfo(info) => {
            check_my_info(hub, state, sid, &info)?;
            Ok(Message::MyInfo(info))
        }
        // Version and GetNickList carry nothing to validate.
        other => Ok(other),
    }
}

fn check_key(state: &mut HubState, sid: SessionId, key: &str) -> CheckResult<()> {
    let Some(session) = state.session(sid) else {
        return Err(Deny(HubError::NotPermitted));
    };
    if key == key_for(&session.lock) {
        return Ok(());
    }
    debug!(session = %session.idstring, "Bad key for lock, closing");
    if let Some(session) = state.session_mut(sid) {
        session.close();
    }
    Err(Deny(HubError::NotPermitted))
}

fn check_validate_nick(
    hub: &Hub,
    state: &mut HubState,
    sid: SessionId,
    nick: &str,
) -> CheckResult<()> {
    if nick.is_empty() || nick.len() > 64 || nick.contains([' ', '$', '|']) {
        if let Some(session) = state.session(sid) {
            session.send_msg(&Message::ValidateDenide(nick.to_string()));
        }
        return Err(Deny(HubError::BadArgument(format!("bad nick {nick:?}"))));
    }

    // An active %nick ban refuses the login; a stale one is scrubbed here.
    let entry = format!("%{}", nick);
    match state.events.check(PunishKind::Ban, &entry, unix_now()) {
        EventStatus::Active(until) => {
            let until = crate::tasks::format_time(hub, until);
            state.notice(
                sid,
                &format!(
                    "You are currently banned from this hub. You will be allowed to \
                     connect after {}.",
                    until
                ),
            );
            if let Some(session) = state.session_mut(sid) {
                session.send_msg(&Message::ValidateDenide(nick.to_string()));
                session.close();
            }
            return Err(Deny(HubError::BannedNick(nick.to_string())));
        }
        EventStatus::Expired => {
            state.events.remove(PunishKind::Ban, &entry);
            hub.tasks.submit(Task::DeleteActiveEvent {
                kind: PunishKind::Ban,
                entry,
            });
        }
        EventStatus::Absent => {}
    }

    if state.nick_in_use(nick) {
        if let Some(session) = state.session(sid) {
            session.send_msg(&Message::ValidateDenide(nick.to_string()));
        }
        return Err(Deny(HubError::NickInUse(nick.to_string())));
    }

    if hub.config.hub.privatehub && !state.accounts.contains_key(nick) {
        if let Some(session) = state.session(sid) {
            session.send_msg(&Message::ValidateDenide(nick.to_string()));
        }
        return Err(Deny(HubError::UnknownAccount(nick.to_string())));
    }
    Ok(())
}

fn check_my_pass(state: &mut HubState, sid: SessionId, pass: &str) -> CheckResult<()> {
    let ok = {
        let Some(session) = state.session(sid) else {
            return Err(Deny(HubError::NotPermitted));
        };
        session
            .account
            .as_deref()
            .and_then(|nick| state.accounts.get(nick))
            .is_some_and(|account| account.password == pass)
    };
    if ok {
        return Ok(());
    }
    if let Some(session) = state.session_mut(sid) {
        session.send_msg(&Message::BadPass);
        session.close();
    }
    Err(Deny(HubError::BadPassword))
}

fn check_my_info(
    hub: &Hub,
    state: &mut HubState,
    sid: SessionId,
    info: &nmdc_proto::MyInfo,
) -> CheckResult<()> {
    {
        let Some(session) = state.session(sid) else {
            return Err(Deny(HubError::NotPermitted));
        };
        if info.nick != session.nick {
            return Err(Deny(HubError::BadArgument("MyINFO nick mismatch".into())));
        }
    }
    if !hub.options.read().restrictunverifiedusers {
        return Ok(());
    }
    // Client policy on restricted hubs: no tagless or original Neo-Modus
    // clients, and no clients with every slot closed.
    if info.tag.is_empty() || info.tag.starts_with("<DC ") {
        state.notice(
            sid,
            "I'm sorry, but NMDC is not allowed on this hub, because it allows you \
             to be cloned. Please use another client, such as DC++ \
             (http://dcplusplus.sourceforge.net/).",
        );
        if let Some(session) = state.session_mut(sid) {
            session.close();
        }
        return Err(Deny(HubError::NotPermitted));
    }
    if info.tag.contains(",S:0") {
        if let Some(session) = state.session_mut(sid) {
            session.close();
        }
        return Err(Deny(HubError::NotPermitted));
    }
    Ok(())
}

/// Apply a handshake verb.
pub fn give(hub: &Hub, state: &mut HubState, sid: SessionId, msg: Message) -> GiveOutcome {
    match msg {
        Message::Key(_) => {
            if let Some(session) = state.session_mut(sid) {
                session.stage = LoginStage::ValidatingNick;
                session.validcommands = HashSet::from([Verb::ValidateNick]);
            }
            GiveOutcome::None
        }

        Message::ValidateNick(nick) => {
            let has_password = state
                .accounts
                .get(&nick)
                .is_some_and(|account| !account.password.is_empty());
            let has_account = state.accounts.contains_key(&nick);
            // Reserve the nick now; uniqueness is decided here, not at
            // login, so a racing ValidateNick loses immediately.
            state.nicks.insert(nick.clone(), sid);
            if let Some(session) = state.session_mut(sid) {
                session.nick = nick.clone();
                if has_account {
                    session.account = Some(nick.clone());
                }
                if has_password {
                    session.stage = LoginStage::Authenticating;
                    session.validcommands = HashSet::from([Verb::MyPass]);
                    session.send_msg(&Message::GetPass);
                } else {
                    session.stage = LoginStage::Joining;
                    session.validcommands = joining_commands();
                    session.send_msg(&Message::Hello(nick.clone()));
                }
                info!(session = %session.idstring, nick = %nick, "Nick validated");
            }
            GiveOutcome::None
        }

        Message::MyPass(_) => {
            if let Some(session) = state.session_mut(sid) {
                session.stage = LoginStage::Joining;
                session.validcommands = joining_commands();
                let hello = Message::Hello(session.nick.clone());
                session.send_msg(&hello);
            }
            GiveOutcome::None
        }

        Message::Version(version) => {
            if let Some(session) = state.session_mut(sid) {
                session.client_version = version;
            }
            GiveOutcome::None
        }

        Message::GetNickList => {
            let nicklist = Message::NickList(state.nicklist());
            let oplist = Message::OpList(state.oplist());
            let hubname = Message::HubName(hub.config.hub.hubname.clone());
            if let Some(session) = state.session(sid) {
                session.send_msg(&nicklist);
                session.send_msg(&oplist);
                session.send_msg(&hubname);
            }
            GiveOutcome::None
        }

        Message::MyInfo(info) => {
            let was_joining = {
                let Some(session) = state.session_mut(sid) else {
                    return GiveOutcome::None;
                };
                session.description = info.description;
                session.tag = info.tag;
                session.speed = info.speed;
                session.speed_class = info.speed_class;
                session.email = info.email;
                session.sharesize = info.share_size;
                session.stage == LoginStage::Joining
            };
            if was_joining {
                hub_ops::login_user(hub, state, sid);
                let nick = state
                    .session(sid)
                    .map(|s| s.nick.clone())
                    .unwrap_or_default();
                GiveOutcome::LoggedIn { sid, nick }
            } else {
                // Roster update from an active session.
                if let Some(session) = state.session(sid) {
                    let frame = Message::MyInfo(session.myinfo()).to_string();
                    state.broadcast_frame(&frame);
                }
                GiveOutcome::None
            }
        }

        _ => GiveOutcome::None,
    }
}
