//! Op-only verbs: Kick, OpForceMove, Close, ReloadBots.

use nmdc_proto::Message;
use tracing::warn;

use crate::dispatch::GiveOutcome;
use crate::error::{CheckResult, Deny, HubError};
use crate::state::{Hub, HubState, SessionId};

pub fn check(_hub: &Hub, state: &mut HubState, sid: SessionId, msg: Message) -> CheckResult<Message> {
    // The whitelist already gates these on op status; the target checks
    // are what remain.
    let Some(session) = state.session(sid) else {
        return Err(Deny(HubError::NotPermitted));
    };
    if !session.op {
        return Err(Deny(HubError::NotPermitted));
    }
    let target: Option<String> = match &msg {
        Message::Kick(nick) | Message::Close(nick) => Some(nick.clone()),
        Message::OpForceMove { who, .. } => Some(who.clone()),
        _ => None,
    };
    if let Some(target) = target {
        if state.bots.contains_key(&target) {
            return Err(Deny(HubError::NotPermitted));
        }
        if !state.nicks.contains_key(&target) {
            return Err(Deny(HubError::UnknownAccount(target)));
        }
    }
    Ok(msg)
}

pub fn give(hub: &Hub, state: &mut HubState, sid: SessionId, msg: Message) -> GiveOutcome {
    let op_nick = state
        .session(sid)
        .map(|s| s.nick.clone())
        .unwrap_or_default();
    match msg {
        Message::Kick(nick) => {
            let target_sid = state.nicks.get(&nick).copied();
            if let Some(target_sid) = target_sid {
                state.notice(target_sid, &format!("You are being kicked by {}", op_nick));
                state.security_chat(&format!("{} is being kicked by {}", nick, op_nick));
                if let Some(target) = state.session_mut(target_sid) {
                    target.close();
                }
            }
            GiveOutcome::None
        }

        Message::OpForceMove { who, dest, reason } => {
            let target_sid = state.nicks.get(&who).copied();
            if let Some(target_sid) = target_sid {
                state.notice(
                    target_sid,
                    &format!("You are being redirected to {}: {}", dest, reason),
                );
                if let Some(target) = state.session(target_sid) {
                    target.send_msg(&Message::ForceMove(dest.clone()));
                }
                state.security_chat(&format!("{} is being redirected to {}", who, dest));
                if let Some(target) = state.session_mut(target_sid) {
                    target.close();
                }
            }
            GiveOutcome::None
        }

        Message::Close(nick) => {
            let target_sid = state.nicks.get(&nick).copied();
            if let Some(target_sid) = target_sid {
                if let Some(target) = state.session_mut(target_sid) {
                    target.close();
                }
            }
            GiveOutcome::None
        }

        Message::ReloadBots => match crate::bots::reload_bots(hub, state) {
            Ok(()) => GiveOutcome::Reloaded,
            Err(error) => {
                warn!(error = %error, "Bot reload failed, keeping previous bots");
                state.security_chat(&format!("Bot reload failed: {}", error));
                GiveOutcome::None
            }
        },

        _ => GiveOutcome::None,
    }
}
