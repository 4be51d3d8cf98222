//! Roster queries: GetINFO and UserIP.

use nmdc_proto::Message;

use crate::dispatch::GiveOutcome;
use crate::error::{CheckResult, Deny, HubError};
use crate::state::{Hub, HubState, SessionId};

pub fn check(_hub: &Hub, state: &mut HubState, sid: SessionId, msg: Message) -> CheckResult<Message> {
    if state.session(sid).is_none() {
        return Err(Deny(HubError::NotPermitted));
    }
    Ok(msg)
}

pub fn give(_hub: &Hub, state: &mut HubState, sid: SessionId, msg: Message) -> GiveOutcome {
    match msg {
        Message::GetInfo { target, .. } => {
            if let Some(info) = state.myinfo_for(&target) {
                if let Some(session) = state.session(sid) {
                    session.send_msg(&Message::MyInfo(info));
                }
            }
            GiveOutcome::None
        }
        Message::UserIp(nicks) => {
            let pairs: Vec<(String, String)> = nicks
                .iter()
                .filter_map(|nick| {
                    state
                        .by_nick(nick)
                        .map(|session| (nick.clone(), session.ip.clone()))
                })
                .collect();
            if let Some(session) = state.session(sid) {
                if !pairs.is_empty() {
                    session.send_msg(&Message::UserIpReply(pairs));
                }
            }
            GiveOutcome::None
        }
        _ => GiveOutcome::None,
    }
}
