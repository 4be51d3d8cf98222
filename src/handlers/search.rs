//! Search fan-out and search-result routing.

use nmdc_proto::Message;

use crate::dispatch::GiveOutcome;
use crate::error::{CheckResult, Deny, HubError};
use crate::state::{Hub, HubState, SessionId};

pub fn check(_hub: &Hub, state: &mut HubState, sid: SessionId, msg: Message) -> CheckResult<Message> {
    if let Message::SearchResult { recipient, .. } = &msg {
        // Results go to exactly the named session; anything else drops.
        if !state.nicks.contains_key(recipient) {
            return Err(Deny(HubError::UnknownAccount(recipient.clone())));
        }
    } else if state.session(sid).is_none() {
        return Err(Deny(HubError::NotPermitted));
    }
    Ok(msg)
}

pub fn give(hub: &Hub, state: &mut HubState, _sid: SessionId, msg: Message) -> GiveOutcome {
    match msg {
        Message::Search { origin, query } => {
            let frame = Message::Search {
                origin: origin.clone(),
                query,
            }
            .to_string();
            let restricted = hub.options.read().restrictunverifiedusers;
            for session in state.sessions.values() {
                if !session.loggedin || session.ignore_messages {
                    continue;
                }
                if restricted && !session.verified {
                    continue;
                }
                session.send(frame.clone());
            }
            GiveOutcome::SearchBroadcast { origin }
        }
        Message::SearchResult { payload, recipient } => {
            if let Some(receiver) = state.by_nick(&recipient) {
                // The recipient suffix is hub routing, not client data.
                receiver.send(format!("$SR {}", payload));
            }
            GiveOutcome::Forwarded { to: recipient }
        }
        _ => GiveOutcome::None,
    }
}
