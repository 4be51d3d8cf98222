//! Private messages: roster delivery and the bot command path.

use nmdc_proto::{unescape, Message};
use tracing::debug;

use crate::dispatch::GiveOutcome;
use crate::error::{CheckResult, Deny, HubError};
use crate::state::{Hub, HubState, SessionId};

/// Validate a private message and pin the sender to the session's nick.
pub fn check(_hub: &Hub, state: &mut HubState, sid: SessionId, msg: Message) -> CheckResult<Message> {
    let (to, text) = match msg {
        Message::PrivateMessage { to, text, .. } => (to, text),
        other => return Ok(other),
    };
    let Some(session) = state.session(sid) else {
        return Err(Deny(HubError::NotPermitted));
    };
    let from = session.nick.clone();
    if !state.bots.contains_key(&to) && !state.nicks.contains_key(&to) {
        // Receiver is gone; the message is silently ignored.
        return Err(Deny(HubError::UnknownAccount(to)));
    }
    Ok(Message::PrivateMessage { to, from, text })
}

/// Deliver to a bot's command handler or to the receiving session.
pub fn give(hub: &Hub, state: &mut HubState, sid: SessionId, msg: Message) -> GiveOutcome {
    let Message::PrivateMessage { to, from, text } = msg else {
        return GiveOutcome::None;
    };

    if let Some(bot) = state.bots.get(&to).cloned() {
        let command = unescape(&text);
        debug!(bot = %to, from = %from, "Routing private message to bot");
        bot.process_command(hub, state, sid, &command);
        return GiveOutcome::PrivateDelivered {
            from,
            to,
            text,
            to_bot: true,
        };
    }

    if let Some(receiver) = state.by_nick(&to) {
        receiver.send_msg(&Message::PrivateMessage {
            to: to.clone(),
            from: from.clone(),
            text: text.clone(),
        });
    }
    GiveOutcome::PrivateDelivered {
        from,
        to,
        text,
        to_bot: false,
    }
}
