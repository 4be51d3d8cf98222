//! Op chat: a private channel between the ops.
//!
//! Messages sent to the bot are relayed to every op. Ops can answer a
//! specific user with `#nick# message`; `##` repeats the last addressed
//! user and `#%#` shows who that is.

use std::sync::Arc;

use nmdc_proto::escape;

use crate::bots::{Bot, HookTable, VerbHook};
use crate::dispatch::{GiveOutcome, Verb};
use crate::state::{Hub, HubState, SessionId};

/// Default nick for the op-chat bot.
pub const OP_CHAT_NICK: &str = "OpChat";

pub struct OpChatBot {
    nick: String,
}

impl OpChatBot {
    pub fn new() -> Self {
        Self {
            nick: OP_CHAT_NICK.to_string(),
        }
    }

    fn relay(&self, state: &HubState, sender_sid: SessionId, sender_nick: &str, text: &str) {
        let body = escape(text);
        for (op_nick, &op_sid) in &state.ops {
            if op_sid == sender_sid {
                continue;
            }
            if let Some(op) = state.session(op_sid) {
                // From: stays the bot, the display prefix names the speaker.
                op.send(format!(
                    "$To: {} From: {} $<{}> {}",
                    op_nick, self.nick, sender_nick, body
                ));
            }
        }
    }
}

impl Default for OpChatBot {
    fn default() -> Self {
        Self::new()
    }
}

impl Bot for OpChatBot {
    fn nick(&self) -> &str {
        &self.nick
    }

    fn description(&self) -> &str {
        "Private chat between the ops"
    }

    fn process_command(&self, _hub: &Hub, state: &mut HubState, sid: SessionId, text: &str) {
        let (sender_nick, sender_op) = match state.session(sid) {
            Some(session) => (session.nick.clone(), session.op),
            None => return,
        };

        let mut relay_text = text.to_string();
        if sender_op {
            if let Some(rest) = text.strip_prefix('#') {
                if let Some((nick, message)) = rest.split_once('#') {
                    let message = message.trim_start();
                    if nick == "%" {
                        let reply = match state
                            .message_user
                            .and_then(|mu| state.session(mu))
                        {
                            Some(target) => format!("## -> {}", target.nick),
                            None => "* ## is unset".to_string(),
                        };
                        state.pm(&self.nick, sid, &reply);
                        return;
                    }
                    let target_sid = if nick.is_empty() {
                        state.message_user.filter(|mu| state.session(*mu).is_some())
                    } else {
                        state.nicks.get(nick).copied()
                    };
                    let Some(target_sid) = target_sid else {
                        let reply = if nick.is_empty() {
                            "* ## is unset".to_string()
                        } else {
                            format!("* #{}# is not logged on", nick)
                        };
                        state.pm(&self.nick, sid, &reply);
                        return;
                    };
                    state.message_user = Some(target_sid);
                    state.pm(&self.nick, target_sid, message);
                    let target_nick = state
                        .session(target_sid)
                        .map(|s| s.nick.clone())
                        .unwrap_or_default();
                    relay_text = format!("#{}# {}", target_nick, message);
                }
            }
        }
        self.relay(state, sid, &sender_nick, &relay_text);
    }

    fn install_hooks(&self, hooks: &mut HookTable) {
        hooks.register_after(
            Verb::RemoveUser,
            &self.nick,
            Arc::new(MessageUserCleanup {
                bot_nick: self.nick.clone(),
            }),
        );
    }
}

/// Unsets `##` when the addressed user leaves, telling the ops.
struct MessageUserCleanup {
    bot_nick: String,
}

impl VerbHook for MessageUserCleanup {
    fn after(&self, _hub: &Hub, state: &mut HubState, outcome: &GiveOutcome) {
        let GiveOutcome::Removed { sid, nick } = outcome else {
            return;
        };
        if state.message_user == Some(*sid) {
            state.message_user = None;
            state.pm_ops(&self.bot_nick, &format!("* #{}# left, ## unset", nick));
        }
    }
}
