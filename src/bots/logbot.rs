//! Remote logging bot.
//!
//! Ops subscribe with `start [level]`, adjust with `level N`, and leave
//! with `stop`. Subscribed ops receive each log record as a private
//! message from the bot. Records only reach subscribers if the process
//! log filter lets them through, so the hub's own level must be at least
//! as verbose as the subscription.
//!
//! Subscriptions are dropped when the op disconnects and when the bots
//! are reloaded; ops resend `start` afterwards.

use std::sync::Arc;

use crate::bots::{Bot, HookTable, VerbHook};
use crate::dispatch::Verb;
use crate::error::CheckResult;
use crate::state::hub::LogHandler;
use crate::state::{Hub, HubState, SessionId};

/// Default nick for the logging bot.
pub const LOG_BOT_NICK: &str = "LogBot";

pub struct LogBot {
    nick: String,
}

impl LogBot {
    pub fn new() -> Self {
        Self {
            nick: LOG_BOT_NICK.to_string(),
        }
    }

    fn set_level(&self, hub: &Hub, nick: &str, level: u8) {
        if let Some(mut handler) = hub.log_handlers.get_mut(nick) {
            handler.level = level;
        }
    }
}

impl Default for LogBot {
    fn default() -> Self {
        Self::new()
    }
}

impl Bot for LogBot {
    fn nick(&self) -> &str {
        &self.nick
    }

    fn description(&self) -> &str {
        "Remote log delivery"
    }

    fn process_command(&self, hub: &Hub, state: &mut HubState, sid: SessionId, text: &str) {
        let Some(session) = state.session(sid) else {
            return;
        };
        if !session.op {
            return;
        }
        let nick = session.nick.clone();

        if let Some(rest) = text.strip_prefix("start") {
            if !hub.log_handlers.contains_key(&nick) {
                hub.log_handlers.insert(
                    nick.clone(),
                    LogHandler {
                        level: 1,
                        tx: session.sender(),
                    },
                );
            }
            if let Ok(level) = rest.trim().parse::<u8>() {
                self.set_level(hub, &nick, level);
            }
            state.pm(&self.nick, sid, "Remote logging started");
        } else if text == "stop" {
            hub.log_handlers.remove(&nick);
            state.pm(&self.nick, sid, "Remote logging stopped");
        } else if let Some(rest) = text.strip_prefix("level") {
            if let Ok(level) = rest.trim().parse::<u8>() {
                self.set_level(hub, &nick, level);
                state.pm(&self.nick, sid, &format!("Remote logging level set to {}", level));
            }
        }
    }

    fn install_hooks(&self, hooks: &mut HookTable) {
        hooks.register_before(Verb::RemoveUser, &self.nick, Arc::new(DetachOnLeave));
    }
}

/// Drops the leaving op's subscription before the session is deindexed.
struct DetachOnLeave;

impl VerbHook for DetachOnLeave {
    fn before(
        &self,
        hub: &Hub,
        state: &mut HubState,
        sid: SessionId,
        _verb: Verb,
        _msg: Option<&nmdc_proto::Message>,
    ) -> CheckResult<()> {
        if let Some(session) = state.session(sid) {
            if session.loggedin {
                hub.log_handlers.remove(&session.nick);
            }
        }
        Ok(())
    }
}
