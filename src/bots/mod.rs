//! In-process bots.
//!
//! A bot is a roster participant with a nick, an op flag, and no socket.
//! Private messages addressed to a bot's nick are routed to its
//! [`Bot::process_command`] instead of the roster, and a bot may register
//! hooks that run before or after any dispatcher verb.
//!
//! Hooks carry the reload generation they were registered under; after
//! `$ReloadBots` bumps the generation, stale hooks are refused, so nothing
//! from a torn-down bot keeps running.

pub mod admin;
pub mod logbot;
pub mod opchat;

pub use admin::AdminBot;
pub use logbot::LogBot;
pub use opchat::OpChatBot;

use std::collections::HashMap;
use std::sync::Arc;

use nmdc_proto::{escape, Message};
use tracing::{debug, info};

use crate::dispatch::{GiveOutcome, Verb};
use crate::error::CheckResult;
use crate::state::{Hub, HubState, SessionId};

/// A callable registered on a dispatcher verb.
///
/// `before` runs ahead of the verb's check phase and may deny the command;
/// `after` runs once the give phase produced its outcome.
pub trait VerbHook: Send + Sync {
    fn before(
        &self,
        _hub: &Hub,
        _state: &mut HubState,
        _sid: SessionId,
        _verb: Verb,
        _msg: Option<&Message>,
    ) -> CheckResult<()> {
        Ok(())
    }

    fn after(&self, _hub: &Hub, _state: &mut HubState, _outcome: &GiveOutcome) {}
}

struct RegisteredHook {
    /// Registering bot, kept for diagnostics.
    #[allow(dead_code)]
    owner: String,
    version: u64,
    hook: Arc<dyn VerbHook>,
}

/// Per-verb hook lists, in insertion order.
#[derive(Default)]
pub struct HookTable {
    before: HashMap<Verb, Vec<RegisteredHook>>,
    after: HashMap<Verb, Vec<RegisteredHook>>,
    version: u64,
}

impl HookTable {
    /// Current reload generation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Register a pre-hook under the current generation.
    pub fn register_before(&mut self, verb: Verb, owner: &str, hook: Arc<dyn VerbHook>) {
        self.before.entry(verb).or_default().push(RegisteredHook {
            owner: owner.to_string(),
            version: self.version,
            hook,
        });
    }

    /// Register a post-hook under the current generation.
    pub fn register_after(&mut self, verb: Verb, owner: &str, hook: Arc<dyn VerbHook>) {
        self.after.entry(verb).or_default().push(RegisteredHook {
            owner: owner.to_string(),
            version: self.version,
            hook,
        });
    }

    /// Pre-hooks for a verb; stale generations are refused.
    pub fn before_hooks(&self, verb: Verb) -> Vec<Arc<dyn VerbHook>> {
        self.hooks_in(&self.before, verb)
    }

    /// Post-hooks for a verb; stale generations are refused.
    pub fn after_hooks(&self, verb: Verb) -> Vec<Arc<dyn VerbHook>> {
        self.hooks_in(&self.after, verb)
    }

    fn hooks_in(
        &self,
        map: &HashMap<Verb, Vec<RegisteredHook>>,
        verb: Verb,
    ) -> Vec<Arc<dyn VerbHook>> {
        map.get(&verb)
            .map(|hooks| {
                hooks
                    .iter()
                    .filter(|h| h.version == self.version)
                    .map(|h| Arc::clone(&h.hook))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Start a new generation, dropping every installed hook.
    pub fn next_generation(&mut self) -> u64 {
        self.version += 1;
        let dropped: usize = self.before.values().map(Vec::len).sum::<usize>()
            + self.after.values().map(Vec::len).sum::<usize>();
        debug!(dropped, generation = self.version, "Hooks torn down for reload");
        self.before.clear();
        self.after.clear();
        self.version
    }
}

/// An in-process roster participant.
pub trait Bot: Send + Sync {
    /// The bot's roster nick.
    fn nick(&self) -> &str;

    /// Whether the bot appears in `$OpList`.
    fn is_op(&self) -> bool {
        true
    }

    /// Description shown in the bot's `$MyINFO`.
    fn description(&self) -> &str {
        ""
    }

    /// Handle a private message addressed to the bot. `text` is already
    /// unescaped.
    fn process_command(&self, hub: &Hub, state: &mut HubState, sid: SessionId, text: &str);

    /// Register the bot's dispatcher hooks.
    fn install_hooks(&self, _hooks: &mut HookTable) {}
}

/// True when `module` names a bot this build can instantiate.
pub fn is_known_module(module: &str) -> bool {
    matches!(module, "admin" | "opchat" | "logbot")
}

fn instantiate(hub: &Hub, module: &str) -> Result<Arc<dyn Bot>, String> {
    match module {
        "admin" => Ok(Arc::new(AdminBot::new(hub.config.hub.advancedbotname.clone()))),
        "opchat" => Ok(Arc::new(OpChatBot::new())),
        "logbot" => Ok(Arc::new(LogBot::new())),
        other => Err(format!("unknown bot module {other:?}")),
    }
}

/// Instantiate and install the named bot modules.
pub fn install_bots(hub: &Hub, state: &mut HubState, modules: &[String]) -> Result<(), String> {
    // Construct everything first so a bad module leaves nothing half-installed.
    let mut fresh: Vec<Arc<dyn Bot>> = Vec::with_capacity(modules.len());
    for module in modules {
        fresh.push(instantiate(hub, module)?);
    }
    for bot in fresh {
        let nick = bot.nick().to_string();
        if state.nicks.contains_key(&nick) {
            return Err(format!("bot nick {nick:?} is taken by a user"));
        }
        bot.install_hooks(&mut state.hooks);
        state.broadcast_frame(&Message::Hello(nick.clone()).to_string());
        state.bots.insert(nick.clone(), bot);
        if let Some(bot_info) = state.myinfo_for(&nick) {
            state.broadcast_frame(&Message::MyInfo(bot_info).to_string());
        }
        info!(bot = %nick, "Bot installed");
    }
    Ok(())
}

/// Tear down every bot and rebuild the configured set.
///
/// Hub state other than the bots and their hooks (roster, accounts,
/// events, torrents, the task queue) is left untouched. A failure leaves
/// the previous bots in place.
pub fn reload_bots(hub: &Hub, state: &mut HubState) -> Result<(), String> {
    // Validate before tearing anything down.
    let mut fresh: Vec<Arc<dyn Bot>> = Vec::new();
    for module in &hub.config.hub.reloadmodules {
        fresh.push(instantiate(hub, module)?);
    }

    state.reload_version = state.hooks.next_generation();
    state.bots.clear();
    // Remote-log subscriptions do not survive a reload; ops resubscribe.
    hub.log_handlers.clear();

    for bot in fresh {
        let nick = bot.nick().to_string();
        bot.install_hooks(&mut state.hooks);
        state.bots.insert(nick.clone(), bot);
        info!(bot = %nick, "Bot reloaded");
    }
    Ok(())
}

/// Reply from the administrative bot, honoring the caller's
/// `AdvancedBot2MainChat` preference: a chat line for those who asked for
/// it, a private message for everyone else.
pub fn bot_reply(hub: &Hub, state: &HubState, sid: SessionId, text: &str) {
    let to_chat = state
        .session(sid)
        .and_then(|s| s.account.as_deref())
        .and_then(|nick| state.accounts.get(nick))
        .is_some_and(|a| a.args.contains("AdvancedBot2MainChat"));
    if to_chat {
        if let Some(session) = state.session(sid) {
            session.send(escape(text));
        }
    } else {
        state.pm(&hub.config.hub.advancedbotname, sid, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NopHook;
    impl VerbHook for NopHook {}

    #[test]
    fn stale_hooks_are_refused() {
        let mut table = HookTable::default();
        table.register_before(Verb::Chat, "old-bot", Arc::new(NopHook));
        table.register_after(Verb::RemoveUser, "old-bot", Arc::new(NopHook));
        assert_eq!(table.before_hooks(Verb::Chat).len(), 1);

        table.next_generation();
        assert!(table.before_hooks(Verb::Chat).is_empty());
        assert!(table.after_hooks(Verb::RemoveUser).is_empty());

        table.register_before(Verb::Chat, "new-bot", Arc::new(NopHook));
        assert_eq!(table.before_hooks(Verb::Chat).len(), 1);
    }

    #[test]
    fn known_modules() {
        assert!(is_known_module("admin"));
        assert!(is_known_module("opchat"));
        assert!(is_known_module("logbot"));
        assert!(!is_known_module("facebook"));
    }
}
