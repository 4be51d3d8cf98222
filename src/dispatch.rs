//! Command dispatch.
//!
//! Every verb has a canonical triple: a check function (pure validation,
//! may rewrite the message), a give function (the effect), and the hook
//! lists bots have registered. Processing for one inbound command runs
//! whitelist → pre-hooks → check → give → post-hooks atomically under the
//! hub lock, so no task or other command interleaves.

use std::collections::HashSet;

use nmdc_proto::Message;
use tracing::{debug, warn};

use crate::error::CheckResult;
use crate::handlers;
use crate::state::{Hub, HubState, SessionId};

/// Static tag for each verb the dispatcher knows, including the two
/// pseudo-verbs that only hooks can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Key,
    ValidateNick,
    MyPass,
    Version,
    GetNickList,
    MyInfo,
    GetInfo,
    Chat,
    PrivateMessage,
    ConnectToMe,
    RevConnectToMe,
    Search,
    Sr,
    UserIp,
    Kick,
    OpForceMove,
    Close,
    ReloadBots,
    /// Pseudo-verb: a session completed login.
    LoginUser,
    /// Pseudo-verb: a session is leaving the roster.
    RemoveUser,
}

impl Verb {
    /// The verb for an inbound message; `None` for hub-to-client frames a
    /// client has no business sending.
    pub fn of(msg: &Message) -> Option<Verb> {
        Some(match msg {
            Message::Key(_) => Verb::Key,
            Message::ValidateNick(_) => Verb::ValidateNick,
            Message::MyPass(_) => Verb::MyPass,
            Message::Version(_) => Verb::Version,
            Message::GetNickList => Verb::GetNickList,
            Message::MyInfo(_) => Verb::MyInfo,
            Message::GetInfo { .. } => Verb::GetInfo,
            Message::Chat { .. } => Verb::Chat,
            Message::PrivateMessage { .. } => Verb::PrivateMessage,
            Message::ConnectToMe { .. } => Verb::ConnectToMe,
            Message::RevConnectToMe { .. } => Verb::RevConnectToMe,
            Message::Search { .. } => Verb::Search,
            Message::SearchResult { .. } => Verb::Sr,
            Message::UserIp(_) => Verb::UserIp,
            Message::Kick(_) => Verb::Kick,
            Message::OpForceMove { .. } => Verb::OpForceMove,
            Message::Close(_) => Verb::Close,
            Message::ReloadBots => Verb::ReloadBots,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Verb::Key => "Key",
            Verb::ValidateNick => "ValidateNick",
            Verb::MyPass => "MyPass",
            Verb::Version => "Version",
            Verb::GetNickList => "GetNickList",
            Verb::MyInfo => "MyINFO",
            Verb::GetInfo => "GetINFO",
            Verb::Chat => "_ChatMessage",
            Verb::PrivateMessage => "_PrivateMessage",
            Verb::ConnectToMe => "ConnectToMe",
            Verb::RevConnectToMe => "RevConnectToMe",
            Verb::Search => "Search",
            Verb::Sr => "SR",
            Verb::UserIp => "UserIP",
            Verb::Kick => "Kick",
            Verb::OpForceMove => "OpForceMove",
            Verb::Close => "Close",
            Verb::ReloadBots => "ReloadBots",
            Verb::LoginUser => "loginuser",
            Verb::RemoveUser => "removeuser",
        }
    }
}

/// Verbs every logged-in user may issue.
pub fn base_user_commands() -> HashSet<Verb> {
    HashSet::from([
        Verb::Chat,
        Verb::PrivateMessage,
        Verb::MyInfo,
        Verb::GetInfo,
        Verb::GetNickList,
        Verb::ConnectToMe,
        Verb::UserIp,
    ])
}

/// Verbs that additionally require a verified account on a restricted hub.
pub fn verified_user_commands() -> HashSet<Verb> {
    HashSet::from([Verb::Search, Verb::Sr, Verb::RevConnectToMe])
}

/// Op-only verbs.
pub fn op_commands() -> HashSet<Verb> {
    HashSet::from([Verb::OpForceMove, Verb::Kick, Verb::Close, Verb::ReloadBots])
}

/// What a give function did, handed to every post-hook.
#[derive(Debug, Clone)]
pub enum GiveOutcome {
    /// Nothing observable (handshake steps, denied deliveries).
    None,
    /// A session finished login and joined the roster.
    LoggedIn { sid: SessionId, nick: String },
    /// A session left the roster.
    Removed { sid: SessionId, nick: String },
    /// A chat line was fanned out.
    ChatBroadcast { nick: String, text: String },
    /// A private message was delivered.
    PrivateDelivered {
        from: String,
        to: String,
        text: String,
        to_bot: bool,
    },
    /// A peer-to-peer setup frame was relayed.
    Forwarded { to: String },
    /// A search was fanned out.
    SearchBroadcast { origin: String },
    /// The bot set was rebuilt.
    Reloaded,
}

/// Parse one raw frame and run it through the pipeline.
pub async fn handle_frame(hub: &Hub, sid: SessionId, frame: &str) {
    let msg = match Message::parse(frame) {
        Ok(msg) => msg,
        Err(err) => {
            // Protocol violations are logged and dropped.
            debug!(
                target: "nmdcd::commanderror",
                session = sid,
                code = err.error_code(),
                error = %err,
                "Dropping bad frame"
            );
            return;
        }
    };
    let mut state = hub.state.lock().await;
    dispatch(hub, &mut state, sid, msg);
}

/// Run the check/give/hook pipeline for one parsed command.
pub fn dispatch(hub: &Hub, state: &mut HubState, sid: SessionId, msg: Message) {
    let Some(verb) = Verb::of(&msg) else {
        debug!(session = sid, verb = msg.verb_name(), "Ignoring server-only verb");
        return;
    };

    {
        let Some(session) = state.sessions.get(&sid) else {
            return;
        };
        if session.ignore_messages {
            return;
        }
        if !session.validcommands.contains(&verb) {
            debug!(
                target: "nmdcd::commanderror",
                session = %session.idstring,
                verb = verb.name(),
                "Verb not in whitelist, dropping"
            );
            return;
        }
    }

    for hook in state.hooks.before_hooks(verb) {
        if let Err(deny) = hook.before(hub, state, sid, verb, Some(&msg)) {
            debug!(
                verb = verb.name(),
                code = deny.0.error_code(),
                "Pre-hook denied command"
            );
            return;
        }
    }

    let msg = match check(hub, state, sid, verb, msg) {
        Ok(msg) => msg,
        Err(deny) => {
            debug!(
                target: "nmdcd::commanderror",
                session = sid,
                verb = verb.name(),
                code = deny.0.error_code(),
                "Check denied command"
            );
            return;
        }
    };

    let outcome = give(hub, state, sid, verb, msg);

    for hook in state.hooks.after_hooks(verb) {
        hook.after(hub, state, &outcome);
    }
}

fn check(
    hub: &Hub,
    state: &mut HubState,
    sid: SessionId,
    verb: Verb,
    msg: Message,
) -> CheckResult<Message> {
    match verb {
        Verb::Key
        | Verb::ValidateNick
        | Verb::MyPass
        | Verb::Version
        | Verb::GetNickList
        | Verb::MyInfo => handlers::handshake::check(hub, state, sid, msg),
        Verb::Chat => handlers::chat::check(hub, state, sid, msg),
        Verb::PrivateMessage => handlers::private::check(hub, state, sid, msg),
        Verb::ConnectToMe | Verb::RevConnectToMe => handlers::connect::check(hub, state, sid, msg),
        Verb::Search | Verb::Sr => handlers::search::check(hub, state, sid, msg),
        Verb::GetInfo | Verb::UserIp => handlers::info::check(hub, state, sid, msg),
        Verb::Kick | Verb::OpForceMove | Verb::Close | Verb::ReloadBots => {
            handlers::op::check(hub, state, sid, msg)
        }
        Verb::LoginUser | Verb::RemoveUser => {
            warn!(verb = verb.name(), "Pseudo-verb has no check function");
            Ok(msg)
        }
    }
}

fn give(hub: &Hub, state: &mut HubState, sid: SessionId, verb: Verb, msg: Message) -> GiveOutcome {
    match verb {
        Verb::Key
        | Verb::ValidateNick
        | Verb::MyPass
        | Verb::Version
        | Verb::GetNickList
        | Verb::MyInfo => handlers::handshake::give(hub, state, sid, msg),
        Verb::Chat => handlers::chat::give(hub, state, sid, msg),
        Verb::PrivateMessage => handlers::private::give(hub, state, sid, msg),
        Verb::ConnectToMe | Verb::RevConnectToMe => handlers::connect::give(hub, state, sid, msg),
        Verb::Search | Verb::Sr => handlers::search::give(hub, state, sid, msg),
        Verb::GetInfo | Verb::UserIp => handlers::info::give(hub, state, sid, msg),
        Verb::Kick | Verb::OpForceMove | Verb::Close | Verb::ReloadBots => {
            handlers::op::give(hub, state, sid, msg)
        }
        Verb::LoginUser | Verb::RemoveUser => GiveOutcome::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_sets_are_disjoint() {
        let base = base_user_commands();
        let verified = verified_user_commands();
        let ops = op_commands();
        assert!(base.is_disjoint(&verified));
        assert!(base.is_disjoint(&ops));
        assert!(verified.is_disjoint(&ops));
    }

    #[test]
    fn server_only_verbs_have_no_tag() {
        assert_eq!(Verb::of(&Message::GetPass), None);
        assert_eq!(Verb::of(&Message::Hello("x".into())), None);
        assert_eq!(
            Verb::of(&Message::Chat {
                nick: String::new(),
                text: "hi".into()
            }),
            Some(Verb::Chat)
        );
    }
}
