//! Peer connection brokering: ConnectToMe and RevConnectToMe.
//!
//! On a restricted hub, unverified users only take part in connection
//! setup with ops, and only when the op asked first: an op's
//! RevConnectToMe records an approval that authorizes the user's
//! ConnectToMe back for a bounded window.

use nmdc_proto::Message;

use crate::dispatch::GiveOutcome;
use crate::error::{CheckResult, Deny, HubError};
use crate::state::{unix_now, Hub, HubState, SessionId};

pub fn check(hub: &Hub, state: &mut HubState, sid: SessionId, msg: Message) -> CheckResult<Message> {
    match msg {
        Message::ConnectToMe { target, addr } => {
            check_connect(hub, state, sid, &target)?;
            Ok(Message::ConnectToMe { target, addr })
        }
        Message::RevConnectToMe { to, .. } => {
            let from = {
                let Some(session) = state.session(sid) else {
                    return Err(Deny(HubError::NotPermitted));
                };
                session.nick.clone()
            };
            check_rev_connect(hub, state, sid, &from, &to)?;
            Ok(Message::RevConnectToMe { from, to })
        }
        other => Ok(other),
    }
}

fn check_connect(hub: &Hub, state: &mut HubState, sid: SessionId, target: &str) -> CheckResult<()> {
    let (sender_nick, sender_op, sender_verified) = {
        let Some(session) = state.session(sid) else {
            return Err(Deny(HubError::NotPermitted));
        };
        (session.nick.clone(), session.op, session.verified)
    };
    let Some(receiver) = state.by_nick(target) else {
        return Err(Deny(HubError::UnknownAccount(target.to_string())));
    };
    if !hub.options.read().restrictunverifiedusers {
        return Ok(());
    }
    if !receiver.verified && !sender_op {
        // Non-ops may not connect to unverified users.
        return Err(Deny(HubError::NotPermitted));
    }
    if !sender_verified
        && !(receiver.op && state.connect_check_valid(&sender_nick, target, unix_now()))
    {
        // Unverified users reach an op only on the op's prior invitation.
        return Err(Deny(HubError::NotPermitted));
    }
    Ok(())
}

fn check_rev_connect(
    hub: &Hub,
    state: &mut HubState,
    sid: SessionId,
    from: &str,
    to: &str,
) -> CheckResult<()> {
    let sender_op = state.session(sid).is_some_and(|s| s.op);
    let receiver_verified = {
        let Some(receiver) = state.by_nick(to) else {
            return Err(Deny(HubError::UnknownAccount(to.to_string())));
        };
        receiver.verified
    };
    let options = hub.options.read().clone();
    if options.restrictunverifiedusers && !receiver_verified {
        if !sender_op {
            return Err(Deny(HubError::NotPermitted));
        }
        // Record the approval so the user's ConnectToMe back is honored.
        let now = unix_now();
        state.record_connect_check(to, from, now + options.connectchecktime, now);
    }
    Ok(())
}

pub fn give(_hub: &Hub, state: &mut HubState, _sid: SessionId, msg: Message) -> GiveOutcome {
    let target = match &msg {
        Message::ConnectToMe { target, .. } => target.clone(),
        Message::RevConnectToMe { to, .. } => to.clone(),
        _ => return GiveOutcome::None,
    };
    if let Some(receiver) = state.by_nick(&target) {
        receiver.send_msg(&msg);
    }
    GiveOutcome::Forwarded { to: target }
}
