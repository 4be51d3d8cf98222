//! Public chat, with the silence and stupidify punishments.

use rand::Rng;

use nmdc_proto::Message;

use crate::dispatch::GiveOutcome;
use crate::error::{CheckResult, Deny, HubError};
use crate::state::events::PunishKind;
use crate::state::{unix_now, EventStatus, Hub, HubState, SessionId};
use crate::tasks::Task;

/// Check a chat line against the speaker's punishments.
///
/// Silence short-circuits with a hub notice. Stupidify rewrites the text
/// before it goes out. Both are checked for the `%nick` entry and for the
/// speaker's IP, scrubbing stale entries on the way.
pub fn check(hub: &Hub, state: &mut HubState, sid: SessionId, msg: Message) -> CheckResult<Message> {
    let text = match msg {
        Message::Chat { text, .. } => text,
        other => return Ok(other),
    };
    let (nick, ip) = {
        let Some(session) = state.session(sid) else {
            return Err(Deny(HubError::NotPermitted));
        };
        (session.nick.clone(), session.ip.clone())
    };

    let now = unix_now();
    let mut text = text;
    for entry in [format!("%{}", nick), ip] {
        match state.events.check(PunishKind::Silence, &entry, now) {
            EventStatus::Active(until) => {
                state.notice(
                    sid,
                    &format!(
                        "You are currently silenced. Silence will be removed in {} seconds.",
                        until - now
                    ),
                );
                return Err(Deny(HubError::NotPermitted));
            }
            EventStatus::Expired => {
                state.events.remove(PunishKind::Silence, &entry);
                hub.tasks.submit(Task::DeleteActiveEvent {
                    kind: PunishKind::Silence,
                    entry: entry.clone(),
                });
            }
            EventStatus::Absent => {}
        }
        match state.events.check(PunishKind::Stupidify, &entry, now) {
            EventStatus::Active(_) => {
                let factor = hub.options.read().stupidfactor;
                text = stupidify(&text, factor, &mut state.rng);
                return Ok(Message::Chat { nick, text });
            }
            EventStatus::Expired => {
                state.events.remove(PunishKind::Stupidify, &entry);
                hub.tasks.submit(Task::DeleteActiveEvent {
                    kind: PunishKind::Stupidify,
                    entry: entry.clone(),
                });
            }
            EventStatus::Absent => {}
        }
    }
    Ok(Message::Chat { nick, text })
}

/// Broadcast the (possibly rewritten) chat line to the whole roster.
pub fn give(_hub: &Hub, state: &mut HubState, _sid: SessionId, msg: Message) -> GiveOutcome {
    let Message::Chat { nick, text } = msg else {
        return GiveOutcome::None;
    };
    state.chat_all(&nick, &text);
    GiveOutcome::ChatBroadcast { nick, text }
}

/// Garble a message the way the terminally online write.
///
/// Substitutions first, then a punishment-scaled number of adjacent
/// transpositions and trailing exclamation marks (either count can be
/// zero for short messages), and a one-in-ten chance of inverted case.
/// The RNG is the hub's seeded generator, so a fixed seed gives a fixed
/// transcript.
pub fn stupidify<R: Rng>(text: &str, factor: u32, rng: &mut R) -> String {
    let factor = factor.max(1) as usize;
    let replaced = text.replace(" you ", " u ").replace(" are ", " r ");
    let mut chars: Vec<char> = replaced.chars().collect();
    if chars.len() >= 6 {
        let swaps = rng.gen_range(1..=chars.len()) / factor;
        for _ in 0..swaps {
            let idx = rng.gen_range(2..=chars.len() - 3);
            chars.swap(idx, idx + 1);
        }
    }
    let mut out: String = chars.into_iter().collect();
    let len = out.chars().count().max(1);
    let bangs = rng.gen_range(1..=len) / factor;
    out.push_str(&"!".repeat(bangs));
    if rng.r#gen::<f64>() < 0.1 {
        out = swap_case(&out);
    }
    out
}

fn swap_case(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_uppercase() {
                c.to_ascii_lowercase()
            } else if c.is_lowercase() {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn stupidify_substitutes() {
        // A huge factor suppresses the transpositions and the bangs, so
        // only the deterministic substitutions remain (modulo case).
        let mut rng = StdRng::seed_from_u64(42);
        let out = stupidify("you are great", 1_000_000, &mut rng);
        assert_eq!(out.to_lowercase(), "you r great", "got {out:?}");
    }

    #[test]
    fn stupidify_is_deterministic_per_seed() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(
            stupidify("what do you think you are doing", 8, &mut a),
            stupidify("what do you think you are doing", 8, &mut b)
        );
    }

    #[test]
    fn stupidify_small_factor_appends_bangs() {
        // At factor 1 the bang draw is always at least one; a short
        // message under a large factor gets none at all.
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = stupidify("hi there friend", 1, &mut rng);
            assert!(out.ends_with('!'), "seed {seed} gave {out:?}");

            let mut rng = StdRng::seed_from_u64(seed);
            let out = stupidify("hi", 1_000, &mut rng);
            assert!(!out.contains('!'), "seed {seed} gave {out:?}");
        }
    }

    #[test]
    fn swap_case_inverts() {
        assert_eq!(swap_case("AbC 1!"), "aBc 1!");
    }
}
