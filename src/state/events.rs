//! Punishments: the three active-event maps and their entry grammar.
//!
//! An entry is either `%<nick>` or a dotted IPv4 prefix (possibly
//! truncated, trailing dots allowed). Durations are integers with an
//! optional case-insensitive unit suffix.

use std::collections::HashMap;

use crate::error::HubError;

/// History event type ids that are not punishments.
pub const JOIN_TYPE_ID: i64 = 1;
/// Verify/unverify history rows.
pub const VERIFY_TYPE_ID: i64 = 6;
/// Free-form op notes.
pub const NOTE_TYPE_ID: i64 = 7;

/// The three punishment types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunishKind {
    Ban,
    Silence,
    Stupidify,
}

impl PunishKind {
    /// All kinds, in event-type order.
    pub const ALL: [PunishKind; 3] = [PunishKind::Ban, PunishKind::Silence, PunishKind::Stupidify];

    /// The `eventtypeid` stored for this kind.
    pub fn type_id(self) -> i64 {
        match self {
            PunishKind::Ban => 3,
            PunishKind::Silence => 4,
            PunishKind::Stupidify => 5,
        }
    }

    /// Inverse of [`PunishKind::type_id`].
    pub fn from_type_id(id: i64) -> Option<Self> {
        match id {
            3 => Some(PunishKind::Ban),
            4 => Some(PunishKind::Silence),
            5 => Some(PunishKind::Stupidify),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PunishKind::Ban => "ban",
            PunishKind::Silence => "silence",
            PunishKind::Stupidify => "stupidify",
        }
    }

    /// Plural name used by the list command.
    pub fn plural(self) -> &'static str {
        match self {
            PunishKind::Ban => "bans",
            PunishKind::Silence => "silences",
            PunishKind::Stupidify => "stupidifies",
        }
    }
}

/// Result of probing an event map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// No entry.
    Absent,
    /// Entry present with `until` in the future.
    Active(i64),
    /// Entry present but past its deadline; the caller should remove it.
    Expired,
}

/// The in-memory mirrors of the `activeevents` table, keyed by entry.
#[derive(Debug, Default)]
pub struct EventMaps {
    bans: HashMap<String, i64>,
    silences: HashMap<String, i64>,
    stupidifies: HashMap<String, i64>,
}

impl EventMaps {
    pub fn map(&self, kind: PunishKind) -> &HashMap<String, i64> {
        match kind {
            PunishKind::Ban => &self.bans,
            PunishKind::Silence => &self.silences,
            PunishKind::Stupidify => &self.stupidifies,
        }
    }

    fn map_mut(&mut self, kind: PunishKind) -> &mut HashMap<String, i64> {
        match kind {
            PunishKind::Ban => &mut self.bans,
            PunishKind::Silence => &mut self.silences,
            PunishKind::Stupidify => &mut self.stupidifies,
        }
    }

    /// Probe one entry.
    pub fn check(&self, kind: PunishKind, entry: &str, now: i64) -> EventStatus {
        match self.map(kind).get(entry) {
            None => EventStatus::Absent,
            Some(&until) if until > now => EventStatus::Active(until),
            Some(_) => EventStatus::Expired,
        }
    }

    /// Insert or update an entry.
    pub fn insert(&mut self, kind: PunishKind, entry: &str, until: i64) {
        self.map_mut(kind).insert(entry.to_string(), until);
    }

    /// Remove an entry; true when it existed.
    pub fn remove(&mut self, kind: PunishKind, entry: &str) -> bool {
        self.map_mut(kind).remove(entry).is_some()
    }

    /// Drop every expired entry of one kind, returning what was removed.
    /// Expiry matches [`EventMaps::check`]: anything not strictly in the
    /// future is gone.
    pub fn scrub(&mut self, kind: PunishKind, now: i64) -> Vec<String> {
        let map = self.map_mut(kind);
        let dead: Vec<String> = map
            .iter()
            .filter(|&(_, &until)| until <= now)
            .map(|(entry, _)| entry.clone())
            .collect();
        for entry in &dead {
            map.remove(entry);
        }
        dead
    }

    /// First ban entry whose IP prefix matches `ip`, with its status.
    /// `%nick` entries never match an address.
    pub fn ip_ban_match(&self, ip: &str, now: i64) -> Option<(String, EventStatus)> {
        for (entry, &until) in &self.bans {
            if entry.starts_with('%') {
                continue;
            }
            if ip.starts_with(entry.as_str()) {
                let status = if until > now {
                    EventStatus::Active(until)
                } else {
                    EventStatus::Expired
                };
                return Some((entry.clone(), status));
            }
        }
        None
    }
}

/// Parse a punishment duration into seconds: a decimal integer with an
/// optional case-insensitive s/m/h/d/w/y suffix (default seconds).
pub fn parse_duration(raw: &str) -> Result<i64, HubError> {
    if raw.is_empty() {
        return Err(HubError::BadArgument("empty duration".into()));
    }
    let (digits, multiplier) = match raw.chars().next_back().unwrap().to_ascii_lowercase() {
        's' => (&raw[..raw.len() - 1], 1),
        'm' => (&raw[..raw.len() - 1], 60),
        'h' => (&raw[..raw.len() - 1], 60 * 60),
        'd' => (&raw[..raw.len() - 1], 60 * 60 * 24),
        'w' => (&raw[..raw.len() - 1], 60 * 60 * 24 * 7),
        'y' => (&raw[..raw.len() - 1], 60 * 60 * 24 * 365),
        _ => (raw, 1),
    };
    let value: i64 = digits
        .parse()
        .map_err(|_| HubError::BadArgument(format!("bad duration {raw:?}")))?;
    Ok(value * multiplier)
}

/// Validate a dotted IPv4 prefix: at most four octets, each in [0, 255],
/// trailing dots allowed.
pub fn validate_ip_prefix(raw: &str) -> Result<(), HubError> {
    if raw.is_empty() {
        return Err(HubError::BadArgument("empty IP prefix".into()));
    }
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() > 4 + 1 {
        // Four octets plus one empty tail from a trailing dot.
        return Err(HubError::BadArgument(format!("bad IP prefix {raw:?}")));
    }
    let mut octets = 0;
    for part in &parts {
        if part.is_empty() {
            continue;
        }
        octets += 1;
        if octets > 4 || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(HubError::BadArgument(format!("bad IP prefix {raw:?}")));
        }
        let value: u32 = part
            .parse()
            .map_err(|_| HubError::BadArgument(format!("bad IP prefix {raw:?}")))?;
        if value > 255 {
            return Err(HubError::BadArgument(format!(
                "octet {value} out of range in {raw:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_suffixes() {
        assert_eq!(parse_duration("30").unwrap(), 30);
        assert_eq!(parse_duration("30s").unwrap(), 30);
        assert_eq!(parse_duration("5m").unwrap(), 300);
        assert_eq!(parse_duration("2h").unwrap(), 7200);
        assert_eq!(parse_duration("1d").unwrap(), 86400);
        assert_eq!(parse_duration("1w").unwrap(), 604800);
        assert_eq!(parse_duration("1y").unwrap(), 31536000);
        // Suffixes are case-insensitive.
        assert_eq!(parse_duration("5M").unwrap(), 300);
        assert_eq!(parse_duration("-10").unwrap(), -10);
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn ip_prefixes() {
        assert!(validate_ip_prefix("12.34.56.").is_ok());
        assert!(validate_ip_prefix("12.34.56.78").is_ok());
        assert!(validate_ip_prefix("12").is_ok());
        assert!(validate_ip_prefix("12.34.256").is_err());
        assert!(validate_ip_prefix("1.2.3.4.5").is_err());
        assert!(validate_ip_prefix("12.x.").is_err());
        assert!(validate_ip_prefix("").is_err());
    }

    #[test]
    fn prefix_matching_is_lexical() {
        let mut maps = EventMaps::default();
        maps.insert(PunishKind::Ban, "12.34.56.", 10_000);
        let (entry, status) = maps.ip_ban_match("12.34.56.78", 100).unwrap();
        assert_eq!(entry, "12.34.56.");
        assert_eq!(status, EventStatus::Active(10_000));
        assert!(maps.ip_ban_match("12.34.57.1", 100).is_none());
        // A nick entry never matches an address.
        maps.insert(PunishKind::Ban, "%12.34.56.78", 10_000);
        assert!(maps.ip_ban_match("12.34.57.1", 100).is_none());
    }

    #[test]
    fn check_and_scrub() {
        let mut maps = EventMaps::default();
        maps.insert(PunishKind::Silence, "%bob", 500);
        maps.insert(PunishKind::Silence, "%carol", 2_000);
        assert_eq!(
            maps.check(PunishKind::Silence, "%bob", 1_000),
            EventStatus::Expired
        );
        assert_eq!(
            maps.check(PunishKind::Silence, "%carol", 1_000),
            EventStatus::Active(2_000)
        );
        assert_eq!(
            maps.check(PunishKind::Silence, "%dave", 1_000),
            EventStatus::Absent
        );

        let removed = maps.scrub(PunishKind::Silence, 1_000);
        assert_eq!(removed, vec!["%bob".to_string()]);
        assert_eq!(maps.map(PunishKind::Silence).len(), 1);
    }
}
