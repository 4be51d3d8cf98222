//! Typed NMDC messages.
//!
//! A frame is everything between `|` delimiters. Frames beginning with `$`
//! carry a verb (the token up to the first space) and positional arguments;
//! anything else is a public chat line `<nick> text`.
//!
//! One enum covers both directions of the protocol so the hub and test
//! clients share a single parse/serialize pair.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtoError;

/// Maximum accepted verb length; longer verbs are malformed frames.
pub const MAX_VERB_LEN: usize = 32;

/// Client identity carried by `$MyINFO`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MyInfo {
    /// Nick the info is for.
    pub nick: String,
    /// Free-form description, tag excluded.
    pub description: String,
    /// Client tag including the angle brackets, empty when absent.
    pub tag: String,
    /// Connection speed string, class byte excluded.
    pub speed: String,
    /// Speed class: the final byte of the speed field.
    pub speed_class: u8,
    /// Contact address.
    pub email: String,
    /// Shared bytes.
    pub share_size: u64,
}

impl fmt::Display for MyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "$ALL {} {}{}$ ${}{}${}${}$",
            self.nick,
            self.description,
            self.tag,
            self.speed,
            if self.speed_class == 0 {
                String::new()
            } else {
                char::from(self.speed_class).to_string()
            },
            self.email,
            self.share_size
        )
    }
}

impl MyInfo {
    fn parse(args: &str) -> Result<Self, ProtoError> {
        let rest = args
            .strip_prefix("$ALL ")
            .ok_or_else(|| ProtoError::malformed("MyINFO", "missing $ALL marker"))?;
        let (nick, rest) = rest
            .split_once(' ')
            .ok_or_else(|| ProtoError::malformed("MyINFO", "missing nick"))?;
        let fields: Vec<&str> = rest.split('$').collect();
        if fields.len() < 5 {
            return Err(ProtoError::malformed("MyINFO", "missing fields"));
        }
        let desc_tag = fields[0];
        let (description, tag) = match (desc_tag.rfind('<'), desc_tag.ends_with('>')) {
            (Some(idx), true) => (&desc_tag[..idx], &desc_tag[idx..]),
            _ => (desc_tag, ""),
        };
        let speed_field = fields[2];
        let (speed, speed_class) = match speed_field.chars().next_back() {
            Some(last) => (&speed_field[..speed_field.len() - last.len_utf8()], last as u8),
            None => (speed_field, 0),
        };
        let share_size = if fields[4].is_empty() {
            0
        } else {
            fields[4]
                .parse::<u64>()
                .map_err(|_| ProtoError::malformed("MyINFO", "share size not numeric"))?
        };
        Ok(MyInfo {
            nick: nick.to_string(),
            description: description.to_string(),
            tag: tag.to_string(),
            speed: speed.to_string(),
            speed_class,
            email: fields[3].to_string(),
            share_size,
        })
    }
}

/// The five `?`-separated fields of a `$Search`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// `T` when the query restricts by size.
    pub size_restricted: bool,
    /// `T` when the size bound is a minimum.
    pub is_minimum: bool,
    /// Size bound in bytes.
    pub size: u64,
    /// Numeric data-type selector.
    pub kind: u32,
    /// Search pattern, `$`-separated words.
    pub pattern: String,
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}?{}?{}?{}?{}",
            if self.size_restricted { 'T' } else { 'F' },
            if self.is_minimum { 'T' } else { 'F' },
            self.size,
            self.kind,
            self.pattern
        )
    }
}

impl SearchQuery {
    fn parse(rest: &str) -> Result<Self, ProtoError> {
        let parts: Vec<&str> = rest.splitn(5, '?').collect();
        if parts.len() != 5 {
            return Err(ProtoError::malformed("Search", "expected five ?-separated fields"));
        }
        Ok(SearchQuery {
            size_restricted: parts[0] == "T",
            is_minimum: parts[1] == "T",
            size: parts[2].parse().unwrap_or(0),
            kind: parts[3].parse().unwrap_or(1),
            pattern: parts[4].to_string(),
        })
    }
}

/// A decomposed NMDC frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // ---- client → hub ------------------------------------------------
    /// `$Key <key>`, the answer to the lock challenge.
    Key(String),
    /// `$ValidateNick <nick>`.
    ValidateNick(String),
    /// `$MyPass <password>`.
    MyPass(String),
    /// `$Version <version>`.
    Version(String),
    /// `$GetNickList`.
    GetNickList,
    /// `$MyINFO $ALL …`.
    MyInfo(MyInfo),
    /// `$GetINFO <target> <requester>`.
    GetInfo {
        /// Nick whose info is requested.
        target: String,
        /// Nick doing the asking.
        requester: String,
    },
    /// Public chat: `<nick> text`.
    Chat {
        /// Claimed speaker (the hub substitutes the session's nick).
        nick: String,
        /// Message body, still wire-escaped.
        text: String,
    },
    /// `$To: <to> From: <from> $<<from>> text`.
    PrivateMessage {
        /// Recipient nick.
        to: String,
        /// Sender nick.
        from: String,
        /// Message body, display prefix stripped.
        text: String,
    },
    /// `$ConnectToMe <target> <ip:port>`.
    ConnectToMe {
        /// Nick asked to connect back.
        target: String,
        /// Sender's listening address.
        addr: String,
    },
    /// `$RevConnectToMe <from> <to>`.
    RevConnectToMe {
        /// Passive sender.
        from: String,
        /// Nick asked to initiate.
        to: String,
    },
    /// `$Search <origin> <query>`.
    Search {
        /// `ip:port` for active searches, `Hub:<nick>` for passive.
        origin: String,
        /// Decomposed query fields.
        query: SearchQuery,
    },
    /// `$SR <payload>\x05<recipient>`. The hub strips the recipient and
    /// forwards the payload to exactly that session.
    SearchResult {
        /// Everything up to the final `\x05`.
        payload: String,
        /// Nick named after the final `\x05`.
        recipient: String,
    },
    /// `$UserIP <nick>[$$<nick>…]` request.
    UserIp(Vec<String>),
    /// `$Kick <nick>` (op only).
    Kick(String),
    /// `$OpForceMove $Who:<nick>$Where:<addr>$Msg:<reason>` (op only).
    OpForceMove {
        /// Nick being redirected.
        who: String,
        /// Redirect address.
        dest: String,
        /// Reason shown to the user.
        reason: String,
    },
    /// `$Close <nick>` (op only).
    Close(String),
    /// `$ReloadBots` (op only).
    ReloadBots,

    // ---- hub → client ------------------------------------------------
    /// `$Lock <lock> Pk=<pk>` greeting.
    Lock {
        /// Challenge string.
        lock: String,
        /// Software identifier.
        pk: String,
    },
    /// `$Hello <nick>`.
    Hello(String),
    /// `$GetPass`.
    GetPass,
    /// `$BadPass`.
    BadPass,
    /// `$ValidateDenide <nick>` (the misspelling is protocol).
    ValidateDenide(String),
    /// `$NickList <n1>$$<n2>$$…`.
    NickList(Vec<String>),
    /// `$OpList <o1>$$<o2>$$…`.
    OpList(Vec<String>),
    /// `$HubName <name>`.
    HubName(String),
    /// `$ForceMove <addr>`.
    ForceMove(String),
    /// `$Quit <nick>`, the roster departure notice.
    Quit(String),
    /// `$UserIP <nick> <ip>$$…` reply.
    UserIpReply(Vec<(String, String)>),
}

impl Message {
    /// Parse one frame (without the trailing `|`).
    pub fn parse(frame: &str) -> Result<Self, ProtoError> {
        if !frame.starts_with('$') {
            return Ok(parse_chat(frame));
        }
        let body = &frame[1..];
        let (verb, args) = match body.find(' ') {
            Some(idx) => (&body[..idx], &body[idx + 1..]),
            None => (body, ""),
        };
        if verb.len() > MAX_VERB_LEN {
            return Err(ProtoError::VerbTooLong(frame.chars().take(48).collect()));
        }
        match verb {
            "Key" => require(verb, args).map(|a| Message::Key(a.to_string())),
            "ValidateNick" => require(verb, args).map(|a| Message::ValidateNick(a.to_string())),
            "MyPass" => require(verb, args).map(|a| Message::MyPass(a.to_string())),
            "Version" => require(verb, args).map(|a| Message::Version(a.to_string())),
            "GetNickList" => Ok(Message::GetNickList),
            "MyINFO" => MyInfo::parse(args).map(Message::MyInfo),
            "GetINFO" => {
                let (target, requester) = args
                    .split_once(' ')
                    .ok_or_else(|| ProtoError::malformed(verb, "expected target and requester"))?;
                Ok(Message::GetInfo {
                    target: target.to_string(),
                    requester: requester.to_string(),
                })
            }
            "To:" => parse_private(args),
            "ConnectToMe" => {
                let (target, addr) = args
                    .split_once(' ')
                    .ok_or_else(|| ProtoError::malformed(verb, "expected target and address"))?;
                Ok(Message::ConnectToMe {
                    target: target.to_string(),
                    addr: addr.to_string(),
                })
            }
            "RevConnectToMe" => {
                let (from, to) = args
                    .split_once(' ')
                    .ok_or_else(|| ProtoError::malformed(verb, "expected sender and receiver"))?;
                Ok(Message::RevConnectToMe {
                    from: from.to_string(),
                    to: to.to_string(),
                })
            }
            "Search" => {
                let (origin, rest) = args
                    .split_once(' ')
                    .ok_or_else(|| ProtoError::malformed(verb, "expected origin and query"))?;
                Ok(Message::Search {
                    origin: origin.to_string(),
                    query: SearchQuery::parse(rest)?,
                })
            }
            "SR" => {
                let idx = args
                    .rfind('\x05')
                    .ok_or_else(|| ProtoError::malformed(verb, "missing recipient separator"))?;
                let recipient = &args[idx + 1..];
                if recipient.is_empty() {
                    return Err(ProtoError::malformed(verb, "empty recipient"));
                }
                Ok(Message::SearchResult {
                    payload: args[..idx].to_string(),
                    recipient: recipient.to_string(),
                })
            }
            "UserIP" => {
                // A reply echoes back with embedded spaces; requests are bare nicks.
                if args.contains(' ') {
                    let pairs = split_list(args)
                        .into_iter()
                        .filter_map(|entry| {
                            entry
                                .split_once(' ')
                                .map(|(n, ip)| (n.to_string(), ip.to_string()))
                        })
                        .collect();
                    Ok(Message::UserIpReply(pairs))
                } else {
                    let nicks = split_list(args);
                    if nicks.is_empty() {
                        return Err(ProtoError::malformed(verb, "no nicks requested"));
                    }
                    Ok(Message::UserIp(nicks))
                }
            }
            "Kick" => require(verb, args).map(|a| Message::Kick(a.to_string())),
            "OpForceMove" => parse_force_move(args),
            "Close" => require(verb, args).map(|a| Message::Close(a.to_string())),
            "ReloadBots" => Ok(Message::ReloadBots),
            "Lock" => {
                let (lock, pk) = args
                    .split_once(" Pk=")
                    .ok_or_else(|| ProtoError::malformed(verb, "missing Pk"))?;
                Ok(Message::Lock {
                    lock: lock.to_string(),
                    pk: pk.to_string(),
                })
            }
            "Hello" => require(verb, args).map(|a| Message::Hello(a.to_string())),
            "GetPass" => Ok(Message::GetPass),
            "BadPass" => Ok(Message::BadPass),
            "ValidateDenide" => require(verb, args).map(|a| Message::ValidateDenide(a.to_string())),
            "NickList" => Ok(Message::NickList(split_list(args))),
            "OpList" => Ok(Message::OpList(split_list(args))),
            "HubName" => require(verb, args).map(|a| Message::HubName(a.to_string())),
            "ForceMove" => require(verb, args).map(|a| Message::ForceMove(a.to_string())),
            "Quit" => require(verb, args).map(|a| Message::Quit(a.to_string())),
            other => Err(ProtoError::UnknownVerb(other.to_string())),
        }
    }

    /// The verb name for logging, `<chat>` for chat frames.
    pub fn verb_name(&self) -> &'static str {
        match self {
            Message::Key(_) => "Key",
            Message::ValidateNick(_) => "ValidateNick",
            Message::MyPass(_) => "MyPass",
            Message::Version(_) => "Version",
            Message::GetNickList => "GetNickList",
            Message::MyInfo(_) => "MyINFO",
            Message::GetInfo { .. } => "GetINFO",
            Message::Chat { .. } => "<chat>",
            Message::PrivateMessage { .. } => "To:",
            Message::ConnectToMe { .. } => "ConnectToMe",
            Message::RevConnectToMe { .. } => "RevConnectToMe",
            Message::Search { .. } => "Search",
            Message::SearchResult { .. } => "SR",
            Message::UserIp(_) => "UserIP",
            Message::Kick(_) => "Kick",
            Message::OpForceMove { .. } => "OpForceMove",
            Message::Close(_) => "Close",
            Message::ReloadBots => "ReloadBots",
            Message::Lock { .. } => "Lock",
            Message::Hello(_) => "Hello",
            Message::GetPass => "GetPass",
            Message::BadPass => "BadPass",
            Message::ValidateDenide(_) => "ValidateDenide",
            Message::NickList(_) => "NickList",
            Message::OpList(_) => "OpList",
            Message::HubName(_) => "HubName",
            Message::ForceMove(_) => "ForceMove",
            Message::Quit(_) => "Quit",
            Message::UserIpReply(_) => "UserIP",
        }
    }
}

fn require<'a>(verb: &str, args: &'a str) -> Result<&'a str, ProtoError> {
    if args.is_empty() {
        Err(ProtoError::malformed(verb, "missing argument"))
    } else {
        Ok(args)
    }
}

fn split_list(args: &str) -> Vec<String> {
    args.split("$$")
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_chat(frame: &str) -> Message {
    if let Some(rest) = frame.strip_prefix('<') {
        if let Some(idx) = rest.find("> ") {
            return Message::Chat {
                nick: rest[..idx].to_string(),
                text: rest[idx + 2..].to_string(),
            };
        }
    }
    Message::Chat {
        nick: String::new(),
        text: frame.to_string(),
    }
}

fn parse_private(args: &str) -> Result<Message, ProtoError> {
    let (to, rest) = args
        .split_once(' ')
        .ok_or_else(|| ProtoError::malformed("To:", "missing recipient"))?;
    let rest = rest
        .strip_prefix("From: ")
        .ok_or_else(|| ProtoError::malformed("To:", "missing From:"))?;
    let (from, rest) = rest
        .split_once(" $")
        .ok_or_else(|| ProtoError::malformed("To:", "missing body"))?;
    // The body conventionally repeats the sender as a display prefix.
    let text = match rest.strip_prefix('<') {
        Some(tail) => match tail.find("> ") {
            Some(idx) => &tail[idx + 2..],
            None => rest,
        },
        None => rest,
    };
    Ok(Message::PrivateMessage {
        to: to.to_string(),
        from: from.to_string(),
        text: text.to_string(),
    })
}

fn parse_force_move(args: &str) -> Result<Message, ProtoError> {
    let rest = args
        .strip_prefix("$Who:")
        .ok_or_else(|| ProtoError::malformed("OpForceMove", "missing $Who:"))?;
    let (who, rest) = rest
        .split_once("$Where:")
        .ok_or_else(|| ProtoError::malformed("OpForceMove", "missing $Where:"))?;
    let (dest, reason) = rest
        .split_once("$Msg:")
        .ok_or_else(|| ProtoError::malformed("OpForceMove", "missing $Msg:"))?;
    Ok(Message::OpForceMove {
        who: who.to_string(),
        dest: dest.to_string(),
        reason: reason.to_string(),
    })
}

impl FromStr for Message {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::parse(s)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Key(key) => write!(f, "$Key {}", key),
            Message::ValidateNick(nick) => write!(f, "$ValidateNick {}", nick),
            Message::MyPass(pass) => write!(f, "$MyPass {}", pass),
            Message::Version(v) => write!(f, "$Version {}", v),
            Message::GetNickList => write!(f, "$GetNickList"),
            Message::MyInfo(info) => write!(f, "$MyINFO {}", info),
            Message::GetInfo { target, requester } => {
                write!(f, "$GetINFO {} {}", target, requester)
            }
            Message::Chat { nick, text } => {
                if nick.is_empty() {
                    write!(f, "{}", text)
                } else {
                    write!(f, "<{}> {}", nick, text)
                }
            }
            Message::PrivateMessage { to, from, text } => {
                write!(f, "$To: {} From: {} $<{}> {}", to, from, from, text)
            }
            Message::ConnectToMe { target, addr } => {
                write!(f, "$ConnectToMe {} {}", target, addr)
            }
            Message::RevConnectToMe { from, to } => {
                write!(f, "$RevConnectToMe {} {}", from, to)
            }
            Message::Search { origin, query } => write!(f, "$Search {} {}", origin, query),
            Message::SearchResult { payload, recipient } => {
                write!(f, "$SR {}\x05{}", payload, recipient)
            }
            Message::UserIp(nicks) => write!(f, "$UserIP {}", nicks.join("$$")),
            Message::Kick(nick) => write!(f, "$Kick {}", nick),
            Message::OpForceMove { who, dest, reason } => {
                write!(f, "$OpForceMove $Who:{}$Where:{}$Msg:{}", who, dest, reason)
            }
            Message::Close(nick) => write!(f, "$Close {}", nick),
            Message::ReloadBots => write!(f, "$ReloadBots"),
            Message::Lock { lock, pk } => write!(f, "$Lock {} Pk={}", lock, pk),
            Message::Hello(nick) => write!(f, "$Hello {}", nick),
            Message::GetPass => write!(f, "$GetPass"),
            Message::BadPass => write!(f, "$BadPass"),
            Message::ValidateDenide(nick) => write!(f, "$ValidateDenide {}", nick),
            Message::NickList(nicks) => write!(f, "$NickList {}", join_list(nicks)),
            Message::OpList(nicks) => write!(f, "$OpList {}", join_list(nicks)),
            Message::HubName(name) => write!(f, "$HubName {}", name),
            Message::ForceMove(addr) => write!(f, "$ForceMove {}", addr),
            Message::Quit(nick) => write!(f, "$Quit {}", nick),
            Message::UserIpReply(pairs) => {
                let joined: Vec<String> =
                    pairs.iter().map(|(n, ip)| format!("{} {}", n, ip)).collect();
                write!(f, "$UserIP {}", join_list(&joined))
            }
        }
    }
}

fn join_list(items: &[String]) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(item);
        out.push_str("$$");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_handshake_verbs() {
        assert_eq!(
            Message::parse("$Key abc").unwrap(),
            Message::Key("abc".into())
        );
        assert_eq!(
            Message::parse("$ValidateNick alice").unwrap(),
            Message::ValidateNick("alice".into())
        );
        assert_eq!(Message::parse("$GetNickList").unwrap(), Message::GetNickList);
    }

    #[test]
    fn parses_chat() {
        assert_eq!(
            Message::parse("<alice> hello there").unwrap(),
            Message::Chat {
                nick: "alice".into(),
                text: "hello there".into()
            }
        );
        // Bare text is still chat, with the nick left for the hub to fill in.
        assert_eq!(
            Message::parse("hello").unwrap(),
            Message::Chat {
                nick: String::new(),
                text: "hello".into()
            }
        );
    }

    #[test]
    fn parses_myinfo() {
        let msg = Message::parse("$MyINFO $ALL alice d$ $10 KiB/s$e$0$").unwrap();
        let Message::MyInfo(info) = msg else {
            panic!("expected MyINFO");
        };
        assert_eq!(info.nick, "alice");
        assert_eq!(info.description, "d");
        assert_eq!(info.tag, "");
        assert_eq!(info.speed, "10 KiB/");
        assert_eq!(info.speed_class, b's');
        assert_eq!(info.email, "e");
        assert_eq!(info.share_size, 0);
    }

    #[test]
    fn parses_myinfo_with_tag() {
        let frame = "$MyINFO $ALL bob desc<++ V:0.868,M:A,H:1/0/0,S:3>$ $DSL\u{1}$b@x$12345$";
        let Message::MyInfo(info) = Message::parse(frame).unwrap() else {
            panic!("expected MyINFO");
        };
        assert_eq!(info.description, "desc");
        assert_eq!(info.tag, "<++ V:0.868,M:A,H:1/0/0,S:3>");
        assert_eq!(info.speed, "DSL");
        assert_eq!(info.speed_class, 1);
        assert_eq!(info.share_size, 12345);
        assert_eq!(Message::MyInfo(info).to_string(), frame);
    }

    #[test]
    fn parses_private_message() {
        let msg = Message::parse("$To: bob From: alice $<alice> hi bob").unwrap();
        assert_eq!(
            msg,
            Message::PrivateMessage {
                to: "bob".into(),
                from: "alice".into(),
                text: "hi bob".into()
            }
        );
        assert_eq!(msg.to_string(), "$To: bob From: alice $<alice> hi bob");
    }

    #[test]
    fn parses_search() {
        let msg = Message::parse("$Search 1.2.3.4:412 T?F?500000?1?linux$iso").unwrap();
        let Message::Search { origin, query } = &msg else {
            panic!("expected Search");
        };
        assert_eq!(origin, "1.2.3.4:412");
        assert!(query.size_restricted);
        assert!(!query.is_minimum);
        assert_eq!(query.size, 500000);
        assert_eq!(query.pattern, "linux$iso");
        assert_eq!(msg.to_string(), "$Search 1.2.3.4:412 T?F?500000?1?linux$iso");
    }

    #[test]
    fn parses_search_result_recipient() {
        let frame = "$SR alice path\\file.ext\x05123 2/4\x05TestHub (1.2.3.4:411)\x05bob";
        let Message::SearchResult { payload, recipient } = Message::parse(frame).unwrap() else {
            panic!("expected SR");
        };
        assert_eq!(recipient, "bob");
        assert!(payload.starts_with("alice path"));
    }

    #[test]
    fn parses_op_force_move() {
        let msg =
            Message::parse("$OpForceMove $Who:bob$Where:other.hub:411$Msg:better hub").unwrap();
        assert_eq!(
            msg,
            Message::OpForceMove {
                who: "bob".into(),
                dest: "other.hub:411".into(),
                reason: "better hub".into()
            }
        );
    }

    #[test]
    fn parses_lock_and_lists() {
        let msg = Message::parse("$Lock EXTENDEDPROTOCOLabc Pk=nmdcd").unwrap();
        assert_eq!(
            msg,
            Message::Lock {
                lock: "EXTENDEDPROTOCOLabc".into(),
                pk: "nmdcd".into()
            }
        );
        assert_eq!(
            Message::parse("$NickList alice$$bob$$").unwrap(),
            Message::NickList(vec!["alice".into(), "bob".into()])
        );
        assert_eq!(
            Message::NickList(vec!["alice".into(), "bob".into()]).to_string(),
            "$NickList alice$$bob$$"
        );
    }

    #[test]
    fn rejects_unknown_and_malformed() {
        assert!(matches!(
            Message::parse("$Bogus x"),
            Err(ProtoError::UnknownVerb(_))
        ));
        assert!(matches!(
            Message::parse("$ValidateNick"),
            Err(ProtoError::MalformedFrame { .. })
        ));
        assert!(matches!(
            Message::parse("$GetINFO alice"),
            Err(ProtoError::MalformedFrame { .. })
        ));
        let long = format!("${} x", "V".repeat(MAX_VERB_LEN + 1));
        assert!(matches!(
            Message::parse(&long),
            Err(ProtoError::VerbTooLong(_))
        ));
    }

    #[test]
    fn display_round_trips() {
        let frames = [
            "$Key abc",
            "$ValidateNick alice",
            "$MyPass secret",
            "$Version 1,0091",
            "$GetNickList",
            "$GetINFO alice bob",
            "$ConnectToMe bob 1.2.3.4:412",
            "$RevConnectToMe alice bob",
            "$Kick bob",
            "$Close bob",
            "$ReloadBots",
            "$Hello alice",
            "$GetPass",
            "$BadPass",
            "$ValidateDenide alice",
            "$HubName Test Hub",
            "$ForceMove other.hub:411",
            "$Quit alice",
            "<alice> hi",
        ];
        for frame in frames {
            let msg = Message::parse(frame).unwrap();
            assert_eq!(msg.to_string(), frame, "round trip failed for {frame:?}");
        }
    }
}
