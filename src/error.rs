//! Unified error handling for nmdcd.
//!
//! One hierarchy for everything the hub can reject: protocol violations,
//! policy denials, bad administrative arguments, and storage/network
//! failures. Check-phase denials wrap a [`HubError`] in [`Deny`] so the
//! dispatcher can short-circuit without unwinding.

use nmdc_proto::ProtoError;
use thiserror::Error;

/// Errors raised while admitting, validating, or serving a client.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] ProtoError),

    #[error("unknown verb: {0}")]
    UnknownVerb(String),

    #[error("not permitted")]
    NotPermitted,

    #[error("nick {0} is banned")]
    BannedNick(String),

    #[error("ip {0} is banned")]
    BannedIp(String),

    #[error("nick {0} is in use")]
    NickInUse(String),

    #[error("no account for {0}")]
    UnknownAccount(String),

    #[error("bad password")]
    BadPassword,

    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("storage error: {0}")]
    Storage(#[from] crate::db::DbError),

    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("hub is shutting down")]
    Shutdown,
}

impl HubError {
    /// Static code string for structured log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedFrame(_) => "malformed_frame",
            Self::UnknownVerb(_) => "unknown_verb",
            Self::NotPermitted => "not_permitted",
            Self::BannedNick(_) => "banned_nick",
            Self::BannedIp(_) => "banned_ip",
            Self::NickInUse(_) => "nick_in_use",
            Self::UnknownAccount(_) => "unknown_account",
            Self::BadPassword => "bad_password",
            Self::BadArgument(_) => "bad_argument",
            Self::Duplicate(_) => "duplicate",
            Self::Storage(_) => "storage",
            Self::Network(_) => "network",
            Self::Shutdown => "shutdown",
        }
    }
}

/// A check-phase rejection. Any hub notice owed to the client has already
/// been sent by the time this is raised; the dispatcher only logs it.
#[derive(Debug)]
pub struct Deny(pub HubError);

impl Deny {
    /// Convenience constructor for argument errors in bot commands.
    pub fn bad_argument(reason: impl Into<String>) -> Self {
        Deny(HubError::BadArgument(reason.into()))
    }
}

impl From<HubError> for Deny {
    fn from(err: HubError) -> Self {
        Deny(err)
    }
}

/// Result type for check functions.
pub type CheckResult<T> = Result<T, Deny>;
