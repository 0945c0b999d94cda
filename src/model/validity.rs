//! Validity timestamp algebra
//!
//! Timestamps on the wire are RFC-3339 with millisecond precision, always
//! UTC. Three sentinels are recognized: `infinity` (open validity),
//! `never` (no deprovisioning / no activation) and `unknown` (activation
//! state not yet determined). Ordering is total with
//! `never < any instant < infinity`.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EyeError;

pub const INFINITY: &str = "infinity";
pub const NEVER: &str = "never";
pub const UNKNOWN: &str = "unknown";

/// Format an instant the way every Eye timestamp is emitted.
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC-3339 instant, normalizing to UTC.
pub fn parse_ts(s: &str) -> Result<DateTime<Utc>, EyeError> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| EyeError::MalformedInput(format!("invalid timestamp {:?}: {}", s, e)))
}

/// A validity bound: an instant or positive time infinity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Validity {
    At(DateTime<Utc>),
    Infinity,
}

impl Validity {
    pub fn parse(s: &str) -> Result<Self, EyeError> {
        match s {
            INFINITY => Ok(Validity::Infinity),
            _ => parse_ts(s).map(Validity::At),
        }
    }

    /// The canonical "still open" test: equality with positive infinity.
    pub fn is_open(&self) -> bool {
        *self == Validity::Infinity
    }
}

impl Display for Validity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Validity::At(ts) => write!(f, "{}", format_ts(ts)),
            Validity::Infinity => write!(f, "{}", INFINITY),
        }
    }
}

impl Ord for Validity {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Validity::Infinity, Validity::Infinity) => Ordering::Equal,
            (Validity::Infinity, _) => Ordering::Greater,
            (_, Validity::Infinity) => Ordering::Less,
            (Validity::At(a), Validity::At(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Validity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Option<DateTime<Utc>>> for Validity {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        match value {
            Some(ts) => Validity::At(ts),
            None => Validity::Infinity,
        }
    }
}

/// A provisioning mark: an instant or negative time infinity (`never`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provision {
    At(DateTime<Utc>),
    Never,
}

impl Provision {
    pub fn parse(s: &str) -> Result<Self, EyeError> {
        match s {
            NEVER => Ok(Provision::Never),
            _ => parse_ts(s).map(Provision::At),
        }
    }
}

impl Display for Provision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Provision::At(ts) => write!(f, "{}", format_ts(ts)),
            Provision::Never => write!(f, "{}", NEVER),
        }
    }
}

impl Ord for Provision {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Provision::Never, Provision::Never) => Ordering::Equal,
            (Provision::Never, _) => Ordering::Less,
            (_, Provision::Never) => Ordering::Greater,
            (Provision::At(a), Provision::At(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Provision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Option<DateTime<Utc>>> for Provision {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        match value {
            Some(ts) => Provision::At(ts),
            None => Provision::Never,
        }
    }
}

/// Activation state of a configuration. `unknown` is only valid here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Activation {
    At(DateTime<Utc>),
    Never,
    #[default]
    Unknown,
}

impl Activation {
    pub fn parse(s: &str) -> Result<Self, EyeError> {
        match s {
            NEVER => Ok(Activation::Never),
            UNKNOWN => Ok(Activation::Unknown),
            _ => parse_ts(s).map(Activation::At),
        }
    }
}

impl Display for Activation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Activation::At(ts) => write!(f, "{}", format_ts(ts)),
            Activation::Never => write!(f, "{}", NEVER),
            Activation::Unknown => write!(f, "{}", UNKNOWN),
        }
    }
}

macro_rules! sentinel_serde {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                $ty::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

sentinel_serde!(Validity);
sentinel_serde!(Provision);
sentinel_serde!(Activation);
