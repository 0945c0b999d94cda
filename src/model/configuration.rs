//! Wire data model for the v2 protocol
//!
//! The `Configuration` shape is also what gets stored verbatim as the
//! payload blob of a data revision; downstream deserializers rely on its
//! stability. `Data.info` is cleared before the blob is serialized and
//! rebuilt from the database columns when a result is emitted.

use serde::{Deserialize, Serialize};

use crate::model::validity::{Activation, Provision, Validity};

/// Lifecycle task attached to a data revision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Rollout,
    Deprovision,
    Delete,
    Clearing,
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Task::Rollout => "rollout",
            Task::Deprovision => "deprovision",
            Task::Delete => "delete",
            Task::Clearing => "clearing",
        };
        write!(f, "{}", s)
    }
}

/// A monitoring configuration registered by an external agent.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub id: String,
    #[serde(rename = "lookupID", default, skip_serializing_if = "String::is_empty")]
    pub lookup_id: String,
    #[serde(rename = "hostID")]
    pub host_id: u64,
    pub metric: String,
    #[serde(default)]
    pub activated_at: Activation,
    #[serde(default)]
    pub data: Vec<Data>,
}

/// One time-bounded snapshot of the configuration payload.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<MetaInformation>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub monitoring: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub oncall: String,
    #[serde(default)]
    pub interval: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thresholds: Vec<Threshold>,
}

/// Alarm threshold inside a data revision.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threshold {
    pub predicate: String,
    pub level: u16,
    pub value: i64,
}

/// Validity and lifecycle metadata of a data revision.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaInformation {
    pub valid_from: Validity,
    pub valid_until: Validity,
    pub provisioned_at: Provision,
    pub deprovisioned_at: Provision,
    pub tasks: Vec<Task>,
}

/// Application registration, carried by registration-shaped results.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub application: String,
    pub address: String,
    pub port: u16,
    pub database: u32,
}
