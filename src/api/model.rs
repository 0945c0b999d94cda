//! External wire result models
//!
//! Zero-length payload lists are elided from the JSON encoding; the
//! renderer relies on this so failed requests never serialize empty
//! `configurations`/`registrations` arrays next to their errors.

use serde::{Deserialize, Serialize};

use crate::core::msg::{Action, Section};
use crate::model::configuration::{Configuration, Registration};

/// Protocol v2 result envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Result {
    pub status: u16,
    pub section: Section,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configurations: Vec<Configuration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registrations: Vec<Registration>,
}

impl Result {
    pub fn new(section: Section, action: Action) -> Self {
        Result {
            status: 0,
            section,
            action,
            errors: Vec::new(),
            configurations: Vec::new(),
            registrations: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_lists_are_elided() {
        let mut result = Result::new(Section::Configuration, Action::Add);
        result.status = 200;
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("errors").is_none());
        assert!(value.get("configurations").is_none());
        assert!(value.get("registrations").is_none());
        assert_eq!(value["status"], 200);
        assert_eq!(value["section"], "configuration");
        assert_eq!(value["action"], "add");
    }

    #[test]
    fn test_populated_lists_serialize() {
        let mut result = Result::new(Section::Configuration, Action::Remove);
        result.status = 500;
        result.errors.push("database gone".to_string());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["errors"], serde_json::json!(["database gone"]));
    }
}
