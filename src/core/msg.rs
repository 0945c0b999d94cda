//! Internal request/result envelope
//!
//! Every decoded API call becomes a `Request` carrying its own
//! single-shot reply sink. The write worker emits exactly one `Result`
//! per request on that sink, even on failure; the protocol renderer
//! turns the `Result` into the external wire form and drives the
//! post-commit side effects recorded in its flags.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::EyeError;
use crate::model::configuration::{Configuration, Registration, Task};

pub const RESULT_OK: u16 = 200;
pub const RESULT_BAD_REQUEST: u16 = 400;
pub const RESULT_SERVER_ERROR: u16 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolVersion {
    Invalid,
    One,
    Two,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Configuration,
    Deployment,
    Lookup,
    Registration,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Section::Configuration => "configuration",
            Section::Deployment => "deployment",
            Section::Lookup => "lookup",
            Section::Registration => "registration",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Add,
    Remove,
    Update,
    Activate,
    Nop,
    List,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Add => "add",
            Action::Remove => "remove",
            Action::Update => "update",
            Action::Activate => "activate",
            Action::Nop => "nop",
            Action::List => "list",
        };
        write!(f, "{}", s)
    }
}

/// Side-effect markers resolved after the reply has been rendered.
#[derive(Clone, Copy, Debug, Default)]
pub struct Flags {
    pub alarm_clearing: bool,
    pub reset_activation: bool,
    pub send_deployment_feedback: bool,
    pub cache_invalidation: bool,
}

/// A decoded API call on its way to the write worker.
pub struct Request {
    pub id: String,
    pub version: ProtocolVersion,
    pub section: Section,
    pub action: Action,
    pub lookup_hash: String,
    pub configuration: Configuration,
    pub configuration_task: Option<Task>,
    pub flags: Flags,
    pub feedback_url: String,
    pub reply: Option<oneshot::Sender<Result>>,
}

impl Request {
    /// Build a request together with the receiving end of its reply sink.
    pub fn new(
        section: Section,
        action: Action,
        configuration: Configuration,
    ) -> (Self, oneshot::Receiver<Result>) {
        let (tx, rx) = oneshot::channel();
        let request = Request {
            id: uuid::Uuid::new_v4().to_string(),
            version: ProtocolVersion::Two,
            section,
            action,
            lookup_hash: String::new(),
            configuration,
            configuration_task: None,
            flags: Flags::default(),
            feedback_url: String::new(),
            reply: Some(tx),
        };
        (request, rx)
    }
}

/// Outcome of a processed request.
#[derive(Clone, Debug)]
pub struct Result {
    pub version: ProtocolVersion,
    pub section: Section,
    pub action: Action,
    pub code: u16,
    pub error: Option<String>,
    pub configurations: Vec<Configuration>,
    pub registrations: Vec<Registration>,
    pub flags: Flags,
    pub feedback_url: String,
}

impl Result {
    pub fn new(version: ProtocolVersion, section: Section, action: Action) -> Self {
        Result {
            version,
            section,
            action,
            code: 0,
            error: None,
            configurations: Vec::new(),
            registrations: Vec::new(),
            flags: Flags::default(),
            feedback_url: String::new(),
        }
    }

    pub fn from_request(q: &Request) -> Self {
        Result {
            version: q.version,
            section: q.section,
            action: q.action,
            code: 0,
            error: None,
            configurations: Vec::new(),
            registrations: Vec::new(),
            flags: q.flags,
            feedback_url: q.feedback_url.clone(),
        }
    }

    pub fn ok(&mut self) {
        self.code = RESULT_OK;
    }

    pub fn bad_request(&mut self, err: impl std::fmt::Display) {
        self.code = RESULT_BAD_REQUEST;
        self.error = Some(err.to_string());
    }

    pub fn server_error(&mut self, err: impl std::fmt::Display) {
        self.code = RESULT_SERVER_ERROR;
        self.error = Some(err.to_string());
    }

    pub fn unknown_request(&mut self, q: &Request) {
        self.code = RESULT_BAD_REQUEST;
        self.error = Some(EyeError::UnknownRequest(q.action.to_string()).to_string());
    }

    /// Record a write-path failure under the error taxonomy.
    pub fn absorb(&mut self, err: &EyeError) {
        self.code = err.code();
        self.error = Some(err.to_string());
    }

    pub fn has_failed(&self) -> bool {
        self.code >= RESULT_BAD_REQUEST
    }

    /// The trimmed v1 list export: status code, error string, payload.
    pub fn export_v1_configuration_list(&self) -> (u16, String, &[Configuration]) {
        let errstr = self.error.clone().unwrap_or_default();
        (self.code, errstr, &self.configurations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        let (mut q, _rx) = Request::new(
            Section::Configuration,
            Action::Add,
            Configuration::default(),
        );
        q.flags.cache_invalidation = true;
        q.feedback_url = "http://soma.example/feedback".to_string();
        q
    }

    #[test]
    fn test_from_request_copies_routing_fields() {
        let q = request();
        let r = Result::from_request(&q);
        assert_eq!(r.version, ProtocolVersion::Two);
        assert_eq!(r.section, Section::Configuration);
        assert_eq!(r.action, Action::Add);
        assert!(r.flags.cache_invalidation);
        assert_eq!(r.feedback_url, "http://soma.example/feedback");
        assert_eq!(r.code, 0);
    }

    #[test]
    fn test_result_constructors() {
        let q = request();
        let mut r = Result::from_request(&q);

        r.ok();
        assert_eq!(r.code, RESULT_OK);
        assert!(!r.has_failed());

        r.server_error("boom");
        assert_eq!(r.code, RESULT_SERVER_ERROR);
        assert_eq!(r.error.as_deref(), Some("boom"));
        assert!(r.has_failed());

        r.unknown_request(&q);
        assert_eq!(r.code, RESULT_BAD_REQUEST);
        assert_eq!(r.error.as_deref(), Some("unknown requested action: add"));
    }

    #[test]
    fn test_absorb_maps_taxonomy() {
        let mut r = Result::new(ProtocolVersion::Two, Section::Configuration, Action::Add);
        r.absorb(&EyeError::MalformedInput("x".to_string()));
        assert_eq!(r.code, RESULT_BAD_REQUEST);

        r.absorb(&EyeError::InvariantViolation {
            statement: "data insert".to_string(),
            affected: 0,
        });
        assert_eq!(r.code, RESULT_SERVER_ERROR);
        assert_eq!(
            r.error.as_deref(),
            Some("Rollback: data insert affected 0 rows")
        );
    }

    #[test]
    fn test_reply_sink_delivers_once() {
        let (mut q, rx) = Request::new(
            Section::Configuration,
            Action::Nop,
            Configuration::default(),
        );
        let mut r = Result::from_request(&q);
        r.ok();
        q.reply.take().unwrap().send(r).unwrap();

        let delivered = rx.blocking_recv().unwrap();
        assert_eq!(delivered.code, RESULT_OK);
    }

    #[test]
    fn test_section_action_wire_names() {
        assert_eq!(
            serde_json::to_string(&Section::Registration).unwrap(),
            "\"registration\""
        );
        assert_eq!(serde_json::to_string(&Action::Remove).unwrap(), "\"remove\"");
        assert_eq!(Action::Activate.to_string(), "activate");
    }
}
