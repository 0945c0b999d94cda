//! Asynchronous side-effect sinks
//!
//! Fired after the reply has been rendered; a sink failure never
//! rewrites the already-delivered response, it is only logged.

use reqwest::Client;
use serde::Serialize;
use tracing::warn;

use crate::core::msg;

pub const FEEDBACK_SUCCESS: &str = "success";
pub const FEEDBACK_FAILED: &str = "failed";

/// POST the deployment feedback token to SOMA, fire and forget.
pub fn send_soma_feedback(client: Client, url: String, feedback: &'static str) {
    if url.is_empty() {
        warn!("deployment feedback requested without a feedback URL");
        return;
    }
    tokio::spawn(async move {
        if let Err(e) = client.post(&url).body(feedback).send().await {
            warn!("deployment feedback to {} failed: {}", url, e);
        }
    });
}

/// OK event clearing the alarm series of a deprovisioned configuration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClearingEvent {
    configuration_id: String,
    #[serde(rename = "lookupID")]
    lookup_id: String,
    #[serde(rename = "hostID")]
    host_id: u64,
    metric: String,
    state: &'static str,
}

/// Emit an OK event to CAMS, parametrized with the configuration
/// metadata loaded during the remove transaction.
pub fn clear_cams_alarm(client: Client, url: String, r: &msg::Result) {
    let configuration = match r.configurations.first() {
        Some(configuration) => configuration,
        None => {
            warn!("alarm clearing requested without configuration metadata");
            return;
        }
    };
    let event = ClearingEvent {
        configuration_id: configuration.id.clone(),
        lookup_id: configuration.lookup_id.clone(),
        host_id: configuration.host_id,
        metric: configuration.metric.clone(),
        state: "ok",
    };
    tokio::spawn(async move {
        if let Err(e) = client.post(&url).json(&event).send().await {
            warn!("alarm clearing event to {} failed: {}", url, e);
        }
    });
}
