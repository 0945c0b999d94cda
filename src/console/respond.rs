//! Protocol renderer
//!
//! Maps an internal result to the external wire form of its protocol
//! version, then drives the post-commit side effects. Side effects only
//! fire for successful requests; results with a status of 400 or higher
//! are stripped of their payload before rendering so no data leaks
//! alongside an error.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;

use crate::api;
use crate::console::dispatch;
use crate::core::msg::{self, Action, ProtocolVersion, Section};
use crate::model::common::AppState;

/// Output function for all requests.
pub fn respond(state: &AppState, r: msg::Result) -> HttpResponse {
    match r.version {
        ProtocolVersion::Invalid => panic!("API protocol 0 is not valid"),
        ProtocolVersion::One => respond_v1(r),
        ProtocolVersion::Two => respond_v2(state, r),
    }
}

/// Emit an API version 1 result. Protocol 1 only has the configuration
/// list and remove surfaces.
fn respond_v1(r: msg::Result) -> HttpResponse {
    if r.section == Section::Registration {
        panic!("API protocol 1 does not have registrations");
    }

    match r.action {
        Action::List => {
            let (code, errstr, list) = r.export_v1_configuration_list();
            if code >= msg::RESULT_BAD_REQUEST {
                return status_response(code).body(errstr);
            }
            match serde_json::to_vec(list) {
                Ok(body) => status_response(code)
                    .content_type("application/json")
                    .body(body),
                Err(_) => hard_internal_error(),
            }
        }
        Action::Remove => {
            if r.error.is_some() && r.code >= msg::RESULT_SERVER_ERROR {
                return HttpResponse::InternalServerError()
                    .body(r.error.unwrap_or_default());
            }
            if r.error.is_some() && r.code >= msg::RESULT_BAD_REQUEST {
                return HttpResponse::BadRequest().body(r.error.unwrap_or_default());
            }
            HttpResponse::NoContent().finish()
        }
        // protocol 1 exposes no other path
        _ => HttpResponse::Ok().finish(),
    }
}

/// Emit an API version 2 result.
fn respond_v2(state: &AppState, mut r: msg::Result) -> HttpResponse {
    let mut proto = api::model::Result::new(r.section, r.action);
    let mut feedback = dispatch::FEEDBACK_SUCCESS;

    if let Some(err) = &r.error {
        proto.errors.push(err.clone());
        feedback = dispatch::FEEDBACK_FAILED;
    }

    match r.section {
        Section::Registration => proto.registrations.extend_from_slice(&r.registrations),
        _ => proto.configurations.extend_from_slice(&r.configurations),
    }

    proto.status = r.code;

    // no results are exported on error to avoid accidental data leaks,
    // no cache invalidation and no alarm clearing for failed requests
    if r.code >= msg::RESULT_BAD_REQUEST {
        proto.configurations.clear();
        proto.registrations.clear();
        r.flags.cache_invalidation = false;
        r.flags.alarm_clearing = false;
        feedback = dispatch::FEEDBACK_FAILED;
    }

    // send deployment feedback to SOMA
    if r.flags.send_deployment_feedback {
        dispatch::send_soma_feedback(
            state.http_client.clone(),
            r.feedback_url.clone(),
            feedback,
        );
    }

    if r.flags.cache_invalidation && !r.flags.alarm_clearing {
        // TODO: asynchronous active cache invalidation, since no
        // clearing action depends on the invalidation having been
        // performed
    }

    if r.flags.cache_invalidation && r.flags.alarm_clearing {
        // TODO: synchronous active cache invalidation, since the
        // clearing has to be blocked until the invalidation has been
        // performed
    }

    // send OK event to CAMS to clear the alarm series
    if r.flags.alarm_clearing {
        dispatch::clear_cams_alarm(state.http_client.clone(), state.cams_url.clone(), &r);
    }

    match serde_json::to_vec(&proto) {
        Ok(body) => status_response(r.code)
            .content_type("application/json")
            .body(body),
        Err(_) => hard_internal_error(),
    }
}

/// Plain 500 without a body, for failures inside the renderer itself.
pub fn hard_internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().finish()
}

fn status_response(code: u16) -> actix_web::HttpResponseBuilder {
    HttpResponse::build(
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::common::AppState;
    use crate::model::configuration::Configuration;
    use actix_web::body::to_bytes;
    use tokio::sync::mpsc;

    fn state() -> AppState {
        let (write_queue, _input) = mpsc::channel(1);
        AppState::new(config::Config::default(), write_queue, String::new())
    }

    fn result(version: ProtocolVersion, section: Section, action: Action) -> msg::Result {
        msg::Result::new(version, section, action)
    }

    #[tokio::test]
    async fn test_v2_success_carries_payload() {
        let mut r = result(ProtocolVersion::Two, Section::Configuration, Action::Add);
        r.ok();
        r.configurations.push(Configuration {
            id: "cfg-4711".to_string(),
            ..Default::default()
        });

        let res = respond(&state(), r);
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], 200);
        assert_eq!(value["configurations"][0]["id"], "cfg-4711");
        assert!(value.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_v2_error_suppresses_payload_and_side_effects() {
        let mut r = result(ProtocolVersion::Two, Section::Configuration, Action::Add);
        r.server_error("database gone");
        r.configurations.push(Configuration {
            id: "cfg-4711".to_string(),
            ..Default::default()
        });
        r.flags.alarm_clearing = true;
        r.flags.cache_invalidation = true;

        let res = respond(&state(), r);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(res.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["errors"], serde_json::json!(["server error: database gone"]));
        assert!(value.get("configurations").is_none());
        assert!(value.get("registrations").is_none());
    }

    #[tokio::test]
    async fn test_v1_remove_status_mapping() {
        let mut r = result(ProtocolVersion::One, Section::Configuration, Action::Remove);
        r.ok();
        let res = respond_v1(r);
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let mut r = result(ProtocolVersion::One, Section::Configuration, Action::Remove);
        r.server_error("boom");
        let res = respond_v1(r);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let mut r = result(ProtocolVersion::One, Section::Configuration, Action::Remove);
        r.bad_request("bad");
        let res = respond_v1(r);
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_v1_list_emits_array() {
        let mut r = result(ProtocolVersion::One, Section::Configuration, Action::List);
        r.ok();
        r.configurations.push(Configuration {
            id: "cfg-4711".to_string(),
            ..Default::default()
        });

        let res = respond_v1(r);
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["id"], "cfg-4711");
    }

    #[test]
    #[should_panic(expected = "API protocol 1 does not have registrations")]
    fn test_v1_registration_is_a_programmer_error() {
        let r = result(ProtocolVersion::One, Section::Registration, Action::Add);
        respond_v1(r);
    }

    #[tokio::test]
    #[should_panic(expected = "API protocol 0 is not valid")]
    async fn test_protocol_invalid_is_a_programmer_error() {
        let r = result(
            ProtocolVersion::Invalid,
            Section::Configuration,
            Action::Add,
        );
        respond(&state(), r);
    }
}
