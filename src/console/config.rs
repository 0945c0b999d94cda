//! HTTP handlers for the configuration write API
//!
//! Handlers decode the request, compute the lookup hash and hand the
//! work to the write worker over its bounded queue, then await the
//! reply on the request's single-shot sink and render it.

use actix_web::{delete, patch, post, put, web, HttpResponse, Scope};
use serde::Deserialize;
use tokio::sync::oneshot;

use crate::console::respond::{hard_internal_error, respond};
use crate::core::msg::{self, Action, ProtocolVersion, Section};
use crate::error::EyeError;
use crate::model::common::{lookup_hash, AppState};
use crate::model::configuration::{Configuration, Task};

#[derive(Debug, Deserialize)]
struct WriteParam {
    #[serde(rename = "feedbackURL")]
    feedback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveParam {
    task: Option<String>,
    clearing: Option<bool>,
    reset_activation: Option<bool>,
    #[serde(rename = "feedbackURL")]
    feedback_url: Option<String>,
}

#[post("/{configurationID}")]
pub async fn add(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Configuration>,
    params: web::Query<WriteParam>,
) -> HttpResponse {
    submit_configuration(
        &state,
        Action::Add,
        path.into_inner(),
        body.into_inner(),
        params.into_inner().feedback_url,
    )
    .await
}

#[put("/{configurationID}")]
pub async fn update(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Configuration>,
    params: web::Query<WriteParam>,
) -> HttpResponse {
    submit_configuration(
        &state,
        Action::Update,
        path.into_inner(),
        body.into_inner(),
        params.into_inner().feedback_url,
    )
    .await
}

#[delete("/{configurationID}")]
pub async fn remove(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<RemoveParam>,
) -> HttpResponse {
    let params = params.into_inner();

    let configuration_task = match params.task.as_deref() {
        None => None,
        Some("delete") => Some(Task::Delete),
        Some(other) => {
            return reject(
                &state,
                Action::Remove,
                EyeError::MalformedInput(format!("unsupported removal task {:?}", other)),
            )
        }
    };

    let configuration = Configuration {
        id: path.into_inner(),
        ..Default::default()
    };
    let (mut request, reply) =
        msg::Request::new(Section::Configuration, Action::Remove, configuration);
    request.configuration_task = configuration_task;
    request.flags.alarm_clearing = params.clearing.unwrap_or(false);
    request.flags.reset_activation = params.reset_activation.unwrap_or(false);
    request.flags.cache_invalidation = true;
    if let Some(url) = params.feedback_url {
        request.flags.send_deployment_feedback = true;
        request.feedback_url = url;
    }

    enqueue(&state, request, reply).await
}

#[patch("/{configurationID}/active")]
pub async fn activate(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let configuration = Configuration {
        id: path.into_inner(),
        ..Default::default()
    };
    let (request, reply) =
        msg::Request::new(Section::Configuration, Action::Activate, configuration);
    enqueue(&state, request, reply).await
}

async fn submit_configuration(
    state: &web::Data<AppState>,
    action: Action,
    id: String,
    mut configuration: Configuration,
    feedback_url: Option<String>,
) -> HttpResponse {
    if configuration.id.is_empty() {
        configuration.id = id.clone();
    }
    if configuration.id != id {
        return reject(
            state,
            action,
            EyeError::MalformedInput("configuration id does not match the request path".to_string()),
        );
    }
    if configuration.data.is_empty() {
        return reject(
            state,
            action,
            EyeError::MalformedInput("configuration carries no data".to_string()),
        );
    }

    let hash = lookup_hash(configuration.host_id, &configuration.metric);
    let (mut request, reply) = msg::Request::new(Section::Configuration, action, configuration);
    request.lookup_hash = hash;
    request.flags.cache_invalidation = true;
    if let Some(url) = feedback_url {
        request.flags.send_deployment_feedback = true;
        request.feedback_url = url;
    }

    enqueue(state, request, reply).await
}

async fn enqueue(
    state: &web::Data<AppState>,
    request: msg::Request,
    reply: oneshot::Receiver<msg::Result>,
) -> HttpResponse {
    if state.write_queue.send(request).await.is_err() {
        return HttpResponse::ServiceUnavailable().body("write handler unavailable");
    }
    match reply.await {
        Ok(result) => respond(state, result),
        // the worker emits exactly one reply per request; a closed sink
        // means it terminated mid-flight
        Err(_) => hard_internal_error(),
    }
}

fn reject(state: &web::Data<AppState>, action: Action, err: EyeError) -> HttpResponse {
    let mut result = msg::Result::new(ProtocolVersion::Two, Section::Configuration, action);
    result.bad_request(err);
    respond(state, result)
}

pub fn routes() -> Scope {
    web::scope("/api/v2/configuration")
        .service(add)
        .service(update)
        .service(remove)
        .service(activate)
}
