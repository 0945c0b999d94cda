//! Shutdown gate middleware
//!
//! Denies every request with 503 once a shutdown is in progress, so the
//! write worker only ever sees work it is still allowed to finish.

use std::sync::atomic::Ordering;

use actix_service::forward_ready;
use actix_utils::future::{ok, Ready};
use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::web::Data;
use actix_web::{Error, HttpResponse};
use futures_core::future::LocalBoxFuture;

use crate::model::common::AppState;

pub struct CheckShutdown;

impl<S, B> Transform<S, ServiceRequest> for CheckShutdown
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = CheckShutdownMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(CheckShutdownMiddleware { service })
    }
}

pub struct CheckShutdownMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for CheckShutdownMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let in_progress = req
            .app_data::<Data<AppState>>()
            .map(|state| state.shutdown.load(Ordering::Relaxed))
            .unwrap_or(false);

        if in_progress {
            let (request, _) = req.into_parts();
            let response = HttpResponse::ServiceUnavailable()
                .body("Shutdown in progress")
                .map_into_right_body();
            return Box::pin(async move { Ok(ServiceResponse::new(request, response)) });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}
