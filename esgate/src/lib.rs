pub mod aws;
pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod errors;
pub mod handler;
pub mod http;
pub mod manager;
pub mod metrics_defs;
pub mod proxy;

#[cfg(test)]
pub mod testutils;

use crate::config::Config;
use crate::dispatcher::{Dispatcher, NotFoundNext};
use crate::errors::GatewayError;
use crate::http::run_http_service;
use http_body_util::{BodyExt, Full, combinators::BoxBody};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Runs the gateway until the listener fails.
pub async fn run(config: Config) -> Result<(), GatewayError> {
    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        tenants = config.tenants.len(),
        "starting gateway"
    );

    let dispatcher = Arc::new(Dispatcher::new(config.tenants, Arc::new(NotFoundNext)));
    let service = GatewayService::new(dispatcher);
    run_http_service(&config.listener.host, config.listener.port, service).await
}

/// Hyper service edge: buffers the request body and hands the request to
/// the dispatcher.
///
/// Bodies must be fully buffered before dispatch because the outbound
/// signature covers a hash of the complete payload. A body that cannot be
/// read fails the request here rather than forwarding it unsigned.
pub struct GatewayService {
    dispatcher: Arc<Dispatcher>,
}

impl GatewayService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        GatewayService { dispatcher }
    }
}

impl Service<Request<Incoming>> for GatewayService {
    type Response = Response<BoxBody<Bytes, GatewayError>>;
    type Error = GatewayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, request: Request<Incoming>) -> Self::Future {
        let dispatcher = self.dispatcher.clone();

        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) => {
                    // never forward a request whose payload could not be
                    // buffered; the signature must cover the complete body
                    let err = GatewayError::RequestBodyError(err.to_string());
                    tracing::warn!(error = %err, "rejecting request");
                    let response = crate::http::plain_response(
                        StatusCode::BAD_REQUEST,
                        "Failed to read request body",
                    );
                    return Ok(box_response(response));
                }
            };

            let response = dispatcher.dispatch(Request::from_parts(parts, body)).await;
            Ok(box_response(response))
        })
    }
}

fn box_response(response: Response<Bytes>) -> Response<BoxBody<Bytes, GatewayError>> {
    response.map(|body| Full::new(body).map_err(|e| match e {}).boxed())
}
