use crate::config::TenantConfig;
use crate::handler::TenantHandler;
use crate::http::plain_response;
use async_trait::async_trait;
use http::Uri;
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

/// The handler a request falls through to when no tenant prefix matches.
#[async_trait]
pub trait NextHandler: Send + Sync {
    async fn handle(&self, request: Request<Bytes>) -> Response<Bytes>;
}

/// Default end of the chain: a plain 404.
pub struct NotFoundNext;

#[async_trait]
impl NextHandler for NotFoundNext {
    async fn handle(&self, _request: Request<Bytes>) -> Response<Bytes> {
        plain_response(StatusCode::NOT_FOUND, "No route matched\n")
    }
}

struct TenantRoute {
    config: TenantConfig,
    handler: TenantHandler,
}

/// Routes requests to tenant handlers by longest path prefix.
///
/// Holds the routing table for the process lifetime; tenants and their
/// handlers are built once from validated configuration.
pub struct Dispatcher {
    routes: Vec<TenantRoute>,
    next: Arc<dyn NextHandler>,
}

impl Dispatcher {
    pub fn new(tenants: Vec<TenantConfig>, next: Arc<dyn NextHandler>) -> Self {
        let routes = tenants
            .into_iter()
            .map(|config| TenantRoute {
                handler: TenantHandler::new(config.clone()),
                config,
            })
            .collect();
        Dispatcher::from_routes(routes, next)
    }

    /// Assembles a dispatcher from pre-built routes.
    pub(crate) fn with_handlers(
        tenants: Vec<(TenantConfig, TenantHandler)>,
        next: Arc<dyn NextHandler>,
    ) -> Self {
        let routes = tenants
            .into_iter()
            .map(|(config, handler)| TenantRoute { config, handler })
            .collect();
        Dispatcher::from_routes(routes, next)
    }

    fn from_routes(mut routes: Vec<TenantRoute>, next: Arc<dyn NextHandler>) -> Self {
        // longest prefix first, stable on ties
        routes.sort_by(|a, b| b.config.path.len().cmp(&a.config.path.len()));
        Dispatcher { routes, next }
    }

    pub async fn dispatch(&self, request: Request<Bytes>) -> Response<Bytes> {
        match self.match_index(request.uri().path()) {
            Some(index) => {
                let route = &self.routes[index];
                tracing::debug!(
                    prefix = %route.config.path,
                    path = %request.uri().path(),
                    "matched tenant"
                );
                let request = strip_prefix(request, &route.config.path);
                route.handler.serve(request).await
            }
            None => self.next.handle(request).await,
        }
    }

    /// Index of the first (longest-prefix) tenant matching the path.
    ///
    /// A prefix matches the path it equals and any path under it; `/foo`
    /// matches `/foo` and `/foo/bar` but never `/foobar`. The empty prefix
    /// matches everything.
    fn match_index(&self, path: &str) -> Option<usize> {
        self.routes.iter().position(|route| {
            let prefix = &route.config.path;
            path == prefix || path.starts_with(&format!("{prefix}/"))
        })
    }
}

/// Removes the matched prefix from the request path, keeping the query;
/// a fully consumed path becomes "/".
fn strip_prefix(request: Request<Bytes>, prefix: &str) -> Request<Bytes> {
    if prefix.is_empty() {
        return request;
    }

    let (mut parts, body) = request.into_parts();
    let path = parts.uri.path();
    let stripped = path.strip_prefix(prefix).unwrap_or(path);
    let stripped = if stripped.is_empty() { "/" } else { stripped };

    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{stripped}?{query}"),
        None => stripped.to_string(),
    };
    if let Ok(uri) = path_and_query.parse::<Uri>() {
        parts.uri = uri;
    }

    Request::from_parts(parts, body)
}
