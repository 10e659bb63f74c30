use crate::aws::AwsDirectory;
use crate::config::TenantConfig;
use crate::directory::DomainDirectory;
use crate::errors::GatewayError;
use crate::http::plain_response;
use crate::manager::DomainProxyManager;
use http::Uri;
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

const MISSING_REGION: &str = "An AWS region must be provided";
const MISSING_DOMAIN: &str = "An AWS ES domain name must be provided";

/// Serves one tenant's requests.
///
/// Fills in whatever coordinates the tenant fixes by configuration, takes
/// the rest from the request path, and either renders a diagnostic response
/// or forwards through the manager's signing proxy.
pub struct TenantHandler {
    config: TenantConfig,
    manager: DomainProxyManager,
}

impl TenantHandler {
    pub fn new(config: TenantConfig) -> Self {
        let directory = Arc::new(AwsDirectory::new(config.role.clone()));
        TenantHandler::with_directory(config, directory)
    }

    /// Builds a handler over a caller-supplied directory.
    pub fn with_directory(config: TenantConfig, directory: Arc<dyn DomainDirectory>) -> Self {
        TenantHandler {
            config,
            manager: DomainProxyManager::new(directory),
        }
    }

    pub async fn serve(&self, request: Request<Bytes>) -> Response<Bytes> {
        let (region, domain, path) = resolve_coordinates(&self.config, request.uri().path());

        if region.is_empty() {
            return plain_response(StatusCode::BAD_REQUEST, MISSING_REGION);
        }
        if domain.is_empty() {
            return self.render_missing_domain(&region).await;
        }
        self.proxy_request(request, &region, &domain, &path).await
    }

    /// The domain segment was absent: answer with the names the tenant could
    /// have asked for. Listing failures stay generic; the cause is logged only.
    async fn render_missing_domain(&self, region: &str) -> Response<Bytes> {
        match self.manager.list_domains(region).await {
            Ok(names) => {
                let mut body = format!("{MISSING_DOMAIN}. Available domain names:\n\n");
                for name in names {
                    body.push_str(&name);
                    body.push('\n');
                }
                plain_response(StatusCode::BAD_REQUEST, body)
            }
            Err(err) => {
                tracing::error!(region, error = %err, "domain listing failed");
                plain_response(StatusCode::INTERNAL_SERVER_ERROR, MISSING_DOMAIN)
            }
        }
    }

    async fn proxy_request(
        &self,
        request: Request<Bytes>,
        region: &str,
        domain: &str,
        path: &str,
    ) -> Response<Bytes> {
        let proxy = match self.manager.get_proxy(region, domain).await {
            Ok(proxy) => proxy,
            Err(err @ GatewayError::DomainNotFound) => {
                return plain_response(StatusCode::NOT_FOUND, err.to_string());
            }
            Err(err @ GatewayError::InvalidDomainName) => {
                return plain_response(StatusCode::BAD_REQUEST, err.to_string());
            }
            Err(err) => {
                tracing::warn!(region, domain, error = %err, "domain resolution failed");
                return plain_response(StatusCode::BAD_GATEWAY, "Bad Gateway");
            }
        };

        let request = rewrite_path(request, path);
        match proxy.forward(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(region, domain, error = %err, "upstream request failed");
                plain_response(StatusCode::BAD_GATEWAY, "Bad Gateway")
            }
        }
    }
}

/// Determines `(region, domain, residual path)` for a request path.
///
/// Coordinates fixed by the tenant configuration are not consumed from the
/// path; the rest are taken one segment at a time. Missing segments come
/// back empty rather than erroring.
pub(crate) fn resolve_coordinates(config: &TenantConfig, path: &str) -> (String, String, String) {
    let mut path = if path.is_empty() { "/" } else { path }.to_string();

    let region = match &config.region {
        Some(region) => region.clone(),
        None => {
            let (segment, rest) = split_next_segment(&path);
            path = rest;
            segment
        }
    };

    let domain = match &config.domain {
        Some(domain) => domain.clone(),
        None => {
            let (segment, rest) = split_next_segment(&path);
            path = rest;
            segment
        }
    };

    (region, domain, path)
}

/// Splits the leading path segment off, returning `(segment, remainder)`;
/// the remainder always keeps a leading "/".
fn split_next_segment(path: &str) -> (String, String) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((segment, rest)) => (segment.to_string(), format!("/{rest}")),
        None => (trimmed.to_string(), "/".to_string()),
    }
}

/// Replaces the request path with the residual path, keeping the query.
fn rewrite_path(request: Request<Bytes>, path: &str) -> Request<Bytes> {
    let (mut parts, body) = request.into_parts();

    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    if let Ok(uri) = path_and_query.parse::<Uri>() {
        parts.uri = uri;
    }

    Request::from_parts(parts, body)
}
