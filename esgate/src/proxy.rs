use crate::errors::GatewayError;
use crate::http::filter_hop_by_hop;
use crate::metrics_defs::UPSTREAM_REQUESTS;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{
    SignableBody, SignableRequest, SigningParams, SigningSettings, sign,
};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use bytes::Bytes;
use hyper::header::{CONNECTION, HOST, HeaderValue, USER_AGENT};
use hyper::{Request, Response};
use std::time::{Duration, SystemTime};
use url::Url;

/// The SigV4 service name Elasticsearch domains authenticate against.
const SIGNING_SERVICE: &str = "es";

/// Signatures are timestamped slightly in the past to tolerate clock drift
/// between this process and the endpoint's verifier.
const SIGNING_CLOCK_SKEW: Duration = Duration::from_secs(10);

/// A reverse proxy bound to one resolved domain endpoint.
///
/// Every forwarded request is rewritten to the endpoint host and signed
/// with SigV4 under the credentials the endpoint was resolved with. The
/// signature covers a hash of the complete body, which the caller has
/// already buffered into `Bytes`, so the forwarded payload is byte-exact.
#[derive(Debug)]
pub struct SigningProxy {
    region: String,
    endpoint: String,
    credentials: SharedCredentialsProvider,
    client: reqwest::Client,
}

impl SigningProxy {
    pub fn new(
        region: &str,
        endpoint: String,
        credentials: SharedCredentialsProvider,
    ) -> Result<Self, GatewayError> {
        // Signed connection-scoped headers must survive the transport
        // untouched; h2 strips them, so the upstream leg stays on http/1.1.
        let client = reqwest::Client::builder()
            .http1_only()
            .build()
            .map_err(|err| GatewayError::InternalError(err.to_string()))?;

        Ok(SigningProxy {
            region: region.to_string(),
            endpoint,
            credentials,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Forwards the request to the domain endpoint and returns its response.
    pub async fn forward(&self, request: Request<Bytes>) -> Result<Response<Bytes>, GatewayError> {
        let upstream_request = self.build_upstream_request(request).await?;

        metrics::counter!(UPSTREAM_REQUESTS.name).increment(1);
        let outbound = reqwest::Request::try_from(upstream_request).map_err(|err| {
            GatewayError::UpstreamRequestFailed(self.endpoint.clone(), err.to_string())
        })?;
        let response = self.client.execute(outbound).await.map_err(|err| {
            GatewayError::UpstreamRequestFailed(self.endpoint.clone(), err.to_string())
        })?;

        let status = response.status();
        let mut headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| GatewayError::ResponseBodyError(err.to_string()))?;
        filter_hop_by_hop(&mut headers);

        let mut forwarded = Response::new(body);
        *forwarded.status_mut() = status;
        *forwarded.headers_mut() = headers;
        Ok(forwarded)
    }

    /// The director: rewrites the request for the endpoint and signs it.
    async fn build_upstream_request(
        &self,
        request: Request<Bytes>,
    ) -> Result<Request<Bytes>, GatewayError> {
        let (parts, body) = request.into_parts();

        let mut url = Url::parse(&format!("https://{}", self.endpoint))
            .map_err(|err| GatewayError::InternalError(err.to_string()))?;
        url.set_path(parts.uri.path());
        url.set_query(parts.uri.query());

        let mut headers = parts.headers;
        filter_hop_by_hop(&mut headers);

        // any inbound host override must not reach the signer
        headers.remove(HOST);
        headers.insert(
            HOST,
            HeaderValue::from_str(&self.endpoint)
                .map_err(|err| GatewayError::InternalError(err.to_string()))?,
        );

        // if the client hasn't set a User-Agent, don't allow the transport
        // to inject a default one downstream
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_static(""));
        }

        // signing fails against some transport stacks with keep-alive
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|err| GatewayError::SigningFailed(err.to_string()))?;
        let identity: Identity = credentials.into();

        let params: SigningParams = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SIGNING_SERVICE)
            .time(SystemTime::now() - SIGNING_CLOCK_SKEW)
            .settings(SigningSettings::default())
            .build()
            .map_err(|err| GatewayError::SigningFailed(err.to_string()))?
            .into();

        let mut signable_headers = Vec::with_capacity(headers.len());
        for (name, value) in headers.iter() {
            let value = value.to_str().map_err(|_| {
                GatewayError::SigningFailed(format!("non-ascii value for header {name}"))
            })?;
            signable_headers.push((name.as_str(), value));
        }

        let signable = SignableRequest::new(
            parts.method.as_str(),
            url.as_str(),
            signable_headers.into_iter(),
            SignableBody::Bytes(body.as_ref()),
        )
        .map_err(|err| GatewayError::SigningFailed(err.to_string()))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|err| GatewayError::SigningFailed(err.to_string()))?
            .into_parts();

        let mut upstream = Request::builder()
            .method(parts.method)
            .uri(url.as_str())
            .body(body)
            .map_err(|err| GatewayError::InternalError(err.to_string()))?;
        *upstream.headers_mut() = headers;
        instructions.apply_to_request_http1x(&mut upstream);

        Ok(upstream)
    }
}
