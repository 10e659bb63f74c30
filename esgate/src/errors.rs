use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Errors that can occur while resolving and forwarding a request
///
/// The tenant handler is the only place these are translated into HTTP
/// status codes; everything below it propagates them unchanged.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("AWS ES domain not found")]
    DomainNotFound,

    #[error("The provided AWS ES domain is invalid")]
    InvalidDomainName,

    #[error("Domain resolution failed: {0}")]
    DomainResolutionFailed(String),

    #[error("Domain listing failed: {0}")]
    ListingFailed(String),

    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Failed to read response body: {0}")]
    ResponseBodyError(String),

    #[error("Upstream request failed for {0}: {1}")]
    UpstreamRequestFailed(String, String),

    #[error("Failed to sign request: {0}")]
    SigningFailed(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
