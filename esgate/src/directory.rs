use crate::errors::GatewayError;
use async_trait::async_trait;
use aws_credential_types::provider::SharedCredentialsProvider;

/// Directory of Elasticsearch domains in a region
///
/// Sits between the proxy manager and the AWS API so tests can substitute
/// an instrumented fake. The real implementation is [`crate::aws::AwsDirectory`].
#[async_trait]
pub trait DomainDirectory: Send + Sync {
    /// All domain names visible in the region, in API order.
    async fn list_domain_names(&self, region: &str) -> Result<Vec<String>, GatewayError>;

    /// Resolves a domain name to its endpoint host.
    ///
    /// A domain without a reachable endpoint is reported as
    /// [`GatewayError::DomainNotFound`].
    async fn domain_endpoint(&self, region: &str, domain: &str) -> Result<String, GatewayError>;

    /// The credentials the signer for this region must sign with; the same
    /// identity the directory calls themselves are made under.
    async fn signing_credentials(
        &self,
        region: &str,
    ) -> Result<SharedCredentialsProvider, GatewayError>;
}
