use crate::directory::DomainDirectory;
use crate::errors::GatewayError;
use crate::metrics_defs::REGION_CLIENTS_CREATED;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::sts::AssumeRoleProvider;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_elasticsearch::error::DisplayErrorContext;
use std::collections::HashMap;
use tokio::sync::RwLock;

const SESSION_NAME: &str = "esgate";

/// One cached AWS client bundle for a region.
///
/// The credentials provider is the one the Elasticsearch client was built
/// with, so signatures are produced under the same identity as the
/// directory calls.
#[derive(Clone)]
pub struct RegionClient {
    pub elasticsearch: aws_sdk_elasticsearch::Client,
    pub credentials: SharedCredentialsProvider,
}

/// Builds region-scoped AWS clients, at most one per region.
///
/// With a role configured, each client's credentials come from assuming
/// that role; otherwise the ambient default credential chain is used.
/// Clients are cached forever once constructed.
pub struct AwsClientFactory {
    role: Option<String>,
    clients: RwLock<HashMap<String, RegionClient>>,
}

impl AwsClientFactory {
    pub fn new(role: Option<String>) -> Self {
        AwsClientFactory {
            role,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached client for the region, constructing it on first use.
    pub async fn get_client(&self, region: &str) -> Result<RegionClient, GatewayError> {
        if let Some(client) = self.clients.read().await.get(region) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;
        // re-check under the write lock; a racing task may have won
        if let Some(client) = clients.get(region) {
            return Ok(client.clone());
        }

        let client = self.new_client(region).await?;
        clients.insert(region.to_string(), client.clone());
        Ok(client)
    }

    /// Constructs a new client without touching the cache.
    async fn new_client(&self, region: &str) -> Result<RegionClient, GatewayError> {
        let region = Region::new(region.to_string());
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region.clone());

        if let Some(role) = &self.role {
            tracing::debug!(%region, role = %role, "assuming role for region client");
            let provider = AssumeRoleProvider::builder(role.clone())
                .region(region.clone())
                .session_name(SESSION_NAME)
                .build()
                .await;
            loader = loader.credentials_provider(provider);
        }

        let sdk_config = loader.load().await;
        let credentials = sdk_config.credentials_provider().ok_or_else(|| {
            GatewayError::InternalError("AWS config has no credentials provider".to_string())
        })?;

        metrics::counter!(REGION_CLIENTS_CREATED.name).increment(1);
        Ok(RegionClient {
            elasticsearch: aws_sdk_elasticsearch::Client::new(&sdk_config),
            credentials,
        })
    }
}

/// [`DomainDirectory`] over the AWS Elasticsearch Service API.
pub struct AwsDirectory {
    factory: AwsClientFactory,
}

impl AwsDirectory {
    pub fn new(role: Option<String>) -> Self {
        AwsDirectory {
            factory: AwsClientFactory::new(role),
        }
    }
}

#[async_trait]
impl DomainDirectory for AwsDirectory {
    async fn list_domain_names(&self, region: &str) -> Result<Vec<String>, GatewayError> {
        let client = self.factory.get_client(region).await?;
        let output = client
            .elasticsearch
            .list_domain_names()
            .send()
            .await
            .map_err(|err| {
                GatewayError::ListingFailed(format!("{}", DisplayErrorContext(&err)))
            })?;

        Ok(output
            .domain_names()
            .iter()
            .filter_map(|info| info.domain_name().map(str::to_string))
            .collect())
    }

    async fn domain_endpoint(&self, region: &str, domain: &str) -> Result<String, GatewayError> {
        let client = self.factory.get_client(region).await?;
        let output = match client
            .elasticsearch
            .describe_elasticsearch_domain()
            .domain_name(domain)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let service_error = err.as_service_error();
                if service_error.is_some_and(|e| e.is_resource_not_found_exception()) {
                    return Err(GatewayError::DomainNotFound);
                }
                if service_error.is_some_and(|e| e.is_validation_exception()) {
                    return Err(GatewayError::InvalidDomainName);
                }
                return Err(GatewayError::DomainResolutionFailed(format!(
                    "{}",
                    DisplayErrorContext(&err)
                )));
            }
        };

        // a domain still provisioning, or deleted, has no endpoint yet
        match output
            .domain_status()
            .and_then(|status| status.endpoint())
            .filter(|endpoint| !endpoint.is_empty())
        {
            Some(endpoint) => Ok(endpoint.to_string()),
            None => Err(GatewayError::DomainNotFound),
        }
    }

    async fn signing_credentials(
        &self,
        region: &str,
    ) -> Result<SharedCredentialsProvider, GatewayError> {
        Ok(self.factory.get_client(region).await?.credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Construction uses the lazy default credential chain, so no AWS
    // endpoint is contacted until a request is actually made.
    #[tokio::test]
    async fn test_client_cached_per_region() {
        let factory = AwsClientFactory::new(None);

        factory.get_client("us-east-1").await.unwrap();
        factory.get_client("us-east-1").await.unwrap();
        assert_eq!(factory.clients.read().await.len(), 1);

        factory.get_client("eu-west-1").await.unwrap();
        assert_eq!(factory.clients.read().await.len(), 2);
    }
}
