use crate::directory::DomainDirectory;
use crate::errors::GatewayError;
use crate::metrics_defs::{PROXY_CACHE_HIT, PROXY_CACHE_MISS};
use crate::proxy::SigningProxy;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct DomainKey {
    region: String,
    domain: String,
}

/// Resolves `(region, domain)` pairs to signing proxies and caches them.
///
/// Each tenant owns one manager; proxies and the AWS clients behind them
/// are never shared across tenants, so credential scopes stay isolated.
pub struct DomainProxyManager {
    directory: Arc<dyn DomainDirectory>,
    proxies: RwLock<HashMap<DomainKey, Arc<SigningProxy>>>,
}

impl DomainProxyManager {
    pub fn new(directory: Arc<dyn DomainDirectory>) -> Self {
        DomainProxyManager {
            directory,
            proxies: RwLock::new(HashMap::new()),
        }
    }

    /// All domain names in the region, sorted ascending. Directory errors
    /// propagate unchanged.
    pub async fn list_domains(&self, region: &str) -> Result<Vec<String>, GatewayError> {
        let mut names = self.directory.list_domain_names(region).await?;
        names.sort();
        Ok(names)
    }

    /// Returns the signing proxy for the domain, resolving and constructing
    /// it on first use.
    ///
    /// Only successful constructions are cached; after a failed resolution
    /// the next call retries from scratch. A key is never overwritten, so
    /// every caller for a pair's lifetime sees the same proxy.
    pub async fn get_proxy(
        &self,
        region: &str,
        domain: &str,
    ) -> Result<Arc<SigningProxy>, GatewayError> {
        let key = DomainKey {
            region: region.to_string(),
            domain: domain.to_string(),
        };

        if let Some(proxy) = self.proxies.read().await.get(&key) {
            metrics::counter!(PROXY_CACHE_HIT.name).increment(1);
            return Ok(proxy.clone());
        }

        let mut proxies = self.proxies.write().await;
        // re-check under the write lock; a racing task may have won
        if let Some(proxy) = proxies.get(&key) {
            metrics::counter!(PROXY_CACHE_HIT.name).increment(1);
            return Ok(proxy.clone());
        }

        metrics::counter!(PROXY_CACHE_MISS.name).increment(1);
        let proxy = self.new_proxy(region, domain).await?;
        proxies.insert(key, proxy.clone());
        Ok(proxy)
    }

    /// Resolves the domain endpoint and builds a proxy for it, without
    /// touching the cache.
    async fn new_proxy(
        &self,
        region: &str,
        domain: &str,
    ) -> Result<Arc<SigningProxy>, GatewayError> {
        let endpoint = self.directory.domain_endpoint(region, domain).await?;
        let credentials = self.directory.signing_credentials(region).await?;

        tracing::debug!(region, domain, endpoint, "resolved domain endpoint");
        Ok(Arc::new(SigningProxy::new(region, endpoint, credentials)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::FakeDirectory;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_list_domains_sorted() {
        let directory = Arc::new(FakeDirectory::new().with_names(&["zeta", "alpha", "mid"]));
        let manager = DomainProxyManager::new(directory);

        let names = manager.list_domains("us-east-1").await.unwrap();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_proxy_cached_after_first_resolution() {
        let directory = Arc::new(FakeDirectory::new().with_domain(
            "us-east-1",
            "logs",
            "search-logs.us-east-1.es.amazonaws.com",
        ));
        let manager = DomainProxyManager::new(directory.clone());

        let first = manager.get_proxy("us-east-1", "logs").await.unwrap();
        let second = manager.get_proxy("us-east-1", "logs").await.unwrap();

        assert_eq!(directory.describe_calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_distinct_pairs_resolve_separately() {
        let directory = Arc::new(
            FakeDirectory::new()
                .with_domain("us-east-1", "logs", "search-logs.us-east-1.es.amazonaws.com")
                .with_domain("eu-west-1", "logs", "search-logs.eu-west-1.es.amazonaws.com"),
        );
        let manager = DomainProxyManager::new(directory.clone());

        let us = manager.get_proxy("us-east-1", "logs").await.unwrap();
        let eu = manager.get_proxy("eu-west-1", "logs").await.unwrap();

        assert_eq!(directory.describe_calls.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&us, &eu));
        assert_eq!(us.endpoint(), "search-logs.us-east-1.es.amazonaws.com");
        assert_eq!(eu.endpoint(), "search-logs.eu-west-1.es.amazonaws.com");
    }

    #[tokio::test]
    async fn test_failed_resolution_not_cached() {
        let directory = Arc::new(FakeDirectory::new().with_domain(
            "us-east-1",
            "logs",
            "search-logs.us-east-1.es.amazonaws.com",
        ));
        directory.describe_failures.store(1, Ordering::SeqCst);
        let manager = DomainProxyManager::new(directory.clone());

        assert!(manager.get_proxy("us-east-1", "logs").await.is_err());

        // the failure left the cache untouched, so this retries and succeeds
        let proxy = manager.get_proxy("us-east-1", "logs").await.unwrap();
        assert_eq!(proxy.endpoint(), "search-logs.us-east-1.es.amazonaws.com");
        assert_eq!(directory.describe_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_domain_is_not_found() {
        let directory = Arc::new(FakeDirectory::new());
        let manager = DomainProxyManager::new(directory);

        assert!(matches!(
            manager.get_proxy("us-east-1", "ghost").await.unwrap_err(),
            GatewayError::DomainNotFound
        ));
    }
}
