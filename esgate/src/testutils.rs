use crate::directory::DomainDirectory;
use crate::errors::GatewayError;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_credential_types::provider::SharedCredentialsProvider;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory [`DomainDirectory`] with call counters for cache assertions.
#[derive(Default)]
pub struct FakeDirectory {
    endpoints: HashMap<(String, String), String>,
    invalid_names: HashSet<String>,
    names: Vec<String>,
    fail_listing: bool,
    /// Fail this many `domain_endpoint` calls before behaving normally.
    pub describe_failures: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub describe_calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn new() -> Self {
        FakeDirectory::default()
    }

    pub fn with_domain(mut self, region: &str, domain: &str, endpoint: &str) -> Self {
        self.endpoints
            .insert((region.to_string(), domain.to_string()), endpoint.to_string());
        self
    }

    pub fn with_invalid_name(mut self, domain: &str) -> Self {
        self.invalid_names.insert(domain.to_string());
        self
    }

    pub fn with_names(mut self, names: &[&str]) -> Self {
        self.names = names.iter().map(|name| name.to_string()).collect();
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }
}

#[async_trait]
impl DomainDirectory for FakeDirectory {
    async fn list_domain_names(&self, _region: &str) -> Result<Vec<String>, GatewayError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(GatewayError::ListingFailed(
                "directory unavailable".to_string(),
            ));
        }
        Ok(self.names.clone())
    }

    async fn domain_endpoint(&self, region: &str, domain: &str) -> Result<String, GatewayError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);

        if self
            .describe_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(GatewayError::DomainResolutionFailed(
                "injected failure".to_string(),
            ));
        }

        if self.invalid_names.contains(domain) {
            return Err(GatewayError::InvalidDomainName);
        }

        match self
            .endpoints
            .get(&(region.to_string(), domain.to_string()))
        {
            Some(endpoint) => Ok(endpoint.clone()),
            None => Err(GatewayError::DomainNotFound),
        }
    }

    async fn signing_credentials(
        &self,
        _region: &str,
    ) -> Result<SharedCredentialsProvider, GatewayError> {
        Ok(SharedCredentialsProvider::new(Credentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            None,
            None,
            "fake-directory",
        )))
    }
}
