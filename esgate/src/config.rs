use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("A non-empty region must be provided for the region field")]
    EmptyRegion,

    #[error("A non-empty domain must be provided for the domain field")]
    EmptyDomain,

    #[error("A non-empty role must be provided for the role field")]
    EmptyRole,
}

/// Gateway configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for incoming requests
    pub listener: Listener,
    /// Tenant routing rules, one per path prefix
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

impl Config {
    /// Loads, validates, and prepares a configuration from a YAML file.
    ///
    /// Tenant path prefixes are normalized and the tenant list is put into
    /// match order (longest prefix first, stable on ties) before returning,
    /// so the result can be handed to the dispatcher as-is.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let mut config: Config = serde_yaml::from_reader(file)?;
        config.validate()?;

        for tenant in &mut config.tenants {
            tenant.path = normalize_prefix(&tenant.path);
        }
        sort_for_matching(&mut config.tenants);

        Ok(config)
    }

    /// Validates the gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;

        for tenant in &self.tenants {
            tenant.validate()?;
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// One routing rule binding a path prefix to an Elasticsearch tenant
///
/// Any of region, domain, and role may be fixed here; coordinates not fixed
/// by the rule are taken from the request path at serve time.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TenantConfig {
    /// Path prefix this tenant is addressed by; empty matches the root
    #[serde(default)]
    pub path: String,
    /// Fixed AWS region, e.g. "us-east-1"
    #[serde(default)]
    pub region: Option<String>,
    /// Fixed Elasticsearch domain name
    #[serde(default)]
    pub domain: Option<String>,
    /// IAM role ARN to assume for this tenant's AWS calls and signatures
    #[serde(default)]
    pub role: Option<String>,
}

impl TenantConfig {
    /// Rejects present-but-empty fields; an omitted field means "taken from
    /// the request path" while an empty one is almost certainly a mistake.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.region.as_deref() == Some("") {
            return Err(ValidationError::EmptyRegion);
        }
        if self.domain.as_deref() == Some("") {
            return Err(ValidationError::EmptyDomain);
        }
        if self.role.as_deref() == Some("") {
            return Err(ValidationError::EmptyRole);
        }
        Ok(())
    }
}

/// Normalizes a configured path prefix: slashes are trimmed from both ends,
/// a root prefix becomes the empty string, anything else gets exactly one
/// leading slash and no trailing slash.
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Puts tenants into match order: descending prefix length, stable on ties
/// so equal-length prefixes keep their configured order.
pub fn sort_for_matching(tenants: &mut [TenantConfig]) {
    tenants.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
}
