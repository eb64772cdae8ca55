//! Builder pattern for configuring registry instances.
//!
//! [`RegistryConfig`] carries the settings that shape entity views (the
//! base URL used for `self` links, the registry id, the spec version) and
//! the concurrency policy. [`RegistryBuilder`] validates them, opens the
//! backing storage and optionally installs an initial model.

use crate::error::{RegistryError, RegistryResult};
use crate::registry::Registry;
use crate::storage::StorageProvider;
use crate::validation::id_problem;
use serde_json::Value;

/// Spec version reported by default.
pub const DEFAULT_SPEC_VERSION: &str = "1.0-rc1";

/// Configuration for a registry instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Value of the Registry's `registryid` attribute.
    pub registry_id: String,

    /// Base URL prefixed to every `xid` to build `self` links.
    /// Examples: "https://registry.example.com", "http://localhost:8080/reg"
    pub base_url: String,

    /// Reported as `specversion` on the Registry.
    pub spec_version: String,

    /// Whether writes with `force` set may skip the epoch check.
    pub epoch_override: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_id: "xregistry".to_string(),
            base_url: "https://localhost".to_string(),
            spec_version: DEFAULT_SPEC_VERSION.to_string(),
            epoch_override: false,
        }
    }
}

impl RegistryConfig {
    /// The `self` URL for an entity path such as `/dirs/d1`.
    pub fn self_url(&self, xid: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if xid == "/" {
            format!("{}/", base)
        } else {
            format!("{}{}", base, xid)
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> RegistryResult<()> {
        if self.base_url.is_empty() {
            return Err(RegistryError::server_error("", "Base URL cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(RegistryError::server_error(
                "",
                "Base URL must start with http:// or https://",
            ));
        }

        if let Some(problem) = id_problem(&self.registry_id) {
            return Err(RegistryError::server_error(
                "",
                format!("Invalid registry id: {}", problem),
            ));
        }

        if self.spec_version.is_empty() {
            return Err(RegistryError::server_error("", "Spec version cannot be empty"));
        }

        Ok(())
    }
}

/// Builder for configuring and creating [`Registry`] instances.
///
/// # Examples
///
/// ```rust
/// use xregistry_server::RegistryBuilder;
/// use xregistry_server::storage::InMemoryStorage;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = RegistryBuilder::new(InMemoryStorage::new())
///     .with_base_url("https://registry.example.com")
///     .with_registry_id("reg1")
///     .with_model(json!({
///         "groups": {
///             "dirs": {
///                 "plural": "dirs",
///                 "singular": "dir",
///                 "resources": {
///                     "files": { "plural": "files", "singular": "file" }
///                 }
///             }
///         }
///     }))
///     .build()
///     .await?;
///
/// assert_eq!(registry.get_registry().await?["registryid"], "reg1");
/// # Ok(())
/// # }
/// ```
pub struct RegistryBuilder<S> {
    storage: S,
    config: RegistryConfig,
    model: Option<Value>,
}

impl<S: StorageProvider> RegistryBuilder<S> {
    /// Start from the default configuration.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            config: RegistryConfig::default(),
            model: None,
        }
    }

    /// Set the base URL used for `self` links.
    ///
    /// # Examples
    ///
    /// - `"https://registry.example.com"`
    /// - `"http://localhost:8080"`
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn with_registry_id(mut self, registry_id: impl Into<String>) -> Self {
        self.config.registry_id = registry_id.into();
        self
    }

    pub fn with_spec_version(mut self, version: impl Into<String>) -> Self {
        self.config.spec_version = version.into();
        self
    }

    /// Let forced writes skip the epoch check.
    pub fn allow_epoch_override(mut self, allow: bool) -> Self {
        self.config.epoch_override = allow;
        self
    }

    /// Install this model document once the registry is open.
    pub fn with_model(mut self, model: Value) -> Self {
        self.model = Some(model);
        self
    }

    /// Build the configured registry.
    ///
    /// # Errors
    ///
    /// Returns a `RegistryError` if the configuration is invalid, the model
    /// document is rejected, or storage fails.
    pub async fn build(self) -> RegistryResult<Registry<S>> {
        self.config.validate()?;
        let registry = Registry::open(self.storage, self.config).await?;
        if let Some(model) = self.model {
            registry.update_model(model).await?;
        }
        Ok(registry)
    }
}
