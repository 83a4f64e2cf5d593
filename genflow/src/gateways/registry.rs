//! Dependency table handed to pipelines.

use std::sync::Arc;

use super::traits::{
    CompletionGateway, GenerationGateway, RewriteGateway, ScraperGateway, StorageGateway,
};
use crate::errors::GenflowError;

/// Immutable set of collaborator handles shared by a pipeline's steps.
#[derive(Clone, Default)]
pub struct Gateways {
    generation: Option<Arc<dyn GenerationGateway>>,
    scraper: Option<Arc<dyn ScraperGateway>>,
    rewrite: Option<Arc<dyn RewriteGateway>>,
    storage: Option<Arc<dyn StorageGateway>>,
    completion: Option<Arc<dyn CompletionGateway>>,
}

impl Gateways {
    /// Starts building a table.
    #[must_use]
    pub fn builder() -> GatewaysBuilder {
        GatewaysBuilder::default()
    }

    /// Returns the generation gateway.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Config`] if none was registered.
    pub fn generation(&self) -> Result<&Arc<dyn GenerationGateway>, GenflowError> {
        self.generation.as_ref().ok_or_else(|| missing("generation"))
    }

    /// Returns the scraper gateway.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Config`] if none was registered.
    pub fn scraper(&self) -> Result<&Arc<dyn ScraperGateway>, GenflowError> {
        self.scraper.as_ref().ok_or_else(|| missing("scraper"))
    }

    /// Returns the rewrite gateway.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Config`] if none was registered.
    pub fn rewrite(&self) -> Result<&Arc<dyn RewriteGateway>, GenflowError> {
        self.rewrite.as_ref().ok_or_else(|| missing("rewrite"))
    }

    /// Returns the storage gateway.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Config`] if none was registered.
    pub fn storage(&self) -> Result<&Arc<dyn StorageGateway>, GenflowError> {
        self.storage.as_ref().ok_or_else(|| missing("storage"))
    }

    /// Returns the completion gateway.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Config`] if none was registered.
    pub fn completion(&self) -> Result<&Arc<dyn CompletionGateway>, GenflowError> {
        self.completion.as_ref().ok_or_else(|| missing("completion"))
    }

    /// Returns true if a rewrite gateway is registered.
    #[must_use]
    pub fn has_rewrite(&self) -> bool {
        self.rewrite.is_some()
    }
}

fn missing(name: &str) -> GenflowError {
    GenflowError::config(format!("No {name} gateway configured"))
}

impl std::fmt::Debug for Gateways {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateways")
            .field("generation", &self.generation.is_some())
            .field("scraper", &self.scraper.is_some())
            .field("rewrite", &self.rewrite.is_some())
            .field("storage", &self.storage.is_some())
            .field("completion", &self.completion.is_some())
            .finish()
    }
}

/// Builder for [`Gateways`].
#[derive(Default)]
pub struct GatewaysBuilder {
    inner: Gateways,
}

impl GatewaysBuilder {
    /// Registers the generation gateway.
    #[must_use]
    pub fn generation(mut self, gateway: Arc<dyn GenerationGateway>) -> Self {
        self.inner.generation = Some(gateway);
        self
    }

    /// Registers the scraper gateway.
    #[must_use]
    pub fn scraper(mut self, gateway: Arc<dyn ScraperGateway>) -> Self {
        self.inner.scraper = Some(gateway);
        self
    }

    /// Registers the rewrite gateway.
    #[must_use]
    pub fn rewrite(mut self, gateway: Arc<dyn RewriteGateway>) -> Self {
        self.inner.rewrite = Some(gateway);
        self
    }

    /// Registers the storage gateway.
    #[must_use]
    pub fn storage(mut self, gateway: Arc<dyn StorageGateway>) -> Self {
        self.inner.storage = Some(gateway);
        self
    }

    /// Registers the completion gateway.
    #[must_use]
    pub fn completion(mut self, gateway: Arc<dyn CompletionGateway>) -> Self {
        self.inner.completion = Some(gateway);
        self
    }

    /// Finishes the table.
    #[must_use]
    pub fn build(self) -> Gateways {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateways::MockStorageGateway;

    #[test]
    fn test_missing_gateway_is_config_error() {
        let gateways = Gateways::builder().build();
        let err = gateways.scraper().err().unwrap();
        assert_eq!(err.to_string(), "Configuration error: No scraper gateway configured");
        assert!(!gateways.has_rewrite());
    }

    #[test]
    fn test_registered_gateway_is_returned() {
        let gateways = Gateways::builder()
            .storage(Arc::new(MockStorageGateway::new()))
            .build();
        assert!(gateways.storage().is_ok());
        assert!(gateways.completion().is_err());
        assert!(format!("{gateways:?}").contains("storage: true"));
    }
}
