//! Startup hooks that adjust registry configuration.

use crate::error::Result;
use crate::registry::MeterRegistry;
use crate::tags::Tags;

pub const APPLICATION_TAG: &str = "application";
pub const APPLICATION_NAME: &str = "bankapp";

/// Applied once to the shared registry before any meter is registered.
pub trait RegistryCustomizer: Send + Sync {
    fn customize(&self, registry: &MeterRegistry) -> Result<()>;
}

/// Adds fixed tags to every meter the registry will ever create.
#[derive(Debug, Clone)]
pub struct CommonTags {
    tags: Tags,
}

impl CommonTags {
    pub fn new(tags: Tags) -> Self {
        Self { tags }
    }

    /// `application=bankapp`
    pub fn bankapp() -> Self {
        Self::new(Tags::trusted(&[(APPLICATION_TAG, APPLICATION_NAME)]))
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }
}

impl RegistryCustomizer for CommonTags {
    fn customize(&self, registry: &MeterRegistry) -> Result<()> {
        registry.config().common_tags(&self.tags)?;
        Ok(())
    }
}

/// Apply customizers in order, stopping at the first failure.
pub fn apply_all(registry: &MeterRegistry, customizers: &[&dyn RegistryCustomizer]) -> Result<()> {
    for c in customizers {
        c.customize(registry)?;
    }
    Ok(())
}
