use crate::core::{ModelError, Result};
use serde::{Deserialize, Serialize};

/// What to do with a lazy reference found as a collection element.
///
/// A pointer can only name a property, so an element cannot be detached as
/// one. It is either loaded on the spot or the detach fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElementProxyPolicy {
    #[default]
    Initialize,
    Reject,
}

/// Detach/attach behavior of an `EntityModel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Handling of unresolved references inside collections
    pub element_proxy_policy: ElementProxyPolicy,

    /// Inspect non-entity objects for embedded lazy references
    pub walk_plain_objects: bool,

    /// Dump the pointer map at debug level after each detach
    pub log_detached_properties: bool,

    /// Maximum graph depth below the root, unlimited when `None`
    pub max_depth: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            element_proxy_policy: ElementProxyPolicy::Initialize,
            walk_plain_objects: true,
            log_detached_properties: false,
            max_depth: None,
        }
    }
}

impl ModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element_proxy_policy(mut self, policy: ElementProxyPolicy) -> Self {
        self.element_proxy_policy = policy;
        self
    }

    pub fn walk_plain_objects(mut self, enabled: bool) -> Self {
        self.walk_plain_objects = enabled;
        self
    }

    pub fn log_detached_properties(mut self, enabled: bool) -> Self {
        self.log_detached_properties = enabled;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == Some(0) {
            return Err(ModelError::InvalidConfig(
                "max_depth must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.element_proxy_policy, ElementProxyPolicy::Initialize);
        assert!(config.walk_plain_objects);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_depth_is_invalid() {
        assert!(ModelConfig::new().max_depth(0).validate().is_err());
        assert!(ModelConfig::new().max_depth(3).validate().is_ok());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"element_proxy_policy":"Reject"}"#).unwrap();
        assert_eq!(config.element_proxy_policy, ElementProxyPolicy::Reject);
        assert!(config.walk_plain_objects);
    }
}
