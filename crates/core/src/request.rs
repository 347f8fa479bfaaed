//! Request descriptors supplied by endpoint collaborators

use std::collections::BTreeMap;

/// Request parameters; keys are unique and iterate in sorted order
pub type Parameters = BTreeMap<String, String>;

/// Everything needed to dispatch one API call
///
/// Built per call and consumed by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Path relative to the API root, e.g. `person/evaluations/42`
    pub endpoint: String,
    pub parameters: Parameters,
    /// Whether the endpoint needs an access token
    pub is_private: bool,
}

impl RequestDescriptor {
    /// Descriptor for an endpoint that needs no access token
    #[must_use]
    pub fn public(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), parameters: Parameters::new(), is_private: false }
    }

    /// Descriptor for an endpoint that needs an access token
    #[must_use]
    pub fn private(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), parameters: Parameters::new(), is_private: true }
    }

    /// Add a parameter, replacing any previous value for `key`
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Add a parameter only when a value is present
    #[must_use]
    pub fn param_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }
}
