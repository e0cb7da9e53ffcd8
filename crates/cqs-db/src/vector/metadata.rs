//! Search filters for vector queries.

use serde::{Deserialize, Serialize};

/// Filter criteria for vector searches.
///
/// All set fields must match for a vector to be returned (AND semantics).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorSearchFilter {
    /// Restrict results to paths starting with this prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,

    /// Restrict results to a specific language tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl VectorSearchFilter {
    /// Create an empty filter (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to paths under a prefix.
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Restrict to a language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Check whether the filter has no criteria set.
    pub fn is_empty(&self) -> bool {
        self.path_prefix.is_none() && self.language.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter() {
        let filter = VectorSearchFilter::new();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_filter_builder() {
        let filter = VectorSearchFilter::new()
            .with_path_prefix("src/")
            .with_language("rust");

        assert!(!filter.is_empty());
        assert_eq!(filter.path_prefix.as_deref(), Some("src/"));
        assert_eq!(filter.language.as_deref(), Some("rust"));
    }
}
