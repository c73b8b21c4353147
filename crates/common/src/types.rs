use serde::{Deserialize, Serialize};

/// A place in the knowledge base an answer was drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Source document name.
    pub file: String,
    /// Page label. Kept as text because the backend may send `"?"` or ranges.
    pub page: String,
}

impl Citation {
    pub fn new(file: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            page: page.into(),
        }
    }
}
