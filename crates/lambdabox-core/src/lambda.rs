//! Lambda definitions handed to the pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source dialect of a lambda body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    /// Executed natively by the sandbox
    JavaScript,
    /// Lowered to JavaScript before execution
    TypeScript,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JavaScript => f.write_str("javascript"),
            Self::TypeScript => f.write_str("typescript"),
        }
    }
}

/// A user-authored function body plus its declared dialect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaDefinition {
    pub body: String,
    pub language: Language,
}

impl LambdaDefinition {
    #[must_use]
    pub fn new(body: impl Into<String>, language: Language) -> Self {
        Self {
            body: body.into(),
            language,
        }
    }

    #[must_use]
    pub fn javascript(body: impl Into<String>) -> Self {
        Self::new(body, Language::JavaScript)
    }

    #[must_use]
    pub fn typescript(body: impl Into<String>) -> Self {
        Self::new(body, Language::TypeScript)
    }
}
