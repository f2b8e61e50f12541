//! Common newtype wrappers shared across codeqa crates.
//!
//! Design principles:
//! - Newtype pattern for id types so a `RepositoryId` can't be passed
//!   where a `ConversationId` is expected.
//! - Implement the common traits (`FromStr`, `Display`, `Serialize`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.is_empty() {
                    Err(concat!(stringify!($name), " cannot be empty").to_string())
                } else {
                    Ok(Self(s.to_string()))
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

id_newtype!(RepositoryId);
id_newtype!(ConversationId);
id_newtype!(ChunkId);
id_newtype!(CitationId);
id_newtype!(MessageId);

/// A user-facing search query. Carries light classification helpers used
/// by the chunker/retriever to pick an identifier-extraction strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query(String);

impl Query {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Heuristic: does this look like prose rather than a bare identifier
    /// or symbol fragment?
    pub fn is_natural_language(&self) -> bool {
        self.0.chars().any(|c| c.is_alphabetic() && !c.is_ascii())
            || (self.0.contains(' ') && self.0.len() > 20)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        Self(s)
    }
}
