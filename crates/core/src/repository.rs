use common::RepositoryId;
use serde::{Deserialize, Serialize};

/// A previously indexed code repository (§3).
///
/// `chunk_count` and `languages` are derived and rewritten whenever
/// re-indexing completes; they are not updated incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepositoryId,
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub chunk_count: usize,
    pub languages: Vec<String>,
}

impl Repository {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: RepositoryId::new(),
            name: name.into(),
            path: path.into(),
            description: None,
            indexed_at: None,
            chunk_count: 0,
            languages: Vec::new(),
        }
    }

    /// Rewrite the derived fields after a (re-)index completes.
    pub fn mark_indexed(&mut self, chunk_count: usize, mut languages: Vec<String>) {
        languages.sort();
        languages.dedup();
        self.chunk_count = chunk_count;
        self.languages = languages;
        self.indexed_at = Some(chrono::Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_indexed_dedupes_and_sorts_languages() {
        let mut repo = Repository::new("demo", "/tmp/demo");
        assert!(repo.indexed_at.is_none());
        repo.mark_indexed(42, vec!["rust".into(), "python".into(), "rust".into()]);
        assert_eq!(repo.chunk_count, 42);
        assert_eq!(repo.languages, vec!["python".to_string(), "rust".to_string()]);
        assert!(repo.indexed_at.is_some());
    }
}
