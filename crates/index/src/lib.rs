//! Document chunker (C3, §4.3).
//!
//! Walks a repository tree and produces semantically typed `CodeChunk`s:
//! regex-based semantic chunking for brace- and indent-delimited
//! languages, falling back to fixed-size overlapping chunks when no
//! semantic match is found. Chunking itself never touches the network
//! or the store — `chunk_repository` returns plain `CodeChunk`s for the
//! caller (the embedding service, then the store) to take from there.

mod fallback;
mod ingest;
mod language;
mod semantic;
mod walk;

pub use fallback::size_fallback_chunks;
pub use ingest::{chunk_repository, chunk_repository_path, IngestSummary};
pub use language::{is_excluded_file, language_for_extension, LanguageEntry, LanguageFamily, EXCLUDED_DIRS};
pub use semantic::{semantic_brace_chunks, semantic_indent_chunks};
pub use walk::{walk_repository, DiscoveredFile};
