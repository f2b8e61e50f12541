/// Whether a language's blocks are delimited by braces or by
/// indentation, which semantic chunker (§4.3) applies to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFamily {
    Brace,
    Indent,
}

/// One entry in the fixed extension table (§4.3). `name` is what ends
/// up on `CodeChunk::language`.
pub struct LanguageEntry {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pub family: LanguageFamily,
}

const LANGUAGES: &[LanguageEntry] = &[
    LanguageEntry { name: "rust", extensions: &["rs"], family: LanguageFamily::Brace },
    LanguageEntry { name: "typescript", extensions: &["ts", "tsx"], family: LanguageFamily::Brace },
    LanguageEntry { name: "javascript", extensions: &["js", "jsx", "mjs", "cjs"], family: LanguageFamily::Brace },
    LanguageEntry { name: "java", extensions: &["java"], family: LanguageFamily::Brace },
    LanguageEntry { name: "csharp", extensions: &["cs"], family: LanguageFamily::Brace },
    LanguageEntry { name: "go", extensions: &["go"], family: LanguageFamily::Brace },
    LanguageEntry { name: "c", extensions: &["c", "h"], family: LanguageFamily::Brace },
    LanguageEntry { name: "cpp", extensions: &["cpp", "cc", "cxx", "hpp", "hh"], family: LanguageFamily::Brace },
    LanguageEntry { name: "kotlin", extensions: &["kt", "kts"], family: LanguageFamily::Brace },
    LanguageEntry { name: "swift", extensions: &["swift"], family: LanguageFamily::Brace },
    LanguageEntry { name: "php", extensions: &["php"], family: LanguageFamily::Brace },
    LanguageEntry { name: "python", extensions: &["py"], family: LanguageFamily::Indent },
    LanguageEntry { name: "ruby", extensions: &["rb"], family: LanguageFamily::Indent },
];

/// Directories never descended into during ingestion (§4.3).
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules", "bin", "obj", ".git", "dist", "build", "target", "__pycache__", "venv",
    "vendor",
];

const LOCKFILE_NAMES: &[&str] = &[
    "Cargo.lock",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Gemfile.lock",
    "poetry.lock",
    "composer.lock",
];

/// Looks up the language entry for a file's extension, case-insensitive.
pub fn language_for_extension(ext: &str) -> Option<&'static LanguageEntry> {
    let ext = ext.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|entry| entry.extensions.iter().any(|e| *e == ext))
}

/// Whether a file name should never be chunked: lockfiles, dotfile
/// ignore-lists, and minified bundles (§4.3).
pub fn is_excluded_file(file_name: &str) -> bool {
    if LOCKFILE_NAMES.iter().any(|n| *n == file_name) {
        return true;
    }
    if file_name.ends_with("ignore") {
        return true;
    }
    if file_name.ends_with(".min.js") || file_name.ends_with(".min.css") {
        return true;
    }
    false
}
