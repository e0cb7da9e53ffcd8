//! Common constants used throughout cqs-core.
//!
//! This module centralizes paths, directory names, and file-type tables to
//! avoid duplication and ensure consistency across the codebase.

// ============================================================================
// Directory Names
// ============================================================================

/// The name of the cqs metadata directory within a repository.
///
/// All cqs-managed data lives under `.cqs/` at the repository root.
pub const CQS_DIR: &str = ".cqs";

/// The subdirectory within `.cqs` that stores the vector index.
pub const INDEX_DIR: &str = "index";

/// The subdirectory within `.cqs` that stores logs.
pub const LOGS_DIR: &str = "logs";

/// Filename of the persisted index state (last indexed commit, counters).
pub const STATE_FILENAME: &str = "state.json";

/// Filename of the append-only ask log.
pub const ASK_LOG_FILENAME: &str = "asks.jsonl";

/// The name of the global cqs configuration directory (`~/.cqs/`).
pub const CQS_HOME_DIR: &str = ".cqs";

/// Filename of the global configuration file.
pub const GLOBAL_CONFIG_FILENAME: &str = "config.yaml";

// ============================================================================
// Ignored Directories
// ============================================================================

/// Directories that should always be skipped during indexing.
///
/// These contain generated or vendored content that is never worth
/// embedding, even when committed to the repository.
pub const ALWAYS_IGNORED_DIRS: &[&str] = &[
    ".git",
    ".cqs",
    "target",
    "node_modules",
    ".next",
    "dist",
    "build",
    "__pycache__",
    ".venv",
    "venv",
    "vendor",
    ".mypy_cache",
    ".pytest_cache",
];

/// Check if a directory name should always be ignored.
#[inline]
pub fn should_ignore_dir(name: &str) -> bool {
    ALWAYS_IGNORED_DIRS.contains(&name)
}

/// Check if any component of a relative path is an always-ignored directory.
pub fn path_is_ignored(path: &std::path::Path) -> bool {
    path.components().any(|c| match c {
        std::path::Component::Normal(name) => name
            .to_str()
            .map(should_ignore_dir)
            .unwrap_or(false),
        _ => false,
    })
}

// ============================================================================
// File Types
// ============================================================================

/// Maximum size of a file eligible for indexing (1 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = 1_048_576;

/// Extensions loaded as plain text.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "rst", "py", "js", "jsx", "ts", "tsx", "rs", "go", "java", "c", "cc", "cpp",
    "h", "hpp", "cs", "rb", "php", "swift", "kt", "scala", "sh", "bash", "sql", "html", "css",
    "scss", "yaml", "yml", "toml", "json", "xml", "ini", "config", "conf", "proto", "vue",
    "svelte", "ex", "exs", "hs", "clj", "lua", "zig", "dart",
];

/// Check whether an extension is loaded as plain text.
pub fn is_text_extension(ext: &str) -> bool {
    TEXT_EXTENSIONS.contains(&ext)
}

/// Map a file extension to a language tag for syntax-highlighted output.
pub fn detect_language(ext: &str) -> &'static str {
    match ext {
        "rs" => "rust",
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cc" | "cpp" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "sh" | "bash" => "shell",
        "sql" => "sql",
        "html" => "html",
        "css" | "scss" => "css",
        "json" | "ipynb" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "md" | "rst" | "txt" => "markdown",
        "csv" => "text",
        "vue" => "vue",
        "svelte" => "svelte",
        "ex" | "exs" => "elixir",
        "hs" => "haskell",
        "clj" => "clojure",
        "lua" => "lua",
        "zig" => "zig",
        "dart" => "dart",
        "proto" => "protobuf",
        _ => "text",
    }
}

// ============================================================================
// Tests
// ============================================================================
