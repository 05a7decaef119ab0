//! Beancount file loader with include resolution.
//!
//! This crate handles loading beancount files, resolving includes, and
//! collecting options. It builds on the parser to provide a complete
//! loading pipeline, and on top of that a [`project`] module implementing
//! the incremental solve pipeline and a [`broadcast`] module for
//! subscribing to solve completions.
//!
//! # Features
//!
//! - Recursive include resolution with cycle detection
//! - File IDs assigned by canonical path, not discovery order, so the
//!   `(date, file_id, entry_index)` sort key the solver uses is independent
//!   of which file happens to `include` which
//! - Per-file posting tables preserved (never flattened across files, since
//!   a [`turbobean_core::directive::PostingRange`] is only meaningful
//!   against the table it was built from)
//! - Options collection and parsing
//! - Plugin directive collection
//! - Source map for error reporting
//!
//! # Example
//!
//! ```ignore
//! use turbobean_loader::Loader;
//! use std::path::Path;
//!
//! let result = Loader::new().load(Path::new("ledger.beancount"))?;
//! for file in &result.files {
//!     println!("{}: {} directives", file.path.display(), file.directives.len());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod broadcast;
mod options;
pub mod project;
mod source_map;

pub use broadcast::{Broadcaster, Listener};
pub use options::Options;
pub use project::{Project, ProjectSnapshot};
pub use source_map::{SourceFile, SourceMap};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use turbobean_core::{Directive, PostingTable};
use turbobean_parser::{ParseError, ParseResult, Span, Spanned};

/// Errors that can occur during loading.
#[derive(Debug, Error)]
pub enum LoadError {
    /// IO error reading a file.
    #[error("failed to read file {path}: {source}")]
    Io {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Include cycle detected.
    #[error("include cycle detected: {}", .cycle.join(" -> "))]
    IncludeCycle {
        /// The cycle of file paths.
        cycle: Vec<String>,
    },

    /// Parse errors occurred.
    #[error("parse errors in {path}")]
    ParseErrors {
        /// The file with parse errors.
        path: PathBuf,
        /// The parse errors.
        errors: Vec<ParseError>,
    },

    /// Path traversal attempt detected.
    #[error("path traversal not allowed: {include_path} escapes base directory {base_dir}")]
    PathTraversal {
        /// The include path that attempted traversal.
        include_path: String,
        /// The base directory.
        base_dir: PathBuf,
    },
}

/// One loaded file: its own directives, its own posting table, and the
/// side-tables the parser produced for it.
///
/// Postings are never flattened across files: a [`Directive::Transaction`]'s
/// posting range is only meaningful against the [`PostingTable`] it was
/// parsed into, so each file keeps its own.
#[derive(Debug)]
pub struct LoadedFile {
    /// This file's ID, assigned by sorting every discovered file's canonical
    /// path lexicographically. Stable across re-loads as long as the file
    /// set doesn't change, independent of which file included which.
    pub file_id: usize,
    /// Canonical path to this file.
    pub path: PathBuf,
    /// Raw source text.
    pub source: String,
    /// Directives parsed from this file.
    pub directives: Vec<Spanned<Directive>>,
    /// This file's posting table.
    pub postings: PostingTable,
    /// `option` directives found in this file.
    pub options: Vec<(String, String, Span)>,
    /// `include` directives found in this file.
    pub includes: Vec<(String, Span)>,
    /// `plugin` directives found in this file.
    pub plugins: Vec<(String, Option<String>, Span)>,
    /// Parse errors from this file.
    pub errors: Vec<ParseError>,
}

/// Result of loading a beancount file and everything it includes.
#[derive(Debug)]
pub struct LoadResult {
    /// Every loaded file, ordered by ascending `file_id` (lexicographic
    /// canonical path order).
    pub files: Vec<LoadedFile>,
    /// Options merged across every loaded file, in `file_id` order.
    pub options: Options,
    /// Plugins declared across every loaded file, in `file_id` order.
    pub plugins: Vec<Plugin>,
    /// Source map for error reporting.
    pub source_map: SourceMap,
    /// All errors encountered during loading.
    pub errors: Vec<LoadError>,
}

/// A plugin directive.
#[derive(Debug, Clone)]
pub struct Plugin {
    /// Plugin module name.
    pub name: String,
    /// Optional configuration string.
    pub config: Option<String>,
    /// Source location.
    pub span: Span,
    /// File this plugin was declared in.
    pub file_id: usize,
}

/// One file discovered during the recursive include walk, not yet assigned
/// a final `file_id` (that happens after every file is discovered and the
/// set is sorted by path).
struct Discovered {
    path: PathBuf,
    source: String,
    parsed: ParseResult,
}

/// Beancount file loader.
#[derive(Debug, Default)]
pub struct Loader {
    /// Files that have been discovered (for cycle/dedup detection).
    loaded_files: HashSet<PathBuf>,
    /// Stack for cycle detection during discovery.
    include_stack: Vec<PathBuf>,
    /// Root directory for path traversal protection.
    /// If set, includes must resolve to paths within this directory.
    root_dir: Option<PathBuf>,
    /// Whether to enforce path traversal protection.
    enforce_path_security: bool,
}

impl Loader {
    /// Create a new loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable path traversal protection.
    ///
    /// When enabled, include directives cannot escape the root directory
    /// of the main beancount file. This prevents malicious ledger files
    /// from accessing sensitive files outside the ledger directory.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let result = Loader::new()
    ///     .with_path_security(true)
    ///     .load(Path::new("ledger.beancount"))?;
    /// ```
    #[must_use]
    pub const fn with_path_security(mut self, enabled: bool) -> Self {
        self.enforce_path_security = enabled;
        self
    }

    /// Set a custom root directory for path security.
    ///
    /// By default, the root directory is the parent directory of the main file.
    /// This method allows overriding that to a custom directory.
    #[must_use]
    pub fn with_root_dir(mut self, root: PathBuf) -> Self {
        self.root_dir = Some(root);
        self.enforce_path_security = true;
        self
    }

    /// Load a beancount file and all its includes.
    ///
    /// Every file reachable via `include` is discovered first; `file_id`s
    /// are then assigned by sorting the discovered set lexicographically by
    /// canonical path, so the result is independent of which file happens
    /// to include which (see [`LoadedFile::file_id`]).
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] in the following cases:
    ///
    /// - [`LoadError::Io`] - Failed to read the file or an included file
    /// - [`LoadError::IncludeCycle`] - Circular include detected
    ///
    /// Note: Parse errors and path traversal errors are collected in
    /// [`LoadResult::errors`] rather than returned directly, allowing
    /// partial results to be returned.
    pub fn load(&mut self, path: &Path) -> Result<LoadResult, LoadError> {
        let canonical = path.canonicalize().map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        if self.enforce_path_security && self.root_dir.is_none() {
            self.root_dir = canonical.parent().map(Path::to_path_buf);
        }

        let mut discovered = Vec::new();
        let mut errors = Vec::new();
        self.discover_recursive(&canonical, &mut discovered, &mut errors)?;

        discovered.sort_by(|a, b| a.path.cmp(&b.path));

        let mut source_map = SourceMap::new();
        let mut options = Options::new();
        let mut plugins = Vec::new();
        let mut files = Vec::with_capacity(discovered.len());

        for discovered in discovered {
            let Discovered {
                path,
                source,
                parsed,
            } = discovered;

            let file_id = source_map.add_file(path.clone(), source.clone());

            for (key, value, _span) in &parsed.options {
                options.set(key, value);
            }
            for (name, config, span) in &parsed.plugins {
                plugins.push(Plugin {
                    name: name.clone(),
                    config: config.clone(),
                    span: *span,
                    file_id,
                });
            }
            if !parsed.errors.is_empty() {
                errors.push(LoadError::ParseErrors {
                    path: path.clone(),
                    errors: parsed.errors.clone(),
                });
            }

            files.push(LoadedFile {
                file_id,
                path,
                source,
                directives: parsed.directives,
                postings: parsed.postings,
                options: parsed.options,
                includes: parsed.includes,
                plugins: parsed.plugins,
                errors: parsed.errors,
            });
        }

        Ok(LoadResult {
            files,
            options,
            plugins,
            source_map,
            errors,
        })
    }

    /// Discover `path` and everything it transitively includes, appending
    /// each to `discovered` in DFS order (the order is irrelevant: `load`
    /// sorts by path before assigning `file_id`s).
    fn discover_recursive(
        &mut self,
        path: &Path,
        discovered: &mut Vec<Discovered>,
        errors: &mut Vec<LoadError>,
    ) -> Result<(), LoadError> {
        let path_buf = path.to_path_buf();
        if self.include_stack.contains(&path_buf) {
            let mut cycle: Vec<String> = self
                .include_stack
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            cycle.push(path.display().to_string());
            return Err(LoadError::IncludeCycle { cycle });
        }

        if self.loaded_files.contains(path) {
            return Ok(());
        }

        let source = fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        self.include_stack.push(path_buf.clone());
        self.loaded_files.insert(path_buf.clone());

        let parsed = turbobean_parser::parse(&source);

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        for (include_path, _span) in &parsed.includes {
            let full_path = base_dir.join(include_path);
            let canonical = match full_path.canonicalize() {
                Ok(p) => p,
                Err(e) => {
                    errors.push(LoadError::Io {
                        path: full_path,
                        source: e,
                    });
                    continue;
                }
            };

            if self.enforce_path_security {
                if let Some(ref root) = self.root_dir {
                    if !canonical.starts_with(root) {
                        errors.push(LoadError::PathTraversal {
                            include_path: include_path.clone(),
                            base_dir: root.clone(),
                        });
                        continue;
                    }
                }
            }

            if let Err(e) = self.discover_recursive(&canonical, discovered, errors) {
                errors.push(e);
            }
        }

        self.include_stack.pop();

        discovered.push(Discovered {
            path: path_buf,
            source,
            parsed,
        });

        Ok(())
    }
}

/// Load a beancount file.
///
/// This is a convenience function that creates a loader and loads a single file.
pub fn load(path: &Path) -> Result<LoadResult, LoadError> {
    Loader::new().load(path)
}
