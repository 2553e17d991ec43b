//! Glob filter over reference paths.
//!
//! A filter is a space-separated list of terms, all of which must hold. A
//! term matches when its glob matches the path relative to the workspace
//! root (the full path for files outside it) or the bare file name. A
//! leading `!` negates the term. Terms without glob metacharacters match as
//! substrings.

use std::path::Path;

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::error::LspError;

#[derive(Debug, Clone)]
pub struct ReferenceFilter {
    pattern: String,
    include: Vec<GlobMatcher>,
    exclude: GlobSet,
}

impl ReferenceFilter {
    /// Compile `pattern`. A blank pattern yields `None` (no filter).
    pub fn parse(pattern: &str) -> Result<Option<Self>, LspError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Ok(None);
        }

        let mut include = Vec::new();
        let mut exclude = GlobSetBuilder::new();
        for term in pattern.split_whitespace() {
            if let Some(negated) = term.strip_prefix('!') {
                exclude.add(compile(negated, pattern)?);
            } else {
                include.push(compile(term, pattern)?.compile_matcher());
            }
        }
        let exclude = exclude.build().map_err(|e| LspError::InvalidFilter {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Some(Self {
            pattern: pattern.to_string(),
            include,
            exclude,
        }))
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether `path` passes every term.
    #[must_use]
    pub fn matches(&self, path: &Path, workspace_root: &Path) -> bool {
        // Directories above the root never take part in matching.
        let scoped = path.strip_prefix(workspace_root).unwrap_or(path);
        let file_name = path.file_name().map(Path::new);
        let candidates: Vec<&Path> = [Some(scoped), file_name]
            .into_iter()
            .flatten()
            .collect();

        self.include
            .iter()
            .all(|glob| candidates.iter().any(|c| glob.is_match(c)))
            && !candidates.iter().any(|c| self.exclude.is_match(c))
    }
}

fn compile(term: &str, pattern: &str) -> Result<Glob, LspError> {
    if term.is_empty() {
        return Err(LspError::InvalidFilter {
            pattern: pattern.to_string(),
            reason: "`!` must be followed by a pattern".to_string(),
        });
    }

    let has_meta = term.contains(['*', '?', '[', '{']);
    let glob_text = if has_meta {
        term.to_string()
    } else {
        format!("*{term}*")
    };

    let mut glob = GlobBuilder::new(&glob_text);
    if cfg!(windows) {
        glob.case_insensitive(true);
    }
    glob.build().map_err(|e| LspError::InvalidFilter {
        pattern: pattern.to_string(),
        reason: format!("`{term}`: {e}"),
    })
}
