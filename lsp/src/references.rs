//! Find-references with source context and non-destructive filtering.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::LspError;
use crate::filter::ReferenceFilter;
use crate::protocol;
use crate::session::Session;
use crate::types::Location;

/// Lines of context kept on each side of a reference.
pub const CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolReference {
    location: Location,
    snippet: String,
    context_before: Vec<String>,
    context_after: Vec<String>,
}

impl SymbolReference {
    #[must_use]
    pub fn new(
        location: Location,
        snippet: String,
        context_before: Vec<String>,
        context_after: Vec<String>,
    ) -> Self {
        Self {
            location,
            snippet,
            context_before,
            context_after,
        }
    }

    /// Reference whose source could not be read.
    #[must_use]
    pub fn without_source(location: Location) -> Self {
        Self::new(location, String::new(), Vec::new(), Vec::new())
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    #[must_use]
    pub fn snippet(&self) -> &str {
        &self.snippet
    }

    #[must_use]
    pub fn context_before(&self) -> &[String] {
        &self.context_before
    }

    #[must_use]
    pub fn context_after(&self) -> &[String] {
        &self.context_after
    }
}

/// Every reference the server reported, plus the subset the active filter
/// lets through. Filtering never reorders or drops `references`.
#[derive(Debug, Clone)]
pub struct ReferenceList {
    symbol_name: String,
    workspace_root: PathBuf,
    references: Vec<SymbolReference>,
    filter: Option<ReferenceFilter>,
    /// Indices into `references`; `None` means all of them.
    visible: Option<Vec<usize>>,
}

impl ReferenceList {
    #[must_use]
    pub fn new(
        symbol_name: impl Into<String>,
        workspace_root: impl Into<PathBuf>,
        references: Vec<SymbolReference>,
    ) -> Self {
        Self {
            symbol_name: symbol_name.into(),
            workspace_root: workspace_root.into(),
            references,
            filter: None,
            visible: None,
        }
    }

    #[must_use]
    pub fn symbol_name(&self) -> &str {
        &self.symbol_name
    }

    /// All references, regardless of filter.
    #[must_use]
    pub fn references(&self) -> &[SymbolReference] {
        &self.references
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    #[must_use]
    pub fn active_filter(&self) -> Option<&str> {
        self.filter.as_ref().map(ReferenceFilter::pattern)
    }

    /// References passing the active filter, in server order.
    pub fn visible(&self) -> impl Iterator<Item = &SymbolReference> {
        let references = self.references.as_slice();
        let (all, subset) = match &self.visible {
            None => (Some(references.iter()), None),
            Some(indices) => (None, Some(indices.iter().map(move |&i| &references[i]))),
        };
        all.into_iter().flatten().chain(subset.into_iter().flatten())
    }

    #[must_use]
    pub fn visible_len(&self) -> usize {
        self.visible.as_ref().map_or(self.references.len(), Vec::len)
    }

    /// Replace the active filter; returns how many references stay visible.
    ///
    /// An invalid pattern leaves the previous filter in place. A blank one
    /// clears it.
    pub fn apply_filter(&mut self, pattern: &str) -> Result<usize, LspError> {
        let Some(filter) = ReferenceFilter::parse(pattern)? else {
            self.clear_filter();
            return Ok(self.references.len());
        };

        let visible: Vec<usize> = self
            .references
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.matches(r.location.file_path(), &self.workspace_root))
            .map(|(i, _)| i)
            .collect();
        tracing::debug!(
            pattern = filter.pattern(),
            visible = visible.len(),
            total = self.references.len(),
            "Applied reference filter"
        );

        let count = visible.len();
        self.visible = Some(visible);
        self.filter = Some(filter);
        Ok(count)
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
        self.visible = None;
    }

    /// One-line summary for a status bar.
    #[must_use]
    pub fn status_message(&self) -> String {
        let total = self.references.len();
        if total == 0 {
            return "No references found".to_string();
        }
        let noun = if total == 1 { "reference" } else { "references" };
        match self.active_filter() {
            Some(pattern) => format!(
                "{} of {total} {noun} to `{}` (filter: {pattern})",
                self.visible_len(),
                self.symbol_name
            ),
            None => format!("{total} {noun} to `{}`", self.symbol_name),
        }
    }
}

/// Query references to the symbol at `path:line:column` (1-indexed).
pub async fn find_references(
    session: &mut Session,
    path: &Path,
    line: u32,
    column: u32,
) -> Result<ReferenceList, LspError> {
    let cursor = Location::new(path, line, column);
    session.ensure_document_open(path).await?;

    let uri = protocol::path_to_file_uri(path)?;
    let (lsp_line, lsp_character) = cursor.to_lsp();
    let result = session
        .request(
            "textDocument/references",
            Some(protocol::reference_params(
                uri.as_str(),
                lsp_line,
                lsp_character,
            )),
        )
        .await?;
    let locations = protocol::parse_locations(result)
        .map_err(|e| LspError::InvalidResponse(format!("textDocument/references: {e}")))?;

    let mut sources = SourceCache::default();
    let symbol_name = sources
        .lines(path)
        .await
        .and_then(|lines| lines.get(cursor.line() as usize - 1))
        .and_then(|text| identifier_at(text, cursor.column()))
        .unwrap_or("symbol")
        .to_string();

    let mut seen = HashSet::new();
    let mut references = Vec::with_capacity(locations.len());
    for wire in locations {
        let Some(file) = protocol::file_uri_to_path(&wire.uri) else {
            tracing::debug!(uri = %wire.uri, "Skipping reference outside the file system");
            continue;
        };
        let location = Location::from_lsp(file, wire.range.start.line, wire.range.start.character);
        if !seen.insert(location.clone()) {
            continue;
        }

        let lines = sources.lines(location.file_path()).await;
        let reference = match lines {
            Some(lines) => reference_at(location, lines),
            None => SymbolReference::without_source(location),
        };
        references.push(reference);
    }

    tracing::info!(
        symbol = %symbol_name,
        count = references.len(),
        "Found references"
    );
    Ok(ReferenceList::new(
        symbol_name,
        session.workspace_root(),
        references,
    ))
}

/// Each file is read at most once per search; unreadable files are
/// remembered as such.
#[derive(Default)]
struct SourceCache {
    files: HashMap<PathBuf, Option<Vec<String>>>,
}

impl SourceCache {
    async fn lines(&mut self, path: &Path) -> Option<&[String]> {
        if !self.files.contains_key(path) {
            let lines = match tokio::fs::read_to_string(path).await {
                Ok(text) => Some(text.lines().map(str::to_string).collect()),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Cannot read referenced file: {e}");
                    None
                }
            };
            self.files.insert(path.to_path_buf(), lines);
        }
        self.files.get(path).and_then(Option::as_deref)
    }
}

fn reference_at(location: Location, lines: &[String]) -> SymbolReference {
    let index = location.line() as usize - 1;
    let Some(snippet) = lines.get(index) else {
        return SymbolReference::without_source(location);
    };
    let before = index.saturating_sub(CONTEXT_LINES);
    let after = (index + 1 + CONTEXT_LINES).min(lines.len());
    SymbolReference::new(
        location,
        snippet.clone(),
        lines[before..index].to_vec(),
        lines[index + 1..after].to_vec(),
    )
}

/// Identifier containing the 1-indexed character `column` of `line`.
fn identifier_at(line: &str, column: u32) -> Option<&str> {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let cursor = (column as usize).checked_sub(1)?;
    let &(_, c) = chars.get(cursor)?;
    if !is_ident(c) {
        return None;
    }

    let start = chars[..cursor]
        .iter()
        .rposition(|&(_, c)| !is_ident(c))
        .map_or(0, |i| i + 1);
    let end = chars[cursor..]
        .iter()
        .position(|&(_, c)| !is_ident(c))
        .map_or(chars.len(), |i| cursor + i);

    let byte_start = chars[start].0;
    let byte_end = chars.get(end).map_or(line.len(), |&(b, _)| b);
    Some(&line[byte_start..byte_end])
}
