//! Plain-text listings printed by the binary.

use std::fmt::Write as _;
use std::path::Path;

use xref_lsp::{CallHierarchyItem, Location, ReferenceList};

fn display_location(location: &Location, root: &Path) -> String {
    let path = location.file_path();
    let shown = path.strip_prefix(root).unwrap_or(path);
    format!("{}:{}:{}", shown.display(), location.line(), location.column())
}

/// One block per visible reference: the location header, then the source
/// line marked with `>` between its context lines.
#[must_use]
pub fn format_references(list: &ReferenceList, root: &Path) -> String {
    let mut out = String::new();
    for reference in list.visible() {
        let location = reference.location();
        let _ = writeln!(out, "{}", display_location(location, root));

        let before = reference.context_before();
        let first_line = (location.line() as usize).saturating_sub(before.len());
        for (offset, text) in before.iter().enumerate() {
            let _ = writeln!(out, "  {:>5}   {text}", first_line + offset);
        }
        let _ = writeln!(out, "  {:>5} > {}", location.line(), reference.snippet());
        for (offset, text) in reference.context_after().iter().enumerate() {
            let _ = writeln!(out, "  {:>5}   {text}", location.line() as usize + offset + 1);
        }
        out.push('\n');
    }
    out.push_str(&list.status_message());
    out.push('\n');
    out
}

#[must_use]
pub fn format_callers(callers: &[CallHierarchyItem], root: &Path) -> String {
    if callers.is_empty() {
        return "No callers found\n".to_string();
    }
    let mut out = String::new();
    for caller in callers {
        let _ = writeln!(
            out,
            "{} {} ({})",
            caller.kind().label(),
            caller.name(),
            display_location(caller.location(), root)
        );
    }
    out
}
