//! The comparator's output and its stable text rendering (spec.md §6).
use std::fmt;

/// A path claimed by another field manager.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OtherEntry {
    /// Dotted JSON-pointer-style path, e.g. `.spec.replicas`.
    pub path: String,
    /// The manager that owns this path.
    pub manager: String,
}

/// A path we want to write that another manager also claims and disagrees
/// with us about the value of.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConflictEntry {
    /// Dotted JSON-pointer-style path, e.g. `.spec.replicas`.
    pub path: String,
    /// The manager we conflict with.
    pub manager: String,
}

/// Field-level diff of a desired object against the live object, scoped to
/// one field manager's view.
///
/// Renders via [`fmt::Display`] as the public, stable text format consumers
/// log: ordered `Conflicts:` / `Other:` / `Comparison:` sections, each path
/// prefixed by two spaces, paths lexicographically sorted within a section,
/// empty sections omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareReport {
    /// Paths present in desired but owned by nobody (or by us already).
    pub added: Vec<String>,
    /// Paths we own in both desired and live, but whose value changed.
    pub modified: Vec<String>,
    /// Paths we used to own that desired no longer specifies.
    pub removed: Vec<String>,
    /// Paths owned by another manager, non-conflicting.
    pub other: Vec<OtherEntry>,
    /// Paths owned by another manager where live disagrees with desired.
    pub conflicts: Vec<ConflictEntry>,
    /// `true` when no authoritative schema was available and list diffing
    /// fell back to treating every list atomically.
    pub best_effort: bool,
}

impl CompareReport {
    /// Whether this report represents "nothing to change": no adds, no
    /// modifications, no removals queued for our manager. Conflicts/Other
    /// don't by themselves require a write.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

impl fmt::Display for CompareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sections: Vec<String> = Vec::new();

        if !self.conflicts.is_empty() {
            let mut sorted = self.conflicts.clone();
            sorted.sort();
            let mut lines = vec!["Conflicts:".to_string()];
            lines.extend(sorted.into_iter().map(|c| format!("  {} ({})", c.path, c.manager)));
            sections.push(lines.join("\n"));
        }

        if !self.other.is_empty() {
            let mut sorted = self.other.clone();
            sorted.sort();
            let mut lines = vec!["Other:".to_string()];
            lines.extend(sorted.into_iter().map(|o| format!("  {} ({})", o.path, o.manager)));
            sections.push(lines.join("\n"));
        }

        let mut comparison: Vec<(String, &'static str)> = Vec::new();
        comparison.extend(self.added.iter().cloned().map(|p| (p, "Added")));
        comparison.extend(self.modified.iter().cloned().map(|p| (p, "Modified")));
        comparison.extend(self.removed.iter().cloned().map(|p| (p, "Removed")));
        comparison.sort();
        if !comparison.is_empty() {
            let mut lines = vec!["Comparison:".to_string()];
            lines.extend(comparison.into_iter().map(|(p, tag)| format!("  {p} ({tag})")));
            sections.push(lines.join("\n"));
        }

        write!(f, "{}", sections.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_renders_empty() {
        assert_eq!(CompareReport::default().to_string(), "");
    }

    #[test]
    fn sections_are_ordered_and_sorted() {
        let report = CompareReport {
            added: vec![".spec.b".into(), ".spec.a".into()],
            modified: vec![".spec.replicas".into()],
            removed: vec![],
            other: vec![OtherEntry {
                path: ".spec.template".into(),
                manager: "kube-controller-manager".into(),
            }],
            conflicts: vec![ConflictEntry {
                path: ".spec.replicas".into(),
                manager: "other-controller".into(),
            }],
            best_effort: false,
        };
        assert_eq!(
            report.to_string(),
            "Conflicts:\n  .spec.replicas (other-controller)\nOther:\n  .spec.template (kube-controller-manager)\nComparison:\n  .spec.a (Added)\n  .spec.b (Added)\n  .spec.replicas (Modified)"
        );
    }
}
