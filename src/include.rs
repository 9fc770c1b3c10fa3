//! Include graph resolution.
//!
//! Expands `[[include]]` directives depth-first into the ordered,
//! deduplicated list of documents that participate in a merge. The walk is
//! guarded by a visited set keyed on canonical absolute paths, so diamond
//! include graphs (A includes B and C, both include D) and even direct
//! cycles resolve without error: a path reached twice is skipped, not
//! re-processed.
//!
//! Output order is significant - it is the override order consumed by
//! `crate::merge`.

use crate::schema::{
    ConfigDocument, DEFAULT_EXTENSION, DEFAULT_FILE_NAME, IncludeCondition, IncludeDirective,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised during include resolution.
///
/// All variants are fatal: an unresolvable include means the desired
/// configuration is incomplete, and converging against a partial model
/// could remove resources the missing document still declares.
#[derive(Debug, Error)]
pub enum IncludeError {
    /// A non-optional include target does not exist.
    #[error("include target not found: {path} (included from {from})")]
    NotFound {
        /// The resolved path that does not exist
        path: PathBuf,
        /// The document declaring the directive
        from: PathBuf,
    },

    /// A directive is structurally invalid.
    #[error("invalid include directive in {from}: {message}")]
    InvalidDirective {
        /// The document declaring the directive
        from: PathBuf,
        /// What is wrong with it
        message: String,
    },

    /// A non-optional glob matched nothing.
    #[error("include glob '{pattern}' in {from} matched nothing")]
    UnresolvedGlob {
        /// The glob pattern as declared
        pattern: String,
        /// The document declaring the directive
        from: PathBuf,
    },

    /// A document could not be read or parsed mid-traversal.
    #[error("failed to load document {path}: {message}")]
    Document {
        /// Path of the unreadable document
        path: PathBuf,
        /// Flattened load error
        message: String,
    },
}

/// Resolve the include graph rooted at `root`.
///
/// Returns the documents in merge order: the root first, then every
/// included document in pre-order (each document's includes are fully
/// expanded before its next sibling directive is processed).
pub fn resolve(root: &Path) -> Result<Vec<ConfigDocument>, IncludeError> {
    let root = root.canonicalize().map_err(|_| IncludeError::NotFound {
        path: root.to_path_buf(),
        from: root.to_path_buf(),
    })?;

    let mut visited = HashSet::new();
    let mut docs = Vec::new();
    visit(root, &mut visited, &mut docs)?;
    Ok(docs)
}

fn visit(
    path: PathBuf,
    visited: &mut HashSet<PathBuf>,
    docs: &mut Vec<ConfigDocument>,
) -> Result<(), IncludeError> {
    // Cycle / diamond guard: identical canonical path reached twice is
    // skipped silently, never an error.
    if !visited.insert(path.clone()) {
        log::debug!("skipping already-visited document: {}", path.display());
        return Ok(());
    }

    let doc = ConfigDocument::load(&path).map_err(|e| IncludeError::Document {
        path: path.clone(),
        message: format!("{e:#}"),
    })?;

    let dir = doc.dir.clone();
    let from = doc.path.clone();
    let directives = doc.body.includes.clone();
    docs.push(doc);

    for directive in &directives {
        for target in expand_directive(directive, &dir, &from)? {
            visit(target, visited, docs)?;
        }
    }

    Ok(())
}

/// Expand one directive into the canonical paths it contributes.
///
/// Returns an empty list for silently-skipped directives (unmet
/// conditions, optional targets that do not exist).
fn expand_directive(
    directive: &IncludeDirective,
    dir: &Path,
    from: &Path,
) -> Result<Vec<PathBuf>, IncludeError> {
    // An unmet condition skips the directive entirely - no error even when
    // the directive is not optional.
    if !directive.conditions.iter().all(IncludeCondition::is_met) {
        log::debug!("include in {} skipped: condition not met", from.display());
        return Ok(Vec::new());
    }

    match (&directive.path, &directive.glob) {
        (Some(_), Some(_)) => Err(IncludeError::InvalidDirective {
            from: from.to_path_buf(),
            message: "directive sets both 'path' and 'glob'".to_string(),
        }),
        (None, None) => Err(IncludeError::InvalidDirective {
            from: from.to_path_buf(),
            message: "directive needs one of 'path' or 'glob'".to_string(),
        }),
        (Some(raw), None) => {
            let target = resolve_target(dir, raw);
            finalize_target(target, directive.optional, from).map(|t| t.into_iter().collect())
        }
        (None, Some(pattern)) => {
            let matches = expand_glob(dir, pattern, from)?;
            if matches.is_empty() {
                if directive.optional {
                    log::debug!(
                        "optional glob '{}' in {} matched nothing",
                        pattern,
                        from.display()
                    );
                    return Ok(Vec::new());
                }
                return Err(IncludeError::UnresolvedGlob {
                    pattern: pattern.clone(),
                    from: from.to_path_buf(),
                });
            }

            let mut targets = Vec::new();
            for m in matches {
                let m = if m.is_dir() { m.join(DEFAULT_FILE_NAME) } else { m };
                targets.extend(finalize_target(m, directive.optional, from)?);
            }
            Ok(targets)
        }
    }
}

/// Apply the directory and extension conventions to a path directive.
fn resolve_target(dir: &Path, raw: &str) -> PathBuf {
    let expanded = crate::paths::expand(raw);
    let mut target = if expanded.is_absolute() {
        expanded
    } else {
        // Relative paths resolve against the declaring document's own
        // directory, which keeps nested include trees relocatable.
        dir.join(expanded)
    };

    if target.is_dir() {
        target = target.join(DEFAULT_FILE_NAME);
    } else if !target.exists() && target.extension().is_none() {
        let with_ext = target.with_extension(DEFAULT_EXTENSION);
        if with_ext.exists() {
            target = with_ext;
        }
    }

    target
}

/// Existence check + canonicalization for one resolved target.
fn finalize_target(
    target: PathBuf,
    optional: bool,
    from: &Path,
) -> Result<Option<PathBuf>, IncludeError> {
    if !target.exists() {
        if optional {
            log::debug!("optional include target missing: {}", target.display());
            return Ok(None);
        }
        return Err(IncludeError::NotFound {
            path: target,
            from: from.to_path_buf(),
        });
    }

    let canonical = target.canonicalize().map_err(|_| IncludeError::NotFound {
        path: target.clone(),
        from: from.to_path_buf(),
    })?;
    Ok(Some(canonical))
}

// ============================================================================
// Glob expansion
// ============================================================================

/// Expand a glob pattern into lexicographically sorted matches.
///
/// Wildcards (`*`, `?`) are supported in the final path component only.
fn expand_glob(dir: &Path, pattern: &str, from: &Path) -> Result<Vec<PathBuf>, IncludeError> {
    let expanded = crate::paths::expand(pattern);
    let full = if expanded.is_absolute() {
        expanded
    } else {
        dir.join(expanded)
    };

    let parent = full.parent().unwrap_or(Path::new("/"));
    let file_pattern = full
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IncludeError::InvalidDirective {
            from: from.to_path_buf(),
            message: format!("glob '{pattern}' has no file component"),
        })?
        .to_string();

    if has_wildcard(&parent.to_string_lossy()) {
        return Err(IncludeError::InvalidDirective {
            from: from.to_path_buf(),
            message: format!("glob '{pattern}' uses wildcards outside the final path component"),
        });
    }

    let entries = match std::fs::read_dir(parent) {
        Ok(entries) => entries,
        // A missing parent directory is an empty match, not an IO error;
        // the caller decides whether empty is acceptable.
        Err(_) => return Ok(Vec::new()),
    };

    let mut matches: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| wildcard_match(&file_pattern, name))
                .unwrap_or(false)
        })
        .map(|entry| entry.path())
        .collect();

    matches.sort();
    Ok(matches)
}

fn has_wildcard(s: &str) -> bool {
    s.contains('*') || s.contains('?')
}

/// Match `text` against a pattern with `*` (any run) and `?` (any single
/// character). Iterative with single-star backtracking.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_doc(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    fn resolved_names(docs: &[ConfigDocument]) -> Vec<String> {
        docs.iter()
            .map(|d| d.path.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    // ── ordering and dedup ───────────────────────────────────────────

    #[test]
    fn resolve_single_document() {
        let tmp = TempDir::new().unwrap();
        let root = write_doc(tmp.path(), "root.toml", "");

        let docs = resolve(&root).unwrap();
        assert_eq!(resolved_names(&docs), vec!["root.toml"]);
    }

    #[test]
    fn resolve_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        write_doc(tmp.path(), "b.toml", "");
        let root = write_doc(tmp.path(), "root.toml", "[[include]]\npath = \"b.toml\"\n");

        let first: Vec<PathBuf> = resolve(&root).unwrap().iter().map(|d| d.path.clone()).collect();
        let second: Vec<PathBuf> = resolve(&root).unwrap().iter().map(|d| d.path.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn resolve_preorder_nesting() {
        let tmp = TempDir::new().unwrap();
        write_doc(tmp.path(), "d.toml", "");
        write_doc(tmp.path(), "b.toml", "[[include]]\npath = \"d.toml\"\n");
        write_doc(tmp.path(), "c.toml", "");
        let root = write_doc(
            tmp.path(),
            "root.toml",
            "[[include]]\npath = \"b.toml\"\n[[include]]\npath = \"c.toml\"\n",
        );

        let docs = resolve(&root).unwrap();
        // b's own includes expand before the sibling directive c
        assert_eq!(
            resolved_names(&docs),
            vec!["root.toml", "b.toml", "d.toml", "c.toml"]
        );
    }

    #[test]
    fn diamond_include_appears_once() {
        let tmp = TempDir::new().unwrap();
        write_doc(tmp.path(), "d.toml", "");
        write_doc(tmp.path(), "b.toml", "[[include]]\npath = \"d.toml\"\n");
        write_doc(tmp.path(), "c.toml", "[[include]]\npath = \"d.toml\"\n");
        let root = write_doc(
            tmp.path(),
            "a.toml",
            "[[include]]\npath = \"b.toml\"\n[[include]]\npath = \"c.toml\"\n",
        );

        let docs = resolve(&root).unwrap();
        // d is reached first through b; c's directive hits the visited set
        assert_eq!(
            resolved_names(&docs),
            vec!["a.toml", "b.toml", "d.toml", "c.toml"]
        );
    }

    #[test]
    fn self_include_cycle_resolves() {
        let tmp = TempDir::new().unwrap();
        write_doc(tmp.path(), "b.toml", "[[include]]\npath = \"a.toml\"\n");
        let root = write_doc(tmp.path(), "a.toml", "[[include]]\npath = \"b.toml\"\n");

        let docs = resolve(&root).unwrap();
        assert_eq!(resolved_names(&docs), vec!["a.toml", "b.toml"]);
    }

    // ── path conventions ─────────────────────────────────────────────

    #[test]
    fn directory_include_uses_default_file_name() {
        let tmp = TempDir::new().unwrap();
        write_doc(tmp.path(), "base/converge.toml", "");
        let root = write_doc(tmp.path(), "root.toml", "[[include]]\npath = \"base\"\n");

        let docs = resolve(&root).unwrap();
        assert_eq!(resolved_names(&docs), vec!["root.toml", "converge.toml"]);
    }

    #[test]
    fn extensionless_include_gets_conventional_extension() {
        let tmp = TempDir::new().unwrap();
        write_doc(tmp.path(), "base.toml", "");
        let root = write_doc(tmp.path(), "root.toml", "[[include]]\npath = \"base\"\n");

        let docs = resolve(&root).unwrap();
        assert_eq!(resolved_names(&docs), vec!["root.toml", "base.toml"]);
    }

    #[test]
    fn relative_paths_resolve_against_including_document() {
        let tmp = TempDir::new().unwrap();
        write_doc(tmp.path(), "nested/deep.toml", "");
        write_doc(
            tmp.path(),
            "nested/mid.toml",
            "[[include]]\npath = \"deep.toml\"\n",
        );
        let root = write_doc(
            tmp.path(),
            "root.toml",
            "[[include]]\npath = \"nested/mid.toml\"\n",
        );

        let docs = resolve(&root).unwrap();
        assert_eq!(
            resolved_names(&docs),
            vec!["root.toml", "mid.toml", "deep.toml"]
        );
    }

    // ── errors and skips ─────────────────────────────────────────────

    #[test]
    fn missing_target_errors() {
        let tmp = TempDir::new().unwrap();
        let root = write_doc(tmp.path(), "root.toml", "[[include]]\npath = \"gone.toml\"\n");

        let err = resolve(&root).unwrap_err();
        assert!(matches!(err, IncludeError::NotFound { .. }));
    }

    #[test]
    fn missing_optional_target_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = write_doc(
            tmp.path(),
            "root.toml",
            "[[include]]\npath = \"gone.toml\"\noptional = true\n",
        );

        let docs = resolve(&root).unwrap();
        assert_eq!(resolved_names(&docs), vec!["root.toml"]);
    }

    #[test]
    fn unmet_condition_skips_even_when_required() {
        let tmp = TempDir::new().unwrap();
        // Target does not exist, but the condition fails first: no error.
        let root = write_doc(
            tmp.path(),
            "root.toml",
            "[[include]]\npath = \"gone.toml\"\nwhen = [{ os = \"plan9\" }]\n",
        );

        let docs = resolve(&root).unwrap();
        assert_eq!(resolved_names(&docs), vec!["root.toml"]);
    }

    #[test]
    fn met_condition_includes_target() {
        let tmp = TempDir::new().unwrap();
        write_doc(tmp.path(), "here.toml", "");
        let root = write_doc(
            tmp.path(),
            "root.toml",
            &format!(
                "[[include]]\npath = \"here.toml\"\nwhen = [{{ os = \"{}\" }}]\n",
                std::env::consts::OS
            ),
        );

        let docs = resolve(&root).unwrap();
        assert_eq!(resolved_names(&docs), vec!["root.toml", "here.toml"]);
    }

    #[test]
    fn directive_with_both_path_and_glob_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let root = write_doc(
            tmp.path(),
            "root.toml",
            "[[include]]\npath = \"a.toml\"\nglob = \"*.toml\"\n",
        );

        let err = resolve(&root).unwrap_err();
        assert!(matches!(err, IncludeError::InvalidDirective { .. }));
    }

    #[test]
    fn directive_with_neither_path_nor_glob_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let root = write_doc(tmp.path(), "root.toml", "[[include]]\noptional = true\n");

        let err = resolve(&root).unwrap_err();
        assert!(matches!(err, IncludeError::InvalidDirective { .. }));
    }

    #[test]
    fn malformed_included_document_errors() {
        let tmp = TempDir::new().unwrap();
        write_doc(tmp.path(), "bad.toml", "not [ valid");
        let root = write_doc(tmp.path(), "root.toml", "[[include]]\npath = \"bad.toml\"\n");

        let err = resolve(&root).unwrap_err();
        assert!(matches!(err, IncludeError::Document { .. }));
    }

    // ── globs ────────────────────────────────────────────────────────

    #[test]
    fn glob_matches_sorted_lexicographically() {
        let tmp = TempDir::new().unwrap();
        write_doc(tmp.path(), "conf.d/20-second.toml", "");
        write_doc(tmp.path(), "conf.d/10-first.toml", "");
        let root = write_doc(
            tmp.path(),
            "root.toml",
            "[[include]]\nglob = \"conf.d/*.toml\"\n",
        );

        let docs = resolve(&root).unwrap();
        assert_eq!(
            resolved_names(&docs),
            vec!["root.toml", "10-first.toml", "20-second.toml"]
        );
    }

    #[test]
    fn empty_glob_errors_unless_optional() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("conf.d")).unwrap();
        let root = write_doc(
            tmp.path(),
            "root.toml",
            "[[include]]\nglob = \"conf.d/*.toml\"\n",
        );

        let err = resolve(&root).unwrap_err();
        assert!(matches!(err, IncludeError::UnresolvedGlob { .. }));
    }

    #[test]
    fn empty_optional_glob_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = write_doc(
            tmp.path(),
            "root.toml",
            "[[include]]\nglob = \"conf.d/*.toml\"\noptional = true\n",
        );

        let docs = resolve(&root).unwrap();
        assert_eq!(resolved_names(&docs), vec!["root.toml"]);
    }

    #[test]
    fn glob_wildcard_outside_final_component_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let root = write_doc(
            tmp.path(),
            "root.toml",
            "[[include]]\nglob = \"*/converge.toml\"\n",
        );

        let err = resolve(&root).unwrap_err();
        assert!(matches!(err, IncludeError::InvalidDirective { .. }));
    }

    // ── wildcard matcher ─────────────────────────────────────────────

    #[test]
    fn wildcard_match_literals() {
        assert!(wildcard_match("base.toml", "base.toml"));
        assert!(!wildcard_match("base.toml", "other.toml"));
    }

    #[test]
    fn wildcard_match_star() {
        assert!(wildcard_match("*.toml", "base.toml"));
        assert!(wildcard_match("10-*.toml", "10-first.toml"));
        assert!(!wildcard_match("*.toml", "base.json"));
        assert!(wildcard_match("*", "anything"));
    }

    #[test]
    fn wildcard_match_question_mark() {
        assert!(wildcard_match("?.toml", "a.toml"));
        assert!(!wildcard_match("?.toml", "ab.toml"));
    }

    #[test]
    fn wildcard_match_backtracking() {
        assert!(wildcard_match("*a*b", "xaxb"));
        assert!(wildcard_match("a*b*c", "abxbc"));
        assert!(!wildcard_match("a*b*c", "abxbx"));
    }
}
