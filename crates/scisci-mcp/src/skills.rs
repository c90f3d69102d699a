//! Lint for skill documents.
//!
//! A skill is a Markdown file (conventionally `SKILL.md`) opening with YAML
//! frontmatter that names and describes it:
//!
//! ```text
//! ---
//! name: openalex-database
//! description: Query OpenAlex for works, authors and institutions.
//! ---
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

/// Maximum name length.
pub const MAX_NAME_LENGTH: usize = 64;
/// Maximum description length.
pub const MAX_DESCRIPTION_LENGTH: usize = 1024;

static FRONTMATTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^---\s*\n([\s\S]*?)\n---\s*(?:\n([\s\S]*))?$")
        .expect("valid frontmatter regex pattern")
});

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid skill name regex pattern"));

/// Lint result for one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Linted file.
    pub path: PathBuf,
    /// Skill name when it could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Problems found; empty when the file passes.
    pub issues: Vec<String>,
}

impl FileReport {
    /// Check if the file passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Lint results for a tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LintReport {
    /// Per-file results in path order.
    pub files: Vec<FileReport>,
}

impl LintReport {
    /// Files with at least one issue.
    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| !f.is_ok())
    }

    /// Check if every file passed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.files.iter().all(FileReport::is_ok)
    }
}

/// Lint the text of one skill document.
#[must_use]
pub fn lint_content(content: &str) -> (Option<String>, Vec<String>) {
    let content = content.replace("\r\n", "\n");
    let Some(yaml) = FRONTMATTER_RE.captures(&content).and_then(|c| c.get(1)) else {
        return (None, vec!["missing YAML frontmatter between '---' fences".to_string()]);
    };

    let doc: serde_yaml::Value = match serde_yaml::from_str(yaml.as_str()) {
        Ok(v) => v,
        Err(e) => return (None, vec![format!("invalid YAML frontmatter: {e}")]),
    };
    let Some(map) = doc.as_mapping() else {
        return (None, vec!["frontmatter must be a YAML mapping".to_string()]);
    };

    let mut issues = Vec::new();
    let name = text_field(map, "name", &mut issues);
    let description = text_field(map, "description", &mut issues);

    if let Some(name) = &name {
        if name.chars().count() > MAX_NAME_LENGTH {
            issues.push(format!(
                "'name' exceeds {MAX_NAME_LENGTH} characters (was {})",
                name.chars().count()
            ));
        }
        if !NAME_RE.is_match(name) {
            issues.push(format!(
                "'name' '{name}' must contain only lowercase letters, numbers, and hyphens"
            ));
        }
    }
    if let Some(description) = &description {
        let len = description.chars().count();
        if len > MAX_DESCRIPTION_LENGTH {
            issues.push(format!(
                "'description' exceeds {MAX_DESCRIPTION_LENGTH} characters (was {len})"
            ));
        }
    }

    (name, issues)
}

fn text_field(map: &serde_yaml::Mapping, key: &str, issues: &mut Vec<String>) -> Option<String> {
    match map.get(key) {
        None | Some(serde_yaml::Value::Null) => {
            issues.push(format!("missing '{key}'"));
            None
        }
        Some(serde_yaml::Value::String(s)) if s.trim().is_empty() => {
            issues.push(format!("'{key}' is empty"));
            None
        }
        Some(serde_yaml::Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            issues.push(format!("'{key}' must be a string"));
            None
        }
    }
}

/// Lint one file.
pub fn lint_file(path: &Path) -> Result<FileReport> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let (name, issues) = lint_content(&content);
    Ok(FileReport { path: path.to_path_buf(), name, issues })
}

/// Lint every `SKILL.md` under `root` (or `root` itself when it is a file).
///
/// With `include_all_markdown`, any `*.md` whose first line is `---` is
/// linted too. Hidden directories and symlinked directories are skipped. A
/// file that cannot be read is reported as a failure of that file.
pub fn lint_directory(root: &Path, include_all_markdown: bool) -> Result<LintReport> {
    if root.is_file() {
        return Ok(LintReport { files: vec![lint_file(root)?] });
    }
    if !root.is_dir() {
        anyhow::bail!("{} is not a file or directory", root.display());
    }

    let mut candidates = Vec::new();
    collect(root, include_all_markdown, &mut candidates)?;
    candidates.sort();

    let files: Vec<FileReport> = candidates
        .iter()
        .map(|path| {
            lint_file(path).unwrap_or_else(|e| FileReport {
                path: path.clone(),
                name: None,
                issues: vec![format!("unreadable: {e:#}")],
            })
        })
        .collect();
    let failed = files.iter().filter(|f| !f.is_ok()).count();
    tracing::info!(root = %root.display(), files = files.len(), failed, "Linted skills");

    Ok(LintReport { files })
}

fn collect(dir: &Path, include_all_markdown: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let hidden = path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with('.'));
        // DirEntry::file_type does not follow symlinks.
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if hidden {
                continue;
            }
            if let Err(e) = collect(&path, include_all_markdown, out) {
                tracing::warn!(dir = %path.display(), error = %e, "Skipping unreadable directory");
            }
        } else if (file_type.is_file() || path.is_file()) && is_candidate(&path, include_all_markdown) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_candidate(path: &Path, include_all_markdown: bool) -> bool {
    if path.file_name().is_some_and(|n| n == "SKILL.md") {
        return true;
    }
    include_all_markdown
        && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("md"))
        && fs::read_to_string(path).is_ok_and(|c| c.starts_with("---"))
}
