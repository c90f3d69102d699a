//! Docs tools: lint_skills.

use std::path::Path;

use serde_json::{Value, json};

use super::{McpTool, ToolContext, response_format_schema};
use crate::error::{ToolError, ToolResult};
use crate::models::{LintSkillsInput, ResponseFormat};
use crate::skills::{self, LintReport};

/// Skill frontmatter lint tool.
pub struct LintSkillsTool;

#[async_trait::async_trait]
impl McpTool for LintSkillsTool {
    fn name(&self) -> &'static str {
        "lint_skills"
    }

    fn description(&self) -> &'static str {
        "Check SKILL.md files for YAML frontmatter with a name (lowercase letters, digits, \
         hyphens, at most 64 characters) and a description (at most 1024 characters)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "SKILL.md file or directory to walk"
                },
                "includeAllMarkdown": {
                    "type": "boolean",
                    "default": false,
                    "description": "Also lint every *.md that opens with a --- fence"
                },
                "responseFormat": response_format_schema()
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, _ctx: &ToolContext, input: Value) -> ToolResult<String> {
        let params: LintSkillsInput = serde_json::from_value(input)?;
        let path = params.path.trim();
        if path.is_empty() {
            return Err(ToolError::validation("path", "must not be empty"));
        }

        let root = Path::new(path).to_path_buf();
        let include_all = params.include_all_markdown;
        let report = tokio::task::spawn_blocking(move || skills::lint_directory(&root, include_all))
            .await
            .map_err(|e| ToolError::internal(format!("lint task failed: {e}")))?
            .map_err(|e| ToolError::validation("path", format!("{e:#}")))?;

        match params.response_format {
            ResponseFormat::Markdown => Ok(format_report(&report)),
            ResponseFormat::Json => Ok(serde_json::to_string_pretty(&report)?),
        }
    }
}

/// Render a lint report.
#[must_use]
pub fn format_report(report: &LintReport) -> String {
    if report.files.is_empty() {
        return "No skill files found.".to_string();
    }

    let failed = report.failures().count();
    let mut output = format!(
        "# Skill lint: {} file(s), {} passed, {failed} failed\n\n",
        report.files.len(),
        report.files.len() - failed
    );

    for file in &report.files {
        let label = file.name.as_deref().unwrap_or("?");
        if file.is_ok() {
            output.push_str(&format!("- ✓ `{}` ({label})\n", file.path.display()));
        } else {
            output.push_str(&format!("- ✗ `{}` ({label})\n", file.path.display()));
            for issue in &file.issues {
                output.push_str(&format!("  - {issue}\n"));
            }
        }
    }
    output
}
