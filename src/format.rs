//! Output formatting for the command line: JSON, YAML and markdown.

use crate::config::{PromptOptions, ResolvedTypeConfig, ViewOptions};
use crate::logging::Diagnostic;
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }

    /// Serialize `value` as JSON or YAML. Markdown callers use the dedicated renderers.
    pub fn render<T: Serialize>(self, value: &T) -> Result<String> {
        Ok(match self {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json | OutputFormat::Markdown => serde_json::to_string_pretty(value)?,
        })
    }
}

/// One row of `notegen list`.
#[derive(Debug, Clone, Serialize)]
pub struct ClassSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl From<&ResolvedTypeConfig> for ClassSummary {
    fn from(resolved: &ResolvedTypeConfig) -> Self {
        Self {
            name: resolved.type_name().to_string(),
            parent: resolved.parent().map(str::to_string),
            root: resolved.root().map(str::to_string),
        }
    }
}

/// Format the class list as markdown.
pub fn format_classes_markdown(classes: &[ClassSummary]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Classes ({})\n\n", classes.len()));
    for class in classes {
        match (&class.parent, &class.root) {
            (Some(parent), Some(root)) if parent != root => {
                md.push_str(&format!("- `{}` extends `{}` (root `{}`)\n", class.name, parent, root))
            }
            (Some(parent), _) => md.push_str(&format!("- `{}` extends `{}`\n", class.name, parent)),
            _ => md.push_str(&format!("- `{}`\n", class.name)),
        }
    }

    md
}

/// Format a resolved class as markdown.
pub fn format_resolved_markdown(resolved: &ResolvedTypeConfig) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Class: {}\n", resolved.type_name()));
    if let Some(parent) = resolved.parent() {
        md.push_str(&format!("- **parent**: `{}`\n", parent));
    }
    if let Some(root) = resolved.root() {
        md.push_str(&format!("- **root**: `{}`\n", root));
    }

    for (key, value) in resolved.fields() {
        if key == "view" {
            continue;
        }
        md.push_str(&format!("- **{}**: {}\n", key, inline_value(value)));
    }

    if let Some(view) = resolved.view() {
        md.push_str("\n### View\n");
        for (key, value) in view {
            md.push_str(&format!("- **{}**: {}\n", key, inline_value(value)));
        }
    }

    md
}

/// Format prompt options as markdown.
pub fn format_prompt_options_markdown(options: &PromptOptions) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Prompt options: {}\n", options.type_name));
    md.push_str(&format!("- **variant**: {}\n", options.variant.as_str()));
    md.push_str(&format!("- **title**: {}\n", options.title()));
    md.push_str(&format!("- **date_fmt**: `{}`\n", options.date_fmt));

    let prompts: Vec<&str> = [
        ("title", options.prompt_for_title),
        ("prefix", options.prompt_for_prefix),
        ("suffix", options.prompt_for_suffix),
        ("alias", options.prompt_for_alias),
        ("task", options.prompt_for_task),
        ("attachment", options.prompt_for_attachment),
        ("project", options.prompt_for_project),
        ("goal", options.prompt_for_goal),
        ("subfolder", options.prompt_for_subfolder),
    ]
    .into_iter()
    .filter_map(|(name, on)| on.then_some(name))
    .collect();
    md.push_str(&format!("- **prompts for**: {}\n", prompts.join(", ")));

    if !options.files_paths.is_empty() {
        md.push_str(&format!("- **folders**: {}\n", options.files_paths.join(", ")));
    }
    md.push_str(&format!(
        "- **ignored**: {}\n",
        options.ignore_fields.iter().collect::<Vec<_>>().join(", ")
    ));

    if !options.default_values.is_empty() {
        md.push_str("\n### Default values\n");
        for dv in &options.default_values {
            md.push_str(&format!("- **{}**: {}\n", dv.name, inline_value(&dv.value)));
        }
    }

    if let Some(ref chat) = options.chat {
        md.push_str("\n### Chat\n");
        md.push_str(&format!("- **system_prompts**: `{}`\n", chat.system_prompts));
        md.push_str(&format!("- **prompt_templates**: `{}`\n", chat.prompt_templates));
    }

    md
}

/// Format view options as markdown.
pub fn format_view_options_markdown(options: &ViewOptions) -> String {
    let mut md = String::new();

    md.push_str(&format!("## View options: {}\n", options.type_name));
    md.push_str(&format!("- **title**: {}\n", options.title));
    md.push_str(&format!("- **period**: {}\n", options.period));
    md.push_str(&format!("- **linked**: {}\n", options.linked));
    md.push_str(&format!("- **tags**: {}\n", options.tags.iter().collect::<Vec<_>>().join(", ")));

    md
}

/// Format diagnostics as markdown.
pub fn format_diagnostics_markdown(diagnostics: &[Diagnostic]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Diagnostics ({})\n\n", diagnostics.len()));
    for d in diagnostics {
        md.push_str(&format!(
            "- [{:?}] `{}` {:?}: {}\n",
            d.severity, d.type_name, d.kind, d.message
        ));
    }

    md
}

fn inline_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => format!("`{}`", other),
    }
}
