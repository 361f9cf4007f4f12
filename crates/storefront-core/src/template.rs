//! Email template rendering and the YAML template seed file.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Replace every `{{ key }}` placeholder with its value from `vars`.
///
/// Whitespace inside the braces is ignored. Placeholders with no matching
/// variable, and unterminated `{{`, are left in the output unchanged.
#[must_use]
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = after_open[..end].trim();
        match vars.get(key) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }

    out.push_str(rest);
    out
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub key: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct TemplatesFile {
    pub templates: Vec<TemplateConfig>,
}

/// Load and validate email templates from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_templates(path: &Path) -> Result<TemplatesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TemplatesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: TemplatesFile = serde_yaml::from_str(&content)?;
    validate_templates(&file)?;
    Ok(file)
}

fn validate_templates(file: &TemplatesFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for template in &file.templates {
        if template.key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "template key must be non-empty".to_string(),
            ));
        }
        if template.subject.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "template '{}' has an empty subject",
                template.key
            )));
        }
        if !seen.insert(template.key.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate template key: '{}'",
                template.key
            )));
        }
    }

    Ok(())
}
