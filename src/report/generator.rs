//! Dashboard page generation.
//!
//! The template carries a JavaScript region delimited by marker lines;
//! the aggregated dataset is injected there as a `const INJECTED = ...;`
//! assignment and the page is written out.

use crate::error::BuildError;
use crate::models::AggregatedDataset;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::path::Path;
use tracing::info;

pub const INJECT_START: &str = "// INJECT_DATA_START";
pub const INJECT_END: &str = "// INJECT_DATA_END";

static INJECT_REGION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?s){}\n.*?{}",
        regex::escape(INJECT_START),
        regex::escape(INJECT_END)
    ))
    .expect("injection marker pattern is valid")
});

/// Replace every marker region of `template` with the serialized dataset.
pub fn render(dataset: &AggregatedDataset, template: &str) -> Result<String, BuildError> {
    if !INJECT_REGION.is_match(template) {
        return Err(BuildError::Template(format!(
            "no `{INJECT_START}` ... `{INJECT_END}` region found in template"
        )));
    }

    let payload = dataset
        .to_json()
        .map_err(|e| BuildError::Template(format!("failed to serialize dataset: {e}")))?;
    let replacement = format!("{INJECT_START}\nconst INJECTED = {payload};\n{INJECT_END}");

    Ok(INJECT_REGION
        .replace_all(template, NoExpand(&replacement))
        .into_owned())
}

/// Read the dashboard template.
pub fn read_template(path: &Path) -> Result<String, BuildError> {
    std::fs::read_to_string(path).map_err(|e| BuildError::io(path, e))
}

/// Write the rendered page, creating parent directories as needed.
pub fn write_output(content: &str, path: &Path) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
    }

    std::fs::write(path, content).map_err(|e| BuildError::io(path, e))?;
    info!(
        "Written to {} ({} chars)",
        path.display(),
        content.chars().count()
    );
    Ok(())
}
