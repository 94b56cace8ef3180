// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Catalog output
//!
//! The YAML form is written by hand because consumers expect a fixed quoting
//! style: architecture keys bare, model and version keys and the `url`/`hash`
//! values double-quoted. Key order is the catalog's insertion order.

use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl OutputFormat {
    /// JSON for `.json` paths, YAML otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

pub fn render(catalog: &Catalog, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => render_yaml(catalog),
        OutputFormat::Json => render_json(catalog),
    }
}

pub fn render_yaml(catalog: &Catalog) -> Result<String> {
    if catalog.is_empty() {
        return Ok("{}\n".to_string());
    }

    let mut out = String::new();
    for (arch, models) in catalog.iter() {
        if models.is_empty() {
            writeln!(out, "{arch}: {{}}").map_err(fmt_error)?;
            continue;
        }
        writeln!(out, "{arch}:").map_err(fmt_error)?;
        for (model, versions) in models {
            if versions.is_empty() {
                writeln!(out, "  {}: {{}}", quote(model)).map_err(fmt_error)?;
                continue;
            }
            writeln!(out, "  {}:", quote(model)).map_err(fmt_error)?;
            for (version, record) in versions {
                writeln!(out, "    {}:", quote(&version.render())).map_err(fmt_error)?;
                writeln!(out, "      url: {}", quote(&record.url)).map_err(fmt_error)?;
                writeln!(out, "      hash: {}", quote(&record.hash)).map_err(fmt_error)?;
            }
        }
    }
    Ok(out)
}

pub fn render_json(catalog: &Catalog) -> Result<String> {
    let mut out = serde_json::to_string_pretty(catalog)?;
    out.push('\n');
    Ok(out)
}

/// Render and write the catalog, replacing `path` atomically.
pub fn write_catalog(catalog: &Catalog, path: &Path) -> Result<()> {
    let content = render(catalog, OutputFormat::from_path(path))?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    // Must share the target's filesystem for the rename to be atomic
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// YAML double-quoted scalar.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn fmt_error(e: std::fmt::Error) -> CatalogError {
    CatalogError::Serialize(e.to_string())
}
