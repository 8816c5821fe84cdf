//! Per-document conversion
//!
//! Extract the config block, run every pass, then put the rewritten config
//! block back on top and prepend the provenance header.

use std::path::Path;
use tsqlbricks_core::diagnostic::now;
use tsqlbricks_jinja::ConfigBlock;
use tsqlbricks_sql::PIPELINE;

use crate::error::ConvertError;

/// A converted document, before it is written anywhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedDocument {
    /// Provenance lines, when enabled
    pub header: Option<String>,

    /// Config block that was found, with only allow-listed keys
    pub config: Option<ConfigBlock>,

    /// Translated SQL
    pub body: String,
}

impl ConvertedDocument {
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(header) = &self.header {
            out.push_str(header);
        }
        match &self.config {
            Some(config) => {
                out.push_str(&config.render());
                out.push_str("\n\n");
                out.push_str(strip_leading_blank_lines(&self.body));
            }
            None => out.push_str(&self.body),
        }
        out
    }
}

/// Converts documents. Holds no per-document state and is shared across
/// batch workers.
#[derive(Debug, Clone)]
pub struct Converter {
    invocation: String,
    header: bool,
}

impl Converter {
    /// `invocation` is recorded on the `-- Command:` line
    pub fn new(invocation: impl Into<String>) -> Self {
        Self {
            invocation: invocation.into(),
            header: true,
        }
    }

    /// Enable or disable the provenance header
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn convert_document(&self, source: &str) -> Result<ConvertedDocument, ConvertError> {
        let (mut body, config) = ConfigBlock::extract(source);
        if let Some(config) = &config {
            tracing::debug!(params = config.params.len(), "config block extracted");
        }

        for pass in PIPELINE.iter() {
            body = pass.apply(&body)?;
            tracing::debug!(pass = pass.name, stage = ?pass.stage, "pass applied");
        }

        let header = self.header.then(|| {
            format!("-- Converted on: {}\n-- Command: {}\n\n", now(), self.invocation)
        });

        Ok(ConvertedDocument { header, config, body })
    }

    /// Read `input`, convert it, and write the result to `output`.
    ///
    /// Nothing is written unless conversion succeeded.
    pub fn convert_file(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let source = std::fs::read_to_string(input).map_err(|source| ConvertError::Read {
            path: input.to_path_buf(),
            source,
        })?;

        let document = self.convert_document(&source)?;

        std::fs::write(output, document.render()).map_err(|source| ConvertError::Write {
            path: output.to_path_buf(),
            source,
        })?;

        tracing::debug!(input = %input.display(), output = %output.display(), "file converted");
        Ok(())
    }
}

fn strip_leading_blank_lines(body: &str) -> &str {
    let mut rest = body;
    while let Some(newline) = rest.find('\n') {
        if !rest[..newline].trim().is_empty() {
            break;
        }
        rest = &rest[newline + 1..];
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn config_block_on_top() {
        let source = "{{ config(materialized='table', unique_key='id', tags=['x']) }}\n\n\nSELECT id = [Id] FROM t";
        let document = Converter::new("test").with_header(false).convert_document(source).unwrap();

        assert_eq!(
            document.render(),
            "{{\n    config(\n        materialized='table'\n        ,unique_key='id'\n    )\n}}\n\nSELECT `Id` AS id FROM t"
        );
    }

    #[test]
    fn header_lines() {
        let document = Converter::new("tsqlbricks convert a.sql b.sql")
            .convert_document("SELECT 1")
            .unwrap();
        let rendered = document.render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert!(lines[0].starts_with("-- Converted on: "));
        assert_eq!(lines[1], "-- Command: tsqlbricks convert a.sql b.sql");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "SELECT 1");
    }

    #[test]
    fn no_config_block_keeps_body() {
        let document = Converter::new("t").with_header(false).convert_document("\nSELECT 1").unwrap();
        assert_eq!(document.config, None);
        assert_eq!(document.render(), "\nSELECT 1");
    }

    #[test]
    fn pass_failure_surfaces() {
        let err = Converter::new("t")
            .convert_document("SELECT HASHBYTES('SHA3', x)")
            .unwrap_err();
        assert!(matches!(err, ConvertError::Pass { pass: "hash_functions", .. }));
    }

    #[test]
    fn blank_line_stripping() {
        assert_eq!(strip_leading_blank_lines("\n  \n\tSELECT"), "\tSELECT");
        assert_eq!(strip_leading_blank_lines("   "), "   ");
    }
}
