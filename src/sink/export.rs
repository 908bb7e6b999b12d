use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::core::types::PlaceOutput;

pub const EXPORT_FILE_NAME: &str = "data.json";

/// Local fallback when the sink is unreachable or refuses the payload.
pub trait Exporter: Send + Sync {
    /// Write `output` somewhere the user can pick it up; returns where.
    fn export(&self, output: &[PlaceOutput]) -> Result<PathBuf>;
}

/// Writes `data.json` (4-space indented) into a directory.
#[derive(Debug, Clone)]
pub struct LocalExport {
    dir: PathBuf,
}

impl LocalExport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

pub(crate) fn to_indented_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

impl Exporter for LocalExport {
    fn export(&self, output: &[PlaceOutput]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("export: failed to create {}", self.dir.display()))?;
        let path = self.dir.join(EXPORT_FILE_NAME);
        let bytes = to_indented_json(output).context("export: serialization failed")?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("export: failed to write {}", path.display()))?;
        info!(
            "export: wrote {} place(s) of raw output to {}",
            output.len(),
            path.display()
        );
        Ok(path)
    }
}
