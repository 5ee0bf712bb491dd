pub mod aggregate;
pub mod batch;
pub mod config;
pub mod extract;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use pachi_core::{OcrDocument, PachiConfig};

/// Location of the user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pachi")
        .join("config.json")
}

/// Resolve the configuration: explicit path, then the user file, then defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<PachiConfig> {
    if let Some(path) = config_path {
        return Ok(PachiConfig::from_file(Path::new(path))?);
    }

    let user_path = default_config_path();
    if user_path.exists() {
        debug!("Using config from {}", user_path.display());
        Ok(PachiConfig::from_file(&user_path)?)
    } else {
        Ok(PachiConfig::default())
    }
}

/// Read an OCR file: `.json` is a document or Vision response, anything
/// else is plain text.
pub fn read_document(path: &Path) -> anyhow::Result<OcrDocument> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let content = fs::read_to_string(path)?;

    match extension.as_str() {
        "json" => OcrDocument::from_json_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e)),
        _ => Ok(OcrDocument::from_text(content)),
    }
}

/// True for file types `read_document` understands.
pub fn is_supported(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    matches!(ext.to_lowercase().as_str(), "txt" | "json")
}
