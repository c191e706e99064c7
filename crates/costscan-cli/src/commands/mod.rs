//! Subcommands and the inputs they share.

pub mod batch;
pub mod config;
pub mod process;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::{debug, info};

use costscan_core::{
    CompanyInfo, DocumentPipeline, FieldMappings, ScanConfig, ScanContext, ScanOutcome, SupplierRecord,
};

/// File extensions accepted by `process` and `batch`.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "txt"];

/// Inputs shared by `process` and `batch`.
#[derive(Args)]
pub struct ScanInputs {
    /// Label mappings JSON (field -> list of labels)
    #[arg(long)]
    mappings: Option<PathBuf>,

    /// Supplier directory JSON (array of supplier records)
    #[arg(long)]
    suppliers: Option<PathBuf>,

    /// Own company JSON, never matched as a supplier
    #[arg(long)]
    company: Option<PathBuf>,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Do not call the generative model
    #[arg(long)]
    no_ai: bool,
}

impl ScanInputs {
    /// Build the pipeline with the backends available for these options.
    pub fn pipeline(&self, mut config: ScanConfig) -> DocumentPipeline {
        if let Some(dir) = &self.model_dir {
            config.models.model_dir = dir.clone();
        }
        if self.no_ai {
            config.ai.enabled = false;
        }

        let pipeline = DocumentPipeline::from_config(config);
        info!(
            "Backends: model={}, ocr={}",
            pipeline.has_model(),
            pipeline.has_recognizer()
        );
        pipeline
    }

    /// Read the host inputs for a scan.
    pub fn context(&self, pipeline: &DocumentPipeline) -> anyhow::Result<ScanContext> {
        let mut ctx = pipeline.context();

        if let Some(path) = &self.mappings {
            let json = fs::read_to_string(path)?;
            ctx.mappings = FieldMappings::from_json(&json)
                .map_err(|e| anyhow::anyhow!("Invalid mappings file {}: {}", path.display(), e))?;
        }
        if let Some(path) = &self.suppliers {
            let suppliers: Vec<SupplierRecord> = serde_json::from_str(&fs::read_to_string(path)?)
                .map_err(|e| anyhow::anyhow!("Invalid suppliers file {}: {}", path.display(), e))?;
            debug!("Loaded {} suppliers", suppliers.len());
            ctx.suppliers = suppliers;
        }
        if let Some(path) = &self.company {
            let company: CompanyInfo = serde_json::from_str(&fs::read_to_string(path)?)
                .map_err(|e| anyhow::anyhow!("Invalid company file {}: {}", path.display(), e))?;
            ctx.company = company;
        }

        Ok(ctx)
    }
}

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("costscan")
        .join("config.json")
}

/// Load the given config file, else the default one if it exists, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ScanConfig> {
    if let Some(path) = config_path {
        return Ok(ScanConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config {}", default_path.display());
        return Ok(ScanConfig::from_file(&default_path)?);
    }
    Ok(ScanConfig::default())
}

/// Lowercased extension of a path.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn mime_type_for(extension: &str) -> Option<&'static str> {
    match extension {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

/// Scan one file: text files skip recognition, everything else goes through
/// the pipeline by MIME type.
pub async fn scan_file(
    pipeline: &DocumentPipeline,
    path: &Path,
    ctx: &ScanContext,
) -> anyhow::Result<ScanOutcome> {
    let extension = extension_of(path);
    if extension == "txt" {
        let text = fs::read_to_string(path)?;
        return Ok(pipeline.process_text(&text, ctx));
    }

    let Some(mime_type) = mime_type_for(&extension) else {
        anyhow::bail!("Unsupported file format: {}", extension);
    };
    let data = fs::read(path)?;
    Ok(pipeline.process(&data, mime_type, ctx).await?)
}
