//! Process command - extract fields from a single document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use costscan_core::ScanOutcome;

use super::{ScanInputs, load_config, scan_file};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, PNG, JPEG or plain text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show recognition confidence and review status
    #[arg(long)]
    show_confidence: bool,

    #[command(flatten)]
    inputs: ScanInputs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message("Loading backends...");

    let pipeline = args.inputs.pipeline(config);
    let ctx = args.inputs.context(&pipeline)?;

    pb.set_message("Recognizing document...");
    let outcome = scan_file(&pipeline, &args.input, &ctx).await;
    pb.finish_and_clear();
    let outcome = outcome?;

    let output = format_outcome(&outcome, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        println!();
        println!(
            "{} Recognition confidence: {:.1}% ({})",
            style("ℹ").blue(),
            outcome.recognition.confidence * 100.0,
            outcome.recognition.engine_id
        );
        println!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            outcome.recognition.processing_time_ms
        );
    }
    if outcome.needs_review() {
        eprintln!("{}", style("Needs manual review:").yellow());
        for warning in &outcome.warnings {
            eprintln!("  - {}", warning);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

pub fn format_outcome(outcome: &ScanOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Csv => format_csv(outcome),
        OutputFormat::Text => Ok(format_text(outcome)),
    }
}

/// Column names of a CSV row describing an outcome.
pub const CSV_HEADER: [&str; 13] = [
    "supplier_name",
    "supplier_id",
    "document_type",
    "document_number",
    "issue_date",
    "due_date",
    "subtotal_tax_excluded",
    "total_amount",
    "vat_rate",
    "currency",
    "confidence",
    "engine",
    "needs_review",
];

/// One CSV row, in `CSV_HEADER` order.
pub fn csv_row(outcome: &ScanOutcome) -> Vec<String> {
    let fields = &outcome.fields;
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let shown = |value: Option<String>| value.unwrap_or_default();

    vec![
        text(&fields.supplier_name),
        shown(outcome.supplier.as_ref().map(|s| s.record().id.clone())),
        fields.document_type.as_str().to_string(),
        text(&fields.document_number),
        shown(fields.issue_date.map(|d| d.to_string())),
        shown(fields.due_date.map(|d| d.to_string())),
        shown(fields.subtotal_tax_excluded.map(|a| a.to_string())),
        shown(fields.total_amount.map(|a| a.to_string())),
        fields.vat_rate.to_string(),
        fields.currency.code().to_string(),
        format!("{:.2}", outcome.recognition.confidence),
        outcome.recognition.engine_id.clone(),
        outcome.needs_review().to_string(),
    ]
}

fn format_csv(outcome: &ScanOutcome) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;
    wtr.write_record(csv_row(outcome))?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(outcome: &ScanOutcome) -> String {
    let fields = &outcome.fields;
    let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    let currency = fields.currency.code();
    let mut output = String::new();

    output.push_str(&format!(
        "Document: {} {}\n",
        fields.document_type.as_str(),
        or_dash(fields.document_number.clone())
    ));
    output.push_str(&format!("Issued: {}\n", or_dash(fields.issue_date.map(|d| d.to_string()))));
    let due_note = if outcome.due_from_terms {
        " (payment terms)"
    } else if outcome.due_synthesized {
        " (default offset)"
    } else {
        ""
    };
    output.push_str(&format!(
        "Due: {}{}\n",
        or_dash(fields.due_date.map(|d| d.to_string())),
        due_note
    ));
    output.push('\n');

    output.push_str("Supplier:\n");
    output.push_str(&format!("  {}\n", or_dash(fields.supplier_name.clone())));
    if let Some(resolution) = &outcome.supplier {
        output.push_str(&format!("  Directory id: {}\n", resolution.record().id));
    }
    for (label, value) in [
        ("Address", &fields.supplier.address),
        ("City", &fields.supplier.city),
        ("Tax id", &fields.supplier.tax_id),
        ("Email", &fields.supplier.email),
        ("Phone", &fields.supplier.phone),
    ] {
        if let Some(value) = value {
            output.push_str(&format!("  {}: {}\n", label, value));
        }
    }
    output.push('\n');

    output.push_str("Amounts:\n");
    output.push_str(&format!(
        "  Net:   {} {}\n",
        or_dash(fields.subtotal_tax_excluded.map(|a| a.to_string())),
        currency
    ));
    output.push_str(&format!("  VAT:   {}%\n", fields.vat_rate));
    output.push_str(&format!(
        "  Total: {} {}\n",
        or_dash(fields.total_amount.map(|a| a.to_string())),
        currency
    ));

    if let Some(description) = &fields.description {
        output.push_str(&format!("\nDescription: {}\n", description));
    }

    output
}
