use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use seisan_core::{ReceiptRecord, aggregate, fill_sheet};
use seisan_extract::GeminiClient;

mod config;
mod csv_input;
mod display;
mod state;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "seisan", version, about = "Receipt PDF → expense-report spreadsheet")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a receipt PDF remotely and fill the expense template
    Run {
        /// PDF with one or more scanned receipts
        #[arg(long)]
        pdf: PathBuf,

        /// Template workbook (default: template.path from config)
        #[arg(long)]
        template: Option<PathBuf>,

        /// Output workbook (default: 精算_<date>.xlsx)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Also save the extracted records as JSON for later `fill` runs
        #[arg(long)]
        save_json: Option<PathBuf>,
    },

    /// Fill the template from locally stored records (no network)
    Fill {
        /// Records as a JSON array, e.g. produced by run --save-json
        #[arg(long)]
        json: Option<PathBuf>,

        /// Records as CSV: date,store_name,category,invoice_number,total_amount,amount_8_percent
        #[arg(long)]
        csv: Option<PathBuf>,

        #[arg(long)]
        template: Option<PathBuf>,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Manage ~/.seisan/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the active configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { pdf, template, out, save_json } => {
            run_remote(pdf, template, out, save_json).await
        }
        Command::Fill { json, csv, template, out } => run_fill(json, csv, template, out),
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config(),
            ConfigCommand::Show => config::show_config(),
        },
    }
}

async fn run_remote(
    pdf: PathBuf,
    template: Option<PathBuf>,
    out: Option<PathBuf>,
    save_json: Option<PathBuf>,
) -> Result<()> {
    let cfg = config::load_config()?;
    let api_key = config::resolve_api_key(&cfg)?;
    let template = resolve_template(template, &cfg)?;
    let bytes = fs::read(&pdf).with_context(|| format!("read {}", pdf.display()))?;

    let client = GeminiClient::new(api_key, cfg.gemini.model.clone(), cfg.gemini.base_url.clone());

    // ctrl-c aborts the remote wait between polls
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    println!("Uploading {} ...", pdf.display());
    let uploaded = client.upload_pdf(bytes).await?;
    println!("Waiting for remote processing ...");
    let active = client
        .wait_until_active(uploaded, &cfg.gemini.poll_policy(), &cancel)
        .await?;
    println!("Analyzing with {} ...", cfg.gemini.model);
    let records = client.extract_receipts(&active).await?;
    println!("Extracted {} receipt(s)\n", records.len());

    if let Some(path) = &save_json {
        let s = serde_json::to_string_pretty(&records)?;
        fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        println!("Saved records to {}", path.display());
    }

    finish(&records, &template, out, &cfg)
}

fn run_fill(
    json: Option<PathBuf>,
    csv: Option<PathBuf>,
    template: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let cfg = config::load_config()?;
    let template = resolve_template(template, &cfg)?;

    let records: Vec<ReceiptRecord> = match (json, csv) {
        (Some(path), None) => {
            let s = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?
        }
        (None, Some(path)) => csv_input::parse_receipts_csv(&path)?,
        _ => bail!("pass exactly one of --json or --csv"),
    };
    println!("Loaded {} receipt(s)\n", records.len());

    finish(&records, &template, out, &cfg)
}

/// The deterministic tail of both commands: aggregate, lay out, patch the
/// template, print the summary.
fn finish(records: &[ReceiptRecord], template: &Path, out: Option<PathBuf>, cfg: &Config) -> Result<()> {
    let result = aggregate(records);
    let layout = cfg.template.layout();

    let mut model = seisan_xlsx::read_template(template)?;
    fill_sheet(&mut model, &result, &layout);

    let out = out.unwrap_or_else(default_output_name);
    seisan_xlsx::write_filled_template(template, &out, &model)?;
    println!("Wrote {}\n", out.display());

    display::print_summary(&result);
    Ok(())
}

/// A missing template is a configuration error, checked before any work.
fn resolve_template(flag: Option<PathBuf>, cfg: &Config) -> Result<PathBuf> {
    let path = flag.unwrap_or_else(|| cfg.template.path.clone());
    if !path.exists() {
        bail!("template not found: {} (pass --template <path>)", path.display());
    }
    Ok(path)
}

fn default_output_name() -> PathBuf {
    let today = chrono::Local::now().format("%Y%m%d");
    PathBuf::from(format!("精算_{today}.xlsx"))
}
