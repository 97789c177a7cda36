use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;

use seisan_core::{ColumnMap, RowBand, TemplateLayout};
use seisan_extract::{DEFAULT_BASE_URL, DEFAULT_MODEL, PollPolicy};

use crate::state::ensure_seisan_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gemini: GeminiSection,
    pub template: TemplateSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiSection {
    pub model: String,
    pub base_url: String,
    /// Fallback when the GOOGLE_API_KEY environment variable is unset.
    pub api_key: Option<String>,
    pub poll_interval_ms: u64,
    pub poll_timeout_secs: u64,
    pub poll_max_attempts: u32,
}

impl GeminiSection {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.poll_timeout_secs),
            max_attempts: self.poll_max_attempts,
        }
    }
}

/// Template geometry. Every field of the core layout is exposed here so a
/// different expense form only needs a config edit, not a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSection {
    pub path: PathBuf,
    pub transport_row: u32,
    pub parking_row: u32,
    pub detail_start_row: u32,
    pub footer_skip_start: u32,
    pub footer_resume_row: u32,
    pub date_col: u32,
    pub store_col: u32,
    pub amount_8_col: u32,
    pub amount_10_col: u32,
}

impl TemplateSection {
    pub fn layout(&self) -> TemplateLayout {
        TemplateLayout {
            transport_row: self.transport_row,
            parking_row: self.parking_row,
            detail_start_row: self.detail_start_row,
            footer_band: RowBand {
                start: self.footer_skip_start,
                resume: self.footer_resume_row,
            },
            columns: ColumnMap {
                date: self.date_col,
                store_name: self.store_col,
                amount_8: self.amount_8_col,
                amount_10: self.amount_10_col,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let poll = PollPolicy::default();
        let layout = TemplateLayout::default();
        Self {
            gemini: GeminiSection {
                model: DEFAULT_MODEL.to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
                api_key: None,
                poll_interval_ms: poll.interval.as_millis() as u64,
                poll_timeout_secs: poll.timeout.as_secs(),
                poll_max_attempts: poll.max_attempts,
            },
            template: TemplateSection {
                path: PathBuf::from("template.xlsx"),
                transport_row: layout.transport_row,
                parking_row: layout.parking_row,
                detail_start_row: layout.detail_start_row,
                footer_skip_start: layout.footer_band.start,
                footer_resume_row: layout.footer_band.resume,
                date_col: layout.columns.date,
                store_col: layout.columns.store_name,
                amount_8_col: layout.columns.amount_8,
                amount_10_col: layout.columns.amount_10,
            },
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_seisan_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(toml::from_str(&s).context("parse config.toml")?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let cfg = load_config()?;
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}

/// Missing credentials are a configuration error, surfaced before any
/// upload happens.
pub fn resolve_api_key(cfg: &Config) -> Result<String> {
    if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
        if !key.is_empty() {
            return Ok(key);
        }
    }
    if let Some(key) = &cfg.gemini.api_key {
        if !key.is_empty() {
            return Ok(key.clone());
        }
    }
    bail!(
        "no API key: set GOOGLE_API_KEY or gemini.api_key in {}",
        config_path()?.display()
    )
}
