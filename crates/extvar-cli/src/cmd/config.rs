use crate::output::{print_fields, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use extvar_core::config::{Config, WarnLevel};
use extvar_core::{io, ExtvarError};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write a starter extvar.yaml with the built-in CESM2 catalog
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Summarise the run the config describes
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(
    config_path: &Path,
    init_target: &Path,
    subcmd: ConfigSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Init { force } => init(init_target, force),
        ConfigSubcommand::Show => show(config_path, json),
        ConfigSubcommand::Validate => validate(config_path, json),
    }
}

fn load(config_path: &Path) -> anyhow::Result<Config> {
    Config::load(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    let config = Config::example();
    if force {
        config.save(path).context("failed to write config")?;
    } else {
        let data = serde_yaml::to_string(&config)?;
        if !io::write_new(path, data.as_bytes())? {
            return Err(ExtvarError::ConfigExists(path.to_path_buf()))
                .context("use --force to replace it");
        }
    }
    println!("Wrote {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load(config_path)?;

    let mut rows = Vec::new();
    for &component in &config.components {
        for frequency in &config.frequencies {
            let count = config
                .catalog
                .variables(component, frequency, config.extract_type)
                .map(|v| v.len().to_string())
                .unwrap_or_else(|e| format!("error: {e}"));
            rows.push(vec![
                component.to_string(),
                frequency.to_string(),
                frequency.dest_label().to_string(),
                count,
            ]);
        }
    }

    if json {
        let value = serde_json::json!({
            "experiment": config.experiment,
            "ensemble": config.ensemble,
            "components": config.components,
            "frequencies": config.frequencies,
            "start_year": config.start_year,
            "end_year": config.end_year,
            "extract_type": config.extract_type,
            "archive_root": config.archive_root,
            "output_dir": config.output_dir(),
            "toolchain": config.toolchain,
            "units": config.ensemble.len() * config.components.len(),
            "months_per_variable": config.month_count(),
        });
        return print_json(&value);
    }

    let exp = &config.experiment;
    print_fields(&[
        ("experiment", format!("{} ({})", exp.expid, exp.expname)),
        ("case", format!("{} @ {}", exp.casename, exp.resolution)),
        ("ensemble", config.ensemble.join(", ")),
        ("years", format!("{}-{}", config.start_year, config.end_year)),
        ("extract", config.extract_type.to_string()),
        ("archive", config.archive_root.display().to_string()),
        ("output", config.output_dir().display().to_string()),
    ]);
    println!();
    print_table(&["COMPONENT", "FREQUENCY", "OUTPUT AS", "VARIABLES"], &rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
