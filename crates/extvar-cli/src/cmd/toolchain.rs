use anyhow::Context;
use extvar_core::config::{Config, Toolchain};
use extvar_core::tool_runner::detect_toolchain;
use std::path::Path;

use crate::output::{print_json, print_table};

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    // Without a config the default operator names are checked.
    let toolchain = if config_path.exists() {
        Config::load(config_path)
            .with_context(|| format!("failed to load config {}", config_path.display()))?
            .toolchain
    } else {
        Toolchain::default()
    };

    let status = detect_toolchain(&toolchain);
    if json {
        print_json(&status)?;
    } else {
        let rows: Vec<Vec<String>> = status
            .iter()
            .map(|t| {
                vec![
                    t.program.clone(),
                    t.path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "not found".to_string()),
                ]
            })
            .collect();
        print_table(&["PROGRAM", "PATH"], &rows);
    }

    let missing = status.iter().filter(|t| !t.available()).count();
    if missing > 0 {
        anyhow::bail!("{missing} toolchain program(s) not found on PATH");
    }
    Ok(())
}
