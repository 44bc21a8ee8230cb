use anyhow::Context;
use clap::Args;
use extvar_core::{
    config::Config,
    extract::{run_unit, work_units, Selection, UnitReport, VariableStatus, WorkUnit},
    tool_runner::{detect_toolchain, DryRunRunner, SystemRunner, ToolRunner},
    types::Component,
};
use rayon::prelude::*;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::output::{print_json, print_table};

#[derive(Args)]
pub struct RunArgs {
    /// Worker threads (default: one per ensemble/component unit)
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Log the commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Restrict to these ensemble members (repeatable)
    #[arg(long = "ensemble", value_name = "ID")]
    pub ensembles: Vec<String>,

    /// Restrict to these components (repeatable)
    #[arg(long = "component", value_name = "COMPONENT")]
    pub components: Vec<Component>,

    /// Restrict to these variables (repeatable)
    #[arg(long = "variable", value_name = "VAR")]
    pub variables: Vec<String>,
}

// ---------------------------------------------------------------------------
// UnitOutcome
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct UnitOutcome {
    unit: WorkUnit,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<UnitReport>,
}

impl UnitOutcome {
    fn from_result(unit: &WorkUnit, result: Result<extvar_core::Result<UnitReport>, String>) -> Self {
        let (report, error) = match result {
            Ok(Ok(report)) => {
                let failed: Vec<&str> = report.failed().map(|v| v.variable.as_str()).collect();
                let error = (!failed.is_empty())
                    .then(|| format!("failed variables: {}", failed.join(", ")));
                (Some(report), error)
            }
            Ok(Err(e)) => (None, Some(e.to_string())),
            Err(panic) => (None, Some(format!("worker panicked: {panic}"))),
        };
        Self {
            unit: unit.clone(),
            ok: error.is_none(),
            error,
            report,
        }
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn run(config_path: &Path, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    config.check().context("config validation failed")?;

    let selection = Selection {
        ensembles: args.ensembles,
        components: args.components,
        variables: args.variables,
    };
    let units = work_units(&config, &selection)?;
    if units.is_empty() {
        anyhow::bail!("nothing to extract: no (ensemble, component) units selected");
    }

    let runner: &dyn ToolRunner = if args.dry_run {
        &DryRunRunner
    } else {
        let missing: Vec<String> = detect_toolchain(&config.toolchain)
            .into_iter()
            .filter(|t| !t.available())
            .map(|t| t.program)
            .collect();
        if !missing.is_empty() {
            anyhow::bail!(
                "toolchain program(s) not found on PATH: {} (see 'extvar toolchain')",
                missing.join(", ")
            );
        }
        &SystemRunner
    };

    let jobs = args.jobs.unwrap_or(units.len());
    tracing::info!(
        units = units.len(),
        jobs,
        start_year = config.start_year,
        end_year = config.end_year,
        "starting extraction"
    );

    let outcomes = fan_out(&config, &units, jobs, runner, &selection)?;

    if json {
        print_json(&outcomes)?;
    } else {
        print_summary(&outcomes);
    }

    let failed = outcomes.iter().filter(|o| !o.ok).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} unit(s) failed", outcomes.len());
    }
    Ok(())
}

/// Run every unit on a pool of `jobs` threads. A unit that fails or panics
/// is reported in its own outcome; the rest still run to completion.
fn fan_out(
    config: &Config,
    units: &[WorkUnit],
    jobs: usize,
    runner: &dyn ToolRunner,
    selection: &Selection,
) -> anyhow::Result<Vec<UnitOutcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .thread_name(|i| format!("extvar-unit-{i}"))
        .build()
        .context("failed to start worker pool")?;

    Ok(pool.install(|| {
        units
            .par_iter()
            .map(|unit| {
                let result =
                    panic::catch_unwind(AssertUnwindSafe(|| run_unit(config, unit, runner, selection)))
                        .map_err(panic_message);
                UnitOutcome::from_result(unit, result)
            })
            .collect()
    }))
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn print_summary(outcomes: &[UnitOutcome]) {
    let rows: Vec<Vec<String>> = outcomes
        .iter()
        .map(|o| {
            let (done, skipped, commands) = match &o.report {
                Some(r) => (
                    r.count(|s| *s == VariableStatus::Completed),
                    r.count(|s| *s == VariableStatus::Skipped),
                    r.invocation_count(),
                ),
                None => (0, 0, 0),
            };
            vec![
                o.unit.to_string(),
                if o.ok { "ok" } else { "failed" }.to_string(),
                done.to_string(),
                skipped.to_string(),
                commands.to_string(),
            ]
        })
        .collect();
    print_table(
        &["UNIT", "STATUS", "DONE", "SKIPPED", "COMMANDS"],
        &rows,
    );
    for o in outcomes {
        if let Some(error) = &o.error {
            eprintln!("{}: {error}", o.unit);
        }
    }
}
