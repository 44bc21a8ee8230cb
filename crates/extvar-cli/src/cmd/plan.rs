use anyhow::Context;
use clap::Args;
use extvar_core::{
    config::Config,
    dispatch::Dispatcher,
    task::ExtractionTask,
    types::{Component, Frequency},
};
use std::path::Path;

use crate::output::{print_fields, print_json};

#[derive(Args)]
pub struct PlanArgs {
    /// Ensemble member id
    #[arg(long)]
    pub ensemble: String,

    /// Component (atm, ocn, lnd, ice, rof)
    #[arg(long)]
    pub component: Component,

    /// Frequency label as used in the catalog
    #[arg(long, default_value = "monthly")]
    pub frequency: Frequency,

    /// Variable id
    #[arg(long)]
    pub variable: String,

    /// Year (default: start year)
    #[arg(long)]
    pub year: Option<i32>,

    /// Month, 1-12
    #[arg(long, default_value_t = 1)]
    pub month: u32,
}

pub fn run(config_path: &Path, args: PlanArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    config.check().context("config validation failed")?;

    let task = ExtractionTask {
        ensemble: args.ensemble,
        component: args.component,
        frequency: args.frequency,
        variable: args.variable,
        year: args.year.unwrap_or(config.start_year),
        month: args.month,
    };
    let plan = Dispatcher::new(&config)
        .plan(&task)
        .with_context(|| format!("cannot plan {task}"))?;

    if json {
        let value = serde_json::json!({
            "task": task,
            "source": plan.source,
            "destination": plan.destination,
            "invocations": plan.invocations,
        });
        return print_json(&value);
    }

    print_fields(&[
        ("task", task.to_string()),
        ("source", plan.source.display().to_string()),
        ("destination", plan.destination.display().to_string()),
    ]);
    println!();
    for invocation in &plan.invocations {
        println!("[{}] {invocation}", invocation.op);
    }
    Ok(())
}
