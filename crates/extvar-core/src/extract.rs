//! Per-unit extraction driver.
//!
//! A [`WorkUnit`] is one (ensemble member, component) pair. Running a unit
//! walks every configured frequency and every active variable, and for each
//! variable every month of the year range in order, issuing the commands the
//! [`Dispatcher`] builds. Months never overlap: each append needs the
//! destination to hold exactly the months before it.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{ExtvarError, Result};
use crate::io;
use crate::paths;
use crate::task::variable_tasks;
use crate::tool_runner::ToolRunner;
use crate::types::{Component, Frequency};

// ---------------------------------------------------------------------------
// WorkUnit / Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkUnit {
    pub ensemble: String,
    pub component: Component,
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ensemble, self.component)
    }
}

/// Optional narrowing of a run. Empty lists select everything configured.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub ensembles: Vec<String>,
    pub components: Vec<Component>,
    pub variables: Vec<String>,
}

impl Selection {
    fn keeps_ensemble(&self, ensemble: &str) -> bool {
        self.ensembles.is_empty() || self.ensembles.iter().any(|e| e == ensemble)
    }

    fn keeps_component(&self, component: Component) -> bool {
        self.components.is_empty() || self.components.contains(&component)
    }

    fn keeps_variable(&self, variable: &str) -> bool {
        self.variables.is_empty() || self.variables.iter().any(|v| v == variable)
    }
}

/// One unit per (ensemble, component), ensemble-major, in configured order.
pub fn work_units(config: &Config, selection: &Selection) -> Result<Vec<WorkUnit>> {
    for ensemble in &selection.ensembles {
        if !config.ensemble.contains(ensemble) {
            return Err(ExtvarError::InvalidConfig(format!(
                "ensemble '{ensemble}' is not in the configured ensemble list"
            )));
        }
    }
    for component in &selection.components {
        if !config.components.contains(component) {
            return Err(ExtvarError::InvalidConfig(format!(
                "component '{component}' is not in the configured component list"
            )));
        }
    }

    let mut units = Vec::new();
    for ensemble in config.ensemble.iter().filter(|e| selection.keeps_ensemble(e)) {
        for &component in &config.components {
            if !selection.keeps_component(component) {
                continue;
            }
            let unit = WorkUnit {
                ensemble: ensemble.clone(),
                component,
            };
            if !units.contains(&unit) {
                units.push(unit);
            }
        }
    }
    Ok(units)
}

// ---------------------------------------------------------------------------
// UnitPlan
// ---------------------------------------------------------------------------

/// One variable sequence within a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableJob {
    pub frequency: Frequency,
    pub variable: String,
    pub destination: PathBuf,
}

/// Every variable sequence of a unit, resolved up front so that a lookup
/// failure aborts the unit before any command runs.
#[derive(Debug, Clone, Serialize)]
pub struct UnitPlan {
    pub unit: WorkUnit,
    pub jobs: Vec<VariableJob>,
}

impl UnitPlan {
    pub fn build(config: &Config, unit: &WorkUnit, selection: &Selection) -> Result<Self> {
        let dispatcher = Dispatcher::new(config);
        let mut jobs = Vec::new();

        for frequency in &config.frequencies {
            let variables =
                config
                    .catalog
                    .variables(unit.component, frequency, config.extract_type)?;
            for variable in variables.iter().filter(|v| selection.keeps_variable(v)) {
                paths::validate_identifier(variable)?;
                jobs.push(VariableJob {
                    frequency: frequency.clone(),
                    variable: variable.clone(),
                    destination: dispatcher.destination_path(
                        &unit.ensemble,
                        unit.component,
                        frequency,
                        variable,
                    ),
                });
            }
        }

        // A requested variable has to exist somewhere in the unit's catalog.
        for wanted in &selection.variables {
            if !jobs.iter().any(|j| &j.variable == wanted) {
                let frequencies: Vec<&str> =
                    config.frequencies.iter().map(Frequency::as_str).collect();
                return Err(ExtvarError::VariableNotInUnit {
                    component: unit.component.to_string(),
                    frequencies: frequencies.join(", "),
                    variable: wanted.clone(),
                });
            }
        }

        Ok(Self {
            unit: unit.clone(),
            jobs,
        })
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VariableStatus {
    Completed,
    /// Destination already present and `overwrite` is off.
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableReport {
    pub frequency: Frequency,
    pub variable: String,
    #[serde(flatten)]
    pub status: VariableStatus,
    /// Commands that ran (successfully or not) for this variable.
    pub invocations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub ensemble: String,
    pub component: Component,
    pub variables: Vec<VariableReport>,
}

impl UnitReport {
    pub fn invocation_count(&self) -> usize {
        self.variables.iter().map(|v| v.invocations).sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = &VariableReport> {
        self.variables
            .iter()
            .filter(|v| matches!(v.status, VariableStatus::Failed { .. }))
    }

    pub fn count(&self, status: fn(&VariableStatus) -> bool) -> usize {
        self.variables.iter().filter(|v| status(&v.status)).count()
    }
}

// ---------------------------------------------------------------------------
// run_unit
// ---------------------------------------------------------------------------

/// Extract every variable of one unit, strictly sequentially.
///
/// With `fail_fast` the first failing command ends the unit with that error.
/// Without it, a failure ends only the current variable's month sequence and
/// is recorded in the report.
pub fn run_unit(
    config: &Config,
    unit: &WorkUnit,
    runner: &dyn ToolRunner,
    selection: &Selection,
) -> Result<UnitReport> {
    let span = tracing::info_span!("unit", ensemble = %unit.ensemble, component = %unit.component);
    let _enter = span.enter();

    let plan = UnitPlan::build(config, unit, selection)?;
    let dispatcher = Dispatcher::new(config);
    tracing::info!(variables = plan.jobs.len(), "starting unit");

    let mut report = UnitReport {
        ensemble: unit.ensemble.clone(),
        component: unit.component,
        variables: Vec::with_capacity(plan.jobs.len()),
    };

    for job in &plan.jobs {
        let mut executed = 0;
        let status = match extract_variable(&dispatcher, runner, unit, job, &mut executed) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(variable = %job.variable, frequency = %job.frequency, "extraction failed: {e}");
                if config.fail_fast {
                    return Err(e);
                }
                VariableStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };
        report.variables.push(VariableReport {
            frequency: job.frequency.clone(),
            variable: job.variable.clone(),
            status,
            invocations: executed,
        });
    }

    tracing::info!(
        invocations = report.invocation_count(),
        failed = report.failed().count(),
        "unit finished"
    );
    Ok(report)
}

fn extract_variable(
    dispatcher: &Dispatcher<'_>,
    runner: &dyn ToolRunner,
    unit: &WorkUnit,
    job: &VariableJob,
    executed: &mut usize,
) -> Result<VariableStatus> {
    let config = dispatcher.config();

    if !config.overwrite && job.destination.exists() {
        tracing::warn!(
            destination = %job.destination.display(),
            "destination exists and overwrite is off, skipping {}",
            job.variable
        );
        return Ok(VariableStatus::Skipped);
    }
    if config.create_dirs {
        io::ensure_parent(&job.destination)?;
    }

    tracing::info!(frequency = %job.frequency, "extracting {}", job.variable);
    let tasks = variable_tasks(
        &unit.ensemble,
        unit.component,
        &job.frequency,
        &job.variable,
        config.start_year,
        config.end_year,
    );
    for task in tasks {
        let step = dispatcher.plan(&task)?;
        for invocation in &step.invocations {
            *executed += 1;
            runner.run(invocation)?;
        }
    }
    Ok(VariableStatus::Completed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
