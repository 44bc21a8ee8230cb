//! Naming and dispatch policy.
//!
//! Maps one [`ExtractionTask`] to the archive file it reads, the destination
//! file it writes, and the exact NCO command lines that perform the step:
//!
//! - January of the start year: `ncks` extract, overwriting the destination.
//! - Every later month: `ncrcat --rec_apn` onto the same destination.
//! - Ocean monthly `SST`/`SSS`: both restricted to the top level of `z_t`.
//! - Ocean monthly `SST`/`SSS` in the end year or a century year: each step
//!   is followed by `ncrename -v VAR,VAR` on the destination.
//!
//! All catalog lookups and range checks happen before any command is built.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::catalog::Resolved;
use crate::config::Config;
use crate::error::{ExtvarError, Result};
use crate::paths;
use crate::task::{ExtractionTask, YearMonth};
use crate::types::{Component, Frequency};

/// Variables stored on the full depth grid that are extracted at the surface
/// level only.
pub const SURFACE_VARIABLES: &[&str] = &["SST", "SSS"];

/// Hyperslab selecting the first level of the ocean depth dimension.
pub const SURFACE_LEVEL: &str = "z_t,0,0";

/// Years divisible by this also get the rename checkpoint.
pub const CHECKPOINT_INTERVAL: i32 = 100;

// Flags shared by extract and append: netCDF-4 output, deflate level 1,
// debug level 0, and no history attribute.
const COMMON_FLAGS: &[&str] = &["-4", "-L", "1", "-D", "0", "--hst"];
const EXTRACT_FLAGS: &[&str] = &["-O"];
const APPEND_FLAGS: &[&str] = &["--rec_apn", "--no_tmp_fl"];

// ---------------------------------------------------------------------------
// ToolOp / Invocation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOp {
    /// Single-variable extract that overwrites the destination.
    Extract,
    /// Record-append concatenation onto the existing destination.
    Append,
    /// In-place self-rename of the variable.
    Rename,
}

impl ToolOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolOp::Extract => "extract",
            ToolOp::Append => "append",
            ToolOp::Rename => "rename",
        }
    }
}

impl fmt::Display for ToolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built external command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub op: ToolOp,
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StepPlan
// ---------------------------------------------------------------------------

/// Everything needed to execute one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepPlan {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub invocations: Vec<Invocation>,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher<'a> {
    config: &'a Config,
}

impl<'a> Dispatcher<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Catalog lookup for the task's (component, frequency, variable).
    pub fn resolve(&self, task: &ExtractionTask) -> Result<Resolved<'a>> {
        self.config.catalog.resolve(
            task.component,
            &task.frequency,
            &task.variable,
            self.config.extract_type,
        )
    }

    pub fn source_path(&self, task: &ExtractionTask) -> Result<PathBuf> {
        let resolved = self.resolve(task)?;
        Ok(self.source_path_with(task, &resolved))
    }

    fn source_path_with(&self, task: &ExtractionTask, resolved: &Resolved<'_>) -> PathBuf {
        let fid = self.config.experiment.file_id(&task.ensemble);
        let stamp = paths::date_stamp(task.component, &task.frequency, task.year, task.month);
        paths::source_dir(&self.config.archive_root, &fid, task.component).join(
            paths::source_file_name(&fid, resolved.model, resolved.tag, &stamp),
        )
    }

    pub fn destination_dir(
        &self,
        component: Component,
        frequency: &Frequency,
        variable: &str,
    ) -> PathBuf {
        paths::destination_dir(
            &self.config.output_root,
            &self.config.experiment.expid,
            component,
            frequency,
            variable,
        )
    }

    /// Destination file shared by every month of one variable sequence.
    pub fn destination_path(
        &self,
        ensemble: &str,
        component: Component,
        frequency: &Frequency,
        variable: &str,
    ) -> PathBuf {
        self.destination_dir(component, frequency, variable)
            .join(paths::destination_file_name(
                &self.config.experiment.expid,
                ensemble,
                variable,
            ))
    }

    /// Build the command lines for one task. Fails without building anything
    /// when the task does not resolve or lies outside the configured range.
    pub fn plan(&self, task: &ExtractionTask) -> Result<StepPlan> {
        let resolved = self.resolve(task)?;
        YearMonth::new(task.year, task.month)?;
        if !self.config.contains_year(task.year) {
            return Err(ExtvarError::YearOutOfRange {
                year: task.year,
                start: self.config.start_year,
                end: self.config.end_year,
            });
        }

        let source = self.source_path_with(task, &resolved);
        let destination = self.destination_path(
            &task.ensemble,
            task.component,
            &task.frequency,
            &task.variable,
        );
        let src = path_arg(&source)?;
        let dst = path_arg(&destination)?;

        let toolchain = &self.config.toolchain;
        let first = task.is_first(self.config.start_year);
        let (op, program, leading) = if first {
            (ToolOp::Extract, toolchain.ncks.as_str(), EXTRACT_FLAGS)
        } else {
            (ToolOp::Append, toolchain.ncrcat.as_str(), APPEND_FLAGS)
        };

        let mut args: Vec<String> = leading
            .iter()
            .chain(COMMON_FLAGS)
            .map(|s| s.to_string())
            .collect();
        if is_surface_restricted(task.component, &task.frequency, &task.variable) {
            args.extend(["-d".to_string(), SURFACE_LEVEL.to_string()]);
        }
        args.extend(["-v".to_string(), task.variable.clone(), src, dst.clone()]);

        let mut invocations = vec![Invocation {
            op,
            program: program.to_string(),
            args,
        }];

        if self.needs_checkpoint(task) {
            invocations.push(Invocation {
                op: ToolOp::Rename,
                program: toolchain.ncrename.clone(),
                args: vec![
                    "-v".to_string(),
                    format!("{0},{0}", task.variable),
                    dst,
                ],
            });
        }

        Ok(StepPlan {
            source,
            destination,
            invocations,
        })
    }

    /// Whether the self-rename follows this task's extract/append.
    pub fn needs_checkpoint(&self, task: &ExtractionTask) -> bool {
        is_surface_restricted(task.component, &task.frequency, &task.variable)
            && (task.year == self.config.end_year
                || task.year.rem_euclid(CHECKPOINT_INTERVAL) == 0)
    }
}

/// Ocean monthly surface fields are cut to a single depth level.
pub fn is_surface_restricted(component: Component, frequency: &Frequency, variable: &str) -> bool {
    component == Component::Ocn && frequency.is_monthly() && SURFACE_VARIABLES.contains(&variable)
}

fn path_arg(path: &Path) -> Result<String> {
    path.to_str().map(str::to_string).ok_or_else(|| {
        ExtvarError::InvalidConfig(format!(
            "path is not valid UTF-8: {}",
            path.display()
        ))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::variable_tasks;
    use crate::types::ExtractType;

    fn config(start_year: i32, end_year: i32) -> Config {
        let mut cfg = Config::example();
        cfg.archive_root = PathBuf::from("/archive");
        cfg.output_root = PathBuf::from("/out");
        cfg.start_year = start_year;
        cfg.end_year = end_year;
        cfg.extract_type = ExtractType::Basic;
        cfg
    }

    fn task(component: Component, freq: &str, var: &str, year: i32, month: u32) -> ExtractionTask {
        ExtractionTask {
            ensemble: "0101".to_string(),
            component,
            frequency: Frequency::new(freq),
            variable: var.to_string(),
            year,
            month,
        }
    }

    fn argv(inv: &Invocation) -> Vec<&str> {
        inv.args.iter().map(String::as_str).collect()
    }

    const FID: &str = "b.e21.B2000_BPRP.f09_g17.co2_IRCC.0101";

    #[test]
    fn first_month_extracts_with_overwrite() {
        let cfg = config(2000, 2010);
        let plan = Dispatcher::new(&cfg)
            .plan(&task(Component::Atm, "monthly", "TS", 2000, 1))
            .unwrap();
        assert_eq!(plan.invocations.len(), 1);
        let inv = &plan.invocations[0];
        assert_eq!(inv.op, ToolOp::Extract);
        assert_eq!(inv.program, "ncks");
        let src = format!("/archive/{FID}/atm/hist/{FID}.cam.h0.2000-01.nc");
        let dst = "/out/cesm2.1_co2IRCC/atm/monthly/TS/cesm2.1_co2IRCC.0101.TS.nc";
        assert_eq!(
            argv(inv),
            vec!["-O", "-4", "-L", "1", "-D", "0", "--hst", "-v", "TS", src.as_str(), dst]
        );
    }

    #[test]
    fn later_months_append_to_same_destination() {
        let cfg = config(2000, 2001);
        let dispatcher = Dispatcher::new(&cfg);
        let freq = Frequency::monthly();
        let plans: Vec<StepPlan> = variable_tasks("0101", Component::Atm, &freq, "TS", 2000, 2001)
            .map(|t| dispatcher.plan(&t).unwrap())
            .collect();
        assert_eq!(plans.len(), 24);
        assert_eq!(plans[0].invocations[0].op, ToolOp::Extract);
        for pair in plans.windows(2) {
            assert_eq!(pair[1].invocations[0].op, ToolOp::Append);
            assert_eq!(pair[0].destination, pair[1].destination);
            assert_eq!(
                pair[1].invocations[0].args.last(),
                pair[0].invocations[0].args.last()
            );
        }
        let append = &plans[5].invocations[0];
        assert_eq!(append.program, "ncrcat");
        assert_eq!(
            &argv(append)[..9],
            &["--rec_apn", "--no_tmp_fl", "-4", "-L", "1", "-D", "0", "--hst", "-v"]
        );
    }

    #[test]
    fn ocean_surface_fields_are_level_restricted() {
        let cfg = config(2000, 2010);
        let dispatcher = Dispatcher::new(&cfg);
        for (year, month) in [(2000, 1), (2003, 7)] {
            let plan = dispatcher
                .plan(&task(Component::Ocn, "monthly", "SSS", year, month))
                .unwrap();
            let args = argv(&plan.invocations[0]);
            let pos = args.iter().position(|a| *a == "-d").unwrap();
            assert_eq!(args[pos + 1], SURFACE_LEVEL);
        }
        let plan = dispatcher
            .plan(&task(Component::Ocn, "monthly", "TEMP", 2003, 7))
            .unwrap();
        assert!(!plan.invocations[0].args.iter().any(|a| a == "-d"));
    }

    #[test]
    fn ocean_daily_sst_is_not_level_restricted() {
        let cfg = config(2000, 2000);
        let plan = Dispatcher::new(&cfg)
            .plan(&task(Component::Ocn, "daily", "SST", 2000, 4))
            .unwrap();
        assert!(!plan.invocations[0].args.iter().any(|a| a == "-d"));
        assert_eq!(plan.invocations.len(), 1);
        assert!(plan
            .source
            .ends_with(format!("{FID}.pop.h.nday1.2000-04-01.nc")));
    }

    #[test]
    fn century_year_adds_checkpoint_for_sst() {
        let cfg = config(2150, 2250);
        let plan = Dispatcher::new(&cfg)
            .plan(&task(Component::Ocn, "monthly", "SST", 2200, 3))
            .unwrap();
        assert_eq!(plan.invocations.len(), 2);
        assert_eq!(plan.invocations[0].op, ToolOp::Append);
        let rename = &plan.invocations[1];
        assert_eq!(rename.op, ToolOp::Rename);
        assert_eq!(rename.program, "ncrename");
        let dst = plan.destination.to_str().unwrap();
        assert_eq!(argv(rename), vec!["-v", "SST,SST", dst]);
    }

    #[test]
    fn end_year_adds_checkpoint() {
        let cfg = config(2000, 2013);
        let dispatcher = Dispatcher::new(&cfg);
        assert!(dispatcher.needs_checkpoint(&task(Component::Ocn, "monthly", "SSS", 2013, 12)));
        assert!(!dispatcher.needs_checkpoint(&task(Component::Ocn, "monthly", "SSS", 2012, 12)));
        // 2000 is a century year
        assert!(dispatcher.needs_checkpoint(&task(Component::Ocn, "monthly", "SSS", 2000, 1)));
    }

    #[test]
    fn checkpoint_is_limited_to_surface_fields() {
        let cfg = config(2150, 2250);
        let dispatcher = Dispatcher::new(&cfg);
        for (component, freq, var) in [
            (Component::Ocn, "monthly", "SALT"),
            (Component::Ocn, "daily", "SST"),
            (Component::Atm, "monthly", "SST"),
        ] {
            let plan = dispatcher.plan(&task(component, freq, var, 2200, 1)).unwrap();
            assert_eq!(plan.invocations.len(), 1, "{component}/{freq}/{var}");
        }
    }

    #[test]
    fn source_keeps_label_and_destination_rewrites_it() {
        let cfg = config(2000, 2000);
        let plan = Dispatcher::new(&cfg)
            .plan(&task(Component::Atm, "six_hourly", "PSL", 2000, 2))
            .unwrap();
        assert!(plan.source.ends_with(format!("{FID}.cam.h2.2000-02.nc")));
        assert!(plan
            .destination
            .starts_with("/out/cesm2.1_co2IRCC/atm/hourly/PSL"));

        let plan = Dispatcher::new(&cfg)
            .plan(&task(Component::Ocn, "eco_daily", "spChl_SURF", 2000, 2))
            .unwrap();
        assert!(plan
            .source
            .ends_with(format!("{FID}.pop.h.ecosys.nday1.2000-02-01.nc")));
        assert!(plan
            .destination
            .starts_with("/out/cesm2.1_co2IRCC/ocn/daily/spChl_SURF"));
    }

    #[test]
    fn ensembles_never_share_destination() {
        let cfg = config(2000, 2000);
        let dispatcher = Dispatcher::new(&cfg);
        let mut a = task(Component::Ocn, "monthly", "SST", 2000, 5);
        let mut b = a.clone();
        a.ensemble = "0101".to_string();
        b.ensemble = "0401".to_string();
        let pa = dispatcher.plan(&a).unwrap();
        let pb = dispatcher.plan(&b).unwrap();
        assert_ne!(pa.destination, pb.destination);
        assert_ne!(pa.source, pb.source);
    }

    #[test]
    fn unknown_variable_fails_before_any_command() {
        let cfg = config(2000, 2000);
        let err = Dispatcher::new(&cfg)
            .plan(&task(Component::Ocn, "monthly", "NOT_A_VAR", 2000, 1))
            .unwrap_err();
        assert!(err.is_lookup());
        let err = Dispatcher::new(&cfg)
            .plan(&task(Component::Lnd, "six_hourly", "TSA", 2000, 1))
            .unwrap_err();
        assert!(matches!(err, ExtvarError::FrequencyNotDefined { .. }));
    }

    #[test]
    fn out_of_range_year_and_month_are_rejected() {
        let cfg = config(2000, 2001);
        let dispatcher = Dispatcher::new(&cfg);
        assert!(matches!(
            dispatcher.plan(&task(Component::Atm, "monthly", "TS", 2002, 1)),
            Err(ExtvarError::YearOutOfRange { year: 2002, .. })
        ));
        assert!(matches!(
            dispatcher.plan(&task(Component::Atm, "monthly", "TS", 2001, 13)),
            Err(ExtvarError::InvalidMonth(13))
        ));
    }

    #[test]
    fn custom_toolchain_programs_are_used() {
        let mut cfg = config(2100, 2100);
        cfg.toolchain.ncks = "/opt/nco/bin/ncks".to_string();
        cfg.toolchain.ncrename = "/opt/nco/bin/ncrename".to_string();
        let plan = Dispatcher::new(&cfg)
            .plan(&task(Component::Ocn, "monthly", "SST", 2100, 1))
            .unwrap();
        assert_eq!(plan.invocations[0].program, "/opt/nco/bin/ncks");
        assert_eq!(plan.invocations[1].program, "/opt/nco/bin/ncrename");
    }

    #[test]
    fn invocation_display_is_shell_like() {
        let inv = Invocation {
            op: ToolOp::Rename,
            program: "ncrename".to_string(),
            args: vec!["-v".to_string(), "SST,SST".to_string(), "out.nc".to_string()],
        };
        assert_eq!(inv.to_string(), "ncrename -v SST,SST out.nc");
    }
}
