use crate::error::{ExtvarError, Result};
use crate::types::{Component, Frequency};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "extvar.yaml";
pub const HIST_DIR: &str = "hist";
pub const NC_EXT: &str = "nc";

/// Date stamps are four-digit years.
pub const MAX_YEAR: i32 = 9999;

// ---------------------------------------------------------------------------
// Archive side
// ---------------------------------------------------------------------------

/// `{casename}.{resolution}.{expname}.{ensemble}`: the run identifier used
/// both as the archive directory name and as the history file prefix.
pub fn file_id(casename: &str, resolution: &str, expname: &str, ensemble: &str) -> String {
    format!("{casename}.{resolution}.{expname}.{ensemble}")
}

pub fn source_dir(archive_root: &Path, file_id: &str, component: Component) -> PathBuf {
    archive_root
        .join(file_id)
        .join(component.as_str())
        .join(HIST_DIR)
}

/// Month stamp of a history file. Ocean daily streams are written one file
/// per month starting on day 01, so their stamp carries the day.
pub fn date_stamp(component: Component, frequency: &Frequency, year: i32, month: u32) -> String {
    if component == Component::Ocn && frequency.is_daily() {
        format!("{year:04}-{month:02}-01")
    } else {
        format!("{year:04}-{month:02}")
    }
}

pub fn source_file_name(file_id: &str, model: &str, tag: &str, stamp: &str) -> String {
    format!("{file_id}.{model}.{tag}.{stamp}.{NC_EXT}")
}

// ---------------------------------------------------------------------------
// Output side
// ---------------------------------------------------------------------------

/// `output_root/{expid}/{component}/{dest_label}/{variable}`.
pub fn destination_dir(
    output_root: &Path,
    expid: &str,
    component: Component,
    frequency: &Frequency,
    variable: &str,
) -> PathBuf {
    output_root
        .join(expid)
        .join(component.as_str())
        .join(frequency.dest_label())
        .join(variable)
}

/// `{expid}.{ensemble}.{variable}.nc`. The ensemble id keeps members that
/// share a destination directory apart.
pub fn destination_file_name(expid: &str, ensemble: &str, variable: &str) -> String {
    format!("{expid}.{ensemble}.{variable}.{NC_EXT}")
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// Identifier validation
// ---------------------------------------------------------------------------

static IDENT_RE: OnceLock<Regex> = OnceLock::new();

fn ident_re() -> &'static Regex {
    IDENT_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.+\-]*$").unwrap())
}

/// Identifiers end up as path segments, so separators and leading dots are
/// rejected.
pub fn validate_identifier(ident: &str) -> Result<()> {
    if ident.is_empty() || ident.len() > 128 || !ident_re().is_match(ident) {
        return Err(ExtvarError::InvalidIdentifier(ident.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_identifiers() {
        for ident in ["SST", "POC_FLUX_100m", "0101", "eco_daily", "cesm2.1_co2IRCC"] {
            validate_identifier(ident).unwrap_or_else(|_| panic!("expected valid: {ident}"));
        }
    }

    #[test]
    fn invalid_identifiers() {
        for ident in ["", "../etc", "a/b", ".hidden", "has space"] {
            assert!(validate_identifier(ident).is_err(), "expected invalid: {ident}");
        }
    }

    #[test]
    fn source_layout() {
        let fid = file_id("b.e21.B2000_BPRP", "f09_g17", "co2_IRCC", "0101");
        assert_eq!(fid, "b.e21.B2000_BPRP.f09_g17.co2_IRCC.0101");
        assert_eq!(
            source_dir(Path::new("/archive"), &fid, Component::Ocn),
            PathBuf::from("/archive/b.e21.B2000_BPRP.f09_g17.co2_IRCC.0101/ocn/hist")
        );
        assert_eq!(
            source_file_name(&fid, "pop", "h", "2000-01"),
            "b.e21.B2000_BPRP.f09_g17.co2_IRCC.0101.pop.h.2000-01.nc"
        );
    }

    #[test]
    fn ocean_daily_stamp_has_day() {
        let daily = Frequency::new("daily");
        let eco = Frequency::new("eco_daily");
        assert_eq!(date_stamp(Component::Ocn, &daily, 2001, 3), "2001-03-01");
        assert_eq!(date_stamp(Component::Ocn, &eco, 2001, 3), "2001-03-01");
        assert_eq!(date_stamp(Component::Atm, &daily, 2001, 3), "2001-03");
        assert_eq!(date_stamp(Component::Ocn, &Frequency::monthly(), 850, 12), "0850-12");
    }

    #[test]
    fn destination_uses_rewritten_label() {
        let dir = destination_dir(
            Path::new("/out"),
            "exp",
            Component::Atm,
            &Frequency::new("six_hourly"),
            "PSL",
        );
        assert_eq!(dir, PathBuf::from("/out/exp/atm/hourly/PSL"));

        let dir = destination_dir(
            Path::new("/out"),
            "exp",
            Component::Ocn,
            &Frequency::new("eco_daily"),
            "spChl_SURF",
        );
        assert_eq!(dir, PathBuf::from("/out/exp/ocn/daily/spChl_SURF"));
    }

    #[test]
    fn destination_file_carries_ensemble() {
        assert_eq!(destination_file_name("exp", "0401", "SST"), "exp.0401.SST.nc");
    }
}
