use crate::catalog::Catalog;
use crate::error::{ExtvarError, Result};
use crate::paths;
use crate::types::{Component, ExtractType, Frequency};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Experiment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Experiment {
    /// Short id used for the output tree and output file names.
    pub expid: String,
    /// Experiment name as it appears in archive run ids.
    pub expname: String,
    pub casename: String,
    pub resolution: String,
}

impl Experiment {
    pub fn file_id(&self, ensemble: &str) -> String {
        paths::file_id(&self.casename, &self.resolution, &self.expname, ensemble)
    }
}

// ---------------------------------------------------------------------------
// Toolchain
// ---------------------------------------------------------------------------

/// Program names for the three NCO operators. Overridable so a site can
/// point at a specific install.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Toolchain {
    #[serde(default = "default_ncks")]
    pub ncks: String,
    #[serde(default = "default_ncrcat")]
    pub ncrcat: String,
    #[serde(default = "default_ncrename")]
    pub ncrename: String,
}

fn default_ncks() -> String {
    "ncks".to_string()
}

fn default_ncrcat() -> String {
    "ncrcat".to_string()
}

fn default_ncrename() -> String {
    "ncrename".to_string()
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            ncks: default_ncks(),
            ncrcat: default_ncrcat(),
            ncrename: default_ncrename(),
        }
    }
}

impl Toolchain {
    pub fn programs(&self) -> [&str; 3] {
        [&self.ncks, &self.ncrcat, &self.ncrename]
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub experiment: Experiment,
    pub ensemble: Vec<String>,
    pub archive_root: PathBuf,
    pub output_root: PathBuf,
    pub components: Vec<Component>,
    #[serde(default = "default_frequencies")]
    pub frequencies: Vec<Frequency>,
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default)]
    pub extract_type: ExtractType,
    #[serde(default = "default_true")]
    pub overwrite: bool,
    #[serde(default = "default_true")]
    pub fail_fast: bool,
    #[serde(default)]
    pub create_dirs: bool,
    #[serde(default)]
    pub toolchain: Toolchain,
    #[serde(default)]
    pub catalog: Catalog,
}

fn default_frequencies() -> Vec<Frequency> {
    vec![Frequency::monthly()]
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Starter configuration written by `extvar config init`.
    pub fn example() -> Self {
        Self {
            experiment: Experiment {
                expid: "cesm2.1_co2IRCC".to_string(),
                expname: "co2_IRCC".to_string(),
                casename: "b.e21.B2000_BPRP".to_string(),
                resolution: "f09_g17".to_string(),
            },
            ensemble: ["0101", "0401", "0701", "1001"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            archive_root: PathBuf::from("/archive"),
            output_root: PathBuf::from("/output"),
            components: vec![Component::Ocn],
            frequencies: default_frequencies(),
            start_year: 2000,
            end_year: 2400,
            extract_type: ExtractType::Extra,
            overwrite: true,
            fail_fast: true,
            create_dirs: false,
            toolchain: Toolchain::default(),
            catalog: Catalog::cesm2(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ExtvarError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Root of this experiment's output tree.
    pub fn output_dir(&self) -> PathBuf {
        self.output_root.join(&self.experiment.expid)
    }

    pub fn contains_year(&self, year: i32) -> bool {
        (self.start_year..=self.end_year).contains(&year)
    }

    /// Number of months every variable sequence spans.
    pub fn month_count(&self) -> usize {
        let years = i64::from(self.end_year) - i64::from(self.start_year) + 1;
        usize::try_from(years * 12).unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        // 1. Identifiers that become path segments
        let exp = &self.experiment;
        for (field, value) in [
            ("experiment.expid", &exp.expid),
            ("experiment.expname", &exp.expname),
            ("experiment.casename", &exp.casename),
            ("experiment.resolution", &exp.resolution),
        ] {
            if paths::validate_identifier(value).is_err() {
                error(format!("{field} '{value}' is not a valid identifier"));
            }
        }

        // 2. Ensemble list: non-empty, valid, unique
        if self.ensemble.is_empty() {
            error("ensemble list is empty".to_string());
        }
        let mut seen = HashSet::new();
        for id in &self.ensemble {
            if paths::validate_identifier(id).is_err() {
                error(format!("ensemble id '{id}' is not a valid identifier"));
            }
            if !seen.insert(id.as_str()) {
                error(format!("ensemble id '{id}' is listed more than once"));
            }
        }

        // 3. Year range
        if self.start_year > self.end_year {
            error(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            ));
        }
        if self.start_year < 0 {
            error(format!("start_year {} is negative", self.start_year));
        }
        if self.end_year > paths::MAX_YEAR {
            error(format!(
                "end_year {} is past {}, the last year a file name can carry",
                self.end_year,
                paths::MAX_YEAR
            ));
        }

        // 4. Toolchain
        for program in self.toolchain.programs() {
            if program.trim().is_empty() {
                error("toolchain has an empty program name".to_string());
            }
        }

        if self.components.is_empty() {
            error("component list is empty".to_string());
        }
        if self.frequencies.is_empty() {
            error("frequency list is empty".to_string());
        }

        // 5. Frequency labels, models and tags become path segments too
        for frequency in &self.frequencies {
            if paths::validate_identifier(frequency.as_str()).is_err() {
                error(format!("frequency '{frequency}' is not a valid identifier"));
            }
        }

        // 6. Every (component, frequency) pair must resolve in the catalog
        let mut notes = Vec::new();
        let mut seen_components = HashSet::new();
        for &component in &self.components {
            if !seen_components.insert(component) {
                notes.push(format!("component '{component}' is listed more than once"));
                continue;
            }
            if let Ok(catalog) = self.catalog.component(component) {
                if paths::validate_identifier(&catalog.model).is_err() {
                    error(format!(
                        "model '{}' for {component} is not a valid identifier",
                        catalog.model
                    ));
                }
            }
            for frequency in &self.frequencies {
                let entry = match self.catalog.entry(component, frequency) {
                    Ok(entry) => entry,
                    Err(e) => {
                        error(e.to_string());
                        continue;
                    }
                };
                if paths::validate_identifier(&entry.tag).is_err() {
                    error(format!(
                        "tag '{}' for {component}/{frequency} is not a valid identifier",
                        entry.tag
                    ));
                }
                let vars = entry.variables(self.extract_type);
                if vars.is_empty() {
                    notes.push(format!(
                        "no {} variables for {component}/{frequency}: nothing to extract",
                        self.extract_type
                    ));
                }
                for var in vars {
                    if paths::validate_identifier(var).is_err() {
                        error(format!(
                            "variable '{var}' in {component}/{frequency} is not a valid identifier"
                        ));
                    }
                }
            }
        }

        warnings.extend(notes.into_iter().map(|message| ConfigWarning {
            level: WarnLevel::Warning,
            message,
        }));
        warnings
    }

    /// Fail with the first error-level finding of [`Config::validate`].
    pub fn check(&self) -> Result<()> {
        match self
            .validate()
            .into_iter()
            .find(|w| w.level == WarnLevel::Error)
        {
            Some(w) => Err(ExtvarError::InvalidConfig(w.message)),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = "\
experiment:
  expid: exp
  expname: run
  casename: b.case
  resolution: f09_g17
ensemble: ['0101']
archive_root: /archive
output_root: /output
components: [ocn]
start_year: 2000
end_year: 2001
";

    fn has_error(cfg: &Config, needle: &str) -> bool {
        cfg.validate()
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains(needle))
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg: Config = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(cfg.frequencies, vec![Frequency::monthly()]);
        assert_eq!(cfg.extract_type, ExtractType::Basic);
        assert!(cfg.overwrite);
        assert!(cfg.fail_fast);
        assert!(!cfg.create_dirs);
        assert_eq!(cfg.toolchain, Toolchain::default());
        assert_eq!(cfg.catalog, Catalog::cesm2());
        assert!(cfg.validate().is_empty(), "{:?}", cfg.validate());
    }

    #[test]
    fn example_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extvar.yaml");
        Config::example().save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.experiment.expid, "cesm2.1_co2IRCC");
        assert_eq!(loaded.ensemble.len(), 4);
        assert_eq!(loaded.extract_type, ExtractType::Extra);
        assert_eq!(loaded.catalog, Catalog::cesm2());
    }

    #[test]
    fn load_missing_file_is_config_not_found() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ExtvarError::ConfigNotFound(_)));
    }

    #[test]
    fn output_dir_appends_expid() {
        let cfg: Config = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(cfg.output_dir(), PathBuf::from("/output/exp"));
        assert_eq!(cfg.month_count(), 24);
        assert!(cfg.contains_year(2001));
        assert!(!cfg.contains_year(2002));
    }

    #[test]
    fn inverted_year_range_is_error() {
        let mut cfg: Config = serde_yaml::from_str(MINIMAL).unwrap();
        cfg.start_year = 2100;
        assert!(has_error(&cfg, "is after end_year"));
        assert!(cfg.check().is_err());
        assert_eq!(cfg.month_count(), 0);
    }

    #[test]
    fn duplicate_ensemble_is_error() {
        let mut cfg: Config = serde_yaml::from_str(MINIMAL).unwrap();
        cfg.ensemble.push("0101".to_string());
        assert!(has_error(&cfg, "more than once"));
    }

    #[test]
    fn frequency_missing_for_component_is_error() {
        let mut cfg: Config = serde_yaml::from_str(MINIMAL).unwrap();
        cfg.frequencies = vec![Frequency::new("six_hourly")];
        assert!(has_error(&cfg, "not defined for component 'ocn'"));
    }

    #[test]
    fn empty_variable_list_is_warning() {
        let mut cfg: Config = serde_yaml::from_str(MINIMAL).unwrap();
        cfg.components = vec![Component::Lnd];
        cfg.frequencies = vec![Frequency::new("daily")];
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(cfg.check().is_ok());
    }

    #[test]
    fn path_like_ensemble_id_is_error() {
        let mut cfg: Config = serde_yaml::from_str(MINIMAL).unwrap();
        cfg.ensemble = vec!["../0101".to_string()];
        assert!(has_error(&cfg, "not a valid identifier"));
    }

    #[test]
    fn unknown_experiment_field_is_rejected() {
        let yaml = MINIMAL.replace("  resolution: f09_g17", "  resolution: f09_g17\n  reslution: x");
        assert!(serde_yaml::from_str::<Config>(&yaml).is_err());
    }

    #[test]
    fn year_past_four_digits_is_error() {
        let mut cfg: Config = serde_yaml::from_str(MINIMAL).unwrap();
        cfg.end_year = 10_000;
        assert!(has_error(&cfg, "is past 9999"));

        cfg.start_year = i32::MAX - 1;
        cfg.end_year = i32::MAX;
        assert!(cfg.check().is_err());
        assert_eq!(cfg.month_count(), 24);

        cfg.start_year = i32::MIN;
        assert!(cfg.check().is_err());
    }

    #[test]
    fn catalog_entries_that_escape_the_tree_are_errors() {
        let overrides = r#"frequencies: ['..']
catalog:
  ocn:
    model: pop/..
    frequencies:
      '..':
        tag: h/../../x
        basic: [SST]
"#;
        let yaml = format!("{MINIMAL}{overrides}");
        let cfg: Config = serde_yaml::from_str(&yaml).unwrap();
        assert!(has_error(&cfg, "frequency '..' is not a valid identifier"));
        assert!(has_error(&cfg, "model 'pop/..' for ocn"));
        assert!(has_error(&cfg, "tag 'h/../../x' for ocn/.."));
        assert!(cfg.check().is_err());
    }
}
