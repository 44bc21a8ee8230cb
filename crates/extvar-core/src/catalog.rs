//! Typed lookup tables: component -> model short name, frequency -> history
//! tag, and the `basic` / `extra` variable lists per frequency.
//!
//! [`Catalog::cesm2`] holds the CESM2 defaults. A configuration file may
//! replace them wholesale under its `catalog:` key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ExtvarError, Result};
use crate::types::{Component, ExtractType, Frequency};

// ---------------------------------------------------------------------------
// FrequencyEntry / ComponentCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrequencyEntry {
    /// History stream tag in archive file names (`h0`, `h.nday1`, ...).
    pub tag: String,
    #[serde(default)]
    pub basic: Vec<String>,
    #[serde(default)]
    pub extra: Vec<String>,
}

impl FrequencyEntry {
    pub fn variables(&self, extract_type: ExtractType) -> &[String] {
        match extract_type {
            ExtractType::Basic => &self.basic,
            ExtractType::Extra => &self.extra,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentCatalog {
    /// Model short name in archive file names (`cam`, `pop`, ...).
    pub model: String,
    pub frequencies: BTreeMap<Frequency, FrequencyEntry>,
}

// ---------------------------------------------------------------------------
// Resolved
// ---------------------------------------------------------------------------

/// Result of a successful catalog lookup for one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    pub model: &'a str,
    pub tag: &'a str,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    components: BTreeMap<Component, ComponentCatalog>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::cesm2()
    }
}

impl Catalog {
    pub fn new(components: BTreeMap<Component, ComponentCatalog>) -> Self {
        Self { components }
    }

    pub fn component(&self, component: Component) -> Result<&ComponentCatalog> {
        self.components
            .get(&component)
            .ok_or_else(|| ExtvarError::ComponentNotInCatalog(component.to_string()))
    }

    pub fn entry(&self, component: Component, frequency: &Frequency) -> Result<&FrequencyEntry> {
        self.component(component)?
            .frequencies
            .get(frequency)
            .ok_or_else(|| ExtvarError::FrequencyNotDefined {
                component: component.to_string(),
                frequency: frequency.to_string(),
            })
    }

    /// Ordered list of variables active for `(component, frequency)`.
    pub fn variables(
        &self,
        component: Component,
        frequency: &Frequency,
        extract_type: ExtractType,
    ) -> Result<&[String]> {
        Ok(self.entry(component, frequency)?.variables(extract_type))
    }

    /// Look up the model name and stream tag for one variable, failing when
    /// any of the three keys is absent from the active list.
    pub fn resolve(
        &self,
        component: Component,
        frequency: &Frequency,
        variable: &str,
        extract_type: ExtractType,
    ) -> Result<Resolved<'_>> {
        let comp = self.component(component)?;
        let entry = self.entry(component, frequency)?;
        if !entry.variables(extract_type).iter().any(|v| v == variable) {
            return Err(ExtvarError::VariableNotInCatalog {
                component: component.to_string(),
                frequency: frequency.to_string(),
                variable: variable.to_string(),
            });
        }
        Ok(Resolved {
            model: &comp.model,
            tag: &entry.tag,
        })
    }

    pub fn components(&self) -> impl Iterator<Item = (Component, &ComponentCatalog)> {
        self.components.iter().map(|(c, cat)| (*c, cat))
    }

    // -----------------------------------------------------------------------
    // Built-in CESM2 tables
    // -----------------------------------------------------------------------

    pub fn cesm2() -> Self {
        let mut components = BTreeMap::new();
        components.insert(
            Component::Atm,
            component(
                "cam",
                vec![
                    freq("monthly", "h0", BASIC_ATM_MONTHLY, &["T"]),
                    freq("daily", "h1", BASIC_ATM_DAILY, &["TREFHT"]),
                    freq("six_hourly", "h2", BASIC_ATM_SIX_HOURLY, &["TREFHT"]),
                ],
            ),
        );
        components.insert(
            Component::Ocn,
            component(
                "pop",
                vec![
                    freq("monthly", "h", BASIC_OCN_MONTHLY, &["SiO3"]),
                    freq("daily", "h.nday1", BASIC_OCN_DAILY, &[]),
                    freq("eco_daily", "h.ecosys.nday1", BASIC_OCN_ECO_DAILY, &[]),
                ],
            ),
        );
        components.insert(
            Component::Lnd,
            component(
                "clm2",
                vec![
                    freq("monthly", "h0", BASIC_LND_MONTHLY, &[]),
                    freq("daily", "h3", &[], &[]),
                ],
            ),
        );
        components.insert(
            Component::Ice,
            component(
                "cice",
                vec![
                    freq("monthly", "h", BASIC_ICE_MONTHLY, &[]),
                    freq("daily", "h1", &[], &[]),
                ],
            ),
        );
        components.insert(
            Component::Rof,
            component(
                "mosart",
                vec![
                    freq("monthly", "h0", BASIC_ROF_MONTHLY, &[]),
                    freq("daily", "h1", &[], &[]),
                ],
            ),
        );
        Self { components }
    }
}

fn freq(label: &str, tag: &str, basic: &[&str], extra: &[&str]) -> (Frequency, FrequencyEntry) {
    fn owned(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }
    (
        Frequency::new(label),
        FrequencyEntry {
            tag: tag.to_string(),
            basic: owned(basic),
            extra: owned(extra),
        },
    )
}

fn component(model: &str, frequencies: Vec<(Frequency, FrequencyEntry)>) -> ComponentCatalog {
    ComponentCatalog {
        model: model.to_string(),
        frequencies: frequencies.into_iter().collect(),
    }
}

// ---------------------------------------------------------------------------
// CESM2 basic variable lists
// ---------------------------------------------------------------------------

const BASIC_ATM_MONTHLY: &[&str] = &[
    "CLDHGH", "CLDLOW", "CLDMED", "CLDTOT", "CLOUD", "CO2", "CO2_FFF", "CO2_LND", "CO2_OCN",
    "CONCLD", "FLDS", "FLDSC", "FLNR", "FLNS", "FLNSC", "FLNT", "FLNTC", "FLUT", "FLUTC",
    "FSDS", "FSDSC", "FSNR", "FSNS", "FSNSC", "FSNT", "FSNTC", "FSNTOA", "FSNTOAC",
    "FSUTOA", "ICEFRAC", "LHFLX", "LWCF", "OMEGA", "PBLH", "PRECC", "PRECL", "PRECT", "PS",
    "PSL", "Q", "QFLX", "QREFHT", "RELHUM", "SFCO2", "SFCO2_FFF", "SFCO2_LND", "SFCO2_OCN",
    "SHFLX", "SST", "SWCF", "T", "TAUX", "TAUY", "TMQ", "TREFHT", "TREFHTMN", "TREFHTMX",
    "TS", "U", "U10", "V", "Z3",
];

const BASIC_ATM_DAILY: &[&str] = &[
    "CAPE", "FLDS", "FLDSC", "FLNS", "FLNSC", "FLNT", "FLNTC", "FLUT", "FLUTC", "FSDS",
    "FSDSC", "FSNS", "FSNSC", "FSNTOA", "FSNTOAC", "LHFLX", "OMEGA", "PBLH", "PRECC",
    "PRECT", "PS", "PSL", "Q", "QREFHT", "RHREFHT", "SHFLX", "T", "TMQ", "TREFHT",
    "TREFHTMN", "TREFHTMX", "TS", "TSMN", "TSMX", "U", "U10", "V", "WSPDSRFAV", "Z3",
];

const BASIC_ATM_SIX_HOURLY: &[&str] = &[
    "T850", "Q850", "U850", "V850", "Z200", "Z500", "Z850", "PSL", "TREFHT", "PS", "PRECT",
];

const BASIC_OCN_MONTHLY: &[&str] = &[
    "ALK", "DIC", "DpCO2", "FW", "Fe", "HMXL", "HMXL_DR", "MOC", "NO3", "N_HEAT", "N_SALT",
    "O2", "PAR_avg", "PD", "PO4", "POC_FLUX_100m", "PV", "Q", "RHO", "SALT", "SSH", "SSS",
    "SST", "TAUX", "TAUY", "TBLT", "TEMP", "TMXL", "UVEL", "VISOP", "VVEL", "WVEL", "XBLT",
    "XMXL", "diatChl", "diazChl", "pCO2SURF", "spChl",
];

const BASIC_OCN_DAILY: &[&str] = &[
    "SST",
];

const BASIC_OCN_ECO_DAILY: &[&str] = &[
    "DpCO2_2", "spChl_SURF",
];

const BASIC_LND_MONTHLY: &[&str] = &[
    "ALT", "AR", "BAF_CROP", "BAF_PEATF", "COL_FIRE_CLOSS", "EFLX_LH_TOT", "ELAI", "ER",
    "ESAI", "FAREA_BURNED", "FPSN", "FSA", "FSDS", "FSH", "FSR", "GPP", "H2OSOI", "HR",
    "LAISHA", "LAISUN", "NBP", "NEE", "NPP", "PBOT", "PCO2", "PFT_FIRE_CLOSS", "QH2OSFC",
    "QSOIL", "QVEGT", "RAIN", "RH2M", "SOIL1C", "SOIL1N", "SOIL2C", "SOIL2N", "SOIL3C",
    "SOIL3N", "SOILICE", "SOILLIQ", "SOMC_FIRE", "TBOT", "TG", "TLAI", "TOTCOLC", "TOTLITC",
    "TOTSOILICE", "TOTSOILLIQ", "TOTSOMC", "TOTVEGC", "TREFMNAV", "TREFMXAV", "TSA", "TSAI",
    "TSOI", "TSOI_10CM", "TV", "WIND", "ZBOT",
];

const BASIC_ICE_MONTHLY: &[&str] = &[
    "aice", "hi", "hs",
];

const BASIC_ROF_MONTHLY: &[&str] = &[
    "DIRECT_DISCHARGE_TO_OCEAN_ICE", "DIRECT_DISCHARGE_TO_OCEAN_LIQ",
    "RIVER_DISCHARGE_OVER_LAND_ICE", "RIVER_DISCHARGE_OVER_LAND_LIQ",
    "TOTAL_DISCHARGE_TO_OCEAN_ICE", "TOTAL_DISCHARGE_TO_OCEAN_LIQ",
];

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
