use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtvarError {
    #[error("config file not found: {0} (run 'extvar config init')")]
    ConfigNotFound(PathBuf),

    #[error("config file already exists: {0}")]
    ConfigExists(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unknown component: {0}")]
    UnknownComponent(String),

    #[error("unknown extract type '{0}': expected 'basic' or 'extra'")]
    UnknownExtractType(String),

    #[error("component '{0}' is not in the catalog")]
    ComponentNotInCatalog(String),

    #[error("frequency '{frequency}' is not defined for component '{component}'")]
    FrequencyNotDefined {
        component: String,
        frequency: String,
    },

    #[error("variable '{variable}' is not in the {component}/{frequency} catalog")]
    VariableNotInCatalog {
        component: String,
        frequency: String,
        variable: String,
    },

    #[error("variable '{variable}' is not in any {component} catalog list ({frequencies})")]
    VariableNotInUnit {
        component: String,
        frequencies: String,
        variable: String,
    },

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("year {year} is outside the configured range {start}..={end}")]
    YearOutOfRange { year: i32, start: i32, end: i32 },

    #[error("invalid month: {0}")]
    InvalidMonth(u32),

    #[error("failed to spawn '{program}': {reason}")]
    ToolSpawnFailed { program: String, reason: String },

    #[error("'{program}' exited with {}: {output}", exit_display(.code))]
    ToolFailed {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

fn exit_display(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl ExtvarError {
    /// True for failures raised before any external command is issued.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            ExtvarError::UnknownComponent(_)
                | ExtvarError::ComponentNotInCatalog(_)
                | ExtvarError::FrequencyNotDefined { .. }
                | ExtvarError::VariableNotInCatalog { .. }
                | ExtvarError::VariableNotInUnit { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ExtvarError>;
