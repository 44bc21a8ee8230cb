use extvar_core::paths::{config_path, CONFIG_FILE};
use std::path::{Path, PathBuf};

/// Resolve the configuration file.
///
/// Priority:
/// 1. `--config` flag / `EXTVAR_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `extvar.yaml`
/// 3. Fall back to `cwd/extvar.yaml` (reported as missing by the loader)
pub fn resolve_config(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = current_dir();
    find_upward(&cwd).unwrap_or_else(|| config_path(&cwd))
}

/// Where `extvar config init` writes: the explicit path or `cwd/extvar.yaml`,
/// never a file found further up the tree.
pub fn init_target(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => config_path(&current_dir()),
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}
