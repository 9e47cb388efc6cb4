//! Driver configuration, read from YAML.
use std::{fs, path::Path};

use minic::VmConf;
use serde::Deserialize;

use crate::error::AppError;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG: &str = "minic.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vm: VmConf,
    /// Number of memory cells printed after a run.
    pub dump_memory: usize,
    /// Also write the phase artifacts when compiling with `go`.
    pub write_artifacts: bool,
}

impl Config {
    /// Reads the given file, or the default file if it exists.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG).exists() => Self::from_file(DEFAULT_CONFIG),
            None => Ok(Self::default()),
        }
    }

    fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let file = fs::File::open(path.as_ref())?;
        let config: Config = serde_yaml::from_reader(file)?;
        log::debug!("config {}: {:?}", path.as_ref().display(), config);
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: Config = serde_yaml::from_str("vm:\n  step_limit: 5000\ndump_memory: 16\n").unwrap();
        assert_eq!(config.vm.step_limit, Some(5000));
        assert_eq!(config.vm.memory_size, minic::constants::MEM_SIZE);
        assert_eq!(config.dump_memory, 16);
        assert!(!config.write_artifacts);
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(serde_yaml::from_str::<Config>("vm:\n  memory_size: lots\n").is_err());
    }
}
