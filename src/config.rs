//! Process-wide properties, resolved from the environment and global CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use crate::models::{Env, Hosting, InputValidationError};

pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_USE_CASE_TIMEOUT: Duration = Duration::from_secs(30);
const DB_FILE_NAME: &str = "lifeplan.sqlite";

/// Values given on the command line. They win over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub env: Option<Env>,
    pub hosting: Option<Hosting>,
    pub db_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalProperties {
    pub env: Env,
    pub hosting: Hosting,
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub use_case_timeout: Duration,
}

impl GlobalProperties {
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, InputValidationError> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Resolution with an explicit variable lookup.
    pub fn resolve(
        overrides: ConfigOverrides,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, InputValidationError> {
        let env = match overrides.env {
            Some(env) => env,
            None => var("LIFEPLAN_ENV")
                .map(|raw| Env::from_raw(&raw))
                .transpose()?
                .unwrap_or(Env::Local),
        };
        let hosting = match overrides.hosting {
            Some(hosting) => hosting,
            None => var("LIFEPLAN_HOSTING")
                .map(|raw| Hosting::from_raw(&raw))
                .transpose()?
                .unwrap_or(Hosting::Local),
        };

        let explicit_data_dir = overrides
            .data_dir
            .or_else(|| var("LIFEPLAN_DATA_DIR").map(PathBuf::from));
        let data_dir = explicit_data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let db_path = match overrides
            .db_path
            .or_else(|| var("LIFEPLAN_DB_PATH").map(PathBuf::from))
        {
            Some(path) => path,
            None => default_db_path(hosting, explicit_data_dir.as_ref(), &data_dir),
        };

        let use_case_timeout = match var("LIFEPLAN_USE_CASE_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    InputValidationError::new(format!("invalid use case timeout `{raw}`"))
                })?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_USE_CASE_TIMEOUT,
        };

        Ok(Self {
            env,
            hosting,
            db_path,
            data_dir,
            use_case_timeout,
        })
    }
}

fn default_db_path(
    hosting: Hosting,
    explicit_data_dir: Option<&PathBuf>,
    data_dir: &PathBuf,
) -> PathBuf {
    if let (Hosting::Local, Some(dir)) = (hosting, explicit_data_dir) {
        return dir.join(DB_FILE_NAME);
    }
    directories::ProjectDirs::from("", "", "lifeplan")
        .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
        .unwrap_or_else(|| data_dir.join(DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let props = GlobalProperties::resolve(ConfigOverrides::default(), vars(&[])).unwrap();
        assert_eq!(props.env, Env::Local);
        assert_eq!(props.hosting, Hosting::Local);
        assert_eq!(props.data_dir, PathBuf::from("/data"));
        assert_eq!(props.use_case_timeout, Duration::from_secs(30));
    }

    #[test]
    fn flags_win_over_environment() {
        let overrides = ConfigOverrides {
            env: Some(Env::Staging),
            db_path: Some(PathBuf::from("/tmp/flag.sqlite")),
            ..ConfigOverrides::default()
        };
        let props = GlobalProperties::resolve(
            overrides,
            vars(&[("LIFEPLAN_ENV", "production"), ("LIFEPLAN_DB_PATH", "/tmp/env.sqlite")]),
        )
        .unwrap();
        assert_eq!(props.env, Env::Staging);
        assert_eq!(props.db_path, PathBuf::from("/tmp/flag.sqlite"));
    }

    #[test]
    fn local_hosting_keeps_the_database_in_an_explicit_data_dir() {
        let props = GlobalProperties::resolve(
            ConfigOverrides::default(),
            vars(&[("LIFEPLAN_DATA_DIR", "/srv/life"), ("LIFEPLAN_USE_CASE_TIMEOUT_SECS", "5")]),
        )
        .unwrap();
        assert_eq!(props.db_path, PathBuf::from("/srv/life/lifeplan.sqlite"));
        assert_eq!(props.use_case_timeout, Duration::from_secs(5));
    }

    #[test]
    fn unknown_env_is_rejected() {
        let err = GlobalProperties::resolve(ConfigOverrides::default(), vars(&[("LIFEPLAN_ENV", "prod")]));
        assert!(err.is_err());
    }
}
