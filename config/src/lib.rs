#[macro_use]
extern crate tracing;

mod args;
mod database_config;
mod duration;
mod schedule_config;

pub use args::Args;
pub use database_config::DatabaseConfig;
pub use duration::duration_serde;
pub use schedule_config::{
    FailurePolicy,
    GroupConfig,
};

use eyre::{
    bail,
    Result,
    WrapErr as _,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashSet,
    net::SocketAddr,
    time::Duration,
};

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");
const ENV_PREFIX: &str = "SAPAWARGA_EXPORTER";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub listen_address: SocketAddr,
    pub database: DatabaseConfig,
    #[serde(with = "duration_serde")]
    pub refresh_timeout: Duration,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    pub groups: Vec<GroupConfig>,
}

impl Config {
    /// Layers the built-in defaults, the optional `--config` file, `SAPAWARGA_EXPORTER_*`
    /// environment variables and the command line, in that order.
    pub fn new(args: &Args) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        if let Some(path) = &args.config {
            debug!(?path, "Loading configuration file");
            builder = builder.add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        builder = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .add_source(args.clone());

        let cfg: Self = builder
            .build()
            .wrap_err("Failed to assemble configuration")?
            .try_deserialize()
            .wrap_err("Failed to parse configuration")?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Structural checks that do not need the family catalogue. Unknown family names are
    /// rejected when the scheduler is assembled.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_timeout.is_zero() {
            bail!("refresh_timeout must be greater than zero");
        }
        if self.groups.is_empty() {
            bail!("at least one cadence group must be configured");
        }
        if self.database.min_connections > self.database.max_connections {
            bail!(
                "database.min_connections ({}) exceeds database.max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        let mut group_names = HashSet::new();
        let mut scheduled = HashSet::new();
        for group in &self.groups {
            if !group_names.insert(group.name.as_str()) {
                bail!("cadence group '{}' is defined twice", group.name);
            }
            if group.interval.is_zero() {
                bail!("cadence group '{}' needs a non-zero interval", group.name);
            }
            if group.families.is_empty() {
                bail!("cadence group '{}' has no families", group.name);
            }
            for family in &group.families {
                if !scheduled.insert(family.as_str()) {
                    bail!("family '{family}' is scheduled more than once (seen again in group '{}')", group.name);
                }
            }
        }
        Ok(())
    }

    /// The effective configuration as YAML. The database password is never included.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yml::to_string(self).wrap_err("Failed to serialize config")
    }

    /// Names of all families that appear in some group.
    pub fn scheduled_families(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|group| group.families.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser as _;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn write_overlay(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sapawarga-exporter-config-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_describe_three_groups() {
        let cfg = Config::new(&Args::default()).unwrap();
        assert_eq!(cfg.listen_address, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.refresh_timeout, Duration::from_secs(60));
        assert_eq!(cfg.failure_policy, FailurePolicy::Isolate);
        assert_eq!(
            cfg.groups.iter().map(|g| (g.name.as_str(), g.interval)).collect::<Vec<_>>(),
            vec![
                ("recency", Duration::from_secs(120)),
                ("engagement", Duration::from_secs(600)),
                ("rollup", Duration::from_secs(1800)),
            ]
        );
        assert_eq!(cfg.scheduled_families().count(), 12);
    }

    #[test]
    fn args_override_defaults() {
        let args = Args {
            db_host: Some("mysql.internal".to_string()),
            db_port: Some(3307),
            db_password: Some("secret".to_string()),
            refresh_timeout: Some("15s".to_string()),
            failure_policy: Some(FailurePolicy::Exit),
            listen_address: Some("127.0.0.1:9100".to_string()),
            ..Args::default()
        };
        let cfg = Config::new(&args).unwrap();
        assert_eq!(cfg.database.host, "mysql.internal");
        assert_eq!(cfg.database.port, 3307);
        assert_eq!(cfg.database.password.as_deref(), Some("secret"));
        assert_eq!(cfg.refresh_timeout, Duration::from_secs(15));
        assert_eq!(cfg.failure_policy, FailurePolicy::Exit);
        assert_eq!(cfg.listen_address.port(), 9100);
    }

    #[test]
    fn file_overlay_replaces_groups() {
        let path = write_overlay(
            "groups",
            r#"
groups:
  - name: fast
    interval: 30s
    families: [users_recent_active]
"#,
        );
        let args = Args {
            config: Some(path),
            ..Args::default()
        };
        let cfg = Config::new(&args).unwrap();
        assert_eq!(
            cfg.groups,
            vec![GroupConfig {
                name: "fast".to_string(),
                interval: Duration::from_secs(30),
                families: vec!["users_recent_active".to_string()],
            }]
        );
    }

    #[test]
    fn missing_overlay_file_is_an_error() {
        let args = Args {
            config: Some(PathBuf::from("/nonexistent/sapawarga-exporter.yaml")),
            ..Args::default()
        };
        assert!(Config::new(&args).is_err());
    }

    #[test]
    fn rejects_family_in_two_groups() {
        let mut cfg = Config::new(&Args::default()).unwrap();
        cfg.groups[1].families.push("users_recent_active".to_string());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("users_recent_active"));
    }

    #[test]
    fn rejects_zero_interval_and_duplicate_names() {
        let mut cfg = Config::new(&Args::default()).unwrap();
        cfg.groups[0].interval = Duration::ZERO;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::new(&Args::default()).unwrap();
        cfg.groups[2].name = "recency".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn yaml_dump_omits_password() {
        let args = Args {
            db_password: Some("hunter2".to_string()),
            ..Args::default()
        };
        let cfg = Config::new(&args).unwrap();
        let yaml = cfg.to_yaml().unwrap();
        assert!(!yaml.contains("hunter2"));

        let reparsed: Config = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(reparsed.refresh_timeout, Duration::from_secs(60));
        assert_eq!(reparsed.failure_policy, FailurePolicy::Isolate);
        assert_eq!(reparsed.groups, cfg.groups);
        assert_eq!(reparsed.database.password, None);
    }

    #[test]
    fn rejects_missing_groups_and_families() {
        let mut cfg = Config::new(&Args::default()).unwrap();
        cfg.groups.clear();
        assert!(cfg.validate().unwrap_err().to_string().contains("at least one cadence group"));

        let mut cfg = Config::new(&Args::default()).unwrap();
        cfg.groups[1].families.clear();
        assert!(cfg.validate().unwrap_err().to_string().contains("'engagement' has no families"));
    }

    #[test]
    fn rejects_min_connections_above_max() {
        let mut cfg = Config::new(&Args::default()).unwrap();
        cfg.database.min_connections = cfg.database.max_connections + 1;
        assert!(cfg.validate().unwrap_err().to_string().contains("min_connections"));
    }

    #[test]
    fn environment_layers_over_defaults() {
        // Only this test touches these variables.
        std::env::set_var("DB_HOST", "envhost");
        std::env::set_var("DB_PORT", "3310");
        std::env::set_var("SAPAWARGA_EXPORTER_DATABASE__NAME", "sapawarga_replica");

        let args = Args::try_parse_from(["sapawarga-exporter"]).unwrap();
        let cfg = Config::new(&args).unwrap();

        std::env::remove_var("DB_HOST");
        std::env::remove_var("DB_PORT");
        std::env::remove_var("SAPAWARGA_EXPORTER_DATABASE__NAME");

        assert_eq!(cfg.database.host, "envhost");
        assert_eq!(cfg.database.port, 3310);
        assert_eq!(cfg.database.name, "sapawarga_replica");
    }

    #[test]
    fn rejects_zero_refresh_timeout() {
        let args = Args {
            refresh_timeout: Some("0s".to_string()),
            ..Args::default()
        };
        assert!(Config::new(&args).is_err());
    }
}
