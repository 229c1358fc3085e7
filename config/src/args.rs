use crate::FailurePolicy;
use clap::Parser;
use std::path::PathBuf;

/// Sapawarga user-activity exporter
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Optional YAML file layered over the built-in defaults.
    #[clap(long, value_name = "FILE", env = "SAPAWARGA_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address the metrics endpoint listens on.
    #[clap(long, value_name = "ADDR", env = "SAPAWARGA_EXPORTER_LISTEN_ADDRESS")]
    pub listen_address: Option<String>,

    /// Database host.
    #[clap(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    /// Database port.
    #[clap(long, env = "DB_PORT")]
    pub db_port: Option<u16>,

    /// Database name.
    #[clap(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Database user.
    #[clap(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// Database password.
    #[clap(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Deadline for a single family refresh (e.g. "30s", "2m").
    #[clap(long, value_name = "DURATION")]
    pub refresh_timeout: Option<String>,

    /// What a failed refresh does to the process: `isolate` or `exit`.
    #[clap(long, value_name = "POLICY")]
    pub failure_policy: Option<FailurePolicy>,

    /// Enables debug logging for the exporter crates.
    #[clap(short, long, action)]
    pub verbose: bool,

    /// Prints the effective configuration as YAML and exits.
    #[clap(long, action)]
    pub print_config: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(listen_address) = &self.listen_address {
                cache.insert("listen_address".to_string(), listen_address.clone().into());
            }
            if let Some(host) = &self.db_host {
                cache.insert("database.host".to_string(), host.clone().into());
            }
            if let Some(port) = self.db_port {
                cache.insert("database.port".to_string(), (port as u64).into());
            }
            if let Some(name) = &self.db_name {
                cache.insert("database.name".to_string(), name.clone().into());
            }
            if let Some(user) = &self.db_user {
                cache.insert("database.user".to_string(), user.clone().into());
            }
            if let Some(password) = &self.db_password {
                cache.insert("database.password".to_string(), password.clone().into());
            }
            if let Some(refresh_timeout) = &self.refresh_timeout {
                cache.insert("refresh_timeout".to_string(), refresh_timeout.clone().into());
            }
            if let Some(policy) = self.failure_policy {
                cache.insert("failure_policy".to_string(), policy.to_string().into());
            }
            Ok(cache)
        }
    }
}
