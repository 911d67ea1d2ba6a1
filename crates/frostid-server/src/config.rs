use core::fmt;

use anyhow::bail;
use clap::{Parser, ValueEnum};

/// Runtime configuration for the `frostid-server` binary.
///
/// All values are parsed from CLI arguments or environment variables, with
/// defaults suitable for a local run.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "frostid-server",
    version,
    about = "An HTTP service for minting roughly time-ordered 64-bit ids"
)]
pub struct CliArgs {
    /// Address to listen on, `host:port`.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8074"))]
    pub server_addr: String,

    /// Application name; namespaces coordination-service registrations and
    /// the local worker-id cache.
    ///
    /// Environment variable: `APP_NAME`
    #[arg(long, env = "APP_NAME", default_value_t = String::from("id-generator"))]
    pub app_name: String,

    /// Worker-identity source.
    ///
    /// Environment variable: `WORKER_ID_PROVIDER`
    #[arg(
        long,
        env = "WORKER_ID_PROVIDER",
        value_enum,
        default_value_t = ProviderKind::Environment
    )]
    pub worker_id_provider: ProviderKind,

    /// Name of the environment variable holding a fixed worker id, used by
    /// the `environment` provider.
    ///
    /// Environment variable: `WORKER_ID_ENV_NAME`
    #[arg(long, env = "WORKER_ID_ENV_NAME", default_value_t = String::from("SNOWFLAKE_WORKER_ID"))]
    pub worker_id_env_name: String,

    /// Comma-separated `host:port` list of the coordination service, used
    /// by the `zookeeper` provider.
    ///
    /// Environment variable: `ZOOKEEPER_CONN_STRING`
    #[arg(long, env = "ZOOKEEPER_CONN_STRING", default_value_t = String::from("localhost:2181"))]
    pub zookeeper_conn_string: String,

    /// Advertised instance ip; autodetected from the first non-loopback
    /// interface when unset.
    ///
    /// Environment variable: `INSTANCE_IP`
    #[arg(long, env = "INSTANCE_IP")]
    pub instance_ip: Option<String>,

    /// Maximum number of ids per batch request; larger counts are clamped
    /// server-side.
    ///
    /// Environment variable: `MAX_BATCH_IDS`
    #[arg(long, env = "MAX_BATCH_IDS", default_value_t = 10_000)]
    pub max_batch_ids: usize,
}

/// Which worker-identity source the core should be wired with.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Fixed id from an environment variable.
    Environment,
    /// Ordinal parsed from the process hostname.
    Hostname,
    /// Id assigned by a ZooKeeper sequential node.
    Zookeeper,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Environment => "environment",
            Self::Hostname => "hostname",
            Self::Zookeeper => "zookeeper",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub app_name: String,
    /// Listening port, split out of `server_addr`; keys the worker-id
    /// cache path and the registration node name.
    pub port: String,
    pub worker_id_provider: ProviderKind,
    pub worker_id_env_name: String,
    pub zookeeper_conn_string: String,
    pub instance_ip: Option<String>,
    pub max_batch_ids: usize,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.app_name.is_empty() {
            bail!("APP_NAME must not be empty");
        }
        if args.max_batch_ids == 0 {
            bail!("MAX_BATCH_IDS must be greater than 0");
        }
        let Some((host, port)) = args.server_addr.rsplit_once(':') else {
            bail!("SERVER_ADDR must look like host:port, got {}", args.server_addr);
        };
        if host.is_empty() || port.parse::<u16>().is_err() {
            bail!("SERVER_ADDR carries an invalid host or port: {}", args.server_addr);
        }

        Ok(Self {
            port: port.to_string(),
            server_addr: args.server_addr,
            app_name: args.app_name,
            worker_id_provider: args.worker_id_provider,
            worker_id_env_name: args.worker_id_env_name,
            zookeeper_conn_string: args.zookeeper_conn_string,
            instance_ip: args.instance_ip,
            max_batch_ids: args.max_batch_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CliArgs {
        CliArgs {
            server_addr: "0.0.0.0:8074".to_string(),
            app_name: "id-generator".to_string(),
            worker_id_provider: ProviderKind::Environment,
            worker_id_env_name: "SNOWFLAKE_WORKER_ID".to_string(),
            zookeeper_conn_string: "localhost:2181".to_string(),
            instance_ip: None,
            max_batch_ids: 10_000,
        }
    }

    #[test]
    fn splits_the_port_out_of_the_listen_address() {
        let config = ServerConfig::try_from(args()).unwrap();
        assert_eq!(config.port, "8074");
        assert_eq!(config.server_addr, "0.0.0.0:8074");
    }

    #[test]
    fn rejects_addresses_without_a_valid_port() {
        for addr in ["8074", "0.0.0.0:", "0.0.0.0:notaport", ":8074"] {
            let mut bad = args();
            bad.server_addr = addr.to_string();
            assert!(ServerConfig::try_from(bad).is_err(), "accepted {addr:?}");
        }
    }

    #[test]
    fn rejects_an_empty_app_name_and_a_zero_batch_cap() {
        let mut bad = args();
        bad.app_name = String::new();
        assert!(ServerConfig::try_from(bad).is_err());

        let mut bad = args();
        bad.max_batch_ids = 0;
        assert!(ServerConfig::try_from(bad).is_err());
    }
}
