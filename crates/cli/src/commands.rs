//! Command-line surface and the queries behind it.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use registry_model::{RegistryEndpoint, WireEntity};
use registry_transport::{
    RegistryHttpClient, RegistryResponse, RegistryTransportFactory, TransportClientFactory, WireCodec,
};
use tracing::info;

use crate::config::{LogFormat, QueryConfig};

/// Query a service registry through the transport-client factory.
#[derive(Debug, Parser)]
#[command(name = "registry-query", version, about)]
pub struct CliConfig {
    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Registry endpoint; overrides the configuration file.
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Log output format; overrides the configuration file.
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Full registry snapshot.
    Apps {
        /// Remote regions to include; repeatable.
        #[arg(long = "region")]
        regions: Vec<String>,
    },
    /// One application and its instances.
    App { name: String },
    /// One instance, by id, optionally scoped to its application.
    Instance {
        id: String,
        #[arg(long)]
        app: Option<String>,
    },
    /// Changes since the last snapshot.
    Delta {
        #[arg(long = "region")]
        regions: Vec<String>,
    },
}

impl CliConfig {
    /// The configuration file merged with command-line overrides.
    pub fn resolve(&self) -> anyhow::Result<QueryConfig> {
        let mut config = match &self.config {
            Some(path) => QueryConfig::load(path)?,
            None => QueryConfig::default(),
        };
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = Some(endpoint.clone());
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        Ok(config)
    }
}

/// Runs `command` against the configured endpoint and prints the entity in
/// wire form.
pub async fn run(config: &QueryConfig, command: &Command) -> anyhow::Result<()> {
    let endpoint = config
        .endpoint
        .as_deref()
        .and_then(RegistryEndpoint::new)
        .context("no registry endpoint configured (use --endpoint or `endpoint` in the config file)")?;

    let factory = RegistryTransportFactory::from_tls_properties(&config.tls)
        .context("failed to create registry transport")?;
    let client = factory.new_client(&endpoint);
    info!(endpoint = client.endpoint(), ?command, "Querying registry");

    let result = query(client.as_ref(), factory.codec(), command).await;
    client.shutdown();
    factory.shutdown();
    result
}

async fn query(client: &dyn RegistryHttpClient, codec: &WireCodec, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Apps { regions } => print_entity(codec, client.get_applications(regions).await?),
        Command::App { name } => print_entity(codec, client.get_application(name).await?),
        Command::Instance { id, app: Some(app) } => print_entity(codec, client.get_instance_by_app(app, id).await?),
        Command::Instance { id, app: None } => print_entity(codec, client.get_instance(id).await?),
        Command::Delta { regions } => print_entity(codec, client.get_delta(regions).await?),
    }
}

fn print_entity<T: WireEntity>(codec: &WireCodec, response: RegistryResponse<T>) -> anyhow::Result<()> {
    if !response.is_success() {
        bail!("registry answered {}", response.status);
    }
    let Some(entity) = response.entity else {
        bail!("registry answered {} with an empty body", response.status);
    };
    let body = codec.encode(&entity)?;
    println!("{}", String::from_utf8_lossy(&body));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcommands_parse() {
        let cli = CliConfig::try_parse_from([
            "registry-query",
            "--endpoint",
            "http://localhost:8761/eureka/",
            "apps",
            "--region",
            "us-east-1",
            "--region",
            "eu-west-1",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::Apps {
                regions: vec!["us-east-1".to_owned(), "eu-west-1".to_owned()]
            }
        );

        let cli = CliConfig::try_parse_from(["registry-query", "instance", "i-1", "--app", "ORDERS"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Instance {
                id: "i-1".to_owned(),
                app: Some("ORDERS".to_owned())
            }
        );
    }

    #[test]
    fn flags_override_defaults() {
        let cli = CliConfig::try_parse_from([
            "registry-query",
            "-e",
            "http://localhost:8761/eureka/",
            "--log-format",
            "json",
            "delta",
        ])
        .unwrap();
        let config = cli.resolve().unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:8761/eureka/"));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[tokio::test]
    async fn missing_endpoint_is_reported() {
        let err = run(&QueryConfig::default(), &Command::Delta { regions: vec![] })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no registry endpoint"));
    }
}
