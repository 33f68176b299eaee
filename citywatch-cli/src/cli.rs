use anyhow::Context;
use citywatch_core::{Aggregator, Collaborators, Config, Variant, provider::http_client};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};

use crate::{catalog::Catalog, power::FeedPowerGrid};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citywatch", version, about = "City environmental snapshots")]
pub struct Cli {
    /// City catalog (JSON). Defaults to the configured path.
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    /// List every city in the catalog.
    List,

    /// Show a snapshot for a city.
    Show {
        /// City id from the catalog.
        id: String,

        /// One of: full, now, info, yesterday-weather, yesterday-air-quality, degree-day.
        #[arg(long, default_value = "full")]
        variant: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        if let Some(path) = self.catalog {
            config.catalog = Some(path);
        }

        match self.command {
            Command::Configure => configure(config),
            Command::List => {
                let aggregator = build_aggregator(&config)?;
                let locations = aggregator.locations().await?;
                print_json(&locations)
            }
            Command::Show { id, variant } => {
                let variant = Variant::try_from(variant.as_str())?;
                let aggregator = build_aggregator(&config)?;
                let snapshot = aggregator.snapshot(&id, variant).await?;
                print_json(&snapshot)
            }
        }
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    config.set_api_key(key.trim().to_string());
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn build_aggregator(config: &Config) -> anyhow::Result<Aggregator> {
    let catalog = Arc::new(Catalog::load(&config.catalog_path()?)?);
    let power = FeedPowerGrid::new(
        http_client(config)?,
        config.power.data_url.clone(),
        config.power.generation_url.clone(),
    );

    let collaborators = Collaborators {
        locations: catalog.clone(),
        city_info: catalog,
        power: Arc::new(power),
    };

    Aggregator::from_config(config, collaborators)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}
