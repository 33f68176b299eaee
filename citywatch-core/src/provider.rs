use crate::{
    Config,
    model::{CityInfo, Location, Relation},
    provider::{
        climate::{DegreeDayScraper, ReportLayout},
        openweather::OpenWeatherClient,
    },
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::fmt::Debug;

pub mod climate;
pub mod openweather;

/// Lookup of locations by id, owned by whatever persists cities.
#[async_trait]
pub trait LocationStore: Send + Sync + Debug {
    /// Returns `Ok(None)` when no location has this id.
    async fn find_one(&self, id: &str, relations: &[Relation]) -> anyhow::Result<Option<Location>>;

    async fn find_all(&self) -> anyhow::Result<Vec<Location>>;
}

/// Descriptive metadata about a city.
#[async_trait]
pub trait CityInfoProvider: Send + Sync + Debug {
    async fn city_info(&self, location: &Location) -> anyhow::Result<CityInfo>;
}

/// Power-grid demand and generation figures. Payloads are opaque.
#[async_trait]
pub trait PowerGridProvider: Send + Sync + Debug {
    async fn power_data(&self) -> anyhow::Result<Value>;

    async fn generation_breakdown(&self) -> anyhow::Result<Value>;
}

/// Shared HTTP client with the configured per-request timeout.
pub fn http_client(config: &Config) -> anyhow::Result<Client> {
    Ok(Client::builder().timeout(config.http.timeout()).build()?)
}

/// Construct the OpenWeather client from config.
pub fn openweather_from_config(config: &Config, http: Client) -> anyhow::Result<OpenWeatherClient> {
    let api_key = config.require_api_key()?;

    Ok(OpenWeatherClient::new(
        api_key.to_owned(),
        http,
        config.openweather.base_url.clone(),
        config.openweather.air_base_url.clone(),
    ))
}

/// Construct the degree-day scraper from config.
pub fn scraper_from_config(config: &Config, http: Client) -> DegreeDayScraper {
    let layout = ReportLayout {
        header_label: config.degree_day.header_label.clone(),
        ..ReportLayout::default()
    };
    DegreeDayScraper::new(http, config.degree_day.report_url.clone(), layout)
}
