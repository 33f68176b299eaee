use chrono::{Datelike, Local};
use std::{convert::TryFrom, sync::Arc};
use tracing::{debug, info};

use crate::{
    Config,
    error::{Error, Result},
    model::{
        AirQualitySample, CityInfo, CompositeSnapshot, HistoricalConditions, Location, NowSnapshot,
        Relation, Snapshot,
    },
    provider::{
        CityInfoProvider, LocationStore, PowerGridProvider, climate::DegreeDayScraper, http_client,
        openweather::OpenWeatherClient, openweather_from_config, scraper_from_config,
    },
};

/// The kinds of response a snapshot request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Full,
    Now,
    Info,
    YesterdayWeather,
    YesterdayAirQuality,
    DegreeDay,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Full => "full",
            Variant::Now => "now",
            Variant::Info => "info",
            Variant::YesterdayWeather => "yesterday-weather",
            Variant::YesterdayAirQuality => "yesterday-air-quality",
            Variant::DegreeDay => "degree-day",
        }
    }

    pub const fn all() -> &'static [Variant] {
        &[
            Variant::Full,
            Variant::Now,
            Variant::Info,
            Variant::YesterdayWeather,
            Variant::YesterdayAirQuality,
            Variant::DegreeDay,
        ]
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Variant {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        Variant::all()
            .iter()
            .copied()
            .find(|v| v.as_str() == lower)
            .ok_or_else(|| {
                let names: Vec<_> = Variant::all().iter().map(Variant::as_str).collect();
                anyhow::anyhow!(
                    "Unknown variant '{value}'. Supported variants: {}.",
                    names.join(", ")
                )
            })
    }
}

/// The external collaborators a snapshot is assembled from, besides the
/// upstream clients.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub locations: Arc<dyn LocationStore>,
    pub city_info: Arc<dyn CityInfoProvider>,
    pub power: Arc<dyn PowerGridProvider>,
}

/// Resolves a location and merges the sources each variant needs.
///
/// Independent sources are fetched concurrently. The first failure fails the
/// whole request and the other results are dropped.
#[derive(Debug, Clone)]
pub struct Aggregator {
    collaborators: Collaborators,
    weather: OpenWeatherClient,
    degree_days: DegreeDayScraper,
}

impl Aggregator {
    pub fn new(
        collaborators: Collaborators,
        weather: OpenWeatherClient,
        degree_days: DegreeDayScraper,
    ) -> Self {
        Self {
            collaborators,
            weather,
            degree_days,
        }
    }

    /// Builds both upstream clients from config, sharing one HTTP client.
    pub fn from_config(config: &Config, collaborators: Collaborators) -> anyhow::Result<Self> {
        let http = http_client(config)?;
        let weather = openweather_from_config(config, http.clone())?;
        let degree_days = scraper_from_config(config, http);
        Ok(Self::new(collaborators, weather, degree_days))
    }

    /// Every known location.
    pub async fn locations(&self) -> Result<Vec<Location>> {
        self.collaborators
            .locations
            .find_all()
            .await
            .map_err(|error| Error::Collaborator { what: "location", error })
    }

    pub async fn snapshot(&self, id: &str, variant: Variant) -> Result<Snapshot> {
        info!(id, %variant, "building snapshot");

        Ok(match variant {
            Variant::Full => Snapshot::Full(self.full(id).await?),
            Variant::Now => Snapshot::Now(self.now(id).await?),
            Variant::Info => Snapshot::Info(self.info(id).await?),
            Variant::YesterdayWeather => Snapshot::YesterdayWeather {
                weather: self.yesterday_weather(id).await?,
            },
            Variant::YesterdayAirQuality => Snapshot::YesterdayAirQuality {
                air_quality: self.yesterday_air_quality(id).await?,
            },
            Variant::DegreeDay => Snapshot::DegreeDay {
                html: self.degree_day(id).await?,
            },
        })
    }

    /// Location with its relations, city info, live weather and both power payloads.
    pub async fn full(&self, id: &str) -> Result<CompositeSnapshot> {
        let location = self
            .resolve(id, &[Relation::Country, Relation::DataPoints])
            .await?;

        let (info, weather, power, generation) = tokio::try_join!(
            self.city_info(&location),
            self.weather.get_weather(&location),
            self.power_data(),
            self.generation_breakdown(),
        )?;

        Ok(CompositeSnapshot {
            location,
            info,
            weather,
            power,
            generation,
        })
    }

    pub async fn now(&self, id: &str) -> Result<NowSnapshot> {
        let location = self.resolve(id, &[]).await?;

        let (weather, power, generation) = tokio::try_join!(
            self.weather.get_weather(&location),
            self.power_data(),
            self.generation_breakdown(),
        )?;

        Ok(NowSnapshot {
            weather,
            power,
            generation,
        })
    }

    pub async fn info(&self, id: &str) -> Result<CityInfo> {
        let location = self.resolve(id, &[]).await?;
        self.city_info(&location).await
    }

    pub async fn yesterday_weather(&self, id: &str) -> Result<HistoricalConditions> {
        let location = self.resolve(id, &[]).await?;
        self.weather.get_yesterday_weather(&location).await
    }

    pub async fn yesterday_air_quality(&self, id: &str) -> Result<AirQualitySample> {
        let location = self.resolve(id, &[]).await?;
        self.weather.get_yesterday_air_quality(&location).await
    }

    /// Today's degree-day value. `Ok(None)` means the report could not be read,
    /// which is not a request failure.
    pub async fn degree_day(&self, id: &str) -> Result<Option<String>> {
        self.resolve(id, &[]).await?;
        let today = Local::now().day();
        Ok(self.degree_days.scrape_day(today).await)
    }

    async fn resolve(&self, id: &str, relations: &[Relation]) -> Result<Location> {
        let found = self
            .collaborators
            .locations
            .find_one(id, relations)
            .await
            .map_err(|error| Error::Collaborator { what: "location", error })?;

        match found {
            Some(location) => {
                debug!(id, lat = location.lat, lon = location.lon, "resolved location");
                Ok(location)
            }
            None => Err(Error::LocationNotFound { id: id.to_string() }),
        }
    }

    async fn city_info(&self, location: &Location) -> Result<CityInfo> {
        self.collaborators
            .city_info
            .city_info(location)
            .await
            .map_err(|error| Error::Collaborator { what: "city info", error })
    }

    async fn power_data(&self) -> Result<serde_json::Value> {
        self.collaborators
            .power
            .power_data()
            .await
            .map_err(|error| Error::Collaborator { what: "power data", error })
    }

    async fn generation_breakdown(&self) -> Result<serde_json::Value> {
        self.collaborators
            .power
            .generation_breakdown()
            .await
            .map_err(|error| Error::Collaborator { what: "power generation", error })
    }
}
