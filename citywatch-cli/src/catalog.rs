//! JSON city catalog standing in for the location store and city-info service.
//!
//! Format:
//! ```json
//! [
//!   {"id": "7", "name": "Oshawa", "lat": 43.9, "lon": -78.86,
//!    "country": {"code": "CA"}, "info": {"population": 175383}}
//! ]
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use citywatch_core::{CityInfo, CityInfoProvider, Location, LocationStore, Relation};
use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    #[serde(flatten)]
    location: Location,
    #[serde(default)]
    info: CityInfo,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "catalog not found, no locations available");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse catalog: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let entries = serde_json::from_str(contents)?;
        Ok(Self { entries })
    }

    fn entry(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.location.id == id)
    }
}

#[async_trait]
impl LocationStore for Catalog {
    async fn find_one(&self, id: &str, relations: &[Relation]) -> Result<Option<Location>> {
        Ok(self.entry(id).map(|e| {
            let mut location = e.location.clone();
            if !relations.contains(&Relation::Country) {
                location.country = None;
            }
            if !relations.contains(&Relation::DataPoints) {
                location.data_points = None;
            }
            location
        }))
    }

    async fn find_all(&self) -> Result<Vec<Location>> {
        Ok(self.entries.iter().map(|e| e.location.clone()).collect())
    }
}

#[async_trait]
impl CityInfoProvider for Catalog {
    async fn city_info(&self, location: &Location) -> Result<CityInfo> {
        Ok(self.entry(&location.id).map(|e| e.info.clone()).unwrap_or_default())
    }
}
