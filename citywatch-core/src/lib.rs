//! Core library for the `citywatch` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Clients for the upstream weather, air-quality and degree-day sources
//! - The collaborator traits (location store, city info, power grid)
//! - The aggregator that merges everything into one snapshot per request
//!
//! It is used by `citywatch-cli`, but can also be reused by other binaries or services.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod units;

pub use aggregate::{Aggregator, Collaborators, Variant};
pub use config::Config;
pub use error::{Error, Result, Upstream};
pub use model::{
    AirQualitySample, AqiLevel, CityInfo, Components, CompositeSnapshot, CurrentConditions,
    HistoricalConditions, Location, NowSnapshot, Relation, Snapshot,
};
pub use provider::{
    CityInfoProvider, LocationStore, PowerGridProvider, climate::DegreeDayScraper,
    openweather::OpenWeatherClient,
};
pub use units::{Window, kelvin_to_celsius, yesterday_window};
