use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Number, Value};

/// A resolved location, as handed over by the location store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_points: Option<Vec<Value>>,
}

/// Related records a location lookup may load alongside the location itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Country,
    DataPoints,
}

/// Descriptive metadata about a city, merged field-by-field into snapshots.
pub type CityInfo = Map<String, Value>;

/// Live conditions. Temperatures are Celsius; everything else is passed
/// through exactly as the upstream sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub temp: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub feels_like: Option<f64>,
    pub pressure: Option<Number>,
    pub humidity: Option<Number>,
    pub visibility: Option<Number>,
    pub wind_speed: Option<Number>,
    pub wind_direction: Option<Number>,
    pub condition: Option<String>,
    pub condition_description: Option<String>,
}

/// Temperatures for a past day, in Celsius.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalConditions {
    pub temp: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
}

/// Pollutant concentrations in μg/m³.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub co: Option<f64>,
    pub no: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nh3: Option<f64>,
}

/// Serialized with a derived `level` label next to the raw index.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AirQualitySample {
    /// Air quality index on the 1 (good) to 5 (very poor) scale.
    pub aqi: Option<u8>,
    pub components: Components,
}

impl AirQualitySample {
    pub fn level(&self) -> AqiLevel {
        self.aqi.map(AqiLevel::from_index).unwrap_or(AqiLevel::Unknown)
    }
}

impl Serialize for AirQualitySample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("aqi", &self.aqi)?;
        map.serialize_entry("level", self.level().label())?;
        map.serialize_entry("components", &self.components)?;
        map.end()
    }
}

/// Qualitative band for the 1-5 air quality index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiLevel {
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
    Unknown,
}

impl AqiLevel {
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Self::Good,
            2 => Self::Fair,
            3 => Self::Moderate,
            4 => Self::Poor,
            5 => Self::VeryPoor,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
            Self::Unknown => "Unknown",
        }
    }
}

/// The full snapshot: location fields and city info merged flat, followed by
/// `weather`, `power` and `generation`. Later keys win on collision.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSnapshot {
    pub location: Location,
    pub info: CityInfo,
    pub weather: CurrentConditions,
    pub power: Value,
    pub generation: Value,
}

impl CompositeSnapshot {
    /// Flattens the snapshot into a single JSON object.
    pub fn to_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut out = match serde_json::to_value(&self.location)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        out.extend(self.info.clone());
        out.insert("weather".into(), serde_json::to_value(&self.weather)?);
        out.insert("power".into(), self.power.clone());
        out.insert("generation".into(), self.generation.clone());
        Ok(out)
    }
}

impl Serialize for CompositeSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let merged = self
            .to_map()
            .map_err(<S::Error as serde::ser::Error>::custom)?;
        let mut map = serializer.serialize_map(Some(merged.len()))?;
        for (k, v) in &merged {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NowSnapshot {
    pub weather: CurrentConditions,
    pub power: Value,
    pub generation: Value,
}

/// Response object for each request variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Snapshot {
    Full(CompositeSnapshot),
    Now(NowSnapshot),
    Info(CityInfo),
    YesterdayWeather {
        weather: HistoricalConditions,
    },
    YesterdayAirQuality {
        #[serde(rename = "airQuality")]
        air_quality: AirQualitySample,
    },
    /// Named `HTML` for compatibility; the value is the extracted cell text.
    DegreeDay {
        #[serde(rename = "HTML", skip_serializing_if = "Option::is_none")]
        html: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn oshawa() -> Location {
        Location {
            id: "7".into(),
            name: Some("Oshawa".into()),
            lat: 43.9,
            lon: -78.86,
            country: None,
            data_points: None,
        }
    }

    #[test]
    fn aqi_levels() {
        assert_eq!(AqiLevel::from_index(1), AqiLevel::Good);
        assert_eq!(AqiLevel::from_index(5), AqiLevel::VeryPoor);
        assert_eq!(AqiLevel::from_index(0), AqiLevel::Unknown);
        assert_eq!(AqiLevel::from_index(9).label(), "Unknown");

        let sample = AirQualitySample { aqi: Some(3), ..Default::default() };
        assert_eq!(sample.level().label(), "Moderate");
        assert_eq!(AirQualitySample::default().level(), AqiLevel::Unknown);
    }

    #[test]
    fn composite_snapshot_merges_flat() {
        let mut info = CityInfo::new();
        info.insert("population".into(), json!(175383));
        info.insert("name".into(), json!("City of Oshawa"));

        let snapshot = CompositeSnapshot {
            location: oshawa(),
            info,
            weather: CurrentConditions { temp: Some(22.0), ..Default::default() },
            power: json!({"demand": 15000}),
            generation: json!([]),
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["id"], "7");
        assert_eq!(value["lat"], 43.9);
        assert_eq!(value["population"], 175383);
        // City info overrides location fields of the same name.
        assert_eq!(value["name"], "City of Oshawa");
        assert_eq!(value["weather"]["temp"], 22.0);
        assert_eq!(value["power"]["demand"], 15000);
        assert!(value.get("country").is_none());
    }

    #[test]
    fn degree_day_without_value_serializes_empty() {
        let value = serde_json::to_value(Snapshot::DegreeDay { html: None }).unwrap();
        assert_eq!(value, json!({}));

        let value = serde_json::to_value(Snapshot::DegreeDay { html: Some("3.4".into()) }).unwrap();
        assert_eq!(value, json!({"HTML": "3.4"}));
    }

    #[test]
    fn variant_shapes_use_wire_names() {
        let value = serde_json::to_value(Snapshot::YesterdayAirQuality {
            air_quality: AirQualitySample::default(),
        })
        .unwrap();
        assert_eq!(value["airQuality"]["aqi"], Value::Null);
        assert_eq!(value["airQuality"]["level"], "Unknown");

        let value = serde_json::to_value(AirQualitySample {
            aqi: Some(4),
            components: Components { co: Some(200.5), ..Default::default() },
        })
        .unwrap();
        assert_eq!(value["aqi"], 4);
        assert_eq!(value["level"], "Poor");
        assert_eq!(value["components"]["co"], 200.5);

        let value = serde_json::to_value(CurrentConditions {
            temp_min: Some(1.5),
            condition_description: Some("light rain".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(value["tempMin"], 1.5);
        assert_eq!(value["conditionDescription"], "light rain");
    }
}
