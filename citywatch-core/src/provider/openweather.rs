use chrono::Local;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Number;
use tracing::{debug, error};

use crate::{
    error::{Error, Result, Upstream},
    model::{AirQualitySample, Components, CurrentConditions, HistoricalConditions, Location},
    units::{AIR_QUALITY_LEAD_DAYS, HISTORICAL_LEAD_DAYS, kelvin_to_celsius, yesterday_window},
};

/// Client for the OpenWeather current-weather, historical and air-pollution endpoints.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    http: Client,
    base_url: String,
    air_base_url: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: String, http: Client, base_url: String, air_base_url: String) -> Self {
        Self {
            api_key,
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            air_base_url: air_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Live conditions at the location.
    ///
    /// Any failure is returned as-is: no retry and no partially filled record.
    pub async fn get_weather(&self, location: &Location) -> Result<CurrentConditions> {
        let url = format!("{}/weather", self.base_url);
        let query = self.coordinates(location);

        let parsed: OwWeatherResponse = self
            .fetch_json(Upstream::CurrentWeather, &url, &query)
            .await?;

        current_conditions(parsed)
    }

    /// Historical temperatures; the query starts a full day before "yesterday"
    /// at the current wall-clock time (see [`HISTORICAL_LEAD_DAYS`]).
    pub async fn get_yesterday_weather(&self, location: &Location) -> Result<HistoricalConditions> {
        self.fetch_yesterday_weather(location)
            .await
            .inspect_err(|err| error!(error = %err, "Error fetching yesterday's weather"))
    }

    async fn fetch_yesterday_weather(&self, location: &Location) -> Result<HistoricalConditions> {
        let window = yesterday_window(&Local::now(), HISTORICAL_LEAD_DAYS);
        let url = format!("{}/weather", self.base_url);

        let mut query = self.coordinates(location);
        query.insert(2, ("start", window.start.to_string()));

        let parsed: OwWeatherResponse = self
            .fetch_json(Upstream::HistoricalWeather, &url, &query)
            .await?;

        historical_conditions(parsed)
    }

    /// Air quality over yesterday's window, taken from the first sample returned.
    pub async fn get_yesterday_air_quality(&self, location: &Location) -> Result<AirQualitySample> {
        self.fetch_yesterday_air_quality(location)
            .await
            .inspect_err(|err| error!(error = %err, "Error fetching yesterday's air quality"))
    }

    async fn fetch_yesterday_air_quality(&self, location: &Location) -> Result<AirQualitySample> {
        let window = yesterday_window(&Local::now(), AIR_QUALITY_LEAD_DAYS);
        let url = format!("{}/air_pollution/history", self.air_base_url);

        let mut query = self.coordinates(location);
        query.insert(2, ("start", window.start.to_string()));
        query.insert(3, ("end", window.end.to_string()));

        let parsed: OwPollutionResponse =
            self.fetch_json(Upstream::AirQuality, &url, &query).await?;

        air_quality_sample(parsed)
    }

    fn coordinates(&self, location: &Location) -> Vec<(&'static str, String)> {
        vec![
            ("lat", location.lat.to_string()),
            ("lon", location.lon.to_string()),
            ("appid", self.api_key.clone()),
        ]
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        upstream: Upstream,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        debug!(%upstream, url, "requesting");

        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|error| Error::Request { upstream, error })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|error| Error::Request { upstream, error })?;

        if !status.is_success() {
            return Err(Error::Status {
                upstream,
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|error| Error::Decode { upstream, error })
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    feels_like: Option<f64>,
    pressure: Option<Number>,
    humidity: Option<Number>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: Option<Number>,
    deg: Option<Number>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWeatherResponse {
    main: Option<OwMain>,
    visibility: Option<Number>,
    wind: Option<OwWind>,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwPollutionMain {
    aqi: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct OwPollutionEntry {
    main: Option<OwPollutionMain>,
    components: Option<Components>,
}

#[derive(Debug, Deserialize)]
struct OwPollutionResponse {
    #[serde(default)]
    list: Vec<OwPollutionEntry>,
}

// Nested objects are required; leaf values may be absent.
fn current_conditions(parsed: OwWeatherResponse) -> Result<CurrentConditions> {
    let upstream = Upstream::CurrentWeather;
    let main = parsed.main.ok_or(Error::MissingField { upstream, field: "main" })?;
    let wind = parsed.wind.ok_or(Error::MissingField { upstream, field: "wind" })?;
    let weather = parsed
        .weather
        .into_iter()
        .next()
        .ok_or(Error::MissingField { upstream, field: "weather[0]" })?;

    Ok(CurrentConditions {
        temp: main.temp.map(kelvin_to_celsius),
        temp_min: main.temp_min.map(kelvin_to_celsius),
        temp_max: main.temp_max.map(kelvin_to_celsius),
        feels_like: main.feels_like.map(kelvin_to_celsius),
        pressure: main.pressure,
        humidity: main.humidity,
        visibility: parsed.visibility,
        wind_speed: wind.speed,
        wind_direction: wind.deg,
        condition: weather.main,
        condition_description: weather.description,
    })
}

fn historical_conditions(parsed: OwWeatherResponse) -> Result<HistoricalConditions> {
    let main = parsed.main.ok_or(Error::MissingField {
        upstream: Upstream::HistoricalWeather,
        field: "main",
    })?;

    Ok(HistoricalConditions {
        temp: main.temp.map(kelvin_to_celsius),
        temp_min: main.temp_min.map(kelvin_to_celsius),
        temp_max: main.temp_max.map(kelvin_to_celsius),
    })
}

// The list is assumed time-ordered; the first entry is used without sorting.
fn air_quality_sample(parsed: OwPollutionResponse) -> Result<AirQualitySample> {
    let upstream = Upstream::AirQuality;
    let first = parsed
        .list
        .into_iter()
        .next()
        .ok_or(Error::EmptySeries { upstream })?;

    let main = first.main.ok_or(Error::MissingField { upstream, field: "list[0].main" })?;
    let components = first
        .components
        .ok_or(Error::MissingField { upstream, field: "list[0].components" })?;

    Ok(AirQualitySample {
        aqi: main.aqi,
        components,
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn toronto() -> Location {
        Location {
            id: "1".into(),
            name: Some("Toronto".into()),
            lat: 43.65,
            lon: -79.38,
            country: None,
            data_points: None,
        }
    }

    fn client(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new(
            "TEST_KEY".into(),
            Client::new(),
            server.uri(),
            format!("{}/", server.uri()),
        )
    }

    fn weather_fixture() -> serde_json::Value {
        json!({
            "main": {
                "temp": 295.0,
                "temp_min": 290.15,
                "temp_max": 298.15,
                "feels_like": 294.5,
                "pressure": 1012,
                "humidity": 64
            },
            "visibility": 10000,
            "wind": {"speed": 4.63, "deg": 250},
            "weather": [{"main": "Clouds", "description": "broken clouds"}]
        })
    }

    #[tokio::test]
    async fn current_weather_converts_temperatures_and_copies_the_rest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "43.65"))
            .and(query_param("lon", "-79.38"))
            .and(query_param("appid", "TEST_KEY"))
            .and(query_param_is_missing("start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_fixture()))
            .mount(&server)
            .await;

        let weather = client(&server).get_weather(&toronto()).await.unwrap();

        assert_eq!(weather.temp, Some(22.0));
        assert_eq!(weather.temp_min, Some(17.0));
        assert_eq!(weather.temp_max, Some(25.0));
        assert_eq!(weather.feels_like, Some(21.0));
        assert_eq!(weather.pressure, Some(Number::from(1012)));
        assert_eq!(weather.humidity, Some(Number::from(64)));
        assert_eq!(weather.visibility, Some(Number::from(10000)));
        assert_eq!(weather.wind_speed.as_ref().and_then(Number::as_f64), Some(4.63));
        assert_eq!(weather.wind_direction, Some(Number::from(250)));
        assert_eq!(weather.condition.as_deref(), Some("Clouds"));
        assert_eq!(weather.condition_description.as_deref(), Some("broken clouds"));
    }

    #[tokio::test]
    async fn current_weather_keeps_absent_leaves_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "main": {"temp": 273.15},
                "wind": {},
                "weather": [{}]
            })))
            .mount(&server)
            .await;

        let weather = client(&server).get_weather(&toronto()).await.unwrap();
        assert_eq!(weather.temp, Some(0.0));
        assert_eq!(weather.temp_max, None);
        assert_eq!(weather.visibility, None);
        assert_eq!(weather.condition, None);
    }

    #[tokio::test]
    async fn current_weather_server_error_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let err = client(&server).get_weather(&toronto()).await.unwrap_err();
        match err {
            Error::Status { upstream, status, body } => {
                assert_eq!(upstream, Upstream::CurrentWeather);
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn current_weather_without_conditions_is_missing_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "main": {"temp": 280.0},
                "wind": {"speed": 1.0},
                "weather": []
            })))
            .mount(&server)
            .await;

        let err = client(&server).get_weather(&toronto()).await.unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "weather[0]", .. }));
    }

    #[tokio::test]
    async fn malformed_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let err = client(&server).get_weather(&toronto()).await.unwrap_err();
        assert!(matches!(err, Error::Decode { upstream: Upstream::CurrentWeather, .. }));
    }

    #[tokio::test]
    async fn yesterday_weather_sends_start_and_returns_temperatures_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("appid", "TEST_KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_fixture()))
            .mount(&server)
            .await;

        let before = yesterday_window(&Local::now(), HISTORICAL_LEAD_DAYS).start;
        let weather = client(&server).get_yesterday_weather(&toronto()).await.unwrap();
        let after = yesterday_window(&Local::now(), HISTORICAL_LEAD_DAYS).start;

        assert_eq!(
            weather,
            HistoricalConditions {
                temp: Some(22.0),
                temp_min: Some(17.0),
                temp_max: Some(25.0),
            }
        );

        let requests = server.received_requests().await.unwrap();
        let start: i64 = requests[0]
            .url
            .query_pairs()
            .find(|(k, _)| k == "start")
            .map(|(_, v)| v.parse().unwrap())
            .expect("start must be sent");
        assert!(before <= start && start <= after);
        assert!(!requests[0].url.query_pairs().any(|(k, _)| k == "end"));
    }

    #[tokio::test]
    async fn yesterday_weather_failure_is_rethrown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = client(&server).get_yesterday_weather(&toronto()).await.unwrap_err();
        assert_eq!(err.upstream(), Some(Upstream::HistoricalWeather));
    }

    #[tokio::test]
    async fn air_quality_takes_first_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air_pollution/history"))
            .and(query_param("appid", "TEST_KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "coord": {"lon": -79.38, "lat": 43.65},
                "list": [
                    {
                        "main": {"aqi": 2},
                        "components": {
                            "co": 200.5, "no": 0.1, "no2": 5.2, "o3": 60.1,
                            "so2": 0.6, "pm2_5": 3.4, "pm10": 4.1, "nh3": 0.9
                        },
                        "dt": 1700000000
                    },
                    {
                        "main": {"aqi": 5},
                        "components": {"co": 999.0},
                        "dt": 1700003600
                    }
                ]
            })))
            .mount(&server)
            .await;

        let sample = client(&server).get_yesterday_air_quality(&toronto()).await.unwrap();

        assert_eq!(sample.aqi, Some(2));
        assert_eq!(sample.components.co, Some(200.5));
        assert_eq!(sample.components.pm2_5, Some(3.4));
        assert_eq!(sample.components.nh3, Some(0.9));

        let requests = server.received_requests().await.unwrap();
        let pairs: Vec<(String, String)> = requests[0].url.query_pairs().into_owned().collect();
        let get = |name: &str| -> i64 {
            pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.parse().unwrap()).unwrap()
        };
        assert_eq!(get("end") - get("start"), 86_400);
    }

    #[tokio::test]
    async fn air_quality_empty_list_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/air_pollution/history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"list": []})))
            .mount(&server)
            .await;

        let err = client(&server).get_yesterday_air_quality(&toronto()).await.unwrap_err();
        assert!(matches!(err, Error::EmptySeries { upstream: Upstream::AirQuality }));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(150);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
