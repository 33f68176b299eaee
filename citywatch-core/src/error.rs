use reqwest::StatusCode;
use thiserror::Error;

/// The external data source a request was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    CurrentWeather,
    HistoricalWeather,
    AirQuality,
    DegreeDay,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::CurrentWeather => "current weather",
            Upstream::HistoricalWeather => "historical weather",
            Upstream::AirQuality => "air quality",
            Upstream::DegreeDay => "degree-day report",
        }
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a snapshot request.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Location '{id}' not found")]
    LocationNotFound { id: String },

    #[error("Failed to send request to {upstream} endpoint")]
    Request {
        upstream: Upstream,
        #[source]
        error: reqwest::Error,
    },

    #[error("{upstream} request failed with status {status}: {body}")]
    Status {
        upstream: Upstream,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to parse {upstream} JSON")]
    Decode {
        upstream: Upstream,
        #[source]
        error: serde_json::Error,
    },

    #[error("{upstream} response is missing '{field}'")]
    MissingField {
        upstream: Upstream,
        field: &'static str,
    },

    #[error("{upstream} response contained no data")]
    EmptySeries { upstream: Upstream },

    #[error("{what} lookup failed")]
    Collaborator {
        what: &'static str,
        #[source]
        error: anyhow::Error,
    },
}

impl Error {
    /// True for the "no such location" outcome, as opposed to an upstream failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::LocationNotFound { .. })
    }

    /// The upstream this error came from, if any.
    pub fn upstream(&self) -> Option<Upstream> {
        match self {
            Error::Request { upstream, .. }
            | Error::Status { upstream, .. }
            | Error::Decode { upstream, .. }
            | Error::MissingField { upstream, .. }
            | Error::EmptySeries { upstream } => Some(*upstream),
            Error::LocationNotFound { .. } | Error::Collaborator { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
