//! Current-weather lookup against the Open-Meteo forecast API.

use crate::error::ToolError;
use promptline_ai::{Field, SchemaDescriptor};
use promptline_core::Result;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

/// Name under which the model sees this tool.
pub const NAME: &str = "get_weather";

/// Public Open-Meteo endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    latitude: f64,
    longitude: f64,
}

/// Fetches the current temperature and wind speed for a coordinate.
#[derive(Debug, Clone)]
pub struct WeatherTool {
    client: reqwest::Client,
    base_url: String,
}

impl WeatherTool {
    /// Creates a tool that queries `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a tool that uses an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Parameter schema declared to the model.
    #[must_use]
    pub fn parameters() -> SchemaDescriptor {
        SchemaDescriptor::new("get_weather", "")
            .field(Field::number("latitude", "Latitude in decimal degrees"))
            .field(Field::number("longitude", "Longitude in decimal degrees"))
    }

    /// Returns the `current` block of the forecast response.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] if the coordinates are missing
    /// and [`ToolError::ExecutionFailed`] if the API cannot be reached or
    /// answers without a `current` block.
    #[instrument(skip(self))]
    pub async fn call(&self, args: &JsonValue) -> Result<JsonValue, ToolError> {
        let WeatherArgs {
            latitude,
            longitude,
        } = serde_json::from_value(args.clone()).map_err(|e| ToolError::InvalidArguments {
            name: NAME.to_string(),
            reason: e.to_string(),
        })?;

        let url = format!("{}/v1/forecast", self.base_url.trim_end_matches('/'));
        let failed = |reason: String| ToolError::ExecutionFailed {
            name: NAME.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", "temperature_2m,wind_speed_10m".to_string()),
                (
                    "hourly",
                    "temperature_2m,relative_humidity_2m,wind_speed_10m".to_string(),
                ),
            ])
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?
            .error_for_status()
            .map_err(|e| failed(e.to_string()))?;

        let mut body: JsonValue = response.json().await.map_err(|e| failed(e.to_string()))?;
        let current = body
            .get_mut("current")
            .map(JsonValue::take)
            .ok_or_else(|| failed("response has no 'current' block".to_string()))?;

        debug!(%current, "weather lookup complete");
        Ok(current)
    }
}
