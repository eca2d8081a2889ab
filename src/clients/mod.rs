/// External query service clients module
use crate::domain::{ImageLayerQuery, TimePoint, TimeSeries, TimeSeriesQuery};
use crate::errors::ClientError;
use crate::utils::{num, parse_timestamp};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Longest upstream error body kept in an error
const MAX_ERROR_BODY: usize = 512;

/// The Earth Engine backed service that resolves layers and samples indices
#[async_trait]
pub trait QueryService: Send + Sync {
    /// URL of a tile/image endpoint for the selected product and period
    async fn resolve_image_layer(&self, query: &ImageLayerQuery) -> Result<String, ClientError>;

    /// Index values reduced over the query geometry
    async fn time_series(&self, query: &TimeSeriesQuery) -> Result<TimeSeries, ClientError>;
}

/// HTTP client wrapper with common configuration
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("drought-watch/0.1")
            .build()?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

/// JSON-over-HTTP client for the Earth Engine helper service
pub struct EarthEngineClient {
    http_client: HttpClient,
    base_url: String,
}

impl EarthEngineClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http_client: HttpClient::new(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ClientError> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .http_client
            .get_client()
            .post(&url)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            warn!(%url, %status, "Query service request failed");
            return Err(ClientError::Status { status, body });
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl QueryService for EarthEngineClient {
    #[instrument(skip_all, fields(platform = %query.platform, product = %query.product))]
    async fn resolve_image_layer(&self, query: &ImageLayerQuery) -> Result<String, ClientError> {
        let json = self.post_json("image-collection", query).await?;
        parse_layer_url(&json)
    }

    #[instrument(skip_all, fields(platform = %query.layer.platform, product = %query.layer.product, index = %query.index_name))]
    async fn time_series(&self, query: &TimeSeriesQuery) -> Result<TimeSeries, ClientError> {
        let json = self.post_json("time-series", query).await?;
        let series = parse_time_series(&json)?;
        debug!(points = series.len(), "Time series received");
        Ok(series)
    }
}

/// Pull the layer URL out of `{"url": "..."}`
pub fn parse_layer_url(json: &Value) -> Result<String, ClientError> {
    json.get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ClientError::Malformed(format!("no url in response: {json}")))
}

/// Decode `[[t, v], ...]`, either bare or under `"time_series"`.
///
/// Samples with a null value are masked observations and are dropped.
pub fn parse_time_series(json: &Value) -> Result<TimeSeries, ClientError> {
    let rows = json
        .as_array()
        .or_else(|| json.get("time_series").and_then(Value::as_array))
        .ok_or_else(|| ClientError::Malformed("expected an array of [time, value] pairs".into()))?;

    let mut points = Vec::with_capacity(rows.len());
    for row in rows {
        let pair = row
            .as_array()
            .filter(|pair| pair.len() == 2)
            .ok_or_else(|| ClientError::Malformed(format!("not a [time, value] pair: {row}")))?;

        let time = parse_timestamp(&pair[0])
            .ok_or_else(|| ClientError::Malformed(format!("bad timestamp: {}", pair[0])))?;

        if pair[1].is_null() {
            continue;
        }
        let value = num(&pair[1])
            .ok_or_else(|| ClientError::Malformed(format!("bad value: {}", pair[1])))?;

        points.push(TimePoint { time, value });
    }

    Ok(TimeSeries::new(points))
}
