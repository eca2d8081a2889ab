/// Domain models for the application
use chrono::{DateTime, NaiveDate, Utc};
use geojson::GeoJson;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Spatial aggregation applied over the drawn geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Mean,
    Median,
    Min,
    Max,
    Sum,
}

impl Reducer {
    pub const ALL: [Reducer; 5] = [
        Reducer::Mean,
        Reducer::Median,
        Reducer::Min,
        Reducer::Max,
        Reducer::Sum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Reducer::Mean => "mean",
            Reducer::Median => "median",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Sum => "sum",
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reducer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Reducer::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| format!("Unsupported reducer \"{}\". Please select one of: mean, median, min, max, sum.", s.trim()))
    }
}

/// Fields submitted by the "load map" action. Every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageCollectionForm {
    pub platform: Option<String>,
    pub product: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub reducer: Option<String>,
}

/// Fields submitted by the "plot" action
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeSeriesForm {
    #[serde(flatten)]
    pub layer: ImageCollectionForm,
    pub index_name: Option<String>,
    pub scale: Option<String>,
    pub geometry: Option<String>,
}

/// Parameters for resolving a map layer URL
#[derive(Debug, Clone, Serialize)]
pub struct ImageLayerQuery {
    pub platform: String,
    pub product: String,
    pub collection: String,
    pub params: BTreeMap<String, Value>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub reducer: Option<Reducer>,
}

/// Parameters for sampling an index over a geometry
#[derive(Debug, Clone, Serialize)]
pub struct TimeSeriesQuery {
    #[serde(flatten)]
    pub layer: ImageLayerQuery,
    pub index_name: String,
    pub scale: f64,
    pub geometry: GeoJson,
}

/// One observation of an index
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimePoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Observations ordered by time, oldest first. Empty is a valid series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    points: Vec<TimePoint>,
}

impl TimeSeries {
    pub fn new(mut points: Vec<TimePoint>) -> Self {
        points.sort_by_key(|p| p.time);
        Self { points }
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One `<option>` of a select control
#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectInput {
    pub name: String,
    pub display_text: String,
    pub options: Vec<SelectOption>,
}

impl SelectInput {
    pub fn new(name: &str, display_text: &str, options: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            display_text: display_text.to_string(),
            options: options
                .iter()
                .map(|(label, value)| SelectOption {
                    label: label.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Button {
    pub name: String,
    pub display_text: String,
    pub style: String,
}

impl Button {
    pub fn new(name: &str, display_text: &str) -> Self {
        Self {
            name: name.to_string(),
            display_text: display_text.to_string(),
            style: "default".to_string(),
        }
    }
}

/// Background tile layer; `style` picks a variant such as CartoDB's dark theme
#[derive(Debug, Clone, Serialize)]
pub struct Basemap {
    pub name: String,
    pub style: Option<String>,
}

impl Basemap {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            style: None,
        }
    }

    pub fn styled(name: &str, style: &str) -> Self {
        Self {
            name: name.to_string(),
            style: Some(style.to_string()),
        }
    }
}

/// Overlay served by an external WMS
#[derive(Debug, Clone, Serialize)]
pub struct MapLayer {
    pub source: String,
    pub url: String,
    pub params: BTreeMap<String, String>,
    pub server_type: String,
    pub legend_title: String,
    /// `url` with `params` embedded in the query string
    pub layer_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub projection: String,
    pub center: [f64; 2],
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub extent: [f64; 4],
    pub controls: Vec<String>,
    pub basemaps: Vec<Basemap>,
    /// Pan, Modify, Delete, Move and the Point/Polygon/Box draw tools
    pub draw_controls: Vec<String>,
    pub draw_initial: String,
    pub draw_output_format: String,
    pub layers: Vec<MapLayer>,
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_time_series_sorted_on_construction() {
        let series = TimeSeries::new(vec![
            TimePoint { time: at(15), value: 0.51 },
            TimePoint { time: at(1), value: 0.42 },
        ]);
        let times: Vec<_> = series.points().iter().map(|p| p.time).collect();
        assert_eq!(times, vec![at(1), at(15)]);
    }

    #[test]
    fn test_empty_time_series() {
        let series = TimeSeries::new(Vec::new());
        assert!(series.is_empty());
        assert_eq!(series.len(), 0);
    }

    #[test]
    fn test_reducer_parse_is_case_insensitive() {
        assert_eq!("Mean".parse::<Reducer>(), Ok(Reducer::Mean));
        assert_eq!(" max ".parse::<Reducer>(), Ok(Reducer::Max));
    }

    #[test]
    fn test_reducer_rejects_unknown() {
        let err = "mode".parse::<Reducer>().unwrap_err();
        assert!(err.contains("mode"));
    }
}
