/// Chart specification built from a time series
use crate::domain::TimeSeries;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub x: Vec<DateTime<Utc>>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Series,
}

impl Figure {
    pub fn with_value_label(mut self, label: &str) -> Self {
        self.y_label = label.to_string();
        self
    }

    /// Plotly figure JSON (`data` + `layout`)
    pub fn to_plotly(&self) -> Value {
        let x: Vec<String> = self
            .series
            .x
            .iter()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .collect();

        json!({
            "data": [{
                "type": "scatter",
                "mode": "lines+markers",
                "name": self.series.name,
                "x": x,
                "y": self.series.y,
            }],
            "layout": {
                "title": { "text": self.title },
                "xaxis": { "title": { "text": self.x_label } },
                "yaxis": { "title": { "text": self.y_label } },
                "margin": { "l": 50, "r": 20, "t": 40, "b": 40 },
                "showlegend": false,
            }
        })
    }
}

/// Build a single-series line chart. An empty series gives an empty chart.
pub fn generate_figure(figure_title: &str, time_series: &TimeSeries) -> Figure {
    let (x, y): (Vec<_>, Vec<_>) = time_series
        .points()
        .iter()
        .map(|p| (p.time, p.value))
        .unzip();

    Figure {
        title: figure_title.to_string(),
        x_label: "Date".to_string(),
        y_label: "Value".to_string(),
        series: Series {
            name: figure_title.to_string(),
            x,
            y,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimePoint;
    use chrono::TimeZone;

    #[test]
    fn test_empty_series_gives_empty_chart() {
        let figure = generate_figure("Nothing", &TimeSeries::default());
        assert!(figure.series.x.is_empty());
        assert!(figure.series.y.is_empty());

        let plotly = figure.to_plotly();
        assert_eq!(plotly["data"][0]["x"].as_array().unwrap().len(), 0);
        assert_eq!(plotly["layout"]["title"]["text"], "Nothing");
    }

    #[test]
    fn test_points_keep_order() {
        let t1 = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2022, 1, 15, 0, 0, 0).unwrap();
        let series = TimeSeries::new(vec![
            TimePoint { time: t1, value: 0.42 },
            TimePoint { time: t2, value: 0.51 },
        ]);

        let figure = generate_figure("NDVI", &series).with_value_label("NDVI");
        assert_eq!(figure.series.x, vec![t1, t2]);
        assert_eq!(figure.series.y, vec![0.42, 0.51]);
        assert_eq!(figure.y_label, "NDVI");

        let plotly = figure.to_plotly();
        assert_eq!(plotly["data"][0]["x"][0], "2022-01-01 00:00:00");
        assert_eq!(plotly["layout"]["yaxis"]["title"]["text"], "NDVI");
    }
}
