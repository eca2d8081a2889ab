/// Business logic services layer
use crate::catalog::{Product, ProductCatalog};
use crate::clients::QueryService;
use crate::domain::{
    Basemap, Button, ImageCollectionForm, ImageLayerQuery, MapLayer, MapView, Reducer, SelectInput,
    TimeSeriesForm, TimeSeriesQuery,
};
use crate::errors::{QueryError, QueryResult, DRAW_AREA_MESSAGE};
use crate::figure::{generate_figure, Figure};
use chrono::NaiveDate;
use geojson::GeoJson;
use reqwest::Url;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sample scale used when the form does not give one
pub const DEFAULT_SCALE: f64 = 250.0;

/// Resolves form selections against the catalog and runs them through the
/// query service
pub struct DroughtService {
    catalog: Arc<ProductCatalog>,
    query_service: Arc<dyn QueryService>,
}

impl DroughtService {
    pub fn new(catalog: Arc<ProductCatalog>, query_service: Arc<dyn QueryService>) -> Self {
        Self {
            catalog,
            query_service,
        }
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Map layer URL for the selected product and period
    pub async fn image_collection(&self, form: &ImageCollectionForm) -> QueryResult<String> {
        let (query, _) = self.layer_query(form)?;
        let url = self.query_service.resolve_image_layer(&query).await?;
        debug!("Image Collection URL: {}", url);
        Ok(url)
    }

    /// Chart of the product's index reduced over the drawn geometry
    pub async fn time_series_plot(&self, form: &TimeSeriesForm) -> QueryResult<Figure> {
        let scale = parse_scale(form.scale.as_deref())?;
        let (layer, product) = self.layer_query(&form.layer)?;
        let index_name = resolve_index(product, form.index_name.as_deref())?;
        let geometry = parse_geometry(form.geometry.as_deref())?;

        let query = TimeSeriesQuery {
            layer,
            index_name,
            scale,
            geometry,
        };
        let time_series = self.query_service.time_series(&query).await?;
        if time_series.is_empty() {
            debug!("Time Series: no observations in range");
        } else {
            debug!("Time Series: {} points", time_series.len());
        }

        Ok(generate_figure(&product.display, &time_series).with_value_label(&query.index_name))
    }

    /// Validate the shared fields and look the product up
    fn layer_query(&self, form: &ImageCollectionForm) -> QueryResult<(ImageLayerQuery, &Product)> {
        let date_from = parse_date("start", form.start_date.as_deref())?;
        let date_to = parse_date("end", form.end_date.as_deref())?;
        if let (Some(from), Some(to)) = (date_from, date_to) {
            if from > to {
                return Err(QueryError::user_input(
                    "The start date must not be after the end date.",
                ));
            }
        }

        let reducer = match non_blank(form.reducer.as_deref()) {
            Some(s) => Some(s.parse::<Reducer>().map_err(QueryError::UserInput)?),
            None => None,
        };

        let (platform, product_key) =
            match (non_blank(form.platform.as_deref()), non_blank(form.product.as_deref())) {
                (Some(platform), Some(product)) => (platform, product),
                _ => {
                    return Err(QueryError::user_input(
                        "Please select a platform and a product.",
                    ))
                }
            };

        let product = self.catalog.get(platform, product_key).ok_or_else(|| {
            QueryError::UnknownProduct {
                platform: platform.to_string(),
                product: product_key.to_string(),
            }
        })?;

        let query = ImageLayerQuery {
            platform: platform.to_string(),
            product: product_key.to_string(),
            collection: product.collection.clone(),
            params: product.params.clone(),
            date_from,
            date_to,
            reducer,
        };
        Ok((query, product))
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(which: &str, raw: Option<&str>) -> QueryResult<Option<NaiveDate>> {
    match non_blank(raw) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Some).map_err(|_| {
            QueryError::UserInput(format!(
                "Invalid {which} date \"{s}\". Please use the YYYY-MM-DD format."
            ))
        }),
    }
}

fn parse_scale(raw: Option<&str>) -> QueryResult<f64> {
    let Some(s) = non_blank(raw) else {
        return Ok(DEFAULT_SCALE);
    };
    match s.parse::<f64>() {
        Ok(scale) if scale.is_finite() && scale > 0.0 => Ok(scale),
        _ => Err(QueryError::UserInput(format!(
            "Invalid scale \"{s}\". Scale must be a positive number."
        ))),
    }
}

/// Explicit index wins; otherwise the product's default
fn resolve_index(product: &Product, requested: Option<&str>) -> QueryResult<String> {
    non_blank(requested)
        .map(str::to_string)
        .or_else(|| product.index.clone())
        .ok_or_else(|| {
            QueryError::UserInput(format!(
                "We're sorry, but plotting {} is not supported at this time. Please select a different product.",
                product.display
            ))
        })
}

fn parse_geometry(raw: Option<&str>) -> QueryResult<GeoJson> {
    non_blank(raw)
        .and_then(|s| s.parse::<GeoJson>().ok())
        .ok_or_else(|| QueryError::user_input(DRAW_AREA_MESSAGE))
}

/// Everything the home page needs to draw its controls and map
#[derive(Debug, Serialize)]
pub struct HomePage<'a> {
    pub year_select: SelectInput,
    pub month_select: SelectInput,
    pub dekad_select: SelectInput,
    pub load_button: Button,
    pub clear_button: Button,
    pub plot_button: Button,
    pub ee_products: &'a ProductCatalog,
    pub map_view: MapView,
}

pub const DEFAULT_YEAR: &str = "2022";
pub const DEFAULT_MONTH: &str = "01";
pub const DEFAULT_DEKAD: &str = "01";

/// Build the home page description. Performs no queries.
pub fn home_page<'a>(catalog: &'a ProductCatalog, wms_url: &str) -> HomePage<'a> {
    let year_select = SelectInput::new("year", "Year", &[("2022", "2022")]);

    let month_select = SelectInput::new(
        "month",
        "Month",
        &[
            ("Jan", "01"),
            ("Feb", "02"),
            ("Mar", "03"),
            ("Apr", "04"),
            ("May", "05"),
            ("Jun", "06"),
            ("Jul", "07"),
            ("Aug", "08"),
            ("Sep", "09"),
            ("Oct", "10"),
            ("Nov", "11"),
            ("Dec", "12"),
        ],
    );

    let dekad_select = SelectInput::new(
        "dekad",
        "Dekad",
        &[("Dekad 1", "01"), ("Dekad 2", "11"), ("Dekad 3", "21")],
    );

    HomePage {
        year_select,
        month_select,
        dekad_select,
        load_button: Button::new("load_map", "Load"),
        clear_button: Button::new("clear_map", "Clear"),
        plot_button: Button::new("load_plot", "Plot"),
        ee_products: catalog,
        map_view: map_view(wms_url),
    }
}

fn map_view(wms_url: &str) -> MapView {
    MapView {
        projection: "EPSG:4326".to_string(),
        center: [37.880859, 0.219726],
        zoom: 4,
        min_zoom: 2,
        max_zoom: 18,
        extent: [29.25, -4.75, 46.25, 5.2],
        controls: ["ZoomSlider", "Rotate", "FullScreen", "ZoomToExtent"]
            .into_iter()
            .map(String::from)
            .collect(),
        basemaps: vec![
            Basemap::new("CartoDB"),
            Basemap::styled("CartoDB", "dark"),
            Basemap::new("OpenStreetMap"),
            Basemap::new("Stamen"),
            Basemap::new("ESRI"),
        ],
        draw_controls: ["Pan", "Modify", "Delete", "Move", "Point", "Polygon", "Box"]
            .into_iter()
            .map(String::from)
            .collect(),
        draw_initial: "Pan".to_string(),
        draw_output_format: "GeoJSON".to_string(),
        layers: vec![cdi_layer(wms_url, DEFAULT_YEAR, DEFAULT_MONTH, DEFAULT_DEKAD)],
    }
}

/// Combined Drought Indicator overlay for one dekad
pub fn cdi_layer(wms_url: &str, year: &str, month: &str, dekad: &str) -> MapLayer {
    let params: BTreeMap<String, String> = [
        ("LAYERS", "cdi_chirps"),
        ("MAP", "mukau"),
        ("VERSION", "1.1.1"),
        ("SELECTED_YEAR", year),
        ("SELECTED_MONTH", month),
        ("SELECTED_TENDAYS", dekad),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let layer_url = match Url::parse_with_params(wms_url, params.iter()) {
        Ok(url) => url.to_string(),
        Err(e) => {
            warn!("WMS url {} is not a valid URL: {}", wms_url, e);
            wms_url.to_string()
        }
    };

    MapLayer {
        source: "ImageWMS".to_string(),
        url: wms_url.to_string(),
        params,
        server_type: "mapserver".to_string(),
        legend_title: "Combined Drought Indicator".to_string(),
        layer_url,
    }
}
