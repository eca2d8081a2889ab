/// HTTP request handlers
use crate::config::AppConfig;
use crate::domain::{Button, Health, ImageCollectionForm, Reducer, SelectInput, TimeSeriesForm};
use crate::errors::{JsonOutcome, QueryError};
use crate::figure::Figure;
use crate::services::{home_page, DroughtService, HomePage};
use crate::utils::json_for_script;
use askama::Template;
use axum::{
    extract::{rejection::FormRejection, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

const FORM_ERROR_MESSAGE: &str = "The submitted form could not be read. Please try again.";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<DroughtService>,
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// Home page with the selection controls and map
pub async fn home(State(state): State<AppState>) -> Html<String> {
    let page = home_page(state.service.catalog(), &state.config.wms_url);
    Html(render_home(&page, &state.config.root_url))
}

/// Resolve a map layer URL for the submitted selection
pub async fn get_image_collection(
    State(state): State<AppState>,
    form: Result<Form<ImageCollectionForm>, FormRejection>,
) -> Result<Json<JsonOutcome>, QueryError> {
    let Form(form) = form.map_err(|e| {
        warn!("Unreadable image collection form: {}", e);
        QueryError::user_input(FORM_ERROR_MESSAGE)
    })?;
    debug!("POST: {:?}", form);

    let url = state.service.image_collection(&form).await?;

    Ok(Json(JsonOutcome {
        success: true,
        url: Some(url),
        error: None,
    }))
}

/// Plot fragment for the submitted selection and drawn area
pub async fn get_time_series_plot(
    State(state): State<AppState>,
    form: Result<Form<TimeSeriesForm>, FormRejection>,
) -> Html<String> {
    let outcome = match form {
        Ok(Form(form)) => {
            debug!("POST: {:?}", form);
            state.service.time_series_plot(&form).await
        }
        Err(e) => {
            warn!("Unreadable time series form: {}", e);
            Err(QueryError::user_input(FORM_ERROR_MESSAGE))
        }
    };

    match outcome {
        Ok(figure) => Html(render_plot(&figure)),
        Err(err) => {
            err.log();
            Html(render_plot_error(&err.user_message()))
        }
    }
}

/// Rejects requests that the authenticating proxy did not mark with a user
pub async fn require_login(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(header) = state.config.auth_header.as_deref() {
        let user = request
            .headers()
            .get(header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .unwrap_or_default();

        if user.is_empty() {
            debug!("Rejecting unauthenticated request to {}", request.uri().path());
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    next.run(request).await
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate<'a> {
    selects: [&'a SelectInput; 3],
    buttons: [&'a Button; 3],
    reducers: [Reducer; 5],
    root_url_json: String,
    ee_products_json: String,
    map_view_json: String,
}

#[derive(Template)]
#[template(path = "plot.html")]
struct PlotTemplate {
    figure_json: String,
}

#[derive(Template)]
#[template(path = "plot_error.html")]
struct PlotErrorTemplate<'a> {
    message: &'a str,
}

fn render<T: Template>(template: &T) -> String {
    template.render().unwrap_or_else(|e| {
        error!("Template rendering failed: {}", e);
        String::new()
    })
}

fn to_script_json<T: Serialize>(value: &T) -> String {
    json_for_script(&serde_json::to_value(value).unwrap_or_default())
}

fn render_home(page: &HomePage<'_>, root_url: &str) -> String {
    render(&HomeTemplate {
        selects: [&page.year_select, &page.month_select, &page.dekad_select],
        buttons: [&page.load_button, &page.clear_button, &page.plot_button],
        reducers: Reducer::ALL,
        root_url_json: to_script_json(&root_url),
        ee_products_json: to_script_json(page.ee_products),
        map_view_json: to_script_json(&page.map_view),
    })
}

fn render_plot(figure: &Figure) -> String {
    render(&PlotTemplate {
        figure_json: json_for_script(&figure.to_plotly()),
    })
}

fn render_plot_error(message: &str) -> String {
    render(&PlotErrorTemplate { message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductCatalog;
    use crate::domain::TimeSeries;
    use crate::figure::generate_figure;

    #[test]
    fn test_render_home_embeds_catalog_and_controls() {
        let catalog = ProductCatalog::builtin();
        let page = home_page(&catalog, crate::config::DEFAULT_WMS_URL);
        let html = render_home(&page, "/drought-watch");

        assert!(html.contains(r#"<select id="month" name="month""#));
        assert!(html.contains(r#"<option value="11">Dekad 2</option>"#));
        assert!(html.contains(r#"id="load_plot""#));
        assert!(html.contains("MODIS Terra NDVI (16-day)"));
        assert!(html.contains("EPSG:4326"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_render_plot_with_empty_series() {
        let figure = generate_figure("CHIRPS Daily Precipitation", &TimeSeries::default());
        let html = render_plot(&figure);
        assert!(html.contains(r#"data-success="true""#));
        assert!(html.contains("CHIRPS Daily Precipitation"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_render_home_wires_map_tools_from_view() {
        let catalog = ProductCatalog::builtin();
        let page = home_page(&catalog, crate::config::DEFAULT_WMS_URL);
        let html = render_home(&page, "/drought-watch");

        assert!(html.contains("view.draw_controls"));
        assert!(html.contains("view.draw_initial"));
        assert!(html.contains("view.basemaps"));
        assert!(html.contains("view.controls"));
        assert!(html.contains("createBox"));
        assert!(html.contains(r#""dark""#));
        assert!(html.contains("<title>East Africa Drought Watch</title>"));
    }

    #[test]
    fn test_catalog_text_is_not_treated_as_markup() {
        let catalog: ProductCatalog = serde_json::from_str(
            r#"{"ICPAC": {"CDI": {"display": "{{root_url}} </script><b>", "collection": "icpac/cdi"}}}"#,
        )
        .unwrap();
        let page = home_page(&catalog, crate::config::DEFAULT_WMS_URL);
        let html = render_home(&page, "/drought-watch");

        assert!(html.contains("{{root_url}}"));
        assert!(html.contains(r#"const ROOT_URL = "/drought-watch";"#));
        assert!(!html.contains("</script><b>"));
    }

    #[test]
    fn test_render_plot_error_escapes() {
        let html = render_plot_error("We're sorry, <b>no</b>");
        assert!(html.contains(r#"data-success="false""#));
        assert!(html.contains("&lt;b&gt;no&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }
}
