/// Product catalog: platform -> product -> metadata
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// A satellite product the dashboard can map or plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub display: String,
    pub collection: String,
    /// Band or index plotted by default; `None` means not plottable
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

/// Read-only after startup. Serialises as the nested mapping the page uses
/// for its cascading selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCatalog {
    platforms: BTreeMap<String, BTreeMap<String, Product>>,
}

impl ProductCatalog {
    /// Built-in products
    pub fn builtin() -> Self {
        let mut platforms = BTreeMap::new();

        platforms.insert(
            "MODIS".to_string(),
            products(vec![
                (
                    "NDVI",
                    product(
                        "MODIS Terra NDVI (16-day)",
                        "MODIS/061/MOD13Q1",
                        Some("NDVI"),
                        &[("scale_factor", json!(0.0001))],
                    ),
                ),
                (
                    "EVI",
                    product(
                        "MODIS Terra EVI (16-day)",
                        "MODIS/061/MOD13Q1",
                        Some("EVI"),
                        &[("scale_factor", json!(0.0001))],
                    ),
                ),
                (
                    "LST",
                    product(
                        "MODIS Land Surface Temperature (8-day)",
                        "MODIS/061/MOD11A2",
                        Some("LST_Day_1km"),
                        &[("scale_factor", json!(0.02)), ("units", json!("K"))],
                    ),
                ),
                (
                    "SR",
                    product(
                        "MODIS Terra Surface Reflectance",
                        "MODIS/061/MOD09GA",
                        None,
                        &[("bands", json!(["sur_refl_b01", "sur_refl_b04", "sur_refl_b03"]))],
                    ),
                ),
            ]),
        );

        platforms.insert(
            "CHIRPS".to_string(),
            products(vec![(
                "PRECIP",
                product(
                    "CHIRPS Daily Precipitation",
                    "UCSB-CHG/CHIRPS/DAILY",
                    Some("precipitation"),
                    &[("units", json!("mm/day"))],
                ),
            )]),
        );

        platforms.insert(
            "SENTINEL".to_string(),
            products(vec![(
                "S2_SR",
                product(
                    "Sentinel-2 Surface Reflectance",
                    "COPERNICUS/S2_SR_HARMONIZED",
                    None,
                    &[("bands", json!(["B4", "B3", "B2"]))],
                ),
            )]),
        );

        platforms.insert(
            "LANDSAT".to_string(),
            products(vec![(
                "L8_SR",
                product(
                    "Landsat 8 Surface Reflectance",
                    "LANDSAT/LC08/C02/T1_L2",
                    None,
                    &[("bands", json!(["SR_B4", "SR_B3", "SR_B2"]))],
                ),
            )]),
        );

        Self { platforms }
    }

    /// Load a catalog from a JSON file with the same nested shape
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading product catalog {}", path.display()))?;
        let catalog: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing product catalog {}", path.display()))?;
        if catalog.is_empty() {
            anyhow::bail!("product catalog {} has no products", path.display());
        }
        Ok(catalog)
    }

    pub fn get(&self, platform: &str, product: &str) -> Option<&Product> {
        self.platforms.get(platform)?.get(product)
    }

    /// All `(platform, product key, product)` entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Product)> {
        self.platforms.iter().flat_map(|(platform, products)| {
            products
                .iter()
                .map(move |(key, p)| (platform.as_str(), key.as_str(), p))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.values().all(BTreeMap::is_empty)
    }
}

fn product(display: &str, collection: &str, index: Option<&str>, params: &[(&str, Value)]) -> Product {
    Product {
        display: display.to_string(),
        collection: collection.to_string(),
        index: index.map(str::to_string),
        params: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    }
}

fn products(entries: Vec<(&str, Product)>) -> BTreeMap<String, Product> {
    entries
        .into_iter()
        .map(|(key, p)| (key.to_string(), p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let catalog = ProductCatalog::builtin();
        let ndvi = catalog.get("MODIS", "NDVI").unwrap();
        assert_eq!(ndvi.index.as_deref(), Some("NDVI"));
        assert!(catalog.get("MODIS", "nope").is_none());
        assert!(catalog.get("nope", "NDVI").is_none());
    }

    #[test]
    fn test_builtin_has_unplottable_products() {
        let catalog = ProductCatalog::builtin();
        assert!(catalog.iter().any(|(_, _, p)| p.index.is_none()));
        assert!(catalog.iter().any(|(_, _, p)| p.index.is_some()));
    }

    #[test]
    fn test_serialises_as_nested_mapping() {
        let catalog = ProductCatalog::builtin();
        let value = serde_json::to_value(&catalog).unwrap();
        assert_eq!(value["MODIS"]["NDVI"]["display"], "MODIS Terra NDVI (16-day)");
        assert!(value["SENTINEL"]["S2_SR"]["index"].is_null());
    }

    #[test]
    fn test_parse_from_json() {
        let raw = r#"{"ICPAC": {"CDI": {"display": "Combined Drought Indicator", "collection": "icpac/cdi"}}}"#;
        let catalog: ProductCatalog = serde_json::from_str(raw).unwrap();
        let cdi = catalog.get("ICPAC", "CDI").unwrap();
        assert!(cdi.index.is_none());
        assert!(cdi.params.is_empty());
        assert_eq!(catalog.iter().count(), 1);
    }
}
