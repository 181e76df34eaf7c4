//! `query_property_database`: search over the 100Gaj listings catalog.
//!
//! The full catalog is fetched once from the property API and kept in memory;
//! filtering happens locally. A failed fetch is not cached, so the next search
//! retries.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use gajchat_core::config::PropertyApiConfig;

use super::Tool;
use crate::types::ToolDefinition;

pub const TOOL_NAME: &str = "query_property_database";

const TOOL_DESCRIPTION: &str = "Use this to find and list properties. You can filter by `city`, `listing_type` (sale/rent), and `property_type`.";

pub const DATABASE_UNAVAILABLE: &str =
    "I apologize, but I'm unable to access the property database at the moment.";

pub const NO_MATCHES: &str = "I could not find any properties matching your criteria. Try searching in other nearby areas or adjusting your search criteria.";

const MAX_RESULTS: usize = 5;

// ─── Catalog records ────────────────────────────────────────────────────────
// The listings API is loosely typed: numbers sometimes arrive as strings and
// most fields may be missing, so scalar fields stay as raw JSON values.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub title: Option<String>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub price: Value,
    pub property_type: Option<String>,
    pub listing_type: Option<String>,
    #[serde(default)]
    pub bedrooms: Value,
    #[serde(default)]
    pub bathrooms: Value,
    #[serde(default)]
    pub area: Value,
    #[serde(default)]
    pub furnished: Value,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub owner_details: Option<OwnerDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OwnerDetails {
    pub name: Option<String>,
    pub phone: Value,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    success: bool,
    properties: Option<Vec<Value>>,
}

// ─── Query ──────────────────────────────────────────────────────────────────

/// `listing_type` arrives either as a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ListingTypeFilter {
    One(String),
    Many(Vec<String>),
}

impl ListingTypeFilter {
    /// Lowercased wanted types, with "buy" meaning "sale".
    fn normalized(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            Self::One(s) => vec![s.as_str()],
            Self::Many(list) => list.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(|s| s.trim().to_lowercase().replace("buy", "sale"))
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PropertyQuery {
    pub city: Option<String>,
    pub listing_type: Option<ListingTypeFilter>,
    pub property_type: Option<String>,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn lower(s: &Option<String>) -> String {
    s.as_deref().unwrap_or("").to_lowercase()
}

/// Apply the query's filters in order: city, listing type, property type.
pub fn filter_properties<'a>(properties: &'a [Property], query: &PropertyQuery) -> Vec<&'a Property> {
    let mut results: Vec<&Property> = properties.iter().collect();

    if let Some(city) = non_empty(&query.city) {
        let city = city.to_lowercase();
        let mut terms = vec![city.clone()];
        if city == "gurgaon" {
            terms.push("gurugram".to_string());
        }
        results.retain(|p| {
            let fields = [
                lower(&p.address.city),
                lower(&p.address.state),
                lower(&p.address.street),
            ];
            terms
                .iter()
                .any(|term| fields.iter().any(|f| f.contains(term.as_str())))
        });
    }

    if let Some(filter) = &query.listing_type {
        let wanted = filter.normalized();
        if !wanted.is_empty() {
            results.retain(|p| wanted.contains(&lower(&p.listing_type)));
        }
    }

    if let Some(property_type) = non_empty(&query.property_type) {
        let property_type = property_type.to_lowercase();
        results.retain(|p| lower(&p.property_type) == property_type);
    }

    results
}

// ─── Formatting ─────────────────────────────────────────────────────────────

/// `₹X.XX Crores` from one crore up, `₹X.XX Lakhs` below; non-numeric verbatim.
pub fn format_price(price: &Value) -> String {
    match price {
        Value::Number(n) => match n.as_f64() {
            Some(v) if v >= 10_000_000.0 => format!("₹{:.2} Crores", v / 10_000_000.0),
            Some(v) => format!("₹{:.2} Lakhs", v / 100_000.0),
            None => n.to_string(),
        },
        other => display_value(other),
    }
}

fn display_value(v: &Value) -> String {
    match v {
        Value::Null => "N/A".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// One listing as a human-readable block.
pub fn format_property(prop: &Property) -> String {
    let location_parts: Vec<&str> = [&prop.address.street, &prop.address.city, &prop.address.state]
        .into_iter()
        .filter_map(non_empty)
        .collect();
    let location = if location_parts.is_empty() {
        "Location not specified".to_string()
    } else {
        location_parts.join(", ")
    };

    let mut lines = vec![
        "\n🏠 Property Details:".to_string(),
        format!("Title: {}", prop.title.as_deref().unwrap_or("N/A")),
        format!("Location: {}", location),
        format!("Price: {}", format_price(&prop.price)),
        format!(
            "Type: {}",
            prop.property_type
                .as_deref()
                .map(capitalize)
                .unwrap_or_else(|| "N/A".to_string())
        ),
        format!(
            "Configuration: {} BHK, {} Bath",
            display_value(&prop.bedrooms),
            display_value(&prop.bathrooms)
        ),
        format!("Area: {} sq ft", display_value(&prop.area)),
        format!(
            "Status: {}",
            if is_truthy(&prop.furnished) {
                "Furnished"
            } else {
                "Unfurnished"
            }
        ),
        format!(
            "Available for: {}",
            prop.listing_type
                .as_deref()
                .map(str::to_uppercase)
                .unwrap_or_else(|| "N/A".to_string())
        ),
    ];

    if !prop.amenities.is_empty() {
        lines.push(format!("Amenities: {}", prop.amenities.join(", ")));
    }

    if let Some(owner) = &prop.owner_details {
        if let Some(name) = non_empty(&owner.name) {
            lines.push("\n📞 Contact Information:".to_string());
            lines.push(format!("Owner: {}", name));
            lines.push(format!("Phone: {}", display_value(&owner.phone)));
        }
    }

    lines.join("\n")
}

/// Up to five listings separated by `---`, or the no-match message.
pub fn format_results(results: &[&Property]) -> String {
    if results.is_empty() {
        return NO_MATCHES.to_string();
    }
    let blocks: Vec<String> = results
        .iter()
        .take(MAX_RESULTS)
        .map(|p| format_property(p))
        .collect();
    format!("\n\n{}", blocks.join("\n\n---\n\n"))
}

// ─── Catalog ────────────────────────────────────────────────────────────────

/// In-memory copy of the listings API, loaded on first use.
#[derive(Debug)]
pub struct PropertyCatalog {
    http: reqwest::Client,
    api_url: String,
    cache: OnceCell<Arc<Vec<Property>>>,
}

impl PropertyCatalog {
    pub fn new(api_url: &str, fetch_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .context("Failed to build property API client")?;
        Ok(Self {
            http,
            api_url: api_url.to_string(),
            cache: OnceCell::new(),
        })
    }

    pub fn from_config(config: &PropertyApiConfig) -> Result<Self> {
        Self::new(&config.api_url, config.fetch_timeout)
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.initialized()
    }

    /// Cached listings, fetching them on first call.
    pub async fn load(&self) -> Result<Arc<Vec<Property>>> {
        self.cache
            .get_or_try_init(|| async { self.fetch().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Fetch at startup so the first chat request does not pay for it.
    pub async fn warm(&self) -> Result<usize> {
        let properties = self.load().await?;
        tracing::info!(count = properties.len(), "property catalog loaded");
        Ok(properties.len())
    }

    async fn fetch(&self) -> Result<Vec<Property>> {
        tracing::info!(url = %self.api_url, "fetching property catalog");
        let resp = self
            .http
            .get(&self.api_url)
            .send()
            .await
            .context("Property API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Property API error ({})", status);
        }

        let body: CatalogResponse = resp
            .json()
            .await
            .context("Failed to parse property API response")?;
        let raw = match (body.success, body.properties) {
            (true, Some(list)) => list,
            _ => anyhow::bail!("Property API reported no data"),
        };

        let total = raw.len();
        let properties: Vec<Property> = raw
            .into_iter()
            .filter_map(|v| match serde_json::from_value(v) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed property record");
                    None
                }
            })
            .collect();
        if properties.len() < total {
            tracing::warn!(kept = properties.len(), total, "some property records were skipped");
        }
        Ok(properties)
    }

    /// Run a query against the catalog and format the answer for the model.
    pub async fn search(&self, query: &PropertyQuery) -> String {
        let properties = match self.load().await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = ?e, "property catalog unavailable");
                return DATABASE_UNAVAILABLE.to_string();
            }
        };
        if properties.is_empty() {
            return DATABASE_UNAVAILABLE.to_string();
        }

        let results = filter_properties(&properties, query);
        tracing::debug!(?query, matches = results.len(), "property search");
        format_results(&results)
    }
}

// ─── Tool ───────────────────────────────────────────────────────────────────

pub struct PropertySearchTool {
    catalog: Arc<PropertyCatalog>,
}

impl PropertySearchTool {
    pub fn new(catalog: Arc<PropertyCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for PropertySearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            TOOL_NAME,
            TOOL_DESCRIPTION,
            json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "City, state or locality to search in, e.g. Delhi or Gurgaon"
                    },
                    "listing_type": {
                        "type": "string",
                        "description": "sale or rent"
                    },
                    "property_type": {
                        "type": "string",
                        "description": "e.g. apartment, villa, house"
                    }
                }
            }),
        )
    }

    async fn call(&self, args: &Value) -> Result<String> {
        let query: PropertyQuery = serde_json::from_value(args.clone())
            .context("Invalid query_property_database arguments")?;
        Ok(self.catalog.search(&query).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_json() -> Value {
        json!([
            {
                "title": "Sunrise Villa",
                "address": {"street": "DLF Phase 2", "city": "Gurugram", "state": "Haryana"},
                "price": 25000000,
                "propertyType": "villa",
                "listingType": "sale",
                "bedrooms": 4,
                "bathrooms": 3,
                "area": 3200,
                "furnished": true,
                "amenities": ["Pool", "Garden"],
                "ownerDetails": {"name": "Asha", "phone": "9999900000"}
            },
            {
                "title": "Lajpat Flat",
                "address": {"street": "Lajpat Nagar", "city": "Delhi", "state": "Delhi"},
                "price": 4500000,
                "propertyType": "Apartment",
                "listingType": "rent",
                "bedrooms": "2",
                "furnished": false
            },
            {
                "title": "Bandra Heights",
                "address": {"city": "Mumbai", "state": "Maharashtra"},
                "price": "Price on request",
                "propertyType": "apartment",
                "listingType": "SALE"
            }
        ])
    }

    fn sample() -> Vec<Property> {
        serde_json::from_value(sample_json()).unwrap()
    }

    fn titles(results: &[&Property]) -> Vec<String> {
        results.iter().map(|p| p.title.clone().unwrap_or_default()).collect()
    }

    #[test]
    fn test_city_filter_matches_gurgaon_alias() {
        let props = sample();
        let q = PropertyQuery {
            city: Some("Gurgaon".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(&filter_properties(&props, &q)), vec!["Sunrise Villa"]);
    }

    #[test]
    fn test_city_filter_matches_state_and_street() {
        let props = sample();
        let q = PropertyQuery {
            city: Some("  maharashtra ".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(&filter_properties(&props, &q)), vec!["Bandra Heights"]);

        let q = PropertyQuery {
            city: Some("lajpat".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(&filter_properties(&props, &q)), vec!["Lajpat Flat"]);
    }

    #[test]
    fn test_listing_type_buy_means_sale() {
        let props = sample();
        let q = PropertyQuery {
            listing_type: Some(ListingTypeFilter::One("Buy".to_string())),
            ..Default::default()
        };
        assert_eq!(
            titles(&filter_properties(&props, &q)),
            vec!["Sunrise Villa", "Bandra Heights"]
        );
    }

    #[test]
    fn test_listing_type_accepts_list() {
        let props = sample();
        let q: PropertyQuery =
            serde_json::from_value(json!({"listing_type": ["rent", "sale"]})).unwrap();
        assert_eq!(filter_properties(&props, &q).len(), 3);
    }

    #[test]
    fn test_property_type_is_exact_case_insensitive() {
        let props = sample();
        let q = PropertyQuery {
            property_type: Some("APARTMENT".to_string()),
            ..Default::default()
        };
        assert_eq!(
            titles(&filter_properties(&props, &q)),
            vec!["Lajpat Flat", "Bandra Heights"]
        );

        let q = PropertyQuery {
            property_type: Some("apart".to_string()),
            ..Default::default()
        };
        assert!(filter_properties(&props, &q).is_empty());
    }

    #[test]
    fn test_empty_filters_are_ignored() {
        let props = sample();
        let q: PropertyQuery = serde_json::from_value(json!({"city": "", "property_type": null})).unwrap();
        assert_eq!(filter_properties(&props, &q).len(), 3);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(&json!(25000000)), "₹2.50 Crores");
        assert_eq!(format_price(&json!(10000000)), "₹1.00 Crores");
        assert_eq!(format_price(&json!(4500000)), "₹45.00 Lakhs");
        assert_eq!(format_price(&json!(0)), "₹0.00 Lakhs");
        assert_eq!(format_price(&json!("Price on request")), "Price on request");
        assert_eq!(format_price(&Value::Null), "N/A");
    }

    #[test]
    fn test_format_property_full_record() {
        let props = sample();
        let text = format_property(&props[0]);
        assert!(text.starts_with("\n🏠 Property Details:"));
        assert!(text.contains("Title: Sunrise Villa"));
        assert!(text.contains("Location: DLF Phase 2, Gurugram, Haryana"));
        assert!(text.contains("Price: ₹2.50 Crores"));
        assert!(text.contains("Type: Villa"));
        assert!(text.contains("Configuration: 4 BHK, 3 Bath"));
        assert!(text.contains("Area: 3200 sq ft"));
        assert!(text.contains("Status: Furnished"));
        assert!(text.contains("Available for: SALE"));
        assert!(text.contains("Amenities: Pool, Garden"));
        assert!(text.contains("Owner: Asha"));
        assert!(text.contains("Phone: 9999900000"));
    }

    #[test]
    fn test_format_property_sparse_record() {
        let props = sample();
        let text = format_property(&props[1]);
        assert!(text.contains("Configuration: 2 BHK, N/A Bath"));
        assert!(text.contains("Area: N/A sq ft"));
        assert!(text.contains("Status: Unfurnished"));
        assert!(text.contains("Available for: RENT"));
        assert!(!text.contains("Amenities:"));
        assert!(!text.contains("Contact Information"));

        let empty = Property::default();
        assert!(format_property(&empty).contains("Location: Location not specified"));
    }

    #[test]
    fn test_format_results_caps_and_separates() {
        let one = sample().remove(0);
        let many: Vec<Property> = (0..7).map(|_| one.clone()).collect();
        let refs: Vec<&Property> = many.iter().collect();
        let text = format_results(&refs);
        assert!(text.starts_with("\n\n"));
        assert_eq!(text.matches("Property Details:").count(), 5);
        assert_eq!(text.matches("\n\n---\n\n").count(), 4);

        assert_eq!(format_results(&[]), NO_MATCHES);
    }

    #[tokio::test]
    async fn test_catalog_fetches_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/properties"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "properties": sample_json()})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/api/properties", server.uri());
        let catalog = PropertyCatalog::new(&url, Duration::from_secs(5)).unwrap();
        assert!(!catalog.is_loaded());
        assert_eq!(catalog.warm().await.unwrap(), 3);
        assert!(catalog.is_loaded());

        let out = catalog
            .search(&PropertyQuery {
                city: Some("delhi".to_string()),
                ..Default::default()
            })
            .await;
        assert!(out.contains("Lajpat Flat"));
        let out = catalog
            .search(&PropertyQuery {
                city: Some("Chennai".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(out, NO_MATCHES);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "properties": sample_json()})),
            )
            .mount(&server)
            .await;

        let catalog = PropertyCatalog::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let out = catalog.search(&PropertyQuery::default()).await;
        assert_eq!(out, DATABASE_UNAVAILABLE);
        assert!(!catalog.is_loaded());

        let out = catalog.search(&PropertyQuery::default()).await;
        assert_eq!(out.matches("Property Details:").count(), 3);
    }

    #[tokio::test]
    async fn test_unsuccessful_payload_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": false, "properties": []})),
            )
            .mount(&server)
            .await;

        let catalog = PropertyCatalog::new(&server.uri(), Duration::from_secs(5)).unwrap();
        assert!(catalog.warm().await.is_err());
        assert_eq!(catalog.search(&PropertyQuery::default()).await, DATABASE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_tool_rejects_wrong_argument_types() {
        let catalog = Arc::new(PropertyCatalog::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap());
        let tool = PropertySearchTool::new(catalog);
        assert_eq!(tool.definition().function.name, TOOL_NAME);
        assert!(tool.call(&json!({"city": 42})).await.is_err());
    }
}
