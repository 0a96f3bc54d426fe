//! Read-only reference data: product pages, storefronts, devices, geography
//! and rejection reasons.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::{Value, json};

use super::{Client, parse_object, parse_rows, sorted_by};
use crate::Result;
use crate::normalize::extract_data_items;
use crate::types::{
    AdRejection, CountryOrRegion, DeviceSizeMapping, GeoEntity, ProductPage, ProductPageLocale,
};

#[derive(Serialize)]
struct GeoQuery<'query> {
    query: &'query str,
    #[serde(skip_serializing_if = "Option::is_none")]
    countrycode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity: Option<&'query str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
pub(crate) fn escape_segment(raw: &str) -> String {
    raw.trim().bytes().fold(String::new(), |mut out, b| {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "%{b:02X}");
        }
        out
    })
}

/// Device listings arrive bare, under `items`, or in the usual envelopes.
fn device_rows(payload: &Value) -> Vec<&Value> {
    match payload["items"].as_array() {
        Some(items) => items.iter().collect(),
        None => extract_data_items(payload),
    }
}

impl Client {
    /// Custom product pages of an app, sorted by id.
    pub async fn product_pages(&self, adam_id: i64) -> Result<Vec<ProductPage>> {
        let payload = self.get(&format!("apps/{adam_id}/product-pages")).await?;
        let pages = parse_rows(&payload, ProductPage::from_json);
        Ok(sorted_by(pages, |p| p.id.clone()))
    }

    pub async fn product_page(&self, adam_id: i64, product_page_id: &str) -> Result<ProductPage> {
        let payload = self
            .get(&format!(
                "apps/{adam_id}/product-pages/{}",
                escape_segment(product_page_id)
            ))
            .await?;
        parse_object(&payload, "product page", ProductPage::from_json)
    }

    /// Localized details of a product page, sorted by language code.
    pub async fn product_page_locales(
        &self,
        adam_id: i64,
        product_page_id: &str,
        expand: bool,
    ) -> Result<Vec<ProductPageLocale>> {
        let mut target = format!(
            "apps/{adam_id}/product-pages/{}/locale-details",
            escape_segment(product_page_id)
        );
        if expand {
            target.push_str("?expand=true");
        }
        let payload = self.get(&target).await?;
        let locales = parse_rows(&payload, ProductPageLocale::from_json);
        Ok(sorted_by(locales, |l| l.sort_key().to_owned()))
    }

    /// Storefronts ads can run in, sorted by code.
    pub async fn countries_or_regions(&self) -> Result<Vec<CountryOrRegion>> {
        let payload = self.get("countries-or-regions").await?;
        let countries = parse_rows(&payload, CountryOrRegion::from_json);
        Ok(sorted_by(countries, |c| c.code.clone()))
    }

    pub async fn creative_app_mapping_devices(&self) -> Result<Vec<DeviceSizeMapping>> {
        let payload = self.get("creativeappmappings/devices").await?;
        let devices = device_rows(&payload)
            .into_iter()
            .filter_map(DeviceSizeMapping::from_json)
            .collect();
        Ok(sorted_by(devices, |d| d.sort_key().to_owned()))
    }

    /// Geographic targeting entities matching `query`, sorted by display name.
    pub async fn search_geo(
        &self,
        query: &str,
        country_code: Option<&str>,
        entity: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<GeoEntity>> {
        let params = serde_html_form::to_string(GeoQuery {
            query: query.trim(),
            countrycode: country_code
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty()),
            entity: entity.map(str::trim).filter(|e| !e.is_empty()),
            limit: limit.filter(|l| *l > 0),
        })?;

        let payload = self.get(&format!("search/geo?{params}")).await?;
        let entities = parse_rows(&payload, GeoEntity::from_json);
        Ok(sorted_by(entities, |g| g.display_name.clone()))
    }

    /// Raw geo record. Non-object payloads are wrapped as `{"data": …}`.
    pub async fn geo_data(&self, geo_id: &str) -> Result<Value> {
        let params = serde_html_form::to_string([("geoId", geo_id.trim())])?;
        let payload = self.get(&format!("geodata?{params}")).await?;
        match payload.as_object() {
            Some(map) if !map.is_empty() => Ok(payload),
            _ => Ok(json!({"data": payload})),
        }
    }

    /// Product page rejection reasons matching `selector`, sorted by id.
    pub async fn find_ad_rejections(&self, selector: Value) -> Result<Vec<AdRejection>> {
        let payload = self.post("product-page-reasons/find", selector).await?;
        Ok(sorted_by(parse_rows(&payload, AdRejection::from_json), |r| r.id))
    }

    pub async fn ad_rejection(&self, reason_id: i64) -> Result<AdRejection> {
        let payload = self
            .get(&format!("product-page-reasons/{reason_id}"))
            .await?;
        parse_object(&payload, "ad rejection", AdRejection::from_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_escaping() {
        assert_eq!(escape_segment(" 45812c9b-c296 "), "45812c9b-c296");
        assert_eq!(escape_segment("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn device_rows_accept_every_shape() {
        let bare = json!([{"deviceClass": "iphone"}]);
        let items = json!({"items": [{"deviceClass": "ipad"}, {"deviceClass": "mac"}]});
        let data = json!({"data": [{"deviceClass": "iphone"}]});
        assert_eq!(device_rows(&bare).len(), 1);
        assert_eq!(device_rows(&items).len(), 2);
        assert_eq!(device_rows(&data).len(), 1);
    }

    #[test]
    fn geo_query_omits_blank_filters() {
        let params = serde_html_form::to_string(GeoQuery {
            query: "san francisco",
            countrycode: Some("US".to_owned()),
            entity: None,
            limit: None,
        })
        .expect("encode");
        assert_eq!(params, "query=san+francisco&countrycode=US");
    }
}
