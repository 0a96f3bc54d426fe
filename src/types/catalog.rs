use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;

use super::{Identified, positive};
use crate::normalize::{first_non_empty, int_from, opt_string, text, upper};

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub id: String,
    pub adam_id: i64,
    pub name: String,
    pub state: String,
    pub deep_link: Option<String>,
    pub creation_time: Option<String>,
    pub modification_time: Option<String>,
}

impl ProductPage {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        let id = opt_string(&row["id"])?;
        Some(Self {
            name: first_non_empty([&row["name"]]).unwrap_or_else(|| format!("Product Page {id}")),
            adam_id: int_from(&row["adamId"]),
            state: upper(&row["state"]),
            deep_link: opt_string(&row["deepLink"]),
            creation_time: opt_string(&row["creationTime"]),
            modification_time: opt_string(&row["modificationTime"]),
            id,
        })
    }
}

impl Identified for ProductPage {
    type Id = String;

    fn identity(&self) -> String {
        self.id.clone()
    }
}

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPageLocale {
    pub adam_id: i64,
    pub product_page_id: String,
    pub language: String,
    pub language_code: String,
    pub app_name: String,
    pub sub_title: Option<String>,
    pub short_description: Option<String>,
    pub promotional_text: Option<String>,
}

impl ProductPageLocale {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        let language_code = text(&row["languageCode"]);
        let language = text(&row["language"]);
        let product_page_id = text(&row["productPageId"]);
        if language_code.is_empty() && language.is_empty() && product_page_id.is_empty() {
            return None;
        }
        Some(Self {
            adam_id: int_from(&row["adamId"]),
            product_page_id,
            language,
            language_code,
            app_name: text(&row["appName"]),
            sub_title: opt_string(&row["subTitle"]),
            short_description: opt_string(&row["shortDescription"]),
            promotional_text: opt_string(&row["promotionalText"]),
        })
    }

    /// Ordering key: language code, then language name.
    #[must_use]
    pub fn sort_key(&self) -> &str {
        if self.language_code.is_empty() {
            &self.language
        } else {
            &self.language_code
        }
    }
}

impl Identified for ProductPageLocale {
    type Id = (String, String);

    fn identity(&self) -> Self::Id {
        (self.product_page_id.clone(), self.sort_key().to_owned())
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryOrRegion {
    pub code: String,
    pub display_name: String,
}

impl CountryOrRegion {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        let code = upper(&row["code"]);
        if code.is_empty() {
            return None;
        }
        Some(Self {
            code,
            display_name: first_non_empty([&row["displayName"], &row["name"]]).unwrap_or_default(),
        })
    }
}

impl Identified for CountryOrRegion {
    type Id = String;

    fn identity(&self) -> String {
        self.code.clone()
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSizeMapping {
    pub device_class: String,
    pub display_name: String,
}

impl DeviceSizeMapping {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        if row.as_object().is_none_or(serde_json::Map::is_empty) {
            return None;
        }
        let device_class =
            first_non_empty([&row["deviceClass"], &row["appPreviewDevice"], &row["id"]])
                .unwrap_or_default();
        let display_name = first_non_empty([&row["displayName"], &row["name"]])
            .unwrap_or_else(|| device_class.clone());
        if device_class.is_empty() && display_name.is_empty() {
            return None;
        }
        Some(Self {
            device_class,
            display_name,
        })
    }

    #[must_use]
    pub fn sort_key(&self) -> &str {
        if self.device_class.is_empty() {
            &self.display_name
        } else {
            &self.device_class
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoEntity {
    pub id: String,
    pub display_name: String,
    pub entity: String,
    pub country_code: String,
}

impl GeoEntity {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        let id = first_non_empty([&row["id"], &row["geoId"]]).unwrap_or_default();
        let display_name = first_non_empty([&row["displayName"], &row["name"]]).unwrap_or_default();
        if id.is_empty() && display_name.is_empty() {
            return None;
        }
        Some(Self {
            id,
            display_name,
            entity: upper(&row["entity"]),
            country_code: first_non_empty([&row["countryCode"], &row["countryOrRegion"]])
                .unwrap_or_default()
                .to_uppercase(),
        })
    }
}

/// Places without an id are told apart by display name.
impl Identified for GeoEntity {
    type Id = (String, String);

    fn identity(&self) -> Self::Id {
        (self.id.clone(), self.display_name.clone())
    }
}

/// Reason a product page or asset was rejected for serving.
#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdRejection {
    pub id: i64,
    pub adam_id: i64,
    pub product_page_id: Option<String>,
    pub reason_code: String,
    pub reason_type: String,
    pub reason_level: String,
    pub language_code: String,
    pub country_or_region: String,
    pub comment: Option<String>,
    pub asset_gen_id: Option<String>,
    pub app_preview_device: Option<String>,
    pub supply_source: Option<String>,
}

impl AdRejection {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        Some(Self {
            id: positive(int_from(&row["id"]))?,
            adam_id: int_from(&row["adamId"]),
            product_page_id: opt_string(&row["productPageId"]),
            reason_code: text(&row["reasonCode"]),
            reason_type: upper(&row["reasonType"]),
            reason_level: upper(&row["reasonLevel"]),
            language_code: text(&row["languageCode"]),
            country_or_region: upper(&row["countryOrRegion"]),
            comment: opt_string(&row["comment"]),
            asset_gen_id: opt_string(&row["assetGenId"]),
            app_preview_device: opt_string(&row["appPreviewDevice"]),
            supply_source: opt_string(&row["supplySource"]),
        })
    }
}

impl Identified for AdRejection {
    type Id = i64;

    fn identity(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn product_page_identity_is_a_string() {
        let page = ProductPage::from_json(&json!({"id": "45812c9b-c296", "state": "visible"}))
            .expect("row");
        assert_eq!(page.name, "Product Page 45812c9b-c296");
        assert_eq!(page.state, "VISIBLE");
        assert!(ProductPage::from_json(&json!({"id": "  "})).is_none());
    }

    #[test]
    fn device_mapping_falls_back_to_device_class_for_name() {
        let device = DeviceSizeMapping::from_json(&json!({"appPreviewDevice": "iphone_6_5"}))
            .expect("row");
        assert_eq!(device.display_name, "iphone_6_5");
        assert!(DeviceSizeMapping::from_json(&json!({})).is_none());
        assert!(DeviceSizeMapping::from_json(&json!("iphone")).is_none());
    }

    #[test]
    fn geo_entity_accepts_either_identifier() {
        let geo = GeoEntity::from_json(&json!({"geoId": "US|CA", "countryOrRegion": "us"}))
            .expect("row");
        assert_eq!(geo.id, "US|CA");
        assert_eq!(geo.country_code, "US");
        assert!(GeoEntity::from_json(&json!({"entity": "locality"})).is_none());
    }
}
