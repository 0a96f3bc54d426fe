use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;

use super::{Identified, positive};
use crate::normalize::{bool_from, first_non_empty, int_from, opt_string, text, upper};

/// App search hit.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSummary {
    pub adam_id: i64,
    pub app_name: String,
    pub developer_name: String,
    pub country_or_region: String,
}

impl AppSummary {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        Some(Self {
            adam_id: positive(int_from(&row["adamId"]))?,
            app_name: app_name(row),
            developer_name: text(&row["developerName"]),
            country_or_region: country(row),
        })
    }
}

impl Identified for AppSummary {
    type Id = i64;

    fn identity(&self) -> i64 {
        self.adam_id
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppLocale {
    pub language: String,
}

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDetail {
    pub adam_id: i64,
    pub app_name: String,
    pub developer_name: String,
    pub country_or_region: String,
    pub primary_genre_id: i64,
    pub icon_url: Option<String>,
    pub details: Vec<AppLocale>,
}

impl AppDetail {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        let details = row["details"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| opt_string(&item["language"]))
                    .map(|language| AppLocale { language })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            adam_id: positive(int_from(&row["adamId"]))?,
            app_name: app_name(row),
            developer_name: text(&row["developerName"]),
            country_or_region: country(row),
            primary_genre_id: int_from(&row["primaryGenreId"]),
            icon_url: opt_string(&row["iconUrl"]),
            details,
        })
    }
}

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEligibility {
    pub adam_id: i64,
    pub eligible: bool,
    pub min_age: i64,
    pub state: String,
    pub app_name: String,
    pub supply_source: Option<String>,
}

impl AppEligibility {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        Some(Self {
            adam_id: positive(int_from(&row["adamId"]))?,
            eligible: bool_from(&row["eligible"]),
            min_age: int_from(&row["minAge"]),
            state: upper(&row["state"]),
            app_name: app_name(row),
            supply_source: opt_string(&row["supplySource"]),
        })
    }
}

impl Identified for AppEligibility {
    type Id = (i64, Option<String>);

    fn identity(&self) -> Self::Id {
        (self.adam_id, self.supply_source.clone())
    }
}

/// Screenshot or preview asset. Has no identity of its own, so a row is
/// identified by its full contents.
#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppAsset {
    pub adam_id: i64,
    pub asset_type: String,
    pub asset_gen_id: Option<String>,
    pub app_preview_device: Option<String>,
    pub orientation: String,
    #[serde(rename = "assetURL")]
    pub asset_url: Option<String>,
    pub asset_video_url: Option<String>,
    pub source_height: i64,
    pub source_width: i64,
    pub deleted: bool,
}

impl AppAsset {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        let asset_type = upper(&row["assetType"]);
        let asset_gen_id = opt_string(&row["assetGenId"]);
        let asset_url = opt_string(&row["assetURL"]);
        if asset_type.is_empty() && asset_gen_id.is_none() && asset_url.is_none() {
            return None;
        }
        Some(Self {
            adam_id: int_from(&row["adamId"]),
            asset_type,
            asset_gen_id,
            app_preview_device: opt_string(&row["appPreviewDevice"]),
            orientation: upper(&row["orientation"]),
            asset_url,
            asset_video_url: opt_string(&row["assetVideoUrl"]),
            source_height: int_from(&row["sourceHeight"]),
            source_width: int_from(&row["sourceWidth"]),
            deleted: bool_from(&row["deleted"]),
        })
    }

    /// Ordering key: generation id, then URL.
    #[must_use]
    pub fn sort_key(&self) -> &str {
        self.asset_gen_id
            .as_deref()
            .or(self.asset_url.as_deref())
            .unwrap_or_default()
    }
}

impl Identified for AppAsset {
    type Id = Self;

    fn identity(&self) -> Self {
        self.clone()
    }
}

fn app_name(row: &Value) -> String {
    first_non_empty([&row["appName"], &row["name"]]).unwrap_or_default()
}

fn country(row: &Value) -> String {
    first_non_empty([&row["countryOrRegion"], &row["countryCode"]])
        .unwrap_or_default()
        .to_uppercase()
}
