use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;

use super::{Identified, positive};
use crate::normalize::{bool_from, first_non_empty, int_from, opt_string, string_list, upper};

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    pub id: i64,
    pub campaign_id: i64,
    pub ad_group_id: i64,
    pub creative_id: i64,
    pub name: String,
    pub creative_type: String,
    pub status: String,
    pub serving_status: String,
    pub serving_state_reasons: Vec<String>,
    pub deleted: bool,
    pub creation_time: Option<String>,
    pub modification_time: Option<String>,
}

impl Ad {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        let id = positive(int_from(&row["id"]))?;
        Some(Self {
            id,
            campaign_id: int_from(&row["campaignId"]),
            ad_group_id: int_from(&row["adGroupId"]),
            creative_id: int_from(&row["creativeId"]),
            name: first_non_empty([&row["name"]]).unwrap_or_else(|| format!("Ad {id}")),
            creative_type: upper(&row["creativeType"]),
            status: upper(&row["status"]),
            serving_status: upper(&row["servingStatus"]),
            serving_state_reasons: string_list(&row["servingStateReasons"]),
            deleted: bool_from(&row["deleted"]),
            creation_time: opt_string(&row["creationTime"]),
            modification_time: opt_string(&row["modificationTime"]),
        })
    }
}

impl Identified for Ad {
    type Id = i64;

    fn identity(&self) -> i64 {
        self.id
    }
}

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Creative {
    pub id: i64,
    pub org_id: i64,
    pub adam_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub state: String,
    pub state_reasons: Vec<String>,
    pub product_page_id: Option<String>,
    pub language_code: Option<String>,
    pub creation_time: Option<String>,
    pub modification_time: Option<String>,
}

impl Creative {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        let id = positive(int_from(&row["id"]))?;
        Some(Self {
            id,
            org_id: int_from(&row["orgId"]),
            adam_id: int_from(&row["adamId"]),
            name: first_non_empty([&row["name"]]).unwrap_or_else(|| format!("Creative {id}")),
            kind: upper(&row["type"]),
            state: upper(&row["state"]),
            state_reasons: string_list(&row["stateReasons"]),
            product_page_id: opt_string(&row["productPageId"]),
            language_code: opt_string(&row["languageCode"]),
            creation_time: opt_string(&row["creationTime"]),
            modification_time: opt_string(&row["modificationTime"]),
        })
    }
}

impl Identified for Creative {
    type Id = i64;

    fn identity(&self) -> i64 {
        self.id
    }
}
