use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;

use super::{Identified, Money, positive};
use crate::normalize::{first_non_empty, int_from, upper};

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: i64,
    pub adam_id: Option<i64>,
    pub name: String,
    pub status: String,
}

impl Campaign {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        let id = positive(int_from(&row["id"]))?;
        Some(Self::with_fallback_id(row, id))
    }

    /// Parses a write response, using `id` when the payload omits one.
    pub(crate) fn with_fallback_id(row: &Value, id: i64) -> Self {
        let id = positive(int_from(&row["id"])).unwrap_or(id);
        Self {
            id,
            adam_id: positive(int_from(&row["adamId"])),
            name: first_non_empty([&row["name"]]).unwrap_or_else(|| format!("Campaign {id}")),
            status: upper(&row["status"]),
        }
    }
}

impl Identified for Campaign {
    type Id = i64;

    fn identity(&self) -> i64 {
        self.id
    }
}

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroup {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub default_bid: Option<Money>,
}

impl AdGroup {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        let id = positive(int_from(&row["id"])).or_else(|| positive(int_from(&row["adGroupId"])))?;
        Some(Self::with_fallback_id(row, id))
    }

    pub(crate) fn with_fallback_id(row: &Value, id: i64) -> Self {
        let id = positive(int_from(&row["id"]))
            .or_else(|| positive(int_from(&row["adGroupId"])))
            .unwrap_or(id);
        Self {
            id,
            name: first_non_empty([&row["name"], &row["adGroupName"]])
                .unwrap_or_else(|| format!("Ad Group {id}")),
            status: upper(&row["status"]),
            default_bid: Money::first_of([&row["defaultCpcBid"], &row["defaultBidAmount"]]),
        }
    }
}

impl Identified for AdGroup {
    type Id = i64;

    fn identity(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn campaign_gets_placeholder_name_and_upper_status() {
        let campaign = Campaign::from_json(&json!({"id": "12", "status": "enabled"})).expect("row");
        assert_eq!(campaign.name, "Campaign 12");
        assert_eq!(campaign.status, "ENABLED");
        assert_eq!(campaign.adam_id, None);

        assert!(Campaign::from_json(&json!({"id": 0, "name": "x"})).is_none());
        assert!(Campaign::from_json(&json!({"name": "no id"})).is_none());
    }

    #[test]
    fn ad_group_reads_alternate_id_name_and_bid() {
        let group = AdGroup::from_json(&json!({
            "adGroupId": 9,
            "adGroupName": "Brand",
            "defaultCpcBid": {"amount": "0", "currency": "USD"},
            "defaultBidAmount": {"amount": "1.20", "currencyCode": "GBP"}
        }))
        .expect("row");

        assert_eq!(group.id, 9);
        assert_eq!(group.name, "Brand");
        assert_eq!(
            group.default_bid,
            Some(Money::new(dec!(1.20), Some("GBP".to_owned())))
        );
    }
}
