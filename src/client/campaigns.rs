use bon::Builder;
use chrono::{SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use super::{Client, sorted_by};
use crate::Result;
use crate::normalize::{extract_data_object, first_non_empty, upper};
use crate::types::{Campaign, Money};

/// Parameters of a new search-results campaign.
#[non_exhaustive]
#[derive(Builder, Clone, Debug, PartialEq)]
pub struct NewCampaign {
    #[builder(into)]
    pub name: String,
    #[builder(into, default = "PAUSED".to_owned())]
    pub status: String,
    pub daily_budget: Decimal,
    #[builder(into, default = "USD".to_owned())]
    pub currency: String,
    /// `DAILY` is the upstream default and is not sent.
    #[builder(into)]
    pub budget_type: Option<String>,
    pub adam_id: Option<i64>,
    #[builder(default)]
    pub countries_or_regions: Vec<String>,
    /// RFC 3339; defaults to now.
    #[builder(into)]
    pub start_time: Option<String>,
    #[builder(into)]
    pub end_time: Option<String>,
}

impl NewCampaign {
    fn payload(&self, org_id: &str) -> Value {
        let start_time = self
            .start_time
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(now_rfc3339, ToOwned::to_owned);

        let mut body = json!({
            "orgId": org_id,
            "name": self.name,
            "status": self.status.trim().to_uppercase(),
            "adChannelType": "SEARCH",
            "supplySources": ["APPSTORE_SEARCH_RESULTS"],
            "billingEvent": "TAPS",
            "paymentModel": "PAYG",
            "startTime": start_time,
            "dailyBudgetAmount": Money::payload(self.daily_budget, &self.currency),
        });

        let budget_type = self
            .budget_type
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_uppercase();
        if !budget_type.is_empty() && budget_type != "DAILY" {
            body["budgetType"] = json!(budget_type);
        }
        if let Some(adam_id) = self.adam_id.filter(|id| *id > 0) {
            body["adamId"] = json!(adam_id);
        }
        if !self.countries_or_regions.is_empty() {
            body["countriesOrRegions"] = json!(self.countries_or_regions);
        }
        if let Some(end_time) = self.end_time.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            body["endTime"] = json!(end_time);
        }
        body
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

impl Client {
    /// All campaigns of the organization, sorted by id.
    pub async fn campaigns(&self) -> Result<Vec<Campaign>> {
        let campaigns = self.fetcher().fetch_all("campaigns", Campaign::from_json).await?;
        Ok(sorted_by(campaigns, |c| c.id))
    }

    pub async fn create_campaign(&self, campaign: &NewCampaign) -> Result<Campaign> {
        let org_id = self.validate_credentials().await?;
        let payload = self.post("campaigns", campaign.payload(&org_id)).await?;

        let data = &payload["data"];
        let mut created = Campaign::with_fallback_id(data, 0);
        created.name = first_non_empty([&data["name"]]).unwrap_or_else(|| campaign.name.clone());
        if created.status.is_empty() {
            created.status = campaign.status.trim().to_uppercase();
        }

        #[cfg(feature = "tracing")]
        tracing::info!(campaign_id = created.id, "campaign created");

        Ok(created)
    }

    pub async fn update_campaign_status(&self, campaign_id: i64, status: &str) -> Result<Campaign> {
        let status = status.trim().to_uppercase();
        let payload = self
            .put(
                &format!("campaigns/{campaign_id}"),
                json!({"campaign": {"status": status}}),
            )
            .await?;

        let mut updated = Campaign::with_fallback_id(extract_data_object(&payload), campaign_id);
        if updated.status.is_empty() {
            updated.status = status;
        }
        Ok(updated)
    }

    pub async fn update_campaign_budget(
        &self,
        campaign_id: i64,
        daily_budget: Decimal,
        currency: &str,
    ) -> Result<Campaign> {
        let currency = currency.trim().to_uppercase();
        let payload = self
            .put(
                &format!("campaigns/{campaign_id}"),
                json!({"campaign": {"dailyBudgetAmount": Money::payload(daily_budget, &currency)}}),
            )
            .await?;

        let data = extract_data_object(&payload);
        let mut updated = Campaign::with_fallback_id(data, campaign_id);
        updated.status = upper(&data["status"]);
        Ok(updated)
    }

    pub async fn delete_campaign(&self, campaign_id: i64) -> Result<()> {
        self.delete(&format!("campaigns/{campaign_id}")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn campaign_payload_omits_defaults() {
        let campaign = NewCampaign::builder()
            .name("Brand")
            .daily_budget(dec!(25))
            .start_time("2024-01-01T00:00:00Z")
            .build();

        let body = campaign.payload("42");
        assert_eq!(body["orgId"], "42");
        assert_eq!(body["status"], "PAUSED");
        assert_eq!(body["dailyBudgetAmount"], json!({"amount": "25.0000", "currency": "USD"}));
        assert_eq!(body["startTime"], "2024-01-01T00:00:00Z");
        for absent in ["budgetType", "adamId", "countriesOrRegions", "endTime"] {
            assert!(body.get(absent).is_none(), "{absent} should be omitted");
        }
    }

    #[test]
    fn campaign_payload_carries_optional_fields() {
        let campaign = NewCampaign::builder()
            .name("Generic")
            .status("enabled")
            .daily_budget(dec!(10.5))
            .budget_type("lifetime")
            .adam_id(123)
            .countries_or_regions(vec!["US".to_owned()])
            .end_time(" 2024-02-01T00:00:00Z ")
            .build();

        let body = campaign.payload("1");
        assert_eq!(body["status"], "ENABLED");
        assert_eq!(body["budgetType"], "LIFETIME");
        assert_eq!(body["adamId"], 123);
        assert_eq!(body["countriesOrRegions"], json!(["US"]));
        assert_eq!(body["endTime"], "2024-02-01T00:00:00Z");
        assert!(body["startTime"].as_str().is_some_and(|s| s.ends_with('Z')));
    }
}
