use bon::Builder;
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use super::campaigns::now_rfc3339;
use super::{Client, sorted_by};
use crate::Result;
use crate::invoker::Route;
use crate::normalize::{extract_data_object, first_non_empty};
use crate::types::{AdGroup, Money};

/// Parameters of a new cost-per-tap ad group.
#[non_exhaustive]
#[derive(Builder, Clone, Debug, PartialEq)]
pub struct NewAdGroup {
    #[builder(into)]
    pub name: String,
    #[builder(into, default = "PAUSED".to_owned())]
    pub status: String,
    pub default_bid: Decimal,
    #[builder(into, default = "USD".to_owned())]
    pub currency: String,
    pub automated_keywords_opt_in: Option<bool>,
}

impl NewAdGroup {
    fn payload(&self, org_id: &str, campaign_id: i64) -> Value {
        let mut body = json!({
            "orgId": org_id,
            "campaignId": campaign_id,
            "name": self.name,
            "status": self.status.trim().to_uppercase(),
            "pricingModel": "CPC",
            "defaultBidAmount": Money::payload(self.default_bid, &self.currency),
            "startTime": now_rfc3339(),
        });
        if let Some(opt_in) = self.automated_keywords_opt_in {
            body["automatedKeywordsOptIn"] = json!(opt_in);
        }
        body
    }
}

impl Client {
    /// Ad groups of a campaign, sorted by id.
    pub async fn ad_groups(&self, campaign_id: i64) -> Result<Vec<AdGroup>> {
        let ad_groups = self
            .fetcher()
            .fetch_all(&format!("campaigns/{campaign_id}/adgroups"), AdGroup::from_json)
            .await?;
        Ok(sorted_by(ad_groups, |a| a.id))
    }

    pub async fn create_ad_group(&self, campaign_id: i64, ad_group: &NewAdGroup) -> Result<AdGroup> {
        let org_id = self.validate_credentials().await?;
        let payload = self
            .post(
                &format!("campaigns/{campaign_id}/adgroups"),
                ad_group.payload(&org_id, campaign_id),
            )
            .await?;

        let data = &payload["data"];
        let mut created = AdGroup::with_fallback_id(data, 0);
        created.name = first_non_empty([&data["name"]]).unwrap_or_else(|| ad_group.name.clone());
        if created.status.is_empty() {
            created.status = ad_group.status.trim().to_uppercase();
        }
        let bid = created
            .default_bid
            .take()
            .unwrap_or_else(|| Money::new(ad_group.default_bid, None));
        created.default_bid = Some(Money {
            currency: bid.currency.or_else(|| Some(ad_group.currency.clone())),
            ..bid
        });

        #[cfg(feature = "tracing")]
        tracing::info!(campaign_id, ad_group_id = created.id, "ad group created");

        Ok(created)
    }

    pub async fn update_ad_group_status(
        &self,
        campaign_id: i64,
        ad_group_id: i64,
        status: &str,
    ) -> Result<AdGroup> {
        let status = status.trim().to_uppercase();
        let payload = self
            .put(
                &format!("campaigns/{campaign_id}/adgroups/{ad_group_id}"),
                json!({"status": status}),
            )
            .await?;

        let mut updated = AdGroup::with_fallback_id(extract_data_object(&payload), ad_group_id);
        if updated.status.is_empty() {
            updated.status = status;
        }
        Ok(updated)
    }

    /// Deletes through the campaign-scoped route, falling back to the
    /// organization-scoped one when the former is not found.
    pub async fn delete_ad_group(&self, campaign_id: i64, ad_group_id: i64) -> Result<()> {
        self.invoker()
            .invoke(
                "delete ad group",
                vec![
                    Route::single(
                        Method::DELETE,
                        format!("campaigns/{campaign_id}/adgroups/{ad_group_id}"),
                    ),
                    Route::single(Method::DELETE, format!("adgroups/{ad_group_id}")),
                ],
            )
            .await?;
        Ok(())
    }
}
