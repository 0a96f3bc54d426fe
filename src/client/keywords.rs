use bon::Builder;
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use super::{Client, sorted_by};
use crate::Result;
use crate::invoker::{Route, first_found};
use crate::types::{Keyword, KeywordStatus, MatchType, Money};

const DEFAULT_CURRENCY: &str = "USD";

/// A targeting keyword to add to an ad group.
#[non_exhaustive]
#[derive(Builder, Clone, Debug, PartialEq)]
pub struct NewKeyword {
    #[builder(into)]
    pub text: String,
    #[builder(default)]
    pub match_type: MatchType,
    #[builder(default)]
    pub status: KeywordStatus,
    pub bid: Option<Decimal>,
    /// Currency of `bid`; `USD` when unset.
    #[builder(into)]
    pub currency: Option<String>,
}

impl NewKeyword {
    fn payload(&self) -> Value {
        let mut entry = json!({
            "text": self.text,
            "matchType": self.match_type.as_ref(),
            "status": self.status.as_ref(),
        });
        if let Some(bid) = self.bid {
            entry["bidAmount"] = bid_payload(bid, self.currency.as_deref());
        }
        entry
    }
}

fn bid_payload(amount: Decimal, currency: Option<&str>) -> Value {
    let currency = currency
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CURRENCY);
    Money::payload(amount, currency)
}

/// Ad-group-scoped collection first, organization-scoped second.
fn keyword_paths(campaign_id: i64, ad_group_id: i64) -> [String; 2] {
    [
        format!("campaigns/{campaign_id}/adgroups/{ad_group_id}/targetingkeywords"),
        format!("adgroups/{ad_group_id}/targetingkeywords"),
    ]
}

fn bulk_routes(method: &Method, campaign_id: i64, ad_group_id: i64, body: &Value) -> Vec<Route> {
    keyword_paths(campaign_id, ad_group_id)
        .into_iter()
        .map(|path| Route::with_body(method.clone(), format!("{path}/bulk"), body.clone()))
        .collect()
}

impl Client {
    /// Targeting keywords of an ad group, sorted by id.
    pub async fn keywords(&self, campaign_id: i64, ad_group_id: i64) -> Result<Vec<Keyword>> {
        let paths = keyword_paths(campaign_id, ad_group_id);
        let keywords = first_found("fetch keywords", &paths, |path| async move {
            self.fetcher().fetch_all(&path, Keyword::from_json).await
        })
        .await?;
        Ok(sorted_by(keywords, |k| k.id))
    }

    pub async fn add_keyword(
        &self,
        campaign_id: i64,
        ad_group_id: i64,
        keyword: &NewKeyword,
    ) -> Result<()> {
        let body = json!([keyword.payload()]);
        self.invoker()
            .invoke(
                "add keyword",
                bulk_routes(&Method::POST, campaign_id, ad_group_id, &body),
            )
            .await?;
        Ok(())
    }

    /// Changes status and/or bid. A `bid` without currency is sent as `USD`.
    pub async fn update_keyword(
        &self,
        campaign_id: i64,
        ad_group_id: i64,
        keyword_id: i64,
        status: Option<KeywordStatus>,
        bid: Option<&Money>,
    ) -> Result<()> {
        let mut entry = json!({"id": keyword_id});
        if let Some(status) = status {
            entry["status"] = json!(status.as_ref());
        }
        if let Some(bid) = bid {
            entry["bidAmount"] = bid_payload(bid.amount, bid.currency.as_deref());
        }

        self.invoker()
            .invoke(
                "update keyword",
                bulk_routes(&Method::PUT, campaign_id, ad_group_id, &json!([entry])),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_keyword(
        &self,
        campaign_id: i64,
        ad_group_id: i64,
        keyword_id: i64,
    ) -> Result<()> {
        let routes = keyword_paths(campaign_id, ad_group_id)
            .into_iter()
            .map(|path| Route::single(Method::DELETE, format!("{path}/{keyword_id}")))
            .collect();
        self.invoker().invoke("delete keyword", routes).await?;
        Ok(())
    }
}
