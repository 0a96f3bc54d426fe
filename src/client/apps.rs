use serde::Serialize;
use serde_json::Value;

use super::{Client, parse_object, parse_rows, sorted_by};
use crate::Result;
use crate::types::{AppAsset, AppDetail, AppEligibility, AppSummary};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppQuery<'query> {
    query: &'query str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    return_owned_apps: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<usize>,
}

impl Client {
    /// App Store search, sorted by adam id. `return_owned_apps` restricts hits
    /// to apps the organization can promote.
    pub async fn search_apps(
        &self,
        query: &str,
        return_owned_apps: bool,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<AppSummary>> {
        let params = serde_html_form::to_string(AppQuery {
            query: query.trim(),
            return_owned_apps,
            limit: limit.filter(|l| *l > 0),
            offset: offset.filter(|o| *o > 0),
        })?;

        let payload = self.get(&format!("search/apps?{params}")).await?;
        Ok(sorted_by(parse_rows(&payload, AppSummary::from_json), |a| a.adam_id))
    }

    pub async fn app(&self, adam_id: i64) -> Result<AppDetail> {
        let payload = self.get(&format!("apps/{adam_id}")).await?;
        parse_object(&payload, "app", AppDetail::from_json)
    }

    pub async fn localized_app_details(&self, adam_id: i64) -> Result<AppDetail> {
        let payload = self
            .get(&format!("apps/{adam_id}/locale-details"))
            .await?;
        parse_object(&payload, "app locale details", AppDetail::from_json)
    }

    pub async fn find_app_eligibility(&self, selector: Value) -> Result<Vec<AppEligibility>> {
        let payload = self.post("app-eligibility/find", selector).await?;
        let records = parse_rows(&payload, AppEligibility::from_json);
        Ok(sorted_by(records, |e| e.adam_id))
    }

    /// Screenshots and previews of an app matching `selector`.
    pub async fn find_app_assets(&self, adam_id: i64, selector: Value) -> Result<Vec<AppAsset>> {
        let payload = self
            .post(&format!("apps/{adam_id}/assets/find"), selector)
            .await?;
        let assets = parse_rows(&payload, AppAsset::from_json);
        Ok(sorted_by(assets, |a| a.sort_key().to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_flag_only_when_set() {
        let encode = |owned| {
            serde_html_form::to_string(AppQuery {
                query: "weather app",
                return_owned_apps: owned,
                limit: Some(20),
                offset: None,
            })
            .expect("encode")
        };
        assert_eq!(encode(false), "query=weather+app&limit=20");
        assert_eq!(
            encode(true),
            "query=weather+app&returnOwnedApps=true&limit=20"
        );
    }
}
