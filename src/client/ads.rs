use serde_json::{Map, Value, json};

use super::{Client, parse_object, parse_rows, sorted_by};
use crate::Result;
use crate::types::Ad;

/// `{name?, status?}` with blanks left out.
fn ad_fields(name: Option<&str>, status: Option<&str>) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        fields.insert("name".to_owned(), json!(name));
    }
    if let Some(status) = status.map(str::trim).filter(|s| !s.is_empty()) {
        fields.insert("status".to_owned(), json!(status.to_uppercase()));
    }
    fields
}

impl Client {
    /// Ads of an ad group, sorted by id.
    pub async fn ads(&self, campaign_id: i64, ad_group_id: i64) -> Result<Vec<Ad>> {
        let payload = self
            .get(&format!("campaigns/{campaign_id}/adgroups/{ad_group_id}/ads"))
            .await?;
        Ok(sorted_by(parse_rows(&payload, Ad::from_json), |a| a.id))
    }

    pub async fn ad(&self, campaign_id: i64, ad_group_id: i64, ad_id: i64) -> Result<Ad> {
        let payload = self
            .get(&format!(
                "campaigns/{campaign_id}/adgroups/{ad_group_id}/ads/{ad_id}"
            ))
            .await?;
        parse_object(&payload, "ad", Ad::from_json)
    }

    /// Ads of a campaign matching `selector`, sorted by id.
    pub async fn find_campaign_ads(&self, campaign_id: i64, selector: Value) -> Result<Vec<Ad>> {
        let payload = self
            .post(&format!("campaigns/{campaign_id}/ads/find"), selector)
            .await?;
        Ok(sorted_by(parse_rows(&payload, Ad::from_json), |a| a.id))
    }

    /// Ads across the organization matching `selector`, sorted by id.
    pub async fn find_org_ads(&self, selector: Value) -> Result<Vec<Ad>> {
        let payload = self.post("ads/find", selector).await?;
        Ok(sorted_by(parse_rows(&payload, Ad::from_json), |a| a.id))
    }

    pub async fn create_ad(
        &self,
        campaign_id: i64,
        ad_group_id: i64,
        creative_id: i64,
        name: Option<&str>,
        status: Option<&str>,
    ) -> Result<Ad> {
        let mut body = ad_fields(name, status);
        body.insert("creativeId".to_owned(), json!(creative_id));

        let payload = self
            .post(
                &format!("campaigns/{campaign_id}/adgroups/{ad_group_id}/ads"),
                Value::Object(body),
            )
            .await?;
        parse_object(&payload, "ad", Ad::from_json)
    }

    pub async fn update_ad(
        &self,
        campaign_id: i64,
        ad_group_id: i64,
        ad_id: i64,
        name: Option<&str>,
        status: Option<&str>,
    ) -> Result<Ad> {
        let payload = self
            .put(
                &format!("campaigns/{campaign_id}/adgroups/{ad_group_id}/ads/{ad_id}"),
                Value::Object(ad_fields(name, status)),
            )
            .await?;
        parse_object(&payload, "ad", Ad::from_json)
    }

    pub async fn delete_ad(&self, campaign_id: i64, ad_group_id: i64, ad_id: i64) -> Result<()> {
        self.delete(&format!(
            "campaigns/{campaign_id}/adgroups/{ad_group_id}/ads/{ad_id}"
        ))
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_left_out() {
        assert!(ad_fields(Some("  "), None).is_empty());
        let fields = ad_fields(Some(" Spring "), Some("paused"));
        assert_eq!(fields["name"], "Spring");
        assert_eq!(fields["status"], "PAUSED");
    }
}
