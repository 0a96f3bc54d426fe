use serde_json::{Value, json};

use super::{Client, parse_object, parse_rows, sorted_by};
use crate::Result;
use crate::types::Creative;

impl Client {
    /// Creatives of the organization, sorted by id.
    pub async fn creatives(&self) -> Result<Vec<Creative>> {
        let creatives = self
            .fetcher()
            .fetch_all("creatives", Creative::from_json)
            .await?;
        Ok(sorted_by(creatives, |c| c.id))
    }

    pub async fn creative(&self, creative_id: i64) -> Result<Creative> {
        let payload = self.get(&format!("creatives/{creative_id}")).await?;
        parse_object(&payload, "creative", Creative::from_json)
    }

    pub async fn find_creatives(&self, selector: Value) -> Result<Vec<Creative>> {
        let payload = self.post("creatives/find", selector).await?;
        Ok(sorted_by(parse_rows(&payload, Creative::from_json), |c| c.id))
    }

    /// Creates a creative of `kind` (e.g. `CUSTOM_PRODUCT_PAGE`) for an app.
    pub async fn create_creative(
        &self,
        adam_id: i64,
        name: &str,
        kind: &str,
        product_page_id: Option<&str>,
    ) -> Result<Creative> {
        let mut body = json!({
            "adamId": adam_id,
            "name": name.trim(),
            "type": kind.trim().to_uppercase(),
        });
        if let Some(page) = product_page_id.map(str::trim).filter(|p| !p.is_empty()) {
            body["productPageId"] = json!(page);
        }

        let payload = self.post("creatives", body).await?;
        parse_object(&payload, "creative", Creative::from_json)
    }
}
