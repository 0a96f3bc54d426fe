//! Negative keywords at ad-group and campaign scope.
//!
//! Writes here go through payload-shape trials: accounts disagree on whether
//! the bulk endpoints take an array of objects, a wrapped object or a bare
//! object, and some reject `DELETE` on bulk resources entirely, in which case
//! removal degrades to a status change.

use reqwest::Method;
use serde_json::{Value, json};

use super::{Client, sorted_by};
use crate::Result;
use crate::error::Error;
use crate::invoker::{Route, first_found};
use crate::types::{KeywordStatus, MatchType, NegativeKeyword};

/// Statuses tried, in order, when a negative keyword cannot be deleted outright.
const REMOVAL_STATUSES: [&str; 3] = ["DELETED", "PAUSED", "INACTIVE"];

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewNegativeKeyword {
    pub text: String,
    pub match_type: MatchType,
}

impl NewNegativeKeyword {
    #[must_use]
    pub fn new<S: Into<String>>(text: S, match_type: MatchType) -> Self {
        Self {
            text: text.into(),
            match_type,
        }
    }
}

fn create_body(keywords: &[NewNegativeKeyword]) -> Value {
    Value::Array(
        keywords
            .iter()
            .map(|k| NegativeKeyword::create_payload(&k.text, k.match_type))
            .collect(),
    )
}

fn ad_group_bases(campaign_id: i64, ad_group_id: i64) -> [String; 2] {
    [
        format!("campaigns/{campaign_id}/adgroups/{ad_group_id}/negativekeywords"),
        format!("adgroups/{ad_group_id}/negativekeywords"),
    ]
}

fn campaign_base(campaign_id: i64) -> String {
    format!("campaigns/{campaign_id}/negativekeywords")
}

fn status_bodies(id: i64, status: &str) -> [Value; 3] {
    [
        json!([{"id": id, "status": status}]),
        json!({"negativeKeywords": [{"id": id, "status": status}]}),
        json!({"id": id, "status": status}),
    ]
}

/// Item delete, then bulk delete shapes, then bulk status shapes, all against
/// one collection.
pub(crate) fn removal_route(base: &str, id: i64) -> Route {
    let bulk = format!("{base}/bulk");
    let delete_bodies = [
        json!([{"id": id}]),
        json!([id]),
        json!({"negativeKeywords": [{"id": id}]}),
        json!({"negativeKeywordIds": [id]}),
        json!({"id": id}),
    ];

    let mut route = Route::single(Method::DELETE, format!("{base}/{id}")).then(Route::variants(
        Method::DELETE,
        bulk.clone(),
        delete_bodies,
    ));
    for status in REMOVAL_STATUSES {
        route = route.then(Route::variants(
            Method::PUT,
            bulk.clone(),
            status_bodies(id, status),
        ));
    }
    route
}

fn status_route(base: &str, id: i64, status: KeywordStatus) -> Route {
    Route::variants(
        Method::PUT,
        format!("{base}/bulk"),
        status_bodies(id, status.as_ref()),
    )
}

fn parse_status(status: &str) -> Result<KeywordStatus> {
    status
        .trim()
        .parse()
        .map_err(|e| Error::validation(format!("unsupported negative keyword status {status}: {e}")))
}

impl Client {
    /// Negative keywords of an ad group, sorted by id.
    pub async fn negative_keywords(
        &self,
        campaign_id: i64,
        ad_group_id: i64,
    ) -> Result<Vec<NegativeKeyword>> {
        let paths = ad_group_bases(campaign_id, ad_group_id);
        let negatives = first_found("fetch negative keywords", &paths, |path| async move {
            self.fetcher().fetch_all(&path, NegativeKeyword::from_json).await
        })
        .await?;
        Ok(sorted_by(negatives, |k| k.id))
    }

    pub async fn add_negative_keywords(
        &self,
        campaign_id: i64,
        ad_group_id: i64,
        keywords: &[NewNegativeKeyword],
    ) -> Result<()> {
        if keywords.is_empty() {
            return Ok(());
        }
        let body = create_body(keywords);
        let routes = ad_group_bases(campaign_id, ad_group_id)
            .into_iter()
            .map(|base| Route::with_body(Method::POST, format!("{base}/bulk"), body.clone()))
            .collect();
        self.invoker().invoke("add negative keywords", routes).await?;
        Ok(())
    }

    /// Accepts `ACTIVE`, `ENABLED` or `PAUSED`; anything else is rejected
    /// before a request is made.
    pub async fn update_negative_keyword_status(
        &self,
        campaign_id: i64,
        ad_group_id: i64,
        negative_keyword_id: i64,
        status: &str,
    ) -> Result<()> {
        let status = parse_status(status)?;
        let routes = ad_group_bases(campaign_id, ad_group_id)
            .iter()
            .map(|base| status_route(base, negative_keyword_id, status))
            .collect();
        self.invoker()
            .invoke("update negative keyword status", routes)
            .await?;
        Ok(())
    }

    pub async fn delete_negative_keyword(
        &self,
        campaign_id: i64,
        ad_group_id: i64,
        negative_keyword_id: i64,
    ) -> Result<()> {
        let routes = ad_group_bases(campaign_id, ad_group_id)
            .iter()
            .map(|base| removal_route(base, negative_keyword_id))
            .collect();
        self.invoker()
            .invoke("remove negative keyword", routes)
            .await?;
        Ok(())
    }

    /// Campaign-level negative keywords, sorted by id.
    pub async fn campaign_negative_keywords(&self, campaign_id: i64) -> Result<Vec<NegativeKeyword>> {
        let negatives = self
            .fetcher()
            .fetch_all(&campaign_base(campaign_id), NegativeKeyword::from_json)
            .await?;
        Ok(sorted_by(negatives, |k| k.id))
    }

    pub async fn add_campaign_negative_keywords(
        &self,
        campaign_id: i64,
        keywords: &[NewNegativeKeyword],
    ) -> Result<()> {
        if keywords.is_empty() {
            return Ok(());
        }
        self.post(
            &format!("{}/bulk", campaign_base(campaign_id)),
            create_body(keywords),
        )
        .await?;
        Ok(())
    }

    pub async fn update_campaign_negative_keyword_status(
        &self,
        campaign_id: i64,
        negative_keyword_id: i64,
        status: &str,
    ) -> Result<()> {
        let status = parse_status(status)?;
        let route = status_route(&campaign_base(campaign_id), negative_keyword_id, status);
        self.invoker()
            .invoke("update campaign negative keyword status", vec![route])
            .await?;
        Ok(())
    }

    pub async fn delete_campaign_negative_keyword(
        &self,
        campaign_id: i64,
        negative_keyword_id: i64,
    ) -> Result<()> {
        let route = removal_route(&campaign_base(campaign_id), negative_keyword_id);
        self.invoker()
            .invoke("remove campaign negative keyword", vec![route])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Kind;

    #[test]
    fn removal_route_order() {
        let route = removal_route("campaigns/1/negativekeywords", 9);
        let attempts = route.attempts();
        assert_eq!(attempts.len(), 1 + 5 + 9);

        assert_eq!(attempts[0].method, Method::DELETE);
        assert_eq!(attempts[0].path, "campaigns/1/negativekeywords/9");
        assert_eq!(attempts[0].body, None);

        assert_eq!(attempts[1].path, "campaigns/1/negativekeywords/bulk");
        assert_eq!(attempts[1].body, Some(json!([{"id": 9}])));
        assert_eq!(attempts[2].body, Some(json!([9])));
        assert_eq!(attempts[5].body, Some(json!({"id": 9})));

        assert_eq!(attempts[6].method, Method::PUT);
        assert_eq!(attempts[6].body, Some(json!([{"id": 9, "status": "DELETED"}])));
        assert_eq!(attempts[9].body, Some(json!([{"id": 9, "status": "PAUSED"}])));
        assert_eq!(attempts[14].body, Some(json!({"id": 9, "status": "INACTIVE"})));
    }

    #[test]
    fn status_is_validated_before_any_request() {
        assert_eq!(parse_status("enabled").ok(), Some(KeywordStatus::Active));
        let err = parse_status("ARCHIVED").expect_err("unsupported");
        assert_eq!(err.kind(), Kind::Validation);
    }

    #[test]
    fn create_body_normalizes_match_type() {
        let body = create_body(&[
            NewNegativeKeyword::new("free", MatchType::Exact),
            NewNegativeKeyword::new("cheap", MatchType::Broad),
        ]);
        assert_eq!(
            body,
            json!([
                {"text": "free", "matchType": "EXACT", "status": "ACTIVE"},
                {"text": "cheap", "matchType": "BROAD", "status": "ACTIVE"}
            ])
        );
    }
}
