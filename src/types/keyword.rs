use serde::Serialize;
use serde_json::{Value, json};
use serde_with::skip_serializing_none;
use strum_macros::{AsRefStr, Display, EnumString};

use super::{Identified, Money, positive};
use crate::normalize::{first_non_empty, int_from, upper};

#[non_exhaustive]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    #[default]
    Broad,
    Exact,
}

/// Writable status of a targeting or negative keyword. `ENABLED` is accepted
/// as a spelling of `ACTIVE`.
#[non_exhaustive]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, Serialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeywordStatus {
    #[default]
    #[strum(to_string = "ACTIVE", serialize = "ENABLED")]
    Active,
    #[strum(to_string = "PAUSED")]
    Paused,
}

#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    pub id: i64,
    pub text: String,
    pub match_type: String,
    pub status: String,
    pub bid: Option<Money>,
}

impl Keyword {
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        let id = positive(int_from(&row["id"])).or_else(|| positive(int_from(&row["keywordId"])))?;
        let text = first_non_empty([
            &row["keywordText"],
            &row["text"],
            &row["name"],
            &row["keyword"],
        ])
        .unwrap_or_else(|| format!("Keyword {id}"));

        Some(Self {
            id,
            text,
            match_type: non_empty_or(upper(&row["matchType"]), "BROAD"),
            status: non_empty_or(upper(&row["status"]), "ENABLED"),
            bid: Money::first_of([&row["bidAmount"], &row["bid"]]),
        })
    }
}

impl Identified for Keyword {
    type Id = i64;

    fn identity(&self) -> i64 {
        self.id
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegativeKeyword {
    pub id: i64,
    pub text: String,
    pub match_type: String,
    pub status: String,
}

impl NegativeKeyword {
    /// Rows without text are dropped along with rows without an identity.
    #[must_use]
    pub fn from_json(row: &Value) -> Option<Self> {
        let id = positive(int_from(&row["id"]))
            .or_else(|| positive(int_from(&row["negativeKeywordId"])))?;
        let text = first_non_empty([&row["text"], &row["keywordText"], &row["keyword"]])?;
        Some(Self {
            id,
            text,
            match_type: non_empty_or(upper(&row["matchType"]), "EXACT"),
            status: non_empty_or(upper(&row["status"]), "ACTIVE"),
        })
    }

    /// Body entry for creating a negative keyword.
    pub(crate) fn create_payload(text: &str, match_type: MatchType) -> Value {
        json!({
            "text": text,
            "matchType": match_type.as_ref(),
            "status": "ACTIVE",
        })
    }
}

impl Identified for NegativeKeyword {
    type Id = i64;

    fn identity(&self) -> i64 {
        self.id
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_owned()
    } else {
        value
    }
}
