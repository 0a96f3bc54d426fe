//! Immutable snapshots of upstream entities.
//!
//! Every type parses itself from a loosely shaped JSON row with `from_json`,
//! returning `None` for rows that lack a usable identity. Missing descriptive
//! fields fall back to deterministic placeholders instead.

mod ad;
mod app;
mod campaign;
mod catalog;
mod keyword;
mod report;

use std::hash::Hash;

pub use ad::{Ad, Creative};
pub use app::{AppAsset, AppDetail, AppEligibility, AppLocale, AppSummary};
pub use campaign::{AdGroup, Campaign};
pub use catalog::{
    AdRejection, CountryOrRegion, DeviceSizeMapping, GeoEntity, ProductPage, ProductPageLocale,
};
pub use keyword::{Keyword, KeywordStatus, MatchType, NegativeKeyword};
pub use report::{
    AdGroupDailyMetrics, CustomReport, DailyMetrics, Granularity, KeywordDailyMetrics,
    ReportState, SearchTermDailyMetrics,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};
use serde_with::skip_serializing_none;

use crate::normalize::parse_money;

/// Places in a monetary payload the upstream rounds to.
const MONEY_SCALE: u32 = 4;

/// Records that carry an identity, used for de-duplication across pages.
pub trait Identified {
    type Id: Eq + Hash + Clone;

    fn identity(&self) -> Self::Id;
}

/// Amount with an optional ISO currency code.
#[non_exhaustive]
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: Decimal,
    pub currency: Option<String>,
}

impl Money {
    #[must_use]
    pub fn new(amount: Decimal, currency: Option<String>) -> Self {
        Self { amount, currency }
    }

    /// First candidate object with a positive amount.
    pub(crate) fn first_of<'value, I>(candidates: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'value Value>,
    {
        parse_money(candidates).map(|(amount, currency)| Self { amount, currency })
    }

    /// `{amount, currency}` body fragment with the amount fixed to four places.
    pub(crate) fn payload(amount: Decimal, currency: &str) -> Value {
        json!({
            "amount": fixed_amount(amount),
            "currency": currency,
        })
    }
}

pub(crate) fn fixed_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(MONEY_SCALE);
    rounded.rescale(MONEY_SCALE);
    rounded.to_string()
}

/// Positive identity, or `None`.
pub(crate) fn positive(id: i64) -> Option<i64> {
    (id > 0).then_some(id)
}
