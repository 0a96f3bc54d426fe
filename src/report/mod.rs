//! Asynchronous custom reports.
//!
//! [`ReportPipeline`] drives one impression-share report from creation to a
//! classified keyword table:
//!
//! ```text
//! create ──(429: backoff, bounded)──▶ PENDING/RUNNING ──poll──▶ COMPLETED ──▶ download ──▶ parse
//!                                              │                    └──▶ FAILED
//!                                              └──deadline──▶ timed out
//! ```
//!
//! Sleeps use `tokio::time` and race the client's cancellation token, so the
//! whole machine can be driven under paused virtual time.

mod csv;
mod sov;
mod uri;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, sleep};

pub use self::csv::parse_records;
pub use self::sov::{Action, Bucket, DecisionEntry, SovRow, classify, normalize_rows};
pub use self::uri::validate_download_uri;
use crate::Result;
use crate::client::{Client, ImpressionShareRequest};
use crate::config::ReportPolicy;
use crate::error::Error;
use crate::types::{CustomReport, ReportState};

/// Everything one pipeline run produced.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SovOutcome {
    pub report: CustomReport,
    pub csv: String,
    pub rows: Vec<SovRow>,
    pub decisions: Vec<DecisionEntry>,
}

#[expect(clippy::module_name_repetitions, reason = "re-exported at the crate root")]
pub struct ReportPipeline<'client> {
    client: &'client Client,
    policy: ReportPolicy,
}

impl<'client> ReportPipeline<'client> {
    /// Pipeline using the client's configured [`ReportPolicy`].
    #[must_use]
    pub fn new(client: &'client Client) -> Self {
        Self {
            client,
            policy: client.config().report.clone(),
        }
    }

    pub async fn run(&self, request: &ImpressionShareRequest) -> Result<SovOutcome> {
        let created = self
            .retry_rate_limited("create custom report", || {
                self.client.create_impression_share_report(request)
            })
            .await?;
        if created.id <= 0 {
            return Err(Error::internal("created custom report carries no id"));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(report_id = created.id, state = %created.state, "custom report created");

        let report = self.await_completion(created).await?;
        let Some(uri) = report
            .download_uri
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
        else {
            return Err(Error::internal(format!(
                "completed custom report {} has no download URI",
                report.id
            )));
        };

        let bytes = self
            .retry_rate_limited("download custom report", || {
                self.client.download_report(uri)
            })
            .await?;
        let csv = String::from_utf8_lossy(&bytes).into_owned();
        let rows = normalize_rows(&csv);
        let decisions = rows.iter().map(DecisionEntry::from).collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(report_id = report.id, rows = rows.len(), "custom report classified");

        Ok(SovOutcome {
            report,
            csv,
            rows,
            decisions,
        })
    }

    /// Polls until the report is terminal. A 429 while polling only delays
    /// the next poll.
    async fn await_completion(&self, mut report: CustomReport) -> Result<CustomReport> {
        let started = Instant::now();
        loop {
            match report.report_state() {
                ReportState::Completed => return Ok(report),
                ReportState::Failed => {
                    return Err(Error::internal(format!(
                        "custom report {} finished in state FAILED",
                        report.id
                    )));
                }
                _ => {
                    let elapsed = started.elapsed();
                    if elapsed >= self.policy.poll_deadline {
                        return Err(Error::timeout(
                            format!("poll custom report {}", report.id),
                            elapsed,
                        ));
                    }

                    #[cfg(feature = "tracing")]
                    tracing::trace!(report_id = report.id, state = %report.state, ?elapsed, "custom report pending");

                    self.pause(self.policy.poll_interval).await?;
                    match self.client.custom_report(report.id).await {
                        Ok(next) => report = next,
                        Err(e) if e.is_rate_limited() => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(report_id = report.id, "rate limited while polling");
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    /// Runs `call`, backing off on 429 for at most `max_attempts` tries.
    /// Other failures and the last rate-limit error are returned as is.
    async fn retry_rate_limited<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limited() && attempt + 1 < self.policy.max_attempts => {
                    let delay = self.policy.backoff_for(attempt);
                    #[cfg(feature = "tracing")]
                    tracing::warn!(operation, attempt, ?delay, "rate limited, backing off");
                    #[cfg(not(feature = "tracing"))]
                    let _: &str = operation;

                    self.pause(delay).await?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn pause(&self, delay: Duration) -> Result<()> {
        tokio::select! {
            () = self.client.cancellation_token().cancelled() => Err(Error::cancelled()),
            () = sleep(delay) => Ok(()),
        }
    }
}
