mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::{Method, StatusCode};
use searchads_client::error::Kind;
use searchads_client::report::Bucket;
use searchads_client::transport::RawResponse;
use searchads_client::types::Granularity;
use searchads_client::{ClientConfig, ImpressionShareRequest, ReportPipeline};
use serde_json::json;

use crate::common::{Scripted, client_with, respond};

const CSV: &str = "searchTerm,searchPopularity,impressionShare,installs,rank\r\n\
                   weather radar,80,0.1,3,2\r\n\
                   \"storm, tracker\",10,0.3,0,5\r\n";

fn weekly_request() -> ImpressionShareRequest {
    ImpressionShareRequest::builder()
        .granularity(Granularity::Weekly)
        .date_range("LAST_4_WEEKS")
        .adam_ids(vec!["123".to_owned()])
        .build()
}

fn report(state: &str, download_uri: Option<&str>) -> serde_json::Value {
    json!({"data": {"id": 9, "state": state, "downloadUri": download_uri}})
}

#[tokio::test(start_paused = true)]
async fn report_runs_to_classified_rows() {
    let polls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&polls);
    let upstream = Scripted::new(move |method, url, body| match (method, url.path()) {
        (&Method::POST, "/api/v5/custom-reports") => {
            let body = body.cloned().unwrap_or_default();
            assert_eq!(body["granularity"], "WEEKLY");
            assert_eq!(body["dateRange"], "LAST_4_WEEKS");
            respond(200, &report("QUEUED", None))
        }
        (&Method::GET, "/api/v5/custom-reports/9") => {
            if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                respond(200, &report("RUNNING", None))
            } else {
                respond(200, &report("COMPLETED", Some("http://reports.apple.com/r/9.csv")))
            }
        }
        (&Method::GET, "/r/9.csv") => {
            assert_eq!(url.scheme(), "https");
            RawResponse::new(StatusCode::OK, CSV)
        }
        _ => respond(404, &json!({})),
    });
    let client = client_with(Arc::clone(&upstream), ClientConfig::default());

    let outcome = ReportPipeline::new(&client)
        .run(&weekly_request())
        .await
        .expect("pipeline");

    assert_eq!(outcome.report.id, 9);
    assert_eq!(polls.load(Ordering::SeqCst), 3);
    assert_eq!(outcome.rows.len(), 2);
    assert_eq!(outcome.rows[1].keyword, "storm, tracker");
    assert_eq!(outcome.decisions[0].bucket, Bucket::AuctionLimited);
    assert_eq!(outcome.decisions[1].bucket, Bucket::ConversionLimited);
    assert_eq!(upstream.calls("GET reports.apple.com/r/9.csv"), 1);
}

#[tokio::test(start_paused = true)]
async fn report_that_never_finishes_times_out() {
    let upstream = Scripted::new(|method, url, _| match (method, url.path()) {
        (&Method::POST, "/api/v5/custom-reports") => respond(200, &report("PENDING", None)),
        (&Method::GET, "/api/v5/custom-reports/9") => respond(200, &report("RUNNING", None)),
        _ => respond(404, &json!({})),
    });
    let client = client_with(Arc::clone(&upstream), ClientConfig::default());

    let err = ReportPipeline::new(&client)
        .run(&weekly_request())
        .await
        .expect_err("deadline");

    assert_eq!(err.kind(), Kind::Timeout);
    // one poll every 4 s inside a 120 s budget
    assert_eq!(upstream.calls("GET api.searchads.apple.com/api/v5/custom-reports/9"), 30);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_create_backs_off_then_succeeds() {
    let creates = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&creates);
    let upstream = Scripted::new(move |method, url, _| match (method, url.path()) {
        (&Method::POST, "/api/v5/custom-reports") => {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                respond(429, &json!({"error": "slow down"}))
            } else {
                respond(
                    200,
                    &report("COMPLETED", Some("https://api.searchads.apple.com/r/9.csv")),
                )
            }
        }
        (&Method::GET, "/r/9.csv") => RawResponse::new(StatusCode::OK, "searchTerm\n"),
        _ => respond(404, &json!({})),
    });
    let client = client_with(Arc::clone(&upstream), ClientConfig::default());

    let started = tokio::time::Instant::now();
    let outcome = ReportPipeline::new(&client)
        .run(&weekly_request())
        .await
        .expect("third attempt succeeds");

    assert_eq!(creates.load(Ordering::SeqCst), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(2 + 5));
    assert!(outcome.rows.is_empty());
}

#[tokio::test(start_paused = true)]
async fn rate_limited_download_backs_off_then_succeeds() {
    let downloads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&downloads);
    let upstream = Scripted::new(move |method, url, _| match (method, url.path()) {
        (&Method::POST, "/api/v5/custom-reports") => respond(
            200,
            &report("COMPLETED", Some("https://api.searchads.apple.com/r/9.csv")),
        ),
        (&Method::GET, "/r/9.csv") => {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                respond(429, &json!({"error": "slow down"}))
            } else {
                RawResponse::new(StatusCode::OK, CSV)
            }
        }
        _ => respond(404, &json!({})),
    });
    let client = client_with(Arc::clone(&upstream), ClientConfig::default());

    let started = tokio::time::Instant::now();
    let outcome = ReportPipeline::new(&client)
        .run(&weekly_request())
        .await
        .expect("third download succeeds");

    assert_eq!(upstream.calls("POST"), 1);
    assert_eq!(upstream.calls("GET api.searchads.apple.com/r/9.csv"), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(2 + 5));
    assert_eq!(outcome.rows.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_create_is_not_retried() {
    let upstream = Scripted::new(|method, url, _| match (method, url.path()) {
        (&Method::POST, "/api/v5/custom-reports") => {
            respond(500, &json!({"error": "internal"}))
        }
        _ => respond(200, &report("COMPLETED", None)),
    });
    let client = client_with(Arc::clone(&upstream), ClientConfig::default());

    let started = tokio::time::Instant::now();
    let err = ReportPipeline::new(&client)
        .run(&weekly_request())
        .await
        .expect_err("server error");

    assert_eq!(err.kind(), Kind::Status);
    assert_eq!(err.status_code(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(upstream.calls("POST"), 1);
    assert_eq!(upstream.calls("GET"), 0);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_retries_are_bounded() {
    let upstream = Scripted::new(|_, _, _| respond(429, &json!({})));
    let client = client_with(Arc::clone(&upstream), ClientConfig::default());

    let err = ReportPipeline::new(&client)
        .run(&weekly_request())
        .await
        .expect_err("exhausted");

    assert!(err.is_rate_limited());
    assert_eq!(upstream.calls("POST"), 4);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_while_polling_keeps_polling() {
    let polls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&polls);
    let upstream = Scripted::new(move |method, url, _| match (method, url.path()) {
        (&Method::POST, "/api/v5/custom-reports") => respond(200, &report("QUEUED", None)),
        (&Method::GET, "/api/v5/custom-reports/9") => match seen.fetch_add(1, Ordering::SeqCst) {
            0 | 1 => respond(429, &json!({})),
            _ => respond(200, &report("FAILED", None)),
        },
        _ => respond(404, &json!({})),
    });
    let client = client_with(Arc::clone(&upstream), ClientConfig::default());

    let err = ReportPipeline::new(&client)
        .run(&weekly_request())
        .await
        .expect_err("failed upstream");

    assert_eq!(err.kind(), Kind::Internal);
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn untrusted_download_host_is_never_contacted() {
    let upstream = Scripted::new(|method, url, _| match (method, url.path()) {
        (&Method::POST, "/api/v5/custom-reports") => {
            respond(200, &report("COMPLETED", Some("https://evil.example.com/r.csv")))
        }
        _ => respond(200, &json!("should not be reached")),
    });
    let client = client_with(Arc::clone(&upstream), ClientConfig::default());

    let err = ReportPipeline::new(&client)
        .run(&weekly_request())
        .await
        .expect_err("untrusted");

    assert_eq!(err.kind(), Kind::Validation);
    assert_eq!(upstream.calls("GET evil.example.com"), 0);
    assert_eq!(upstream.log().len(), 1, "only the create call: {:?}", upstream.log());
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_polling() {
    let upstream = Scripted::new(|method, url, _| match (method, url.path()) {
        (&Method::POST, "/api/v5/custom-reports") => respond(200, &report("RUNNING", None)),
        _ => respond(200, &report("RUNNING", None)),
    });
    let client = client_with(Arc::clone(&upstream), ClientConfig::default());
    let cancel = client.cancellation_token().clone();

    let run = async { ReportPipeline::new(&client).run(&weekly_request()).await };
    let cancel_later = async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        cancel.cancel();
    };
    let (result, ()) = tokio::join!(run, cancel_later);

    let err = result.expect_err("cancelled");
    assert_eq!(err.kind(), Kind::Cancelled);
    assert!(upstream.calls("GET") < 3);
}
