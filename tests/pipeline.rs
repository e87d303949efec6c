//! End-to-end pipeline tests with a fake renderer and a scripted model.
//!
//! No browser, network or wall-clock waits are involved.

mod common;

use common::{
    rate_limited, scraper, test_config, FakeRenderer, RecordingSleeper, ScriptedClient,
    CONTACT_PAGE, MODEL_ANSWER,
};
use pagesift::{
    CompletionError, ErrorKind, ScrapeConfig, ScrapeError, ScrapeProgressCallback, ScrapeRequest,
    Stage,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn merge_takes_emails_from_patterns_and_the_rest_from_the_model() {
    let s = scraper(
        test_config(),
        FakeRenderer::page(CONTACT_PAGE),
        ScriptedClient::answering(MODEL_ANSWER),
        Arc::new(RecordingSleeper::default()),
    );

    let report = s.scrape_report("https://shop.example").await.unwrap();

    // The deterministic path found one of each...
    assert_eq!(report.patterns.emails, vec!["info@shop.com"]);
    assert_eq!(report.patterns.phones, vec!["555-123-4567"]);
    assert_eq!(report.patterns.addresses, vec!["12 Main Street"]);

    // ...but only the email survives into the response.
    let data = &report.response.extracted_data;
    assert_eq!(data.emails.len(), 1);
    assert_eq!(data.phone_numbers, vec!["+1 (800) 555-0000"]);
    assert_eq!(data.addresses, vec!["1 Infinite Loop, Cupertino"]);
    assert_eq!(report.response.summary, "A small corner shop.");
    assert_eq!(report.final_url.as_deref(), Some("https://shop.example"));
}

#[tokio::test]
async fn response_serialises_to_the_wire_shape() {
    let s = scraper(
        test_config(),
        FakeRenderer::page(CONTACT_PAGE),
        ScriptedClient::answering(MODEL_ANSWER),
        Arc::new(RecordingSleeper::default()),
    );
    let resp = s
        .handle(&ScrapeRequest::new("https://shop.example"))
        .await
        .unwrap();
    let json = serde_json::to_value(&resp).unwrap();
    let keys: Vec<_> = json["extractedData"]
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    assert_eq!(keys.len(), 3);
    for key in ["emails", "phoneNumbers", "addresses"] {
        assert!(json["extractedData"][key].is_array(), "{key}");
    }
    assert!(json["summary"].is_string());
}

#[tokio::test]
async fn missing_url_runs_no_stage() {
    let renderer = FakeRenderer::page(CONTACT_PAGE);
    let client = ScriptedClient::answering(MODEL_ANSWER);
    let s = scraper(
        test_config(),
        renderer.clone(),
        client.clone(),
        Arc::new(RecordingSleeper::default()),
    );

    let err = s.handle(&ScrapeRequest::default()).await.unwrap_err();
    assert!(matches!(err, ScrapeError::MissingUrl));
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(renderer.calls(), 0);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn prompt_is_capped_but_patterns_see_everything() {
    let body = format!("{} tail@shop.com", "a".repeat(5000));
    let html = format!("<html><body>{body}</body></html>");
    let client = ScriptedClient::answering(MODEL_ANSWER);
    let s = scraper(
        test_config(),
        FakeRenderer::page(html),
        client.clone(),
        Arc::new(RecordingSleeper::default()),
    );

    let report = s.scrape_report("https://long.example").await.unwrap();
    assert_eq!(report.response.extracted_data.emails, vec!["tail@shop.com"]);
    assert!(report.stats.truncated);
    assert_eq!(report.stats.prompt_chars, 3000);
    assert_eq!(report.stats.text_chars, body.chars().count());

    let prompt = client.last_prompt().unwrap();
    assert!(prompt.contains(&format!("{}... [Content Truncated]", "a".repeat(3000))));
    assert!(!prompt.contains(&"a".repeat(3001)));
    assert!(!prompt.contains("tail@shop.com"));
}

#[tokio::test]
async fn short_text_reaches_the_prompt_unmodified() {
    let client = ScriptedClient::answering(MODEL_ANSWER);
    let s = scraper(
        test_config(),
        FakeRenderer::page("<body>Open daily 9 to 5.</body>"),
        client.clone(),
        Arc::new(RecordingSleeper::default()),
    );
    s.scrape("https://hours.example").await.unwrap();
    let prompt = client.last_prompt().unwrap();
    assert!(prompt.contains("```\nOpen daily 9 to 5.\n```"));
    assert!(!prompt.contains("[Content Truncated]"));
}

#[tokio::test]
async fn two_rate_limits_then_success_waits_twice() {
    let client = ScriptedClient::new(vec![
        rate_limited(),
        rate_limited(),
        Ok(MODEL_ANSWER.to_string()),
    ]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let s = scraper(
        test_config(),
        FakeRenderer::page(CONTACT_PAGE),
        client.clone(),
        sleeper.clone(),
    );

    let report = s.scrape_report("https://shop.example").await.unwrap();
    assert_eq!(report.response.summary, "A small corner shop.");
    assert_eq!(report.stats.model_attempts, 3);
    assert_eq!(client.calls(), 3);
    assert_eq!(
        sleeper.waits(),
        vec![Duration::from_millis(1000), Duration::from_millis(2000)]
    );
}

#[tokio::test]
async fn three_rate_limits_exhaust_the_budget() {
    let client = ScriptedClient::new(vec![
        rate_limited(),
        rate_limited(),
        rate_limited(),
        Ok(MODEL_ANSWER.to_string()),
    ]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let s = scraper(
        test_config(),
        FakeRenderer::page(CONTACT_PAGE),
        client.clone(),
        sleeper.clone(),
    );

    let err = s.scrape("https://shop.example").await.unwrap_err();
    assert!(matches!(err, ScrapeError::RateLimitExhausted { attempts: 3, .. }));
    assert_eq!(err.kind(), ErrorKind::ModelRateLimited);
    assert_eq!(err.kind().status_code(), 500);
    assert_eq!(client.calls(), 3);
    assert_eq!(sleeper.waits().len(), 2);
}

#[tokio::test]
async fn backoff_follows_configuration() {
    let config = ScrapeConfig::builder()
        .api_key("gsk_test")
        .max_attempts(4)
        .retry_backoff_ms(250)
        .build()
        .unwrap();
    let client = ScriptedClient::new(vec![
        rate_limited(),
        rate_limited(),
        rate_limited(),
        Ok(MODEL_ANSWER.to_string()),
    ]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let s = scraper(config, FakeRenderer::page(CONTACT_PAGE), client, sleeper.clone());

    s.scrape("https://shop.example").await.unwrap();
    assert_eq!(
        sleeper.waits(),
        vec![
            Duration::from_millis(250),
            Duration::from_millis(500),
            Duration::from_millis(1000)
        ]
    );
}

#[tokio::test]
async fn non_rate_limit_errors_fail_at_once() {
    let client = ScriptedClient::new(vec![Err(CompletionError::Api {
        status: 401,
        code: Some("invalid_api_key".into()),
        message: "Invalid API Key".into(),
    })]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let s = scraper(
        test_config(),
        FakeRenderer::page(CONTACT_PAGE),
        client.clone(),
        sleeper.clone(),
    );

    let err = s.scrape("https://shop.example").await.unwrap_err();
    match &err {
        ScrapeError::Model { message } => assert!(message.contains("Invalid API Key")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(client.calls(), 1);
    assert!(sleeper.waits().is_empty());
}

#[tokio::test]
async fn fenced_model_answer_is_accepted() {
    let fenced = format!("```json\n{MODEL_ANSWER}\n```");
    let s = scraper(
        test_config(),
        FakeRenderer::page(CONTACT_PAGE),
        ScriptedClient::answering(&fenced),
        Arc::new(RecordingSleeper::default()),
    );
    let resp = s.scrape("https://shop.example").await.unwrap();
    assert_eq!(resp.summary, "A small corner shop.");
}

#[tokio::test]
async fn malformed_answer_is_not_retried() {
    let client = ScriptedClient::new(vec![
        Ok(r#"{"phoneNumbers":"not-an-array","addresses":[],"summary":"x"}"#.into()),
        Ok(MODEL_ANSWER.into()),
    ]);
    let s = scraper(
        test_config(),
        FakeRenderer::page(CONTACT_PAGE),
        client.clone(),
        Arc::new(RecordingSleeper::default()),
    );
    let err = s.scrape("https://shop.example").await.unwrap_err();
    assert!(matches!(err, ScrapeError::MalformedResponse { .. }));
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn empty_completion_is_rejected() {
    let s = scraper(
        test_config(),
        FakeRenderer::page(CONTACT_PAGE),
        ScriptedClient::answering(""),
        Arc::new(RecordingSleeper::default()),
    );
    let err = s.scrape("https://shop.example").await.unwrap_err();
    assert!(matches!(err, ScrapeError::EmptyResponse));
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

#[tokio::test]
async fn render_failure_skips_the_model() {
    let client = ScriptedClient::answering(MODEL_ANSWER);
    let s = scraper(
        test_config(),
        FakeRenderer::unreachable(),
        client.clone(),
        Arc::new(RecordingSleeper::default()),
    );
    let err = s.scrape("https://nowhere.invalid").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(client.calls(), 0);
}

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl EventLog {
    fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl ScrapeProgressCallback for EventLog {
    fn on_scrape_start(&self, url: &str) {
        self.push(format!("scrape:{url}"));
    }
    fn on_stage_start(&self, stage: Stage) {
        self.push(format!("start:{stage}"));
    }
    fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
        self.push(format!("done:{stage}"));
    }
    fn on_stage_failed(&self, stage: Stage, _error: &str) {
        self.push(format!("failed:{stage}"));
    }
    fn on_retry(&self, attempt: u32, delay_ms: u64) {
        self.push(format!("retry:{attempt}:{delay_ms}"));
    }
    fn on_scrape_complete(&self, _total_ms: u64) {
        self.push("complete".into());
    }
}

#[tokio::test]
async fn progress_events_follow_the_stages() {
    let log = Arc::new(EventLog::default());
    let config = ScrapeConfig::builder()
        .api_key("gsk_test")
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let s = scraper(
        config,
        FakeRenderer::page(CONTACT_PAGE),
        ScriptedClient::new(vec![rate_limited(), Ok(MODEL_ANSWER.into())]),
        Arc::new(RecordingSleeper::default()),
    );
    s.scrape("https://shop.example").await.unwrap();

    let events = log.events();
    assert_eq!(events.first().map(String::as_str), Some("scrape:https://shop.example"));
    assert_eq!(events.last().map(String::as_str), Some("complete"));
    assert_eq!(events[1], "start:render");
    assert_eq!(events[2], "done:render");
    assert!(events.contains(&"retry:1:1000".to_string()));
    for stage in [
        Stage::ExtractText,
        Stage::ExtractPatterns,
        Stage::BuildPrompt,
        Stage::Complete,
        Stage::Normalize,
    ] {
        assert!(events.contains(&format!("done:{stage}")), "{stage}");
    }
    let pos = |e: &str| events.iter().position(|x| x == e).unwrap();
    assert!(pos("done:build-prompt") < pos("start:complete"));
    assert!(pos("done:complete") < pos("start:normalize"));
}

#[tokio::test]
async fn failed_stage_is_reported() {
    let log = Arc::new(EventLog::default());
    let config = ScrapeConfig::builder()
        .api_key("gsk_test")
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let s = scraper(
        config,
        FakeRenderer::page(CONTACT_PAGE),
        ScriptedClient::answering("not json"),
        Arc::new(RecordingSleeper::default()),
    );
    assert!(s.scrape("https://shop.example").await.is_err());

    let events = log.events();
    assert!(events.contains(&"failed:normalize".to_string()));
    assert!(!events.contains(&"complete".to_string()));
}
