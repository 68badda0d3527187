use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::engine::{
    build_client, ClientOptions, FilterSpec, ProbeEngine, ProbeResult, SinkRef,
};
use crate::generator::{Generator, TargetOs};
use crate::output::{CollectingSink, HitCounter};
use crate::runner::{Options, Runner};

const PASSWD_BODY: &str = "root:x:0:0:root:/root:/bin/bash\n\
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin\n\
bin:x:2:2:bin:/bin:/usr/sbin/nologin\n";

fn filters(status: &[&str], size: &[&str]) -> FilterSpec {
    FilterSpec::parse(status, size).unwrap()
}

fn client() -> reqwest::Client {
    build_client(&ClientOptions::default()).unwrap()
}

fn passwd_payloads(max_depth: usize) -> Vec<String> {
    Generator::new(TargetOs::Linux, max_depth, Some("/etc/passwd")).payloads()
}

#[derive(Default)]
struct Recorder {
    results: Mutex<Vec<ProbeResult>>,
}

impl Recorder {
    fn taken(&self) -> Vec<ProbeResult> {
        self.results.lock().unwrap().clone()
    }
}

impl crate::engine::ResultSink for Recorder {
    fn on_result(&self, result: &ProbeResult) {
        self.results.lock().unwrap().push(result.clone());
    }
}

async fn mount_passwd_at(server: &MockServer, payload: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path("/showimage.php"))
        .and(query_param("file", payload))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn reports_the_single_leaking_payload() {
    let server = MockServer::start().await;
    mount_passwd_at(&server, "../../etc/passwd", PASSWD_BODY).await;

    let template = format!("{}/showimage.php?file=FUZZ", server.uri());
    let recorder = Arc::new(Recorder::default());
    let engine = ProbeEngine::new(
        &template,
        "FUZZ",
        passwd_payloads(3),
        filters(&["200"], &["100"]),
        client(),
    )
    .unwrap()
    .with_sink(recorder.clone());

    engine.run().await;

    let results = recorder.taken();
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].url,
        format!("{}/showimage.php?file=../../etc/passwd", server.uri())
    );
    assert_eq!(results[0].status, 200);
    assert_eq!(results[0].size, PASSWD_BODY.len());
    assert_eq!(results[0].content, PASSWD_BODY);

    let counters = engine.counters();
    assert_eq!(counters.dispatched, 4);
    assert_eq!(counters.responded, 4);
    assert_eq!(counters.hits, 1);
    assert_eq!(counters.filtered, 3);
}

#[tokio::test]
async fn ok_response_without_signature_is_not_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nothing to see here</html>"))
        .mount(&server)
        .await;

    let template = format!("{}/showimage.php?file=FUZZ", server.uri());
    let recorder = Arc::new(Recorder::default());
    let engine = ProbeEngine::new(
        &template,
        "FUZZ",
        passwd_payloads(2),
        FilterSpec::default(),
        client(),
    )
    .unwrap()
    .with_sink(recorder.clone());

    engine.run().await;

    assert!(recorder.taken().is_empty());
    assert_eq!(engine.counters().signature_mismatch, 3);
}

#[tokio::test]
async fn transport_failures_are_counted_not_reported() {
    let template = format!("http://127.0.0.1:{}/showimage.php?file=FUZZ", closed_port());
    let recorder = Arc::new(Recorder::default());
    let engine = ProbeEngine::new(
        &template,
        "FUZZ",
        passwd_payloads(4),
        FilterSpec::default(),
        client(),
    )
    .unwrap()
    .with_sink(recorder.clone());

    engine.run().await;

    assert!(recorder.taken().is_empty());
    let counters = engine.counters();
    assert_eq!(counters.dispatched, 5);
    assert_eq!(counters.transport_failures, 5);
    assert_eq!(counters.responded, 0);
}

#[tokio::test]
async fn body_below_min_size_is_filtered() {
    let server = MockServer::start().await;
    mount_passwd_at(&server, "../etc/passwd", PASSWD_BODY).await;

    let template = format!("{}/showimage.php?file=FUZZ", server.uri());
    let hits = HitCounter::new_ref();
    let engine = ProbeEngine::new(
        &template,
        "FUZZ",
        passwd_payloads(1),
        filters(&["200"], &["4096"]),
        client(),
    )
    .unwrap()
    .with_sink(hits.clone());

    engine.run().await;

    assert!(!hits.any());
    assert_eq!(engine.counters().filtered, 2);
}

#[tokio::test]
async fn status_filter_that_excludes_200_suppresses_hits() {
    let server = MockServer::start().await;
    mount_passwd_at(&server, "../etc/passwd", PASSWD_BODY).await;

    let template = format!("{}/showimage.php?file=FUZZ", server.uri());
    let hits = HitCounter::new_ref();
    let engine = ProbeEngine::new(
        &template,
        "FUZZ",
        passwd_payloads(1),
        filters(&["30?"], &[]),
        client(),
    )
    .unwrap()
    .with_sink(hits.clone());

    engine.run().await;

    assert_eq!(hits.hits(), 0);
}

#[tokio::test]
async fn non_200_passwd_body_is_never_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string(PASSWD_BODY))
        .mount(&server)
        .await;

    let template = format!("{}/showimage.php?file=FUZZ", server.uri());
    let hits = HitCounter::new_ref();
    let engine = ProbeEngine::new(
        &template,
        "FUZZ",
        passwd_payloads(2),
        filters(&["*"], &[]),
        client(),
    )
    .unwrap()
    .with_sink(hits.clone());

    engine.run().await;

    assert!(!hits.any());
    assert_eq!(engine.counters().filtered, 3);
}

#[tokio::test]
async fn every_sink_sees_each_hit_once() {
    let server = MockServer::start().await;
    mount_passwd_at(&server, "../../../etc/passwd", PASSWD_BODY).await;

    let template = format!("{}/showimage.php?file=FUZZ", server.uri());
    let first = HitCounter::new_ref();
    let second = HitCounter::new_ref();
    let closure_calls = Arc::new(AtomicUsize::new(0));
    let calls = closure_calls.clone();
    let closure: SinkRef = Arc::new(move |_: &ProbeResult| {
        calls.fetch_add(1, Ordering::SeqCst);
    });

    let engine = ProbeEngine::new(
        &template,
        "FUZZ",
        passwd_payloads(5),
        filters(&["200"], &[]),
        client(),
    )
    .unwrap()
    .with_sink(first.clone())
    .with_sink(second.clone())
    .with_sink(closure);

    engine.run().await;

    assert_eq!(first.hits(), 1);
    assert_eq!(second.hits(), 1);
    assert_eq!(closure_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn capped_concurrency_still_probes_every_payload() {
    let server = MockServer::start().await;
    mount_passwd_at(&server, "../../etc/passwd", PASSWD_BODY).await;
    mount_passwd_at(&server, "../../../../etc/passwd", PASSWD_BODY).await;

    let template = format!("{}/showimage.php?file=FUZZ", server.uri());
    let recorder = Arc::new(Recorder::default());
    let engine = ProbeEngine::new(
        &template,
        "FUZZ",
        passwd_payloads(6),
        filters(&["2*"], &[]),
        client(),
    )
    .unwrap()
    .with_concurrency(Some(2))
    .with_sink(recorder.clone());

    engine.run().await;

    let mut urls: Vec<String> = recorder.taken().into_iter().map(|r| r.url).collect();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            format!("{}/showimage.php?file=../../../../etc/passwd", server.uri()),
            format!("{}/showimage.php?file=../../etc/passwd", server.uri()),
        ]
    );
    assert_eq!(engine.counters().dispatched, 7);
    assert_eq!(server.received_requests().await.unwrap().len(), 7);
}

#[tokio::test]
async fn progress_is_reported_for_every_payload() {
    struct Progress {
        seen: AtomicUsize,
        last: AtomicUsize,
    }

    impl crate::engine::ResultSink for Progress {
        fn on_result(&self, _result: &ProbeResult) {}

        fn on_progress(&self, finished: usize, total: usize) {
            self.seen.fetch_add(1, Ordering::SeqCst);
            self.last.fetch_max(finished, Ordering::SeqCst);
            assert_eq!(total, 3);
        }
    }

    let template = format!("http://127.0.0.1:{}/?file=FUZZ", closed_port());
    let progress = Arc::new(Progress {
        seen: AtomicUsize::new(0),
        last: AtomicUsize::new(0),
    });
    let engine = ProbeEngine::new(
        &template,
        "FUZZ",
        passwd_payloads(2),
        FilterSpec::default(),
        client(),
    )
    .unwrap()
    .with_sink(progress.clone());

    engine.run().await;

    assert_eq!(progress.seen.load(Ordering::SeqCst), 3);
    assert_eq!(progress.last.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn rerunning_an_engine_starts_counters_from_zero() {
    struct MaxFinished(AtomicUsize);

    impl crate::engine::ResultSink for MaxFinished {
        fn on_result(&self, _result: &ProbeResult) {}

        fn on_progress(&self, finished: usize, total: usize) {
            assert!(finished <= total);
            self.0.fetch_max(finished, Ordering::SeqCst);
        }
    }

    let template = format!("http://127.0.0.1:{}/?file=FUZZ", closed_port());
    let progress = Arc::new(MaxFinished(AtomicUsize::new(0)));
    let engine = ProbeEngine::new(
        &template,
        "FUZZ",
        passwd_payloads(2),
        FilterSpec::default(),
        client(),
    )
    .unwrap()
    .with_sink(progress.clone());

    engine.run().await;
    engine.run().await;

    let counters = engine.counters();
    assert_eq!(counters.dispatched, 3);
    assert_eq!(counters.transport_failures, 3);
    assert_eq!(progress.0.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn undecodable_body_is_dropped_as_a_failure() {
    let server = MockServer::start().await;
    let mut body = PASSWD_BODY.as_bytes().to_vec();
    body.extend_from_slice(&[0xff, 0xfe, b'\n']);
    Mock::given(method("GET"))
        .and(path("/showimage.php"))
        .and(query_param("file", "../etc/passwd"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/plain; charset=utf-8"))
        .mount(&server)
        .await;

    let template = format!("{}/showimage.php?file=FUZZ", server.uri());
    let recorder = Arc::new(Recorder::default());
    let engine = ProbeEngine::new(
        &template,
        "FUZZ",
        passwd_payloads(1),
        FilterSpec::default(),
        client(),
    )
    .unwrap()
    .with_sink(recorder.clone());

    engine.run().await;

    assert!(recorder.taken().is_empty());
    let counters = engine.counters();
    assert_eq!(counters.hits, 0);
    assert_eq!(counters.transport_failures, 1);
    assert_eq!(counters.responded, 1);
}

#[tokio::test]
async fn size_is_utf8_byte_length_and_every_placeholder_is_filled() {
    let body = format!("{}\u{e9}\u{20ac}\u{1f600}", PASSWD_BODY);
    assert_ne!(body.len(), body.chars().count());

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/showimage.php"))
        .and(query_param("a", "../etc/passwd"))
        .and(query_param("b", "../etc/passwd"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.clone(), "text/plain; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let template = format!("{}/showimage.php?a=FUZZ&b=FUZZ", server.uri());
    let min_size = body.len().to_string();
    let recorder = Arc::new(Recorder::default());
    let engine = ProbeEngine::new(
        &template,
        "FUZZ",
        passwd_payloads(1),
        filters(&["200"], &[min_size.as_str()]),
        client(),
    )
    .unwrap()
    .with_sink(recorder.clone());

    engine.run().await;

    let results = recorder.taken();
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].url,
        format!("{}/showimage.php?a=../etc/passwd&b=../etc/passwd", server.uri())
    );
    assert_eq!(results[0].size, body.len());
    assert_ne!(results[0].size, body.chars().count());
    assert_eq!(results[0].content, body);
}

#[tokio::test]
async fn runner_scans_default_linux_files_end_to_end() {
    let server = MockServer::start().await;
    mount_passwd_at(&server, "../../etc/passwd", PASSWD_BODY).await;
    Mock::given(method("GET"))
        .and(query_param("file", "../../etc/shadow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("root:!:19000::::::"))
        .mount(&server)
        .await;

    let runner = Runner::new(Options {
        template: format!("{}/showimage.php?file=FUZZ", server.uri()),
        max_depth: 3,
        status_filters: vec!["200".to_string()],
        ..Options::default()
    })
    .unwrap();
    let collector = CollectingSink::new_ref();
    let summary = runner.run(vec![collector.clone() as SinkRef]).await.unwrap();

    assert_eq!(summary.payloads, 12);
    assert_eq!(summary.hits, 1);
    assert_eq!(summary.counters.dispatched, 12);
    let records = collector.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].url.ends_with("file=../../etc/passwd"));
}

#[tokio::test]
async fn runner_with_custom_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/view"))
        .and(query_param("page", "../etc/passwd"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PASSWD_BODY))
        .mount(&server)
        .await;

    let runner = Runner::new(Options {
        template: format!("{}/view?page=@@", server.uri()),
        placeholder: "@@".to_string(),
        custom_file: Some("/etc/passwd".to_string()),
        max_depth: 2,
        ..Options::default()
    })
    .unwrap();
    let hits = HitCounter::new_ref();
    let summary = runner.run(vec![hits.clone() as SinkRef]).await.unwrap();

    assert_eq!(summary.payloads, 3);
    assert_eq!(hits.hits(), 1);
}
