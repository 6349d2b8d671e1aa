use std::path::Path;

use marketscout_lib::storage::{read_csv, read_jsonl};
use marketscout_lib::{
    CategoryRegistry, Client, FetchConfig, Pipeline, ScoutConfig, TokioPacer,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(path).unwrap()
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

fn config(dir: &Path) -> ScoutConfig {
    ScoutConfig {
        delay_min: 0.0,
        delay_max: 0.0,
        timeout_seconds: 5.0,
        output_dir: dir.join("processed"),
        raw_dir: dir.join("raw"),
        ..ScoutConfig::default()
    }
}

fn fast_client() -> Client {
    Client::new(FetchConfig {
        max_retries: 0,
        base_delay_ms: 1,
        max_delay_ms: 5,
    })
}

async fn mount_indiamart(server: &MockServer) {
    for (page, file) in [
        ("1", "indiamart_valves_p1.html"),
        ("2", "indiamart_valves_p2.html"),
        ("3", "empty_results.html"),
    ] {
        Mock::given(method("GET"))
            .and(path("/impcat/valves.html"))
            .and(query_param("pg", page))
            .respond_with(html(fixture(file)))
            .expect(1)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn collects_paginates_and_persists() {
    let server = MockServer::start().await;
    mount_indiamart(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let registry = CategoryRegistry::from_yaml(&format!(
        "indiamart:\n  valves: {}/impcat/valves.html\n",
        server.uri()
    ))
    .unwrap();

    let client = fast_client();
    let report = Pipeline::new(&cfg, &client, &TokioPacer)
        .run(&registry, |_| {})
        .await
        .unwrap();

    assert_eq!(report.categories.len(), 1);
    assert_eq!(report.categories[0].raw_count, 4);
    assert_eq!(report.total_written, 4);
    assert!(report.rejections.is_empty());

    let products = read_jsonl(&report.outputs.jsonl).unwrap();
    let titles: Vec<&str> = products.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(
        titles,
        [
            "Brass Ball Valve",
            "Cast Iron Gate Valve",
            "Needle Valve",
            "Butterfly Valve"
        ]
    );

    let brass = &products[0];
    assert_eq!(brass.marketplace, "indiamart");
    assert_eq!(brass.category, "valves");
    assert_eq!(
        brass.url.as_deref(),
        Some(format!("{}/proddetail/brass-ball-valve-101.html", server.uri()).as_str())
    );
    assert_eq!(brass.price_min, Some(500.0));
    assert_eq!(brass.price_max, Some(700.0));
    assert_eq!(brass.currency.as_deref(), Some("INR"));
    assert_eq!(brass.supplier_name.as_deref(), Some("Shree Ganesh Valves"));

    let gate = &products[1];
    assert_eq!(
        gate.url.as_deref(),
        Some("https://dir.example.com/proddetail/gate-valve-102.html")
    );
    assert_eq!(gate.price_min, Some(1250.0));

    let needle = &products[2];
    assert!(needle.price_min.is_none());
    assert!(needle.currency.is_none());

    assert_eq!(read_csv(&report.outputs.csv).unwrap(), products);
}

#[tokio::test]
async fn limit_stops_before_second_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/impcat/valves.html"))
        .and(query_param("pg", "1"))
        .respond_with(html(fixture("indiamart_valves_p1.html")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = ScoutConfig {
        limit_per_category: 2,
        ..config(dir.path())
    };
    let registry = CategoryRegistry::from_yaml(&format!(
        "indiamart:\n  valves: {}/impcat/valves.html\n",
        server.uri()
    ))
    .unwrap();

    let client = fast_client();
    let report = Pipeline::new(&cfg, &client, &TokioPacer)
        .run(&registry, |_| {})
        .await
        .unwrap();
    assert_eq!(report.total_written, 2);
}

#[tokio::test]
async fn http_error_keeps_partial_results_and_next_category_runs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/impcat/valves.html"))
        .and(query_param("pg", "1"))
        .respond_with(html(fixture("indiamart_valves_p1.html")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/impcat/valves.html"))
        .and(query_param("pg", "2"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalog/pipes_cid7_p1.html"))
        .respond_with(html(fixture("alibaba_pipes_p1.html")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalog/pipes_cid7_p2.html"))
        .respond_with(html(fixture("empty_results.html")))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let registry = CategoryRegistry::from_yaml(&format!(
        "indiamart:\n  valves: {uri}/impcat/valves.html\nalibaba:\n  pipes: {uri}/catalog/pipes_cid7_p1.html\n",
        uri = server.uri()
    ))
    .unwrap();

    let client = fast_client();
    let report = Pipeline::new(&cfg, &client, &TokioPacer)
        .run(&registry, |_| {})
        .await
        .unwrap();

    assert_eq!(report.categories[0].raw_count, 3);
    assert_eq!(report.categories[1].marketplace, "alibaba");
    assert_eq!(report.categories[1].raw_count, 2);
    assert_eq!(report.total_written, 5);

    let products = read_jsonl(&report.outputs.jsonl).unwrap();
    let steel = products
        .iter()
        .find(|p| p.title == "Seamless Steel Pipe")
        .unwrap();
    assert_eq!(steel.price_min, Some(12.5));
    assert_eq!(steel.price_max, Some(18.0));
    assert_eq!(steel.currency.as_deref(), Some("USD"));
    assert_eq!(steel.supplier_name.as_deref(), Some("Tianjin Steel Co."));
}

#[tokio::test]
async fn raw_pages_archived_under_marketplace_dir() {
    let server = MockServer::start().await;
    mount_indiamart(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = ScoutConfig {
        save_raw_html: true,
        ..config(dir.path())
    };
    let registry = CategoryRegistry::from_yaml(&format!(
        "indiamart:\n  ball valves: {}/impcat/valves.html\n",
        server.uri()
    ))
    .unwrap();

    let client = fast_client();
    Pipeline::new(&cfg, &client, &TokioPacer)
        .run(&registry, |_| {})
        .await
        .unwrap();

    let raw = dir.path().join("raw/indiamart");
    for page in 1..=3 {
        assert!(raw.join(format!("ball_valves_p{}.html", page)).exists());
    }
}
