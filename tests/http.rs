mod common;

use assert_matches::assert_matches;
use serde_json::json;

use mg_toolkit::config::ResolvedConfig;
use mg_toolkit::domain::Hit;
use mg_toolkit::error::ToolkitError;
use mg_toolkit::jsonapi::{JsonApiClient, JsonApiHttpClient};
use mg_toolkit::resolver::{MetadataResolver, SAMPLES};
use mg_toolkit::search::{SearchHttpClient, SequenceSearchClient};

use common::loopback::Loopback;

fn api_config(base: String) -> ResolvedConfig {
    ResolvedConfig {
        api_base: base,
        ..ResolvedConfig::default()
    }
}

fn not_found() -> (u16, String) {
    (
        404,
        json!({"errors": [{"status": "404", "detail": "Not found."}]}).to_string(),
    )
}

#[test]
fn missing_sample_falls_back_to_run_over_http() {
    let server = Loopback::bind();
    let config = api_config(server.url());
    let handle = server.respond(vec![
        not_found(),
        (
            200,
            json!({"data": {
                "type": "runs",
                "id": "ERR1",
                "relationships": {"sample": {"data": {"type": "samples", "id": "ERS1"}}}
            }})
            .to_string(),
        ),
        (
            200,
            json!({"data": {
                "type": "samples",
                "id": "ERS1",
                "attributes": {
                    "sample-metadata": [{"key": "body site", "value": "gut", "unit": null}]
                }
            }})
            .to_string(),
        ),
    ]);

    let api = JsonApiHttpClient::new(&config).unwrap();
    let hit: Hit = serde_json::from_value(json!({"name": "H1", "acc2": "ERR1"})).unwrap();
    let table = MetadataResolver::new(&api).resolve(&[hit]).unwrap();
    assert_eq!(table.get("H1 ERR1").unwrap()["body_site"], "gut ");

    let lines: Vec<String> = handle.join().unwrap().into_iter().map(|r| r.line).collect();
    assert_eq!(
        lines,
        vec![
            "GET /samples/ERR1 HTTP/1.1",
            "GET /runs/ERR1 HTTP/1.1",
            "GET /samples/ERS1 HTTP/1.1",
        ]
    );
}

#[test]
fn status_404_without_body_is_not_found() {
    let server = Loopback::bind();
    let config = api_config(server.url());
    let handle = server.respond(vec![(404, String::new())]);

    let api = JsonApiHttpClient::new(&config).unwrap();
    let err = api.get(SAMPLES, "ERS404").unwrap_err();
    assert!(err.is_not_found());
    handle.join().unwrap();
}

#[test]
fn accession_is_escaped_in_the_request_path() {
    let server = Loopback::bind();
    let config = api_config(server.url());
    let handle = server.respond(vec![not_found()]);

    let api = JsonApiHttpClient::new(&config).unwrap();
    let err = api.get(SAMPLES, "a/b#c").unwrap_err();
    assert_matches!(err, ToolkitError::ResourceNotFound { ref id, .. } if id == "a/b#c");

    let requests = handle.join().unwrap();
    assert_eq!(requests[0].line, "GET /samples/a%2Fb%23c HTTP/1.1");
}

#[test]
fn server_errors_are_not_treated_as_missing() {
    let server = Loopback::bind();
    let config = api_config(server.url());
    let handle = server.respond(vec![(500, "boom".to_string())]);

    let api = JsonApiHttpClient::new(&config).unwrap();
    let err = api.get(SAMPLES, "ERS1").unwrap_err();
    assert_matches!(err, ToolkitError::ApiStatus { status: 500, .. });
    handle.join().unwrap();
}

#[test]
fn iterate_follows_next_links() {
    let server = Loopback::bind();
    let base = server.url();
    let config = api_config(base.clone());
    let handle = server.respond(vec![
        (
            200,
            json!({
                "data": [{"type": "analysis-jobs", "id": "A1"}],
                "links": {"next": format!("{base}/analyses?page=2&study_accession=ERP1")}
            })
            .to_string(),
        ),
        (
            200,
            json!({
                "data": [{"type": "analysis-jobs", "id": "A2"}],
                "links": {"next": null}
            })
            .to_string(),
        ),
    ]);

    let api = JsonApiHttpClient::new(&config).unwrap();
    let analyses = api
        .iterate("analyses", &[("study_accession", "ERP1".to_string())])
        .unwrap();
    let ids: Vec<&str> = analyses.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["A1", "A2"]);

    let lines: Vec<String> = handle.join().unwrap().into_iter().map(|r| r.line).collect();
    assert_eq!(
        lines,
        vec![
            "GET /analyses?study_accession=ERP1 HTTP/1.1",
            "GET /analyses?page=2&study_accession=ERP1 HTTP/1.1",
        ]
    );
}

#[test]
fn search_posts_form_encoded_sequence() {
    let server = Loopback::bind();
    let config = ResolvedConfig {
        search_url: format!("{}/search/phmmer", server.url()),
        ..ResolvedConfig::default()
    };
    let handle = server.respond(vec![(
        200,
        json!({"results": {"hits": [{"name": "H1", "acc2": "ERS1"}]}}).to_string(),
    )]);

    let search = SearchHttpClient::new(&config).unwrap();
    let response = search.search(">q\nMKV\n").unwrap();
    assert_eq!(response.results.hits.len(), 1);

    let requests = handle.join().unwrap();
    let request = &requests[0];
    assert_eq!(request.line, "POST /search/phmmer HTTP/1.1");
    assert_eq!(request.body, "seqdb=full&seq=%3Eq%0AMKV%0A");
    assert_eq!(request.header("accept"), Some("application/json"));
    assert_eq!(
        request.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
}

#[test]
fn search_failure_status_is_reported() {
    let server = Loopback::bind();
    let config = ResolvedConfig {
        search_url: format!("{}/search/phmmer", server.url()),
        ..ResolvedConfig::default()
    };
    let handle = server.respond(vec![(503, "maintenance".to_string())]);

    let search = SearchHttpClient::new(&config).unwrap();
    let err = search.search(">q\nMKV\n").unwrap_err();
    assert_matches!(
        err,
        ToolkitError::SearchStatus { status: 503, ref message } if message == "maintenance"
    );
    handle.join().unwrap();
}
