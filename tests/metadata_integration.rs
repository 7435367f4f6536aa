//! Integration tests for metadata page polling.

mod support;

use harvester_core::download::HttpClient;
use harvester_core::metadata::{MetadataClient, MetadataError, PageRequest, YearWindow};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::fast_policy;

fn client(server: &MockServer, attempts: u32) -> MetadataClient {
    MetadataClient::with_base_url(HttpClient::for_services(), format!("{}/json.php", server.uri()))
        .with_poll_policy(fast_policy(attempts))
}

fn first_page() -> PageRequest {
    PageRequest {
        offset: 1,
        limit: 3,
        window: YearWindow::for_year(2019).unwrap(),
    }
}

async fn mount_failures(server: &MockServer, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path("/json.php"))
        .respond_with(ResponseTemplate::new(status))
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_records(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/json.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "1", "title": "Intro to Widgets", "year": 2019 }
        ])))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_page_polls_through_unavailable_responses() {
    let server = MockServer::start().await;
    mount_failures(&server, 503, 2).await;
    mount_records(&server).await;

    let records = client(&server, 10).fetch_page(&first_page()).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id.as_deref(), Some("1"));
    assert_eq!(records[0].year.as_deref(), Some("2019"));
}

#[tokio::test]
async fn test_fetch_page_polls_through_client_errors() {
    let server = MockServer::start().await;
    mount_failures(&server, 404, 2).await;
    mount_records(&server).await;

    let records = client(&server, 10).fetch_page(&first_page()).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title.as_deref(), Some("Intro to Widgets"));
}

#[tokio::test]
async fn test_fetch_page_reports_request_error_when_polling_stops() {
    let server = MockServer::start().await;
    mount_failures(&server, 500, 3).await;

    let result = client(&server, 3).fetch_page(&first_page()).await;

    assert!(matches!(result, Err(MetadataError::Request { .. })));
}
