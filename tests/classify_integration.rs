//! Integration tests for classification lookups against a mock service.

mod support;

use harvester_core::catalog::CatalogEntry;
use harvester_core::classify::{Classifier, LookupKey};
use harvester_core::download::HttpClient;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{code_only, entry, multiple_works, single_match};

const ISBN: &str = "9780306406157";

fn classifier(server: &MockServer) -> Classifier {
    Classifier::with_base_url(
        HttpClient::for_services(),
        format!("{}/classify2/Classify", server.uri()),
    )
}

fn book(id: &str, title: &str, identifier: &str) -> CatalogEntry {
    let mut entry = entry(id, title, "http://dl.test/doc");
    entry.identifier = identifier.to_string();
    entry.classification_code = None;
    entry
}

async fn mount_xml(server: &MockServer, key: &str, value: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/classify2/Classify"))
        .and(query_param(key, value))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_match_by_identifier() {
    let server = MockServer::start().await;
    mount_xml(&server, "isbn", ISBN, single_match("512.345")).await;

    let code = classifier(&server)
        .resolve(&book("1", "Intro to Widgets", &format!("{ISBN},0306406152")))
        .await;

    assert_eq!(code, Some(510));
}

#[tokio::test]
async fn test_hyphenated_identifier_is_cleaned_before_query() {
    let server = MockServer::start().await;
    mount_xml(&server, "isbn", ISBN, single_match("641.5")).await;

    let code = classifier(&server)
        .resolve(&book("1", "Cooking", "978-0-306-40615-7"))
        .await;

    assert_eq!(code, Some(640));
}

#[tokio::test]
async fn test_multiple_works_requeries_first_work() {
    let server = MockServer::start().await;
    mount_xml(&server, "isbn", ISBN, multiple_works("12345")).await;
    mount_xml(&server, "owi", "12345", single_match("641.5")).await;

    let code = classifier(&server)
        .resolve(&book("1", "Intro to Widgets", ISBN))
        .await;

    assert_eq!(code, Some(640));
}

#[tokio::test]
async fn test_not_found_does_not_fall_back_to_title() {
    let server = MockServer::start().await;
    mount_xml(&server, "isbn", ISBN, code_only("102")).await;
    Mock::given(method("GET"))
        .and(query_param("title", "Intro to Widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_string(single_match("512.3")))
        .expect(0)
        .mount(&server)
        .await;

    let code = classifier(&server)
        .resolve(&book("1", "Intro to Widgets", ISBN))
        .await;

    assert_eq!(code, None);
}

#[tokio::test]
async fn test_transport_failure_falls_back_to_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("isbn", ISBN))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_xml(&server, "title", "Intro to Widgets", single_match("005.133")).await;

    let code = classifier(&server)
        .resolve(&book("1", "Intro to Widgets", ISBN))
        .await;

    assert_eq!(code, Some(0));
}

#[tokio::test]
async fn test_unknown_code_falls_back_to_title() {
    let server = MockServer::start().await;
    mount_xml(&server, "isbn", ISBN, code_only("999")).await;
    mount_xml(&server, "title", "Intro to Widgets", single_match("621.3")).await;

    let code = classifier(&server)
        .resolve(&book("1", "Intro to Widgets", ISBN))
        .await;

    assert_eq!(code, Some(620));
}

#[tokio::test]
async fn test_missing_identifier_uses_cleaned_title() {
    let server = MockServer::start().await;
    mount_xml(&server, "title", "The Art of Widgets", single_match("745.2")).await;

    let code = classifier(&server)
        .resolve(&book("1", "The Art: of Widgets", "no identifier here"))
        .await;

    assert_eq!(code, Some(740));
}

#[tokio::test]
async fn test_title_made_of_punctuation_is_unresolved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(single_match("512.3")))
        .expect(0)
        .mount(&server)
        .await;

    let code = classifier(&server).resolve(&book("1", "?!", "")).await;

    assert_eq!(code, None);
}

#[tokio::test]
async fn test_lookup_without_sfa_is_none() {
    let server = MockServer::start().await;
    mount_xml(&server, "isbn", ISBN, code_only("2")).await;

    let code = classifier(&server)
        .lookup(&LookupKey::ByIdentifier(ISBN.to_string()))
        .await
        .unwrap();

    assert_eq!(code, None);
}

#[tokio::test]
async fn test_resolve_all_maps_every_key() {
    let server = MockServer::start().await;
    mount_xml(&server, "isbn", ISBN, single_match("512.345")).await;
    mount_xml(&server, "title", "Unknown Book", code_only("102")).await;

    let entries = vec![
        book("1", "Intro to Widgets", ISBN),
        book("2", "Unknown Book", ""),
    ];
    let codes = classifier(&server)
        .with_concurrency(2)
        .resolve_all(&entries)
        .await;

    assert_eq!(codes.len(), 2);
    assert_eq!(codes[&entries[0].key()], Some(510));
    assert_eq!(codes[&entries[1].key()], None);
}
