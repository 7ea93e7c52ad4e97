use wiki_client::{CreatePageRequest, Error, TargetEndpoint, WikiClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint(uri: String) -> TargetEndpoint {
    TargetEndpoint {
        uri,
        token: Some("tkn".to_string()),
        insecure_skip_tls_verify: true,
    }
}

#[tokio::test]
async fn list_pages_constrained_to_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/pages"))
        .and(query_param("collection", "docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "p1", "title": "Intro", "slug": "intro", "language": "en", "collection": "docs", "isTemplate": false}
        ])))
        .mount(&server)
        .await;

    let client = WikiClient::new(&endpoint(server.uri())).unwrap();
    let pages = client.list_pages(Some("docs")).await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].title, "Intro");
}

#[tokio::test]
async fn create_page_conflict_surfaces_as_conflict_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/pages"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let client = WikiClient::new(&endpoint(server.uri())).unwrap();
    let err = client
        .create_page(CreatePageRequest {
            title: "AUTOTRANSLATED--> Intro".to_string(),
            text: "...".to_string(),
            collection_id: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Conflict));
}

#[tokio::test]
async fn get_page_content_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/pages/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = WikiClient::new(&endpoint(server.uri())).unwrap();
    let err = client.get_page_content("missing").await.unwrap_err();
    assert!(matches!(err, Error::NotFound));
}
