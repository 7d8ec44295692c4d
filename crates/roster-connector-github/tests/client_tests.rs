//! HTTP-level tests for the platform client.

use roster_connector_github::{GithubClient, GithubConfig, GithubError, PlatformClient, ReviewEvent};
use roster_core::AccountKind;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, per_page: u32) -> GithubClient {
    let mut config = GithubConfig::with_api_url(server.uri()).with_token("test-token");
    config.per_page = per_page;
    config.max_retries = 0;
    GithubClient::new(config).unwrap()
}

fn logins(names: &[&str]) -> Value {
    Value::Array(
        names
            .iter()
            .map(|n| json!({ "login": n, "type": "User" }))
            .collect(),
    )
}

#[tokio::test]
async fn test_list_org_members_follows_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orgs/acme/members"))
        .and(query_param("page", "1"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(logins(&["alice", "bob"])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/orgs/acme/members"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(logins(&["carol"])))
        .expect(1)
        .mount(&server)
        .await;

    let members = client(&server, 2).list_org_members("acme").await.unwrap();
    assert_eq!(members, vec!["alice", "bob", "carol"]);
}

#[tokio::test]
async fn test_get_user_maps_404_to_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "login": "alice",
            "type": "User",
            "name": "Alice Liddell",
            "company": "Red Hat",
            "email": "alice@corp.example"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let client = client(&server, 100);
    let alice = client.get_user("alice").await.unwrap().unwrap();
    assert_eq!(alice.name.as_deref(), Some("Alice Liddell"));
    assert_eq!(alice.to_profile().company.as_deref(), Some("Red Hat"));

    assert!(client.get_user("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_resolve_account_kinds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/someorg"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"login": "someorg", "type": "Organization"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/someorg/somerepo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "somerepo",
            "full_name": "someorg/somerepo"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/nobody"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client(&server, 100);
    assert_eq!(
        client.resolve_account("someorg").await.unwrap(),
        Some(AccountKind::Organization)
    );
    assert_eq!(
        client.resolve_account("someorg/somerepo").await.unwrap(),
        Some(AccountKind::Repository)
    );
    assert_eq!(client.resolve_account("nobody").await.unwrap(), None);
}

#[tokio::test]
async fn test_get_file_content_decodes_base64() {
    let server = MockServer::start().await;

    // "alice\nbob\n", wrapped the way the API wraps it
    Mock::given(method("GET"))
        .and(path("/repos/acme/config/contents/quay/users.txt"))
        .and(query_param("ref", "refs/pull/7/head"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": "YWxpY2UK\nYm9iCg==\n",
            "encoding": "base64"
        })))
        .mount(&server)
        .await;

    let content = client(&server, 100)
        .get_file_content("acme/config", "quay/users.txt", "refs/pull/7/head")
        .await
        .unwrap();
    assert_eq!(content, "alice\nbob\n");
}

#[tokio::test]
async fn test_find_open_issue_skips_pull_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/roster/issues"))
        .and(query_param("state", "open"))
        .and(query_param("labels", "roster"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"number": 3, "title": "PR", "pull_request": {"url": "x"}},
            {"number": 5, "title": "Roster report"}
        ])))
        .mount(&server)
        .await;

    let issue = client(&server, 100)
        .find_open_issue("acme/roster", "roster")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(issue.number, 5);
}

#[tokio::test]
async fn test_issue_writes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/acme/roster/issues"))
        .and(body_json(json!({"title": "Roster report", "body": "text"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 9,
            "title": "Roster report"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repos/acme/roster/issues/9/labels"))
        .and(body_json(json!({"labels": ["roster", "automated"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repos/acme/roster/issues/9/comments"))
        .and(body_json(json!({"body": "again"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, 100);
    let issue = client
        .create_issue("acme/roster", "Roster report", "text")
        .await
        .unwrap();
    client
        .add_labels(
            "acme/roster",
            issue.number,
            &["roster".to_string(), "automated".to_string()],
        )
        .await
        .unwrap();
    client
        .comment_issue("acme/roster", issue.number, "again")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_review_sends_event() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/acme/config/pulls/7/reviews"))
        .and(body_json(json!({"body": "Unknown: mallory", "event": "REQUEST_CHANGES"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, 100)
        .create_review("acme/config", 7, "Unknown: mallory", ReviewEvent::RequestChanges)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_api_error_carries_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orgs/acme/teams"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"message": "Resource not accessible"})),
        )
        .mount(&server)
        .await;

    let err = client(&server, 100).list_teams("acme").await.unwrap_err();
    match err {
        GithubError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Resource not accessible");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
