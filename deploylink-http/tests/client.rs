use deploylink_http::{HttpClient, HttpError, RequestOpts};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};
use std::borrow::Cow;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("deploylink-tests"));
    HttpClient::new(&server.uri())
        .expect("mock server uri")
        .with_default_headers(headers)
}

#[tokio::test]
async fn get_sends_default_headers_bearer_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/site/issues/7/comments"))
        .and(header("user-agent", "deploylink-tests"))
        .and(header("authorization", "Bearer ghs_token"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let got: Value = client_for(&server)
        .get_json(
            "repos/acme/site/issues/7/comments",
            RequestOpts {
                bearer: Some("ghs_token"),
                query: vec![("per_page", Cow::Borrowed("100"))],
            },
        )
        .await
        .expect("list succeeds");

    assert_eq!(got, json!([{"id": 1}]));
}

#[tokio::test]
async fn patch_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/repos/acme/site/comments/9"))
        .and(body_json(json!({"body": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 9, "body": "hello"})))
        .expect(1)
        .mount(&server)
        .await;

    let got: Value = client_for(&server)
        .patch_json(
            "/repos/acme/site/comments/9",
            &json!({"body": "hello"}),
            RequestOpts::default(),
        )
        .await
        .expect("patch succeeds");

    assert_eq!(got["id"], 9);
}

#[tokio::test]
async fn api_errors_carry_status_and_github_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/missing/commits/abc/comments"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("x-github-request-id", "ABCD:1234")
                .set_body_json(json!({"message": "Not Found"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_json::<Value>("repos/acme/missing/commits/abc/comments", RequestOpts::default())
        .await
        .expect_err("404 is an error");

    match err {
        HttpError::Api {
            status,
            message,
            request_id,
        } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(message, "Not Found");
            assert_eq!(request_id, "ABCD:1234");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_json::<Value>("down", RequestOpts::default())
        .await
        .expect_err("503 is returned as is");

    assert_eq!(err.status().map(|s| s.as_u16()), Some(503));
}

#[tokio::test]
async fn empty_success_body_decodes_as_unit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/noop"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let res: Result<(), HttpError> = client_for(&server)
        .post_json("noop", &json!({}), RequestOpts::default())
        .await;

    assert!(res.is_ok());
}
