use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use serde_json::Value;
use tower::ServiceExt;

use super::create_router;
use crate::forms::StaticForms;
use crate::test_support::{app_state, contact_form};

const ORIGIN: &str = "https://example.com";
const BOUNDARY: &str = "mailgate-test-boundary";

fn router(min_submission_secs: u64) -> Router {
    let mut form = contact_form();
    form.domains.push("www.example.com".to_string());
    create_router(app_state(StaticForms::default().with(form), min_submission_secs))
}

async fn json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn token_request(form_id: &str, origin: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(format!("/token/{form_id}")).header(header::HOST, "relay.example.com");
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder.body(Body::empty()).unwrap()
}

/// Issue a token from `ORIGIN` and return its submission path
async fn issue(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(token_request("contact-form", Some(ORIGIN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json(response).await;
    format!("/send/contact-form/{}", body["data"]["token"].as_str().unwrap())
}

fn multipart(fields: &[(&str, &str)]) -> Body {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Body::from(body)
}

fn send_request(path: &str, origin: Option<&str>, fields: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::post(path).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder.body(multipart(fields)).unwrap()
}

const VALID_FIELDS: &[(&str, &str)] = &[
    ("name", "Jane"),
    ("email", "jane@example.com"),
    ("message", "Hello there"),
];

#[tokio::test]
async fn test_ping_and_health() {
    let app = router(0);

    let response = app
        .clone()
        .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "ping request received");
    assert_eq!(body["data"]["ping"], "pong");

    issue(&app).await;
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["pending_tokens"], 1);
}

#[tokio::test]
async fn test_issue_token() {
    let app = router(0);
    let response = app
        .oneshot(token_request("contact-form", Some(ORIGIN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);

    let envelope = json(response).await;
    assert_eq!(envelope["success"], true);
    assert_eq!(envelope["status_code"], 201);
    assert_eq!(envelope["status"], "Created");
    assert_eq!(envelope["message"], "sender token successfully created");
    assert!(envelope["timestamp"].is_string());

    let body = &envelope["data"];
    let token = body["token"].as_str().unwrap();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(body["form_id"], "contact-form");
    assert_eq!(body["encoding"], "multipart/form-data");
    assert_eq!(body["request_method"], "POST");
    assert_eq!(
        body["url"],
        format!("http://relay.example.com/send/contact-form/{token}")
    );
}

#[tokio::test]
async fn test_issue_token_rejects_foreign_origin() {
    let app = router(0);

    let response = app
        .clone()
        .oneshot(token_request("contact-form", Some("https://evil.com")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));

    let response = app
        .oneshot(token_request("contact-form", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_issue_token_unknown_form() {
    let response = router(0)
        .oneshot(token_request("unknown", Some(ORIGIN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["status_code"], 400);
}

#[tokio::test]
async fn test_send_dry_run_then_replay() {
    let app = router(0);
    let path = issue(&app).await;

    let response = app
        .clone()
        .oneshot(send_request(&path, Some(ORIGIN), VALID_FIELDS))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = json(response).await;
    assert_eq!(envelope["success"], true);
    assert_eq!(envelope["status_code"], 200);
    let body = &envelope["data"];
    assert_eq!(body["form_id"], "contact-form");
    assert_eq!(body["message_response"], "dry-run succeeded");
    assert_eq!(body["confirmation_sent"], false);

    let replay = app
        .oneshot(send_request(&path, Some(ORIGIN), VALID_FIELDS))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_foreign_origin_post_burns_token() {
    let app = router(0);
    let path = issue(&app).await;

    let response = app
        .clone()
        .oneshot(send_request(&path, Some("https://evil.com"), VALID_FIELDS))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));

    let retry = app
        .oneshot(send_request(&path, Some(ORIGIN), VALID_FIELDS))
        .await
        .unwrap();
    assert_eq!(retry.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_server_header() {
    let app = router(0);

    let ok = app
        .clone()
        .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let missing = app
        .oneshot(token_request("unknown", Some(ORIGIN)))
        .await
        .unwrap();

    for response in [ok, missing] {
        let server = response.headers()[header::SERVER].to_str().unwrap();
        assert_eq!(server, concat!("mailgate/", env!("CARGO_PKG_VERSION")));
    }
}

#[tokio::test]
async fn test_send_unknown_token() {
    let path = format!("/send/contact-form/{}", "0".repeat(64));
    let response = router(0)
        .oneshot(send_request(&path, Some(ORIGIN), VALID_FIELDS))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json(response).await;
    assert_eq!(body["errors"][0], "invalid form ID or token");
}

#[tokio::test]
async fn test_send_is_bound_to_issuing_origin() {
    let app = router(0);

    // Allow-listed, but not the origin the token was issued to
    let path = issue(&app).await;
    let response = app
        .clone()
        .oneshot(send_request(&path, Some("https://www.example.com"), VALID_FIELDS))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let path = issue(&app).await;
    let response = app
        .oneshot(send_request(&path, None, VALID_FIELDS))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_honeypot_looks_like_invalid_token() {
    let app = router(0);

    let path = issue(&app).await;
    let mut fields = VALID_FIELDS.to_vec();
    fields.push(("website", "https://spam.example"));
    let spam = app
        .clone()
        .oneshot(send_request(&path, Some(ORIGIN), &fields))
        .await
        .unwrap();

    let unknown = app
        .oneshot(send_request(
            &format!("/send/contact-form/{}", "f".repeat(64)),
            Some(ORIGIN),
            VALID_FIELDS,
        ))
        .await
        .unwrap();

    assert_eq!(spam.status(), unknown.status());
    assert_eq!(json(spam).await, json(unknown).await);
}

#[tokio::test]
async fn test_send_reports_every_violation() {
    let app = router(0);
    let path = issue(&app).await;

    let response = app
        .oneshot(send_request(&path, Some(ORIGIN), &[("name", "Jane")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert_eq!(
        body["errors"],
        serde_json::json!([
            "email: required field is missing",
            "message: required field is missing"
        ])
    );
}

#[tokio::test]
async fn test_send_too_early() {
    let app = router(3600);
    let path = issue(&app).await;

    let response = app
        .oneshot(send_request(&path, Some(ORIGIN), VALID_FIELDS))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 425);
}

#[tokio::test]
async fn test_unreadable_body_consumes_token() {
    let app = router(0);
    let path = issue(&app).await;

    let request = Request::post(&path)
        .header(header::ORIGIN, ORIGIN)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let retry = app
        .oneshot(send_request(&path, Some(ORIGIN), VALID_FIELDS))
        .await
        .unwrap();
    assert_eq!(retry.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preflight() {
    let app = router(0);
    let preflight = |origin: &str| {
        Request::options("/send/contact-form/abc")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(preflight(ORIGIN)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "content-type");
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "600");
    assert_eq!(headers[header::VARY], "Origin");

    let response = app.oneshot(preflight("https://evil.com")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
