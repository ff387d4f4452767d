use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use hookroom::{AppState, config::Config, form};
use serde_json::json;
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn app(server_uri: &str) -> Router {
    let uri = server_uri.to_owned();
    let config = Config::from_lookup(move |key| match key {
        "WEBHOOK_SERVER_URL" => Some(uri.clone()),
        "WEBEX_API_PREFIX" => Some(uri.clone()),
        "NAME_SOURCE_URL" => Some(format!("{uri}/api/people/")),
        "BOT_EMAIL" => Some("bot@example.com".into()),
        "REQUEST_TIMEOUT_SECS" => Some("2".into()),
        _ => None,
    })
    .unwrap();
    form::app(AppState::from_config(config).unwrap())
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn post(uri: &str, cookie: Option<&str>, body: &'static str) -> Request<Body> {
    let mut request = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.body(Body::from(body)).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut request = Request::get(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.body(Body::empty()).unwrap()
}

fn session_cookie(response: &axum::response::Response) -> String {
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_owned()
}

#[tokio::test]
async fn health_check() {
    let response = app("http://127.0.0.1:9").oneshot(get("/healthz", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn fresh_session_asks_for_token() {
    let response = app("http://127.0.0.1:9").oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Please provide your access token"));
}

#[tokio::test]
async fn generate_before_loading_shows_error() {
    let app = app("http://127.0.0.1:9");

    let response = app.clone().oneshot(post("/generate", None, "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&response);

    let page = body_text(app.clone().oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(page.contains(r#"class="notice error""#));
    assert!(page.contains("cannot generate a suffix while no rooms are loaded"));

    // the notice is shown once
    let page = body_text(app.oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(!page.contains("notice error"));
}

#[tokio::test]
async fn token_loads_rooms_then_select_and_generate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/rooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [ { "title": "Ops", "id": "r1" }, { "title": "Dev", "id": "r2" } ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webhooks/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "roomId": "r1", "name": "luke_skywalker", "template": 1 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/templates/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ { "id": 1, "name": "Plain" } ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/people/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [ { "name": "Leia Organa" } ]
        })))
        .mount(&server)
        .await;

    let app = app(&server.uri());

    let response = app.clone().oneshot(post("/token", None, "token=secret")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&response);

    let page = body_text(app.clone().oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(page.contains("Fetched <strong>2</strong> rooms."));
    assert!(page.contains("<td>Ops</td><td>luke_skywalker</td><td>Plain</td>"));
    assert!(page.contains(r#"<option value="Dev">Dev</option>"#));

    let response = app.clone().oneshot(post("/select", Some(&cookie), "room=Dev&template=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let response = app.clone().oneshot(post("/generate", Some(&cookie), "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let page = body_text(app.oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(page.contains(r#"<span class="suffix">leia_organa</span>"#));
    assert!(page.contains("Room ID = r2"));
}
