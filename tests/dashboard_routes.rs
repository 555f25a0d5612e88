use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use roster_admin::config::BasicConfig;
use roster_admin::db::{Role, RosterStorage};
use roster_admin::server::{RosterState, roster_router};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tower::ServiceExt;

const FORM: &str = "application/x-www-form-urlencoded";

async fn setup() -> (Router, RosterStorage) {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid sqlite url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("failed to open in-memory sqlite");
    let storage = RosterStorage::new(pool);
    storage.init_schema().await.expect("schema init failed");
    storage.ensure_admin("root", "secret").await.unwrap();

    let cfg = BasicConfig {
        insecure_cookie: true,
        ..BasicConfig::default()
    };
    let state = RosterState::new(storage.clone(), &cfg).expect("state should build");
    (roster_router(state), storage)
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.expect("request failed")
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("failed to build request")
}

fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, FORM);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

async fn body_string(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("response body was not utf-8")
}

async fn login(app: &Router) -> String {
    let resp = send(app, post_form("/login", None, "username=root&password=secret")).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("login should set a session cookie");
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

#[tokio::test]
async fn anonymous_requests_are_turned_away() {
    let (app, _) = setup().await;

    let resp = send(&app, get("/", None)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");

    let resp = send(&app, get("/api/users", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(body_string(resp).await.contains(r#""code":"UNAUTHORIZED""#));

    let resp = send(&app, get("/healthz", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_and_non_admins_cannot_sign_in() {
    let (app, storage) = setup().await;
    storage.add_user("sam", "pw", Role::Student).await.unwrap();

    let resp = send(&app, post_form("/login", None, "username=root&password=nope")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(body_string(resp).await.contains("Invalid username/password combination."));

    let resp = send(&app, post_form("/login", None, "username=sam&password=pw")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn throttling_one_username_does_not_lock_out_another() {
    let (app, _) = setup().await;
    let limit = BasicConfig::default().login_per_minute;

    for _ in 0..limit {
        let resp = send(&app, post_form("/login", None, "username=x&password=guess")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
    let resp = send(&app, post_form("/login", None, "username=x&password=guess")).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // the real admin still gets in
    let cookie = login(&app).await;
    let resp = send(&app, get("/", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn overview_shows_metrics_and_empty_state() {
    let (app, _) = setup().await;
    let cookie = login(&app).await;

    let resp = send(&app, get("/", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Total Users"));
    assert!(html.contains("Active Sections"));
    assert!(html.contains("No section assignments found"));
    assert!(html.contains("Sign out root"));
}

#[tokio::test]
async fn section_form_creates_once_then_reports_duplicate() {
    let (app, storage) = setup().await;
    let cookie = login(&app).await;

    let resp = send(&app, post_form("/sections", Some(&cookie), "section_name=Math-101")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Section Math-101 created!"));
    assert!(html.contains("<td>Math-101</td>"));

    let resp = send(&app, post_form("/sections", Some(&cookie), "section_name=Math-101")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert!(body_string(resp).await.contains("Section name already exists: Math-101"));

    assert_eq!(storage.count_sections().await.unwrap(), 1);
}

#[tokio::test]
async fn user_form_assigns_sections_and_rejects_duplicates() {
    let (app, storage) = setup().await;
    let cookie = login(&app).await;
    storage.add_section("Math-101").await.unwrap();
    storage.add_section("Bio-201").await.unwrap();
    let sections = storage.get_all_sections().await.unwrap();
    let (math, bio) = (sections[0].id, sections[1].id);

    let body = format!("username=alice&password=pw1&role=Student&student_section={math}");
    let resp = send(&app, post_form("/users", Some(&cookie), &body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("Created alice (Student)."));

    let body = format!(
        "username=tina&password=pw&role=Teacher&student_section=&teacher_sections={math}&teacher_sections={bio}"
    );
    let resp = send(&app, post_form("/users", Some(&cookie), &body)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(
        &app,
        post_form("/users", Some(&cookie), "username=alice&password=pw2&role=Teacher"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert!(body_string(resp).await.contains("Username already exists: alice"));

    let resp = send(&app, get("/api/overview", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let overview: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(overview["total_users"], 3);
    assert_eq!(overview["students"][0]["username"], "alice");
    assert_eq!(overview["students"][0]["section_name"], "Math-101");
    assert_eq!(overview["teachers"].as_array().unwrap().len(), 2);

    let alice = storage.get_user("alice").await.unwrap().unwrap();
    assert_eq!(alice.role, Role::Student);
}

#[tokio::test]
async fn empty_username_is_reported_not_ignored() {
    let (app, storage) = setup().await;
    let cookie = login(&app).await;

    let resp = send(
        &app,
        post_form("/users", Some(&cookie), "username=&password=pw&role=Admin"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("Username and password are required."));
    assert_eq!(storage.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn missing_role_or_unreadable_form_is_reported_inline() {
    let (app, storage) = setup().await;
    let cookie = login(&app).await;

    let resp = send(
        &app,
        post_form("/users", Some(&cookie), "username=zed&password=pw"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let html = body_string(resp).await;
    assert!(html.contains("Choose a role: Student, Teacher or Admin."));
    assert!(html.contains(r#"<select name="role">"#));
    assert!(html.contains(r#"value="zed""#));

    let resp = send(
        &app,
        post_form("/users", Some(&cookie), "username=zed&password=pw&role=Boss"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("Choose a role"));

    let resp = send(
        &app,
        post_form(
            "/users",
            Some(&cookie),
            "username=zed&password=pw&role=Teacher&teacher_sections=abc",
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let html = body_string(resp).await;
    assert!(html.contains("The account form could not be read"));
    assert!(html.contains(r#"<select name="role">"#));

    assert_eq!(storage.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn delete_control_removes_user_but_not_the_signed_in_admin() {
    let (app, storage) = setup().await;
    let cookie = login(&app).await;
    storage.add_user("bob", "pw", Role::Teacher).await.unwrap();
    let bob = storage.get_user("bob").await.unwrap().unwrap();
    let root = storage.get_user("root").await.unwrap().unwrap();

    let uri = format!("/users/{}/delete", bob.id);
    let resp = send(&app, post_form(&uri, Some(&cookie), "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Deleted bob successfully!"));
    assert!(!html.contains("<strong>bob</strong>"));

    let resp = send(&app, post_form(&uri, Some(&cookie), "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let uri = format!("/users/{}/delete", root.id);
    let resp = send(&app, post_form(&uri, Some(&cookie), "")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("<strong>root</strong>"));
}

#[tokio::test]
async fn session_ends_when_admin_account_disappears() {
    let (app, storage) = setup().await;
    let cookie = login(&app).await;
    let root = storage.get_user("root").await.unwrap().unwrap();
    assert!(storage.delete_user(root.id).await.unwrap());

    let resp = send(&app, get("/users", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let (app, _) = setup().await;
    let cookie = login(&app).await;

    let resp = send(&app, post_form("/logout", Some(&cookie), "")).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
    let cleared = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cleared.starts_with("roster_admin="));
}
