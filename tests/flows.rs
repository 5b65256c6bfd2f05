use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use boarding_student::config::Config;
use boarding_student::seed::{seed_if_empty, DEMO_PASSWORD};
use boarding_student::state::AppState;
use boarding_student::store::MemoryStore;

const BOUNDARY: &str = "boarding-test-boundary";

struct TestApp {
    app: Router,
    uploads: TempDir,
}

async fn app(seeded: bool) -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let config = Config {
        uploads_dir: uploads.path().to_string_lossy().into_owned(),
        ..Config::development()
    };
    let store = Arc::new(MemoryStore::new());
    if seeded {
        seed_if_empty(store.as_ref(), config.hash_rounds).await.unwrap();
    }
    let state = AppState::new(store, config);
    TestApp {
        app: boarding_student::router(state),
        uploads,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn upload(
        &self,
        token: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> (StatusCode, Value) {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"cv\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/students/me/cv")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn register(&self, email: &str) -> String {
        let (status, json) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": "secret1",
                    "firstName": "Lina",
                    "lastName": "Haddad",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["token"].as_str().unwrap().to_string()
    }

    async fn login(&self, email: &str, password: &str, account_type: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password, "accountType": account_type })),
        )
        .await
    }
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = app(false).await;
    let (status, json) = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "ok": true }));
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = app(false).await;
    let (status, json) = app.call(Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("/api/nowhere"));
}

#[tokio::test]
async fn registration_validates_and_rejects_duplicates() {
    let app = app(false).await;
    let token = app.register("Lina@Example.com").await;
    assert!(!token.is_empty());

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "  LINA@example.COM ",
                "password": "another1",
                "firstName": "L",
                "lastName": "H",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "short@example.com",
                "password": "12345",
                "firstName": "S",
                "lastName": "P",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Password must be at least 6 characters");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "missing@example.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_distinguishes_bad_password_from_wrong_role() {
    let app = app(true).await;

    let (status, ok) = app.login("student@boarding.com", DEMO_PASSWORD, "student").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ok["user"]["role"], "student");

    let (bad_pw, bad_pw_json) = app.login("student@boarding.com", "wrong-pass", "student").await;
    let (wrong_role, wrong_role_json) = app
        .login("student@boarding.com", DEMO_PASSWORD, "company")
        .await;
    assert_eq!(bad_pw, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_role, StatusCode::UNAUTHORIZED);
    assert_eq!(bad_pw_json["error"], "Invalid email or password");
    assert_ne!(bad_pw_json["error"], wrong_role_json["error"]);
    assert!(wrong_role_json["error"]
        .as_str()
        .unwrap()
        .contains("No company account"));

    let (status, json) = app
        .login("company@techcorp.com", DEMO_PASSWORD, "student")
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].as_str().unwrap().contains("company login"));

    let (status, _) = app.login("nobody@boarding.com", DEMO_PASSWORD, "student").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_reports_company_binding() {
    let app = app(true).await;
    let (_, login) = app
        .login("company@techcorp.com", DEMO_PASSWORD, "company")
        .await;
    let token = login["token"].as_str().unwrap();
    assert_eq!(login["user"]["companyName"], "TechCorp");

    let (status, me) = app.call(Method::GET, "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "company");
    assert_eq!(me["companyName"], "TechCorp");
    assert_eq!(me["email"], "company@techcorp.com");
    assert!(me.get("passwordHash").is_none());
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = app(false).await;
    for uri in [
        "/api/auth/me",
        "/api/students/me",
        "/api/companies/matches",
        "/api/appointments",
        "/api/messages",
        "/api/resources",
    ] {
        let (status, json) = app.call(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(json["error"].is_string());
    }

    let token = app.register("tamper@example.com").await;
    let mut tampered = token.clone();
    tampered.push('x');
    let (status, _) = app
        .call(Method::GET, "/api/students/me", Some(&tampered), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_completion_grows_with_profile_and_cv() {
    let app = app(false).await;
    let token = app.register("journey@example.com").await;

    let (status, me) = app
        .call(Method::GET, "/api/students/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["profileCompletion"], 20);
    assert_eq!(me["journeyStatus"], "profile");
    assert_eq!(me["email"], "journey@example.com");

    let (status, me) = app
        .call(
            Method::PATCH,
            "/api/students/me",
            Some(&token),
            Some(json!({
                "academicBackground": {
                    "degree": "Master",
                    "field": "Data Science",
                    "university": "Université de Lyon",
                    "graduationYear": 2026
                },
                "skills": ["Python", "SQL"],
                "interests": ["Machine Learning"],
                "journeyStatus": "matching"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["profileCompletion"], 75);
    assert_eq!(me["journeyStatus"], "matching");
    assert_eq!(me["academicBackground"]["graduationYear"], 2026);

    let (status, uploaded) = app
        .upload(&token, "cv.pdf", "application/pdf", b"%PDF-1.7\n1 0 obj\n%%EOF")
        .await;
    assert_eq!(status, StatusCode::OK, "{uploaded}");
    let cv_url = uploaded["cvUrl"].as_str().unwrap();
    assert!(cv_url.starts_with("http://localhost:3001/uploads/cv-"));

    let (_, me) = app
        .call(Method::GET, "/api/students/me", Some(&token), None)
        .await;
    assert_eq!(me["profileCompletion"], 100);
    assert_eq!(me["cvUrl"], cv_url);

    let file_name = cv_url.rsplit('/').next().unwrap();
    assert!(app.uploads.path().join(file_name).exists());
    let (status, _) = app
        .send(
            Request::builder()
                .uri(format!("/uploads/{}", file_name))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rejected_uploads_leave_cv_untouched() {
    let app = app(false).await;
    let token = app.register("upload@example.com").await;

    let (status, _) = app
        .upload(&token, "cv.docx", "application/msword", b"PK\x03\x04 not a pdf")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .upload(&token, "cv.pdf", "application/pdf", b"plain text posing as pdf")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut big = b"%PDF-1.4\n".to_vec();
    big.resize(5 * 1024 * 1024 + 1, b'0');
    let (status, json) = app.upload(&token, "big.pdf", "application/pdf", &big).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("5MB"));

    // past the request body cap, not just the file limit
    let mut huge = b"%PDF-1.4\n".to_vec();
    huge.resize(6 * 1024 * 1024, b'0');
    let (status, json) = app.upload(&token, "huge.pdf", "application/pdf", &huge).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "File too large, maximum size is 5MB");

    let (_, me) = app
        .call(Method::GET, "/api/students/me", Some(&token), None)
        .await;
    assert!(me.get("cvUrl").is_none());
    assert_eq!(me["profileCompletion"], 20);
    assert_eq!(std::fs::read_dir(app.uploads.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn student_acceptance_is_visible_to_the_company() {
    let app = app(true).await;
    let student = app.register("match@example.com").await;

    let (status, list) = app
        .call(Method::GET, "/api/companies/matches", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 3);
    assert!(list.iter().all(|c| c["matchStatus"] == "pending"));
    let techcorp = list.iter().find(|c| c["name"] == "TechCorp").unwrap();
    assert_eq!(techcorp["matchScore"], 92);
    let techcorp_id = techcorp["id"].as_str().unwrap().to_string();

    let uri = format!("/api/companies/{}/match-status", techcorp_id);
    for _ in 0..2 {
        let (status, body) = app
            .call(
                Method::PATCH,
                &uri,
                Some(&student),
                Some(json!({ "status": "accepted" })),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    let (_, company_login) = app
        .login("company@techcorp.com", DEMO_PASSWORD, "company")
        .await;
    let company = company_login["token"].as_str().unwrap().to_string();

    let (status, matched) = app
        .call(Method::GET, "/api/company/matched-students", Some(&company), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows: Vec<&Value> = matched
        .as_array()
        .unwrap()
        .iter()
        .filter(|row| row["student"]["email"] == "match@example.com")
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["matchStatus"], "accepted");
    // most recently updated first
    assert_eq!(matched[0]["student"]["email"], "match@example.com");

    let match_id = rows[0]["matchId"].as_str().unwrap().to_string();
    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/company/matches/{}/status", match_id),
            Some(&company),
            Some(json!({ "status": "rejected" })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = app
        .call(Method::GET, "/api/companies/matches", Some(&student), None)
        .await;
    let techcorp = list
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == techcorp_id.as_str())
        .unwrap()
        .clone();
    assert_eq!(techcorp["matchStatus"], "rejected");

    // another company cannot touch TechCorp's row
    let (_, other_login) = app
        .login("company@innovatelab.com", DEMO_PASSWORD, "company")
        .await;
    let other = other_login["token"].as_str().unwrap();
    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/company/matches/{}/status", match_id),
            Some(other),
            Some(json!({ "status": "matched" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn matching_rejects_bad_input_and_wrong_roles() {
    let app = app(true).await;
    let student = app.register("roles@example.com").await;

    let (status, _) = app
        .call(Method::GET, "/api/company/matched-students", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, list) = app
        .call(Method::GET, "/api/companies/matches", Some(&student), None)
        .await;
    let company_id = list[0]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/companies/{}/match-status", company_id),
            Some(&student),
            Some(json!({ "status": "maybe" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::PATCH,
            "/api/companies/not-a-uuid/match-status",
            Some(&student),
            Some(json!({ "status": "matched" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/companies/{}/match-status", uuid::Uuid::new_v4()),
            Some(&student),
            Some(json!({ "status": "matched" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, company_login) = app
        .login("company@techcorp.com", DEMO_PASSWORD, "company")
        .await;
    let company = company_login["token"].as_str().unwrap();
    let (status, _) = app
        .call(Method::GET, "/api/students/me", Some(company), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn appointments_are_booked_and_listed_by_date() {
    let app = app(false).await;
    let token = app.register("advice@example.com").await;

    for date in ["2030-06-01T10:00:00Z", "2030-01-15T09:00"] {
        let (status, created) = app
            .call(
                Method::POST,
                "/api/appointments",
                Some(&token),
                Some(json!({
                    "advisorName": "Sarah Johnson",
                    "advisorEmail": "sarah.johnson@boarding.com",
                    "date": date,
                    "duration": 45,
                    "type": "follow-up",
                    "notes": "Bring transcripts",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "scheduled");
        assert_eq!(created["type"], "follow-up");
    }

    let (status, json) = app
        .call(
            Method::POST,
            "/api/appointments",
            Some(&token),
            Some(json!({ "advisorName": "Sarah Johnson", "duration": 30 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("required"));

    let (status, list) = app
        .call(Method::GET, "/api/appointments", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert!(list[0]["date"].as_str().unwrap().starts_with("2030-01-15"));
    assert!(list[1]["date"].as_str().unwrap().starts_with("2030-06-01"));
}

#[tokio::test]
async fn messages_form_a_two_way_thread() {
    let app = app(true).await;
    let (_, login) = app.login("student@boarding.com", DEMO_PASSWORD, "student").await;
    let token = login["token"].as_str().unwrap();

    let (status, thread) = app.call(Method::GET, "/api/messages", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread.as_array().unwrap().len(), 1);
    assert_eq!(thread[0]["senderId"], "advisor-1");
    assert!(thread[0]["timestamp"].is_string());
    assert!(thread[0].get("createdAt").is_none());

    let (status, sent) = app
        .call(
            Method::POST,
            "/api/messages",
            Some(token),
            Some(json!({
                "recipientId": "advisor-1",
                "recipientName": "Sarah Johnson",
                "content": "Yes, Thursday works for me.",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["read"], false);
    assert_eq!(sent["senderName"], "Demo Student");
    assert!(sent["timestamp"].is_string());

    let (status, _) = app
        .call(
            Method::POST,
            "/api/messages",
            Some(token),
            Some(json!({ "recipientId": "advisor-1", "content": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, thread) = app.call(Method::GET, "/api/messages", Some(token), None).await;
    let thread = thread.as_array().unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[1]["content"], "Yes, Thursday works for me.");
}

#[tokio::test]
async fn resources_are_readable_by_any_signed_in_user() {
    let app = app(true).await;
    let (_, login) = app
        .login("company@innovatelab.com", DEMO_PASSWORD, "company")
        .await;
    let token = login["token"].as_str().unwrap();

    let (status, list) = app.call(Method::GET, "/api/resources", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    let categories: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["category"].as_str().unwrap())
        .collect();
    assert_eq!(categories, vec!["housing", "language"]);
}
