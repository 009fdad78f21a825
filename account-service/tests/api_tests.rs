mod common;

use account_service::identity::models::RoleFlags;
use auth::Claims;
use auth::JwtHandler;
use chrono::Duration;
use chrono::Utc;
use common::TestApp;
use common::FRONTEND_URL;
use common::PASSWORD;
use reqwest::header::SET_COOKIE;
use reqwest::StatusCode;
use serde_json::json;
use serde_json::Value;

const VERIFY_EMAIL_TEMPLATE: &str = "emails/verify_email.html";
const PASSWORD_RESET_TEMPLATE: &str = "emails/password_reset.html";

async fn json_body(response: reqwest::Response) -> Value {
    response.json().await.expect("Failed to parse response")
}

fn reset_token_from(link: &str) -> String {
    link.strip_prefix(&format!("{}/password-reset/", FRONTEND_URL))
        .and_then(|rest| rest.strip_suffix('/'))
        .expect("Unexpected reset link")
        .to_string()
}

#[tokio::test]
async fn test_register_creates_unverified_identity() {
    let app = TestApp::spawn().await;

    let response = app.register("a@x.com", "doctor").await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["role"], "doctor");
    assert_eq!(body["is_email_verified"], false);
    assert!(body.get("password_hash").is_none());

    let mail = app.mailer.wait_for(VERIFY_EMAIL_TEMPLATE, "a@x.com").await;
    assert_eq!(mail.context["user_name"], "Alex Smith");
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = TestApp::spawn().await;
    app.register("a@x.com", "doctor").await;

    let response = app.register("a@x.com", "patient").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert!(body["detail"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_register_reports_every_invalid_field() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/register")
        .json(&json!({"email": "not-an-email", "full_name": "", "role": "nurse"}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["full_name"].is_array());
    assert_eq!(body["errors"]["role"][0], "\"nurse\" is not a valid choice.");
    assert_eq!(body["errors"]["password"][0], "This field is required.");
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/register")
        .json(&json!({
            "email": "a@x.com",
            "password": "12345678",
            "full_name": "Alex Smith",
            "role": "patient",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["errors"]["password"].is_array());
    assert!(app.identities.by_email("a@x.com").is_none());
}

#[tokio::test]
async fn test_login_sets_http_only_session_cookie() {
    let app = TestApp::spawn().await;
    app.register("a@x.com", "patient").await;

    let response = app
        .bare_client()
        .post(app.url("/login"))
        .json(&json!({"email": "a@x.com", "password": PASSWORD}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("No session cookie")
        .to_string();
    assert!(cookie.starts_with("sessionid="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));

    let body = json_body(response).await;
    assert!(body["access"].is_string());
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["role"], "patient");
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = TestApp::spawn().await;
    app.register("a@x.com", "patient").await;

    let response = app
        .post("/login")
        .json(&json!({"email": "a@x.com", "password": "wrong-password"}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let unknown = app
        .post("/login")
        .json(&json!({"email": "nobody@x.com", "password": PASSWORD}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json_body(unknown).await);
}

#[tokio::test]
async fn test_profile_requires_authentication() {
    let app = TestApp::spawn().await;

    let response = app.get("/me").send().await.expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["detail"], "Authentication credentials were not provided.");
}

#[tokio::test]
async fn test_doctor_without_profile_record_is_incomplete() {
    let app = TestApp::spawn().await;
    app.register("a@x.com", "doctor").await;
    app.login("a@x.com", PASSWORD).await;

    let response = app.get("/me").send().await.expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["detail"].as_str().unwrap().contains("incomplete"));
}

#[tokio::test]
async fn test_profile_shape_follows_role() {
    let app = TestApp::spawn().await;
    let doctor_token = app
        .onboard("doc@x.com", "doctor", json!({"specialty": 2, "bio": "Cardiologist"}))
        .await;
    let patient_token = app
        .onboard("pat@x.com", "patient", json!({"blood_group": "O+"}))
        .await;

    let doctor = json_body(
        app.bare_client()
            .get(app.url("/me"))
            .bearer_auth(&doctor_token)
            .send()
            .await
            .expect("Failed to execute request"),
    )
    .await;
    let patient = json_body(
        app.bare_client()
            .get(app.url("/me"))
            .bearer_auth(&patient_token)
            .send()
            .await
            .expect("Failed to execute request"),
    )
    .await;

    assert_eq!(doctor["role"], "doctor");
    assert_eq!(doctor["specialty"], 2);
    assert_eq!(doctor["user"]["email"], "doc@x.com");
    assert!(doctor.get("blood_group").is_none());
    assert!(doctor.get("date_of_birth").is_none());

    assert_eq!(patient["role"], "patient");
    assert_eq!(patient["blood_group"], "O+");
    assert_eq!(patient["user"]["email"], "pat@x.com");
    assert!(patient.get("specialty").is_none());
    assert!(patient.get("consultation_fee").is_none());
}

#[tokio::test]
async fn test_valid_bearer_overrides_session_cookie() {
    let app = TestApp::spawn().await;
    app.onboard("cookie@x.com", "patient", json!({})).await;
    app.register("bearer@x.com", "doctor").await;
    let bearer = app.token_for("bearer@x.com").await;
    app.post("/me")
        .bearer_auth(&bearer)
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to execute request");

    // The client still carries the cookie of cookie@x.com.
    let response = app
        .get("/me")
        .bearer_auth(&bearer)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["email"], "bearer@x.com");
    assert_eq!(body["role"], "doctor");
}

#[tokio::test]
async fn test_forged_or_expired_bearer_falls_back_to_cookie() {
    let app = TestApp::spawn().await;
    app.onboard("cookie@x.com", "patient", json!({})).await;
    app.register("victim@x.com", "doctor").await;
    let victim = app.identities.by_email("victim@x.com").unwrap();

    let forged = JwtHandler::new(b"attacker-secret-key-at-least-32-bytes!!")
        .encode(&Claims::for_session(
            victim.id,
            uuid::Uuid::new_v4(),
            Utc::now() + Duration::hours(1),
        ))
        .unwrap();
    let expired = JwtHandler::new(common::JWT_SECRET)
        .encode(&Claims::for_session(
            victim.id,
            uuid::Uuid::new_v4(),
            Utc::now() - Duration::hours(1),
        ))
        .unwrap();

    for token in [forged, expired] {
        let with_cookie = app
            .get("/me")
            .bearer_auth(&token)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(with_cookie.status(), StatusCode::OK);
        assert_eq!(json_body(with_cookie).await["user"]["email"], "cookie@x.com");

        let without_cookie = app
            .bare_client()
            .get(app.url("/me"))
            .bearer_auth(&token)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(without_cookie.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_verify_email_link() {
    let app = TestApp::spawn().await;
    app.register("a@x.com", "patient").await;
    let mail = app.mailer.wait_for(VERIFY_EMAIL_TEMPLATE, "a@x.com").await;
    let link = reqwest::Url::parse(mail.context["verification_link"].as_str().unwrap()).unwrap();
    assert_eq!(link.path(), "/verify-email/");
    let query = link.query().unwrap().to_string();

    let response = app
        .get(&format!("/verify-email?{}", query))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["message"], "Email verified successfully");
    assert!(app.identities.by_email("a@x.com").unwrap().email_verified);

    // Following the link again is harmless.
    let again = app
        .get(&format!("/verify-email?{}", query))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(again.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_verify_email_rejects_bad_links_generically() {
    let app = TestApp::spawn().await;
    app.register("a@x.com", "patient").await;
    let identity = app.identities.by_email("a@x.com").unwrap();

    let cases = vec![
        format!("/verify-email?uid={}&token=garbage", identity.id),
        "/verify-email?uid=not-a-uuid&token=garbage".to_string(),
        format!("/verify-email?uid={}", uuid::Uuid::new_v4()),
        "/verify-email".to_string(),
    ];

    for path in cases {
        let response = app.get(&path).send().await.expect("Failed to execute request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["detail"], "Invalid or expired token.");
    }
    assert!(!app.identities.by_email("a@x.com").unwrap().email_verified);
}

#[tokio::test]
async fn test_empty_update_is_rejected_for_every_role() {
    let app = TestApp::spawn().await;
    let doctor = app.onboard("doc@x.com", "doctor", json!({})).await;
    app.register("pat@x.com", "patient").await;
    let patient_without_profile = app.token_for("pat@x.com").await;

    for token in [doctor, patient_without_profile] {
        let response = app
            .bare_client()
            .put(app.url("/me"))
            .bearer_auth(&token)
            .json(&json!({}))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["detail"],
            "No fields provided for update."
        );
    }
}

#[tokio::test]
async fn test_flattened_update_touches_only_given_fields() {
    let app = TestApp::spawn().await;
    app.onboard(
        "doc@x.com",
        "doctor",
        json!({
            "user": {"phone": "555-0100"},
            "bio": "Cardiologist",
            "experience_years": 7,
            "consultation_fee": 5000,
        }),
    )
    .await;

    let response = app
        .put("/me")
        .json(&json!({"user[full_name]": "Jane Doe", "specialty": 3}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["full_name"], "Jane Doe");
    assert_eq!(body["specialty"], 3);
    assert_eq!(body["user"]["phone"], "555-0100");
    assert_eq!(body["bio"], "Cardiologist");
    assert_eq!(body["experience_years"], 7);
    assert_eq!(body["consultation_fee"], 5000);
    assert_eq!(body["is_available"], true);

    let stored = app.identities.by_email("doc@x.com").unwrap();
    assert_eq!(stored.full_name.as_str(), "Jane Doe");
}

#[tokio::test]
async fn test_form_encoded_update() {
    let app = TestApp::spawn().await;
    app.onboard("doc@x.com", "doctor", json!({})).await;

    let response = app
        .patch("/me")
        .form(&[("user[full_name]", "Jane Doe"), ("experience_years", "12")])
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["full_name"], "Jane Doe");
    assert_eq!(body["experience_years"], 12);
}

#[tokio::test]
async fn test_unparseable_flattened_key_is_dropped() {
    let app = TestApp::spawn().await;
    app.onboard("doc@x.com", "doctor", json!({})).await;

    let response = app
        .put("/me")
        .json(&json!({"user[full_name": "Jane Doe", "bio": "Surgeon"}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["bio"], "Surgeon");
    assert_eq!(body["user"]["full_name"], "Alex Smith");
}

#[tokio::test]
async fn test_unparseable_flattened_key_in_strict_mode() {
    let app = TestApp::spawn_with(true).await;
    app.onboard("doc@x.com", "doctor", json!({})).await;

    let response = app
        .put("/me")
        .json(&json!({"user[full_name": "Jane Doe", "bio": "Surgeon"}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["errors"]["user[full_name"].is_array());

    let unchanged = json_body(app.get("/me").send().await.unwrap()).await;
    assert!(unchanged["bio"].is_null());
}

#[tokio::test]
async fn test_update_validation_leaves_profile_untouched() {
    let app = TestApp::spawn().await;
    app.onboard("doc@x.com", "doctor", json!({"bio": "Cardiologist"})).await;

    let response = app
        .put("/me")
        .json(&json!({"bio": "Changed", "experience_years": -1, "specialty": 99}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["errors"]["experience_years"].is_array());

    let current = json_body(app.get("/me").send().await.unwrap()).await;
    assert_eq!(current["bio"], "Cardiologist");
}

#[tokio::test]
async fn test_unknown_specialty_is_a_field_error() {
    let app = TestApp::spawn().await;
    app.onboard("doc@x.com", "doctor", json!({})).await;

    let response = app
        .put("/me")
        .json(&json!({"specialty": 99}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(
        body["errors"]["specialty"][0],
        "Invalid pk \"99\" - object does not exist."
    );
}

#[tokio::test]
async fn test_read_only_fields_are_ignored() {
    let app = TestApp::spawn().await;
    app.onboard("doc@x.com", "doctor", json!({})).await;

    let response = app
        .put("/me")
        .json(&json!({"user": {"email": "evil@x.com"}, "bio": "Surgeon"}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["email"], "doc@x.com");
    assert_eq!(body["bio"], "Surgeon");
}

#[tokio::test]
async fn test_broken_role_flags_are_forbidden() {
    let app = TestApp::spawn().await;
    app.seed_identity(
        "both@x.com",
        RoleFlags {
            is_doctor: true,
            is_patient: true,
        },
    );
    app.seed_identity("none@x.com", RoleFlags::default());

    for email in ["both@x.com", "none@x.com"] {
        let token = app.token_for(email).await;

        let get = app
            .bare_client()
            .get(app.url("/me"))
            .bearer_auth(&token)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(get.status(), StatusCode::FORBIDDEN);

        let put = app
            .bare_client()
            .put(app.url("/me"))
            .bearer_auth(&token)
            .json(&json!({"bio": "x"}))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(put.status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_profile_can_only_be_created_once() {
    let app = TestApp::spawn().await;
    app.onboard("pat@x.com", "patient", json!({"gender": "female"})).await;

    let response = app
        .post("/me")
        .json(&json!({"gender": "male"}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let current = json_body(app.get("/me").send().await.unwrap()).await;
    assert_eq!(current["gender"], "female");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::spawn().await;
    let token = app.onboard("pat@x.com", "patient", json!({})).await;

    let response = app.post("/logout").send().await.expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let by_cookie = app.get("/me").send().await.expect("Failed to execute request");
    assert_eq!(by_cookie.status(), StatusCode::UNAUTHORIZED);

    let by_bearer = app
        .bare_client()
        .get(app.url("/me"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(by_bearer.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reset_request_response_is_identical_for_unknown_email() {
    let app = TestApp::spawn().await;
    app.register("a@x.com", "patient").await;

    let known = app
        .post("/password/reset/request")
        .json(&json!({"email": "a@x.com"}))
        .send()
        .await
        .expect("Failed to execute request");
    let unknown = app
        .post("/password/reset/request")
        .json(&json!({"email": "ghost@x.com"}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(known.status(), StatusCode::OK);
    assert_eq!(unknown.status(), known.status());
    let known_body = known.bytes().await.unwrap();
    let unknown_body = unknown.bytes().await.unwrap();
    assert_eq!(known_body, unknown_body);

    app.mailer.wait_for(PASSWORD_RESET_TEMPLATE, "a@x.com").await;
    assert!(app
        .mailer
        .sent()
        .iter()
        .all(|mail| mail.recipient != "ghost@x.com"));
}

#[tokio::test]
async fn test_reset_ticket_is_single_use() {
    let app = TestApp::spawn().await;
    app.onboard("a@x.com", "patient", json!({})).await;

    app.post("/password/reset/request")
        .json(&json!({"email": "a@x.com"}))
        .send()
        .await
        .expect("Failed to execute request");
    let mail = app.mailer.wait_for(PASSWORD_RESET_TEMPLATE, "a@x.com").await;
    assert_eq!(mail.context["support_email"], "support@example.com");
    let token = reset_token_from(mail.context["reset_link"].as_str().unwrap());

    let confirm = json!({"token": token, "new_password": "a-brand-new-secret"});
    let first = app
        .post("/password/reset/confirm")
        .json(&confirm)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(
        json_body(first).await["message"],
        "Password has been reset successfully."
    );

    let second = app
        .post("/password/reset/confirm")
        .json(&confirm)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(second).await["detail"], "Invalid or expired token.");

    // Every session of the user was revoked by the reset.
    let me = app.get("/me").send().await.expect("Failed to execute request");
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

    app.login("a@x.com", "a-brand-new-secret").await;
}

#[tokio::test]
async fn test_reset_confirm_rejects_forged_tokens() {
    let app = TestApp::spawn().await;

    let tokens = vec![
        "garbage".to_string(),
        "not-a-uuid.abcdef".to_string(),
        format!("{}.abcdef", uuid::Uuid::new_v4()),
    ];

    for token in tokens {
        let response = app
            .post("/password/reset/confirm")
            .json(&json!({"token": token, "new_password": "a-brand-new-secret"}))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["detail"], "Invalid or expired token.");
    }
}

#[tokio::test]
async fn test_change_password_keeps_only_current_session() {
    let app = TestApp::spawn().await;
    app.onboard("a@x.com", "patient", json!({})).await;
    let other_device = app.token_for("a@x.com").await;
    let user = app.identities.by_email("a@x.com").unwrap();
    assert_eq!(app.sessions.count_for(&user.id), 2);

    let wrong = app
        .put("/password/change")
        .json(&json!({"old_password": "not-my-password", "new_password": "a-brand-new-secret"}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(wrong).await["errors"]["old_password"][0],
        "Old password is incorrect."
    );

    let response = app
        .put("/password/change")
        .json(&json!({"old_password": PASSWORD, "new_password": "a-brand-new-secret"}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["detail"], "Password updated successfully");

    let current = app.get("/me").send().await.expect("Failed to execute request");
    assert_eq!(current.status(), StatusCode::OK);

    let revoked = app
        .bare_client()
        .get(app.url("/me"))
        .bearer_auth(&other_device)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(revoked.status(), StatusCode::UNAUTHORIZED);

    app.login("a@x.com", "a-brand-new-secret").await;
}
