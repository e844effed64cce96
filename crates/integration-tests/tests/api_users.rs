//! Integration tests for the user API: registration, cookie login, token
//! issuance, logout and role management.

#![allow(clippy::unwrap_used)]

use product_catalog_core::RoleName;
use product_catalog_integration_tests::{PASSWORD, TestApp};
use product_catalog_server::db::IdentityRepository;
use reqwest::StatusCode;
use serde_json::{Value, json};

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_then_duplicate() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    let body = json!({ "email": "new@example.com", "password": PASSWORD });

    let resp = client
        .post(app.url("/api/user/register"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.text().await.unwrap(),
        "User new@example.com is registered successfully!"
    );

    let resp = client
        .post(app.url("/api/user/register"))
        .json(&json!({ "email": "NEW@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let errors: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["code"], "DuplicateUserName");
}

#[tokio::test]
async fn test_register_short_password() {
    let app = TestApp::spawn().await;

    let resp = TestApp::client()
        .post(app.url("/api/user/register"))
        .json(&json!({ "email": "short@example.com", "password": "abc" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let errors: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(errors[0]["code"], "PasswordTooShort");
}

#[tokio::test]
async fn test_register_missing_fields() {
    let app = TestApp::spawn().await;

    let resp = TestApp::client()
        .post(app.url("/api/user/register"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errors"]["Email"][0], "The Email field is required.");
    assert_eq!(body["errors"]["Password"][0], "The Password field is required.");
}

// ============================================================================
// Login and tokens
// ============================================================================

#[tokio::test]
async fn test_cookie_login_and_logout() {
    let app = TestApp::spawn().await;
    app.register("shopper@example.com").await;
    let client = TestApp::client();

    let resp = client
        .post(app.url("/api/user/login"))
        .json(&json!({ "email": "shopper@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("set-cookie"));
    assert_eq!(
        resp.text().await.unwrap(),
        "User shopper@example.com logged in successfully!"
    );

    let resp = client
        .post(app.url("/api/user/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.text().await.unwrap(),
        "User shopper@example.com logged out successfully!"
    );

    let resp = client
        .post(app.url("/api/user/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.text().await.unwrap(),
        "User Unknown user logged out successfully!"
    );
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::spawn().await;
    app.register("shopper@example.com").await;
    let client = TestApp::client();

    let wrong_password = client
        .post(app.url("/api/user/auth"))
        .json(&json!({ "email": "shopper@example.com", "password": "wrong-pass" }))
        .send()
        .await
        .unwrap();
    let unknown_user = client
        .post(app.url("/api/user/auth"))
        .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        wrong_password.text().await.unwrap(),
        unknown_user.text().await.unwrap()
    );

    let cookie_login = client
        .post(app.url("/api/user/login"))
        .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(cookie_login.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(cookie_login.text().await.unwrap(), "Invalid email or password.");
}

#[tokio::test]
async fn test_auth_issues_token_without_session() {
    let app = TestApp::spawn().await;
    app.register("shopper@example.com").await;

    let resp = TestApp::client()
        .post(app.url("/api/user/auth"))
        .json(&json!({ "Email": "shopper@example.com", "Password": PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!resp.headers().contains_key("set-cookie"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "User logged in");
    assert_eq!(body["status"], 200);
    assert_eq!(body["token"].as_str().unwrap().split('.').count(), 3);
}

#[tokio::test]
async fn test_auth_with_missing_fields() {
    let app = TestApp::spawn().await;

    let resp = TestApp::client()
        .post(app.url("/api/user/auth"))
        .json(&json!({ "email": "shopper@example.com" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.json::<Value>().await.unwrap(),
        json!({ "message": "Error model" })
    );
}

// ============================================================================
// Roles
// ============================================================================

#[tokio::test]
async fn test_role_management_requires_staff() {
    let app = TestApp::spawn().await;
    app.register("shopper@example.com").await;
    let token = app.token("shopper@example.com").await;

    let resp = TestApp::client()
        .post(app.url("/api/user/createrole"))
        .bearer_auth(&token)
        .json(&json!({ "roleName": "Employee" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_role_rules() {
    let app = TestApp::spawn().await;
    app.register_staff("admin@example.com").await;
    let token = app.token("admin@example.com").await;
    let client = TestApp::client();

    let resp = client
        .post(app.url("/api/user/createrole"))
        .bearer_auth(&token)
        .json(&json!({ "roleName": "Employee" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "Role: Employee created ...");

    let resp = client
        .post(app.url("/api/user/createrole"))
        .bearer_auth(&token)
        .json(&json!({ "roleName": "employee" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "This RoleName already exist ...");

    let resp = client
        .post(app.url("/api/user/createrole"))
        .bearer_auth(&token)
        .json(&json!({ "roleName": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "Error RoleName ...");
}

#[tokio::test]
async fn test_assign_role_grants_catalog_access() {
    let app = TestApp::spawn().await;
    app.register_staff("admin@example.com").await;
    let employee = app.register("employee@example.com").await;
    let admin_token = app.token("admin@example.com").await;
    let client = TestApp::client();

    let resp = client
        .post(app.url("/api/user/createrole"))
        .bearer_auth(&admin_token)
        .json(&json!({ "roleName": "Employee" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let role = app
        .store
        .find_role_by_name(&RoleName::parse("Employee").unwrap())
        .await
        .unwrap()
        .unwrap();

    let resp = client
        .post(app.url("/api/user/assignrole"))
        .bearer_auth(&admin_token)
        .json(&json!({
            "userId": employee.id.to_string(),
            "roleId": role.id.to_string(),
            "roleName": "Employee",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.text().await.unwrap(),
        "Role Employee assigned to employee@example.com..."
    );

    let employee_token = app.token("employee@example.com").await;
    let resp = client
        .post(app.url("/api/product"))
        .bearer_auth(&employee_token)
        .json(&json!({ "name": "Gadget", "price": 5, "description": "A gadget" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_assign_role_failures() {
    let app = TestApp::spawn().await;
    app.register_staff("admin@example.com").await;
    let token = app.token("admin@example.com").await;
    let client = TestApp::client();

    let resp = client
        .post(app.url("/api/user/assignrole"))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "Error assign role ...");

    // Only one identifier blank: the guard passes and the lookup fails.
    let resp = client
        .post(app.url("/api/user/assignrole"))
        .bearer_auth(&token)
        .json(&json!({ "userId": uuid::Uuid::new_v4().to_string(), "roleName": "Admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "Not found Role ...");
}
