//! Integration tests for the HTML pages: redirects, role gating and
//! anti-forgery checks.

#![allow(clippy::unwrap_used)]

use product_catalog_integration_tests::{PASSWORD, TestApp};
use reqwest::{StatusCode, header, multipart};

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let resp = client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client.get(app.url("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_root_redirects_to_catalog() {
    let app = TestApp::spawn().await;

    let resp = TestApp::client().get(app.url("/")).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/product");
}

#[tokio::test]
async fn test_catalog_is_public() {
    let app = TestApp::spawn().await;

    let resp = TestApp::client()
        .get(app.url("/product"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    let html = resp.text().await.unwrap();
    assert!(html.contains("No products yet."));
    assert!(!html.contains("Create new"));
}

#[tokio::test]
async fn test_missing_product_page_is_not_found() {
    let app = TestApp::spawn().await;

    let resp = TestApp::client()
        .get(app.url("/product/details/77"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.text().await.unwrap().contains("Product 77 does not exist."));
}

#[tokio::test]
async fn test_cart_redirects_anonymous_to_login() {
    let app = TestApp::spawn().await;

    let resp = TestApp::client()
        .get(app.url("/cart"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers()[header::LOCATION],
        "/account/login?returnUrl=%2Fcart"
    );
}

#[tokio::test]
async fn test_login_follows_return_url() {
    let app = TestApp::spawn().await;
    app.register("shopper@example.com").await;
    let client = TestApp::client();

    let token = app.csrf_token(&client, "/account/login?returnUrl=%2Fcart").await;
    let resp = client
        .post(app.url("/account/login"))
        .form(&[
            ("email", "shopper@example.com"),
            ("password", PASSWORD),
            ("returnUrl", "/cart"),
            ("csrf_token", token.as_str()),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/cart");

    let resp = client.get(app.url("/cart")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_rejects_offsite_return_url() {
    let app = TestApp::spawn().await;
    app.register("shopper@example.com").await;
    let client = TestApp::client();

    let token = app.csrf_token(&client, "/account/login").await;
    let resp = client
        .post(app.url("/account/login"))
        .form(&[
            ("email", "shopper@example.com"),
            ("password", PASSWORD),
            ("returnUrl", "https://evil.example/"),
            ("csrf_token", token.as_str()),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.headers()[header::LOCATION], "/product");
}

#[tokio::test]
async fn test_failed_login_shows_generic_message() {
    let app = TestApp::spawn().await;
    app.register("shopper@example.com").await;
    let client = TestApp::client();

    let token = app.csrf_token(&client, "/account/login").await;
    let resp = client
        .post(app.url("/account/login"))
        .form(&[
            ("email", "shopper@example.com"),
            ("password", "wrong-pass"),
            ("csrf_token", token.as_str()),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.text().await.unwrap().contains("Invalid email or password."));
}

#[tokio::test]
async fn test_post_without_anti_forgery_token_is_rejected() {
    let app = TestApp::spawn().await;
    app.register("shopper@example.com").await;
    let client = TestApp::client();

    // A session exists but the form omits its token.
    app.csrf_token(&client, "/account/login").await;
    let resp = client
        .post(app.url("/account/login"))
        .form(&[("email", "shopper@example.com"), ("password", PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(app.url("/account/login"))
        .form(&[
            ("email", "shopper@example.com"),
            ("password", PASSWORD),
            ("csrf_token", "forged"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_signs_in() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let token = app.csrf_token(&client, "/account/register").await;
    let resp = client
        .post(app.url("/account/register"))
        .form(&[
            ("email", "new@example.com"),
            ("password", PASSWORD),
            ("confirm_password", PASSWORD),
            ("csrf_token", token.as_str()),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let html = client
        .get(app.url("/product"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("new@example.com"));
    assert!(html.contains("Log out"));
}

#[tokio::test]
async fn test_register_reports_mismatched_confirmation() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let token = app.csrf_token(&client, "/account/register").await;
    let resp = client
        .post(app.url("/account/register"))
        .form(&[
            ("email", "new@example.com"),
            ("password", PASSWORD),
            ("confirm_password", "different"),
            ("csrf_token", token.as_str()),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(
        resp.text()
            .await
            .unwrap()
            .contains("The password and confirmation password do not match.")
    );
}

#[tokio::test]
async fn test_customer_cannot_open_management_pages() {
    let app = TestApp::spawn().await;
    app.register("shopper@example.com").await;
    let client = TestApp::client();
    app.browser_login(&client, "shopper@example.com").await;

    let resp = client
        .get(app.url("/product/create"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(resp.text().await.unwrap().contains("Access denied"));
}

#[tokio::test]
async fn test_staff_manages_products_through_forms() {
    let app = TestApp::spawn().await;
    app.register_staff("admin@example.com").await;
    let client = TestApp::client();
    app.browser_login(&client, "admin@example.com").await;

    // Create with an image upload.
    let token = app.csrf_token(&client, "/product/create").await;
    let form = multipart::Form::new()
        .text("csrf_token", token)
        .text("name", "Widget")
        .text("price", "9.99")
        .text("description", "A widget")
        .part(
            "imageData",
            multipart::Part::bytes(vec![0x47, 0x49, 0x46, 0x38])
                .file_name("widget.gif")
                .mime_str("image/gif")
                .unwrap(),
        );
    let resp = client
        .post(app.url("/product/create"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/product");

    let html = client
        .get(app.url("/product"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Widget"));
    assert!(html.contains("$9.99"));
    assert!(html.contains("/product/image/1"));

    // Update without a new file keeps the stored image.
    let token = app.csrf_token(&client, "/product/update/1").await;
    let form = multipart::Form::new()
        .text("csrf_token", token)
        .text("id", "1")
        .text("version", "1")
        .text("name", "Widget")
        .text("price", "11.00")
        .text("description", "Now larger");
    let resp = client
        .post(app.url("/product/update/1"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client
        .get(app.url("/product/image/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/gif");

    // Invalid input re-renders the form.
    let token = app.csrf_token(&client, "/product/create").await;
    let form = multipart::Form::new()
        .text("csrf_token", token)
        .text("name", "")
        .text("price", "abc")
        .text("description", "x");
    let resp = client
        .post(app.url("/product/create"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(
        resp.text()
            .await
            .unwrap()
            .contains("The Name field is required.")
    );

    // Delete.
    let token = app.csrf_token(&client, "/product/delete/1").await;
    let resp = client
        .post(app.url("/product/delete/1"))
        .form(&[("csrf_token", token.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client
        .get(app.url("/product/details/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::spawn().await;
    app.register("shopper@example.com").await;
    let client = TestApp::client();
    app.browser_login(&client, "shopper@example.com").await;

    let token = app.csrf_token(&client, "/product").await;
    let resp = client
        .post(app.url("/account/logout"))
        .form(&[("csrf_token", token.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client.get(app.url("/cart")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}
