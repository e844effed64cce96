//! Integration tests for the per-user cart.
//!
//! The cart lives in the catalog store keyed by user, so the JSON API and the
//! browser pages see the same lines.

#![allow(clippy::unwrap_used)]

use product_catalog_integration_tests::TestApp;
use reqwest::{StatusCode, header};
use serde_json::{Value, json};

/// Create a product through the API as a fresh staff user. Returns its id.
async fn seed_product(app: &TestApp, name: &str, price: &str) -> i64 {
    if app.state.identity().login("admin@example.com", "pass1234").await.is_err() {
        app.register_staff("admin@example.com").await;
    }
    let token = app.token("admin@example.com").await;

    let created: Value = TestApp::client()
        .post(app.url("/api/product"))
        .bearer_auth(&token)
        .json(&json!({ "name": name, "price": price, "description": "for the cart" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    created["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_cart_requires_bearer_token() {
    let app = TestApp::spawn().await;

    let resp = TestApp::client()
        .get(app.url("/api/cart"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_adding_twice_merges_the_line() {
    let app = TestApp::spawn().await;
    let widget = seed_product(&app, "Widget", "9.99").await;
    app.register("shopper@example.com").await;
    let token = app.token("shopper@example.com").await;
    let client = TestApp::client();

    for quantity in [1, 2] {
        let resp = client
            .post(app.url("/api/cart"))
            .bearer_auth(&token)
            .json(&json!({ "productId": widget, "quantity": quantity }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let cart: Value = client
        .get(app.url("/api/cart"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["quantity"], 3);
    assert_eq!(cart["items"][0]["product"]["name"], "Widget");
    assert_eq!(cart["itemCount"], 3);
    assert_eq!(cart["subtotal"], "29.97");
}

#[tokio::test]
async fn test_add_rejects_bad_quantity_and_unknown_product() {
    let app = TestApp::spawn().await;
    let widget = seed_product(&app, "Widget", "9.99").await;
    app.register("shopper@example.com").await;
    let token = app.token("shopper@example.com").await;
    let client = TestApp::client();

    let resp = client
        .post(app.url("/api/cart"))
        .bearer_auth(&token)
        .json(&json!({ "productId": widget, "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(app.url("/api/cart"))
        .bearer_auth(&token)
        .json(&json!({ "productId": 4242 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_carts_are_isolated_per_user() {
    let app = TestApp::spawn().await;
    let widget = seed_product(&app, "Widget", "9.99").await;
    app.register("alice@example.com").await;
    app.register("bob@example.com").await;
    let alice = app.token("alice@example.com").await;
    let bob = app.token("bob@example.com").await;
    let client = TestApp::client();

    let line: Value = client
        .post(app.url("/api/cart"))
        .bearer_auth(&alice)
        .json(&json!({ "productId": widget }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let line_id = line["id"].as_i64().unwrap();

    let bob_cart: Value = client
        .get(app.url("/api/cart"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bob_cart["items"], json!([]));

    let resp = client
        .delete(app.url(&format!("/api/cart/{line_id}")))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .delete(app.url(&format!("/api/cart/{line_id}")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "status": "Ok!" }));
}

#[tokio::test]
async fn test_clear_and_product_deletion_empty_the_cart() {
    let app = TestApp::spawn().await;
    let widget = seed_product(&app, "Widget", "9.99").await;
    let gadget = seed_product(&app, "Gadget", "1.00").await;
    app.register("shopper@example.com").await;
    let token = app.token("shopper@example.com").await;
    let admin = app.token("admin@example.com").await;
    let client = TestApp::client();

    for product in [widget, gadget] {
        client
            .post(app.url("/api/cart"))
            .bearer_auth(&token)
            .json(&json!({ "productId": product }))
            .send()
            .await
            .unwrap();
    }

    // Deleting a product drops its cart lines.
    client
        .delete(app.url(&format!("/api/product/{gadget}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let cart: Value = client
        .get(app.url("/api/cart"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);

    let resp = client
        .delete(app.url("/api/cart"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "removed": 1 }));
}

#[tokio::test]
async fn test_browser_cart_shares_lines_with_api() {
    let app = TestApp::spawn().await;
    let widget = seed_product(&app, "Widget", "9.99").await;
    app.register("shopper@example.com").await;
    let client = TestApp::client();
    app.browser_login(&client, "shopper@example.com").await;

    let token = app.csrf_token(&client, "/cart").await;
    let resp = client
        .post(app.url("/cart/add"))
        .form(&[
            ("product_id", widget.to_string()),
            ("quantity", "2".to_owned()),
            ("csrf_token", token),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/cart");

    let page = client.get(app.url("/cart")).send().await.unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    let html = page.text().await.unwrap();
    assert!(html.contains("Widget"));
    assert!(html.contains("$19.98"));

    let api_token = app.token("shopper@example.com").await;
    let cart: Value = client
        .get(app.url("/api/cart"))
        .bearer_auth(&api_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["items"][0]["quantity"], 2);
}
