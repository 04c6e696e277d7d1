//! End-to-end terminal flows against PostgreSQL.
//!
//! Run with `STOCKROOM_TEST_DATABASE_URL` set and `--include-ignored`.

#![allow(clippy::unwrap_used)]

use axum::http::{StatusCode, header};
use serde_json::{Value, json};

use stockroom_core::Money;
use stockroom_core::face::DESCRIPTOR_LEN;
use stockroom_integration_tests::{
    TestApp, body_bytes, body_json, expect_status, get, request, set_cookie, unique_email,
};

const PASSWORD: &str = "correct horse battery";

/// Register a fresh account and return its session cookie and email.
async fn register(app: &TestApp, prefix: &str) -> (String, String) {
    let email = unique_email(prefix);
    let body = json!({ "email": email, "password": PASSWORD });
    let response = expect_status(
        app.send(request("POST", "/api/auth/register", None, Some(&body)))
            .await,
        StatusCode::CREATED,
    );
    (set_cookie(&response).unwrap(), email)
}

async fn create_product(app: &TestApp, cookie: &str, name: &str, price: &str, stock: u32) -> Value {
    let body = json!({ "name": name, "price": price, "stock": stock });
    let response = expect_status(
        app.send(request("POST", "/api/products", Some(cookie), Some(&body)))
            .await,
        StatusCode::CREATED,
    );
    body_json(response).await
}

async fn stock_of(app: &TestApp, cookie: &str, product: &Value) -> u64 {
    let uri = format!("/api/products/{}", product["id"]);
    let response = expect_status(app.send(get(&uri, Some(cookie))).await, StatusCode::OK);
    body_json(response).await["stock"].as_u64().unwrap()
}

fn sale_line(product: &Value, quantity: u32) -> Value {
    json!({
        "product_id": product["id"],
        "product_name": product["name"],
        "quantity": quantity,
        "unit_price": product["price"],
    })
}

fn money(value: &Value) -> Money {
    serde_json::from_value(value.clone()).unwrap()
}

fn descriptor(seed: u128) -> Vec<f32> {
    (0..DESCRIPTOR_LEN)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let v = ((seed + i as u128 * 7919) % 1000) as f32;
            v / 1000.0
        })
        .collect()
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_register_login_and_logout() {
    let app = TestApp::with_database().await;
    let (cookie, email) = register(&app, "till").await;

    let response = expect_status(app.send(get("/api/auth/me", Some(&cookie))).await, StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["email"], email.as_str());
    assert_eq!(me["display_name"], email.split('@').next().unwrap());
    assert_eq!(me["has_face"], false);

    let duplicate = json!({ "email": email, "password": PASSWORD });
    expect_status(
        app.send(request("POST", "/api/auth/register", None, Some(&duplicate)))
            .await,
        StatusCode::CONFLICT,
    );

    let wrong = json!({ "email": email, "password": "not the password" });
    expect_status(
        app.send(request("POST", "/api/auth/login", None, Some(&wrong)))
            .await,
        StatusCode::UNAUTHORIZED,
    );

    let good = json!({ "email": email, "password": PASSWORD });
    let response = expect_status(
        app.send(request("POST", "/api/auth/login", None, Some(&good)))
            .await,
        StatusCode::OK,
    );
    let login_cookie = set_cookie(&response).unwrap();

    expect_status(
        app.send(request("POST", "/api/auth/logout", Some(&login_cookie), None::<&()>))
            .await,
        StatusCode::NO_CONTENT,
    );
    expect_status(
        app.send(get("/api/auth/me", Some(&login_cookie))).await,
        StatusCode::UNAUTHORIZED,
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_custom_token_sign_in() {
    let app = TestApp::with_database().await;
    let (_, email) = register(&app, "token").await;

    let body = json!({ "email": email });
    let response = expect_status(
        app.send(request("POST", "/api/auth/custom-token", None, Some(&body)))
            .await,
        StatusCode::OK,
    );
    let token = body_json(response).await["token"].as_str().unwrap().to_owned();

    let body = json!({ "token": token });
    let response = expect_status(
        app.send(request("POST", "/api/auth/token", None, Some(&body)))
            .await,
        StatusCode::OK,
    );
    let cookie = set_cookie(&response).unwrap();
    let me = body_json(app.send(get("/api/auth/me", Some(&cookie))).await).await;
    assert_eq!(me["email"], email.as_str());

    let unknown = json!({ "email": unique_email("nobody") });
    expect_status(
        app.send(request("POST", "/api/auth/custom-token", None, Some(&unknown)))
            .await,
        StatusCode::NOT_FOUND,
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_product_crud() {
    let app = TestApp::with_database().await;
    let (cookie, _) = register(&app, "crud").await;

    let product = create_product(&app, &cookie, "  Ground Coffee  ", "4.25", 12).await;
    assert_eq!(product["name"], "Ground Coffee");
    let uri = format!("/api/products/{}", product["id"]);

    let list = body_json(app.send(get("/api/products?order=name", Some(&cookie))).await).await;
    assert!(
        list.as_array()
            .unwrap()
            .iter()
            .any(|p| p["id"] == product["id"])
    );

    let patch = json!({ "stock": 30, "price": "4.50" });
    let response = expect_status(
        app.send(request("PATCH", &uri, Some(&cookie), Some(&patch)))
            .await,
        StatusCode::OK,
    );
    let updated = body_json(response).await;
    assert_eq!(updated["stock"], 30);
    assert_eq!(money(&updated["price"]), Money::from_cents(450));

    expect_status(
        app.send(request("PATCH", &uri, Some(&cookie), Some(&json!({}))))
            .await,
        StatusCode::BAD_REQUEST,
    );

    expect_status(
        app.send(request("DELETE", &uri, Some(&cookie), None::<&()>))
            .await,
        StatusCode::NO_CONTENT,
    );
    expect_status(app.send(get(&uri, Some(&cookie))).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_sale_commit_invoice_and_reports() {
    let app = TestApp::with_database().await;
    let (cookie, _) = register(&app, "sale").await;
    let coffee = create_product(&app, &cookie, "Coffee", "2.50", 5).await;
    let tea = create_product(&app, &cookie, "Tea", "1.75", 10).await;

    let customer_id = format!("V-{}", unique_email("c").split('@').next().unwrap());
    let sale = json!({
        "customer": { "name": "Ana Ruiz", "id": customer_id },
        "lines": [sale_line(&coffee, 3), sale_line(&tea, 2)],
        "total": "999.99",
    });
    let response = expect_status(
        app.send(request("POST", "/api/sales", Some(&cookie), Some(&sale)))
            .await,
        StatusCode::CREATED,
    );
    let sale = body_json(response).await;
    assert_eq!(money(&sale["total"]), Money::from_cents(1100));
    assert_eq!(sale["items"].as_array().unwrap().len(), 2);

    assert_eq!(stock_of(&app, &cookie, &coffee).await, 2);
    assert_eq!(stock_of(&app, &cookie, &tea).await, 8);

    let invoice = expect_status(
        app.send(get(&format!("/api/sales/{}/invoice", sale["id"]), Some(&cookie)))
            .await,
        StatusCode::OK,
    );
    assert_eq!(invoice.headers()[header::CONTENT_TYPE], "application/pdf");
    assert!(body_bytes(invoice).await.starts_with(b"%PDF"));

    for uri in [
        "/api/reports/sales".to_string(),
        "/api/reports/stock".to_string(),
        format!("/api/reports/customers/{customer_id}"),
    ] {
        let report = expect_status(app.send(get(&uri, Some(&cookie))).await, StatusCode::OK);
        assert!(
            report.headers()[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .contains(".xlsx")
        );
        // XLSX files are zip archives.
        assert!(body_bytes(report).await.starts_with(b"PK"));
    }

    expect_status(
        app.send(get("/api/reports/customers/no-such-customer-xyz", Some(&cookie)))
            .await,
        StatusCode::NOT_FOUND,
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_sale_rolls_back_on_insufficient_stock() {
    let app = TestApp::with_database().await;
    let (cookie, _) = register(&app, "rollback").await;
    let plenty = create_product(&app, &cookie, "Sugar", "1.00", 5).await;
    let scarce = create_product(&app, &cookie, "Saffron", "9.00", 1).await;

    let sale = json!({
        "customer": { "name": "Ana Ruiz", "id": "V-1" },
        "lines": [sale_line(&plenty, 2), sale_line(&scarce, 3)],
    });
    let response = expect_status(
        app.send(request("POST", "/api/sales", Some(&cookie), Some(&sale)))
            .await,
        StatusCode::CONFLICT,
    );
    let error = body_json(response).await["error"].as_str().unwrap().to_owned();
    assert!(error.contains("Saffron"), "error was {error}");

    assert_eq!(stock_of(&app, &cookie, &plenty).await, 5);
    assert_eq!(stock_of(&app, &cookie, &scarce).await, 1);

    expect_status(
        app.send(request(
            "DELETE",
            &format!("/api/products/{}", scarce["id"]),
            Some(&cookie),
            None::<&()>,
        ))
        .await,
        StatusCode::NO_CONTENT,
    );
    let response = app
        .send(request("POST", "/api/sales", Some(&cookie), Some(&sale)))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(stock_of(&app, &cookie, &plenty).await, 5);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_concurrent_sales_cannot_oversell() {
    let app = TestApp::with_database().await;
    let (cookie, _) = register(&app, "race").await;
    let last = create_product(&app, &cookie, "Last Loaf", "3.00", 1).await;

    let sale = |customer: &str| {
        json!({
            "customer": { "name": customer, "id": format!("V-{customer}") },
            "lines": [sale_line(&last, 1)],
        })
    };
    let (first, second) = (sale("A"), sale("B"));
    let (a, b) = tokio::join!(
        app.send(request("POST", "/api/sales", Some(&cookie), Some(&first))),
        app.send(request("POST", "/api/sales", Some(&cookie), Some(&second))),
    );

    let mut statuses = [a.status(), b.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);
    assert_eq!(stock_of(&app, &cookie, &last).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_face_enrollment_and_login() {
    let app = TestApp::with_database().await;
    let (cookie, email) = register(&app, "face").await;
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let face = descriptor(seed);

    expect_status(
        app.send(request(
            "PUT",
            "/api/profile/face",
            Some(&cookie),
            Some(&json!({ "descriptor": face })),
        ))
        .await,
        StatusCode::NO_CONTENT,
    );

    let response = expect_status(
        app.send(request(
            "POST",
            "/api/auth/face",
            None,
            Some(&json!({ "descriptor": face })),
        ))
        .await,
        StatusCode::OK,
    );
    let login = body_json(response).await;
    assert_eq!(login["email"], email.as_str());
    assert!(login["token"].as_str().is_some_and(|t| !t.is_empty()));

    let stranger = vec![50.0_f32; DESCRIPTOR_LEN];
    expect_status(
        app.send(request(
            "POST",
            "/api/auth/face",
            None,
            Some(&json!({ "descriptor": stranger })),
        ))
        .await,
        StatusCode::UNAUTHORIZED,
    );

    expect_status(
        app.send(request("DELETE", "/api/profile/face", Some(&cookie), None::<&()>))
            .await,
        StatusCode::NO_CONTENT,
    );
    expect_status(
        app.send(request("DELETE", "/api/profile/face", Some(&cookie), None::<&()>))
            .await,
        StatusCode::NOT_FOUND,
    );
}
