mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn create_material_applies_defaults_and_blanks() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/materials",
            json!({ "name": "Bella Canvas 3001", "color": "  ", "size": "M" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.body["success"], true);
    let material = response.data();
    assert_eq!(material["name"], "Bella Canvas 3001");
    assert!(material["color"].is_null());
    assert_eq!(material["size"], "M");
    assert_eq!(material["quantity"], 0);
    assert_eq!(material["packSize"], 24);
    assert!(material.get("userId").is_some());
}

#[tokio::test]
async fn create_material_rejects_negative_quantity() {
    let app = TestApp::new().await;

    let response = app
        .post("/api/v1/materials", json!({ "name": "Tote", "quantity": -1 }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Bad Request");
}

#[tokio::test]
async fn materials_are_listed_by_name_color_size() {
    let app = TestApp::new().await;
    app.seed_material("Tee", "White", "S", 1).await;
    app.seed_material("Hoodie", "Black", "L", 1).await;
    app.seed_material("Tee", "Black", "M", 1).await;

    let response = app.get("/api/v1/materials").await;

    assert_eq!(response.status, StatusCode::OK);
    let listed: Vec<(String, String)> = response
        .data()
        .as_array()
        .expect("array")
        .iter()
        .map(|m| {
            (
                m["name"].as_str().unwrap().to_string(),
                m["color"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        listed,
        vec![
            ("Hoodie".to_string(), "Black".to_string()),
            ("Tee".to_string(), "Black".to_string()),
            ("Tee".to_string(), "White".to_string()),
        ]
    );
}

#[tokio::test]
async fn quantity_adjustment_is_floored_at_zero() {
    let app = TestApp::new().await;
    let material_id = app.seed_material("Tee", "White", "M", 10).await;
    let uri = format!("/api/v1/materials/{}", material_id);

    let response = app.patch(&uri, json!({ "delta": 14 })).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["quantity"], 24);

    let response = app.patch(&uri, json!({ "delta": -100 })).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["quantity"], 0);
}

#[tokio::test]
async fn adjusting_another_accounts_material_is_not_found() {
    let app = TestApp::new().await;
    let material_id = app.seed_material("Tee", "White", "M", 10).await;
    let intruder = app.second_account("someone@example.com").await;

    let response = app
        .request(
            axum::http::Method::PATCH,
            &format!("/api/v1/materials/{}", material_id),
            Some(json!({ "delta": 5 })),
            Some(&intruder),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let listed = app
        .request(axum::http::Method::GET, "/api/v1/materials", None, Some(&intruder))
        .await;
    assert_eq!(listed.data().as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn requirements_aggregate_open_orders_only() {
    let app = TestApp::new().await;
    let white_m = app.seed_material("Tee", "White", "M", 10).await;
    let black_l = app.seed_material("Tee", "Black", "L", 5).await;

    app.seed_order("Wedding shirts", &[(&white_m, 8), (&black_l, 2)]).await;
    app.seed_order("Club run", &[(&white_m, 6)]).await;
    let done = app.seed_order("Old run", &[(&black_l, 50)]).await;
    let response = app
        .patch(&format!("/api/v1/orders/{}", done), json!({ "status": "COMPLETED" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.get("/api/v1/materials/requirements").await;
    assert_eq!(response.status, StatusCode::OK);

    let rows = response.data().as_array().expect("array").clone();
    let white = rows.iter().find(|r| r["id"] == white_m.as_str()).expect("white row");
    assert_eq!(white["totalRequired"], 14);
    assert_eq!(white["status"], "insufficient");
    assert_eq!(white["shortage"], 4);
    assert_eq!(white["openOrders"].as_array().map(Vec::len), Some(2));

    let black = rows.iter().find(|r| r["id"] == black_l.as_str()).expect("black row");
    assert_eq!(black["totalRequired"], 2);
    assert_eq!(black["status"], "sufficient");
    assert_eq!(black["shortage"], 0);
    assert_eq!(black["openOrders"][0]["name"], "Wedding shirts");
}

#[tokio::test]
async fn requirements_without_orders_are_zero_and_sufficient() {
    let app = TestApp::new().await;
    app.seed_material("Tote", "Natural", "OS", 0).await;

    let response = app.get("/api/v1/materials/requirements").await;

    let row = &response.data()[0];
    assert_eq!(row["totalRequired"], 0);
    assert_eq!(row["status"], "sufficient");
    assert_eq!(row["shortage"], 0);
}
