mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{id_of, TestApp};

#[tokio::test]
async fn product_buildability_uses_the_scarcest_material() {
    let app = TestApp::new().await;
    let tee = app.seed_material("Tee", "White", "M", 10).await;
    let transfer = app.seed_material("DTF transfer", "Full color", "A4", 7).await;

    let response = app
        .post(
            "/api/v1/products",
            json!({
                "name": "Logo tee",
                "price": 24.5,
                "category": "Shirts",
                "materials": [
                    { "materialId": tee, "quantityRequired": 1 },
                    { "materialId": transfer, "quantityRequired": 2, "notes": "front + back" }
                ]
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let product = response.data();
    assert_eq!(product["canMake"], true);
    assert_eq!(product["maxQuantity"], 3);
    assert_eq!(product["productMaterials"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn product_without_materials_cannot_be_made() {
    let app = TestApp::new().await;

    let response = app
        .post("/api/v1/products", json!({ "name": "Placeholder" }))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.data()["canMake"], false);
    assert_eq!(response.data()["maxQuantity"], 0);
}

#[tokio::test]
async fn products_are_listed_by_category_then_name() {
    let app = TestApp::new().await;
    for (name, category) in [
        ("Zip hoodie", None),
        ("Crew tee", Some("Shirts")),
        ("Tote", Some("Bags")),
        ("Baby tee", Some("Shirts")),
    ] {
        let response = app
            .post(
                "/api/v1/products",
                json!({ "name": name, "category": category }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = app.get("/api/v1/products").await;

    let names: Vec<&str> = response
        .data()
        .as_array()
        .expect("array")
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Tote", "Baby tee", "Crew tee", "Zip hoodie"]);
}

#[tokio::test]
async fn inactive_products_drop_out_of_the_catalog() {
    let app = TestApp::new().await;
    let created = app
        .post("/api/v1/products", json!({ "name": "Retired tee" }))
        .await;
    let id = id_of(created.data());

    let updated = app
        .patch(
            &format!("/api/v1/products/{}", id),
            json!({ "isActive": false, "description": "discontinued" }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.data()["description"], "discontinued");

    let listed = app.get("/api/v1/products").await;
    assert_eq!(listed.data().as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn product_update_enforces_field_lengths() {
    let app = TestApp::new().await;
    let created = app
        .post("/api/v1/products", json!({ "name": "Crew tee", "sku": "CREW-1" }))
        .await;
    let uri = format!("/api/v1/products/{}", id_of(created.data()));

    let too_long = app
        .patch(&uri, json!({ "category": "c".repeat(101) }))
        .await;
    assert_eq!(too_long.status, StatusCode::BAD_REQUEST, "{}", too_long.body);

    let current = app.get(&uri).await;
    assert_eq!(current.data()["sku"], "CREW-1");
    assert!(current.data()["category"].is_null());
}

#[tokio::test]
async fn product_rejects_foreign_or_duplicate_materials() {
    let app = TestApp::new().await;
    let tee = app.seed_material("Tee", "White", "M", 10).await;

    let duplicate = app
        .post(
            "/api/v1/products",
            json!({
                "name": "Double",
                "materials": [
                    { "materialId": tee, "quantityRequired": 1 },
                    { "materialId": tee, "quantityRequired": 1 }
                ]
            }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);

    let unknown = app
        .post(
            "/api/v1/products",
            json!({
                "name": "Ghost",
                "materials": [{ "materialId": uuid::Uuid::new_v4(), "quantityRequired": 1 }]
            }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let zero = app
        .post(
            "/api/v1/products",
            json!({
                "name": "Free",
                "materials": [{ "materialId": tee, "quantityRequired": 0 }]
            }),
        )
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ordering_a_product_multiplies_its_bill_of_materials() {
    let app = TestApp::new().await;
    let tee = app.seed_material("Tee", "White", "M", 10).await;
    let transfer = app.seed_material("DTF transfer", "Full color", "A4", 7).await;
    let product = app
        .post(
            "/api/v1/products",
            json!({
                "name": "Logo tee",
                "materials": [
                    { "materialId": tee, "quantityRequired": 1 },
                    { "materialId": transfer, "quantityRequired": 2 }
                ]
            }),
        )
        .await;
    let product_id = id_of(product.data());

    let response = app
        .post(
            &format!("/api/v1/products/{}/order", product_id),
            json!({ "quantity": 5, "priority": 1 }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let order = response.data();
    assert_eq!(order["name"], "Logo tee (5 units)");
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["priority"], 1);
    let mut needed: Vec<i64> = order["orderItems"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["quantityNeeded"].as_i64().unwrap())
        .collect();
    needed.sort_unstable();
    assert_eq!(needed, vec![5, 10]);

    let requirements = app.get("/api/v1/materials/requirements").await;
    let transfer_row = requirements
        .data()
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == transfer.as_str())
        .cloned()
        .unwrap();
    assert_eq!(transfer_row["shortage"], 3);
}

#[tokio::test]
async fn ordering_requires_materials_and_a_positive_quantity() {
    let app = TestApp::new().await;
    let empty = app
        .post("/api/v1/products", json!({ "name": "Empty" }))
        .await;
    let uri = format!("/api/v1/products/{}/order", id_of(empty.data()));

    let no_materials = app.post(&uri, json!({ "quantity": 1 })).await;
    assert_eq!(no_materials.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_materials.body["message"], "Bad request: Product has no materials defined");

    let zero = app.post(&uri, json!({ "quantity": 0 })).await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);

    let missing = app
        .post(
            &format!("/api/v1/products/{}/order", uuid::Uuid::new_v4()),
            json!({ "quantity": 1 }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}
