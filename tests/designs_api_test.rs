mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{id_of, TestApp};

#[tokio::test]
async fn design_metadata_is_recorded_with_generated_url_and_tags() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/designs",
            json!({
                "name": "Sunset logo",
                "fileName": "sunset logo.png",
                "fileSize": 48213,
                "mimeType": "image/png",
                "tags": "retro, summer,, "
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let design = response.data();
    let url = design["fileUrl"].as_str().unwrap();
    assert!(url.starts_with("/uploads/designs/"));
    assert!(url.ends_with("-sunset_logo.png"));
    assert_eq!(design["tags"], r#"["retro","summer"]"#);
    assert_eq!(design["fileSize"], 48213);
    assert_eq!(design["products"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn design_defaults_mime_type_and_null_tags() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/designs",
            json!({ "name": "Wordmark", "fileName": "wordmark.svg" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.data()["mimeType"], "application/octet-stream");
    assert!(response.data()["tags"].is_null());
}

#[tokio::test]
async fn designs_list_linked_products_by_name() {
    let app = TestApp::new().await;
    let design = app
        .post(
            "/api/v1/designs",
            json!({ "name": "Badge", "fileName": "badge.png" }),
        )
        .await;
    let design_id = id_of(design.data());
    app.post(
        "/api/v1/designs",
        json!({ "name": "Alpha", "fileName": "alpha.png" }),
    )
    .await;

    let product = app
        .post(
            "/api/v1/products",
            json!({
                "name": "Badge tee",
                "designs": [
                    { "designId": design_id, "placement": "front" },
                    { "designId": design_id, "placement": "back", "sizeInfo": "10in" }
                ]
            }),
        )
        .await;
    assert_eq!(product.status, StatusCode::CREATED, "{}", product.body);
    assert_eq!(
        product.data()["productDesigns"].as_array().map(Vec::len),
        Some(2)
    );

    let response = app.get("/api/v1/designs").await;

    let designs = response.data().as_array().unwrap().clone();
    assert_eq!(designs[0]["name"], "Alpha");
    assert_eq!(designs[1]["name"], "Badge");
    assert_eq!(designs[1]["products"].as_array().map(Vec::len), Some(1));
    assert_eq!(designs[1]["products"][0]["name"], "Badge tee");
}

#[tokio::test]
async fn design_requires_a_file_name() {
    let app = TestApp::new().await;

    let response = app
        .post("/api/v1/designs", json!({ "name": "Nameless", "fileName": "" }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
