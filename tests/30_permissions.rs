mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{data, error, spawn_server};

#[tokio::test]
async fn permissions_are_unique_per_path_and_method() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;

    let created = data(
        server
            .post(
                "/permissions",
                Some(&admin),
                json!({ "name": "Export jobs", "apiPath": "/api/v1/jobs/export", "method": "get", "module": "jobs" }),
            )
            .await?,
        StatusCode::CREATED,
    )
    .await?;
    let id = created["_id"].as_str().unwrap().to_string();

    let stored = data(server.get(&format!("/permissions/{}", id), Some(&admin)).await?, StatusCode::OK).await?;
    assert_eq!(stored["method"], "GET");
    assert_eq!(stored["module"], "JOBS");
    assert_eq!(stored["createdBy"]["email"], common::ADMIN_EMAIL);

    let body = error(
        server
            .post(
                "/permissions",
                Some(&admin),
                json!({ "name": "Again", "apiPath": "/api/v1/jobs/export", "method": "GET", "module": "JOBS" }),
            )
            .await?,
        StatusCode::CONFLICT,
    )
    .await?;
    assert_eq!(body["code"], "CONFLICT");

    // Same path under another method is a different permission
    data(
        server
            .post(
                "/permissions",
                Some(&admin),
                json!({ "name": "Export jobs (post)", "apiPath": "/api/v1/jobs/export", "method": "POST", "module": "JOBS" }),
            )
            .await?,
        StatusCode::CREATED,
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn permission_fields_are_validated() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;

    let body = error(
        server
            .post("/permissions", Some(&admin), json!({ "name": "Bad", "apiPath": "/x", "method": "FETCH" }))
            .await?,
        StatusCode::BAD_REQUEST,
    )
    .await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["method"].is_string());
    assert!(body["field_errors"]["module"].is_string());
    Ok(())
}

#[tokio::test]
async fn seeded_permissions_cover_the_protected_routes() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;

    let page = data(server.get("/permissions?pageSize=100", Some(&admin)).await?, StatusCode::OK).await?;
    let total = page["meta"]["total"].as_i64().unwrap();
    assert_eq!(total as usize, server.state.policy.permission_routes().count());

    let jobs = data(server.get("/permissions?module=JOBS", Some(&admin)).await?, StatusCode::OK).await?;
    let methods: Vec<&str> = jobs["result"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["method"].as_str())
        .collect();
    assert!(methods.contains(&"POST"));
    assert!(methods.contains(&"DELETE"));
    assert!(!methods.contains(&"GET"));
    Ok(())
}

#[tokio::test]
async fn role_detail_populates_permissions() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;

    let mail = data(server.get("/permissions?apiPath=/api/v1/mail", Some(&admin)).await?, StatusCode::OK).await?;
    let mail_id = mail["result"][0]["_id"].as_str().unwrap().to_string();

    let created = data(
        server
            .post(
                "/roles",
                Some(&admin),
                json!({ "name": "HR", "description": "Recruiters", "isActive": true, "permissions": [mail_id] }),
            )
            .await?,
        StatusCode::CREATED,
    )
    .await?;
    let role_id = created["_id"].as_str().unwrap().to_string();

    let role = data(server.get(&format!("/roles/{}", role_id), Some(&admin)).await?, StatusCode::OK).await?;
    assert_eq!(role["name"], "HR");
    assert_eq!(role["isActive"], true);
    assert_eq!(role["permissions"][0]["apiPath"], "/api/v1/mail");
    assert_eq!(role["permissions"][0]["method"], "GET");

    // Deleted permissions drop out of the populated view
    data(server.delete(&format!("/permissions/{}", mail_id), Some(&admin)).await?, StatusCode::OK).await?;
    let role = data(server.get(&format!("/roles/{}", role_id), Some(&admin)).await?, StatusCode::OK).await?;
    assert_eq!(role["permissions"], json!([]));
    Ok(())
}

#[tokio::test]
async fn role_names_are_unique_and_require_is_active() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;

    error(
        server
            .post("/roles", Some(&admin), json!({ "name": "NORMAL_USER", "isActive": true, "permissions": [] }))
            .await?,
        StatusCode::CONFLICT,
    )
    .await?;

    let body = error(
        server.post("/roles", Some(&admin), json!({ "name": "NO_FLAG" })).await?,
        StatusCode::BAD_REQUEST,
    )
    .await?;
    assert!(body["field_errors"]["isActive"].is_string());

    error(
        server
            .post("/roles", Some(&admin), json!({ "name": "BAD_IDS", "isActive": true, "permissions": ["nope"] }))
            .await?,
        StatusCode::BAD_REQUEST,
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn the_admin_role_cannot_be_deleted() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;

    let roles = data(server.get("/roles?name=SUPER_ADMIN", Some(&admin)).await?, StatusCode::OK).await?;
    let id = roles["result"][0]["_id"].as_str().unwrap().to_string();
    let body = error(server.delete(&format!("/roles/{}", id), Some(&admin)).await?, StatusCode::BAD_REQUEST).await?;
    assert_eq!(body["code"], "BAD_REQUEST");

    let user_role = data(server.get("/roles?name=NORMAL_USER", Some(&admin)).await?, StatusCode::OK).await?;
    let id = user_role["result"][0]["_id"].as_str().unwrap().to_string();
    let ack = data(server.delete(&format!("/roles/{}", id), Some(&admin)).await?, StatusCode::OK).await?;
    assert_eq!(ack["deleted"], 1);
    Ok(())
}
