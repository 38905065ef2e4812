mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{data, error, spawn_server, TestServer, ADMIN_EMAIL};

async fn permission_id(server: &TestServer, admin: &str, method: &str, api_path: &str) -> Result<String> {
    let page = data(
        server
            .get(&format!("/permissions?method={}&apiPath={}", method, api_path), Some(admin))
            .await?,
        StatusCode::OK,
    )
    .await?;
    Ok(page["result"][0]["_id"].as_str().unwrap_or_default().to_string())
}

async fn normal_user_role(server: &TestServer, admin: &str) -> Result<Value> {
    let page = data(server.get("/roles?name=NORMAL_USER", Some(admin)).await?, StatusCode::OK).await?;
    Ok(page["result"][0].clone())
}

#[tokio::test]
async fn public_routes_need_no_token() -> Result<()> {
    let server = spawn_server().await?;
    data(server.get("/jobs", None).await?, StatusCode::OK).await?;
    data(server.get("/companies", None).await?, StatusCode::OK).await?;

    let admin = server.state.users.find_by_email(ADMIN_EMAIL).await?.expect("admin is seeded");
    let profile = data(server.get(&format!("/users/{}", admin.id), None).await?, StatusCode::OK).await?;
    assert_eq!(profile["email"], ADMIN_EMAIL);
    assert!(profile.get("password").is_none());
    assert!(profile.get("refreshToken").is_none());
    Ok(())
}

#[tokio::test]
async fn protected_routes_reject_missing_or_bad_tokens() -> Result<()> {
    let server = spawn_server().await?;
    error(server.get("/users", None).await?, StatusCode::UNAUTHORIZED).await?;
    error(server.get("/auth/account", None).await?, StatusCode::UNAUTHORIZED).await?;
    error(server.get("/users", Some("garbage.token.value")).await?, StatusCode::UNAUTHORIZED).await?;
    error(server.post("/resumes", None, json!({})).await?, StatusCode::UNAUTHORIZED).await?;
    Ok(())
}

#[tokio::test]
async fn unknown_routes_stay_not_found() -> Result<()> {
    let server = spawn_server().await?;
    let res = server.get("/nowhere", None).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn missing_permission_is_forbidden() -> Result<()> {
    let server = spawn_server().await?;
    let user = server.user_token().await?;

    let body = error(server.get("/users", Some(&user)).await?, StatusCode::FORBIDDEN).await?;
    assert_eq!(body["code"], "FORBIDDEN");
    error(server.get("/roles", Some(&user)).await?, StatusCode::FORBIDDEN).await?;
    error(server.get("/mail", Some(&user)).await?, StatusCode::FORBIDDEN).await?;
    error(
        server.post("/companies", Some(&user), json!({ "name": "X", "address": "Y" })).await?,
        StatusCode::FORBIDDEN,
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn auth_namespace_and_self_service_routes_skip_permissions() -> Result<()> {
    let server = spawn_server().await?;
    let user = server.user_token().await?;

    data(server.get("/auth/account", Some(&user)).await?, StatusCode::OK).await?;
    data(server.post("/resumes/by-user", Some(&user), json!({})).await?, StatusCode::CREATED).await?;
    data(server.post("/subscribers/skills", Some(&user), json!({})).await?, StatusCode::CREATED).await?;
    data(
        server.patch("/subscribers", Some(&user), json!({ "skills": ["Rust"] })).await?,
        StatusCode::OK,
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn admin_holds_every_seeded_permission() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;

    data(server.get("/users", Some(&admin)).await?, StatusCode::OK).await?;
    data(server.get("/roles", Some(&admin)).await?, StatusCode::OK).await?;
    data(server.get("/permissions", Some(&admin)).await?, StatusCode::OK).await?;
    data(server.get("/resumes", Some(&admin)).await?, StatusCode::OK).await?;
    data(server.get("/subscribers", Some(&admin)).await?, StatusCode::OK).await?;
    Ok(())
}

#[tokio::test]
async fn granted_permissions_apply_from_the_next_login() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;
    let before = server.user_token().await?;

    let list_users = permission_id(&server, &admin, "GET", "/api/v1/users").await?;
    assert!(!list_users.is_empty());
    let role = normal_user_role(&server, &admin).await?;
    let role_path = format!("/roles/{}", role["_id"].as_str().unwrap());
    data(
        server.patch(&role_path, Some(&admin), json!({ "permissions": [list_users] })).await?,
        StatusCode::OK,
    )
    .await?;

    // Tokens carry the permission set they were issued with
    error(server.get("/users", Some(&before)).await?, StatusCode::FORBIDDEN).await?;

    let after = server.user_token().await?;
    data(server.get("/users", Some(&after)).await?, StatusCode::OK).await?;
    // Only the exact (route, method) pair was granted
    error(server.post("/users", Some(&after), json!({})).await?, StatusCode::FORBIDDEN).await?;
    Ok(())
}

#[tokio::test]
async fn inactive_roles_grant_nothing() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;

    let list_users = permission_id(&server, &admin, "GET", "/api/v1/users").await?;
    let role = normal_user_role(&server, &admin).await?;
    let role_path = format!("/roles/{}", role["_id"].as_str().unwrap());
    data(
        server
            .patch(&role_path, Some(&admin), json!({ "permissions": [list_users], "isActive": false }))
            .await?,
        StatusCode::OK,
    )
    .await?;

    let user = server.user_token().await?;
    let account = data(server.get("/auth/account", Some(&user)).await?, StatusCode::OK).await?;
    assert_eq!(account["user"]["permissions"], json!([]));
    error(server.get("/users", Some(&user)).await?, StatusCode::FORBIDDEN).await?;
    Ok(())
}
