mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{data, error, spawn_server, spawn_server_configured, RecordingMailer, TestServer, ADMIN_EMAIL, USER_EMAIL};

async fn create_company(server: &TestServer, admin: &str, name: &str) -> Result<String> {
    let created = data(
        server
            .post("/companies", Some(admin), json!({ "name": name, "address": "Ha Noi", "description": "" }))
            .await?,
        StatusCode::CREATED,
    )
    .await?;
    Ok(created["_id"].as_str().unwrap().to_string())
}

fn job_body(company_id: &str, company: &str, name: &str, skills: Value, salary: u64) -> Value {
    json!({
        "name": name,
        "skills": skills,
        "company": { "_id": company_id, "name": company },
        "location": "HANOI",
        "salary": salary,
        "quantity": 2,
        "level": "JUNIOR",
        "description": "<p>Join us</p>",
        "startDate": "2024-01-01",
        "endDate": "2099-12-31",
        "isActive": true
    })
}

async fn create_job(server: &TestServer, admin: &str, body: Value) -> Result<String> {
    let created = data(server.post("/jobs", Some(admin), body).await?, StatusCode::CREATED).await?;
    Ok(created["_id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn company_lifecycle_with_soft_delete() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;
    let id = create_company(&server, &admin, "FPT Software").await?;
    let path = format!("/companies/{}", id);

    let ack = data(
        server.patch(&path, Some(&admin), json!({ "description": "Outsourcing" })).await?,
        StatusCode::OK,
    )
    .await?;
    assert_eq!(ack["modifiedCount"], 1);

    let company = data(server.get(&path, None).await?, StatusCode::OK).await?;
    assert_eq!(company["description"], "Outsourcing");
    assert_eq!(company["name"], "FPT Software");
    assert_eq!(company["updatedBy"]["email"], ADMIN_EMAIL);

    let first = data(server.delete(&path, Some(&admin)).await?, StatusCode::OK).await?;
    assert_eq!(first["deleted"], 1);
    let second = data(server.delete(&path, Some(&admin)).await?, StatusCode::OK).await?;
    assert_eq!(second["deleted"], 0);

    error(server.get(&path, None).await?, StatusCode::NOT_FOUND).await?;
    let list = data(server.get("/companies", None).await?, StatusCode::OK).await?;
    assert_eq!(list["meta"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn malformed_and_unknown_ids_are_not_found() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;

    error(server.get("/companies/not-an-id", None).await?, StatusCode::NOT_FOUND).await?;
    error(server.get("/jobs/123", None).await?, StatusCode::NOT_FOUND).await?;
    let missing = uuid::Uuid::new_v4();
    error(server.get(&format!("/users/{}", missing), None).await?, StatusCode::NOT_FOUND).await?;
    error(server.delete(&format!("/companies/{}", missing), Some(&admin)).await?, StatusCode::NOT_FOUND).await?;
    error(
        server.patch("/jobs/nope", Some(&admin), json!({ "name": "x" })).await?,
        StatusCode::NOT_FOUND,
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn company_creation_validates_required_fields() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;

    let body = error(
        server.post("/companies", Some(&admin), json!({ "name": "Only name" })).await?,
        StatusCode::BAD_REQUEST,
    )
    .await?;
    assert!(body["field_errors"]["address"].is_string());

    let res = server
        .client
        .post(server.url("/companies"))
        .bearer_auth(&admin)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{ not json")
        .send()
        .await?;
    let body = error(res, StatusCode::BAD_REQUEST).await?;
    assert_eq!(body["code"], "INVALID_JSON");
    Ok(())
}

#[tokio::test]
async fn job_list_filters_pages_and_sorts() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;
    let company = create_company(&server, &admin, "VNG").await?;

    create_job(&server, &admin, job_body(&company, "VNG", "Rust Developer", json!(["RUST", "SQL"]), 3000)).await?;
    create_job(&server, &admin, job_body(&company, "VNG", "Backend Developer", json!(["GO"]), 2000)).await?;
    create_job(&server, &admin, job_body(&company, "VNG", "Tester", json!(["QA"]), 1000)).await?;

    let page = data(server.get("/jobs?current=1&pageSize=2&sort=-salary", None).await?, StatusCode::OK).await?;
    assert_eq!(page["meta"]["total"], 3);
    assert_eq!(page["meta"]["pages"], 2);
    assert_eq!(page["meta"]["pageSize"], 2);
    assert_eq!(page["result"][0]["name"], "Rust Developer");
    assert_eq!(page["result"][1]["name"], "Backend Developer");

    let page = data(server.get("/jobs?current=2&pageSize=2&sort=-salary", None).await?, StatusCode::OK).await?;
    assert_eq!(page["meta"]["current"], 2);
    assert_eq!(page["result"].as_array().unwrap().len(), 1);
    assert_eq!(page["result"][0]["name"], "Tester");

    let page = data(server.get("/jobs?name=/developer/i", None).await?, StatusCode::OK).await?;
    assert_eq!(page["meta"]["total"], 2);

    let page = data(server.get("/jobs?salary=1000", None).await?, StatusCode::OK).await?;
    assert_eq!(page["meta"]["total"], 1);
    assert_eq!(page["result"][0]["company"]["name"], "VNG");
    Ok(())
}

#[tokio::test]
async fn extreme_paging_values_return_empty_or_capped_pages() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;
    let company = create_company(&server, &admin, "VNG").await?;
    create_job(&server, &admin, job_body(&company, "VNG", "Rust Developer", json!(["RUST"]), 3000)).await?;

    let page = data(
        server.get("/jobs?current=9223372036854775807&pageSize=10", None).await?,
        StatusCode::OK,
    )
    .await?;
    assert_eq!(page["meta"]["total"], 1);
    assert_eq!(page["meta"]["pages"], 1);
    assert_eq!(page["result"], json!([]));

    let page = data(
        server.get("/users?pageSize=9223372036854775807", Some(&admin)).await?,
        StatusCode::OK,
    )
    .await?;
    let cap = server.state.config.filter.max_limit.unwrap();
    assert_eq!(page["meta"]["pageSize"], cap);
    assert_eq!(page["meta"]["total"], 2);
    assert_eq!(page["meta"]["pages"], 1);
    assert_eq!(page["result"].as_array().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn page_size_is_capped_by_max_limit() -> Result<()> {
    let server = spawn_server_configured(RecordingMailer::default(), |c| c.filter.max_limit = Some(2)).await?;
    let admin = server.admin_token().await?;
    let company = create_company(&server, &admin, "VNG").await?;
    for (name, salary) in [("Rust Developer", 3000), ("Backend Developer", 2000), ("Tester", 1000)] {
        create_job(&server, &admin, job_body(&company, "VNG", name, json!(["RUST"]), salary)).await?;
    }

    let page = data(server.get("/jobs?pageSize=50&sort=-salary", None).await?, StatusCode::OK).await?;
    assert_eq!(page["meta"]["pageSize"], 2);
    assert_eq!(page["meta"]["total"], 3);
    assert_eq!(page["meta"]["pages"], 2);
    assert_eq!(page["result"].as_array().unwrap().len(), 2);

    let page = data(server.get("/jobs?current=2&pageSize=50&sort=-salary", None).await?, StatusCode::OK).await?;
    assert_eq!(page["result"].as_array().unwrap().len(), 1);
    assert_eq!(page["result"][0]["name"], "Tester");
    Ok(())
}

#[tokio::test]
async fn job_dates_are_validated() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;
    let company = create_company(&server, &admin, "Tiki").await?;

    let mut expired = job_body(&company, "Tiki", "Late", json!(["JAVA"]), 500);
    expired["startDate"] = json!("2020-01-01");
    expired["endDate"] = json!("2020-06-01");
    let body = error(server.post("/jobs", Some(&admin), expired).await?, StatusCode::BAD_REQUEST).await?;
    assert!(body["field_errors"]["endDate"].is_string());

    let mut inverted = job_body(&company, "Tiki", "Inverted", json!(["JAVA"]), 500);
    inverted["startDate"] = json!("2099-12-31");
    inverted["endDate"] = json!("2099-01-01");
    error(server.post("/jobs", Some(&admin), inverted).await?, StatusCode::BAD_REQUEST).await?;

    let no_skills = job_body(&company, "Tiki", "Nothing", json!([]), 500);
    let body = error(server.post("/jobs", Some(&admin), no_skills).await?, StatusCode::BAD_REQUEST).await?;
    assert!(body["field_errors"]["skills"].is_string());

    let id = create_job(&server, &admin, job_body(&company, "Tiki", "Fine", json!(["JAVA"]), 500)).await?;
    error(
        server
            .patch(&format!("/jobs/{}", id), Some(&admin), json!({ "endDate": "2023-12-31" }))
            .await?,
        StatusCode::BAD_REQUEST,
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn resumes_track_status_history() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;
    let user = server.user_token().await?;
    let company = create_company(&server, &admin, "Shopee").await?;
    let job = create_job(&server, &admin, job_body(&company, "Shopee", "SRE", json!(["K8S"]), 4000)).await?;

    let created = data(
        server
            .post(
                "/resumes",
                Some(&user),
                json!({ "url": "cv-user.pdf", "companyId": company, "jobId": job }),
            )
            .await?,
        StatusCode::CREATED,
    )
    .await?;
    let resume_id = created["_id"].as_str().unwrap().to_string();

    let mine = data(server.post("/resumes/by-user", Some(&user), json!({})).await?, StatusCode::CREATED).await?;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["email"], USER_EMAIL);
    assert_eq!(mine[0]["status"], "PENDING");
    assert_eq!(mine[0]["companyId"]["name"], "Shopee");
    assert_eq!(mine[0]["jobId"]["name"], "SRE");

    data(
        server
            .patch(&format!("/resumes/{}", resume_id), Some(&admin), json!({ "status": "REVIEWING" }))
            .await?,
        StatusCode::OK,
    )
    .await?;
    let resume = data(server.get(&format!("/resumes/{}", resume_id), Some(&admin)).await?, StatusCode::OK).await?;
    assert_eq!(resume["status"], "REVIEWING");
    let history = resume["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["status"], "PENDING");
    assert_eq!(history[1]["status"], "REVIEWING");
    assert_eq!(history[1]["updatedBy"]["email"], ADMIN_EMAIL);

    let body = error(
        server
            .patch(&format!("/resumes/{}", resume_id), Some(&admin), json!({ "status": "HIRED" }))
            .await?,
        StatusCode::BAD_REQUEST,
    )
    .await?;
    assert!(body["field_errors"]["status"].is_string());

    // Admin has submitted nothing
    let theirs = data(server.post("/resumes/by-user", Some(&admin), json!({})).await?, StatusCode::CREATED).await?;
    assert_eq!(theirs, json!([]));
    Ok(())
}

#[tokio::test]
async fn resume_ids_must_be_valid() -> Result<()> {
    let server = spawn_server().await?;
    let user = server.user_token().await?;
    let body = error(
        server
            .post("/resumes", Some(&user), json!({ "url": "cv.pdf", "companyId": "x", "jobId": "" }))
            .await?,
        StatusCode::BAD_REQUEST,
    )
    .await?;
    assert!(body["field_errors"]["companyId"].is_string());
    assert!(body["field_errors"]["jobId"].is_string());
    Ok(())
}

#[tokio::test]
async fn subscribers_self_service_upserts_by_email() -> Result<()> {
    let server = spawn_server().await?;
    let user = server.user_token().await?;

    let skills = data(server.post("/subscribers/skills", Some(&user), json!({})).await?, StatusCode::CREATED).await?;
    assert!(skills.is_null());

    let ack = data(
        server
            .patch("/subscribers", Some(&user), json!({ "name": "User", "skills": ["RUST", " RUST ", "GO"] }))
            .await?,
        StatusCode::OK,
    )
    .await?;
    assert_eq!(ack["matchedCount"], 0);

    let ack = data(
        server.patch("/subscribers", Some(&user), json!({ "skills": ["REACT"] })).await?,
        StatusCode::OK,
    )
    .await?;
    assert_eq!(ack["matchedCount"], 1);

    let skills = data(server.post("/subscribers/skills", Some(&user), json!({})).await?, StatusCode::CREATED).await?;
    assert_eq!(skills["skills"], json!(["REACT"]));

    let admin = server.admin_token().await?;
    let list = data(server.get("/subscribers", Some(&admin)).await?, StatusCode::OK).await?;
    assert_eq!(list["meta"]["total"], 1);
    assert_eq!(list["result"][0]["email"], USER_EMAIL);
    Ok(())
}

#[tokio::test]
async fn subscriber_emails_are_unique() -> Result<()> {
    let server = spawn_server().await?;
    let user = server.user_token().await?;
    let body = json!({ "name": "Fan", "email": "fan@example.com", "skills": ["RUST"] });

    data(server.post("/subscribers", Some(&user), body.clone()).await?, StatusCode::CREATED).await?;
    error(server.post("/subscribers", Some(&user), body).await?, StatusCode::CONFLICT).await?;
    Ok(())
}

#[tokio::test]
async fn users_crud_hides_secrets_and_protects_admin() -> Result<()> {
    let server = spawn_server().await?;
    let admin = server.admin_token().await?;
    let company = create_company(&server, &admin, "Momo").await?;

    let created = data(
        server
            .post(
                "/users",
                Some(&admin),
                json!({
                    "name": "Recruiter",
                    "email": "hr@momo.vn",
                    "password": "secret",
                    "age": 30,
                    "gender": "female",
                    "address": "HCM",
                    "company": { "_id": company, "name": "Momo" }
                }),
            )
            .await?,
        StatusCode::CREATED,
    )
    .await?;
    let id = created["_id"].as_str().unwrap().to_string();

    let list = data(server.get("/users?sort=email", Some(&admin)).await?, StatusCode::OK).await?;
    assert_eq!(list["meta"]["total"], 3);
    for user in list["result"].as_array().unwrap() {
        assert!(user.get("password").is_none());
    }

    data(
        server.patch(&format!("/users/{}", id), Some(&admin), json!({ "name": "Lead Recruiter" })).await?,
        StatusCode::OK,
    )
    .await?;
    let user = data(server.get(&format!("/users/{}", id), None).await?, StatusCode::OK).await?;
    assert_eq!(user["name"], "Lead Recruiter");
    assert_eq!(user["company"]["name"], "Momo");

    error(
        server
            .patch(&format!("/users/{}", id), Some(&admin), json!({ "email": ADMIN_EMAIL }))
            .await?,
        StatusCode::CONFLICT,
    )
    .await?;

    let admin_record = server.state.users.find_by_email(ADMIN_EMAIL).await?.expect("admin is seeded");
    let body = error(
        server.delete(&format!("/users/{}", admin_record.id), Some(&admin)).await?,
        StatusCode::BAD_REQUEST,
    )
    .await?;
    assert_eq!(body["error"], "Can not remove admin account");

    let ack = data(server.delete(&format!("/users/{}", id), Some(&admin)).await?, StatusCode::OK).await?;
    assert_eq!(ack["deleted"], 1);
    error(server.post("/auth/login", None, json!({ "username": "hr@momo.vn", "password": "secret" })).await?, StatusCode::UNAUTHORIZED)
        .await?;
    Ok(())
}
