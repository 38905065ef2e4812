mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};

use recruit_api::database::Document;
use recruit_api::filter::{Filter, FilterData, SqlParam};

use common::{error, spawn_server};

fn doc(body: Value) -> Document {
    match body {
        Value::Object(map) => Document::new(map),
        _ => Document::new(Map::new()),
    }
}

fn compile(data: FilterData) -> Filter {
    let mut filter = Filter::new("jobs").expect("valid table");
    filter.assign(data).expect("valid filter");
    filter
}

#[test]
fn skill_digest_filter_matches_and_renders() {
    let filter = compile(FilterData::where_(json!({
        "skills": { "$in": ["RUST", "GO"] },
        "isActive": true,
        "endDate": { "$gte": "2030-01-01T00:00:00.000Z" }
    })));

    let open = doc(json!({ "skills": ["RUST", "SQL"], "isActive": true, "endDate": "2031-01-01T00:00:00.000Z" }));
    let closed = doc(json!({ "skills": ["RUST"], "isActive": true, "endDate": "2029-01-01T00:00:00.000Z" }));
    let paused = doc(json!({ "skills": ["GO"], "isActive": false, "endDate": "2031-01-01T00:00:00.000Z" }));
    let other = doc(json!({ "skills": ["JAVA"], "isActive": true, "endDate": "2031-01-01T00:00:00.000Z" }));
    assert!(filter.matches(&open));
    assert!(!filter.matches(&closed));
    assert!(!filter.matches(&paused));
    assert!(!filter.matches(&other));

    let sql = filter.to_sql("*");
    assert!(sql.query.starts_with("SELECT * FROM \"jobs\" WHERE NOT \"is_deleted\""));
    assert!(sql.query.contains("ORDER BY"));
    assert_eq!(sql.params.len(), 4);
    assert!(sql.params.contains(&SqlParam::Json(json!("RUST"))));
    assert!(sql.params.contains(&SqlParam::Json(json!(true))));
}

#[test]
fn deleted_documents_only_match_when_asked() {
    let mut deleted = doc(json!({ "name": "gone" }));
    deleted.is_deleted = true;

    let mut filter = compile(FilterData::where_(json!({ "name": "gone" })));
    assert!(!filter.matches(&deleted));
    filter.include_deleted(true);
    assert!(filter.matches(&deleted));
    assert!(!filter.to_count_sql().query.contains("is_deleted"));
}

#[test]
fn descending_sort_then_offset_window() {
    let filter = compile(FilterData {
        where_clause: None,
        order: Some(json!("-salary")),
        limit: Some(2),
        offset: Some(1),
    });
    let mut docs = vec![
        doc(json!({ "salary": 100 })),
        doc(json!({ "salary": 300 })),
        doc(json!({ "salary": 200 })),
        doc(json!({ "salary": 50 })),
    ];
    docs.sort_by(|a, b| filter.compare(a, b));
    let page: Vec<i64> = filter
        .window(docs)
        .iter()
        .filter_map(|d| d.body["salary"].as_i64())
        .collect();
    assert_eq!(page, vec![200, 100]);
    assert!(filter.to_sql("*").query.ends_with("LIMIT 2 OFFSET 1"));
}

#[tokio::test]
async fn malformed_list_filters_are_bad_requests() -> Result<()> {
    let server = spawn_server().await?;
    let body = error(server.get("/jobs?sort=name;drop", None).await?, StatusCode::BAD_REQUEST).await?;
    assert_eq!(body["code"], "BAD_REQUEST");
    error(server.get("/companies?bad-field=1", None).await?, StatusCode::BAD_REQUEST).await?;
    Ok(())
}
