#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};

use roster_sync::clients::AirtableClient;

pub const API_KEY: &str = "test-key";
pub const BASE_ID: &str = "appTest";

#[derive(Debug, Clone)]
pub struct MockRecord {
    pub id: String,
    pub fields: Map<String, Value>,
}

/// In-memory stand-in for the Airtable REST API.
#[derive(Debug, Default)]
pub struct MockAirtable {
    pub tables: HashMap<String, Vec<MockRecord>>,
    /// (table, formula) for every lookup received, in arrival order.
    pub formulas: Vec<(String, String)>,
    /// (table, field, value): writes whose `field` equals `value` are rejected with 422.
    pub reject_writes: HashSet<(String, String, String)>,
    /// Lookups answered with 429 before the mock starts serving them.
    pub throttle_lookups: u32,
    /// Every lookup fails with 500.
    pub broken_lookups: bool,
    /// Creates answered with 429 before anything is stored.
    pub throttle_creates: u32,
    /// Creates that are stored but then answered with 502.
    pub lossy_creates: u32,
    pub meta_tables: Vec<Value>,
    pub created_tables: Vec<Value>,
    pub creates: usize,
    pub updates: usize,
    next_id: usize,
}

impl MockAirtable {
    pub fn reject(&mut self, table: &str, field: &str, value: &str) {
        self.reject_writes
            .insert((table.to_string(), field.to_string(), value.to_string()));
    }

    pub fn records(&self, table: &str) -> Vec<MockRecord> {
        self.tables.get(table).cloned().unwrap_or_default()
    }

    pub fn total_records(&self) -> usize {
        self.tables.values().map(|t| t.len()).sum()
    }

    /// Record of `table` whose `field` equals `value`.
    pub fn find(&self, table: &str, field: &str, value: &str) -> Option<MockRecord> {
        self.tables
            .get(table)?
            .iter()
            .find(|r| r.fields.get(field).and_then(|v| v.as_str()) == Some(value))
            .cloned()
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{:05}", prefix, self.next_id)
    }

    fn rejects(&self, table: &str, fields: &Map<String, Value>) -> bool {
        self.reject_writes.iter().any(|(t, f, v)| {
            t == table && fields.get(f).and_then(|x| x.as_str()) == Some(v.as_str())
        })
    }
}

pub type Shared = Arc<Mutex<MockAirtable>>;

/// Parse `{Field} = 'value'`, undoing backslash escapes in the literal.
pub fn parse_formula(formula: &str) -> Option<(String, String)> {
    let rest = formula.strip_prefix('{')?;
    let close = rest.find("} = '")?;
    let field = rest[..close].to_string();
    let literal = rest[close + 5..].strip_suffix('\'')?;

    let mut value = String::new();
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => value.push(chars.next()?),
            '\'' => return None,
            _ => value.push(c),
        }
    }
    Some((field, value))
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", API_KEY))
        .unwrap_or(false)
}

fn error(status: StatusCode, kind: &str, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": { "type": kind, "message": message } })))
}

async fn list_records(
    State(state): State<Shared>,
    Path((_base, table)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "AUTHENTICATION_REQUIRED", "bad token");
    }
    let mut st = state.lock().unwrap();
    let formula = params.get("filterByFormula").cloned().unwrap_or_default();
    st.formulas.push((table.clone(), formula.clone()));

    if st.broken_lookups {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR", "lookup unavailable");
    }
    if st.throttle_lookups > 0 {
        st.throttle_lookups -= 1;
        return error(StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT", "slow down");
    }

    let Some((field, value)) = parse_formula(&formula) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_FILTER_BY_FORMULA", &formula);
    };
    let records: Vec<Value> = st
        .find(&table, &field, &value)
        .map(|r| json!({ "id": r.id, "fields": r.fields }))
        .into_iter()
        .collect();
    (StatusCode::OK, Json(json!({ "records": records })))
}

async fn create_record(
    State(state): State<Shared>,
    Path((_base, table)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "AUTHENTICATION_REQUIRED", "bad token");
    }
    let fields = body.get("fields").and_then(|f| f.as_object()).cloned().unwrap_or_default();
    let mut st = state.lock().unwrap();
    if st.rejects(&table, &fields) {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_VALUE_FOR_COLUMN", "rejected by mock");
    }
    if st.throttle_creates > 0 {
        st.throttle_creates -= 1;
        return error(StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT", "slow down");
    }
    let id = st.next_id("rec");
    st.creates += 1;
    st.tables
        .entry(table)
        .or_default()
        .push(MockRecord { id: id.clone(), fields: fields.clone() });
    if st.lossy_creates > 0 {
        st.lossy_creates -= 1;
        return error(StatusCode::BAD_GATEWAY, "BAD_GATEWAY", "upstream closed");
    }
    (StatusCode::OK, Json(json!({ "id": id, "fields": fields })))
}

async fn update_record(
    State(state): State<Shared>,
    Path((_base, table, id)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "AUTHENTICATION_REQUIRED", "bad token");
    }
    let fields = body.get("fields").and_then(|f| f.as_object()).cloned().unwrap_or_default();
    let mut st = state.lock().unwrap();
    if st.rejects(&table, &fields) {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_VALUE_FOR_COLUMN", "rejected by mock");
    }
    st.updates += 1;
    let Some(record) = st
        .tables
        .get_mut(&table)
        .and_then(|rows| rows.iter_mut().find(|r| r.id == id))
    else {
        return error(StatusCode::NOT_FOUND, "NOT_FOUND", "no such record");
    };
    for (k, v) in fields {
        record.fields.insert(k, v);
    }
    (StatusCode::OK, Json(json!({ "id": record.id, "fields": record.fields })))
}

async fn list_meta_tables(State(state): State<Shared>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "AUTHENTICATION_REQUIRED", "bad token");
    }
    let st = state.lock().unwrap();
    (StatusCode::OK, Json(json!({ "tables": st.meta_tables })))
}

async fn create_meta_table(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "AUTHENTICATION_REQUIRED", "bad token");
    }
    let mut st = state.lock().unwrap();
    let id = st.next_id("tbl");
    let name = body.get("name").cloned().unwrap_or(Value::Null);
    let table = json!({ "id": id, "name": name });
    st.meta_tables.push(table.clone());
    st.created_tables.push(body);
    (StatusCode::OK, Json(table))
}

/// Start the mock on an ephemeral port; returns its base URL and shared state.
pub async fn spawn_mock() -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(MockAirtable::default()));
    let app = Router::new()
        .route(
            "/v0/meta/bases/{base}/tables",
            get(list_meta_tables).post(create_meta_table),
        )
        .route("/v0/{base}/{table}", get(list_records).post(create_record))
        .route("/v0/{base}/{table}/{id}", axum::routing::patch(update_record))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://{}", addr), state)
}

pub fn client(base_url: &str) -> AirtableClient {
    client_with_retries(base_url, 2)
}

pub fn client_with_retries(base_url: &str, max_retries: u32) -> AirtableClient {
    AirtableClient::new(
        base_url.to_string(),
        BASE_ID.to_string(),
        API_KEY.to_string(),
        5_000,
        "roster-sync-tests".to_string(),
        max_retries,
        1,
    )
    .unwrap()
}

pub fn roster_entry(student: &str, enrollment: &str, family: Value) -> Value {
    json!({
        "studentId": student,
        "enrollmentId": enrollment,
        "firstName": format!("First {}", student),
        "lastName": "Lastname",
        "age": "7",
        "gender": "F",
        "enrollmentType": "ACTIVE",
        "startDate": "2024-01-08",
        "dropDate": null,
        "birthDate": "2017-03-02",
        "healthConcerns": "",
        "flags": { "medical": false, "allowImage": true, "trial": false, "waitlist": false, "makeup": false },
        "family": family
    })
}

pub fn family(id: &str, name: &str, guardians: &[&str]) -> Value {
    let guardians: Vec<Value> = guardians
        .iter()
        .enumerate()
        .map(|(i, g)| {
            json!({
                "guardianId": g,
                "firstName": format!("Guardian {}", g),
                "lastName": name,
                "email": format!("{}@example.com", g.to_lowercase()),
                "phone": "555-0100",
                "relationship": "Parent",
                "isPrimary": i == 0
            })
        })
        .collect();
    json!({
        "familyId": id,
        "familyName": name,
        "primaryEmail": format!("{}@example.com", id.to_lowercase()),
        "primaryPhone": "555-0100",
        "guardians": guardians,
        "address": { "street": "1 Main St", "city": "Springfield", "state": "IL", "zip": "62701" }
    })
}

pub fn class(id: &str, name: &str, roster: Vec<Value>) -> Value {
    json!({
        "id": id,
        "name": name,
        "durationSchedule": { "mon": "Mon 4:00pm-4:45pm" },
        "room": "Gym A",
        "instructors": ["Coach Kim", "Coach Lee"],
        "occupancy": { "active": roster.len(), "max": 8, "openings": 8 - roster.len() as i64, "seatsFilled": roster.len(), "waitlist": 0 },
        "roster": roster
    })
}

pub fn snapshot(classes: Vec<Value>) -> roster_sync::models::Snapshot {
    serde_json::from_value(json!({
        "syncedAt": "2024-05-01T10:00:00Z",
        "totalClasses": classes.len(),
        "classes": classes
    }))
    .unwrap()
}
