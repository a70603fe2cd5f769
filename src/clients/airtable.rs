use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::RecordStore;
use crate::config::Config;
use crate::models::*;

/// Escape a value for use inside a single-quoted Airtable formula string literal.
pub fn escape_formula_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out
}

/// `{Field} = 'value'` with the value escaped.
pub fn equality_formula(field: &str, value: &str) -> String {
    format!("{{{}}} = '{}'", field, escape_formula_value(value))
}

/// Pull Airtable's error message out of a failure body, falling back to a preview of the raw text.
fn airtable_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        match json.get("error") {
            Some(Value::Object(err)) => {
                if let Some(m) = err.get("message").and_then(|m| m.as_str()) {
                    return m.to_string();
                }
                if let Some(t) = err.get("type").and_then(|t| t.as_str()) {
                    return t.to_string();
                }
            }
            Some(Value::String(s)) => return s.clone(),
            _ => {}
        }
    }
    body.chars().take(200).collect()
}

#[derive(Clone, Copy)]
enum Op {
    Lookup,
    Mutation,
    Schema,
}

impl Op {
    fn error(self, table: &str, message: String) -> SyncError {
        match self {
            Op::Lookup => SyncError::Lookup { table: table.to_string(), message },
            Op::Mutation => SyncError::Mutation { table: table.to_string(), message },
            Op::Schema => SyncError::Schema(format!("{}: {}", table, message)),
        }
    }
}

/// When a failed request may be sent again.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Retry {
    /// Reads and PATCHes: repeating them cannot add records.
    Transient,
    /// POSTs: a 5xx or dropped connection may come after the write landed, so only
    /// 429 (rejected before anything was written) is retried.
    RateLimitOnly,
}

fn decode<T: DeserializeOwned>(op: Op, table: &str, body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| op.error(table, format!("unexpected response body: {}", e)))
}

#[derive(Debug, Deserialize)]
struct RecordPage {
    #[serde(default)]
    records: Vec<StoreRecord>,
}

/// A table as reported by the metadata API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TableList {
    #[serde(default)]
    tables: Vec<TableInfo>,
}

#[derive(Clone)]
pub struct AirtableClient {
    client: Client,
    api_url: String,
    base_id: String,
    api_key: String,
    user_agent: String,
    max_retries: u32,
    base_backoff_ms: u64,
}

impl AirtableClient {
    pub fn new(
        api_url: String,
        base_id: String,
        api_key: String,
        timeout_ms: u64,
        user_agent: String,
        max_retries: u32,
        base_backoff_ms: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .connect_timeout(std::time::Duration::from_millis(timeout_ms.min(10_000)))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            base_id,
            api_key,
            user_agent,
            max_retries,
            base_backoff_ms,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.airtable_api_url.clone(),
            cfg.airtable_base_id.clone(),
            cfg.airtable_api_key.clone(),
            cfg.http_timeout_ms,
            cfg.http_user_agent.clone(),
            cfg.http_max_retries,
            cfg.http_retry_backoff_ms,
        )
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/v0/{}/{}", self.api_url, self.base_id, urlencoding::encode(table))
    }

    fn meta_tables_url(&self) -> String {
        format!("{}/v0/meta/bases/{}/tables", self.api_url, self.base_id)
    }

    /// Send a request, retrying according to `retry` with bounded exponential backoff.
    /// Returns the parsed JSON body on success.
    async fn execute<F>(&self, op: Op, table: &str, retry: Retry, build: F) -> Result<Value>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            let resp_res = build()
                .bearer_auth(&self.api_key)
                .header("User-Agent", &self.user_agent)
                .send()
                .await;

            match resp_res {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<Value>()
                            .await
                            .map_err(|e| op.error(table, format!("unreadable response body: {}", e)));
                    }

                    let text = response.text().await.unwrap_or_default();
                    let retryable = match retry {
                        Retry::Transient => status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
                        Retry::RateLimitOnly => status == StatusCode::TOO_MANY_REQUESTS,
                    };
                    if retryable && attempt < self.max_retries {
                        let backoff = self.backoff_ms(attempt);
                        tracing::warn!(table = %table, status = %status, attempt = attempt + 1, backoff_ms = backoff, "airtable transient error; retrying");
                        tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(op.error(table, format!("status={} {}", status, airtable_message(&text))));
                }
                Err(e) => {
                    if retry == Retry::Transient && attempt < self.max_retries {
                        let backoff = self.backoff_ms(attempt);
                        tracing::warn!(table = %table, error = %e, attempt = attempt + 1, backoff_ms = backoff, "airtable request error; retrying");
                        tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(op.error(table, format!("request failed: {}", e)));
                }
            }
        }
    }

    fn backoff_ms(&self, attempt: u32) -> u64 {
        self.base_backoff_ms
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX))
    }

    pub async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let url = self.meta_tables_url();
        let body = self
            .execute(Op::Schema, "<meta>", Retry::Transient, || self.client.get(&url))
            .await?;
        let list: TableList = decode(Op::Schema, "<meta>", body)?;
        Ok(list.tables)
    }

    pub async fn create_table(&self, name: &str, fields: &[Value]) -> Result<TableInfo> {
        let url = self.meta_tables_url();
        let payload = serde_json::json!({ "name": name, "fields": fields });
        let body = self
            .execute(Op::Schema, name, Retry::RateLimitOnly, || self.client.post(&url).json(&payload))
            .await?;
        decode(Op::Schema, name, body)
    }
}

#[async_trait]
impl RecordStore for AirtableClient {
    async fn find_by_field(&self, table: &str, field: &str, value: &str) -> Result<Option<StoreRecord>> {
        let url = self.table_url(table);
        let formula = equality_formula(field, value);
        tracing::debug!(table = %table, formula = %formula, "airtable find");
        let body = self
            .execute(Op::Lookup, table, Retry::Transient, || {
                self.client
                    .get(&url)
                    .query(&[("filterByFormula", formula.as_str()), ("maxRecords", "1")])
            })
            .await?;
        let page: RecordPage = decode(Op::Lookup, table, body)?;
        Ok(page.records.into_iter().next())
    }

    async fn create(&self, table: &str, fields: &Fields) -> Result<StoreRecord> {
        let url = self.table_url(table);
        let payload = serde_json::json!({ "fields": fields });
        let body = self
            .execute(Op::Mutation, table, Retry::RateLimitOnly, || self.client.post(&url).json(&payload))
            .await?;
        decode(Op::Mutation, table, body)
    }

    async fn update(&self, table: &str, id: &str, fields: &Fields) -> Result<StoreRecord> {
        let url = format!("{}/{}", self.table_url(table), urlencoding::encode(id));
        let payload = serde_json::json!({ "fields": fields });
        let body = self
            .execute(Op::Mutation, table, Retry::Transient, || self.client.patch(&url).json(&payload))
            .await?;
        decode(Op::Mutation, table, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        assert_eq!(escape_formula_value("O'Brien"), "O\\'Brien");
        assert_eq!(escape_formula_value("a\\b"), "a\\\\b");
        assert_eq!(escape_formula_value("plain 123"), "plain 123");
    }

    #[test]
    fn formula_wraps_field_and_value() {
        assert_eq!(equality_formula("Family ID", "254"), "{Family ID} = '254'");
        assert_eq!(
            equality_formula("Family ID", "O'Brien"),
            "{Family ID} = 'O\\'Brien'"
        );
    }

    #[test]
    fn a_trailing_backslash_cannot_close_the_literal() {
        // value `x\` must not turn the closing quote into an escaped quote
        assert_eq!(equality_formula("K", "x\\"), "{K} = 'x\\\\'");
    }

    #[test]
    fn error_message_is_extracted_from_airtable_body() {
        let body = r#"{"error":{"type":"INVALID_VALUE_FOR_COLUMN","message":"Field \"Zip\" cannot accept the provided value"}}"#;
        assert_eq!(airtable_message(body), "Field \"Zip\" cannot accept the provided value");
        assert_eq!(airtable_message(r#"{"error":"NOT_FOUND"}"#), "NOT_FOUND");
        assert_eq!(airtable_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn unexpected_body_keeps_table_context() {
        let err = decode::<StoreRecord>(Op::Mutation, "ICP_Families", serde_json::json!({"fields": {}})).unwrap_err();
        match err {
            SyncError::Mutation { table, message } => {
                assert_eq!(table, "ICP_Families");
                assert!(message.contains("unexpected response body"), "{}", message);
            }
            other => panic!("expected mutation error, got {:?}", other),
        }
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        let client = AirtableClient::new(
            "http://localhost/".into(),
            "app".into(),
            "key".into(),
            1000,
            "test".into(),
            3,
            100,
        )
        .unwrap();
        assert_eq!(client.backoff_ms(0), 100);
        assert_eq!(client.backoff_ms(2), 400);
        assert_eq!(client.backoff_ms(80), u64::MAX);
        assert_eq!(client.table_url("ICP Families"), "http://localhost/v0/app/ICP%20Families");
    }
}
