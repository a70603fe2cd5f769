use serde::{Deserialize, Serialize};

use crate::models::{Result, SyncError};

/// Remote table names, one per entity type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableNames {
    pub families: String,
    pub guardians: String,
    pub students: String,
    pub classes: String,
    pub enrollments: String,
    pub roster: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            families: "ICP_Families".to_string(),
            guardians: "ICP_Guardians".to_string(),
            students: "ICP_Students".to_string(),
            classes: "ICP_Classes".to_string(),
            enrollments: "ICP_Enrollments".to_string(),
            roster: "ICP_Roster".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub airtable_api_key: String,
    pub airtable_base_id: String,
    pub airtable_api_url: String,
    pub tables: TableNames,
    pub snapshot_dir: String,
    pub chunk_size: usize,
    pub http_timeout_ms: u64,
    pub http_user_agent: String,
    pub http_max_retries: u32,
    pub http_retry_backoff_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
    let get = |k: &str| std::env::var(k).ok().filter(|v| !v.is_empty());

    let airtable_api_key = get("AIRTABLE_API_KEY").unwrap_or_default();
    let airtable_base_id = get("AIRTABLE_BASE_ID").unwrap_or_default();
    let airtable_api_url = get("AIRTABLE_API_URL").unwrap_or_else(|| "https://api.airtable.com".to_string());

    let defaults = TableNames::default();
    let tables = TableNames {
        families: get("ICLASSPRO_AIRTABLE_FAMILIES_TABLE").unwrap_or(defaults.families),
        guardians: get("ICLASSPRO_AIRTABLE_GUARDIANS_TABLE").unwrap_or(defaults.guardians),
        students: get("ICLASSPRO_AIRTABLE_STUDENTS_TABLE").unwrap_or(defaults.students),
        classes: get("ICLASSPRO_AIRTABLE_CLASSES_TABLE").unwrap_or(defaults.classes),
        enrollments: get("ICLASSPRO_AIRTABLE_ENROLLMENTS_TABLE").unwrap_or(defaults.enrollments),
        roster: get("ICLASSPRO_AIRTABLE_ROSTER_TABLE").unwrap_or(defaults.roster),
    };

    let snapshot_dir = get("SNAPSHOT_DIR").unwrap_or_else(|| "data".to_string());
    // Airtable rejects more than 5 requests/sec per base; keep windows small
    let chunk_size: usize = get("SYNC_CHUNK_SIZE").and_then(|s| s.parse().ok()).unwrap_or(10);
    let http_timeout_ms: u64 = get("HTTP_TIMEOUT_MS").and_then(|s| s.parse().ok()).unwrap_or(30000);
    let http_user_agent = get("HTTP_USER_AGENT").unwrap_or_else(|| "roster-sync/1.0".to_string());
    let http_max_retries: u32 = get("HTTP_MAX_RETRIES").and_then(|s| s.parse().ok()).unwrap_or(3);
    let http_retry_backoff_ms: u64 = get("HTTP_RETRY_BACKOFF_MS").and_then(|s| s.parse().ok()).unwrap_or(500);

        Self {
            airtable_api_key,
            airtable_base_id,
            airtable_api_url,
            tables,
            snapshot_dir,
            chunk_size: chunk_size.max(1),
            http_timeout_ms,
            http_user_agent,
            http_max_retries,
            http_retry_backoff_ms,
        }
    }

    /// Fails listing every required variable that is unset.
    pub fn require_credentials(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.airtable_api_key.is_empty() {
            missing.push("AIRTABLE_API_KEY");
        }
        if self.airtable_base_id.is_empty() {
            missing.push("AIRTABLE_BASE_ID");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Configuration(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )))
        }
    }
}
