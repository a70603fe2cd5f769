use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::de;

/// One scrape of the class schedule: every class with its roster for the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, deserialize_with = "de::opt_timestamp")]
    pub synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_classes: Option<usize>,
    #[serde(default, deserialize_with = "de::or_default")]
    pub classes: Vec<ClassEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntry {
    #[serde(deserialize_with = "de::key")]
    pub id: String,
    #[serde(default, deserialize_with = "de::text")]
    pub name: String,
    #[serde(default)]
    pub duration_schedule: Option<Schedule>,
    /// Older snapshots carry the already-flattened display string here.
    #[serde(default)]
    pub schedule: Option<Value>,
    #[serde(default, deserialize_with = "de::text")]
    pub room: String,
    #[serde(default, deserialize_with = "de::or_default")]
    pub instructors: Vec<String>,
    #[serde(default, deserialize_with = "de::or_default")]
    pub occupancy: Occupancy,
    #[serde(default, deserialize_with = "de::or_default")]
    pub roster: Vec<RosterEntry>,
}

impl ClassEntry {
    pub fn schedule_display(&self) -> String {
        if let Some(s) = &self.duration_schedule {
            return s.display();
        }
        match &self.schedule {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    pub fn instructors_display(&self) -> String {
        self.instructors.join(", ")
    }
}

/// `durationSchedule` is either a display string or a map of timeslot key to display string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schedule {
    Text(String),
    ByTimeslot(serde_json::Map<String, Value>),
}

impl Schedule {
    pub fn display(&self) -> String {
        match self {
            Schedule::Text(s) => s.clone(),
            Schedule::ByTimeslot(slots) => slots
                .values()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupancy {
    #[serde(default, deserialize_with = "de::or_default")]
    pub active: i64,
    #[serde(default, deserialize_with = "de::or_default")]
    pub max: i64,
    #[serde(default, deserialize_with = "de::or_default")]
    pub openings: i64,
    #[serde(default, deserialize_with = "de::or_default")]
    pub seats_filled: i64,
    #[serde(default, deserialize_with = "de::or_default")]
    pub waitlist: i64,
}

/// A student's enrollment in one class, with the student's own fields and family inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    #[serde(deserialize_with = "de::key")]
    pub student_id: String,
    #[serde(deserialize_with = "de::key")]
    pub enrollment_id: String,
    #[serde(default, deserialize_with = "de::text")]
    pub first_name: String,
    #[serde(default, deserialize_with = "de::text")]
    pub last_name: String,
    #[serde(default, deserialize_with = "de::text")]
    pub age: String,
    #[serde(default, deserialize_with = "de::text")]
    pub gender: String,
    #[serde(default, deserialize_with = "de::text")]
    pub enrollment_type: String,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub drop_date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub birth_date: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    pub health_concerns: String,
    #[serde(default, deserialize_with = "de::or_default")]
    pub flags: Flags,
    #[serde(default, deserialize_with = "de::opt_key")]
    pub family_id: Option<String>,
    #[serde(default)]
    pub family: Option<Family>,
}

impl RosterEntry {
    /// Family natural key, preferring the embedded family over the flat reference.
    pub fn family_key(&self) -> Option<&str> {
        self.family
            .as_ref()
            .map(|f| f.family_id.as_str())
            .or(self.family_id.as_deref())
    }

    pub fn first_guardian(&self) -> Option<&Guardian> {
        self.family.as_ref().and_then(|f| f.guardians.first())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flags {
    #[serde(default, deserialize_with = "de::or_default")]
    pub medical: bool,
    #[serde(default, deserialize_with = "de::or_default")]
    pub allow_image: bool,
    #[serde(default, deserialize_with = "de::or_default")]
    pub trial: bool,
    #[serde(default, deserialize_with = "de::or_default")]
    pub waitlist: bool,
    #[serde(default, deserialize_with = "de::or_default")]
    pub makeup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    #[serde(deserialize_with = "de::key")]
    pub family_id: String,
    #[serde(default, deserialize_with = "de::text")]
    pub family_name: String,
    #[serde(default, deserialize_with = "de::text")]
    pub primary_email: String,
    #[serde(default, deserialize_with = "de::text")]
    pub primary_phone: String,
    #[serde(default, deserialize_with = "de::or_default")]
    pub guardians: Vec<Guardian>,
    #[serde(default, deserialize_with = "de::or_default")]
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guardian {
    #[serde(deserialize_with = "de::key")]
    pub guardian_id: String,
    #[serde(default, deserialize_with = "de::text")]
    pub first_name: String,
    #[serde(default, deserialize_with = "de::text")]
    pub last_name: String,
    #[serde(default, deserialize_with = "de::text")]
    pub email: String,
    #[serde(default, deserialize_with = "de::text")]
    pub phone: String,
    #[serde(default, deserialize_with = "de::text")]
    pub relationship: String,
    #[serde(default, deserialize_with = "de::or_default")]
    pub is_primary: bool,
}

impl Guardian {
    pub fn display_name(&self) -> String {
        if self.first_name.is_empty() {
            return String::new();
        }
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, deserialize_with = "de::text")]
    pub street: String,
    #[serde(default, deserialize_with = "de::text")]
    pub city: String,
    #[serde(default, deserialize_with = "de::text")]
    pub state: String,
    #[serde(default, deserialize_with = "de::text")]
    pub zip: String,
}
