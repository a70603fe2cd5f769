//! Declared field sets for every synced table and the `setup-tables` routine that
//! creates whichever of them are missing from the base.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::clients::AirtableClient;
use crate::config::TableNames;
use crate::models::*;
use crate::sync::fields::{class, enrollment, family, guardian, roster, student, Entity};

/// Linked tables must exist before the tables pointing at them.
pub const SETUP_ORDER: [Entity; 6] = [
    Entity::Family,
    Entity::Student,
    Entity::Class,
    Entity::Guardian,
    Entity::Enrollment,
    Entity::Roster,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    LongText,
    Email,
    Phone,
    Date,
    Checkbox,
    Number,
    Link(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn f(name: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef { name, kind }
}

/// Field set of `entity`'s table. The first field is the natural key and becomes
/// the table's primary field.
pub fn table_fields(entity: Entity) -> Vec<FieldDef> {
    use FieldKind::*;
    match entity {
        Entity::Family => vec![
            f(family::ID, Text),
            f(family::NAME, Text),
            f(family::EMAIL, Email),
            f(family::PHONE, Phone),
            f(family::STREET, Text),
            f(family::CITY, Text),
            f(family::STATE, Text),
            f(family::ZIP, Text),
        ],
        Entity::Guardian => vec![
            f(guardian::ID, Text),
            f(guardian::FIRST_NAME, Text),
            f(guardian::LAST_NAME, Text),
            f(guardian::EMAIL, Email),
            f(guardian::PHONE, Phone),
            f(guardian::RELATIONSHIP, Text),
            f(guardian::IS_PRIMARY, Checkbox),
            f(guardian::FAMILY, Link(Entity::Family)),
        ],
        Entity::Student => vec![
            f(student::ID, Text),
            f(student::FIRST_NAME, Text),
            f(student::LAST_NAME, Text),
            f(student::BIRTH_DATE, Date),
            f(student::GENDER, Text),
            f(student::HEALTH_CONCERNS, LongText),
            f(student::FAMILY, Link(Entity::Family)),
        ],
        Entity::Class => vec![
            f(class::ID, Text),
            f(class::NAME, Text),
            f(class::SCHEDULE, Text),
            f(class::ROOM, Text),
            f(class::INSTRUCTORS, Text),
            f(class::MAX_CAPACITY, Number),
            f(class::STUDENTS, Link(Entity::Student)),
        ],
        Entity::Enrollment => vec![
            f(enrollment::ID, Text),
            f(enrollment::TYPE, Text),
            f(enrollment::START_DATE, Date),
            f(enrollment::DROP_DATE, Date),
            f(enrollment::MEDICAL, Checkbox),
            f(enrollment::ALLOW_IMAGE, Checkbox),
            f(enrollment::TRIAL, Checkbox),
            f(enrollment::WAITLIST, Checkbox),
            f(enrollment::STUDENT, Link(Entity::Student)),
            f(enrollment::CLASS, Link(Entity::Class)),
        ],
        Entity::Roster => vec![
            f(roster::ENROLLMENT_ID, Text),
            f(roster::ENROLLMENT_TYPE, Text),
            f(roster::START_DATE, Date),
            f(roster::DROP_DATE, Date),
            f(roster::TRIAL, Checkbox),
            f(roster::WAITLIST, Checkbox),
            f(roster::MAKEUP, Checkbox),
            f(roster::MEDICAL, Checkbox),
            f(roster::ALLOW_IMAGE, Checkbox),
            f(roster::STUDENT_ID, Text),
            f(roster::STUDENT_FIRST_NAME, Text),
            f(roster::STUDENT_LAST_NAME, Text),
            f(roster::STUDENT_AGE, Text),
            f(roster::STUDENT_GENDER, Text),
            f(roster::BIRTH_DATE, Date),
            f(roster::HEALTH_CONCERNS, LongText),
            f(roster::CLASS_ID, Text),
            f(roster::CLASS_NAME, Text),
            f(roster::SCHEDULE, Text),
            f(roster::ROOM, Text),
            f(roster::INSTRUCTORS, Text),
            f(roster::MAX_CAPACITY, Number),
            f(roster::ACTIVE_ENROLLMENTS, Number),
            f(roster::OPENINGS, Number),
            f(roster::SEATS_FILLED, Number),
            f(roster::WAITLIST_COUNT, Number),
            f(roster::FAMILY_ID, Text),
            f(roster::FAMILY_NAME, Text),
            f(roster::PRIMARY_EMAIL, Email),
            f(roster::PRIMARY_PHONE, Phone),
            f(roster::STREET, Text),
            f(roster::CITY, Text),
            f(roster::STATE, Text),
            f(roster::ZIP, Text),
            f(roster::GUARDIAN_NAME, Text),
            f(roster::GUARDIAN_EMAIL, Email),
            f(roster::GUARDIAN_PHONE, Phone),
            f(roster::GUARDIAN_RELATIONSHIP, Text),
        ],
    }
}

/// Metadata API payload for one field. Link fields need the id of their target table.
fn field_payload(def: &FieldDef, table_ids: &HashMap<Entity, String>) -> Result<Value> {
    let value = match def.kind {
        FieldKind::Text => json!({ "name": def.name, "type": "singleLineText" }),
        FieldKind::LongText => json!({ "name": def.name, "type": "multilineText" }),
        FieldKind::Email => json!({ "name": def.name, "type": "email" }),
        FieldKind::Phone => json!({ "name": def.name, "type": "phoneNumber" }),
        FieldKind::Date => json!({
            "name": def.name,
            "type": "date",
            "options": { "dateFormat": { "name": "iso" } }
        }),
        FieldKind::Checkbox => json!({
            "name": def.name,
            "type": "checkbox",
            "options": { "icon": "check", "color": "greenBright" }
        }),
        FieldKind::Number => json!({
            "name": def.name,
            "type": "number",
            "options": { "precision": 0 }
        }),
        FieldKind::Link(target) => {
            let linked = table_ids.get(&target).ok_or_else(|| {
                SyncError::Schema(format!(
                    "field {} links to {} which has no table id",
                    def.name,
                    target.label()
                ))
            })?;
            json!({
                "name": def.name,
                "type": "multipleRecordLinks",
                "options": { "linkedTableId": linked }
            })
        }
    };
    Ok(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupAction {
    Created,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSetup {
    pub entity: Entity,
    pub table: String,
    pub table_id: String,
    pub action: SetupAction,
}

/// Create every synced table the base does not have yet. Existing tables are left
/// untouched, whatever their fields.
pub async fn ensure_tables(client: &AirtableClient, tables: &TableNames) -> Result<Vec<TableSetup>> {
    let existing: HashMap<String, String> = client
        .list_tables()
        .await?
        .into_iter()
        .map(|t| (t.name, t.id))
        .collect();

    let mut table_ids: HashMap<Entity, String> = HashMap::new();
    let mut report = Vec::with_capacity(SETUP_ORDER.len());

    for entity in SETUP_ORDER {
        let name = entity.table(tables).to_string();

        if let Some(id) = existing.get(&name) {
            tracing::info!(table = %name, table_id = %id, "Table exists; skipping");
            table_ids.insert(entity, id.clone());
            report.push(TableSetup { entity, table: name, table_id: id.clone(), action: SetupAction::Skipped });
            continue;
        }

        let payload = table_fields(entity)
            .iter()
            .map(|def| field_payload(def, &table_ids))
            .collect::<Result<Vec<_>>>()?;
        let created = client.create_table(&name, &payload).await?;
        tracing::info!(table = %name, table_id = %created.id, fields = payload.len(), "Created table");

        table_ids.insert(entity, created.id.clone());
        report.push(TableSetup { entity, table: name, table_id: created.id, action: SetupAction::Created });
    }

    Ok(report)
}
