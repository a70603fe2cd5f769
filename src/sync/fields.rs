//! Remote field names and the per-entity payload builders.
//!
//! Every field the engine writes is named here; nothing is derived from snapshot keys
//! at runtime.

use std::collections::HashSet;

use serde_json::Value;

use crate::config::TableNames;
use crate::models::{ClassEntry, Family, Fields, IdMap, RosterEntry, UpsertRequest};
use crate::sync::extract::{EnrollmentRef, GuardianRef};

pub mod family {
    pub const ID: &str = "Family ID";
    pub const NAME: &str = "Family Name";
    pub const EMAIL: &str = "Primary Email";
    pub const PHONE: &str = "Primary Phone";
    pub const STREET: &str = "Street";
    pub const CITY: &str = "City";
    pub const STATE: &str = "State";
    pub const ZIP: &str = "Zip";
}

pub mod guardian {
    pub const ID: &str = "Guardian ID";
    pub const FIRST_NAME: &str = "First Name";
    pub const LAST_NAME: &str = "Last Name";
    pub const EMAIL: &str = "Email";
    pub const PHONE: &str = "Phone";
    pub const RELATIONSHIP: &str = "Relationship";
    pub const IS_PRIMARY: &str = "Is Primary";
    pub const FAMILY: &str = "Family";
}

pub mod student {
    pub const ID: &str = "Student ID";
    pub const FIRST_NAME: &str = "First Name";
    pub const LAST_NAME: &str = "Last Name";
    pub const BIRTH_DATE: &str = "Birth Date";
    pub const GENDER: &str = "Gender";
    pub const HEALTH_CONCERNS: &str = "Health Concerns";
    pub const FAMILY: &str = "Family";
}

pub mod class {
    pub const ID: &str = "Class ID";
    pub const NAME: &str = "Class Name";
    pub const SCHEDULE: &str = "Schedule";
    pub const ROOM: &str = "Room";
    pub const INSTRUCTORS: &str = "Instructors";
    pub const MAX_CAPACITY: &str = "Max Capacity";
    pub const STUDENTS: &str = "ICP_Students";
}

pub mod enrollment {
    pub const ID: &str = "Enrollment ID";
    pub const TYPE: &str = "Enrollment Type";
    pub const START_DATE: &str = "Start Date";
    pub const DROP_DATE: &str = "Drop Date";
    pub const MEDICAL: &str = "Medical";
    pub const ALLOW_IMAGE: &str = "Allow Image";
    pub const TRIAL: &str = "Trial";
    pub const WAITLIST: &str = "Waitlist";
    pub const STUDENT: &str = "Student";
    pub const CLASS: &str = "Class";
}

pub mod roster {
    pub const ENROLLMENT_ID: &str = "Enrollment ID";
    pub const ENROLLMENT_TYPE: &str = "Enrollment Type";
    pub const START_DATE: &str = "Start Date";
    pub const DROP_DATE: &str = "Drop Date";
    pub const TRIAL: &str = "Trial";
    pub const WAITLIST: &str = "Waitlist";
    pub const MAKEUP: &str = "Makeup";
    pub const MEDICAL: &str = "Medical";
    pub const ALLOW_IMAGE: &str = "Allow Image";
    pub const STUDENT_ID: &str = "Student ID";
    pub const STUDENT_FIRST_NAME: &str = "Student First Name";
    pub const STUDENT_LAST_NAME: &str = "Student Last Name";
    pub const STUDENT_AGE: &str = "Student Age";
    pub const STUDENT_GENDER: &str = "Student Gender";
    pub const BIRTH_DATE: &str = "Birth Date";
    pub const HEALTH_CONCERNS: &str = "Health Concerns";
    pub const CLASS_ID: &str = "Class ID";
    pub const CLASS_NAME: &str = "Class Name";
    pub const SCHEDULE: &str = "Schedule";
    pub const ROOM: &str = "Room";
    pub const INSTRUCTORS: &str = "Instructors";
    pub const MAX_CAPACITY: &str = "Max Capacity";
    pub const ACTIVE_ENROLLMENTS: &str = "Active Enrollments";
    pub const OPENINGS: &str = "Openings";
    pub const SEATS_FILLED: &str = "Seats Filled";
    pub const WAITLIST_COUNT: &str = "Waitlist Count";
    pub const FAMILY_ID: &str = "Family ID";
    pub const FAMILY_NAME: &str = "Family Name";
    pub const PRIMARY_EMAIL: &str = "Primary Email";
    pub const PRIMARY_PHONE: &str = "Primary Phone";
    pub const STREET: &str = "Street";
    pub const CITY: &str = "City";
    pub const STATE: &str = "State";
    pub const ZIP: &str = "Zip";
    pub const GUARDIAN_NAME: &str = "Guardian Name";
    pub const GUARDIAN_EMAIL: &str = "Guardian Email";
    pub const GUARDIAN_PHONE: &str = "Guardian Phone";
    pub const GUARDIAN_RELATIONSHIP: &str = "Guardian Relationship";
}

/// Entity types in the order the engine syncs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Family,
    Guardian,
    Student,
    Class,
    Enrollment,
    Roster,
}

impl Entity {
    pub const ALL: [Entity; 6] = [
        Entity::Family,
        Entity::Guardian,
        Entity::Student,
        Entity::Class,
        Entity::Enrollment,
        Entity::Roster,
    ];

    /// Remote field holding the natural key.
    pub fn key_field(self) -> &'static str {
        match self {
            Entity::Family => family::ID,
            Entity::Guardian => guardian::ID,
            Entity::Student => student::ID,
            Entity::Class => class::ID,
            Entity::Enrollment => enrollment::ID,
            Entity::Roster => roster::ENROLLMENT_ID,
        }
    }

    /// Name used in summaries and logs.
    pub fn label(self) -> &'static str {
        match self {
            Entity::Family => "families",
            Entity::Guardian => "guardians",
            Entity::Student => "students",
            Entity::Class => "classes",
            Entity::Enrollment => "enrollments",
            Entity::Roster => "roster",
        }
    }

    pub fn table(self, tables: &TableNames) -> &str {
        match self {
            Entity::Family => &tables.families,
            Entity::Guardian => &tables.guardians,
            Entity::Student => &tables.students,
            Entity::Class => &tables.classes,
            Entity::Enrollment => &tables.enrollments,
            Entity::Roster => &tables.roster,
        }
    }
}

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

fn date(d: &Option<String>) -> Value {
    d.as_ref().map(|s| Value::String(s.clone())).unwrap_or(Value::Null)
}

/// Set a single-record link when the related record exists; otherwise leave the field out.
fn link(fields: &mut Fields, name: &str, natural_key: Option<&str>, ids: &IdMap) {
    if let Some(record_id) = natural_key.and_then(|k| ids.get(k)) {
        fields.insert(name.to_string(), Value::Array(vec![text(record_id)]));
    }
}

pub fn family_request(f: &Family) -> UpsertRequest {
    let mut fields = Fields::new();
    fields.insert(family::ID.into(), text(&f.family_id));
    fields.insert(family::NAME.into(), text(&f.family_name));
    fields.insert(family::EMAIL.into(), text(&f.primary_email));
    fields.insert(family::PHONE.into(), text(&f.primary_phone));
    fields.insert(family::STREET.into(), text(&f.address.street));
    fields.insert(family::CITY.into(), text(&f.address.city));
    fields.insert(family::STATE.into(), text(&f.address.state));
    fields.insert(family::ZIP.into(), text(&f.address.zip));
    UpsertRequest::new(Entity::Family.key_field(), f.family_id.clone(), fields)
}

pub fn guardian_request(g: &GuardianRef<'_>, family_ids: &IdMap) -> UpsertRequest {
    let guardian = g.guardian;
    let mut fields = Fields::new();
    fields.insert(guardian::ID.into(), text(&guardian.guardian_id));
    fields.insert(guardian::FIRST_NAME.into(), text(&guardian.first_name));
    fields.insert(guardian::LAST_NAME.into(), text(&guardian.last_name));
    fields.insert(guardian::EMAIL.into(), text(&guardian.email));
    fields.insert(guardian::PHONE.into(), text(&guardian.phone));
    fields.insert(guardian::RELATIONSHIP.into(), text(&guardian.relationship));
    fields.insert(guardian::IS_PRIMARY.into(), Value::Bool(guardian.is_primary));
    link(&mut fields, guardian::FAMILY, Some(g.family_id), family_ids);
    UpsertRequest::new(Entity::Guardian.key_field(), guardian.guardian_id.clone(), fields)
}

pub fn student_request(s: &RosterEntry, family_ids: &IdMap) -> UpsertRequest {
    let mut fields = Fields::new();
    fields.insert(student::ID.into(), text(&s.student_id));
    fields.insert(student::FIRST_NAME.into(), text(&s.first_name));
    fields.insert(student::LAST_NAME.into(), text(&s.last_name));
    fields.insert(student::BIRTH_DATE.into(), date(&s.birth_date));
    fields.insert(student::GENDER.into(), text(&s.gender));
    fields.insert(student::HEALTH_CONCERNS.into(), text(&s.health_concerns));
    link(&mut fields, student::FAMILY, s.family_key(), family_ids);
    UpsertRequest::new(Entity::Student.key_field(), s.student_id.clone(), fields)
}

/// Remote ids of the class's enrolled students, in roster order, skipping students
/// whose own upsert failed.
pub fn enrolled_student_ids(c: &ClassEntry, student_ids: &IdMap) -> Vec<String> {
    let mut seen = HashSet::new();
    c.roster
        .iter()
        .filter_map(|entry| student_ids.get(&entry.student_id))
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

pub fn class_request(c: &ClassEntry, student_ids: &IdMap) -> UpsertRequest {
    let mut fields = Fields::new();
    fields.insert(class::ID.into(), text(&c.id));
    fields.insert(class::NAME.into(), text(&c.name));
    fields.insert(class::SCHEDULE.into(), text(&c.schedule_display()));
    fields.insert(class::ROOM.into(), text(&c.room));
    fields.insert(class::INSTRUCTORS.into(), text(&c.instructors_display()));
    fields.insert(class::MAX_CAPACITY.into(), Value::from(c.occupancy.max));
    let enrolled = enrolled_student_ids(c, student_ids);
    if !enrolled.is_empty() {
        fields.insert(
            class::STUDENTS.into(),
            Value::Array(enrolled.into_iter().map(Value::String).collect()),
        );
    }
    UpsertRequest::new(Entity::Class.key_field(), c.id.clone(), fields)
}

pub fn enrollment_request(e: &EnrollmentRef<'_>, student_ids: &IdMap, class_ids: &IdMap) -> UpsertRequest {
    let s = e.entry;
    let mut fields = Fields::new();
    fields.insert(enrollment::ID.into(), text(&s.enrollment_id));
    fields.insert(enrollment::TYPE.into(), text(&s.enrollment_type));
    fields.insert(enrollment::START_DATE.into(), date(&s.start_date));
    fields.insert(enrollment::DROP_DATE.into(), date(&s.drop_date));
    fields.insert(enrollment::MEDICAL.into(), Value::Bool(s.flags.medical));
    fields.insert(enrollment::ALLOW_IMAGE.into(), Value::Bool(s.flags.allow_image));
    fields.insert(enrollment::TRIAL.into(), Value::Bool(s.flags.trial));
    fields.insert(enrollment::WAITLIST.into(), Value::Bool(s.flags.waitlist));
    link(&mut fields, enrollment::STUDENT, Some(s.student_id.as_str()), student_ids);
    link(&mut fields, enrollment::CLASS, Some(e.class.id.as_str()), class_ids);
    UpsertRequest::new(Entity::Enrollment.key_field(), s.enrollment_id.clone(), fields)
}

/// One flat row per enrollment: enrollment, student, class, family and first guardian.
pub fn roster_request(e: &EnrollmentRef<'_>) -> UpsertRequest {
    let s = e.entry;
    let c = e.class;
    let fam = s.family.as_ref();
    let addr = fam.map(|f| &f.address);
    let guardian = s.first_guardian();

    let mut fields = Fields::new();
    fields.insert(roster::ENROLLMENT_ID.into(), text(&s.enrollment_id));
    fields.insert(roster::ENROLLMENT_TYPE.into(), text(&s.enrollment_type));
    fields.insert(roster::START_DATE.into(), date(&s.start_date));
    fields.insert(roster::DROP_DATE.into(), date(&s.drop_date));
    fields.insert(roster::TRIAL.into(), Value::Bool(s.flags.trial));
    fields.insert(roster::WAITLIST.into(), Value::Bool(s.flags.waitlist));
    fields.insert(roster::MAKEUP.into(), Value::Bool(s.flags.makeup));
    fields.insert(roster::MEDICAL.into(), Value::Bool(s.flags.medical));
    fields.insert(roster::ALLOW_IMAGE.into(), Value::Bool(s.flags.allow_image));

    fields.insert(roster::STUDENT_ID.into(), text(&s.student_id));
    fields.insert(roster::STUDENT_FIRST_NAME.into(), text(&s.first_name));
    fields.insert(roster::STUDENT_LAST_NAME.into(), text(&s.last_name));
    fields.insert(roster::STUDENT_AGE.into(), text(&s.age));
    fields.insert(roster::STUDENT_GENDER.into(), text(&s.gender));
    fields.insert(roster::BIRTH_DATE.into(), date(&s.birth_date));
    fields.insert(roster::HEALTH_CONCERNS.into(), text(&s.health_concerns));

    fields.insert(roster::CLASS_ID.into(), text(&c.id));
    fields.insert(roster::CLASS_NAME.into(), text(&c.name));
    fields.insert(roster::SCHEDULE.into(), text(&c.schedule_display()));
    fields.insert(roster::ROOM.into(), text(&c.room));
    fields.insert(roster::INSTRUCTORS.into(), text(&c.instructors_display()));
    fields.insert(roster::MAX_CAPACITY.into(), Value::from(c.occupancy.max));
    fields.insert(roster::ACTIVE_ENROLLMENTS.into(), Value::from(c.occupancy.active));
    fields.insert(roster::OPENINGS.into(), Value::from(c.occupancy.openings));
    fields.insert(roster::SEATS_FILLED.into(), Value::from(c.occupancy.seats_filled));
    fields.insert(roster::WAITLIST_COUNT.into(), Value::from(c.occupancy.waitlist));

    fields.insert(roster::FAMILY_ID.into(), text(s.family_key().unwrap_or_default()));
    fields.insert(roster::FAMILY_NAME.into(), text(fam.map(|f| f.family_name.as_str()).unwrap_or_default()));
    fields.insert(roster::PRIMARY_EMAIL.into(), text(fam.map(|f| f.primary_email.as_str()).unwrap_or_default()));
    fields.insert(roster::PRIMARY_PHONE.into(), text(fam.map(|f| f.primary_phone.as_str()).unwrap_or_default()));
    fields.insert(roster::STREET.into(), text(addr.map(|a| a.street.as_str()).unwrap_or_default()));
    fields.insert(roster::CITY.into(), text(addr.map(|a| a.city.as_str()).unwrap_or_default()));
    fields.insert(roster::STATE.into(), text(addr.map(|a| a.state.as_str()).unwrap_or_default()));
    fields.insert(roster::ZIP.into(), text(addr.map(|a| a.zip.as_str()).unwrap_or_default()));

    fields.insert(roster::GUARDIAN_NAME.into(), text(&guardian.map(|g| g.display_name()).unwrap_or_default()));
    fields.insert(roster::GUARDIAN_EMAIL.into(), text(guardian.map(|g| g.email.as_str()).unwrap_or_default()));
    fields.insert(roster::GUARDIAN_PHONE.into(), text(guardian.map(|g| g.phone.as_str()).unwrap_or_default()));
    fields.insert(
        roster::GUARDIAN_RELATIONSHIP.into(),
        text(guardian.map(|g| g.relationship.as_str()).unwrap_or_default()),
    );

    UpsertRequest::new(Entity::Roster.key_field(), s.enrollment_id.clone(), fields)
}
