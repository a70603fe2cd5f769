//! One pass over the snapshot per entity type, yielding each natural key once.
//!
//! The first occurrence of a key wins; later copies are dropped without comparing
//! their contents. Output order is first-seen order.

use std::collections::HashSet;

use crate::models::{ClassEntry, Family, Guardian, RosterEntry, Snapshot};

/// A guardian together with the natural key of the family it was found under.
#[derive(Debug, Clone, Copy)]
pub struct GuardianRef<'a> {
    pub guardian: &'a Guardian,
    pub family_id: &'a str,
}

/// A roster entry together with the class it was first found under.
#[derive(Debug, Clone, Copy)]
pub struct EnrollmentRef<'a> {
    pub entry: &'a RosterEntry,
    pub class: &'a ClassEntry,
}

fn roster_entries<'a>(snapshot: &'a Snapshot) -> impl Iterator<Item = &'a RosterEntry> + 'a {
    snapshot.classes.iter().flat_map(|c| c.roster.iter())
}

pub fn unique_families(snapshot: &Snapshot) -> Vec<&Family> {
    let mut seen = HashSet::new();
    roster_entries(snapshot)
        .filter_map(|entry| entry.family.as_ref())
        .filter(|family| seen.insert(family.family_id.as_str()))
        .collect()
}

pub fn unique_guardians(snapshot: &Snapshot) -> Vec<GuardianRef<'_>> {
    let mut seen = HashSet::new();
    roster_entries(snapshot)
        .filter_map(|entry| entry.family.as_ref())
        .flat_map(|family| {
            family.guardians.iter().map(move |guardian| GuardianRef {
                guardian,
                family_id: family.family_id.as_str(),
            })
        })
        .filter(|g| seen.insert(g.guardian.guardian_id.as_str()))
        .collect()
}

/// Students keep the whole roster entry: it carries the family reference used for linking.
pub fn unique_students(snapshot: &Snapshot) -> Vec<&RosterEntry> {
    let mut seen = HashSet::new();
    roster_entries(snapshot)
        .filter(|entry| seen.insert(entry.student_id.as_str()))
        .collect()
}

pub fn unique_classes(snapshot: &Snapshot) -> Vec<&ClassEntry> {
    let mut seen = HashSet::new();
    snapshot
        .classes
        .iter()
        .filter(|class| seen.insert(class.id.as_str()))
        .collect()
}

/// Enrollments listed under several classes collapse to the first class seen.
pub fn unique_enrollments(snapshot: &Snapshot) -> Vec<EnrollmentRef<'_>> {
    let mut seen = HashSet::new();
    snapshot
        .classes
        .iter()
        .flat_map(|class| class.roster.iter().map(move |entry| EnrollmentRef { entry, class }))
        .filter(|e| seen.insert(e.entry.enrollment_id.as_str()))
        .collect()
}
