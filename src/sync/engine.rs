use std::path::Path;

use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::clients::RecordStore;
use crate::config::TableNames;
use crate::models::*;
use crate::storage::load_snapshot;
use crate::sync::extract;
use crate::sync::fields::{self, Entity};
use crate::sync::upsert::batch_upsert;

/// Everything one run produced: the caller-facing summary plus every stage's id map.
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    pub summary: SyncSummary,
    pub families: IdMap,
    pub guardians: IdMap,
    pub students: IdMap,
    pub classes: IdMap,
    pub enrollments: IdMap,
    pub roster: IdMap,
}

/// Reconciles a snapshot into the record store, one entity type at a time.
///
/// Stages run in dependency order (families, guardians, students, classes,
/// enrollments, roster) and each stage's id map feeds the link fields of the
/// stages after it. Item failures never stop a stage or a run; they surface as
/// `attempted > succeeded` in the summary. Id maps live only for the duration of
/// one call, so concurrent or repeated runs never share state.
pub struct SyncEngine<S> {
    store: S,
    tables: TableNames,
    chunk_size: usize,
}

impl<S: RecordStore> SyncEngine<S> {
    pub fn new(store: S, tables: TableNames, chunk_size: usize) -> Self {
        Self { store, tables, chunk_size: chunk_size.max(1) }
    }

    /// Load the snapshot at `path` and sync it. Read and parse failures abort before
    /// any remote call is made.
    pub async fn sync_from_path(&self, path: &Path) -> Result<SyncOutcome> {
        let snapshot = load_snapshot(path)?;
        tracing::info!(path = %path.display(), classes = snapshot.classes.len(), "Loaded snapshot");
        Ok(self.sync_snapshot(&snapshot).await)
    }

    pub async fn sync_snapshot(&self, snapshot: &Snapshot) -> SyncOutcome {
        let run_id = format!("sync_{}", Uuid::new_v4().simple());
        let span = tracing::info_span!("sync_run", run_id = %run_id);
        self.run_stages(snapshot).instrument(span).await
    }

    async fn run_stages(&self, snapshot: &Snapshot) -> SyncOutcome {
        let start_time = Instant::now();
        tracing::info!(
            classes = snapshot.classes.len(),
            synced_at = ?snapshot.synced_at,
            "Starting sync execution"
        );

        // STAGE 1: families
        let families = extract::unique_families(snapshot);
        let family_out = self
            .stage(Entity::Family, &families, |f| fields::family_request(f), |f| f.family_id.clone())
            .await;

        // STAGE 2: guardians and students, both linked to families
        let guardians = extract::unique_guardians(snapshot);
        let guardian_out = self
            .stage(
                Entity::Guardian,
                &guardians,
                |g| fields::guardian_request(g, &family_out.id_map),
                |g| g.guardian.guardian_id.clone(),
            )
            .await;

        let students = extract::unique_students(snapshot);
        let student_out = self
            .stage(
                Entity::Student,
                &students,
                |s| fields::student_request(s, &family_out.id_map),
                |s| s.student_id.clone(),
            )
            .await;

        // STAGE 3: classes, with reverse links to their enrolled students
        let classes = extract::unique_classes(snapshot);
        let class_out = self
            .stage(
                Entity::Class,
                &classes,
                |c| fields::class_request(c, &student_out.id_map),
                |c| c.id.clone(),
            )
            .await;

        // STAGE 4: enrollments, linked to students and classes
        let enrollments = extract::unique_enrollments(snapshot);
        let enrollment_out = self
            .stage(
                Entity::Enrollment,
                &enrollments,
                |e| fields::enrollment_request(e, &student_out.id_map, &class_out.id_map),
                |e| e.entry.enrollment_id.clone(),
            )
            .await;

        // STAGE 5: flat roster projection over the same enrollment set
        let roster_out = self
            .stage(
                Entity::Roster,
                &enrollments,
                |e| fields::roster_request(e),
                |e| e.entry.enrollment_id.clone(),
            )
            .await;

        let summary = SyncSummary {
            families: Tally::from(&family_out),
            guardians: Tally::from(&guardian_out),
            students: Tally::from(&student_out),
            classes: Tally::from(&class_out),
            enrollments: Tally::from(&enrollment_out),
            roster: Tally::from(&roster_out),
        };

        tracing::info!(
            duration_ms = start_time.elapsed().as_millis(),
            fully_successful = summary.is_complete(),
            summary = %summary,
            "Sync completed"
        );

        SyncOutcome {
            summary,
            families: family_out.id_map,
            guardians: guardian_out.id_map,
            students: student_out.id_map,
            classes: class_out.id_map,
            enrollments: enrollment_out.id_map,
            roster: roster_out.id_map,
        }
    }

    async fn stage<T, M, K>(&self, entity: Entity, items: &[T], mapper: M, id_of: K) -> BatchOutcome
    where
        M: Fn(&T) -> UpsertRequest,
        K: Fn(&T) -> String,
    {
        let table = entity.table(&self.tables);
        let started = Instant::now();
        tracing::info!(stage = entity.label(), table = %table, items = items.len(), "Stage starting");

        let outcome = batch_upsert(&self.store, table, items, self.chunk_size, mapper, id_of).await;

        if outcome.failed > 0 {
            tracing::warn!(
                stage = entity.label(),
                table = %table,
                succeeded = outcome.succeeded(),
                attempted = outcome.attempted(),
                "Stage finished with failures"
            );
        } else {
            tracing::info!(
                stage = entity.label(),
                table = %table,
                succeeded = outcome.succeeded(),
                duration_ms = started.elapsed().as_millis(),
                "Stage finished"
            );
        }
        outcome
    }
}
