//! [`ScheduleStore`]: JSON-file-backed schedule CRUD with explicit ordering.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sprinkler_core::error::CoreError;
use sprinkler_core::schedule::Schedule;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::persist::{read_json, write_json_atomic};

/// Current on-disk format version.
const DOCUMENT_VERSION: u32 = 1;

/// On-disk document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScheduleDocument {
    #[serde(default = "current_version")]
    version: u32,
    #[serde(default)]
    order: Vec<String>,
    #[serde(default)]
    schedules: BTreeMap<String, Schedule>,
    /// Date each schedule was last dispatched (local calendar date).
    #[serde(default)]
    last_run: BTreeMap<String, NaiveDate>,
}

fn current_version() -> u32 {
    DOCUMENT_VERSION
}

impl Default for ScheduleDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            order: Vec::new(),
            schedules: BTreeMap::new(),
            last_run: BTreeMap::new(),
        }
    }
}

impl ScheduleDocument {
    /// Make `order` a permutation of the schedule ids and drop bookkeeping
    /// for schedules that no longer exist.
    ///
    /// Stale or repeated ids are dropped; ids missing from `order` are
    /// appended in id order.
    fn reconcile(&mut self) {
        let mut seen = HashSet::with_capacity(self.schedules.len());
        self.order
            .retain(|id| self.schedules.contains_key(id) && seen.insert(id.clone()));
        for id in self.schedules.keys() {
            if !seen.contains(id) {
                self.order.push(id.clone());
            }
        }
        self.last_run.retain(|id, _| self.schedules.contains_key(id));
    }

    fn ordered(&self) -> Vec<Schedule> {
        self.order
            .iter()
            .filter_map(|id| self.schedules.get(id))
            .cloned()
            .collect()
    }
}

/// Thread-safe schedule store mirrored to a JSON file.
///
/// A single mutex guards the in-memory document; each mutation is applied to
/// a copy, written to disk while the lock is held, and only then committed.
/// A failed write leaves both memory and disk unchanged.
#[derive(Debug)]
pub struct ScheduleStore {
    path: PathBuf,
    doc: Mutex<ScheduleDocument>,
}

impl ScheduleStore {
    /// Load the document at `path`, or start empty if it does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut doc: ScheduleDocument = read_json(&path).await?.unwrap_or_default();

        // Key by the id inside each record so a hand-edited file cannot
        // desynchronise the two.
        doc.schedules = doc
            .schedules
            .into_values()
            .map(|s| (s.id.clone(), s))
            .collect();
        doc.reconcile();

        tracing::info!(
            path = %path.display(),
            schedules = doc.schedules.len(),
            "Schedule store loaded"
        );

        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    /// All schedules in display order.
    pub async fn list(&self) -> Vec<Schedule> {
        self.doc.lock().await.ordered()
    }

    pub async fn get(&self, id: &str) -> Result<Schedule, StoreError> {
        self.doc
            .lock()
            .await
            .schedules
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Insert a new schedule at the end of the order.
    pub async fn create(&self, schedule: Schedule) -> Result<Schedule, StoreError> {
        self.mutate(|doc| {
            if doc.schedules.contains_key(&schedule.id) {
                return Err(CoreError::Conflict(format!(
                    "schedule '{}' already exists",
                    schedule.id
                ))
                .into());
            }
            doc.order.push(schedule.id.clone());
            doc.schedules.insert(schedule.id.clone(), schedule.clone());
            Ok(schedule)
        })
        .await
    }

    /// Replace an existing schedule, keeping its position.
    pub async fn update(&self, schedule: Schedule) -> Result<Schedule, StoreError> {
        self.mutate(|doc| {
            let slot = doc
                .schedules
                .get_mut(&schedule.id)
                .ok_or_else(|| not_found(&schedule.id))?;
            *slot = schedule.clone();
            Ok(schedule)
        })
        .await
    }

    /// Insert or fully replace a schedule.
    pub async fn upsert(&self, schedule: Schedule) -> Result<Schedule, StoreError> {
        self.mutate(|doc| {
            if doc
                .schedules
                .insert(schedule.id.clone(), schedule.clone())
                .is_none()
            {
                doc.order.push(schedule.id.clone());
            }
            Ok(schedule)
        })
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.mutate(|doc| {
            doc.schedules.remove(id).ok_or_else(|| not_found(id))?;
            doc.order.retain(|o| o != id);
            doc.last_run.remove(id);
            Ok(())
        })
        .await
    }

    /// Apply a new display order.
    ///
    /// Unknown ids are ignored and schedules the caller left out keep their
    /// relative order after the listed ones.
    pub async fn reorder(&self, ids: &[String]) -> Result<Vec<Schedule>, StoreError> {
        self.mutate(|doc| {
            let previous = std::mem::take(&mut doc.order);
            doc.order = ids.to_vec();
            doc.order.extend(previous);
            doc.reconcile();
            Ok(doc.ordered())
        })
        .await
    }

    pub async fn last_run(&self, id: &str) -> Option<NaiveDate> {
        self.doc.lock().await.last_run.get(id).copied()
    }

    pub async fn last_runs(&self) -> HashMap<String, NaiveDate> {
        self.doc
            .lock()
            .await
            .last_run
            .iter()
            .map(|(id, date)| (id.clone(), *date))
            .collect()
    }

    /// Persist the dispatch date of a schedule.
    ///
    /// Returns `false` if the schedule was deleted in the meantime.
    pub async fn record_last_run(&self, id: &str, date: NaiveDate) -> Result<bool, StoreError> {
        self.mutate(|doc| {
            if !doc.schedules.contains_key(id) {
                return Ok(false);
            }
            doc.last_run.insert(id.to_string(), date);
            Ok(true)
        })
        .await
    }

    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut ScheduleDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.doc.lock().await;
        let mut next = guard.clone();
        let out = apply(&mut next)?;
        write_json_atomic(&self.path, &next).await?;
        *guard = next;
        Ok(out)
    }
}

fn not_found(id: &str) -> StoreError {
    CoreError::NotFound {
        entity: "Schedule",
        id: id.to_string(),
    }
    .into()
}
