//! In-memory resource collections used by the HTTP surface: reports and
//! datasets, each carrying the single-owner `created_by` reference the
//! ownership rules operate on. The real storage engine is an external
//! collaborator; this store only needs read-your-writes on `created_by`.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::rbac::Owned;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: u64,
    pub title: String,
    /// Pre-computed LCA result payload; rendering is out of scope here.
    pub summary: serde_json::Value,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Owned for Report {
    fn owner_id(&self) -> &str { &self.created_by }
    fn set_owner(&mut self, owner: &str) { self.created_by = owner.to_string(); }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dataset {
    pub id: u64,
    pub name: String,
    pub entries: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Owned for Dataset {
    fn owner_id(&self) -> &str { &self.created_by }
    fn set_owner(&mut self, owner: &str) { self.created_by = owner.to_string(); }
}

pub struct ResourceStore {
    reports: RwLock<Vec<Report>>,
    datasets: RwLock<Vec<Dataset>>,
    next_id: AtomicU64,
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceStore {
    pub fn new() -> Self {
        Self { reports: RwLock::new(Vec::new()), datasets: RwLock::new(Vec::new()), next_id: AtomicU64::new(1) }
    }

    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Insert a report, assigning its id. The caller stamps ownership before
    /// insertion; the store never invents an owner.
    pub fn add_report(&self, mut report: Report) -> Report {
        report.id = self.alloc_id();
        self.reports.write().push(report.clone());
        report
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.read().clone()
    }

    pub fn find_report(&self, id: u64) -> Option<Report> {
        self.reports.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn remove_report(&self, id: u64) -> Option<Report> {
        let mut reports = self.reports.write();
        let idx = reports.iter().position(|r| r.id == id)?;
        Some(reports.remove(idx))
    }

    pub fn add_dataset(&self, mut dataset: Dataset) -> Dataset {
        dataset.id = self.alloc_id();
        self.datasets.write().push(dataset.clone());
        dataset
    }

    pub fn datasets(&self) -> Vec<Dataset> {
        self.datasets.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ids_start_at_one() {
        let store = ResourceStore::default();
        let report = store.add_report(Report {
            id: 0,
            title: "first".into(),
            summary: serde_json::Value::Null,
            created_by: "alice".into(),
            created_at: Utc::now(),
        });
        assert_eq!(report.id, 1, "ids must never start at 0");
    }
}
