use actix_web::{rt, web};
use redb::Database;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::models::db_operations::posts_db_operations;
use crate::models::{DraftTarget, PostForm};

#[derive(Default)]
struct Pending {
    next_generation: u64,
    /// Draft key -> generation of the one snapshot still allowed to land.
    latest: HashMap<String, u64>,
}

/// Debounces draft snapshots: a snapshot is written only after `delay` passes
/// with no newer snapshot for the same draft key.
#[derive(Clone)]
pub struct AutosaveScheduler {
    delay: Duration,
    pending: Arc<Mutex<Pending>>,
}

impl AutosaveScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(|poisoned| {
            log::error!("Autosave pending map was poisoned! Recovering.");
            poisoned.into_inner()
        })
    }

    /// Queues `snapshot` for `target`, superseding any pending one.
    /// Returns false (and queues nothing) when the form has neither title nor content.
    pub fn schedule(&self, db: web::Data<Database>, target: DraftTarget, snapshot: PostForm) -> bool {
        if !snapshot.has_content() {
            return false;
        }
        let key = target.storage_key();
        let generation = {
            let mut pending = self.lock();
            pending.next_generation += 1;
            let generation = pending.next_generation;
            pending.latest.insert(key.clone(), generation);
            generation
        };
        let scheduler = self.clone();

        rt::spawn(async move {
            rt::time::sleep(scheduler.delay).await;
            // Check and write under one lock: a cancel lands before or after, never between.
            let mut pending = scheduler.lock();
            if pending.latest.get(&key) != Some(&generation) {
                return;
            }
            pending.latest.remove(&key);
            if let Err(e) = posts_db_operations::write_autosave(&db, &target, &snapshot) {
                log::error!("Failed to autosave {}: {}", key, e);
            }
        });
        true
    }

    /// Drops any pending snapshot for `target`. Called before the draft is saved, closed or discarded.
    pub fn cancel(&self, target: &DraftTarget) {
        self.lock().latest.remove(&target.storage_key());
    }

    /// Draft keys with a snapshot still waiting to be written.
    pub fn pending_count(&self) -> usize {
        self.lock().latest.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::collections_db_operations::test_support::temp_db;

    fn snapshot(title: &str) -> PostForm {
        PostForm { title: title.to_string(), ..PostForm::default() }
    }

    #[actix_web::test]
    async fn only_the_latest_snapshot_lands() {
        let (_dir, db) = temp_db();
        let db = web::Data::new(db);
        let scheduler = AutosaveScheduler::new(Duration::from_millis(20));

        assert!(scheduler.schedule(db.clone(), DraftTarget::NewPost, snapshot("first")));
        assert!(scheduler.schedule(db.clone(), DraftTarget::NewPost, snapshot("second")));
        assert!(posts_db_operations::read_autosave(&db, &DraftTarget::NewPost).unwrap().is_none());

        rt::time::sleep(Duration::from_millis(120)).await;
        let stored = posts_db_operations::read_autosave(&db, &DraftTarget::NewPost).unwrap().unwrap();
        assert_eq!(stored.title, "second");
    }

    #[actix_web::test]
    async fn empty_forms_are_not_scheduled() {
        let (_dir, db) = temp_db();
        let scheduler = AutosaveScheduler::new(Duration::from_millis(5));
        assert!(!scheduler.schedule(web::Data::new(db), DraftTarget::NewPost, PostForm::default()));
    }

    #[actix_web::test]
    async fn cancel_drops_the_pending_snapshot() {
        let (_dir, db) = temp_db();
        let db = web::Data::new(db);
        let scheduler = AutosaveScheduler::new(Duration::from_millis(20));
        let target = DraftTarget::Existing("42".to_string());

        scheduler.schedule(db.clone(), target.clone(), snapshot("edit"));
        scheduler.cancel(&target);

        rt::time::sleep(Duration::from_millis(120)).await;
        assert!(posts_db_operations::read_autosave(&db, &target).unwrap().is_none());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[actix_web::test]
    async fn fired_snapshots_leave_nothing_pending() {
        let (_dir, db) = temp_db();
        let db = web::Data::new(db);
        let scheduler = AutosaveScheduler::new(Duration::from_millis(10));

        for id in ["1", "2", "3"] {
            scheduler.schedule(db.clone(), DraftTarget::Existing(id.to_string()), snapshot(id));
        }
        scheduler.schedule(db.clone(), DraftTarget::NewPost, snapshot("new"));
        assert_eq!(scheduler.pending_count(), 4);

        rt::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(scheduler.pending_count(), 0);
        let stored = posts_db_operations::read_autosave(&db, &DraftTarget::Existing("2".to_string())).unwrap().unwrap();
        assert_eq!(stored.title, "2");
    }
}
