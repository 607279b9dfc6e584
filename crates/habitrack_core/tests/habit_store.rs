mod common;

use common::{habit, memory_repo, read_fields, seeded_repo};
use habitrack_core::db::open_db;
use habitrack_core::{HabitId, HabitPatch, HabitRepository, HabitStore, SqliteHabitRepository};
use std::sync::Arc;

#[test]
fn store_is_empty_until_first_snapshot_is_delivered() {
    let repo = seeded_repo(&[habit("a", "Meditate", 0)]);
    let mut store = HabitStore::new(Arc::clone(&repo));
    store.start();

    assert!(store.is_started());
    assert!(!store.is_loaded());
    assert!(store.is_empty());

    repo.deliver_pending();
    assert!(store.is_loaded());
    assert_eq!(store.habits(), vec![habit("a", "Meditate", 0)]);
}

#[test]
fn start_twice_keeps_a_single_subscription() {
    let repo = memory_repo();
    let mut store = HabitStore::new(Arc::clone(&repo));
    store.start();
    store.start();

    assert_eq!(repo.subscriber_count(), 1);
    assert_eq!(repo.deliver_pending(), 1);
}

#[test]
fn store_tracks_repository_contents_after_every_write() {
    let repo = seeded_repo(&[habit("a", "Meditate", 0)]);
    let mut store = HabitStore::new(Arc::clone(&repo));
    store.start();
    repo.deliver_pending();

    let a = HabitId::parse("a").unwrap();
    let read_id = repo.create_habit(&read_fields()).unwrap();
    repo.update_habit(&a, &HabitPatch::streak(5)).unwrap();
    repo.delete_habit(&HabitId::parse("missing").unwrap()).unwrap();

    // Writes are not visible before delivery.
    assert_eq!(store.len(), 1);
    repo.deliver_pending();
    assert_eq!(store.habits(), repo.list_habits().unwrap());

    repo.delete_habit(&a).unwrap();
    repo.deliver_pending();
    assert_eq!(store.habits(), repo.list_habits().unwrap());
    assert_eq!(store.len(), 1);
    assert!(store.get(&read_id).is_some());
    assert!(store.get(&a).is_none());
}

#[test]
fn stop_without_start_is_a_noop_and_stop_is_idempotent() {
    let repo = memory_repo();
    let mut store = HabitStore::new(Arc::clone(&repo));
    store.stop();
    store.start();
    store.stop();
    store.stop();

    assert!(!store.is_started());
    assert_eq!(repo.subscriber_count(), 0);
}

#[test]
fn stop_before_first_snapshot_suppresses_all_deliveries() {
    let repo = seeded_repo(&[habit("a", "Meditate", 0)]);
    let mut store = HabitStore::new(Arc::clone(&repo));
    store.start();
    store.stop();
    repo.create_habit(&read_fields()).unwrap();

    assert_eq!(repo.deliver_pending(), 0);
    assert_eq!(store.snapshots_received(), 0);
    assert!(store.is_empty());
}

#[test]
fn restart_forgets_previous_records_until_next_snapshot() {
    let repo = seeded_repo(&[habit("a", "Meditate", 0)]);
    let mut store = HabitStore::new(Arc::clone(&repo));
    store.start();
    repo.deliver_pending();
    store.stop();
    assert!(store.is_empty());

    store.start();
    assert!(!store.is_loaded());
    repo.deliver_pending();
    assert_eq!(store.len(), 1);
}

#[test]
fn snapshot_error_keeps_last_good_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habits.db");
    let repo = Arc::new(SqliteHabitRepository::new(open_db(&path).unwrap()));
    repo.import_habit(&habit("a", "Meditate", 1)).unwrap();

    let mut store = HabitStore::new(Arc::clone(&repo));
    store.start();
    repo.deliver_pending();
    assert_eq!(store.len(), 1);

    // Another client writes a record this build cannot decode.
    let other = open_db(&path).unwrap();
    other
        .execute_batch(
            "PRAGMA ignore_check_constraints = ON;
             UPDATE habits SET priority = 'urgent' WHERE id = 'a';",
        )
        .unwrap();
    repo.create_habit(&read_fields()).unwrap();
    repo.deliver_pending();

    assert_eq!(store.habits(), vec![habit("a", "Meditate", 1)]);
    assert!(store.last_error().unwrap().contains("invalid priority"));

    other
        .execute_batch("UPDATE habits SET priority = 'medium' WHERE id = 'a';")
        .unwrap();
    repo.update_habit(&HabitId::parse("a").unwrap(), &HabitPatch::streak(2))
        .unwrap();
    repo.deliver_pending();

    assert_eq!(store.len(), 2);
    assert_eq!(store.last_error(), None);
}

#[test]
fn concurrent_writers_leave_store_equal_to_collection() {
    for _ in 0..50 {
        let repo = memory_repo();
        let mut store = HabitStore::new(Arc::clone(&repo));
        store.start();
        repo.deliver_pending();

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let repo = Arc::clone(&repo);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        repo.create_habit(&read_fields()).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        repo.deliver_pending();
        assert_eq!(store.len(), 40);
        assert_eq!(store.habits(), repo.list_habits().unwrap());
    }
}
