//! Persistence round-trip tests for the notification feed.

use std::sync::Arc;

use server_core::domains::notifications::{
    AlertSink, NotificationCenter, NotificationKind, NotificationStore,
};
use tempfile::TempDir;

struct SilentSink;

impl AlertSink for SilentSink {
    fn alert(&self) {}
}

fn center_at(dir: &TempDir) -> NotificationCenter {
    NotificationCenter::load(NotificationStore::in_dir(dir.path()), Arc::new(SilentSink))
}

#[test]
fn feed_survives_restart_with_order_and_read_state() {
    let dir = TempDir::new().unwrap();

    {
        let center = center_at(&dir);
        center.add_notification(NotificationKind::Info, "first", "oldest", None);
        center.add_notification(NotificationKind::Success, "second", "middle", None);
        center.add_notification(NotificationKind::Error, "third", "newest", None);

        let read_id = center.notifications()[2].id;
        assert!(center.mark_as_read(read_id));
        assert_eq!(center.unread_count(), 2);
    }

    // A fresh process loads the same slot.
    let reloaded = center_at(&dir);
    let feed = reloaded.notifications();

    assert_eq!(feed.len(), 3);
    assert_eq!(feed[0].title, "third");
    assert_eq!(feed[2].title, "first");
    assert!(feed[2].read);
    assert_eq!(reloaded.unread_count(), 2);
}

#[test]
fn clear_all_persists_the_empty_feed() {
    let dir = TempDir::new().unwrap();

    {
        let center = center_at(&dir);
        center.add_notification(NotificationKind::Info, "only", "entry", None);
        center.clear_all();
    }

    let reloaded = center_at(&dir);
    assert!(reloaded.notifications().is_empty());
}

#[test]
fn corrupt_slot_starts_empty_instead_of_failing() {
    let dir = TempDir::new().unwrap();
    let store = NotificationStore::in_dir(dir.path());
    std::fs::write(store.path(), "not json at all").unwrap();

    let center = center_at(&dir);
    assert!(center.notifications().is_empty());

    // The next mutation rewrites the slot with valid content.
    center.add_notification(NotificationKind::Info, "fresh", "start", None);
    let reloaded = center_at(&dir);
    assert_eq!(reloaded.notifications().len(), 1);
}
