use chrono::NaiveDate;
use larder_core::db::{open_db, open_db_in_memory};
use larder_core::{
    reconcile, FoodItem, KeyValueSlot, MemorySlotStore, NotifiedMarkers, PersistentFlagStore,
    SqliteSlotStore,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

#[test]
fn markers_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("larder.sqlite3");
    let item = FoodItem::new("Milk", 1, day(15));

    {
        let store = PersistentFlagStore::new(SqliteSlotStore::try_new(open_db(&path).unwrap()).unwrap());
        let reconciliation = reconcile(std::slice::from_ref(&item), day(15), store.load());
        assert_eq!(reconciliation.due_items.len(), 1);
        store.save(&reconciliation.markers).unwrap();
    }

    let reopened = PersistentFlagStore::new(SqliteSlotStore::try_new(open_db(&path).unwrap()).unwrap());
    let markers = reopened.load_current(day(15));
    assert!(markers.is_marked_on(item.id, "2024-06-15"));

    let again = reconcile(&[item], day(15), markers);
    assert!(again.due_items.is_empty());
}

#[test]
fn saving_loaded_markers_changes_nothing() {
    let raw = r#"{"a":"2024-06-15","b":"2024-06-14"}"#;
    let slot = MemorySlotStore::new();
    slot.put_raw("notified_markers", raw);
    let store = PersistentFlagStore::new(slot.clone());

    let loaded = store.load();
    store.save(&loaded).unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(slot.raw("notified_markers").as_deref(), Some(raw));
    assert_eq!(store.load(), loaded);
}

#[test]
fn saving_loaded_markers_keeps_sqlite_slot_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("larder.sqlite3");
    let raw = r#"{"a":"2024-06-15","b":"2024-06-14"}"#;
    let observer = SqliteSlotStore::try_new(open_db(&path).unwrap()).unwrap();
    observer.write("notified_markers", raw).unwrap();

    let store = PersistentFlagStore::new(SqliteSlotStore::try_new(open_db(&path).unwrap()).unwrap());
    store.save(&store.load()).unwrap();

    assert_eq!(
        observer.read("notified_markers").unwrap().as_deref(),
        Some(raw)
    );
}

#[test]
fn clear_reads_back_as_empty_mapping() {
    let conn = open_db_in_memory().unwrap();
    let store = PersistentFlagStore::new(SqliteSlotStore::try_new(conn).unwrap());
    let mut markers = NotifiedMarkers::new();
    markers.mark(uuid::Uuid::new_v4(), "2024-06-15");
    store.save(&markers).unwrap();

    store.clear().unwrap();
    assert!(store.load().is_empty());
    store.clear().unwrap();
    assert!(store.load().is_empty());
}

#[test]
fn custom_slot_name_isolates_markers() {
    let slot = MemorySlotStore::new();
    let store = PersistentFlagStore::new(slot.clone()).with_slot_name("kitchen_markers");
    let mut markers = NotifiedMarkers::new();
    markers.mark(uuid::Uuid::new_v4(), "2024-06-15");
    store.save(&markers).unwrap();

    assert!(slot.contains("kitchen_markers"));
    assert!(!slot.contains("notified_markers"));
}
