use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use subtrack_core::{
    AlertEngine, AlertKind, Error, ExportFormat, Exporter, FixedClock, NewSubscription, Priority,
    Status, SubscriptionStore, ALL_CATEGORIES,
};
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn offset(days: i64) -> String {
    (today() + Duration::days(days)).format("%Y-%m-%d").to_string()
}

fn create_store() -> (TempDir, SubscriptionStore) {
    let dir = TempDir::new().unwrap();
    let store = SubscriptionStore::with_clock(
        dir.path().join("subscriptions.json"),
        Arc::new(FixedClock::on(today())),
    )
    .unwrap();
    (dir, store)
}

fn seed(store: &SubscriptionStore) {
    store
        .add(NewSubscription::new("Netflix", offset(20)).price(15.0).category("Entertainment"))
        .unwrap();
    store
        .add(NewSubscription::new("Spotify", offset(2)).price(10.0).category("Music"))
        .unwrap();
    store
        .add(NewSubscription::new("Planet Fitness", offset(5)).price(25.0).category("Health"))
        .unwrap();
    store
        .add(NewSubscription::new("NetNewsWire Pro", offset(-4)).price(0.0).category("Entertainment"))
        .unwrap();
}

#[test]
fn test_scenario_cost_expiring_and_alerts() {
    let (_dir, store) = create_store();
    store.add(NewSubscription::new("A", offset(10)).price(10.0)).unwrap_err();
    store.add(NewSubscription::new("AA", offset(10)).price(10.0)).unwrap();
    store.add(NewSubscription::new("BB", offset(-1)).price(20.0)).unwrap();

    assert_eq!(store.total_monthly_cost().unwrap(), 30.0);
    assert!(store.expiring_within(7).unwrap().is_empty());

    let alerts = AlertEngine::new(&store).scan().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].subscription.name, "BB");
    assert_eq!(alerts[0].kind, AlertKind::Expired);
    assert_eq!(alerts[0].priority, Priority::High);
}

#[test]
fn test_load_all_sorted_and_idempotent() {
    let (_dir, store) = create_store();
    seed(&store);

    let first = store.load_all().unwrap();
    let second = store.load_all().unwrap();
    assert_eq!(first, second);

    let names: Vec<_> = first.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["NetNewsWire Pro", "Spotify", "Planet Fitness", "Netflix"]
    );
}

#[test]
fn test_add_grows_collection_by_one_with_fresh_id() {
    let (_dir, store) = create_store();
    seed(&store);
    let before = store.load_all().unwrap();

    let added = store
        .add(NewSubscription::new("Hulu", offset(9)).price(7.99).notes("ads tier"))
        .unwrap();
    let after = store.load_all().unwrap();

    assert_eq!(after.len(), before.len() + 1);
    assert!(before.iter().all(|s| s.id != added.id));
    let stored = after.iter().find(|s| s.id == added.id).unwrap();
    assert_eq!(stored, &added);
    assert_eq!(stored.notes, "ads tier");
}

#[test]
fn test_delete_missing_id_leaves_collection() {
    let (_dir, store) = create_store();
    seed(&store);
    let before = store.load_all().unwrap();

    assert!(!store.delete(-1).unwrap());
    assert_eq!(store.load_all().unwrap(), before);

    let victim = before[0].id;
    assert!(store.delete(victim).unwrap());
    assert_eq!(store.load_all().unwrap().len(), before.len() - 1);
    assert!(matches!(store.get(victim), Err(Error::NotFound(_))));
}

#[test]
fn test_search_filters_compose() {
    let (_dir, store) = create_store();
    seed(&store);

    assert_eq!(store.search("", ALL_CATEGORIES).unwrap().len(), 4);

    let hits = store.search("net", "Entertainment").unwrap();
    let names: Vec<_> = hits.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["NetNewsWire Pro", "Netflix"]);

    assert!(store.search("net", "Music").unwrap().is_empty());
    assert_eq!(store.search("FIT", ALL_CATEGORIES).unwrap().len(), 1);
}

#[test]
fn test_expiring_within_window() {
    let (_dir, store) = create_store();
    seed(&store);

    let soon: Vec<_> = store
        .expiring_within(7)
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(soon, vec!["Spotify", "Planet Fitness"]);
    assert_eq!(store.expiring_within(2).unwrap().len(), 1);
}

#[test]
fn test_categories_sorted_distinct() {
    let (_dir, store) = create_store();
    seed(&store);
    assert_eq!(
        store.categories().unwrap(),
        vec!["Entertainment", "Health", "Music"]
    );
}

#[test]
fn test_statistics_from_store() {
    let (_dir, store) = create_store();
    seed(&store);

    let stats = store.statistics(None).unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.expiring, 2);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.monthly_cost, 50.0);

    let music = store.statistics(Some("Music")).unwrap();
    assert_eq!(music.by_category.len(), 1);
    assert_eq!(music.by_category[0].percentage, 20.0);
}

#[test]
fn test_malformed_record_is_skipped() {
    let (_dir, store) = create_store();
    std::fs::write(
        store.path(),
        r#"[
            {"id": 1, "name": "One", "date": "2024-07-01", "price": 1.0, "category": "a", "notes": "", "created_at": "2024-01-01T00:00:00"},
            {"id": 2, "name": "Two", "date": "2024-07-02", "price": 2.0, "category": "a", "notes": "", "created_at": "2024-01-01T00:00:00"},
            {"id": "three", "name": 3},
            {"id": 4, "name": "Four", "date": "2024-07-04", "price": 4.0, "category": "b", "notes": "", "created_at": "2024-01-01T00:00:00"}
        ]"#,
    )
    .unwrap();

    let loaded = store.load_all().unwrap();
    let ids: Vec<_> = loaded.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2, 4]);
}

#[test]
fn test_json_export_round_trips_through_store() {
    let (dir, store) = create_store();
    seed(&store);
    let original = store.load_all().unwrap();

    let export_path = dir.path().join("export.json");
    Exporter::export_to_file_with_format(&original, &export_path, ExportFormat::Json, today())
        .unwrap();

    let reloaded = SubscriptionStore::with_clock(&export_path, Arc::new(FixedClock::on(today())))
        .unwrap()
        .load_all()
        .unwrap();
    assert_eq!(reloaded, original);
}

#[test]
fn test_csv_export_reflects_today() {
    let (dir, store) = create_store();
    seed(&store);
    let path = dir.path().join("export.csv");

    Exporter::export_to_file(&store.load_all().unwrap(), &path, today()).unwrap();
    let csv = std::fs::read_to_string(&path).unwrap();

    assert!(csv.contains("Spotify,") && csv.contains(",Urgent,2,"));
    assert!(csv.contains(",Expired,-4,"));
    assert_eq!(csv.lines().count(), 5);
}

#[test]
fn test_backup_and_restore_are_verbatim() {
    let (dir, store) = create_store();
    seed(&store);
    let backup_path = dir.path().join("safe").join("backup.json");
    let snapshot = std::fs::read(store.path()).unwrap();

    assert!(store.backup(&backup_path).unwrap());
    assert_eq!(std::fs::read(&backup_path).unwrap(), snapshot);

    store.add(NewSubscription::new("Extra", offset(1))).unwrap();
    assert_eq!(store.load_all().unwrap().len(), 5);

    assert!(store.restore(&backup_path).unwrap());
    assert_eq!(std::fs::read(store.path()).unwrap(), snapshot);
    assert_eq!(store.load_all().unwrap().len(), 4);
}

#[test]
fn test_status_as_seen_by_store() {
    let (_dir, store) = create_store();
    seed(&store);
    let today = store.today();

    let statuses: Vec<_> = store
        .load_all()
        .unwrap()
        .iter()
        .map(|s| s.status(today))
        .collect();
    assert_eq!(
        statuses,
        vec![
            Status::Expired,
            Status::Urgent,
            Status::ExpiringSoon,
            Status::Active
        ]
    );
}
