mod common;

use common::{seed_roster, FaultyStore};
use devaentryd::resolver::{resolve_centers, resolve_master_attributes, resolve_students};

#[tokio::test]
async fn students_are_filtered_by_center_in_roster_order() {
    let store = FaultyStore::new();
    seed_roster(
        store.as_ref(),
        &[
            ("CenterX", "Zoe", "2015-01-01"),
            ("CenterY", "Yan", "2015-01-01"),
            ("CenterX", "Abe", "2015-01-01"),
            ("CenterX ", "Spacey", "2015-01-01"),
        ],
    )
    .await;

    let students = resolve_students(store.as_ref(), "CenterX").await;
    assert_eq!(students, vec!["Zoe".to_string(), "Abe".to_string()]);
}

#[tokio::test]
async fn centers_are_distinct() {
    let store = FaultyStore::new();
    seed_roster(
        store.as_ref(),
        &[
            ("B", "One", "2015-01-01"),
            ("A", "Two", "2015-01-01"),
            ("B", "Three", "2015-01-01"),
        ],
    )
    .await;
    let centers: Vec<String> = resolve_centers(store.as_ref())
        .await
        .into_iter()
        .map(|c| c.0)
        .collect();
    assert_eq!(centers, vec!["B".to_string(), "A".to_string()]);
}

#[tokio::test]
async fn later_stages_do_not_fetch_without_a_selection() {
    let store = FaultyStore::new();
    seed_roster(store.as_ref(), &[("North", "Sam", "2015-01-01")]).await;

    assert!(resolve_students(store.as_ref(), "").await.is_empty());
    assert!(resolve_master_attributes(store.as_ref(), "North", "")
        .await
        .is_empty());
    assert!(resolve_master_attributes(store.as_ref(), "", "Sam")
        .await
        .is_empty());
    assert_eq!(store.list_calls(), 0);
}

#[tokio::test]
async fn master_attributes_of_unknown_student_are_empty() {
    let store = FaultyStore::new();
    seed_roster(store.as_ref(), &[("North", "Sam", "2015-01-01")]).await;

    let known = resolve_master_attributes(store.as_ref(), "North", "Sam").await;
    assert_eq!(known.get("Birth Date").map(String::as_str), Some("2015-01-01"));
    assert!(!known.contains_key("Center Name"));

    let unknown = resolve_master_attributes(store.as_ref(), "North", "Nobody").await;
    assert!(unknown.is_empty());
}

#[tokio::test]
async fn store_failure_degrades_every_stage_to_empty() {
    let store = FaultyStore::new();
    seed_roster(store.as_ref(), &[("North", "Sam", "2015-01-01")]).await;
    FaultyStore::set(&store.fail_list, true);

    assert!(resolve_centers(store.as_ref()).await.is_empty());
    assert!(resolve_students(store.as_ref(), "North").await.is_empty());
    assert!(resolve_master_attributes(store.as_ref(), "North", "Sam")
        .await
        .is_empty());
    assert_eq!(store.list_calls(), 3);
}
