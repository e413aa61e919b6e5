use std::time::Duration;

use list_state::{spawn_debouncer, ColumnFilterConfig, FilterChange, ListState, LookupOption};
use query_core::{FilterOperator, FilterValue, SortDir};
use serde_json::json;
use tokio::time::Instant;

fn author_posts() -> ListState<serde_json::Value> {
    ListState::new([
        ("title", ColumnFilterConfig::text()),
        ("createdAt", ColumnFilterConfig::date()),
        (
            "authorId",
            ColumnFilterConfig::lookup([LookupOption::new("u1", "Ann")])
                .locked(FilterValue::new(FilterOperator::In, json!(["u1"]))),
        ),
    ])
    .with_sort_field("authorId", "author.displayName")
}

fn locked_value() -> FilterValue {
    FilterValue::new(FilterOperator::In, json!(["u1"]))
}

#[test]
fn locked_filter_survives_edits_and_clear_all() {
    let mut s = author_posts();
    assert_eq!(s.column_filter("authorId"), Some(&locked_value()));

    assert_eq!(s.set_column_filter("authorId", None).unwrap(), FilterChange::Locked);
    let other = FilterValue::new(FilterOperator::In, json!(["u2"]));
    assert_eq!(
        s.set_column_filter("authorId", Some(other)).unwrap(),
        FilterChange::Locked
    );
    assert_eq!(s.column_filter("authorId"), Some(&locked_value()));

    s.set_column_filter("title", Some(FilterValue::new(FilterOperator::Contains, "cat")))
        .unwrap();
    s.clear_all_filters();

    let filter = s.to_query_options().filter.unwrap();
    assert_eq!(filter.columns.len(), 1);
    assert_eq!(filter.columns.get("authorId"), Some(&locked_value()));
    assert_eq!(s.active_filters_count(), 0);
}

#[test]
fn any_filter_or_sort_change_returns_to_first_page() {
    let mut s = author_posts();

    s.set_page(3);
    s.set_column_filter("title", Some(FilterValue::new(FilterOperator::Contains, "a")))
        .unwrap();
    assert_eq!(s.page(), 0);

    s.set_page(3);
    s.set_column_filter("title", None).unwrap();
    assert_eq!(s.page(), 0);

    s.set_page(3);
    s.set_sort("createdAt", Some(SortDir::Asc));
    assert_eq!(s.page(), 0);

    s.set_page(3);
    s.clear_all_filters();
    assert_eq!(s.page(), 0);

    // a locked column ignores the edit, so the page stays
    s.set_page(3);
    s.set_column_filter("authorId", None).unwrap();
    assert_eq!(s.page(), 3);
}

#[test]
fn search_settles_after_quiet_period() {
    let mut s = author_posts();
    let t0 = Instant::now();
    s.set_page(2);

    s.set_global_filter_text("c", t0);
    s.set_global_filter_text("ca", t0 + Duration::from_millis(200));
    s.set_global_filter_text("cat", t0 + Duration::from_millis(400));

    assert!(!s.poll(t0 + Duration::from_millis(600)));
    assert_eq!(s.to_query_options().filter.unwrap().global_search, None);
    assert_eq!(s.page(), 2);

    assert!(s.poll(t0 + Duration::from_millis(700)));
    assert_eq!(
        s.to_query_options().filter.unwrap().global_search.as_deref(),
        Some("cat")
    );
    assert_eq!(s.page(), 0);
    assert_eq!(s.active_filters_count(), 1);
}

#[test]
fn query_options_shape() {
    let mut s = author_posts().with_page_size(20).unwrap();
    s.set_sort("authorId", Some(SortDir::Desc));
    s.add_sort("title", Some(SortDir::Asc));
    s.set_column_filter("createdAt", Some(FilterValue::between("2024-01-01", "2024-01-31")))
        .unwrap();

    let opts = s.to_query_options();
    assert_eq!(
        serde_json::to_value(&opts).unwrap(),
        json!({
            "pagination": { "page": 0, "limit": 20 },
            "sort": { "author.displayName": "desc", "title": "asc" },
            "filter": {
                "authorId": { "operator": "in", "value": ["u1"] },
                "createdAt": { "operator": "between", "value": "2024-01-01", "value2": "2024-01-31" }
            }
        })
    );
}

#[tokio::test(start_paused = true)]
async fn debouncer_feeds_list_state() {
    let mut s = author_posts();
    let (input, mut settled, _task) = spawn_debouncer(Duration::from_millis(300));

    for text in ["s", "st", "sto"] {
        input.send(text);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let text = settled.recv().await.unwrap();
    assert!(s.apply_search(text));
    assert_eq!(s.debounced_global_filter_text(), "sto");
}
