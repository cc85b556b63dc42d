mod common;

use common::{create_test_pool, posts, posts_query, seed_post, seed_users, users_query};
use quill_query::{FilterValue, Predicate, QueryError, SqlValue};

#[tokio::test]
async fn all_returns_every_row_as_records() {
    let pool = create_test_pool().await;
    seed_users(&pool, 3).await;

    let records = users_query().order_by("users.id").all(&pool).await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(
        records[0].get("name"),
        Some(&SqlValue::Text("user_1".to_string()))
    );
    assert_eq!(records[2].get("age"), Some(&SqlValue::Int(3)));
    assert_eq!(records[0].get("nickname"), Some(&SqlValue::Null));
}

#[tokio::test]
async fn filters_combine_with_and_by_default() {
    let pool = create_test_pool().await;
    seed_users(&pool, 10).await;

    let count = users_query()
        .apply_filters(&[
            ("users.age__gte", FilterValue::from(4)),
            ("users.active", FilterValue::from(true)),
        ])
        .unwrap()
        .count(&pool)
        .await
        .unwrap();
    // Even ages 4..=10: 4, 6, 8, 10.
    assert_eq!(count, 4);
}

#[tokio::test]
async fn or_filter_group_widens_the_match() {
    let pool = create_test_pool().await;
    seed_users(&pool, 10).await;

    let count = users_query()
        .apply_filters_or(&[
            ("users.age__lte", FilterValue::from(2)),
            ("users.age__gte", FilterValue::from(9)),
        ])
        .unwrap()
        .count(&pool)
        .await
        .unwrap();
    assert_eq!(count, 4);
}

#[tokio::test]
async fn null_filter_values_are_skipped() {
    let pool = create_test_pool().await;
    seed_users(&pool, 5).await;

    let count = users_query()
        .apply_filters(&[
            ("users.age__gte", FilterValue::from(SqlValue::Null)),
            ("users.age__lte", FilterValue::from(3)),
        ])
        .unwrap()
        .count(&pool)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn isnull_operator_matches_missing_values() {
    let pool = create_test_pool().await;
    seed_users(&pool, 3).await;
    sqlx::query("UPDATE users SET nickname = 'ace' WHERE id = 1")
        .execute(&pool)
        .await
        .unwrap();

    let with_nick = users_query()
        .apply_filters(&[("users.nickname__isnull", FilterValue::from(false))])
        .unwrap()
        .count(&pool)
        .await
        .unwrap();
    assert_eq!(with_nick, 1);

    let without = users_query()
        .apply_filters(&[("users.nickname__isnull", FilterValue::from(true))])
        .unwrap()
        .count(&pool)
        .await
        .unwrap();
    assert_eq!(without, 2);
}

#[tokio::test]
async fn empty_in_list_matches_nothing_and_empty_not_in_everything() {
    let pool = create_test_pool().await;
    seed_users(&pool, 4).await;

    let none = users_query()
        .where_in::<i64>("users.id", vec![])
        .count(&pool)
        .await
        .unwrap();
    assert_eq!(none, 0);

    let all = users_query()
        .where_not_in::<i64>("users.id", vec![])
        .count(&pool)
        .await
        .unwrap();
    assert_eq!(all, 4);
}

#[tokio::test]
async fn scalar_value_for_in_is_wrapped() {
    let pool = create_test_pool().await;
    seed_users(&pool, 4).await;

    let count = users_query()
        .apply_filters(&[("users.id__in", FilterValue::from(2))])
        .unwrap()
        .count(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn join_then_filter_on_joined_table() {
    let pool = create_test_pool().await;
    seed_users(&pool, 3).await;
    seed_post(&pool, 1, "hello", true).await;
    seed_post(&pool, 1, "draft", false).await;
    seed_post(&pool, 2, "world", true).await;

    let records = users_query()
        .join(posts(), Predicate::col_eq("users.id", "posts.user_id"))
        .apply_filters(&[("posts.published", FilterValue::from(true))])
        .unwrap()
        .select(&["users.name", "posts.title"])
        .order_by("posts.id")
        .all(&pool)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].get("title"),
        Some(&SqlValue::Text("hello".to_string()))
    );
    assert_eq!(
        records[1].get("name"),
        Some(&SqlValue::Text("user_2".to_string()))
    );
}

#[tokio::test]
async fn find_and_find_or_fail() {
    let pool = create_test_pool().await;
    seed_users(&pool, 3).await;

    let record = users_query().find(&pool, 2_i64).await.unwrap().unwrap();
    assert_eq!(
        record.get("name"),
        Some(&SqlValue::Text("user_2".to_string()))
    );

    assert!(users_query().find(&pool, 99_i64).await.unwrap().is_none());
    assert!(matches!(
        users_query().find_or_fail(&pool, 99_i64).await,
        Err(QueryError::NotFound)
    ));
}

#[tokio::test]
async fn first_respects_ordering() {
    let pool = create_test_pool().await;
    seed_users(&pool, 5).await;

    let record = users_query()
        .order_by("-users.age")
        .first(&pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.get("age"), Some(&SqlValue::Int(5)));
}

#[tokio::test]
async fn first_or_fail_and_last() {
    let pool = create_test_pool().await;
    seed_users(&pool, 3).await;

    let first = users_query()
        .order_by("users.id")
        .first_or_fail(&pool)
        .await
        .unwrap();
    assert_eq!(first.get("age"), Some(&SqlValue::Int(1)));

    let last = users_query()
        .order_by("users.id")
        .last(&pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.get("age"), Some(&SqlValue::Int(3)));

    assert!(users_query().last(&pool).await.is_ok());
    assert!(matches!(
        users_query()
            .where_clause(Predicate::gt("users.age", 100))
            .first_or_fail(&pool)
            .await,
        Err(QueryError::NotFound)
    ));
}

#[tokio::test]
async fn paginate_windows_and_reports_totals() {
    let pool = create_test_pool().await;
    seed_users(&pool, 45).await;

    let page1 = users_query()
        .order_by("users.id")
        .paginate(&pool, 1, 20)
        .await
        .unwrap();
    assert_eq!(page1.items.len(), 20);
    assert_eq!(page1.pagination.total_records, 45);
    assert_eq!(page1.pagination.total_pages, 3);
    assert!(page1.pagination.has_more);
    assert_eq!(page1.pagination.previous_page, None);
    assert_eq!(page1.pagination.next_page, Some(2));

    let page3 = users_query()
        .order_by("users.id")
        .paginate(&pool, 3, 20)
        .await
        .unwrap();
    assert_eq!(page3.items.len(), 5);
    assert!(!page3.pagination.has_more);
    assert_eq!(page3.pagination.next_page, None);
    assert_eq!(
        page3.items[0].get("name"),
        Some(&SqlValue::Text("user_41".to_string()))
    );
}

#[tokio::test]
async fn paginate_empty_result_reports_one_page() {
    let pool = create_test_pool().await;

    let page = users_query().paginate(&pool, 1, 20).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.pagination.total_records, 0);
    assert_eq!(page.pagination.total_pages, 1);
    assert!(!page.pagination.has_more);
}

#[tokio::test]
async fn paginate_rejects_zero_page_or_size() {
    let pool = create_test_pool().await;

    assert!(matches!(
        users_query().paginate(&pool, 0, 20).await,
        Err(QueryError::InvalidPagination { page: 0, .. })
    ));
    assert!(matches!(
        users_query().paginate(&pool, 1, 0).await,
        Err(QueryError::InvalidPagination { per_page: 0, .. })
    ));
}

#[tokio::test]
async fn aggregates_over_filtered_rows() {
    let pool = create_test_pool().await;
    seed_users(&pool, 10).await;

    let q = || {
        users_query()
            .apply_filters(&[("users.age__lte", FilterValue::from(4))])
            .unwrap()
    };
    assert_eq!(q().count(&pool).await.unwrap(), 4);
    assert_eq!(q().sum(&pool, "users.age").await.unwrap(), Some(10.0));
    assert_eq!(q().avg(&pool, "users.age").await.unwrap(), Some(2.5));
    assert_eq!(q().min(&pool, "users.age").await.unwrap(), Some(1.0));
    assert_eq!(q().max(&pool, "users.age").await.unwrap(), Some(4.0));
    assert!(q().exists(&pool).await.unwrap());

    let empty = users_query()
        .where_clause(Predicate::gt("users.age", 100))
        .sum(&pool, "users.age")
        .await
        .unwrap();
    assert_eq!(empty, None);
}

#[tokio::test]
async fn grouped_count_reports_the_number_of_groups() {
    let pool = create_test_pool().await;
    seed_users(&pool, 7).await;

    // active splits 1..=7 into two groups (3 even, 4 odd).
    let groups = users_query()
        .select(&["users.active"])
        .group_by(&["users.active"])
        .count(&pool)
        .await
        .unwrap();
    assert_eq!(groups, 2);
}

#[tokio::test]
async fn grouped_count_on_empty_table_is_zero() {
    let pool = create_test_pool().await;

    let groups = users_query()
        .select(&["users.active"])
        .group_by(&["users.active"])
        .count(&pool)
        .await
        .unwrap();
    assert_eq!(groups, 0);
}

#[tokio::test]
async fn grouped_paginate_totals_count_groups_not_rows() {
    let pool = create_test_pool().await;
    seed_users(&pool, 10).await;

    let page = users_query()
        .select(&["users.active"])
        .group_by(&["users.active"])
        .order_by("users.active")
        .paginate(&pool, 1, 20)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.pagination.total_records, 2);
    assert_eq!(page.pagination.total_pages, 1);
}

#[tokio::test]
async fn in_subquery_filters_by_nested_query() {
    let pool = create_test_pool().await;
    seed_users(&pool, 3).await;
    seed_post(&pool, 1, "a", true).await;
    seed_post(&pool, 3, "b", false).await;

    let records = users_query()
        .where_in_subquery("users.id", || {
            posts_query()
                .select(&["posts.user_id"])
                .apply_filters(&[("posts.published", FilterValue::from(true))])
                .unwrap()
        })
        .all(&pool)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("id"), Some(&SqlValue::Int(1)));
}

#[tokio::test]
async fn union_all_merges_both_selects() {
    let pool = create_test_pool().await;
    seed_users(&pool, 2).await;
    seed_post(&pool, 1, "title_1", true).await;

    let records = users_query()
        .select(&["users.name"])
        .union_all(posts_query().select(&["posts.title"]))
        .order_by("name")
        .all(&pool)
        .await
        .unwrap();
    let names: Vec<_> = records
        .iter()
        .filter_map(|r| r.get("name").cloned())
        .collect();
    assert_eq!(
        names,
        vec![
            SqlValue::Text("title_1".to_string()),
            SqlValue::Text("user_1".to_string()),
            SqlValue::Text("user_2".to_string()),
        ]
    );
}

#[tokio::test]
async fn from_subquery_executes_over_derived_table() {
    let pool = create_test_pool().await;
    seed_users(&pool, 10).await;

    let count = users_query()
        .from_subquery("grown", || {
            users_query()
                .select(&["users.id", "users.age"])
                .where_clause(Predicate::gte("users.age", 5))
        })
        .unwrap()
        .apply_filters(&[("grown.age__lte", FilterValue::from(7))])
        .unwrap()
        .count(&pool)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn typed_decoding_via_from_row() {
    #[derive(sqlx::FromRow)]
    struct UserRow {
        name: String,
        age: i64,
    }

    let pool = create_test_pool().await;
    seed_users(&pool, 2).await;

    let rows: Vec<UserRow> = users_query()
        .select(&["users.name", "users.age"])
        .order_by("users.id")
        .all_as(&pool)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "user_1");
    assert_eq!(rows[1].age, 2);
}
