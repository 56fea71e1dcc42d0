//! Derived schemas: naming, flattening, skipping, and how they feed the builders.

mod common;

use auditable_storage::{
    Clause, ColumnType, Mode, Record, StorageDatetime, Value, build_insert_at, build_update,
};
use common::{Timestamps, User, user, user_row};

#[test]
fn columns_follow_declaration_order_with_flattened_fields_inline() {
    assert_eq!(
        User::columns(),
        vec![
            "id",
            "uuid",
            "display_name",
            "email",
            "created_at",
            "updated_at",
            "deleted_at"
        ]
    );
}

#[test]
fn to_columns_reflects_current_values() {
    let mut u = user(7, "Ann");
    u.email = Some("ann@example.com".to_string());
    let columns = u.to_columns();

    assert_eq!(columns.len(), 7);
    assert_eq!(columns[2], ("display_name", Value::from("Ann")));
    assert_eq!(columns[3], ("email", Value::from("ann@example.com")));
    assert_eq!(columns[6], ("deleted_at", Value::Null(ColumnType::Datetime)));
    assert_eq!(u.column_value("id"), Some(Value::Int(7)));
    assert_eq!(u.column_value("session_note"), None);
}

#[test]
fn from_row_rebuilds_nested_and_skipped_fields() {
    let mut row = user_row(3, "Bo");
    let deleted = StorageDatetime::from_ymd_hms(2024, 1, 2, 3, 4, 5).unwrap();
    row.insert("deleted_at", deleted);

    let u = User::from_row(&row).unwrap();
    assert_eq!(u.id, 3);
    assert_eq!(u.name, "Bo");
    assert_eq!(u.email, None);
    assert_eq!(u.timestamps.deleted_at, Some(deleted));
    assert_eq!(u.timestamps.created_at, None);
    assert_eq!(u.session_note, None);
}

#[test]
fn from_row_reports_wrong_shapes() {
    let mut row = user_row(3, "Bo");
    row.insert("id", "not a number");
    assert!(User::from_row(&row).is_err());
}

#[test]
fn nested_record_stands_alone() {
    assert_eq!(
        Timestamps::columns(),
        vec!["created_at", "updated_at", "deleted_at"]
    );
}

#[test]
fn default_mode_insert_skips_key_and_stamps_timestamps() {
    let now = StorageDatetime::from_ymd_hms(2024, 6, 1, 8, 30, 0).unwrap();
    let stmt = build_insert_at("users", &user(1, "Ann"), &Mode::new(), now);

    assert_eq!(
        stmt.sql,
        "INSERT INTO users (uuid, display_name, email, created_at, updated_at) VALUES (:uuid, :display_name, :email, :created_at, :updated_at)"
    );
    assert_eq!(stmt.params["email"], Value::Null(ColumnType::Text));
    assert_eq!(stmt.params["updated_at"], Value::Datetime(now));
}

#[test]
fn only_and_skip_sets_are_honoured_for_every_column() {
    let u = user(1, "Ann");
    let all = User::columns();

    let skip = Mode::skip(["id", "email", "deleted_at"]);
    let stmt = build_insert_at("users", &u, &skip, StorageDatetime::now());
    for column in &all {
        let listed = skip.skip.iter().any(|s| s == column);
        assert_eq!(stmt.params.contains_key(*column), !listed, "{}", column);
    }

    let only = Mode::only(["uuid", "display_name"]);
    let stmt = build_insert_at("users", &u, &only, StorageDatetime::now());
    for column in &all {
        let listed = only.only.iter().any(|s| s == column);
        assert_eq!(stmt.params.contains_key(*column), listed, "{}", column);
    }
}

#[test]
fn update_through_renamed_column() {
    let update = build_update(
        "users",
        &user(7, "A"),
        &user(7, "B"),
        &Mode::skip(["id"]),
        &Clause::by_id(7i64),
    );
    assert_eq!(
        update.statement.sql,
        "UPDATE users SET display_name = :display_name WHERE 1=1 AND id = :id"
    );
    assert_eq!(update.diff.len(), 1);
    assert_eq!(update.diff["display_name"].o, Value::from("A"));
    assert_eq!(update.diff["display_name"].n, Value::from("B"));
}

#[test]
fn skipped_fields_never_produce_diffs() {
    let old = user(7, "A");
    let mut new = old.clone();
    new.session_note = Some("cached".to_string());

    let update = build_update("users", &old, &new, &Mode::skip(["id"]), &Clause::by_id(7i64));
    assert!(update.diff.is_empty());
    assert!(update.is_empty());
}

#[test]
fn timestamps_from_different_sources_compare_equal() {
    #[derive(Debug, Clone, PartialEq, Record)]
    struct Event {
        id: i64,
        at: StorageDatetime,
        score: f64,
    }

    let from_body: StorageDatetime =
        serde_json::from_str("\"2024-03-01T10:00:00.123456789Z\"").unwrap();
    let precise = chrono::DateTime::from_timestamp(1_709_287_200, 123_456_789).unwrap();
    let old = Event {
        id: 1,
        at: from_body,
        score: f64::NAN,
    };
    let new = Event {
        id: 1,
        at: StorageDatetime::from(precise),
        score: f64::NAN,
    };

    let update = build_update("events", &old, &new, &Mode::skip(["id"]), &Clause::by_id(1i64));
    assert!(update.diff.is_empty(), "{:?}", update.diff);
    assert!(update.is_empty());
}

#[test]
fn json_columns_compare_structurally() {
    #[derive(Debug, Clone, PartialEq, Record)]
    struct Settings {
        id: i64,
        prefs: serde_json::Value,
    }

    let old = Settings {
        id: 1,
        prefs: serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap(),
    };
    let new = Settings {
        id: 1,
        prefs: serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap(),
    };

    let update = build_update("settings", &old, &new, &Mode::skip(["id"]), &Clause::by_id(1i64));
    assert!(update.diff.is_empty());
}
