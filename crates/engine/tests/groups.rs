use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Engine, EngineError};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for (username, email) in [
        ("alice", "alice@example.com"),
        ("bob", "bob@example.com"),
        ("carol", "carol@example.com"),
    ] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password, email) VALUES (?, ?, ?)",
            vec![username.into(), "password".into(), email.into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

#[tokio::test]
async fn creator_becomes_admin() {
    let (engine, _db) = engine_with_db().await;
    let group_id = engine.new_group("Trip", "alice").await.unwrap();

    let members = engine
        .list_group_members(&group_id, "alice")
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, "alice");
    assert_eq!(members[0].role, "admin");
}

#[tokio::test]
async fn groups_are_listed_per_membership() {
    let (engine, _db) = engine_with_db().await;
    let trip = engine.new_group("Trip", "alice").await.unwrap();
    engine.new_group("Solo", "alice").await.unwrap();
    engine
        .add_group_member(&trip, "bob", "member", "alice")
        .await
        .unwrap();

    let bobs = engine.list_groups("bob").await.unwrap();
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].name, "Trip");

    let alices = engine.list_groups("alice").await.unwrap();
    assert_eq!(alices.len(), 2);
}

#[tokio::test]
async fn group_names_are_trimmed_and_required() {
    let (engine, _db) = engine_with_db().await;

    let group_id = engine.new_group("  Trip  ", "alice").await.unwrap();
    let groups = engine.list_groups("alice").await.unwrap();
    assert_eq!(groups[0].name, "Trip");
    assert_eq!(groups[0].id.to_string(), group_id);

    let err = engine.new_group("   ", "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn only_admins_add_members() {
    let (engine, _db) = engine_with_db().await;
    let group_id = engine.new_group("Trip", "alice").await.unwrap();
    engine
        .add_group_member(&group_id, "bob", "member", "alice")
        .await
        .unwrap();

    let err = engine
        .add_group_member(&group_id, "carol", "member", "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn unknown_roles_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let group_id = engine.new_group("Trip", "alice").await.unwrap();

    let err = engine
        .add_group_member(&group_id, "bob", "owner", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRole(_)));
}

#[tokio::test]
async fn role_updates_keep_the_original_join_date() {
    let (engine, _db) = engine_with_db().await;
    let group_id = engine.new_group("Trip", "alice").await.unwrap();
    engine
        .add_group_member(&group_id, "bob", "member", "alice")
        .await
        .unwrap();

    let before = engine
        .list_group_members(&group_id, "alice")
        .await
        .unwrap();
    let joined_at = before
        .iter()
        .find(|m| m.user_id == "bob")
        .unwrap()
        .joined_at;

    engine
        .add_group_member(&group_id, "bob", "admin", "alice")
        .await
        .unwrap();

    let after = engine
        .list_group_members(&group_id, "alice")
        .await
        .unwrap();
    assert_eq!(after.len(), 2);
    let bob = after.iter().find(|m| m.user_id == "bob").unwrap();
    assert_eq!(bob.role, "admin");
    assert_eq!(bob.joined_at, joined_at);
}

#[tokio::test]
async fn the_creator_is_untouchable() {
    let (engine, _db) = engine_with_db().await;
    let group_id = engine.new_group("Trip", "alice").await.unwrap();
    engine
        .add_group_member(&group_id, "bob", "admin", "alice")
        .await
        .unwrap();

    let err = engine
        .add_group_member(&group_id, "alice", "member", "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .remove_group_member(&group_id, "alice", "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn members_may_leave_but_not_kick() {
    let (engine, _db) = engine_with_db().await;
    let group_id = engine.new_group("Trip", "alice").await.unwrap();
    engine
        .add_group_member(&group_id, "bob", "member", "alice")
        .await
        .unwrap();
    engine
        .add_group_member(&group_id, "carol", "member", "alice")
        .await
        .unwrap();

    let err = engine
        .remove_group_member(&group_id, "bob", "carol")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine
        .remove_group_member(&group_id, "carol", "carol")
        .await
        .unwrap();
    let members = engine
        .list_group_members(&group_id, "alice")
        .await
        .unwrap();
    assert!(!members.iter().any(|m| m.user_id == "carol"));
}

#[tokio::test]
async fn expenses_validate_amounts_and_membership() {
    let (engine, _db) = engine_with_db().await;
    let group_id = engine.new_group("Trip", "alice").await.unwrap();
    engine
        .add_group_member(&group_id, "bob", "member", "alice")
        .await
        .unwrap();

    let err = engine
        .new_expense(&group_id, "alice", 0, None, &[("bob".to_string(), 0)], "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .new_expense(&group_id, "alice", 100, None, &[], "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .new_expense(
            &group_id,
            "alice",
            100,
            None,
            &[("bob".to_string(), 60), ("alice".to_string(), 50)],
            "alice",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .new_expense(
            &group_id,
            "carol",
            100,
            None,
            &[("bob".to_string(), 100)],
            "alice",
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotAMember("carol".to_string()));

    let err = engine
        .new_expense(
            &group_id,
            "alice",
            100,
            None,
            &[("carol".to_string(), 100)],
            "alice",
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotAMember("carol".to_string()));
}

#[tokio::test]
async fn expenses_list_with_their_splits() {
    let (engine, _db) = engine_with_db().await;
    let group_id = engine.new_group("Trip", "alice").await.unwrap();
    engine
        .add_group_member(&group_id, "bob", "member", "alice")
        .await
        .unwrap();

    let expense_id = engine
        .new_expense(
            &group_id,
            "alice",
            300,
            Some("  dinner  "),
            &[("bob".to_string(), 200), ("alice".to_string(), 100)],
            "alice",
        )
        .await
        .unwrap();

    let expenses = engine
        .list_group_expenses(&group_id, "bob")
        .await
        .unwrap();
    assert_eq!(expenses.len(), 1);
    let expense = &expenses[0];
    assert_eq!(expense.id, expense_id);
    assert_eq!(expense.amount_minor, 300);
    assert_eq!(expense.description, Some("dinner".to_string()));
    assert_eq!(expense.splits.len(), 2);
    assert!(expense.splits.iter().all(|s| !s.is_settled));
    let total: i64 = expense.splits.iter().map(|s| s.amount_minor).sum();
    assert_eq!(total, expense.amount_minor);
}
