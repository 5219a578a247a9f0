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

async fn group_of_three(engine: &Engine) -> String {
    let group_id = engine.new_group("Trip", "alice").await.unwrap();
    engine
        .add_group_member(&group_id, "bob", "member", "alice")
        .await
        .unwrap();
    engine
        .add_group_member(&group_id, "carol", "member", "alice")
        .await
        .unwrap();
    group_id
}

#[tokio::test]
async fn empty_group_balances_are_zero() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_of_three(&engine).await;

    for member in ["alice", "bob", "carol"] {
        let net = engine.balance(&group_id, member, "alice").await.unwrap();
        assert_eq!(net, 0);
    }
}

#[tokio::test]
async fn balances_conserve_to_zero() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_of_three(&engine).await;

    engine
        .new_expense(
            &group_id,
            "alice",
            300,
            Some("hotel"),
            &[("bob".to_string(), 200), ("carol".to_string(), 100)],
            "alice",
        )
        .await
        .unwrap();
    engine
        .new_expense(
            &group_id,
            "bob",
            90,
            Some("breakfast"),
            &[
                ("alice".to_string(), 30),
                ("bob".to_string(), 30),
                ("carol".to_string(), 30),
            ],
            "bob",
        )
        .await
        .unwrap();

    let mut total = 0;
    for member in ["alice", "bob", "carol"] {
        total += engine.balance(&group_id, member, "alice").await.unwrap();
    }
    assert_eq!(total, 0);

    // Alice fronted 300 and owes 30 of Bob's expense.
    let alice = engine.balance(&group_id, "alice", "alice").await.unwrap();
    assert_eq!(alice, -270);
    let bob = engine.balance(&group_id, "bob", "alice").await.unwrap();
    assert_eq!(bob, 140);
    let carol = engine.balance(&group_id, "carol", "alice").await.unwrap();
    assert_eq!(carol, 130);
}

#[tokio::test]
async fn paying_for_yourself_nets_to_zero() {
    let (engine, _db) = engine_with_db().await;
    let group_id = group_of_three(&engine).await;

    engine
        .new_expense(
            &group_id,
            "alice",
            100,
            None,
            &[("alice".to_string(), 100)],
            "alice",
        )
        .await
        .unwrap();

    let alice = engine.balance(&group_id, "alice", "alice").await.unwrap();
    assert_eq!(alice, 0);
}

#[tokio::test]
async fn batch_matches_single_group_reads() {
    let (engine, _db) = engine_with_db().await;
    let trip = group_of_three(&engine).await;
    let flat = engine.new_group("Flat", "alice").await.unwrap();
    engine
        .add_group_member(&flat, "bob", "member", "alice")
        .await
        .unwrap();

    engine
        .new_expense(
            &trip,
            "alice",
            300,
            None,
            &[("bob".to_string(), 300)],
            "alice",
        )
        .await
        .unwrap();
    engine
        .new_expense(&flat, "bob", 50, None, &[("alice".to_string(), 50)], "bob")
        .await
        .unwrap();

    let batch = engine
        .balances(&[trip.clone(), flat.clone()], "alice")
        .await
        .unwrap();
    assert_eq!(batch.len(), 2);

    for group_id in [&trip, &flat] {
        let single = engine.balance(group_id, "alice", "alice").await.unwrap();
        assert_eq!(batch[group_id], single);
    }
}

#[tokio::test]
async fn batch_fails_when_any_group_is_not_visible() {
    let (engine, _db) = engine_with_db().await;
    let trip = group_of_three(&engine).await;
    let private = engine.new_group("Private", "carol").await.unwrap();

    let err = engine
        .balances(&[trip, private], "bob")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("group not exists".to_string()));
}

#[tokio::test]
async fn non_members_cannot_read_balances() {
    let (engine, _db) = engine_with_db().await;
    let group_id = engine.new_group("Duo", "alice").await.unwrap();

    let err = engine.balance(&group_id, "alice", "carol").await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("group not exists".to_string()));

    // Same error for a group id that never existed.
    let err = engine
        .balance("no-such-group", "alice", "carol")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("group not exists".to_string()));
}
