use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{balances, expenses, groups, invitations, memberships, settlements, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user = if let Some(user) = user {
        user
    } else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/groups", post(groups::create).get(groups::list))
        .route(
            "/groups/{group_id}/members",
            get(memberships::list_group_members).post(memberships::upsert_group_member),
        )
        .route(
            "/groups/{group_id}/members/{username}",
            axum::routing::delete(memberships::remove_group_member),
        )
        .route(
            "/groups/{group_id}/expenses",
            post(expenses::create).get(expenses::list),
        )
        .route("/groups/{group_id}/balance", get(balances::own_balance))
        .route(
            "/groups/{group_id}/balance/{username}",
            get(balances::member_balance),
        )
        .route("/balances", get(balances::batch))
        .route(
            "/groups/{group_id}/settlements/suggest",
            get(settlements::suggest),
        )
        .route(
            "/groups/{group_id}/settlements",
            post(settlements::create).get(settlements::list),
        )
        .route(
            "/groups/{group_id}/invitations",
            post(invitations::create).get(invitations::list),
        )
        .route(
            "/groups/{group_id}/invitations/{invitation_id}",
            axum::routing::delete(invitations::cancel),
        )
        .route("/invitations/accept", post(invitations::accept))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request as HttpRequest, header};
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::{ConnectionTrait, Database, Statement};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn test_router() -> Router {
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
        let engine = Engine::builder().database(db.clone()).build().await.unwrap();
        router(ServerState {
            engine: Arc::new(engine),
            db,
        })
    }

    fn basic(username: &str) -> String {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:password"));
        format!("Basic {encoded}")
    }

    fn request(method: &str, uri: &str, username: &str, body: Option<Value>) -> HttpRequest<Body> {
        let builder = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, basic(username))
            .header(header::CONTENT_TYPE, "application/json");
        match body {
            Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_credentials_are_rejected() {
        let app = test_router().await;

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("GET")
                    .uri("/groups")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expense_suggest_settle_flow() {
        let app = test_router().await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/groups",
                "alice",
                Some(json!({"name": "Trip"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let group_id = json_body(response).await["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/groups/{group_id}/members"),
                "alice",
                Some(json!({"username": "bob", "role": "member"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // Alice fronts 300 entirely on Bob's behalf.
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/groups/{group_id}/expenses"),
                "alice",
                Some(json!({
                    "amount_minor": 300,
                    "description": "dinner",
                    "splits": [{"user_id": "bob", "amount_minor": 300}],
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/groups/{group_id}/balance"),
                "bob",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["net_minor"], json!(300));

        let response = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/groups/{group_id}/settlements/suggest"),
                "bob",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let suggestions = json_body(response).await;
        assert_eq!(
            suggestions["suggestions"],
            json!([{"from": "bob", "to": "alice", "amount_minor": 300}])
        );

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/groups/{group_id}/settlements"),
                "bob",
                Some(json!({
                    "from_user": "bob",
                    "to_user": "alice",
                    "amount_minor": 300,
                    "note": "paid back",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = json_body(response).await;
        assert_eq!(outcome["settled_minor"], json!(300));
        assert_eq!(outcome["remaining_minor"], json!(0));

        let response = app
            .oneshot(request(
                "GET",
                &format!("/groups/{group_id}/balance"),
                "bob",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["net_minor"], json!(0));
    }

    #[tokio::test]
    async fn outsiders_cannot_see_a_group() {
        let app = test_router().await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/groups",
                "alice",
                Some(json!({"name": "Flat"})),
            ))
            .await
            .unwrap();
        let group_id = json_body(response).await["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(request(
                "GET",
                &format!("/groups/{group_id}/expenses"),
                "carol",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], json!("not_found"));
    }
}
