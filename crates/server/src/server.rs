use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::{history, statistics, user};

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
}

/// Bearer-token authentication.
///
/// Tokens are provisioned rows in the users table; the OTP issuance flow is
/// an external collaborator. The matched user is injected as a request
/// extension for the handlers.
async fn auth(
    auth_header: TypedHeader<Authorization<Bearer>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = auth_header.token();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Token.eq(token))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/calculator/history",
            post(history::create)
                .get(history::list)
                .delete(history::delete_all),
        )
        .route("/calculator/sync", post(history::sync_batch))
        .route("/calculator/stats", get(statistics::get_stats))
        .route("/auth/forced-number", put(user::update_forced_number))
        .route("/auth/me", get(user::me))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { db };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(db, listener).await {
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
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::{ActiveValue, Database};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const TOKEN: &str = "test-token";

    async fn test_router() -> Router {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();

        user::Entity::insert(user::ActiveModel {
            username: ActiveValue::Set("alice".to_string()),
            token: ActiveValue::Set(TOKEN.to_string()),
            forced_number: ActiveValue::Set(None),
            second_force_number: ActiveValue::Set(None),
            second_force_trigger_number: ActiveValue::Set(None),
        })
        .exec(&db)
        .await
        .unwrap();

        router(ServerState { db })
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        builder.body(body).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn push(expression: &str, was_forced: bool, device_id: &str) -> Value {
        json!({
            "expression": expression,
            "actualResult": 8.0,
            "forcedResult": if was_forced { Value::from(42.0) } else { Value::Null },
            "wasForced": was_forced,
            "operationType": "addition",
            "deviceId": device_id,
        })
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let router = test_router().await;
        let req = HttpRequest::builder()
            .method("GET")
            .uri("/auth/me")
            .body(Body::empty())
            .unwrap();
        let res = router.oneshot(req).await.unwrap();
        assert!(res.status().is_client_error());
    }

    #[tokio::test]
    async fn wrong_token_is_unauthorized() {
        let router = test_router().await;
        let req = HttpRequest::builder()
            .method("GET")
            .uri("/auth/me")
            .header(header::AUTHORIZATION, "Bearer nope")
            .body(Body::empty())
            .unwrap();
        let res = router.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn push_then_list_roundtrip() {
        let router = test_router().await;

        for (expr, forced) in [("5 + 3", false), ("2 + 2", true)] {
            let res = router
                .clone()
                .oneshot(request(
                    "POST",
                    "/calculator/history",
                    Some(push(expr, forced, "device-1")),
                ))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let res = router
            .clone()
            .oneshot(request("GET", "/calculator/history", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["pagination"]["total"], 2);
        assert_eq!(body["history"].as_array().unwrap().len(), 2);

        let res = router
            .oneshot(request("GET", "/calculator/history?forcedOnly=true", None))
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["history"][0]["expression"], "2 + 2");
        assert_eq!(body["history"][0]["result"], 42.0);
    }

    #[tokio::test]
    async fn unforced_entries_are_stored_too() {
        let router = test_router().await;

        let res = router
            .clone()
            .oneshot(request(
                "POST",
                "/calculator/history",
                Some(push("5 + 3", false, "device-1")),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = router
            .oneshot(request("GET", "/calculator/history", None))
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["history"][0]["wasForced"], false);
        assert_eq!(body["history"][0]["result"], 8.0);
    }

    #[tokio::test]
    async fn unknown_operation_type_is_rejected() {
        let router = test_router().await;

        let mut payload = push("5 + 3", false, "device-1");
        payload["operationType"] = Value::from("teleportation");
        let res = router
            .oneshot(request("POST", "/calculator/history", Some(payload)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sync_is_best_effort_per_item() {
        let router = test_router().await;

        let mut bad = push("1 + 1", false, "device-1");
        bad["operationType"] = Value::from("teleportation");
        let payload = json!({
            "calculations": [
                push("5 + 3", true, "device-1"),
                bad,
                push("2 - 1", false, "device-1"),
            ]
        });

        let res = router
            .clone()
            .oneshot(request("POST", "/calculator/sync", Some(payload)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["received"], 3);
        assert_eq!(body["stored"], 2);
    }

    #[tokio::test]
    async fn delete_can_be_scoped_to_a_device() {
        let router = test_router().await;

        for device in ["device-1", "device-2"] {
            router
                .clone()
                .oneshot(request(
                    "POST",
                    "/calculator/history",
                    Some(push("5 + 3", false, device)),
                ))
                .await
                .unwrap();
        }

        let res = router
            .clone()
            .oneshot(request(
                "DELETE",
                "/calculator/history?deviceId=device-1",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = router
            .oneshot(request("GET", "/calculator/history", None))
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["history"][0]["deviceId"], "device-2");
    }

    #[tokio::test]
    async fn stats_aggregate_totals_and_forced_counts() {
        let router = test_router().await;

        let payload = json!({
            "calculations": [
                push("5 + 3", true, "device-1"),
                push("2 + 2", false, "device-1"),
            ]
        });
        router
            .clone()
            .oneshot(request("POST", "/calculator/sync", Some(payload)))
            .await
            .unwrap();

        let res = router
            .oneshot(request("GET", "/calculator/stats", None))
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["forced"], 1);
        assert_eq!(body["byOperation"][0]["operationType"], "addition");
        assert_eq!(body["byOperation"][0]["count"], 2);
    }

    #[tokio::test]
    async fn forced_number_update_touches_only_provided_fields() {
        let router = test_router().await;

        let res = router
            .clone()
            .oneshot(request(
                "PUT",
                "/auth/forced-number",
                Some(json!({"forcedNumber": 42.0})),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = router
            .clone()
            .oneshot(request(
                "PUT",
                "/auth/forced-number",
                Some(json!({"secondForceNumber": 99.0, "secondForceTriggerNumber": 9.0})),
            ))
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["forcedNumber"], 42.0);
        assert_eq!(body["secondForceNumber"], 99.0);

        let res = router
            .oneshot(request("GET", "/auth/me", None))
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["username"], "alice");
        assert_eq!(body["forcedNumber"], 42.0);
        assert_eq!(body["secondForceTriggerNumber"], 9.0);
    }

    #[tokio::test]
    async fn clearing_a_forced_number_uses_explicit_null() {
        let router = test_router().await;

        router
            .clone()
            .oneshot(request(
                "PUT",
                "/auth/forced-number",
                Some(json!({"forcedNumber": 42.0})),
            ))
            .await
            .unwrap();

        let res = router
            .oneshot(request(
                "PUT",
                "/auth/forced-number",
                Some(json!({"forcedNumber": null})),
            ))
            .await
            .unwrap();
        let body = json_body(res).await;
        assert_eq!(body["forcedNumber"], Value::Null);
    }
}
