use axum::{Json, http::StatusCode, response::IntoResponse};
use sea_orm::DbErr;
use serde::Serialize;

pub use server::{run, run_with_listener, spawn_with_listener};

mod history;
mod server;
mod statistics;
mod user;

pub mod types {
    pub mod history {
        pub use api_types::history::{
            HistoryCreated, HistoryDeleteQuery, HistoryListQuery, HistoryListResponse,
            HistoryPush, HistoryView, Pagination, SyncRequest, SyncResponse,
        };
    }

    pub mod stats {
        pub use api_types::stats::{CalculatorStats, OperationCount};
    }

    pub mod user {
        pub use api_types::user::{ForcedNumberUpdate, Profile};
    }
}

pub enum ServerError {
    NotFound(String),
    Generic(String),
    Database(DbErr),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::NotFound(err) => (StatusCode::NOT_FOUND, err),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::Database(db_err) => {
                tracing::error!("database error: {db_err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<DbErr> for ServerError {
    fn from(value: DbErr) -> Self {
        Self::Database(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let res = ServerError::NotFound("x".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_maps_to_500_without_leaking_details() {
        let res = ServerError::from(DbErr::Custom("secret".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
