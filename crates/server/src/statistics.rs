//! Statistics API endpoints

use api_types::stats::{CalculatorStats, OperationCount};
use axum::{Extension, Json, extract::State};
use engine::OperationType;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use crate::{ServerError, history, server::ServerState, user};

/// Aggregate counts over the authenticated user's history.
pub async fn get_stats(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<CalculatorStats>, ServerError> {
    let base = history::Entity::find()
        .filter(history::Column::Username.eq(user.username.as_str()));

    let total = base.clone().count(&state.db).await?;
    let forced = base
        .clone()
        .filter(history::Column::WasForced.eq(true))
        .count(&state.db)
        .await?;

    let mut by_operation = Vec::with_capacity(OperationType::ALL.len());
    for operation in OperationType::ALL {
        let count = base
            .clone()
            .filter(history::Column::OperationType.eq(operation.as_str()))
            .count(&state.db)
            .await?;
        if count > 0 {
            by_operation.push(OperationCount {
                operation_type: operation.as_str().to_string(),
                count,
            });
        }
    }

    Ok(Json(CalculatorStats {
        total,
        forced,
        by_operation,
    }))
}
