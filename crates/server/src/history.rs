//! Calculation history API endpoints.

use api_types::history::{
    HistoryCreated, HistoryDeleteQuery, HistoryListQuery, HistoryListResponse, HistoryPush,
    HistoryView, Pagination, SyncRequest, SyncResponse,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{FixedOffset, Utc};
use engine::OperationType;
use sea_orm::{
    ActiveValue, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    entity::prelude::*,
};

use crate::{ServerError, server::ServerState, user};

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 100;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "calculator_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    pub expression: String,
    pub actual_result: f64,
    pub forced_result: Option<f64>,
    pub result: f64,
    pub was_forced: bool,
    pub operation_type: String,
    pub device_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Validates and converts one pushed calculation into an insertable row.
///
/// Every entry is stored regardless of forced status; discarding unforced
/// calculations would silently lose legitimate history.
fn active_from_push(username: &str, push: HistoryPush) -> Result<ActiveModel, ServerError> {
    let operation_type = OperationType::try_from(push.operation_type.as_str())
        .map_err(ServerError::Generic)?;

    let result = if push.was_forced {
        push.forced_result.unwrap_or(push.actual_result)
    } else {
        push.actual_result
    };

    Ok(ActiveModel {
        username: ActiveValue::Set(username.to_string()),
        expression: ActiveValue::Set(push.expression),
        actual_result: ActiveValue::Set(push.actual_result),
        forced_result: ActiveValue::Set(push.forced_result),
        result: ActiveValue::Set(result),
        was_forced: ActiveValue::Set(push.was_forced),
        operation_type: ActiveValue::Set(operation_type.as_str().to_string()),
        device_id: ActiveValue::Set(push.device_id),
        created_at: ActiveValue::Set(Utc::now()),
        ..Default::default()
    })
}

fn view(model: Model) -> Result<HistoryView, ServerError> {
    let utc = FixedOffset::east_opt(0)
        .ok_or_else(|| ServerError::Generic("invalid UTC offset".to_string()))?;
    Ok(HistoryView {
        id: model.id,
        expression: model.expression,
        actual_result: model.actual_result,
        forced_result: model.forced_result,
        result: model.result,
        was_forced: model.was_forced,
        operation_type: model.operation_type,
        device_id: model.device_id,
        created_at: model.created_at.with_timezone(&utc),
    })
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<HistoryPush>,
) -> Result<(StatusCode, Json<HistoryCreated>), ServerError> {
    let active = active_from_push(&user.username, payload)?;
    let inserted = active.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(HistoryCreated { id: inserted.id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(payload): Query<HistoryListQuery>,
) -> Result<Json<HistoryListResponse>, ServerError> {
    let page = payload.page.unwrap_or(1).max(1);
    let limit = payload
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let mut query = Entity::find()
        .filter(Column::Username.eq(user.username.as_str()))
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id);

    if payload.forced_only.unwrap_or(false) {
        query = query.filter(Column::WasForced.eq(true));
    }

    let paginator = query.paginate(&state.db, limit);
    let total = paginator.num_items().await?;
    let pages = total.div_ceil(limit).max(1);
    let models = paginator.fetch_page(page - 1).await?;

    let history = models
        .into_iter()
        .map(view)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(HistoryListResponse {
        history,
        pagination: Pagination {
            page,
            limit,
            total,
            pages,
        },
    }))
}

/// Deletes all history for the user, optionally scoped to one device.
pub async fn delete_all(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(payload): Query<HistoryDeleteQuery>,
) -> Result<StatusCode, ServerError> {
    let mut delete = Entity::delete_many().filter(Column::Username.eq(user.username.as_str()));
    if let Some(device_id) = payload.device_id {
        delete = delete.filter(Column::DeviceId.eq(device_id));
    }
    delete.exec(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Batch upsert of locally accumulated calculations.
///
/// Best-effort per item: a record that fails validation or insertion is
/// skipped and the batch still succeeds, so clients can mark everything
/// submitted as synced and move on.
pub async fn sync_batch(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, ServerError> {
    let received = payload.calculations.len();
    let mut stored = 0;

    for push in payload.calculations {
        let active = match active_from_push(&user.username, push) {
            Ok(active) => active,
            Err(_) => {
                tracing::warn!("skipping sync record with unknown operation type");
                continue;
            }
        };
        match active.insert(&state.db).await {
            Ok(_) => stored += 1,
            Err(err) => tracing::warn!("failed to store sync record: {err}"),
        }
    }

    Ok(Json(SyncResponse { received, stored }))
}
