//! The module contains the user entity and the profile endpoints.
//!
//! Tokens are provisioned out of band (the OTP flow lives in an external
//! service); this server only verifies them.

use api_types::user::{ForcedNumberUpdate, Profile};
use axum::{Extension, Json, extract::State};
use sea_orm::{ActiveValue, entity::prelude::*};

use crate::{ServerError, server::ServerState};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub token: String,
    pub forced_number: Option<f64>,
    pub second_force_number: Option<f64>,
    pub second_force_trigger_number: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn profile(user: Model) -> Profile {
    Profile {
        username: user.username,
        forced_number: user.forced_number,
        second_force_number: user.second_force_number,
        second_force_trigger_number: user.second_force_trigger_number,
    }
}

/// Returns the authenticated user's profile, forcing fields included.
pub async fn me(Extension(user): Extension<Model>) -> Json<Profile> {
    Json(profile(user))
}

/// Partial update of the forcing preferences.
///
/// Fields absent from the payload are left untouched; explicit nulls clear
/// them. A cleared field reads the same as one never set.
pub async fn update_forced_number(
    Extension(user): Extension<Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ForcedNumberUpdate>,
) -> Result<Json<Profile>, ServerError> {
    // An empty payload would produce an UPDATE without a SET clause.
    if payload.forced_number.is_none()
        && payload.second_force_number.is_none()
        && payload.second_force_trigger_number.is_none()
    {
        return Ok(Json(profile(user)));
    }

    let mut active: ActiveModel = user.into();

    if let Some(value) = payload.forced_number {
        active.forced_number = ActiveValue::Set(value);
    }
    if let Some(value) = payload.second_force_number {
        active.second_force_number = ActiveValue::Set(value);
    }
    if let Some(value) = payload.second_force_trigger_number {
        active.second_force_trigger_number = ActiveValue::Set(value);
    }

    let updated = active.update(&state.db).await?;
    Ok(Json(profile(updated)))
}
