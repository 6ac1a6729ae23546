/// Item endpoints
///
/// Every handler requires a [`Principal`]; anonymous requests get 401 before
/// the body is read. Users only ever see and delete their own items.
///
/// # Endpoints
///
/// - `GET /api/items` - List the caller's items, newest first
/// - `POST /api/items` - Create an item
/// - `DELETE /api/items/:id` - Delete one of the caller's items

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::auth::MessageResponse,
};
use authgate_shared::{
    auth::middleware::Principal,
    models::item::{Item, NewItem},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Create item request
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
}

/// Item as returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            name: item.name,
        }
    }
}

/// List the caller's items
pub async fn list_items(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<Json<Vec<ItemResponse>>> {
    let items = state.items.list_items(principal.user_id).await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// Create an item
///
/// # Errors
///
/// - `400 Bad Request`: Name empty after trimming, or longer than 100 characters
/// - `401 Unauthorized`: No valid bearer token
pub async fn create_item(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<CreateItemRequest>,
) -> ApiResult<(StatusCode, Json<ItemResponse>)> {
    let new_item =
        NewItem::new(principal.user_id, &req.name).map_err(|e| ApiError::invalid_field("name", e))?;

    let item = state.items.create_item(new_item).await?;
    info!(user_id = %principal.user_id, item_id = %item.id, "Item created");

    Ok((StatusCode::CREATED, Json(item.into())))
}

/// Delete one of the caller's items
///
/// # Errors
///
/// - `401 Unauthorized`: No valid bearer token
/// - `404 Not Found`: No such item, or it belongs to someone else
pub async fn delete_item(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let not_found = || ApiError::NotFound("Item not found".to_string());

    let item_id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    if !state.items.delete_item(principal.user_id, item_id).await? {
        return Err(not_found());
    }

    info!(user_id = %principal.user_id, item_id = %item_id, "Item deleted");
    Ok(Json(MessageResponse {
        message: "Deleted".to_string(),
    }))
}
