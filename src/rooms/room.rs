use axum::{debug_handler, extract::{Path, State}, Json};

use crate::{hub::RoomView, AppError, AppResult, Hub};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list(State(hub): State<Hub>) -> Json<Vec<String>> {
    Json(hub.rooms().await)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room(
    State(hub): State<Hub>,
    Path(name): Path<String>,
) -> AppResult<Json<RoomView>> {
    let Some(view) = hub.room(&name).await else {
        return Err(AppError::not_found(format!("room {name}")));
    };

    Ok(Json(view))
}
