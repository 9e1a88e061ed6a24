mod room;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::relay_ws))
        .route("/rooms", get(room::list))
        .route("/rooms/{name}", get(room::room))
}
