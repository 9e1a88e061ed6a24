//! Fire-and-forget broadcasts. Nothing here touches stored state.

use serde_json::Value;

use crate::protocol::ServerEvent;

use super::{ConnId, State};

impl State {
    /// Typing indicators go to everyone in the room except the typist.
    pub(super) fn typing(&self, conn: ConnId, room: &str, event: ServerEvent) {
        self.broadcast_room(room, event, Some(conn));
    }

    pub(super) fn canvas(&self, room: &str, data: Value) {
        self.broadcast_room(room, ServerEvent::CanvasUpdate { data }, None);
    }

    // Placeholder assistant: answers only the asker.
    pub(super) fn ai_query(&self, conn: ConnId, room: &str, query: &str) {
        let response = format!("AI response to \"{query}\" in {room}: This is a dummy response.");
        self.send(conn, ServerEvent::AiResponse(response));
    }
}
