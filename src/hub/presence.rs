use std::collections::HashMap;

/// Online identities per room, in the order they arrived.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    rooms: HashMap<String, Vec<String>>,
}

impl PresenceTracker {
    /// Returns true if the identity wasn't already online here.
    pub fn join(&mut self, room: &str, identity: &str) -> bool {
        let members = self.rooms.entry(room.to_owned()).or_default();
        if members.iter().any(|m| m == identity) {
            return false;
        }
        members.push(identity.to_owned());
        true
    }

    pub fn leave(&mut self, room: &str, identity: &str) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let before = members.len();
        members.retain(|m| m != identity);
        before != members.len()
    }

    /// Drops the whole member set, handing back who was in it.
    pub fn evict(&mut self, room: &str) -> Vec<String> {
        self.rooms.remove(room).unwrap_or_default()
    }

    pub fn members(&self, room: &str) -> Vec<String> {
        self.rooms.get(room).cloned().unwrap_or_default()
    }

    pub fn online_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, Vec::len)
    }
}
