use std::collections::{BTreeSet, HashMap};

/// Symmetric friendship. There is no unfriend.
#[derive(Debug, Default)]
pub struct FriendGraph {
    edges: HashMap<String, BTreeSet<String>>,
}

impl FriendGraph {
    /// Adds both directions at once. Returns false if they were already friends.
    pub fn befriend(&mut self, a: &str, b: &str) -> bool {
        let added = self.edges.entry(a.to_owned()).or_default().insert(b.to_owned());
        self.edges.entry(b.to_owned()).or_default().insert(a.to_owned());
        added
    }

    pub fn friends_of(&self, identity: &str) -> Vec<String> {
        self.edges
            .get(identity)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn are_friends(&self, a: &str, b: &str) -> bool {
        self.edges.get(a).is_some_and(|set| set.contains(b))
    }
}
