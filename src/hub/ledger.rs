use std::collections::{HashMap, HashSet, VecDeque};

use crate::protocol::MessageId;

use super::HubError;

#[derive(Debug)]
pub struct LedgerEntry {
    acked: HashSet<String>,
    pub fully_seen: bool,
}

impl LedgerEntry {
    #[cfg(test)]
    pub fn acknowledged_by(&self, identity: &str) -> bool {
        self.acked.contains(identity)
    }

    pub fn ack_count(&self) -> usize {
        self.acked.len()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Ack {
    Recorded,
    /// The ack that made the message fully seen. Happens at most once per message.
    FullySeen,
    AlreadyAcknowledged,
}

type Key = (String, MessageId);

/// Per-message seen tracking, keyed by (room, id). Oldest entries fall off past `capacity`.
#[derive(Debug)]
pub struct MessageLedger {
    entries: HashMap<Key, LedgerEntry>,
    order: VecDeque<Key>,
    capacity: usize,
}

impl MessageLedger {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn contains(&self, room: &str, id: &MessageId) -> bool {
        self.entries.contains_key(&(room.to_owned(), id.clone()))
    }

    /// Stores a fresh entry whose only acknowledger is the author.
    /// Callers must make sure the id is not already taken in this room.
    pub fn record(&mut self, room: &str, id: MessageId, author: &str) {
        let key = (room.to_owned(), id);
        let entry = LedgerEntry {
            acked: HashSet::from([author.to_owned()]),
            fully_seen: false,
        };
        if self.entries.insert(key.clone(), entry).is_none() {
            self.order.push_back(key);
        }

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    /// `online` is the room's member count right now.
    pub fn acknowledge(
        &mut self,
        room: &str,
        id: &MessageId,
        identity: &str,
        online: usize,
    ) -> Result<Ack, HubError> {
        let entry = self
            .entries
            .get_mut(&(room.to_owned(), id.clone()))
            .ok_or_else(|| HubError::UnknownMessage(id.clone()))?;

        if !entry.acked.insert(identity.to_owned()) {
            return Ok(Ack::AlreadyAcknowledged);
        }

        if !entry.fully_seen && entry.acked.len() == online {
            entry.fully_seen = true;
            return Ok(Ack::FullySeen);
        }
        Ok(Ack::Recorded)
    }

    pub fn get(&self, room: &str, id: &MessageId) -> Option<&LedgerEntry> {
        self.entries.get(&(room.to_owned(), id.clone()))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
