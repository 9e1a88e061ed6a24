use std::collections::HashMap;

use super::{ConnId, HubError};

/// Who is online under which name. At most one connection per identity.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    bound: HashMap<String, ConnId>,
}

impl IdentityRegistry {
    /// Binding the same connection twice is accepted silently (reconnect races).
    pub fn bind(&mut self, identity: &str, conn: ConnId) -> Result<(), HubError> {
        match self.bound.get(identity) {
            Some(owner) if *owner != conn => Err(HubError::IdentityConflict(identity.to_owned())),
            _ => {
                self.bound.insert(identity.to_owned(), conn);
                Ok(())
            }
        }
    }

    /// Only releases the name if `conn` still holds it.
    pub fn unbind(&mut self, identity: &str, conn: ConnId) -> bool {
        if self.bound.get(identity) == Some(&conn) {
            self.bound.remove(identity);
            true
        } else {
            false
        }
    }

    pub fn lookup(&self, identity: &str) -> Option<ConnId> {
        self.bound.get(identity).copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn second_connection_is_rejected() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let mut reg = IdentityRegistry::default();

        reg.bind("alice", a).unwrap();
        let err = reg.bind("alice", b).unwrap_err();

        assert!(matches!(err, HubError::IdentityConflict(name) if name == "alice"));
        assert_eq!(reg.lookup("alice"), Some(a));
    }

    #[test]
    fn rebinding_same_connection_is_fine() {
        let a = Uuid::now_v7();
        let mut reg = IdentityRegistry::default();

        reg.bind("alice", a).unwrap();
        reg.bind("alice", a).unwrap();
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unbind_is_idempotent_and_owner_checked() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let mut reg = IdentityRegistry::default();
        reg.bind("alice", a).unwrap();

        assert!(!reg.unbind("alice", b));
        assert_eq!(reg.lookup("alice"), Some(a));

        assert!(reg.unbind("alice", a));
        assert!(!reg.unbind("alice", a));
        assert!(reg.is_empty());

        reg.bind("alice", b).unwrap();
        assert_eq!(reg.lookup("alice"), Some(b));
    }
}
