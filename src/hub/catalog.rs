/// Every room name the relay has heard of, in creation order. Never pruned.
#[derive(Debug, Default)]
pub struct RoomCatalog {
    names: Vec<String>,
}

impl RoomCatalog {
    pub fn seeded<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::default();
        for name in names {
            catalog.ensure(&name.into());
        }
        catalog
    }

    /// Returns true if the name was new.
    pub fn ensure(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.names.push(name.to_owned());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn list(&self) -> Vec<String> {
        self.names.clone()
    }
}
