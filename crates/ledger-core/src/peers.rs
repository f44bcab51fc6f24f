use std::collections::HashSet;

/// Insertion-ordered set of peer addresses. Entries are never removed.
#[derive(Clone, Debug, Default)]
pub struct PeerRegistry {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the address was not known before.
    pub fn add_peer(&mut self, address: impl Into<String>) -> bool {
        let address = address.into();
        if self.seen.contains(&address) {
            return false;
        }
        self.seen.insert(address.clone());
        self.order.push(address);
        true
    }

    pub fn peers(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
