//! Session Index
//!
//! Secondary index from session identifier to the ordered block positions
//! recorded under that session.

use std::collections::HashMap;

/// Append-only mapping of session id to block positions.
///
/// Entries are created on first use and only ever grow; positions within an
/// entry stay in append order. Sessions are remembered in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionIndex {
    positions: HashMap<String, Vec<usize>>,
    order: Vec<String>,
}

impl SessionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `position` under `session_id`
    pub fn record(&mut self, session_id: &str, position: usize) {
        match self.positions.get_mut(session_id) {
            Some(positions) => positions.push(position),
            None => {
                self.order.push(session_id.to_string());
                self.positions.insert(session_id.to_string(), vec![position]);
            }
        }
    }

    /// Install a whole entry as-is, replacing any previous one
    pub(crate) fn install(&mut self, session_id: String, positions: Vec<usize>) {
        if !self.positions.contains_key(&session_id) {
            self.order.push(session_id.clone());
        }
        self.positions.insert(session_id, positions);
    }

    pub fn positions(&self, session_id: &str) -> &[usize] {
        self.positions
            .get(session_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.positions.contains_key(session_id)
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries as `(session_id, positions)` pairs in first-seen order
    pub fn entries(&self) -> Vec<(String, Vec<usize>)> {
        self.order
            .iter()
            .map(|session_id| (session_id.clone(), self.positions(session_id).to_vec()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_lookup() {
        let mut index = SessionIndex::new();
        index.record("SYSTEM", 0);
        index.record("A", 1);
        index.record("B", 2);
        index.record("A", 3);

        assert_eq!(index.positions("A"), &[1, 3]);
        assert_eq!(index.positions("B"), &[2]);
        assert_eq!(index.positions("missing"), &[] as &[usize]);
        assert_eq!(index.len(), 3);
        assert!(index.contains("SYSTEM"));
    }

    #[test]
    fn test_first_seen_order() {
        let mut index = SessionIndex::new();
        index.record("zeta", 0);
        index.record("alpha", 1);
        index.record("zeta", 2);

        assert_eq!(index.session_ids(), vec!["zeta".to_string(), "alpha".to_string()]);
        assert_eq!(
            index.entries(),
            vec![
                ("zeta".to_string(), vec![0, 2]),
                ("alpha".to_string(), vec![1]),
            ]
        );
    }

    #[test]
    fn test_install_replaces_entry() {
        let mut index = SessionIndex::new();
        index.install("S1".to_string(), vec![1, 4]);
        index.install("S1".to_string(), vec![1, 4, 6]);

        assert_eq!(index.positions("S1"), &[1, 4, 6]);
        assert_eq!(index.len(), 1);
    }
}
