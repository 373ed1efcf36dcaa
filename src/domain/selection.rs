use std::collections::HashSet;

use crate::domain::email::{EmailId, EmailRecord};

/// Ids the user ticked in the current result list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: HashSet<EmailId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns whether the id is selected afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    /// Empties the set when every result is already selected, selects every
    /// result otherwise.
    pub fn toggle_all(&mut self, results: &[EmailRecord]) {
        if results.iter().all(|r| self.ids.contains(&r.id)) {
            self.ids.clear();
        } else {
            self.ids.extend(results.iter().map(|r| r.id.clone()));
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Selected records, in result order.
    pub fn pick(&self, results: &[EmailRecord]) -> Vec<EmailRecord> {
        results
            .iter()
            .filter(|r| self.ids.contains(&r.id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(ids: &[&str]) -> Vec<EmailRecord> {
        ids.iter()
            .map(|id| serde_json::from_value(serde_json::json!({ "id": id })).unwrap())
            .collect()
    }

    #[test]
    fn toggle_twice_restores_previous_state() {
        let mut s = Selection::new();
        s.toggle("a");
        let before = s.clone();
        assert!(s.toggle("b"));
        assert!(!s.toggle("b"));
        assert_eq!(s, before);
    }

    #[test]
    fn toggle_all_fills_then_empties() {
        let rs = results(&["a", "b", "c"]);
        let mut s = Selection::new();
        s.toggle("b");
        s.toggle_all(&rs);
        assert_eq!(s.len(), 3);
        s.toggle_all(&rs);
        assert!(s.is_empty());
    }

    #[test]
    fn pick_keeps_result_order() {
        let rs = results(&["a", "b", "c"]);
        let mut s = Selection::new();
        s.toggle("c");
        s.toggle("a");
        let ids: Vec<_> = s.pick(&rs).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["a", "c"]);
    }
}
