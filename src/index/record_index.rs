use std::collections::HashMap;
use crate::core::types::Value;

/// Id → position lookup for a record table.
///
/// Keys are the canonical string form of the id, so `2` and `"2"`
/// resolve to the same slot.
#[derive(Debug, Clone, Default)]
pub struct RecordIndex {
    positions: HashMap<String, usize>,
}

impl RecordIndex {
    pub fn new() -> Self {
        RecordIndex {
            positions: HashMap::new(),
        }
    }

    pub fn key(id: &Value) -> String {
        id.canonical().into_owned()
    }

    pub fn insert(&mut self, id: &Value, position: usize) {
        self.positions.insert(Self::key(id), position);
    }

    pub fn contains(&self, id: &Value) -> bool {
        self.positions.contains_key(id.canonical().as_ref())
    }

    pub fn position(&self, id: &Value) -> Option<usize> {
        if id.is_null() {
            return None;
        }
        self.positions.get(id.canonical().as_ref()).copied()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_string_ids_share_a_slot() {
        let mut index = RecordIndex::new();
        index.insert(&Value::from(2), 1);

        assert_eq!(index.position(&Value::from("2")), Some(1));
        assert!(index.contains(&Value::from(2)));
        assert_eq!(index.position(&Value::Null), None);
    }

    #[test]
    fn clear_drops_every_entry() {
        let mut index = RecordIndex::new();
        index.insert(&Value::from(1), 0);
        index.insert(&Value::from(2), 1);
        index.clear();

        assert!(index.is_empty());
        assert_eq!(index.position(&Value::from(1)), None);
    }
}
