//! Accumulated places, unique by id, in discovery order.

use roadlore_context::Place;
use std::collections::HashSet;

/// Ordered set of places keyed by `Place::id`.
///
/// The first occurrence of an id wins; later duplicates are dropped without
/// touching the stored data. Nothing is ever removed.
#[derive(Debug, Clone, Default)]
pub struct PlaceSet {
    places: Vec<Place>,
    ids: HashSet<String>,
}

impl PlaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `place` unless its id is already known. Returns true if added.
    pub fn insert(&mut self, place: Place) -> bool {
        if self.ids.contains(&place.id) {
            return false;
        }
        self.ids.insert(place.id.clone());
        self.places.push(place);
        true
    }

    /// Merge a batch, returning the places that were actually new.
    pub fn merge(&mut self, places: impl IntoIterator<Item = Place>) -> Vec<Place> {
        let mut added = Vec::new();
        for place in places {
            if self.insert(place.clone()) {
                added.push(place);
            }
        }
        added
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&Place> {
        if !self.contains(id) {
            return None;
        }
        self.places.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Place> {
        self.places.iter()
    }

    pub fn as_slice(&self) -> &[Place] {
        &self.places
    }
}

impl<'a> IntoIterator for &'a PlaceSet {
    type Item = &'a Place;
    type IntoIter = std::slice::Iter<'a, Place>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadlore_context::Position;

    fn place(id: &str, title: &str) -> Place {
        Place::new(id, title, Position::new(-23.55, -46.63))
    }

    #[test]
    fn test_merge_keeps_first_occurrence() {
        let mut set = PlaceSet::new();
        set.merge(vec![place("p1", "Praça da Sé")]);

        let added = set.merge(vec![place("p1", "Renamed"), place("p2", "Pateo do Collegio")]);

        assert_eq!(added.len(), 1);
        assert_eq!(added[0].id, "p2");
        let ids: Vec<_> = set.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(set.get("p1").unwrap().title, "Praça da Sé");
    }

    #[test]
    fn test_duplicates_within_one_batch() {
        let mut set = PlaceSet::new();
        let added = set.merge(vec![place("a", "first"), place("a", "second"), place("b", "b")]);

        assert_eq!(added.len(), 2);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("a").unwrap().title, "first");
    }

    #[test]
    fn test_size_never_decreases() {
        let mut set = PlaceSet::new();
        let batches = [
            vec!["a", "b"],
            vec![],
            vec!["b", "a"],
            vec!["c", "a", "d"],
            vec!["d"],
        ];

        let mut previous = 0;
        for batch in batches {
            set.merge(batch.into_iter().map(|id| place(id, id)));
            assert!(set.len() >= previous);
            previous = set.len();
        }

        let mut ids: Vec<_> = set.iter().map(|p| p.id.clone()).collect();
        let total = ids.len();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(total, 4);
    }

    #[test]
    fn test_unknown_id() {
        let set = PlaceSet::new();
        assert!(set.get("nope").is_none());
        assert!(!set.contains("nope"));
        assert!(set.is_empty());
    }
}
