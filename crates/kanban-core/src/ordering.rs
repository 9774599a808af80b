//! Ordered collection model.
//!
//! Siblings that share a parent scope (cards in a list, lists in a board)
//! carry an integer `order`. After every mutation the orders observed by a
//! full re-fetch must be exactly `0..N-1` in visual order. Renumbering the
//! whole sequence is the only way this crate rewrites orders.

use crate::traits::Positioned;
use uuid::Uuid;

/// Relabel every entity with its index in `sequence`.
///
/// Returns `(id, new_order)` pairs in sequence order. Pure: the entities
/// are not modified, callers decide how to apply the mapping.
pub fn renumber<T: Positioned>(sequence: &[T]) -> Vec<(Uuid, i32)> {
    sequence
        .iter()
        .enumerate()
        .map(|(index, entity)| (entity.id(), index as i32))
        .collect()
}

/// Write `order = index` into every entity of `sequence`.
///
/// Returns how many entities actually changed value.
pub fn apply_renumber<T: Positioned>(sequence: &mut [T]) -> usize {
    let mut changed = 0;
    for (index, entity) in sequence.iter_mut().enumerate() {
        let order = index as i32;
        if entity.order() != order {
            entity.set_order(order);
            changed += 1;
        }
    }
    changed
}

/// Stable ascending sort by `order`, the way every consumer must sort a
/// scope before rendering it.
pub fn sort_by_order<T: Positioned>(entities: &mut [T]) {
    entities.sort_by_key(|e| e.order());
}

/// True when `orders` is a permutation of `0..orders.len()`.
pub fn is_dense(orders: impl IntoIterator<Item = i32>) -> bool {
    let mut orders: Vec<i32> = orders.into_iter().collect();
    orders.sort_unstable();
    orders
        .iter()
        .enumerate()
        .all(|(index, &order)| order == index as i32)
}

/// Order given to an entity appended to a scope that holds `len` siblings.
pub fn next_order(len: usize) -> i32 {
    len as i32
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Minimal positioned item used by the ordering and reorder tests.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Item {
        pub id: Uuid,
        pub scope: Uuid,
        pub order: i32,
        pub label: &'static str,
    }

    impl Positioned for Item {
        fn id(&self) -> Uuid {
            self.id
        }
        fn scope_id(&self) -> Uuid {
            self.scope
        }
        fn order(&self) -> i32 {
            self.order
        }
        fn set_order(&mut self, order: i32) {
            self.order = order;
        }
        fn set_scope_id(&mut self, scope_id: Uuid) {
            self.scope = scope_id;
        }
    }

    pub fn items(scope: Uuid, labels: &[&'static str]) -> Vec<Item> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| Item {
                id: Uuid::new_v4(),
                scope,
                order: i as i32,
                label,
            })
            .collect()
    }

    pub fn labels(items: &[Item]) -> Vec<&'static str> {
        items.iter().map(|i| i.label).collect()
    }
}
