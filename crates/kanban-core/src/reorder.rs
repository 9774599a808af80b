//! Reorder engine for drag-and-drop moves.
//!
//! Turns a drop result (source scope/index, destination scope/index) and the
//! current ordered contents of the affected scopes into the complete set of
//! order changes that realizes the move. Both scopes are renumbered in full
//! so the result is dense no matter what the inputs looked like.

use crate::ordering::{apply_renumber, renumber};
use crate::traits::Positioned;
use crate::{KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A drop result as reported by the presentation layer.
///
/// `dest_index` is expressed as if the dragged entity had already been
/// removed from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragMove {
    pub source_scope: Uuid,
    pub source_index: usize,
    pub dest_scope: Uuid,
    pub dest_index: usize,
}

impl DragMove {
    pub fn within(scope: Uuid, source_index: usize, dest_index: usize) -> Self {
        Self {
            source_scope: scope,
            source_index,
            dest_scope: scope,
            dest_index,
        }
    }

    pub fn across(source_scope: Uuid, source_index: usize, dest_scope: Uuid, dest_index: usize) -> Self {
        Self {
            source_scope,
            source_index,
            dest_scope,
            dest_index,
        }
    }

    pub fn is_same_scope(&self) -> bool {
        self.source_scope == self.dest_scope
    }

    /// Dropped back where it started.
    pub fn is_noop(&self) -> bool {
        self.is_same_scope() && self.source_index == self.dest_index
    }

    /// Dropped back where it started once `dest_index` is clamped to a
    /// scope holding `len` entities.
    pub fn is_noop_in(&self, len: usize) -> bool {
        self.is_same_scope() && self.dest_index.min(len.saturating_sub(1)) == self.source_index
    }
}

/// New order (and, for the moved entity of a cross-scope move, new parent)
/// for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderChange {
    pub id: Uuid,
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Uuid>,
}

impl OrderChange {
    pub fn reparents(&self) -> bool {
        self.parent.is_some()
    }
}

/// Outcome of planning a move: every order change plus the resulting
/// ordered contents of the touched scopes.
#[derive(Debug, Clone)]
pub struct ReorderPlan<T> {
    /// Id of the dragged entity, `None` for a no-op.
    pub moved: Option<Uuid>,
    pub changes: Vec<OrderChange>,
    /// Source scope after the move (the only scope for a same-scope move).
    pub source: Vec<T>,
    /// Destination scope after the move, `None` unless the move crossed scopes.
    pub destination: Option<Vec<T>>,
}

impl<T> ReorderPlan<T> {
    pub fn noop() -> Self {
        Self {
            moved: None,
            changes: Vec::new(),
            source: Vec::new(),
            destination: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.moved.is_none()
    }

    /// The change for the dragged entity itself.
    pub fn moved_change(&self) -> Option<&OrderChange> {
        let moved = self.moved?;
        self.changes.iter().find(|c| c.id == moved)
    }

    /// Every change except the dragged entity's.
    pub fn sibling_changes(&self) -> impl Iterator<Item = &OrderChange> {
        let moved = self.moved;
        self.changes.iter().filter(move |c| Some(c.id) != moved)
    }
}

/// Compute the full set of order updates for `mv`.
///
/// `source` and `destination` must be in current visual order. For a
/// same-scope move pass the same slice twice; `destination` is ignored.
/// A destination index past the end appends.
pub fn plan_move<T>(mv: &DragMove, source: &[T], destination: &[T]) -> KanbanResult<ReorderPlan<T>>
where
    T: Positioned + Clone,
{
    if mv.is_noop() {
        return Ok(ReorderPlan::noop());
    }

    if mv.source_index >= source.len() {
        return Err(KanbanError::Validation(format!(
            "source index {} out of range for scope {} with {} entities",
            mv.source_index,
            mv.source_scope,
            source.len()
        )));
    }

    if mv.is_noop_in(source.len()) {
        return Ok(ReorderPlan::noop());
    }

    if mv.is_same_scope() {
        let mut reordered = source.to_vec();
        let entity = reordered.remove(mv.source_index);
        let moved = entity.id();
        let dest_index = mv.dest_index.min(reordered.len());
        reordered.insert(dest_index, entity);
        apply_renumber(&mut reordered);

        let changes = renumber(&reordered)
            .into_iter()
            .map(|(id, order)| OrderChange {
                id,
                order,
                parent: None,
            })
            .collect();

        return Ok(ReorderPlan {
            moved: Some(moved),
            changes,
            source: reordered,
            destination: None,
        });
    }

    let mut remaining = source.to_vec();
    let mut entity = remaining.remove(mv.source_index);
    let moved = entity.id();
    apply_renumber(&mut remaining);

    entity.set_scope_id(mv.dest_scope);
    let mut target = destination.to_vec();
    let dest_index = mv.dest_index.min(target.len());
    target.insert(dest_index, entity);
    apply_renumber(&mut target);

    let mut changes: Vec<OrderChange> = renumber(&remaining)
        .into_iter()
        .map(|(id, order)| OrderChange {
            id,
            order,
            parent: None,
        })
        .collect();
    changes.extend(renumber(&target).into_iter().map(|(id, order)| OrderChange {
        id,
        order,
        parent: (id == moved).then_some(mv.dest_scope),
    }));

    Ok(ReorderPlan {
        moved: Some(moved),
        changes,
        source: remaining,
        destination: Some(target),
    })
}
