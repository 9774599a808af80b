//! Optimistic mutations of one board.
//!
//! Each action snapshots local state, applies its result immediately, then
//! persists. Any failed call restores the snapshot in full. Actions on a
//! board run one at a time behind a FIFO writer lock, so a snapshot never
//! predates another applied action.

use std::sync::Arc;

use futures::future::join_all;
use kanban_core::ordering::{apply_renumber, next_order, renumber};
use kanban_core::{plan_move, DragMove, KanbanError, KanbanResult, Positioned, ReorderPlan};
use kanban_domain::{
    Card, CardId, CardUpdate, ContentEdit, Entity, EntityKind, FieldPatch, List, ListId, ListUpdate,
    OrderUpdate,
};
use kanban_persistence::EntityStore;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::state::{BoardSnapshot, BoardState};

/// End of a drag gesture. List drags use the board id as both scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragEnd {
    pub kind: EntityKind,
    pub source_scope: Uuid,
    pub source_index: usize,
    pub dest_scope: Uuid,
    pub dest_index: usize,
}

impl DragEnd {
    pub fn list(board_id: Uuid, source_index: usize, dest_index: usize) -> Self {
        Self {
            kind: EntityKind::List,
            source_scope: board_id,
            source_index,
            dest_scope: board_id,
            dest_index,
        }
    }

    pub fn card(source_list: ListId, source_index: usize, dest_list: ListId, dest_index: usize) -> Self {
        Self {
            kind: EntityKind::Card,
            source_scope: source_list,
            source_index,
            dest_scope: dest_list,
            dest_index,
        }
    }

    fn as_move(&self) -> DragMove {
        DragMove::across(self.source_scope, self.source_index, self.dest_scope, self.dest_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Dropped where it started; nothing was written.
    Noop,
    Applied { moved: Uuid, writes: usize },
    RolledBack { moved: Uuid, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatchOutcome<T> {
    Applied(T),
    Reverted { reason: String },
}

impl<T> PatchOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Reverted { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PatchOutcome<U> {
        match self {
            Self::Applied(value) => PatchOutcome::Applied(f(value)),
            Self::Reverted { reason } => PatchOutcome::Reverted { reason },
        }
    }
}

/// Order writes for one action: `first` is awaited on its own before the
/// rest are issued together.
struct OrderWrites {
    first: Option<OrderUpdate>,
    rest: Vec<OrderUpdate>,
}

impl OrderWrites {
    fn for_plan<T>(kind: EntityKind, plan: &ReorderPlan<T>) -> Self {
        if plan.destination.is_some() {
            Self {
                first: plan.moved_change().map(|c| OrderUpdate::from_change(kind, c)),
                rest: plan
                    .sibling_changes()
                    .map(|c| OrderUpdate::from_change(kind, c))
                    .collect(),
            }
        } else {
            Self {
                first: None,
                rest: plan
                    .changes
                    .iter()
                    .map(|c| OrderUpdate::from_change(kind, c))
                    .collect(),
            }
        }
    }

    fn renumbered<T: Positioned>(kind: EntityKind, siblings: &[T]) -> Self {
        Self {
            first: None,
            rest: renumber(siblings)
                .into_iter()
                .map(|(id, order)| OrderUpdate::new(kind, id, order))
                .collect(),
        }
    }

    fn len(&self) -> usize {
        self.rest.len() + usize::from(self.first.is_some())
    }
}

pub struct MutationController {
    store: Arc<dyn EntityStore>,
    state: Arc<BoardState>,
    writer: Mutex<()>,
}

impl MutationController {
    pub fn new(store: Arc<dyn EntityStore>, state: Arc<BoardState>) -> Self {
        Self {
            store,
            state,
            writer: Mutex::new(()),
        }
    }

    pub fn state(&self) -> &Arc<BoardState> {
        &self.state
    }

    /// Reorder a list within the board, or a card within or across lists.
    pub async fn on_drag_end(&self, drag: DragEnd) -> KanbanResult<DragOutcome> {
        let mv = drag.as_move();
        if mv.is_noop() {
            tracing::debug!("Drag of {} dropped in place", drag.kind);
            return Ok(DragOutcome::Noop);
        }

        let _writer = self.writer.lock().await;
        let _in_flight = self.state.begin_write();
        let snapshot = self.state.snapshot();

        let (moved, writes) = match drag.kind {
            EntityKind::List => {
                let board_id = self.state.board_id();
                if drag.source_scope != board_id || drag.dest_scope != board_id {
                    return Err(KanbanError::Validation(format!(
                        "list drags must stay on board {}",
                        board_id
                    )));
                }
                let plan = plan_move(&mv, &snapshot.lists, &snapshot.lists)?;
                if plan.is_noop() {
                    tracing::debug!("List drag past the end of board {} dropped in place", board_id);
                    return Ok(DragOutcome::Noop);
                }
                let moved = moved_id(&plan)?;
                let writes = OrderWrites::for_plan(EntityKind::List, &plan);
                self.state.apply_local(|data| data.lists = plan.source);
                (moved, writes)
            }
            EntityKind::Card => {
                for list_id in [drag.source_scope, drag.dest_scope] {
                    if !snapshot.lists.iter().any(|l| l.id == list_id) {
                        return Err(KanbanError::NotFound(format!("list {}", list_id)));
                    }
                }
                let plan = plan_move(
                    &mv,
                    snapshot.cards_in(drag.source_scope),
                    snapshot.cards_in(drag.dest_scope),
                )?;
                if plan.is_noop() {
                    tracing::debug!("Card drag past the end of list {} dropped in place", drag.source_scope);
                    return Ok(DragOutcome::Noop);
                }
                if let Some(destination) = &plan.destination {
                    warn_if_over_limit(&snapshot.lists, drag.dest_scope, destination.len());
                }
                let moved = moved_id(&plan)?;
                let writes = OrderWrites::for_plan(EntityKind::Card, &plan);
                self.state.apply_local(|data| {
                    data.cards.insert(drag.source_scope, plan.source);
                    if let Some(destination) = plan.destination {
                        data.cards.insert(drag.dest_scope, destination);
                    }
                });
                (moved, writes)
            }
        };

        tracing::debug!("Moving {} {} with {} order write(s)", drag.kind, moved, writes.len());
        let count = writes.len();
        let result = self.persist_orders(writes).await;
        Ok(match self.finish(snapshot, "drag", result) {
            PatchOutcome::Applied(()) => DragOutcome::Applied { moved, writes: count },
            PatchOutcome::Reverted { reason } => DragOutcome::RolledBack { moved, reason },
        })
    }

    /// Patch card fields in place. A failed write reverts before returning.
    pub async fn quick_update(&self, card_id: CardId, updates: CardUpdate) -> KanbanResult<PatchOutcome<Card>> {
        let _writer = self.writer.lock().await;
        let _in_flight = self.state.begin_write();
        let snapshot = self.state.snapshot();
        let Some(current) = snapshot.card(card_id).cloned() else {
            return Err(KanbanError::NotFound(format!("card {}", card_id)));
        };
        if !updates.is_change() {
            return Ok(PatchOutcome::Applied(current));
        }

        self.state.apply_local(|data| {
            if let Some(card) = data.card_mut(card_id) {
                card.update(updates.clone());
            }
        });

        match self.store.patch_card(card_id, &updates).await {
            Ok(stored) => {
                let (_, ticket) = self.state.apply_local(|data| {
                    if let Some(card) = data.card_mut(card_id) {
                        *card = stored.clone();
                    }
                });
                tracing::debug!("Card {} patched (ticket {})", card_id, ticket);
                Ok(PatchOutcome::Applied(stored))
            }
            Err(err) => Ok(self.finish(snapshot, "quick update", Err(err))),
        }
    }

    /// Rename a list, change its WIP limit or archive it. A failed write
    /// reverts before returning.
    pub async fn update_list(&self, list_id: ListId, mut updates: ListUpdate) -> KanbanResult<PatchOutcome<List>> {
        updates.name = updates.name.as_deref().map(validated_name).transpose()?;
        let _writer = self.writer.lock().await;
        let _in_flight = self.state.begin_write();
        let snapshot = self.state.snapshot();
        let Some(current) = snapshot.lists.iter().find(|l| l.id == list_id).cloned() else {
            return Err(KanbanError::NotFound(format!("list {}", list_id)));
        };
        if !updates.is_change() {
            return Ok(PatchOutcome::Applied(current));
        }

        self.state.apply_local(|data| {
            if let Some(list) = data.lists.iter_mut().find(|l| l.id == list_id) {
                list.update(updates.clone());
            }
        });

        match self.store.patch_list(list_id, &updates).await {
            Ok(stored) => {
                let (_, ticket) = self.state.apply_local(|data| {
                    if let Some(list) = data.lists.iter_mut().find(|l| l.id == list_id) {
                        *list = stored.clone();
                    }
                });
                tracing::debug!("List {} patched (ticket {})", list_id, ticket);
                Ok(PatchOutcome::Applied(stored))
            }
            Err(err) => Ok(self.finish(snapshot, "list update", Err(err))),
        }
    }

    /// Field edit of a list or a card, dispatched on the patch kind.
    pub async fn quick_update_entity(&self, id: Uuid, patch: FieldPatch) -> KanbanResult<PatchOutcome<Entity>> {
        Ok(match patch {
            FieldPatch::List(updates) => self.update_list(id, updates).await?.map(Entity::List),
            FieldPatch::Card(updates) => self.quick_update(id, updates).await?.map(Entity::Card),
        })
    }

    /// Add, edit or remove a comment, or change a checklist. Edits the
    /// store rejects are reverted before returning.
    pub async fn edit_content(&self, card_id: CardId, edit: ContentEdit) -> KanbanResult<PatchOutcome<Card>> {
        let _writer = self.writer.lock().await;
        let _in_flight = self.state.begin_write();
        let snapshot = self.state.snapshot();
        let Some(mut edited) = snapshot.card(card_id).cloned() else {
            return Err(KanbanError::NotFound(format!("card {}", card_id)));
        };
        edited.apply_content(&edit)?;

        self.state.apply_local(|data| {
            if let Some(card) = data.card_mut(card_id) {
                *card = edited.clone();
            }
        });

        match self.store.edit_content(card_id, &edit).await {
            Ok(stored) => {
                let (_, ticket) = self.state.apply_local(|data| {
                    if let Some(card) = data.card_mut(card_id) {
                        *card = stored.clone();
                    }
                });
                tracing::debug!("{} on card {} persisted (ticket {})", edit.describe(), card_id, ticket);
                Ok(PatchOutcome::Applied(stored))
            }
            Err(err) => Ok(self.finish(snapshot, edit.describe(), Err(err))),
        }
    }

    /// Append a list to the board.
    pub async fn add_list(&self, name: &str) -> KanbanResult<PatchOutcome<List>> {
        let name = validated_name(name)?;
        let _writer = self.writer.lock().await;
        let _in_flight = self.state.begin_write();
        let snapshot = self.state.snapshot();

        let list = List::new(self.state.board_id(), name, next_order(snapshot.lists.len()));
        self.state.apply_local(|data| data.lists.push(list.clone()));

        let result = self
            .store
            .create_entity(Entity::List(list.clone()))
            .await
            .map(|_| list);
        Ok(self.finish(snapshot, "add list", result))
    }

    /// Append a card to `list_id`, with any extra fields from `fields`.
    pub async fn add_card(
        &self,
        list_id: ListId,
        name: &str,
        fields: CardUpdate,
    ) -> KanbanResult<PatchOutcome<Card>> {
        let name = validated_name(name)?;
        let _writer = self.writer.lock().await;
        let _in_flight = self.state.begin_write();
        let snapshot = self.state.snapshot();
        if !snapshot.lists.iter().any(|l| l.id == list_id) {
            return Err(KanbanError::NotFound(format!("list {}", list_id)));
        }

        let order = next_order(snapshot.cards_in(list_id).len());
        warn_if_over_limit(&snapshot.lists, list_id, snapshot.cards_in(list_id).len() + 1);
        let mut card = Card::new(self.state.board_id(), list_id, name, order);
        card.update(fields);
        self.state
            .apply_local(|data| data.cards.entry(list_id).or_default().push(card.clone()));

        let result = self
            .store
            .create_entity(Entity::Card(card.clone()))
            .await
            .map(|_| card);
        Ok(self.finish(snapshot, "add card", result))
    }

    /// Delete a list with its cards and close the gap in list orders.
    pub async fn delete_list(&self, list_id: ListId) -> KanbanResult<PatchOutcome<()>> {
        let _writer = self.writer.lock().await;
        let _in_flight = self.state.begin_write();
        let snapshot = self.state.snapshot();
        if !snapshot.lists.iter().any(|l| l.id == list_id) {
            return Err(KanbanError::NotFound(format!("list {}", list_id)));
        }

        let (writes, _) = self.state.apply_local(|data| {
            data.lists.retain(|l| l.id != list_id);
            data.cards.remove(&list_id);
            apply_renumber(&mut data.lists);
            OrderWrites::renumbered(EntityKind::List, &data.lists)
        });

        let result = match self.store.delete_entity(EntityKind::List, list_id).await {
            Ok(()) => self.persist_orders(writes).await,
            Err(err) => Err(err),
        };
        Ok(self.finish(snapshot, "delete list", result))
    }

    /// Delete a card and close the gap in its list.
    pub async fn delete_card(&self, card_id: CardId) -> KanbanResult<PatchOutcome<()>> {
        let _writer = self.writer.lock().await;
        let _in_flight = self.state.begin_write();
        let snapshot = self.state.snapshot();
        let Some(list_id) = snapshot.card(card_id).map(|c| c.list_id) else {
            return Err(KanbanError::NotFound(format!("card {}", card_id)));
        };

        let (writes, _) = self.state.apply_local(|data| {
            let siblings = data.cards.entry(list_id).or_default();
            siblings.retain(|c| c.id != card_id);
            apply_renumber(siblings);
            OrderWrites::renumbered(EntityKind::Card, siblings)
        });

        let result = match self.store.delete_entity(EntityKind::Card, card_id).await {
            Ok(()) => self.persist_orders(writes).await,
            Err(err) => Err(err),
        };
        Ok(self.finish(snapshot, "delete card", result))
    }

    /// Await `first`, then issue the rest concurrently and wait for all of
    /// them. Reports the first failure.
    async fn persist_orders(&self, writes: OrderWrites) -> KanbanResult<()> {
        if let Some(update) = writes.first {
            self.store.update_order(&update).await?;
        }
        let results = join_all(writes.rest.iter().map(|u| self.store.update_order(u))).await;
        results.into_iter().collect::<KanbanResult<Vec<()>>>()?;
        Ok(())
    }

    fn finish<T>(&self, snapshot: BoardSnapshot, action: &str, result: KanbanResult<T>) -> PatchOutcome<T> {
        match result {
            Ok(value) => {
                let ticket = self.state.settle();
                tracing::debug!("{} on board {} persisted (ticket {})", action, self.state.board_id(), ticket);
                PatchOutcome::Applied(value)
            }
            Err(err) => {
                let ticket = self.state.restore(snapshot);
                tracing::error!(
                    "{} on board {} failed, restored snapshot (ticket {}): {}",
                    action,
                    self.state.board_id(),
                    ticket,
                    err
                );
                PatchOutcome::Reverted {
                    reason: err.to_string(),
                }
            }
        }
    }
}

fn warn_if_over_limit(lists: &[List], list_id: ListId, card_count: usize) {
    if let Some(list) = lists.iter().find(|l| l.id == list_id) {
        if list.is_over_limit(card_count) {
            tracing::warn!(
                "List {} holds {} card(s), over its WIP limit of {}",
                list.name,
                card_count,
                list.wip_limit.unwrap_or_default()
            );
        }
    }
}

fn moved_id<T>(plan: &ReorderPlan<T>) -> KanbanResult<Uuid> {
    plan.moved
        .ok_or_else(|| KanbanError::Internal("reorder plan without a moved entity".to_string()))
}

fn validated_name(name: &str) -> KanbanResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(KanbanError::missing("name"));
    }
    Ok(name.to_string())
}
