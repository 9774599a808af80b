use uuid::Uuid;

/// An entity whose position inside a parent scope is an integer `order`.
///
/// Implemented by lists (scoped by their board) and cards (scoped by their
/// list). The ordering and reorder modules only ever touch entities through
/// this trait.
pub trait Positioned {
    fn id(&self) -> Uuid;

    /// Identifier of the parent scope the order is dense within.
    fn scope_id(&self) -> Uuid;

    fn order(&self) -> i32;

    fn set_order(&mut self, order: i32);

    /// Re-parent the entity. Called once on the moved entity of a
    /// cross-scope move, before the destination is renumbered.
    fn set_scope_id(&mut self, scope_id: Uuid);
}
