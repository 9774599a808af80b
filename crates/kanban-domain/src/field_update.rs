use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Represents a field update operation for partial updates
///
/// Three states for an optional field:
/// - `NoChange`: Field keeps its existing value
/// - `Set(value)`: Field is updated to the provided value
/// - `Clear`: Field is cleared (set to None)
///
/// On the wire an absent key is `NoChange`, `null` is `Clear` and any other
/// value is `Set`. Pair the field with `#[serde(default, skip_serializing_if
/// = "FieldUpdate::is_no_change")]` so that mapping survives serialization.
///
/// # Example
///
/// ```
/// use kanban_domain::FieldUpdate;
///
/// let due = FieldUpdate::Set("2026-01-01".to_string());
/// let assignee: FieldUpdate<String> = FieldUpdate::Clear;
/// let points: FieldUpdate<u32> = FieldUpdate::NoChange;
/// assert!(due.is_change() && assignee.is_change() && !points.is_change());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    /// Do not modify this field (keep existing value)
    NoChange,
    /// Set the field to the provided value
    Set(T),
    /// Clear the field (set to None)
    Clear,
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::NoChange
    }
}

impl<T> FieldUpdate<T> {
    /// Apply this update to an optional field
    ///
    /// ```
    /// use kanban_domain::FieldUpdate;
    ///
    /// let mut field = Some(3u32);
    /// FieldUpdate::Set(5).apply_to(&mut field);
    /// assert_eq!(field, Some(5));
    ///
    /// FieldUpdate::Clear.apply_to(&mut field);
    /// assert_eq!(field, None);
    /// ```
    pub fn apply_to(self, field: &mut Option<T>) {
        match self {
            FieldUpdate::NoChange => {}
            FieldUpdate::Set(value) => *field = Some(value),
            FieldUpdate::Clear => *field = None,
        }
    }

    /// Check if this represents a change (not NoChange)
    pub fn is_change(&self) -> bool {
        !self.is_no_change()
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, FieldUpdate::NoChange)
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Clear,
        }
    }
}

impl<T: Serialize> Serialize for FieldUpdate<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldUpdate::Set(value) => serializer.serialize_some(value),
            FieldUpdate::NoChange | FieldUpdate::Clear => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(FieldUpdate::from)
    }
}
