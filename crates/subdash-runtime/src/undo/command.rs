#![forbid(unsafe_code)]

//! Reversible actions recorded by the undo/redo history.
//!
//! An [`UndoRedoAction`] pairs immutable metadata (id, kind tag, description,
//! timestamp, opaque payloads) with a caller-owned [`Reversible`] effect. The
//! history never inspects application data: the effect's closures capture
//! whatever state they need to revert or reapply.
//!
//! # Invariants
//!
//! - Metadata is fixed at construction; only stack position changes later.
//! - `revert()` followed by `apply()` restores the post-action state, given
//!   correct caller closures.
//!
//! # Failure Modes
//!
//! - **State drift**: application state changed underneath the action, so
//!   its closure can no longer run. The closure reports a [`CommandError`]
//!   and the history discards the action.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Well-known action kind tags. The history never dispatches on these.
pub mod kinds {
    /// A spreadsheet import replaced the subscription list.
    pub const DATA_IMPORT: &str = "data.import";
    /// A single subscription was renewed.
    pub const SUBSCRIPTION_RENEW: &str = "subscription.renew";
    /// Several subscriptions were renewed at once.
    pub const SUBSCRIPTION_BULK_RENEW: &str = "subscription.bulk_renew";
}

/// Opaque, randomly generated action identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ActionId(Uuid);

impl ActionId {
    /// A fresh random id. Not sequential; do not derive ordering from it.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Result of reverting or reapplying an action.
pub type CommandResult = Result<(), CommandError>;

/// Errors reported by caller-supplied undo/redo closures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The entity the action targets no longer exists.
    #[error("target {0} not found")]
    TargetNotFound(String),
    /// Application state no longer matches what the action expects.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Something with an apply/revert pair.
///
/// Closure pairs implement this through [`FnPair`]; richer effects can
/// implement it directly.
pub trait Reversible {
    /// Revert application state to what it was before the action.
    fn revert(&mut self) -> CommandResult;

    /// Reapply the action's forward effect.
    fn apply(&mut self) -> CommandResult;
}

/// A [`Reversible`] built from two closures.
pub struct FnPair<U, R> {
    undo: U,
    redo: R,
}

impl<U, R> FnPair<U, R>
where
    U: FnMut() -> CommandResult,
    R: FnMut() -> CommandResult,
{
    /// Pair an undo closure with its redo closure.
    pub fn new(undo: U, redo: R) -> Self {
        Self { undo, redo }
    }
}

impl<U, R> Reversible for FnPair<U, R>
where
    U: FnMut() -> CommandResult,
    R: FnMut() -> CommandResult,
{
    fn revert(&mut self) -> CommandResult {
        (self.undo)()
    }

    fn apply(&mut self) -> CommandResult {
        (self.redo)()
    }
}

/// Read-only copy of an action's metadata, as returned by stack snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSnapshot {
    pub id: ActionId,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_state: Option<Value>,
}

/// A recorded, reversible application state transition.
pub struct UndoRedoAction {
    meta: ActionSnapshot,
    effect: Box<dyn Reversible>,
}

impl fmt::Debug for UndoRedoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoRedoAction")
            .field("id", &self.meta.id)
            .field("kind", &self.meta.kind)
            .field("description", &self.meta.description)
            .field("timestamp", &self.meta.timestamp)
            .finish_non_exhaustive()
    }
}

impl UndoRedoAction {
    /// Start building an action of the given kind.
    pub fn builder(kind: impl Into<String>, description: impl Into<String>) -> ActionBuilder {
        ActionBuilder::new(kind, description)
    }

    #[must_use]
    pub fn id(&self) -> ActionId {
        self.meta.id
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.meta.kind
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.meta.description
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.meta.timestamp
    }

    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.meta.data.as_ref()
    }

    #[must_use]
    pub fn previous_state(&self) -> Option<&Value> {
        self.meta.previous_state.as_ref()
    }

    #[must_use]
    pub fn new_state(&self) -> Option<&Value> {
        self.meta.new_state.as_ref()
    }

    /// Copy of the metadata.
    #[must_use]
    pub fn snapshot(&self) -> ActionSnapshot {
        self.meta.clone()
    }

    pub(crate) fn revert(&mut self) -> CommandResult {
        self.effect.revert()
    }

    pub(crate) fn apply(&mut self) -> CommandResult {
        self.effect.apply()
    }
}

/// Builder for [`UndoRedoAction`].
///
/// ```ignore
/// let action = ActionBuilder::data_import("Import 42 subscriptions")
///     .with_data(json!({ "rows": 42 }))
///     .build(move || restore_previous(), move || reapply_import());
/// history.push(action);
/// ```
#[derive(Debug, Clone)]
pub struct ActionBuilder {
    kind: String,
    description: String,
    timestamp: Option<DateTime<Utc>>,
    data: Option<Value>,
    previous_state: Option<Value>,
    new_state: Option<Value>,
}

impl ActionBuilder {
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            timestamp: None,
            data: None,
            previous_state: None,
            new_state: None,
        }
    }

    /// A `data.import` action.
    pub fn data_import(description: impl Into<String>) -> Self {
        Self::new(kinds::DATA_IMPORT, description)
    }

    /// A `subscription.renew` action.
    pub fn renewal(description: impl Into<String>) -> Self {
        Self::new(kinds::SUBSCRIPTION_RENEW, description)
    }

    /// A `subscription.bulk_renew` action.
    pub fn bulk_renewal(description: impl Into<String>) -> Self {
        Self::new(kinds::SUBSCRIPTION_BULK_RENEW, description)
    }

    /// Override the creation timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_previous_state(mut self, state: Value) -> Self {
        self.previous_state = Some(state);
        self
    }

    #[must_use]
    pub fn with_new_state(mut self, state: Value) -> Self {
        self.new_state = Some(state);
        self
    }

    /// Finish with an undo/redo closure pair.
    pub fn build<U, R>(self, undo: U, redo: R) -> UndoRedoAction
    where
        U: FnMut() -> CommandResult + 'static,
        R: FnMut() -> CommandResult + 'static,
    {
        self.build_with(FnPair::new(undo, redo))
    }

    /// Finish with any [`Reversible`] effect.
    pub fn build_with(self, effect: impl Reversible + 'static) -> UndoRedoAction {
        UndoRedoAction {
            meta: ActionSnapshot {
                id: ActionId::generate(),
                kind: self.kind,
                description: self.description,
                timestamp: self.timestamp.unwrap_or_else(Utc::now),
                data: self.data,
                previous_state: self.previous_state,
                new_state: self.new_state,
            },
            effect: Box::new(effect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::rc::Rc;

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<ActionId> = (0..1000).map(|_| ActionId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn builder_fills_metadata() {
        let action = ActionBuilder::renewal("Renew Acme Pro")
            .with_data(json!({ "subscriptionId": 7 }))
            .with_previous_state(json!({ "renewedUntil": "2026-01-01" }))
            .with_new_state(json!({ "renewedUntil": "2027-01-01" }))
            .build(|| Ok(()), || Ok(()));

        assert_eq!(action.kind(), kinds::SUBSCRIPTION_RENEW);
        assert_eq!(action.description(), "Renew Acme Pro");
        assert_eq!(action.data(), Some(&json!({ "subscriptionId": 7 })));
        assert_eq!(
            action.new_state(),
            Some(&json!({ "renewedUntil": "2027-01-01" }))
        );
        assert!(action.timestamp() <= Utc::now());
    }

    #[test]
    fn each_build_gets_a_new_id() {
        let builder = ActionBuilder::data_import("Import");
        let first = builder.clone().build(|| Ok(()), || Ok(()));
        let second = builder.build(|| Ok(()), || Ok(()));
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn closures_drive_revert_and_apply() {
        let value = Rc::new(Cell::new(2));
        let (v_undo, v_redo) = (value.clone(), value.clone());
        let mut action = ActionBuilder::new("counter.bump", "Bump").build(
            move || {
                v_undo.set(1);
                Ok(())
            },
            move || {
                v_redo.set(2);
                Ok(())
            },
        );

        action.revert().unwrap();
        assert_eq!(value.get(), 1);
        action.apply().unwrap();
        assert_eq!(value.get(), 2);
    }

    #[test]
    fn snapshot_serializes_kind_as_type() {
        let action = ActionBuilder::bulk_renewal("Renew 3").build(|| Ok(()), || Ok(()));
        let json = serde_json::to_value(action.snapshot()).unwrap();
        assert_eq!(json["type"], "subscription.bulk_renew");
        assert_eq!(json["description"], "Renew 3");
        assert!(json.get("data").is_none());
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn error_display() {
        assert_eq!(
            CommandError::TargetNotFound("sub-9".into()).to_string(),
            "target sub-9 not found"
        );
        assert_eq!(
            CommandError::InvalidState("list shrank".into()).to_string(),
            "invalid state: list shrank"
        );
    }
}
