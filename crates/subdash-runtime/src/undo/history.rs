#![forbid(unsafe_code)]

//! Two-stack undo/redo history.
//!
//! [`UndoRedoManager`] keeps a linear command history. It records actions,
//! walks them backwards and forwards by invoking their caller-supplied
//! closures, and notifies subscribers after every stack mutation.
//!
//! # Invariants
//!
//! 1. The redo stack is empty after every `push`.
//! 2. The two stacks are disjoint; an action lives in at most one of them.
//! 3. `undo_depth() <= config.max_depth` after any operation, when bounded.
//! 4. An action whose closure fails is dropped, never requeued.
//!
//! # Memory Model
//!
//! ```text
//! push(a5)
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [a1, a2, a3, a4, a5]              │
//! │ Redo Stack: []                                │
//! └───────────────────────────────────────────────┘
//!
//! undo() x2
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [a1, a2, a3]                      │
//! │ Redo Stack: [a4, a5]                          │
//! └───────────────────────────────────────────────┘
//!
//! push(a6)  <-- new forward action, redo history is gone
//! ┌───────────────────────────────────────────────┐
//! │ Undo Stack: [a1, a2, a3, a6]                  │
//! │ Redo Stack: []                                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! # Re-entrancy
//!
//! No `RefCell` borrow is held while a closure or listener runs, so both may
//! call back into the manager.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, warn};

use super::command::{ActionId, ActionSnapshot, CommandError, UndoRedoAction};
use super::shortcut::HistoryShortcut;
use crate::reactive::{ListenerSet, Subscription};

/// Capacity configuration for the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of actions kept on the undo stack. `None` = unbounded.
    pub max_depth: Option<usize>,
}

impl HistoryConfig {
    /// Keep at most `max_depth` undo entries, evicting the oldest first.
    #[must_use]
    pub fn bounded(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
        }
    }

    /// No capacity bound.
    #[must_use]
    pub fn unlimited() -> Self {
        Self { max_depth: None }
    }
}

/// Toolbar-style projection of the history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStatus {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_description: Option<String>,
    pub redo_description: Option<String>,
    pub undo_depth: usize,
    pub redo_depth: usize,
}

#[derive(Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

struct Stacks {
    /// Actions available for undo (newest at back).
    undo: VecDeque<UndoRedoAction>,
    /// Actions available for redo (newest at back).
    redo: VecDeque<UndoRedoAction>,
    config: HistoryConfig,
}

impl Stacks {
    fn source(&mut self, direction: Direction) -> &mut VecDeque<UndoRedoAction> {
        match direction {
            Direction::Undo => &mut self.undo,
            Direction::Redo => &mut self.redo,
        }
    }

    fn target(&mut self, direction: Direction) -> &mut VecDeque<UndoRedoAction> {
        match direction {
            Direction::Undo => &mut self.redo,
            Direction::Redo => &mut self.undo,
        }
    }

    /// Evict the oldest undo entries beyond the configured depth.
    fn enforce_limits(&mut self) -> Vec<UndoRedoAction> {
        let mut evicted = Vec::new();
        if let Some(max_depth) = self.config.max_depth {
            while self.undo.len() > max_depth {
                if let Some(action) = self.undo.pop_front() {
                    evicted.push(action);
                }
            }
        }
        evicted
    }
}

struct Shared {
    stacks: RefCell<Stacks>,
    listeners: ListenerSet<()>,
}

/// Undo/redo history handle.
///
/// Cloning creates another handle to the **same** history; hand clones to
/// whichever regions need to record or trigger undo.
#[derive(Clone)]
pub struct UndoRedoManager {
    shared: Rc<Shared>,
}

impl fmt::Debug for UndoRedoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stacks = self.shared.stacks.borrow();
        f.debug_struct("UndoRedoManager")
            .field("undo_depth", &stacks.undo.len())
            .field("redo_depth", &stacks.redo.len())
            .field("config", &stacks.config)
            .field("listeners", &self.shared.listeners.len())
            .finish()
    }
}

impl Default for UndoRedoManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl UndoRedoManager {
    /// Create an empty history.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                stacks: RefCell::new(Stacks {
                    undo: VecDeque::new(),
                    redo: VecDeque::new(),
                    config,
                }),
                listeners: ListenerSet::new(),
            }),
        }
    }

    // ========================================================================
    // Core Operations
    // ========================================================================

    /// Record an action whose forward effect the caller has already applied.
    ///
    /// Clears the redo stack and enforces the depth bound. Always succeeds.
    pub fn push(&self, action: UndoRedoAction) {
        let action_id = action.id();
        let (discarded, evicted, undo_depth) = {
            let mut stacks = self.shared.stacks.borrow_mut();
            let discarded: Vec<_> = stacks.redo.drain(..).collect();
            stacks.undo.push_back(action);
            let evicted = stacks.enforce_limits();
            (discarded, evicted, stacks.undo.len())
        };
        debug!(
            action_id = %action_id,
            undo_depth,
            redo_cleared = discarded.len(),
            evicted = evicted.len(),
            "action recorded"
        );
        // Dropped outside the borrow: closures may own handles to this history.
        drop(discarded);
        drop(evicted);
        self.notify();
    }

    /// Revert the most recent action.
    ///
    /// # Returns
    ///
    /// - `None` if there is nothing to undo (stacks untouched, no notification)
    /// - `Some(Ok(description))` if the action was reverted and moved to redo
    /// - `Some(Err(error))` if its undo closure failed; the action is dropped
    pub fn undo(&self) -> Option<Result<String, CommandError>> {
        self.step(Direction::Undo)
    }

    /// Reapply the most recently undone action. Mirrors [`Self::undo`].
    pub fn redo(&self) -> Option<Result<String, CommandError>> {
        self.step(Direction::Redo)
    }

    fn step(&self, direction: Direction) -> Option<Result<String, CommandError>> {
        let mut action = self.shared.stacks.borrow_mut().source(direction).pop_back()?;
        let description = action.description().to_owned();

        let result = match direction {
            Direction::Undo => action.revert(),
            Direction::Redo => action.apply(),
        };

        let outcome = match result {
            Ok(()) => {
                debug!(
                    action_id = %action.id(),
                    kind = action.kind(),
                    op = direction.as_str(),
                    "action replayed"
                );
                self.shared
                    .stacks
                    .borrow_mut()
                    .target(direction)
                    .push_back(action);
                Ok(description)
            }
            Err(error) => {
                warn!(
                    action_id = %action.id(),
                    kind = action.kind(),
                    op = direction.as_str(),
                    error = %error,
                    "reversal closure failed; action discarded"
                );
                drop(action);
                Err(error)
            }
        };

        self.notify();
        Some(outcome)
    }

    /// Empty both stacks.
    pub fn clear(&self) {
        let (undo, redo) = {
            let mut stacks = self.shared.stacks.borrow_mut();
            (
                std::mem::take(&mut stacks.undo),
                std::mem::take(&mut stacks.redo),
            )
        };
        debug!(
            undo_cleared = undo.len(),
            redo_cleared = redo.len(),
            "history cleared"
        );
        drop(undo);
        drop(redo);
        self.notify();
    }

    /// Run the operation bound to a keyboard shortcut.
    pub fn handle_shortcut(
        &self,
        shortcut: HistoryShortcut,
    ) -> Option<Result<String, CommandError>> {
        match shortcut {
            HistoryShortcut::Undo => self.undo(),
            HistoryShortcut::Redo => self.redo(),
        }
    }

    /// A fresh action id, unique for the lifetime of the process.
    #[must_use]
    pub fn generate_action_id(&self) -> ActionId {
        ActionId::generate()
    }

    // ========================================================================
    // Info
    // ========================================================================

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.shared.stacks.borrow().undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.shared.stacks.borrow().redo.is_empty()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.shared.stacks.borrow().undo.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.shared.stacks.borrow().redo.len()
    }

    /// Description of the next action `undo()` would revert.
    #[must_use]
    pub fn undo_description(&self) -> Option<String> {
        self.shared
            .stacks
            .borrow()
            .undo
            .back()
            .map(|a| a.description().to_owned())
    }

    /// Description of the next action `redo()` would reapply.
    #[must_use]
    pub fn redo_description(&self) -> Option<String> {
        self.shared
            .stacks
            .borrow()
            .redo
            .back()
            .map(|a| a.description().to_owned())
    }

    /// Metadata copies of the undo stack, oldest first.
    #[must_use]
    pub fn undo_stack(&self) -> Vec<ActionSnapshot> {
        self.shared
            .stacks
            .borrow()
            .undo
            .iter()
            .map(UndoRedoAction::snapshot)
            .collect()
    }

    /// Metadata copies of the redo stack, oldest first.
    #[must_use]
    pub fn redo_stack(&self) -> Vec<ActionSnapshot> {
        self.shared
            .stacks
            .borrow()
            .redo
            .iter()
            .map(UndoRedoAction::snapshot)
            .collect()
    }

    #[must_use]
    pub fn config(&self) -> HistoryConfig {
        self.shared.stacks.borrow().config
    }

    #[must_use]
    pub fn status(&self) -> HistoryStatus {
        let stacks = self.shared.stacks.borrow();
        HistoryStatus {
            can_undo: !stacks.undo.is_empty(),
            can_redo: !stacks.redo.is_empty(),
            undo_description: stacks.undo.back().map(|a| a.description().to_owned()),
            redo_description: stacks.redo.back().map(|a| a.description().to_owned()),
            undo_depth: stacks.undo.len(),
            redo_depth: stacks.redo.len(),
        }
    }

    // ========================================================================
    // Notification
    // ========================================================================

    /// Invoke `listener` after every `push`, `undo`, `redo` and `clear`.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.shared.listeners.subscribe(move |_: &()| listener())
    }

    /// Like [`Self::subscribe`], but hands the listener a fresh [`HistoryStatus`].
    pub fn watch_status(&self, listener: impl Fn(&HistoryStatus) + 'static) -> Subscription {
        let weak = Rc::downgrade(&self.shared);
        self.shared.listeners.subscribe(move |_: &()| {
            if let Some(shared) = weak.upgrade() {
                listener(&UndoRedoManager { shared }.status());
            }
        })
    }

    fn notify(&self) {
        let span = debug_span!("history.notify", listeners = tracing::field::Empty);
        let _enter = span.enter();
        let invoked = self.shared.listeners.notify(&());
        span.record("listeners", invoked as u64);
    }
}

// ============================================================================
// Tests
// ============================================================================
