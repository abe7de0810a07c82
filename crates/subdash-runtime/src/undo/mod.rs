#![forbid(unsafe_code)]

//! Undo/redo action history.
//!
//! Reversible operations follow the Command Pattern. Every recorded action
//! carries the closures that revert and reapply it, so the history itself
//! never holds application data.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        UndoRedoManager                          │
//! │  ┌──────────────────┐          ┌──────────────────┐             │
//! │  │   Undo Stack     │          │   Redo Stack     │             │
//! │  │  ┌────────────┐  │          │  ┌────────────┐  │             │
//! │  │  │ ActionN    │  │  undo()  │  │ Action1    │  │             │
//! │  │  ├────────────┤  │ ──────►  │  ├────────────┤  │             │
//! │  │  │ Action2    │  │          │  │ Action2    │  │             │
//! │  │  ├────────────┤  │  ◄────── │  ├────────────┤  │             │
//! │  │  │ Action1    │  │  redo()  │  │ ActionN    │  │             │
//! │  │  └────────────┘  │          │  └────────────┘  │             │
//! │  └──────────────────┘          └──────────────────┘             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use subdash_runtime::undo::{ActionBuilder, SharedList, UndoRedoManager};
//!
//! let history = UndoRedoManager::default();
//! let subscriptions = SharedList::new(load_rows());
//!
//! subscriptions.record_change(&history, ActionBuilder::renewal("Renew Acme"), |rows| {
//!     rows[0].renewed_until = next_term(rows[0].renewed_until);
//! });
//!
//! history.undo();
//! ```
//!
//! # Design Notes
//!
//! ## Why Actions Store Callbacks
//!
//! Actions cannot borrow the application state they change. They own
//! closures over shared handles instead, which lets them:
//!
//! 1. Live in the history (owned, not borrowed)
//! 2. Leave it to the caller how an effect is applied
//! 3. Work for any effect: list swaps today, database writes later
//!
//! ## Failed Reversals
//!
//! A closure that fails leaves application state in an unknown shape, so its
//! action is discarded rather than moved to the opposite stack.

pub mod command;
pub mod history;
pub mod list;
pub mod shortcut;

pub use command::{
    ActionBuilder, ActionId, ActionSnapshot, CommandError, CommandResult, FnPair, Reversible,
    UndoRedoAction, kinds,
};
pub use history::{HistoryConfig, HistoryStatus, UndoRedoManager};
pub use list::{SharedList, replace_list_action};
pub use shortcut::{HistoryKeybindings, HistoryShortcut, KeyChord, Modifiers};
