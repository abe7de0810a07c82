#![forbid(unsafe_code)]

//! Snapshot-swapping actions over a shared in-memory list.
//!
//! Imports and renewals in the dashboard replace the loaded subscription list
//! wholesale. [`SharedList`] holds that list behind a cloneable handle, and
//! [`SharedList::record_change`] applies an edit and records an action that
//! swaps between the before/after snapshots.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::command::{ActionBuilder, UndoRedoAction};
use super::history::UndoRedoManager;

/// Cloneable handle to a list shared between the UI and recorded actions.
pub struct SharedList<T> {
    items: Rc<RefCell<Vec<T>>>,
}

impl<T> Clone for SharedList<T> {
    fn clone(&self) -> Self {
        Self {
            items: Rc::clone(&self.items),
        }
    }
}

impl<T> Default for SharedList<T> {
    fn default() -> Self {
        Self {
            items: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.borrow().iter()).finish()
    }
}

impl<T: Clone + 'static> SharedList<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
        }
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Replace the contents, returning the previous ones.
    pub fn replace(&self, items: Vec<T>) -> Vec<T> {
        std::mem::replace(&mut *self.items.borrow_mut(), items)
    }

    /// Apply `edit` now and record an action that can revert it.
    ///
    /// The builder supplies kind, description and payloads; the closures are
    /// generated from the before/after snapshots.
    pub fn record_change(
        &self,
        history: &UndoRedoManager,
        builder: ActionBuilder,
        edit: impl FnOnce(&mut Vec<T>),
    ) {
        let before = self.snapshot();
        edit(&mut self.items.borrow_mut());
        let after = self.snapshot();
        history.push(replace_list_action(self, builder, before, after));
    }
}

/// Build an action that swaps `list` between `before` (undo) and `after` (redo).
pub fn replace_list_action<T: Clone + 'static>(
    list: &SharedList<T>,
    builder: ActionBuilder,
    before: Vec<T>,
    after: Vec<T>,
) -> UndoRedoAction {
    let (undo_list, redo_list) = (list.clone(), list.clone());
    builder.build(
        move || {
            undo_list.replace(before.clone());
            Ok(())
        },
        move || {
            redo_list.replace(after.clone());
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::undo::command::kinds;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: u32,
        renewed_until: &'static str,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 1, renewed_until: "2026-03-01" },
            Row { id: 2, renewed_until: "2026-05-01" },
        ]
    }

    #[test]
    fn import_is_undoable() {
        let history = UndoRedoManager::default();
        let list = SharedList::new(rows());

        list.record_change(&history, ActionBuilder::data_import("Import 1 row"), |items| {
            *items = vec![Row { id: 9, renewed_until: "2027-01-01" }];
        });

        assert_eq!(list.len(), 1);
        assert_eq!(history.undo_stack()[0].kind, kinds::DATA_IMPORT);

        history.undo();
        assert_eq!(list.snapshot(), rows());
        history.redo();
        assert_eq!(list.snapshot()[0].id, 9);
    }

    #[test]
    fn bulk_renewal_round_trip() {
        let history = UndoRedoManager::default();
        let list = SharedList::new(rows());

        list.record_change(&history, ActionBuilder::bulk_renewal("Renew 2"), |items| {
            for row in items.iter_mut() {
                row.renewed_until = "2027-06-01";
            }
        });
        let renewed = list.snapshot();

        history.undo();
        history.redo();
        assert_eq!(list.snapshot(), renewed);
    }

    #[test]
    fn replace_returns_previous() {
        let list = SharedList::new(vec![1, 2, 3]);
        assert_eq!(list.replace(vec![4]), vec![1, 2, 3]);
        assert_eq!(list.snapshot(), vec![4]);
        assert!(!list.is_empty());
    }
}
