#![forbid(unsafe_code)]

//! Keyboard bindings for undo/redo.
//!
//! Defaults: `Ctrl+Z` undoes, `Ctrl+Y` and `Ctrl+Shift+Z` redo. `Super`
//! (Cmd on macOS) is accepted wherever `Ctrl` is.

use bitflags::bitflags;

bitflags! {
    /// Modifier keys held during a key press.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const NONE  = 0b0000;
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// History operation bound to a key chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryShortcut {
    Undo,
    Redo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    key: char,
    modifiers: Modifiers,
}

impl KeyChord {
    #[must_use]
    pub const fn new(key: char, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    fn matches(self, key: char, modifiers: Modifiers) -> bool {
        self.key.eq_ignore_ascii_case(&key) && self.modifiers == normalize(modifiers)
    }
}

/// Treat Cmd like Ctrl so one binding table serves every platform.
fn normalize(modifiers: Modifiers) -> Modifiers {
    if modifiers.contains(Modifiers::SUPER) {
        (modifiers - Modifiers::SUPER) | Modifiers::CTRL
    } else {
        modifiers
    }
}

/// Key chords mapped to history operations.
#[derive(Debug, Clone)]
pub struct HistoryKeybindings {
    undo: KeyChord,
    redo_primary: KeyChord,
    redo_secondary: KeyChord,
}

impl Default for HistoryKeybindings {
    fn default() -> Self {
        Self {
            undo: KeyChord::new('z', Modifiers::CTRL),
            redo_primary: KeyChord::new('y', Modifiers::CTRL),
            redo_secondary: KeyChord::new('z', Modifiers::CTRL.union(Modifiers::SHIFT)),
        }
    }
}

impl HistoryKeybindings {
    #[must_use]
    pub fn new(undo: KeyChord, redo_primary: KeyChord, redo_secondary: KeyChord) -> Self {
        Self {
            undo,
            redo_primary,
            redo_secondary,
        }
    }

    /// Resolve a key press, or `None` when it is not a history chord.
    #[must_use]
    pub fn resolve(&self, key: char, modifiers: Modifiers) -> Option<HistoryShortcut> {
        if self.undo.matches(key, modifiers) {
            Some(HistoryShortcut::Undo)
        } else if self.redo_primary.matches(key, modifiers)
            || self.redo_secondary.matches(key, modifiers)
        {
            Some(HistoryShortcut::Redo)
        } else {
            None
        }
    }
}

impl HistoryShortcut {
    /// Resolve against the default bindings.
    #[must_use]
    pub fn from_key(key: char, modifiers: Modifiers) -> Option<Self> {
        HistoryKeybindings::default().resolve(key, modifiers)
    }
}
