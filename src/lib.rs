//! # xkbcore
//!
//! A compiler and runtime for keyboard layout descriptions in the XKB family
//! of configuration files.
//!
//! Given a description composed of key codes, key types, compatibility
//! interpretations and symbol bindings — possibly drawn from multiple files
//! via `include` directives with merge semantics — [`Keymap::from_string`]
//! produces an in-memory [`Keymap`]. A [`State`] is then driven by physical
//! key press/release events and derives modifier state, group (layout)
//! state, LED state and keysyms.
//!
//! Included functionality:
//!
//! * [`atom`] interns strings to small opaque handles scoped to a [`Context`].
//! * [`lexer`]/[`parser`] turn XKB source text into an AST ([`ast`]).
//! * [`include`] expands `include` statements with merge-mode composition.
//! * [`compile`] folds AST fragments into the final [`Keymap`] tables,
//!   section by section (key codes, key types, compatibility, symbols).
//! * [`keysym`] is the name/code catalog, including the Unicode range and
//!   the case-folding table the state machine uses for Caps Lock.
//! * [`state`] is the small state machine that turns key events into
//!   effective modifier/group/LED state and keysym lookups.
//! * [`render`] formats modifier masks, action names and key names for
//!   diagnostics, and serializes a [`Keymap`] back to canonical XKB text.

pub mod action;
pub mod ast;
pub mod atom;
pub mod compile;
pub mod context;
pub mod error;
pub mod include;
pub mod keymap;
pub mod keysym;
pub mod lexer;
pub mod modifier;
pub mod names;
pub mod parser;
pub mod render;
pub mod state;

pub use atom::Atom;
pub use context::Context;
pub use error::{Diagnostic, DiagnosticKind, Error, Result, Severity};
pub use keymap::{Key, KeyType, Keymap};
pub use keysym::Keysym;
pub use modifier::{ModMask, ModifierIndex};
pub use names::RuleNames;
pub use state::{KeyDirection, MatchKind, ModComponent, ObservedEvent, State, StateComponent};
