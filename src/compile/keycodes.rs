//! The `xkb_keycodes` section compiler (spec §4.5, data-model half of §3
//! "Key"): folds `key <NAME> = <code>;` and `alias <alias> = <real>;`
//! statements into a keycode→name table plus the alias table, honoring the
//! same augment/override/replace merge table every other section compiler
//! uses (spec §4.5 "Merge semantics"). Out of scope per spec §1, the
//! original's `xkbcomp/keycodes.c` is not in `original_source/`; this is
//! reconstructed directly from the statement shapes `parser.rs` produces.
use crate::ast::{MergeMode, Stmt};
use crate::compile::expr::{self, EvalContext};
use crate::error::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::keymap::KeyName;
use std::collections::BTreeMap;

/// Staged result of compiling one `xkb_keycodes` section (plus its
/// includes): a sparse keycode→name table and the alias list, not yet
/// folded into [`crate::keymap::Key`] records (symbols/types attach to
/// those later).
#[derive(Debug, Default)]
pub struct KeycodesInfo {
    pub keys: BTreeMap<u8, KeyName>,
    pub aliases: Vec<(KeyName, KeyName)>,
}

impl KeycodesInfo {
    /// `(min_keycode, max_keycode)` spanning every declared key, or `(0, 0)`
    /// for an empty section (spec §3 "Keymap" min/max keycode bounds).
    pub fn bounds(&self) -> (u8, u8) {
        match (self.keys.keys().next(), self.keys.keys().next_back()) {
            (Some(&min), Some(&max)) => (min, max),
            _ => (0, 0),
        }
    }
}

/// Fold a flattened `(merge, stmt)` stream into a [`KeycodesInfo`] (spec
/// §4.5: "A compile pass does three things per statement: resolve LHS,
/// dispatch to a field handler, update the bitmask" — here the "field" is
/// simply "is this keycode already assigned").
pub fn compile(statements: &[(MergeMode, Stmt)], ctx: &EvalContext, diags: &mut DiagnosticBag) -> KeycodesInfo {
    let mut info = KeycodesInfo::default();
    for (merge, stmt) in statements {
        match stmt {
            Stmt::KeyCodeDecl { name, keycode } => {
                let Some(code) = expr::resolve_integer(keycode, ctx, diags) else {
                    continue;
                };
                if !(0..=255).contains(&code) {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::Semantic,
                        format!("illegal keycode {} for key {}, must be 0..255", code, name),
                    ));
                    continue;
                }
                let code = code as u8;
                let already = info.keys.get(&code).copied();
                match already {
                    Some(existing) if existing == *name => {}
                    Some(_) if matches!(merge, MergeMode::Augment) => {
                        diags.push(Diagnostic::warning(
                            DiagnosticKind::Semantic,
                            format!("keycode {} already assigned; ignoring redefinition as {}", code, name),
                        ));
                    }
                    _ => {
                        info.keys.insert(code, *name);
                    }
                }
            }
            Stmt::AliasDecl { alias, real } => {
                if let Some(existing) = info.aliases.iter_mut().find(|(a, _)| a == alias) {
                    if matches!(merge, MergeMode::Override | MergeMode::Replace) {
                        existing.1 = *real;
                    }
                } else {
                    info.aliases.push((*alias, *real));
                }
            }
            Stmt::Include(_) => {
                // Flattened away by `include::flatten_statements` before
                // this function ever sees the statement stream.
            }
            Stmt::VModDecl(_) => {
                // `virtual_modifiers` may legally appear here too, but
                // nothing in xkb_keycodes consumes virtual modifiers; the
                // types/compat/symbols compilers own that table.
            }
            other => {
                diags.push(Diagnostic::new(
                    DiagnosticKind::Semantic,
                    format!("unexpected statement in xkb_keycodes: {:?}", other),
                ));
            }
        }
    }
    info
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::atom::AtomTable;
    use crate::modifier::ModNameTable;

    fn ctx_fixture<'a>(atoms: &'a AtomTable, mods: &'a ModNameTable) -> EvalContext<'a> {
        EvalContext { atoms, mods }
    }

    #[test]
    fn bounds_span_declared_keys() {
        let atoms = AtomTable::new();
        let mods = ModNameTable::new();
        let ctx = ctx_fixture(&atoms, &mods);
        let mut diags = DiagnosticBag::new();
        let stmts = vec![
            (
                MergeMode::Override,
                Stmt::KeyCodeDecl {
                    name: KeyName::new("ESC"),
                    keycode: crate::ast::Expr::Integer(9),
                },
            ),
            (
                MergeMode::Override,
                Stmt::KeyCodeDecl {
                    name: KeyName::new("AE01"),
                    keycode: crate::ast::Expr::Integer(10),
                },
            ),
        ];
        let info = compile(&stmts, &ctx, &mut diags);
        assert_eq!(info.bounds(), (9, 10));
        assert!(diags.is_empty());
    }

    #[test]
    fn augment_keeps_existing_assignment() {
        let atoms = AtomTable::new();
        let mods = ModNameTable::new();
        let ctx = ctx_fixture(&atoms, &mods);
        let mut diags = DiagnosticBag::new();
        let stmts = vec![
            (
                MergeMode::Override,
                Stmt::KeyCodeDecl {
                    name: KeyName::new("ESC"),
                    keycode: crate::ast::Expr::Integer(9),
                },
            ),
            (
                MergeMode::Augment,
                Stmt::KeyCodeDecl {
                    name: KeyName::new("TLDE"),
                    keycode: crate::ast::Expr::Integer(9),
                },
            ),
        ];
        let info = compile(&stmts, &ctx, &mut diags);
        assert_eq!(info.keys.get(&9), Some(&KeyName::new("ESC")));
        assert!(!diags.is_empty());
    }
}
