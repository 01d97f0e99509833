//! Expression evaluation (spec §4.2 "Expression evaluator").
//!
//! Every `resolve_*` function here mirrors one of the original's
//! `ExprResolve*` helpers (`expr.c`): given an [`Expr`] node and the tables
//! needed to interpret bare identifiers, produce a typed value or push a
//! diagnostic and return `None`. Callers (chiefly [`crate::action`] and the
//! not-yet-written section compilers) treat `None` as a per-field recoverable
//! failure, never a hard abort (spec §7).
use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::atom::AtomTable;
use crate::error::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::keymap::KeyName;
use crate::modifier::{ModMask, ModNameTable};

/// Bundles the two tables a bare identifier needs resolving against: the
/// atom table backing every interned name, and the dynamically grown table
/// of declared virtual modifiers (spec §4.5 "Virtual modifier resolution").
/// Kept as a pair rather than folding `mods` into [`AtomTable`] because the
/// virtual modifier table is section-compilation state, not string storage.
pub struct EvalContext<'a> {
    pub atoms: &'a AtomTable,
    pub mods: &'a ModNameTable,
}

fn type_error(diags: &mut DiagnosticBag, wanted: &str, expr: &Expr) {
    diags.push(Diagnostic::new(
        DiagnosticKind::Semantic,
        format!("expected a {} value, found {:?}", wanted, expr),
    ));
}

/// `ExprResolveBoolean`: accepts a literal boolean, a nonzero integer, or
/// one of the conventional yes/no/on/off/true/false identifiers (case
/// insensitive, spec §4.3).
pub fn resolve_boolean(expr: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) -> Option<bool> {
    match expr {
        Expr::Boolean(b) => Some(*b),
        Expr::Integer(i) => Some(*i != 0),
        Expr::Ident(atom) => {
            let name = ctx.atoms.lookup(*atom)?;
            match name.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Some(true),
                "false" | "no" | "off" => Some(false),
                _ => {
                    type_error(diags, "boolean", expr);
                    None
                }
            }
        }
        Expr::Unary(UnaryOp::Not, inner) => resolve_boolean(inner, ctx, diags).map(|b| !b),
        _ => {
            type_error(diags, "boolean", expr);
            None
        }
    }
}

/// `ExprResolveInteger`: literal integers, unary +/-, and +-*/ over
/// sub-expressions that themselves resolve to integers.
pub fn resolve_integer(expr: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) -> Option<i32> {
    match expr {
        Expr::Integer(i) => Some(*i as i32),
        Expr::Float(f) => Some(*f as i32),
        Expr::Unary(UnaryOp::Negate, inner) => {
            let v = resolve_integer(inner, ctx, diags)?;
            match v.checked_neg() {
                Some(v) => Some(v),
                None => {
                    diags.push(Diagnostic::new(DiagnosticKind::Semantic, "integer overflow"));
                    None
                }
            }
        }
        Expr::Unary(UnaryOp::Plus, inner) => resolve_integer(inner, ctx, diags),
        Expr::Binary(op, lhs, rhs) => {
            let l = resolve_integer(lhs, ctx, diags)?;
            let r = resolve_integer(rhs, ctx, diags)?;
            let result = match op {
                BinaryOp::Add => l.checked_add(r),
                BinaryOp::Subtract => l.checked_sub(r),
                BinaryOp::Multiply => l.checked_mul(r),
                BinaryOp::Divide => {
                    if r == 0 {
                        diags.push(Diagnostic::new(DiagnosticKind::Semantic, "division by zero"));
                        return None;
                    }
                    l.checked_div(r)
                }
            };
            match result {
                Some(v) => Some(v),
                None => {
                    diags.push(Diagnostic::new(DiagnosticKind::Semantic, "integer overflow"));
                    None
                }
            }
        }
        _ => {
            type_error(diags, "integer", expr);
            None
        }
    }
}

/// `ExprResolveString`: a literal string, or an identifier treated as its
/// own name (bare words are accepted as one-word strings in a few grammar
/// positions, e.g. `data` on an `ActionMessage`).
pub fn resolve_string(expr: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) -> Option<String> {
    match expr {
        Expr::String(s) => Some(s.clone()),
        Expr::Ident(atom) => ctx.atoms.dup(*atom),
        _ => {
            type_error(diags, "string", expr);
            None
        }
    }
}

/// A button/count/index value, clamped to the 0..=255 byte range every
/// caller needs (spec SPEC_FULL §B.4 pointer-action fields).
pub fn resolve_button(expr: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) -> Option<u8> {
    match resolve_integer(expr, ctx, diags) {
        Some(v) if (0..=255).contains(&v) => Some(v as u8),
        Some(_) => {
            diags.push(Diagnostic::new(
                DiagnosticKind::Semantic,
                "illegal value, expected a number between 0 and 255",
            ));
            None
        }
        None => None,
    }
}

/// The raw, non-decremented `1..=8` magnitude a group-field expression
/// carries before sign handling decides whether it is absolute or relative
/// (`CheckGroupField` in `action.c`; SPEC_FULL §B.5). Callers apply the
/// sign/decrement themselves; this only validates the range.
pub fn resolve_group_magnitude(
    expr: &Expr,
    ctx: &EvalContext,
    diags: &mut DiagnosticBag,
) -> Option<u32> {
    match resolve_integer(expr, ctx, diags) {
        Some(v) if (1..=8).contains(&v) => Some(v as u32),
        Some(_) => {
            diags.push(Diagnostic::new(
                DiagnosticKind::Semantic,
                "illegal group index, must be in the range 1..8",
            ));
            None
        }
        None => None,
    }
}

/// A `Group<n>` identifier (or bare integer) used as an array index, e.g.
/// `symbols[Group2]`: 1-based in source, 0-based once resolved, range
/// `1..=8` (spec §4.2 "group index"). Distinct from
/// [`resolve_group_magnitude`], which a `SetGroup`/`LockGroup` action field
/// consumes before applying its own sign/relative handling.
pub fn resolve_group_index(expr: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) -> Option<u32> {
    let one_based = match expr {
        Expr::Integer(i) => *i,
        Expr::Ident(atom) => {
            let name = ctx.atoms.lookup(*atom)?;
            let digits = name
                .strip_prefix("Group")
                .or_else(|| name.strip_prefix("group"))
                .unwrap_or(name);
            match digits.parse::<i64>() {
                Ok(n) => n,
                Err(_) => {
                    type_error(diags, "group name (Group<n>)", expr);
                    return None;
                }
            }
        }
        _ => {
            type_error(diags, "group name (Group<n>)", expr);
            return None;
        }
    };
    if !(1..=8).contains(&one_based) {
        diags.push(Diagnostic::new(
            DiagnosticKind::Semantic,
            "illegal group index, must be in the range 1..8",
        ));
        return None;
    }
    Some((one_based - 1) as u32)
}

/// A `Level<n>` identifier (or bare integer), 1-based in source and 0-based
/// once resolved (spec §4.2 "level index").
pub fn resolve_level(expr: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) -> Option<u32> {
    let one_based = match expr {
        Expr::Integer(i) => *i,
        Expr::Ident(atom) => {
            let name = ctx.atoms.lookup(*atom)?;
            let digits = name
                .strip_prefix("Level")
                .or_else(|| name.strip_prefix("level"))
                .unwrap_or(name);
            match digits.parse::<i64>() {
                Ok(n) => n,
                Err(_) => {
                    type_error(diags, "level name (Level<n>)", expr);
                    return None;
                }
            }
        }
        _ => {
            type_error(diags, "level name (Level<n>)", expr);
            return None;
        }
    };
    if one_based < 1 {
        diags.push(Diagnostic::new(
            DiagnosticKind::Semantic,
            "level index must be 1 or greater",
        ));
        return None;
    }
    Some((one_based - 1) as u32)
}

/// `ExprResolveKeyName`: a bare identifier naming a key, as it appears in
/// `key= <AE01>` action fields. The parser folds `<...>` key-name tokens
/// into plain identifiers in expression position, so this is just an atom
/// lookup dressed up as a [`KeyName`].
pub fn resolve_key_name(expr: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) -> Option<KeyName> {
    match expr {
        Expr::Ident(atom) => ctx.atoms.lookup(*atom).map(KeyName::new),
        _ => {
            type_error(diags, "key name", expr);
            None
        }
    }
}

/// `ExprResolveModMask` generalized over real *and* virtual modifiers (spec
/// §4.2 "real+virtual modifier mask"): bare identifiers resolve through
/// [`ModNameTable::resolve_name`], and `+`/`-` combine masks the way
/// `none`/`all` and named bits combine in `ExprResolveMask`.
pub fn resolve_vmod_mask(expr: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) -> Option<ModMask> {
    match expr {
        Expr::Integer(i) => Some(ModMask::from_bits_truncate(*i as u32)),
        Expr::Ident(atom) => {
            let name = ctx.atoms.lookup(*atom)?;
            if name.eq_ignore_ascii_case("none") {
                return Some(ModMask::empty());
            }
            if name.eq_ignore_ascii_case("all") {
                return Some(ModMask::ALL_MODS_MASK);
            }
            match ctx.mods.resolve_name(name, ctx.atoms) {
                Some(idx) => Some(idx.mask()),
                None => {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::Semantic,
                        format!("unknown modifier {}", name),
                    ));
                    None
                }
            }
        }
        Expr::Binary(BinaryOp::Add, lhs, rhs) => {
            let l = resolve_vmod_mask(lhs, ctx, diags)?;
            let r = resolve_vmod_mask(rhs, ctx, diags)?;
            Some(l | r)
        }
        Expr::Binary(BinaryOp::Subtract, lhs, rhs) => {
            let l = resolve_vmod_mask(lhs, ctx, diags)?;
            let r = resolve_vmod_mask(rhs, ctx, diags)?;
            let mut result = l;
            result.remove(r);
            Some(result)
        }
        Expr::KeysymList(_) | Expr::ActionList(_) => {
            type_error(diags, "modifier mask", expr);
            None
        }
        _ => {
            type_error(diags, "modifier mask", expr);
            None
        }
    }
}

/// `ExprResolveMask` (`expr.c`): a bitmask built out of named bits from
/// `table` (case insensitive), combined with `+`/`-`, or given directly as
/// an integer literal.
pub fn resolve_mask(
    expr: &Expr,
    ctx: &EvalContext,
    table: &[(&str, u32)],
    diags: &mut DiagnosticBag,
) -> Option<u32> {
    match expr {
        Expr::Integer(i) => Some(*i as u32),
        Expr::Ident(atom) => {
            let name = ctx.atoms.lookup(*atom)?;
            table
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, bits)| *bits)
                .or_else(|| {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::Semantic,
                        format!("unknown keyword {}", name),
                    ));
                    None
                })
        }
        Expr::Binary(BinaryOp::Add, lhs, rhs) => {
            let l = resolve_mask(lhs, ctx, table, diags)?;
            let r = resolve_mask(rhs, ctx, table, diags)?;
            Some(l | r)
        }
        Expr::Binary(BinaryOp::Subtract, lhs, rhs) => {
            let l = resolve_mask(lhs, ctx, table, diags)?;
            let r = resolve_mask(rhs, ctx, table, diags)?;
            Some(l & !r)
        }
        _ => {
            type_error(diags, "mask", expr);
            None
        }
    }
}

/// `ExprResolveEnum` (`expr.c`): exactly one named value from `table`, no
/// combination allowed (used for fields like `LockPtrBtn`'s `affect`, which
/// picks `lock`/`unlock`/`both`/`neither`, not a sum of bits).
pub fn resolve_enum(
    expr: &Expr,
    ctx: &EvalContext,
    table: &[(&str, u32)],
    diags: &mut DiagnosticBag,
) -> Option<u32> {
    match expr {
        Expr::Ident(atom) => {
            let name = ctx.atoms.lookup(*atom)?;
            table
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| *v)
                .or_else(|| {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::Semantic,
                        format!("unknown keyword {}", name),
                    ));
                    None
                })
        }
        _ => {
            type_error(diags, "enumerated value", expr);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modifier::ModifierIndex;

    fn ctx_fixture<'a>(atoms: &'a AtomTable, mods: &'a ModNameTable) -> EvalContext<'a> {
        EvalContext { atoms, mods }
    }

    #[test]
    fn integer_arithmetic() {
        let atoms = AtomTable::new();
        let mods = ModNameTable::new();
        let ctx = ctx_fixture(&atoms, &mods);
        let mut diags = DiagnosticBag::new();
        let e = Expr::Binary(
            BinaryOp::Add,
            Box::new(Expr::Integer(2)),
            Box::new(Expr::Binary(
                BinaryOp::Multiply,
                Box::new(Expr::Integer(3)),
                Box::new(Expr::Integer(4)),
            )),
        );
        assert_eq!(resolve_integer(&e, &ctx, &mut diags), Some(14));
        assert!(diags.is_empty());
    }

    #[test]
    fn vmod_mask_resolves_real_and_named() {
        let mut atoms = AtomTable::new();
        let mut mods = ModNameTable::new();
        let lvl3 = atoms.intern("LevelThree", None);
        mods.declare(lvl3);
        let ctx = ctx_fixture(&atoms, &mods);
        let mut diags = DiagnosticBag::new();

        let shift = Expr::Ident(atoms.intern("Shift", None));
        assert_eq!(resolve_vmod_mask(&shift, &ctx, &mut diags), Some(ModMask::SHIFT));

        let named = Expr::Ident(atoms.find_ignore_ascii_case("LevelThree").unwrap());
        let resolved = resolve_vmod_mask(&named, &ctx, &mut diags).unwrap();
        assert!(resolved.has(ModifierIndex(8)));
        assert!(diags.is_empty());
    }

    #[test]
    fn group_magnitude_rejects_out_of_range() {
        let atoms = AtomTable::new();
        let mods = ModNameTable::new();
        let ctx = ctx_fixture(&atoms, &mods);
        let mut diags = DiagnosticBag::new();
        assert_eq!(resolve_group_magnitude(&Expr::Integer(9), &ctx, &mut diags), None);
        assert!(!diags.is_empty());
    }

    #[test]
    fn mask_combines_named_bits() {
        let mut atoms = AtomTable::new();
        let mods = ModNameTable::new();
        let table: &[(&str, u32)] = &[("repeat", 1), ("slow", 2)];
        let e = Expr::Binary(
            BinaryOp::Add,
            Box::new(Expr::Ident(atoms.intern("repeat", None))),
            Box::new(Expr::Ident(atoms.intern("slow", None))),
        );
        let ctx = ctx_fixture(&atoms, &mods);
        let mut diags = DiagnosticBag::new();
        assert_eq!(resolve_mask(&e, &ctx, table, &mut diags), Some(3));
    }
}
