//! The `xkb_types` section compiler (spec §4.5 "Key types"; grounded on
//! `examples/original_source/src/xkbcomp/keytypes.c`).
//!
//! Each `type "NAME" { ... }` body is folded independently (map/preserve
//! entries are ordering-independent within one body — a `preserve[]`
//! statement that precedes its `map[]` synthesizes a `Level1` entry the
//! `map[]` may later override, per `AddPreserve`/`AddMapEntry` in
//! `keytypes.c`). Re-declaration across two type bodies with the same name
//! is whole-type: `override`/`replace` replaces the earlier definition,
//! `augment`/`default` keeps it — matching `AddKeyType`'s `new->merge`
//! branch, not the generic per-field bitmask other sections use, because
//! the original treats a key type as one indivisible unit.
use crate::ast::{Expr, MergeMode, Stmt};
use crate::atom::{Atom, AtomTable};
use crate::compile::expr::{self, EvalContext};
use crate::error::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::keymap::{KeyType, MapEntry};
use crate::modifier::ModNameTable;

/// Compile every `type` statement (after include flattening) into the
/// final `Vec<KeyType>`, registering any `virtual_modifiers` declarations
/// along the way (spec §4.5 "Virtual modifier resolution" begins with
/// these declarations; they may also appear in `xkb_compat`/`xkb_symbols`,
/// so `mods` is threaded through by the caller).
pub fn compile(
    statements: &[(MergeMode, Stmt)],
    atoms: &AtomTable,
    mods: &mut ModNameTable,
    diags: &mut DiagnosticBag,
) -> Vec<KeyType> {
    let mut types: Vec<KeyType> = Vec::new();

    for (merge, stmt) in statements {
        match stmt {
            Stmt::VModDecl(names) => {
                for name in names {
                    mods.declare(*name);
                }
            }
            Stmt::TypeDef { name, statements } => {
                // Rebuilt per type body rather than hoisted above the loop:
                // `mods` may still gain declarations from a later
                // `virtual_modifiers` statement, and holding one borrow
                // across the whole loop would make those `&mut` calls
                // conflict with this one.
                let ctx = EvalContext { atoms, mods };
                let new_type = compile_type_body(*name, statements, &ctx, diags);
                match types.iter().position(|t| t.name == *name) {
                    Some(idx) => match merge.resolved() {
                        MergeMode::Augment => {
                            diags.push(Diagnostic::warning(
                                DiagnosticKind::Semantic,
                                format!(
                                    "multiple definitions of the {} key type; earlier definition kept",
                                    atoms.lookup(*name).unwrap_or("?")
                                ),
                            ));
                        }
                        _ => {
                            diags.push(Diagnostic::warning(
                                DiagnosticKind::Semantic,
                                format!(
                                    "multiple definitions of the {} key type; using the later one",
                                    atoms.lookup(*name).unwrap_or("?")
                                ),
                            ));
                            types[idx] = new_type;
                        }
                    },
                    None => types.push(new_type),
                }
            }
            Stmt::Include(_) => {}
            other => {
                diags.push(Diagnostic::new(
                    DiagnosticKind::Semantic,
                    format!("unexpected statement in xkb_types: {:?}", other),
                ));
            }
        }
    }
    types
}

/// Re-implemented afresh for each `type "NAME" { ... }` body: there is no
/// cross-body merge state to thread through, so this is a clean fold
/// (spec §4.5 key types: `modifiers = <mask>;`, `map[<mask>] = Level<n>;`,
/// `preserve[<mask>] = <mask>;`, `level_name[Level<n>] = "name";`).
fn compile_type_body(name: Atom, statements: &[Stmt], ctx: &EvalContext, diags: &mut DiagnosticBag) -> KeyType {
    let mut ty = KeyType {
        name,
        mods: crate::modifier::ModMask::empty(),
        num_levels: 1,
        map: Vec::new(),
        level_names: Vec::new(),
    };
    let mut mods_defined = false;

    for stmt in statements {
        match stmt {
            Stmt::VarDecl { lhs, value } => {
                let Expr::FieldRef { field, index: None, .. } = lhs else {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::Semantic,
                        "the modifiers field of a key type is not an array",
                    ));
                    continue;
                };
                let Some(field_name) = ctx.atoms.lookup(*field) else { continue };
                if field_name.eq_ignore_ascii_case("modifiers") {
                    if mods_defined {
                        diags.push(Diagnostic::new(
                            DiagnosticKind::Semantic,
                            format!(
                                "multiple modifier mask definitions for key type {}; using the first",
                                ctx.atoms.lookup(name).unwrap_or("?")
                            ),
                        ));
                        continue;
                    }
                    if let Some(mask) = expr::resolve_vmod_mask(value, ctx, diags) {
                        ty.mods = mask;
                        mods_defined = true;
                    }
                } else {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::Semantic,
                        format!("unknown field {} in key type", field_name),
                    ));
                }
            }
            Stmt::ArrayDecl { name: field, index, value } => {
                let Some(field_name) = ctx.atoms.lookup(*field).map(str::to_owned) else {
                    continue;
                };
                if field_name.eq_ignore_ascii_case("map") {
                    set_map_entry(&mut ty, index, value, ctx, diags);
                } else if field_name.eq_ignore_ascii_case("preserve") {
                    set_preserve(&mut ty, index, value, ctx, diags);
                } else if field_name.eq_ignore_ascii_case("level_name") || field_name.eq_ignore_ascii_case("levelname")
                {
                    set_level_name(&mut ty, index, value, ctx, diags);
                } else {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::Semantic,
                        format!("unknown field {} in key type", field_name),
                    ));
                }
            }
            Stmt::Expr(_) => {}
            other => {
                diags.push(Diagnostic::new(
                    DiagnosticKind::Semantic,
                    format!("unexpected statement in a key type body: {:?}", other),
                ));
            }
        }
    }

    while ty.level_names.len() < ty.num_levels as usize {
        ty.level_names.push(None);
    }
    ty
}

fn find_entry_mut<'a>(ty: &'a mut KeyType, mods: crate::modifier::ModMask) -> Option<&'a mut MapEntry> {
    ty.map.iter_mut().find(|e| e.mods == mods)
}

/// `SetMapEntry`/`AddMapEntry` (`keytypes.c`): clips the entry's mask to
/// the type's `modifiers` mask with a warning, then records the highest
/// level index seen as `num_levels`.
fn set_map_entry(ty: &mut KeyType, index: &Expr, value: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) {
    let Some(mut mask) = expr::resolve_vmod_mask(index, ctx, diags) else {
        return;
    };
    if !ty.mods.contains(mask) {
        diags.push(Diagnostic::warning(
            DiagnosticKind::Semantic,
            "map entry for unused modifiers in key type; clipped to the type's modifier mask",
        ));
        mask &= ty.mods;
    }
    let Some(level) = expr::resolve_level(value, ctx, diags) else {
        return;
    };
    if level + 1 > ty.num_levels {
        ty.num_levels = level + 1;
    }
    match find_entry_mut(ty, mask) {
        Some(existing) => existing.level = level,
        None => ty.map.push(MapEntry {
            mods: mask,
            level,
            preserve: crate::modifier::ModMask::empty(),
        }),
    }
}

/// `SetPreserve`/`AddPreserve`: a `preserve[]` for a mask with no matching
/// `map[]` yet synthesizes a `Level1` entry (spec §4.5, SPEC_FULL §B.7
/// "ordering-independence").
fn set_preserve(ty: &mut KeyType, index: &Expr, value: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) {
    let Some(mut mask) = expr::resolve_vmod_mask(index, ctx, diags) else {
        return;
    };
    if !ty.mods.contains(mask) {
        diags.push(Diagnostic::warning(
            DiagnosticKind::Semantic,
            "preserve for modifiers not used by the type; index clipped to the type's modifier mask",
        ));
        mask &= ty.mods;
    }
    let Some(mut preserve) = expr::resolve_vmod_mask(value, ctx, diags) else {
        return;
    };
    if !mask.contains(preserve) {
        diags.push(Diagnostic::warning(
            DiagnosticKind::Semantic,
            "illegal value for preserve[]; converted to a subset of the map entry's mask",
        ));
        preserve &= mask;
    }
    match find_entry_mut(ty, mask) {
        Some(existing) => existing.preserve = preserve,
        None => ty.map.push(MapEntry { mods: mask, level: 0, preserve }),
    }
}

fn set_level_name(ty: &mut KeyType, index: &Expr, value: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) {
    let Some(level) = expr::resolve_level(index, ctx, diags) else {
        return;
    };
    let Some(name) = expr::resolve_string(value, ctx, diags) else {
        return;
    };
    let level = level as usize;
    while ty.level_names.len() <= level {
        ty.level_names.push(None);
    }
    let atom = ctx.atoms.find_ignore_ascii_case(&name);
    // Level names aren't looked up again once set, so a not-yet-interned
    // name has no atom to borrow; callers needing round-trip text use
    // `resolve_string` output directly. In practice `parser.rs` always
    // interns string literals, so this lookup succeeds.
    ty.level_names[level] = atom;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modifier::{ModMask, ModifierIndex};

    fn parse_types(src: &str) -> (Vec<KeyType>, AtomTable, DiagnosticBag) {
        let mut atoms = AtomTable::new();
        let (file, parse_diags) = crate::parser::parse(src, "test.xkb", &mut atoms);
        assert!(parse_diags.is_empty(), "{:?}", parse_diags.diagnostics());
        let section = &file.sections[0];
        let stmts: Vec<_> = section.statements.iter().map(|s| (MergeMode::Override, s.clone())).collect();
        let mut mods = ModNameTable::new();
        let mut diags = DiagnosticBag::new();
        let types = compile(&stmts, &atoms, &mut mods, &mut diags);
        (types, atoms, diags)
    }

    #[test]
    fn four_level_type_with_preserve() {
        let (types, _atoms, diags) = parse_types(
            r#"
            xkb_types "test" {
                virtual_modifiers LevelThree;
                type "FOUR_LEVEL" {
                    modifiers = Shift+LevelThree;
                    map[Shift] = Level2;
                    map[LevelThree] = Level3;
                    map[Shift+LevelThree] = Level4;
                    preserve[Shift+LevelThree] = LevelThree;
                };
            };
        "#,
        );
        assert!(diags.is_empty(), "{:?}", diags.diagnostics());
        let ty = &types[0];
        assert_eq!(ty.num_levels, 4);
        let combo = ty.map.iter().find(|e| e.level == 3).unwrap();
        assert_eq!(combo.mods, ModMask::SHIFT | ModifierIndex(8).mask());
        assert_eq!(combo.preserve, ModifierIndex(8).mask());
    }

    #[test]
    fn preserve_before_map_synthesizes_level1() {
        let (types, _atoms, diags) = parse_types(
            r#"
            xkb_types "test" {
                type "WEIRD" {
                    modifiers = Shift+Lock;
                    preserve[Shift+Lock] = Lock;
                    map[Shift+Lock] = Level2;
                };
            };
        "#,
        );
        assert!(diags.is_empty(), "{:?}", diags.diagnostics());
        let ty = &types[0];
        let entry = ty.map.iter().find(|e| e.mods == (ModMask::SHIFT | ModMask::LOCK)).unwrap();
        assert_eq!(entry.level, 1);
        assert_eq!(entry.preserve, ModMask::LOCK);
    }
}
