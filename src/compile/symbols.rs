//! The `xkb_symbols` section compiler (spec §4.5 "Symbols" and "Modifier
//! map"; spec §4.5 "Virtual modifier resolution" begins here since a key's
//! `vmod_contribution` is read off the compat pass's interpretations). No
//! `original_source/` file covers this pass directly (`xkbcomp/symbols.c`
//! is not in the retrieved pack); grounded on spec.md's own description of
//! the canonical type-shape classifier and on the merge/staging pattern
//! established in [`crate::compile::keycodes`] and [`crate::compile::types`].
use crate::action::Action;
use crate::ast::{Expr, MergeMode, Stmt};
use crate::atom::{Atom, AtomTable};
use crate::compile::compat::CompatInfo;
use crate::compile::expr::{self, EvalContext};
use crate::error::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::keymap::{Group, Key, KeyName, KeyType, Level};
use crate::keysym::{self, Keysym};
use crate::modifier::{ModMask, ModNameTable, ModifierIndex};
use fnv::FnvHashMap;

#[derive(Debug, Default)]
struct RawGroup {
    type_name: Option<Atom>,
    syms: Vec<Keysym>,
    actions: Vec<Option<Action>>,
}

#[derive(Debug, Default)]
struct RawKey {
    groups: std::collections::BTreeMap<u32, RawGroup>,
    default_type: Option<Atom>,
    repeat: Option<bool>,
    vmod: ModMask,
    explicit_mod_map: ModMask,
}

#[derive(Debug, Default)]
pub struct SymbolsInfo {
    pub keys: FnvHashMap<KeyName, Key>,
    /// `name[Group1]="English (US)";`-style group labels, 0-based
    /// (spec §3 "Keymap" per-group name atoms).
    pub group_names: Vec<Option<Atom>>,
}

pub fn compile(
    statements: &[(MergeMode, Stmt)],
    atoms: &mut AtomTable,
    mods: &mut ModNameTable,
    types: &mut Vec<KeyType>,
    compat: &CompatInfo,
    diags: &mut DiagnosticBag,
) -> SymbolsInfo {
    let mut raw_keys: FnvHashMap<KeyName, RawKey> = FnvHashMap::default();
    let mut mod_map: Vec<(ModifierIndex, KeyName)> = Vec::new();
    let mut group_names: Vec<Option<Atom>> = Vec::new();

    for (_merge, stmt) in statements {
        match stmt {
            Stmt::VModDecl(names) => {
                for name in names {
                    mods.declare(*name);
                }
            }
            Stmt::SymbolsDef { name, statements } => {
                let raw = compile_key_body(statements, atoms, mods, diags);
                raw_keys.insert(*name, raw);
            }
            Stmt::ArrayDecl { name: field, index, value } => {
                let field_name = atoms.lookup(*field).map(str::to_owned);
                if field_name.as_deref().map(|n| n.eq_ignore_ascii_case("name")).unwrap_or(false) {
                    let ctx = EvalContext { atoms, mods };
                    let Some(group_idx) = expr::resolve_group_index(index, &ctx, diags) else { continue };
                    let Some(label) = expr::resolve_string(value, &ctx, diags) else { continue };
                    let atom = atoms.find_ignore_ascii_case(&label).unwrap_or_else(|| atoms.intern(&label, None));
                    let idx = group_idx as usize;
                    while group_names.len() <= idx {
                        group_names.push(None);
                    }
                    group_names[idx] = Some(atom);
                } else {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::Semantic,
                        format!("unexpected top-level array field {:?} in xkb_symbols", field_name),
                    ));
                }
            }
            Stmt::ModMapDecl { modifier, keys } => {
                let mod_name = atoms.lookup(*modifier).map(str::to_owned);
                let Some(mod_name) = mod_name else { continue };
                match mods.resolve_name(&mod_name, atoms) {
                    Some(idx) => {
                        for k in keys {
                            mod_map.push((idx, *k));
                        }
                    }
                    None => diags.push(Diagnostic::new(
                        DiagnosticKind::Semantic,
                        format!("unknown modifier {} in modifier_map", mod_name),
                    )),
                }
            }
            Stmt::Include(_) => {}
            other => {
                diags.push(Diagnostic::new(
                    DiagnosticKind::Semantic,
                    format!("unexpected statement in xkb_symbols: {:?}", other),
                ));
            }
        }
    }

    // `modifier_map` binds real-modifier indices to keys; "multiple
    // modifiers may not map to the same key (latest wins with a warning)"
    // (spec §4.5 "Modifier map").
    let mut mod_map_by_key: FnvHashMap<KeyName, ModifierIndex> = FnvHashMap::default();
    for (idx, key_name) in mod_map {
        if let Some(existing) = mod_map_by_key.get(&key_name) {
            if *existing != idx {
                diags.push(Diagnostic::warning(
                    DiagnosticKind::Semantic,
                    format!("key {} already has a modifier_map entry; using the latest", key_name),
                ));
            }
        }
        mod_map_by_key.insert(key_name, idx);
    }

    let mut keys: FnvHashMap<KeyName, Key> = FnvHashMap::default();
    for (name, raw) in raw_keys {
        let mut key = Key::new(name);
        key.repeats = raw.repeat.unwrap_or(true);
        key.vmod_contribution = raw.vmod;
        if let Some(idx) = mod_map_by_key.get(&name) {
            key.mod_map = idx.mask();
        } else if !raw.explicit_mod_map.is_empty() {
            key.mod_map = raw.explicit_mod_map;
        }

        for (group_idx, raw_group) in raw.groups {
            let type_name = raw_group.type_name.or(raw.default_type);
            let type_index = resolve_group_type(type_name, &raw_group, atoms, types, diags);
            let num_levels = types[type_index].num_levels as usize;
            let mut levels = Vec::with_capacity(num_levels.max(raw_group.syms.len()));
            for i in 0..num_levels.max(raw_group.syms.len()).max(raw_group.actions.len()) {
                let sym = raw_group.syms.get(i).copied();
                let action = raw_group.actions.get(i).cloned().flatten();
                levels.push(Level {
                    syms: sym.map(|s| vec![s]).unwrap_or_default(),
                    action,
                });
            }
            if raw_group.syms.len() > num_levels {
                diags.push(Diagnostic::warning(
                    DiagnosticKind::Semantic,
                    format!("too many symbols for key {}; truncating to the type's level count", name),
                ));
            }
            while levels.len() < num_levels {
                levels.push(Level::default());
            }
            levels.truncate(num_levels.max(levels.len().min(num_levels)));
            // A key declaring only e.g. `symbols[Group2]` with no Group1
            // still occupies slot 0 for its (unused) first group — pad
            // with an empty placeholder so `Group::type_index` stays
            // aligned with the real 0-based group number.
            while key.groups.len() < group_idx as usize {
                let placeholder_type = resolve_group_type(None, &RawGroup::default(), atoms, types, diags);
                key.groups.push(Group {
                    type_index: placeholder_type,
                    levels: vec![Level::default()],
                });
            }
            key.groups.push(Group { type_index, levels });
        }
        if key.groups.is_empty() {
            let type_index = resolve_group_type(None, &RawGroup::default(), atoms, types, diags);
            key.groups.push(Group {
                type_index,
                levels: vec![Level::default()],
            });
        }

        apply_compat_interpretations(&mut key, compat, mods);
        keys.insert(name, key);
    }

    SymbolsInfo { keys, group_names }
}

fn compile_key_body(
    statements: &[Stmt],
    atoms: &mut AtomTable,
    mods: &mut ModNameTable,
    diags: &mut DiagnosticBag,
) -> RawKey {
    let mut raw = RawKey::default();
    for stmt in statements {
        match stmt {
            Stmt::ArrayDecl { name: field, index, value } => {
                let Some(field_name) = atoms.lookup(*field).map(str::to_owned) else { continue };
                let ctx = EvalContext { atoms, mods };
                let Some(group_idx) = expr::resolve_group_index(index, &ctx, diags) else { continue };
                apply_group_field(&mut raw, &field_name, group_idx, value, &ctx, diags);
            }
            Stmt::VarDecl { lhs, value } => {
                let Expr::FieldRef { field, index, .. } = lhs else { continue };
                let Some(field_name) = atoms.lookup(*field).map(str::to_owned) else { continue };
                let ctx = EvalContext { atoms, mods };
                match index {
                    Some(index_expr) => {
                        let Some(group_idx) = expr::resolve_group_index(index_expr, &ctx, diags) else { continue };
                        apply_group_field(&mut raw, &field_name, group_idx, value, &ctx, diags);
                    }
                    None => apply_key_field(&mut raw, &field_name, value, &ctx, diags),
                }
            }
            Stmt::Expr(_) => {}
            other => {
                diags.push(Diagnostic::new(
                    DiagnosticKind::Semantic,
                    format!("unexpected statement in a symbols key body: {:?}", other),
                ));
            }
        }
    }
    raw
}

fn apply_group_field(
    raw: &mut RawKey,
    field_name: &str,
    group_idx: u32,
    value: &Expr,
    ctx: &EvalContext,
    diags: &mut DiagnosticBag,
) {
    let group = raw.groups.entry(group_idx).or_default();
    if field_name.eq_ignore_ascii_case("symbols") {
        group.syms = resolve_keysym_list(value, ctx, diags);
    } else if field_name.eq_ignore_ascii_case("actions") {
        group.actions = resolve_action_list(value, ctx, diags);
    } else if field_name.eq_ignore_ascii_case("type") {
        group.type_name = resolve_type_name(value, ctx, diags);
    } else {
        diags.push(Diagnostic::new(
            DiagnosticKind::Semantic,
            format!("unknown per-group field {} in symbols key body", field_name),
        ));
    }
}

fn apply_key_field(raw: &mut RawKey, field_name: &str, value: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) {
    if field_name.eq_ignore_ascii_case("symbols") {
        raw.groups.entry(0).or_default().syms = resolve_keysym_list(value, ctx, diags);
    } else if field_name.eq_ignore_ascii_case("actions") {
        raw.groups.entry(0).or_default().actions = resolve_action_list(value, ctx, diags);
    } else if field_name.eq_ignore_ascii_case("type") {
        raw.default_type = resolve_type_name(value, ctx, diags);
    } else if field_name.eq_ignore_ascii_case("repeat") || field_name.eq_ignore_ascii_case("repeats") {
        raw.repeat = expr::resolve_boolean(value, ctx, diags);
    } else if field_name.eq_ignore_ascii_case("virtualmods") || field_name.eq_ignore_ascii_case("virtualmodifiers") {
        if let Some(mask) = expr::resolve_vmod_mask(value, ctx, diags) {
            raw.vmod |= mask;
        }
    } else if field_name.eq_ignore_ascii_case("modifier_map") || field_name.eq_ignore_ascii_case("modmap") {
        if let Some(mask) = expr::resolve_vmod_mask(value, ctx, diags) {
            raw.explicit_mod_map |= mask.real();
        }
    } else {
        diags.push(Diagnostic::new(
            DiagnosticKind::Semantic,
            format!("unknown field {} in symbols key body", field_name),
        ));
    }
}

fn resolve_type_name(value: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) -> Option<Atom> {
    let name = expr::resolve_string(value, ctx, diags)?;
    ctx.atoms.find_ignore_ascii_case(&name).or_else(|| {
        diags.push(Diagnostic::new(
            DiagnosticKind::Semantic,
            format!("undefined key type {}", name),
        ));
        None
    })
}

fn resolve_keysym_list(value: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) -> Vec<Keysym> {
    let Expr::KeysymList(atoms) = value else {
        diags.push(Diagnostic::new(DiagnosticKind::Semantic, "expected a keysym list"));
        return Vec::new();
    };
    atoms
        .iter()
        .filter_map(|atom| {
            let name = ctx.atoms.lookup(*atom)?;
            match keysym::keysym_from_name(name) {
                Some(ks) => Some(ks),
                None => {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::Semantic,
                        format!("unknown keysym name {}", name),
                    ));
                    None
                }
            }
        })
        .collect()
}

fn resolve_action_list(value: &Expr, ctx: &EvalContext, diags: &mut DiagnosticBag) -> Vec<Option<Action>> {
    let Expr::ActionList(calls) = value else {
        diags.push(Diagnostic::new(DiagnosticKind::Semantic, "expected an action list"));
        return Vec::new();
    };
    calls
        .iter()
        .map(|call| crate::action::build_action(call, ctx, diags))
        .collect()
}

/// Find the named type, or classify+synthesize the canonical one for this
/// group's shape (spec §4.5 "Symbols": the classifier named there), caching
/// newly synthesized canonical types by reusing an existing entry with the
/// same name on a later key.
fn resolve_group_type(
    type_name: Option<Atom>,
    group: &RawGroup,
    atoms: &mut AtomTable,
    types: &mut Vec<KeyType>,
    diags: &mut DiagnosticBag,
) -> usize {
    if let Some(name) = type_name {
        if let Some(idx) = types.iter().position(|t| t.name == name) {
            return idx;
        }
        diags.push(Diagnostic::new(
            DiagnosticKind::Semantic,
            format!("undefined key type {:?}; using a synthesized default", atoms.lookup(name)),
        ));
    }
    let canonical = classify_symbols(&group.syms);
    let atom = atoms.find_ignore_ascii_case(canonical).unwrap_or_else(|| atoms.intern(canonical, None));
    if let Some(idx) = types.iter().position(|t| t.name == atom) {
        return idx;
    }
    let num_levels = match canonical {
        "ONE_LEVEL" => 1,
        "FOUR_LEVEL" | "FOUR_LEVEL_ALPHABETIC" | "FOUR_LEVEL_SEMIALPHABETIC" | "FOUR_LEVEL_KEYPAD" => 4,
        _ => 2,
    };
    let synthesized = synthesize_canonical_type(atom, canonical, num_levels);
    types.push(synthesized);
    types.len() - 1
}

/// Canonical type name for a group's declared symbol shape (spec §4.5):
/// `ONE_LEVEL` for a single symbol, `ALPHABETIC`/`KEYPAD`/`TWO_LEVEL` for
/// two, `FOUR_LEVEL*` for four, falling back to `TWO_LEVEL` shaping rules
/// for any other count (fewer/more than these canonical shapes still need
/// *some* type; the original does the same, treating 0 or >4 as `TWO_LEVEL`
/// shaped and letting padding/truncation absorb the mismatch upstream).
fn classify_symbols(syms: &[Keysym]) -> &'static str {
    match syms.len() {
        0 | 1 => "ONE_LEVEL",
        2 => {
            if is_alphabetic_pair(syms[0], syms[1]) {
                "ALPHABETIC"
            } else if is_keypad(syms[0]) || is_keypad(syms[1]) {
                "KEYPAD"
            } else {
                "TWO_LEVEL"
            }
        }
        _ => {
            if syms.iter().take(4).any(|s| is_keypad(*s)) {
                "FOUR_LEVEL_KEYPAD"
            } else if syms.len() >= 2 && is_alphabetic_pair(syms[0], syms[1]) {
                "FOUR_LEVEL_ALPHABETIC"
            } else {
                "FOUR_LEVEL"
            }
        }
    }
}

fn is_alphabetic_pair(lower: Keysym, upper: Keysym) -> bool {
    lower.to_upper() == upper && lower.to_lower() == lower && !lower.is_no_symbol() && lower.to_upper() != lower
}

fn is_keypad(sym: Keysym) -> bool {
    keysym::keysym_get_name(sym).starts_with("KP_")
}

fn synthesize_canonical_type(name: Atom, canonical: &str, num_levels: u32) -> KeyType {
    let mut map = Vec::new();
    if canonical != "ONE_LEVEL" {
        map.push(crate::keymap::MapEntry {
            mods: ModMask::SHIFT,
            level: 1,
            preserve: ModMask::empty(),
        });
        if num_levels == 4 {
            map.push(crate::keymap::MapEntry {
                mods: ModifierIndex(8).mask(),
                level: 2,
                preserve: ModMask::empty(),
            });
            map.push(crate::keymap::MapEntry {
                mods: ModMask::SHIFT | ModifierIndex(8).mask(),
                level: 3,
                preserve: ModMask::empty(),
            });
        }
    }
    KeyType {
        name,
        mods: if num_levels == 1 {
            ModMask::empty()
        } else if num_levels == 4 {
            ModMask::SHIFT | ModifierIndex(8).mask()
        } else {
            ModMask::SHIFT
        },
        num_levels,
        map,
        level_names: vec![None; num_levels as usize],
    }
}

/// Apply compat interpretations to a key's group-0/level-0 slot (spec
/// §4.5: "each key's base-level keysym is matched in declaration order;
/// the first matching interp contributes its action ... when the key
/// lacks an explicit action there, and OR's its virtual modifier").
fn apply_compat_interpretations(key: &mut Key, compat: &CompatInfo, _mods: &ModNameTable) {
    let Some(base_sym) = key.groups.first().and_then(|g| g.levels.first()).and_then(|l| l.syms.first()).copied()
    else {
        return;
    };
    let effective = key.mod_map;
    for interp in &compat.interps {
        if !interp.matches(base_sym, effective) {
            continue;
        }
        if let Some(vmod) = interp.vmod {
            key.vmod_contribution |= vmod.mask();
        }
        let has_action = key
            .groups
            .first()
            .and_then(|g| g.levels.first())
            .map(|l| l.action.is_some())
            .unwrap_or(false);
        if !has_action {
            if let (Some(group), Some(action)) = (key.groups.first_mut(), interp.action.clone()) {
                if let Some(level) = group.levels.first_mut() {
                    level.action = Some(action);
                }
            }
        }
        if let Some(repeat) = interp.repeat {
            key.repeats = repeat;
        }
        break;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::MergeMode;

    fn compile_src(src: &str, compat: &CompatInfo) -> (SymbolsInfo, Vec<KeyType>, AtomTable, DiagnosticBag) {
        let mut atoms = AtomTable::new();
        let (file, parse_diags) = crate::parser::parse(src, "test.xkb", &mut atoms);
        assert!(parse_diags.is_empty(), "{:?}", parse_diags.diagnostics());
        let section = &file.sections[0];
        let stmts: Vec<_> = section.statements.iter().map(|s| (MergeMode::Override, s.clone())).collect();
        let mut mods = ModNameTable::new();
        let mut types = Vec::new();
        let mut diags = DiagnosticBag::new();
        let info = compile(&stmts, &mut atoms, &mut mods, &mut types, compat, &mut diags);
        (info, types, atoms, diags)
    }

    #[test]
    fn one_level_key_gets_one_level_type() {
        let compat = CompatInfo::default();
        let (info, types, atoms, diags) = compile_src(
            r#"
            xkb_symbols "test" {
                key <ESC> { [ Escape ] };
            };
        "#,
            &compat,
        );
        assert!(diags.is_empty(), "{:?}", diags.diagnostics());
        let key = &info.keys[&KeyName::new("ESC")];
        let ty = &types[key.groups[0].type_index];
        assert_eq!(atoms.lookup(ty.name), Some("ONE_LEVEL"));
        assert_eq!(ty.num_levels, 1);
    }

    #[test]
    fn two_level_alphabetic_key() {
        let compat = CompatInfo::default();
        let (info, types, atoms, diags) = compile_src(
            r#"
            xkb_symbols "test" {
                key <AD01> { [ q, Q ] };
            };
        "#,
            &compat,
        );
        assert!(diags.is_empty(), "{:?}", diags.diagnostics());
        let key = &info.keys[&KeyName::new("AD01")];
        let ty = &types[key.groups[0].type_index];
        assert_eq!(atoms.lookup(ty.name), Some("ALPHABETIC"));
        assert_eq!(key.groups[0].levels[0].syms[0], keysym::keysym_from_name("q").unwrap());
        assert_eq!(key.groups[0].levels[1].syms[0], keysym::keysym_from_name("Q").unwrap());
    }

    #[test]
    fn explicit_type_name_is_honored() {
        let compat = CompatInfo::default();
        let mut atoms0 = AtomTable::new();
        let name = atoms0.intern("CUSTOM", None);
        let mut types0 = vec![KeyType {
            name,
            mods: ModMask::SHIFT,
            num_levels: 2,
            map: vec![crate::keymap::MapEntry { mods: ModMask::SHIFT, level: 1, preserve: ModMask::empty() }],
            level_names: vec![None, None],
        }];
        let mut mods = ModNameTable::new();
        let (file, parse_diags) = crate::parser::parse(
            r#"
            xkb_symbols "test" {
                key <AB01> { type= "CUSTOM", symbols[Group1]= [ z, Z ] };
            };
        "#,
            "test.xkb",
            &mut atoms0,
        );
        assert!(parse_diags.is_empty(), "{:?}", parse_diags.diagnostics());
        let stmts: Vec<_> = file.sections[0].statements.iter().map(|s| (MergeMode::Override, s.clone())).collect();
        let mut diags = DiagnosticBag::new();
        let info = compile(&stmts, &mut atoms0, &mut mods, &mut types0, &compat, &mut diags);
        assert!(diags.is_empty(), "{:?}", diags.diagnostics());
        let key = &info.keys[&KeyName::new("AB01")];
        assert_eq!(types0[key.groups[0].type_index].name, name);
    }
}
