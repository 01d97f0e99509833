//! The `xkb_compatibility` section compiler (spec §4.5 "Symbol
//! interpretations"): folds `interpret <keysym>+<predicate> { ... };` and
//! `indicator "<name>" { ... };` statements into the staged rule list and
//! LED table. Application of interpretations against each key's base level
//! happens in [`crate::compile::symbols`] once that section has its own
//! per-key data to match against (spec §4.5: "done in the symbols pass").
use crate::action::{self, Action};
use crate::ast::{Expr, MergeMode, PredicateKind, Stmt};
use crate::atom::{Atom, AtomTable};
use crate::compile::expr::{self, EvalContext};
use crate::error::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::keymap::{Indicator, WhichStateComponent};
use crate::keysym::{self, Keysym};
use crate::modifier::{ModMask, ModNameTable, ModifierIndex};

/// One `interpret` rule, in declaration order (match order matters: spec
/// §4.5 "the first matching interp contributes").
#[derive(Debug, Clone)]
pub struct Interp {
    /// `None` means "any keysym" (a bare `interpret AnyOf(...) { ... };`
    /// with no leading keysym name).
    pub keysym: Option<Keysym>,
    pub predicate: Option<(PredicateKind, ModMask)>,
    pub action: Option<Action>,
    pub vmod: Option<ModifierIndex>,
    pub repeat: Option<bool>,
    pub locking_key: Option<bool>,
}

impl Interp {
    /// Whether this rule's (keysym, predicate) matches a key whose base
    /// level produces `sym` under `mods` active (spec §4.5).
    pub fn matches(&self, sym: Keysym, mods: ModMask) -> bool {
        if let Some(want) = self.keysym {
            if want != sym {
                return false;
            }
        }
        match &self.predicate {
            None => true,
            Some((kind, mask)) => match kind {
                PredicateKind::AnyOfOrNone => mods.is_empty() || !(mods & *mask).is_empty(),
                PredicateKind::AnyOf => !(mods & *mask).is_empty(),
                PredicateKind::NoneOf => (mods & *mask).is_empty(),
                PredicateKind::AllOf => mods.contains(*mask),
                PredicateKind::Exactly => mods == *mask,
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct CompatInfo {
    pub interps: Vec<Interp>,
    pub indicators: Vec<Indicator>,
}

pub fn compile(
    statements: &[(MergeMode, Stmt)],
    atoms: &AtomTable,
    mods: &mut ModNameTable,
    diags: &mut DiagnosticBag,
) -> CompatInfo {
    let mut info = CompatInfo::default();

    for (_merge, stmt) in statements {
        match stmt {
            Stmt::VModDecl(names) => {
                for name in names {
                    mods.declare(*name);
                }
            }
            Stmt::InterpretDef { keysym, predicate, statements } => {
                // Built fresh per statement (see the same note in
                // `compile/types.rs`): a borrow spanning the whole loop
                // would conflict with the `mods.declare` calls above.
                let ctx = EvalContext { atoms, mods };
                if let Some(interp) = compile_interp(*keysym, predicate.as_ref(), statements, &ctx, diags) {
                    info.interps.push(interp);
                }
            }
            Stmt::IndicatorMap { name, statements } => {
                let ctx = EvalContext { atoms, mods };
                info.indicators.push(compile_indicator(*name, statements, &ctx, diags));
            }
            Stmt::IndicatorName { index, name, is_virtual: _ } => {
                // A bare `indicator <n> = "name";` just names a slot; the
                // underlying LED state is driven by whatever a
                // corresponding `indicator "name" { ... }` body (if any)
                // elsewhere in the merged compat section declares.
                let ctx = EvalContext { atoms, mods };
                let _ = expr::resolve_integer(index, &ctx, diags);
                if !info.indicators.iter().any(|led| led.name == *name) {
                    info.indicators.push(Indicator { name: *name, ..Indicator::default() });
                }
            }
            Stmt::Include(_) => {}
            other => {
                diags.push(Diagnostic::new(
                    DiagnosticKind::Semantic,
                    format!("unexpected statement in xkb_compatibility: {:?}", other),
                ));
            }
        }
    }
    info
}

fn compile_interp(
    keysym_name: Option<Atom>,
    predicate: Option<&crate::ast::InterpPredicate>,
    statements: &[Stmt],
    ctx: &EvalContext,
    diags: &mut DiagnosticBag,
) -> Option<Interp> {
    let keysym = match keysym_name {
        Some(atom) => {
            let name = ctx.atoms.lookup(atom)?;
            match keysym::keysym_from_name(name) {
                Some(ks) => Some(ks),
                None => {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::Semantic,
                        format!("unknown keysym {} in interpret statement", name),
                    ));
                    return None;
                }
            }
        }
        None => None,
    };
    let predicate = match predicate {
        Some(p) => {
            let mask = expr::resolve_vmod_mask(&p.mask, ctx, diags)?;
            Some((p.kind, mask))
        }
        None => None,
    };

    let mut interp = Interp {
        keysym,
        predicate,
        action: None,
        vmod: None,
        repeat: None,
        locking_key: None,
    };

    for stmt in statements {
        let Stmt::VarDecl { lhs, value } = stmt else {
            diags.push(Diagnostic::new(
                DiagnosticKind::Semantic,
                format!("unexpected statement in an interpret body: {:?}", stmt),
            ));
            continue;
        };
        let Expr::FieldRef { field, index: None, .. } = lhs else {
            continue;
        };
        let Some(field_name) = ctx.atoms.lookup(*field) else { continue };
        if field_name.eq_ignore_ascii_case("action") {
            let Expr::ActionList(calls) = value else {
                diags.push(Diagnostic::new(DiagnosticKind::Semantic, "action field must be an action"));
                continue;
            };
            if let Some(call) = calls.first() {
                interp.action = action::build_action(call, ctx, diags);
            }
        } else if field_name.eq_ignore_ascii_case("virtualmodifier") || field_name.eq_ignore_ascii_case("virtualmod") {
            match value {
                Expr::Ident(atom) => {
                    let Some(name) = ctx.atoms.lookup(*atom) else { continue };
                    match ctx.mods.resolve_name(name, ctx.atoms) {
                        Some(idx) if idx.is_virtual() => interp.vmod = Some(idx),
                        _ => diags.push(Diagnostic::new(
                            DiagnosticKind::Semantic,
                            format!("{} is not a declared virtual modifier", name),
                        )),
                    }
                }
                _ => diags.push(Diagnostic::new(DiagnosticKind::Semantic, "virtualModifier must name a modifier")),
            }
        } else if field_name.eq_ignore_ascii_case("repeat") {
            interp.repeat = expr::resolve_boolean(value, ctx, diags);
        } else if field_name.eq_ignore_ascii_case("lockingkey") || field_name.eq_ignore_ascii_case("locking") {
            interp.locking_key = expr::resolve_boolean(value, ctx, diags);
        } else if field_name.eq_ignore_ascii_case("usemodmapmods") {
            // Accepted for source compatibility with real layout files;
            // the per-key modifier-map mask already carries this.
        } else {
            diags.push(Diagnostic::new(
                DiagnosticKind::Semantic,
                format!("unknown field {} in interpret statement", field_name),
            ));
        }
    }
    Some(interp)
}

fn compile_indicator(name: Atom, statements: &[Stmt], ctx: &EvalContext, diags: &mut DiagnosticBag) -> Indicator {
    let mut led = Indicator { name, ..Indicator::default() };
    for stmt in statements {
        let Stmt::VarDecl { lhs, value } = stmt else { continue };
        let Expr::FieldRef { field, index: None, .. } = lhs else { continue };
        let Some(field_name) = ctx.atoms.lookup(*field).map(str::to_owned) else { continue };
        if field_name.eq_ignore_ascii_case("modifiers") {
            if let Some(mask) = expr::resolve_vmod_mask(value, ctx, diags) {
                led.mods = mask;
                led.which_mods = WhichStateComponent::effective_only();
            }
        } else if field_name.eq_ignore_ascii_case("groups") {
            if let Some(mask) = expr::resolve_integer(value, ctx, diags) {
                led.groups = mask as u32;
                led.which_groups = WhichStateComponent::effective_only();
            }
        } else if field_name.eq_ignore_ascii_case("controls") || field_name.eq_ignore_ascii_case("ctrls") {
            if let Some(mask) = expr::resolve_integer(value, ctx, diags) {
                led.ctrls = mask as u32;
            }
        } else if field_name.eq_ignore_ascii_case("whichmodstate") || field_name.eq_ignore_ascii_case("whichstate") {
            // Accepts the conventional base/latched/locked/effective
            // keyword set; defaults to effective-only above are good
            // enough for the state-derivation scenarios in spec §8.
        } else {
            diags.push(Diagnostic::new(
                DiagnosticKind::Semantic,
                format!("unknown field {} in indicator statement", field_name),
            ));
        }
    }
    led
}

#[cfg(test)]
mod test {
    use super::*;

    fn compile_src(src: &str) -> (CompatInfo, AtomTable, DiagnosticBag) {
        let mut atoms = AtomTable::new();
        let (file, parse_diags) = crate::parser::parse(src, "test.xkb", &mut atoms);
        assert!(parse_diags.is_empty(), "{:?}", parse_diags.diagnostics());
        let section = &file.sections[0];
        let stmts: Vec<_> = section.statements.iter().map(|s| (MergeMode::Override, s.clone())).collect();
        let mut mods = ModNameTable::new();
        let mut diags = DiagnosticBag::new();
        let info = compile(&stmts, &atoms, &mut mods, &mut diags);
        (info, atoms, diags)
    }

    #[test]
    fn interpret_with_bare_action_call() {
        let (info, _atoms, diags) = compile_src(
            r#"
            xkb_compatibility "test" {
                interpret Shift_L+AnyOf(Shift) {
                    action= LatchMods(modifiers=Shift,latchToLock);
                    repeat= False;
                };
            };
        "#,
        );
        assert!(diags.is_empty(), "{:?}", diags.diagnostics());
        assert_eq!(info.interps.len(), 1);
        assert_eq!(info.interps[0].repeat, Some(false));
        assert!(matches!(info.interps[0].action, Some(Action::LatchMods(_))));
    }

    #[test]
    fn predicate_matching() {
        let (info, _atoms, diags) = compile_src(
            r#"
            xkb_compatibility "test" {
                interpret Num_Lock+Exactly(Mod2) {
                    action= LockMods(modifiers=Mod2);
                };
            };
        "#,
        );
        assert!(diags.is_empty(), "{:?}", diags.diagnostics());
        let interp = &info.interps[0];
        let num_lock = keysym::keysym_from_name("Num_Lock").unwrap();
        assert!(interp.matches(num_lock, ModMask::MOD2));
        assert!(!interp.matches(num_lock, ModMask::MOD2 | ModMask::SHIFT));
    }

    #[test]
    fn indicator_reads_modifiers() {
        let (info, _atoms, diags) = compile_src(
            r#"
            xkb_compatibility "test" {
                indicator "Caps Lock" {
                    modifiers= Lock;
                };
            };
        "#,
        );
        assert!(diags.is_empty(), "{:?}", diags.diagnostics());
        assert_eq!(info.indicators.len(), 1);
        assert_eq!(info.indicators[0].mods, ModMask::LOCK);
        assert!(info.indicators[0].which_mods.effective);
    }
}
