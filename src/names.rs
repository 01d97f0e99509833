//! Rule-set component names (spec §6 `keymap_new_from_names`).
//!
//! The rules-file preprocessor that turns `(rules, model, layout, variant,
//! options)` into concrete `keycodes`/`types`/`compat`/`symbols` component
//! names is explicitly out of scope (spec §1 "Out of scope ... the
//! rules-file preprocessor"). [`RuleNames`] is the resolved-names record the
//! rest of the crate consumes; [`RuleResolver`] is the seam a host embeds
//! its own rules-file engine behind, mirroring [`crate::context::IncludePathResolver`]'s
//! role for filesystem search.
use crate::ast::SectionKind;

/// The four (or five, with an explicit rules file) component names that
/// select one keymap out of a rules database, e.g. `("evdev", "pc104",
/// "us", "", "")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleNames {
    pub rules: String,
    pub model: String,
    pub layout: String,
    pub variant: String,
    pub options: String,
}

impl RuleNames {
    pub fn new(
        rules: impl Into<String>,
        model: impl Into<String>,
        layout: impl Into<String>,
        variant: impl Into<String>,
        options: impl Into<String>,
    ) -> Self {
        RuleNames {
            rules: rules.into(),
            model: model.into(),
            layout: layout.into(),
            variant: variant.into(),
            options: options.into(),
        }
    }
}

/// One resolved component: which file(map) to pull for one of the four
/// XKB sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentName {
    pub kind: SectionKind,
    pub file: String,
    pub map: Option<String>,
}

/// A host-provided rules-file engine. Given [`RuleNames`], produce the
/// component list to assemble into one `xkb_keymap` (spec §6
/// `keymap_new_from_names`). Out of scope per spec §1; [`DefaultRuleResolver`]
/// below is a minimal stand-in sufficient for tests that do not exercise a
/// real rules database.
pub trait RuleResolver: std::fmt::Debug {
    fn resolve(&self, names: &RuleNames) -> Vec<ComponentName>;
}

/// Treats `layout`/`model` directly as file names with no rules-file
/// indirection: `keymap_new_from_names(ctx, RuleNames::new("", "pc104",
/// "us", "", ""))` resolves to `keycodes/pc104`, `types/basic`,
/// `compat/basic`, `symbols/us`. Good enough to drive the evdev-keycode
/// test scenarios without a real `/usr/share/X11/xkb/rules` database.
#[derive(Debug, Default)]
pub struct DefaultRuleResolver;

impl RuleResolver for DefaultRuleResolver {
    fn resolve(&self, names: &RuleNames) -> Vec<ComponentName> {
        let model = if names.model.is_empty() { "pc104" } else { &names.model };
        let layout = if names.layout.is_empty() { "us" } else { &names.layout };
        vec![
            ComponentName {
                kind: SectionKind::Keycodes,
                file: model.to_owned(),
                map: None,
            },
            ComponentName {
                kind: SectionKind::Types,
                file: "basic".to_owned(),
                map: None,
            },
            ComponentName {
                kind: SectionKind::Compat,
                file: "basic".to_owned(),
                map: None,
            },
            ComponentName {
                kind: SectionKind::Symbols,
                file: layout.to_owned(),
                map: if names.variant.is_empty() {
                    None
                } else {
                    Some(names.variant.clone())
                },
            },
        ]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_resolver_falls_back_to_pc104_us() {
        let resolver = DefaultRuleResolver;
        let names = RuleNames::default();
        let components = resolver.resolve(&names);
        assert_eq!(components[0].file, "pc104");
        assert_eq!(components[3].file, "us");
    }
}
