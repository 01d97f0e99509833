//! Include resolution: expand `include` statements into the statement
//! streams of the files they name, with merge-mode composition and cycle
//! detection (spec §4.4).
use crate::ast::{IncludeStmt, MergeMode, Section, SectionKind, Stmt};
use crate::context::Context;
use crate::error::{Diagnostic, DiagnosticBag, DiagnosticKind, Error, Result};
use crate::parser;

/// The subdirectory an `xkb_<kind>` section's includes are searched under,
/// mirroring `xkb_context_new`'s per-component search roots.
pub fn subpath_for(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Keycodes => "keycodes",
        SectionKind::Types => "types",
        SectionKind::Compat => "compat",
        SectionKind::Symbols => "symbols",
        SectionKind::Geometry => "geometry",
    }
}

/// Fully expand `statements`, splicing in the statement list of every
/// `include` target, tagging each resulting statement with the merge mode
/// it should be applied under (its own section merge, or the include
/// triple's `|`/`+` operator). Section compilers consume this flat stream
/// instead of handling recursion themselves.
pub fn flatten_statements(
    statements: &[Stmt],
    default_merge: MergeMode,
    kind: SectionKind,
    ctx: &mut Context,
    visited: &mut Vec<String>,
    diags: &mut DiagnosticBag,
) -> Result<Vec<(MergeMode, Stmt)>> {
    let mut out = Vec::new();
    for stmt in statements {
        match stmt {
            Stmt::Include(include) => {
                let fragments = expand_include(include, kind, default_merge, ctx, visited, diags)?;
                for fragment in fragments {
                    let expanded = flatten_statements(
                        &fragment.statements,
                        fragment.merge,
                        kind,
                        ctx,
                        visited,
                        diags,
                    )?;
                    out.extend(expanded);
                }
            }
            other => out.push((default_merge, other.clone())),
        }
    }
    Ok(out)
}

/// One included file's chosen section, with the merge mode it should be
/// folded in under.
pub struct ResolvedFragment {
    pub merge: MergeMode,
    pub statements: Vec<Stmt>,
}

/// Resolve every triple of one `include` statement: find the file, parse
/// it, pick the named (or default) section of `kind`, and record the
/// merge mode each triple contributes under (spec §4.4: "The first
/// component's merge mode is inherited from the surrounding statement;
/// subsequent components use the explicit operator").
pub fn expand_include(
    stmt: &IncludeStmt,
    kind: SectionKind,
    outer_merge: MergeMode,
    ctx: &mut Context,
    visited: &mut Vec<String>,
    diags: &mut DiagnosticBag,
) -> Result<Vec<ResolvedFragment>> {
    let subpath = subpath_for(kind);
    let mut fragments = Vec::new();
    for triple in &stmt.components {
        let merge = triple.operator.unwrap_or(outer_merge).resolved();
        let canonical = format!("{}/{}", subpath, triple.file);
        if visited.contains(&canonical) {
            let mut trace = visited.clone();
            trace.push(canonical);
            return Err(Error::IncludeCycle(trace));
        }
        let Some((_, contents)) = ctx.resolver().resolve(subpath, &triple.file) else {
            diags.push(Diagnostic::new(
                DiagnosticKind::Include,
                format!("could not find file {:?} in the {} search path", triple.file, subpath),
            ));
            continue;
        };
        visited.push(canonical);
        let (file, parse_diags) = parser::parse(&contents, &triple.file, ctx.atoms_mut());
        diags.extend(parse_diags);

        let target = file
            .sections
            .iter()
            .find(|s| s.kind == kind)
            .filter(|s| match &triple.map {
                Some(map) => ctx
                    .atoms()
                    .lookup(s.name)
                    .map_or(false, |name| name.eq_ignore_ascii_case(map)),
                None => true,
            })
            .or_else(|| file.sections.iter().find(|s| s.kind == kind));

        match target {
            Some(section) => fragments.push(ResolvedFragment {
                merge,
                statements: section.statements.clone(),
            }),
            None => diags.push(Diagnostic::new(
                DiagnosticKind::Include,
                format!(
                    "{} has no xkb_{:?} section matching map {:?}",
                    triple.file, kind, triple.map
                ),
            )),
        }
        visited.pop();
    }
    Ok(fragments)
}

/// Parse a whole keymap file from one source, per `keymap_new_from_string`
/// (spec §6): not itself include-aware (a top-level file is a sequence of
/// sections; each section's own `include` statements are resolved by
/// [`flatten_statements`] once section compilation begins).
pub fn parse_top_level(src: &str, file_name: &str, ctx: &mut Context) -> (Vec<Section>, crate::error::DiagnosticBag) {
    let (file, diags) = parser::parse(src, file_name, ctx.atoms_mut());
    (file.sections, diags)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::ContextFlags;
    use crate::error::DiagnosticBag;

    #[test]
    fn cycle_is_detected() {
        let dir = std::env::temp_dir().join("xkbcore-include-cycle-test");
        std::fs::create_dir_all(dir.join("symbols")).unwrap();
        std::fs::write(
            dir.join("symbols").join("a"),
            r#"xkb_symbols "x" { include "b" };"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("symbols").join("b"),
            r#"xkb_symbols "x" { include "a" };"#,
        )
        .unwrap();

        let mut ctx = Context::new(ContextFlags::NoDefaultIncludes);
        ctx.include_path_append(&dir);
        let mut diags = DiagnosticBag::new();
        let mut visited = vec!["symbols/a".to_string()];
        let include = crate::ast::IncludeStmt {
            components: vec![crate::ast::IncludeTriple {
                file: "b".into(),
                map: None,
                modifier: None,
                operator: None,
            }],
        };
        let result = expand_include(
            &include,
            SectionKind::Symbols,
            MergeMode::Override,
            &mut ctx,
            &mut visited,
            &mut diags,
        );
        assert!(matches!(result, Err(Error::IncludeCycle(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
