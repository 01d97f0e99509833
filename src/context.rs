//! The compilation context: atom table, include search paths, and the
//! verbosity gate for diagnostics (spec §3 "Context", §4.8, §5 "Shared
//! resources").
use crate::atom::{Atom, AtomTable};
use std::env;
use std::path::{Path, PathBuf};

/// The conventional XKB component subdirectories searched under each root.
const COMPONENT_SUBDIRS: &[&str] = &["keycodes", "types", "compat", "symbols", "geometry"];

/// Whether [`Context::new`] should seed its search path from the well-known
/// environment variables, mirroring `xkb_context_new`'s default-paths flag
/// (spec §6, `context_new(flags)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextFlags {
    NoDefaultIncludes,
    DefaultIncludes,
}

/// A filesystem search strategy a host embeds into a [`Context`]. Real
/// filesystem search is out of scope for this crate (spec §1); the trait is
/// the seam the host implements, with [`FilesystemResolver`] provided as a
/// usable default for tests and simple embedders.
pub trait IncludePathResolver: std::fmt::Debug {
    /// Resolve `subpath/file` against the configured roots, returning the
    /// file's contents if found in any of them, search-path order.
    fn resolve(&self, subpath: &str, file: &str) -> Option<(PathBuf, String)>;
}

/// Searches each appended root, in append order, for `<root>/<subpath>/<file>`.
#[derive(Debug, Default)]
pub struct FilesystemResolver {
    roots: Vec<PathBuf>,
}

impl FilesystemResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl IncludePathResolver for FilesystemResolver {
    fn resolve(&self, subpath: &str, file: &str) -> Option<(PathBuf, String)> {
        for root in &self.roots {
            let candidate = root.join(subpath).join(file);
            if let Ok(contents) = std::fs::read_to_string(&candidate) {
                return Some((candidate, contents));
            }
        }
        None
    }
}

/// Owns the atom table and include search configuration shared by every
/// keymap compiled from it. `Context` is cheap to construct but not `Sync`
/// while being mutated — callers serialize access per spec §5.
#[derive(Debug)]
pub struct Context {
    atoms: AtomTable,
    resolver: FilesystemResolver,
    verbosity: i32,
}

impl Context {
    /// `xkb_context_new` equivalent. With [`ContextFlags::DefaultIncludes`],
    /// appends `XKB_CONFIG_ROOT` (or, absent that, the compiled-in default)
    /// followed by `XDG_CONFIG_HOME`-relative paths, in that precedence
    /// order (spec SPEC_FULL §A.3).
    pub fn new(flags: ContextFlags) -> Self {
        let mut ctx = Context {
            atoms: AtomTable::new(),
            resolver: FilesystemResolver::new(),
            verbosity: 0,
        };
        if flags == ContextFlags::DefaultIncludes {
            ctx.append_default_paths();
        }
        ctx
    }

    fn append_default_paths(&mut self) {
        if let Ok(root) = env::var("XKB_CONFIG_ROOT") {
            self.resolver.append_root(root);
        } else {
            self.resolver.append_root("/usr/share/X11/xkb");
        }
        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            self.resolver.append_root(Path::new(&xdg).join("xkb"));
        }
    }

    /// `context_include_path_append`. The path is accepted unconditionally;
    /// nonexistent directories simply never yield a match.
    pub fn include_path_append(&mut self, path: impl Into<PathBuf>) {
        self.resolver.append_root(path);
    }

    pub fn component_subdirs() -> &'static [&'static str] {
        COMPONENT_SUBDIRS
    }

    pub fn resolver(&self) -> &FilesystemResolver {
        &self.resolver
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut AtomTable {
        &mut self.atoms
    }

    pub fn intern(&mut self, s: &str) -> Atom {
        self.atoms.intern(s, None)
    }

    pub fn verbosity(&self) -> i32 {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, level: i32) {
        self.verbosity = level;
    }

    /// Emit at `level` only if the context's verbosity admits it, mirroring
    /// `log_lvl(ctx, level, ...)`. Maps 0 to error, increasing levels to
    /// progressively quieter severities, the way the original treats
    /// verbosity as "how much extra noise to allow".
    pub fn log_lvl(&self, level: i32, message: &str) {
        if level > self.verbosity {
            return;
        }
        match level {
            i32::MIN..=0 => log::error!("{}", message),
            1 => log::warn!("{}", message),
            2 => log::info!("{}", message),
            3 => log::debug!("{}", message),
            _ => log::trace!("{}", message),
        }
    }

    pub fn log_err(&self, message: &str) {
        log::error!("{}", message);
    }

    pub fn log_warn(&self, message: &str) {
        if self.verbosity >= 1 {
            log::warn!("{}", message);
        }
    }

    /// "Should never happen" — an internal invariant was violated. Always
    /// emitted regardless of verbosity, matching the original's `log_wsgo`.
    pub fn log_wsgo(&self, message: &str) {
        log::error!("(internal) {}", message);
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(ContextFlags::NoDefaultIncludes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn intern_round_trips_through_context() {
        let mut ctx = Context::default();
        let a = ctx.intern("xkb_symbols");
        assert_eq!(ctx.atoms().lookup(a), Some("xkb_symbols"));
    }

    #[test]
    fn filesystem_resolver_searches_in_append_order() {
        let dir = std::env::temp_dir().join("xkbcore-context-test");
        std::fs::create_dir_all(dir.join("symbols")).unwrap();
        std::fs::write(dir.join("symbols").join("us"), "xkb_symbols \"basic\" { };").unwrap();
        let mut ctx = Context::default();
        ctx.include_path_append(&dir);
        let found = ctx.resolver().resolve("symbols", "us");
        assert!(found.is_some());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
