//! The definition registry: `(name, library)` indexing and scoped name
//! resolution with configuration rules.

use std::collections::HashMap;
use veld_common::Ident;
use veld_hier::{ConfigId, DefId, LibraryId, ResolvedConfigId};
use veld_source::Span;

use crate::compilation::Compilation;
use crate::config::{CellOverride, ConfigRule};
use crate::definition::DefKind;
use crate::errors;

/// A registry entry: definitions and configuration blocks share one
/// namespace per library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefOrConfig {
    /// A design-unit or primitive definition.
    Def(DefId),
    /// A configuration block.
    Config(ConfigId),
}

/// Which diagnostic a failed resolution emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKind {
    /// Emit an unknown-module diagnostic.
    Module,
    /// Emit an unknown-interface diagnostic.
    Interface,
    /// Emit nothing; the caller handles the miss.
    Silent,
}

/// Indexes parsed definitions and configs by `(name, library)`.
///
/// The registry is pure once populated: identical queries within one
/// compilation return identical results.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    index: HashMap<(Ident, LibraryId), DefOrConfig>,
}

impl DefinitionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning the existing entry on a name collision
    /// within the same library.
    pub fn insert(
        &mut self,
        name: Ident,
        library: LibraryId,
        entry: DefOrConfig,
    ) -> Result<(), DefOrConfig> {
        match self.index.get(&(name, library)) {
            Some(existing) => Err(*existing),
            None => {
                self.index.insert((name, library), entry);
                Ok(())
            }
        }
    }

    /// Looks up a name in exactly one library.
    pub fn get(&self, name: Ident, library: LibraryId) -> Option<DefOrConfig> {
        self.index.get(&(name, library)).copied()
    }
}

/// Resolves an unqualified cell name from a caller scope.
///
/// Implements the effective-liblist computation: an explicit rule's `use`
/// library wins, then the rule's liblist, then the liblist inherited from
/// the enclosing resolved configuration, then the caller's library followed
/// by the global search order. When no explicit rule is given, the active
/// configuration's cell overrides are consulted first.
///
/// A failed resolution emits one diagnostic (per `missing`) at `span` and
/// returns `None`.
pub(crate) fn resolve_name<'a>(
    comp: &Compilation<'a>,
    name: Ident,
    scope_lib: LibraryId,
    explicit_rule: Option<&ConfigRule<'a>>,
    config_ctx: Option<ResolvedConfigId>,
    span: Span,
    missing: MissingKind,
) -> Option<DefOrConfig> {
    // Gather applicable cell overrides from the active config.
    let mut general_rule: Option<ConfigRule<'a>> = None;
    let mut specific: Vec<CellOverride<'a>> = Vec::new();
    if explicit_rule.is_none() {
        if let Some(rc) = config_ctx {
            let config = &comp.configs[comp.resolved_configs[rc].config];
            if let Some(overrides) = config.cell_overrides.get(&name) {
                for ov in overrides {
                    if ov.specific_lib.is_none() {
                        if general_rule.is_none() {
                            general_rule = Some(ov.rule.clone());
                        }
                    } else {
                        specific.push(ov.clone());
                    }
                }
            }
        }
    }

    let rule = explicit_rule.or(general_rule.as_ref());
    let base = resolve_with_rule(comp, name, scope_lib, rule, config_ctx, span);

    // A cell override qualified with a library applies when the cell would
    // otherwise resolve into that library; re-resolve under its rule.
    if let Some(DefOrConfig::Def(def)) = base {
        if rule.is_none() {
            let found_lib = comp.definitions[def].library;
            if let Some(ov) = specific.iter().find(|o| o.specific_lib == Some(found_lib)) {
                if let Some(redirected) =
                    resolve_with_rule(comp, name, scope_lib, Some(&ov.rule), config_ctx, span)
                {
                    return Some(redirected);
                }
            }
        }
    }

    if base.is_none() {
        match missing {
            MissingKind::Module => comp.sink.emit(errors::error_unknown_module(
                comp.interner.resolve(name),
                span,
            )),
            MissingKind::Interface => comp.sink.emit(errors::error_unknown_interface(
                comp.interner.resolve(name),
                span,
            )),
            MissingKind::Silent => {}
        }
    }
    base
}

fn resolve_with_rule<'a>(
    comp: &Compilation<'a>,
    name: Ident,
    scope_lib: LibraryId,
    rule: Option<&ConfigRule<'a>>,
    config_ctx: Option<ResolvedConfigId>,
    span: Span,
) -> Option<DefOrConfig> {
    let use_cell = rule.and_then(|r| r.use_cell.as_ref());
    let (target_lib, target_cell, target_config) = match use_cell {
        Some(cell) => (cell.library, cell.cell, cell.target_config),
        None => (None, name, false),
    };

    // Compute the effective search liblist.
    let search: Vec<LibraryId> = if let Some(lib_name) = target_lib {
        // An explicit library qualifier bypasses every liblist.
        match comp.libraries.get(lib_name) {
            Some(id) => vec![id],
            None => {
                comp.sink.emit(errors::error_unknown_library(
                    comp.interner.resolve(lib_name),
                    span,
                ));
                return None;
            }
        }
    } else if let Some(liblist) = rule.and_then(|r| r.liblist.as_ref()) {
        liblist.clone()
    } else if let Some(inherited) = config_ctx
        .map(|rc| &comp.resolved_configs[rc].liblist)
        .filter(|l| !l.is_empty())
    {
        inherited.clone()
    } else {
        let mut order = vec![scope_lib];
        order.extend(
            comp.libraries
                .search_order()
                .into_iter()
                .filter(|lib| *lib != scope_lib),
        );
        order
    };

    // Earliest-listed library wins; names are unique within one library.
    for library in search {
        if let Some(entry) = comp.registry.get(target_cell, library) {
            match entry {
                DefOrConfig::Config(_) => return Some(entry),
                DefOrConfig::Def(def) => {
                    if target_config {
                        // A `: config` target only matches config blocks.
                        continue;
                    }
                    // Packages share the namespace but are not cells.
                    if comp.definitions[def].kind == DefKind::Package {
                        continue;
                    }
                    return Some(entry);
                }
            }
        }
    }
    None
}

/// Resolves a package definition by name through the global search order.
pub(crate) fn resolve_package<'a>(comp: &Compilation<'a>, name: Ident) -> Option<DefId> {
    for library in comp.libraries.search_order() {
        if let Some(DefOrConfig::Def(def)) = comp.registry.get(name, library) {
            if comp.definitions[def].kind == DefKind::Package {
                return Some(def);
            }
        }
    }
    None
}

/// Returns the declaration span of a registry entry, for duplicate
/// diagnostics.
pub(crate) fn entry_span(comp: &Compilation<'_>, entry: DefOrConfig) -> Span {
    match entry {
        DefOrConfig::Def(def) => comp.definitions[def].span,
        DefOrConfig::Config(config) => comp.configs[config].span,
    }
}
