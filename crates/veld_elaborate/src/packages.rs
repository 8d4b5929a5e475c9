//! Package body elaboration and wildcard/explicit re-export resolution.

use std::collections::HashSet;
use veld_ast::{ImportItem, ModuleItem, PackageExport, PackageImport};
use veld_common::Ident;
use veld_hier::{BodyId, DefId, Member};

use crate::compilation::Compilation;
use crate::definition::DefKind;
use crate::elaborator;
use crate::params::ParameterBuilder;
use crate::registry;
use crate::body;

/// Force-elaborates a package's body on first demand, memoising the result.
///
/// A re-entrant call for a package already being elaborated returns `None`,
/// so a cyclic lookup reports "not found" instead of looping.
pub(crate) fn ensure_package_body(comp: &mut Compilation<'_>, def: DefId) -> Option<BodyId> {
    if let Some(&existing) = comp.package_bodies.get(&def) {
        return Some(existing);
    }
    if !comp.packages_in_progress.insert(def) {
        return None;
    }

    let params = {
        let definition = &comp.definitions[def];
        let builder = ParameterBuilder::new(definition.name, &definition.parameters);
        builder.build(comp.interner, comp.sink).0
    };
    let package_body = body::create_body(comp, def, params, None, false, false, 0);
    elaborator::elaborate_body(comp, package_body, 0);

    comp.package_bodies.insert(def, package_body);
    comp.packages_in_progress.remove(&def);
    Some(package_body)
}

/// Decides whether a package provides `name`: directly declared, or
/// importable through the package's `export` declarations.
///
/// `export *::*` re-exports anything imported; `export P::*` and
/// `export P::name` restrict re-export to the named package (and name).
pub(crate) fn package_provides(
    comp: &mut Compilation<'_>,
    package: DefId,
    name: Ident,
    visited: &mut HashSet<DefId>,
) -> bool {
    if !visited.insert(package) {
        return false;
    }
    let Some(package_body) = ensure_package_body(comp, package) else {
        return false;
    };

    if body_declares(comp, package_body, name) {
        return true;
    }

    let Some(decl) = comp.definitions[package].unit() else {
        return false;
    };
    let exports: Vec<&PackageExport> = decl
        .items
        .iter()
        .filter_map(|item| match item {
            ModuleItem::Export(export) => Some(export),
            _ => None,
        })
        .collect();
    if exports.is_empty() {
        return false;
    }
    let export_all = exports
        .iter()
        .any(|e| e.package.is_none() && e.item == ImportItem::Wildcard);

    let imports: Vec<&PackageImport> = decl
        .imports
        .iter()
        .chain(decl.items.iter().filter_map(|item| match item {
            ModuleItem::Import(import) => Some(import),
            _ => None,
        }))
        .collect();

    for import in imports {
        let covers = match import.item {
            ImportItem::Wildcard => true,
            ImportItem::Name(imported) => imported == name,
        };
        if !covers {
            continue;
        }
        let permitted = export_all
            || exports.iter().any(|e| {
                e.package == Some(import.package)
                    && match e.item {
                        ImportItem::Wildcard => true,
                        ImportItem::Name(exported) => exported == name,
                    }
            });
        if !permitted {
            continue;
        }
        let Some(source) = registry::resolve_package(comp, import.package) else {
            continue;
        };
        if package_provides(comp, source, name, visited) {
            return true;
        }
    }
    false
}

/// Returns `true` if a body directly declares `name` as a parameter, net,
/// variable, or child symbol.
fn body_declares(comp: &Compilation<'_>, body: BodyId, name: Ident) -> bool {
    let b = &comp.hierarchy.bodies[body];
    for member in &b.members {
        let declared = match member {
            Member::Param(index) => b.params[*index].name == name,
            Member::Net { name: n, .. } | Member::Var { name: n } => *n == name,
            Member::Child(child) => comp.hierarchy.symbols[*child].name() == Some(name),
            _ => false,
        };
        if declared {
            return true;
        }
    }
    false
}

/// Decides whether a name is visible in a body's scope: its own
/// declarations and ports, then names importable through its package
/// imports (including re-exports).
pub(crate) fn scope_contains_name(comp: &mut Compilation<'_>, body: BodyId, name: Ident) -> bool {
    if body_declares(comp, body, name) {
        return true;
    }

    let def = comp.hierarchy.bodies[body].definition;
    if comp.definitions[def].ports().iter().any(|p| p.name == name) {
        return true;
    }
    if comp.definitions[def].parameters.iter().any(|p| p.name == name) {
        return true;
    }

    // Consult package imports, resolving re-exports; the standard package
    // is a built-in with no members.
    let imports: Vec<(Ident, ImportItem)> = comp.hierarchy.bodies[body]
        .members
        .iter()
        .filter_map(|member| match member {
            Member::Import(import) => Some((import.package, import.item)),
            Member::WildcardImport { package } => Some((*package, ImportItem::Wildcard)),
            _ => None,
        })
        .collect();

    for (package, item) in imports {
        if package == comp.std_package {
            continue;
        }
        let covers = match item {
            ImportItem::Wildcard => true,
            ImportItem::Name(imported) => imported == name,
        };
        if !covers {
            continue;
        }
        let Some(def) = registry::resolve_package(comp, package) else {
            continue;
        };
        debug_assert_eq!(comp.definitions[def].kind, DefKind::Package);
        let mut visited = HashSet::new();
        if package_provides(comp, def, name, &mut visited) {
            return true;
        }
    }
    false
}
