//! The hierarchy override graph: a trie mirroring the instance hierarchy
//! that carries defparam-style parameter overrides and bind directives.

use std::collections::HashMap;
use veld_ast::{
    BindDirective, BindTarget, GenerateBlock, ModuleDecl, ModuleItem, NodeId, PathSegment,
    UnitItem,
};
use veld_common::Ident;
use veld_hier::{Arena, OverrideNodeId, ParamValue};
use veld_source::Span;

use crate::compilation::Compilation;
use crate::errors;
use crate::eval::{self, ConstEnv};
use crate::registry::DefOrConfig;

/// Key for override children recorded against a specific syntactic
/// occurrence: the instance syntax node, or an array element index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideKey {
    /// A specific instance syntax node.
    Syntax(NodeId),
    /// An absolute instance-array element index.
    Index(i32),
}

/// A node of the override trie.
///
/// Children are dual-keyed: by syntactic identity when the build pass could
/// tie a path segment to one instantiation occurrence, and by name
/// otherwise. Lookup prefers the syntactic key.
#[derive(Debug, Default)]
pub struct OverrideNode<'a> {
    /// Parameter overrides applying to the body at this path.
    pub param_overrides: Vec<(Ident, ParamValue, Span)>,
    /// Bind directives targeting the instance at this path.
    pub binds: Vec<&'a BindDirective>,
    /// Children keyed by syntactic identity.
    pub children_by_syntax: HashMap<OverrideKey, OverrideNodeId>,
    /// Children keyed by instance name.
    pub children_by_name: HashMap<Ident, OverrideNodeId>,
}

/// The override trie for one compilation, rooted at top definition names.
#[derive(Debug, Default)]
pub struct HierarchyOverrideGraph<'a> {
    /// All trie nodes.
    pub nodes: Arena<OverrideNodeId, OverrideNode<'a>>,
    /// Root nodes keyed by top definition name.
    pub roots: HashMap<Ident, OverrideNodeId>,
}

impl<'a> HierarchyOverrideGraph<'a> {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The root node for a top definition, if any overrides target it.
    pub fn root(&self, name: Ident) -> Option<OverrideNodeId> {
        self.roots.get(&name).copied()
    }

    fn get_or_create_root(&mut self, name: Ident) -> OverrideNodeId {
        if let Some(&id) = self.roots.get(&name) {
            return id;
        }
        let id = self.nodes.alloc(OverrideNode::default());
        self.roots.insert(name, id);
        id
    }

    fn get_or_create_syntax_child(&mut self, parent: OverrideNodeId, key: OverrideKey) -> OverrideNodeId {
        if let Some(&id) = self.nodes[parent].children_by_syntax.get(&key) {
            return id;
        }
        let id = self.nodes.alloc(OverrideNode::default());
        self.nodes[parent].children_by_syntax.insert(key, id);
        id
    }

    fn get_or_create_name_child(&mut self, parent: OverrideNodeId, name: Ident) -> OverrideNodeId {
        if let Some(&id) = self.nodes[parent].children_by_name.get(&name) {
            return id;
        }
        let id = self.nodes.alloc(OverrideNode::default());
        self.nodes[parent].children_by_name.insert(name, id);
        id
    }

    /// Finds the override child for an instance occurrence: first by
    /// syntactic identity, then by name.
    pub fn lookup_child(
        &self,
        parent: OverrideNodeId,
        syntax: NodeId,
        name: Option<Ident>,
    ) -> Option<OverrideNodeId> {
        let node = &self.nodes[parent];
        if let Some(&id) = node.children_by_syntax.get(&OverrideKey::Syntax(syntax)) {
            return Some(id);
        }
        name.and_then(|n| node.children_by_name.get(&n).copied())
    }

    /// Finds the override child for one array element, by absolute index.
    pub fn lookup_element(&self, parent: OverrideNodeId, index: i32) -> Option<OverrideNodeId> {
        self.nodes[parent]
            .children_by_syntax
            .get(&OverrideKey::Index(index))
            .copied()
    }
}

/// Builds the override graph from defparam items and instance-targeted bind
/// directives, and attaches definition-targeted binds to their definitions.
///
/// Runs once before top selection; the trie is immutable afterwards.
pub(crate) fn build_override_graph(comp: &mut Compilation<'_>) {
    let units = comp.units.clone();
    for (unit, _library) in units {
        for item in &unit.items {
            match item {
                UnitItem::Bind(bind) => apply_bind(comp, bind, None),
                UnitItem::Module(decl) => collect_from_items(comp, decl, &decl.items),
                _ => {}
            }
        }
    }
}

fn collect_from_items<'a>(
    comp: &mut Compilation<'a>,
    enclosing: &'a ModuleDecl,
    items: &'a [ModuleItem],
) {
    for item in items {
        match item {
            ModuleItem::Defparam(defparam) => {
                let value = eval::eval_expr(&defparam.value, &ConstEnv::new())
                    .map(ParamValue::Int)
                    .unwrap_or_else(|| {
                        comp.sink.emit(errors::error_param_not_const(
                            comp.interner.resolve(defparam.param),
                            defparam.span,
                        ));
                        ParamValue::Invalid
                    });
                let node = resolve_path_node(comp, Some(enclosing), &defparam.path);
                comp.overrides.nodes[node]
                    .param_overrides
                    .push((defparam.param, value, defparam.span));
            }
            ModuleItem::Bind(bind) => apply_bind(comp, bind, Some(enclosing)),
            ModuleItem::GenerateIf(gen) => {
                collect_from_items(comp, enclosing, &gen.then_block.items);
                if let Some(else_block) = &gen.else_block {
                    collect_from_items(comp, enclosing, &else_block.items);
                }
            }
            ModuleItem::GenerateBlock(block) => {
                collect_from_items(comp, enclosing, &block.items);
            }
            _ => {}
        }
    }
}

fn apply_bind<'a>(
    comp: &mut Compilation<'a>,
    bind: &'a BindDirective,
    enclosing: Option<&'a ModuleDecl>,
) {
    match &bind.target {
        BindTarget::Definition { name } => {
            // Attach to every definition with that name, across libraries.
            let targets: Vec<_> = comp
                .definitions
                .iter()
                .filter(|(_, def)| def.name == *name)
                .map(|(id, _)| id)
                .collect();
            if targets.is_empty() {
                comp.sink.emit(errors::error_unknown_module(
                    comp.interner.resolve(*name),
                    bind.span,
                ));
                return;
            }
            for id in targets {
                comp.definitions[id].bind_directives.push(bind);
            }
        }
        BindTarget::Instance { path } => {
            let node = resolve_path_node(comp, enclosing, path);
            comp.overrides.nodes[node].binds.push(bind);
        }
    }
}

/// Descends the trie for a hierarchical path, creating nodes as needed.
///
/// The first segment selects the root: a segment naming a registered
/// definition is absolute; otherwise the path is rooted at the enclosing
/// module. While the definition chain can be followed syntactically, each
/// segment is keyed by its instantiation's syntactic identity; once the
/// chain is lost, segments are keyed by name.
fn resolve_path_node<'a>(
    comp: &mut Compilation<'a>,
    enclosing: Option<&'a ModuleDecl>,
    path: &[PathSegment],
) -> OverrideNodeId {
    let (root_name, root_decl, rest): (Ident, Option<&'a ModuleDecl>, &[PathSegment]) = match path
        .first()
    {
        Some(first) if first.index.is_none() && is_definition_name(comp, first.name) => {
            (first.name, find_unit_decl(comp, first.name), &path[1..])
        }
        _ => match (enclosing, path.first()) {
            (Some(decl), _) => (decl.name, Some(decl), path),
            // A unit-scope path whose first segment names no definition can
            // never match an elaborated position; keep it in a detached node.
            (None, Some(first)) => (first.name, None, &path[1..]),
            (None, None) => return comp.overrides.nodes.alloc(OverrideNode::default()),
        },
    };

    let mut node = comp.overrides.get_or_create_root(root_name);
    let mut decl = root_decl;
    for segment in rest {
        match find_instantiation(decl, segment.name) {
            Some((syntax_id, next_module)) => {
                node = comp
                    .overrides
                    .get_or_create_syntax_child(node, OverrideKey::Syntax(syntax_id));
                decl = find_unit_decl(comp, next_module);
            }
            None => {
                node = comp.overrides.get_or_create_name_child(node, segment.name);
                decl = None;
            }
        }
        if let Some(index) = segment.index {
            node = comp
                .overrides
                .get_or_create_syntax_child(node, OverrideKey::Index(index));
        }
    }
    node
}

fn is_definition_name(comp: &Compilation<'_>, name: Ident) -> bool {
    comp.libraries
        .search_order()
        .into_iter()
        .any(|lib| comp.registry.get(name, lib).is_some())
}

fn find_unit_decl<'a>(comp: &Compilation<'a>, name: Ident) -> Option<&'a ModuleDecl> {
    for lib in comp.libraries.search_order() {
        if let Some(DefOrConfig::Def(def)) = comp.registry.get(name, lib) {
            return comp.definitions[def].unit();
        }
    }
    None
}

/// Finds the unique instantiation of `name` among a declaration's items,
/// returning its syntactic identity and the instantiated module's name.
fn find_instantiation(decl: Option<&ModuleDecl>, name: Ident) -> Option<(NodeId, Ident)> {
    fn search(items: &[ModuleItem], name: Ident) -> Option<(NodeId, Ident)> {
        let mut found = None;
        for item in items {
            let hit = match item {
                ModuleItem::Instantiation(inst) => inst
                    .instances
                    .iter()
                    .find(|i| i.name == Some(name))
                    .map(|i| (i.id, inst.module)),
                ModuleItem::GenerateIf(gen) => {
                    let mut hit = search(&gen.then_block.items, name);
                    if let Some(else_block) = &gen.else_block {
                        hit = hit.or_else(|| search(&else_block.items, name));
                    }
                    hit
                }
                ModuleItem::GenerateBlock(GenerateBlock { items, .. }) => search(items, name),
                _ => None,
            };
            if let Some(hit) = hit {
                if found.is_some() {
                    // Ambiguous occurrence; fall back to name keying.
                    return None;
                }
                found = Some(hit);
            }
        }
        found
    }
    search(&decl?.items, name)
}
