#![allow(dead_code)]

//! Shared helpers for building parsed trees by hand and navigating the
//! elaborated tree.

use veld_ast::{
    DefinitionKind, InstanceSyntax, Instantiation, ModuleDecl, ModuleItem, NodeId,
    PortConnectionSyntax, SourceUnit, UnitItem,
};
use veld_common::Interner;
use veld_elaborate::Compilation;
use veld_hier::{BodyId, SymbolId};
use veld_source::Span;

/// Hands out unique syntactic identities for hand-built trees.
#[derive(Default)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> NodeId {
        let id = NodeId::from_raw(self.next);
        self.next += 1;
        id
    }
}

pub fn module(interner: &Interner, name: &str) -> ModuleDecl {
    ModuleDecl::empty(DefinitionKind::Module, interner.get_or_intern(name))
}

pub fn unit(items: Vec<UnitItem>) -> SourceUnit {
    SourceUnit {
        items,
        span: Span::DUMMY,
    }
}

/// A single-instance instantiation item with no connections.
pub fn inst(interner: &Interner, module: &str, name: &str, ids: &mut IdGen) -> ModuleItem {
    ModuleItem::Instantiation(Instantiation::simple(
        interner.get_or_intern(module),
        interner.get_or_intern(name),
        ids.next(),
    ))
}

/// An instantiation item declaring several sibling instances.
pub fn inst_many(
    interner: &Interner,
    module: &str,
    names: &[&str],
    ids: &mut IdGen,
) -> ModuleItem {
    ModuleItem::Instantiation(Instantiation {
        module: interner.get_or_intern(module),
        params: Vec::new(),
        delay: None,
        instances: names
            .iter()
            .map(|name| InstanceSyntax::named(interner.get_or_intern(name), ids.next()))
            .collect(),
        attributes: Vec::new(),
        span: Span::DUMMY,
    })
}

/// A single-instance instantiation with explicit port connections.
pub fn inst_conns(
    interner: &Interner,
    module: &str,
    name: &str,
    connections: Vec<PortConnectionSyntax>,
    ids: &mut IdGen,
) -> ModuleItem {
    let mut syntax = InstanceSyntax::named(interner.get_or_intern(name), ids.next());
    syntax.connections = connections;
    ModuleItem::Instantiation(Instantiation {
        module: interner.get_or_intern(module),
        params: Vec::new(),
        delay: None,
        instances: vec![syntax],
        attributes: Vec::new(),
        span: Span::DUMMY,
    })
}

/// Finds the top instance with the given name.
pub fn top_named(comp: &Compilation<'_>, name: &str) -> SymbolId {
    let ident = comp.interner.get(name).expect("name never interned");
    *comp
        .top_instances()
        .iter()
        .find(|id| comp.hierarchy.symbols[**id].name() == Some(ident))
        .expect("no top instance with that name")
}

/// Finds a child symbol of an instance by name.
pub fn child(comp: &Compilation<'_>, parent: SymbolId, name: &str) -> SymbolId {
    let body = body_of(comp, parent);
    let ident = comp.interner.get(name).expect("name never interned");
    comp.hierarchy
        .find_child(body, ident)
        .expect("no child with that name")
}

pub fn body_of(comp: &Compilation<'_>, symbol: SymbolId) -> BodyId {
    comp.hierarchy.symbols[symbol]
        .body()
        .expect("symbol has no body")
}

/// The definition name of an instance symbol.
pub fn def_name(comp: &Compilation<'_>, symbol: SymbolId) -> String {
    let body = body_of(comp, symbol);
    let def = comp.hierarchy.bodies[body].definition;
    comp.interner.resolve(comp.definitions[def].name).to_string()
}

/// The source library name of an instance's definition.
pub fn def_library(comp: &Compilation<'_>, symbol: SymbolId) -> String {
    let body = body_of(comp, symbol);
    let def = comp.hierarchy.bodies[body].definition;
    let library = comp.definitions[def].library;
    comp.interner
        .resolve(comp.libraries.library(library).name)
        .to_string()
}
