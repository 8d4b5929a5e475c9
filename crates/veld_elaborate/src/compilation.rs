//! The compilation object owning all arenas and driving elaboration.

use std::collections::{HashMap, HashSet};
use veld_ast::{ConfigDecl, ModuleItem, SourceUnit, Stmt, UnitItem};
use veld_common::{Ident, Interner};
use veld_diagnostics::DiagnosticSink;
use veld_hier::{
    Arena, BodyId, ConfigId, Connection, DefId, Hierarchy, LibraryId, PortSym, ResolvedConfigId,
    SymbolId,
};

use crate::config::{ConfigBlock, ResolvedConfig};
use crate::definition::Definition;
use crate::elaborator;
use crate::errors;
use crate::library::LibraryRegistry;
use crate::options::CompilationOptions;
use crate::overrides::{self, HierarchyOverrideGraph};
use crate::ports;
use crate::registry::{self, DefinitionRegistry, DefOrConfig};

/// One compilation: the arenas owning every definition, configuration,
/// override node, and elaborated symbol, plus the registries that resolve
/// names between them.
///
/// The parsed trees, the interner, and the diagnostic sink are borrowed for
/// the compilation's lifetime `'a`; everything the elaborator builds points
/// back into them with `'a` references or arena IDs.
pub struct Compilation<'a> {
    /// The options elaboration runs under.
    pub options: CompilationOptions,
    /// The shared string interner.
    pub interner: &'a Interner,
    /// The shared diagnostic sink.
    pub sink: &'a DiagnosticSink,
    /// The registered source libraries.
    pub libraries: LibraryRegistry,
    /// All registered definitions.
    pub definitions: Arena<DefId, Definition<'a>>,
    /// All constructed configuration blocks.
    pub configs: Arena<ConfigId, ConfigBlock<'a>>,
    /// Per-traversal resolved configuration contexts.
    pub resolved_configs: Arena<ResolvedConfigId, ResolvedConfig>,
    /// The `(name, library)` index.
    pub registry: DefinitionRegistry,
    /// The hierarchy override graph built from defparams and binds.
    pub overrides: HierarchyOverrideGraph<'a>,
    /// The elaborated tree.
    pub hierarchy: Hierarchy<'a>,
    pub(crate) std_package: Ident,
    pub(crate) units: Vec<(&'a SourceUnit, LibraryId)>,
    pub(crate) config_decls: Vec<(&'a ConfigDecl, LibraryId)>,
    pub(crate) package_bodies: HashMap<DefId, BodyId>,
    pub(crate) packages_in_progress: HashSet<DefId>,
    pub(crate) local_checker_defs: HashMap<(DefId, Ident), DefId>,
    pub(crate) instantiated_names: HashSet<Ident>,
}

impl<'a> Compilation<'a> {
    /// Creates an empty compilation with the given options.
    pub fn new(
        interner: &'a Interner,
        sink: &'a DiagnosticSink,
        options: CompilationOptions,
    ) -> Self {
        let libraries = LibraryRegistry::new(interner);
        let std_package = interner.get_or_intern("std");
        Self {
            options,
            interner,
            sink,
            libraries,
            definitions: Arena::new(),
            configs: Arena::new(),
            resolved_configs: Arena::new(),
            registry: DefinitionRegistry::new(),
            overrides: HierarchyOverrideGraph::new(),
            hierarchy: Hierarchy::new(),
            std_package,
            units: Vec::new(),
            config_decls: Vec::new(),
            package_bodies: HashMap::new(),
            packages_in_progress: HashSet::new(),
            local_checker_defs: HashMap::new(),
            instantiated_names: HashSet::new(),
        }
    }

    /// Registers a source library by name, establishing its priority.
    pub fn add_library(&mut self, name: &str) -> LibraryId {
        let name = self.interner.get_or_intern(name);
        self.libraries.register(name)
    }

    /// Registers a parsed source unit, tagged with an owning library (or
    /// the default library).
    ///
    /// Definitions and primitives are indexed immediately; configuration
    /// blocks are constructed at the start of [`elaborate`](Self::elaborate)
    /// once every library is registered.
    pub fn add_source_unit(&mut self, unit: &'a SourceUnit, library: Option<LibraryId>) {
        let library = library.unwrap_or_else(|| self.libraries.default_library());
        self.units.push((unit, library));

        for item in &unit.items {
            match item {
                UnitItem::Module(decl) => {
                    let def = Definition::from_unit(decl, library, self.interner, self.sink);
                    self.register_definition(def);
                }
                UnitItem::Primitive(decl) => {
                    let def = Definition::from_primitive(decl, library);
                    self.register_definition(def);
                }
                UnitItem::Config(decl) => {
                    self.config_decls.push((decl, library));
                }
                UnitItem::Bind(_) => {
                    // Collected by the override graph pre-pass.
                }
            }
        }
    }

    fn register_definition(&mut self, def: Definition<'a>) {
        let (name, library, span) = (def.name, def.library, def.span);
        let id = self.definitions.alloc(def);
        if let Err(existing) = self
            .registry
            .insert(name, library, DefOrConfig::Def(id))
        {
            self.sink.emit(errors::error_duplicate_definition(
                self.interner.resolve(name),
                span,
                registry::entry_span(self, existing),
            ));
        }
    }

    /// Elaborates the design: selects top-level instances and recursively
    /// builds the instance tree.
    pub fn elaborate(&mut self) {
        self.apply_library_order();
        self.build_configs();
        overrides::build_override_graph(self);
        self.scan_instantiated_names();
        elaborator::elaborate_tops(self);
        self.report_unused_config_rules();
    }

    /// The elaborated top-level instances, in selection order.
    pub fn top_instances(&self) -> &[SymbolId] {
        &self.hierarchy.tops
    }

    /// Resolves (if needed) and returns an instance's port list.
    pub fn port_list(&mut self, body: BodyId) -> &[PortSym<'a>] {
        ports::resolve_port_list(self, body);
        self.hierarchy.bodies[body]
            .ports
            .get()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resolves (if needed) and returns an instance's port connections.
    ///
    /// Idempotent: the connection map is memoised on first resolution, and
    /// re-entrant calls observe the already-started resolution instead of
    /// recomputing.
    pub fn port_connections(&mut self, instance: SymbolId) -> &[Connection<'a>] {
        ports::resolve_port_connections(self, instance);
        match self.hierarchy.symbols[instance].as_instance() {
            Some(inst) => inst
                .connections
                .get()
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            None => &[],
        }
    }

    fn apply_library_order(&mut self) {
        if self.options.library_order.is_empty() {
            return;
        }
        let mut order = Vec::new();
        for name in &self.options.library_order {
            match self
                .interner
                .get(name)
                .and_then(|ident| self.libraries.get(ident))
            {
                Some(id) => order.push(id),
                None => self.sink.emit(errors::error_unknown_library(
                    name,
                    veld_source::Span::DUMMY,
                )),
            }
        }
        self.libraries.set_explicit_order(order);
    }

    fn build_configs(&mut self) {
        let decls = std::mem::take(&mut self.config_decls);
        for (decl, library) in decls.iter().copied() {
            let block = ConfigBlock::from_syntax(decl, library, &self.libraries, self.sink);
            let (name, span) = (block.name, block.span);
            let id = self.configs.alloc(block);
            if let Err(existing) = self
                .registry
                .insert(name, library, DefOrConfig::Config(id))
            {
                self.sink.emit(errors::error_duplicate_definition(
                    self.interner.resolve(name),
                    span,
                    registry::entry_span(self, existing),
                ));
            }
        }
        self.config_decls = decls;
    }

    /// Records every definition name referenced by an instantiation, for
    /// implicit-top detection.
    fn scan_instantiated_names(&mut self) {
        fn scan_items(items: &[ModuleItem], names: &mut HashSet<Ident>) {
            for item in items {
                match item {
                    ModuleItem::Instantiation(inst) => {
                        names.insert(inst.module);
                    }
                    ModuleItem::Bind(bind) => {
                        names.insert(bind.instantiation.module);
                    }
                    ModuleItem::GenerateIf(gen) => {
                        scan_items(&gen.then_block.items, names);
                        if let Some(else_block) = &gen.else_block {
                            scan_items(&else_block.items, names);
                        }
                    }
                    ModuleItem::GenerateBlock(block) => scan_items(&block.items, names),
                    ModuleItem::Procedural(proc) => scan_stmt(&proc.body, names),
                    ModuleItem::CheckerDecl(decl) => scan_items(&decl.items, names),
                    _ => {}
                }
            }
        }
        fn scan_stmt(stmt: &Stmt, names: &mut HashSet<Ident>) {
            match stmt {
                Stmt::Block { body, .. } => body.iter().for_each(|s| scan_stmt(s, names)),
                Stmt::CheckerInstance(inst) => {
                    names.insert(inst.module);
                }
                _ => {}
            }
        }

        let mut names = HashSet::new();
        for (unit, _) in &self.units {
            for item in &unit.items {
                match item {
                    UnitItem::Module(decl) => scan_items(&decl.items, &mut names),
                    UnitItem::Bind(bind) => {
                        names.insert(bind.instantiation.module);
                    }
                    _ => {}
                }
            }
        }
        self.instantiated_names = names;
    }

    /// Reports instance-override rules of used configs that never matched
    /// an elaborated instance.
    fn report_unused_config_rules(&self) {
        use crate::config::InstanceOverrideNode;

        fn walk(node: &InstanceOverrideNode<'_>, sink: &DiagnosticSink) {
            if let Some(rule) = &node.rule {
                if !node.visited.get() {
                    sink.emit(errors::warn_unused_config_rule(rule.span));
                }
            }
            for child in node.children.values() {
                walk(child, sink);
            }
        }

        for (_, config) in self.configs.iter() {
            if !config.used.get() {
                continue;
            }
            for root in config.instance_overrides.values() {
                walk(root, self.sink);
            }
        }
    }
}
