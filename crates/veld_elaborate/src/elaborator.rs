//! The elaboration driver: top selection, instantiation resolution,
//! configuration redirection, and containment rules.

use std::collections::{HashMap, HashSet};
use veld_ast::{
    BindDirective, Expr, GenerateBlock, Instantiation, InstanceSyntax, ModuleItem,
    PortConnectionSyntax, ProceduralBlock, ProceduralKind, Stmt,
};
use veld_common::Ident;
use veld_hier::{
    BodyId, ConfigId, DefId, Member, ParamSym, ParamValue, ResolvedConfigId, Symbol, SymbolId,
    UninstantiatedDef,
};
use veld_source::Span;

use crate::builder::{self, InstanceCreateCtx};
use crate::checker;
use crate::compilation::Compilation;
use crate::config::{ConfigCellId, ConfigRule};
use crate::definition::DefKind;
use crate::errors;
use crate::eval::{self, ConstEnv};
use crate::packages;
use crate::registry::{self, DefOrConfig, MissingKind};

/// A selected top-level root: a module definition, optionally elaborated
/// under a configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TopCandidate {
    pub def: DefId,
    pub config: Option<ConfigId>,
}

/// Context for walking one body's items, cheap to copy into generate and
/// procedural recursion.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WalkCtx {
    pub body: BodyId,
    pub def: DefId,
    pub def_kind: DefKind,
    pub depth: u32,
    pub uninstantiated: bool,
}

/// Selects top candidates and elaborates each into a root instance.
pub(crate) fn elaborate_tops(comp: &mut Compilation<'_>) {
    let candidates = select_tops(comp);
    for candidate in candidates {
        log::debug!(
            "elaborating top `{}`{}",
            comp.interner.resolve(comp.definitions[candidate.def].name),
            if candidate.config.is_some() {
                " under config"
            } else {
                ""
            }
        );
        let id = builder::create_default_instance(comp, candidate.def, candidate.config);
        if let Some(body) = comp.hierarchy.symbols[id].body() {
            elaborate_body(comp, body, 0);
        }
        comp.hierarchy.tops.push(id);
    }
}

/// Selects top-level roots from the explicit top list, or by implicit-top
/// detection: modules that are never instantiated and have no defaultless
/// port parameters.
pub(crate) fn select_tops(comp: &mut Compilation<'_>) -> Vec<TopCandidate> {
    let mut result = Vec::new();

    if comp.options.top.is_empty() {
        for (id, def) in comp.definitions.iter() {
            if def.kind != DefKind::Module {
                continue;
            }
            if comp.instantiated_names.contains(&def.name) {
                continue;
            }
            let has_unbound_port_param = def
                .parameters
                .iter()
                .any(|p| p.is_port && !p.is_local && !p.has_default());
            if has_unbound_port_param {
                continue;
            }
            result.push(TopCandidate {
                def: id,
                config: None,
            });
        }
        return result;
    }

    let specs = comp.options.top.clone();
    for spec in &specs {
        resolve_top_spec(comp, spec, &mut result);
    }
    result
}

/// Resolves one `[lib.]name[:config]` top spec.
fn resolve_top_spec(comp: &mut Compilation<'_>, spec: &str, out: &mut Vec<TopCandidate>) {
    let (name_part, want_config) = match spec.rsplit_once(':') {
        Some((name, "config")) => (name, true),
        Some(_) => {
            comp.sink.emit(errors::error_invalid_top(spec, Span::DUMMY));
            return;
        }
        None => (spec, false),
    };
    let (lib_part, cell_part) = match name_part.split_once('.') {
        Some((lib, cell)) => (Some(lib), cell),
        None => (None, name_part),
    };

    let Some(name) = comp.interner.get(cell_part) else {
        comp.sink.emit(errors::error_invalid_top(cell_part, Span::DUMMY));
        return;
    };

    // A qualified name bypasses the search order entirely.
    let search = match lib_part {
        Some(lib_name) => {
            match comp
                .interner
                .get(lib_name)
                .and_then(|ident| comp.libraries.get(ident))
            {
                Some(id) => vec![id],
                None => {
                    comp.sink
                        .emit(errors::error_unknown_library(lib_name, Span::DUMMY));
                    return;
                }
            }
        }
        None => comp.libraries.search_order(),
    };

    let mut entry = None;
    for library in search {
        if let Some(found) = comp.registry.get(name, library) {
            if want_config && !matches!(found, DefOrConfig::Config(_)) {
                continue;
            }
            entry = Some(found);
            break;
        }
    }

    match entry {
        None => comp.sink.emit(errors::error_invalid_top(cell_part, Span::DUMMY)),
        Some(DefOrConfig::Def(def)) => {
            if comp.definitions[def].kind == DefKind::Module {
                out.push(TopCandidate { def, config: None });
            } else {
                comp.sink
                    .emit(errors::error_invalid_top(cell_part, Span::DUMMY));
                create_invalid(comp, def);
            }
        }
        Some(DefOrConfig::Config(config)) => expand_config_tops(comp, config, out),
    }
}

/// Creates an unnamed, uninstantiated placeholder for a definition selected
/// in a position it cannot fill, so downstream references do not cascade.
fn create_invalid(comp: &mut Compilation<'_>, def: DefId) {
    let id = builder::create_invalid_instance(comp, def);
    if let Some(body) = comp.hierarchy.symbols[id].body() {
        elaborate_body(comp, body, 0);
    }
}

/// Expands a configuration's top cells, resolved in the config's context.
fn expand_config_tops(comp: &mut Compilation<'_>, config: ConfigId, out: &mut Vec<TopCandidate>) {
    let cells = comp.configs[config].top_cells.clone();
    for cell in cells {
        match resolve_config_cell(comp, config, cell, 0) {
            Some(def) if comp.definitions[def].kind == DefKind::Module => {
                out.push(TopCandidate {
                    def,
                    config: Some(config),
                });
            }
            Some(def) => {
                comp.sink.emit(errors::error_invalid_top(
                    comp.interner.resolve(cell.cell),
                    cell.span,
                ));
                create_invalid(comp, def);
            }
            None => {
                comp.sink.emit(errors::error_invalid_top(
                    comp.interner.resolve(cell.cell),
                    cell.span,
                ));
            }
        }
    }
}

/// Resolves a config cell reference in the config's own context: its
/// explicit library, else the config's library followed by the global
/// search order. (The config's `default liblist` governs resolution inside
/// the design, not of the top cells themselves.) A cell that names another
/// configuration chains through it, requiring a single top cell at each
/// step.
pub(crate) fn resolve_config_cell(
    comp: &Compilation<'_>,
    config: ConfigId,
    cell: ConfigCellId,
    depth: u32,
) -> Option<DefId> {
    if depth > 8 {
        return None;
    }

    let search = if let Some(lib_name) = cell.library {
        match comp.libraries.get(lib_name) {
            Some(id) => vec![id],
            None => {
                comp.sink.emit(errors::error_unknown_library(
                    comp.interner.resolve(lib_name),
                    cell.span,
                ));
                return None;
            }
        }
    } else {
        let scope = comp.configs[config].library;
        let mut order = vec![scope];
        order.extend(
            comp.libraries
                .search_order()
                .into_iter()
                .filter(|lib| *lib != scope),
        );
        order
    };

    for library in search {
        match comp.registry.get(cell.cell, library) {
            Some(DefOrConfig::Def(def)) => {
                if comp.definitions[def].kind != DefKind::Package {
                    return Some(def);
                }
            }
            Some(DefOrConfig::Config(inner)) => {
                let tops = &comp.configs[inner].top_cells;
                if tops.len() == 1 {
                    let next = tops[0];
                    return resolve_config_cell(comp, inner, next, depth + 1);
                }
                comp.sink.emit(errors::error_config_redirect_multiple_tops(
                    comp.interner.resolve(comp.configs[inner].name),
                    cell.span,
                ));
                return None;
            }
            None => {}
        }
    }

    comp.sink.emit(errors::error_unknown_module(
        comp.interner.resolve(cell.cell),
        cell.span,
    ));
    None
}

/// Elaborates a body's members, then its deferred bind directives.
pub(crate) fn elaborate_body(comp: &mut Compilation<'_>, body: BodyId, depth: u32) {
    let (def, uninstantiated, n_port) = {
        let b = &comp.hierarchy.bodies[body];
        (
            b.definition,
            b.is_uninstantiated,
            b.params.iter().filter(|p| p.is_port).count(),
        )
    };
    let def_kind = comp.definitions[def].kind;

    if depth >= comp.options.max_hierarchy_depth {
        comp.sink.emit(errors::error_max_instance_depth(
            def_kind.kind_string(),
            comp.options.max_hierarchy_depth,
            comp.definitions[def].span,
        ));
        return;
    }

    let Some(decl) = comp.definitions[def].unit() else {
        return;
    };

    let ctx = WalkCtx {
        body,
        def,
        def_kind,
        depth,
        uninstantiated,
    };
    let mut env = ConstEnv::from_params(&comp.hierarchy.bodies[body].params);
    let mut next_param = n_port;
    walk_items(comp, ctx, &decl.items, &mut env, &mut next_param, true);

    // Deferred members: binds from the override node first, then from the
    // definition, appended after the primary members.
    let binds: Vec<&BindDirective> = {
        let node_binds = comp.hierarchy.bodies[body]
            .override_node
            .map(|node| comp.overrides.nodes[node].binds.clone())
            .unwrap_or_default();
        node_binds
            .into_iter()
            .chain(comp.definitions[def].bind_directives.iter().copied())
            .collect()
    };
    for bind in binds {
        log::debug!(
            "applying bind of `{}` in `{}`",
            comp.interner.resolve(bind.instantiation.module),
            comp.interner.resolve(comp.definitions[def].name),
        );
        resolve_instantiation(comp, ctx, &bind.instantiation, true, &env);
    }
}

fn walk_items<'a>(
    comp: &mut Compilation<'a>,
    ctx: WalkCtx,
    items: &'a [ModuleItem],
    env: &mut ConstEnv,
    next_param: &mut usize,
    top_level: bool,
) {
    for item in items {
        match item {
            ModuleItem::Param(param) => {
                if top_level {
                    // Already resolved by the parameter builder; add the
                    // member in declaration position.
                    let index = *next_param;
                    *next_param += 1;
                    comp.hierarchy.bodies[ctx.body].members.push(Member::Param(index));
                } else {
                    // A parameter inside a generate block is local to it.
                    let value = match &param.default {
                        Some(veld_ast::ParamDefault::Value(expr)) => {
                            eval::eval_expr(expr, env)
                                .map(ParamValue::Int)
                                .unwrap_or(ParamValue::Invalid)
                        }
                        Some(veld_ast::ParamDefault::Type(ty)) => ParamValue::Type(ty.clone()),
                        None => ParamValue::Invalid,
                    };
                    env.insert(param.name, value.clone());
                    let sym = ParamSym {
                        name: param.name,
                        is_type: param.is_type,
                        is_local: true,
                        is_port: false,
                        value,
                        span: param.span,
                    };
                    let b = &mut comp.hierarchy.bodies[ctx.body];
                    let index = b.params.len();
                    b.params.push(sym);
                    b.members.push(Member::Param(index));
                }
            }
            ModuleItem::Net(net) => {
                for name in &net.names {
                    comp.hierarchy.bodies[ctx.body].members.push(Member::Net {
                        name: *name,
                        implicit: false,
                    });
                }
            }
            ModuleItem::Var(var) => {
                for name in &var.names {
                    comp.hierarchy.bodies[ctx.body]
                        .members
                        .push(Member::Var { name: *name });
                }
            }
            ModuleItem::Import(import) => {
                comp.hierarchy.bodies[ctx.body]
                    .members
                    .push(Member::Import(import));
                if import.package != comp.std_package
                    && registry::resolve_package(comp, import.package).is_none()
                {
                    comp.sink.emit(errors::error_unknown_package(
                        comp.interner.resolve(import.package),
                        import.span,
                    ));
                }
            }
            ModuleItem::Export(export) => {
                comp.hierarchy.bodies[ctx.body]
                    .members
                    .push(Member::Export(export));
            }
            ModuleItem::Defparam(_) | ModuleItem::Bind(_) | ModuleItem::CheckerDecl(_) => {
                // Consumed by the pre-elaboration passes.
            }
            ModuleItem::GenerateIf(gen) => {
                let cond = if ctx.uninstantiated {
                    None
                } else {
                    eval::eval_condition(&gen.cond, env)
                };
                let (then_taken, else_taken) = match cond {
                    Some(true) => (true, false),
                    Some(false) => (false, true),
                    None => (false, false),
                };
                walk_generate_arm(comp, ctx, &gen.then_block, then_taken, env, next_param);
                if let Some(else_block) = &gen.else_block {
                    walk_generate_arm(comp, ctx, else_block, else_taken, env, next_param);
                }
            }
            ModuleItem::GenerateBlock(block) => {
                walk_items(comp, ctx, &block.items, env, next_param, false);
            }
            ModuleItem::Procedural(proc) => {
                walk_procedural(comp, ctx, proc, env);
            }
            ModuleItem::Instantiation(inst) => {
                resolve_instantiation(comp, ctx, inst, false, env);
            }
            ModuleItem::GateInstantiation(gate) => {
                if ctx.uninstantiated {
                    continue;
                }
                if ctx.def_kind != DefKind::Module {
                    comp.sink.emit(errors::error_invalid_instance_for_parent(
                        "a primitive",
                        ctx.def_kind.article_string(),
                        gate.span,
                    ));
                    continue;
                }
                let mut seen = HashSet::new();
                for syntax in &gate.instances {
                    create_implicit_nets(comp, ctx.body, syntax, &mut seen);
                    let sym = builder::create_prim_instance(
                        comp,
                        veld_hier::PrimRef::Gate(gate.gate),
                        syntax,
                        env,
                    );
                    comp.hierarchy.bodies[ctx.body].members.push(Member::Child(sym));
                }
            }
        }
    }
}

fn walk_generate_arm<'a>(
    comp: &mut Compilation<'a>,
    ctx: WalkCtx,
    block: &'a GenerateBlock,
    taken: bool,
    env: &mut ConstEnv,
    next_param: &mut usize,
) {
    let arm_ctx = WalkCtx {
        uninstantiated: ctx.uninstantiated || !taken,
        ..ctx
    };
    walk_items(comp, arm_ctx, &block.items, env, next_param, false);
}

fn walk_procedural<'a>(
    comp: &mut Compilation<'a>,
    ctx: WalkCtx,
    proc: &'a ProceduralBlock,
    env: &ConstEnv,
) {
    if ctx.def_kind == DefKind::Checker && proc.kind == ProceduralKind::Always {
        comp.sink.emit(errors::error_always_in_checker(proc.span));
    }
    let in_ff = proc.kind == ProceduralKind::AlwaysFf;
    walk_stmt(comp, ctx, &proc.body, env, false, in_ff);
}

fn walk_stmt<'a>(
    comp: &mut Compilation<'a>,
    ctx: WalkCtx,
    stmt: &'a Stmt,
    env: &ConstEnv,
    in_fork: bool,
    in_ff: bool,
) {
    match stmt {
        Stmt::Block { kind, body, .. } => {
            let fork = in_fork || *kind == veld_ast::BlockKind::ForkJoin;
            for inner in body {
                walk_stmt(comp, ctx, inner, env, fork, in_ff);
            }
        }
        Stmt::Assignment { blocking, span, .. } => {
            if in_ff && *blocking {
                comp.sink.emit(errors::error_blocking_in_always_ff(*span));
            }
        }
        Stmt::CheckerInstance(inst) => {
            if ctx.uninstantiated {
                let mut seen = HashSet::new();
                for syntax in &inst.instances {
                    create_uninstantiated_def(comp, ctx, inst, syntax, &mut seen);
                }
                return;
            }
            if in_fork {
                comp.sink.emit(errors::error_checker_in_fork_join(inst.span));
                return;
            }
            if ctx.def_kind == DefKind::Checker {
                comp.sink
                    .emit(errors::error_checker_in_checker_proc(inst.span));
                return;
            }
            match lookup_checker(comp, ctx.def, inst.module) {
                Some(def) => {
                    checker::create_checker_instances(comp, ctx, def, inst, true, env);
                }
                None => {
                    comp.sink.emit(errors::error_unknown_checker(
                        comp.interner.resolve(inst.module),
                        inst.span,
                    ));
                    let mut seen = HashSet::new();
                    for syntax in &inst.instances {
                        create_uninstantiated_def(comp, ctx, inst, syntax, &mut seen);
                    }
                }
            }
        }
        Stmt::Null { .. } => {}
    }
}

/// Finds a checker by local lookup first (checkers declared inside the
/// enclosing definition), then through the global registry.
fn lookup_checker(comp: &mut Compilation<'_>, scope_def: DefId, name: Ident) -> Option<DefId> {
    if let Some(decl) = comp.definitions[scope_def].local_checkers.get(&name).copied() {
        return Some(checker::local_checker_def(comp, scope_def, decl));
    }
    let scope_lib = comp.definitions[scope_def].library;
    let entry = registry::resolve_name(
        comp,
        name,
        scope_lib,
        None,
        None,
        Span::DUMMY,
        MissingKind::Silent,
    )?;
    match entry {
        DefOrConfig::Def(def) if comp.definitions[def].kind == DefKind::Checker => Some(def),
        _ => None,
    }
}

/// Resolves one hierarchy instantiation statement in a body.
///
/// Handles the uninstantiated short-circuit, checker dispatch, per-instance
/// configuration override rules, configuration re-rooting, and the
/// primitive/checker/module-like dispatch with containment checks.
pub(crate) fn resolve_instantiation<'a>(
    comp: &mut Compilation<'a>,
    ctx: WalkCtx,
    inst: &'a Instantiation,
    is_from_bind: bool,
    env: &ConstEnv,
) {
    let mut seen_nets = HashSet::new();

    // Inside an untaken generate arm or an unresolved parent, only
    // placeholders are created.
    if ctx.uninstantiated {
        for syntax in &inst.instances {
            create_uninstantiated_def(comp, ctx, inst, syntax, &mut seen_nets);
        }
        return;
    }

    // Checker instantiation is name-scoped, so a local lookup precedes the
    // global definition lookup.
    if let Some(decl) = comp.definitions[ctx.def]
        .local_checkers
        .get(&inst.module)
        .copied()
    {
        let def = checker::local_checker_def(comp, ctx.def, decl);
        checker::create_checker_instances(comp, ctx, def, inst, false, env);
        return;
    }

    let scope_lib = comp.definitions[ctx.def].library;
    let resolved_config = comp.hierarchy.bodies[ctx.body]
        .parent_instance
        .and_then(|parent| comp.hierarchy.symbols[parent].as_instance())
        .and_then(|instance| instance.resolved_config);

    // When the governing config carries per-instance rules for our
    // siblings, each instance is handled individually: definitions and
    // parameter values may diverge.
    if let Some(rc) = resolved_config {
        if let Some(sibling_rules) = find_sibling_rules(comp, ctx.body, rc, inst) {
            let mut default_entry: Option<Option<DefOrConfig>> = None;
            for syntax in &inst.instances {
                let rule = syntax
                    .name
                    .and_then(|name| sibling_rules.get(&name))
                    .cloned();
                match rule {
                    Some(rule) => {
                        let entry = registry::resolve_name(
                            comp,
                            inst.module,
                            scope_lib,
                            Some(&rule),
                            Some(rc),
                            syntax.span,
                            MissingKind::Module,
                        );
                        let (def, new_root) = resolve_entry(comp, entry, syntax.span);
                        create_instances(
                            comp,
                            ctx,
                            inst,
                            def,
                            Some(syntax),
                            Some(rule),
                            new_root,
                            Some(rc),
                            is_from_bind,
                            env,
                            &mut seen_nets,
                        );
                    }
                    None => {
                        let entry = *default_entry.get_or_insert_with(|| {
                            registry::resolve_name(
                                comp,
                                inst.module,
                                scope_lib,
                                None,
                                Some(rc),
                                inst.span,
                                MissingKind::Module,
                            )
                        });
                        let (def, new_root) = resolve_entry(comp, entry, syntax.span);
                        create_instances(
                            comp,
                            ctx,
                            inst,
                            def,
                            Some(syntax),
                            None,
                            new_root,
                            Some(rc),
                            is_from_bind,
                            env,
                            &mut seen_nets,
                        );
                    }
                }
            }
            return;
        }
    }

    // Simple case: one lookup covers every instance in the statement.
    let entry = registry::resolve_name(
        comp,
        inst.module,
        scope_lib,
        None,
        resolved_config,
        inst.span,
        MissingKind::Module,
    );
    let (def, new_root) = resolve_entry(comp, entry, inst.span);
    create_instances(
        comp,
        ctx,
        inst,
        def,
        None,
        None,
        new_root,
        resolved_config,
        is_from_bind,
        env,
        &mut seen_nets,
    );
}

/// Converts a lookup result into a definition, re-rooting through a config
/// block: its sole top cell names the actual definition.
fn resolve_entry(
    comp: &Compilation<'_>,
    entry: Option<DefOrConfig>,
    span: Span,
) -> (Option<DefId>, Option<ConfigId>) {
    match entry {
        None => (None, None),
        Some(DefOrConfig::Def(def)) => (Some(def), None),
        Some(DefOrConfig::Config(config)) => {
            let cells = comp.configs[config].top_cells.clone();
            if cells.len() != 1 {
                comp.sink.emit(errors::error_config_redirect_multiple_tops(
                    comp.interner.resolve(comp.configs[config].name),
                    span,
                ));
                return (None, None);
            }
            log::debug!(
                "re-rooting through config `{}`",
                comp.interner.resolve(comp.configs[config].name)
            );
            (
                resolve_config_cell(comp, config, cells[0], 0),
                Some(config),
            )
        }
    }
}

/// Walks up the parent stack to the config root, then down the instance
/// override trie; returns the per-sibling rules when any apply here.
fn find_sibling_rules<'a>(
    comp: &Compilation<'a>,
    body: BodyId,
    rc: ResolvedConfigId,
    inst: &Instantiation,
) -> Option<HashMap<Ident, ConfigRule<'a>>> {
    let resolved = &comp.resolved_configs[rc];
    let config = &comp.configs[resolved.config];
    if config.instance_overrides.is_empty() {
        return None;
    }

    // Record each parent instance name so the trie can be walked downward
    // in the correct order.
    let mut names = Vec::new();
    let mut current = body;
    let root_name = loop {
        let parent = comp.hierarchy.bodies[current].parent_instance?;
        if parent == resolved.root_instance {
            let root_body = comp.hierarchy.symbols[parent].body()?;
            break comp.definitions[comp.hierarchy.bodies[root_body].definition].name;
        }
        let instance = comp.hierarchy.symbols[parent].as_instance()?;
        names.push(instance.name?);
        current = instance.parent_body?;
    };

    let mut node = config.instance_overrides.get(&root_name)?;
    for name in names.iter().rev() {
        node = node.children.get(name)?;
    }
    if node.children.is_empty() {
        return None;
    }

    let mut rules = HashMap::new();
    for syntax in &inst.instances {
        if let Some(name) = syntax.name {
            if let Some(child) = node.children.get(&name) {
                if let Some(rule) = &child.rule {
                    child.visited.set(true);
                    rules.insert(name, rule.clone());
                }
            }
        }
    }
    Some(rules)
}

/// Creates the instances of one statement (or one specific sibling) for a
/// resolved definition, dispatching on its kind.
#[allow(clippy::too_many_arguments)]
fn create_instances<'a>(
    comp: &mut Compilation<'a>,
    ctx: WalkCtx,
    inst: &'a Instantiation,
    def: Option<DefId>,
    specific: Option<&'a InstanceSyntax>,
    rule: Option<ConfigRule<'a>>,
    new_root: Option<ConfigId>,
    parent_rc: Option<ResolvedConfigId>,
    is_from_bind: bool,
    env: &ConstEnv,
    seen_nets: &mut HashSet<Ident>,
) {
    let targets: Vec<&'a InstanceSyntax> = match specific {
        Some(syntax) => vec![syntax],
        None => inst.instances.iter().collect(),
    };

    let Some(def) = def else {
        for syntax in targets {
            create_uninstantiated_def(comp, ctx, inst, syntax, seen_nets);
        }
        return;
    };

    let kind = comp.definitions[def].kind;
    match kind {
        DefKind::Primitive => {
            if ctx.def_kind != DefKind::Module {
                comp.sink.emit(errors::error_invalid_instance_for_parent(
                    "a primitive",
                    ctx.def_kind.article_string(),
                    inst.span,
                ));
            }
            if is_from_bind {
                comp.sink.emit(errors::error_bind_target_primitive(inst.span));
                return;
            }
            for syntax in targets {
                create_implicit_nets(comp, ctx.body, syntax, seen_nets);
                let sym = builder::create_prim_instance(
                    comp,
                    veld_hier::PrimRef::Udp(def),
                    syntax,
                    env,
                );
                comp.hierarchy.bodies[ctx.body].members.push(Member::Child(sym));
            }
        }
        DefKind::Checker => {
            checker::create_checker_instances(comp, ctx, def, inst, false, env);
        }
        DefKind::Package => {
            // Unreachable: the registry never resolves packages as cells.
        }
        DefKind::Module | DefKind::Interface | DefKind::Program => {
            check_containment(comp, ctx, kind, inst.span);

            // A bare `#value` written in primitive style is only a delay on
            // a primitive; on a module-like target it acts as one ordered
            // parameter assignment when the compilation allows it.
            let mut bare_param = None;
            if let Some(delay) = inst.delay.as_ref() {
                if comp.options.allow_bare_val_param_assignment {
                    bare_param = Some(delay);
                } else {
                    comp.sink
                        .emit(errors::error_instance_with_delay(delay.span()));
                }
            }

            let mut is_from_bind = is_from_bind;
            if comp.hierarchy.bodies[ctx.body].is_from_bind {
                if is_from_bind {
                    comp.sink.emit(errors::error_bind_under_bind(inst.span));
                    return;
                }
                // Prevent further binds below a bound scope.
                is_from_bind = true;
            }

            // A rule's liblist override yields a fresh resolved config
            // sharing the same root.
            let mut resolved_config = parent_rc;
            let mut rule_span = None;
            if let Some(rule) = &rule {
                rule_span = Some(rule.span);
                if new_root.is_none() {
                    if let (Some(parent), Some(liblist)) = (parent_rc, &rule.liblist) {
                        let mut cloned = comp.resolved_configs[parent].clone();
                        cloned.liblist = liblist.clone();
                        cloned.rule_span = Some(rule.span);
                        resolved_config = Some(comp.resolved_configs.alloc(cloned));
                    }
                }
            }

            let config_params = rule.as_ref().and_then(|r| r.param_overrides).map(|params| {
                let config_env = parent_rc
                    .map(|rc| {
                        let config = &comp.configs[comp.resolved_configs[rc].config];
                        let mut env = ConstEnv::new();
                        for (name, value) in &config.localparams {
                            env.insert(*name, value.clone());
                        }
                        env
                    })
                    .unwrap_or_default();
                (params, config_env)
            });

            let create_ctx = InstanceCreateCtx {
                def,
                parent_body: Some(ctx.body),
                parent_override: comp.hierarchy.bodies[ctx.body].override_node,
                resolved_config,
                new_config_root: new_root,
                rule_span,
                is_from_bind,
                attributes: &inst.attributes,
                param_assignments: &inst.params,
                bare_param,
                config_params,
            };

            for syntax in targets {
                create_implicit_nets(comp, ctx.body, syntax, seen_nets);
                let sym = builder::create_instance(comp, &create_ctx, syntax, env);
                comp.hierarchy.bodies[ctx.body].members.push(Member::Child(sym));
                elaborate_created(comp, sym, ctx.depth);
            }
        }
    }
}

/// Containment checks for module-like children.
///
/// A program may contain no module-like instances; an interface may contain
/// neither modules nor programs; a checker body may contain no module-like
/// instances at all.
fn check_containment(comp: &Compilation<'_>, ctx: WalkCtx, child: DefKind, span: Span) {
    let invalid = match ctx.def_kind {
        DefKind::Checker => true,
        DefKind::Program => matches!(child, DefKind::Module | DefKind::Interface | DefKind::Program),
        DefKind::Interface => matches!(child, DefKind::Module | DefKind::Program),
        _ => false,
    };
    if invalid {
        comp.sink.emit(errors::error_invalid_instance_for_parent(
            child.article_string(),
            ctx.def_kind.article_string(),
            span,
        ));
    }
}

/// Elaborates the bodies of a freshly created symbol, descending through
/// instance arrays.
pub(crate) fn elaborate_created(comp: &mut Compilation<'_>, symbol: SymbolId, depth: u32) {
    match &comp.hierarchy.symbols[symbol] {
        Symbol::Instance(instance) => {
            let body = instance.body;
            elaborate_body(comp, body, depth + 1);
        }
        Symbol::Array(array) => {
            let elements = array.elements.clone();
            for element in elements {
                elaborate_created(comp, element, depth);
            }
        }
        _ => {}
    }
}

/// Creates implicit nets for undeclared simple identifiers in an instance's
/// connection expressions, once per name per statement, before the
/// instances themselves.
pub(crate) fn create_implicit_nets(
    comp: &mut Compilation<'_>,
    body: BodyId,
    syntax: &InstanceSyntax,
    seen: &mut HashSet<Ident>,
) {
    let def = comp.hierarchy.bodies[body].definition;
    if comp.definitions[def].default_net_type == veld_ast::DefaultNetType::None {
        return;
    }

    let mut candidates = Vec::new();
    for conn in &syntax.connections {
        let expr = match conn {
            PortConnectionSyntax::Ordered { expr, .. }
            | PortConnectionSyntax::Named { expr, .. } => expr.as_ref(),
            PortConnectionSyntax::Wildcard { .. } => None,
        };
        if let Some(expr) = expr {
            collect_identifiers(expr, &mut candidates);
        }
    }

    for name in candidates {
        if seen.contains(&name) {
            continue;
        }
        if packages::scope_contains_name(comp, body, name) {
            continue;
        }
        seen.insert(name);
        comp.hierarchy.bodies[body].members.push(Member::Net {
            name,
            implicit: true,
        });
    }
}

fn collect_identifiers(expr: &Expr, out: &mut Vec<Ident>) {
    match expr {
        Expr::Identifier { name, .. } => out.push(*name),
        Expr::Unary { operand, .. } => collect_identifiers(operand, out),
        Expr::Binary { lhs, rhs, .. } => {
            collect_identifiers(lhs, out);
            collect_identifiers(rhs, out);
        }
        Expr::IntLiteral { .. } => {}
    }
}

/// Creates one uninstantiated-definition placeholder, retaining the textual
/// parameter and port connections for later diagnostics.
pub(crate) fn create_uninstantiated_def<'a>(
    comp: &mut Compilation<'a>,
    ctx: WalkCtx,
    inst: &'a Instantiation,
    syntax: &'a InstanceSyntax,
    seen_nets: &mut HashSet<Ident>,
) {
    create_implicit_nets(comp, ctx.body, syntax, seen_nets);

    let mut param_exprs = Vec::new();
    for assignment in &inst.params {
        match assignment {
            veld_ast::ParamAssignment::Ordered { value, .. } => param_exprs.push(value),
            veld_ast::ParamAssignment::Named {
                value: Some(value), ..
            } => param_exprs.push(value),
            veld_ast::ParamAssignment::Named { value: None, .. } => {}
        }
    }

    let mut port_names = Vec::new();
    let mut port_conns = Vec::new();
    for conn in &syntax.connections {
        match conn {
            PortConnectionSyntax::Ordered { expr, .. } => {
                port_names.push(None);
                port_conns.push(expr.as_ref());
            }
            PortConnectionSyntax::Named { name, expr, .. } => {
                port_names.push(Some(*name));
                port_conns.push(expr.as_ref());
            }
            PortConnectionSyntax::Wildcard { .. } => {}
        }
    }

    let sym = comp
        .hierarchy
        .symbols
        .alloc(Symbol::Uninstantiated(UninstantiatedDef {
            name: syntax.name,
            span: syntax.span,
            definition_name: inst.module,
            param_exprs,
            port_names,
            port_conns,
        }));
    comp.hierarchy.bodies[ctx.body].members.push(Member::Child(sym));
}
