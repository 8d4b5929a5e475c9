//! The instance builder: materializes instances and n-dimensional instance
//! arrays from instantiation syntax.

use veld_ast::{Attribute, Direction, GateType, InstanceSyntax, ParamAssignment, PortConnectionSyntax};
use veld_hier::{
    BodyId, ConfigId, DefId, Instance, InstanceArray, Lazy, OverrideNodeId, PrimConnection,
    PrimRef, PrimitiveInstance, ResolvedConfigId, Symbol, SymbolId,
};

use crate::body;
use crate::compilation::Compilation;
use crate::config::ResolvedConfig;
use crate::errors;
use crate::eval::{self, ConstEnv};
use crate::params::ParameterBuilder;
use veld_source::Span;

/// Everything one instantiation statement contributes to instance
/// creation, shared by all of the statement's instances.
pub(crate) struct InstanceCreateCtx<'a> {
    /// The resolved definition to instantiate.
    pub def: DefId,
    /// The body whose members will contain the new instances.
    pub parent_body: Option<BodyId>,
    /// The parent body's hierarchy-override node, if any.
    pub parent_override: Option<OverrideNodeId>,
    /// The configuration context inherited by the new instances.
    pub resolved_config: Option<ResolvedConfigId>,
    /// When a config rule redirected to a configuration, the new root.
    pub new_config_root: Option<ConfigId>,
    /// Span of the config rule responsible, for diagnostics.
    pub rule_span: Option<Span>,
    /// Whether the instances come from a bind directive.
    pub is_from_bind: bool,
    /// Attributes from the instantiation statement.
    pub attributes: &'a [Attribute],
    /// The instantiation's parameter assignments.
    pub param_assignments: &'a [ParamAssignment],
    /// A bare `#value` accepted as a single ordered parameter assignment.
    pub bare_param: Option<&'a veld_ast::Expr>,
    /// Parameter overrides from a config rule, with the config's localparam
    /// environment.
    pub config_params: Option<(&'a [ParamAssignment], ConstEnv)>,
}

/// Creates an instance or instance array from one instance declarator.
///
/// Dimensions are processed left to right; a dimension that fails to
/// evaluate, or that exceeds `max_instance_array`, is replaced by an empty
/// array so that dangling references produce at most one diagnostic.
pub(crate) fn create_instance<'a>(
    comp: &mut Compilation<'a>,
    ctx: &InstanceCreateCtx<'a>,
    syntax: &'a InstanceSyntax,
    parent_env: &ConstEnv,
) -> SymbolId {
    if syntax.name.is_none() {
        comp.sink.emit(errors::error_instance_name_required(syntax.span));
    }

    let override_node = ctx.parent_override.and_then(|parent| {
        comp.overrides.lookup_child(parent, syntax.id, syntax.name)
    });

    let mut path = Vec::new();
    recurse(comp, ctx, syntax, override_node, 0, &mut path, parent_env)
}

fn recurse<'a>(
    comp: &mut Compilation<'a>,
    ctx: &InstanceCreateCtx<'a>,
    syntax: &'a InstanceSyntax,
    override_node: Option<OverrideNodeId>,
    dim: usize,
    path: &mut Vec<i32>,
    parent_env: &ConstEnv,
) -> SymbolId {
    if dim == syntax.dimensions.len() {
        return create_leaf(comp, ctx, syntax, override_node, path, parent_env);
    }

    let dim_syntax = &syntax.dimensions[dim];
    let empty = |comp: &mut Compilation<'a>| {
        comp.hierarchy.symbols.alloc(Symbol::Array(InstanceArray {
            name: syntax.name,
            span: syntax.span,
            range: None,
            elements: Vec::new(),
        }))
    };

    let Some(range) = eval::eval_range(dim_syntax, parent_env) else {
        comp.sink.emit(errors::error_invalid_dimension(dim_syntax.span));
        return empty(comp);
    };

    if range.width() > comp.options.max_instance_array {
        let kind = comp.definitions[ctx.def].kind.kind_string();
        comp.sink.emit(errors::error_max_instance_array(
            kind,
            comp.options.max_instance_array,
            dim_syntax.span,
        ));
        return empty(comp);
    }

    let mut elements = Vec::with_capacity(range.width() as usize);
    for offset in 0..range.width() {
        let index = range.lower() + offset as i32;
        let child_override = override_node.and_then(|node| comp.overrides.lookup_element(node, index));

        path.push(index);
        let element = recurse(comp, ctx, syntax, child_override, dim + 1, path, parent_env);
        path.pop();

        // Interior nodes carry no name; only the outermost array keeps it.
        clear_symbol_name(comp, element);
        elements.push(element);
    }

    comp.hierarchy.symbols.alloc(Symbol::Array(InstanceArray {
        name: syntax.name,
        span: syntax.span,
        range: Some(range),
        elements,
    }))
}

fn create_leaf<'a>(
    comp: &mut Compilation<'a>,
    ctx: &InstanceCreateCtx<'a>,
    syntax: &'a InstanceSyntax,
    override_node: Option<OverrideNodeId>,
    path: &[i32],
    parent_env: &ConstEnv,
) -> SymbolId {
    let def = &comp.definitions[ctx.def];
    let mut builder = ParameterBuilder::new(def.name, &def.parameters);
    builder.set_parent_env(parent_env.clone());
    builder.set_assignments(ctx.param_assignments, comp.interner, comp.sink);
    if let Some(value) = ctx.bare_param {
        builder.set_bare_assignment(value);
    }
    if let Some((assignments, config_env)) = &ctx.config_params {
        builder.set_config_assignments(assignments, config_env.clone(), comp.interner, comp.sink);
    }
    if let Some(node) = override_node {
        builder.set_overrides(&comp.overrides.nodes[node]);
    }
    let (params, _env) = builder.build(comp.interner, comp.sink);

    let body = body::create_body(comp, ctx.def, params, override_node, false, ctx.is_from_bind, 0);
    let id = comp.hierarchy.add_instance(Instance {
        name: syntax.name,
        span: syntax.span,
        array_path: path.to_vec(),
        body,
        parent_body: ctx.parent_body,
        resolved_config: None,
        attributes: ctx.attributes,
        syntax: Some(syntax),
        connections: Lazy::default(),
    });
    attach_config(comp, id, ctx);
    id
}

/// Creates a default instance of a definition, used for top-level roots and
/// auto-instantiated interface ports.
pub(crate) fn create_default_instance<'a>(
    comp: &mut Compilation<'a>,
    def: DefId,
    config_root: Option<ConfigId>,
) -> SymbolId {
    let definition = &comp.definitions[def];
    let name = definition.name;
    let span = definition.span;
    let override_node = comp.overrides.root(name);

    let mut builder = ParameterBuilder::new(name, &definition.parameters);
    if let Some(node) = override_node {
        builder.set_overrides(&comp.overrides.nodes[node]);
    }
    let (params, _env) = builder.build(comp.interner, comp.sink);

    let body = body::create_body(comp, def, params, override_node, false, false, 0);
    let id = comp.hierarchy.add_instance(Instance {
        name: Some(name),
        span,
        array_path: Vec::new(),
        body,
        parent_body: None,
        resolved_config: None,
        attributes: &[],
        syntax: None,
        connections: Lazy::default(),
    });

    if let Some(config) = config_root {
        let liblist = comp.configs[config].default_liblist.clone();
        comp.configs[config].used.set(true);
        let rc = comp.resolved_configs.alloc(ResolvedConfig {
            config,
            root_instance: id,
            liblist,
            rule_span: None,
        });
        set_instance_config(comp, id, rc);
    }
    id
}

/// Creates an unnamed, uninstantiated instance of a definition.
///
/// Used when a definition is selected in a position it cannot legally fill
/// (for example a non-module named as a top): the placeholder body keeps
/// downstream references from cascading, and its parameters are forced
/// invalid so evaluation short-circuits silently.
pub(crate) fn create_invalid_instance<'a>(comp: &mut Compilation<'a>, def: DefId) -> SymbolId {
    let definition = &comp.definitions[def];
    let name = definition.name;
    let span = definition.span;

    let mut builder = ParameterBuilder::new(name, &definition.parameters);
    builder.set_force_invalid(true);
    let (params, _env) = builder.build(comp.interner, comp.sink);

    let body = body::create_body(comp, def, params, None, true, false, 0);
    comp.hierarchy.add_instance(Instance {
        // No name, so the placeholder cannot be referenced by name.
        name: None,
        span,
        array_path: Vec::new(),
        body,
        parent_body: None,
        resolved_config: None,
        attributes: &[],
        syntax: None,
        connections: Lazy::default(),
    })
}

fn attach_config<'a>(comp: &mut Compilation<'a>, id: SymbolId, ctx: &InstanceCreateCtx<'a>) {
    if let Some(config) = ctx.new_config_root {
        let liblist = comp.configs[config].default_liblist.clone();
        comp.configs[config].used.set(true);
        let rc = comp.resolved_configs.alloc(ResolvedConfig {
            config,
            root_instance: id,
            liblist,
            rule_span: ctx.rule_span,
        });
        set_instance_config(comp, id, rc);
    } else if let Some(rc) = ctx.resolved_config {
        set_instance_config(comp, id, rc);
    }
}

fn set_instance_config(comp: &mut Compilation<'_>, id: SymbolId, rc: ResolvedConfigId) {
    if let Symbol::Instance(inst) = &mut comp.hierarchy.symbols[id] {
        inst.resolved_config = Some(rc);
    }
}

fn clear_symbol_name(comp: &mut Compilation<'_>, id: SymbolId) {
    match &mut comp.hierarchy.symbols[id] {
        Symbol::Instance(s) => s.name = None,
        Symbol::Array(s) => s.name = None,
        Symbol::Primitive(s) => s.name = None,
        Symbol::Checker(s) => s.name = None,
        Symbol::Uninstantiated(s) => s.name = None,
    }
}

/// Creates one primitive instance (gate or UDP), checking the gate-type
/// arity rules eagerly.
pub(crate) fn create_prim_instance<'a>(
    comp: &mut Compilation<'a>,
    prim: PrimRef,
    syntax: &'a InstanceSyntax,
    parent_env: &ConstEnv,
) -> SymbolId {
    if syntax.name.is_none() {
        comp.sink.emit(errors::error_instance_name_required(syntax.span));
    }
    let mut path = Vec::new();
    recurse_prim(comp, prim, syntax, 0, &mut path, parent_env)
}

fn recurse_prim<'a>(
    comp: &mut Compilation<'a>,
    prim: PrimRef,
    syntax: &'a InstanceSyntax,
    dim: usize,
    path: &mut Vec<i32>,
    parent_env: &ConstEnv,
) -> SymbolId {
    if dim == syntax.dimensions.len() {
        let connections = check_prim_connections(comp, prim, syntax);
        return comp.hierarchy.symbols.alloc(Symbol::Primitive(PrimitiveInstance {
            name: syntax.name,
            span: syntax.span,
            prim,
            array_path: path.clone(),
            connections,
        }));
    }

    let dim_syntax = &syntax.dimensions[dim];
    let empty = |comp: &mut Compilation<'a>| {
        comp.hierarchy.symbols.alloc(Symbol::Array(InstanceArray {
            name: syntax.name,
            span: syntax.span,
            range: None,
            elements: Vec::new(),
        }))
    };

    let Some(range) = eval::eval_range(dim_syntax, parent_env) else {
        comp.sink.emit(errors::error_invalid_dimension(dim_syntax.span));
        return empty(comp);
    };
    if range.width() > comp.options.max_instance_array {
        comp.sink.emit(errors::error_max_instance_array(
            "primitive",
            comp.options.max_instance_array,
            dim_syntax.span,
        ));
        return empty(comp);
    }

    let mut elements = Vec::with_capacity(range.width() as usize);
    for offset in 0..range.width() {
        path.push(range.lower() + offset as i32);
        let element = recurse_prim(comp, prim, syntax, dim + 1, path, parent_env);
        path.pop();
        clear_symbol_name(comp, element);
        elements.push(element);
    }

    comp.hierarchy.symbols.alloc(Symbol::Array(InstanceArray {
        name: syntax.name,
        span: syntax.span,
        range: Some(range),
        elements,
    }))
}

/// Checks primitive connections against the gate-type arity rules and
/// assigns directions.
///
/// N-input gates take one output then N inputs; N-output gates take N
/// outputs then one input; UDPs take exactly their declared ports.
fn check_prim_connections<'a>(
    comp: &mut Compilation<'a>,
    prim: PrimRef,
    syntax: &'a InstanceSyntax,
) -> Vec<PrimConnection<'a>> {
    let mut exprs = Vec::new();
    for conn in &syntax.connections {
        match conn {
            PortConnectionSyntax::Ordered { expr: Some(expr), .. } => exprs.push(Some(expr)),
            PortConnectionSyntax::Ordered { expr: None, .. } => {
                if matches!(prim, PrimRef::Gate(_)) {
                    comp.sink.emit(errors::error_invalid_primitive_port_conn(conn_span(conn)));
                    return Vec::new();
                }
                exprs.push(None);
            }
            PortConnectionSyntax::Named { .. } | PortConnectionSyntax::Wildcard { .. } => {
                comp.sink.emit(errors::error_invalid_primitive_port_conn(conn_span(conn)));
                return Vec::new();
            }
        }
    }

    match prim {
        PrimRef::Gate(gate) => {
            if exprs.len() < 2 {
                comp.sink.emit(errors::error_invalid_n_gate_count(gate.name(), syntax.span));
                return Vec::new();
            }
            exprs
                .iter()
                .enumerate()
                .map(|(i, expr)| {
                    let direction = prim_gate_direction(gate, i, exprs.len());
                    PrimConnection {
                        expr: *expr,
                        direction,
                    }
                })
                .collect()
        }
        PrimRef::Udp(def) => {
            let Some(decl) = comp.definitions[def].primitive() else {
                return Vec::new();
            };
            if exprs.len() != decl.ports.len() {
                let name = comp.interner.resolve(decl.name).to_string();
                comp.sink.emit(errors::error_primitive_port_count(
                    &name,
                    decl.ports.len(),
                    exprs.len(),
                    syntax.span,
                ));
                return Vec::new();
            }
            exprs
                .iter()
                .zip(&decl.ports)
                .map(|(expr, port)| PrimConnection {
                    expr: *expr,
                    direction: match port.direction {
                        veld_ast::PrimPortDirection::In => Direction::Input,
                        veld_ast::PrimPortDirection::Out
                        | veld_ast::PrimPortDirection::OutReg => Direction::Output,
                        veld_ast::PrimPortDirection::InOut => Direction::Inout,
                    },
                })
                .collect()
        }
    }
}

fn prim_gate_direction(gate: GateType, index: usize, total: usize) -> Direction {
    if gate.is_n_input() {
        if index == 0 {
            Direction::Output
        } else {
            Direction::Input
        }
    } else if index == total - 1 {
        Direction::Input
    } else {
        Direction::Output
    }
}

fn conn_span(conn: &PortConnectionSyntax) -> Span {
    match conn {
        PortConnectionSyntax::Ordered { span, .. }
        | PortConnectionSyntax::Named { span, .. }
        | PortConnectionSyntax::Wildcard { span } => *span,
    }
}
