//! Checker instantiation: half instance, half macro expansion.
//!
//! A checker's body is re-elaborated per instantiation with the actual
//! arguments substituted for formal assertion ports. Nesting is bounded by
//! `max_checker_instance_depth`.

use std::collections::{HashMap, HashSet};
use veld_ast::{
    Direction, Expr, Instantiation, InstanceSyntax, ModuleDecl, PortConnectionSyntax,
};
use veld_common::Ident;
use veld_hier::{
    CheckerConnection, CheckerInstance, DefId, InstanceArray, Member, Symbol, SymbolId,
};

use crate::body;
use crate::compilation::Compilation;
use crate::definition::Definition;
use crate::elaborator::{self, WalkCtx};
use crate::errors;
use crate::eval::{self, ConstEnv};
use crate::params::ParameterBuilder;

/// Returns (creating on first use) the definition entry for a checker
/// declared locally inside another definition.
pub(crate) fn local_checker_def<'a>(
    comp: &mut Compilation<'a>,
    owner: DefId,
    decl: &'a ModuleDecl,
) -> DefId {
    if let Some(&id) = comp.local_checker_defs.get(&(owner, decl.name)) {
        return id;
    }
    let library = comp.definitions[owner].library;
    let def = Definition::from_unit(decl, library, comp.interner, comp.sink);
    let id = comp.definitions.alloc(def);
    comp.local_checker_defs.insert((owner, decl.name), id);
    id
}

/// Creates checker instances for one instantiation statement.
///
/// Checker instantiations take no parameter assignments; connections bind
/// formals positionally or by name, with unconnected inputs falling back to
/// the formal's default expression.
pub(crate) fn create_checker_instances<'a>(
    comp: &mut Compilation<'a>,
    ctx: WalkCtx,
    def: DefId,
    inst: &'a Instantiation,
    is_procedural: bool,
    env: &ConstEnv,
) {
    if !inst.params.is_empty() {
        comp.sink.emit(errors::error_checker_param_assign(inst.span));
    }

    let depth = comp.hierarchy.bodies[ctx.body].checker_depth + 1;
    if depth > comp.options.max_checker_instance_depth {
        comp.sink.emit(errors::error_max_instance_depth(
            "checker",
            comp.options.max_checker_instance_depth,
            inst.span,
        ));
        return;
    }

    let mut seen_nets = HashSet::new();
    for syntax in &inst.instances {
        if !is_procedural {
            elaborator::create_implicit_nets(comp, ctx.body, syntax, &mut seen_nets);
        }
        if syntax.name.is_none() {
            comp.sink.emit(errors::error_instance_name_required(syntax.span));
        }
        let mut path = Vec::new();
        let sym = recurse_checker(comp, ctx, def, inst, syntax, depth, 0, &mut path, env);
        comp.hierarchy.bodies[ctx.body].members.push(Member::Child(sym));
    }
}

#[allow(clippy::too_many_arguments)]
fn recurse_checker<'a>(
    comp: &mut Compilation<'a>,
    ctx: WalkCtx,
    def: DefId,
    inst: &'a Instantiation,
    syntax: &'a InstanceSyntax,
    checker_depth: u32,
    dim: usize,
    path: &mut Vec<i32>,
    env: &ConstEnv,
) -> SymbolId {
    if dim == syntax.dimensions.len() {
        return create_leaf(comp, ctx, def, inst, syntax, checker_depth, path, env);
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

    let Some(range) = eval::eval_range(dim_syntax, env) else {
        comp.sink.emit(errors::error_invalid_dimension(dim_syntax.span));
        return empty(comp);
    };
    if range.width() > comp.options.max_instance_array {
        comp.sink.emit(errors::error_max_instance_array(
            "checker",
            comp.options.max_instance_array,
            dim_syntax.span,
        ));
        return empty(comp);
    }

    let mut elements = Vec::with_capacity(range.width() as usize);
    for offset in 0..range.width() {
        path.push(range.lower() + offset as i32);
        let element =
            recurse_checker(comp, ctx, def, inst, syntax, checker_depth, dim + 1, path, env);
        path.pop();
        if let Symbol::Checker(checker) = &mut comp.hierarchy.symbols[element] {
            checker.name = None;
        } else if let Symbol::Array(array) = &mut comp.hierarchy.symbols[element] {
            array.name = None;
        }
        elements.push(element);
    }

    comp.hierarchy.symbols.alloc(Symbol::Array(InstanceArray {
        name: syntax.name,
        span: syntax.span,
        range: Some(range),
        elements,
    }))
}

#[allow(clippy::too_many_arguments)]
fn create_leaf<'a>(
    comp: &mut Compilation<'a>,
    ctx: WalkCtx,
    def: DefId,
    _inst: &'a Instantiation,
    syntax: &'a InstanceSyntax,
    checker_depth: u32,
    path: &[i32],
    _env: &ConstEnv,
) -> SymbolId {
    let connections = build_connections(comp, def, syntax);

    let params = {
        let definition = &comp.definitions[def];
        let builder = ParameterBuilder::new(definition.name, &definition.parameters);
        builder.build(comp.interner, comp.sink).0
    };
    let body = body::create_body(comp, def, params, None, false, false, checker_depth);
    let id = comp.hierarchy.add_checker(CheckerInstance {
        name: syntax.name,
        span: syntax.span,
        body,
        parent_body: Some(ctx.body),
        array_path: path.to_vec(),
        connections,
    });
    elaborator::elaborate_body(comp, body, ctx.depth + 1);
    id
}

/// Pairs actuals with the checker's formal assertion ports.
///
/// Output ports are realised as ordinary formal arguments and may stay
/// unconnected; inputs with no connection fall back to their default.
fn build_connections<'a>(
    comp: &mut Compilation<'a>,
    def: DefId,
    syntax: &'a InstanceSyntax,
) -> Vec<CheckerConnection<'a>> {
    let Some(decl) = comp.definitions[def].unit() else {
        return Vec::new();
    };

    let mut ordered: Vec<Option<&'a Expr>> = Vec::new();
    let mut named: HashMap<Ident, (Option<&'a Expr>, veld_source::Span)> = HashMap::new();
    let mut mixed_reported = false;
    for conn in &syntax.connections {
        match conn {
            PortConnectionSyntax::Ordered { expr, span } => {
                if !named.is_empty() && !mixed_reported {
                    comp.sink.emit(errors::error_mixed_port_connections(*span));
                    mixed_reported = true;
                }
                ordered.push(expr.as_ref());
            }
            PortConnectionSyntax::Named { name, expr, span } => {
                if !ordered.is_empty() && !mixed_reported {
                    comp.sink.emit(errors::error_mixed_port_connections(*span));
                    mixed_reported = true;
                }
                if decl.ports.iter().all(|p| p.name != *name) {
                    comp.sink.emit(errors::error_unknown_port(
                        comp.interner.resolve(*name),
                        comp.interner.resolve(decl.name),
                        *span,
                    ));
                    continue;
                }
                if named.insert(*name, (expr.as_ref(), *span)).is_some() {
                    comp.sink.emit(errors::error_duplicate_port_connection(
                        comp.interner.resolve(*name),
                        *span,
                    ));
                }
            }
            PortConnectionSyntax::Wildcard { .. } => {}
        }
    }
    if mixed_reported {
        ordered.clear();
    }

    let mut connections = Vec::with_capacity(decl.ports.len());
    for (index, formal) in decl.ports.iter().enumerate() {
        let actual = if index < ordered.len() {
            ordered[index]
        } else {
            named.get(&formal.name).and_then(|(expr, _)| *expr)
        };

        let (actual, used_default) = match actual {
            Some(expr) => (Some(expr), false),
            None => match formal.default.as_ref() {
                Some(default) => (Some(default), true),
                None => {
                    if formal.direction == Direction::Input {
                        comp.sink.emit(errors::warn_unconnected_port(
                            comp.interner.resolve(formal.name),
                            syntax.span,
                        ));
                    }
                    (None, false)
                }
            },
        };

        connections.push(CheckerConnection {
            formal: formal.name,
            direction: formal.direction,
            actual,
            used_default,
        });
    }

    connections
}
