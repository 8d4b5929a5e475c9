//! Port list resolution and port connection building.
//!
//! Both attributes are lazy one-shot cells on the body/instance: port-list
//! resolution may re-enter connection resolution through interface ports,
//! so the first entrant allocates the map and re-entrants observe the
//! in-progress state and return without redoing work.

use std::collections::HashMap;
use veld_ast::{Expr, PortConnectionSyntax, PortKind};
use veld_common::Ident;
use veld_hier::{
    BodyId, Connection, DefId, PortSym, PortSymKind, Symbol, SymbolId,
};
use veld_source::Span;

use crate::builder;
use crate::compilation::Compilation;
use crate::definition::DefKind;
use crate::elaborator;
use crate::errors;
use crate::packages;
use crate::registry::{self, DefOrConfig, MissingKind};

/// Resolves a body's port list on first demand.
///
/// Interface ports resolve their interface definition through the normal
/// library search from the definition's own library.
pub(crate) fn resolve_port_list(comp: &mut Compilation<'_>, body: BodyId) {
    if !comp.hierarchy.bodies[body].ports.begin() {
        return;
    }

    let def = comp.hierarchy.bodies[body].definition;
    let scope_lib = comp.definitions[def].library;
    let port_decls = comp.definitions[def].ports();

    let mut ports = Vec::with_capacity(port_decls.len());
    for decl in port_decls {
        let kind = match &decl.kind {
            PortKind::Net | PortKind::Var => PortSymKind::Value,
            PortKind::Interface { interface, modport } => {
                let resolved = registry::resolve_name(
                    comp,
                    *interface,
                    scope_lib,
                    None,
                    None,
                    decl.span,
                    MissingKind::Interface,
                );
                match resolved {
                    Some(DefOrConfig::Def(iface))
                        if comp.definitions[iface].kind == DefKind::Interface =>
                    {
                        PortSymKind::Interface {
                            interface: iface,
                            modport: *modport,
                        }
                    }
                    Some(_) => {
                        comp.sink.emit(errors::error_unknown_interface(
                            comp.interner.resolve(*interface),
                            decl.span,
                        ));
                        PortSymKind::Value
                    }
                    None => PortSymKind::Value,
                }
            }
        };
        ports.push(PortSym {
            name: decl.name,
            direction: decl.direction,
            kind,
            default: decl.default.as_ref(),
            span: decl.span,
        });
    }

    comp.hierarchy.bodies[body].ports.set(ports);
}

/// Resolves an instance's port connections on first demand.
///
/// The connection map is memoised under a begin-then-set discipline:
/// calling this twice yields the same map, and a re-entrant call during
/// resolution returns immediately.
pub(crate) fn resolve_port_connections<'a>(comp: &mut Compilation<'a>, instance: SymbolId) {
    let Some(inst) = comp.hierarchy.symbols[instance].as_instance() else {
        return;
    };
    let body = inst.body;
    let parent_body = inst.parent_body;
    let syntax = inst.syntax;
    let span = inst.span;

    // The port list must be known before connections can resolve; this may
    // recurse arbitrarily deep before returning.
    resolve_port_list(comp, body);

    let started = match &mut comp.hierarchy.symbols[instance] {
        Symbol::Instance(inst) => inst.connections.begin(),
        _ => false,
    };
    if !started {
        return;
    }

    let ports: Vec<PortSym<'a>> = comp.hierarchy.bodies[body]
        .ports
        .get()
        .cloned()
        .unwrap_or_default();
    let def = comp.hierarchy.bodies[body].definition;
    let def_name = comp
        .interner
        .resolve(comp.definitions[def].name)
        .to_string();

    let connections = match syntax {
        Some(syntax) => build_connections(
            comp,
            parent_body,
            &ports,
            &syntax.connections,
            &def_name,
            span,
        ),
        None => default_connections(comp, parent_body, &ports),
    };

    if let Symbol::Instance(inst) = &mut comp.hierarchy.symbols[instance] {
        inst.connections.set(connections);
    }
}

/// Connections for an instance with no instantiation syntax (a top-level
/// root): interface ports may auto-instantiate their interface definition
/// when the compilation allows it.
fn default_connections<'a>(
    comp: &mut Compilation<'a>,
    parent_body: Option<BodyId>,
    ports: &[PortSym<'a>],
) -> Vec<Connection<'a>> {
    let allow_iface = parent_body.is_none() && comp.options.allow_top_level_iface_ports;
    ports
        .iter()
        .map(|port| match &port.kind {
            PortSymKind::Interface { interface, modport } if allow_iface => {
                let symbol = builder::create_default_instance(comp, *interface, None);
                if let Some(body) = comp.hierarchy.symbols[symbol].body() {
                    elaborator::elaborate_body(comp, body, 0);
                }
                Connection::Interface {
                    symbol,
                    modport: *modport,
                }
            }
            _ => Connection::Unconnected,
        })
        .collect()
}

fn build_connections<'a>(
    comp: &mut Compilation<'a>,
    parent_body: Option<BodyId>,
    ports: &[PortSym<'a>],
    connections: &'a [PortConnectionSyntax],
    def_name: &str,
    instance_span: Span,
) -> Vec<Connection<'a>> {
    let mut ordered: Vec<(Option<&'a Expr>, Span)> = Vec::new();
    let mut named: HashMap<Ident, (Option<&'a Expr>, Span)> = HashMap::new();
    let mut has_wildcard = false;

    for conn in connections {
        match conn {
            PortConnectionSyntax::Ordered { expr, span } => ordered.push((expr.as_ref(), *span)),
            PortConnectionSyntax::Named { name, expr, span } => {
                if named.insert(*name, (expr.as_ref(), *span)).is_some() {
                    comp.sink.emit(errors::error_duplicate_port_connection(
                        comp.interner.resolve(*name),
                        *span,
                    ));
                }
            }
            PortConnectionSyntax::Wildcard { .. } => has_wildcard = true,
        }
    }

    if !ordered.is_empty() && (has_wildcard || !named.is_empty()) {
        comp.sink
            .emit(errors::error_mixed_port_connections(instance_span));
        return ports.iter().map(|_| Connection::Unconnected).collect();
    }

    for (name, (_, span)) in &named {
        if ports.iter().all(|p| p.name != *name) {
            comp.sink.emit(errors::error_unknown_port(
                comp.interner.resolve(*name),
                def_name,
                *span,
            ));
        }
    }

    if !ordered.is_empty() {
        if ordered.len() > ports.len() {
            comp.sink.emit(errors::error_too_many_port_connections(
                ports.len(),
                ordered.len(),
                instance_span,
            ));
        }
        return ports
            .iter()
            .enumerate()
            .map(|(index, port)| match ordered.get(index).copied() {
                Some((Some(expr), _)) => connect_port(comp, parent_body, port, Some(expr), None),
                Some((None, _)) => Connection::Unconnected,
                None => {
                    comp.sink.emit(errors::warn_unconnected_port(
                        comp.interner.resolve(port.name),
                        instance_span,
                    ));
                    Connection::Unconnected
                }
            })
            .collect();
    }

    ports
        .iter()
        .map(|port| {
            if let Some((expr, _span)) = named.get(&port.name).copied() {
                match expr {
                    Some(expr) => connect_port(comp, parent_body, port, Some(expr), None),
                    // An explicitly empty connection leaves the port
                    // unconnected.
                    None => Connection::Unconnected,
                }
            } else if has_wildcard {
                let found = parent_body
                    .map(|pb| packages::scope_contains_name(comp, pb, port.name))
                    .unwrap_or(false);
                if found {
                    connect_port(comp, parent_body, port, None, Some(port.name))
                } else if let Some(default) = port.default {
                    Connection::Default(default)
                } else {
                    comp.sink.emit(errors::error_implicit_port_not_found(
                        comp.interner.resolve(port.name),
                        instance_span,
                    ));
                    Connection::Unconnected
                }
            } else {
                comp.sink.emit(errors::warn_unconnected_port(
                    comp.interner.resolve(port.name),
                    instance_span,
                ));
                Connection::Unconnected
            }
        })
        .collect()
}

/// Builds the connection for one port from an expression or a
/// wildcard-matched name, enforcing interface-port matching.
fn connect_port<'a>(
    comp: &mut Compilation<'a>,
    parent_body: Option<BodyId>,
    port: &PortSym<'a>,
    expr: Option<&'a Expr>,
    implicit_name: Option<Ident>,
) -> Connection<'a> {
    match &port.kind {
        PortSymKind::Value => match (expr, implicit_name) {
            (Some(expr), _) => Connection::Expr(expr),
            (None, Some(name)) => Connection::Implicit { name },
            (None, None) => Connection::Unconnected,
        },
        PortSymKind::Interface { interface, modport } => {
            let name = implicit_name.or(match expr {
                Some(Expr::Identifier { name, .. }) => Some(*name),
                _ => None,
            });
            let span = expr.map(|e| e.span()).unwrap_or(port.span);
            let Some(name) = name else {
                return interface_mismatch(comp, port, *interface, span);
            };
            let Some(symbol) = parent_body.and_then(|pb| comp.hierarchy.find_child(pb, name))
            else {
                return interface_mismatch(comp, port, *interface, span);
            };
            if !matches_interface(comp, symbol, *interface) {
                return interface_mismatch(comp, port, *interface, span);
            }
            Connection::Interface {
                symbol,
                modport: *modport,
            }
        }
    }
}

fn interface_mismatch<'a>(
    comp: &Compilation<'a>,
    port: &PortSym<'a>,
    interface: DefId,
    span: Span,
) -> Connection<'a> {
    comp.sink.emit(errors::error_interface_port_mismatch(
        comp.interner.resolve(port.name),
        comp.interner.resolve(comp.definitions[interface].name),
        span,
    ));
    Connection::Unconnected
}

/// Whether a symbol is an instance (or instance array) of the given
/// interface definition.
fn matches_interface(comp: &Compilation<'_>, symbol: SymbolId, interface: DefId) -> bool {
    match &comp.hierarchy.symbols[symbol] {
        Symbol::Instance(instance) => {
            comp.hierarchy.bodies[instance.body].definition == interface
        }
        Symbol::Array(array) => array
            .elements
            .first()
            .map(|first| matches_interface(comp, *first, interface))
            .unwrap_or(true),
        _ => false,
    }
}
