//! The elaborated symbol tree: instances, arrays, primitives, checkers, and
//! placeholders.

use crate::arena::Arena;
use crate::ids::{BodyId, DefId, OverrideNodeId, ResolvedConfigId, SymbolId};
use crate::lazy::Lazy;
use crate::value::ParamValue;
use serde::{Deserialize, Serialize};
use veld_ast::{
    Attribute, Direction, Expr, GateType, InstanceSyntax, PackageExport, PackageImport,
};
use veld_common::Ident;
use veld_source::Span;

/// A constant `[left:right]` range of an instance array dimension.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ConstantRange {
    /// The left bound as written.
    pub left: i32,
    /// The right bound as written.
    pub right: i32,
}

impl ConstantRange {
    /// The smaller of the two bounds.
    pub fn lower(&self) -> i32 {
        self.left.min(self.right)
    }

    /// The larger of the two bounds.
    pub fn upper(&self) -> i32 {
        self.left.max(self.right)
    }

    /// The number of elements covered by the range.
    pub fn width(&self) -> u32 {
        (self.upper() - self.lower()) as u32 + 1
    }
}

/// A node of the elaborated tree.
///
/// Dispatch over symbol variants is by matching on this tag; the helpers
/// below cover the common "is it an instance / does it have a body" queries.
#[derive(Debug)]
pub enum Symbol<'a> {
    /// A module/interface/program instance.
    Instance(Instance<'a>),
    /// An n-dimensional replication of instances.
    Array(InstanceArray),
    /// A gate or user-defined primitive instance.
    Primitive(PrimitiveInstance<'a>),
    /// A checker instance.
    Checker(CheckerInstance<'a>),
    /// A placeholder for an unresolvable or untaken instantiation.
    Uninstantiated(UninstantiatedDef<'a>),
}

impl<'a> Symbol<'a> {
    /// The symbol's name, if it has one. Interior array elements and invalid
    /// instances are unnamed.
    pub fn name(&self) -> Option<Ident> {
        match self {
            Symbol::Instance(s) => s.name,
            Symbol::Array(s) => s.name,
            Symbol::Primitive(s) => s.name,
            Symbol::Checker(s) => s.name,
            Symbol::Uninstantiated(s) => s.name,
        }
    }

    /// The symbol's source span.
    pub fn span(&self) -> Span {
        match self {
            Symbol::Instance(s) => s.span,
            Symbol::Array(s) => s.span,
            Symbol::Primitive(s) => s.span,
            Symbol::Checker(s) => s.span,
            Symbol::Uninstantiated(s) => s.span,
        }
    }

    /// The body this symbol owns, if it has one (instances and checkers do).
    pub fn body(&self) -> Option<BodyId> {
        match self {
            Symbol::Instance(s) => Some(s.body),
            Symbol::Checker(s) => Some(s.body),
            _ => None,
        }
    }

    /// Returns the instance variant, if this is one.
    pub fn as_instance(&self) -> Option<&Instance<'a>> {
        match self {
            Symbol::Instance(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the array variant, if this is one.
    pub fn as_array(&self) -> Option<&InstanceArray> {
        match self {
            Symbol::Array(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the primitive-instance variant, if this is one.
    pub fn as_primitive(&self) -> Option<&PrimitiveInstance<'a>> {
        match self {
            Symbol::Primitive(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the checker-instance variant, if this is one.
    pub fn as_checker(&self) -> Option<&CheckerInstance<'a>> {
        match self {
            Symbol::Checker(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the uninstantiated-placeholder variant, if this is one.
    pub fn as_uninstantiated(&self) -> Option<&UninstantiatedDef<'a>> {
        match self {
            Symbol::Uninstantiated(s) => Some(s),
            _ => None,
        }
    }
}

/// A realized occurrence of a definition in the hierarchy.
#[derive(Debug)]
pub struct Instance<'a> {
    /// The instance name; stripped on interior array elements and invalid
    /// instances.
    pub name: Option<Ident>,
    /// Source span of the instance declarator.
    pub span: Span,
    /// Absolute indices from the outermost array dimension, empty for a
    /// non-array instance.
    pub array_path: Vec<i32>,
    /// The instance body.
    pub body: BodyId,
    /// The body whose members contain this instance (`None` for a top).
    pub parent_body: Option<BodyId>,
    /// The configuration context this instance elaborates under, if any.
    pub resolved_config: Option<ResolvedConfigId>,
    /// Attributes from the instantiation statement.
    pub attributes: &'a [Attribute],
    /// The originating syntax; `None` for default (top-level) instances.
    pub syntax: Option<&'a InstanceSyntax>,
    /// Lazily resolved port connections, aligned with the body's port list.
    pub connections: Lazy<Vec<Connection<'a>>>,
}

/// An elaborated instance body.
#[derive(Debug)]
pub struct InstanceBody<'a> {
    /// The definition this body was created from.
    pub definition: DefId,
    /// Back-pointer to the owning instance symbol.
    ///
    /// `None` only transiently during construction; every body reachable
    /// from the finished tree satisfies
    /// `hierarchy[body.parent_instance].body() == body`.
    pub parent_instance: Option<SymbolId>,
    /// The hierarchy-override node that applies to this body, if any.
    pub override_node: Option<OverrideNodeId>,
    /// `true` inside an untaken generate arm or under an unresolved parent.
    pub is_uninstantiated: bool,
    /// `true` if this body was created by a bind directive.
    pub is_from_bind: bool,
    /// Nesting depth of checker bodies (zero for non-checkers).
    pub checker_depth: u32,
    /// Resolved parameter symbols, port parameters first, in declared order.
    pub params: Vec<ParamSym>,
    /// Body members in elaboration order.
    pub members: Vec<Member<'a>>,
    /// Lazily resolved port list.
    pub ports: Lazy<Vec<PortSym<'a>>>,
}

/// A member of an instance body, in elaboration order.
#[derive(Debug)]
pub enum Member<'a> {
    /// The implicit wildcard import of the standard package.
    WildcardImport {
        /// The imported package's name.
        package: Ident,
    },
    /// An explicit package import.
    Import(&'a PackageImport),
    /// A package export declaration.
    Export(&'a PackageExport),
    /// A parameter symbol, by index into [`InstanceBody::params`].
    Param(usize),
    /// A net; `implicit` nets are created by undeclared connection names.
    Net {
        /// The net name.
        name: Ident,
        /// Whether this net was created implicitly.
        implicit: bool,
    },
    /// A variable.
    Var {
        /// The variable name.
        name: Ident,
    },
    /// A child symbol (instance, array, primitive, checker, or placeholder).
    Child(SymbolId),
}

/// A resolved parameter symbol in an instance body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSym {
    /// The parameter name.
    pub name: Ident,
    /// Whether this is a type parameter.
    pub is_type: bool,
    /// Whether this is a local parameter.
    pub is_local: bool,
    /// Whether this is a port parameter.
    pub is_port: bool,
    /// The resolved value.
    pub value: ParamValue,
    /// Source span of the declarator.
    pub span: Span,
}

/// A resolved port symbol on an instance body.
#[derive(Debug, Clone)]
pub struct PortSym<'a> {
    /// The port name.
    pub name: Ident,
    /// The port direction.
    pub direction: Direction,
    /// Value port or interface port.
    pub kind: PortSymKind,
    /// Default connection value, if declared.
    pub default: Option<&'a Expr>,
    /// Source span of the declaration.
    pub span: Span,
}

/// The kind of a resolved port symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSymKind {
    /// An ordinary value port.
    Value,
    /// An interface port that must connect to an instance of `interface`.
    Interface {
        /// The interface definition.
        interface: DefId,
        /// Optional modport restriction.
        modport: Option<Ident>,
    },
}

/// A resolved connection for one port, aligned with the port list.
#[derive(Debug, Clone)]
pub enum Connection<'a> {
    /// An expression connection.
    Expr(&'a Expr),
    /// The port's declared default, used when a wildcard found no match.
    Default(&'a Expr),
    /// A name found in the enclosing scope by a wildcard connection.
    Implicit {
        /// The matched name.
        name: Ident,
    },
    /// An interface port connected to an instance or instance array.
    Interface {
        /// The connected symbol.
        symbol: SymbolId,
        /// The selected modport, if any.
        modport: Option<Ident>,
    },
    /// Explicitly or implicitly left unconnected.
    Unconnected,
}

/// An n-dimensional replication of instances.
///
/// Only the outermost array keeps the user-written name; interior array
/// nodes and the leaf instances are unnamed.
#[derive(Debug)]
pub struct InstanceArray {
    /// The array name (outermost dimension only).
    pub name: Option<Ident>,
    /// Source span.
    pub span: Span,
    /// The evaluated dimension range; `None` if evaluation failed, in which
    /// case `elements` is empty.
    pub range: Option<ConstantRange>,
    /// The elements, one per range position.
    pub elements: Vec<SymbolId>,
}

/// A gate or user-defined primitive instance.
#[derive(Debug)]
pub struct PrimitiveInstance<'a> {
    /// The instance name.
    pub name: Option<Ident>,
    /// Source span.
    pub span: Span,
    /// Which primitive this instantiates.
    pub prim: PrimRef,
    /// Absolute indices from the outermost array dimension.
    pub array_path: Vec<i32>,
    /// Port connections with their checked directions.
    pub connections: Vec<PrimConnection<'a>>,
}

/// A reference to a primitive: a built-in gate or a registered UDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimRef {
    /// A built-in gate.
    Gate(GateType),
    /// A user-defined primitive definition.
    Udp(DefId),
}

/// One checked connection on a primitive instance.
#[derive(Debug, Clone)]
pub struct PrimConnection<'a> {
    /// The connected expression; `None` for an allowed empty UDP port.
    pub expr: Option<&'a Expr>,
    /// The direction assigned by the gate-type arity rules.
    pub direction: Direction,
}

/// A checker instance; its body is re-elaborated per instantiation.
#[derive(Debug)]
pub struct CheckerInstance<'a> {
    /// The instance name.
    pub name: Option<Ident>,
    /// Source span.
    pub span: Span,
    /// The per-instantiation body.
    pub body: BodyId,
    /// The body whose members contain this instance.
    pub parent_body: Option<BodyId>,
    /// Absolute indices from the outermost array dimension.
    pub array_path: Vec<i32>,
    /// Formal-to-actual argument pairings.
    pub connections: Vec<CheckerConnection<'a>>,
}

/// One formal/actual pairing of a checker instance.
#[derive(Debug, Clone)]
pub struct CheckerConnection<'a> {
    /// The formal port name.
    pub formal: Ident,
    /// The formal's direction.
    pub direction: Direction,
    /// The actual expression; `None` for an unconnected output.
    pub actual: Option<&'a Expr>,
    /// `true` when the formal's default expression supplied the actual.
    pub used_default: bool,
}

/// A placeholder for an instantiation whose definition could not be
/// resolved, or that occurs inside an untaken generate arm.
///
/// The textual parameter and port connections are retained so later
/// diagnostics can describe what the user wrote.
#[derive(Debug)]
pub struct UninstantiatedDef<'a> {
    /// The instance name.
    pub name: Option<Ident>,
    /// Source span.
    pub span: Span,
    /// The unresolved definition name.
    pub definition_name: Ident,
    /// Parameter value expressions, in source order.
    pub param_exprs: Vec<&'a Expr>,
    /// Port connection names (`None` for ordered connections).
    pub port_names: Vec<Option<Ident>>,
    /// Port connection expressions (`None` for empty connections).
    pub port_conns: Vec<Option<&'a Expr>>,
}

/// The arenas owning every symbol and body of one compilation, plus the
/// top-level roots.
#[derive(Debug, Default)]
pub struct Hierarchy<'a> {
    /// All symbols.
    pub symbols: Arena<SymbolId, Symbol<'a>>,
    /// All instance bodies.
    pub bodies: Arena<BodyId, InstanceBody<'a>>,
    /// The top-level instances, in selection order.
    pub tops: Vec<SymbolId>,
}

impl<'a> Hierarchy<'a> {
    /// Creates an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instance symbol and patches its body's back-pointer.
    pub fn add_instance(&mut self, instance: Instance<'a>) -> SymbolId {
        let body = instance.body;
        let id = self.symbols.alloc(Symbol::Instance(instance));
        self.bodies[body].parent_instance = Some(id);
        id
    }

    /// Adds a checker-instance symbol and patches its body's back-pointer.
    pub fn add_checker(&mut self, checker: CheckerInstance<'a>) -> SymbolId {
        let body = checker.body;
        let id = self.symbols.alloc(Symbol::Checker(checker));
        self.bodies[body].parent_instance = Some(id);
        id
    }

    /// Returns the instance with the given symbol ID.
    ///
    /// # Panics
    ///
    /// Panics if the symbol is not an instance.
    pub fn instance(&self, id: SymbolId) -> &Instance<'a> {
        self.symbols[id]
            .as_instance()
            .expect("symbol is not an instance")
    }

    /// Finds a child symbol of a body by name.
    pub fn find_child(&self, body: BodyId, name: Ident) -> Option<SymbolId> {
        for member in &self.bodies[body].members {
            if let Member::Child(id) = member {
                if self.symbols[*id].name() == Some(name) {
                    return Some(*id);
                }
            }
        }
        None
    }

    /// Finds a parameter symbol of a body by name.
    pub fn find_param(&self, body: BodyId, name: Ident) -> Option<&ParamSym> {
        self.bodies[body].params.iter().find(|p| p.name == name)
    }

    /// Returns `true` if two bodies have the same type: the same definition
    /// with pairwise equal parameter values.
    pub fn has_same_type(&self, a: BodyId, b: BodyId) -> bool {
        if a == b {
            return true;
        }
        let (a, b) = (&self.bodies[a], &self.bodies[b]);
        a.definition == b.definition
            && a.params.len() == b.params.len()
            && a.params
                .iter()
                .zip(&b.params)
                .all(|(l, r)| l.is_type == r.is_type && l.value == r.value)
    }
}
