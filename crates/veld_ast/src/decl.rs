//! Design-unit, parameter, port, and primitive declaration nodes.

use crate::expr::{Expr, Range, TypeRef};
use crate::item::ModuleItem;
use serde::{Deserialize, Serialize};
use veld_common::Ident;
use veld_source::Span;

/// The kind of a design unit declared with a `ModuleDecl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefinitionKind {
    /// `module ... endmodule`
    Module,
    /// `interface ... endinterface`
    Interface,
    /// `program ... endprogram`
    Program,
    /// `package ... endpackage`
    Package,
    /// `checker ... endchecker`
    Checker,
}

/// Default lifetime for variables declared in a design unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifetime {
    /// `static` (the default)
    Static,
    /// `automatic`
    Automatic,
}

/// The default net type in effect for a design unit.
///
/// `None` (from `` `default_nettype none ``) disables implicit net creation
/// in that unit's instantiations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultNetType {
    /// `wire` (the default)
    Wire,
    /// `` `default_nettype none ``
    None,
}

/// A time scale captured from a `timeunit`/`timeprecision` declaration or a
/// `` `timescale `` directive, as powers of ten relative to one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeScale {
    /// Power-of-ten exponent of the time unit (e.g., -9 for `1ns`).
    pub unit_power: i8,
    /// Power-of-ten exponent of the time precision.
    pub precision_power: i8,
}

/// A design unit declaration: module, interface, program, package, or checker.
///
/// Packages have no ports; checkers use the port list for their formal
/// assertion ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDecl {
    /// What kind of design unit this is.
    pub kind: DefinitionKind,
    /// The unit name.
    pub name: Ident,
    /// Default lifetime from the header (`module automatic m;`).
    pub lifetime: Lifetime,
    /// Default net type in effect for this unit.
    pub default_net_type: DefaultNetType,
    /// Optional time scale.
    pub timescale: Option<TimeScale>,
    /// Parameter port list (the ANSI `#(...)` header).
    pub params: Vec<ParamDecl>,
    /// Package imports in the header, in textual order.
    pub imports: Vec<PackageImport>,
    /// Port declarations.
    pub ports: Vec<PortDecl>,
    /// Items declared inside the body.
    pub items: Vec<ModuleItem>,
    /// Source span.
    pub span: Span,
}

impl ModuleDecl {
    /// Creates an empty design unit of the given kind, for programmatic
    /// construction (tests and fixups).
    pub fn empty(kind: DefinitionKind, name: Ident) -> Self {
        Self {
            kind,
            name,
            lifetime: Lifetime::Static,
            default_net_type: DefaultNetType::Wire,
            timescale: None,
            params: Vec::new(),
            imports: Vec::new(),
            ports: Vec::new(),
            items: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

/// A single parameter declarator.
///
/// Parameters in the `#(...)` header are port parameters; parameters in the
/// body are not. A `localparam` keyword sets `is_local`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    /// The parameter name.
    pub name: Ident,
    /// Whether this is a `parameter type` declaration.
    pub is_type: bool,
    /// Whether this was declared with the `localparam` keyword.
    pub is_local: bool,
    /// The default value or default type, if any.
    pub default: Option<ParamDefault>,
    /// Source span.
    pub span: Span,
}

impl ParamDecl {
    /// Convenience constructor for a value parameter with a default.
    pub fn value(name: Ident, default: Expr) -> Self {
        Self {
            name,
            is_type: false,
            is_local: false,
            default: Some(ParamDefault::Value(default)),
            span: Span::DUMMY,
        }
    }
}

/// The default of a parameter declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParamDefault {
    /// A default value expression for a value parameter.
    Value(Expr),
    /// A default type for a type parameter.
    Type(TypeRef),
}

/// Port or formal-argument direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// `input`
    Input,
    /// `output`
    Output,
    /// `inout`
    Inout,
    /// `ref`
    Ref,
}

/// A port declaration in a design unit header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDecl {
    /// The port name.
    pub name: Ident,
    /// Port direction. Interface ports carry no direction.
    pub direction: Direction,
    /// What connects to this port.
    pub kind: PortKind,
    /// Optional packed range.
    pub range: Option<Range>,
    /// Optional default value used when a wildcard connection finds nothing,
    /// or when a checker input is left unconnected.
    pub default: Option<Expr>,
    /// Source span.
    pub span: Span,
}

impl PortDecl {
    /// Convenience constructor for a plain net port.
    pub fn net(name: Ident, direction: Direction) -> Self {
        Self {
            name,
            direction,
            kind: PortKind::Net,
            range: None,
            default: None,
            span: Span::DUMMY,
        }
    }
}

/// The kind of a port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PortKind {
    /// A net-type port.
    Net,
    /// A variable-type port.
    Var,
    /// An interface port (`iface_name.modport port_name`).
    Interface {
        /// The interface definition name.
        interface: Ident,
        /// Optional modport restriction.
        modport: Option<Ident>,
    },
}

/// A package import item (`import p::*;` or `import p::name;`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageImport {
    /// The imported package.
    pub package: Ident,
    /// What is imported from it.
    pub item: ImportItem,
    /// Source span.
    pub span: Span,
}

/// The item part of an import or export declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportItem {
    /// `::*`
    Wildcard,
    /// `::name`
    Name(Ident),
}

/// A package export declaration.
///
/// `export *::*;` is represented with `package == None` and a wildcard item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageExport {
    /// The package whose symbols are re-exported; `None` means any package.
    pub package: Option<Ident>,
    /// What is re-exported.
    pub item: ImportItem,
    /// Source span.
    pub span: Span,
}

/// A net declaration (`wire w1, w2;`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetDecl {
    /// Declared net names.
    pub names: Vec<Ident>,
    /// Source span.
    pub span: Span,
}

/// A variable declaration (`logic v1, v2;`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    /// Declared variable names.
    pub names: Vec<Ident>,
    /// Source span.
    pub span: Span,
}

/// A user-defined primitive declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitiveDecl {
    /// The primitive name.
    pub name: Ident,
    /// The formal ports, in declaration order.
    pub ports: Vec<PrimPortDecl>,
    /// Source span.
    pub span: Span,
}

/// A formal port of a user-defined primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimPortDecl {
    /// The port name.
    pub name: Ident,
    /// The port direction.
    pub direction: PrimPortDirection,
    /// Source span.
    pub span: Span,
}

/// Direction of a user-defined primitive port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimPortDirection {
    /// `input`
    In,
    /// `output`
    Out,
    /// `output reg`
    OutReg,
    /// `inout`
    InOut,
}
