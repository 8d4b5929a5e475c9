//! Module body items: instantiations, generate constructs, overrides, binds,
//! and the minimal statement grammar checker rules inspect.

use crate::decl::{ModuleDecl, NetDecl, PackageExport, PackageImport, ParamDecl, VarDecl};
use crate::expr::{Expr, Range};
use crate::NodeId;
use serde::{Deserialize, Serialize};
use veld_common::Ident;
use veld_source::Span;

/// An item inside a design unit body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModuleItem {
    /// A module/interface/program/checker/UDP instantiation statement.
    Instantiation(Instantiation),
    /// A built-in gate instantiation (`and g1(o, a, b);`).
    GateInstantiation(GateInstantiation),
    /// A body `parameter` or `localparam` declaration.
    Param(ParamDecl),
    /// A net declaration.
    Net(NetDecl),
    /// A variable declaration.
    Var(VarDecl),
    /// A package import.
    Import(PackageImport),
    /// A package export (inside packages).
    Export(PackageExport),
    /// A `defparam` hierarchy override.
    Defparam(DefparamDecl),
    /// A bind directive.
    Bind(BindDirective),
    /// A conditional generate construct.
    GenerateIf(GenerateIf),
    /// A named sequential generate block at item level.
    GenerateBlock(GenerateBlock),
    /// A procedural block (`always_comb`, `always_ff`, `initial`, ...).
    Procedural(ProceduralBlock),
    /// A nested checker declaration.
    CheckerDecl(Box<ModuleDecl>),
}

/// A hierarchy instantiation statement: one definition name, optional
/// parameter assignments, and one or more named instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instantiation {
    /// The instantiated definition's name.
    pub module: Ident,
    /// Parameter value assignments (`#(...)`).
    pub params: Vec<ParamAssignment>,
    /// A bare `#value` written in primitive style. On a primitive this is a
    /// delay; a module-like target may reinterpret it as a single ordered
    /// parameter assignment when the compilation allows it.
    pub delay: Option<Expr>,
    /// The instances created by this statement, in source order.
    pub instances: Vec<InstanceSyntax>,
    /// Attributes attached to the statement (`(* ... *)`).
    pub attributes: Vec<Attribute>,
    /// Source span.
    pub span: Span,
}

impl Instantiation {
    /// Convenience constructor for a single unconnected instance.
    pub fn simple(module: Ident, instance: Ident, id: NodeId) -> Self {
        Self {
            module,
            params: Vec::new(),
            delay: None,
            instances: vec![InstanceSyntax::named(instance, id)],
            attributes: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

/// One instance within an instantiation statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSyntax {
    /// Syntactic identity of this instance occurrence.
    pub id: NodeId,
    /// The instance name; `None` when the declarator is missing entirely.
    pub name: Option<Ident>,
    /// Unpacked dimensions making this an instance array.
    pub dimensions: Vec<Range>,
    /// Port connections.
    pub connections: Vec<PortConnectionSyntax>,
    /// Source span.
    pub span: Span,
}

impl InstanceSyntax {
    /// Convenience constructor for a named instance with no dimensions or
    /// connections.
    pub fn named(name: Ident, id: NodeId) -> Self {
        Self {
            id,
            name: Some(name),
            dimensions: Vec::new(),
            connections: Vec::new(),
            span: Span::DUMMY,
        }
    }
}

/// A parameter value assignment in an instantiation or config rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParamAssignment {
    /// A positional assignment.
    Ordered {
        /// The assigned value.
        value: Expr,
        /// Source span.
        span: Span,
    },
    /// A named assignment; `value == None` is an empty `.P()`.
    Named {
        /// The target parameter name.
        name: Ident,
        /// The assigned value, if any.
        value: Option<Expr>,
        /// Source span.
        span: Span,
    },
}

/// A port connection in an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PortConnectionSyntax {
    /// A positional connection.
    Ordered {
        /// The connected expression; `None` for an empty slot.
        expr: Option<Expr>,
        /// Source span.
        span: Span,
    },
    /// A named connection; `expr == None` is an explicitly empty `.p()`.
    Named {
        /// The formal port name.
        name: Ident,
        /// The connected expression, if any.
        expr: Option<Expr>,
        /// Source span.
        span: Span,
    },
    /// The `.*` wildcard connection.
    Wildcard {
        /// Source span.
        span: Span,
    },
}

/// An attribute instance attached to a statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    /// The attribute name.
    pub name: Ident,
    /// Optional constant value.
    pub value: Option<i64>,
    /// Source span.
    pub span: Span,
}

/// A built-in gate instantiation statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateInstantiation {
    /// Which gate.
    pub gate: GateType,
    /// The gate instances, in source order.
    pub instances: Vec<InstanceSyntax>,
    /// Source span.
    pub span: Span,
}

/// The built-in gate primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateType {
    /// `and`
    And,
    /// `or`
    Or,
    /// `nand`
    Nand,
    /// `nor`
    Nor,
    /// `xor`
    Xor,
    /// `xnor`
    Xnor,
    /// `buf`
    Buf,
    /// `not`
    Not,
}

impl GateType {
    /// Returns `true` for gates taking one output then N inputs.
    ///
    /// The remaining gates (`buf`, `not`) take N outputs then one input.
    pub fn is_n_input(self) -> bool {
        !matches!(self, GateType::Buf | GateType::Not)
    }

    /// The display name of the gate.
    pub fn name(self) -> &'static str {
        match self {
            GateType::And => "and",
            GateType::Or => "or",
            GateType::Nand => "nand",
            GateType::Nor => "nor",
            GateType::Xor => "xor",
            GateType::Xnor => "xnor",
            GateType::Buf => "buf",
            GateType::Not => "not",
        }
    }
}

/// A conditional generate construct with a constant condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateIf {
    /// The condition expression.
    pub cond: Expr,
    /// The block elaborated when the condition is true.
    pub then_block: GenerateBlock,
    /// The block elaborated when the condition is false.
    pub else_block: Option<GenerateBlock>,
    /// Source span.
    pub span: Span,
}

/// A generate block (`begin : name ... end`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateBlock {
    /// Syntactic identity of this block.
    pub id: NodeId,
    /// Optional block label.
    pub name: Option<Ident>,
    /// The items inside the block.
    pub items: Vec<ModuleItem>,
    /// Source span.
    pub span: Span,
}

/// One segment of a hierarchical instance path, optionally selecting an
/// array element (`arr[3]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    /// The instance name.
    pub name: Ident,
    /// An array element index, if one was written.
    pub index: Option<i32>,
}

impl PathSegment {
    /// Convenience constructor for a plain (non-indexed) segment.
    pub fn name(name: Ident) -> Self {
        Self { name, index: None }
    }
}

/// A `defparam` hierarchy override: `defparam path.P = value;`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefparamDecl {
    /// The hierarchical instance path. A path whose first segment names a
    /// definition is absolute; otherwise it is relative to the enclosing
    /// module.
    pub path: Vec<PathSegment>,
    /// The overridden parameter's name (the final path segment).
    pub param: Ident,
    /// The override value.
    pub value: Expr,
    /// Source span.
    pub span: Span,
}

/// A bind directive inserting an instantiation into another scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindDirective {
    /// What the bind targets.
    pub target: BindTarget,
    /// The instantiation to insert.
    pub instantiation: Instantiation,
    /// Source span.
    pub span: Span,
}

/// The target of a bind directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BindTarget {
    /// Bind into every instance of the named definition.
    Definition {
        /// The target definition name.
        name: Ident,
    },
    /// Bind into one specific instance, named by hierarchical path from a
    /// top module.
    Instance {
        /// The hierarchical path, starting at a top module name.
        path: Vec<PathSegment>,
    },
}

/// A procedural block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProceduralBlock {
    /// Which procedure kind.
    pub kind: ProceduralKind,
    /// The body statement.
    pub body: Stmt,
    /// Source span.
    pub span: Span,
}

/// The kind of a procedural block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProceduralKind {
    /// `always_comb`
    AlwaysComb,
    /// `always_ff`
    AlwaysFf,
    /// `always_latch`
    AlwaysLatch,
    /// plain `always` (forbidden in checkers)
    Always,
    /// `initial`
    Initial,
}

/// The minimal statement grammar the elaboration core inspects.
///
/// Only the shapes that checker containment and assignment rules look at are
/// modeled; everything else a real front end parses is a collaborator
/// concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    /// A `begin..end` or `fork..join` block.
    Block {
        /// Sequential or concurrent.
        kind: BlockKind,
        /// The contained statements.
        body: Vec<Stmt>,
        /// Source span.
        span: Span,
    },
    /// An assignment to a simple name.
    Assignment {
        /// The assigned name.
        lhs: Ident,
        /// `true` for `=`, `false` for `<=`.
        blocking: bool,
        /// The assigned expression.
        rhs: Expr,
        /// Source span.
        span: Span,
    },
    /// A procedural checker instantiation statement.
    CheckerInstance(Instantiation),
    /// An empty statement.
    Null {
        /// Source span.
        span: Span,
    },
}

/// Whether a block statement is sequential or concurrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    /// `begin .. end`
    Sequential,
    /// `fork .. join` (any join flavor)
    ForkJoin,
}
