//! AST node types consumed by the VELD elaboration core.
//!
//! Every AST node carries a `Span` for source location tracking, and nodes
//! that participate in hierarchy-override keying additionally carry a
//! [`NodeId`] establishing syntactic identity (two textually identical
//! instantiations are distinct nodes).
//!
//! The elaboration core does not parse; a front end (or a test) builds these
//! values directly and hands them to the core tagged with a source library.

#![warn(missing_docs)]

pub mod config;
pub mod decl;
pub mod expr;
pub mod item;

pub use config::{CellRef, ConfigDecl, ConfigRuleSyntax, RuleClause};
pub use decl::{
    DefaultNetType, DefinitionKind, Direction, ImportItem, Lifetime, ModuleDecl, NetDecl,
    PackageExport, PackageImport, ParamDecl, ParamDefault, PortDecl, PortKind, PrimPortDecl,
    PrimPortDirection, PrimitiveDecl, TimeScale, VarDecl,
};
pub use expr::{BinaryOp, Expr, Range, TypeRef, UnaryOp};
pub use item::{
    Attribute, BindDirective, BindTarget, BlockKind, DefparamDecl, GateInstantiation, GateType,
    GenerateBlock, GenerateIf, InstanceSyntax, Instantiation, ModuleItem, ParamAssignment,
    PathSegment, PortConnectionSyntax, ProceduralBlock, ProceduralKind, Stmt,
};

use serde::{Deserialize, Serialize};
use veld_source::Span;

/// Opaque identity of a syntax node within one compilation.
///
/// Hierarchy-override trie children are dual-keyed by syntactic identity and
/// by name; `NodeId` is the identity key. A front end assigns these while
/// building the tree; tests assign them by hand.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a `NodeId` from a raw `u32` value.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw `u32` value of this `NodeId`.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// A complete parsed source unit, containing one or more top-level items.
///
/// Each unit is tagged with an owning source library (or the default
/// library) when handed to the elaboration core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUnit {
    /// The top-level items in this unit.
    pub items: Vec<UnitItem>,
    /// The span covering the entire unit.
    pub span: Span,
}

/// A top-level item in a source unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UnitItem {
    /// A design unit declaration (module, interface, program, package, checker).
    Module(ModuleDecl),
    /// A user-defined primitive declaration.
    Primitive(PrimitiveDecl),
    /// A configuration block.
    Config(ConfigDecl),
    /// A bind directive at compilation-unit scope.
    Bind(BindDirective),
}
