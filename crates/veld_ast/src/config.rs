//! Configuration block declaration nodes.

use crate::decl::ParamDecl;
use crate::item::ParamAssignment;
use serde::{Deserialize, Serialize};
use veld_common::Ident;
use veld_source::Span;

/// A `config ... endconfig` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDecl {
    /// The configuration name.
    pub name: Ident,
    /// The `design` statement's cells.
    pub design: Vec<CellRef>,
    /// The configuration rules, in source order.
    pub rules: Vec<ConfigRuleSyntax>,
    /// Local parameters declared in the config.
    pub localparams: Vec<ParamDecl>,
    /// Source span.
    pub span: Span,
}

/// A `[library.]cell` reference, optionally flagged `: config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellRef {
    /// Optional library qualifier.
    pub library: Option<Ident>,
    /// The cell name.
    pub cell: Ident,
    /// Whether the reference ends in `: config`.
    pub target_config: bool,
    /// Source span.
    pub span: Span,
}

impl CellRef {
    /// Convenience constructor for an unqualified cell reference.
    pub fn cell(cell: Ident) -> Self {
        Self {
            library: None,
            cell,
            target_config: false,
            span: Span::DUMMY,
        }
    }
}

/// One rule inside a configuration block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConfigRuleSyntax {
    /// `default liblist lib1 lib2;`
    Default {
        /// The libraries, in search order.
        liblist: Vec<Ident>,
        /// Source span.
        span: Span,
    },
    /// `cell [lib.]name use ... ;` or `cell [lib.]name liblist ... ;`
    Cell {
        /// Optional library qualifier on the cell.
        library: Option<Ident>,
        /// The cell name.
        cell: Ident,
        /// The rule clause.
        clause: RuleClause,
        /// Source span.
        span: Span,
    },
    /// `instance top.a.b use ... ;` or `instance top.a.b liblist ... ;`
    Instance {
        /// The top module name the path starts at.
        top: Ident,
        /// The remaining path segments.
        path: Vec<Ident>,
        /// The rule clause.
        clause: RuleClause,
        /// Source span.
        span: Span,
    },
}

impl ConfigRuleSyntax {
    /// Returns the source span of this rule.
    pub fn span(&self) -> Span {
        match self {
            ConfigRuleSyntax::Default { span, .. }
            | ConfigRuleSyntax::Cell { span, .. }
            | ConfigRuleSyntax::Instance { span, .. } => *span,
        }
    }
}

/// The clause of a cell or instance config rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RuleClause {
    /// `use [lib.]cell [#(...)] [: config]`
    Use {
        /// The redirect target; `None` when the clause only assigns parameters.
        target: Option<CellRef>,
        /// Parameter assignments on the use clause.
        params: Vec<ParamAssignment>,
        /// Source span.
        span: Span,
    },
    /// `liblist lib1 lib2`
    Liblist {
        /// The libraries, in search order.
        libraries: Vec<Ident>,
        /// Source span.
        span: Span,
    },
}
