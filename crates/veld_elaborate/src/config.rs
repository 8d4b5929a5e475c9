//! Configuration blocks: top cells, liblists, and cell/instance overrides.

use std::cell::Cell;
use std::collections::HashMap;
use veld_ast::{ConfigDecl, ConfigRuleSyntax, ParamAssignment, ParamDefault, RuleClause};
use veld_common::Ident;
use veld_diagnostics::DiagnosticSink;
use veld_hier::{ConfigId, LibraryId, ParamValue, SymbolId};
use veld_source::Span;

use crate::errors;
use crate::eval::{self, ConstEnv};
use crate::library::LibraryRegistry;

/// A `[library.]cell[: config]` reference inside a configuration.
///
/// The library is kept by name and resolved at use time, so that a rule
/// naming an unregistered library reports `unknown library` at the
/// instantiation it applies to.
#[derive(Debug, Clone, Copy)]
pub struct ConfigCellId {
    /// Optional library qualifier.
    pub library: Option<Ident>,
    /// The cell name.
    pub cell: Ident,
    /// Whether the reference must resolve to a configuration.
    pub target_config: bool,
    /// Source span.
    pub span: Span,
}

/// One configuration rule: an optional redirect target, an optional
/// liblist, and optional parameter overrides.
///
/// The three slots are orthogonal; per-instance rules for the same path
/// merge component-wise.
#[derive(Debug, Clone)]
pub struct ConfigRule<'a> {
    /// `use [lib.]cell` redirect target.
    pub use_cell: Option<ConfigCellId>,
    /// `liblist ...` search order override.
    pub liblist: Option<Vec<LibraryId>>,
    /// `use #(...)` parameter overrides.
    pub param_overrides: Option<&'a [ParamAssignment]>,
    /// Source span of the rule.
    pub span: Span,
}

impl<'a> ConfigRule<'a> {
    fn from_clause(clause: &'a RuleClause, span: Span, libraries: &LibraryRegistry) -> Self {
        let mut rule = ConfigRule {
            use_cell: None,
            liblist: None,
            param_overrides: None,
            span,
        };
        match clause {
            RuleClause::Use { target, params, .. } => {
                if let Some(target) = target {
                    rule.use_cell = Some(ConfigCellId {
                        library: target.library,
                        cell: target.cell,
                        target_config: target.target_config,
                        span: target.span,
                    });
                }
                if !params.is_empty() {
                    rule.param_overrides = Some(params.as_slice());
                }
            }
            RuleClause::Liblist { libraries: names, .. } => {
                rule.liblist = Some(build_liblist(names, libraries));
            }
        }
        rule
    }
}

/// A cell override: `cell [lib.]name (use ...|liblist ...)`.
#[derive(Debug, Clone)]
pub struct CellOverride<'a> {
    /// When present, the rule applies only to cells resolved from this
    /// library.
    pub specific_lib: Option<LibraryId>,
    /// The override rule.
    pub rule: ConfigRule<'a>,
}

/// A node of the per-instance override trie, keyed by hierarchical path
/// segment names below a top cell.
#[derive(Debug, Default)]
pub struct InstanceOverrideNode<'a> {
    /// The rule attached to this exact path, if any.
    pub rule: Option<ConfigRule<'a>>,
    /// Children by the next path segment name.
    pub children: HashMap<Ident, InstanceOverrideNode<'a>>,
    /// Set when the rule (or a descendant's) was applied during elaboration.
    pub visited: Cell<bool>,
}

/// A parsed configuration block.
#[derive(Debug)]
pub struct ConfigBlock<'a> {
    /// The configuration name.
    pub name: Ident,
    /// The library the config was compiled into.
    pub library: LibraryId,
    /// The `design` statement's cells; empty cell names are dropped.
    pub top_cells: Vec<ConfigCellId>,
    /// The `default liblist` search order.
    pub default_liblist: Vec<LibraryId>,
    /// Cell overrides indexed by bare cell name.
    pub cell_overrides: HashMap<Ident, Vec<CellOverride<'a>>>,
    /// Per-instance overrides, rooted at top cell names.
    pub instance_overrides: HashMap<Ident, InstanceOverrideNode<'a>>,
    /// Local parameters declared in the config, with evaluated values.
    pub localparams: Vec<(Ident, ParamValue)>,
    /// Set when the config has been used to root an elaboration.
    pub used: Cell<bool>,
    /// Source span of the declaration.
    pub span: Span,
}

impl<'a> ConfigBlock<'a> {
    /// Builds a configuration block from its parsed syntax.
    ///
    /// Multiple `instance` rules for the same path merge component-wise;
    /// a conflict within the same slot is an error and the earlier rule's
    /// slot is kept.
    pub fn from_syntax(
        decl: &'a ConfigDecl,
        library: LibraryId,
        libraries: &LibraryRegistry,
        sink: &DiagnosticSink,
    ) -> Self {
        let mut result = ConfigBlock {
            name: decl.name,
            library,
            top_cells: Vec::new(),
            default_liblist: Vec::new(),
            cell_overrides: HashMap::new(),
            instance_overrides: HashMap::new(),
            localparams: Vec::new(),
            used: Cell::new(false),
            span: decl.span,
        };

        for cell in &decl.design {
            result.top_cells.push(ConfigCellId {
                library: cell.library,
                cell: cell.cell,
                target_config: cell.target_config,
                span: cell.span,
            });
        }

        let mut env = ConstEnv::new();
        for param in &decl.localparams {
            let value = match &param.default {
                Some(ParamDefault::Value(expr)) => eval::eval_expr(expr, &env)
                    .map(ParamValue::Int)
                    .unwrap_or(ParamValue::Invalid),
                _ => ParamValue::Invalid,
            };
            env.insert(param.name, value.clone());
            result.localparams.push((param.name, value));
        }

        for rule_syntax in &decl.rules {
            match rule_syntax {
                ConfigRuleSyntax::Default { liblist, .. } => {
                    result.default_liblist = build_liblist(liblist, libraries);
                }
                ConfigRuleSyntax::Cell {
                    library: lib_name,
                    cell,
                    clause,
                    span,
                } => {
                    let specific_lib = lib_name.and_then(|name| libraries.get(name));
                    let rule = ConfigRule::from_clause(clause, *span, libraries);
                    result
                        .cell_overrides
                        .entry(*cell)
                        .or_default()
                        .push(CellOverride { specific_lib, rule });
                }
                ConfigRuleSyntax::Instance {
                    top, path, clause, ..
                } => {
                    let rule = ConfigRule::from_clause(clause, rule_syntax.span(), libraries);
                    let mut node = result.instance_overrides.entry(*top).or_default();
                    for segment in path {
                        node = node.children.entry(*segment).or_default();
                    }
                    merge_rule(node, rule, sink);
                }
            }
        }

        result
    }
}

/// Merges a new rule into a trie node component-wise; conflicting slots are
/// an error and the earlier rule's slot wins.
fn merge_rule<'a>(node: &mut InstanceOverrideNode<'a>, rule: ConfigRule<'a>, sink: &DiagnosticSink) {
    let Some(existing) = node.rule.as_mut() else {
        node.rule = Some(rule);
        return;
    };

    let conflict = (rule.param_overrides.is_some() && existing.param_overrides.is_some())
        || (rule.liblist.is_some() && existing.liblist.is_some())
        || (rule.use_cell.is_some() && existing.use_cell.is_some());
    if conflict {
        sink.emit(errors::error_config_override_conflict(
            rule.span,
            existing.span,
        ));
        return;
    }

    if let Some(params) = rule.param_overrides {
        existing.param_overrides = Some(params);
    }
    if let Some(liblist) = rule.liblist {
        existing.liblist = Some(liblist);
    }
    if let Some(cell) = rule.use_cell {
        existing.use_cell = Some(cell);
    }
}

/// Resolves liblist names to registered libraries, skipping names that are
/// not registered.
fn build_liblist(names: &[Ident], libraries: &LibraryRegistry) -> Vec<LibraryId> {
    names
        .iter()
        .filter_map(|name| libraries.get(*name))
        .collect()
}

/// The per-instance configuration context, alive for one elaboration
/// traversal rooted at `root_instance` and inherited by child instances
/// unless overridden.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The configuration in effect.
    pub config: ConfigId,
    /// The instance the configuration is rooted at.
    pub root_instance: SymbolId,
    /// The inherited library search order.
    pub liblist: Vec<LibraryId>,
    /// Span of the config rule that redirected to this configuration, for
    /// diagnostics.
    pub rule_span: Option<Span>,
}
