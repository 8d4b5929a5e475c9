//! The parameter builder: merges declaration defaults, instantiation
//! assignments, configuration rule overrides, and hierarchy overrides into
//! resolved parameter symbols.

use std::collections::HashMap;
use veld_ast::{Expr, ParamAssignment};
use veld_common::{Ident, Interner};
use veld_diagnostics::DiagnosticSink;
use veld_hier::{ParamSym, ParamValue};
use veld_source::Span;

use crate::definition::ParameterDecl;
use crate::errors;
use crate::eval::{self, ConstEnv};
use crate::overrides::OverrideNode;

/// Accumulates parameter values from all override sources and produces the
/// resolved per-instance-body parameter symbols.
///
/// Precedence, most specific first: hierarchy (defparam) override, config
/// rule override, instantiation assignment, declaration default.
pub struct ParameterBuilder<'a> {
    def_name: Ident,
    decls: Vec<ParameterDecl<'a>>,
    ordered: Vec<&'a Expr>,
    named: HashMap<Ident, (Option<&'a Expr>, Span)>,
    config_ordered: Vec<&'a Expr>,
    config_named: HashMap<Ident, (Option<&'a Expr>, Span)>,
    config_env: ConstEnv,
    overrides: HashMap<Ident, (ParamValue, Span)>,
    parent_env: ConstEnv,
    force_invalid: bool,
}

impl<'a> ParameterBuilder<'a> {
    /// Creates a builder over a definition's recorded parameter
    /// declarations.
    pub fn new(def_name: Ident, decls: &[ParameterDecl<'a>]) -> Self {
        Self {
            def_name,
            decls: decls.to_vec(),
            ordered: Vec::new(),
            named: HashMap::new(),
            config_ordered: Vec::new(),
            config_named: HashMap::new(),
            config_env: ConstEnv::new(),
            overrides: HashMap::new(),
            parent_env: ConstEnv::new(),
            force_invalid: false,
        }
    }

    /// Sets the environment assignment expressions evaluate in (the
    /// instantiating scope's parameters).
    pub fn set_parent_env(&mut self, env: ConstEnv) {
        self.parent_env = env;
    }

    /// Records the instantiation's parameter value assignments.
    ///
    /// Ordered assignments bind positionally to port parameters only; named
    /// assignments may target any non-local parameter. Mixing the two forms
    /// is diagnosed and the named assignments win.
    pub fn set_assignments(
        &mut self,
        assignments: &'a [ParamAssignment],
        interner: &Interner,
        sink: &DiagnosticSink,
    ) {
        let (ordered, named) = self.split_assignments(assignments, interner, sink);
        self.ordered = ordered;
        self.named = named;
    }

    /// Records a bare `#value` reinterpreted as a single ordered parameter
    /// assignment (a primitive-style instantiation whose target turned out
    /// to be module-like).
    pub fn set_bare_assignment(&mut self, value: &'a Expr) {
        self.ordered.push(value);
    }

    /// Records parameter overrides from a configuration rule's `use #(...)`
    /// clause, along with the config's localparam environment.
    pub fn set_config_assignments(
        &mut self,
        assignments: &'a [ParamAssignment],
        config_env: ConstEnv,
        interner: &Interner,
        sink: &DiagnosticSink,
    ) {
        let (ordered, named) = self.split_assignments(assignments, interner, sink);
        self.config_ordered = ordered;
        self.config_named = named;
        self.config_env = config_env;
    }

    /// Records hierarchy (defparam) override values from an override node.
    /// Later overrides for the same name win.
    pub fn set_overrides(&mut self, node: &OverrideNode<'_>) {
        for (name, value, span) in &node.param_overrides {
            self.overrides.insert(*name, (value.clone(), *span));
        }
    }

    /// Forces every parameter to an invalid value, for uninstantiated
    /// bodies, so downstream evaluation short-circuits without further
    /// diagnostics.
    pub fn set_force_invalid(&mut self, force: bool) {
        self.force_invalid = force;
    }

    fn split_assignments(
        &self,
        assignments: &'a [ParamAssignment],
        interner: &Interner,
        sink: &DiagnosticSink,
    ) -> (Vec<&'a Expr>, HashMap<Ident, (Option<&'a Expr>, Span)>) {
        let mut ordered = Vec::new();
        let mut named = HashMap::new();
        let mut mixed_reported = false;

        for assignment in assignments {
            match assignment {
                ParamAssignment::Ordered { value, span } => {
                    if !named.is_empty() && !mixed_reported {
                        sink.emit(errors::error_mixed_param_assignment(*span));
                        mixed_reported = true;
                    }
                    ordered.push(value);
                }
                ParamAssignment::Named { name, value, span } => {
                    if !ordered.is_empty() && !mixed_reported {
                        sink.emit(errors::error_mixed_param_assignment(*span));
                        mixed_reported = true;
                    }
                    match self.decls.iter().find(|d| d.name == *name) {
                        None => {
                            sink.emit(errors::error_unknown_parameter(
                                interner.resolve(*name),
                                interner.resolve(self.def_name),
                                *span,
                            ));
                        }
                        Some(decl) if decl.is_local => {
                            sink.emit(errors::error_local_param_override(
                                interner.resolve(*name),
                                *span,
                            ));
                        }
                        Some(_) => {
                            named.insert(*name, (value.as_ref(), *span));
                        }
                    }
                }
            }
        }

        if mixed_reported {
            ordered.clear();
        }
        (ordered, named)
    }

    /// Produces the resolved parameter symbols in declared order (port
    /// parameters first) and the resulting constant environment for the
    /// new body.
    pub fn build(&self, interner: &Interner, sink: &DiagnosticSink) -> (Vec<ParamSym>, ConstEnv) {
        let mut params = Vec::with_capacity(self.decls.len());
        let mut env = ConstEnv::new();
        let mut ordered_used = 0usize;
        let mut config_ordered_used = 0usize;

        for decl in &self.decls {
            let positional = decl.is_port && !decl.is_local;
            let assigned = if positional && ordered_used < self.ordered.len() {
                let expr = self.ordered[ordered_used];
                ordered_used += 1;
                Some((Some(expr), expr.span()))
            } else {
                self.named.get(&decl.name).copied()
            };
            let config_assigned = if positional && config_ordered_used < self.config_ordered.len() {
                let expr = self.config_ordered[config_ordered_used];
                config_ordered_used += 1;
                Some((Some(expr), expr.span()))
            } else {
                self.config_named.get(&decl.name).copied()
            };

            let value = if self.force_invalid {
                ParamValue::Invalid
            } else if let Some((value, span)) = self.overrides.get(&decl.name) {
                if decl.is_local {
                    sink.emit(errors::error_local_param_override(
                        interner.resolve(decl.name),
                        *span,
                    ));
                    self.resolve_assigned(decl, config_assigned, assigned, &env, interner, sink)
                } else {
                    value.clone()
                }
            } else {
                self.resolve_assigned(decl, config_assigned, assigned, &env, interner, sink)
            };

            env.insert(decl.name, value.clone());
            params.push(ParamSym {
                name: decl.name,
                is_type: decl.is_type,
                is_local: decl.is_local,
                is_port: decl.is_port,
                value,
                span: decl.span,
            });
        }

        let port_count = self
            .decls
            .iter()
            .filter(|d| d.is_port && !d.is_local)
            .count();
        if self.ordered.len() > port_count {
            let extra = self.ordered[port_count];
            sink.emit(errors::error_too_many_param_assignments(
                port_count,
                self.ordered.len(),
                extra.span(),
            ));
        }

        (params, env)
    }

    /// Resolves one parameter from its assignments or declaration default.
    ///
    /// Config-rule assignments evaluate in the config's localparam
    /// environment and dominate instantiation assignments, which evaluate
    /// in the instantiating scope; a declaration default evaluates in the
    /// new body's own scope.
    fn resolve_assigned(
        &self,
        decl: &ParameterDecl<'a>,
        config_assigned: Option<(Option<&'a Expr>, Span)>,
        assigned: Option<(Option<&'a Expr>, Span)>,
        local_env: &ConstEnv,
        interner: &Interner,
        sink: &DiagnosticSink,
    ) -> ParamValue {
        if let Some((Some(expr), span)) = config_assigned {
            return self.eval_param(decl, expr, &self.config_env, span, interner, sink);
        }
        if let Some((expr, span)) = assigned {
            // An explicitly empty `.P()` falls back to the default.
            if let Some(expr) = expr {
                return self.eval_param(decl, expr, &self.parent_env, span, interner, sink);
            }
        }
        self.default_value(decl, local_env, interner, sink)
    }

    fn default_value(
        &self,
        decl: &ParameterDecl<'a>,
        local_env: &ConstEnv,
        interner: &Interner,
        sink: &DiagnosticSink,
    ) -> ParamValue {
        if decl.is_type {
            if let Some(ty) = decl.default_type {
                return ParamValue::Type(ty.clone());
            }
        } else if let Some(expr) = decl.default_value {
            return self.eval_param(decl, expr, local_env, expr.span(), interner, sink);
        }
        // A missing body-parameter initializer was already diagnosed when
        // the definition was recorded; only an unbound port parameter is
        // news here.
        if decl.is_port {
            sink.emit(errors::error_param_has_no_value(
                interner.resolve(decl.name),
                decl.span,
            ));
        }
        ParamValue::Invalid
    }

    fn eval_param(
        &self,
        decl: &ParameterDecl<'a>,
        expr: &'a Expr,
        env: &ConstEnv,
        span: Span,
        interner: &Interner,
        sink: &DiagnosticSink,
    ) -> ParamValue {
        if decl.is_type {
            // The constant grammar spells a type argument as a bare name.
            if let Expr::Identifier { name, .. } = expr {
                return ParamValue::Type(veld_ast::TypeRef::Named(*name));
            }
            sink.emit(errors::error_param_not_const(
                interner.resolve(decl.name),
                span,
            ));
            return ParamValue::Invalid;
        }
        match eval::eval_expr(expr, env) {
            Some(value) => ParamValue::Int(value),
            None => {
                sink.emit(errors::error_param_not_const(
                    interner.resolve(decl.name),
                    span,
                ));
                ParamValue::Invalid
            }
        }
    }
}
