//! Diagnostic codes and helper functions for elaboration errors and warnings.
//!
//! Error codes `E300`--`E339` cover elaboration failures (lookup failures,
//! configuration errors, containment violations, port connection problems,
//! and resource caps). Warning codes `W301`--`W302` cover non-fatal issues.

use veld_diagnostics::{Category, Diagnostic, DiagnosticCode, Label};
use veld_source::Span;

macro_rules! codes {
    ($($(#[$meta:meta])* $name:ident = $cat:ident $num:literal;)*) => {
        $(
            $(#[$meta])*
            pub const $name: DiagnosticCode = DiagnosticCode {
                category: Category::$cat,
                number: $num,
            };
        )*
    };
}

codes! {
    /// Duplicate definition name within one library.
    E300 = Error 300;
    /// Unknown module (or other cell) referenced in an instantiation.
    E301 = Error 301;
    /// Reference to an unregistered library.
    E302 = Error 302;
    /// Bare delay value on an instance that is not a primitive.
    E303 = Error 303;
    /// Invalid or missing top module.
    E305 = Error 305;
    /// Instance kind is illegal in its enclosing definition.
    E306 = Error 306;
    /// Bind directive beneath another bind.
    E307 = Error 307;
    /// Bind directive targeting a primitive.
    E308 = Error 308;
    /// Instance array width exceeds the configured maximum.
    E309 = Error 309;
    /// Hierarchy or checker nesting depth exceeds the configured maximum.
    E310 = Error 310;
    /// Conflicting slots in merged per-instance config rules.
    E311 = Error 311;
    /// Config used as a redirect target has more than one top cell.
    E312 = Error 312;
    /// Ordered and named port connections mixed in one instantiation.
    E313 = Error 313;
    /// Named connection to a port that does not exist.
    E314 = Error 314;
    /// The same port connected more than once.
    E315 = Error 315;
    /// More ordered connections than ports.
    E316 = Error 316;
    /// Interface port connected to something that is not a matching instance.
    E317 = Error 317;
    /// Wildcard connection found no matching name and the port has no default.
    E318 = Error 318;
    /// User-defined primitive connected with the wrong number of ports.
    E319 = Error 319;
    /// N-input/N-output gate instantiated with fewer than two connections.
    E320 = Error 320;
    /// Invalid connection form on a primitive instance.
    E321 = Error 321;
    /// Checker instantiated inside a fork-join block.
    E322 = Error 322;
    /// Checker instantiated inside another checker's procedural body.
    E323 = Error 323;
    /// Plain `always` procedure inside a checker.
    E324 = Error 324;
    /// Blocking assignment inside `always_ff`.
    E325 = Error 325;
    /// Parameter assignments on a checker instantiation.
    E326 = Error 326;
    /// Body parameter declared without an initializer.
    E327 = Error 327;
    /// Local port parameter declared without an initializer.
    E328 = Error 328;
    /// Override targets a local parameter.
    E329 = Error 329;
    /// Named assignment to a parameter that does not exist.
    E330 = Error 330;
    /// Ordered and named parameter assignments mixed in one instantiation.
    E331 = Error 331;
    /// More ordered parameter assignments than port parameters.
    E332 = Error 332;
    /// Port parameter has neither a default nor an assignment.
    E333 = Error 333;
    /// Parameter value is not a constant expression.
    E334 = Error 334;
    /// Instance array dimension is not a constant range.
    E335 = Error 335;
    /// Instance declarator is missing a name.
    E336 = Error 336;
    /// Unknown checker referenced in a checker instantiation.
    E337 = Error 337;
    /// Unknown package referenced in an import.
    E338 = Error 338;
    /// Unknown interface referenced by an interface port.
    E339 = Error 339;
    /// Port left unconnected.
    W301 = Warning 301;
    /// Config instance-override rule matched no elaborated instance.
    W302 = Warning 302;
}

/// Creates a diagnostic for a duplicate definition within one library.
pub fn error_duplicate_definition(name: &str, span: Span, prev_span: Span) -> Diagnostic {
    Diagnostic::error(E300, format!("duplicate definition `{name}`"), span)
        .with_label(Label::secondary(prev_span, "previously defined here"))
}

/// Creates a diagnostic for an unknown module in an instantiation.
pub fn error_unknown_module(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E301, format!("unknown module `{name}`"), span)
        .with_help("check the library search order and the spelling of the name")
}

/// Creates a diagnostic for a reference to an unregistered library.
pub fn error_unknown_library(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E302, format!("unknown library `{name}`"), span)
}

/// Creates a diagnostic for a bare `#value` on a module-like instance.
pub fn error_instance_with_delay(span: Span) -> Diagnostic {
    Diagnostic::error(
        E303,
        "delay control is not allowed on a module-like instance",
        span,
    )
    .with_help("set `allow_bare_val_param_assignment` to treat the value as a parameter override")
}

/// Creates a diagnostic for an invalid top module selection.
pub fn error_invalid_top(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E305, format!("invalid top module `{name}`"), span)
        .with_help("tops must name a module definition or a configuration")
}

/// Creates a diagnostic for an instance that is illegal in its parent.
pub fn error_invalid_instance_for_parent(child: &str, parent: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E306,
        format!("cannot instantiate {child} inside {parent}"),
        span,
    )
}

/// Creates a diagnostic for a bind directive beneath another bind.
pub fn error_bind_under_bind(span: Span) -> Diagnostic {
    Diagnostic::error(
        E307,
        "cannot use a bind directive within a scope created by another bind",
        span,
    )
}

/// Creates a diagnostic for a bind directive targeting a primitive.
pub fn error_bind_target_primitive(span: Span) -> Diagnostic {
    Diagnostic::error(E308, "cannot bind a primitive instance", span)
}

/// Creates a diagnostic for an instance array exceeding the maximum width.
pub fn error_max_instance_array(kind: &str, limit: u32, span: Span) -> Diagnostic {
    Diagnostic::error(
        E309,
        format!("{kind} instance array exceeds the maximum of {limit} elements"),
        span,
    )
}

/// Creates a diagnostic for exceeding the maximum instantiation depth.
pub fn error_max_instance_depth(kind: &str, limit: u32, span: Span) -> Diagnostic {
    Diagnostic::error(
        E310,
        format!("{kind} instantiation exceeds the maximum depth of {limit}"),
        span,
    )
    .with_note("recursive instantiation is truncated at the configured depth limit")
}

/// Creates a diagnostic for conflicting slots in merged config instance rules.
pub fn error_config_override_conflict(span: Span, prev_span: Span) -> Diagnostic {
    Diagnostic::error(
        E311,
        "conflicting config rules for the same instance",
        span,
    )
    .with_label(Label::secondary(prev_span, "previous rule is here"))
}

/// Creates a diagnostic for a config redirect target with multiple top cells.
pub fn error_config_redirect_multiple_tops(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E312,
        format!("config `{name}` used as an instance override must have exactly one top cell"),
        span,
    )
}

/// Creates a diagnostic for mixed ordered and named port connections.
pub fn error_mixed_port_connections(span: Span) -> Diagnostic {
    Diagnostic::error(
        E313,
        "cannot mix ordered and named port connections",
        span,
    )
}

/// Creates a diagnostic for a named connection to an unknown port.
pub fn error_unknown_port(port: &str, module: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E314, format!("unknown port `{port}` on `{module}`"), span)
}

/// Creates a diagnostic for a port connected more than once.
pub fn error_duplicate_port_connection(port: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E315, format!("port `{port}` is already connected"), span)
}

/// Creates a diagnostic for too many ordered port connections.
pub fn error_too_many_port_connections(expected: usize, got: usize, span: Span) -> Diagnostic {
    Diagnostic::error(
        E316,
        format!("too many port connections: expected {expected}, found {got}"),
        span,
    )
}

/// Creates a diagnostic for a mismatched interface port connection.
pub fn error_interface_port_mismatch(port: &str, interface: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E317,
        format!("port `{port}` must connect to an instance of interface `{interface}`"),
        span,
    )
}

/// Creates a diagnostic for a wildcard connection with no match and no default.
pub fn error_implicit_port_not_found(port: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E318,
        format!("no matching name found for `.*` connection to port `{port}`"),
        span,
    )
}

/// Creates a diagnostic for a UDP connected with the wrong number of ports.
pub fn error_primitive_port_count(name: &str, expected: usize, got: usize, span: Span) -> Diagnostic {
    Diagnostic::error(
        E319,
        format!("primitive `{name}` expects {expected} connections, found {got}"),
        span,
    )
}

/// Creates a diagnostic for an N-input/N-output gate with too few connections.
pub fn error_invalid_n_gate_count(gate: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E320,
        format!("gate `{gate}` requires at least two connections"),
        span,
    )
}

/// Creates a diagnostic for an invalid connection form on a primitive.
pub fn error_invalid_primitive_port_conn(span: Span) -> Diagnostic {
    Diagnostic::error(
        E321,
        "invalid connection for a primitive instance",
        span,
    )
}

/// Creates a diagnostic for a checker instantiated inside fork-join.
pub fn error_checker_in_fork_join(span: Span) -> Diagnostic {
    Diagnostic::error(
        E322,
        "checkers cannot be instantiated inside fork-join blocks",
        span,
    )
}

/// Creates a diagnostic for a checker inside another checker's procedure.
pub fn error_checker_in_checker_proc(span: Span) -> Diagnostic {
    Diagnostic::error(
        E323,
        "checkers cannot be instantiated inside procedural code of another checker",
        span,
    )
}

/// Creates a diagnostic for a plain `always` procedure inside a checker.
pub fn error_always_in_checker(span: Span) -> Diagnostic {
    Diagnostic::error(E324, "`always` procedures are not allowed in checkers", span)
        .with_help("use `always_comb`, `always_ff`, or `always_latch` instead")
}

/// Creates a diagnostic for a blocking assignment inside `always_ff`.
pub fn error_blocking_in_always_ff(span: Span) -> Diagnostic {
    Diagnostic::error(
        E325,
        "blocking assignments are not allowed in `always_ff`",
        span,
    )
}

/// Creates a diagnostic for parameter assignments on a checker instantiation.
pub fn error_checker_param_assign(span: Span) -> Diagnostic {
    Diagnostic::error(
        E326,
        "checker instantiations cannot have parameter assignments",
        span,
    )
}

/// Creates a diagnostic for a body parameter without an initializer.
pub fn error_body_param_no_initializer(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E327,
        format!("body parameter `{name}` must have an initializer"),
        span,
    )
}

/// Creates a diagnostic for a local port parameter without an initializer.
pub fn error_local_param_no_initializer(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E328,
        format!("local parameter `{name}` must have an initializer"),
        span,
    )
}

/// Creates a diagnostic for an override targeting a local parameter.
pub fn error_local_param_override(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E329,
        format!("local parameter `{name}` cannot be overridden"),
        span,
    )
}

/// Creates a diagnostic for a named assignment to an unknown parameter.
pub fn error_unknown_parameter(name: &str, module: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E330,
        format!("unknown parameter `{name}` on `{module}`"),
        span,
    )
}

/// Creates a diagnostic for mixed ordered and named parameter assignments.
pub fn error_mixed_param_assignment(span: Span) -> Diagnostic {
    Diagnostic::error(
        E331,
        "cannot mix ordered and named parameter assignments",
        span,
    )
}

/// Creates a diagnostic for too many ordered parameter assignments.
pub fn error_too_many_param_assignments(expected: usize, got: usize, span: Span) -> Diagnostic {
    Diagnostic::error(
        E332,
        format!("too many parameter assignments: expected {expected}, found {got}"),
        span,
    )
}

/// Creates a diagnostic for a port parameter with no value at all.
pub fn error_param_has_no_value(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E333,
        format!("parameter `{name}` has no default and no assigned value"),
        span,
    )
}

/// Creates a diagnostic when a parameter value is not constant.
pub fn error_param_not_const(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E334,
        format!("value of parameter `{name}` is not a constant expression"),
        span,
    )
}

/// Creates a diagnostic for a non-constant instance array dimension.
pub fn error_invalid_dimension(span: Span) -> Diagnostic {
    Diagnostic::error(
        E335,
        "instance array dimension must be a constant range",
        span,
    )
}

/// Creates a diagnostic for an instance declarator missing its name.
pub fn error_instance_name_required(span: Span) -> Diagnostic {
    Diagnostic::error(E336, "instance name is required", span)
}

/// Creates a diagnostic for an unknown checker.
pub fn error_unknown_checker(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E337, format!("unknown checker `{name}`"), span)
}

/// Creates a diagnostic for an unknown package.
pub fn error_unknown_package(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E338, format!("unknown package `{name}`"), span)
}

/// Creates a diagnostic for an unknown interface named by a port.
pub fn error_unknown_interface(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E339, format!("unknown interface `{name}`"), span)
}

/// Creates a warning for an unconnected port.
pub fn warn_unconnected_port(port: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(W301, format!("port `{port}` is unconnected"), span)
}

/// Creates a warning for a config instance rule that matched nothing.
pub fn warn_unused_config_rule(span: Span) -> Diagnostic {
    Diagnostic::warning(
        W302,
        "config instance rule does not match any elaborated instance",
        span,
    )
}
