//! Immutable definitions extracted from parsed design units.

use std::collections::HashMap;
use veld_ast::{
    BindDirective, DefaultNetType, DefinitionKind, Expr, Lifetime, ModuleDecl, ModuleItem,
    ParamDefault, PortDecl, PrimitiveDecl, TimeScale, TypeRef,
};
use veld_common::{Ident, Interner};
use veld_diagnostics::DiagnosticSink;
use veld_hier::LibraryId;
use veld_source::Span;

use crate::errors;

/// The kind of a registered definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    /// A module.
    Module,
    /// An interface.
    Interface,
    /// A program.
    Program,
    /// A package.
    Package,
    /// A checker.
    Checker,
    /// A user-defined primitive.
    Primitive,
}

impl DefKind {
    /// The plain display name of this kind.
    pub fn kind_string(self) -> &'static str {
        match self {
            DefKind::Module => "module",
            DefKind::Interface => "interface",
            DefKind::Program => "program",
            DefKind::Package => "package",
            DefKind::Checker => "checker",
            DefKind::Primitive => "primitive",
        }
    }

    /// The display name with an article, for containment diagnostics.
    pub fn article_string(self) -> &'static str {
        match self {
            DefKind::Module => "a module",
            DefKind::Interface => "an interface",
            DefKind::Program => "a program",
            DefKind::Package => "a package",
            DefKind::Checker => "a checker",
            DefKind::Primitive => "a primitive",
        }
    }
}

fn kind_from_ast(kind: DefinitionKind) -> DefKind {
    match kind {
        DefinitionKind::Module => DefKind::Module,
        DefinitionKind::Interface => DefKind::Interface,
        DefinitionKind::Program => DefKind::Program,
        DefinitionKind::Package => DefKind::Package,
        DefinitionKind::Checker => DefKind::Checker,
    }
}

/// The syntax a definition was registered from.
#[derive(Debug, Clone, Copy)]
pub enum DefSource<'a> {
    /// A design-unit declaration.
    Unit(&'a ModuleDecl),
    /// A user-defined primitive declaration.
    Primitive(&'a PrimitiveDecl),
}

/// A parameter declaration recorded on a definition, port parameters first,
/// then body parameters in declaration order.
#[derive(Debug, Clone)]
pub struct ParameterDecl<'a> {
    /// The parameter name.
    pub name: Ident,
    /// Whether this is a type parameter.
    pub is_type: bool,
    /// Whether this is a local parameter (not overridable).
    pub is_local: bool,
    /// Whether this parameter appears in the `#(...)` header.
    pub is_port: bool,
    /// The default value expression for value parameters.
    pub default_value: Option<&'a Expr>,
    /// The default type for type parameters.
    pub default_type: Option<&'a TypeRef>,
    /// Source span of the declarator.
    pub span: Span,
}

impl ParameterDecl<'_> {
    /// Returns `true` if the declaration carries a default.
    pub fn has_default(&self) -> bool {
        self.default_value.is_some() || self.default_type.is_some()
    }
}

/// A parsed, named design unit registered with a compilation.
///
/// Definitions are immutable after registration, with one exception: bind
/// directives that target a definition by name are attached during the
/// pre-elaboration bind pass.
#[derive(Debug)]
pub struct Definition<'a> {
    /// What kind of definition this is.
    pub kind: DefKind,
    /// The definition name.
    pub name: Ident,
    /// The owning source library.
    pub library: LibraryId,
    /// Recorded parameter declarations, port parameters first.
    pub parameters: Vec<ParameterDecl<'a>>,
    /// The originating syntax.
    pub source: DefSource<'a>,
    /// Bind directives targeting this definition.
    pub bind_directives: Vec<&'a BindDirective>,
    /// Checkers declared inside this definition, found by local lookup
    /// before any global resolution.
    pub local_checkers: HashMap<Ident, &'a ModuleDecl>,
    /// The default net type in effect for this unit.
    pub default_net_type: DefaultNetType,
    /// The default variable lifetime.
    pub default_lifetime: Lifetime,
    /// Optional time scale.
    pub timescale: Option<TimeScale>,
    /// Source span of the declaration.
    pub span: Span,
}

impl<'a> Definition<'a> {
    /// Extracts a definition from a design-unit declaration.
    ///
    /// Emits missing-initializer diagnostics for body parameters and local
    /// port parameters without defaults.
    pub fn from_unit(
        decl: &'a ModuleDecl,
        library: LibraryId,
        interner: &Interner,
        sink: &DiagnosticSink,
    ) -> Self {
        let mut parameters = Vec::new();
        let has_port_params = !decl.params.is_empty();

        for param in &decl.params {
            let (default_value, default_type) = split_default(param.default.as_ref());
            if param.is_local && param.default.is_none() {
                sink.emit(errors::error_local_param_no_initializer(
                    interner.resolve(param.name),
                    param.span,
                ));
            }
            parameters.push(ParameterDecl {
                name: param.name,
                is_type: param.is_type,
                is_local: param.is_local,
                is_port: true,
                default_value,
                default_type,
                span: param.span,
            });
        }

        let mut local_checkers = HashMap::new();
        for item in &decl.items {
            match item {
                ModuleItem::Param(param) => {
                    let (default_value, default_type) = split_default(param.default.as_ref());
                    if param.default.is_none() {
                        sink.emit(errors::error_body_param_no_initializer(
                            interner.resolve(param.name),
                            param.span,
                        ));
                    }
                    // A body `parameter` in a unit with a parameter port
                    // list behaves as a localparam.
                    let is_local = param.is_local || has_port_params;
                    parameters.push(ParameterDecl {
                        name: param.name,
                        is_type: param.is_type,
                        is_local,
                        is_port: false,
                        default_value,
                        default_type,
                        span: param.span,
                    });
                }
                ModuleItem::CheckerDecl(checker) => {
                    local_checkers.insert(checker.name, checker.as_ref());
                }
                _ => {}
            }
        }

        Self {
            kind: kind_from_ast(decl.kind),
            name: decl.name,
            library,
            parameters,
            source: DefSource::Unit(decl),
            bind_directives: Vec::new(),
            local_checkers,
            default_net_type: decl.default_net_type,
            default_lifetime: decl.lifetime,
            timescale: decl.timescale,
            span: decl.span,
        }
    }

    /// Registers a user-defined primitive as a definition.
    pub fn from_primitive(decl: &'a PrimitiveDecl, library: LibraryId) -> Self {
        Self {
            kind: DefKind::Primitive,
            name: decl.name,
            library,
            parameters: Vec::new(),
            source: DefSource::Primitive(decl),
            bind_directives: Vec::new(),
            local_checkers: HashMap::new(),
            default_net_type: DefaultNetType::Wire,
            default_lifetime: Lifetime::Static,
            timescale: None,
            span: decl.span,
        }
    }

    /// The design-unit syntax, if this definition came from one.
    pub fn unit(&self) -> Option<&'a ModuleDecl> {
        match self.source {
            DefSource::Unit(decl) => Some(decl),
            DefSource::Primitive(_) => None,
        }
    }

    /// The primitive syntax, if this definition is a UDP.
    pub fn primitive(&self) -> Option<&'a PrimitiveDecl> {
        match self.source {
            DefSource::Primitive(decl) => Some(decl),
            DefSource::Unit(_) => None,
        }
    }

    /// The port declarations of the unit, empty for primitives.
    pub fn ports(&self) -> &'a [PortDecl] {
        match self.source {
            DefSource::Unit(decl) => &decl.ports,
            DefSource::Primitive(_) => &[],
        }
    }
}

fn split_default<'a>(
    default: Option<&'a ParamDefault>,
) -> (Option<&'a Expr>, Option<&'a TypeRef>) {
    match default {
        Some(ParamDefault::Value(expr)) => (Some(expr), None),
        Some(ParamDefault::Type(ty)) => (None, Some(ty)),
        None => (None, None),
    }
}
