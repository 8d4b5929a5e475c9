//! Instance body construction from a definition and resolved parameters.

use veld_hier::{BodyId, DefId, InstanceBody, Lazy, Member, OverrideNodeId, ParamSym};

use crate::compilation::Compilation;

/// Creates an instance body skeleton from a definition and the parameter
/// symbols a [`ParameterBuilder`](crate::params::ParameterBuilder) produced.
///
/// Member population order: the implicit wildcard import of the standard
/// package comes first, then the header package imports in textual order,
/// then the port parameters in declaration order. Body members (including
/// body parameter symbols, which were already resolved by the builder) are
/// appended by the elaborator's item walk, and bind directives after those.
/// The port list stays lazy because interface-port elaboration may depend
/// on other port connections.
pub(crate) fn create_body<'a>(
    comp: &mut Compilation<'a>,
    definition: DefId,
    params: Vec<ParamSym>,
    override_node: Option<OverrideNodeId>,
    is_uninstantiated: bool,
    is_from_bind: bool,
    checker_depth: u32,
) -> BodyId {
    let mut members = Vec::new();
    members.push(Member::WildcardImport {
        package: comp.std_package,
    });

    if let Some(decl) = comp.definitions[definition].unit() {
        for import in &decl.imports {
            members.push(Member::Import(import));
        }
    }

    for (index, param) in params.iter().enumerate() {
        if param.is_port {
            members.push(Member::Param(index));
        }
    }

    comp.hierarchy.bodies.alloc(InstanceBody {
        definition,
        parent_instance: None,
        override_node,
        is_uninstantiated,
        is_from_bind,
        checker_depth,
        params,
        members,
        ports: Lazy::default(),
    })
}
