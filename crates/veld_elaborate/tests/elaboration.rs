//! Elaboration basics: top selection, parameters, arrays, generate arms,
//! binds, checkers, ports, implicit nets, and packages.

mod common;

use common::*;
use veld_ast::{
    BindDirective, BindTarget, BlockKind, DefinitionKind, DefparamDecl, Direction, Expr,
    ImportItem, InstanceSyntax, Instantiation, ModuleDecl, ModuleItem, NetDecl, PackageExport,
    PackageImport, ParamAssignment, ParamDecl, PathSegment, PortConnectionSyntax, PortDecl,
    PortKind, ProceduralBlock, ProceduralKind, Range, Stmt, UnitItem, VarDecl,
};
use veld_common::Interner;
use veld_diagnostics::DiagnosticSink;
use veld_elaborate::{errors, Compilation, CompilationOptions};
use veld_hier::{Connection, Member, ParamValue, Symbol};
use veld_source::Span;

fn options_with_top(top: &str) -> CompilationOptions {
    CompilationOptions {
        top: vec![top.to_string()],
        ..CompilationOptions::default()
    }
}

#[test]
fn implicit_tops_skip_instantiated_and_parameterized_modules() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let mut a = module(&interner, "a");
    a.items.push(inst(&interner, "b", "u_b", &mut ids));
    let b = module(&interner, "b");
    let c = module(&interner, "c");
    // A module with a defaultless port parameter cannot be an implicit top.
    let mut d = module(&interner, "d");
    d.params.push(ParamDecl {
        name: interner.get_or_intern("W"),
        is_type: false,
        is_local: false,
        default: None,
        span: Span::DUMMY,
    });
    let main_unit = unit(vec![
        UnitItem::Module(a),
        UnitItem::Module(b),
        UnitItem::Module(c),
        UnitItem::Module(d),
    ]);

    let mut comp = Compilation::new(&interner, &sink, CompilationOptions::default());
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(!sink.has_errors());
    let tops: Vec<String> = comp
        .top_instances()
        .iter()
        .map(|id| def_name(&comp, *id))
        .collect();
    assert_eq!(tops, vec!["a", "c"]);
}

#[test]
fn parameter_assignment_propagates() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let w = interner.get_or_intern("W");
    let mut leaf = module(&interner, "leaf");
    leaf.params.push(ParamDecl::value(w, Expr::int(8)));

    let mut top = module(&interner, "top");
    top.items.push(ModuleItem::Instantiation(Instantiation {
        module: interner.get_or_intern("leaf"),
        params: vec![ParamAssignment::Named {
            name: w,
            value: Some(Expr::int(16)),
            span: Span::DUMMY,
        }],
        delay: None,
        instances: vec![InstanceSyntax::named(interner.get_or_intern("u"), ids.next())],
        attributes: Vec::new(),
        span: Span::DUMMY,
    }));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(!sink.has_errors());
    let u = child(&comp, top_named(&comp, "top"), "u");
    let param = comp
        .hierarchy
        .find_param(body_of(&comp, u), w)
        .unwrap();
    assert_eq!(param.value, ParamValue::Int(16));
}

#[test]
fn defparam_override_wins_over_assignment() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let w = interner.get_or_intern("W");
    let mut leaf = module(&interner, "leaf");
    leaf.params.push(ParamDecl::value(w, Expr::int(8)));

    let mut top = module(&interner, "top");
    top.items.push(ModuleItem::Instantiation(Instantiation {
        module: interner.get_or_intern("leaf"),
        params: vec![ParamAssignment::Named {
            name: w,
            value: Some(Expr::int(16)),
            span: Span::DUMMY,
        }],
        delay: None,
        instances: vec![InstanceSyntax::named(
            interner.get_or_intern("u1"),
            ids.next(),
        )],
        attributes: Vec::new(),
        span: Span::DUMMY,
    }));
    top.items.push(ModuleItem::Defparam(DefparamDecl {
        path: vec![PathSegment::name(interner.get_or_intern("u1"))],
        param: w,
        value: Expr::int(42),
        span: Span::DUMMY,
    }));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(!sink.has_errors());
    let u1 = child(&comp, top_named(&comp, "top"), "u1");
    let param = comp.hierarchy.find_param(body_of(&comp, u1), w).unwrap();
    assert_eq!(param.value, ParamValue::Int(42));
}

#[test]
fn instance_array_shape() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let leaf = module(&interner, "leaf");
    let mut top = module(&interner, "top");
    let mut syntax = InstanceSyntax::named(interner.get_or_intern("arr"), ids.next());
    syntax.dimensions.push(Range::literal(3, 0));
    top.items.push(ModuleItem::Instantiation(Instantiation {
        module: interner.get_or_intern("leaf"),
        params: Vec::new(),
        delay: None,
        instances: vec![syntax],
        attributes: Vec::new(),
        span: Span::DUMMY,
    }));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(!sink.has_errors());
    let arr = child(&comp, top_named(&comp, "top"), "arr");
    let array = comp.hierarchy.symbols[arr].as_array().unwrap();
    let range = array.range.unwrap();
    assert_eq!(array.elements.len() as u32, range.width());
    assert_eq!(array.elements.len(), 4);

    for (offset, element) in array.elements.iter().enumerate() {
        let instance = comp.hierarchy.symbols[*element].as_instance().unwrap();
        // Interior names are stripped; only the array keeps the user name.
        assert_eq!(instance.name, None);
        assert_eq!(instance.array_path, vec![offset as i32]);
        // The body's back-pointer invariant holds for every element.
        assert_eq!(
            comp.hierarchy.bodies[instance.body].parent_instance,
            Some(*element)
        );
    }
}

#[test]
fn failed_dimension_substitutes_empty_array() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let leaf = module(&interner, "leaf");
    let mut top = module(&interner, "top");
    let mut syntax = InstanceSyntax::named(interner.get_or_intern("arr"), ids.next());
    syntax.dimensions.push(Range {
        msb: Expr::ident(interner.get_or_intern("UNKNOWN")),
        lsb: Expr::int(0),
        span: Span::DUMMY,
    });
    top.items.push(ModuleItem::Instantiation(Instantiation {
        module: interner.get_or_intern("leaf"),
        params: Vec::new(),
        delay: None,
        instances: vec![syntax],
        attributes: Vec::new(),
        span: Span::DUMMY,
    }));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert_eq!(sink.error_count(), 1);
    assert_eq!(sink.diagnostics()[0].code, errors::E335);
    let arr = child(&comp, top_named(&comp, "top"), "arr");
    let array = comp.hierarchy.symbols[arr].as_array().unwrap();
    assert!(array.range.is_none());
    assert!(array.elements.is_empty());
}

#[test]
fn oversized_array_is_capped() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let leaf = module(&interner, "leaf");
    let mut top = module(&interner, "top");
    let mut syntax = InstanceSyntax::named(interner.get_or_intern("arr"), ids.next());
    syntax.dimensions.push(Range::literal(9, 0));
    top.items.push(ModuleItem::Instantiation(Instantiation {
        module: interner.get_or_intern("leaf"),
        params: Vec::new(),
        delay: None,
        instances: vec![syntax],
        attributes: Vec::new(),
        span: Span::DUMMY,
    }));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let options = CompilationOptions {
        top: vec!["top".to_string()],
        max_instance_array: 4,
        ..CompilationOptions::default()
    };
    let mut comp = Compilation::new(&interner, &sink, options);
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(sink.diagnostics().iter().any(|d| d.code == errors::E309));
    let arr = child(&comp, top_named(&comp, "top"), "arr");
    assert!(comp.hierarchy.symbols[arr]
        .as_array()
        .unwrap()
        .elements
        .is_empty());
}

#[test]
fn untaken_generate_arm_produces_placeholders() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let foo = module(&interner, "foo");
    let bar = module(&interner, "bar");
    let mut top = module(&interner, "top");
    top.items.push(ModuleItem::GenerateIf(veld_ast::GenerateIf {
        cond: Expr::int(0),
        then_block: veld_ast::GenerateBlock {
            id: ids.next(),
            name: Some(interner.get_or_intern("g_then")),
            items: vec![inst(&interner, "foo", "f1", &mut ids)],
            span: Span::DUMMY,
        },
        else_block: Some(veld_ast::GenerateBlock {
            id: ids.next(),
            name: Some(interner.get_or_intern("g_else")),
            items: vec![inst(&interner, "bar", "b1", &mut ids)],
            span: Span::DUMMY,
        }),
        span: Span::DUMMY,
    }));
    let main_unit = unit(vec![
        UnitItem::Module(foo),
        UnitItem::Module(bar),
        UnitItem::Module(top),
    ]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(!sink.has_errors());
    let top = top_named(&comp, "top");
    // The untaken arm leaves a placeholder; the taken arm elaborates.
    let f1 = child(&comp, top, "f1");
    let placeholder = comp.hierarchy.symbols[f1].as_uninstantiated().unwrap();
    assert_eq!(
        placeholder.definition_name,
        interner.get_or_intern("foo")
    );
    let b1 = child(&comp, top, "b1");
    assert_eq!(def_name(&comp, b1), "bar");
}

#[test]
fn unknown_module_leaves_placeholder_and_siblings_elaborate() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let leaf = module(&interner, "leaf");
    let mut top = module(&interner, "top");
    top.items.push(inst(&interner, "nope", "n1", &mut ids));
    top.items.push(inst(&interner, "leaf", "ok", &mut ids));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert_eq!(sink.error_count(), 1);
    assert_eq!(sink.diagnostics()[0].code, errors::E301);
    let top = top_named(&comp, "top");
    assert!(comp.hierarchy.symbols[child(&comp, top, "n1")]
        .as_uninstantiated()
        .is_some());
    assert_eq!(def_name(&comp, child(&comp, top, "ok")), "leaf");
}

#[test]
fn bind_directive_appends_instance() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let leaf = module(&interner, "leaf");
    let monitor = module(&interner, "monitor");
    let mut top = module(&interner, "top");
    top.items.push(inst(&interner, "leaf", "u", &mut ids));
    let main_unit = unit(vec![
        UnitItem::Module(leaf),
        UnitItem::Module(monitor),
        UnitItem::Module(top),
        UnitItem::Bind(BindDirective {
            target: BindTarget::Definition {
                name: interner.get_or_intern("leaf"),
            },
            instantiation: Instantiation::simple(
                interner.get_or_intern("monitor"),
                interner.get_or_intern("m0"),
                ids.next(),
            ),
            span: Span::DUMMY,
        }),
    ]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(!sink.has_errors());
    let u = child(&comp, top_named(&comp, "top"), "u");
    let m0 = child(&comp, u, "m0");
    assert_eq!(def_name(&comp, m0), "monitor");
    // Bound members come after primary members, and the body knows its
    // bind provenance.
    let body = body_of(&comp, m0);
    assert!(comp.hierarchy.bodies[body].is_from_bind);
    let u_body = body_of(&comp, u);
    let last_child = comp.hierarchy.bodies[u_body]
        .members
        .iter()
        .rev()
        .find_map(|m| match m {
            Member::Child(id) => Some(*id),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_child, m0);
}

#[test]
fn bind_under_bind_is_an_error() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let leaf = module(&interner, "leaf");
    let monitor = module(&interner, "monitor");
    let probe = module(&interner, "probe");
    let mut top = module(&interner, "top");
    top.items.push(inst(&interner, "leaf", "u", &mut ids));
    let main_unit = unit(vec![
        UnitItem::Module(leaf),
        UnitItem::Module(monitor),
        UnitItem::Module(probe),
        UnitItem::Module(top),
        UnitItem::Bind(BindDirective {
            target: BindTarget::Definition {
                name: interner.get_or_intern("leaf"),
            },
            instantiation: Instantiation::simple(
                interner.get_or_intern("monitor"),
                interner.get_or_intern("m0"),
                ids.next(),
            ),
            span: Span::DUMMY,
        }),
        UnitItem::Bind(BindDirective {
            target: BindTarget::Definition {
                name: interner.get_or_intern("monitor"),
            },
            instantiation: Instantiation::simple(
                interner.get_or_intern("probe"),
                interner.get_or_intern("p0"),
                ids.next(),
            ),
            span: Span::DUMMY,
        }),
    ]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(sink.diagnostics().iter().any(|d| d.code == errors::E307));
}

fn checker_decl(interner: &Interner, name: &str) -> ModuleDecl {
    ModuleDecl::empty(DefinitionKind::Checker, interner.get_or_intern(name))
}

#[test]
fn checker_instantiation_binds_formals() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let mut chk = checker_decl(&interner, "chk");
    chk.ports.push(PortDecl {
        name: interner.get_or_intern("a"),
        direction: Direction::Input,
        kind: PortKind::Var,
        range: None,
        default: None,
        span: Span::DUMMY,
    });
    chk.ports.push(PortDecl {
        name: interner.get_or_intern("b"),
        direction: Direction::Input,
        kind: PortKind::Var,
        range: None,
        default: Some(Expr::int(1)),
        span: Span::DUMMY,
    });

    let mut top = module(&interner, "top");
    top.items.push(ModuleItem::Net(NetDecl {
        names: vec![interner.get_or_intern("sig")],
        span: Span::DUMMY,
    }));
    top.items.push(inst_conns(
        &interner,
        "chk",
        "c1",
        vec![PortConnectionSyntax::Named {
            name: interner.get_or_intern("a"),
            expr: Some(Expr::ident(interner.get_or_intern("sig"))),
            span: Span::DUMMY,
        }],
        &mut ids,
    ));
    let main_unit = unit(vec![UnitItem::Module(chk), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(!sink.has_errors());
    let c1 = child(&comp, top_named(&comp, "top"), "c1");
    let checker = comp.hierarchy.symbols[c1].as_checker().unwrap();
    assert_eq!(checker.connections.len(), 2);
    assert!(!checker.connections[0].used_default);
    assert!(checker.connections[0].actual.is_some());
    // The unconnected input falls back to its default.
    assert!(checker.connections[1].used_default);
}

#[test]
fn recursive_checker_hits_depth_cap() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let mut chk = checker_decl(&interner, "chk");
    chk.items.push(inst(&interner, "chk", "inner", &mut ids));
    let mut top = module(&interner, "top");
    top.items.push(inst(&interner, "chk", "c1", &mut ids));
    let main_unit = unit(vec![UnitItem::Module(chk), UnitItem::Module(top)]);

    let options = CompilationOptions {
        top: vec!["top".to_string()],
        max_checker_instance_depth: 3,
        ..CompilationOptions::default()
    };
    let mut comp = Compilation::new(&interner, &sink, options);
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    let depth_errors: Vec<_> = sink
        .diagnostics()
        .into_iter()
        .filter(|d| d.code == errors::E310)
        .collect();
    assert_eq!(depth_errors.len(), 1);
    assert!(depth_errors[0].message.contains("checker"));
}

#[test]
fn checker_in_fork_join_is_an_error() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let chk = checker_decl(&interner, "chk");
    let mut top = module(&interner, "top");
    top.items.push(ModuleItem::Procedural(ProceduralBlock {
        kind: ProceduralKind::Initial,
        body: Stmt::Block {
            kind: BlockKind::ForkJoin,
            body: vec![Stmt::CheckerInstance(Instantiation::simple(
                interner.get_or_intern("chk"),
                interner.get_or_intern("c1"),
                ids.next(),
            ))],
            span: Span::DUMMY,
        },
        span: Span::DUMMY,
    }));
    let main_unit = unit(vec![UnitItem::Module(chk), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(sink.diagnostics().iter().any(|d| d.code == errors::E322));
}

#[test]
fn checker_procedural_restrictions() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    // A checker with a plain `always` and a module instantiation inside it;
    // both are diagnosed when the checker is instantiated.
    let mut chk = checker_decl(&interner, "chk");
    chk.items.push(ModuleItem::Procedural(ProceduralBlock {
        kind: ProceduralKind::Always,
        body: Stmt::Null { span: Span::DUMMY },
        span: Span::DUMMY,
    }));
    chk.items.push(inst(&interner, "leaf", "bad", &mut ids));
    let leaf = module(&interner, "leaf");
    let mut top = module(&interner, "top");
    top.items.push(inst(&interner, "chk", "c1", &mut ids));
    let main_unit = unit(vec![
        UnitItem::Module(chk),
        UnitItem::Module(leaf),
        UnitItem::Module(top),
    ]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    let codes: Vec<_> = sink.diagnostics().iter().map(|d| d.code).collect();
    assert!(codes.contains(&errors::E324));
    assert!(codes.contains(&errors::E306));
}

#[test]
fn blocking_assignment_in_always_ff() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();

    let mut top = module(&interner, "top");
    top.items.push(ModuleItem::Var(VarDecl {
        names: vec![interner.get_or_intern("q")],
        span: Span::DUMMY,
    }));
    top.items.push(ModuleItem::Procedural(ProceduralBlock {
        kind: ProceduralKind::AlwaysFf,
        body: Stmt::Assignment {
            lhs: interner.get_or_intern("q"),
            blocking: true,
            rhs: Expr::int(1),
            span: Span::DUMMY,
        },
        span: Span::DUMMY,
    }));
    let main_unit = unit(vec![UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(sink.diagnostics().iter().any(|d| d.code == errors::E325));
}

fn ported_leaf(interner: &Interner) -> ModuleDecl {
    let mut leaf = module(interner, "leaf");
    leaf.ports.push(PortDecl::net(
        interner.get_or_intern("clk"),
        Direction::Input,
    ));
    leaf.ports.push(PortDecl::net(
        interner.get_or_intern("q"),
        Direction::Output,
    ));
    leaf
}

#[test]
fn ordered_and_named_connections_resolve() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let leaf = ported_leaf(&interner);
    let mut top = module(&interner, "top");
    top.items.push(ModuleItem::Net(NetDecl {
        names: vec![interner.get_or_intern("c"), interner.get_or_intern("out")],
        span: Span::DUMMY,
    }));
    top.items.push(inst_conns(
        &interner,
        "leaf",
        "u1",
        vec![
            PortConnectionSyntax::Ordered {
                expr: Some(Expr::ident(interner.get_or_intern("c"))),
                span: Span::DUMMY,
            },
            PortConnectionSyntax::Ordered {
                expr: Some(Expr::ident(interner.get_or_intern("out"))),
                span: Span::DUMMY,
            },
        ],
        &mut ids,
    ));
    top.items.push(inst_conns(
        &interner,
        "leaf",
        "u2",
        vec![
            PortConnectionSyntax::Named {
                name: interner.get_or_intern("clk"),
                expr: Some(Expr::ident(interner.get_or_intern("c"))),
                span: Span::DUMMY,
            },
            PortConnectionSyntax::Named {
                name: interner.get_or_intern("q"),
                expr: None,
                span: Span::DUMMY,
            },
        ],
        &mut ids,
    ));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    let top_id = top_named(&comp, "top");
    let u1 = child(&comp, top_id, "u1");
    let conns = comp.port_connections(u1).to_vec();
    assert_eq!(conns.len(), 2);
    assert!(matches!(conns[0], Connection::Expr(_)));
    assert!(matches!(conns[1], Connection::Expr(_)));

    let u2 = child(&comp, top_id, "u2");
    let conns = comp.port_connections(u2).to_vec();
    assert!(matches!(conns[0], Connection::Expr(_)));
    // An explicitly empty named connection leaves the port unconnected.
    assert!(matches!(conns[1], Connection::Unconnected));
    assert!(!sink.has_errors());
}

#[test]
fn port_connection_diagnostics() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let leaf = ported_leaf(&interner);
    let mut top = module(&interner, "top");
    top.items.push(ModuleItem::Net(NetDecl {
        names: vec![interner.get_or_intern("c")],
        span: Span::DUMMY,
    }));
    // Mixed ordered and named.
    top.items.push(inst_conns(
        &interner,
        "leaf",
        "u1",
        vec![
            PortConnectionSyntax::Ordered {
                expr: Some(Expr::ident(interner.get_or_intern("c"))),
                span: Span::DUMMY,
            },
            PortConnectionSyntax::Named {
                name: interner.get_or_intern("q"),
                expr: None,
                span: Span::DUMMY,
            },
        ],
        &mut ids,
    ));
    // Unknown named port.
    top.items.push(inst_conns(
        &interner,
        "leaf",
        "u2",
        vec![PortConnectionSyntax::Named {
            name: interner.get_or_intern("nope"),
            expr: Some(Expr::ident(interner.get_or_intern("c"))),
            span: Span::DUMMY,
        }],
        &mut ids,
    ));
    // Too many ordered connections.
    top.items.push(inst_conns(
        &interner,
        "leaf",
        "u3",
        vec![
            PortConnectionSyntax::Ordered {
                expr: Some(Expr::ident(interner.get_or_intern("c"))),
                span: Span::DUMMY,
            },
            PortConnectionSyntax::Ordered {
                expr: Some(Expr::ident(interner.get_or_intern("c"))),
                span: Span::DUMMY,
            },
            PortConnectionSyntax::Ordered {
                expr: Some(Expr::ident(interner.get_or_intern("c"))),
                span: Span::DUMMY,
            },
        ],
        &mut ids,
    ));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    let top_id = top_named(&comp, "top");
    for name in ["u1", "u2", "u3"] {
        let id = child(&comp, top_id, name);
        let _ = comp.port_connections(id);
    }
    let codes: Vec<_> = sink.diagnostics().iter().map(|d| d.code).collect();
    assert!(codes.contains(&errors::E313));
    assert!(codes.contains(&errors::E314));
    assert!(codes.contains(&errors::E316));
}

#[test]
fn wildcard_connections_find_scope_names_and_defaults() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let mut leaf = module(&interner, "leaf");
    leaf.ports.push(PortDecl::net(
        interner.get_or_intern("clk"),
        Direction::Input,
    ));
    let mut with_default = PortDecl::net(interner.get_or_intern("en"), Direction::Input);
    with_default.default = Some(Expr::int(1));
    leaf.ports.push(with_default);

    let mut top = module(&interner, "top");
    top.items.push(ModuleItem::Net(NetDecl {
        names: vec![interner.get_or_intern("clk")],
        span: Span::DUMMY,
    }));
    top.items.push(inst_conns(
        &interner,
        "leaf",
        "u",
        vec![PortConnectionSyntax::Wildcard { span: Span::DUMMY }],
        &mut ids,
    ));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    let u = child(&comp, top_named(&comp, "top"), "u");
    let conns = comp.port_connections(u).to_vec();
    assert!(!sink.has_errors());
    assert!(matches!(
        conns[0],
        Connection::Implicit { name } if name == interner.get_or_intern("clk")
    ));
    // The wildcard found nothing for `en`, so its default applies.
    assert!(matches!(conns[1], Connection::Default(_)));
}

#[test]
fn wildcard_without_match_or_default_is_an_error() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let mut leaf = module(&interner, "leaf");
    leaf.ports.push(PortDecl::net(
        interner.get_or_intern("data"),
        Direction::Input,
    ));
    let mut top = module(&interner, "top");
    top.items.push(inst_conns(
        &interner,
        "leaf",
        "u",
        vec![PortConnectionSyntax::Wildcard { span: Span::DUMMY }],
        &mut ids,
    ));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    let u = child(&comp, top_named(&comp, "top"), "u");
    let _ = comp.port_connections(u);
    assert!(sink.diagnostics().iter().any(|d| d.code == errors::E318));
}

#[test]
fn port_connections_are_idempotent() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let leaf = ported_leaf(&interner);
    let mut top = module(&interner, "top");
    top.items.push(inst_conns(
        &interner,
        "leaf",
        "u",
        vec![
            PortConnectionSyntax::Ordered {
                expr: Some(Expr::int(0)),
                span: Span::DUMMY,
            },
            PortConnectionSyntax::Ordered {
                expr: Some(Expr::int(1)),
                span: Span::DUMMY,
            },
        ],
        &mut ids,
    ));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    let u = child(&comp, top_named(&comp, "top"), "u");
    let first = comp.port_connections(u).len();
    let diags_after_first = sink.diagnostics().len();
    let second = comp.port_connections(u).len();
    assert_eq!(first, second);
    assert_eq!(sink.diagnostics().len(), diags_after_first);
}

#[test]
fn interface_ports_connect_to_matching_instances() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let ifc = ModuleDecl::empty(DefinitionKind::Interface, interner.get_or_intern("bus_if"));
    let mut consumer = module(&interner, "consumer");
    consumer.ports.push(PortDecl {
        name: interner.get_or_intern("bus"),
        direction: Direction::Input,
        kind: PortKind::Interface {
            interface: interner.get_or_intern("bus_if"),
            modport: None,
        },
        range: None,
        default: None,
        span: Span::DUMMY,
    });
    let other = module(&interner, "other");

    let mut top = module(&interner, "top");
    top.items.push(inst(&interner, "bus_if", "b0", &mut ids));
    top.items.push(inst(&interner, "other", "o0", &mut ids));
    top.items.push(inst_conns(
        &interner,
        "consumer",
        "good",
        vec![PortConnectionSyntax::Named {
            name: interner.get_or_intern("bus"),
            expr: Some(Expr::ident(interner.get_or_intern("b0"))),
            span: Span::DUMMY,
        }],
        &mut ids,
    ));
    top.items.push(inst_conns(
        &interner,
        "consumer",
        "bad",
        vec![PortConnectionSyntax::Named {
            name: interner.get_or_intern("bus"),
            expr: Some(Expr::ident(interner.get_or_intern("o0"))),
            span: Span::DUMMY,
        }],
        &mut ids,
    ));
    let main_unit = unit(vec![
        UnitItem::Module(ifc),
        UnitItem::Module(consumer),
        UnitItem::Module(other),
        UnitItem::Module(top),
    ]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    let top_id = top_named(&comp, "top");
    let b0 = child(&comp, top_id, "b0");
    let good = child(&comp, top_id, "good");
    let conns = comp.port_connections(good).to_vec();
    assert!(matches!(
        conns[0],
        Connection::Interface { symbol, .. } if symbol == b0
    ));

    let bad = child(&comp, top_id, "bad");
    let conns = comp.port_connections(bad).to_vec();
    assert!(matches!(conns[0], Connection::Unconnected));
    assert!(sink.diagnostics().iter().any(|d| d.code == errors::E317));
}

#[test]
fn top_level_interface_ports_auto_instantiate() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();

    let ifc = ModuleDecl::empty(DefinitionKind::Interface, interner.get_or_intern("bus_if"));
    let mut top = module(&interner, "top");
    top.ports.push(PortDecl {
        name: interner.get_or_intern("bus"),
        direction: Direction::Input,
        kind: PortKind::Interface {
            interface: interner.get_or_intern("bus_if"),
            modport: None,
        },
        range: None,
        default: None,
        span: Span::DUMMY,
    });
    let main_unit = unit(vec![UnitItem::Module(ifc), UnitItem::Module(top)]);

    let options = CompilationOptions {
        top: vec!["top".to_string()],
        allow_top_level_iface_ports: true,
        ..CompilationOptions::default()
    };
    let mut comp = Compilation::new(&interner, &sink, options);
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    let top_id = top_named(&comp, "top");
    let conns = comp.port_connections(top_id).to_vec();
    assert!(!sink.has_errors());
    assert_eq!(conns.len(), 1);
    let Connection::Interface { symbol, .. } = conns[0] else {
        panic!("expected an auto-instantiated interface connection");
    };
    assert_eq!(def_name(&comp, symbol), "bus_if");
}

#[test]
fn implicit_nets_precede_instances_and_deduplicate() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let leaf = ported_leaf(&interner);
    let w = interner.get_or_intern("w");
    let mut top = module(&interner, "top");
    top.items.push(ModuleItem::Instantiation(Instantiation {
        module: interner.get_or_intern("leaf"),
        params: Vec::new(),
        delay: None,
        instances: vec![
            {
                let mut s = InstanceSyntax::named(interner.get_or_intern("u1"), ids.next());
                s.connections = vec![PortConnectionSyntax::Named {
                    name: interner.get_or_intern("clk"),
                    expr: Some(Expr::ident(w)),
                    span: Span::DUMMY,
                }];
                s
            },
            {
                let mut s = InstanceSyntax::named(interner.get_or_intern("u2"), ids.next());
                s.connections = vec![PortConnectionSyntax::Named {
                    name: interner.get_or_intern("clk"),
                    expr: Some(Expr::ident(w)),
                    span: Span::DUMMY,
                }];
                s
            },
        ],
        attributes: Vec::new(),
        span: Span::DUMMY,
    }));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    let top_id = top_named(&comp, "top");
    let body = body_of(&comp, top_id);
    let members = &comp.hierarchy.bodies[body].members;

    let net_pos = members
        .iter()
        .position(|m| matches!(m, Member::Net { name, implicit: true } if *name == w))
        .expect("implicit net not created");
    let first_child = members
        .iter()
        .position(|m| matches!(m, Member::Child(_)))
        .unwrap();
    assert!(net_pos < first_child);

    // One implicit net for the whole statement, not one per instance.
    let count = members
        .iter()
        .filter(|m| matches!(m, Member::Net { implicit: true, .. }))
        .count();
    assert_eq!(count, 1);
}

#[test]
fn package_reexport_resolves_wildcard_connection() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let x = interner.get_or_intern("x");

    // package pa: declares x.
    let mut pa = ModuleDecl::empty(DefinitionKind::Package, interner.get_or_intern("pa"));
    pa.items.push(ModuleItem::Var(VarDecl {
        names: vec![x],
        span: Span::DUMMY,
    }));
    // package pb: imports pa::* and re-exports it.
    let mut pb = ModuleDecl::empty(DefinitionKind::Package, interner.get_or_intern("pb"));
    pb.items.push(ModuleItem::Import(PackageImport {
        package: interner.get_or_intern("pa"),
        item: ImportItem::Wildcard,
        span: Span::DUMMY,
    }));
    pb.items.push(ModuleItem::Export(PackageExport {
        package: Some(interner.get_or_intern("pa")),
        item: ImportItem::Wildcard,
        span: Span::DUMMY,
    }));

    let mut leaf = module(&interner, "leaf");
    leaf.ports.push(PortDecl::net(x, Direction::Input));

    let mut top = module(&interner, "top");
    top.imports.push(PackageImport {
        package: interner.get_or_intern("pb"),
        item: ImportItem::Wildcard,
        span: Span::DUMMY,
    });
    top.items.push(inst_conns(
        &interner,
        "leaf",
        "u",
        vec![PortConnectionSyntax::Wildcard { span: Span::DUMMY }],
        &mut ids,
    ));
    let main_unit = unit(vec![
        UnitItem::Module(pa),
        UnitItem::Module(pb),
        UnitItem::Module(leaf),
        UnitItem::Module(top),
    ]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    let u = child(&comp, top_named(&comp, "top"), "u");
    let conns = comp.port_connections(u).to_vec();
    assert!(!sink.has_errors());
    assert!(matches!(conns[0], Connection::Implicit { name } if name == x));
}

#[test]
fn package_without_export_does_not_leak_imports() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let x = interner.get_or_intern("x");
    let mut pa = ModuleDecl::empty(DefinitionKind::Package, interner.get_or_intern("pa"));
    pa.items.push(ModuleItem::Var(VarDecl {
        names: vec![x],
        span: Span::DUMMY,
    }));
    // pc imports pa but exports nothing.
    let mut pc = ModuleDecl::empty(DefinitionKind::Package, interner.get_or_intern("pc"));
    pc.items.push(ModuleItem::Import(PackageImport {
        package: interner.get_or_intern("pa"),
        item: ImportItem::Wildcard,
        span: Span::DUMMY,
    }));

    let mut leaf = module(&interner, "leaf");
    leaf.ports.push(PortDecl::net(x, Direction::Input));
    let mut top = module(&interner, "top");
    top.imports.push(PackageImport {
        package: interner.get_or_intern("pc"),
        item: ImportItem::Wildcard,
        span: Span::DUMMY,
    });
    top.items.push(inst_conns(
        &interner,
        "leaf",
        "u",
        vec![PortConnectionSyntax::Wildcard { span: Span::DUMMY }],
        &mut ids,
    ));
    let main_unit = unit(vec![
        UnitItem::Module(pa),
        UnitItem::Module(pc),
        UnitItem::Module(leaf),
        UnitItem::Module(top),
    ]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    let u = child(&comp, top_named(&comp, "top"), "u");
    let _ = comp.port_connections(u);
    assert!(sink.diagnostics().iter().any(|d| d.code == errors::E318));
}

#[test]
fn cyclic_package_exports_terminate() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let x = interner.get_or_intern("x");
    // pa and pb import and re-export each other; neither declares x.
    let mut pa = ModuleDecl::empty(DefinitionKind::Package, interner.get_or_intern("pa"));
    pa.items.push(ModuleItem::Import(PackageImport {
        package: interner.get_or_intern("pb"),
        item: ImportItem::Wildcard,
        span: Span::DUMMY,
    }));
    pa.items.push(ModuleItem::Export(PackageExport {
        package: None,
        item: ImportItem::Wildcard,
        span: Span::DUMMY,
    }));
    let mut pb = ModuleDecl::empty(DefinitionKind::Package, interner.get_or_intern("pb"));
    pb.items.push(ModuleItem::Import(PackageImport {
        package: interner.get_or_intern("pa"),
        item: ImportItem::Wildcard,
        span: Span::DUMMY,
    }));
    pb.items.push(ModuleItem::Export(PackageExport {
        package: None,
        item: ImportItem::Wildcard,
        span: Span::DUMMY,
    }));

    let mut leaf = module(&interner, "leaf");
    leaf.ports.push(PortDecl::net(x, Direction::Input));
    let mut top = module(&interner, "top");
    top.imports.push(PackageImport {
        package: interner.get_or_intern("pa"),
        item: ImportItem::Wildcard,
        span: Span::DUMMY,
    });
    top.items.push(inst_conns(
        &interner,
        "leaf",
        "u",
        vec![PortConnectionSyntax::Wildcard { span: Span::DUMMY }],
        &mut ids,
    ));
    let main_unit = unit(vec![
        UnitItem::Module(pa),
        UnitItem::Module(pb),
        UnitItem::Module(leaf),
        UnitItem::Module(top),
    ]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    // The cyclic lookup reports "not found" instead of looping.
    let u = child(&comp, top_named(&comp, "top"), "u");
    let _ = comp.port_connections(u);
    assert!(sink.diagnostics().iter().any(|d| d.code == errors::E318));
}

#[test]
fn bare_value_param_assignment_flag() {
    let interner = Interner::new();
    let mut ids = IdGen::new();

    let w = interner.get_or_intern("W");
    let mut leaf = module(&interner, "leaf");
    leaf.params.push(ParamDecl::value(w, Expr::int(8)));

    // `leaf #4 u();` written in primitive style.
    let mut top = module(&interner, "top");
    top.items.push(ModuleItem::Instantiation(Instantiation {
        module: interner.get_or_intern("leaf"),
        params: Vec::new(),
        delay: Some(Expr::int(4)),
        instances: vec![InstanceSyntax::named(interner.get_or_intern("u"), ids.next())],
        attributes: Vec::new(),
        span: Span::DUMMY,
    }));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    // Without the flag the bare value is rejected and the default stays.
    let sink = DiagnosticSink::new();
    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();
    assert!(sink.diagnostics().iter().any(|d| d.code == errors::E303));
    let u = child(&comp, top_named(&comp, "top"), "u");
    assert_eq!(
        comp.hierarchy.find_param(body_of(&comp, u), w).unwrap().value,
        ParamValue::Int(8)
    );

    // With the flag it acts as a single ordered parameter assignment.
    let sink = DiagnosticSink::new();
    let options = CompilationOptions {
        top: vec!["top".to_string()],
        allow_bare_val_param_assignment: true,
        ..CompilationOptions::default()
    };
    let mut comp = Compilation::new(&interner, &sink, options);
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();
    assert!(!sink.has_errors());
    let u = child(&comp, top_named(&comp, "top"), "u");
    assert_eq!(
        comp.hierarchy.find_param(body_of(&comp, u), w).unwrap().value,
        ParamValue::Int(4)
    );
}

#[test]
fn defparam_targets_one_array_element() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let w = interner.get_or_intern("W");
    let mut leaf = module(&interner, "leaf");
    leaf.params.push(ParamDecl::value(w, Expr::int(8)));

    let mut top = module(&interner, "top");
    let mut syntax = InstanceSyntax::named(interner.get_or_intern("arr"), ids.next());
    syntax.dimensions.push(Range::literal(1, 0));
    top.items.push(ModuleItem::Instantiation(Instantiation {
        module: interner.get_or_intern("leaf"),
        params: Vec::new(),
        delay: None,
        instances: vec![syntax],
        attributes: Vec::new(),
        span: Span::DUMMY,
    }));
    top.items.push(ModuleItem::Defparam(DefparamDecl {
        path: vec![PathSegment {
            name: interner.get_or_intern("arr"),
            index: Some(1),
        }],
        param: w,
        value: Expr::int(99),
        span: Span::DUMMY,
    }));
    let main_unit = unit(vec![UnitItem::Module(leaf), UnitItem::Module(top)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(!sink.has_errors());
    let arr = child(&comp, top_named(&comp, "top"), "arr");
    let array = comp.hierarchy.symbols[arr].as_array().unwrap();
    let values: Vec<ParamValue> = array
        .elements
        .iter()
        .map(|element| {
            let body = comp.hierarchy.symbols[*element].body().unwrap();
            comp.hierarchy.find_param(body, w).unwrap().value.clone()
        })
        .collect();
    assert_eq!(values, vec![ParamValue::Int(8), ParamValue::Int(99)]);
}

#[test]
fn invalid_top_kind_creates_uninstantiated_placeholder() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    // Naming an interface as the top is invalid; its body still elaborates
    // as an uninstantiated placeholder so nothing inside it cascades.
    let mut iface = ModuleDecl::empty(
        DefinitionKind::Interface,
        interner.get_or_intern("ifc"),
    );
    iface.items.push(inst(&interner, "missing_mod", "u", &mut ids));
    let main_unit = unit(vec![UnitItem::Module(iface)]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("ifc"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    // One invalid-top error; no unknown-module cascade from inside the
    // placeholder body.
    let codes: Vec<_> = sink.diagnostics().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![errors::E305]);
    assert!(comp.top_instances().is_empty());

    // The placeholder body exists, is uninstantiated, and holds an
    // uninstantiated child for the unresolved instantiation.
    let placeholder = comp
        .hierarchy
        .symbols
        .iter()
        .find_map(|(_, sym)| match sym {
            Symbol::Instance(inst) if inst.name.is_none() => Some(inst),
            _ => None,
        })
        .expect("no placeholder instance created");
    let body = &comp.hierarchy.bodies[placeholder.body];
    assert!(body.is_uninstantiated);
    assert!(body.params.iter().all(|p| p.value.is_invalid()) || body.params.is_empty());
    assert!(body.members.iter().any(|m| matches!(m, Member::Child(id)
        if comp.hierarchy.symbols[*id].as_uninstantiated().is_some())));
}

#[test]
fn every_body_points_back_at_its_instance() {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut ids = IdGen::new();

    let leaf = module(&interner, "leaf");
    let mut mid = module(&interner, "mid");
    mid.items.push(inst_many(&interner, "leaf", &["l1", "l2"], &mut ids));
    let mut top = module(&interner, "top");
    top.items.push(inst(&interner, "mid", "m", &mut ids));
    let main_unit = unit(vec![
        UnitItem::Module(leaf),
        UnitItem::Module(mid),
        UnitItem::Module(top),
    ]);

    let mut comp = Compilation::new(&interner, &sink, options_with_top("top"));
    comp.add_source_unit(&main_unit, None);
    comp.elaborate();

    assert!(!sink.has_errors());
    for (id, symbol) in comp.hierarchy.symbols.iter() {
        if let Symbol::Instance(instance) = symbol {
            assert_eq!(
                comp.hierarchy.bodies[instance.body].parent_instance,
                Some(id)
            );
        }
    }
    // Bodies of the same definition with equal parameters compare equal.
    let m = child(&comp, top_named(&comp, "top"), "m");
    let l1 = child(&comp, m, "l1");
    let l2 = child(&comp, m, "l2");
    assert!(comp
        .hierarchy
        .has_same_type(body_of(&comp, l1), body_of(&comp, l2)));
}
