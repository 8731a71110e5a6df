#[cfg(test)]
/// Parser unit tests.
///
/// These tests focus on correctness of specific syntactic forms, on the disambiguation heuristics, and on the
/// parser’s error recovery behavior (the rest of the file must still yield a usable tree).
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;

    fn parse_ok(source: &str) -> SyntaxTree {
        let parsed = parse_source(source);
        assert!(parsed.errors.is_empty(), "unexpected errors: {:?}", parsed.errors);
        parsed.tree
    }

    fn child(tree: &SyntaxTree, parent: NodeId, name: &str) -> NodeId {
        tree.children_named(parent, name)
            .next()
            .unwrap_or_else(|| panic!("no child named {name:?}"))
    }

    fn initializer(tree: &SyntaxTree, id: NodeId) -> ExprId {
        match &tree.node(id).kind {
            NodeKind::Variable(data) => data.initializer.expect("initializer"),
            other => panic!("expected variable, got {other:?}"),
        }
    }

    fn block_tokens(tree: &SyntaxTree, parent: NodeId) -> Vec<Option<KeywordId>> {
        tree.children(parent)
            .iter()
            .filter_map(|&id| match &tree.node(id).kind {
                NodeKind::Block(data) => Some(data.token),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_module_declaration_and_variable() {
        let tree = parse_ok("module app.main; int x = 2+2;");
        assert_eq!(tree.module_name.as_deref(), Some("app.main"));
        let x = child(&tree, tree.root, "x");
        assert_eq!(tree.node(x).ty, Some(TypeDecl::Basic(KeywordId::Int)));
        match &tree.expr(initializer(&tree, x)).node {
            Expr::Binary { op, left, right } => {
                assert_eq!(*op, BinaryOp::Add);
                assert_eq!(tree.expr(*left).node, Expr::Literal(Literal::Int(2)));
                assert_eq!(tree.expr(*right).node, Expr::Literal(Literal::Int(2)));
            }
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    #[test]
    fn test_template_instance_access_chain_is_not_a_comparison() {
        let tree = parse_ok("auto v = a!('a').b.c.d;");
        let v = child(&tree, tree.root, "v");
        assert!(tree.node(v).ty.is_none());

        let mut members = Vec::new();
        let mut current = initializer(&tree, v);
        while let Expr::Access { base, member } = &tree.expr(current).node {
            match member {
                Member::Name(TypeDecl::Identifier(name)) => members.push(name.clone()),
                other => panic!("unexpected member {other:?}"),
            }
            current = *base;
        }
        assert_eq!(members, ["d", "c", "b"]);
        match &tree.expr(current).node {
            Expr::TypeDeclaration(TypeDecl::TemplateInstance { name, args }) => {
                assert_eq!(name, "a");
                assert_eq!(args.len(), 1);
                let TypeOrExpr::Expr(arg) = args[0] else {
                    panic!("expected expression argument");
                };
                assert_eq!(tree.expr(arg).node, Expr::Literal(Literal::Char('a')));
            }
            other => panic!("expected template instance, got {other:?}"),
        }
    }

    #[test]
    fn test_bang_comparisons() {
        let tree = parse_ok("bool p = a != b; bool q = a !is null; bool r = k !in map;");
        let op_of = |name: &str| match &tree.expr(initializer(&tree, child(&tree, tree.root, name))).node {
            Expr::Binary { op, .. } => *op,
            other => panic!("expected binary expression, got {other:?}"),
        };
        assert_eq!(op_of("p"), BinaryOp::NotEq);
        assert_eq!(op_of("q"), BinaryOp::NotIs);
        assert_eq!(op_of("r"), BinaryOp::NotIn);
    }

    #[test]
    fn test_precedence_ladder() {
        let tree = parse_ok("int x = a + b * c; int y = -2 ^^ 2; int z = a ? b : c = d;");
        match &tree.expr(initializer(&tree, child(&tree, tree.root, "x"))).node {
            Expr::Binary { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(tree.expr(*right).node, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected addition, got {other:?}"),
        }
        match &tree.expr(initializer(&tree, child(&tree, tree.root, "y"))).node {
            Expr::Unary { op: UnaryOp::Negate, operand } => {
                assert!(matches!(tree.expr(*operand).node, Expr::Binary { op: BinaryOp::Pow, .. }));
            }
            other => panic!("expected negation, got {other:?}"),
        }
        assert!(matches!(
            tree.expr(initializer(&tree, child(&tree, tree.root, "z"))).node,
            Expr::Assign { .. }
        ));
    }

    #[test]
    fn test_declarator_suffixes_nest_innermost_last() {
        let tree = parse_ok("int[3][] grid; int legacy[4];");
        match tree.node(child(&tree, tree.root, "grid")).ty.as_ref() {
            Some(TypeDecl::Array {
                key: ArrayKey::Dynamic,
                base: Some(inner),
            }) => {
                assert!(matches!(**inner, TypeDecl::Array { key: ArrayKey::Static(_), .. }));
                assert_eq!(inner.most_basic(), &TypeDecl::Basic(KeywordId::Int));
            }
            other => panic!("expected dynamic array of static array, got {other:?}"),
        }
        assert!(matches!(
            tree.node(child(&tree, tree.root, "legacy")).ty,
            Some(TypeDecl::Array { key: ArrayKey::Static(_), .. })
        ));
    }

    #[test]
    fn test_associative_array_and_pointer_types() {
        let tree = parse_ok("string[int] names; char** argv;");
        match tree.node(child(&tree, tree.root, "names")).ty.as_ref() {
            Some(TypeDecl::Array {
                key: ArrayKey::Assoc(key),
                ..
            }) => assert_eq!(**key, TypeDecl::Basic(KeywordId::Int)),
            other => panic!("expected associative array, got {other:?}"),
        }
        let argv = tree.node(child(&tree, tree.root, "argv")).ty.clone();
        assert_eq!(
            argv,
            Some(TypeDecl::pointer(TypeDecl::pointer(TypeDecl::Basic(KeywordId::Char))))
        );
    }

    #[test]
    fn test_c_style_function_pointer() {
        let tree = parse_ok("int (*callback)(int, char*);");
        match tree.node(child(&tree, tree.root, "callback")).ty.as_ref() {
            Some(TypeDecl::Delegate {
                is_function,
                parameters,
                return_type,
            }) => {
                assert!(*is_function);
                assert_eq!(parameters.len(), 2);
                assert_eq!(**return_type, TypeDecl::Basic(KeywordId::Int));
            }
            other => panic!("expected function pointer, got {other:?}"),
        }
    }

    #[test]
    fn test_imports_record_visibility_alias_and_bindings() {
        let tree = parse_ok(
            "import std.stdio;\npublic import core.memory;\nimport io = std.file;\nimport std.conv : to, txt = text;",
        );
        assert_eq!(tree.imports().len(), 4);
        assert_eq!(tree.import_visibility("std.stdio"), Some(false));
        assert_eq!(tree.import_visibility("core.memory"), Some(true));
        assert_eq!(tree.imports()[2].alias.as_deref(), Some("io"));
        let conv = &tree.imports()[3];
        assert_eq!(conv.bindings.len(), 2);
        assert_eq!(conv.bindings[1].name, "text");
        assert_eq!(conv.bindings[1].alias.as_deref(), Some("txt"));
        assert!(tree.last_import_end().is_some());
    }

    #[test]
    fn test_class_with_bases_and_members() {
        let tree = parse_ok(
            r#"
class Widget : Base, IDrawable {
    private int width;
    this(int w) { width = w; }
    ~this() { }
    void draw() const { }
}
"#,
        );
        let widget = child(&tree, tree.root, "Widget");
        let data = tree.node(widget).class_like().expect("class");
        assert_eq!(data.kind, ClassKind::Class);
        assert_eq!(data.base_classes, vec![TypeDecl::ident("Base"), TypeDecl::ident("IDrawable")]);
        assert_eq!(tree.children(widget).len(), 4);
        assert_eq!(tree.node(child(&tree, widget, "width")).protection(), KeywordId::Private);
        let ctor = child(&tree, widget, "this");
        assert_eq!(tree.node(ctor).method().map(|m| m.kind), Some(MethodKind::Constructor));
        assert_eq!(tree.node(ctor).method().map(|m| m.parameters.len()), Some(1));
        assert!(tree.node(widget).body.is_some());
    }

    #[test]
    fn test_sticky_attributes_apply_to_following_declarations() {
        let tree = parse_ok("private:\nint a;\nint b;\npublic { int c; }");
        assert_eq!(tree.node(child(&tree, tree.root, "a")).protection(), KeywordId::Private);
        assert_eq!(tree.node(child(&tree, tree.root, "b")).protection(), KeywordId::Private);
        assert_eq!(tree.node(child(&tree, tree.root, "c")).protection(), KeywordId::Public);
    }

    #[test]
    fn test_function_template_parameter_heuristic() {
        let tree = parse_ok("T identity(T)(T value) { return value; }");
        let f = child(&tree, tree.root, "identity");
        assert_eq!(tree.node(f).template_parameters.len(), 1);
        assert_eq!(tree.node(f).method().map(|m| m.parameters.len()), Some(1));
    }

    #[test]
    fn test_double_parameter_list_is_always_read_as_template() {
        // The second group decides: `(int a)` becomes a value template parameter.
        let tree = parse_ok("void configure(int a)(int b) { }");
        let f = child(&tree, tree.root, "configure");
        let template_parameter = tree.node(f).template_parameters[0];
        assert_eq!(tree.node(template_parameter).name, "a");
        assert!(matches!(
            tree.node(template_parameter).kind,
            NodeKind::TemplateParameter(TemplateParameterKind::Value { .. })
        ));
    }

    #[test]
    fn test_statement_blocks_and_locals() {
        let tree = parse_ok(
            r#"
void run(int[] xs) {
    foreach (i, x; xs) { int y = x; }
    if (auto p = find(xs)) { } else { }
    while (true) break;
}
"#,
        );
        let run = child(&tree, tree.root, "run");
        assert_eq!(
            block_tokens(&tree, run),
            vec![
                Some(KeywordId::Foreach),
                Some(KeywordId::If),
                Some(KeywordId::Else),
                Some(KeywordId::While)
            ]
        );
        let foreach = tree.children(run)[0];
        let names: Vec<_> = tree.children(foreach).iter().map(|&c| tree.node(c).name.as_str()).collect();
        assert_eq!(names, ["i", "x", "y"]);
        let if_block = tree.children(run)[1];
        assert_eq!(tree.node(child(&tree, if_block, "p")).attributes, vec![Attribute::Keyword(KeywordId::Auto)]);
        assert_eq!(tree.node(run).statements.len(), 3);
    }

    #[test]
    fn test_multiplication_statement_declares_pointer() {
        let tree = parse_ok("void f() { Foo * bar; }");
        let f = child(&tree, tree.root, "f");
        assert_eq!(tree.node(child(&tree, f, "bar")).ty, Some(TypeDecl::pointer(TypeDecl::ident("Foo"))));
    }

    #[test]
    fn test_lambdas_become_literal_methods() {
        let tree = parse_ok("auto f = (int a) => a * 2; auto g = x => x; auto h = delegate int() { return 1; };");
        for name in ["f", "g", "h"] {
            let variable = child(&tree, tree.root, name);
            let Expr::FunctionLiteral { method, .. } = tree.expr(initializer(&tree, variable)).node else {
                panic!("expected function literal for {name}");
            };
            assert_eq!(tree.node(method).method().map(|m| m.kind), Some(MethodKind::Literal));
        }
        let h = child(&tree, tree.root, "h");
        let Expr::FunctionLiteral { method, token, .. } = tree.expr(initializer(&tree, h)).node else {
            unreachable!()
        };
        assert_eq!(token, Some(KeywordId::Delegate));
        assert_eq!(tree.node(method).ty, Some(TypeDecl::Basic(KeywordId::Int)));
    }

    #[test]
    fn test_struct_initializer_and_void() {
        let tree = parse_ok("Point p = { x: 1, y: 2 }; int[4] buffer = void;");
        match &tree.expr(initializer(&tree, child(&tree, tree.root, "p"))).node {
            Expr::StructInitializer(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].0.as_deref(), Some("x"));
            }
            other => panic!("expected struct initializer, got {other:?}"),
        }
        assert_eq!(
            tree.expr(initializer(&tree, child(&tree, tree.root, "buffer"))).node,
            Expr::VoidInitializer
        );
    }

    #[test]
    fn test_enums_and_aliases() {
        let tree = parse_ok("enum Color : ubyte { Red, Green = 3 }\nalias Id = uint;\nalias int Handle;\nenum answer = 42;");
        let color = child(&tree, tree.root, "Color");
        assert_eq!(tree.node(color).ty, Some(TypeDecl::Basic(KeywordId::Ubyte)));
        assert_eq!(tree.children(color).len(), 2);
        assert_eq!(tree.node(child(&tree, tree.root, "Id")).ty, Some(TypeDecl::Basic(KeywordId::Uint)));
        assert_eq!(tree.node(child(&tree, tree.root, "Handle")).ty, Some(TypeDecl::Basic(KeywordId::Int)));
        assert!(tree.node(child(&tree, tree.root, "answer")).has_attribute(KeywordId::Enum));
    }

    #[test]
    fn test_recovery_keeps_following_declarations() {
        let parsed = parse_source("int x = ;\nint y;\n");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].kind, ErrorKind::Syntax);
        assert!(parsed.tree.children_named(parsed.tree.root, "y").next().is_some());
    }

    #[test]
    fn test_recovery_inside_function_body() {
        let parsed = parse_source("void f() { int a = ; a++; }\nint after;");
        assert!(parsed.has_errors());
        let tree = &parsed.tree;
        let f = child(tree, tree.root, "f");
        assert!(tree.node(f).body.is_some());
        assert!(tree.children_named(tree.root, "after").next().is_some());
    }

    #[test]
    fn test_stray_closing_brace_is_single_error() {
        let parsed = parse_source("int a; } int b;");
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].message.contains("Unexpected '}'"));
        assert_eq!(parsed.tree.children(parsed.tree.root).len(), 2);
    }

    #[test]
    fn test_inline_assembler_is_unimplemented_not_fatal() {
        let parsed = parse_source("void f() { asm { mov EAX, 1; } }\nint y;");
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.is_partial());
        assert!(parsed.tree.children_named(parsed.tree.root, "y").next().is_some());
    }

    #[test]
    fn test_template_mixin_is_unimplemented_not_fatal() {
        let parsed = parse_source("mixin Foo!(int);\nint y;");
        assert!(parsed.is_partial());
        assert!(parsed.tree.children_named(parsed.tree.root, "y").next().is_some());
    }

    #[test]
    fn test_deep_nesting_reports_error_without_overflow() {
        let source = format!("int x = {}1{};", "(".repeat(5000), ")".repeat(5000));
        let parsed = parse_source(&source);
        assert!(parsed.errors.iter().any(|e| e.message.contains("too deep")));
    }

    #[test]
    fn test_nesting_limit_allows_ordinary_code() {
        let source = format!("int x = {}1{};", "(".repeat(12), ")".repeat(12));
        assert!(parse_source(&source).errors.is_empty());
        let tree = parse_ok("void f() { if (a) { while (b) { foreach (c; d) { { e(f(g(h(1)))); } } } } }");
        assert!(tree.children_named(tree.root, "f").next().is_some());
    }

    #[test]
    fn test_long_type_suffix_chains_are_rejected() {
        for source in [
            format!("int{} x;\nint after;", "[]".repeat(100_000)),
            format!("int{} x;\nint after;", "*".repeat(100_000)),
            format!("int[{}int] x;\nint after;", "const ".repeat(50_000)),
        ] {
            let parsed = parse_source(&source);
            assert!(parsed.errors.iter().any(|e| e.message.contains("too deep")));
            assert!(parsed.tree.children_named(parsed.tree.root, "after").next().is_some());
        }
    }

    #[test]
    fn test_long_operator_chains_are_rejected() {
        let sum = format!("int x = {}a;\nint after;", "a + ".repeat(100_000));
        let calls = format!("auto y = a{};\nint after;", ".b()".repeat(100_000));
        let negations = format!("int z = {}a;\nint after;", "- ".repeat(100_000));
        for source in [sum, calls, negations] {
            let parsed = parse_source(&source);
            assert!(parsed.errors.iter().any(|e| e.message.contains("too deep")));
            assert!(parsed.tree.children_named(parsed.tree.root, "after").next().is_some());
            let _ = crate::printer::render_module(&parsed.tree);
        }
    }

    #[test]
    fn test_lambda_keeps_its_result_expression() {
        let tree = parse_ok("auto f = (int a) => a * 2; auto g = delegate() { return 1; };");
        let f = child(&tree, tree.root, "f");
        let Expr::FunctionLiteral { body, .. } = tree.expr(initializer(&tree, f)).node else {
            panic!("expected function literal");
        };
        let body = body.expect("`=>` body");
        assert!(matches!(tree.expr(body).node, Expr::Binary { op: BinaryOp::Mul, .. }));

        let g = child(&tree, tree.root, "g");
        assert!(matches!(
            tree.expr(initializer(&tree, g)).node,
            Expr::FunctionLiteral { body: None, .. }
        ));
    }

    #[test]
    fn test_statement_that_cannot_start_an_expression() {
        let parsed = parse_source("void f() { ) ; int kept; }");
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].message.contains("Expected statement"), "{:?}", parsed.errors);
        let f = child(&parsed.tree, parsed.tree.root, "f");
        assert!(parsed.tree.children_named(f, "kept").next().is_some());
    }

    #[test]
    fn test_doc_comments_attach_to_declarations() {
        let tree = parse_ok("/// Adds things.\nint add(int a, int b);\nint counter; /// trailing\n/* plain */\nint bare;");
        assert_eq!(tree.node(child(&tree, tree.root, "add")).description.as_deref(), Some("Adds things."));
        assert_eq!(tree.node(child(&tree, tree.root, "counter")).description.as_deref(), Some("trailing"));
        assert_eq!(tree.node(child(&tree, tree.root, "bare")).description, None);
    }

    #[test]
    fn test_conditional_compilation_flattens_branches() {
        let tree = parse_ok("version (Windows) { int win; } else { int posix; }\nstatic if (true) int both;");
        for name in ["win", "posix", "both"] {
            assert!(tree.children_named(tree.root, name).next().is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        let source = "module m; class A { int x; } void f() { if (a) { int b; } }";
        assert_eq!(parse_source(source), parse_source(source));
    }
}
