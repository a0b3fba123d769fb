//! Type checker test suite
//!
//! Trees are assembled with [`Fixture`](crate::utils::Fixture) and run through the full
//! driver, finder and promoter both.
//!
//! ## Testing Pattern
//!
//! Keep the node ids the builder hands out and read types back with
//! `typed_context.node_type(id)`. Promotion may put a cast in front of a node, so for
//! initializers and operands use the helpers in `utils` to look at what the parent holds now.

/// Tests that verify types are found for literals and expressions.
#[cfg(test)]
mod type_inference_tests {
    use crate::utils::Fixture;
    use streamc_ast::nodes::NodeKind;
    use streamc_types::MetaType;

    mod literals {
        use super::*;

        #[test]
        fn test_numeric_literal_suffixes() {
            let mut f = Fixture::new();
            let plain = f.b.int("42");
            let byte = f.b.int("7ub");
            let long = f.b.int("7l");
            let float = f.b.float("2.5");
            let float32 = f.b.float("2.5fw");
            let hex = f.b.hex("0xff");
            let stmts = [plain, byte, long, float, float32, hex]
                .into_iter()
                .map(|literal| f.b.expr_stmt(literal))
                .collect();
            let root = f.b.block(stmts);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let tf = typed_context.types();
            assert_eq!(typed_context.node_type(plain), Some(tf.int32()));
            assert_eq!(typed_context.node_type(byte), Some(tf.uint8()));
            assert_eq!(
                typed_context.node_type(long),
                Some(tf.primitive(MetaType::Int64))
            );
            assert_eq!(typed_context.node_type(float), Some(tf.float64()));
            assert_eq!(
                typed_context.node_type(float32),
                Some(tf.primitive(MetaType::Float32))
            );
            assert_eq!(
                typed_context.node_type(hex),
                Some(tf.primitive(MetaType::Int8))
            );
        }

        #[test]
        fn test_invalid_numeric_width_is_rejected() {
            let mut f = Fixture::new();
            let literal = f.b.at(4, 9).int("3q");
            let root = f.b.expr_stmt(literal);

            let error = f.type_check(root).expect_err("128-bit integers do not exist");
            assert_eq!(error.to_string(), "4:9: invalid numeric literal `3q`");
        }

        #[test]
        fn test_string_and_boolean_literals() {
            let mut f = Fixture::new();
            let rstring = f.b.string("hello");
            let ustring = f.b.ustring("héllo");
            let boolean = f.b.boolean(true);
            let stmts = [rstring, ustring, boolean]
                .into_iter()
                .map(|literal| f.b.expr_stmt(literal))
                .collect();
            let root = f.b.block(stmts);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let tf = typed_context.types();
            assert_eq!(typed_context.node_type(rstring), Some(tf.rstring()));
            assert_eq!(
                typed_context.node_type(ustring),
                Some(tf.primitive(MetaType::Ustring))
            );
            assert_eq!(typed_context.node_type(boolean), Some(tf.boolean()));
        }

        #[test]
        fn test_map_literal_unifies_keys_and_values() {
            let mut f = Fixture::new();
            let (ka, va) = (f.b.string("a"), f.b.int("1"));
            let (kb, vb) = (f.b.string("b"), f.b.int("2"));
            let map = f.b.map(vec![(ka, va), (kb, vb)]);
            let root = f.b.expr_stmt(map);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let tf = typed_context.types();
            assert_eq!(
                typed_context.node_type(map),
                Some(tf.map(tf.rstring(), tf.int32()))
            );
        }

        #[test]
        fn test_empty_list_has_unknown_elements() {
            let mut f = Fixture::new();
            let list = f.b.list(vec![]);
            let root = f.b.expr_stmt(list);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let tf = typed_context.types();
            assert_eq!(typed_context.node_type(list), Some(tf.list(tf.unknown())));
        }

        #[test]
        fn test_heterogeneous_list_is_an_error() {
            let mut f = Fixture::new();
            let one = f.b.int("1");
            let a = f.b.string("a");
            let list = f.b.at(2, 5).list(vec![one, a]);
            let root = f.b.expr_stmt(list);

            let error = f.type_check(root).expect_err("elements do not agree");
            assert_eq!(
                error.to_string(),
                "2:5: elements of list literal have no common type"
            );
        }

        #[test]
        fn test_tuple_literal_collects_attribute_types() {
            let mut f = Fixture::new();
            let a = f.b.int("1");
            let b = f.b.string("x");
            let tuple = f.b.tuple(vec![("a", a), ("b", b)]);
            let root = f.b.expr_stmt(tuple);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let ty = typed_context.node_type(tuple).expect("tuple literal has a type");
            assert_eq!(ty.to_string(), "tuple<int32 a,rstring b>");
        }
    }

    mod expressions {
        use super::*;
        use streamc_ast::nodes::InfixOp;

        #[test]
        fn test_arithmetic_and_comparison() {
            let mut f = Fixture::new();
            let x = f.variable("x", f.tf.int32());
            let lhs = f.b.identifier("x", x);
            let one = f.b.int("1");
            let sum = f.b.infix(InfixOp::Plus, lhs, one);
            let two = f.b.int("2");
            let less = f.b.infix(InfixOp::Less, sum, two);
            let root = f.b.expr_stmt(less);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let tf = typed_context.types();
            assert_eq!(typed_context.node_type(sum), Some(tf.int32()));
            assert_eq!(typed_context.node_type(less), Some(tf.boolean()));
        }

        #[test]
        fn test_scalar_and_list_broadcast() {
            let mut f = Fixture::new();
            let l = f.variable("l", f.tf.list(f.tf.int32()));
            let base = f.b.identifier("l", l);
            let one = f.b.int("1");
            let scaled = f.b.infix(InfixOp::Star, base, one);
            let other = f.b.identifier("l", l);
            let two = f.b.int("2");
            let mask = f.b.infix(InfixOp::Less, two, other);
            let s1 = f.b.expr_stmt(scaled);
            let s2 = f.b.expr_stmt(mask);
            let root = f.b.block(vec![s1, s2]);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let tf = typed_context.types();
            assert_eq!(typed_context.node_type(scaled), Some(tf.list(tf.int32())));
            assert_eq!(typed_context.node_type(mask), Some(tf.list(tf.boolean())));
        }

        #[test]
        fn test_string_plus_int_reports_the_constraint() {
            let mut f = Fixture::new();
            let s = f.b.string("s");
            let n = f.b.at(1, 7).int("1");
            let sum = f.b.infix(InfixOp::Plus, s, n);
            let root = f.b.expr_stmt(sum);

            let error = f.type_check(root).expect_err("strings do not add to integers");
            let message = error.to_string();
            assert!(message.starts_with("1:7: "), "{message}");
            assert!(message.contains("`rstring` and `int32`"), "{message}");
        }

        #[test]
        fn test_attribute_access() {
            let mut f = Fixture::new();
            let ty = f.tf.tuple(vec![
                ("a".to_string(), f.tf.int32()),
                ("b".to_string(), f.tf.rstring()),
            ]);
            let t = f.variable("t", ty);
            let base = f.b.identifier("t", t);
            let b_attr = f.b.attribute(base, "b");
            let root = f.b.expr_stmt(b_attr);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            assert_eq!(
                typed_context.node_type(b_attr),
                Some(typed_context.types().rstring())
            );
        }

        #[test]
        fn test_missing_attribute_is_reported() {
            let mut f = Fixture::new();
            let ty = f.tf.tuple(vec![("a".to_string(), f.tf.int32())]);
            let t = f.variable("t", ty);
            let base = f.b.identifier("t", t);
            let missing = f.b.at(3, 2).attribute(base, "c");
            let root = f.b.expr_stmt(missing);

            let error = f.type_check(root).expect_err("`c` is not an attribute");
            assert_eq!(
                error.to_string(),
                "3:2: `c` is not an attribute of `tuple<int32 a>`"
            );
        }

        #[test]
        fn test_subscripts() {
            let mut f = Fixture::new();
            let l = f.variable("l", f.tf.list(f.tf.rstring()));
            let m = f.variable("m", f.tf.map(f.tf.rstring(), f.tf.float64()));
            let list = f.b.identifier("l", l);
            let zero = f.b.int("0");
            let element = f.b.subscript(list, zero);
            let map = f.b.identifier("m", m);
            let key = f.b.string("k");
            let value = f.b.subscript(map, key);
            let s1 = f.b.expr_stmt(element);
            let s2 = f.b.expr_stmt(value);
            let root = f.b.block(vec![s1, s2]);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let tf = typed_context.types();
            assert_eq!(typed_context.node_type(element), Some(tf.rstring()));
            assert_eq!(typed_context.node_type(value), Some(tf.float64()));
        }

        #[test]
        fn test_conditional_branches_must_agree() {
            let mut f = Fixture::new();
            let cond = f.b.boolean(true);
            let one = f.b.int("1");
            let a = f.b.string("a");
            let conditional = f.b.at(5, 1).conditional(cond, one, a);
            let root = f.b.expr_stmt(conditional);

            let error = f.type_check(root).expect_err("branches differ");
            assert_eq!(
                error.to_string(),
                "5:1: conditional branches have different types `int32` and `rstring`"
            );
        }

        #[test]
        fn test_assignment_to_immutable_variable() {
            let mut f = Fixture::new();
            let c = f.constant("c", f.tf.int32());
            let target = f.b.identifier("c", c);
            let one = f.b.int("1");
            let assign = f.b.at(6, 3).infix(InfixOp::Assign, target, one);
            let root = f.b.expr_stmt(assign);

            let error = f.type_check(root).expect_err("constants cannot be assigned");
            assert_eq!(error.to_string(), "6:3: operand of `=` must be mutable");
        }

        #[test]
        fn test_unresolved_identifier_is_unknown() {
            let mut f = Fixture::new();
            let name = f.b.unresolved("nowhere");
            let one = f.b.int("1");
            let sum = f.b.infix(InfixOp::Plus, name, one);
            let root = f.b.expr_stmt(sum);

            let typed_context = f.type_check(root).expect("unknown operands are not reported");
            assert!(
                typed_context
                    .node_type(sum)
                    .is_some_and(|ty| ty.is_unknown())
            );
        }
    }

    mod statements {
        use super::*;
        use streamc_ast::nodes::{InfixOp, PostfixOp};

        #[test]
        fn test_if_condition_must_be_boolean() {
            let mut f = Fixture::new();
            let cond = f.b.at(1, 5).int("1");
            let then_branch = f.b.block(vec![]);
            let root = f.b.if_stmt(cond, then_branch, None);

            let error = f.type_check(root).expect_err("int32 is not a condition");
            assert_eq!(
                error.to_string(),
                "1:5: condition must be `boolean`, found `int32`"
            );
        }

        #[test]
        fn test_break_and_continue_inside_loops() {
            let mut f = Fixture::new();
            let item = f.variable("i", f.tf.int32());
            let one = f.b.int("1");
            let list = f.b.list(vec![one]);
            let brk = f.b.break_stmt();
            let cont = f.b.continue_stmt();
            let body = f.b.block(vec![cont, brk]);
            let root = f.b.for_stmt(item, list, body);

            assert!(f.type_check(root).is_ok());
        }

        #[test]
        fn test_for_item_must_match_elements() {
            let mut f = Fixture::new();
            let item = f.variable("s", f.tf.rstring());
            let one = f.b.int("1");
            let list = f.b.at(2, 16).list(vec![one]);
            let body = f.b.block(vec![]);
            let root = f.b.for_stmt(item, list, body);

            let error = f.type_check(root).expect_err("rstring items over list<int32>");
            let message = error.to_string();
            assert!(message.starts_with("2:16: "), "{message}");
            assert!(message.contains("`list<int32>`"), "{message}");
        }

        #[test]
        fn test_continue_outside_loop() {
            let mut f = Fixture::new();
            let root = f.b.at(8, 1).continue_stmt();

            let error = f.type_check(root).expect_err("no enclosing loop");
            assert_eq!(error.to_string(), "8:1: `continue` outside of a loop");
        }

        #[test]
        fn test_return_outside_function() {
            let mut f = Fixture::new();
            let root = f.b.at(1, 1).return_stmt(None);

            let error = f.type_check(root).expect_err("no enclosing function");
            assert_eq!(error.to_string(), "1:1: `return` outside of a function");
        }

        #[test]
        fn test_use_and_modification_in_one_expression() {
            let mut f = Fixture::new();
            let x = f.variable("x", f.tf.int32());
            let target = f.b.at(1, 1).identifier("x", x);
            let read = f.b.at(1, 5).identifier("x", x);
            let one = f.b.int("1");
            let sum = f.b.infix(InfixOp::Plus, read, one);
            let assign = f.b.infix(InfixOp::Assign, target, sum);
            let ok = f.b.expr_stmt(assign);

            let modified = f.b.at(2, 1).identifier("x", x);
            let increment = f.b.postfix(PostfixOp::Increment, modified);
            let used = f.b.at(2, 9).identifier("x", x);
            let both = f.b.infix(InfixOp::Plus, increment, used);
            let bad = f.b.expr_stmt(both);
            let root = f.b.block(vec![ok, bad]);

            let error = f.type_check(root).expect_err("x is modified and read");
            assert_eq!(
                error.to_string(),
                "2:1: `x` is modified here and used elsewhere in the same expression"
            );
        }
    }

    mod functions {
        use super::*;
        use streamc_type_checker::symbol_table::{FunctionSignature, SymbolKind};

        #[test]
        fn test_return_type_mismatch() {
            let mut f = Fixture::new();
            let function = f
                .symbols
                .add_function(FunctionSignature::new("name", vec![], f.tf.rstring()));
            let value = f.b.int("1");
            let ret = f.b.at(2, 5).return_stmt(Some(value));
            let body = f.b.block(vec![ret]);
            let root = f.b.function_def(function, body);

            let error = f.type_check(root).expect_err("int32 is not rstring");
            assert_eq!(
                error.to_string(),
                "2:5: returning `int32` from function `name` declared to return `rstring`"
            );
        }

        #[test]
        fn test_void_function_cannot_return_value() {
            let mut f = Fixture::new();
            let function = f
                .symbols
                .add_function(FunctionSignature::new("run", vec![], f.tf.void()));
            let value = f.b.int("1");
            let ret = f.b.at(3, 3).return_stmt(Some(value));
            let body = f.b.block(vec![ret]);
            let root = f.b.function_def(function, body);

            let error = f.type_check(root).expect_err("void function returns a value");
            assert_eq!(
                error.to_string(),
                "3:3: function `run` returns `void` but a value is returned"
            );
        }

        #[test]
        fn test_if_else_returning_on_both_paths() {
            let mut f = Fixture::new();
            let flag = f.symbols.add_symbol(
                "flag",
                SymbolKind::FunctionFormal { mutable: false },
                f.tf.boolean(),
            );
            let function = f.symbols.add_function(FunctionSignature::new(
                "pick",
                vec![f.tf.boolean()],
                f.tf.int32(),
            ));
            let cond = f.b.identifier("flag", flag);
            let one = f.b.int("1");
            let two = f.b.int("2");
            let r1 = f.b.return_stmt(Some(one));
            let r2 = f.b.return_stmt(Some(two));
            let then_branch = f.b.block(vec![r1]);
            let else_branch = f.b.block(vec![r2]);
            let branch = f.b.if_stmt(cond, then_branch, Some(else_branch));
            let body = f.b.block(vec![branch]);
            let root = f.b.function_def(function, body);

            assert!(f.type_check(root).is_ok());
        }

        #[test]
        fn test_generic_call_substitutes_return_type() {
            let mut f = Fixture::new();
            let t = f.tf.type_formal("T", None);
            let first = f.symbols.add_function(FunctionSignature::new(
                "first",
                vec![f.tf.list(t.clone())],
                t,
            ));
            let a = f.b.string("a");
            let list = f.b.list(vec![a]);
            let call = f.b.call("first", first, vec![list]);
            let root = f.b.expr_stmt(call);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            assert_eq!(
                typed_context.node_type(call),
                Some(typed_context.types().rstring())
            );
        }

        #[test]
        fn test_needless_stateful_function_only_warns() {
            let mut f = Fixture::new();
            let function = f.symbols.add_function(
                FunctionSignature::new("tick", vec![], f.tf.void()).stateful(),
            );
            let body = f.b.block(vec![]);
            let root = f.b.function_def(function, body);

            let typed_context = f.type_check(root).expect("warnings do not fail the check");
            assert_eq!(typed_context.diagnostics().warning_count(), 1);
            assert_eq!(typed_context.diagnostics().error_count(), 0);
        }
    }

    #[test]
    fn test_all_expressions_typed_after_check() {
        let mut f = Fixture::new();
        let one = f.b.int("1");
        let null = f.b.null();
        let list = f.b.list(vec![one, null]);
        let root = f.declare("l", f.tf.list(f.tf.optional(f.tf.int32())), list);

        let typed_context = f.type_check(root).expect("Type checking should succeed");
        let untyped = typed_context.find_untyped_expressions();
        assert!(untyped.is_empty(), "untyped expressions: {untyped:?}");
        let casts = typed_context.filter_nodes(|node| matches!(node.kind, NodeKind::Cast { .. }));
        assert_eq!(casts.len(), 1, "only `1` needs a cast");
    }
}
