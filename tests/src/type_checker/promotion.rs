//! Promotion tests
//!
//! After a successful check every implicit conversion is an explicit cast node in the tree, and
//! every `null` literal carries the optional type it was used as.

#[cfg(test)]
mod promotion_tests {
    use crate::utils::{Fixture, cast_of, initializer};
    use streamc_ast::nodes::{InfixOp, NodeKind};
    use streamc_type_checker::symbol_table::{FunctionSignature, SymbolKind};

    mod nulls {
        use super::*;

        #[test]
        fn test_null_initializer_takes_declared_type() {
            let mut f = Fixture::new();
            let null = f.b.null();
            let decl = f.declare("o", f.tf.optional(f.tf.rstring()), null);

            let typed_context = f.type_check(decl).expect("Type checking should succeed");
            let tf = typed_context.types();
            assert_eq!(initializer(&typed_context, decl), null, "null is retyped in place");
            assert_eq!(
                typed_context.node_type(null),
                Some(tf.optional(tf.rstring()))
            );
        }

        #[test]
        fn test_explicit_cast_gives_null_its_type() {
            let mut f = Fixture::new();
            let null = f.b.null();
            let cast = f.b.cast(f.tf.optional(f.tf.int32()), null);
            let root = f.b.expr_stmt(cast);

            let typed_context = f.type_check(root).expect("a cast null is typed");
            let tf = typed_context.types();
            assert_eq!(typed_context.node_type(null), Some(tf.optional(tf.int32())));
        }

        #[test]
        fn test_null_for_generic_parameter_is_rejected() {
            let mut f = Fixture::new();
            let t = f.tf.type_formal("T", None);
            let same = f.symbols.add_function(FunctionSignature::new(
                "same",
                vec![t.clone(), t],
                f.tf.boolean(),
            ));
            let null = f.b.at(2, 6).null();
            let one = f.b.int("1");
            let call = f.b.call("same", same, vec![null, one]);
            let root = f.b.expr_stmt(call);

            let error = f.type_check(root).expect_err("T is bound to int32 by the sibling");
            assert_eq!(
                error.to_string(),
                "2:6: cannot promote `null` to non-optional type `int32`"
            );
        }

        #[test]
        fn test_tuple_attribute_null_takes_declared_attribute_type() {
            let mut f = Fixture::new();
            let declared = f
                .tf
                .tuple(vec![("a".to_string(), f.tf.optional(f.tf.int32()))]);
            let null = f.b.null();
            let tuple = f.b.tuple(vec![("a", null)]);
            let decl = f.declare("t", declared.clone(), tuple);

            let typed_context = f.type_check(decl).expect("Type checking should succeed");
            let tf = typed_context.types();
            assert_eq!(typed_context.node_type(null), Some(tf.optional(tf.int32())));
            assert_eq!(typed_context.node_type(tuple), Some(declared));
        }
    }

    mod containers {
        use super::*;

        #[test]
        fn test_list_with_null_without_declaration() {
            let mut f = Fixture::new();
            let one = f.b.int("1");
            let null = f.b.null();
            let three = f.b.int("3");
            let list = f.b.list(vec![one, null, three]);
            let root = f.b.expr_stmt(list);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let tf = typed_context.types();
            let optional = tf.optional(tf.int32());
            assert_eq!(typed_context.node_type(list), Some(tf.list(optional.clone())));
            let entries = typed_context.arena().children(list);
            assert_eq!(cast_of(&typed_context, entries[0]), Some((optional.clone(), one)));
            assert_eq!(entries[1], null);
            assert_eq!(cast_of(&typed_context, entries[2]), Some((optional, three)));
        }

        #[test]
        fn test_map_values_with_null() {
            let mut f = Fixture::new();
            let declared = f.tf.map(f.tf.rstring(), f.tf.optional(f.tf.int32()));
            let (ka, va) = (f.b.string("a"), f.b.int("1"));
            let (kb, vb) = (f.b.string("b"), f.b.null());
            let map = f.b.map(vec![(ka, va), (kb, vb)]);
            let decl = f.declare("m", declared.clone(), map);

            let typed_context = f.type_check(decl).expect("Type checking should succeed");
            let tf = typed_context.types();
            assert_eq!(typed_context.node_type(map), Some(declared));
            assert_eq!(typed_context.node_type(vb), Some(tf.optional(tf.int32())));
            assert_eq!(typed_context.node_type(ka), Some(tf.rstring()));
        }

        #[test]
        fn test_list_variable_into_optional_list() {
            let mut f = Fixture::new();
            let list_type = f.tf.list(f.tf.int32());
            let l = f.variable("l", list_type.clone());
            let value = f.b.identifier("l", l);
            let decl = f.declare("ol", f.tf.optional(list_type.clone()), value);

            let typed_context = f.type_check(decl).expect("Type checking should succeed");
            let tf = typed_context.types();
            let init = initializer(&typed_context, decl);
            assert_eq!(
                cast_of(&typed_context, init),
                Some((tf.optional(list_type), value))
            );
        }

        #[test]
        fn test_null_entries_under_plain_list_declaration() {
            let mut f = Fixture::new();
            let one = f.b.int("1");
            let null = f.b.null();
            let three = f.b.int("3");
            let list = f.b.list(vec![one, null, three]);
            let decl = f.declare("l", f.tf.list(f.tf.int32()), list);

            let typed_context = f.type_check(decl).expect("the literal keeps its optional entries");
            let tf = typed_context.types();
            let optional = tf.optional(tf.int32());
            assert_eq!(typed_context.node_type(list), Some(tf.list(optional.clone())));
            assert_eq!(typed_context.node_type(null), Some(optional.clone()));
            let entries = typed_context.arena().children(list);
            assert_eq!(cast_of(&typed_context, entries[0]), Some((optional.clone(), one)));
            assert_eq!(entries[1], null);
            assert_eq!(cast_of(&typed_context, entries[2]), Some((optional, three)));
        }

        #[test]
        fn test_list_index_is_left_uncast() {
            let mut f = Fixture::new();
            let l = f.variable("l", f.tf.list(f.tf.rstring()));
            let base = f.b.identifier("l", l);
            let zero = f.b.int("0");
            let element = f.b.subscript(base, zero);
            let root = f.b.expr_stmt(element);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let NodeKind::Subscript { index, .. } = typed_context.arena().kind(element) else {
                panic!("expected a subscript");
            };
            assert_eq!(*index, zero, "only initializers widen implicitly");
            assert_eq!(typed_context.node_type(zero), Some(typed_context.types().int32()));
        }
    }

    mod membership {
        use super::*;

        #[test]
        fn test_substring_search() {
            let mut f = Fixture::new();
            let s = f.variable("s", f.tf.rstring());
            let needle = f.b.string("a");
            let haystack = f.b.identifier("s", s);
            let search = f.b.infix(InfixOp::In, needle, haystack);
            let root = f.b.expr_stmt(search);

            let typed_context = f.type_check(root).expect("strings can be searched");
            assert_eq!(
                typed_context.node_type(search),
                Some(typed_context.types().boolean())
            );
        }

        #[test]
        fn test_plain_value_among_optional_elements() {
            let mut f = Fixture::new();
            let l = f.variable("l", f.tf.list(f.tf.optional(f.tf.int32())));
            let one = f.b.int("1");
            let list = f.b.identifier("l", l);
            let search = f.b.infix(InfixOp::In, one, list);
            let root = f.b.expr_stmt(search);

            let typed_context = f.type_check(root).expect("int32 is searchable among optionals");
            let NodeKind::Infix { lhs, .. } = typed_context.arena().kind(search) else {
                panic!("expected an infix");
            };
            let tf = typed_context.types();
            assert_eq!(cast_of(&typed_context, *lhs), Some((tf.optional(tf.int32()), one)));
            assert_eq!(typed_context.node_type(search), Some(tf.boolean()));
        }

        #[test]
        fn test_value_of_another_type_is_rejected() {
            let mut f = Fixture::new();
            let s = f.variable("s", f.tf.rstring());
            let one = f.b.int("1");
            let haystack = f.b.at(1, 6).identifier("s", s);
            let search = f.b.infix(InfixOp::In, one, haystack);
            let root = f.b.expr_stmt(search);

            let error = f.type_check(root).expect_err("int32 is not part of a string");
            assert_eq!(
                error.to_string(),
                "1:6: left operand `int32` of `in` must be an element of right operand `rstring`"
            );
        }
    }

    mod sites {
        use super::*;

        #[test]
        fn test_conditional_with_null_branch() {
            let mut f = Fixture::new();
            let flag = f.variable("flag", f.tf.boolean());
            let cond = f.b.identifier("flag", flag);
            let one = f.b.int("1");
            let null = f.b.null();
            let conditional = f.b.conditional(cond, one, null);
            let decl = f.declare("o", f.tf.optional(f.tf.int32()), conditional);

            let typed_context = f.type_check(decl).expect("Type checking should succeed");
            let tf = typed_context.types();
            let optional = tf.optional(tf.int32());
            assert_eq!(typed_context.node_type(conditional), Some(optional.clone()));
            assert_eq!(typed_context.node_type(null), Some(optional.clone()));
            let NodeKind::Conditional { then_expr, .. } = typed_context.arena().kind(conditional)
            else {
                panic!("expected a conditional");
            };
            assert_eq!(cast_of(&typed_context, *then_expr), Some((optional, one)));
        }

        #[test]
        fn test_returned_value_is_cast_to_return_type() {
            let mut f = Fixture::new();
            let x = f.symbols.add_symbol(
                "x",
                SymbolKind::FunctionFormal { mutable: false },
                f.tf.int32(),
            );
            let function = f.symbols.add_function(FunctionSignature::new(
                "wrap",
                vec![f.tf.int32()],
                f.tf.optional(f.tf.int32()),
            ));
            let value = f.b.identifier("x", x);
            let ret = f.b.return_stmt(Some(value));
            let body = f.b.block(vec![ret]);
            let root = f.b.function_def(function, body);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let NodeKind::Return { expr: Some(expr) } = typed_context.arena().kind(ret) else {
                panic!("expected a return with a value");
            };
            let tf = typed_context.types();
            assert_eq!(
                cast_of(&typed_context, *expr),
                Some((tf.optional(tf.int32()), value))
            );
        }

        #[test]
        fn test_argument_is_cast_to_parameter_type() {
            let mut f = Fixture::new();
            let takes = f.symbols.add_function(FunctionSignature::new(
                "takes",
                vec![f.tf.optional(f.tf.int32())],
                f.tf.void(),
            ));
            let one = f.b.int("1");
            let call = f.b.call("takes", takes, vec![one]);
            let root = f.b.expr_stmt(call);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let NodeKind::Call { args, .. } = typed_context.arena().kind(call) else {
                panic!("expected a call");
            };
            let tf = typed_context.types();
            assert_eq!(
                cast_of(&typed_context, args[0]),
                Some((tf.optional(tf.int32()), one))
            );
        }

        #[test]
        fn test_equality_promotes_the_plain_operand() {
            let mut f = Fixture::new();
            let i = f.variable("i", f.tf.int32());
            let o = f.variable("o", f.tf.optional(f.tf.int32()));
            let lhs = f.b.identifier("i", i);
            let rhs = f.b.identifier("o", o);
            let eq = f.b.infix(InfixOp::Eq, lhs, rhs);
            let root = f.b.expr_stmt(eq);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let NodeKind::Infix {
                lhs: promoted_lhs,
                rhs: kept_rhs,
                ..
            } = typed_context.arena().kind(eq)
            else {
                panic!("expected an infix");
            };
            let tf = typed_context.types();
            assert_eq!(*kept_rhs, rhs);
            assert_eq!(
                cast_of(&typed_context, *promoted_lhs),
                Some((tf.optional(tf.int32()), lhs))
            );
            assert_eq!(typed_context.node_type(eq), Some(tf.boolean()));
        }

        #[test]
        fn test_assignment_into_optional_variable() {
            let mut f = Fixture::new();
            let o = f.variable("o", f.tf.optional(f.tf.rstring()));
            let target = f.b.identifier("o", o);
            let value = f.b.string("x");
            let assign = f.b.infix(InfixOp::Assign, target, value);
            let root = f.b.expr_stmt(assign);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let NodeKind::Infix { rhs, .. } = typed_context.arena().kind(assign) else {
                panic!("expected an infix");
            };
            let tf = typed_context.types();
            assert_eq!(
                cast_of(&typed_context, *rhs),
                Some((tf.optional(tf.rstring()), value))
            );
        }
    }

    #[test]
    fn test_checked_tree_has_no_stray_nulls() {
        let mut f = Fixture::new();
        let null = f.b.null();
        let first = f.declare("a", f.tf.optional(f.tf.int32()), null);
        let one = f.b.int("1");
        let other = f.b.null();
        let list = f.b.list(vec![one, other]);
        let second = f.declare("b", f.tf.list(f.tf.optional(f.tf.int32())), list);
        let root = f.b.block(vec![first, second]);

        let typed_context = f.type_check(root).expect("Type checking should succeed");
        let stray = typed_context.filter_nodes(|node| {
            matches!(node.kind, NodeKind::NullLiteral) && node.ty.as_ref().is_some_and(|ty| ty.is_null())
        });
        assert!(stray.is_empty(), "nulls without an optional type: {stray:?}");
    }
}
