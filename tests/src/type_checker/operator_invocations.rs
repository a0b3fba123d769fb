//! Operator invocation tests
//!
//! Ports, output assignments, parameter actuals, config items and annotations of primitive and
//! composite invocations.

#[cfg(test)]
mod operator_invocation_tests {
    use crate::utils::{Fixture, cast_of};
    use streamc_ast::{
        builder::{CompositeParts, OpInvokeParts},
        nodes::{FunctionId, NodeId, NodeKind, OnClauseKind, OperatorId, SymbolId},
    };
    use streamc_type_checker::{
        operator_model::{CompositeOperator, ExpressionMode, OperatorModel, PrimitiveOperator},
        symbol_table::{FunctionSignature, SymbolKind},
    };
    use streamc_types::Type;

    /// `tuple<int32 a,rstring b>`
    fn schema(f: &Fixture) -> Type {
        f.tf.tuple(vec![
            ("a".to_string(), f.tf.int32()),
            ("b".to_string(), f.tf.rstring()),
        ])
    }

    fn functor(f: &mut Fixture) -> OperatorId {
        let model = PrimitiveOperator::new("Functor")
            .with_parameter("filter", f.tf.boolean(), 1)
            .with_parameter("labels", f.tf.rstring(), -1)
            .with_output_port(false);
        f.symbols.add_operator(OperatorModel::Primitive(model))
    }

    fn attribute(f: &mut Fixture, name: &str) -> NodeId {
        let symbol = f.symbols.add_symbol(name, SymbolKind::Attribute, f.tf.unknown());
        f.b.identifier(name, symbol)
    }

    fn single_output(f: &mut Fixture, stream: SymbolId, assignments: Vec<(NodeId, NodeId)>) -> NodeId {
        let port = f.b.op_invoke_output(stream, assignments);
        f.b.output_clause(vec![port])
    }

    mod ports {
        use super::*;

        #[test]
        fn test_stream_type_must_match_declared_port_type() {
            let mut f = Fixture::new();
            let input = f.stream("In", schema(&f));
            let operator = functor(&mut f);
            let stream = f.b.at(3, 10).identifier("In", input);
            let declared = f.tf.tuple(vec![("x".to_string(), f.tf.float64())]);
            let port = f.b.port_inputs(vec![stream], Some(declared));
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    inputs: vec![port],
                    ..OpInvokeParts::default()
                },
            );

            let error = f.type_check(root).expect_err("schemas differ");
            assert_eq!(
                error.to_string(),
                "3:10: stream of type `tuple<int32 a,rstring b>` on port `In` does not match the declared type `tuple<float64 x>`"
            );
        }

        #[test]
        fn test_streams_on_one_port_share_a_type() {
            let mut f = Fixture::new();
            let first = f.stream("A", schema(&f));
            let other = f.tf.tuple(vec![("x".to_string(), f.tf.float64())]);
            let second = f.stream("B", other);
            let operator = functor(&mut f);
            let a = f.b.identifier("A", first);
            let b = f.b.at(2, 14).identifier("B", second);
            let port = f.b.port_inputs(vec![a, b], None);
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    inputs: vec![port],
                    ..OpInvokeParts::default()
                },
            );

            let error = f.type_check(root).expect_err("A and B differ");
            assert_eq!(
                error.to_string(),
                "2:14: streams on port `A` must all have type `tuple<int32 a,rstring b>`"
            );
        }
    }

    mod outputs {
        use super::*;

        #[test]
        fn test_output_assignments_are_checked_against_the_stream() {
            let mut f = Fixture::new();
            let output = f.stream("Out", schema(&f));
            let operator = functor(&mut f);
            let a = attribute(&mut f, "a");
            let one = f.b.int("1");
            let b = attribute(&mut f, "b");
            let text = f.b.string("x");
            let clause = single_output(&mut f, output, vec![(a, one), (b, text)]);
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    outputs: vec![output],
                    output: Some(clause),
                    ..OpInvokeParts::default()
                },
            );

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let tf = typed_context.types();
            assert_eq!(typed_context.node_type(a), Some(tf.int32()));
            assert_eq!(typed_context.node_type(b), Some(tf.rstring()));
        }

        #[test]
        fn test_duplicate_and_unknown_attributes() {
            let mut f = Fixture::new();
            let output = f.stream("Out", schema(&f));
            let operator = functor(&mut f);
            let first = attribute(&mut f, "a");
            let one = f.b.int("1");
            f.b.at(4, 7);
            let second = attribute(&mut f, "a");
            let two = f.b.int("2");
            let missing = f.b.at(4, 15).unresolved("c");
            let three = f.b.int("3");
            let clause = single_output(&mut f, output, vec![(first, one), (second, two), (missing, three)]);
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    outputs: vec![output],
                    output: Some(clause),
                    ..OpInvokeParts::default()
                },
            );

            let error = f.type_check(root).expect_err("a twice and c unknown");
            assert_eq!(
                error.to_string(),
                "4:7: attribute `a` is assigned more than once; 4:15: `c` is not an attribute of `Out`"
            );
        }

        #[test]
        fn test_output_value_is_promoted_to_attribute_type() {
            let mut f = Fixture::new();
            let tuple = f
                .tf
                .tuple(vec![("o".to_string(), f.tf.optional(f.tf.int32()))]);
            let output = f.stream("Out", tuple);
            let operator = functor(&mut f);
            let o = attribute(&mut f, "o");
            let one = f.b.int("1");
            let port = f.b.op_invoke_output(output, vec![(o, one)]);
            let clause = f.b.output_clause(vec![port]);
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    outputs: vec![output],
                    output: Some(clause),
                    ..OpInvokeParts::default()
                },
            );

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let NodeKind::OpInvokeOutput { assignments, .. } = typed_context.arena().kind(port) else {
                panic!("expected an output port");
            };
            let NodeKind::Infix { rhs, .. } = typed_context.arena().kind(assignments[0]) else {
                panic!("expected an assignment");
            };
            let tf = typed_context.types();
            assert_eq!(
                cast_of(&typed_context, *rhs),
                Some((tf.optional(tf.int32()), one))
            );
        }

        fn nested_output_function(allow_nesting: bool) -> anyhow::Result<()> {
            let mut f = Fixture::new();
            let output = f.stream("Out", schema(&f));
            let model = PrimitiveOperator::new("Aggregate").with_output_port(allow_nesting);
            let operator = f.symbols.add_operator(OperatorModel::Primitive(model));
            let max = f.symbols.add_function(
                FunctionSignature::new("Max", vec![f.tf.int32()], f.tf.int32()).output_function(),
            );
            let abs = f
                .symbols
                .add_function(FunctionSignature::new("abs", vec![f.tf.int32()], f.tf.int32()));
            let source = f.symbols.add_symbol("a", SymbolKind::Attribute, f.tf.int32());
            let target = attribute(&mut f, "a");
            let arg = f.b.identifier("a", source);
            let inner = f.b.at(6, 13).call("Max", max, vec![arg]);
            let outer = f.b.call("abs", abs, vec![inner]);
            let clause = single_output(&mut f, output, vec![(target, outer)]);
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    outputs: vec![output],
                    output: Some(clause),
                    ..OpInvokeParts::default()
                },
            );
            f.type_check(root).map(|_| ())
        }

        #[test]
        fn test_nested_custom_output_function() {
            let error = nested_output_function(false).expect_err("Max is nested under abs");
            assert_eq!(
                error.to_string(),
                "6:13: custom output function `Max` cannot be nested inside another expression"
            );
        }

        #[test]
        fn test_nested_custom_output_function_allowed_by_port() {
            assert!(nested_output_function(true).is_ok());
        }
    }

    mod actuals {
        use super::*;

        fn invoke_with_actual(f: &mut Fixture, actual: NodeId) -> NodeId {
            let operator = functor(f);
            f.b.op_invoke(
                operator,
                OpInvokeParts {
                    actuals: vec![actual],
                    ..OpInvokeParts::default()
                },
            )
        }

        #[test]
        fn test_parameter_cardinality() {
            let mut f = Fixture::new();
            let yes = f.b.boolean(true);
            let no = f.b.boolean(false);
            let actual = f.b.at(9, 5).op_actual("filter", vec![yes, no]);
            let root = invoke_with_actual(&mut f, actual);

            let error = f.type_check(root).expect_err("filter takes one value");
            assert_eq!(
                error.to_string(),
                "9:5: parameter `filter` expects 1 value(s), found 2"
            );
        }

        #[test]
        fn test_parameter_without_cardinality_takes_any_count() {
            let mut f = Fixture::new();
            let values = ["x", "y", "z"].map(|value| f.b.string(value)).to_vec();
            let actual = f.b.op_actual("labels", values);
            let root = invoke_with_actual(&mut f, actual);

            assert!(f.type_check(root).is_ok());
        }

        #[test]
        fn test_parameter_type_mismatch() {
            let mut f = Fixture::new();
            let one = f.b.at(9, 14).int("1");
            let actual = f.b.op_actual("filter", vec![one]);
            let root = invoke_with_actual(&mut f, actual);

            let error = f.type_check(root).expect_err("filter is boolean");
            assert_eq!(
                error.to_string(),
                "9:14: parameter `filter` expects `boolean`, found `int32`"
            );
        }

        #[test]
        fn test_primitive_actual_must_denote_a_value() {
            let mut f = Fixture::new();
            let stream = f.stream("In", schema(&f));
            let value = f.b.at(2, 20).identifier("In", stream);
            let actual = f.b.op_actual("filter", vec![value]);
            let root = invoke_with_actual(&mut f, actual);

            let error = f.type_check(root).expect_err("a stream is not a value");
            assert_eq!(
                error.to_string(),
                "2:20: actual of primitive operator parameter `filter` must denote a value"
            );
        }
    }

    mod composites {
        use super::*;
        use rustc_hash::FxHashMap;

        /// `Comp($size)` with one input and one output port; `$size` is an expression formal
        /// of type `ty`.
        fn composite(f: &mut Fixture, ty: Type) -> (OperatorId, SymbolId) {
            let size = f.symbols.add_symbol(
                "$size",
                SymbolKind::CompositeFormal {
                    mode: ExpressionMode::Expression,
                },
                ty,
            );
            let mut formals = FxHashMap::default();
            formals.insert("size".to_string(), size);
            let model = CompositeOperator {
                name: "Comp".to_string(),
                formals,
                input_ports: 1,
                output_ports: 1,
            };
            (f.symbols.add_operator(OperatorModel::Composite(model)), size)
        }

        #[test]
        fn test_port_counts_must_match() {
            let mut f = Fixture::new();
            let output = f.stream("Out", schema(&f));
            let int32 = f.tf.int32();
            let (operator, _) = composite(&mut f, int32);
            let root = f.b.at(1, 1).op_invoke(
                operator,
                OpInvokeParts {
                    outputs: vec![output],
                    ..OpInvokeParts::default()
                },
            );

            let error = f.type_check(root).expect_err("no input stream");
            assert_eq!(
                error.to_string(),
                "1:1: operator `Comp` declares 1 input ports, but 0 are used"
            );
        }

        #[test]
        fn test_composite_invocation_rejects_logic() {
            let mut f = Fixture::new();
            let input = f.stream("In", schema(&f));
            let output = f.stream("Out", schema(&f));
            let int32 = f.tf.int32();
            let (operator, _) = composite(&mut f, int32);
            let stream = f.b.identifier("In", input);
            let port = f.b.port_inputs(vec![stream], None);
            let body = f.b.block(vec![]);
            let clause = f.b.on_clause(OnClauseKind::Tuple, body);
            let logic = f.b.at(3, 5).logic(vec![], vec![clause]);
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    outputs: vec![output],
                    inputs: vec![port],
                    logic: Some(logic),
                    ..OpInvokeParts::default()
                },
            );

            let error = f.type_check(root).expect_err("composites have no logic");
            assert_eq!(
                error.to_string(),
                "3:5: composite operator invocations cannot have a `logic` clause"
            );
        }

        fn invoke_with_actual(f: &mut Fixture, ty: Type, value: NodeId) -> (NodeId, NodeId) {
            let input = f.stream("In", schema(f));
            let output = f.stream("Out", schema(f));
            let (operator, _) = composite(f, ty);
            let stream = f.b.identifier("In", input);
            let port = f.b.port_inputs(vec![stream], None);
            let actual = f.b.op_actual("size", vec![value]);
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    outputs: vec![output],
                    inputs: vec![port],
                    actuals: vec![actual],
                    ..OpInvokeParts::default()
                },
            );
            (root, actual)
        }

        #[test]
        fn test_expression_mode_violation() {
            let mut f = Fixture::new();
            let other = f.stream("Other", schema(&f));
            let value = f.b.at(5, 22).identifier("Other", other);
            let int32 = f.tf.int32();
            let (root, _) = invoke_with_actual(&mut f, int32, value);

            let error = f.type_check(root).expect_err("a stream is not an expression");
            assert_eq!(
                error.to_string(),
                "5:22: actual of composite parameter `size` must be of expression mode"
            );
        }

        #[test]
        fn test_expression_actual_is_promoted_to_formal_type() {
            let mut f = Fixture::new();
            let value = f.b.int("8");
            let optional = f.tf.optional(f.tf.int32());
            let (root, actual) = invoke_with_actual(&mut f, optional, value);

            let typed_context = f.type_check(root).expect("Type checking should succeed");
            let NodeKind::OpActual { values, .. } = typed_context.arena().kind(actual) else {
                panic!("expected an actual");
            };
            let tf = typed_context.types();
            assert_eq!(
                cast_of(&typed_context, values[0]),
                Some((tf.optional(tf.int32()), value))
            );
        }

        #[test]
        fn test_formal_default_cannot_refer_to_other_formal() {
            let mut f = Fixture::new();
            let int32 = f.tf.int32();
            let (operator, size) = composite(&mut f, int32);
            let width = f.symbols.add_symbol(
                "$width",
                SymbolKind::CompositeFormal {
                    mode: ExpressionMode::Expression,
                },
                f.tf.int32(),
            );
            let reference = f.b.at(2, 17).identifier("$width", width);
            let size_formal = f.b.composite_formal(size, vec![reference]);
            let width_formal = f.b.composite_formal(width, vec![]);
            let root = f.b.composite_def(
                operator,
                CompositeParts {
                    formals: vec![size_formal, width_formal],
                    ..CompositeParts::default()
                },
            );

            let error = f.type_check(root).expect_err("$size defaults to $width");
            assert_eq!(
                error.to_string(),
                "2:17: default of composite parameter `$size` cannot refer to composite parameter `$width`"
            );
        }

        #[test]
        fn test_conflicting_submission_time_defaults() {
            let mut f = Fixture::new();
            let int32 = f.tf.int32();
            let (composite_id, _) = composite(&mut f, int32);
            let model = PrimitiveOperator::new("Beacon")
                .with_parameter("p", f.tf.rstring(), 1)
                .with_parameter("q", f.tf.rstring(), 1);
            let beacon = f.symbols.add_operator(OperatorModel::Primitive(model));
            let lookup = f.symbols.add_function(FunctionSignature::new(
                "getSubmissionTimeValue",
                vec![f.tf.rstring(), f.tf.rstring()],
                f.tf.rstring(),
            ));

            let (k1, d1) = (f.b.string("name"), f.b.string("a"));
            let first = f.b.at(3, 9).call("getSubmissionTimeValue", lookup, vec![k1, d1]);
            let (k2, d2) = (f.b.string("name"), f.b.string("b"));
            let second = f.b.at(4, 9).call("getSubmissionTimeValue", lookup, vec![k2, d2]);
            let p = f.b.op_actual("p", vec![first]);
            let q = f.b.op_actual("q", vec![second]);
            let invocation = f.b.op_invoke(
                beacon,
                OpInvokeParts {
                    actuals: vec![p, q],
                    ..OpInvokeParts::default()
                },
            );
            let root = f.b.composite_def(
                composite_id,
                CompositeParts {
                    graph: vec![invocation],
                    ..CompositeParts::default()
                },
            );

            let error = f.type_check(root).expect_err("two defaults for `name`");
            assert_eq!(
                error.to_string(),
                "4:9: submission time value `name` has conflicting default values"
            );
        }
    }

    mod logic {
        use super::*;

        #[test]
        fn test_return_value_in_logic_clause() {
            let mut f = Fixture::new();
            let operator = functor(&mut f);
            let one = f.b.int("1");
            let ret = f.b.at(7, 9).return_stmt(Some(one));
            let body = f.b.block(vec![ret]);
            let clause = f.b.on_clause(OnClauseKind::Tuple, body);
            let logic = f.b.logic(vec![], vec![clause]);
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    logic: Some(logic),
                    ..OpInvokeParts::default()
                },
            );

            let error = f.type_check(root).expect_err("logic returns carry no value");
            assert_eq!(
                error.to_string(),
                "7:9: `return` in an operator logic clause cannot carry a value"
            );
        }

        #[test]
        fn test_submitted_tuple_must_match_port() {
            let mut f = Fixture::new();
            let output = f.stream("Out", schema(&f));
            let operator = functor(&mut f);
            let other = f.tf.tuple(vec![("x".to_string(), f.tf.float64())]);
            let value = f.variable("t", other);
            let submit = f.symbols.add_function(FunctionSignature::new(
                "submit",
                vec![f.tf.unknown(), f.tf.unknown()],
                f.tf.void(),
            ));
            let tuple = f.b.at(8, 20).identifier("t", value);
            let port = f.b.identifier("Out", output);
            let call = f.b.call("submit", submit, vec![tuple, port]);
            let stmt = f.b.expr_stmt(call);
            let body = f.b.block(vec![stmt]);
            let clause = f.b.on_clause(OnClauseKind::Tuple, body);
            let logic = f.b.logic(vec![], vec![clause]);
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    outputs: vec![output],
                    logic: Some(logic),
                    ..OpInvokeParts::default()
                },
            );

            let error = f.type_check(root).expect_err("wrong tuple type");
            assert_eq!(
                error.to_string(),
                "8:20: submitted tuple `tuple<float64 x>` does not match the type `tuple<int32 a,rstring b>` of the port"
            );
        }
    }

    mod config {
        use super::*;

        fn queue(f: &mut Fixture) -> FunctionId {
            f.symbols.add_function(FunctionSignature::new(
                "queue",
                vec![f.tf.unknown()],
                f.tf.void(),
            ))
        }

        #[test]
        fn test_threaded_port_names_an_input_stream() {
            let mut f = Fixture::new();
            let input = f.stream("In", schema(&f));
            let elsewhere = f.stream("Elsewhere", schema(&f));
            let operator = functor(&mut f);
            let queue = queue(&mut f);
            let stream = f.b.identifier("In", input);
            let port = f.b.port_inputs(vec![stream], None);
            let good_port = f.b.identifier("In", input);
            let good = f.b.call("queue", queue, vec![good_port]);
            let bad_port = f.b.at(11, 30).identifier("Elsewhere", elsewhere);
            let bad = f.b.call("queue", queue, vec![bad_port]);
            let item = f.b.config_item("threadedPort", vec![good, bad]);
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    inputs: vec![port],
                    config: vec![item],
                    ..OpInvokeParts::default()
                },
            );

            let error = f.type_check(root).expect_err("Elsewhere is not an input");
            assert_eq!(
                error.to_string(),
                "11:30: `Elsewhere` in `threadedPort` is not an input stream of this invocation"
            );
        }

        #[test]
        fn test_threaded_port_requires_primitive_operator() {
            let mut f = Fixture::new();
            let model = CompositeOperator {
                name: "Comp".to_string(),
                ..CompositeOperator::default()
            };
            let operator = f.symbols.add_operator(OperatorModel::Composite(model));
            let item = f.b.at(12, 3).config_item("threadedPort", vec![]);
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    config: vec![item],
                    ..OpInvokeParts::default()
                },
            );

            let error = f.type_check(root).expect_err("composites cannot be threaded");
            assert_eq!(
                error.to_string(),
                "12:3: `threadedPort` is only valid on primitive operator invocations"
            );
        }

        #[test]
        fn test_default_pool_size() {
            let mut f = Fixture::new();
            let operator = functor(&mut f);
            let size = f.b.at(13, 21).string("four");
            let item = f.b.config_item("defaultPoolSize", vec![size]);
            let one = f.b.int("1");
            let two = f.b.int("2");
            let pair = f.b.at(14, 3).config_item("defaultPoolSize", vec![one, two]);
            let root = f.b.op_invoke(
                operator,
                OpInvokeParts {
                    config: vec![item, pair],
                    ..OpInvokeParts::default()
                },
            );

            let error = f.type_check(root).expect_err("both items are wrong");
            assert_eq!(
                error.to_string(),
                "13:21: `defaultPoolSize` must be integral, found `rstring`; 14:3: `defaultPoolSize` takes exactly one expression, found 2"
            );
        }
    }

    mod annotations {
        use super::*;

        fn annotated(f: &mut Fixture, annotation: NodeId) -> NodeId {
            let operator = functor(f);
            f.b.op_invoke(
                operator,
                OpInvokeParts {
                    annotations: vec![annotation],
                    ..OpInvokeParts::default()
                },
            )
        }

        #[test]
        fn test_parallel_width_must_be_int32() {
            let mut f = Fixture::new();
            let width = f.b.at(1, 18).string("4");
            let annotation = f.b.annotation("parallel", vec![("width", width)]);
            let root = annotated(&mut f, annotation);

            let error = f.type_check(root).expect_err("width is a string");
            assert_eq!(
                error.to_string(),
                "1:18: `width` of `@parallel` must have type `int32`, found `rstring`"
            );
        }

        #[test]
        fn test_well_typed_annotation() {
            let mut f = Fixture::new();
            let width = f.b.int("4");
            let host = f.b.string("h1");
            let tags = f.b.list(vec![host]);
            let annotation = f.b.annotation(
                "parallel",
                vec![("width", width), ("replicateHostTags", tags)],
            );
            let root = annotated(&mut f, annotation);

            assert!(f.type_check(root).is_ok());
        }

        #[test]
        fn test_view_attributes_cannot_hold_tuples() {
            let mut f = Fixture::new();
            let one = f.b.int("1");
            let tuple = f.b.tuple(vec![("a", one)]);
            let attributes = f.b.at(2, 25).list(vec![tuple]);
            let annotation = f.b.annotation("view", vec![("attributes", attributes)]);
            let root = annotated(&mut f, annotation);

            let error = f.type_check(root).expect_err("tuples are not attribute names");
            assert_eq!(
                error.to_string(),
                "2:25: invalid value for `attributes` of `@view`"
            );
        }
    }
}
