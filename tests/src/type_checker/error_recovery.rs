//! Error recovery tests
//!
//! The finder keeps going after an error: a failing expression is typed `unknown`, which every
//! later check accepts, so each mistake is reported once and unrelated mistakes in the same unit
//! are all reported by one run.

#[cfg(test)]
mod error_recovery_tests {
    use crate::utils::Fixture;
    use streamc_ast::nodes::InfixOp;

    mod multiple_errors {
        use super::*;

        #[test]
        fn test_unrelated_errors_are_joined_in_report_order() {
            let mut f = Fixture::new();
            let brk = f.b.at(1, 1).break_stmt();
            let cont = f.b.at(2, 1).continue_stmt();
            let root = f.b.block(vec![brk, cont]);

            let error = f.type_check(root).expect_err("both statements are misplaced");
            assert_eq!(
                error.to_string(),
                "1:1: `break` outside of a loop; 2:1: `continue` outside of a loop"
            );
        }

        #[test]
        fn test_failed_operand_is_reported_once() {
            let mut f = Fixture::new();
            let s = f.b.at(1, 2).string("a");
            let one = f.b.int("1");
            let bad = f.b.infix(InfixOp::Plus, s, one);
            let two = f.b.int("2");
            let product = f.b.infix(InfixOp::Star, bad, two);
            let three = f.b.int("3");
            let compared = f.b.infix(InfixOp::Less, product, three);
            let root = f.b.expr_stmt(compared);

            let error = f.type_check(root).expect_err("the inner sum is invalid");
            let message = error.to_string();
            assert!(!message.contains("; "), "only one error expected: {message}");
            assert!(message.contains("`+`"), "{message}");
        }

        #[test]
        fn test_errors_in_separate_functions() {
            use streamc_type_checker::symbol_table::FunctionSignature;

            let mut f = Fixture::new();
            let first = f
                .symbols
                .add_function(FunctionSignature::new("first", vec![], f.tf.int32()));
            let second = f
                .symbols
                .add_function(FunctionSignature::new("second", vec![], f.tf.rstring()));
            let empty = f.b.block(vec![]);
            let def1 = f.b.at(1, 1).function_def(first, empty);
            let value = f.b.int("1");
            let ret = f.b.at(5, 3).return_stmt(Some(value));
            let body = f.b.block(vec![ret]);
            let def2 = f.b.at(4, 1).function_def(second, body);
            let root = f.b.compilation_unit(vec![def1, def2]);

            let error = f.type_check(root).expect_err("both functions are wrong");
            let messages: Vec<String> = error.to_string().split("; ").map(String::from).collect();
            assert_eq!(messages.len(), 2, "{messages:?}");
            assert_eq!(
                messages[0],
                "1:1: function `first` does not end with a `return` on every path"
            );
            assert!(messages[1].starts_with("5:3: returning `int32`"), "{messages:?}");
        }
    }

    mod initializers {
        use super::*;

        #[test]
        fn test_narrowing_initializer_is_rejected() {
            let mut f = Fixture::new();
            let value = f.b.at(1, 1).float("3.0");
            let decl = f.declare("x", f.tf.int32(), value);

            let error = f.type_check(decl).expect_err("float64 does not narrow to int32");
            assert_eq!(
                error.to_string(),
                "1:1: cannot initialize a variable of type `int32` with a value of type `float64`"
            );
        }

        #[test]
        fn test_widening_initializer_is_accepted() {
            use streamc_types::MetaType;

            let mut f = Fixture::new();
            let value = f.b.int("3");
            let decl = f.declare("x", f.tf.primitive(MetaType::Int64), value);

            assert!(f.type_check(decl).is_ok());
        }
    }

    mod both_passes {
        use super::*;

        #[test]
        fn test_finder_and_promoter_errors_are_reported_together() {
            let mut f = Fixture::new();
            let text = f.b.at(1, 1).string("a");
            let one = f.b.at(1, 7).int("1");
            let difference = f.b.infix(InfixOp::Minus, text, one);
            let first = f.b.expr_stmt(difference);
            let null = f.b.at(2, 1).null();
            let second = f.b.expr_stmt(null);
            let root = f.b.block(vec![first, second]);

            let error = f.type_check(root).expect_err("both statements are wrong");
            let messages: Vec<String> = error.to_string().split("; ").map(String::from).collect();
            assert_eq!(messages.len(), 2, "{messages:?}");
            assert!(messages[0].starts_with("1:7: operator `-`"), "{messages:?}");
            assert_eq!(
                messages[1],
                "2:1: `null` without a type must be cast to an optional type"
            );
        }

        #[test]
        fn test_promoter_errors_fail_the_check() {
            let mut f = Fixture::new();
            let null = f.b.at(7, 4).null();
            let root = f.b.expr_stmt(null);

            let error = f.type_check(root).expect_err("a bare `null` has no type");
            assert_eq!(
                error.to_string(),
                "7:4: `null` without a type must be cast to an optional type"
            );
        }
    }

    mod details {
        use super::*;
        use streamc_type_checker::symbol_table::FunctionSignature;

        #[test]
        fn test_detail_lines_are_not_part_of_the_failure() {
            let mut f = Fixture::new();
            let x = f.variable("x", f.tf.int32());
            let modified = f.b.at(1, 1).identifier("x", x);
            let increment = f
                .b
                .postfix(streamc_ast::nodes::PostfixOp::Decrement, modified);
            let used = f.b.at(1, 7).identifier("x", x);
            let product = f.b.infix(InfixOp::Star, increment, used);
            let root = f.b.expr_stmt(product);

            let error = f.type_check(root).expect_err("x is modified and read");
            assert!(!error.to_string().contains("other use"), "{error}");
        }

        #[test]
        fn test_two_stateful_calls() {
            let mut f = Fixture::new();
            let random = f.symbols.add_function(
                FunctionSignature::new("random", vec![], f.tf.float64()).stateful(),
            );
            let first = f.b.at(1, 1).call("random", random, vec![]);
            let second = f.b.at(1, 12).call("random", random, vec![]);
            let sum = f.b.infix(InfixOp::Plus, first, second);
            let root = f.b.expr_stmt(sum);

            let error = f.type_check(root).expect_err("two stateful calls");
            assert_eq!(
                error.to_string(),
                "1:12: stateful functions `random` and `random` are called in the same expression"
            );
        }
    }
}
