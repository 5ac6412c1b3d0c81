#[cfg(test)]
mod parser_tests {
    use rox as lox;

    use lox::ast::{Expr, LiteralValue, Stmt};
    use lox::error::Diagnostics;
    use lox::parser::Parser;
    use lox::scanner::Scanner;
    use lox::token::TokenType;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Result<Vec<Stmt>, Diagnostics> {
        let (tokens, diagnostics) = Scanner::new(source).scan_tokens();
        assert!(diagnostics.is_empty(), "unexpected lex errors: {}", diagnostics);
        Parser::new(&tokens).parse()
    }

    fn parse_ok(source: &str) -> Vec<Stmt> {
        match parse(source) {
            Ok(statements) => statements,
            Err(diagnostics) => panic!("unexpected parse errors:\n{}", diagnostics),
        }
    }

    fn parse_err(source: &str) -> Vec<String> {
        match parse(source) {
            Ok(_) => panic!("expected parse errors for {:?}", source),
            Err(diagnostics) => diagnostics.iter().map(|e| e.to_string()).collect(),
        }
    }

    fn single_expression(source: &str) -> Expr {
        match parse_ok(source).into_iter().next() {
            Some(Stmt::Expression(expr)) => expr,
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    fn operator_of(expr: &Expr) -> TokenType {
        match expr {
            Expr::Binary { operator, .. } => operator.token_type.clone(),
            other => panic!("expected a binary expression, got {:?}", other),
        }
    }

    #[test]
    fn subtraction_is_left_associative() {
        let expr = single_expression("1 - 2 - 3;");

        let Expr::Binary { left, right, .. } = &expr else {
            panic!("expected binary, got {:?}", expr);
        };

        assert_eq!(operator_of(&expr), TokenType::MINUS);
        assert_eq!(operator_of(left), TokenType::MINUS);
        assert!(matches!(
            right.as_ref(),
            Expr::Literal(LiteralValue::Number(n)) if *n == 3.0
        ));
    }

    #[test]
    fn assignment_is_right_associative() {
        let expr = single_expression("a = b = 3;");

        let Expr::Binary { left, right, .. } = &expr else {
            panic!("expected binary, got {:?}", expr);
        };

        assert_eq!(operator_of(&expr), TokenType::EQUAL);
        assert!(matches!(left.as_ref(), Expr::Variable { name, .. } if name.lexeme == "a"));
        assert_eq!(operator_of(right), TokenType::EQUAL);
    }

    #[test]
    fn factor_binds_tighter_than_term_and_comparison() {
        let expr = single_expression("1 + 2 * 3 < 4 == true or false and nil;");

        // or ( == ( < ( + (1, * (2, 3)), 4), true), and(false, nil))
        let Expr::Binary { left, right, .. } = &expr else {
            panic!("expected binary, got {:?}", expr);
        };
        assert_eq!(operator_of(&expr), TokenType::OR);
        assert_eq!(operator_of(right), TokenType::AND);
        assert_eq!(operator_of(left), TokenType::EQUAL_EQUAL);

        let Expr::Binary { left: less, .. } = left.as_ref() else {
            unreachable!()
        };
        assert_eq!(operator_of(less), TokenType::LESS);

        let Expr::Binary { left: plus, .. } = less.as_ref() else {
            unreachable!()
        };
        assert_eq!(operator_of(plus), TokenType::PLUS);

        let Expr::Binary { right: star, .. } = plus.as_ref() else {
            unreachable!()
        };
        assert_eq!(operator_of(star), TokenType::STAR);
    }

    #[test]
    fn call_chains_and_property_access() {
        let expr = single_expression("f(1)(2).field.method(a, b);");

        let Expr::Call {
            callee, arguments, ..
        } = &expr
        else {
            panic!("expected call, got {:?}", expr);
        };
        assert_eq!(arguments.len(), 2);

        let Expr::Get { object, name } = callee.as_ref() else {
            panic!("expected get, got {:?}", callee);
        };
        assert_eq!(name.lexeme, "method");
        assert!(matches!(object.as_ref(), Expr::Get { name, .. } if name.lexeme == "field"));
    }

    #[test]
    fn assignment_to_property_becomes_set() {
        let expr = single_expression("a.b.c = 1;");

        let Expr::Set { object, name, .. } = &expr else {
            panic!("expected set, got {:?}", expr);
        };
        assert_eq!(name.lexeme, "c");
        assert!(matches!(object.as_ref(), Expr::Get { name, .. } if name.lexeme == "b"));
    }

    #[test]
    fn invalid_assignment_target_is_reported_at_equals() {
        let errors = parse_err("a + b = c;\nprint 1;");

        assert_eq!(
            errors,
            vec!["[line 1] Error at '=': Invalid assignment target.".to_string()]
        );
    }

    #[test]
    fn two_malformed_statements_give_exactly_two_errors() {
        let errors = parse_err("var = 1;\nprint ;\nprint 2;");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at '=': Expected variable name.".to_string(),
                "[line 2] Error at ';': Expected expression.".to_string(),
            ]
        );
    }

    #[test]
    fn missing_semicolon_at_end_of_input() {
        let errors = parse_err("print 1");

        assert_eq!(
            errors,
            vec!["[line 1] Error at end: Expected ';' after value.".to_string()]
        );
    }

    #[test]
    fn too_many_arguments_is_reported_without_aborting() {
        let errors = parse_err("f(1, 2, 3, 4, 5, 6, 7, 8, 9);\nfun g(a, b, c, d, e, f, g, h, i) {}");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at ')': Can't have more than 8 arguments.".to_string(),
                "[line 2] Error at ')': Can't have more than 8 parameters.".to_string(),
            ]
        );
    }

    #[test]
    fn for_loop_desugars_into_while() {
        let statements = parse_ok("for (var i = 0; i < 3; i = i + 1) print i;");
        assert_eq!(statements.len(), 1);

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected outer block, got {:?}", statements[0]);
        };
        assert_eq!(outer.len(), 2);
        assert!(matches!(&outer[0], Stmt::Var { name, .. } if name.lexeme == "i"));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while, got {:?}", outer[1]);
        };
        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected inner block, got {:?}", body);
        };
        assert!(matches!(inner[0], Stmt::Print(_)));
        assert!(matches!(inner[1], Stmt::Expression(_)));
    }

    #[test]
    fn empty_for_clauses_loop_forever_on_true() {
        let statements = parse_ok("for (;;) {}");

        assert!(matches!(
            &statements[0],
            Stmt::While {
                condition: Expr::Literal(LiteralValue::Bool(true)),
                ..
            }
        ));
    }

    #[test]
    fn class_with_superclass_and_methods() {
        let statements = parse_ok("class B < A { init(x) { this.x = x; } get() { return super.get(); } }");

        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &statements[0]
        else {
            panic!("expected class, got {:?}", statements[0]);
        };

        assert_eq!(name.lexeme, "B");
        assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));

        let names: Vec<&str> = methods.iter().map(|m| m.name.lexeme.as_str()).collect();
        assert_eq!(names, vec!["init", "get"]);
        assert_eq!(methods[0].params.len(), 1);
    }

    #[test]
    fn super_requires_a_method_name() {
        let errors = parse_err("super;");

        assert_eq!(
            errors,
            vec!["[line 1] Error at ';': Expected '.' after 'super'.".to_string()]
        );
    }

    #[test]
    fn parse_expression_rejects_trailing_tokens() {
        let (tokens, _) = Scanner::new("1 + 2 3").scan_tokens();
        let diagnostics = Parser::new(&tokens).parse_expression().unwrap_err();

        assert_eq!(
            diagnostics.to_string(),
            "[line 1] Error at '3': Expected end of expression."
        );
    }

    #[test]
    fn identical_references_get_distinct_ids() {
        let expr = single_expression("a + a;");

        let Expr::Binary { left, right, .. } = &expr else {
            panic!("expected binary, got {:?}", expr);
        };

        match (left.as_ref(), right.as_ref()) {
            (Expr::Variable { id: first, .. }, Expr::Variable { id: second, .. }) => {
                assert_ne!(first, second)
            }
            other => panic!("expected two variables, got {:?}", other),
        }
    }
}
