#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use rox as lox;

    use lox::error::{LoxError, RunError};
    use lox::session::Session;
    use lox::value::Value;
    use pretty_assertions::assert_eq;

    /// Cloneable in-memory sink so a test can read what `print` wrote.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.borrow())
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    fn session() -> (Session, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Session::with_output(Box::new(buffer.clone())), buffer)
    }

    /// Run a program that must succeed and return its printed lines.
    fn run(source: &str) -> Vec<String> {
        let (mut session, buffer) = session();

        if let Err(e) = session.run(source) {
            panic!("program failed: {}\noutput so far: {:?}", e, buffer.lines());
        }

        buffer.lines()
    }

    /// Run a program that must fail at runtime; returns output and the error text.
    fn run_runtime_error(source: &str) -> (Vec<String>, String) {
        let (mut session, buffer) = session();

        match session.run(source) {
            Err(RunError::Runtime(e)) => (buffer.lines(), e.to_string()),
            Err(other) => panic!("expected a runtime error, got: {}", other),
            Ok(()) => panic!("expected a runtime error, program succeeded"),
        }
    }

    fn evaluate(source: &str) -> Value {
        let (mut session, _) = session();

        match session.evaluate(source) {
            Ok(value) => value,
            Err(e) => panic!("evaluation failed: {}", e),
        }
    }

    // ─────────────────────────── expressions ───────────────────────────

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(evaluate("1 - 2 - 3"), Value::Number(-4.0));
        assert_eq!(run("print 1 - 2 - 3;"), vec!["-4"]);
    }

    #[test]
    fn arithmetic_precedence_and_grouping() {
        assert_eq!(evaluate("1 + 2 * 3"), Value::Number(7.0));
        assert_eq!(evaluate("(1 + 2) * 3"), Value::Number(9.0));
        assert_eq!(evaluate("10 / 4"), Value::Number(2.5));
        assert_eq!(evaluate("-(3 - 5)"), Value::Number(2.0));
    }

    #[test]
    fn division_by_zero_follows_ieee() {
        assert_eq!(evaluate("1 / 0"), Value::Number(f64::INFINITY));
    }

    #[test]
    fn string_concatenation_and_comparison() {
        assert_eq!(evaluate("\"foo\" + \"bar\""), Value::String("foobar".into()));
        assert_eq!(evaluate("\"a\" == \"a\""), Value::Bool(true));
        assert_eq!(evaluate("1 == \"1\""), Value::Bool(false));
        assert_eq!(evaluate("nil == false"), Value::Bool(false));
        assert_eq!(evaluate("3 >= 3"), Value::Bool(true));
    }

    #[test]
    fn truthiness() {
        assert_eq!(evaluate("!nil"), Value::Bool(true));
        assert_eq!(evaluate("!0"), Value::Bool(false));
        assert_eq!(evaluate("!\"\""), Value::Bool(false));
    }

    #[test]
    fn logical_operators_short_circuit() {
        let output = run(
            "var ran = false;
             fun touch() { ran = true; return \"x\"; }
             print 0 and touch();
             print ran;
             print nil and touch();
             print ran;
             print 1 or touch();
             print ran;
             print nil or \"fallback\";",
        );

        // `0 and …` evaluates the right side because 0 is truthy.
        assert_eq!(output, vec!["x", "true", "nil", "true", "1", "true", "fallback"]);
    }

    #[test]
    fn falsy_left_operand_skips_side_effect() {
        let output = run(
            "var ran = false;
             fun touch() { ran = true; return 1; }
             print false and touch();
             print ran;
             print true or touch();
             print ran;",
        );

        assert_eq!(output, vec!["false", "false", "true", "false"]);
    }

    #[test]
    fn chained_assignment_assigns_both() {
        assert_eq!(
            run("var a; var b; a = b = 3; print a; print b;"),
            vec!["3", "3"]
        );
    }

    // ─────────────────────────── scopes ─────────────────────────────────

    #[test]
    fn block_local_shadowing_leaves_global_untouched() {
        let output = run(
            "var a = \"global\";
             {
               var a = \"outer\";
               {
                 var a = \"inner\";
                 a = \"changed\";
                 print a;
               }
               print a;
             }
             print a;",
        );

        assert_eq!(output, vec!["changed", "outer", "global"]);
    }

    #[test]
    fn closures_capture_declaration_scope_not_later_shadow() {
        let output = run(
            "var a = \"global\";
             {
               fun show() { print a; }
               show();
               var a = \"block\";
               show();
             }",
        );

        assert_eq!(output, vec!["global", "global"]);
    }

    #[test]
    fn each_loop_iteration_gets_its_own_closure_scope() {
        let output = run(
            "var fns0; var fns1; var fns2;
             for (var i = 0; i < 3; i = i + 1) {
               var j = i;
               fun get() { return j; }
               if (i == 0) fns0 = get;
               if (i == 1) fns1 = get;
               if (i == 2) fns2 = get;
             }
             print fns0();
             print fns1();
             print fns2();",
        );

        assert_eq!(output, vec!["0", "1", "2"]);
    }

    #[test]
    fn closures_share_a_captured_scope() {
        let output = run(
            "fun makeCounter() {
               var count = 0;
               fun inc() { count = count + 1; return count; }
               fun peek() { return count; }
               fun pair(which) { if (which) return inc; return peek; }
               return pair;
             }
             var counter = makeCounter();
             var inc = counter(true);
             var peek = counter(false);
             inc();
             inc();
             print peek();",
        );

        assert_eq!(output, vec!["2"]);
    }

    #[test]
    fn recursion_and_return_unwinding() {
        let output = run(
            "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
             print fib(15);
             fun early() { while (true) { { return \"out\"; } } }
             print early();
             fun nothing() {}
             print nothing();",
        );

        assert_eq!(output, vec!["610", "out", "nil"]);
    }

    // ─────────────────────────── classes ────────────────────────────────

    const CLASSES: &str = "
        class A {
          init(x) { this.x = x; }
          get() { return this.x; }
        }
        class B < A {
          get() { return super.get() + 1; }
        }";

    #[test]
    fn inherited_initializer_and_super_call() {
        let output = run(&format!("{}\nprint B(5).get();\nprint A(5).get();", CLASSES));

        assert_eq!(output, vec!["6", "5"]);
    }

    #[test]
    fn constructor_arity_is_checked() {
        let (_, error) = run_runtime_error(&format!("{}\nA();", CLASSES));

        assert_eq!(error, "[line 9] Runtime error at ')': Expected 1 arguments but got 0.");
    }

    #[test]
    fn super_with_string_field_is_a_type_error() {
        let (_, error) = run_runtime_error(&format!("{}\nprint B(\"5\").get();", CLASSES));

        assert!(
            error.contains("Operands must be either both strings or both numbers."),
            "{}",
            error
        );
    }

    #[test]
    fn methods_bind_this_late() {
        let output = run(
            "class Person {
               init(name) { this.name = name; }
               greet() { return \"hi \" + this.name; }
             }
             var a = Person(\"ann\");
             var b = Person(\"bob\");
             b.greet = a.greet;
             print b.greet();
             print Person(\"cat\").greet();",
        );

        // the stored field shadows the method and stays bound to `a`
        assert_eq!(output, vec!["hi ann", "hi cat"]);
    }

    #[test]
    fn initializer_returns_instance_even_when_called_directly() {
        let output = run(
            "class P { init() { this.v = 1; return; } }
             var p = P();
             print p.init();
             print p;
             print P;",
        );

        assert_eq!(output, vec!["P instance", "P instance", "P"]);
    }

    #[test]
    fn printing_callables() {
        let output = run("fun f() {} print f; print clock; print str;");

        assert_eq!(output, vec!["<fn f>", "<native fn clock>", "<native fn str>"]);
    }

    #[test]
    fn str_native_stringifies() {
        assert_eq!(run("print str(3) + \"!\"; print str(nil);"), vec!["3!", "nil"]);
    }

    #[test]
    fn clock_returns_a_recent_timestamp() {
        match evaluate("clock()") {
            Value::Number(seconds) => assert!(seconds > 1_600_000_000.0),
            other => panic!("expected a number, got {}", other),
        }
    }

    // ─────────────────────────── runtime errors ─────────────────────────

    #[test]
    fn adding_number_and_string_fails() {
        let (_, error) = run_runtime_error("print 1 + \"a\";");

        assert_eq!(
            error,
            "[line 1] Runtime error at '+': Operands must be either both strings or both numbers."
        );
    }

    #[test]
    fn subtracting_strings_names_the_operand() {
        let (_, error) = run_runtime_error("\"a\" - \"b\";");
        assert_eq!(
            error,
            "[line 1] Runtime error at '-': First operand of '-' must be a number."
        );

        let (_, error) = run_runtime_error("1 - \"b\";");
        assert_eq!(
            error,
            "[line 1] Runtime error at '-': Second operand of '-' must be a number."
        );
    }

    #[test]
    fn runtime_error_stops_the_rest_of_the_unit() {
        let (output, error) = run_runtime_error("print 1;\nprint undefined;\nprint 2;");

        assert_eq!(output, vec!["1"]);
        assert_eq!(
            error,
            "[line 2] Runtime error at 'undefined': Undefined variable 'undefined'."
        );
    }

    #[test]
    fn calling_non_callables_and_properties_of_non_instances() {
        let (_, error) = run_runtime_error("\"text\"();");
        assert!(error.ends_with("Can only call functions and classes."));

        let (_, error) = run_runtime_error("var x = 1; print x.y;");
        assert!(error.ends_with("Only instances have properties."));

        let (_, error) = run_runtime_error("var x = 1; x.y = 2;");
        assert!(error.ends_with("Only instances have fields."));

        let (_, error) = run_runtime_error("class C {} print C().missing;");
        assert!(error.ends_with("Undefined property 'missing'."));

        let (_, error) = run_runtime_error("var NotAClass = 1; class D < NotAClass {}");
        assert!(error.ends_with("Superclass must be a class."));
    }

    #[test]
    fn static_errors_prevent_any_execution() {
        let (mut session, buffer) = session();

        let err = session.run("print 1;\nprint ;").unwrap_err();

        assert_eq!(err.exit_code(), 65);
        assert!(buffer.lines().is_empty());
    }

    #[test]
    fn session_state_survives_errors() {
        let (mut session, buffer) = session();

        session.run("var total = 1; fun add(n) { total = total + n; }").unwrap();

        let err = session.run("add(2); add(\"x\");").unwrap_err();
        assert_eq!(err.exit_code(), 70);
        assert!(matches!(err, RunError::Runtime(LoxError::Runtime { line: 1, .. })));

        session.run("print total;").unwrap();
        assert_eq!(buffer.lines(), vec!["3"]);
    }
}
