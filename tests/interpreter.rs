mod common;

use pretty_assertions::assert_eq;

use common::{run, Session};
use rlox::RunOutcome;

fn prints(source: &str) -> String {
    let result = run(source);
    assert_eq!(result.stderr, "", "unexpected diagnostics");
    assert_eq!(result.outcome, RunOutcome::Ok);
    result.stdout
}

fn runtime_error(source: &str) -> String {
    let result = run(source);
    assert_eq!(result.outcome, RunOutcome::RuntimeError);
    result.stderr
}

#[test]
fn block_shadowing_reads_the_outer_binding() {
    let out = prints("var x = 10; { var x = x + 1; print x; } print x;");
    assert_eq!(out, "11\n10\n");
}

#[test]
fn closures_capture_each_loop_iteration() {
    let out = prints(
        r#"
        var f0; var f1; var f2;
        for (var i = 0; i < 3; i = i + 1) {
            function capture() { return i; }
            if (i == 0) f0 = capture;
            if (i == 1) f1 = capture;
            if (i == 2) f2 = capture;
        }
        print f0(); print f1(); print f2();
        "#,
    );
    assert_eq!(out, "0\n1\n2\n");
}

#[test]
fn loop_body_writes_reach_the_loop_variable() {
    let out = prints("for (var i = 0; i < 5; i = i + 1) { if (i == 1) i = 3; print i; }");
    assert_eq!(out, "0\n3\n4\n");
}

#[test]
fn while_and_for_without_var_initializer() {
    let out = prints(
        r#"
        var i = 0;
        while (i < 2) { print i; i = i + 1; }
        for (i = 5; i < 7; i = i + 1) print i;
        print i;
        "#,
    );
    assert_eq!(out, "0\n1\n5\n6\n7\n");
}

#[test]
fn truthiness_and_equality() {
    let out = prints(
        r#"
        print nil == nil;
        print 0 == false;
        if ("") print "empty string is truthy";
        if (0) print "zero is truthy";
        print !nil;
        print "a" == "a";
        print 1 == "1";
        print nil != false;
        "#,
    );
    assert_eq!(
        out,
        "true\nfalse\nempty string is truthy\nzero is truthy\ntrue\ntrue\nfalse\ntrue\n"
    );
}

#[test]
fn arithmetic_and_display() {
    let out = prints(
        r#"
        print 3;
        print 2.5;
        print 10 / 4;
        print -(1 + 2) * 3;
        print "foo" + "bar";
        print 1 / 0 > 1000;
        print 2 >= 2;
        print 1 - -2;
        "#,
    );
    assert_eq!(out, "3\n2.5\n2.5\n-9\nfoobar\ntrue\ntrue\n3\n");
}

#[test]
fn logical_operators_short_circuit() {
    let out = prints(
        r#"
        print nil or "yes";
        print "first" or boom;
        print false and boom;
        print 1 and 2;
        print nil || "symbolic";
        print true && nil;
        "#,
    );
    assert_eq!(out, "yes\nfirst\nfalse\n2\nsymbolic\nnil\n");
}

#[test]
fn postfix_increment_and_decrement() {
    let out = prints("var i = 1; i++; print i; i--; i--; print i;");
    assert_eq!(out, "2\n0\n");
}

#[test]
fn closures_share_their_captured_frame() {
    let out = prints(
        r#"
        function makeCounter() {
            var count = 0;
            function inc() { count = count + 1; return count; }
            return inc;
        }
        var c = makeCounter();
        print c();
        print c();
        var d = makeCounter();
        print d();
        "#,
    );
    assert_eq!(out, "1\n2\n1\n");
}

#[test]
fn resolution_is_static_not_dynamic() {
    let out = prints(
        r#"
        var a = "global";
        {
            function show() { print a; }
            show();
            var a = "block";
            show();
        }
        "#,
    );
    assert_eq!(out, "global\nglobal\n");
}

#[test]
fn recursion_and_returns() {
    let out = prints(
        r#"
        function fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(10);
        function nothing() { return; }
        print nothing();
        function implicit() {}
        print implicit();
        "#,
    );
    assert_eq!(out, "55\nnil\nnil\n");
}

#[test]
fn return_unwinds_out_of_nested_loops() {
    let out = prints(
        r#"
        function find() {
            for (var i = 0; i < 10; i = i + 1) {
                while (true) {
                    if (i == 4) return i;
                    i = i + 1;
                }
            }
        }
        print find();
        "#,
    );
    assert_eq!(out, "4\n");
}

#[test]
fn deep_recursion_within_the_call_limit_completes() {
    let out = prints(
        r#"
        function count(n) {
            if (n == 0) return 0;
            return 1 + count(n - 1);
        }
        print count(1000);
        "#,
    );
    assert_eq!(out, "1000\n");
}

#[test]
fn unbounded_recursion_is_a_runtime_error() {
    let err = runtime_error("function f(n) {\n  return f(n);\n}\nf(1);");
    assert_eq!(err, "Stack overflow.\n[line 2]\n");
}

#[test]
fn negative_zero_prints_as_zero() {
    assert_eq!(prints("print -0; print 0 * -1;"), "0\n0\n");
}

#[test]
fn callables_display_their_names() {
    let out = prints("function f() {} print f; print clock; print clock() > 0;");
    assert_eq!(out, "<fn f>\n<native fn clock>\ntrue\n");
}

#[test]
fn arity_mismatch_is_a_runtime_error() {
    let err = runtime_error("function f(a, b) {}\nf(1);");
    assert_eq!(err, "Expected 2 arguments but got 1.\n[line 2]\n");
}

#[test]
fn operand_type_errors() {
    assert_eq!(
        runtime_error("print -\"a\";"),
        "Operand must be a number.\n[line 1]\n"
    );
    assert_eq!(
        runtime_error("print 1 + \"a\";"),
        "Operands must be two numbers or strings.\n[line 1]\n"
    );
    assert_eq!(
        runtime_error("print 1 < \"a\";"),
        "Operands must be numbers.\n[line 1]\n"
    );
    assert_eq!(
        runtime_error("print \"a\" * 2;"),
        "Operands must be numbers.\n[line 1]\n"
    );
}

#[test]
fn undefined_names_and_bad_callees() {
    assert_eq!(
        runtime_error("print nope;"),
        "Undefined variable 'nope'.\n[line 1]\n"
    );
    assert_eq!(
        runtime_error("nope = 1;"),
        "Undefined variable 'nope'.\n[line 1]\n"
    );
    assert_eq!(
        runtime_error("\"str\"();"),
        "Can only call functions and classes.\n[line 1]\n"
    );
}

#[test]
fn runtime_error_aborts_the_rest_of_the_unit() {
    let result = run("print 1;\nprint nope;\nprint 2;");
    assert_eq!(result.outcome, RunOutcome::RuntimeError);
    assert_eq!(result.stdout, "1\n");
    assert_eq!(result.stderr, "Undefined variable 'nope'.\n[line 2]\n");
}

#[test]
fn static_errors_withhold_evaluation() {
    let result = run("print 1;\nprint ;");
    assert_eq!(result.outcome, RunOutcome::StaticError);
    assert_eq!(result.stdout, "");
    assert_eq!(result.stderr, "[line 2] Error at ';': Expect expression.\n");
}

#[test]
fn lexical_errors_withhold_evaluation() {
    let result = run("print 1 @;");
    assert_eq!(result.outcome, RunOutcome::StaticError);
    assert_eq!(result.stdout, "");
    assert_eq!(result.stderr, "[line 1] Error: Unexpected character: @\n");
}

#[test]
fn repl_keeps_state_between_lines() {
    let mut session = Session::new(true);

    assert_eq!(session.run("var a = 1").stdout, "");
    assert_eq!(session.run("a + 2").stdout, "3\n");
    assert_eq!(session.run("function f() { return a; }").stdout, "");
    assert_eq!(session.run("f()").stdout, "1\n");

    let failed = session.run("nope");
    assert_eq!(failed.outcome, RunOutcome::RuntimeError);
    assert_eq!(failed.stderr, "Undefined variable 'nope'.\n[line 1]\n");

    let broken = session.run("print (");
    assert_eq!(broken.outcome, RunOutcome::StaticError);

    assert_eq!(session.run("a").stdout, "1\n");
}

#[test]
fn repl_survives_unbounded_recursion() {
    let mut session = Session::new(true);

    assert_eq!(session.run("function f(n) { return f(n); }").stdout, "");

    let overflow = session.run("f(1)");
    assert_eq!(overflow.outcome, RunOutcome::RuntimeError);
    assert_eq!(overflow.stderr, "Stack overflow.\n[line 1]\n");

    assert_eq!(session.run("print \"alive\"").stdout, "alive\n");
    assert_eq!(session.run("function g(n) { if (n == 0) return 0; return g(n - 1); }").stdout, "");
    assert_eq!(session.run("g(100)").stdout, "0\n");
}

#[test]
fn repl_error_in_nested_block_restores_the_global_frame() {
    let mut session = Session::new(true);

    let failed = session.run("{ var a = 5; { nope; } }");
    assert_eq!(failed.outcome, RunOutcome::RuntimeError);
    assert_eq!(failed.stderr, "Undefined variable 'nope'.\n[line 1]\n");

    assert_eq!(session.run("var b = 2").outcome, RunOutcome::Ok);
    assert!(session.lox.interpreter().global_names().contains(&"b".to_string()));
    assert_eq!(session.run("b").stdout, "2\n");

    let leaked = session.run("a");
    assert_eq!(leaked.outcome, RunOutcome::RuntimeError);
    assert_eq!(leaked.stderr, "Undefined variable 'a'.\n[line 1]\n");
}

#[test]
fn repl_echoes_only_top_level_expressions() {
    let mut session = Session::new(true);

    let result = session.run("for (var i = 0; i < 2; i = i + 1) print i");
    assert_eq!(result.stdout, "0\n1\n");

    assert_eq!(session.run("var x = 10").stdout, "");
    assert_eq!(session.run("{ var x = x + 1; print x; }").stdout, "11\n");
}

#[test]
fn host_can_inject_native_functions() {
    use rlox::callable::NativeFunction;
    use rlox::value::Value;

    fn double(args: &[Value]) -> Value {
        match args.first() {
            Some(Value::Number(n)) => Value::Number(n * 2.0),
            _ => Value::Nil,
        }
    }

    let mut session = Session::new(false);
    session.lox.interpreter().define_native(NativeFunction {
        name: "double",
        arity: 1,
        func: double,
    });

    assert_eq!(session.run("print double(21);").stdout, "42\n");
    assert_eq!(
        session.run("double();").stderr,
        "Expected 1 arguments but got 0.\n[line 1]\n"
    );
}
