mod common;

use pretty_assertions::assert_eq;

use common::run;
use rlox::ast_printer::AstPrinter;
use rlox::parser::Parser;
use rlox::scanner::scan_tokens;
use rlox::stmt::Stmt;
use rlox::RunOutcome;

fn parse_errors(source: &str) -> Vec<String> {
    let result = run(source);
    assert_eq!(result.outcome, RunOutcome::StaticError);
    result.stderr.lines().map(str::to_string).collect()
}

fn printed(source: &str) -> String {
    let (tokens, errors) = scan_tokens(source);
    assert!(errors.is_empty());
    match Parser::new(tokens).parse_expression() {
        Ok(expr) => AstPrinter::print(&expr),
        Err(errors) => panic!("parse failed: {:?}", errors),
    }
}

#[test]
fn precedence_climbs_from_assignment_to_primary() {
    assert_eq!(
        printed("a = 1 + 2 * 3 == 7 or !false and -x < 4"),
        "(= a (or (== (+ 1.0 (* 2.0 3.0)) 7.0) (and (! false) (< (- x) 4.0))))"
    );
}

#[test]
fn binary_operators_associate_left() {
    assert_eq!(printed("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
    assert_eq!(printed("8 / 4 / 2"), "(/ (/ 8.0 4.0) 2.0)");
}

#[test]
fn assignment_associates_right() {
    assert_eq!(printed("a = b = c"), "(= a (= b c))");
}

#[test]
fn call_and_property_chains() {
    assert_eq!(printed("a.b(1)(2).c"), "(. (call (call (. a b) 1.0) 2.0) c)");
    assert_eq!(printed("this.x = super.y"), "(= (. this x) (super y))");
}

#[test]
fn program_with_every_declaration_kind_parses() {
    let source = r#"
        var a = 1;
        function f(x, y) { return x + y; }
        class A { m() {} }
        class B < A { init() { this.v = 1; } }
        if (a) print a; else print nil;
        while (false) {}
        for (;;) { return; }
    "#;
    let (tokens, errors) = scan_tokens(source);
    assert!(errors.is_empty());

    let program = match Parser::new(tokens).parse() {
        Ok(program) => program,
        Err(errors) => panic!("parse failed: {:?}", errors),
    };

    assert_eq!(program.len(), 7);
    assert!(matches!(program[1], Stmt::Function(ref decl) if decl.params.len() == 2));
    assert!(matches!(program[3], Stmt::Class { superclass: Some(_), .. }));
    assert!(matches!(program[6], Stmt::While { .. }));
}

#[test]
fn missing_semicolons_are_reported() {
    assert_eq!(
        parse_errors("print 1"),
        vec!["[line 1] Error at end: Expect ';' after value."]
    );
    assert_eq!(
        parse_errors("var a = 1\nprint a;"),
        vec!["[line 2] Error at 'print': Expect ';' after variable declaration."]
    );
    assert_eq!(
        parse_errors("a + 1 2;"),
        vec!["[line 1] Error at '2': Expect ';' after expression."]
    );
}

#[test]
fn invalid_assignment_target() {
    assert_eq!(
        parse_errors("1 + 2 = 3;"),
        vec!["[line 1] Error at '=': Invalid assignment target."]
    );
}

#[test]
fn invalid_increment_target() {
    assert_eq!(
        parse_errors("f()++;"),
        vec!["[line 1] Error at '+': Invalid increment target."]
    );
}

#[test]
fn synchronization_reports_errors_from_several_statements() {
    let errors = parse_errors("print ;\nvar = 1;\nclass {}\nprint 1;");
    assert_eq!(
        errors,
        vec![
            "[line 1] Error at ';': Expect expression.",
            "[line 2] Error at '=': Expect variable name.",
            "[line 3] Error at '{': Expect class name.",
        ]
    );
}

#[test]
fn argument_limit_is_reported_without_aborting() {
    let args: Vec<String> = (0..256).map(|n| n.to_string()).collect();
    let source = format!("f({});\nprint ;", args.join(", "));
    let errors = parse_errors(&source);

    assert_eq!(errors.len(), 2);
    assert!(errors[0].ends_with("Can't have more than 255 arguments."));
    assert!(errors[1].starts_with("[line 2]"));
}

#[test]
fn function_keyword_is_spelled_out() {
    let errors = parse_errors("fun f() {}");
    assert!(!errors.is_empty());
    assert!(run("function f() {} f();").outcome == RunOutcome::Ok);
}
