use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::parser::Parser;
use lox::scanner::Scanner;
use lox::stmt::Stmt;

fn parse_source(source: &str) -> (Vec<Stmt>, Vec<LoxError>) {
    Parser::new(Scanner::new(source)).parse()
}

fn parse_one(source: &str) -> Stmt {
    let (mut statements, diagnostics) = parse_source(source);

    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics for {:?}: {:?}",
        source,
        diagnostics
    );
    assert_eq!(statements.len(), 1, "expected one statement for {:?}", source);

    statements.remove(0)
}

fn assert_prints(source: &str, expected: &str) {
    let stmt = parse_one(source);
    assert_eq!(AstPrinter::print_stmt(&stmt), expected, "source: {}", source);
}

#[test]
fn test_parser_multiplication_binds_tighter_than_addition() {
    assert_prints("1 + 2 * 3;", "(expr (+ 1 (* 2 3)))");
}

#[test]
fn test_parser_grouping_overrides_precedence() {
    assert_prints("(1 + 2) * 3;", "(expr (* (group (+ 1 2)) 3))");
}

#[test]
fn test_parser_comparison_binds_tighter_than_equality() {
    assert_prints("1 < 2 == true;", "(expr (== (< 1 2) true))");
}

#[test]
fn test_parser_unary_binds_tighter_than_factor() {
    assert_prints("-1 * !ready;", "(expr (* (- 1) (! ready)))");
}

#[test]
fn test_parser_binary_operators_are_left_associative() {
    assert_prints("1 - 2 - 3;", "(expr (- (- 1 2) 3))");
    assert_prints("8 / 4 / 2;", "(expr (/ (/ 8 4) 2))");
}

#[test]
fn test_parser_assignment_is_right_associative() {
    assert_prints("a = b = 1;", "(expr (= a (= b 1)))");
}

#[test]
fn test_parser_and_binds_tighter_than_or() {
    assert_prints("a or b and c;", "(expr (or a (and b c)))");
}

#[test]
fn test_parser_call_and_property_chains() {
    assert_prints("foo(1)(2).bar;", "(expr (get (call (call foo 1) 2) bar))");
    assert_prints("a.b.c();", "(expr (call (get (get a b) c)))");
}

#[test]
fn test_parser_property_assignment_becomes_set() {
    assert_prints("a.b = 1;", "(expr (set a b 1))");
}

#[test]
fn test_parser_invalid_assignment_target() {
    let (_, diagnostics) = parse_source("1 = 2;");

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0]
        .to_string()
        .contains("Invalid assignment target."));
}

#[test]
fn test_parser_round_trips_printed_precedence() {
    // Re-parsing the printed form (with explicit groupings standing in for
    // the parenthesization) keeps the structure.
    let first = parse_one("1 + 2 * 3 - 4;");
    let second = parse_one("(1 + (2 * 3)) - 4;");

    // The grouped variant differs only by Grouping nodes; the printer makes
    // the shared skeleton comparable.
    assert_eq!(AstPrinter::print_stmt(&first), "(expr (- (+ 1 (* 2 3)) 4))");
    assert_eq!(
        AstPrinter::print_stmt(&second),
        "(expr (- (group (+ 1 (group (* 2 3)))) 4))"
    );
}

#[test]
fn test_parser_for_desugars_into_while() {
    assert_prints(
        "for (var i = 0; i < 3; i = i + 1) print i;",
        "(block (var i 0) (while (< i 3) (block (print i) (expr (= i (+ i 1))))))",
    );
}

#[test]
fn test_parser_for_with_empty_clauses() {
    assert_prints("for (;;) print 1;", "(while true (print 1))");
}

#[test]
fn test_parser_for_with_expression_initializer() {
    assert_prints(
        "for (i = 0; i < 2;) i = i + 1;",
        "(block (expr (= i 0)) (while (< i 2) (expr (= i (+ i 1)))))",
    );
}

#[test]
fn test_parser_if_else() {
    assert_prints("if (a) print 1; else print 2;", "(if a (print 1) (print 2))");
}

#[test]
fn test_parser_while() {
    assert_prints("while (a) a = a - 1;", "(while a (expr (= a (- a 1))))");
}

#[test]
fn test_parser_block() {
    assert_prints("{ var a = 1; print a; }", "(block (var a 1) (print a))");
}

#[test]
fn test_parser_function_declaration() {
    assert_prints(
        "fun add(a, b) { return a + b; }",
        "(fun add (a b) (return (+ a b)))",
    );
}

#[test]
fn test_parser_class_declaration() {
    assert_prints(
        "class Cake < Dessert { init(f) { this.f = f; } taste() { return this.f; } }",
        "(class Cake (< Dessert) (fun init (f) (expr (set this f f))) (fun taste () (return (get this f))))",
    );
}

#[test]
fn test_parser_super_access() {
    assert_prints(
        "class B < A { test() { return super.method(); } }",
        "(class B (< A) (fun test () (return (call (super method)))))",
    );
}

#[test]
fn test_parser_synchronizes_after_error() {
    let (statements, diagnostics) = parse_source("123 + 456 -; print 579;");

    assert_eq!(diagnostics.len(), 1, "diagnostics: {:?}", diagnostics);
    assert!(diagnostics[0].to_string().contains("Expected expression."));

    // The second statement survives the first one's failure.
    assert_eq!(statements.len(), 1);
    assert_eq!(AstPrinter::print_stmt(&statements[0]), "(print 579)");
}

#[test]
fn test_parser_reports_every_broken_declaration() {
    let (statements, diagnostics) = parse_source("var = 1; var ok = 2; print +;");

    assert_eq!(diagnostics.len(), 2, "diagnostics: {:?}", diagnostics);
    assert_eq!(statements.len(), 1);
    assert_eq!(AstPrinter::print_stmt(&statements[0]), "(var ok 2)");
}

#[test]
fn test_parser_missing_semicolon() {
    let (_, diagnostics) = parse_source("print 1");

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].to_string().contains("Expected ';' after value."));
}

#[test]
fn test_parser_lexical_error_surfaces_in_diagnostics() {
    let (_, diagnostics) = parse_source("print $;");

    assert!(diagnostics
        .iter()
        .any(|e| e.to_string().contains("Unexpected character")));
}
