use lox::error::Result;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::value::Value;

fn run(source: &str) -> (String, Result<Option<Value>>) {
    let (statements, diagnostics) = Parser::new(Scanner::new(source)).parse();

    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics for {:?}: {:?}",
        source,
        diagnostics
    );

    Resolver::new()
        .resolve(&statements)
        .expect("resolution failed");

    let mut output: Vec<u8> = Vec::new();
    let result = Interpreter::new(&mut output).interpret(&statements);

    (String::from_utf8(output).expect("non-utf8 output"), result)
}

fn run_output(source: &str) -> String {
    let (output, result) = run(source);
    result.expect("unexpected runtime error");
    output
}

fn run_err(source: &str) -> String {
    let (_, result) = run(source);
    result.expect_err("expected a runtime error").to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Arithmetic, printing, formatting
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_eval_arithmetic_precedence() {
    assert_eq!(run_output("print 1 + 2 * 3;"), "7\n");
}

#[test]
fn test_eval_number_formatting() {
    assert_eq!(run_output("print 5.0;"), "5\n");
    assert_eq!(run_output("print 10 / 4;"), "2.5\n");
    assert_eq!(run_output("print 4 / 2;"), "2\n");
    assert_eq!(run_output("print 0.1 + 0.2;"), "0.30000000000000004\n");
    assert_eq!(run_output("print -0.5;"), "-0.5\n");
}

#[test]
fn test_eval_expression_statement_value() {
    let (_, result) = run("1 + 2 * 3;");
    assert_eq!(result.unwrap(), Some(Value::Number(7.0)));

    let (_, result) = run("var a = 1;");
    assert_eq!(result.unwrap(), None);
}

#[test]
fn test_eval_division_by_zero() {
    assert!(run_err("print 1 / 0;").contains("Divisor can't be 0."));
}

#[test]
fn test_eval_plus_overloads() {
    assert_eq!(run_output(r#"print "foo" + "bar";"#), "foobar\n");
    assert_eq!(run_output(r#"print "abc" + 123;"#), "abc123\n");
    assert_eq!(run_output(r#"print 1.5 + "x";"#), "1.5x\n");
    assert!(run_err("print true + 1;").contains("Operands must be numbers or strings."));
}

#[test]
fn test_eval_ordering_requires_numbers() {
    assert_eq!(run_output("print 1 < 2;"), "true\n");
    assert!(run_err(r#"print "1" < 2;"#).contains("Operands must be numbers."));
}

#[test]
fn test_eval_unary() {
    assert_eq!(run_output("print -(3 + 4);"), "-7\n");
    assert_eq!(run_output("print !nil;"), "true\n");
    assert_eq!(run_output("print !!0;"), "false\n");
    assert!(run_err(r#"print -"x";"#).contains("Operand must be a number."));
}

// ─────────────────────────────────────────────────────────────────────────────
// Equality and truthiness
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_eval_equality_table() {
    assert_eq!(run_output("print 1 == 1;"), "true\n");
    assert_eq!(run_output("print nil == nil;"), "true\n");
    assert_eq!(run_output(r#"print "" == " ";"#), "false\n");
    assert_eq!(run_output(r#"print 1 == "1";"#), "false\n");

    // A boolean operand coerces the other side through truthiness.
    assert_eq!(run_output("print 1 == true;"), "true\n");
    assert_eq!(run_output("print 0 == true;"), "false\n");
    assert_eq!(run_output("print nil == false;"), "true\n");
    assert_eq!(run_output(r#"print "x" == true;"#), "true\n");
    assert_eq!(run_output(r#"print "" == true;"#), "false\n");

    assert_eq!(run_output("print 1 != 1;"), "false\n");
}

#[test]
fn test_eval_truthiness_in_conditions() {
    assert_eq!(run_output(r#"if (0) print "t"; else print "f";"#), "f\n");
    assert_eq!(run_output(r#"if ("") print "t"; else print "f";"#), "f\n");
    assert_eq!(run_output(r#"if ("x") print "t"; else print "f";"#), "t\n");
    assert_eq!(run_output(r#"if (nil) print "t"; else print "f";"#), "f\n");
}

#[test]
fn test_eval_instance_equality_is_identity() {
    assert_eq!(
        run_output("class P {} var a = P(); var b = P(); print a == b; print a == a;"),
        "false\ntrue\n"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Variables, scoping, control flow
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_eval_block_shadowing() {
    assert_eq!(
        run_output("var a = 1; { var a = 2; print a; } print a;"),
        "2\n1\n"
    );
}

#[test]
fn test_eval_assignment_yields_value() {
    assert_eq!(run_output("var a = 1; print a = 2; print a;"), "2\n2\n");
}

#[test]
fn test_eval_undefined_variable() {
    assert!(run_err("print x;").contains("Undefined variable x."));
    assert!(run_err("x = 1;").contains("Undefined variable x."));
}

#[test]
fn test_eval_for_loop() {
    assert_eq!(
        run_output("for (var i = 0; i < 3; i = i + 1) print i;"),
        "0\n1\n2\n"
    );
}

#[test]
fn test_eval_while_loop() {
    assert_eq!(
        run_output("var i = 3; while (i > 0) { print i; i = i - 1; }"),
        "3\n2\n1\n"
    );
}

#[test]
fn test_eval_short_circuit() {
    // The deciding operand comes back untouched and the right side never runs.
    assert_eq!(
        run_output(
            r#"
            fun side() { print "side"; return true; }
            print false and side();
            print true or side();
            "#
        ),
        "false\ntrue\n"
    );

    // The right side runs when the left does not decide.
    assert_eq!(
        run_output(r#"fun side() { print "side"; return true; } print false or side();"#),
        "side\ntrue\n"
    );
}

#[test]
fn test_eval_logical_yields_operand() {
    assert_eq!(run_output(r#"print nil or "yes";"#), "yes\n");
    assert_eq!(run_output(r#"print nil and "no";"#), "nil\n");
    assert_eq!(run_output(r#"print 1 and 2;"#), "2\n");
}

#[test]
fn test_eval_runtime_error_aborts_statement() {
    let (output, result) = run("print 1; print 1 / 0; print 2;");

    assert_eq!(output, "1\n");
    assert!(result.is_err());
}

// ─────────────────────────────────────────────────────────────────────────────
// Functions and closures
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_eval_fib() {
    assert_eq!(
        run_output("fun fib(n) { if (n < 2) return n; return fib(n-1) + fib(n-2); } print fib(10);"),
        "55\n"
    );
}

#[test]
fn test_eval_function_display_and_default_return() {
    assert_eq!(run_output("fun f() {} print f; print f();"), "<fn f>\nnil\n");
}

#[test]
fn test_eval_arity_mismatch() {
    assert!(run_err("fun f(a) { return a; } f();").contains("Expected 1 arguments but got 0"));
    assert!(run_err("fun f() {} f(1, 2);").contains("Expected 0 arguments but got 2"));
}

#[test]
fn test_eval_only_functions_and_classes_are_callable() {
    assert!(run_err("var x = 1; x();").contains("Can only call functions and classes."));
}

#[test]
fn test_eval_closure_captures_defining_frame() {
    assert_eq!(
        run_output(r#"{ var a = "outer"; { fun f() { print a; } var a = "inner"; f(); } }"#),
        "outer\n"
    );
}

#[test]
fn test_eval_counter_closure_keeps_state() {
    assert_eq!(
        run_output(
            r#"
            fun make() {
                var n = 0;
                fun inc() { n = n + 1; print n; }
                return inc;
            }
            var c = make();
            c(); c(); c();
            "#
        ),
        "1\n2\n3\n"
    );
}

#[test]
fn test_eval_return_unwinds_through_loops_and_blocks() {
    assert_eq!(
        run_output(
            r#"
            fun first() {
                for (var i = 0; i < 10; i = i + 1) {
                    if (i == 3) { return i; }
                }
            }
            print first();
            "#
        ),
        "3\n"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Classes, instances, inheritance
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_eval_method_call() {
    assert_eq!(
        run_output(r#"class Bagel { eat() { print "yum"; } } Bagel().eat();"#),
        "yum\n"
    );
}

#[test]
fn test_eval_initializer_and_this() {
    assert_eq!(
        run_output(
            r#"
            class Cake { init(f) { this.flavor = f; } taste() { print this.flavor; } }
            Cake("cherry").taste();
            "#
        ),
        "cherry\n"
    );
}

#[test]
fn test_eval_class_and_instance_display() {
    assert_eq!(run_output("class Box {} print Box;"), "class Box\n");
    assert_eq!(run_output("class Box {} print Box();"), "Box instance\n");
}

#[test]
fn test_eval_fields_have_reference_semantics() {
    assert_eq!(
        run_output("class Box {} var a = Box(); var b = a; b.x = 1; print a.x;"),
        "1\n"
    );
}

#[test]
fn test_eval_bound_method_keeps_receiver() {
    assert_eq!(
        run_output(
            r#"
            class Greeter { init(name) { this.name = name; } greet() { print this.name; } }
            var m = Greeter("hi").greet;
            m();
            "#
        ),
        "hi\n"
    );
}

#[test]
fn test_eval_initializer_always_yields_instance() {
    assert_eq!(
        run_output("class C { init() { this.v = 1; } } var c = C(); print c.init();"),
        "C instance\n"
    );
}

#[test]
fn test_eval_undefined_property() {
    assert!(run_err("class A {} print A().missing;").contains("Undefined property missing."));
}

#[test]
fn test_eval_only_instances_have_properties() {
    assert!(run_err("var a = 1; print a.b;").contains("Only instances have properties."));
    assert!(run_err("var a = 1; a.b = 2;").contains("Only instances have properties."));
    assert!(run_err("class A {} A.b = 2;").contains("Only instances have properties."));
}

#[test]
fn test_eval_inherited_method() {
    assert_eq!(
        run_output(r#"class A { hello() { print "hello"; } } class B < A {} B().hello();"#),
        "hello\n"
    );
}

#[test]
fn test_eval_super_dispatch() {
    assert_eq!(
        run_output(
            r#"
            class A { method() { print "A method"; } }
            class B < A {
                method() { print "B method"; }
                test() { super.method(); }
            }
            B().test();
            "#
        ),
        "A method\n"
    );
}

#[test]
fn test_eval_super_binds_this() {
    assert_eq!(
        run_output(
            r#"
            class A { who() { print this.name; } }
            class B < A {
                init(name) { this.name = name; }
                call_super() { super.who(); }
            }
            B("bee").call_super();
            "#
        ),
        "bee\n"
    );
}

#[test]
fn test_eval_superclass_must_be_a_class() {
    assert!(run_err("var NotAClass = 1; class B < NotAClass {}")
        .contains("Superclass must be a class."));
}

// ─────────────────────────────────────────────────────────────────────────────
// Recovery pipeline
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_recovered_statement_still_runs() {
    let (statements, diagnostics) =
        Parser::new(Scanner::new("123 + 456 -; print 123 + 456;")).parse();

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(statements.len(), 1);

    Resolver::new()
        .resolve(&statements)
        .expect("resolution failed");

    let mut output: Vec<u8> = Vec::new();
    Interpreter::new(&mut output)
        .interpret(&statements)
        .expect("runtime error");

    assert_eq!(String::from_utf8(output).unwrap(), "579\n");
}
