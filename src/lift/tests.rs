use crate::lift::expand::{CaptureSink, Evaluator, SubstitutionSink};
use crate::lift::{LiftResult, Session, Thunk, Translator, translate};
use crate::shell::{CommandNode, parse_script};
use crate::target::ast::{CompareOp, Expr, LoopItems, Predicate, Stmt};

fn lift(src: &str) -> Vec<Stmt> {
    let session = Session::new();
    let nodes = parse_script(src).unwrap();
    translate(&session, &nodes).unwrap().body
}

fn lift_err(src: &str) -> &'static str {
    let session = Session::new();
    let nodes = parse_script(src).unwrap();
    translate(&session, &nodes).unwrap_err().reason
}

fn var(name: &str) -> Expr {
    Expr::Var(name.to_string())
}

fn run(cmd: &str) -> Expr {
    Expr::Run { command: Box::new(Expr::str(cmd)), capture: false }
}

fn has_double_negation(expr: &Expr) -> bool {
    match expr {
        Expr::Not(inner) => inner.is_negation() || has_double_negation(inner),
        Expr::And(a, b) | Expr::Or(a, b) => has_double_negation(a) || has_double_negation(b),
        Expr::Compare { left, right, .. } => has_double_negation(left) || has_double_negation(right),
        Expr::Match { value, pattern } => has_double_negation(value) || has_double_negation(pattern),
        Expr::Test { operand, .. } => has_double_negation(operand),
        Expr::Run { command, .. } => has_double_negation(command),
        Expr::Format { extra, .. } => extra.iter().any(|(_, e)| has_double_negation(e)),
        _ => false,
    }
}

fn stmts_have_double_negation(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|s| match s {
        Stmt::If { cond, then_body, else_body } => {
            has_double_negation(cond) || stmts_have_double_negation(then_body) || stmts_have_double_negation(else_body)
        }
        Stmt::For { body, .. } => stmts_have_double_negation(body),
        Stmt::Expr(e) | Stmt::Exit(e) => has_double_negation(e),
        Stmt::SetVar { value, .. } | Stmt::Let { value, .. } | Stmt::Print { value, .. } => has_double_negation(value),
        _ => false,
    })
}

#[test]
fn test_literal_assignment() {
    assert_eq!(
        lift("CC=gcc"),
        vec![Stmt::SetVar { name: "CC".to_string(), value: Expr::str("gcc") }]
    );
}

#[test]
fn test_variable_copy_is_direct_read() {
    assert_eq!(lift("b=$a"), vec![Stmt::SetVar { name: "b".to_string(), value: var("a") }]);
    assert_eq!(lift("b=\"${a}\""), vec![Stmt::SetVar { name: "b".to_string(), value: var("a") }]);
}

#[test]
fn test_command_substitution_is_the_capture() {
    let body = lift("b=$(uname -s)");
    assert_eq!(
        body,
        vec![Stmt::SetVar {
            name: "b".to_string(),
            value: Expr::Run { command: Box::new(Expr::str("uname -s")), capture: true },
        }]
    );
}

#[test]
fn test_mixed_value_uses_format() {
    let body = lift("libdir=\"$prefix/lib\"");
    match &body[0] {
        Stmt::SetVar { value: Expr::Format { template, extra }, .. } => {
            assert_eq!(template, "{prefix}/lib");
            assert!(extra.is_empty());
        }
        other => panic!("Expected format assignment, got {:?}", other),
    }
}

#[test]
fn test_script_dir_idiom() {
    let body = lift("srcdir=`dirname \"$0\"`");
    assert_eq!(body, vec![Stmt::SetVar { name: "srcdir".to_string(), value: Expr::ScriptDir }]);
}

#[test]
fn test_if_test_z() {
    let body = lift("if test -z \"$x\"; then echo A; fi");
    assert_eq!(
        body,
        vec![Stmt::If {
            cond: Expr::Test { predicate: Predicate::Empty, operand: Box::new(var("x")) },
            then_body: vec![Stmt::Print { value: Expr::str("A"), newline: true }],
            else_body: vec![],
        }]
    );
}

#[test]
fn test_bracket_form_drops_closing_bracket() {
    let body = lift("if [ \"$a\" = yes ]; then :; fi");
    match &body[0] {
        Stmt::If { cond: Expr::Compare { op, numeric, right, .. }, .. } => {
            assert_eq!(*op, CompareOp::Eq);
            assert!(!numeric);
            assert_eq!(**right, Expr::str("yes"));
        }
        other => panic!("Expected comparison guard, got {:?}", other),
    }
}

#[test]
fn test_missing_closing_bracket_fails() {
    assert_eq!(lift_err("[ -n x"), "test expression");
}

#[test]
fn test_negated_test_does_not_stack_negations() {
    let body = lift("if test ! -d build; then mkdir build; fi");
    match &body[0] {
        Stmt::If { cond, .. } => {
            assert_eq!(cond, &Expr::Not(Box::new(Expr::Test {
                predicate: Predicate::IsDir,
                operand: Box::new(Expr::str("build")),
            })));
        }
        other => panic!("Expected If, got {:?}", other),
    }
}

#[test]
fn test_empty_then_body_is_pass() {
    let body = lift("if test -f x; then\nelse echo no; fi");
    match &body[0] {
        Stmt::If { then_body, else_body, .. } => {
            assert_eq!(then_body, &vec![Stmt::Pass]);
            assert_eq!(else_body.len(), 1);
        }
        other => panic!("Expected If, got {:?}", other),
    }
}

#[test]
fn test_elif_nests_in_else() {
    let body = lift("if test a; then echo 1; elif test b; then echo 2; else echo 3; fi");
    match &body[0] {
        Stmt::If { else_body, .. } => match else_body.as_slice() {
            [Stmt::If { else_body: inner, .. }] => assert_eq!(inner.len(), 1),
            other => panic!("Expected nested If, got {:?}", other),
        },
        other => panic!("Expected If, got {:?}", other),
    }
}

#[test]
fn test_test_grammar_precedence() {
    // -a binds tighter than -o
    let body = lift("test a -o b -a c");
    match &body[0] {
        Stmt::Expr(Expr::Not(inner)) => match inner.as_ref() {
            Expr::Or(_, right) => assert!(matches!(right.as_ref(), Expr::And(..))),
            other => panic!("Expected Or at the top, got {:?}", other),
        },
        other => panic!("Expected negated test, got {:?}", other),
    }
}

#[test]
fn test_test_grammar_parentheses_and_numeric() {
    let body = lift("test \\( \"$n\" -ge 3 \\) -a -n \"$m\"");
    match &body[0] {
        Stmt::Expr(Expr::Not(inner)) => match inner.as_ref() {
            Expr::And(left, right) => {
                assert!(matches!(left.as_ref(), Expr::Compare { op: CompareOp::Ge, numeric: true, .. }));
                assert!(matches!(right.as_ref(), Expr::Test { predicate: Predicate::NonEmpty, .. }));
            }
            other => panic!("Expected And, got {:?}", other),
        },
        other => panic!("Expected negated test, got {:?}", other),
    }
}

#[test]
fn test_bang_as_compare_operand() {
    let body = lift("test ! = x");
    match &body[0] {
        Stmt::Expr(Expr::Not(inner)) => {
            assert!(matches!(inner.as_ref(), Expr::Compare { op: CompareOp::Eq, .. }));
        }
        other => panic!("Expected negated compare, got {:?}", other),
    }
}

#[test]
fn test_external_command() {
    assert_eq!(lift("mkdir -p build"), vec![Stmt::Expr(run("mkdir -p build"))]);
}

#[test]
fn test_external_command_keeps_quoting() {
    let body = lift("touch 'a b' \"$f\"");
    match &body[0] {
        Stmt::Expr(Expr::Run { command, capture: false }) => match command.as_ref() {
            Expr::Format { template, .. } => assert_eq!(template, "touch 'a b' {f:q}"),
            other => panic!("Expected Format command, got {:?}", other),
        },
        other => panic!("Expected Run, got {:?}", other),
    }
}

#[test]
fn test_negated_command() {
    assert_eq!(lift("! grep -q x y"), vec![Stmt::Expr(Expr::Not(Box::new(run("grep -q x y"))))]);
}

#[test]
fn test_negated_if_condition_unwraps() {
    let body = lift("if ! cmp -s a b; then echo differ; fi");
    match &body[0] {
        Stmt::If { cond, .. } => assert_eq!(cond, &run("cmp -s a b")),
        other => panic!("Expected If, got {:?}", other),
    }
}

#[test]
fn test_and_or_swap_on_statuses() {
    assert_eq!(
        lift("a && b"),
        vec![Stmt::Expr(Expr::Or(Box::new(run("a")), Box::new(run("b"))))]
    );
    assert_eq!(
        lift("a || b"),
        vec![Stmt::Expr(Expr::And(Box::new(run("a")), Box::new(run("b"))))]
    );
}

#[test]
fn test_and_or_operand_must_be_expression() {
    assert_eq!(lift_err("a && echo hi"), "and-or");
    assert_eq!(lift_err("a || x=1"), "and-or");
}

#[test]
fn test_builtins() {
    assert!(lift("true").is_empty());
    assert_eq!(lift("exit 1"), vec![Stmt::Exit(Expr::str("1"))]);
    assert_eq!(lift("exit"), vec![Stmt::Exit(Expr::str("0"))]);
    assert_eq!(
        lift("echo -n hello world"),
        vec![Stmt::Print { value: Expr::str("hello world"), newline: false }]
    );
    assert_eq!(
        lift("export CC=cc PATH"),
        vec![
            Stmt::SetVar { name: "CC".to_string(), value: Expr::str("cc") },
            Stmt::Export("CC".to_string()),
            Stmt::Export("PATH".to_string()),
        ]
    );
}

#[test]
fn test_case_chain() {
    let body = lift("case \"$v\" in a) echo 1;; b*) echo 2;; *) echo 3;; esac");
    assert_eq!(body[0], Stmt::Let { name: "case".to_string(), value: var("v") });
    match &body[1] {
        Stmt::If { cond, else_body, .. } => {
            assert!(matches!(cond, Expr::Compare { op: CompareOp::Eq, .. }));
            match else_body.as_slice() {
                [Stmt::If { cond, else_body, .. }] => {
                    assert!(matches!(cond, Expr::Match { .. }));
                    assert_eq!(else_body, &vec![Stmt::Print { value: Expr::str("3"), newline: true }]);
                }
                other => panic!("Expected second arm, got {:?}", other),
            }
        }
        other => panic!("Expected If chain, got {:?}", other),
    }
}

#[test]
fn test_case_without_wildcard_has_no_else() {
    let body = lift("case $v in a|b) echo ab;; esac");
    match &body[1] {
        Stmt::If { cond, else_body, .. } => {
            assert!(matches!(cond, Expr::Or(..)));
            assert!(else_body.is_empty());
        }
        other => panic!("Expected If, got {:?}", other),
    }
}

#[test]
fn test_for_literal_items() {
    let body = lift("for i in a b \"c d\"; do echo $i; done");
    match &body[0] {
        Stmt::For { var, items: LoopItems::Literal(items), body } => {
            assert_eq!(var, "i");
            assert_eq!(items, &vec!["a".to_string(), "b".to_string(), "c d".to_string()]);
            assert_eq!(body[0], Stmt::SetVar { name: "i".to_string(), value: Expr::Local("i".to_string()) });
        }
        other => panic!("Expected literal loop, got {:?}", other),
    }
}

#[test]
fn test_for_generated_items() {
    let body = lift("for f in $files \"$one\" `ls`; do :; done");
    match &body[0] {
        Stmt::For { items: LoopItems::Generated { items, extra }, .. } => {
            assert_eq!(items.len(), 3);
            assert!(!items[0].quoted);
            assert!(items[1].quoted);
            assert_eq!(items[2].template, "{cmd0}");
            assert_eq!(extra.len(), 1);
        }
        other => panic!("Expected generated loop, got {:?}", other),
    }
}

#[test]
fn test_unsupported_constructs_fail() {
    assert_eq!(lift_err("a | b"), "pipeline");
    assert_eq!(lift_err("echo hi > out"), "redirectlist");
    assert_eq!(lift_err("if true; then :; fi > log"), "redirectlist");
    assert_eq!(lift_err("( cd sub; make )"), "subshell");
    assert_eq!(lift_err("make &"), "async command");
    assert_eq!(lift_err("CFLAGS=-O2 make"), "assignment prefix");
    assert_eq!(lift_err("x=$((1 + 2))"), "arithmetic expansion");
    assert_eq!(lift_err("echo $@"), "special parameter");
    assert_eq!(lift_err("echo ${x:-y}"), "parameter operator");
}

#[test]
fn test_capture_named_variable_is_rejected() {
    assert_eq!(lift_err("x=\"$cmd0-$(echo hi)\""), "placeholder collision");
    assert_eq!(lift_err("for i in \"$cmd0\" `echo z`; do echo $i; done"), "placeholder collision");
    assert_eq!(lift_err("echo \"$cmd1\" $(date)"), "placeholder collision");
    assert_eq!(lift("x=$cmd0"), vec![Stmt::SetVar { name: "x".to_string(), value: var("cmd0") }]);
}

#[test]
fn test_loop_item_quoting_per_segment() {
    let body = lift("for i in x\"$a\" x$b; do :; done");
    match &body[0] {
        Stmt::For { items: LoopItems::Generated { items, .. }, .. } => {
            assert!(items[0].quoted);
            assert!(!items[1].quoted);
        }
        other => panic!("Expected generated loop, got {:?}", other),
    }
    assert_eq!(lift_err("for i in $a\"$b\"; do :; done"), "loop item quoting");
}

#[test]
fn test_failure_produces_no_statements() {
    let session = Session::new();
    let nodes = parse_script("echo before\na | b\necho after").unwrap();
    let err = translate(&session, &nodes).unwrap_err();
    assert_eq!(err.reason, "pipeline");
    assert!(err.node.is_some());
}

#[test]
fn test_if_condition_shape() {
    assert_eq!(lift_err("if true; then :; fi"), "if condition");
    assert_eq!(lift_err("if a; b; then :; fi"), "if condition");
    let nodes = vec![CommandNode::If { cond: vec![], then_branch: vec![], else_branch: vec![] }];
    let err = translate(&Session::new(), &nodes).unwrap_err();
    assert_eq!(err.reason, "empty if condition");
}

#[test]
fn test_negating_a_statement_fails() {
    assert_eq!(lift_err("! echo hi"), "negated statement");
    assert_eq!(lift_err("! if test a; then :; fi"), "negated statement");
}

#[test]
fn test_no_double_negation_anywhere() {
    let scripts = [
        "if ! test ! -f x; then :; fi",
        "if test ! ! -n \"$y\"; then :; fi",
        "! test ! -z a",
        "if ! [ \"$a\" != b ]; then echo x; else echo y; fi",
        "if ! a && ! b; then :; fi",
        "if test -n a; then if ! test -d b; then :; fi; fi",
        "! ! true_cmd",
    ];
    for src in scripts {
        let session = Session::new();
        let nodes = parse_script(src).unwrap();
        if let Ok(program) = translate(&session, &nodes) {
            assert!(!stmts_have_double_negation(&program.body), "double negation in {}", src);
        }
    }
}

#[test]
fn test_thunk_splicing() {
    let mut session = Session::new();
    let block = vec![Stmt::Export("CC".to_string()), Stmt::Print { value: Expr::str("checking"), newline: true }];
    let thunk = session.register(block.clone());
    assert_eq!(thunk.index, 0);

    let src = format!("{}\n{} ignored --flags\nif test a; then {}; fi", thunk.placeholder(), thunk.placeholder(), thunk.placeholder());
    let nodes = parse_script(&src).unwrap();
    let body = translate(&session, &nodes).unwrap().body;
    assert_eq!(&body[0..2], block.as_slice());
    assert_eq!(&body[2..4], block.as_slice());
    match &body[4] {
        Stmt::If { then_body, .. } => assert_eq!(then_body, &block),
        other => panic!("Expected If, got {:?}", other),
    }
}

#[test]
fn test_thunk_must_be_whole_word() {
    let mut session = Session::new();
    session.register(vec![Stmt::Pass]);
    let nodes = parse_script("x__thunk0__").unwrap();
    let body = translate(&session, &nodes).unwrap().body;
    assert_eq!(body, vec![Stmt::Expr(run("x__thunk0__"))]);
}

#[test]
fn test_unknown_thunk_fails() {
    let session = Session::new();
    let nodes = parse_script(&Thunk { index: 4 }.placeholder()).unwrap();
    assert_eq!(translate(&session, &nodes).unwrap_err().reason, "unknown thunk");
}

#[test]
fn test_substs_are_copied_into_program() {
    let mut session = Session::new();
    session.add_subst("CFLAGS");
    session.add_subst("CC");
    let program = translate(&session, &[]).unwrap();
    assert_eq!(program.substs, vec!["CC".to_string(), "CFLAGS".to_string()]);
}

struct BracketSink;

impl SubstitutionSink for BracketSink {
    fn substitute(&mut self, command: &str) -> LiftResult<Expr> {
        Ok(Expr::str(format!("<{}>", command)))
    }
}

#[test]
fn test_injected_substitution_sink() {
    let session = Session::new();
    let mut translator = Translator::with_sink(&session, Box::new(BracketSink));
    let nodes = parse_script("v=$(whoami)").unwrap();
    let body = translator.translate(&nodes).unwrap().body;
    assert_eq!(body, vec![Stmt::SetVar { name: "v".to_string(), value: Expr::str("<whoami>") }]);
}

#[test]
fn test_sibling_expansions_do_not_leak() {
    let nodes = parse_script("a=\"$(x)$p\"\nb=$y").unwrap();
    let body = translate(&Session::new(), &nodes).unwrap().body;
    assert_eq!(body[1], Stmt::SetVar { name: "b".to_string(), value: var("y") });

    let mut ev = Evaluator::new(Box::new(CaptureSink));
    ev.expand_value(&crate::shell::RawWord::new("$(first)")).unwrap();
    let res = ev.expand_value(&crate::shell::RawWord::new("$(second)")).unwrap();
    assert_eq!(res.text(), "{cmd0}");
}
