use crate::shell::{AndOrOp, CommandNode, RawWord, RedirectMode, parse_script};

fn w(s: &str) -> RawWord {
    RawWord::new(s)
}

fn simple(words: &[&str]) -> CommandNode {
    CommandNode::SimpleCommand {
        words: words.iter().map(|s| w(s)).collect(),
        assigns: vec![],
        redirs: vec![],
    }
}

#[test]
fn test_parse_simple_command() {
    let cmds = parse_script("echo hello world").unwrap();
    assert_eq!(cmds, vec![simple(&["echo", "hello", "world"])]);
}

#[test]
fn test_quoted_words_keep_source_text() {
    let cmds = parse_script("echo \"a b\" 'c d' $(uname -s) `pwd` ${x}").unwrap();
    match &cmds[0] {
        CommandNode::SimpleCommand { words, .. } => {
            let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
            assert_eq!(texts, vec!["echo", "\"a b\"", "'c d'", "$(uname -s)", "`pwd`", "${x}"]);
            assert!(words[1].quoted);
            assert!(words[2].quoted);
            assert!(!words[3].quoted);
        }
        other => panic!("Expected SimpleCommand, got {:?}", other),
    }
}

#[test]
fn test_assignment() {
    let cmds = parse_script("CC=gcc\nX=1 make").unwrap();
    assert_eq!(cmds[0], CommandNode::Assignment { name: "CC".to_string(), value: w("gcc") });
    match &cmds[1] {
        CommandNode::SimpleCommand { words, assigns, .. } => {
            assert_eq!(words, &vec![w("make")]);
            assert_eq!(assigns, &vec![("X".to_string(), w("1"))]);
        }
        other => panic!("Expected SimpleCommand, got {:?}", other),
    }
}

#[test]
fn test_comments_and_continuations() {
    let cmds = parse_script("# header\necho a \\\n  b # trailing\n").unwrap();
    assert_eq!(cmds, vec![simple(&["echo", "a", "b"])]);
}

#[test]
fn test_and_or_is_left_associative() {
    let cmds = parse_script("a && b || c").unwrap();
    match &cmds[0] {
        CommandNode::AndOr { op: AndOrOp::Or, left, .. } => {
            assert!(matches!(left.as_ref(), CommandNode::AndOr { op: AndOrOp::And, .. }));
        }
        other => panic!("Expected AndOr, got {:?}", other),
    }
}

#[test]
fn test_pipelines() {
    let cmds = parse_script("! grep x f\na | b").unwrap();
    assert_eq!(cmds[0], CommandNode::Pipeline { stages: vec![simple(&["grep", "x", "f"])], negated: true });
    match &cmds[1] {
        CommandNode::Pipeline { stages, negated } => {
            assert_eq!(stages.len(), 2);
            assert!(!negated);
        }
        other => panic!("Expected Pipeline, got {:?}", other),
    }
}

#[test]
fn test_if_elif_else() {
    let src = "if test a; then\n  echo 1\nelif test b; then\n  echo 2\nelse\n  echo 3\nfi";
    let cmds = parse_script(src).unwrap();
    match &cmds[0] {
        CommandNode::If { cond, then_branch, else_branch } => {
            assert_eq!(cond, &vec![simple(&["test", "a"])]);
            assert_eq!(then_branch, &vec![simple(&["echo", "1"])]);
            match else_branch.as_slice() {
                [CommandNode::If { else_branch, .. }] => assert_eq!(else_branch, &vec![simple(&["echo", "3"])]),
                other => panic!("Expected nested If, got {:?}", other),
            }
        }
        other => panic!("Expected If, got {:?}", other),
    }
}

#[test]
fn test_case_arms() {
    let src = "case $host in\n  *-linux*|*-gnu*) os=linux ;;\n  (darwin*) os=mac ;;\n  *) os=other\nesac";
    let cmds = parse_script(src).unwrap();
    match &cmds[0] {
        CommandNode::Case { subject, arms } => {
            assert_eq!(subject, &w("$host"));
            assert_eq!(arms.len(), 3);
            assert_eq!(arms[0].patterns, vec![w("*-linux*"), w("*-gnu*")]);
            assert_eq!(arms[1].patterns, vec![w("darwin*")]);
            assert_eq!(arms[2].patterns, vec![w("*")]);
            assert_eq!(arms[2].body.len(), 1);
        }
        other => panic!("Expected Case, got {:?}", other),
    }
}

#[test]
fn test_for_loop() {
    let cmds = parse_script("for i in a \"b c\"\ndo\n  echo $i\ndone").unwrap();
    match &cmds[0] {
        CommandNode::ForLoop { var, items, body } => {
            assert_eq!(var, "i");
            assert_eq!(items, &vec![w("a"), w("\"b c\"")]);
            assert_eq!(body, &vec![simple(&["echo", "$i"])]);
        }
        other => panic!("Expected ForLoop, got {:?}", other),
    }
}

#[test]
fn test_redirections() {
    let cmds = parse_script("echo hi >> log 2>&1\nif true; then :; fi > out").unwrap();
    match &cmds[0] {
        CommandNode::SimpleCommand { redirs, .. } => {
            assert_eq!(redirs.len(), 2);
            assert_eq!(redirs[0].op, RedirectMode::Append);
            assert_eq!(redirs[1].fd, Some(2));
            assert_eq!(redirs[1].op, RedirectMode::DupOut);
        }
        other => panic!("Expected SimpleCommand, got {:?}", other),
    }
    assert!(matches!(cmds[1], CommandNode::Redirect { .. }));
}

#[test]
fn test_subshell_and_async() {
    let cmds = parse_script("(cd sub && make)\nsleep 1 &").unwrap();
    assert!(matches!(cmds[0], CommandNode::Subshell(_)));
    assert!(matches!(cmds[1], CommandNode::Async(_)));
}

#[test]
fn test_rejected_syntax() {
    for src in ["cat <<EOF\nx\nEOF", "while true; do :; done", "f() { :; }", "echo 'open", "if test a; then"] {
        assert!(parse_script(src).is_err(), "{} should not parse", src);
    }
}

#[test]
fn test_display_is_compact() {
    let cmds = parse_script("if test -n \"$x\"; then echo y; fi").unwrap();
    assert_eq!(cmds[0].to_string(), "if test -n \"$x\"; then echo y; fi");
    assert_eq!(cmds[0].kind(), "if");
}
