use crate::lift::condition::parse_condition;
use crate::lift::error::{LiftResult, UnhandledTranslation};
use crate::lift::expand::{CaptureSink, Evaluator, ExpandedWord, SubstitutionSink, Template, WordExpansion};
use crate::lift::session::{Session, Thunk};
use crate::lift::value::{all_captures, check_placeholders, translate_command, translate_value};
use crate::shell::{AndOrOp, CaseArm, CommandNode, RawWord, Redirection};
use crate::target::ast::{CompareOp, Expr, LoopItem, LoopItems, Program, Stmt};

/// Name of the local that holds the expanded `case` subject.
pub const CASE_LOCAL: &str = "case";

/// A node lowered either to one status expression or to a statement block.
enum Lowered {
    Expr(Expr),
    Block(Vec<Stmt>),
}

impl Lowered {
    fn into_stmts(self) -> Vec<Stmt> {
        match self {
            Lowered::Expr(expr) => vec![Stmt::Expr(expr)],
            Lowered::Block(block) => block,
        }
    }

    fn into_expr(self, reason: &'static str) -> LiftResult<Expr> {
        match self {
            Lowered::Expr(expr) => Ok(expr),
            Lowered::Block(block) => {
                let len = block.len();
                match <[Stmt; 1]>::try_from(block) {
                    Ok([Stmt::Expr(expr)]) => Ok(expr),
                    _ => Err(UnhandledTranslation::new(
                        reason,
                        format!("expected a single command, got {} statements", len),
                    )),
                }
            }
        }
    }
}

pub struct Translator<'s> {
    session: &'s Session,
    evaluator: Evaluator,
}

impl<'s> Translator<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self::with_sink(session, Box::new(CaptureSink))
    }

    pub fn with_sink(session: &'s Session, sink: Box<dyn SubstitutionSink>) -> Self {
        Self {
            session,
            evaluator: Evaluator::new(sink),
        }
    }

    /// Translates a whole script. Any unsupported construct aborts the pass.
    pub fn translate(&mut self, nodes: &[CommandNode]) -> LiftResult<Program> {
        let body = self.translate_list(nodes)?;
        Ok(Program {
            body,
            substs: self.session.substs(),
        })
    }

    pub fn translate_list(&mut self, nodes: &[CommandNode]) -> LiftResult<Vec<Stmt>> {
        let mut out = Vec::new();
        for node in nodes {
            out.extend(self.lower(node, false)?.into_stmts());
        }
        Ok(out)
    }

    fn lower(&mut self, node: &CommandNode, negated: bool) -> LiftResult<Lowered> {
        log::debug!("Translating {}: {}", node.kind(), node);
        self.lower_node(node, negated).map_err(|e| e.at(node))
    }

    fn lower_node(&mut self, node: &CommandNode, negated: bool) -> LiftResult<Lowered> {
        match node {
            CommandNode::SimpleCommand { words, assigns, redirs } => self.simple_command(words, assigns, redirs, negated),
            CommandNode::Pipeline { stages, negated: bang } => match stages.as_slice() {
                [stage] => self.lower(stage, negated != *bang),
                _ => Err(UnhandledTranslation::new(
                    "pipeline",
                    format!("{} stages", stages.len()),
                )),
            },
            CommandNode::AndOr { op, left, right } => {
                let left = self.lower(left, false)?.into_expr("and-or")?;
                let right = self.lower(right, false)?.into_expr("and-or")?;
                // Operands are exit statuses, so the shell operators swap.
                let status = match op {
                    AndOrOp::And => Expr::Or(Box::new(left), Box::new(right)),
                    AndOrOp::Or => Expr::And(Box::new(left), Box::new(right)),
                };
                Ok(Lowered::Expr(if negated { status.negate() } else { status }))
            }
            CommandNode::Redirect { .. } | CommandNode::Subshell(_) | CommandNode::Async(_) => {
                Err(UnhandledTranslation::unsupported(node))
            }
            _ if negated => Err(UnhandledTranslation::new(
                "negated statement",
                format!("cannot negate {}", node.kind()),
            )),
            CommandNode::Assignment { name, value } => {
                let value = self.value(value)?;
                Ok(Lowered::Block(vec![Stmt::SetVar { name: name.clone(), value }]))
            }
            CommandNode::If { cond, then_branch, else_branch } => {
                let status = self.condition(cond)?;
                let mut then_body = self.translate_list(then_branch)?;
                if then_body.is_empty() {
                    then_body.push(Stmt::Pass);
                }
                let else_body = self.translate_list(else_branch)?;
                Ok(Lowered::Block(vec![Stmt::If {
                    cond: status.negate(),
                    then_body,
                    else_body,
                }]))
            }
            CommandNode::Case { subject, arms } => self.case(subject, arms),
            CommandNode::ForLoop { var, items, body } => self.for_loop(var, items, body),
        }
    }

    fn value(&mut self, word: &RawWord) -> LiftResult<Expr> {
        let res = self.evaluator.expand_value(word)?;
        translate_value(&res.template, &res.variables, &res.captures)
    }

    fn condition(&mut self, cond: &[CommandNode]) -> LiftResult<Expr> {
        match cond {
            [] => Err(UnhandledTranslation::new("empty if condition", "")),
            [node] => self.lower(node, false)?.into_expr("if condition"),
            _ => Err(UnhandledTranslation::new(
                "if condition",
                format!("{} commands in condition", cond.len()),
            )),
        }
    }

    fn simple_command(
        &mut self,
        words: &[RawWord],
        assigns: &[(String, RawWord)],
        redirs: &[Redirection],
        negated: bool,
    ) -> LiftResult<Lowered> {
        if let Some(redir) = redirs.first() {
            return Err(UnhandledTranslation::new(
                "redirectlist",
                format!("{}{}", redir.op.as_str(), redir.target),
            ));
        }
        if words.is_empty() {
            // "a=1 b=2" on its own line
            let mut stmts = Vec::with_capacity(assigns.len());
            for (name, value) in assigns {
                let value = self.value(value)?;
                stmts.push(Stmt::SetVar { name: name.clone(), value });
            }
            return statement(negated, || Ok(stmts));
        }
        if let Some((name, _)) = assigns.first() {
            return Err(UnhandledTranslation::new("assignment prefix", name.clone()));
        }

        let expansion = self.evaluator.expand_words(words, true)?;
        let Some(first) = expansion.words.first() else {
            return statement(negated, || Ok(Vec::new()));
        };

        let command = if first.template.is_literal() { Some(first.template.text()) } else { None };
        if let Some(thunk) = command.as_deref().and_then(Thunk::parse) {
            return statement(negated, || Ok(self.session.resolve(thunk)?.to_vec()));
        }

        let args = &expansion.words[1..];
        match command.as_deref() {
            Some("true") => statement(negated, || Ok(Vec::new())),
            Some("exit") => statement(negated, || {
                let code = match args.first() {
                    Some(word) => materialize(&word.template, &expansion)?,
                    None => Expr::str("0"),
                };
                Ok(vec![Stmt::Exit(code)])
            }),
            Some("echo") => statement(negated, || echo(args, &expansion)),
            Some("export") => statement(negated, || export(args, &expansion)),
            Some(name @ ("test" | "[")) => {
                let mut tokens: Vec<Template> = args.iter().map(|w| w.template.clone()).collect();
                if name == "[" {
                    match tokens.last() {
                        Some(last) if last.is_literal() && last.text() == "]" => {
                            tokens.pop();
                        }
                        _ => return Err(UnhandledTranslation::new("test expression", "missing ']'")),
                    }
                }
                let cond = parse_condition(&tokens, &expansion.variables, &expansion.captures)?;
                let status = cond.negate();
                Ok(Lowered::Expr(if negated { status.negate() } else { status }))
            }
            _ => {
                let parts: Vec<Template> = expansion.words.iter().map(|w| w.template.shell_word(w.quoted)).collect();
                let line = Template::join(&parts, " ");
                let run = Expr::Run {
                    command: Box::new(translate_command(&line, &expansion.variables, &expansion.captures)?),
                    capture: false,
                };
                Ok(Lowered::Expr(if negated { run.negate() } else { run }))
            }
        }
    }

    fn case(&mut self, subject: &RawWord, arms: &[CaseArm]) -> LiftResult<Lowered> {
        let mut stmts = vec![Stmt::Let {
            name: CASE_LOCAL.to_string(),
            value: self.value(subject)?,
        }];

        let mut guarded = Vec::new();
        let mut fallback = Vec::new();
        for arm in arms {
            let body = self.translate_list(&arm.body)?;
            if is_wildcard_arm(arm) {
                // Later arms can never match.
                fallback = body;
                break;
            }
            let mut cond: Option<Expr> = None;
            for pattern in &arm.patterns {
                let test = self.pattern_test(pattern)?;
                cond = Some(match cond {
                    Some(prev) => Expr::Or(Box::new(prev), Box::new(test)),
                    None => test,
                });
            }
            if let Some(cond) = cond {
                guarded.push((cond, body));
            }
        }

        let mut chain = fallback;
        for (cond, mut then_body) in guarded.into_iter().rev() {
            if then_body.is_empty() {
                then_body.push(Stmt::Pass);
            }
            chain = vec![Stmt::If { cond, then_body, else_body: chain }];
        }
        stmts.extend(chain);
        Ok(Lowered::Block(stmts))
    }

    fn pattern_test(&mut self, pattern: &RawWord) -> LiftResult<Expr> {
        let res = self.evaluator.expand_value(pattern)?;
        let subject = Box::new(Expr::Local(CASE_LOCAL.to_string()));
        if res.template.is_literal() && !has_glob_meta(&res.template.text()) {
            return Ok(Expr::Compare {
                op: CompareOp::Eq,
                numeric: false,
                left: subject,
                right: Box::new(Expr::Str(res.template.text())),
            });
        }
        let glob = res.template.glob_pattern();
        Ok(Expr::Match {
            value: subject,
            pattern: Box::new(translate_value(&glob, &res.variables, &res.captures)?),
        })
    }

    fn for_loop(&mut self, var: &str, items: &[RawWord], body: &[CommandNode]) -> LiftResult<Lowered> {
        let expansion = self.evaluator.expand_words(items, true)?;
        let items = if expansion.is_static() {
            LoopItems::Literal(expansion.words.iter().map(|w| w.template.text()).collect())
        } else {
            let mut generated = Vec::with_capacity(expansion.words.len());
            for word in &expansion.words {
                check_placeholders(&word.template, &expansion.variables, &expansion.captures)?;
                let split = word
                    .template
                    .field_split()
                    .ok_or_else(|| UnhandledTranslation::new("loop item quoting", word.template.render()))?;
                generated.push(LoopItem {
                    template: word.template.render(),
                    quoted: !split,
                });
            }
            LoopItems::Generated {
                items: generated,
                extra: all_captures(&expansion.captures),
            }
        };

        let mut stmts = vec![Stmt::SetVar {
            name: var.to_string(),
            value: Expr::Local(var.to_string()),
        }];
        stmts.extend(self.translate_list(body)?);
        Ok(Lowered::Block(vec![Stmt::For {
            var: var.to_string(),
            items,
            body: stmts,
        }]))
    }
}

fn statement(negated: bool, build: impl FnOnce() -> LiftResult<Vec<Stmt>>) -> LiftResult<Lowered> {
    if negated {
        return Err(UnhandledTranslation::new("negated statement", "cannot negate a builtin"));
    }
    Ok(Lowered::Block(build()?))
}

fn materialize(template: &Template, expansion: &WordExpansion) -> LiftResult<Expr> {
    translate_value(template, &expansion.variables, &expansion.captures)
}

fn echo(args: &[ExpandedWord], expansion: &WordExpansion) -> LiftResult<Vec<Stmt>> {
    let (newline, args) = match args.first() {
        Some(w) if w.template.is_literal() && w.template.text() == "-n" => (false, &args[1..]),
        _ => (true, args),
    };
    let parts: Vec<Template> = args.iter().map(|w| w.template.clone()).collect();
    let value = materialize(&Template::join(&parts, " "), expansion)?;
    Ok(vec![Stmt::Print { value, newline }])
}

fn export(args: &[ExpandedWord], expansion: &WordExpansion) -> LiftResult<Vec<Stmt>> {
    let mut stmts = Vec::new();
    for word in args {
        if let Some((name, value)) = word.template.split_assignment() {
            let value = materialize(&value, expansion)?;
            stmts.push(Stmt::SetVar { name: name.clone(), value });
            stmts.push(Stmt::Export(name));
        } else if word.template.is_literal() {
            stmts.push(Stmt::Export(word.template.text()));
        } else {
            return Err(UnhandledTranslation::new("export", word.template.render()));
        }
    }
    Ok(stmts)
}

fn is_wildcard_arm(arm: &CaseArm) -> bool {
    match arm.patterns.as_slice() {
        [only] => only.text == "*",
        _ => false,
    }
}

fn has_glob_meta(text: &str) -> bool {
    text.contains(['*', '?', '['])
}
