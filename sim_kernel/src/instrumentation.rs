//! # Instrumentation
//!
//! Turns a parsed task body into something the dispatcher can suspend.
//!
//! [`instrument`] inserts a `Yield` after every statement except `return`,
//! recursively inside `if`/`else`/`while` bodies. [`lower`] then flattens
//! the tree into a [`Program`] of ops with absolute jump targets, so an
//! execution context is just a program counter plus variables.

use crate::error::ScriptError;
use crate::script::{self, Expr, Stmt, StmtKind};

/// Inserts a suspension point after every non-exit statement
///
/// A loop with an empty body receives one `Yield` so that every iteration
/// reaches a suspension point.
pub fn instrument(body: Vec<Stmt>) -> Vec<Stmt> {
    let mut result = Vec::with_capacity(body.len() * 2);
    for stmt in body {
        let line = stmt.line;
        let kind = match stmt.kind {
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => StmtKind::If {
                cond,
                then_body: instrument(then_body),
                else_body: instrument(else_body),
            },
            StmtKind::While { cond, body } => {
                let mut body = instrument(body);
                if body.is_empty() {
                    body.push(Stmt::new(line, StmtKind::Yield));
                }
                StmtKind::While { cond, body }
            }
            other => other,
        };

        let exits = kind.is_control_exit();
        result.push(Stmt::new(line, kind));
        if !exits {
            result.push(Stmt::new(line, StmtKind::Yield));
        }
    }
    result
}

/// A single executable op
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Assign { name: String, value: Expr },
    Out(Expr),
    Work(Expr),
    Fail(Expr),
    Jump(usize),
    JumpUnless { cond: Expr, target: usize },
    Return,
    Yield,
}

/// An op with the source line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
    pub line: usize,
    pub op: Op,
}

/// Flat, executable form of an instrumented body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    instrs: Vec<Instr>,
}

impl Program {
    pub fn get(&self, pc: usize) -> Option<&Instr> {
        self.instrs.get(pc)
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Number of suspension points in the program
    pub fn yield_points(&self) -> usize {
        self.instrs
            .iter()
            .filter(|instr| instr.op == Op::Yield)
            .count()
    }

    fn emit(&mut self, line: usize, op: Op) -> usize {
        self.instrs.push(Instr { line, op });
        self.instrs.len() - 1
    }

    fn patch(&mut self, at: usize, to: usize) {
        if let Some(instr) = self.instrs.get_mut(at) {
            match &mut instr.op {
                Op::Jump(target) | Op::JumpUnless { target, .. } => *target = to,
                _ => {}
            }
        }
    }
}

/// Flattens a statement tree into a program
pub fn lower(body: &[Stmt]) -> Program {
    let mut program = Program::default();
    lower_into(&mut program, body);
    program
}

fn lower_into(program: &mut Program, body: &[Stmt]) {
    for stmt in body {
        let line = stmt.line;
        match &stmt.kind {
            StmtKind::Assign { name, value } => {
                program.emit(
                    line,
                    Op::Assign {
                        name: name.clone(),
                        value: value.clone(),
                    },
                );
            }
            StmtKind::Out(expr) => {
                program.emit(line, Op::Out(expr.clone()));
            }
            StmtKind::Work(expr) => {
                program.emit(line, Op::Work(expr.clone()));
            }
            StmtKind::Fail(expr) => {
                program.emit(line, Op::Fail(expr.clone()));
            }
            StmtKind::Return => {
                program.emit(line, Op::Return);
            }
            StmtKind::Yield => {
                program.emit(line, Op::Yield);
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let branch = program.emit(
                    line,
                    Op::JumpUnless {
                        cond: cond.clone(),
                        target: 0,
                    },
                );
                lower_into(program, then_body);
                if else_body.is_empty() {
                    let after = program.len();
                    program.patch(branch, after);
                } else {
                    let skip_else = program.emit(line, Op::Jump(0));
                    let else_start = program.len();
                    program.patch(branch, else_start);
                    lower_into(program, else_body);
                    let after = program.len();
                    program.patch(skip_else, after);
                }
            }
            StmtKind::While { cond, body } => {
                let start = program.len();
                let exit = program.emit(
                    line,
                    Op::JumpUnless {
                        cond: cond.clone(),
                        target: 0,
                    },
                );
                lower_into(program, body);
                program.emit(line, Op::Jump(start));
                let after = program.len();
                program.patch(exit, after);
            }
        }
    }
}

/// Parses, instruments and lowers a task body
pub fn compile(source: &str) -> Result<Program, ScriptError> {
    let body = script::parse(source)?;
    Ok(lower(&instrument(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse;

    fn kinds(body: &[Stmt]) -> Vec<&'static str> {
        body.iter()
            .map(|stmt| match stmt.kind {
                StmtKind::Assign { .. } => "assign",
                StmtKind::Out(_) => "out",
                StmtKind::Work(_) => "work",
                StmtKind::Fail(_) => "fail",
                StmtKind::Return => "return",
                StmtKind::If { .. } => "if",
                StmtKind::While { .. } => "while",
                StmtKind::Yield => "yield",
            })
            .collect()
    }

    #[test]
    fn test_yield_after_each_statement() {
        let body = instrument(parse("x = 1\nout x\nwork 1").unwrap());
        assert_eq!(
            kinds(&body),
            vec!["assign", "yield", "out", "yield", "work", "yield"]
        );
    }

    #[test]
    fn test_return_is_not_instrumented() {
        let body = instrument(parse("x = 1\nreturn").unwrap());
        assert_eq!(kinds(&body), vec!["assign", "yield", "return"]);
    }

    #[test]
    fn test_nested_bodies_are_instrumented() {
        let body = instrument(parse("if x\nout 1\nelse\nreturn\nend").unwrap());
        assert_eq!(kinds(&body), vec!["if", "yield"]);
        let StmtKind::If {
            then_body,
            else_body,
            ..
        } = &body[0].kind
        else {
            panic!("expected if");
        };
        assert_eq!(kinds(then_body), vec!["out", "yield"]);
        assert_eq!(kinds(else_body), vec!["return"]);
    }

    #[test]
    fn test_empty_loop_gets_a_yield() {
        let body = instrument(parse("while true\nend").unwrap());
        let StmtKind::While { body: loop_body, .. } = &body[0].kind else {
            panic!("expected while");
        };
        assert_eq!(kinds(loop_body), vec!["yield"]);
    }

    #[test]
    fn test_lower_while_loop_jumps() {
        let program = compile("while i < 3\ni += 1\nend").unwrap();
        // 0 JumpUnless -> 4, 1 Assign, 2 Yield, 3 Jump -> 0, 4 Yield
        assert_eq!(program.len(), 5);
        assert!(matches!(
            program.get(0).unwrap().op,
            Op::JumpUnless { target: 4, .. }
        ));
        assert_eq!(program.get(3).unwrap().op, Op::Jump(0));
        assert_eq!(program.get(4).unwrap().op, Op::Yield);
    }

    #[test]
    fn test_lower_if_else_jumps() {
        let program = compile("if c\nout 1\nelse\nout 2\nend").unwrap();
        // 0 JumpUnless -> 4, 1 Out, 2 Yield, 3 Jump -> 6, 4 Out, 5 Yield, 6 Yield
        assert_eq!(program.len(), 7);
        assert!(matches!(
            program.get(0).unwrap().op,
            Op::JumpUnless { target: 4, .. }
        ));
        assert_eq!(program.get(3).unwrap().op, Op::Jump(6));
        assert_eq!(program.get(6).unwrap().line, 1);
    }

    #[test]
    fn test_lower_if_without_else() {
        let program = compile("if c\nout 1\nend").unwrap();
        assert!(matches!(
            program.get(0).unwrap().op,
            Op::JumpUnless { target: 3, .. }
        ));
    }

    #[test]
    fn test_yield_points_counted() {
        let program = compile("a = 1\nb = 2\nreturn").unwrap();
        assert_eq!(program.yield_points(), 2);
    }

    #[test]
    fn test_compile_propagates_parse_errors() {
        assert_eq!(compile("while x\n").unwrap_err().line, 1);
    }
}
