//! Direct AST-walking backend: emits a function body straight from the
//! structured statement tree, lowering `if`/`ifelse`/`while` to numbered
//! local labels.

use crate::emit::FnEmitter;
use pyrite_syntax::ast::{Expr, FnDecl, Stmt};
use pyrite_syntax::diagnostics::Diagnostic;
use std::collections::HashSet;

/// Emit one function's assembly fragment.
pub fn emit_function(func: &FnDecl) -> Result<String, Diagnostic> {
    let local_count = count_locals(&func.body, &func.params);
    let mut e = FnEmitter::new(&func.name, &func.params, local_count);
    e.prologue();
    emit_stmts(&mut e, &func.body)?;
    e.finish()
}

fn emit_stmts(e: &mut FnEmitter, stmts: &[Stmt]) -> Result<(), Diagnostic> {
    for stmt in stmts {
        match stmt {
            Stmt::Assign { target, value, .. } => e.emit_assign(target, value)?,
            Stmt::Return { value, .. } => e.emit_return(value)?,
            Stmt::If { cond, body, .. } => {
                let end = e.new_label();
                emit_condition(e, cond, &end)?;
                emit_stmts(e, body)?;
                e.place_label(&end);
            }
            Stmt::IfElse {
                cond,
                then_body,
                else_body,
                ..
            } => {
                let else_label = e.new_label();
                let end = e.new_label();
                emit_condition(e, cond, &else_label)?;
                emit_stmts(e, then_body)?;
                e.branch(&end);
                e.place_label(&else_label);
                emit_stmts(e, else_body)?;
                e.place_label(&end);
            }
            Stmt::While { cond, body, .. } => {
                let head = e.new_label();
                let end = e.new_label();
                e.place_label(&head);
                emit_condition(e, cond, &end)?;
                emit_stmts(e, body)?;
                e.branch(&head);
                e.place_label(&end);
            }
        }
    }
    Ok(())
}

/// Evaluate the condition and branch to `false_label` when it is zero.
fn emit_condition(e: &mut FnEmitter, cond: &Expr, false_label: &str) -> Result<(), Diagnostic> {
    e.emit_expr(cond)?;
    e.branch_if_false(false_label);
    Ok(())
}

/// Distinct local slots the body will bind: every assignment target that is
/// not a parameter, across all nesting levels.
fn count_locals(stmts: &[Stmt], params: &[String]) -> usize {
    fn walk<'a>(stmts: &'a [Stmt], params: &[String], names: &mut HashSet<&'a str>) {
        for stmt in stmts {
            match stmt {
                Stmt::Assign { target, .. } => {
                    if !params.iter().any(|p| p == target) {
                        names.insert(target.as_str());
                    }
                }
                Stmt::Return { .. } => {}
                Stmt::If { body, .. } | Stmt::While { body, .. } => walk(body, params, names),
                Stmt::IfElse {
                    then_body,
                    else_body,
                    ..
                } => {
                    walk(then_body, params, names);
                    walk(else_body, params, names);
                }
            }
        }
    }
    let mut names = HashSet::new();
    walk(stmts, params, &mut names);
    names.len()
}
