//! Single-assignment renaming over basic blocks.
//!
//! Within a block, no two definitions share a name after this pass: the
//! first definition keeps the bare name and each redefinition appends one
//! `'` mark. The mapping is seeded with the parameters and carried across
//! the block list in id order. Definitions reaching a merge block along
//! different paths are NOT reconciled (there is no phi-node synthesis yet),
//! so callers must not assume cross-block single-assignment holds.

use pyrite_syntax::ast::Expr;
use pyrite_syntax::cfg::{BlockStmt, CfgFunction, CfgProgram, Terminator};
use pyrite_syntax::diagnostics::Diagnostic;
use std::collections::HashMap;

pub fn rename_program(program: &mut CfgProgram) -> Result<(), Diagnostic> {
    for func in &mut program.funcs {
        rename_function(func)?;
    }
    Ok(())
}

/// Rewrite every definition and use in the function's blocks. An unmapped
/// variable reference is fatal.
pub fn rename_function(func: &mut CfgFunction) -> Result<(), Diagnostic> {
    let mut names: HashMap<String, String> = func
        .params
        .iter()
        .map(|p| (p.clone(), p.clone()))
        .collect();
    let fname = func.name.clone();

    for block in &mut func.blocks {
        for stmt in &mut block.stmts {
            match stmt {
                BlockStmt::Assign { target, value } => {
                    // rewrite the right-hand side first: `x = x + 1` reads
                    // the prior definition of x
                    rename_expr(value, &names, &fname)?;
                    match names.get(target.as_str()).cloned() {
                        Some(current) => {
                            let marked = format!("{}'", current);
                            names.insert(target.clone(), marked.clone());
                            *target = marked;
                        }
                        None => {
                            names.insert(target.clone(), target.clone());
                        }
                    }
                }
                BlockStmt::Return { value } => rename_expr(value, &names, &fname)?,
            }
        }
        if let Some(Terminator::Cbr { cond, .. }) = &mut block.term {
            rename_expr(cond, &names, &fname)?;
        }
    }
    Ok(())
}

fn rename_expr(
    expr: &mut Expr,
    names: &HashMap<String, String>,
    func: &str,
) -> Result<(), Diagnostic> {
    match expr {
        Expr::Int(_) => Ok(()),
        Expr::Var(name) => {
            let current = names.get(name.as_str()).ok_or_else(|| {
                Diagnostic::error(format!("unknown variable {:?} in {}", name, func), None)
            })?;
            *name = current.clone();
            Ok(())
        }
        Expr::Binary { left, right, .. } => {
            rename_expr(left, names, func)?;
            rename_expr(right, names, func)
        }
        Expr::Call { args, .. } => {
            for arg in args {
                rename_expr(arg, names, func)?;
            }
            Ok(())
        }
    }
}
