//! Block-wise backend: consumes a basic-block graph and emits one label per
//! block and one branch sequence per terminator. Behaviorally equivalent to
//! the direct backend for the supported language; the forward path for any
//! later block-level transforms.

use crate::emit::FnEmitter;
use pyrite_syntax::cfg::{BlockId, BlockStmt, CfgFunction, Terminator};
use pyrite_syntax::diagnostics::Diagnostic;
use std::collections::HashSet;

/// Emit one function's assembly fragment from its block graph.
pub fn emit_function(func: &CfgFunction) -> Result<String, Diagnostic> {
    let local_count = count_locals(func);
    let mut e = FnEmitter::new(&func.name, &func.params, local_count);
    e.prologue();
    for block in &func.blocks {
        e.place_label(&block_label(&func.name, block.id));
        for stmt in &block.stmts {
            match stmt {
                BlockStmt::Assign { target, value } => e.emit_assign(target, value)?,
                BlockStmt::Return { value } => e.emit_return(value)?,
            }
        }
        match &block.term {
            Some(Terminator::Br { target }) => e.branch(&block_label(&func.name, *target)),
            Some(Terminator::Cbr { cond, yes, no }) => {
                e.emit_expr(cond)?;
                e.branch_if_true(&block_label(&func.name, *yes));
                e.branch(&block_label(&func.name, *no));
            }
            // an open trailing block falls through
            None => {}
        }
    }
    e.finish()
}

fn block_label(func_name: &str, id: BlockId) -> String {
    format!("L_{}_{}", func_name, id)
}

/// Distinct assignment targets across all blocks, parameters excluded.
fn count_locals(func: &CfgFunction) -> usize {
    let mut names: HashSet<&str> = HashSet::new();
    for block in &func.blocks {
        for stmt in &block.stmts {
            if let BlockStmt::Assign { target, .. } = stmt {
                if !func.params.iter().any(|p| p == target) {
                    names.insert(target.as_str());
                }
            }
        }
    }
    names.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyrite_syntax::ast::{BinOp, Expr};
    use pyrite_syntax::cfg::BasicBlock;

    fn binop(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Hand-built block graph for: x = 1; while x < 5: x = x + 1; return x
    fn loop_function() -> CfgFunction {
        let mut entry = BasicBlock::new(BlockId(0));
        entry.stmts.push(BlockStmt::Assign {
            target: "x".into(),
            value: Expr::Int(1),
        });
        entry.term = Some(Terminator::Br { target: BlockId(1) });
        entry.after.push(BlockId(1));

        let mut cond = BasicBlock::new(BlockId(1));
        cond.term = Some(Terminator::Cbr {
            cond: binop(BinOp::Lt, Expr::Var("x".into()), Expr::Int(5)),
            yes: BlockId(2),
            no: BlockId(3),
        });
        cond.after.extend([BlockId(2), BlockId(3)]);

        let mut body = BasicBlock::new(BlockId(2));
        body.stmts.push(BlockStmt::Assign {
            target: "x".into(),
            value: binop(BinOp::Add, Expr::Var("x".into()), Expr::Int(1)),
        });
        body.term = Some(Terminator::Br { target: BlockId(1) });
        body.after.push(BlockId(1));

        let mut end = BasicBlock::new(BlockId(3));
        end.stmts.push(BlockStmt::Return {
            value: Expr::Var("x".into()),
        });

        CfgFunction {
            name: "count".into(),
            params: Vec::new(),
            blocks: vec![entry, cond, body, end],
        }
    }

    #[test]
    fn every_block_gets_a_label() {
        let asm = emit_function(&loop_function()).expect("emit");
        for bb in ["bb0", "bb1", "bb2", "bb3"] {
            assert!(
                asm.contains(&format!("L_count_{}:", bb)),
                "missing label for {}",
                bb
            );
        }
    }

    #[test]
    fn br_lowers_to_one_unconditional_branch() {
        let asm = emit_function(&loop_function()).expect("emit");
        assert!(asm.contains("\tb\tL_count_bb1"), "entry and back edge");
    }

    #[test]
    fn cbr_lowers_to_test_plus_two_branches() {
        let asm = emit_function(&loop_function()).expect("emit");
        assert!(asm.contains("b.ne\tL_count_bb2"), "true target");
        assert!(asm.contains("\tb\tL_count_bb3"), "false target");
        assert!(asm.contains("cset\tx9, lt"));
    }

    #[test]
    fn open_trailing_block_falls_through_to_epilogue() {
        let asm = emit_function(&loop_function()).expect("emit");
        let bb3 = asm.find("L_count_bb3:").expect("bb3 label");
        let epi = asm.find("L_count_epilogue:").expect("epilogue");
        assert!(bb3 < epi, "the open block precedes the epilogue");
    }

    #[test]
    fn graph_without_return_is_fatal() {
        let mut f = loop_function();
        f.blocks[3].stmts.clear();
        let err = emit_function(&f).unwrap_err();
        assert!(err.message.contains("no return statement"));
    }
}
