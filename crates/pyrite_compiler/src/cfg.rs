//! CFG builder: rewrites structured control flow into basic blocks joined by
//! explicit branch terminators.
//!
//! Block ids are dense, strictly increasing, and never reused; block 0 is the
//! entry. Every construct leaves a freshly allocated `end` block as the
//! current block, so callers keep appending sibling statements without
//! inspecting the construct's internals.

use pyrite_syntax::ast::{Expr, FnDecl, Module, Stmt};
use pyrite_syntax::cfg::{BasicBlock, BlockId, BlockStmt, CfgFunction, CfgProgram, Terminator};

/// Lower every function of a module to a block graph.
pub fn build_program(module: &Module) -> CfgProgram {
    CfgProgram {
        funcs: module.funcs.iter().map(build_function).collect(),
    }
}

/// Lower one function. The trailing block may be left open (no terminator);
/// nothing branches from it.
pub fn build_function(func: &FnDecl) -> CfgFunction {
    let mut builder = Builder {
        blocks: vec![BasicBlock::new(BlockId(0))],
    };
    builder.lower_stmts(&func.body);
    CfgFunction {
        name: func.name.clone(),
        params: func.params.clone(),
        blocks: builder.blocks,
    }
}

struct Builder {
    blocks: Vec<BasicBlock>,
}

impl Builder {
    fn add_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock::new(id));
        id
    }

    /// The most recently allocated block; statements append here.
    fn current(&self) -> BlockId {
        BlockId(self.blocks.len() - 1)
    }

    fn push_stmt(&mut self, stmt: BlockStmt) {
        self.blocks.last_mut().unwrap().stmts.push(stmt);
    }

    /// Close `from` with a terminator and record its successor edges.
    fn close(&mut self, from: BlockId, term: Terminator) {
        let succs = match &term {
            Terminator::Br { target } => vec![*target],
            Terminator::Cbr { yes, no, .. } => vec![*yes, *no],
        };
        let block = &mut self.blocks[from.0];
        debug_assert!(block.term.is_none(), "block {} already terminated", from);
        block.term = Some(term);
        block.after.extend(succs);
    }

    /// Lower a statement run; returns the final (possibly open) block.
    fn lower_stmts(&mut self, stmts: &[Stmt]) -> BlockId {
        for stmt in stmts {
            match stmt {
                Stmt::Assign { target, value, .. } => self.push_stmt(BlockStmt::Assign {
                    target: target.clone(),
                    value: value.clone(),
                }),
                Stmt::Return { value, .. } => self.push_stmt(BlockStmt::Return {
                    value: value.clone(),
                }),
                Stmt::If { cond, body, .. } => {
                    let prior = self.current();
                    self.lower_if(cond, body, prior);
                }
                Stmt::IfElse {
                    cond,
                    then_body,
                    else_body,
                    ..
                } => {
                    let prior = self.current();
                    self.lower_ifelse(cond, then_body, else_body, prior);
                }
                Stmt::While { cond, body, .. } => {
                    let prior = self.current();
                    self.lower_while(cond, body, prior);
                }
            }
        }
        self.current()
    }

    fn lower_if(&mut self, cond: &Expr, body: &[Stmt], prior: BlockId) -> BlockId {
        let condition = self.add_block();
        let then = self.add_block();
        let body_final = self.lower_stmts(body);
        let end = self.add_block();

        self.close(prior, Terminator::Br { target: condition });
        self.close(
            condition,
            Terminator::Cbr {
                cond: cond.clone(),
                yes: then,
                no: end,
            },
        );
        self.close(body_final, Terminator::Br { target: end });
        end
    }

    fn lower_ifelse(
        &mut self,
        cond: &Expr,
        then_body: &[Stmt],
        else_body: &[Stmt],
        prior: BlockId,
    ) -> BlockId {
        let condition = self.add_block();
        let then = self.add_block();
        let then_final = self.lower_stmts(then_body);
        let else_ = self.add_block();
        let else_final = self.lower_stmts(else_body);
        let end = self.add_block();

        self.close(prior, Terminator::Br { target: condition });
        self.close(
            condition,
            Terminator::Cbr {
                cond: cond.clone(),
                yes: then,
                no: else_,
            },
        );
        self.close(then_final, Terminator::Br { target: end });
        self.close(else_final, Terminator::Br { target: end });
        end
    }

    fn lower_while(&mut self, cond: &Expr, body: &[Stmt], prior: BlockId) -> BlockId {
        let condition = self.add_block();
        let then = self.add_block();
        let body_final = self.lower_stmts(body);
        let end = self.add_block();

        self.close(prior, Terminator::Br { target: condition });
        // back edge: the loop body re-tests the condition
        self.close(body_final, Terminator::Br { target: condition });
        self.close(
            condition,
            Terminator::Cbr {
                cond: cond.clone(),
                yes: then,
                no: end,
            },
        );
        end
    }
}
