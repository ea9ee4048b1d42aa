//! Shared AArch64 emission primitives: frame management, the memory-backed
//! operand stack, label allocation, and expression lowering. Both lowering
//! strategies (direct AST walk and block-wise) drive this emitter.
//!
//! Evaluation is a stack machine: every expression pushes its result as one
//! 16-byte slot and every consumer pops into a scratch register right before
//! use, so no value is assumed to survive in a register across a nested
//! evaluation. Scratch registers are x9/x10; x0-x3 carry call arguments and
//! x0 the return value.

use pyrite_syntax::ast::{BinOp, Expr};
use pyrite_syntax::diagnostics::Diagnostic;
use std::collections::HashMap;

/// The calling convention maps the first four integer arguments to x0-x3;
/// calls with more arguments are rejected.
pub const MAX_CALL_ARGS: usize = 4;

/// Where a variable lives.
enum VarPlace {
    /// Parameter i sits in register x<i> for the whole function.
    Param(usize),
    /// Local slot n lives at [x29, #-8*(n+1)].
    Local(usize),
}

/// Per-function emission state: owned exclusively for the duration of one
/// function's emission and discarded when its text is complete.
pub struct FnEmitter {
    name: String,
    params: Vec<String>,
    locals: HashMap<String, usize>,
    frame_size: usize,
    depth: usize,
    next_label: u32,
    found_return: bool,
    asm: String,
}

impl FnEmitter {
    /// `local_count` is the number of distinct local slots the body will
    /// bind; the frame reservation is fixed in the prologue.
    pub fn new(name: &str, params: &[String], local_count: usize) -> Self {
        Self {
            name: name.to_string(),
            params: params.to_vec(),
            locals: HashMap::new(),
            frame_size: (8 * local_count + 15) / 16 * 16,
            depth: 0,
            next_label: 0,
            found_return: false,
            asm: String::new(),
        }
    }

    /// Current operand-stack depth in slots. Zero once every pushed value
    /// has been consumed.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn epilogue_label(&self) -> String {
        format!("L_{}_epilogue", self.name)
    }

    /// A locally-unique label from the per-function monotonic counter.
    pub fn new_label(&mut self) -> String {
        let n = self.next_label;
        self.next_label += 1;
        format!("L_{}_{}", self.name, n)
    }

    fn line(&mut self, text: &str) {
        self.asm.push_str(text);
        self.asm.push('\n');
    }

    /// Global symbol, alignment, entry label, frame setup.
    pub fn prologue(&mut self) {
        self.line(&format!(
            "\t.globl\t_{}                           ; -- Begin function {}",
            self.name, self.name
        ));
        self.line("\t.p2align\t2");
        self.line(&format!("_{}:", self.name));
        self.line("\tsub\tsp, sp, #16");
        self.line("\tstp\tx29, x30, [sp]             ; 16-byte Folded Spill");
        self.line("\tmov\tx29, sp");
        if self.frame_size > 0 {
            self.line(&format!(
                "\tsub\tsp, sp, #{}                 ; local slots",
                self.frame_size
            ));
        }
    }

    /// Verify a return was emitted, place the shared epilogue, and hand the
    /// finished fragment back.
    pub fn finish(mut self) -> Result<String, Diagnostic> {
        if !self.found_return {
            return Err(Diagnostic::error(
                format!("function {} has no return statement", self.name),
                None,
            ));
        }
        let label = self.epilogue_label();
        self.line(&format!("{}:", label));
        self.line("\tmov\tsp, x29");
        self.line("\tldp\tx29, x30, [sp]             ; 16-byte Folded Reload");
        self.line("\tadd\tsp, sp, #16");
        self.line("\tret");
        Ok(self.asm)
    }

    pub fn push_register(&mut self, register: &str) {
        self.line(&format!("\tsub\tsp, sp, #16              ; push {}", register));
        self.line(&format!("\tstr\t{}, [sp]", register));
        self.depth += 1;
    }

    pub fn push_immediate(&mut self, value: i64) {
        self.line(&format!("\tsub\tsp, sp, #16              ; push immediate {}", value));
        self.line(&format!("\tmov\tx9, #{}", value));
        self.line("\tstr\tx9, [sp]");
        self.depth += 1;
    }

    pub fn pop_to_register(&mut self, register: &str) {
        debug_assert!(self.depth > 0, "operand stack underflow");
        self.line(&format!("\tldr\t{}, [sp]                 ; pop to {}", register, register));
        self.line("\tadd\tsp, sp, #16");
        self.depth -= 1;
    }

    pub fn place_label(&mut self, label: &str) {
        self.line(&format!("{}:", label));
    }

    pub fn branch(&mut self, label: &str) {
        self.line(&format!("\tb\t{}", label));
    }

    /// Pop the condition value and branch when it is zero.
    pub fn branch_if_false(&mut self, label: &str) {
        self.pop_to_register("x9");
        self.line("\tcmp\tx9, #0");
        self.line(&format!("\tb.eq\t{}", label));
    }

    /// Pop the condition value and branch when it is non-zero.
    pub fn branch_if_true(&mut self, label: &str) {
        self.pop_to_register("x9");
        self.line("\tcmp\tx9, #0");
        self.line(&format!("\tb.ne\t{}", label));
    }

    fn lookup(&self, name: &str) -> Option<VarPlace> {
        if let Some(i) = self.params.iter().position(|p| p == name) {
            return Some(VarPlace::Param(i));
        }
        self.locals.get(name).copied().map(VarPlace::Local)
    }

    fn slot_offset(slot: usize) -> usize {
        8 * (slot + 1)
    }

    /// Evaluate an expression, leaving its result as the top stack slot.
    pub fn emit_expr(&mut self, expr: &Expr) -> Result<(), Diagnostic> {
        match expr {
            Expr::Int(value) => {
                self.push_immediate(*value);
                Ok(())
            }
            Expr::Var(name) => match self.lookup(name) {
                Some(VarPlace::Param(i)) => {
                    self.push_register(&format!("x{}", i));
                    Ok(())
                }
                Some(VarPlace::Local(slot)) => {
                    let off = Self::slot_offset(slot);
                    self.line(&format!("\tldr\tx9, [x29, #-{}]           ; load {}", off, name));
                    self.push_register("x9");
                    Ok(())
                }
                None => Err(Diagnostic::error(
                    format!("unknown variable {:?} in {}", name, self.name),
                    None,
                )),
            },
            Expr::Binary { op, left, right } => {
                self.emit_expr(left)?;
                self.emit_expr(right)?;
                // right first, then left, preserving source order
                self.pop_to_register("x10");
                self.pop_to_register("x9");
                match op {
                    BinOp::Add => self.line("\tadd\tx9, x9, x10"),
                    BinOp::Sub => self.line("\tsub\tx9, x9, x10"),
                    BinOp::Lt => {
                        self.line("\tcmp\tx9, x10");
                        self.line("\tcset\tx9, lt");
                    }
                    BinOp::Gt => {
                        self.line("\tcmp\tx9, x10");
                        self.line("\tcset\tx9, gt");
                    }
                }
                self.push_register("x9");
                Ok(())
            }
            Expr::Call { callee, args } => {
                if args.len() > MAX_CALL_ARGS {
                    return Err(Diagnostic::error(
                        format!(
                            "call to {} has {} arguments; the calling convention allows {}",
                            callee,
                            args.len(),
                            MAX_CALL_ARGS
                        ),
                        None,
                    ));
                }
                // each argument's evaluation fully drains the operand stack
                // before the next begins, so popping straight into the
                // argument register is safe
                for (i, arg) in args.iter().enumerate() {
                    self.emit_expr(arg)?;
                    self.pop_to_register(&format!("x{}", i));
                }
                self.line(&format!("\tbl\t_{}", callee));
                self.push_register("x0");
                Ok(())
            }
        }
    }

    /// `target = value`. Parameters are not assignable; a new local binds
    /// the next frame slot on its first assignment.
    pub fn emit_assign(&mut self, target: &str, value: &Expr) -> Result<(), Diagnostic> {
        if self.params.iter().any(|p| p == target) {
            return Err(Diagnostic::error(
                format!("cannot reassign parameter {:?} in {}", target, self.name),
                None,
            ));
        }
        self.emit_expr(value)?;
        let slot = match self.locals.get(target) {
            Some(slot) => *slot,
            None => {
                let slot = self.locals.len();
                debug_assert!(Self::slot_offset(slot) <= self.frame_size);
                self.locals.insert(target.to_string(), slot);
                slot
            }
        };
        self.pop_to_register("x9");
        let off = Self::slot_offset(slot);
        self.line(&format!("\tstr\tx9, [x29, #-{}]           ; store {}", off, target));
        Ok(())
    }

    /// `return value`: pop into the return register and take the single exit.
    pub fn emit_return(&mut self, value: &Expr) -> Result<(), Diagnostic> {
        self.emit_expr(value)?;
        self.pop_to_register("x0");
        let label = self.epilogue_label();
        self.branch(&label);
        self.found_return = true;
        Ok(())
    }

    /// The emitted text so far (tests only; `finish` is the real exit).
    #[cfg(test)]
    pub fn asm(&self) -> &str {
        &self.asm
    }
}
