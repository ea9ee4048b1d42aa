//! Pyrite compiler: line reader, parser, CFG builder, SSA renamer, pipeline.
//!
//! One invocation compiles one file to one assembly-text string, or stops at
//! the first fatal diagnostic. The compiler never writes files and never
//! spawns processes; that is the driver's job.

pub mod cfg;
pub mod parser;
pub mod reader;
pub mod ssa;

use pyrite_syntax::diagnostics::{format_diagnostic, Diagnostic};
use std::path::Path;

/// Which lowering strategy drives the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Walk the structured AST directly (the default).
    #[default]
    Ast,
    /// Lower through basic blocks, then emit one label per block.
    Cfg,
}

/// Print diagnostics to stderr with source context.
pub fn print_diagnostics(source: &str, filename: &str, diags: &[Diagnostic]) {
    for d in diags {
        eprintln!("{}", format_diagnostic(source, filename, d));
    }
}

/// Compile a single source file to assembly text.
pub fn compile_file(path: &Path) -> Result<String, Vec<Diagnostic>> {
    compile_file_with(path, Backend::Ast)
}

pub fn compile_file_with(path: &Path, backend: Backend) -> Result<String, Vec<Diagnostic>> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        vec![Diagnostic::error(
            format!("failed to read {}: {}", path.display(), e),
            None,
        )]
    })?;
    let filename = path.to_string_lossy();
    compile_source_with(&filename, &source, backend)
}

/// Compile source text to assembly text. Unknown top-level lines are
/// reported to stderr and skipped; everything else fatal stops compilation.
pub fn compile_source(filename: &str, source: &str) -> Result<String, Vec<Diagnostic>> {
    compile_source_with(filename, source, Backend::Ast)
}

pub fn compile_source_with(
    filename: &str,
    source: &str,
    backend: Backend,
) -> Result<String, Vec<Diagnostic>> {
    let parsed = parser::parse(filename, source).map_err(|d| vec![d])?;
    print_diagnostics(source, filename, &parsed.warnings);

    let debug = std::env::var("PYRITE_DEBUG").is_ok();
    if debug {
        eprintln!(
            "[PYRITE_DEBUG] parsed {} function(s) from {}",
            parsed.module.funcs.len(),
            filename
        );
        eprintln!("[PYRITE_DEBUG] ast: {:#?}", parsed.module);
    }

    match backend {
        Backend::Ast => pyrite_codegen_arm::emit_program(&parsed.module).map_err(|d| vec![d]),
        Backend::Cfg => {
            let program = cfg::build_program(&parsed.module);
            if debug {
                eprintln!("[PYRITE_DEBUG] cfg: {:#?}", program);
                // the renamer is a forward-path pass; dump what it produces
                // but emit from the un-renamed graph (no phi merge yet)
                let mut renamed = program.clone();
                match ssa::rename_program(&mut renamed) {
                    Ok(()) => eprintln!("[PYRITE_DEBUG] ssa: {:#?}", renamed),
                    Err(e) => eprintln!("[PYRITE_DEBUG] ssa failed: {}", e),
                }
            }
            pyrite_codegen_arm::emit_cfg_program(&program).map_err(|d| vec![d])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUM: &str = "def fn(a, b):\n  return a + b\n";
    const LOOP: &str = "def fn():\n  x = 1\n  while x < 5:\n    x = x + 1\n  return x\n";
    const MAX: &str = "def max(a, b):\n  if a > b:\n    r = a\n  else:\n    r = b\n  return r\n";

    #[test]
    fn sum_compiles_to_an_add_over_both_parameters() {
        let asm = compile_source("sum.pyr", SUM).expect("compile");
        assert!(asm.contains("_fn:"));
        assert!(asm.contains("push x0"));
        assert!(asm.contains("push x1"));
        assert!(asm.contains("add\tx9, x9, x10"));
        assert!(asm.contains(".subsections_via_symbols"));
    }

    #[test]
    fn loop_compiles_with_comparison_and_back_branch() {
        let asm = compile_source("loop.pyr", LOOP).expect("compile");
        assert!(asm.contains("cset\tx9, lt"));
        assert!(asm.contains("\tb\tL_fn_0"), "back edge to the loop head");
    }

    #[test]
    fn ifelse_compiles_both_arms() {
        let asm = compile_source("max.pyr", MAX).expect("compile");
        assert!(asm.contains("cset\tx9, gt"));
        assert!(asm.contains("b.eq\tL_max_0"));
        assert_eq!(asm.matches("str\tx9, [x29, #-8]").count(), 2, "both arms store r");
    }

    #[test]
    fn both_backends_accept_the_same_programs() {
        for src in [SUM, LOOP, MAX] {
            let direct = compile_source_with("t.pyr", src, Backend::Ast).expect("ast backend");
            let blocks = compile_source_with("t.pyr", src, Backend::Cfg).expect("cfg backend");
            for needle in ["stp\tx29, x30", "ret", ".subsections_via_symbols"] {
                assert!(direct.contains(needle));
                assert!(blocks.contains(needle));
            }
        }
    }

    #[test]
    fn cfg_backend_emits_block_labels() {
        let asm = compile_source_with("loop.pyr", LOOP, Backend::Cfg).expect("compile");
        assert!(asm.contains("L_fn_bb0:"));
        assert!(asm.contains("b.ne\tL_fn_bb2"));
    }

    #[test]
    fn five_argument_call_is_fatal() {
        let src = "def f(a):\n  return g(1, 2, 3, 4, 5)\n";
        let errs = compile_source("f.pyr", src).unwrap_err();
        assert!(errs[0].message.contains("5 arguments"));
    }

    #[test]
    fn missing_return_is_fatal() {
        let src = "def f(a):\n  x = a\n";
        let errs = compile_source("f.pyr", src).unwrap_err();
        assert!(errs[0].message.contains("no return statement"));
    }

    #[test]
    fn undeclared_variable_is_fatal() {
        let src = "def f(a):\n  return ghost\n";
        let errs = compile_source("f.pyr", src).unwrap_err();
        assert!(errs[0].message.contains("unknown variable"));
    }

    #[test]
    fn parameter_reassignment_is_fatal() {
        let src = "def f(a):\n  a = 1\n  return a\n";
        let errs = compile_source("f.pyr", src).unwrap_err();
        assert!(errs[0].message.contains("cannot reassign parameter"));
    }

    #[test]
    fn two_functions_emit_two_symbols() {
        let src = "def one():\n  return 1\ndef two():\n  return 2\n";
        let asm = compile_source("two.pyr", src).expect("compile");
        assert!(asm.contains("_one:"));
        assert!(asm.contains("_two:"));
        assert_eq!(asm.matches(".p2align").count(), 2);
    }
}
