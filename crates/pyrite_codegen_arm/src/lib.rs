//! AArch64 codegen for Pyrite: assembles the fixed text-section preamble,
//! one fragment per function, and the symbols postamble. Two lowering
//! strategies share the emission primitives in `emit`: `from_ast` walks the
//! structured tree directly, `from_cfg` consumes a basic-block graph.

mod emit;
mod from_ast;
mod from_cfg;

pub use emit::MAX_CALL_ARGS;

use pyrite_syntax::ast::Module;
use pyrite_syntax::cfg::CfgProgram;
use pyrite_syntax::diagnostics::Diagnostic;

/// Target triple and build metadata. Handed to the platform assembler as-is.
pub const TEXT_PREAMBLE: &str =
    "\n\t.section\t__TEXT,__text,regular,pure_instructions\n\t.build_version macos, 14, 0\tsdk_version 14, 2\n";

pub const SYMBOLS_POSTAMBLE: &str = "\n.subsections_via_symbols\n";

/// Emit a whole module with the direct AST-walking backend.
pub fn emit_program(module: &Module) -> Result<String, Diagnostic> {
    let mut fragments = Vec::new();
    for func in &module.funcs {
        fragments.push(from_ast::emit_function(func)?);
    }
    Ok(assemble(&fragments))
}

/// Emit a whole program of block graphs with the block-wise backend.
pub fn emit_cfg_program(program: &CfgProgram) -> Result<String, Diagnostic> {
    let mut fragments = Vec::new();
    for func in &program.funcs {
        fragments.push(from_cfg::emit_function(func)?);
    }
    Ok(assemble(&fragments))
}

fn assemble(fragments: &[String]) -> String {
    format!("{}{}{}", TEXT_PREAMBLE, fragments.join("\n"), SYMBOLS_POSTAMBLE)
}
