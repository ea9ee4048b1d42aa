//! Pyrite CLI: new, build, run.
//!
//! The CLI is the driver half of the compiler's contract: the compiler turns
//! a source path into assembly text and nothing else; writing the `.S`,
//! invoking the platform assembler/linker, and executing the result all
//! happen here.

mod manifest;

use clap::{Parser, Subcommand};
use pyrite_compiler::{print_diagnostics, Backend};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
#[command(name = "pyrite")]
#[command(about = "Pyrite compiler toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new Pyrite project
    New { name: String },
    /// Compile a source file to dist/<name>.S
    Build {
        #[arg(long, default_value = "ast")]
        backend: String,
        path: PathBuf,
    },
    /// Compile, assemble with the host C toolchain, and run
    Run {
        #[arg(long, default_value = "ast")]
        backend: String,
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::New { name } => cmd_new(&name),
        Commands::Build { backend, path } => {
            cmd_build(parse_backend(&backend)?, &path).map(|_| ())
        }
        Commands::Run { backend, path } => cmd_run(parse_backend(&backend)?, &path),
    }
}

fn parse_backend(name: &str) -> Result<Backend, String> {
    match name {
        "ast" => Ok(Backend::Ast),
        "cfg" => Ok(Backend::Cfg),
        _ => Err(format!("unknown backend {:?} (expected ast or cfg)", name)),
    }
}

fn cmd_new(name: &str) -> Result<(), String> {
    let dir = PathBuf::from(name);
    if dir.exists() {
        return Err(format!("Directory already exists: {}", name));
    }
    std::fs::create_dir_all(&dir).map_err(|e| e.to_string())?;
    let manifest = format!("name = \"{}\"\nversion = \"0.1.0\"\n", name);
    std::fs::write(dir.join("pyrite.toml"), manifest).map_err(|e| e.to_string())?;
    let main_pyr = "def main():\n  return 0\n";
    std::fs::write(dir.join("main.pyr"), main_pyr).map_err(|e| e.to_string())?;
    println!("Created project {}", name);
    Ok(())
}

/// Resolve the source file to compile and the project root (directory whose
/// dist/ receives output) for a path that may be a file or a project dir.
fn resolve_compile_and_project(path: &Path) -> Result<(PathBuf, PathBuf), String> {
    let path = path.canonicalize().map_err(|e| e.to_string())?;
    if path.is_dir() {
        let main_path = path.join("main.pyr");
        if !main_path.exists() {
            return Err("No main.pyr found in directory".into());
        }
        Ok((main_path, path))
    } else if path.extension().map(|e| e == "pyr").unwrap_or(false) {
        let project_root = manifest::find_package_root(&path)
            .unwrap_or_else(|| path.parent().unwrap_or(Path::new(".")).to_path_buf());
        Ok((path.clone(), project_root))
    } else {
        Err("Expected .pyr file or project directory".into())
    }
}

/// Output name: the manifest's package name when there is one, else the
/// source file stem.
fn output_stem(compile_path: &Path, project_root: &Path) -> String {
    if let Ok(m) = manifest::load_manifest(&project_root.join("pyrite.toml")) {
        return m.name;
    }
    compile_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string())
}

fn cmd_build(backend: Backend, path: &Path) -> Result<PathBuf, String> {
    let (compile_path, project_root) = resolve_compile_and_project(path)?;
    let out_path = project_root
        .join("dist")
        .join(format!("{}.S", output_stem(&compile_path, &project_root)));

    let source_for_diags = std::fs::read_to_string(&compile_path).unwrap_or_default();
    let asm = pyrite_compiler::compile_file_with(&compile_path, backend).map_err(|diags| {
        print_diagnostics(&source_for_diags, &compile_path.to_string_lossy(), &diags);
        "Compilation failed".to_string()
    })?;

    std::fs::create_dir_all(out_path.parent().unwrap()).map_err(|e| e.to_string())?;
    std::fs::write(&out_path, asm).map_err(|e| e.to_string())?;
    println!("Wrote {}", out_path.display());
    Ok(out_path)
}

fn cmd_run(backend: Backend, path: &Path) -> Result<(), String> {
    let asm_path = cmd_build(backend, path)?;
    let bin_path = asm_path.with_extension("");

    let cc = which::which("cc").map_err(|_| {
        "A C toolchain is required to assemble and link Pyrite output".to_string()
    })?;
    let status = Command::new(&cc)
        .arg(&asm_path)
        .arg("-o")
        .arg(&bin_path)
        .status()
        .map_err(|e| e.to_string())?;
    if !status.success() {
        return Err(format!("assembler/linker exited with {}", status));
    }

    let status = Command::new(&bin_path).status().map_err(|e| e.to_string())?;
    match status.code() {
        Some(code) => println!("exit status: {}", code),
        None => println!("terminated by signal"),
    }
    Ok(())
}
