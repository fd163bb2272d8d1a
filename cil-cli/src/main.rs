mod method_file;

use std::path::{Path, PathBuf};

use cil_ir::{MethodInfo, OperationInfo};
use cil_isa::{IlIterator, Instruction, OperandKind};
use cil_jit::{JitError, JumpTargets, Listing, OperationProcessor, compile_method};
use clap::{Parser, Subcommand};
use method_file::MethodFile;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[cfg(target_env = "msvc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "cil", about = "CIL symbolic executor and type inference front end")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Disassemble method bodies
    Disasm {
        /// Path to the YAML method file
        input: PathBuf,
        /// Only this method
        #[arg(short, long)]
        method: Option<String>,
    },
    /// List resolved jump targets
    Targets {
        /// Path to the YAML method file
        input: PathBuf,
        #[arg(short, long)]
        method: Option<String>,
    },
    /// Symbolically execute methods and print the typed operations
    Trace {
        /// Path to the YAML method file
        input: PathBuf,
        #[arg(short, long)]
        method: Option<String>,
        /// One line per operation instead of a block listing
        #[arg(long)]
        flat: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Disasm { input, method } => cmd_disasm(&input, method.as_deref()),
        Commands::Targets { input, method } => cmd_targets(&input, method.as_deref()),
        Commands::Trace {
            input,
            method,
            flat,
        } => cmd_trace(&input, method.as_deref(), flat),
    }
}

fn load(path: &Path) -> MethodFile {
    match MethodFile::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn selected<'a>(
    file: &'a MethodFile,
    only: Option<&'a str>,
) -> impl Iterator<Item = &'a MethodInfo> {
    let methods = file
        .methods
        .iter()
        .filter(move |m| only.is_none_or(|name| m.name == name));
    if let Some(name) = only {
        if !file.methods.iter().any(|m| m.name == name) {
            log::warn!("no method named {name}");
        }
    }
    methods
}

fn signature(method: &MethodInfo) -> String {
    let params: Vec<String> = method.parameters.iter().map(|p| p.ty.to_string()).collect();
    let ret = method.return_type.map_or("void".to_string(), |t| t.to_string());
    format!("{}({}) -> {ret}", method.name, params.join(", "))
}

fn immediate_text(insn: &Instruction<'_>) -> String {
    match insn.operand_kind() {
        OperandKind::None => String::new(),
        OperandKind::ShortInlineR | OperandKind::InlineR => {
            insn.float_param().map_or_else(String::new, |v| format!(" {v}"))
        }
        OperandKind::ShortInlineBrTarget
        | OperandKind::InlineBrTarget
        | OperandKind::InlineSwitch => {
            let targets: Vec<String> = insn
                .branch_targets()
                .iter()
                .map(|t| format!("IL_{t:04x}"))
                .collect();
            format!(" {}", targets.join(", "))
        }
        OperandKind::InlineTok
        | OperandKind::InlineField
        | OperandKind::InlineMethod
        | OperandKind::InlineType
        | OperandKind::InlineString
        | OperandKind::InlineSig => insn
            .int_param()
            .map_or_else(String::new, |v| format!(" {v:#010x}")),
        _ => insn.int_param().map_or_else(String::new, |v| format!(" {v}")),
    }
}

fn cmd_disasm(path: &Path, only: Option<&str>) {
    let file = load(path);
    for method in selected(&file, only) {
        println!("# {}", signature(method));
        for item in IlIterator::new(&method.body) {
            match item {
                Ok(insn) => println!(
                    "  IL_{:04x}: {}{}",
                    insn.offset(),
                    insn.mnemonic(),
                    immediate_text(&insn)
                ),
                Err(e) => {
                    eprintln!("  # Error: {e}");
                    break;
                }
            }
        }
        println!();
    }
}

fn cmd_targets(path: &Path, only: Option<&str>) {
    let file = load(path);
    for method in selected(&file, only) {
        println!("# {}", signature(method));
        let targets = cil_isa::decode(&method.body)
            .map_err(JitError::from)
            .and_then(|insns| JumpTargets::resolve(&insns));
        match targets {
            Ok(targets) => {
                for (offset, index) in targets.iter() {
                    println!("  IL_{offset:04x} -> BB_{index}");
                }
            }
            Err(e) => eprintln!("  # Error ({:?}): {e}", e.kind()),
        }
        println!();
    }
}

/// Prints each operation as soon as it arrives.
struct FlatPrinter;

impl OperationProcessor for FlatPrinter {
    fn process(&mut self, op: OperationInfo) {
        let marker = if op.jump_target { ">" } else { " " };
        println!("{marker}{:4}  {op}", op.index);
    }
}

fn cmd_trace(path: &Path, only: Option<&str>, flat: bool) {
    let file = load(path);
    let mut failed = false;
    for method in selected(&file, only) {
        println!("# {}", signature(method));
        let outcome = if flat {
            compile_method(method, &file.fields, &mut FlatPrinter)
        } else {
            let mut listing = Listing::new();
            let outcome = compile_method(method, &file.fields, &mut listing);
            print!("{}", listing.finish());
            outcome
        };
        if let Err(e) = outcome {
            eprintln!("  # Error ({:?}): {e}", e.kind());
            failed = true;
        }
        println!();
    }
    if failed {
        std::process::exit(1);
    }
}
