//! RPU Emulator - CLI Entry Point
//!
//! Usage:
//! - `rpu-emu -f <image>` - Run an image, tracing each cycle to stdout
//! - `rpu-emu asm <source>` - Assemble to a raw image
//! - `rpu-emu disasm <image>` - Disassemble an image
//! - `rpu-emu debug -f <image>` - Interactive debugger
//! - `rpu-emu test` - Built-in self-test

use clap::{Args, Parser, Subcommand};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rpu-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "An emulator for the RPU one-bit-accumulator machine")]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args)]
struct RunArgs {
    /// Image file to load
    #[arg(short = 'f', long = "file", required = true)]
    file: Option<PathBuf>,
    /// Maximum number of cycles to run
    #[arg(short, long, default_value = "10000")]
    max_cycles: u64,
    /// Don't print the per-cycle trace
    #[arg(short, long)]
    quiet: bool,
    /// Write the final machine state as JSON to this file
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Image file to debug
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },
    /// Assemble source to a raw image
    Asm {
        /// Path to the source file
        source: PathBuf,
        /// Output image file (default: source with .bin extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Disassemble an image to readable text
    Disasm {
        /// Path to the image file
        image: PathBuf,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "tui")]
        Some(Commands::Debug { file }) => debug_image(&file),
        Some(Commands::Asm { source, output }) => assemble_file(&source, output),
        Some(Commands::Disasm { image }) => disassemble_file(&image),
        Some(Commands::Test) => run_self_test(),
        None => run_image(&cli.run),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_or_exit(path: &Path) -> Vec<u8> {
    match rpu::load_image(path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Could not read file: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_image(args: &RunArgs) {
    use rpu::Rpu;

    // Required by clap when no subcommand is given
    let Some(path) = args.file.as_deref() else {
        eprintln!("❌ No image file given (use -f <FILE>)");
        std::process::exit(2);
    };

    let image = load_or_exit(path);
    let mut rpu = Rpu::new(&image);

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for record in rpu.run(args.max_cycles) {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                let _ = out.flush();
                eprintln!("❌ CPU error: {}", e);
                std::process::exit(1);
            }
        };
        if !args.quiet {
            if let Err(e) = writeln!(out, "{}", record) {
                eprintln!("❌ Failed to write trace: {}", e);
                std::process::exit(1);
            }
        }
    }
    if let Err(e) = out.flush() {
        eprintln!("❌ Failed to write trace: {}", e);
        std::process::exit(1);
    }
    drop(out);

    if rpu.is_running() {
        eprintln!(
            "⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.",
            args.max_cycles
        );
    }

    if let Some(snapshot_path) = &args.snapshot {
        let json = match rpu.snapshot().to_json() {
            Ok(json) => json,
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = std::fs::write(snapshot_path, json) {
            eprintln!("❌ Failed to write snapshot {}: {}", snapshot_path.display(), e);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "tui")]
fn debug_image(path: &Path) {
    let image = load_or_exit(path);

    if let Err(e) = rpu::run_debugger(image) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

fn assemble_file(source_path: &Path, output: Option<PathBuf>) {
    let out_path = output.unwrap_or_else(|| source_path.with_extension("bin"));

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read {}: {}", source_path.display(), e);
            std::process::exit(1);
        }
    };

    let image = match rpu::assemble(&source) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rpu::save_image(&out_path, &image) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Assembled {} bytes → {}", image.len(), out_path.display());
}

fn disassemble_file(image_path: &Path) {
    let image = load_or_exit(image_path);
    print!("{}", rpu::disassemble(&image));
}

fn run_self_test() {
    use rpu::{Bit, Instruction, Memory, Opcode, Rpu, Step};
    use rpu::cpu::decode::{decode, encode};

    println!("━━━ RPU Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, ok: bool| {
        if ok {
            println!("{}... ✓", name);
            passed += 1;
        } else {
            println!("{}... ✗", name);
            failed += 1;
        }
    };

    // Test 1: Decode splits opcode and operand
    let instr = decode([0x85, 0x21]);
    check(
        "Decode opcode/operand fields",
        instr.opcode == Opcode::Store && instr.operand == 0x0521,
    );

    // Test 2: Encode agrees with decode
    let ok = Instruction::load(0x1234)
        .map(|i| decode(encode(&i)) == i)
        .unwrap_or(false);
    check("Encode/decode agreement", ok);

    // Test 3: Bit round-trip leaves neighbours alone
    let mut mem = Memory::new();
    let ok = mem.set_bit(13, Bit::One).is_ok()
        && mem.read_bit(13) == Ok(Bit::One)
        && mem.read_bit(12) == Ok(Bit::Zero)
        && mem.read_byte(1) == Ok(0b0010_0000);
    check("Bit write/read round-trip", ok);

    // Test 4: LOAD then STORE copies a bit
    let mut rpu = Rpu::new(&[0x00, 0x30, 0x80, 0x40]);
    let ok = rpu.mem.set_bit(0x30, Bit::One).is_ok()
        && rpu.run_limited(2).is_ok()
        && rpu.mem.read_bit(0x40) == Ok(Bit::One)
        && rpu.current_ip() == 4;
    check("LOAD/STORE bit copy", ok);

    // Test 5: Fetch past the end halts
    let mut rpu = Rpu::new(&[]);
    let ok = rpu.run_limited(u64::MAX).is_ok()
        && rpu.is_halted()
        && rpu.step() == Ok(Step::Halted);
    check("Halt at end of memory", ok);

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
