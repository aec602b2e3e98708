use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use avm::isa::{decode, encode};
use avm::simulator::{simulate, ExitReason, RunConfig};
use clap::{Parser, Subcommand};

/// Translate accumulator-machine source, and run the resulting bytecode.
#[derive(Parser)]
#[command(name = "avm", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate a source file into bytecode.
    Translate {
        source: PathBuf,
        /// Where to write the encoded bytecode; defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print a disassembly listing instead of writing bytecode.
        #[arg(long)]
        dump: bool,
    },
    /// Run a bytecode file on the VM.
    Run {
        program: PathBuf,
        /// Bytes to feed to `IN` instructions; defaults to stdin.
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long, default_value_t = avm::constants::DEFAULT_MEMORY_CAPACITY)]
        memory: usize,
        #[arg(short = 'l', long, default_value_t = avm::constants::DEFAULT_INSTRUCTION_LIMIT)]
        instr_limit: u64,
    },
    /// Translate and run a source file in one step.
    Exec {
        source: PathBuf,
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long, default_value_t = avm::constants::DEFAULT_MEMORY_CAPACITY)]
        memory: usize,
        #[arg(short = 'l', long, default_value_t = avm::constants::DEFAULT_INSTRUCTION_LIMIT)]
        instr_limit: u64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Translate { source, output, dump } => translate_cmd(&source, output.as_deref(), dump),
        Command::Run {
            program,
            input,
            memory,
            instr_limit,
        } => {
            let bytes = fs::read(&program).with_context(|| format!("reading {}", program.display()))?;
            let (instructions, data) = decode(&bytes).context("decoding bytecode")?;
            run_and_report(instructions, &data, input.as_deref(), memory, instr_limit)
        }
        Command::Exec {
            source,
            input,
            memory,
            instr_limit,
        } => {
            let code = fs::read_to_string(&source).with_context(|| format!("reading {}", source.display()))?;
            let (instructions, data) = avmc::translate(&code).context("translating source")?;
            run_and_report(instructions, &data, input.as_deref(), memory, instr_limit)
        }
    }
}

fn translate_cmd(source: &PathBuf, output: Option<&std::path::Path>, dump: bool) -> Result<()> {
    let code = fs::read_to_string(source).with_context(|| format!("reading {}", source.display()))?;
    let (instructions, data) = avmc::translate(&code).context("translating source")?;

    if dump {
        println!("~~~~~ INSTRUCTIONS ~~~~~");
        for (addr, instr) in instructions.iter().enumerate() {
            println!("{addr:>5}  {instr}");
        }
        println!("~~~~~ MEMORY ~~~~~");
        for (addr, word) in data.iter().enumerate() {
            println!("{addr:>5}  {word}");
        }
        eprintln!(
            "source: {} lines, {} instructions, {} data words",
            code.lines().count(),
            instructions.len(),
            data.len()
        );
        return Ok(());
    }

    let bytes = encode(&instructions, &data);
    match output {
        Some(path) => fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?,
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&bytes)?;
        }
    }
    eprintln!(
        "source: {} lines, {} instructions, {} bytes",
        code.lines().count(),
        instructions.len(),
        bytes.len()
    );
    Ok(())
}

fn run_and_report(
    instructions: Vec<avm::isa::Instruction>,
    data: &[i32],
    input_path: Option<&std::path::Path>,
    memory: usize,
    instr_limit: u64,
) -> Result<()> {
    let input = match input_path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };

    let outcome = simulate(
        instructions,
        data,
        &input,
        RunConfig {
            memory_capacity: memory,
            instr_limit,
        },
    );

    print!("{}", outcome.output);
    eprintln!(
        "instr executed: {}  ticks: {}  reason: {:?}",
        outcome.instructions_executed, outcome.ticks, outcome.reason
    );

    match outcome.reason {
        ExitReason::Halted => Ok(()),
        ExitReason::InputExhausted => anyhow::bail!("ran out of input"),
        ExitReason::LimitReached => anyhow::bail!("exceeded instruction limit"),
        ExitReason::Fault(err) => anyhow::bail!("VM fault: {err}"),
    }
}
