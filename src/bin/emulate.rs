use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap_num::maybe_hex;

use rv32i_sim::elf_utils::load_elf;
use rv32i_sim::machine::Machine;
use rv32i_sim::memory::{MemoryPort, SparseMemory, Wordsize};
use rv32i_sim::registers::Xlen;

/// Emulate a 32-bit RISC-V (RV32I) processor.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the input ELF executable.
    input: PathBuf,

    /// Single-step through each instruction, printing state between steps.
    #[arg(short, long)]
    debug: bool,

    /// Break on PC match and begin debug stepping (0x prefix for hex).
    #[arg(short, long, value_parser=maybe_hex::<u32>)]
    pc_breakpoint: Option<u32>,

    /// Break on instret match and begin debug stepping (0x prefix for hex).
    #[arg(short = 'c', long, value_parser=maybe_hex::<u64>)]
    instret_breakpoint: Option<u64>,

    /// Exit with a nonzero status if a trap occurs, instead of just logging it.
    #[arg(short, long)]
    trap_is_error: bool,

    /// Print the 8-word memory region starting from this address while
    /// debug stepping (0x prefix for hex).
    #[arg(short, long, value_parser=maybe_hex::<u32>)]
    memory: Option<u32>,
}

fn press_enter_to_continue() {
    let mut stdout = io::stdout();
    write!(stdout, "Press enter to continue...").unwrap();
    stdout.flush().unwrap();
    let _ = io::stdin().read(&mut [0u8]).unwrap();
}

fn print_memory(mem: &impl MemoryPort, base: u32) {
    for n in 0..8 {
        let addr = base.wrapping_add(4 * n);
        let word = mem.read(u64::from(addr), Wordsize::Word).unwrap();
        println!("{addr:x}: {word:x}");
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut mem = SparseMemory::new();
    let entry = match load_elf(&mut mem, &args.input) {
        Ok(entry) => entry,
        Err(e) => {
            log::error!("failed to load {}: {e}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    let mut machine = Machine::new(mem, entry, Xlen::Xlen32);
    let mut stepping = args.debug;

    loop {
        if let Some(pc_breakpoint) = args.pc_breakpoint {
            if machine.pc_get() == pc_breakpoint {
                stepping = true;
            }
        }
        if let Some(instret_breakpoint) = args.instret_breakpoint {
            if machine.instret == instret_breakpoint {
                stepping = true;
            }
        }

        if machine.step().is_err() {
            if args.trap_is_error {
                return ExitCode::FAILURE;
            }
            return ExitCode::SUCCESS;
        }

        if !machine.running {
            break;
        }

        if stepping {
            if let Some(base) = args.memory {
                println!("Memory:");
                print_memory(&machine.mem, base);
            }
            press_enter_to_continue();
        }
    }

    ExitCode::SUCCESS
}
