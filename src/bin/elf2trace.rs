use std::path::PathBuf;

use clap::Parser;
use elf::endian::AnyEndian;
use elf::ElfBytes;

use rv32i_sim::decode;
use rv32i_sim::instr::InstrWord;

/// Disassemble the `.text` section of an ELF file without executing it.
///
/// Useful for checking the decoder against a real compiled program:
/// each 32-bit word of `.text` is printed next to the [`decode::Op`]
/// it resolves to, or the decode error if it doesn't.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to input ELF file.
    #[arg(short, long)]
    input: PathBuf,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let file_data = std::fs::read(&args.input).expect("could not read input file");
    let file = ElfBytes::<AnyEndian>::minimal_parse(&file_data).expect("malformed ELF container");

    let text_shdr = file
        .section_header_by_name(".text")
        .expect("section .text should be parseable")
        .expect("file should have a .text section");

    let (data, compression) = file
        .section_data(&text_shdr)
        .expect("valid section data in .text");
    if compression.is_some() {
        panic!("unexpected compression in .text section");
    }

    for (n, chunk) in data.chunks_exact(4).enumerate() {
        let addr = text_shdr.sh_addr as u32 + (n as u32) * 4;
        let word = u32::from_le_bytes(chunk.try_into().unwrap());
        let instr = InstrWord::new(word);
        match decode::decode(instr) {
            Ok(op) => println!("{addr:08x}: {word:08x}  {op:?}"),
            Err(e) => println!("{addr:08x}: {word:08x}  <{e}>"),
        }
    }
}
