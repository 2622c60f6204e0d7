//! ELF image loading.
//!
//! Parses an ELF file with the `elf` crate and copies every allocated
//! section's bytes into a [`MemoryPort`] at its virtual address,
//! returning the entry point the driver should set the PC to.

use std::path::Path;

use elf::abi::SHF_ALLOC;
use elf::endian::AnyEndian;
use elf::ElfBytes;
use thiserror::Error;

use crate::memory::{MemoryError, MemoryPort, Wordsize};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed ELF container: {0}")]
    Parse(#[from] elf::ParseError),
    #[error("section {0} has compressed data, which is not supported")]
    Compressed(String),
    #[error("failed to write section {section} at {addr:#x}: {source}")]
    Memory {
        section: String,
        addr: u32,
        #[source]
        source: MemoryError,
    },
}

/// Load every `SHF_ALLOC` section of the ELF file at `path` into `mem`
/// at its virtual address, and return the entry point (`e_entry`).
pub fn load_elf(mem: &mut impl MemoryPort, path: &Path) -> Result<u32, LoadError> {
    let file_data = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let file = ElfBytes::<AnyEndian>::minimal_parse(&file_data)?;

    let section_headers = file.section_headers().unwrap_or_default();
    let section_names = file.section_headers_with_strtab()?.1;

    for shdr in section_headers.iter() {
        if shdr.sh_flags & u64::from(SHF_ALLOC) == 0 || shdr.sh_size == 0 {
            continue;
        }
        let name = section_names
            .as_ref()
            .and_then(|strtab| strtab.get(shdr.sh_name as usize).ok())
            .unwrap_or("<unnamed>")
            .to_string();

        let (data, compression) = file.section_data(&shdr)?;
        if compression.is_some() {
            return Err(LoadError::Compressed(name));
        }

        log::debug!(
            "loading section {name} at {:#x}, {} bytes",
            shdr.sh_addr,
            data.len()
        );
        for (offset, byte) in data.iter().enumerate() {
            let addr = shdr.sh_addr as u32 + offset as u32;
            mem.write(u64::from(addr), Wordsize::Byte, u64::from(*byte))
                .map_err(|source| LoadError::Memory {
                    section: name.clone(),
                    addr,
                    source,
                })?;
        }
    }

    let entry = file.ehdr.e_entry as u32;
    log::info!("entry point {entry:#x}");
    Ok(entry)
}
