//! Tool for decoding and printing the BIT 'T' table of an NVIDIA video BIOS image.

use std::io::Write;

use anyhow::{Context, Result};
use nvbios::{bit::BitEntry, directory::Directory, t_table::TTable};

use crate::cli::Location;

pub mod cli;
pub mod hexdump;
pub mod print;

fn main() -> Result<()> {
    let config = cli::get_config();

    let default_filter = if config.verbose() { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let image = std::fs::read(&config.image)
        .with_context(|| format!("error reading {}", config.image.display()))?;
    log::debug!("read {} bytes from {}", image.len(), config.image.display());

    let t_table = match config.location {
        Location::Entry(offset) => {
            TTable::from_entry(image.as_slice(), offset, config.discovery)
                .with_context(|| format!("error decoding BIT 'T' entry at 0x{offset:x}"))?
        }
        Location::Raw {
            base,
            length,
            version,
        } => {
            let directory = Directory::new(BitEntry::new_t(version, base, length));
            TTable::parse(image.as_slice(), directory, config.discovery)
        }
    };

    for error in &t_table.discovery().errors {
        if error.is_not_found() {
            log::debug!("{error}");
        } else {
            log::warn!("{error}");
        }
    }

    let mut out = std::io::stdout().lock();
    print::print_t_table(&mut out, image.as_slice(), &t_table, config.mask)?;
    out.flush()?;

    Ok(())
}
