//! Textual rendering of a decoded [`TTable`].

use core::fmt;
use std::io::{self, Write};

use bitflags::bitflags;
use nvbios::{
    medium::{BackedMedium, Medium},
    t_table::TTable,
    versioned::VersionedTable,
};

use crate::hexdump::dump_hex;

/// The size of a directory slot in bytes.
const SLOT_SIZE: usize = 2;

/// Name printed for slots that are not registered as a known table.
const UNKNOWN: &str = "UNKNOWN";

bitflags! {
    /// Selects which sections are printed and how.
    #[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
    pub struct PrintMask: u32 {
        /// The 'T' directory and the tables it references.
        const T = 1 << 0;
        /// Blank lines between hex dumps.
        const VERBOSE = 1 << 1;
    }
}

/// Writes the header of the 'T' directory followed by every non-zero slot and the name of the
/// table registered at it.
pub fn print_t_directory<M: Medium + ?Sized, W: Write>(
    out: &mut W,
    medium: &M,
    t_table: &TTable<M::Error>,
    mask: PrintMask,
) -> io::Result<()> {
    if !mask.contains(PrintMask::T) {
        return Ok(());
    }

    let directory = t_table.directory();
    writeln!(
        out,
        "BIT table 'T' at 0x{:x}, version {}",
        directory.entry().offset(),
        directory.version()
    )?;

    for (slot, value) in directory.slot_offsets(medium) {
        let Ok(offset) = value else {
            continue;
        };
        if offset == 0 {
            continue;
        }

        let name = directory.known_table(slot).map_or(UNKNOWN, |table| table.name);
        writeln!(out, "0x{:02x}: 0x{offset:x} => {name}", slot * SLOT_SIZE)?;
    }

    writeln!(out)
}

/// Writes `table`: its header and each of its records as hex dumps.
///
/// Absent tables print nothing, invalid tables are reported through the log.
pub fn print_versioned_table<M: BackedMedium + ?Sized, W: Write>(
    out: &mut W,
    medium: &M,
    table: &VersionedTable<M::Error>,
    mask: PrintMask,
) -> io::Result<()>
where
    M::Error: fmt::Display,
{
    if !table.is_present() || !mask.contains(PrintMask::T) {
        return Ok(());
    }

    let (Some((header_offset, header_length)), Some(records)) =
        (table.header_span(), table.records())
    else {
        log::error!(
            "Failed to parse {} at 0x{:x}, version {:x}",
            table.name(),
            table.offset(),
            table.version()
        );
        return Ok(());
    };

    let verbose = mask.contains(PrintMask::VERBOSE);
    writeln!(
        out,
        "{} at 0x{:x}, version {:x}",
        table.name(),
        table.offset(),
        table.version()
    )?;
    dump_hex(out, medium, header_offset, header_length)?;
    if verbose {
        writeln!(out)?;
    }

    for record in records {
        dump_hex(out, medium, record.offset, record.length)?;
        if verbose {
            writeln!(out)?;
        }
    }

    writeln!(out)
}

/// Writes the 'T' directory and every table it references.
pub fn print_t_table<M: BackedMedium + ?Sized, W: Write>(
    out: &mut W,
    medium: &M,
    t_table: &TTable<M::Error>,
    mask: PrintMask,
) -> io::Result<()>
where
    M::Error: fmt::Display,
{
    print_t_directory(out, medium, t_table, mask)?;
    for (_, table) in t_table.tables() {
        print_versioned_table(out, medium, table, mask)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use nvbios::{
        bit::BitEntry,
        directory::{Directory, DiscoveryMode},
        t_table::TTable,
    };

    use super::{PrintMask, print_t_directory, print_t_table, print_versioned_table};

    /// Image with a BIT 'T' entry at 0x04, a directory of three slots at 0x10 and a TMDS info
    /// table at 0x20.
    fn image(tmds_version: u8) -> Vec<u8> {
        let mut image = vec![0; 0x40];
        image[0x04..0x0a].copy_from_slice(&[b'T', 0x01, 0x06, 0x00, 0x10, 0x00]);
        image[0x10..0x16].copy_from_slice(&[0x20, 0x00, 0x00, 0x00, 0x34, 0x12]);
        image[0x20..0x24].copy_from_slice(&[tmds_version, 4, 2, 2]);
        image[0x24..0x28].copy_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);
        image
    }

    fn render(image: &[u8], mask: PrintMask) -> String {
        let t_table = TTable::from_entry(image, 0x04, DiscoveryMode::Contiguous).unwrap();
        let mut out = Vec::new();
        print_t_table(&mut out, image, &t_table, mask).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn directory_listing() {
        let image = image(0x11);
        let t_table = TTable::from_entry(&image[..], 0x04, DiscoveryMode::Contiguous).unwrap();
        let mut out = Vec::new();
        print_t_directory(&mut out, &image[..], &t_table, PrintMask::T).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "BIT table 'T' at 0x4, version 1\n\
             0x00: 0x20 => TMDS INFO TABLE\n\
             0x04: 0x1234 => UNKNOWN\n\
             \n"
        );
    }

    #[test]
    fn valid_tmds_info() {
        let output = render(&image(0x20), PrintMask::T);

        assert!(output.ends_with(
            "TMDS INFO table at 0x20, version 20\n\
             0x0020: 20 04 02 02\n\
             0x0024: aa bb\n\
             0x0026: cc dd\n\
             \n"
        ));
    }

    #[test]
    fn tmds_info_version_is_bare_hex() {
        let output = render(&image(0x11), PrintMask::T);

        assert!(output.contains("\nTMDS INFO table at 0x20, version 11\n"));
    }

    #[test]
    fn verbose_separates_dumps() {
        let output = render(&image(0x11), PrintMask::T | PrintMask::VERBOSE);

        assert!(output.ends_with(
            "TMDS INFO table at 0x20, version 11\n\
             0x0020: 11 04 02 02\n\
             \n\
             0x0024: aa bb\n\
             \n\
             0x0026: cc dd\n\
             \n\
             \n"
        ));
    }

    #[test]
    fn mask_without_t_prints_nothing() {
        assert_eq!(render(&image(0x11), PrintMask::empty()), "");
        assert_eq!(render(&image(0x11), PrintMask::VERBOSE), "");
    }

    #[test]
    fn invalid_table_prints_nothing() {
        let output = render(&image(0x42), PrintMask::T);

        assert!(!output.contains("TMDS INFO table at"));
        assert!(output.starts_with("BIT table 'T' at 0x4, version 1\n"));
    }

    #[test]
    fn absent_table_prints_nothing() {
        let image = image(0x11);
        let directory = Directory::new(BitEntry::new_t(1, 0x12, 2));
        let t_table = TTable::parse(&image[..], directory, DiscoveryMode::Contiguous);
        let mut out = Vec::new();
        print_versioned_table(&mut out, &image[..], t_table.tmds_info(), PrintMask::all())
            .unwrap();

        assert!(out.is_empty());
    }
}
