//! The TMDS info table.
//!
//! Versions 0x11 and 0x20 share the same layout: a version byte followed by the header length,
//! the record length and the record count, one byte each. Record contents are not decoded.

use crate::{
    medium::Medium,
    versioned::{HeaderLayout, VersionedTable},
};

/// Name of the table family.
pub const NAME: &str = "TMDS INFO table";

/// TMDS info table version 1.1.
pub const VERSION_1_1: u8 = 0x11;
/// TMDS info table version 2.0.
pub const VERSION_2_0: u8 = 0x20;

/// A parsed TMDS info table.
pub type TmdsInfo<E> = VersionedTable<E>;

/// Returns the [`HeaderLayout`] of the TMDS info table `version`.
pub fn layout(version: u8) -> Option<HeaderLayout> {
    match version {
        VERSION_1_1 | VERSION_2_0 => Some(HeaderLayout::COMPACT),
        _ => None,
    }
}

/// Parses the TMDS info table located at `offset`, which may be zero for an absent table.
pub fn parse<M: Medium + ?Sized>(medium: &M, offset: u64) -> TmdsInfo<M::Error> {
    VersionedTable::parse(medium, offset, NAME, layout)
}

#[cfg(test)]
mod test {
    use alloc::vec::Vec;

    use super::{VERSION_1_1, VERSION_2_0, parse};
    use crate::{
        medium::{
            MediumError,
            fault::{FaultyMedium, Injected},
        },
        versioned::TableError,
    };

    /// Builds an image holding a TMDS info header at `0x20`.
    fn image(version: u8) -> [u8; 0x40] {
        let mut image = [0xcc; 0x40];
        image[0x20..0x24].copy_from_slice(&[version, 4, 8, 3]);
        image
    }

    #[test]
    fn absent_table() {
        let image = image(VERSION_1_1);
        let table = parse(&image[..], 0);

        assert!(!table.is_valid());
        assert!(table.records().is_none());
        assert_eq!(table.error(), None);
    }

    #[test]
    fn both_versions_share_layout() {
        for version in [VERSION_1_1, VERSION_2_0] {
            let image = image(version);
            let table = parse(&image[..], 0x20);

            assert!(table.is_valid());
            assert_eq!(table.version(), version);
            assert_eq!(table.header_length(), 4);
            assert_eq!(table.record_length(), 8);
            assert_eq!(table.entry_count(), 3);

            let offsets = table
                .records()
                .unwrap()
                .into_iter()
                .map(|record| record.offset)
                .collect::<Vec<_>>();
            assert_eq!(offsets, [0x24, 0x2c, 0x34]);
        }
    }

    #[test]
    fn unknown_version() {
        let image = image(0xff);
        let table = parse(&image[..], 0x20);

        assert!(!table.is_valid());
        assert!(table.records().is_none());
        assert_eq!(
            table.error(),
            Some(&TableError::UnsupportedVersion { version: 0xff })
        );
    }

    #[test]
    fn header_length_read_failure() {
        let image = image(VERSION_2_0);
        let medium = FaultyMedium {
            bytes: &image,
            faults: &[0x21],
        };
        let table = parse(&medium, 0x20);

        assert!(!table.is_valid());
        assert!(table.records().is_none());
        assert_eq!(table.record_length(), 8);
        assert_eq!(table.entry_count(), 3);
        assert_eq!(
            table.error(),
            Some(&TableError::MediumError(MediumError::UnderlyingError(
                Injected(0x21)
            )))
        );
    }
}
