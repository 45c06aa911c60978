//! Resolution of the 16-bit table offsets stored in the BIT 'T' directory.
//!
//! The directory is an array of little-endian `u16` slots. Each slot registered in
//! [`KNOWN_TABLES`] holds the absolute offset of a table, or zero when the table is absent.

use alloc::{vec, vec::Vec};
use core::{error, fmt};

use crate::{
    bit::BitEntry,
    medium::{Medium, MediumError, offset_add},
    versioned::VersionedTable,
};

/// The size of a directory slot in bytes.
pub const SLOT_SIZE: u64 = 2;

/// The families of tables that can be referenced from the directory.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum KnownTableKind {
    /// The TMDS info table, see [`tmds_info`][crate::tmds_info].
    TmdsInfo,
}

impl KnownTableKind {
    /// Parses the table of this family located at `offset`.
    pub fn parse<M: Medium + ?Sized>(self, medium: &M, offset: u64) -> VersionedTable<M::Error> {
        match self {
            Self::TmdsInfo => crate::tmds_info::parse(medium, offset),
        }
    }
}

/// A slot of the directory that holds the offset of a known table.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct KnownTable {
    /// The index of the slot. The slot occupies bytes `[slot * 2, slot * 2 + 2)` of the directory.
    pub slot: u8,
    /// Human readable name of the table.
    pub name: &'static str,
    /// The family of the table.
    pub kind: KnownTableKind,
}

impl KnownTable {
    /// Returns the byte offset of the slot within the directory.
    pub fn byte_offset(&self) -> u64 {
        u64::from(self.slot) * SLOT_SIZE
    }
}

/// The tables known to live in the 'T' directory.
///
/// [`Directory::discover_all`] stops at the first slot that fails to resolve, so this list must be
/// sorted by slot and must not skip any slot.
pub static KNOWN_TABLES: &[KnownTable] = &[KnownTable {
    slot: 0,
    name: "TMDS INFO TABLE",
    kind: KnownTableKind::TmdsInfo,
}];

/// How [`Directory::discover`] walks the registry.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Resolve slots `0, 1, 2, ...` and stop at the first one that fails to resolve.
    #[default]
    Contiguous,
    /// Resolve every registered slot independently of the others.
    EveryRegistered,
}

/// The 'T' directory of a BIOS image together with the offsets resolved from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directory {
    /// The BIT entry declaring the directory.
    entry: BitEntry,
    /// The registry of known tables.
    registry: &'static [KnownTable],
    /// The offset resolved for each registry entry, zero when absent.
    offsets: Vec<u16>,
}

impl Directory {
    /// Creates a new [`Directory`] for `entry` using [`KNOWN_TABLES`].
    pub fn new(entry: BitEntry) -> Self {
        Self::with_registry(entry, KNOWN_TABLES)
    }

    /// Creates a new [`Directory`] for `entry` that resolves the tables listed in `registry`.
    pub fn with_registry(entry: BitEntry, registry: &'static [KnownTable]) -> Self {
        Self {
            entry,
            registry,
            offsets: vec![0; registry.len()],
        }
    }

    /// Resolves the table registered at `slot`, storing and returning its offset.
    ///
    /// Exactly one `u16` read is made, and only once the slot is known to be registered and to fit
    /// inside the declared length of the directory.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::NotFound`]: `slot` is not registered or the directory is too short to
    ///   contain it.
    /// - [`ResolveError::MediumError`]: The slot could not be read from the image.
    pub fn resolve_slot<M: Medium + ?Sized>(
        &mut self,
        medium: &M,
        slot: usize,
    ) -> Result<ResolvedSlot, ResolveError<M::Error>> {
        let Some(index) = self
            .registry
            .iter()
            .position(|table| usize::from(table.slot) == slot)
        else {
            return Err(ResolveError::NotFound {
                slot,
                reason: NotFoundReason::Unregistered,
            });
        };
        let table = self.registry[index];

        let length = self.entry.data_length();
        if table.byte_offset() + SLOT_SIZE > u64::from(length) {
            return Err(ResolveError::NotFound {
                slot,
                reason: NotFoundReason::Truncated { length },
            });
        }

        let offset = offset_add(
            medium.size(),
            self.entry.data_offset(),
            table.byte_offset(),
            SLOT_SIZE,
        )
        .and_then(|address| medium.read_u16(address))
        .map_err(|error| ResolveError::MediumError { slot, error })?;
        self.offsets[index] = offset;

        Ok(ResolvedSlot { table, offset })
    }

    /// Resolves slots `0, 1, 2, ...` until the first one that fails to resolve.
    ///
    /// A registered table placed after an unregistered or truncated slot is never reached.
    pub fn discover_all<M: Medium + ?Sized>(&mut self, medium: &M) -> Discovery<M::Error> {
        let mut discovery = Discovery::default();

        let mut slot = 0;
        loop {
            match self.resolve_slot(medium, slot) {
                Ok(resolved) => {
                    log::debug!(
                        "slot {slot}: {} at {:#x}",
                        resolved.table.name,
                        resolved.offset
                    );
                    discovery.resolved.push(resolved);
                    slot += 1;
                }
                Err(error) => {
                    log::debug!("directory scan stopped at slot {slot}");
                    discovery.errors.push(error);
                    break;
                }
            }
        }

        discovery
    }

    /// Resolves every registered slot, regardless of whether the others resolved.
    pub fn discover_every<M: Medium + ?Sized>(&mut self, medium: &M) -> Discovery<M::Error> {
        let mut discovery = Discovery::default();

        for table in self.registry {
            match self.resolve_slot(medium, usize::from(table.slot)) {
                Ok(resolved) => discovery.resolved.push(resolved),
                Err(error) => {
                    log::debug!("{} at slot {} not resolved", table.name, table.slot);
                    discovery.errors.push(error);
                }
            }
        }

        discovery
    }

    /// Resolves the registered tables according to `mode`.
    pub fn discover<M: Medium + ?Sized>(
        &mut self,
        medium: &M,
        mode: DiscoveryMode,
    ) -> Discovery<M::Error> {
        match mode {
            DiscoveryMode::Contiguous => self.discover_all(medium),
            DiscoveryMode::EveryRegistered => self.discover_every(medium),
        }
    }

    /// Returns the registered tables together with their resolved offsets (zero when absent).
    pub fn tables(&self) -> impl Iterator<Item = (&KnownTable, u16)> {
        self.registry.iter().zip(self.offsets.iter().copied())
    }

    /// Returns the resolved offset of the first registered table of `kind`, or zero.
    pub fn table_offset(&self, kind: KnownTableKind) -> u16 {
        self.tables()
            .find(|(table, _)| table.kind == kind)
            .map_or(0, |(_, offset)| offset)
    }

    /// Returns the registered table at `slot`.
    pub fn known_table(&self, slot: usize) -> Option<&KnownTable> {
        self.registry
            .iter()
            .find(|table| usize::from(table.slot) == slot)
    }

    /// Returns an iterator over every slot that fits in the directory, registered or not.
    pub fn slot_offsets<'a, M: Medium + ?Sized>(&self, medium: &'a M) -> SlotOffsets<'a, M> {
        SlotOffsets {
            medium,
            base: self.entry.data_offset(),
            count: u64::from(self.entry.data_length()).div_ceil(SLOT_SIZE),
            next: 0,
        }
    }

    /// Returns the [`BitEntry`] declaring this [`Directory`].
    pub fn entry(&self) -> &BitEntry {
        &self.entry
    }

    /// Returns the absolute offset of slot zero.
    pub fn base_offset(&self) -> u64 {
        self.entry.data_offset()
    }

    /// Returns the declared byte length of the directory.
    pub fn length(&self) -> u16 {
        self.entry.data_length()
    }

    /// Returns the declared version of the directory.
    pub fn version(&self) -> u8 {
        self.entry.version()
    }

    /// Returns the registry of known tables.
    pub fn registry(&self) -> &'static [KnownTable] {
        self.registry
    }
}

/// A known table whose slot was successfully read.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ResolvedSlot {
    /// The registry entry of the slot.
    pub table: KnownTable,
    /// The value read from the slot (zero when the table is absent).
    pub offset: u16,
}

/// The outcome of a walk over the directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discovery<E> {
    /// The slots that resolved, in the order they were visited.
    pub resolved: Vec<ResolvedSlot>,
    /// The slots that failed to resolve. For [`DiscoveryMode::Contiguous`] this holds the single
    /// error that ended the scan.
    pub errors: Vec<ResolveError<E>>,
}

impl<E> Default for Discovery<E> {
    fn default() -> Self {
        Self {
            resolved: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// An [`Iterator`] over every slot that fits in a [`Directory`].
pub struct SlotOffsets<'a, M: ?Sized> {
    /// The image the directory lives in.
    medium: &'a M,
    /// The absolute offset of slot zero.
    base: u64,
    /// The number of slots declared by the directory length.
    count: u64,
    /// The next slot to read.
    next: u64,
}

impl<M: Medium + ?Sized> Iterator for SlotOffsets<'_, M> {
    type Item = (usize, Result<u16, MediumError<M::Error>>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }

        let slot = self.next;
        self.next += 1;

        let value = offset_add(self.medium.size(), self.base, slot * SLOT_SIZE, SLOT_SIZE)
            .and_then(|address| self.medium.read_u16(address));
        Some((crate::u64_to_usize(slot), value))
    }
}

/// Why a slot could not be found.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum NotFoundReason {
    /// No known table is registered at the slot.
    Unregistered,
    /// The directory is too short to contain the slot.
    Truncated {
        /// The declared byte length of the directory.
        length: u16,
    },
}

/// Various errors that can occur when resolving a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveError<E> {
    /// The slot does not exist.
    NotFound {
        /// The requested slot.
        slot: usize,
        /// Why the slot does not exist.
        reason: NotFoundReason,
    },
    /// The slot could not be read from the image.
    MediumError {
        /// The requested slot.
        slot: usize,
        /// The error reported by the image.
        error: MediumError<E>,
    },
}

impl<E> ResolveError<E> {
    /// Returns the slot that failed to resolve.
    pub fn slot(&self) -> usize {
        match self {
            Self::NotFound { slot, .. } | Self::MediumError { slot, .. } => *slot,
        }
    }

    /// Returns `true` if the slot does not exist, as opposed to failing to be read.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl<E: fmt::Display> fmt::Display for ResolveError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound {
                slot,
                reason: NotFoundReason::Unregistered,
            } => write!(f, "no known table is registered at slot {slot}"),
            Self::NotFound {
                slot,
                reason: NotFoundReason::Truncated { length },
            } => write!(
                f,
                "slot {slot} does not fit in directory of {length} bytes"
            ),
            Self::MediumError { slot, error } => write!(f, "error reading slot {slot}: {error}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> error::Error for ResolveError<E> {}

#[cfg(test)]
mod test {
    use super::{
        Directory, DiscoveryMode, KnownTable, KnownTableKind, NotFoundReason, ResolveError,
    };
    use crate::{
        bit::BitEntry,
        medium::{
            MediumError,
            fault::{FaultyMedium, Injected},
        },
    };

    /// Registry with slot 1 left out.
    static GAPPED: &[KnownTable] = &[
        KnownTable {
            slot: 0,
            name: "FIRST",
            kind: KnownTableKind::TmdsInfo,
        },
        KnownTable {
            slot: 2,
            name: "THIRD",
            kind: KnownTableKind::TmdsInfo,
        },
    ];

    /// Image with a directory of three slots at 0x10 holding 0x40, 0x50, 0x60.
    const IMAGE: [u8; 0x18] = {
        let mut image = [0; 0x18];
        image[0x10] = 0x40;
        image[0x12] = 0x50;
        image[0x14] = 0x60;
        image
    };

    #[test]
    fn short_directory_has_no_slots() {
        for length in [0, 1] {
            let mut directory = Directory::new(BitEntry::new_t(1, 0x10, length));

            assert_eq!(
                directory.resolve_slot(&IMAGE[..], 0),
                Err(ResolveError::NotFound {
                    slot: 0,
                    reason: NotFoundReason::Truncated { length }
                })
            );
            assert_eq!(directory.table_offset(KnownTableKind::TmdsInfo), 0);
        }
    }

    #[test]
    fn truncated_slot_is_not_read() {
        // Any read would fail, so a `NotFound` proves the length check happens first.
        let medium = FaultyMedium {
            bytes: &IMAGE,
            faults: &[0x14, 0x15],
        };
        let mut directory = Directory::with_registry(BitEntry::new_t(1, 0x10, 5), GAPPED);

        assert!(directory.resolve_slot(&medium, 2).unwrap_err().is_not_found());
    }

    #[test]
    fn resolve_registered_slot() {
        let mut directory = Directory::new(BitEntry::new_t(1, 0x10, 2));
        let resolved = directory.resolve_slot(&IMAGE[..], 0).unwrap();

        assert_eq!(resolved.offset, 0x40);
        assert_eq!(resolved.table.name, "TMDS INFO TABLE");
        assert_eq!(directory.table_offset(KnownTableKind::TmdsInfo), 0x40);
    }

    #[test]
    fn unregistered_slot_is_not_found() {
        let mut directory = Directory::new(BitEntry::new_t(1, 0x10, 6));

        assert_eq!(
            directory.resolve_slot(&IMAGE[..], 1),
            Err(ResolveError::NotFound {
                slot: 1,
                reason: NotFoundReason::Unregistered
            })
        );
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut directory = Directory::new(BitEntry::new_t(1, 0x10, 6));

        let first = directory.resolve_slot(&IMAGE[..], 0).unwrap();
        let snapshot = directory.clone();
        let second = directory.resolve_slot(&IMAGE[..], 0).unwrap();

        assert_eq!(first, second);
        assert_eq!(snapshot, directory);
    }

    #[test]
    fn read_error_is_distinct_from_not_found() {
        let medium = FaultyMedium {
            bytes: &IMAGE,
            faults: &[0x11],
        };
        let mut directory = Directory::new(BitEntry::new_t(1, 0x10, 6));

        let error = directory.resolve_slot(&medium, 0).unwrap_err();
        assert!(!error.is_not_found());
        assert_eq!(
            error,
            ResolveError::MediumError {
                slot: 0,
                error: MediumError::UnderlyingError(Injected(0x11))
            }
        );
        assert_eq!(directory.table_offset(KnownTableKind::TmdsInfo), 0);
    }

    #[test]
    fn slot_past_image_end_is_medium_error() {
        let mut directory = Directory::new(BitEntry::new_t(1, 0x17, 2));

        assert!(matches!(
            directory.resolve_slot(&IMAGE[..], 0),
            Err(ResolveError::MediumError {
                slot: 0,
                error: MediumError::BoundsError { offset: 0x17, .. }
            })
        ));
    }

    #[test]
    fn contiguous_scan_stops_at_gap() {
        let mut directory = Directory::with_registry(BitEntry::new_t(1, 0x10, 6), GAPPED);
        let discovery = directory.discover_all(&IMAGE[..]);

        assert_eq!(discovery.resolved.len(), 1);
        assert_eq!(discovery.resolved[0].table.name, "FIRST");
        assert_eq!(discovery.errors.len(), 1);
        assert_eq!(discovery.errors[0].slot(), 1);

        // Slot 2 resolves when asked for directly.
        assert_eq!(directory.resolve_slot(&IMAGE[..], 2).unwrap().offset, 0x60);
    }

    #[test]
    fn every_registered_scan_crosses_gap() {
        let mut directory = Directory::with_registry(BitEntry::new_t(1, 0x10, 6), GAPPED);
        let discovery = directory.discover(&IMAGE[..], DiscoveryMode::EveryRegistered);

        let offsets = discovery
            .resolved
            .iter()
            .map(|resolved| resolved.offset)
            .collect::<alloc::vec::Vec<_>>();
        assert_eq!(offsets, [0x40, 0x60]);
        assert!(discovery.errors.is_empty());
    }

    #[test]
    fn contiguous_scan_of_known_tables() {
        let mut directory = Directory::new(BitEntry::new_t(1, 0x10, 6));
        let discovery = directory.discover(&IMAGE[..], DiscoveryMode::Contiguous);

        assert_eq!(discovery.resolved.len(), 1);
        assert_eq!(
            discovery.errors,
            [ResolveError::NotFound {
                slot: 1,
                reason: NotFoundReason::Unregistered
            }]
        );
    }

    #[test]
    fn slot_offsets_cover_declared_length() {
        let directory = Directory::new(BitEntry::new_t(1, 0x10, 5));
        let slots = directory
            .slot_offsets(&IMAGE[..])
            .map(|(slot, value)| (slot, value.unwrap()))
            .collect::<alloc::vec::Vec<_>>();

        assert_eq!(slots, [(0, 0x40), (1, 0x50), (2, 0x60)]);
        assert_eq!(directory.known_table(0).map(|t| t.name), Some("TMDS INFO TABLE"));
        assert_eq!(directory.known_table(1), None);
    }
}
