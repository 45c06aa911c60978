//! The BIT 'T' table: its directory and every table the directory points to.

use crate::{
    bit::{BitEntry, BitEntryError},
    directory::{Directory, Discovery, DiscoveryMode, KnownTable, KnownTableKind},
    medium::Medium,
    tmds_info::{self, TmdsInfo},
    versioned::VersionedTable,
};

/// The decoded BIT 'T' table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TTable<E> {
    /// The directory and its resolved offsets.
    directory: Directory,
    /// The outcome of the directory walk.
    discovery: Discovery<E>,
    /// The TMDS info table.
    tmds_info: TmdsInfo<E>,
}

impl<E> TTable<E> {
    /// Walks `directory` according to `mode`, then parses every table whose slot resolved to a
    /// non-zero offset.
    ///
    /// Failures are recorded in the returned [`TTable`] instead of aborting: a slot that fails to
    /// resolve shows up in [`TTable::discovery()`] and a table that fails to parse is left
    /// invalid.
    pub fn parse<M: Medium<Error = E> + ?Sized>(
        medium: &M,
        mut directory: Directory,
        mode: DiscoveryMode,
    ) -> Self {
        let discovery = directory.discover(medium, mode);

        let mut t_table = Self {
            directory,
            discovery: Discovery::default(),
            tmds_info: VersionedTable::absent(tmds_info::NAME),
        };

        for resolved in &discovery.resolved {
            if resolved.offset == 0 {
                continue;
            }

            // A table is parsed at most once, even if several slots name the same family.
            let destination = t_table.table_mut(resolved.table.kind);
            if !destination.is_present() {
                *destination = resolved.table.kind.parse(medium, u64::from(resolved.offset));
            }
        }

        t_table.discovery = discovery;
        t_table
    }

    /// Reads the 'T' [`BitEntry`] at `entry_offset` and parses the table it declares.
    ///
    /// # Errors
    ///
    /// Returns [`BitEntryError`] if the entry cannot be read or does not describe the 'T' table.
    pub fn from_entry<M: Medium<Error = E> + ?Sized>(
        medium: &M,
        entry_offset: u64,
        mode: DiscoveryMode,
    ) -> Result<Self, BitEntryError<E>> {
        let entry = BitEntry::read_t(medium, entry_offset)?;
        Ok(Self::parse(medium, Directory::new(entry), mode))
    }

    /// Returns the [`Directory`] of the table.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Returns the outcome of the directory walk.
    pub fn discovery(&self) -> &Discovery<E> {
        &self.discovery
    }

    /// Returns the TMDS info table.
    pub fn tmds_info(&self) -> &TmdsInfo<E> {
        &self.tmds_info
    }

    /// Returns the table of family `kind`.
    pub fn table(&self, kind: KnownTableKind) -> &VersionedTable<E> {
        match kind {
            KnownTableKind::TmdsInfo => &self.tmds_info,
        }
    }

    /// Returns the field receiving the table of family `kind`.
    fn table_mut(&mut self, kind: KnownTableKind) -> &mut VersionedTable<E> {
        match kind {
            KnownTableKind::TmdsInfo => &mut self.tmds_info,
        }
    }

    /// Returns every registered table with its parsed state.
    pub fn tables(&self) -> impl Iterator<Item = (&KnownTable, &VersionedTable<E>)> {
        self.directory
            .registry()
            .iter()
            .map(|table| (table, self.table(table.kind)))
    }
}
