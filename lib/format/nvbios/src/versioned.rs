//! Generic parsing of tables made of a versioned header followed by an array of fixed-stride
//! records.
//!
//! The first byte of such a table is its version. The version selects a [`HeaderLayout`] which
//! tells where the header length, record length and record count are stored. The records start
//! right after the header; their number and stride come from the header alone, so the array is
//! derived rather than stored.

use core::{error, fmt};

use crate::medium::{Medium, MediumError, offset_add};

/// Where the one byte header fields of a table version are located, relative to the start of the
/// table.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct HeaderLayout {
    /// Offset of the header length field.
    pub header_length: u64,
    /// Offset of the record length field.
    pub record_length: u64,
    /// Offset of the record count field.
    pub entry_count: u64,
}

impl HeaderLayout {
    /// Layout storing the header length, record length and record count in bytes 1, 2 and 3.
    pub const COMPACT: Self = Self {
        header_length: 1,
        record_length: 2,
        entry_count: 3,
    };
}

/// Selects the [`HeaderLayout`] of a table family for a version byte, or [`None`] when the
/// version is not supported.
pub type LayoutFn = fn(u8) -> Option<HeaderLayout>;

/// The parse state of a [`VersionedTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableState<E> {
    /// The directory holds no offset for the table.
    Absent,
    /// Every header field was read and the version is supported.
    Valid,
    /// The table is present but could not be parsed.
    Invalid(TableError<E>),
}

/// A table with a version byte, a small header and a derived array of records.
///
/// Once parsed, the state never changes: an invalid table is not retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionedTable<E> {
    /// Human readable name of the table family.
    name: &'static str,
    /// The absolute offset of the table, zero when absent.
    offset: u64,
    /// The version byte of the table.
    version: u8,
    /// The length of the header in bytes.
    header_length: u8,
    /// The length of each record in bytes.
    record_length: u8,
    /// The number of records.
    entry_count: u8,
    /// The outcome of parsing.
    state: TableState<E>,
}

impl<E> VersionedTable<E> {
    /// Returns an absent table of the family `name`.
    pub const fn absent(name: &'static str) -> Self {
        Self {
            name,
            offset: 0,
            version: 0,
            header_length: 0,
            record_length: 0,
            entry_count: 0,
            state: TableState::Absent,
        }
    }

    /// Parses the table of family `name` located at `offset`.
    ///
    /// An `offset` of zero yields an absent table without touching `medium`. Otherwise the
    /// version byte is read and handed to `layout`; an unsupported version, a failed header read
    /// or a record array that cannot fit in the image leaves the table
    /// [`Invalid`][TableState::Invalid]. Failures are logged and recorded in the returned table.
    pub fn parse<M: Medium<Error = E> + ?Sized>(
        medium: &M,
        offset: u64,
        name: &'static str,
        layout: LayoutFn,
    ) -> Self {
        let mut table = Self::absent(name);
        if offset == 0 {
            return table;
        }

        table.offset = offset;
        table.state = match table.read_header(medium, layout) {
            Ok(()) => TableState::Valid,
            Err(error) => {
                match &error {
                    TableError::UnsupportedVersion { version } => {
                        log::warn!("unknown {name} version {version:#x}");
                    }
                    _ => log::warn!("failed to parse {name} at {offset:#x}"),
                }
                TableState::Invalid(error)
            }
        };
        table
    }

    /// Reads the version and the header fields it selects.
    ///
    /// All header fields are read even if an earlier one fails, and the first failure is
    /// reported.
    fn read_header<M: Medium<Error = E> + ?Sized>(
        &mut self,
        medium: &M,
        layout: LayoutFn,
    ) -> Result<(), TableError<E>> {
        self.version = medium.read_u8(self.offset)?;
        let layout = layout(self.version).ok_or(TableError::UnsupportedVersion {
            version: self.version,
        })?;

        let offset = self.offset;
        let field = |delta| {
            offset_add(medium.size(), offset, delta, 1)
                .and_then(|address| medium.read_u8(address))
        };
        let header_length = field(layout.header_length);
        let record_length = field(layout.record_length);
        let entry_count = field(layout.entry_count);

        if let Ok(value) = header_length {
            self.header_length = value;
        }
        if let Ok(value) = record_length {
            self.record_length = value;
        }
        if let Ok(value) = entry_count {
            self.entry_count = value;
        }
        header_length?;
        record_length?;
        entry_count?;

        let span = u64::from(self.header_length)
            + u64::from(self.entry_count) * u64::from(self.record_length);
        let available = medium.size().saturating_sub(self.offset);
        if span > available {
            return Err(TableError::CorruptHeader { span, available });
        }

        Ok(())
    }

    /// Returns the name of the table family.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the absolute offset of the table, zero when absent.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the version byte of the table.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the length of the header in bytes.
    pub fn header_length(&self) -> u8 {
        self.header_length
    }

    /// Returns the length of each record in bytes.
    pub fn record_length(&self) -> u8 {
        self.record_length
    }

    /// Returns the number of records declared by the header.
    pub fn entry_count(&self) -> u8 {
        self.entry_count
    }

    /// Returns the parse state of the table.
    pub fn state(&self) -> &TableState<E> {
        &self.state
    }

    /// Returns `true` if the table is present in the directory.
    pub fn is_present(&self) -> bool {
        self.offset != 0
    }

    /// Returns `true` if the table was parsed successfully.
    pub fn is_valid(&self) -> bool {
        matches!(self.state, TableState::Valid)
    }

    /// Returns the error that made the table invalid.
    pub fn error(&self) -> Option<&TableError<E>> {
        match &self.state {
            TableState::Invalid(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the `(offset, length)` span of the header, if the table is valid.
    pub fn header_span(&self) -> Option<(u64, u64)> {
        self.is_valid()
            .then(|| (self.offset, u64::from(self.header_length)))
    }

    /// Returns the records of the table, if the table is valid.
    pub fn records(&self) -> Option<RecordTable> {
        if !self.is_valid() {
            return None;
        }

        Some(RecordTable {
            offset: self.offset + u64::from(self.header_length),
            count: u64::from(self.entry_count),
            stride: u64::from(self.record_length),
        })
    }
}

/// The array of records following the header of a valid [`VersionedTable`].
///
/// Records are computed on demand from their index.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct RecordTable {
    /// The absolute offset of the first record.
    offset: u64,
    /// The number of records.
    count: u64,
    /// The stride between records.
    stride: u64,
}

impl RecordTable {
    /// Returns the [`RecordRef`] at `index`.
    pub fn get(&self, index: u64) -> Option<RecordRef> {
        if index >= self.count {
            return None;
        }

        Some(RecordRef {
            offset: self.offset + index * self.stride,
            length: self.stride,
        })
    }

    /// Returns the number of records.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns `true` if there are no records.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns an iterator over the records.
    pub fn iter(&self) -> IntoIter {
        self.into_iter()
    }
}

impl IntoIterator for RecordTable {
    type Item = RecordRef;
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self,
            next: 0,
        }
    }
}

/// An [`Iterator`] over the records of a [`RecordTable`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct IntoIter {
    /// The [`RecordTable`] to iterate over.
    table: RecordTable,
    /// The next index in the [`RecordTable`].
    next: u64,
}

impl Iterator for IntoIter {
    type Item = RecordRef;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.table.get(self.next)?;
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = crate::u64_to_usize(self.table.count - self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IntoIter {}

/// The location of one record of a [`VersionedTable`].
///
/// Only the arithmetic is done here; reading the record's bytes reports truncation through the
/// [`Medium`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct RecordRef {
    /// The absolute offset of the record.
    pub offset: u64,
    /// The length of the record in bytes.
    pub length: u64,
}

/// Various errors that can make a [`VersionedTable`] invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableError<E> {
    /// The version byte is not handled by the table family.
    UnsupportedVersion {
        /// The version byte read from the table.
        version: u8,
    },
    /// The header declares more data than the image holds after the table offset.
    CorruptHeader {
        /// The number of bytes declared by the header and its records.
        span: u64,
        /// The number of bytes left in the image from the table offset.
        available: u64,
    },
    /// A header field could not be read.
    MediumError(MediumError<E>),
}

impl<E> From<MediumError<E>> for TableError<E> {
    fn from(value: MediumError<E>) -> Self {
        Self::MediumError(value)
    }
}

impl<E: fmt::Display> fmt::Display for TableError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { version } => write!(f, "unsupported version {version:#x}"),
            Self::CorruptHeader { span, available } => write!(
                f,
                "header declares {span} bytes but only {available} bytes remain in the image"
            ),
            Self::MediumError(error) => write!(f, "error reading header: {error}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> error::Error for TableError<E> {}
