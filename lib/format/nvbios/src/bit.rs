//! The BIT entry that declares the location and size of the 'T' directory.

use core::{error, fmt};

use crate::medium::{Medium, MediumError, offset_add};

/// A BIT entry as stored in the image: a one byte table id, a one byte version, the byte length
/// of the data region and the absolute offset of the data region.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct BitEntry {
    /// The offset of the entry record itself (zero when the entry was not read from an image).
    offset: u64,
    /// The table id of the entry.
    id: u8,
    /// The version of the table the entry declares.
    version: u8,
    /// The declared byte length of the data region.
    data_length: u16,
    /// The absolute offset of the data region.
    data_offset: u64,
}

impl BitEntry {
    /// The id of the entry describing the 'T' directory.
    pub const ID_T: u8 = b'T';
    /// The size of an entry record in bytes.
    pub const SIZE: u64 = 6;

    /// Offset of the id field within the record.
    const ID_OFFSET: u64 = 0;
    /// Offset of the version field within the record.
    const VERSION_OFFSET: u64 = 1;
    /// Offset of the data length field within the record.
    const DATA_LENGTH_OFFSET: u64 = 2;
    /// Offset of the data offset field within the record.
    const DATA_OFFSET_OFFSET: u64 = 4;

    /// Creates a 'T' [`BitEntry`] from known values instead of reading it from an image.
    pub const fn new_t(version: u8, data_offset: u64, data_length: u16) -> Self {
        Self {
            offset: 0,
            id: Self::ID_T,
            version,
            data_length,
            data_offset,
        }
    }

    /// Reads the [`BitEntry`] record located at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`BitEntryError::MediumError`] if the record does not fit inside `medium`.
    pub fn read<M: Medium + ?Sized>(
        medium: &M,
        offset: u64,
    ) -> Result<Self, BitEntryError<M::Error>> {
        let field = |delta: u64, length: u64| -> Result<u64, MediumError<M::Error>> {
            offset_add(medium.size(), offset, delta, length)
        };

        Ok(Self {
            offset,
            id: medium.read_u8(field(Self::ID_OFFSET, 1)?)?,
            version: medium.read_u8(field(Self::VERSION_OFFSET, 1)?)?,
            data_length: medium.read_u16(field(Self::DATA_LENGTH_OFFSET, 2)?)?,
            data_offset: u64::from(medium.read_u16(field(Self::DATA_OFFSET_OFFSET, 2)?)?),
        })
    }

    /// Reads the [`BitEntry`] record located at `offset` and checks that it declares the 'T'
    /// directory.
    ///
    /// # Errors
    ///
    /// - [`BitEntryError::UnexpectedId`]: The record describes a different table.
    /// - [`BitEntryError::MediumError`]: The record does not fit inside `medium`.
    pub fn read_t<M: Medium + ?Sized>(
        medium: &M,
        offset: u64,
    ) -> Result<Self, BitEntryError<M::Error>> {
        let entry = Self::read(medium, offset)?;
        if entry.id != Self::ID_T {
            return Err(BitEntryError::UnexpectedId(entry.id));
        }

        Ok(entry)
    }

    /// Returns the offset of the entry record.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the table id of the entry.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Returns the version of the table the entry declares.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the declared byte length of the data region.
    pub fn data_length(&self) -> u16 {
        self.data_length
    }

    /// Returns the absolute offset of the data region.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }
}

/// Various errors that can occur while reading a [`BitEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitEntryError<E> {
    /// The entry does not describe the expected table.
    UnexpectedId(u8),
    /// An error occurred while reading the entry from the image.
    MediumError(MediumError<E>),
}

impl<E> From<MediumError<E>> for BitEntryError<E> {
    fn from(value: MediumError<E>) -> Self {
        Self::MediumError(value)
    }
}

impl<E: fmt::Display> fmt::Display for BitEntryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedId(id) => write!(
                f,
                "BIT entry has id {id:#04x}, expected {:#04x} ('T')",
                BitEntry::ID_T
            ),
            Self::MediumError(error) => write!(f, "error reading BIT entry: {error}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> error::Error for BitEntryError<E> {}
