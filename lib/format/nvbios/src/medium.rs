//! Generic API over the immutable bytes of a video BIOS image.

use core::{error, fmt};

use crate::{u64_to_usize, usize_to_u64};

/// Generic API over various immutable and contiguous byte sources holding a video BIOS image.
///
/// The medium must be immutable. This means that byte values never change between reads and the
/// value of [`Medium::size()`] also never changes.
///
/// # Implementors
///
/// Implementations must treat any overflow in `offset + length` as a bounds error (a helpful
/// utility function is provided as [`check_bounds()`]).
pub trait Medium {
    /// Any errors that might need to be propagated up through the [`Medium`] abstraction.
    type Error;

    /// The number of bytes available to be retrieved.
    ///
    /// This value must not change but may be zero.
    fn size(&self) -> u64;

    /// Read `slice.len()` bytes into `slice` from `offset`.
    ///
    /// # Errors
    ///
    /// - [`MediumError::BoundsError`]: Requested region is outside of the bounds of [`Medium`].
    /// - [`MediumError::UnderlyingError`]: The underlying region returned an error when accessing
    ///   it.
    fn read_slice(&self, offset: u64, slice: &mut [u8]) -> Result<(), MediumError<Self::Error>>;

    /// Reads the `u8` at `offset`.
    ///
    /// # Errors
    ///
    /// - [`MediumError::BoundsError`]: `offset` is outside of the bounds of [`Medium`].
    /// - [`MediumError::UnderlyingError`]: The underlying region returned an error when accessing
    ///   it.
    fn read_u8(&self, offset: u64) -> Result<u8, MediumError<Self::Error>> {
        let mut val = 0;

        self.read_slice(offset, core::array::from_mut(&mut val))?;
        Ok(val)
    }

    /// Reads the little-endian `u16` at `offset`.
    ///
    /// # Errors
    ///
    /// - [`MediumError::BoundsError`]: Either byte of the value is outside of the bounds of
    ///   [`Medium`].
    /// - [`MediumError::UnderlyingError`]: The underlying region returned an error when accessing
    ///   it.
    fn read_u16(&self, offset: u64) -> Result<u16, MediumError<Self::Error>> {
        let mut arr = [0; 2];

        self.read_slice(offset, &mut arr)?;
        Ok(u16::from_le_bytes(arr))
    }
}

/// A [`BackedMedium`] provides access to contiguous addressable bytes that can safely be borrowed
/// as slices, which is what hex dumps of table spans are built on.
///
/// # Implementors
///
/// Implementations must treat any overflow in `offset + length` as a bounds error. The backing
/// storage must be stable.
pub trait BackedMedium: Medium {
    /// Accesses a slice of `length` bytes at `offset` into the [`BackedMedium`].
    ///
    /// # Errors
    ///
    /// - [`MediumError::BoundsError`]: Requested region is outside of the bounds of [`Medium`].
    /// - [`MediumError::UnderlyingError`]: The underlying medium returned an error when accessing
    ///   it.
    fn access_slice(&self, offset: u64, length: u64) -> Result<&[u8], MediumError<Self::Error>>;
}

/// Various errors that can occur when interacting with a [`Medium`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediumError<E> {
    /// Requested region is outside of the bounds of [`Medium`].
    BoundsError {
        /// The offset, in bytes, of the start of the requested region in the [`Medium`].
        offset: u64,
        /// The size, in bytes, of the requested region.
        length: u64,
        /// The actual size of the [`Medium`].
        size: u64,
    },
    /// An error that might occur when accessing the medium.
    UnderlyingError(E),
}

impl<E> From<E> for MediumError<E> {
    fn from(value: E) -> Self {
        Self::UnderlyingError(value)
    }
}

impl<E: fmt::Display> fmt::Display for MediumError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoundsError {
                offset,
                length,
                size,
            } => write!(
                f,
                "requested region at {offset:#x} with a length of {length} \
                does not fit inside image of {size} bytes"
            ),
            Self::UnderlyingError(error) => write!(f, "error accessing underlying image: {error}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> error::Error for MediumError<E> {}

/// Utility function to centralize [`Medium`] bounds checking.
///
/// # Errors
///
/// Returns [`MediumError::BoundsError`] if `offset + length` overflows or exceeds `size`.
pub fn check_bounds<E>(size: u64, offset: u64, length: u64) -> Result<(), MediumError<E>> {
    let max_offset = offset.checked_add(length).ok_or(MediumError::BoundsError {
        offset,
        length,
        size,
    })?;
    if max_offset > size {
        return Err(MediumError::BoundsError {
            offset,
            length,
            size,
        });
    }

    Ok(())
}

/// Computes `base + delta`, reporting an overflow as a [`MediumError::BoundsError`] of `length`
/// bytes so that derived offsets fail the same way as reads past the end of the image.
pub(crate) fn offset_add<E>(
    size: u64,
    base: u64,
    delta: u64,
    length: u64,
) -> Result<u64, MediumError<E>> {
    base.checked_add(delta).ok_or(MediumError::BoundsError {
        offset: base,
        length: delta.saturating_add(length),
        size,
    })
}

impl Medium for [u8] {
    type Error = core::convert::Infallible;

    fn size(&self) -> u64 {
        usize_to_u64(self.len())
    }

    fn read_slice(&self, offset: u64, slice: &mut [u8]) -> Result<(), MediumError<Self::Error>> {
        check_bounds(self.size(), offset, usize_to_u64(slice.len()))?;

        // The requested read region fits within a `usize`, since the bounds checking succeeded
        // and the upper bound is a `usize`.
        slice.copy_from_slice(&self[u64_to_usize(offset)..][..slice.len()]);
        Ok(())
    }
}

impl BackedMedium for [u8] {
    fn access_slice(&self, offset: u64, length: u64) -> Result<&[u8], MediumError<Self::Error>> {
        check_bounds(self.size(), offset, length)?;

        Ok(&self[u64_to_usize(offset)..][..u64_to_usize(length)])
    }
}

impl<M: Medium + ?Sized> Medium for &M {
    type Error = M::Error;

    fn size(&self) -> u64 {
        M::size(*self)
    }

    fn read_slice(&self, offset: u64, slice: &mut [u8]) -> Result<(), MediumError<Self::Error>> {
        M::read_slice(*self, offset, slice)
    }

    fn read_u8(&self, offset: u64) -> Result<u8, MediumError<Self::Error>> {
        M::read_u8(*self, offset)
    }

    fn read_u16(&self, offset: u64) -> Result<u16, MediumError<Self::Error>> {
        M::read_u16(*self, offset)
    }
}

impl<M: BackedMedium + ?Sized> BackedMedium for &M {
    fn access_slice(&self, offset: u64, length: u64) -> Result<&[u8], MediumError<Self::Error>> {
        M::access_slice(*self, offset, length)
    }
}
