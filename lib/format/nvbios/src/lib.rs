//! The `nvbios` crate provides an interface for decoding the BIT 'T' directory of an NVIDIA video
//! BIOS image and the versioned tables it points to.
//!
//! # Capabilities
//!
//! ## Works in `no_std` environments
//!
//! The crate only requires `alloc`, so it can be used to inspect firmware images from contexts
//! without `std`.
//!
//! ## Untrusted input
//!
//! Every offset, length and record count is read from the same image it indexes into. All reads go
//! through a [`Medium`][medium::Medium] that bounds checks every access, and derived record arrays
//! are exposed as lazily indexed [`RecordTable`][versioned::RecordTable]s instead of eager
//! allocations sized by the image.
//!
//! ## Layering
//!
//! - [`bit`]: the BIT entry that declares the directory.
//! - [`directory`]: slot resolution against the registry of known tables.
//! - [`versioned`]: the generic version-dispatched header and trailing record array.
//! - [`tmds_info`]: the TMDS info table family.
//! - [`t_table`]: discovery followed by parsing of every resolved table.
#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod bit;
pub mod directory;
pub mod medium;
pub mod t_table;
pub mod tmds_info;
pub mod versioned;

/// Safely converts `value` to a `u64` relying on compile time code checking.
fn usize_to_u64(value: usize) -> u64 {
    #[cfg(not(any(
        target_pointer_width = "16",
        target_pointer_width = "32",
        target_pointer_width = "64"
    )))]
    compile_error!("library supports only 16-bit, 32-bit, and 64-bit usize");
    value as u64
}

/// Safely converts `value` to a `usize` relying on compile time code checking.
#[expect(
    clippy::cast_possible_truncation,
    reason = "implementation of type-safe as cast"
)]
fn u64_to_usize(value: u64) -> usize {
    #[cfg(not(target_pointer_width = "64"))]
    compile_error!("library supports only 64-bit usize");
    value as usize
}
