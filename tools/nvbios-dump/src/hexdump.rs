//! Hex dumps of image spans.

use core::fmt;
use std::io::{self, Write};

use nvbios::medium::BackedMedium;

/// Number of bytes printed on each line.
const BYTES_PER_LINE: usize = 16;

/// Writes the `length` bytes at `offset` of `medium` to `out`, sixteen bytes per line, each line
/// prefixed by the offset of its first byte.
///
/// A span that does not fit in `medium` is reported in place of the bytes.
pub fn dump_hex<M: BackedMedium + ?Sized, W: Write>(
    out: &mut W,
    medium: &M,
    offset: u64,
    length: u64,
) -> io::Result<()>
where
    M::Error: fmt::Display,
{
    let bytes = match medium.access_slice(offset, length) {
        Ok(bytes) => bytes,
        Err(error) => return writeln!(out, "0x{offset:04x}: <{error}>"),
    };

    let mut line_offset = offset;
    for line in bytes.chunks(BYTES_PER_LINE) {
        write!(out, "0x{line_offset:04x}:")?;
        for byte in line {
            write!(out, " {byte:02x}")?;
        }
        writeln!(out)?;

        line_offset += BYTES_PER_LINE as u64;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::dump_hex;

    fn dump(image: &[u8], offset: u64, length: u64) -> String {
        let mut out = Vec::new();
        dump_hex(&mut out, image, offset, length).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn short_span() {
        let image = [0xde, 0xad, 0xbe, 0xef];

        assert_eq!(dump(&image, 1, 2), "0x0001: ad be\n");
    }

    #[test]
    fn wraps_every_sixteen_bytes() {
        let image = (0..0x20).collect::<Vec<u8>>();

        assert_eq!(
            dump(&image, 0x08, 0x12),
            "0x0008: 08 09 0a 0b 0c 0d 0e 0f 10 11 12 13 14 15 16 17\n\
             0x0018: 18 19\n"
        );
    }

    #[test]
    fn empty_span_prints_nothing() {
        assert_eq!(dump(&[0; 4], 2, 0), "");
    }

    #[test]
    fn truncated_span_is_reported() {
        let output = dump(&[0; 4], 2, 4);

        assert!(output.starts_with("0x0002: <"));
        assert!(output.contains("does not fit inside image of 4 bytes"));
    }
}
