//! Forward-only scanning of line breaks.

use crate::error::{NormalizeError, Stage};
use crate::path::NodePath;

use super::{Encoding, OffsetUnit};

/// Maps byte offsets to one-based line and column numbers.
///
/// The cursor scans the source for line feeds only as far as the largest
/// offset requested so far. Offsets behind that point are answered by a
/// binary search over the line starts already discovered, so the source is
/// never rescanned. Columns are counted incrementally while successive
/// lookups stay on the same line.
pub(crate) struct LineCursor<'s> {
    source: &'s [u8],
    encoding: Encoding,
    unit: OffsetUnit,
    line_starts: Vec<usize>,
    scanned: usize,
    column_cache: Option<ColumnCache>,
}

#[derive(Clone, Copy)]
struct ColumnCache {
    line_start: usize,
    offset: usize,
    units: usize,
}

impl<'s> LineCursor<'s> {
    pub(crate) fn new(source: &'s [u8], encoding: Encoding, unit: OffsetUnit) -> Self {
        Self {
            source,
            encoding,
            unit,
            line_starts: vec![0],
            scanned: 0,
            column_cache: None,
        }
    }

    /// Number of line starts discovered so far.
    pub(crate) fn lines_seen(&self) -> usize {
        self.line_starts.len()
    }

    /// Rejects offsets past the end of the source or inside a code unit.
    pub(crate) fn check(
        &self,
        offset: usize,
        path: &NodePath,
        field: &str,
    ) -> Result<(), NormalizeError> {
        let len = self.source.len();
        if offset > len {
            return Err(NormalizeError::offset_out_of_range(path, offset, len));
        }

        let width = self.encoding.unit_width();
        if !offset.is_multiple_of(width) {
            return Err(NormalizeError::invalid_position(
                Stage::Position,
                path,
                field,
                format!("offset {offset} splits a {width}-byte code unit"),
            ));
        }
        Ok(())
    }

    pub(crate) fn locate(
        &mut self,
        offset: usize,
        path: &NodePath,
        field: &str,
    ) -> Result<(u32, u32), NormalizeError> {
        self.check(offset, path, field)?;
        self.scan_to(offset);

        let index = match self.line_starts.last() {
            Some(&last) if last <= offset => self.line_starts.len().saturating_sub(1),
            _ => self
                .line_starts
                .partition_point(|&start| start <= offset)
                .saturating_sub(1),
        };
        let line_start = self.line_starts.get(index).copied().unwrap_or_default();
        let units = self.units_between(line_start, offset);

        // Line/column numbers will realistically never exceed u32::MAX.
        let line = u32::try_from(index.saturating_add(1)).unwrap_or(u32::MAX);
        let column = u32::try_from(units.saturating_add(1)).unwrap_or(u32::MAX);
        Ok((line, column))
    }

    fn scan_to(&mut self, offset: usize) {
        if offset <= self.scanned {
            return;
        }

        let from = self.scanned;
        let window = self.source.get(from..offset).unwrap_or_default();
        match self.encoding {
            Encoding::Utf8 => {
                for (index, byte) in window.iter().enumerate() {
                    if *byte == b'\n' {
                        self.line_starts.push(from + index + 1);
                    }
                }
            }
            Encoding::Utf16Le | Encoding::Utf16Be => {
                for (index, unit) in window.chunks_exact(2).enumerate() {
                    if self.encoding.decode_unit(unit) == 0x000A {
                        self.line_starts.push(from + 2 * index + 2);
                    }
                }
            }
        }
        self.scanned = offset;
    }

    fn units_between(&mut self, line_start: usize, offset: usize) -> usize {
        let (from, base) = match self.column_cache {
            Some(cache) if cache.line_start == line_start && cache.offset <= offset => {
                (cache.offset, cache.units)
            }
            _ => (line_start, 0),
        };

        let window = self.source.get(from..offset).unwrap_or_default();
        let units = base + self.count_units(window);
        self.column_cache = Some(ColumnCache {
            line_start,
            offset,
            units,
        });
        units
    }

    fn count_units(&self, window: &[u8]) -> usize {
        match (self.unit, self.encoding) {
            (OffsetUnit::Byte, _) | (OffsetUnit::CodeUnit, Encoding::Utf8) => window.len(),
            (OffsetUnit::CodeUnit, Encoding::Utf16Le | Encoding::Utf16Be) => {
                window.chunks_exact(2).count()
            }
            (OffsetUnit::CodePoint, Encoding::Utf8) => window
                .iter()
                .filter(|byte| (**byte & 0xC0) != 0x80)
                .count(),
            (OffsetUnit::CodePoint, Encoding::Utf16Le | Encoding::Utf16Be) => window
                .chunks_exact(2)
                .filter(|unit| !is_low_surrogate(self.encoding.decode_unit(unit)))
                .count(),
        }
    }
}

const fn is_low_surrogate(unit: u16) -> bool {
    matches!(unit, 0xDC00..=0xDFFF)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16()
            .flat_map(|unit| {
                let low = u8::try_from(unit & 0x00FF).unwrap_or_default();
                let high = u8::try_from(unit >> 8).unwrap_or_default();
                [low, high]
            })
            .collect()
    }

    #[rstest]
    #[case(0, (1, 1))]
    #[case(2, (1, 3))]
    #[case(3, (1, 4))]
    #[case(4, (2, 1))]
    #[case(9, (3, 2))]
    #[case(10, (3, 3))]
    fn locates_ascii_offsets(#[case] offset: usize, #[case] expected: (u32, u32)) {
        let source = b"abc\ndef\nxy";
        let mut cursor = LineCursor::new(source, Encoding::Utf8, OffsetUnit::Byte);
        let found = cursor
            .locate(offset, &NodePath::root(), "start")
            .expect("locate");
        assert_eq!(found, expected);
    }

    #[test]
    fn backwards_lookups_reuse_discovered_lines() {
        let source = b"a\nb\nc\nd";
        let mut cursor = LineCursor::new(source, Encoding::Utf8, OffsetUnit::Byte);
        let path = NodePath::root();
        assert_eq!(cursor.locate(6, &path, "end").expect("forward"), (4, 1));
        let seen = cursor.lines_seen();
        assert_eq!(cursor.locate(2, &path, "start").expect("backward"), (2, 1));
        assert_eq!(cursor.locate(0, &path, "start").expect("backward"), (1, 1));
        assert_eq!(cursor.lines_seen(), seen);
    }

    #[rstest]
    #[case(OffsetUnit::Byte, 4)]
    #[case(OffsetUnit::CodeUnit, 4)]
    #[case(OffsetUnit::CodePoint, 3)]
    fn utf8_columns_follow_the_unit(#[case] unit: OffsetUnit, #[case] expected_column: u32) {
        // "é" is two bytes, so byte offset 3 follows "é" and "x".
        let source = "éx=1".as_bytes();
        let mut cursor = LineCursor::new(source, Encoding::Utf8, unit);
        let (_, column) = cursor
            .locate(3, &NodePath::root(), "start")
            .expect("locate");
        assert_eq!(column, expected_column);
    }

    #[rstest]
    #[case(OffsetUnit::Byte, 7)]
    #[case(OffsetUnit::CodeUnit, 4)]
    #[case(OffsetUnit::CodePoint, 3)]
    fn utf16_columns_follow_the_unit(#[case] unit: OffsetUnit, #[case] expected_column: u32) {
        // "😀" is a surrogate pair: two code units, one code point.
        let source = utf16le("\n😀a=");
        let mut cursor = LineCursor::new(&source, Encoding::Utf16Le, unit);
        let (line, column) = cursor
            .locate(8, &NodePath::root(), "start")
            .expect("locate");
        assert_eq!(line, 2);
        assert_eq!(column, expected_column);
    }

    #[test]
    fn offset_past_the_end_is_out_of_range() {
        let mut cursor = LineCursor::new(b"abc", Encoding::Utf8, OffsetUnit::Byte);
        let err = cursor
            .locate(4, &NodePath::root(), "end")
            .expect_err("out of range");
        assert!(matches!(
            err,
            NormalizeError::OffsetOutOfRange { offset: 4, len: 3, .. }
        ));
    }

    #[test]
    fn odd_utf16_offset_is_rejected() {
        let source = utf16le("ab");
        let mut cursor = LineCursor::new(&source, Encoding::Utf16Le, OffsetUnit::CodeUnit);
        let err = cursor
            .locate(1, &NodePath::root(), "start")
            .expect_err("misaligned");
        assert!(matches!(err, NormalizeError::InvalidPosition { .. }));
    }
}
