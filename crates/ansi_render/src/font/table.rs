use std::collections::HashSet;

use fontdue::{Font, FontSettings};
use log::debug;

/// The FULL BLOCK glyph fills its cell top to bottom; its ink top locates
/// the baseline shared by every other glyph in the table.
const FULL_BLOCK: char = '\u{2588}';

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("failed to parse font: {0}")]
    Parse(&'static str),
    #[error("font does not expose horizontal line metrics")]
    MissingLineMetrics,
    #[error("font produced no glyphs with a uniform advance")]
    NoMonospaceGlyphs,
    #[error("coverage bitmap has {got} bytes, expected {expected}")]
    CoverageSize { got: usize, expected: usize },
}

#[derive(Clone, Debug)]
pub struct FontOptions {
    /// Rasterization size in pixels.
    pub size_px: f32,
    /// Characters excluded from the table.
    pub forbidden: HashSet<char>,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self { size_px: 15.0, forbidden: HashSet::new() }
    }
}

/// Fixed-advance glyph coverage table built from a rasterized font.
///
/// Coverage for all glyphs lives in one contiguous buffer, one
/// `cell_width * cell_height` grayscale tile per glyph, in enumeration
/// order. The table is immutable after construction and rebuilt wholesale
/// on every font load.
#[derive(Clone, Debug)]
pub struct GlyphTable {
    cell_width: usize,
    cell_height: usize,
    aspect: f32,
    chars: Vec<char>,
    coverage: Vec<u8>,
    charset: String,
}

impl GlyphTable {
    /// Build a table from raw TTF/OTF bytes.
    ///
    /// Every character the font maps is enumerated in ascending codepoint
    /// order; glyphs whose advance differs from the font-wide cell advance
    /// are discarded so the grid stays monospace.
    pub fn from_bytes(data: &[u8], options: &FontOptions) -> Result<Self, FontError> {
        let settings = FontSettings { scale: options.size_px, ..FontSettings::default() };
        let font = Font::from_bytes(data, settings).map_err(FontError::Parse)?;

        let line = font
            .horizontal_line_metrics(options.size_px)
            .ok_or(FontError::MissingLineMetrics)?;
        let cell_height = line.new_line_size.round().max(1.0) as usize;

        // The char map is a hash map; sorting makes enumeration (and the
        // exposed charset) deterministic across loads of the same bytes.
        let mut codepoints: Vec<char> = font.chars().keys().copied().collect();
        codepoints.sort_unstable();

        let cell_width = codepoints
            .iter()
            .map(|&ch| font.metrics(ch, options.size_px).advance_width.round() as usize)
            .max()
            .filter(|&width| width > 0)
            .ok_or(FontError::NoMonospaceGlyphs)?;

        let baseline = if font.lookup_glyph_index(FULL_BLOCK) != 0 {
            let metrics = font.metrics(FULL_BLOCK, options.size_px);
            metrics.ymin + metrics.height as i32
        } else {
            line.ascent.round() as i32
        };

        let mut table = Self {
            cell_width,
            cell_height,
            aspect: cell_height as f32 / cell_width as f32,
            chars: Vec::new(),
            coverage: Vec::new(),
            charset: String::new(),
        };

        for ch in codepoints {
            if ch == '\t' || ch == '\r' || options.forbidden.contains(&ch) {
                continue;
            }
            if font.metrics(ch, options.size_px).advance_width.round() as usize != cell_width {
                continue;
            }

            let (metrics, mask) = font.rasterize(ch, options.size_px);
            let cell = place_mask(
                cell_width,
                cell_height,
                baseline,
                metrics.xmin,
                metrics.ymin + metrics.height as i32,
                metrics.width,
                metrics.height,
                &mask,
            );
            table.push_glyph(ch, &cell);
        }

        if table.chars.is_empty() {
            return Err(FontError::NoMonospaceGlyphs);
        }

        debug!(
            "glyph table holds {} glyphs in {}x{} cells",
            table.chars.len(),
            cell_width,
            cell_height
        );
        Ok(table)
    }

    /// Build a table from caller-supplied `(character, coverage)` pairs.
    ///
    /// Each coverage bitmap must be `cell_width * cell_height` bytes.
    pub fn from_parts(
        cell_width: usize,
        cell_height: usize,
        glyphs: impl IntoIterator<Item = (char, Vec<u8>)>,
    ) -> Result<Self, FontError> {
        let expected = cell_width * cell_height;
        let mut table = Self {
            cell_width,
            cell_height,
            aspect: cell_height as f32 / cell_width as f32,
            chars: Vec::new(),
            coverage: Vec::new(),
            charset: String::new(),
        };

        for (ch, mask) in glyphs {
            if mask.len() != expected {
                return Err(FontError::CoverageSize { got: mask.len(), expected });
            }
            table.push_glyph(ch, &mask);
        }

        if table.chars.is_empty() {
            return Err(FontError::NoMonospaceGlyphs);
        }
        Ok(table)
    }

    fn push_glyph(&mut self, ch: char, coverage: &[u8]) {
        self.chars.push(ch);
        self.coverage.extend_from_slice(coverage);
        self.charset.push(ch);
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn cell_width(&self) -> usize {
        self.cell_width
    }

    pub fn cell_height(&self) -> usize {
        self.cell_height
    }

    /// Cell height over cell width.
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn char_at(&self, index: usize) -> char {
        self.chars[index]
    }

    /// Coverage tile for one glyph, row-major `cell_width * cell_height`.
    pub fn coverage(&self, index: usize) -> &[u8] {
        let tile = self.cell_width * self.cell_height;
        &self.coverage[index * tile..(index + 1) * tile]
    }

    /// Every matchable character, in table order.
    pub fn charset(&self) -> &str {
        &self.charset
    }
}

/// Place a rasterized coverage mask into a fixed-size cell.
///
/// `left` is the ink offset from the cell's left edge, `top` the ink top
/// measured above the baseline. Mask pixels falling outside the cell are
/// clipped; cell pixels the mask never touches stay at zero coverage.
#[allow(clippy::too_many_arguments)]
fn place_mask(
    cell_width: usize,
    cell_height: usize,
    baseline: i32,
    left: i32,
    top: i32,
    mask_width: usize,
    mask_height: usize,
    mask: &[u8],
) -> Vec<u8> {
    let mut cell = vec![0u8; cell_width * cell_height];
    for y in 0..mask_height {
        let tile_y = baseline - top + y as i32;
        if tile_y < 0 || tile_y >= cell_height as i32 {
            continue;
        }
        for x in 0..mask_width {
            let tile_x = left + x as i32;
            if tile_x < 0 || tile_x >= cell_width as i32 {
                continue;
            }
            cell[tile_y as usize * cell_width + tile_x as usize] = mask[y * mask_width + x];
        }
    }
    cell
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_mask_aligns_ink_to_baseline() {
        // A 2x2 mask whose ink top sits 2 rows above the baseline at row 5
        // lands at rows 3..5, columns 1..3.
        let cell = place_mask(4, 6, 5, 1, 2, 2, 2, &[10, 20, 30, 40]);
        assert_eq!(cell[3 * 4 + 1], 10);
        assert_eq!(cell[3 * 4 + 2], 20);
        assert_eq!(cell[4 * 4 + 1], 30);
        assert_eq!(cell[4 * 4 + 2], 40);
        assert_eq!(cell.iter().map(|&v| v as u32).sum::<u32>(), 100);
    }

    #[test]
    fn place_mask_clips_outside_cell() {
        // Ink hangs off the right edge and below the cell.
        let cell = place_mask(2, 2, 1, 1, 0, 2, 2, &[1, 2, 3, 4]);
        // Row 0: baseline 1 - top 0 = 1, so the mask starts at row 1;
        // column 2 is clipped, row 2 is clipped.
        assert_eq!(cell, vec![0, 0, 0, 1]);
    }

    #[test]
    fn from_parts_checks_coverage_size() {
        let result = GlyphTable::from_parts(2, 2, [('a', vec![0u8; 3])]);
        assert!(matches!(result, Err(FontError::CoverageSize { got: 3, expected: 4 })));
    }

    #[test]
    fn from_parts_keeps_insertion_order() {
        let table = GlyphTable::from_parts(
            1,
            1,
            [(' ', vec![0]), ('x', vec![128]), ('#', vec![255])],
        )
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.charset(), " x#");
        assert_eq!(table.char_at(1), 'x');
        assert_eq!(table.coverage(2), &[255]);
    }

    #[test]
    fn empty_table_is_rejected() {
        let result = GlyphTable::from_parts(2, 2, []);
        assert!(matches!(result, Err(FontError::NoMonospaceGlyphs)));
    }
}
