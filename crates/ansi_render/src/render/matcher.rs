use std::collections::HashSet;

use crate::color::Rgba;
use crate::font::GlyphTable;
use crate::image_pipeline::{CellWindow, SourceImage};

/// Backgrounds whose coverage-weighted alpha falls below this are emitted
/// as fully transparent.
const BG_ALPHA_THRESHOLD: f32 = 0.2;

/// Winning glyph and color pair for one cell.
#[derive(Clone, Copy, Debug)]
pub struct CellChoice {
    /// Index into the glyph table.
    pub glyph: usize,
    /// Ink color, alpha forced opaque.
    pub fg: Rgba,
    /// Premultiplied background, alpha either 0 or 1.
    pub bg: Rgba,
}

/// Exhaustive search for the glyph/color triple that best reconstructs the
/// cell's image window.
///
/// Every candidate glyph decomposes the window samples into a
/// coverage-weighted foreground and background average, then scores the
/// composite against the samples by summed squared component differences.
/// Strictly smaller error wins; ties keep the earlier glyph. Returns `None`
/// only when the forbidden set excludes every glyph.
pub fn best_match(
    table: &GlyphTable,
    image: &SourceImage,
    window: CellWindow,
    forbidden: &HashSet<char>,
) -> Option<CellChoice> {
    let cell_width = table.cell_width();
    let cell_height = table.cell_height();

    // One sample per glyph pixel; positions are identical for every
    // candidate, so the window is sampled once up front.
    let mut samples = Vec::with_capacity(cell_width * cell_height);
    for y in 0..cell_height {
        for x in 0..cell_width {
            let img_x = window.x + window.width * (x as f32 + 0.5) / cell_width as f32;
            let img_y = window.y + window.height * (y as f32 + 0.5) / cell_height as f32;
            samples.push(image.sample(img_x, img_y));
        }
    }

    let mut best: Option<(f32, CellChoice)> = None;

    for glyph in 0..table.len() {
        if forbidden.contains(&table.char_at(glyph)) {
            continue;
        }
        let coverage = table.coverage(glyph);

        let mut fg_sum = 0.0;
        let mut bg_sum = 0.0;
        let mut fg_col = Rgba::TRANSPARENT;
        let mut bg_col = Rgba::TRANSPARENT;
        for (i, &sample) in samples.iter().enumerate() {
            let fg = coverage[i] as f32 / 255.0;
            let bg = 1.0 - fg;
            fg_sum += fg;
            bg_sum += bg;
            fg_col += sample.scale(fg);
            bg_col += sample.scale(bg);
        }
        if fg_sum > 0.0 {
            fg_col /= fg_sum;
        }
        fg_col.a = 1.0;
        if bg_sum > 0.0 {
            bg_col /= bg_sum;
        }
        bg_col.a = if bg_col.a < BG_ALPHA_THRESHOLD { 0.0 } else { 1.0 };
        bg_col = bg_col.scale(bg_col.a);

        let mut error = 0.0;
        for (i, &sample) in samples.iter().enumerate() {
            let fg = coverage[i] as f32 / 255.0;
            let bg = 1.0 - fg;
            let composite = fg_col.scale(fg) + bg_col.scale(bg);
            let d = sample.premultiplied() - composite;
            error += (d * d).sum();
        }

        match best {
            Some((best_error, _)) if error >= best_error => {},
            _ => best = Some((error, CellChoice { glyph, fg: fg_col, bg: bg_col })),
        }
    }

    best.map(|(_, choice)| choice)
}
