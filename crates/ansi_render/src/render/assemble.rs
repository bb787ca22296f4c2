use crate::font::GlyphTable;
use crate::render::scheduler::CellResult;

pub const RESET_FG: &str = "\x1b[39m";
pub const RESET_BG: &str = "\x1b[49m";

fn fg_escape(rgb: [u8; 3]) -> String {
    format!("\x1b[38;2;{};{};{}m", rgb[0], rgb[1], rgb[2])
}

fn bg_escape(rgb: [u8; 3]) -> String {
    format!("\x1b[48;2;{};{};{}m", rgb[0], rgb[1], rgb[2])
}

/// Assemble per-cell results into terminal-ready text.
///
/// Rows are emitted top to bottom, cells left to right, tracking the last
/// emitted foreground and background so a color escape appears only when
/// the color actually changes. Cells with a sub-threshold background alpha
/// reset the background; space glyphs reset the foreground. Rows never end
/// in an active color or trailing spaces, and trailing blank lines are
/// dropped from the artifact.
pub(crate) fn assemble(
    table: &GlyphTable,
    columns: usize,
    mut results: Vec<CellResult>,
) -> String {
    results.sort_unstable_by_key(|result| (result.char_y, result.char_x));

    let mut raw = String::new();
    for row in results.chunks(columns) {
        let mut line = String::new();
        // `None` models the reset state for either channel.
        let mut last_bg: Option<[u8; 3]> = None;
        let mut last_fg: Option<[u8; 3]> = None;

        for result in row {
            let choice = &result.choice;

            let bg = if choice.bg.a < 0.5 { None } else { Some(choice.bg.to_rgb8()) };
            if bg != last_bg {
                match bg {
                    Some(rgb) => line.push_str(&bg_escape(rgb)),
                    None => line.push_str(RESET_BG),
                }
                last_bg = bg;
            }

            let ch = table.char_at(choice.glyph);
            let fg = if ch == ' ' { None } else { Some(choice.fg.to_rgb8()) };
            if fg != last_fg {
                match fg {
                    Some(rgb) => line.push_str(&fg_escape(rgb)),
                    None => line.push_str(RESET_FG),
                }
                last_fg = fg;
            }

            line.push(ch);
        }

        if last_bg.is_some() {
            line.push_str(RESET_BG);
        }
        if last_fg.is_some() {
            line.push_str(RESET_FG);
        }
        while line.ends_with(' ') {
            line.pop();
        }
        line.push('\n');
        raw.push_str(&line);
    }

    while raw.ends_with("\n\n") {
        raw.pop();
    }
    raw
}
