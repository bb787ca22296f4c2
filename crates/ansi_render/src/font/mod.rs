mod table;

pub use table::{FontError, FontOptions, GlyphTable};
