mod color;
mod font;
mod image_pipeline;
mod render;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use image::DynamicImage;
use log::{debug, warn};
use parking_lot::Mutex;

pub use color::Rgba;
pub use font::{FontError, FontOptions, GlyphTable};
pub use image_pipeline::{CellWindow, GridGeometry, SourceImage, SourceImageError};

use render::scheduler::{self, PreviewCanvas, RenderState};
use render::{assemble, encode};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no font has been loaded")]
    MissingFont,
    #[error("no image has been loaded")]
    MissingImage,
    #[error("unsupported layout dimensions")]
    InvalidLayout,
    #[error("every glyph in the table is forbidden")]
    NoCandidates,
    #[error("a render is already in progress")]
    Busy,
}

/// Per-render configuration.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Output grid width in character cells.
    pub columns: u16,
    /// Worker threads for the cell pool.
    pub worker_count: usize,
    /// Characters excluded from matching.
    pub forbidden: HashSet<char>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { columns: 80, worker_count: 8, forbidden: HashSet::new() }
    }
}

/// Pixel preview of the rendered grid, one glyph-sized tile per cell.
#[derive(Clone, Debug, Default)]
pub struct PreviewImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Everything one render produces. Rebuilt wholesale on every render; a
/// cancelled render leaves the empty-output state behind (empty text, the
/// preview buffer zeroed but still sized).
#[derive(Clone, Debug, Default)]
pub struct RenderArtifact {
    /// Terminal-ready text.
    pub raw: String,
    /// The raw text wrapped as a C character-array literal.
    pub c_literal: String,
    /// The raw text wrapped as an `echo -ne` shell command.
    pub shell_command: String,
    pub preview: PreviewImage,
}

impl RenderArtifact {
    /// True for the cleared artifact a cancelled render leaves behind.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Image-to-ANSI-art rendering engine.
///
/// Load a font and an image once, then render any number of times. The
/// synchronous [`render`](Self::render) blocks on the calling thread; the
/// asynchronous [`start_render`](Self::start_render) hands the same work to
/// a supervisor thread and is observed through
/// [`progress`](Self::progress) / [`is_rendering`](Self::is_rendering) /
/// [`artifact`](Self::artifact).
#[derive(Default)]
pub struct AnsiArtRenderer {
    table: Option<Arc<GlyphTable>>,
    image: Option<Arc<SourceImage>>,
    state: Arc<RenderState>,
    last: Arc<Mutex<Arc<RenderArtifact>>>,
}

impl AnsiArtRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the glyph table from raw font bytes, replacing any previous
    /// table. On success the matchable character set is readable via
    /// [`glyphs`](Self::glyphs).
    pub fn load_font(&mut self, data: &[u8], options: &FontOptions) -> Result<(), FontError> {
        self.table = Some(Arc::new(GlyphTable::from_bytes(data, options)?));
        Ok(())
    }

    /// Install a prebuilt glyph table.
    pub fn set_glyph_table(&mut self, table: GlyphTable) {
        self.table = Some(Arc::new(table));
    }

    /// Characters available for matching, in table order.
    pub fn glyphs(&self) -> Option<&str> {
        self.table.as_deref().map(GlyphTable::charset)
    }

    /// Copy in a row-major RGBA8 buffer, validating its length.
    pub fn load_image(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), SourceImageError> {
        self.image = Some(Arc::new(SourceImage::from_rgba8(width, height, rgba.to_vec())?));
        Ok(())
    }

    /// Adapt an already-decoded image.
    pub fn load_dynamic_image(&mut self, image: &DynamicImage) {
        self.image = Some(Arc::new(SourceImage::from_image(image)));
    }

    /// Render synchronously on the calling thread.
    ///
    /// Cancellation is not an error: the result is `Ok` with an empty
    /// artifact and the engine is immediately ready for a new render.
    pub fn render(&self, config: &RenderConfig) -> Result<Arc<RenderArtifact>, RenderError> {
        let table = self.table.clone().ok_or(RenderError::MissingFont)?;
        let image = self.image.clone().ok_or(RenderError::MissingImage)?;
        if !self.state.try_begin() {
            return Err(RenderError::Busy);
        }

        match run_render(&table, &image, config, &self.state) {
            Ok(artifact) => {
                let artifact = Arc::new(artifact);
                *self.last.lock() = Arc::clone(&artifact);
                self.state.complete();
                Ok(artifact)
            },
            Err(err) => {
                self.state.release();
                Err(err)
            },
        }
    }

    /// Launch a render on a supervisor thread and return immediately.
    ///
    /// A no-op while another render is active or before a font and image
    /// have been loaded. Poll [`progress`](Self::progress) and
    /// [`is_rendering`](Self::is_rendering); the finished output is read
    /// with [`artifact`](Self::artifact).
    pub fn start_render(&self, config: RenderConfig) {
        let (Some(table), Some(image)) = (self.table.clone(), self.image.clone()) else {
            warn!("start_render called without a font and image loaded");
            return;
        };
        if !self.state.try_begin() {
            return;
        }

        let state = Arc::clone(&self.state);
        let last = Arc::clone(&self.last);
        thread::spawn(move || {
            match run_render(&table, &image, &config, &state) {
                Ok(artifact) => *last.lock() = Arc::new(artifact),
                Err(err) => warn!("background render failed: {err}"),
            }
            state.complete();
        });
    }

    /// Progress of the active render in `0.0..=1.0`; reaches 1 only once
    /// the render has completed.
    pub fn progress(&self) -> f32 {
        self.state.progress()
    }

    pub fn is_rendering(&self) -> bool {
        self.state.is_running()
    }

    /// Request cancellation of the active render. Best-effort and
    /// asynchronous: each worker notices after finishing its current cell,
    /// and the render then degrades to the empty-output state rather than
    /// exposing partial results.
    pub fn cancel_render(&self) {
        self.state.request_cancel();
    }

    /// Artifact of the most recently completed render.
    pub fn artifact(&self) -> Arc<RenderArtifact> {
        Arc::clone(&self.last.lock())
    }
}

fn run_render(
    table: &GlyphTable,
    image: &SourceImage,
    config: &RenderConfig,
    state: &RenderState,
) -> Result<RenderArtifact, RenderError> {
    let geometry =
        GridGeometry::derive(image.width(), image.height(), config.columns, table.aspect())
            .ok_or(RenderError::InvalidLayout)?;

    if (0..table.len()).all(|index| config.forbidden.contains(&table.char_at(index))) {
        return Err(RenderError::NoCandidates);
    }

    let mut canvas = PreviewCanvas::new(
        geometry.columns * table.cell_width(),
        geometry.rows * table.cell_height(),
    );

    debug!(
        "rendering {}x{} cells with {} workers",
        geometry.columns,
        geometry.rows,
        config.worker_count.max(1)
    );

    let preview_size = (canvas.width() as u32, canvas.height() as u32);
    match scheduler::run_pool(
        table,
        image,
        &geometry,
        &config.forbidden,
        config.worker_count,
        state,
        &mut canvas,
    ) {
        Some(results) => {
            let raw = assemble::assemble(table, geometry.columns, results);
            let c_literal = encode::c_literal(&raw);
            let shell_command = encode::shell_command(&raw);
            Ok(RenderArtifact {
                raw,
                c_literal,
                shell_command,
                preview: PreviewImage {
                    width: preview_size.0,
                    height: preview_size.1,
                    rgba: canvas.into_pixels(),
                },
            })
        },
        None => Ok(RenderArtifact {
            preview: PreviewImage {
                width: preview_size.0,
                height: preview_size.1,
                rgba: canvas.into_pixels(),
            },
            ..RenderArtifact::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn block_and_space() -> GlyphTable {
        GlyphTable::from_parts(1, 2, [(' ', vec![0, 0]), ('\u{2588}', vec![255, 255])])
            .unwrap()
    }

    fn renderer_with(table: GlyphTable, width: u32, height: u32, rgba: Vec<u8>) -> AnsiArtRenderer {
        let mut renderer = AnsiArtRenderer::new();
        renderer.set_glyph_table(table);
        renderer.load_image(width, height, &rgba).unwrap();
        renderer
    }

    fn config(columns: u16, workers: usize) -> RenderConfig {
        RenderConfig { columns, worker_count: workers, ..RenderConfig::default() }
    }

    fn checkerboard(size: u32) -> Vec<u8> {
        let mut rgba = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let on = (x + y) % 2 == 0;
                rgba.extend_from_slice(if on {
                    &[230, 40, 10, 255]
                } else {
                    &[10, 40, 230, 255]
                });
            }
        }
        rgba
    }

    #[test]
    fn missing_font_and_image_are_reported() {
        let renderer = AnsiArtRenderer::new();
        assert!(matches!(
            renderer.render(&config(4, 1)),
            Err(RenderError::MissingFont)
        ));

        let mut renderer = AnsiArtRenderer::new();
        renderer.set_glyph_table(block_and_space());
        assert!(matches!(
            renderer.render(&config(4, 1)),
            Err(RenderError::MissingImage)
        ));
    }

    #[test]
    fn zero_sized_image_is_invalid_layout() {
        let renderer = renderer_with(block_and_space(), 0, 0, Vec::new());
        assert!(matches!(
            renderer.render(&config(4, 1)),
            Err(RenderError::InvalidLayout)
        ));
    }

    #[test]
    fn fully_forbidden_table_is_rejected() {
        let renderer = renderer_with(block_and_space(), 2, 2, checkerboard(2));
        let config = RenderConfig {
            columns: 2,
            worker_count: 1,
            forbidden: [' ', '\u{2588}'].into_iter().collect(),
        };
        assert!(matches!(renderer.render(&config), Err(RenderError::NoCandidates)));
    }

    #[test]
    fn solid_color_cell_reconstructs_the_color() {
        let renderer =
            renderer_with(block_and_space(), 1, 1, vec![200, 40, 90, 255]);
        let artifact = renderer.render(&config(1, 1)).unwrap();

        // One cell; its composite must carry the source color either as
        // ink or as background.
        assert!(artifact.raw.contains("200;40;90"));
        assert_eq!(artifact.preview.width, 1);
        assert_eq!(artifact.preview.height, 2);
        for pixel in artifact.preview.rgba.chunks(4) {
            assert_eq!(pixel, &[200, 40, 90, 255]);
        }
    }

    #[test]
    fn worker_count_does_not_affect_the_output() {
        let single = renderer_with(block_and_space(), 8, 8, checkerboard(8))
            .render(&config(8, 1))
            .unwrap();
        let pooled = renderer_with(block_and_space(), 8, 8, checkerboard(8))
            .render(&config(8, 8))
            .unwrap();
        assert!(!single.raw.is_empty());
        assert_eq!(single.raw, pooled.raw);
        assert_eq!(single.preview.rgba, pooled.preview.rgba);
    }

    #[test]
    fn encodings_derive_from_the_raw_text() {
        let artifact = renderer_with(block_and_space(), 4, 4, checkerboard(4))
            .render(&config(4, 2))
            .unwrap();
        assert!(artifact.c_literal.starts_with("char kAnsiArt[] = \""));
        assert!(artifact.shell_command.starts_with("echo -ne '"));
        assert!(!artifact.c_literal.contains('\x1b'));
        assert!(!artifact.shell_command.contains('\x1b'));
    }

    #[test]
    fn progress_is_monotonic_and_completes() {
        let renderer = renderer_with(block_and_space(), 16, 16, checkerboard(16));
        renderer.start_render(config(16, 2));

        let mut observed = vec![renderer.progress()];
        while renderer.is_rendering() {
            observed.push(renderer.progress());
            thread::sleep(Duration::from_millis(1));
        }
        observed.push(renderer.progress());

        assert!(observed.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(*observed.last().unwrap(), 1.0);
        assert!(!renderer.artifact().is_empty());
    }

    #[test]
    fn second_render_reuses_the_engine() {
        let renderer = renderer_with(block_and_space(), 4, 4, checkerboard(4));
        let first = renderer.render(&config(4, 2)).unwrap();
        let second = renderer.render(&config(4, 2)).unwrap();
        assert_eq!(first.raw, second.raw);
    }

    #[test]
    fn artifact_starts_empty() {
        let renderer = AnsiArtRenderer::new();
        assert!(renderer.artifact().is_empty());
        assert_eq!(renderer.progress(), 0.0);
        assert!(!renderer.is_rendering());
    }
}
