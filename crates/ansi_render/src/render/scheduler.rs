use std::collections::HashSet;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::font::GlyphTable;
use crate::image_pipeline::{GridGeometry, SourceImage};
use crate::render::matcher::{self, CellChoice};

/// Shared per-engine render state, safe to poll from any thread.
#[derive(Debug, Default)]
pub struct RenderState {
    /// `f32` progress in `0.0..=1.0`, stored as bits.
    progress: AtomicU32,
    cancel: AtomicBool,
    running: AtomicBool,
}

impl RenderState {
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Acquire))
    }

    pub(crate) fn set_progress(&self, value: f32) {
        self.progress.store(value.to_bits(), Ordering::Release);
    }

    /// Ask the active render to stop. Best-effort: workers notice after
    /// finishing their current cell.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Claim the state for a new render: progress back to zero, any stale
    /// cancellation request cleared. Fails while another render owns it.
    pub(crate) fn try_begin(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.cancel.store(false, Ordering::Release);
        self.set_progress(0.0);
        true
    }

    /// Normal or cancelled completion: progress lands on 1.
    pub(crate) fn complete(&self) {
        self.set_progress(1.0);
        self.running.store(false, Ordering::Release);
    }

    /// Give the state back without touching progress (failed setup).
    pub(crate) fn release(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// RGBA8 pixel buffer the workers composite finished cells into.
pub(crate) struct PreviewCanvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl PreviewCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0; width * height * 4] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn writer(&mut self) -> TileWriter<'_> {
        TileWriter {
            ptr: self.pixels.as_mut_ptr(),
            len: self.pixels.len(),
            canvas_width: self.width,
            _canvas: PhantomData,
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    #[cfg(test)]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// Write handle shared by the worker threads.
///
/// Each task owns the pixel tile of its own cell and the board hands every
/// cell to exactly one worker, so tiles never overlap and the writes need
/// no lock.
struct TileWriter<'a> {
    ptr: *mut u8,
    len: usize,
    canvas_width: usize,
    _canvas: PhantomData<&'a mut [u8]>,
}

// SAFETY: all writes go through `paint_cell`, which only touches the
// disjoint tile of the caller's current task.
unsafe impl Send for TileWriter<'_> {}
unsafe impl Sync for TileWriter<'_> {}

impl TileWriter<'_> {
    /// Composite one cell's glyph over its background into the preview.
    fn paint_cell(&self, table: &GlyphTable, char_x: usize, char_y: usize, choice: &CellChoice) {
        let cell_width = table.cell_width();
        let cell_height = table.cell_height();
        let coverage = table.coverage(choice.glyph);

        for y in 0..cell_height {
            for x in 0..cell_width {
                let fg = coverage[y * cell_width + x] as f32 / 255.0;
                let pixel = (choice.fg.scale(fg) + choice.bg.scale(1.0 - fg)).to_rgba8();

                let px = char_x * cell_width + x;
                let py = char_y * cell_height + y;
                let i = (py * self.canvas_width + px) * 4;
                debug_assert!(i + 4 <= self.len);
                // SAFETY: `i` is inside the buffer and inside this task's
                // tile; no other live task shares the cell.
                unsafe {
                    ptr::copy_nonoverlapping(pixel.as_ptr(), self.ptr.add(i), 4);
                }
            }
        }
    }
}

/// One grid cell awaiting a match.
#[derive(Clone, Copy, Debug)]
struct Task {
    char_x: usize,
    char_y: usize,
}

/// One matched cell; exactly one is produced per task.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CellResult {
    pub char_x: usize,
    pub char_y: usize,
    pub choice: CellChoice,
}

/// Task list and completed results behind the pool's single lock; progress
/// is recomputed while the lock is held.
struct Board {
    tasks: Vec<Task>,
    results: Vec<CellResult>,
}

/// Run the cell pool to completion or cancellation.
///
/// Tasks are ordered center-out and consumed by `worker_count` OS threads.
/// Returns `None` after a cancellation: results are discarded and the
/// preview canvas zeroed, leaving no partial output behind.
pub(crate) fn run_pool(
    table: &GlyphTable,
    image: &SourceImage,
    geometry: &GridGeometry,
    forbidden: &HashSet<char>,
    worker_count: usize,
    state: &RenderState,
    canvas: &mut PreviewCanvas,
) -> Option<Vec<CellResult>> {
    let mut tasks = Vec::with_capacity(geometry.cell_count());
    for char_y in 0..geometry.rows {
        for char_x in 0..geometry.columns {
            tasks.push(Task { char_x, char_y });
        }
    }

    // Descending center distance; the back of the list is consumed first,
    // so cells nearest the center render first.
    tasks.sort_unstable_by(|a, b| {
        let da = geometry.center_distance(a.char_x, a.char_y);
        let db = geometry.center_distance(b.char_x, b.char_y);
        db.total_cmp(&da)
            .then_with(|| a.char_x.cmp(&b.char_x))
            .then_with(|| a.char_y.cmp(&b.char_y))
    });

    let total = tasks.len();
    let board = Mutex::new(Board { tasks, results: Vec::with_capacity(total) });
    let writer = canvas.writer();
    let workers = worker_count.max(1);

    let cancelled = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            handles.push(scope.spawn(|| {
                worker_loop(table, image, geometry, forbidden, state, &board, &writer)
            }));
        }
        // A worker that panicked is treated like one that was cancelled.
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(true))
            .fold(false, |acc, cancelled| acc | cancelled)
    });

    if cancelled {
        debug!("render cancelled, discarding partial results");
        canvas.clear();
        return None;
    }

    Some(board.into_inner().results)
}

fn worker_loop(
    table: &GlyphTable,
    image: &SourceImage,
    geometry: &GridGeometry,
    forbidden: &HashSet<char>,
    state: &RenderState,
    board: &Mutex<Board>,
    writer: &TileWriter<'_>,
) -> bool {
    loop {
        let task = match board.lock().tasks.pop() {
            Some(task) => task,
            None => return false,
        };

        let window = geometry.cell_window(task.char_x, task.char_y);
        let Some(choice) = matcher::best_match(table, image, window, forbidden) else {
            // Unreachable when the caller has validated the candidate set;
            // degrade to the cancelled outcome rather than emit a hole.
            warn!("cell ({}, {}) matched no glyph", task.char_x, task.char_y);
            return true;
        };

        {
            let mut board = board.lock();
            board.results.push(CellResult {
                char_x: task.char_x,
                char_y: task.char_y,
                choice,
            });
            let completed = board.results.len() as f32;
            let remaining = board.tasks.len() as f32;
            state.set_progress(completed / (completed + remaining + 1.0));
        }

        writer.paint_cell(table, task.char_x, task.char_y, &choice);

        if state.cancel_requested() {
            return true;
        }
    }
}
