/// Character-grid geometry derived from the image aspect, the font cell
/// aspect, and the requested column count.
#[derive(Clone, Copy, Debug)]
pub struct GridGeometry {
    pub columns: usize,
    pub rows: usize,
    /// Un-rounded row count. Cell sub-rectangles and the center-out metric
    /// keep the fractional value so the grid covers the image exactly.
    pub exact_rows: f32,
    pub font_aspect: f32,
    cell_width: f32,
    cell_height: f32,
}

/// One cell's sub-rectangle in image space.
#[derive(Clone, Copy, Debug)]
pub struct CellWindow {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl GridGeometry {
    pub fn derive(
        image_width: u32,
        image_height: u32,
        columns: u16,
        font_aspect: f32,
    ) -> Option<Self> {
        if image_width == 0 || image_height == 0 || columns == 0 || font_aspect <= 0.0 {
            return None;
        }

        let columns = columns as usize;
        let exact_rows =
            image_height as f32 * columns as f32 / image_width as f32 / font_aspect;
        let rows = exact_rows.ceil() as usize;

        Some(Self {
            columns,
            rows,
            exact_rows,
            font_aspect,
            cell_width: image_width as f32 / columns as f32,
            cell_height: image_height as f32 / exact_rows,
        })
    }

    pub fn cell_count(&self) -> usize {
        self.columns * self.rows
    }

    pub fn cell_window(&self, char_x: usize, char_y: usize) -> CellWindow {
        CellWindow {
            x: char_x as f32 * self.cell_width,
            y: char_y as f32 * self.cell_height,
            width: self.cell_width,
            height: self.cell_height,
        }
    }

    /// Squared distance from the grid center, with the vertical axis
    /// weighted by the font aspect so the priority contour is visually
    /// circular on non-square cells.
    pub fn center_distance(&self, char_x: usize, char_y: usize) -> f32 {
        let dx = char_x as f32 - self.columns as f32 / 2.0;
        let dy = char_y as f32 - self.exact_rows / 2.0;
        dx * dx / self.font_aspect + dy * dy * self.font_aspect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_round_up() {
        // 100x50 at 10 columns with a 2:1 cell: 50 * 10 / 100 / 2 = 2.5.
        let geometry = GridGeometry::derive(100, 50, 10, 2.0).unwrap();
        assert_eq!(geometry.columns, 10);
        assert_eq!(geometry.rows, 3);
        assert!((geometry.exact_rows - 2.5).abs() < 1e-6);
    }

    #[test]
    fn degenerate_input_yields_none() {
        assert!(GridGeometry::derive(0, 50, 10, 2.0).is_none());
        assert!(GridGeometry::derive(100, 0, 10, 2.0).is_none());
        assert!(GridGeometry::derive(100, 50, 0, 2.0).is_none());
        assert!(GridGeometry::derive(100, 50, 10, 0.0).is_none());
    }

    #[test]
    fn windows_tile_the_image() {
        let geometry = GridGeometry::derive(100, 50, 10, 2.0).unwrap();
        let window = geometry.cell_window(0, 0);
        assert!((window.width - 10.0).abs() < 1e-6);
        assert!((window.height - 20.0).abs() < 1e-6);
        let last = geometry.cell_window(9, 2);
        assert!((last.x - 90.0).abs() < 1e-6);
        assert!((last.y - 40.0).abs() < 1e-6);
    }

    #[test]
    fn center_distance_prefers_the_middle() {
        let geometry = GridGeometry::derive(100, 100, 10, 1.0).unwrap();
        let center = geometry.center_distance(5, 5);
        let corner = geometry.center_distance(0, 0);
        assert!(center < corner);
    }
}
