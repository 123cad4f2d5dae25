//! Composite grid layout

use serde::Serialize;

/// Width every camera stream is scaled to before composition
pub const CELL_WIDTH: u32 = 1280;
/// Height every camera stream is scaled to before composition
pub const CELL_HEIGHT: u32 = 960;
/// Short edge of the mobile-tier output
pub const MOBILE_SHORT_EDGE: u32 = 1080;

/// Grid of equally sized cells filled in selection order, row by row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridLayout {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    /// Top-left corner of each camera's cell
    pub cells: Vec<(u32, u32)>,
}

impl GridLayout {
    /// Column count for `cameras` streams
    pub fn columns_for(cameras: usize) -> u32 {
        match cameras {
            0 | 1 => 1,
            2 => 2,
            3 => 3,
            4 => 2,
            _ => 3,
        }
    }

    pub fn for_cameras(cameras: usize) -> Self {
        Self::with_cell(cameras, CELL_WIDTH, CELL_HEIGHT)
    }

    pub fn with_cell(cameras: usize, cell_width: u32, cell_height: u32) -> Self {
        let columns = Self::columns_for(cameras);
        let count = cameras.max(1) as u32;
        let rows = count.div_ceil(columns);
        let cells = (0..cameras as u32)
            .map(|i| ((i % columns) * cell_width, (i / columns) * cell_height))
            .collect();

        Self {
            columns,
            rows,
            cell_width,
            cell_height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.columns * self.cell_width
    }

    pub fn height(&self) -> u32 {
        self.rows * self.cell_height
    }

    /// `layout=` argument for the xstack filter, e.g. `0_0|1280_0`
    pub fn xstack_layout(&self) -> String {
        self.cells
            .iter()
            .map(|(x, y)| format!("{}_{}", x, y))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Output size after the mobile rescale
    pub fn mobile_dimensions(&self) -> (u32, u32) {
        scale_to_short_edge(self.width(), self.height(), MOBILE_SHORT_EDGE)
    }
}

/// Scale `width`x`height` uniformly so its shorter side equals `short_edge`.
/// The other side is rounded to the nearest even number.
pub fn scale_to_short_edge(width: u32, height: u32, short_edge: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (short_edge, short_edge);
    }
    if height <= width {
        let scaled = width as f64 * short_edge as f64 / height as f64;
        (round_even(scaled), short_edge)
    } else {
        let scaled = height as f64 * short_edge as f64 / width as f64;
        (short_edge, round_even(scaled))
    }
}

fn round_even(value: f64) -> u32 {
    ((value / 2.0).round() * 2.0) as u32
}
