use clap::ValueEnum;
use image::RgbaImage;
use rayon::prelude::*;

/// Which pixels count as meaningful when deciding cell occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ScanMode {
    /// A cell is occupied if any pixel has alpha > 0
    #[default]
    #[value(name = "opaque")]
    OpaqueOnly,
    /// A cell is occupied if any pixel has a non-zero color channel
    #[value(name = "non-black")]
    NonBlackOnly,
}

/// Occupancy of one source image's cell grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupancy {
    /// Grid columns: ceil(width / cell_size)
    pub columns: u32,
    /// Grid rows: ceil(height / cell_size)
    pub rows: u32,
    /// Occupied cell indices, ascending, row-major
    pub cells: Vec<u32>,
}

impl Occupancy {
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Scan an image's cell grid and report which cells hold meaningful pixels.
///
/// Edge cells are clipped to the image bounds, so an image whose dimensions
/// are not multiples of `cell_size` still covers every pixel exactly once.
/// The scan is pure and runs cells in parallel; the result order is the
/// row-major grid order regardless of scheduling.
pub fn scan(image: &RgbaImage, cell_size: u32, mode: ScanMode) -> Occupancy {
    debug_assert!(cell_size > 0);
    let (width, height) = image.dimensions();

    if width == 0 || height == 0 {
        return Occupancy {
            columns: 0,
            rows: 0,
            cells: Vec::new(),
        };
    }

    let columns = width.div_ceil(cell_size);
    let rows = height.div_ceil(cell_size);

    let cells: Vec<u32> = (0..columns * rows)
        .into_par_iter()
        .filter(|&index| {
            let col = index % columns;
            let row = index / columns;
            cell_occupied(image, col * cell_size, row * cell_size, cell_size, mode)
        })
        .collect();

    Occupancy {
        columns,
        rows,
        cells,
    }
}

fn cell_occupied(image: &RgbaImage, x0: u32, y0: u32, cell_size: u32, mode: ScanMode) -> bool {
    let x1 = (x0 + cell_size).min(image.width());
    let y1 = (y0 + cell_size).min(image.height());

    for y in y0..y1 {
        for x in x0..x1 {
            let pixel = image.get_pixel(x, y);
            let hit = match mode {
                ScanMode::OpaqueOnly => pixel[3] > 0,
                ScanMode::NonBlackOnly => pixel[0] > 0 || pixel[1] > 0 || pixel[2] > 0,
            };
            if hit {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::new(w, h)
    }

    #[test]
    fn test_empty_image() {
        let result = scan(&blank(0, 0), 16, ScanMode::OpaqueOnly);
        assert_eq!(result.columns, 0);
        assert_eq!(result.rows, 0);
        assert!(result.cells.is_empty());
    }

    #[test]
    fn test_fully_transparent() {
        let result = scan(&blank(40, 24), 16, ScanMode::OpaqueOnly);
        assert_eq!(result.columns, 3);
        assert_eq!(result.rows, 2);
        assert!(result.cells.is_empty());
    }

    #[test]
    fn test_single_pixel_marks_one_cell() {
        let mut img = blank(48, 48);
        // (20, 35) lands in column 1, row 2 of a 16px grid
        img.put_pixel(20, 35, Rgba([0, 0, 0, 255]));

        let result = scan(&img, 16, ScanMode::OpaqueOnly);
        assert_eq!(result.columns, 3);
        assert_eq!(result.rows, 3);
        assert_eq!(result.cells, vec![2 * 3 + 1]);
    }

    #[test]
    fn test_clipped_edge_cell() {
        // 17x17 image: grid is 2x2, the last pixel sits in the 1x1
        // bottom-right clipped cell
        let mut img = blank(17, 17);
        img.put_pixel(16, 16, Rgba([255, 255, 255, 255]));

        let result = scan(&img, 16, ScanMode::OpaqueOnly);
        assert_eq!(result.columns, 2);
        assert_eq!(result.rows, 2);
        assert_eq!(result.cells, vec![3]);
    }

    #[test]
    fn test_mode_predicates() {
        let mut img = blank(16, 16);
        // transparent red: meaningful for NonBlackOnly, not OpaqueOnly
        img.put_pixel(0, 0, Rgba([255, 0, 0, 0]));

        assert!(scan(&img, 16, ScanMode::OpaqueOnly).cells.is_empty());
        assert_eq!(scan(&img, 16, ScanMode::NonBlackOnly).cells, vec![0]);

        // opaque black: the other way around
        let mut img = blank(16, 16);
        img.put_pixel(5, 5, Rgba([0, 0, 0, 255]));

        assert_eq!(scan(&img, 16, ScanMode::OpaqueOnly).cells, vec![0]);
        assert!(scan(&img, 16, ScanMode::NonBlackOnly).cells.is_empty());
    }

    #[test]
    fn test_indices_ascending_and_deterministic() {
        let mut img = blank(64, 64);
        for &(x, y) in &[(2u32, 2u32), (50, 2), (18, 30), (60, 60), (2, 50)] {
            img.put_pixel(x, y, Rgba([10, 20, 30, 255]));
        }

        let first = scan(&img, 16, ScanMode::OpaqueOnly);
        let mut sorted = first.cells.clone();
        sorted.sort_unstable();
        assert_eq!(first.cells, sorted, "indices must come out ascending");

        for _ in 0..10 {
            assert_eq!(scan(&img, 16, ScanMode::OpaqueOnly), first);
        }
    }

    #[test]
    fn test_fully_opaque_marks_every_cell() {
        let mut img = blank(33, 16);
        for pixel in img.pixels_mut() {
            *pixel = Rgba([1, 2, 3, 255]);
        }

        let result = scan(&img, 16, ScanMode::OpaqueOnly);
        assert_eq!(result.columns, 3);
        assert_eq!(result.rows, 1);
        assert_eq!(result.cells, vec![0, 1, 2]);
    }
}
