mod geometry;

pub use geometry::{VERTICES_PER_CELL, Vertex};

use image::{RgbaImage, imageops};
use serde_json::{Map, Value};

use crate::atlas::slot_pixel_origin;
use crate::error::CellpackError;
use crate::metadata::{AtlasDoc, ItemRecord};

/// Default inward UV bias, in pixels, keeping samples off cell boundaries
pub const DEFAULT_UV_ADJUST: f32 = 0.01;

/// Read-only view over a metadata document.
///
/// A loaded reader is immutable and can be shared across threads; both
/// `reconstruct` and `build_vertices` only read the document and the
/// caller-supplied atlas raster.
#[derive(Debug, Clone)]
pub struct AtlasReader {
    doc: AtlasDoc,
    uv_adjust: f32,
}

impl AtlasReader {
    /// Parse, validate, and wrap a metadata document.
    pub fn load(text: &str) -> Result<Self, CellpackError> {
        Ok(Self::from_doc(AtlasDoc::parse(text)?))
    }

    /// Wrap an already validated document.
    pub fn from_doc(doc: AtlasDoc) -> Self {
        Self {
            doc,
            uv_adjust: DEFAULT_UV_ADJUST,
        }
    }

    /// Override the inward UV bias (pixels, applied before normalization).
    pub fn uv_adjust(mut self, adjust: f32) -> Self {
        self.uv_adjust = adjust;
        self
    }

    pub fn cell_size(&self) -> u32 {
        self.doc.cell_size
    }

    pub fn cell_padding(&self) -> u32 {
        self.doc.cell_padding
    }

    pub fn extra(&self) -> &str {
        &self.doc.extra
    }

    pub fn image_count(&self) -> usize {
        self.doc.items.len()
    }

    pub fn image_size(&self, index: usize) -> Result<(u32, u32), CellpackError> {
        let item = self.item(index)?;
        Ok((item.width, item.height))
    }

    pub fn image_extra(&self, index: usize) -> Result<&Map<String, Value>, CellpackError> {
        Ok(&self.item(index)?.attrs)
    }

    /// Rebuild one source image from the atlas raster.
    ///
    /// Occupied cells are copied back pixel-for-pixel; everything else in
    /// the output stays fully transparent. This is the exact inverse of
    /// the packer's cell copy.
    pub fn reconstruct(&self, atlas: &RgbaImage, index: usize) -> Result<RgbaImage, CellpackError> {
        let item = self.item(index)?;
        let cell_size = self.doc.cell_size;
        let xcells = self.atlas_xcells(atlas.width())?;

        let mut output = RgbaImage::new(item.width, item.height);

        for (local, &cell) in item.cells.iter().enumerate() {
            let slot = item.pack_offset + local as u32;
            let (src_x, src_y) = slot_pixel_origin(
                slot,
                xcells,
                self.cell_area(),
                self.doc.cell_padding,
            );

            let columns = item.columns(cell_size);
            let dst_x = (cell % columns) * cell_size;
            let dst_y = (cell / columns) * cell_size;
            let copy_w = cell_size.min(item.width - dst_x);
            let copy_h = cell_size.min(item.height - dst_y);

            if src_x + copy_w > atlas.width() || src_y + copy_h > atlas.height() {
                return Err(CellpackError::AtlasMismatch {
                    width: atlas.width(),
                    height: atlas.height(),
                    slot,
                });
            }

            let block = imageops::crop_imm(atlas, src_x, src_y, copy_w, copy_h).to_image();
            imageops::replace(&mut output, &block, i64::from(dst_x), i64::from(dst_y));
        }

        Ok(output)
    }

    /// Number of vertices `build_vertices` needs for one item
    pub fn vertex_count(&self, index: usize) -> Result<usize, CellpackError> {
        Ok(self.item(index)?.cells.len() * VERTICES_PER_CELL)
    }

    /// Emit renderable quads for one item into `out`.
    ///
    /// Each occupied cell becomes six vertices in the fixed corner order
    /// TL, TR, BR, BL, TL, BR. Positions are the cell's source grid
    /// coordinates flipped to Y-up (`y_world = height - y_bitmap`); UVs
    /// address the cell's atlas slot, nudged inward by the UV bias so a
    /// bilinear sample never touches padding or a neighboring cell.
    ///
    /// If `out` is too small, only whole cells are written; a cell is
    /// never split across the truncation boundary. Returns the number of
    /// vertices written.
    pub fn build_vertices(
        &self,
        atlas_width: u32,
        atlas_height: u32,
        index: usize,
        out: &mut [Vertex],
    ) -> Result<usize, CellpackError> {
        let item = self.item(index)?;
        let cell_size = self.doc.cell_size;
        let xcells = self.atlas_xcells(atlas_width)?;

        let quads = item.cells.len().min(out.len() / VERTICES_PER_CELL);
        let columns = item.columns(cell_size);
        let height = item.height as f32;
        let adj = self.uv_adjust;
        let (atlas_w, atlas_h) = (atlas_width as f32, atlas_height as f32);

        for local in 0..quads {
            let cell = item.cells[local];
            let slot = item.pack_offset + local as u32;
            let (pack_x, pack_y) = slot_pixel_origin(
                slot,
                xcells,
                self.cell_area(),
                self.doc.cell_padding,
            );

            let x0 = ((cell % columns) * cell_size) as f32;
            let y_bitmap = ((cell / columns) * cell_size) as f32;
            let x1 = x0 + cell_size as f32;
            let y_top = height - y_bitmap;
            let y_bottom = height - (y_bitmap + cell_size as f32);

            let u0 = (pack_x as f32 + adj) / atlas_w;
            let u1 = (pack_x as f32 + cell_size as f32 - adj) / atlas_w;
            let v0 = (pack_y as f32 + adj) / atlas_h;
            let v1 = (pack_y as f32 + cell_size as f32 - adj) / atlas_h;

            let tl = Vertex {
                position: [x0, y_top, 0.0],
                uv: [u0, v0],
            };
            let tr = Vertex {
                position: [x1, y_top, 0.0],
                uv: [u1, v0],
            };
            let br = Vertex {
                position: [x1, y_bottom, 0.0],
                uv: [u1, v1],
            };
            let bl = Vertex {
                position: [x0, y_bottom, 0.0],
                uv: [u0, v1],
            };

            let base = local * VERTICES_PER_CELL;
            out[base..base + VERTICES_PER_CELL].copy_from_slice(&[tl, tr, br, bl, tl, br]);
        }

        Ok(quads * VERTICES_PER_CELL)
    }

    fn item(&self, index: usize) -> Result<&ItemRecord, CellpackError> {
        self.doc
            .items
            .get(index)
            .ok_or(CellpackError::IndexOutOfRange {
                index,
                count: self.doc.items.len(),
            })
    }

    fn cell_area(&self) -> u32 {
        self.doc.cell_size + 2 * self.doc.cell_padding
    }

    fn atlas_xcells(&self, atlas_width: u32) -> Result<u32, CellpackError> {
        let xcells = atlas_width / self.cell_area();
        if xcells == 0 && self.doc.total_cells() > 0 {
            return Err(CellpackError::AtlasMismatch {
                width: atlas_width,
                height: 0,
                slot: 0,
            });
        }
        Ok(xcells.max(1))
    }
}
