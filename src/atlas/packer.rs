use image::{RgbaImage, imageops};
use log::{debug, info};
use serde_json::{Map, Value};

use crate::error::CellpackError;
use crate::metadata::{AtlasDoc, ItemRecord};
use crate::scan::{Occupancy, ScanMode, scan};

use super::best_size;

/// One image accepted into the packing session
#[derive(Debug)]
pub struct PackedItem {
    /// Source pixels, read again when the atlas raster is built
    pub image: RgbaImage,
    /// Which cells of the source grid carry pixels
    pub occupancy: Occupancy,
    /// First global slot assigned to this item's first occupied cell
    pub pack_offset: u32,
    /// Opaque attributes round-tripped through the metadata
    pub attrs: Map<String, Value>,
}

/// Accumulates source images and produces the atlas raster plus its
/// metadata document.
///
/// Slot assignment is strictly sequential: each `add_image` takes the
/// current `total_cells` as its pack offset, so a packer must stay with a
/// single owner for the whole add/build lifecycle.
pub struct AtlasPacker {
    cell_size: u32,
    cell_padding: u32,
    max_width: u32,
    scan_mode: ScanMode,
    items: Vec<PackedItem>,
    total_cells: u32,
}

impl AtlasPacker {
    pub fn new(cell_size: u32, cell_padding: u32) -> Self {
        Self {
            cell_size,
            cell_padding,
            max_width: 4096,
            scan_mode: ScanMode::OpaqueOnly,
            items: Vec::new(),
            total_cells: 0,
        }
    }

    pub fn max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn scan_mode(mut self, mode: ScanMode) -> Self {
        self.scan_mode = mode;
        self
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn cell_padding(&self) -> u32 {
        self.cell_padding
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[PackedItem] {
        &self.items
    }

    pub fn total_cells(&self) -> u32 {
        self.total_cells
    }

    /// Scan an image and append it to the session. Returns the item index.
    ///
    /// Never fails: an image with no occupied cells still becomes an
    /// addressable item, it just contributes nothing to the atlas.
    pub fn add_image(&mut self, image: RgbaImage, attrs: Map<String, Value>) -> usize {
        let occupancy = scan(&image, self.cell_size, self.scan_mode);
        let cell_count = occupancy.cell_count() as u32;

        debug!(
            "item {}: {}x{}, {} of {} cells occupied",
            self.items.len(),
            image.width(),
            image.height(),
            cell_count,
            occupancy.columns * occupancy.rows,
        );

        self.items.push(PackedItem {
            image,
            occupancy,
            pack_offset: self.total_cells,
            attrs,
        });
        self.total_cells += cell_count;

        self.items.len() - 1
    }

    /// Smallest power-of-two atlas size that holds the current working set
    pub fn best_size(&self) -> Result<(u32, u32), CellpackError> {
        best_size(
            self.total_cells,
            self.cell_size,
            self.cell_padding,
            self.max_width,
        )
    }

    /// Render the atlas raster by copying every occupied cell block into
    /// its global slot.
    ///
    /// Fails with the size optimizer's error when the working set is empty
    /// or exceeds `max_width`; there is no fallback size.
    pub fn build_atlas(&self) -> Result<RgbaImage, CellpackError> {
        let (width, height) = self.best_size()?;
        let cell_area = self.cell_size + 2 * self.cell_padding;
        let xcells = width / cell_area;

        let mut atlas = RgbaImage::new(width, height);

        for item in &self.items {
            for (local, &cell) in item.occupancy.cells.iter().enumerate() {
                let slot = item.pack_offset + local as u32;
                let (dst_x, dst_y) = slot_pixel_origin(slot, xcells, cell_area, self.cell_padding);

                let src_col = cell % item.occupancy.columns;
                let src_row = cell / item.occupancy.columns;
                let src_x = src_col * self.cell_size;
                let src_y = src_row * self.cell_size;
                let copy_w = self.cell_size.min(item.image.width() - src_x);
                let copy_h = self.cell_size.min(item.image.height() - src_y);

                let block =
                    imageops::crop_imm(&item.image, src_x, src_y, copy_w, copy_h).to_image();
                imageops::replace(&mut atlas, &block, i64::from(dst_x), i64::from(dst_y));
            }
        }

        info!(
            "Built {}x{} atlas: {} items, {} cells",
            width,
            height,
            self.items.len(),
            self.total_cells
        );

        Ok(atlas)
    }

    /// Serialize the session into a metadata document.
    ///
    /// `extra` is stored verbatim; the surrounding system conventionally
    /// stashes a source-timestamp token there for cache validation.
    pub fn build_metadata(&self, extra: &str) -> AtlasDoc {
        let items = self
            .items
            .iter()
            .map(|item| ItemRecord {
                width: item.image.width(),
                height: item.image.height(),
                pack_offset: item.pack_offset,
                cell_count: item.occupancy.cell_count() as u32,
                cells: item.occupancy.cells.clone(),
                attrs: item.attrs.clone(),
            })
            .collect::<Vec<_>>();

        AtlasDoc {
            cell_size: self.cell_size,
            cell_padding: self.cell_padding,
            extra: extra.to_string(),
            item_count: items.len() as u32,
            items,
        }
    }
}

/// Top-left pixel of a global slot's payload area (inside the padding)
pub(crate) fn slot_pixel_origin(
    slot: u32,
    xcells: u32,
    cell_area: u32,
    cell_padding: u32,
) -> (u32, u32) {
    let col = slot % xcells;
    let row = slot / xcells;
    (
        col * cell_area + cell_padding,
        row * cell_area + cell_padding,
    )
}
