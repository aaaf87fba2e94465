use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CellpackError;

/// One packed image as recorded in the metadata document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Original image width in pixels
    pub width: u32,
    /// Original image height in pixels
    pub height: u32,
    /// First global slot assigned to this item
    pub pack_offset: u32,
    /// Declared number of occupied cells; must equal `cells.len()`
    pub cell_count: u32,
    /// Occupied cell indices, ascending, in source row-major order
    pub cells: Vec<u32>,
    /// Open attribute bag (page, layer, blend, ...), never interpreted here
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl ItemRecord {
    /// Grid columns of the source image for this document's cell size
    pub fn columns(&self, cell_size: u32) -> u32 {
        self.width.div_ceil(cell_size)
    }

    /// Grid rows of the source image for this document's cell size
    pub fn rows(&self, cell_size: u32) -> u32 {
        self.height.div_ceil(cell_size)
    }
}

/// The serialized description of one packing session.
///
/// Field order and the order of `cells` are part of the contract: the
/// reader maps an item's n-th listed cell to global slot
/// `pack_offset + n`. Unknown attributes on items are accepted and kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasDoc {
    /// Edge length of the square packing cell, in pixels
    pub cell_size: u32,
    /// Border reserved around each cell in the atlas, in pixels
    pub cell_padding: u32,
    /// Opaque caller string, stored verbatim (cache token by convention)
    pub extra: String,
    /// Declared number of items; must equal `items.len()`
    pub item_count: u32,
    pub items: Vec<ItemRecord>,
}

impl AtlasDoc {
    /// Parse and structurally validate a metadata document.
    pub fn parse(text: &str) -> Result<Self, CellpackError> {
        let doc: AtlasDoc = serde_json::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Serialize to the on-disk text form.
    pub fn to_text(&self) -> Result<String, CellpackError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Total number of global slots the document accounts for
    pub fn total_cells(&self) -> u32 {
        self.items
            .last()
            .map(|item| item.pack_offset + item.cell_count)
            .unwrap_or(0)
    }

    /// Reject any document whose structure disagrees with itself.
    ///
    /// Reconstruction correctness rests on exact positional agreement
    /// between declared cells and sequential slots, so there is no
    /// best-effort acceptance of a half-consistent document.
    pub fn validate(&self) -> Result<(), CellpackError> {
        let invalid = |reason: String| CellpackError::MetadataInvalid { reason };

        if self.cell_size == 0 {
            return Err(invalid("cell_size must be positive".into()));
        }
        if self.item_count as usize != self.items.len() {
            return Err(invalid(format!(
                "item_count is {} but {} items are listed",
                self.item_count,
                self.items.len()
            )));
        }

        let mut expected_offset = 0u32;
        for (index, item) in self.items.iter().enumerate() {
            if item.cell_count as usize != item.cells.len() {
                return Err(invalid(format!(
                    "item {}: cell_count is {} but {} indices are listed",
                    index,
                    item.cell_count,
                    item.cells.len()
                )));
            }
            if item.pack_offset != expected_offset {
                return Err(invalid(format!(
                    "item {}: pack_offset is {} but slots continue at {}",
                    index, item.pack_offset, expected_offset
                )));
            }
            expected_offset += item.cell_count;

            let grid = item.columns(self.cell_size) * item.rows(self.cell_size);
            let mut previous: Option<u32> = None;
            for &cell in &item.cells {
                if cell >= grid {
                    return Err(invalid(format!(
                        "item {}: cell index {} outside its {}-cell grid",
                        index, cell, grid
                    )));
                }
                if previous.is_some_and(|p| p >= cell) {
                    return Err(invalid(format!(
                        "item {}: cell indices are not strictly ascending",
                        index
                    )));
                }
                previous = Some(cell);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> AtlasDoc {
        let mut attrs = Map::new();
        attrs.insert("page".into(), Value::from(0));
        attrs.insert("layer".into(), Value::from(2));

        AtlasDoc {
            cell_size: 16,
            cell_padding: 1,
            extra: "1700000000".into(),
            item_count: 2,
            items: vec![
                ItemRecord {
                    width: 40,
                    height: 24,
                    pack_offset: 0,
                    cell_count: 3,
                    cells: vec![0, 2, 5],
                    attrs,
                },
                ItemRecord {
                    width: 16,
                    height: 16,
                    pack_offset: 3,
                    cell_count: 0,
                    cells: vec![],
                    attrs: Map::new(),
                },
            ],
        }
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let doc = sample_doc();
        let text = doc.to_text().unwrap();
        let parsed = AtlasDoc::parse(&text).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(parsed.total_cells(), 3);
    }

    #[test]
    fn test_unknown_attributes_accepted_and_kept() {
        let text = r#"{
            "cell_size": 8,
            "cell_padding": 0,
            "extra": "",
            "item_count": 1,
            "items": [{
                "width": 8, "height": 8,
                "pack_offset": 0, "cell_count": 1, "cells": [0],
                "blend": 3, "data0": 77, "note": "hand-edited"
            }]
        }"#;

        let doc = AtlasDoc::parse(text).unwrap();
        let attrs = &doc.items[0].attrs;
        assert_eq!(attrs.get("blend"), Some(&Value::from(3)));
        assert_eq!(attrs.get("data0"), Some(&Value::from(77)));
        assert_eq!(attrs.get("note"), Some(&Value::from("hand-edited")));

        // and they survive re-serialization
        let again = AtlasDoc::parse(&doc.to_text().unwrap()).unwrap();
        assert_eq!(again, doc);
    }

    #[test]
    fn test_missing_field_rejected() {
        assert!(matches!(
            AtlasDoc::parse(r#"{"cell_size": 8, "items": []}"#),
            Err(CellpackError::MetadataParse(_))
        ));
    }

    #[test]
    fn test_cell_count_mismatch_rejected() {
        let mut doc = sample_doc();
        doc.items[0].cell_count = 2;
        assert!(matches!(
            doc.validate(),
            Err(CellpackError::MetadataInvalid { .. })
        ));
    }

    #[test]
    fn test_item_count_mismatch_rejected() {
        let mut doc = sample_doc();
        doc.item_count = 5;
        assert!(matches!(
            doc.validate(),
            Err(CellpackError::MetadataInvalid { .. })
        ));
    }

    #[test]
    fn test_offset_discontinuity_rejected() {
        let mut doc = sample_doc();
        doc.items[1].pack_offset = 4;
        assert!(matches!(
            doc.validate(),
            Err(CellpackError::MetadataInvalid { .. })
        ));
    }

    #[test]
    fn test_out_of_grid_cell_rejected() {
        let mut doc = sample_doc();
        // item 0 is 40x24 at cell 16: 3x2 grid, valid indices 0..6
        doc.items[0].cells = vec![0, 2, 6];
        assert!(matches!(
            doc.validate(),
            Err(CellpackError::MetadataInvalid { .. })
        ));
    }

    #[test]
    fn test_unsorted_cells_rejected() {
        let mut doc = sample_doc();
        doc.items[0].cells = vec![2, 0, 5];
        assert!(matches!(
            doc.validate(),
            Err(CellpackError::MetadataInvalid { .. })
        ));
    }

    #[test]
    fn test_zero_cell_size_rejected() {
        let mut doc = sample_doc();
        doc.cell_size = 0;
        assert!(matches!(
            doc.validate(),
            Err(CellpackError::MetadataInvalid { .. })
        ));
    }
}
