use log::debug;

use crate::error::CellpackError;

/// Pick the smallest-waste power-of-two atlas size for `total_cells` cells.
///
/// Candidate widths are powers of two from the first one that holds a single
/// padded cell up to `max_width`. For each width the height is the smallest
/// power of two tall enough for the required rows. Among candidates with
/// enough capacity the winner has minimal `loss = capacity - total_cells`,
/// ties broken by smaller `w + h`, remaining ties by the first (narrowest)
/// candidate seen.
///
/// All candidates are enumerated before selecting: a zero-loss candidate
/// found early may still lose the `w + h` tie to a later one, so there is
/// no early exit.
pub fn best_size(
    total_cells: u32,
    cell_size: u32,
    cell_padding: u32,
    max_width: u32,
) -> Result<(u32, u32), CellpackError> {
    if total_cells == 0 {
        return Err(CellpackError::NothingToPack);
    }

    let cell_area = cell_size + 2 * cell_padding;
    let mut best: Option<(u32, u32, u32)> = None; // (w, h, loss)

    let mut width = cell_area.next_power_of_two();
    while width != 0 && width <= max_width {
        let xcells = width / cell_area;
        if xcells == 0 {
            width = width.wrapping_mul(2);
            continue;
        }

        let req_ycells = total_cells.div_ceil(xcells);
        let height = (req_ycells * cell_area).next_power_of_two();
        let actual_ycells = height / cell_area;
        let capacity = xcells * actual_ycells;

        if capacity >= total_cells {
            let loss = capacity - total_cells;
            let better = match best {
                None => true,
                Some((bw, bh, bloss)) => {
                    loss < bloss || (loss == bloss && width + height < bw + bh)
                }
            };
            if better {
                debug!(
                    "size candidate {}x{}: capacity {}, loss {}",
                    width, height, capacity, loss
                );
                best = Some((width, height, loss));
            }
        }

        width = width.wrapping_mul(2);
    }

    best.map(|(w, h, _)| (w, h))
        .ok_or(CellpackError::AtlasOverflow {
            total_cells,
            cell_area,
            max_width,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worked_example() {
        // 10 cells of 16px, no padding: 64x64 holds 16 cells (loss 6) and
        // beats 32x128 and 16x256, which reach the same loss at larger w+h
        assert_eq!(best_size(10, 16, 0, 4096).unwrap(), (64, 64));
    }

    #[test]
    fn test_single_cell() {
        assert_eq!(best_size(1, 16, 0, 4096).unwrap(), (16, 16));
    }

    #[test]
    fn test_padding_widens_cell_area() {
        // padded cell area 18 -> one cell needs a 32x32 texture
        assert_eq!(best_size(1, 16, 1, 4096).unwrap(), (32, 32));
    }

    #[test]
    fn test_zero_loss_exact_fit() {
        // 16 cells of 16px fit a 64x64 exactly
        let (w, h) = best_size(16, 16, 0, 4096).unwrap();
        assert_eq!((w, h), (64, 64));
        assert_eq!((w / 16) * (h / 16), 16);
    }

    #[test]
    fn test_zero_cells_fails() {
        assert!(matches!(
            best_size(0, 16, 0, 4096),
            Err(CellpackError::NothingToPack)
        ));
    }

    #[test]
    fn test_height_grows_past_narrow_max_width() {
        // widths are capped, heights are not: 17 cells at max_width 64
        // still fit by stacking rows
        let (w, h) = best_size(17, 16, 0, 64).unwrap();
        assert!(w <= 64);
        assert!((w / 16) * (h / 16) >= 17);
    }

    #[test]
    fn test_max_width_smaller_than_cell_fails() {
        // no candidate width can hold even one padded cell
        assert!(matches!(
            best_size(1, 64, 0, 32),
            Err(CellpackError::AtlasOverflow { .. })
        ));
        assert!(matches!(
            best_size(4, 14, 2, 16),
            Err(CellpackError::AtlasOverflow { .. })
        ));
    }

    #[test]
    fn test_capacity_always_sufficient() {
        for total in 1..200 {
            let (w, h) = best_size(total, 8, 1, 2048).unwrap();
            let area = 8 + 2;
            assert!((w / area) * (h / area) >= total, "total={}", total);
            assert!(w.is_power_of_two() && h.is_power_of_two());
        }
    }
}
