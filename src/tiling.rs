use std::cmp::Ordering;
use std::fmt::Debug;

/// A fixed-size square sub-region of a source image, together with the
/// stable index used to name its output file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Crop {
    pub index: u32,
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Crop {
    /// Side length of the crop.
    pub fn size(&self) -> u32 {
        self.right - self.left
    }
}

/// The grid of overlapping square crops covering a source image.
///
/// `cols` and `rows` count the steps *beyond* the first tile on each axis,
/// so the full grid holds `(cols + 1) * (rows + 1)` crops. The per-step
/// offsets are derived from the leftover space so that the first tile
/// starts at the image origin, the last tile reaches (close to) the far
/// edge, and the overlap in between is spread evenly.
///
/// # Example
/// ```rust
/// # use earthview_downloader::TileGrid;
/// let grid = TileGrid::new(1800, 1200, 1024);
/// assert_eq!(grid.crop_count(), 6);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TileGrid {
    size: u32,
    cols: u32,
    rows: u32,
    x_step: u32,
    y_step: u32,
    tileable: bool,
}

impl TileGrid {
    /// Plans the crop grid for a `width` x `height` source and square tiles
    /// of side length `size`.
    ///
    /// Sources that cannot fit a single tile produce an empty grid rather
    /// than an error; callers skip those images.
    pub fn new(width: u32, height: u32, size: u32) -> Self {
        let tileable = size > 0 && size <= width && size <= height;

        let (cols, x_step) = if tileable { axis_plan(width, size) } else { (0, 0) };
        let (rows, y_step) = if tileable { axis_plan(height, size) } else { (0, 0) };

        Self {
            size,
            cols,
            rows,
            x_step,
            y_step,
            tileable,
        }
    }

    /// The number of crops the grid produces.
    pub fn crop_count(&self) -> usize {
        if self.tileable {
            (self.cols as usize + 1) * (self.rows as usize + 1)
        } else {
            0
        }
    }

    /// Whether the grid produces no crops at all.
    pub fn is_empty(&self) -> bool {
        self.crop_count() == 0
    }

    /// Creates an iterator over the crops, columns outer, rows inner.
    pub fn crops(&self) -> impl Iterator<Item = Crop> + Debug {
        let grid = *self;

        (0..=grid.cols)
            .flat_map(move |i| (0..=grid.rows).map(move |j| grid.crop_at(i, j)))
            .take(grid.crop_count())
    }

    fn crop_at(&self, i: u32, j: u32) -> Crop {
        let left = i * self.x_step;
        let top = j * self.y_step;

        Crop {
            index: i * (self.rows + 1) + j,
            left,
            top,
            right: left + self.size,
            bottom: top + self.size,
        }
    }
}

/// Extra step count and per-step pixel offset for a single axis.
///
/// An axis no longer than the tile is not subdivided. Longer axes get
/// `round(axis / size)` extra steps of `(axis - size) / count` pixels each;
/// the integer flooring may leave the last tile a few pixels short of the
/// far edge.
fn axis_plan(axis: u32, size: u32) -> (u32, u32) {
    if axis <= size {
        return (0, 0);
    }

    let count = round_ratio(axis, size);
    if count == 0 {
        return (0, 0);
    }

    (count, (axis - size) / count)
}

/// `round(axis / size)` with ties to even, in exact integer arithmetic.
fn round_ratio(axis: u32, size: u32) -> u32 {
    let quotient = axis / size;
    let remainder = axis % size;

    match (u64::from(remainder) * 2).cmp(&u64::from(size)) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + 1,
        Ordering::Equal if quotient % 2 == 0 => quotient,
        Ordering::Equal => quotient + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crops(width: u32, height: u32, size: u32) -> Vec<Crop> {
        TileGrid::new(width, height, size).crops().collect()
    }

    #[test]
    fn exact_fit_yields_a_single_crop() {
        let crops = crops(1024, 1024, 1024);

        assert_eq!(
            crops,
            vec![Crop {
                index: 0,
                left: 0,
                top: 0,
                right: 1024,
                bottom: 1024,
            }]
        );
    }

    #[test]
    fn source_smaller_than_the_tile_is_empty() {
        let grid = TileGrid::new(800, 600, 1024);

        assert!(grid.is_empty());
        assert_eq!(grid.crops().count(), 0);
    }

    #[test]
    fn single_undersized_axis_is_empty() {
        // wide enough for three columns, but no row fits
        assert!(TileGrid::new(1800, 800, 1024).is_empty());
        assert!(TileGrid::new(800, 1800, 1024).is_empty());
    }

    #[test]
    fn zero_tile_size_is_empty() {
        assert!(TileGrid::new(1800, 1200, 0).is_empty());
    }

    #[test]
    fn full_resolution_landscape_grid() {
        // 1800/1024 rounds to 2 columns of step (1800-1024)/2 = 388,
        // 1200/1024 rounds to 1 row of step 1200-1024 = 176
        let crops = crops(1800, 1200, 1024);

        assert_eq!(crops.len(), 6);

        let mut lefts: Vec<u32> = crops.iter().map(|c| c.left).collect();
        lefts.sort_unstable();
        lefts.dedup();
        assert_eq!(lefts, vec![0, 388, 776]);

        let mut tops: Vec<u32> = crops.iter().map(|c| c.top).collect();
        tops.sort_unstable();
        tops.dedup();
        assert_eq!(tops, vec![0, 176]);
    }

    #[test]
    fn crops_stay_inside_the_source() {
        let cases = [
            (1800u32, 1200u32, 1024u32),
            (1800, 1200, 600),
            (4096, 1025, 1024),
            (1025, 4096, 1024),
            (5000, 3333, 512),
            (1024, 1024, 1024),
        ];

        for &(width, height, size) in &cases {
            for crop in TileGrid::new(width, height, size).crops() {
                assert_eq!(crop.right - crop.left, size);
                assert_eq!(crop.bottom - crop.top, size);
                assert!(
                    crop.right <= width && crop.bottom <= height,
                    "crop {:?} leaves the {}x{} source",
                    crop,
                    width,
                    height,
                );
            }
        }
    }

    #[test]
    fn crop_count_matches_the_grid_dimensions() {
        // 5000/512 -> 10 extra columns, 3333/512 -> 7 extra rows
        let grid = TileGrid::new(5000, 3333, 512);

        assert_eq!(grid.crop_count(), 11 * 8);
        assert_eq!(grid.crops().count(), grid.crop_count());
    }

    #[test]
    fn half_ratios_round_to_even() {
        // 1536/1024 = 1.5 rounds up to 2, 2560/1024 = 2.5 rounds down to 2
        assert_eq!(axis_plan(1536, 1024), (2, 256));
        assert_eq!(axis_plan(2560, 1024), (2, 768));
    }

    #[test]
    fn last_tile_may_undershoot_the_far_edge() {
        // (2051-1024)/2 floors to 513, so the last column ends at 2050
        let (cols, step) = axis_plan(2051, 1024);

        assert_eq!((cols, step), (2, 513));
        assert_eq!(cols * step + 1024, 2050);
    }

    #[test]
    fn indices_are_unique_and_follow_enumeration_order() {
        let crops = crops(5000, 3333, 512);
        let indices: Vec<u32> = crops.iter().map(|c| c.index).collect();

        assert_eq!(indices, (0..crops.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn planning_is_deterministic() {
        assert_eq!(crops(1800, 1200, 1024), crops(1800, 1200, 1024));
    }
}
