#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Procedural route generation system.
//!
//! Produces the left-to-right walk enemies follow: a random monotonic march
//! from the west edge to the east edge, optionally widened with crossroad
//! loops, regenerated wholesale until it meets the configured minimum
//! length. Seeded generation is reproducible, so the same seed and grid
//! always commit the same route.

use bulwark_core::{GridCoord, Path, PathError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::debug;

/// Attempts at a full regenerate before the minimum length is declared
/// unreachable for the configured grid.
const MAX_GENERATION_ATTEMPTS: u32 = 1024;

/// Grid shape and length floor for a generated level route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfig {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Minimum number of path cells an accepted route must contain.
    pub min_path_length: usize,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            width: 16,
            height: 8,
            min_path_length: 30,
        }
    }
}

/// Failure to produce an acceptable route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// No generated route reached the minimum length within the attempt cap.
    #[error("no route of at least {min_path_length} cells found in {attempts} attempts")]
    MinLengthUnreachable {
        /// Configured length floor.
        min_path_length: usize,
        /// Attempts consumed before giving up.
        attempts: u32,
    },
    /// The generated walk violated a route invariant.
    ///
    /// Indicates a generator bug rather than bad configuration.
    #[error("generated walk is not a valid route: {0}")]
    InvalidRoute(#[from] PathError),
}

/// Stateful generator building one candidate walk at a time.
#[derive(Debug)]
pub struct PathGenerator {
    width: i64,
    height: i64,
    cells: Vec<(i64, i64)>,
}

impl PathGenerator {
    /// Creates a generator for the given grid dimensions.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: i64::from(width),
            height: i64::from(height),
            cells: Vec::new(),
        }
    }

    /// Walks a fresh route from the west edge at mid-height to the east
    /// edge. The x coordinate never decreases; y stays within
    /// `[1, height - 2]`.
    pub fn generate(&mut self, rng: &mut impl Rng) {
        self.cells.clear();
        let mut x: i64 = 0;
        let mut y: i64 = self.height / 2;
        while x < self.width {
            self.cells.push((x, y));
            loop {
                let draw = rng.gen_range(0..3u32);
                if draw == 0 || x % 2 == 0 || x > self.width - 2 {
                    x += 1;
                    break;
                }
                if draw == 1 && self.is_empty(x, y + 1) && y < self.height - 2 {
                    y += 1;
                    break;
                }
                if draw == 2 && self.is_empty(x, y - 1) && y > 1 {
                    y -= 1;
                    break;
                }
            }
        }
    }

    /// Splices one crossroad loop into the walk when an anchor cell with a
    /// fully empty footprint exists. Returns false when no anchor qualifies,
    /// which is the caller's signal to stop widening.
    ///
    /// The spliced detour ends by re-entering the anchor cell, so the walk
    /// stays 4-connected without a separate repair pass.
    pub fn generate_crossroads(&mut self) -> bool {
        for index in 0..self.cells.len() {
            let (x, y) = self.cells[index];
            if x <= 3 || x >= self.width - 4 || y <= 2 || y >= self.height - 3 {
                continue;
            }
            if self.upper_footprint_empty(x, y) {
                self.splice(index, upper_loop(x, y));
                return true;
            }
            if self.lower_footprint_empty(x, y) {
                self.splice(index, lower_loop(x, y));
                return true;
            }
        }
        false
    }

    /// 4-bit occupancy mask of the neighbors of `(x, y)`:
    /// below = 1, left = 2, right = 4, above = 8.
    #[must_use]
    pub fn neighbor_mask(&self, x: i64, y: i64) -> u8 {
        let mut mask = 0;
        if self.is_taken(x, y - 1) {
            mask += 1;
        }
        if self.is_taken(x - 1, y) {
            mask += 2;
        }
        if self.is_taken(x + 1, y) {
            mask += 4;
        }
        if self.is_taken(x, y + 1) {
            mask += 8;
        }
        mask
    }

    /// Cells of the current walk in visit order.
    #[must_use]
    pub fn cells(&self) -> Vec<GridCoord> {
        self.cells
            .iter()
            .map(|&(x, y)| GridCoord::new(x as u32, y as u32))
            .collect()
    }

    fn is_taken(&self, x: i64, y: i64) -> bool {
        self.cells.contains(&(x, y))
    }

    fn is_empty(&self, x: i64, y: i64) -> bool {
        !self.is_taken(x, y)
    }

    fn upper_footprint_empty(&self, x: i64, y: i64) -> bool {
        const FOOTPRINT: [(i64, i64); 18] = [
            (0, 3),
            (1, 3),
            (2, 3),
            (-1, 2),
            (0, 2),
            (1, 2),
            (2, 2),
            (3, 2),
            (-1, 1),
            (0, 1),
            (1, 1),
            (2, 1),
            (3, 1),
            (1, 0),
            (2, 0),
            (3, 0),
            (1, -1),
            (2, -1),
        ];
        FOOTPRINT
            .iter()
            .all(|&(dx, dy)| self.is_empty(x + dx, y + dy))
    }

    fn lower_footprint_empty(&self, x: i64, y: i64) -> bool {
        const FOOTPRINT: [(i64, i64); 18] = [
            (1, 1),
            (2, 1),
            (1, 0),
            (2, 0),
            (3, 0),
            (-1, -1),
            (0, -1),
            (1, -1),
            (2, -1),
            (3, -1),
            (-1, -2),
            (0, -2),
            (1, -2),
            (2, -2),
            (3, -2),
            (0, -3),
            (1, -3),
            (2, -3),
        ];
        FOOTPRINT
            .iter()
            .all(|&(dx, dy)| self.is_empty(x + dx, y + dy))
    }

    fn splice(&mut self, index: usize, detour: [(i64, i64); 8]) {
        let tail = self.cells.split_off(index + 1);
        self.cells.extend_from_slice(&detour);
        self.cells.extend(tail);
    }
}

/// Counter-clockwise detour above the anchor, re-entering the anchor last.
fn upper_loop(x: i64, y: i64) -> [(i64, i64); 8] {
    [
        (x + 1, y),
        (x + 2, y),
        (x + 2, y + 1),
        (x + 2, y + 2),
        (x + 1, y + 2),
        (x, y + 2),
        (x, y + 1),
        (x, y),
    ]
}

/// Clockwise detour below the anchor, re-entering the anchor last.
fn lower_loop(x: i64, y: i64) -> [(i64, i64); 8] {
    [
        (x + 1, y),
        (x + 2, y),
        (x + 2, y - 1),
        (x + 2, y - 2),
        (x + 1, y - 2),
        (x, y - 2),
        (x, y - 1),
        (x, y),
    ]
}

/// A committed, validated route for one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelPlan {
    path: Path,
}

impl LevelPlan {
    /// Regenerates walks from the seeded generator, widening each with
    /// crossroad loops until none fit, and accepts the first walk meeting
    /// the configured minimum length.
    pub fn generate(config: LevelConfig, seed: u64) -> Result<Self, GenerationError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut generator = PathGenerator::new(config.width, config.height);
        for attempt in 0..MAX_GENERATION_ATTEMPTS {
            generator.generate(&mut rng);
            while generator.generate_crossroads() {}
            let cells = generator.cells();
            if cells.len() >= config.min_path_length {
                debug!(attempt, length = cells.len(), "route accepted");
                let path = Path::from_cells(cells)?;
                return Ok(Self { path });
            }
        }
        Err(GenerationError::MinLengthUnreachable {
            min_path_length: config.min_path_length,
            attempts: MAX_GENERATION_ATTEMPTS,
        })
    }

    /// The validated route.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consumes the plan, yielding the route for a `SetPath` command.
    #[must_use]
    pub fn into_path(self) -> Path {
        self.path
    }
}
