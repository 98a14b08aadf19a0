//! Barrier layouts drawn into the grid at the start of each generation.

use crate::grid::Grid;
use biosim_core::Coord;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Highest barrier type understood by [`create_barriers`].
pub const MAX_BARRIER_TYPE: u8 = 6;

const ISLAND_COUNT: usize = 3;
const ISLAND_RADIUS: f32 = 3.0;
const ISLAND_PLACEMENT_ATTEMPTS: usize = 1000;
const SPOT_COUNT: i16 = 5;
const SPOT_RADIUS: f32 = 5.0;

/// Draw barrier layout `barrier_type` into `grid`. Unknown types draw
/// nothing.
pub fn create_barriers(grid: &mut Grid, barrier_type: u8, rng: &mut ChaCha8Rng) {
    let (w, h) = (grid.width(), grid.height());
    match barrier_type {
        0 => {}
        1 => {
            let min_x = w / 2;
            let min_y = h / 4;
            draw_box(grid, min_x, min_y, min_x + 1, min_y + h / 2);
        }
        2 => {
            let min_x = random_in(rng, 20, w - 20).min(w - 2);
            let min_y = random_in(rng, 20, h / 2 - 20).min(h / 2);
            draw_box(grid, min_x, min_y, min_x + 1, min_y + h / 2);
        }
        3 => {
            let block_w = 2;
            let block_h = w / 3;
            let mut x0 = w / 4 - block_w / 2;
            let mut y0 = h / 4 - block_h / 2;
            draw_box(grid, x0, y0, x0 + block_w, y0 + block_h);
            x0 += w / 2;
            draw_box(grid, x0, y0, x0 + block_w, y0 + block_h);
            y0 += h / 2;
            draw_box(grid, x0, y0, x0 + block_w, y0 + block_h);
            x0 -= w / 2;
            draw_box(grid, x0, y0, x0 + block_w, y0 + block_h);
            x0 = w / 2 - block_w / 2;
            y0 = h / 2 - block_h / 2;
            draw_box(grid, x0, y0, x0 + block_w, y0 + block_h);
        }
        4 => {
            let min_x = w / 4;
            let min_y = h / 2 + h / 4;
            draw_box(grid, min_x, min_y, min_x + w / 2, min_y + 2);
        }
        5 => floating_islands(grid, rng),
        6 => {
            let slice = h / (SPOT_COUNT + 1);
            for n in 1..=SPOT_COUNT {
                let center = Coord::new(w / 2, n * slice);
                draw_disc(grid, center, SPOT_RADIUS);
                grid.add_barrier_center(center);
            }
        }
        other => debug!(barrier_type = other, "unknown barrier type, none drawn"),
    }
    debug!(
        barrier_type,
        cells = grid.barrier_locations().len(),
        "barriers drawn"
    );
}

/// Inclusive box, clipped to the grid.
fn draw_box(grid: &mut Grid, min_x: i16, min_y: i16, max_x: i16, max_y: i16) {
    for x in min_x..=max_x {
        for y in min_y..=max_y {
            grid.set_barrier(Coord::new(x, y));
        }
    }
}

fn draw_disc(grid: &mut Grid, center: Coord, radius: f32) {
    let mut cells = Vec::new();
    grid.visit_neighborhood(center, radius, |c| cells.push(c));
    for c in cells {
        grid.set_barrier(c);
    }
}

/// Uniform in `lo..=hi`, collapsing to `lo` when the range is empty.
fn random_in(rng: &mut ChaCha8Rng, lo: i16, hi: i16) -> i16 {
    let lo = lo.max(0);
    if hi <= lo {
        lo
    } else {
        rng.gen_range(lo..=hi)
    }
}

fn floating_islands(grid: &mut Grid, rng: &mut ChaCha8Rng) {
    let (w, h) = (grid.width(), grid.height());
    let margin = (2.0 * ISLAND_RADIUS) as i16;
    let min_spacing = 2 * margin as u32;
    let mut centers: Vec<Coord> = Vec::with_capacity(ISLAND_COUNT);

    for _ in 0..ISLAND_COUNT {
        let mut candidate = None;
        for _ in 0..ISLAND_PLACEMENT_ATTEMPTS {
            let c = Coord::new(
                random_in(rng, margin, w - margin),
                random_in(rng, margin, h - margin),
            );
            if centers.iter().all(|&o| (c - o).length() >= min_spacing) {
                candidate = Some(c);
                break;
            }
        }
        // small arenas may not fit every island
        let Some(center) = candidate else { break };
        centers.push(center);
    }

    for center in centers {
        draw_disc(grid, center, ISLAND_RADIUS);
        grid.add_barrier_center(center);
    }
}
