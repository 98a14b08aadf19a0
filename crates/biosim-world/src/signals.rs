//! Pheromone layers laid over the arena.
//!
//! Agents read the committed field, which stays fixed for the whole agent
//! phase. Emissions go to a pending plane of atomics so every agent may bump
//! its own cell in parallel. [`Signals::settle`] runs serially once per step
//! after all agents have acted: it fades and diffuses the pre-step
//! concentration, then folds the step's emissions in.

use biosim_core::Coord;
use std::sync::atomic::{AtomicU8, Ordering};

/// Largest magnitude a cell can hold.
pub const SIGNAL_MAX: u8 = u8::MAX;

#[derive(Debug)]
pub struct Signals {
    layers: usize,
    width: usize,
    height: usize,
    cells: Vec<AtomicU8>,
    pending: Vec<AtomicU8>,
    scratch: Vec<f32>,
}

impl Signals {
    pub fn new(layers: usize, width: u16, height: u16) -> Self {
        let (width, height) = (width as usize, height as usize);
        Self {
            layers,
            width,
            height,
            cells: (0..layers * width * height).map(|_| AtomicU8::new(0)).collect(),
            pending: (0..layers * width * height).map(|_| AtomicU8::new(0)).collect(),
            scratch: vec![0.0; width * height],
        }
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    fn idx(&self, layer: usize, loc: Coord) -> usize {
        debug_assert!(layer < self.layers);
        debug_assert!(loc.x >= 0 && (loc.x as usize) < self.width);
        debug_assert!(loc.y >= 0 && (loc.y as usize) < self.height);
        (layer * self.height + loc.y as usize) * self.width + loc.x as usize
    }

    pub fn magnitude(&self, layer: usize, loc: Coord) -> u8 {
        self.cells[self.idx(layer, loc)].load(Ordering::Relaxed)
    }

    /// Queue `amount` at `loc` for the next [`Signals::settle`], saturating
    /// at [`SIGNAL_MAX`]. Not visible to [`Signals::magnitude`] until then.
    pub fn increment(&self, layer: usize, loc: Coord, amount: u8) {
        let cell = &self.pending[self.idx(layer, loc)];
        let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
            Some(v.saturating_add(amount))
        });
    }

    /// End-of-step update of every layer: fade and diffuse the committed
    /// concentration, then add the pending emissions.
    pub fn settle(&mut self, fade_amount: u8, diffusion_rate: f32) {
        for layer in 0..self.layers {
            self.fade(layer, fade_amount);
            self.diffuse(layer, diffusion_rate);
            self.commit(layer);
        }
    }

    /// Fold pending emissions of `layer` into the committed field.
    pub fn commit(&mut self, layer: usize) {
        let plane = self.width * self.height;
        let range = layer * plane..(layer + 1) * plane;
        for (cell, pending) in self.cells[range.clone()]
            .iter_mut()
            .zip(&mut self.pending[range])
        {
            let add = std::mem::take(pending.get_mut());
            let v = cell.get_mut();
            *v = v.saturating_add(add);
        }
    }

    /// Subtract `amount` from every committed cell of `layer`, flooring at
    /// zero.
    pub fn fade(&mut self, layer: usize, amount: u8) {
        if amount == 0 {
            return;
        }
        let plane = self.width * self.height;
        for cell in &mut self.cells[layer * plane..(layer + 1) * plane] {
            let v = cell.get_mut();
            *v = v.saturating_sub(amount);
        }
    }

    /// Spread `rate` of each cell's 4-neighbor Laplacian into it, with
    /// reflecting edges.
    pub fn diffuse(&mut self, layer: usize, rate: f32) {
        if rate <= 0.0 {
            return;
        }
        let (w, h) = (self.width, self.height);
        let plane = w * h;
        let cells = &mut self.cells[layer * plane..(layer + 1) * plane];
        for (s, cell) in self.scratch.iter_mut().zip(cells.iter_mut()) {
            *s = *cell.get_mut() as f32;
        }

        let k = rate * 0.25;
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                let current = self.scratch[i];
                let left = if x > 0 { self.scratch[i - 1] } else { current };
                let right = if x + 1 < w { self.scratch[i + 1] } else { current };
                let up = if y > 0 { self.scratch[i - w] } else { current };
                let down = if y + 1 < h { self.scratch[i + w] } else { current };
                let laplacian = left + right + up + down - 4.0 * current;
                let value = (current + k * laplacian).round().clamp(0.0, SIGNAL_MAX as f32);
                *cells[i].get_mut() = value as u8;
            }
        }
    }

    pub fn reset(&mut self) {
        for cell in self.cells.iter_mut().chain(self.pending.iter_mut()) {
            *cell.get_mut() = 0;
        }
    }

    /// Copy of one layer in row-major order.
    pub fn layer_values(&self, layer: usize) -> Vec<u8> {
        let plane = self.width * self.height;
        self.cells[layer * plane..(layer + 1) * plane]
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }
}
