//! Spatial offset sampling.
//!
//! Every synthesized demonstration is driven by a planar offset (or an
//! object/target offset pair) drawn from a configured rectangle on the table
//! plane. Offsets always have `z = 0`: objects slide on the table, they do
//! not levitate.
//!
//! Grid sampling covers the rectangle with a corner-inclusive lattice for
//! reproducible sweeps; random sampling draws uniformly for quick variety.

use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A planar rectangle of admissible offsets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TranslationRange {
    pub min: Vec2,
    pub max: Vec2,
}

impl TranslationRange {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min.x > self.max.x || self.min.y > self.max.y {
            return Err(Error::Config(format!(
                "translation range has min {} above max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    fn span(&self) -> Vec2 {
        self.max - self.min
    }
}

/// One object offset paired with one target offset for two-object tasks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetPair {
    pub object: Vec3,
    pub target: Vec3,
}

/// Draw `n` offsets uniformly from the rectangle.
pub fn sample_random<R: Rng + ?Sized>(range: &TranslationRange, n: usize, rng: &mut R) -> Vec<Vec3> {
    (0..n)
        .map(|_| {
            Vec3::new(
                rng.gen_range(range.min.x..=range.max.x),
                rng.gen_range(range.min.y..=range.max.y),
                0.0,
            )
        })
        .collect()
}

/// Draw `n` object/target offset pairs uniformly, independently per member.
pub fn sample_pairs_random<R: Rng + ?Sized>(
    object_range: &TranslationRange,
    target_range: &TranslationRange,
    n: usize,
    rng: &mut R,
) -> Vec<OffsetPair> {
    let objects = sample_random(object_range, n, rng);
    let targets = sample_random(target_range, n, rng);
    objects
        .into_iter()
        .zip(targets)
        .map(|(object, target)| OffsetPair { object, target })
        .collect()
}

/// Cover the rectangle with a √n × √n corner-inclusive lattice.
///
/// `n` must be a perfect square greater than 1 so the lattice includes all
/// four corners. Duplicate lattice points (possible on a degenerate range)
/// are removed while preserving order, so fewer than `n` offsets may come
/// back.
pub fn sample_grid(range: &TranslationRange, n: usize) -> Result<Vec<Vec3>> {
    let side = integer_root(n, 2).ok_or_else(|| {
        Error::Config(format!("grid sample count {n} is not a perfect square"))
    })?;
    if side < 2 {
        return Err(Error::Config(format!(
            "grid sample count {n} leaves no room for lattice corners"
        )));
    }

    let mut offsets = Vec::with_capacity(n);
    for i in 0..side {
        for j in 0..side {
            let p = lattice_point(range, side, i, j);
            if !offsets.contains(&p) {
                offsets.push(p);
            }
        }
    }
    Ok(offsets)
}

/// Cover both rectangles jointly with the Cartesian product of two √√n-sided
/// lattices, yielding `n` object/target pairs.
///
/// `n` must be a perfect fourth power of at least 16 so each member range
/// gets a corner-inclusive lattice of its own.
pub fn sample_pairs_grid(
    object_range: &TranslationRange,
    target_range: &TranslationRange,
    n: usize,
) -> Result<Vec<OffsetPair>> {
    let side = integer_root(n, 4).ok_or_else(|| {
        Error::Config(format!(
            "paired grid sample count {n} is not a perfect fourth power"
        ))
    })?;
    if side < 2 {
        return Err(Error::Config(format!(
            "paired grid sample count {n} leaves no room for lattice corners"
        )));
    }

    let objects = lattice(object_range, side);
    let targets = lattice(target_range, side);

    let mut pairs = Vec::with_capacity(n);
    for &object in &objects {
        for &target in &targets {
            let pair = OffsetPair { object, target };
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
    }
    Ok(pairs)
}

/// Corner-inclusive lattices anchored at a list of centers.
///
/// Lays the same `side × side` lattice of half-`extent` reach around each
/// anchor, for sweeping the neighborhood of several known object poses in
/// one run.
pub fn sample_anchored_grids(
    anchors: &[Vec2],
    extent: Vec2,
    per_anchor: usize,
) -> Result<Vec<Vec3>> {
    let mut offsets = Vec::with_capacity(anchors.len() * per_anchor);
    for anchor in anchors {
        let range = TranslationRange::new(*anchor - extent / 2.0, *anchor + extent / 2.0);
        offsets.extend(sample_grid(&range, per_anchor)?);
    }
    Ok(offsets)
}

fn lattice(range: &TranslationRange, side: usize) -> Vec<Vec3> {
    let mut points = Vec::with_capacity(side * side);
    for i in 0..side {
        for j in 0..side {
            points.push(lattice_point(range, side, i, j));
        }
    }
    points
}

fn lattice_point(range: &TranslationRange, side: usize, i: usize, j: usize) -> Vec3 {
    let span = range.span();
    let step = (side - 1) as f32;
    Vec3::new(
        range.min.x + i as f32 / step * span.x,
        range.min.y + j as f32 / step * span.y,
        0.0,
    )
}

/// The integer `degree`-th root of `n`, if `n` is a perfect power.
fn integer_root(n: usize, degree: u32) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let root = (n as f64).powf(1.0 / degree as f64).round() as usize;
    for candidate in root.saturating_sub(1)..=root + 1 {
        if candidate.checked_pow(degree).is_some_and(|p| p == n) {
            return Some(candidate);
        }
    }
    None
}
