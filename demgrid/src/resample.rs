//! Bilinear resampling.
//!
//! The cropped window rarely has the dimensions a consumer wants (a mesh
//! builder typically needs `k·n + 1` points per axis). [`resample`] maps a
//! grid onto new dimensions chosen by a [`ResamplePolicy`].

use std::num::NonZeroUsize;

use crate::error::{DemError, Result};
use crate::tile::ElevationGrid;

/// Largest output grid, in samples, a policy may ask for (512 MiB of `i16`).
pub const MAX_SAMPLES: usize = 1 << 28;

/// How to choose the output dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResamplePolicy {
    /// Keep the input dimensions.
    #[default]
    Identity,
    /// Round each axis' segment count (`points - 1`) up to a multiple of `k`.
    MultipleOf(NonZeroUsize),
    /// Exact output dimensions.
    Explicit { lines: usize, columns: usize },
}

impl ResamplePolicy {
    /// Build a policy from optional request parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DemError::InvalidResamplePolicy`] when `multiple_of` is given
    /// together with `lines`/`columns`, when `multiple_of` is zero, or when
    /// only one of `lines` and `columns` is given, or when the explicit
    /// dimensions exceed [`MAX_SAMPLES`].
    ///
    /// # Examples
    ///
    /// ```
    /// use demgrid::ResamplePolicy;
    ///
    /// assert_eq!(ResamplePolicy::from_parts(None, None, None).unwrap(), ResamplePolicy::Identity);
    /// assert_eq!(
    ///     ResamplePolicy::from_parts(None, Some(65), Some(33)).unwrap(),
    ///     ResamplePolicy::Explicit { lines: 65, columns: 33 },
    /// );
    /// assert!(ResamplePolicy::from_parts(Some(0), None, None).is_err());
    /// ```
    pub fn from_parts(
        multiple_of: Option<usize>,
        lines: Option<usize>,
        columns: Option<usize>,
    ) -> Result<Self> {
        match (multiple_of, lines, columns) {
            (None, None, None) => Ok(ResamplePolicy::Identity),
            (Some(k), None, None) => NonZeroUsize::new(k)
                .map(ResamplePolicy::MultipleOf)
                .ok_or_else(|| invalid("multiple_of must be greater than zero")),
            (None, Some(lines), Some(columns)) => {
                checked_area(lines, columns)?;
                Ok(ResamplePolicy::Explicit { lines, columns })
            }
            (None, _, _) => Err(invalid("lines and columns must be given together")),
            (Some(_), _, _) => Err(invalid("multiple_of cannot be combined with lines/columns")),
        }
    }

    /// Output dimensions for an input of `lines` x `columns`.
    ///
    /// # Errors
    ///
    /// Returns [`DemError::InvalidResamplePolicy`] when the output would hold
    /// more than [`MAX_SAMPLES`] samples.
    pub fn target_dims(&self, lines: usize, columns: usize) -> Result<(usize, usize)> {
        let dims = match *self {
            ResamplePolicy::Identity => return Ok((lines, columns)),
            ResamplePolicy::MultipleOf(k) => (
                round_segments(lines, k.get())?,
                round_segments(columns, k.get())?,
            ),
            ResamplePolicy::Explicit { lines, columns } => (lines, columns),
        };
        checked_area(dims.0, dims.1)?;
        Ok(dims)
    }
}

fn invalid(reason: &str) -> DemError {
    DemError::InvalidResamplePolicy {
        reason: reason.to_string(),
    }
}

fn too_large() -> DemError {
    invalid(&format!("output grid exceeds {} samples", MAX_SAMPLES))
}

fn checked_area(lines: usize, columns: usize) -> Result<usize> {
    lines
        .checked_mul(columns)
        .filter(|&area| area <= MAX_SAMPLES)
        .ok_or_else(too_large)
}

/// Points needed so that the segment count is a multiple of `k`.
fn round_segments(points: usize, k: usize) -> Result<usize> {
    if points == 0 {
        return Ok(0);
    }
    let segments = points - 1;
    segments
        .div_ceil(k)
        .checked_mul(k)
        .and_then(|s| s.checked_add(1))
        .ok_or_else(too_large)
}

/// Resample `grid` according to `policy`.
///
/// Equal source and target dimensions return the input untouched. Otherwise
/// each target point is placed proportionally on the source grid and
/// interpolated bilinearly from its four neighbours, truncating toward zero.
///
/// # Errors
///
/// Returns [`DemError::InvalidResamplePolicy`] when the target grid is too
/// large (see [`ResamplePolicy::target_dims`]).
///
/// # Examples
///
/// ```
/// use demgrid::{resample::resample, ElevationGrid, ResamplePolicy};
///
/// let grid = ElevationGrid::new(vec![0, 10, 20, 30], 2, 2).unwrap();
/// let fine = resample(grid, ResamplePolicy::Explicit { lines: 3, columns: 3 })?;
/// assert_eq!(fine.samples, vec![0, 5, 10, 10, 15, 20, 20, 25, 30]);
/// # Ok::<(), demgrid::DemError>(())
/// ```
pub fn resample(grid: ElevationGrid, policy: ResamplePolicy) -> Result<ElevationGrid> {
    let (lines, columns) = policy.target_dims(grid.lines, grid.columns)?;
    if (lines, columns) == (grid.lines, grid.columns) || grid.is_empty() {
        return Ok(grid);
    }

    let v_step = step(grid.lines, lines);
    let h_step = step(grid.columns, columns);
    let last_line = grid.lines - 1;
    let last_column = grid.columns - 1;
    let at = |line: usize, column: usize| f64::from(grid.samples[line * grid.columns + column]);

    let mut samples = Vec::with_capacity(lines * columns);
    for i in 0..lines {
        let v_pos = i as f64 * v_step;
        let top = (v_pos.floor() as usize).min(last_line);
        let bottom = (v_pos.ceil() as usize).min(last_line);
        let y = v_pos.fract();

        for j in 0..columns {
            let h_pos = j as f64 * h_step;
            let left = (h_pos.floor() as usize).min(last_column);
            let right = (h_pos.ceil() as usize).min(last_column);
            let x = h_pos.fract();

            let a = at(top, left);
            let b = at(top, right);
            let c = at(bottom, left);
            let d = at(bottom, right);

            let value = x * y * (-a + b - c + d) + y * (-a + c) + x * (-a + b) + a;
            samples.push(value.trunc() as i16);
        }
    }

    Ok(ElevationGrid {
        samples,
        lines,
        columns,
    })
}

/// Source segments per target segment along one axis.
fn step(source_points: usize, target_points: usize) -> f64 {
    if target_points <= 1 {
        0.0
    } else {
        (source_points - 1) as f64 / (target_points - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> ElevationGrid {
        ElevationGrid::new(vec![0, 10, 20, 30], 2, 2).unwrap()
    }

    fn explicit(lines: usize, columns: usize) -> ResamplePolicy {
        ResamplePolicy::Explicit { lines, columns }
    }

    #[test]
    fn test_identity_returns_input() {
        let grid = ElevationGrid::new((0..12).collect(), 3, 4).unwrap();
        assert_eq!(resample(grid.clone(), ResamplePolicy::Identity).unwrap(), grid);
        assert_eq!(resample(grid.clone(), explicit(3, 4)).unwrap(), grid);
    }

    #[test]
    fn test_grid_points_reproduce_source() {
        let fine = resample(ramp(), explicit(5, 5)).unwrap();
        assert_eq!(fine.get(0, 0), Some(0));
        assert_eq!(fine.get(0, 4), Some(10));
        assert_eq!(fine.get(4, 0), Some(20));
        assert_eq!(fine.get(4, 4), Some(30));
        assert_eq!(fine.get(2, 2), Some(15));
    }

    #[test]
    fn test_downsample() {
        let grid = ElevationGrid::new((0..25).collect(), 5, 5).unwrap();
        let coarse = resample(grid, explicit(3, 3)).unwrap();
        assert_eq!(coarse.samples, vec![0, 2, 4, 10, 12, 14, 20, 22, 24]);
    }

    #[test]
    fn test_truncates_toward_zero() {
        let rising = ElevationGrid::new(vec![0, 1], 1, 2).unwrap();
        assert_eq!(resample(rising, explicit(1, 3)).unwrap().samples, vec![0, 0, 1]);

        let falling = ElevationGrid::new(vec![0, -1], 1, 2).unwrap();
        assert_eq!(resample(falling, explicit(1, 3)).unwrap().samples, vec![0, 0, -1]);
    }

    #[test]
    fn test_multiple_of_dims() {
        let k = NonZeroUsize::new(4).unwrap();
        let policy = ResamplePolicy::MultipleOf(k);
        assert_eq!(policy.target_dims(5, 5).unwrap(), (5, 5));
        assert_eq!(policy.target_dims(6, 3).unwrap(), (9, 5));
        assert_eq!(policy.target_dims(1, 0).unwrap(), (1, 0));

        let grid = ElevationGrid::new((0..12).collect(), 3, 4).unwrap();
        let out = resample(grid, policy).unwrap();
        assert_eq!((out.lines, out.columns), (5, 5));
        assert_eq!(out.len(), 25);
        assert_eq!(out.get(4, 4), Some(11));
    }

    #[test]
    fn test_huge_multiple_of_is_rejected() {
        let policy = ResamplePolicy::MultipleOf(NonZeroUsize::new(usize::MAX).unwrap());
        assert!(matches!(
            policy.target_dims(2, 2),
            Err(DemError::InvalidResamplePolicy { .. })
        ));
        assert!(matches!(
            resample(ramp(), policy),
            Err(DemError::InvalidResamplePolicy { .. })
        ));
    }

    #[test]
    fn test_oversized_explicit_dims_are_rejected() {
        assert!(matches!(
            ResamplePolicy::from_parts(None, Some(usize::MAX / 2), Some(usize::MAX / 2)),
            Err(DemError::InvalidResamplePolicy { .. })
        ));
        assert!(matches!(
            ResamplePolicy::from_parts(None, Some(100_000), Some(100_000)),
            Err(DemError::InvalidResamplePolicy { .. })
        ));
        assert!(ResamplePolicy::from_parts(None, Some(10_001), Some(10_001)).is_ok());

        // Built directly, the policy is still checked before allocating.
        assert!(matches!(
            resample(ramp(), explicit(usize::MAX / 2, usize::MAX / 2)),
            Err(DemError::InvalidResamplePolicy { .. })
        ));
    }

    #[test]
    fn test_single_point_target() {
        let out = resample(ramp(), explicit(1, 1)).unwrap();
        assert_eq!(out.samples, vec![0]);
    }

    #[test]
    fn test_empty_source_is_unchanged() {
        let empty = ElevationGrid::default();
        let out = resample(empty.clone(), explicit(3, 3)).unwrap();
        assert_eq!(out, empty);
    }

    #[test]
    fn test_from_parts_errors() {
        assert!(ResamplePolicy::from_parts(Some(2), Some(3), None).is_err());
        assert!(ResamplePolicy::from_parts(None, Some(3), None).is_err());
        assert!(ResamplePolicy::from_parts(None, None, Some(3)).is_err());
        assert_eq!(
            ResamplePolicy::from_parts(Some(8), None, None).unwrap(),
            ResamplePolicy::MultipleOf(NonZeroUsize::new(8).unwrap())
        );
    }
}
