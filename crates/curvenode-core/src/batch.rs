//! Masked batch evaluation over the rayon pool.
//!
//! [`BatchEvaluator::apply`] writes
//! `output[i] = blend(input[i], evaluate(input[i]), fac[i])` for every `i` in
//! an [`IndexMask`] and touches nothing else. Inputs are [`VArray`]s so a
//! single value can stand in for a whole column.

use std::ops::Range;
use std::sync::Arc;

use glam::{Vec3, Vec4};
use rayon::prelude::*;

use crate::config::EvalConfig;
use crate::error::CurveError;
use crate::evaluate::{blend3, blend4, evaluate_color4, evaluate_vector3};
use crate::mapping::{BakedMapping, CurveMapping};

/// Set of element indices to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMask {
    repr: MaskRepr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MaskRepr {
    Range(Range<usize>),
    /// Sorted, unique.
    Indices(Vec<usize>),
}

impl IndexMask {
    /// Every index in `range`.
    pub fn range(range: Range<usize>) -> Self {
        Self {
            repr: MaskRepr::Range(range),
        }
    }

    /// `0..len`.
    pub fn full(len: usize) -> Self {
        Self::range(0..len)
    }

    /// Arbitrary indices; sorted and deduplicated.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut indices: Vec<usize> = indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        Self {
            repr: MaskRepr::Indices(indices),
        }
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            MaskRepr::Range(r) => r.len(),
            MaskRepr::Indices(ix) => ix.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Largest index, if any.
    pub fn last(&self) -> Option<usize> {
        match &self.repr {
            MaskRepr::Range(r) => r.clone().next_back(),
            MaskRepr::Indices(ix) => ix.last().copied(),
        }
    }

    /// Smallest array length every index fits in.
    pub fn min_array_size(&self) -> usize {
        self.last().map_or(0, |i| i + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let (range, indices) = match &self.repr {
            MaskRepr::Range(r) => (r.clone(), &[][..]),
            MaskRepr::Indices(ix) => (0..0, ix.as_slice()),
        };
        range.chain(indices.iter().copied())
    }
}

/// A column that is either one value for every index or a span.
#[derive(Debug, Clone, Copy)]
pub enum VArray<'a, T> {
    Single(T),
    Span(&'a [T]),
}

impl<T: Copy> VArray<'_, T> {
    #[inline]
    pub fn get(&self, index: usize) -> T {
        match self {
            Self::Single(value) => *value,
            Self::Span(values) => values[index],
        }
    }

    fn check_len(&self, name: &'static str, expected: usize) -> Result<(), CurveError> {
        match self {
            Self::Span(values) if values.len() < expected => Err(CurveError::SpanLength {
                name,
                got: values.len(),
                expected,
            }),
            _ => Ok(()),
        }
    }
}

impl<'a, T> From<&'a [T]> for VArray<'a, T> {
    fn from(values: &'a [T]) -> Self {
        Self::Span(values)
    }
}

impl<'a, T> From<&'a Vec<T>> for VArray<'a, T> {
    fn from(values: &'a Vec<T>) -> Self {
        Self::Span(values)
    }
}

/// Element types a mapping can be applied to.
pub trait CurveElement: Copy + Send + Sync {
    fn evaluate(baked: &BakedMapping, value: Self) -> Self;
    fn blend(input: Self, evaluated: Self, fac: f32) -> Self;
}

impl CurveElement for Vec3 {
    #[inline]
    fn evaluate(baked: &BakedMapping, value: Self) -> Self {
        evaluate_vector3(baked, value)
    }

    #[inline]
    fn blend(input: Self, evaluated: Self, fac: f32) -> Self {
        blend3(input, evaluated, fac)
    }
}

impl CurveElement for Vec4 {
    #[inline]
    fn evaluate(baked: &BakedMapping, value: Self) -> Self {
        evaluate_color4(baked, value)
    }

    #[inline]
    fn blend(input: Self, evaluated: Self, fac: f32) -> Self {
        blend4(input, evaluated, fac)
    }
}

/// Batch adapter holding a frozen view of one mapping's tables.
#[derive(Debug, Clone)]
pub struct BatchEvaluator {
    baked: Arc<BakedMapping>,
    config: EvalConfig,
}

impl BatchEvaluator {
    /// Bake `mapping` if needed and capture its tables.
    pub fn new(mapping: &CurveMapping) -> Self {
        Self::with_config(mapping, EvalConfig::default())
    }

    pub fn with_config(mapping: &CurveMapping, config: EvalConfig) -> Self {
        Self {
            baked: mapping.ensure_baked(),
            config,
        }
    }

    pub fn baked(&self) -> &BakedMapping {
        &self.baked
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate and blend every masked element into `output`.
    ///
    /// Indices outside the mask are left untouched. Span inputs and the
    /// output must cover the largest masked index.
    pub fn apply<T: CurveElement>(
        &self,
        mask: &IndexMask,
        fac: VArray<'_, f32>,
        input: VArray<'_, T>,
        output: &mut [T],
    ) -> Result<(), CurveError> {
        let needed = mask.min_array_size();
        if needed > output.len() {
            return Err(CurveError::MaskOutOfBounds {
                index: needed - 1,
                len: output.len(),
            });
        }
        fac.check_len("fac", needed)?;
        input.check_len("input", needed)?;

        let baked = self.baked.as_ref();
        let kernel = |i: usize| {
            let value = input.get(i);
            T::blend(value, T::evaluate(baked, value), fac.get(i))
        };

        let grain = self.config.parallel_grain;
        let parallel = mask.len() >= grain;
        tracing::trace!(len = mask.len(), parallel, "batch curve evaluation");

        if !parallel {
            for i in mask.iter() {
                output[i] = kernel(i);
            }
            return Ok(());
        }

        match &mask.repr {
            MaskRepr::Range(range) => {
                let start = range.start;
                output[range.clone()]
                    .par_iter_mut()
                    .with_min_len(grain)
                    .enumerate()
                    .for_each(|(k, out)| *out = kernel(start + k));
            }
            MaskRepr::Indices(indices) => {
                let values: Vec<T> = indices
                    .par_iter()
                    .with_min_len(grain)
                    .map(|&i| kernel(i))
                    .collect();
                for (&i, value) in indices.iter().zip(values) {
                    output[i] = value;
                }
            }
        }
        Ok(())
    }
}
