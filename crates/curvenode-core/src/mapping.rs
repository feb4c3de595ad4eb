//! Multi-channel curve mappings and their lazily baked lookup tables.
//!
//! A [`CurveMapping`] owns the authored channels. Its baked form
//! ([`BakedMapping`]) sits in a cache cell: every mutation goes through
//! `&mut self` and clears the cell, and the first reader afterwards bakes
//! it exactly once behind an upgradable lock. Readers only ever see the
//! immutable `Arc<BakedMapping>`.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use serde::{Deserialize, Serialize};

use crate::curve::map::{ClipRect, CurveMap, CurvePreset};
use crate::curve::table::{BakedChannel, Extrapolation, TABLE_SEGMENTS, TABLE_SIZE};
use crate::error::CurveError;

/// Floor for `white − black` before taking its reciprocal.
const BLACK_WHITE_EPSILON: f32 = 1e-5;

/// Default range of a Vector Curves mapping.
pub const VECTOR_CLIP: ClipRect = ClipRect::new(-1.0, -1.0, 1.0, 1.0);

/// Default range of an RGB Curves mapping.
pub const COLOR_CLIP: ClipRect = ClipRect::UNIT;

/// A bundle of 3 (vector) or 4 (RGBA) curve channels.
#[derive(Serialize, Deserialize)]
#[serde(try_from = "MappingData", into = "MappingData")]
pub struct CurveMapping {
    channels: Vec<CurveMap>,
    clip: ClipRect,
    use_clip: bool,
    extend: Extrapolation,
    black: [f32; 3],
    white: [f32; 3],
    bwmul: [f32; 3],
    cache: BakeCache,
}

impl CurveMapping {
    /// Create a mapping with `channel_count` straight-line channels spanning
    /// `clip`.
    pub fn new(channel_count: usize, clip: ClipRect) -> Result<Self, CurveError> {
        if !(3..=4).contains(&channel_count) {
            return Err(CurveError::ChannelCount(channel_count));
        }
        clip.validate()?;
        let channels = (0..channel_count)
            .map(|_| CurveMap::from_preset(CurvePreset::Line, &clip))
            .collect();
        Ok(Self::from_parts(channels, clip))
    }

    /// Three channels over (-1,-1)-(1,1).
    pub fn vector() -> Self {
        Self::from_parts(
            (0..3)
                .map(|_| CurveMap::from_preset(CurvePreset::Line, &VECTOR_CLIP))
                .collect(),
            VECTOR_CLIP,
        )
    }

    /// Four channels over (0,0)-(1,1).
    pub fn color() -> Self {
        Self::from_parts(
            (0..4)
                .map(|_| CurveMap::from_preset(CurvePreset::Line, &COLOR_CLIP))
                .collect(),
            COLOR_CLIP,
        )
    }

    /// Build from explicit channels. The extend flag starts at `Clamp`.
    pub fn from_channels(channels: Vec<CurveMap>, clip: ClipRect) -> Result<Self, CurveError> {
        if !(3..=4).contains(&channels.len()) {
            return Err(CurveError::ChannelCount(channels.len()));
        }
        clip.validate()?;
        Ok(Self::from_parts(channels, clip))
    }

    fn from_parts(mut channels: Vec<CurveMap>, clip: ClipRect) -> Self {
        for ch in &mut channels {
            ch.set_extrapolation(Extrapolation::Clamp);
        }
        Self {
            channels,
            clip,
            use_clip: true,
            extend: Extrapolation::Clamp,
            black: [0.0; 3],
            white: [1.0; 3],
            bwmul: [1.0; 3],
            cache: BakeCache::default(),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[CurveMap] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Result<&CurveMap, CurveError> {
        self.channels.get(index).ok_or(CurveError::ChannelIndex {
            index,
            count: self.channels.len(),
        })
    }

    /// Mutable access to one channel. Invalidates the baked tables.
    pub fn channel_mut(&mut self, index: usize) -> Result<&mut CurveMap, CurveError> {
        let count = self.channels.len();
        if index >= count {
            return Err(CurveError::ChannelIndex { index, count });
        }
        self.invalidate();
        Ok(&mut self.channels[index])
    }

    /// Insert a point into `channel`, clamped into the clip rectangle when
    /// clipping is on.
    pub fn insert_point(&mut self, channel: usize, x: f32, y: f32) -> Result<usize, CurveError> {
        let (x, y) = self.clip_point(x, y);
        self.channel_mut(channel)?.insert_point(x, y)
    }

    /// Move a point of `channel`, clamped into the clip rectangle when
    /// clipping is on.
    pub fn move_point(
        &mut self,
        channel: usize,
        index: usize,
        x: f32,
        y: f32,
    ) -> Result<usize, CurveError> {
        let (x, y) = self.clip_point(x, y);
        self.channel_mut(channel)?.move_point(index, x, y)
    }

    pub fn remove_point(&mut self, channel: usize, index: usize) -> Result<(), CurveError> {
        self.channel_mut(channel)?.remove_point(index).map(|_| ())
    }

    /// Reset one channel to `preset` inside the clip rectangle.
    pub fn reset_channel(&mut self, channel: usize, preset: CurvePreset) -> Result<(), CurveError> {
        let clip = self.clip;
        self.channel_mut(channel)?.reset(preset, &clip);
        Ok(())
    }

    pub fn clip(&self) -> &ClipRect {
        &self.clip
    }

    pub fn use_clip(&self) -> bool {
        self.use_clip
    }

    /// Enable or disable clipping. Enabling clamps every existing point.
    pub fn set_use_clip(&mut self, use_clip: bool) {
        self.use_clip = use_clip;
        if use_clip {
            let clip = self.clip;
            for ch in &mut self.channels {
                ch.clip_to(&clip);
            }
            self.invalidate();
        }
    }

    /// Global extrapolation flag.
    pub fn extend(&self) -> Extrapolation {
        self.extend
    }

    /// Set the extrapolation mode of every channel.
    pub fn set_extend(&mut self, extend: Extrapolation) {
        if self.extend == extend {
            return;
        }
        self.extend = extend;
        for ch in &mut self.channels {
            ch.set_extrapolation(extend);
        }
        self.invalidate();
    }

    pub fn black_level(&self) -> [f32; 3] {
        self.black
    }

    pub fn white_level(&self) -> [f32; 3] {
        self.white
    }

    /// Per-channel `1 / (white − black)`.
    pub fn bwmul(&self) -> [f32; 3] {
        self.bwmul
    }

    /// Set the normalization levels used by premultiplied evaluation.
    pub fn set_black_white(&mut self, black: [f32; 3], white: [f32; 3]) {
        self.black = black;
        self.white = white;
        self.bwmul = std::array::from_fn(|a| 1.0 / (white[a] - black[a]).max(BLACK_WHITE_EPSILON));
    }

    /// Bake the tables if absent, returning the shared immutable view.
    ///
    /// Concurrent callers block on a single baker; later callers get the
    /// cached tables without taking the write lock.
    pub fn ensure_baked(&self) -> Arc<BakedMapping> {
        if let Some(baked) = self.cache.slot.read().as_ref() {
            return Arc::clone(baked);
        }

        let slot = self.cache.slot.upgradable_read();
        if let Some(baked) = slot.as_ref() {
            return Arc::clone(baked);
        }
        let baked = Arc::new(BakedMapping::bake(&self.channels));
        tracing::debug!(
            channels = baked.channel_count(),
            extend = ?self.extend,
            "baked curve mapping tables"
        );
        let mut slot = RwLockUpgradableReadGuard::upgrade(slot);
        *slot = Some(Arc::clone(&baked));
        baked
    }

    pub fn is_baked(&self) -> bool {
        self.cache.slot.read().is_some()
    }

    /// Drop the baked tables; the next reader rebuilds them.
    pub fn invalidate(&mut self) {
        if self.cache.slot.get_mut().take().is_some() {
            tracing::trace!("curve mapping tables invalidated");
        }
    }

    fn clip_point(&self, x: f32, y: f32) -> (f32, f32) {
        if self.use_clip {
            (
                x.clamp(self.clip.min_x, self.clip.max_x),
                y.clamp(self.clip.min_y, self.clip.max_y),
            )
        } else {
            (x, y)
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CurveError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String, CurveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Clone for CurveMapping {
    fn clone(&self) -> Self {
        Self {
            channels: self.channels.clone(),
            clip: self.clip,
            use_clip: self.use_clip,
            extend: self.extend,
            black: self.black,
            white: self.white,
            bwmul: self.bwmul,
            cache: BakeCache {
                slot: RwLock::new(self.cache.slot.read().clone()),
            },
        }
    }
}

impl fmt::Debug for CurveMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurveMapping")
            .field("channels", &self.channels)
            .field("clip", &self.clip)
            .field("use_clip", &self.use_clip)
            .field("extend", &self.extend)
            .field("black", &self.black)
            .field("white", &self.white)
            .field("baked", &self.is_baked())
            .finish()
    }
}

#[derive(Default)]
struct BakeCache {
    slot: RwLock<Option<Arc<BakedMapping>>>,
}

/// Persisted form of a mapping (everything but the cache).
#[derive(Serialize, Deserialize)]
struct MappingData {
    channels: Vec<CurveMap>,
    clip: ClipRect,
    #[serde(default = "default_true")]
    use_clip: bool,
    #[serde(default)]
    extend: Extrapolation,
    #[serde(default)]
    black: [f32; 3],
    #[serde(default = "default_white")]
    white: [f32; 3],
}

fn default_true() -> bool {
    true
}

fn default_white() -> [f32; 3] {
    [1.0; 3]
}

impl TryFrom<MappingData> for CurveMapping {
    type Error = CurveError;

    fn try_from(data: MappingData) -> Result<Self, Self::Error> {
        // Re-validate point order; the channel JSON bypasses `CurveMap::new`.
        let channels = data
            .channels
            .into_iter()
            .map(|ch| CurveMap::new(ch.points().iter().copied()))
            .collect::<Result<Vec<_>, CurveError>>()?;
        let mut mapping = Self::from_channels(channels, data.clip)?;
        mapping.use_clip = data.use_clip;
        mapping.set_extend(data.extend);
        mapping.set_black_white(data.black, data.white);
        Ok(mapping)
    }
}

impl From<CurveMapping> for MappingData {
    fn from(mapping: CurveMapping) -> Self {
        Self {
            channels: mapping.channels,
            clip: mapping.clip,
            use_clip: mapping.use_clip,
            extend: mapping.extend,
            black: mapping.black,
            white: mapping.white,
        }
    }
}

/// Immutable baked tables of every channel of a mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct BakedMapping {
    channels: Vec<BakedChannel>,
}

impl BakedMapping {
    fn bake(channels: &[CurveMap]) -> Self {
        Self {
            channels: channels.iter().map(CurveMap::bake).collect(),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[BakedChannel] {
        &self.channels
    }

    /// Baked channel `index`. Panics when out of range; callers index by
    /// the fixed channel layout of the node type.
    pub fn channel(&self, index: usize) -> &BakedChannel {
        &self.channels[index]
    }

    /// Interleave the channel tables into `TABLE_SIZE` RGBA rows.
    ///
    /// Channel `c` lands in component `c`; components without a channel hold
    /// the identity ramp.
    pub fn table_rgba(&self) -> Vec<[f32; 4]> {
        (0..TABLE_SIZE)
            .map(|i| {
                std::array::from_fn(|c| match self.channels.get(c) {
                    Some(ch) => ch.table()[i],
                    None => i as f32 / TABLE_SEGMENTS as f32,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layouts() {
        let vector = CurveMapping::vector();
        assert_eq!(vector.channel_count(), 3);
        assert_eq!(vector.clip(), &VECTOR_CLIP);
        assert_eq!(vector.channel(0).unwrap().points()[0].x, -1.0);

        let color = CurveMapping::color();
        assert_eq!(color.channel_count(), 4);
        assert!(color.channels().iter().all(CurveMap::is_unit_identity));
    }

    #[test]
    fn test_channel_count_is_validated() {
        assert!(matches!(
            CurveMapping::new(2, ClipRect::UNIT),
            Err(CurveError::ChannelCount(2))
        ));
        assert!(CurveMapping::new(3, ClipRect::UNIT).is_ok());
    }

    #[test]
    fn test_bake_is_lazy_and_shared() {
        let mapping = CurveMapping::color();
        assert!(!mapping.is_baked());
        let a = mapping.ensure_baked();
        let b = mapping.ensure_baked();
        assert!(mapping.is_baked());
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_mutation_invalidates() {
        let mut mapping = CurveMapping::color();
        let before = mapping.ensure_baked();
        mapping.insert_point(0, 0.5, 0.8).unwrap();
        assert!(!mapping.is_baked());
        let after = mapping.ensure_baked();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.channel(0).evaluate(0.5) > before.channel(0).evaluate(0.5));
    }

    #[test]
    fn test_set_extend_applies_to_all_channels() {
        let mut mapping = CurveMapping::vector();
        mapping.ensure_baked();
        mapping.set_extend(Extrapolation::Extrapolate);
        assert!(!mapping.is_baked());
        assert!(
            mapping
                .channels()
                .iter()
                .all(|ch| ch.extrapolation() == Extrapolation::Extrapolate)
        );
    }

    #[test]
    fn test_concurrent_first_bake_converges() {
        let mapping = CurveMapping::color();
        let baked: Vec<Arc<BakedMapping>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| mapping.ensure_baked())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for b in &baked[1..] {
            assert!(Arc::ptr_eq(&baked[0], b));
        }
    }

    #[test]
    fn test_clipping_clamps_edits() {
        let mut mapping = CurveMapping::color();
        let idx = mapping.insert_point(1, 0.5, 3.0).unwrap();
        assert_eq!(mapping.channel(1).unwrap().points()[idx].y, 1.0);

        mapping.set_use_clip(false);
        let idx = mapping.insert_point(1, 0.75, 3.0).unwrap();
        assert_eq!(mapping.channel(1).unwrap().points()[idx].y, 3.0);
    }

    #[test]
    fn test_black_white_multiplier() {
        let mut mapping = CurveMapping::color();
        mapping.set_black_white([0.1, 0.0, 0.0], [0.6, 1.0, 0.0]);
        let bwmul = mapping.bwmul();
        assert!((bwmul[0] - 2.0).abs() < 1e-5);
        assert_eq!(bwmul[1], 1.0);
        assert!(bwmul[2].is_finite());
    }

    #[test]
    fn test_table_rgba_pads_missing_channels() {
        let rows = CurveMapping::vector().ensure_baked().table_rgba();
        assert_eq!(rows.len(), TABLE_SIZE);
        assert_eq!(rows[0][3], 0.0);
        assert_eq!(rows[TABLE_SEGMENTS][3], 1.0);
        assert_eq!(rows[0][0], -1.0);
    }

    #[test]
    fn test_json_round_trip_keeps_extend() {
        let mut mapping = CurveMapping::color();
        mapping.insert_point(2, 0.3, 0.6).unwrap();
        mapping.set_extend(Extrapolation::Extrapolate);
        let json = mapping.to_json_string().unwrap();
        let back = CurveMapping::from_json_str(&json).unwrap();
        assert_eq!(back.channels(), mapping.channels());
        assert_eq!(back.extend(), Extrapolation::Extrapolate);
    }

    #[test]
    fn test_json_rejects_bad_channel_count() {
        let json = r#"{"channels": [], "clip": {"min_x": 0, "min_y": 0, "max_x": 1, "max_y": 1}}"#;
        assert!(CurveMapping::from_json_str(json).is_err());
    }

    #[test]
    fn test_json_rejects_inverted_clip() {
        let mut value: serde_json::Value =
            serde_json::from_str(&CurveMapping::color().to_json_string().unwrap()).unwrap();
        value["clip"] = serde_json::json!({"min_x": 1, "min_y": 0, "max_x": 0, "max_y": 1});
        let err = CurveMapping::from_json_str(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("invalid clip rectangle"), "{err}");
    }

    #[test]
    fn test_constructors_reject_bad_clip() {
        let inverted = ClipRect::new(0.0, 1.0, 1.0, 0.0);
        assert!(matches!(
            CurveMapping::new(4, inverted),
            Err(CurveError::InvalidClip { .. })
        ));
        let nan = ClipRect::new(f32::NAN, 0.0, 1.0, 1.0);
        assert!(matches!(
            CurveMapping::new(3, nan),
            Err(CurveError::InvalidClip { .. })
        ));
        assert!(CurveMapping::new(3, ClipRect::new(0.5, 0.5, 0.5, 0.5)).is_ok());
    }
}
