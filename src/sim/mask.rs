//! Procedural mask synthesis
//!
//! The mask is a square field of independent random values in [0, 1].
//! Each layer thresholds it against its height percentage to decide which
//! texels survive, so one mask is shared by every layer of a stack.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rayon::prelude::*;

use crate::consts::{MASK_MAX_RESOLUTION, MASK_TILE};
use crate::error::{Result, ShellError};

static NEXT_MASK_ID: AtomicU64 = AtomicU64::new(1);

/// Clamp a requested resolution to what the synthesizer can fill.
///
/// The result lies in [MASK_TILE, MASK_MAX_RESOLUTION] and is a multiple of
/// MASK_TILE so the fill divides evenly into tiles.
pub fn clamp_resolution(requested: u32) -> Result<u32> {
    if requested == 0 {
        return Err(ShellError::ZeroResolution);
    }
    let clamped = requested.clamp(MASK_TILE, MASK_MAX_RESOLUTION);
    let rounded = clamped - clamped % MASK_TILE;
    if rounded == 0 {
        return Err(ShellError::ZeroResolution);
    }
    Ok(rounded)
}

/// A square random-value texture, shared by reference across a stack
#[derive(Debug)]
pub struct MaskTexture {
    id: u64,
    resolution: u32,
    /// Row-major texels, resolution * resolution values
    texels: Vec<f32>,
}

/// Shared handle stored in every layer's parameter block
pub type MaskRef = Arc<MaskTexture>;

impl MaskTexture {
    fn new(resolution: u32, texels: Vec<f32>) -> Self {
        debug_assert_eq!(texels.len(), (resolution * resolution) as usize);
        Self {
            id: NEXT_MASK_ID.fetch_add(1, Ordering::Relaxed),
            resolution,
            texels,
        }
    }

    /// Process-unique id (changes whenever the mask is regenerated)
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn texels(&self) -> &[f32] {
        &self.texels
    }

    /// Texel lookup with repeat wrapping
    pub fn sample(&self, x: u32, y: u32) -> f32 {
        let x = x % self.resolution;
        let y = y % self.resolution;
        self.texels[(y * self.resolution + x) as usize]
    }

    /// Expand to RGBA8 (value in every channel) for GPU upload
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.texels.len() * 4);
        for &v in &self.texels {
            let b = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            bytes.extend_from_slice(&[b, b, b, 255]);
        }
        bytes
    }

    /// Host memory held by the texel buffer
    pub fn byte_size(&self) -> usize {
        self.texels.len() * std::mem::size_of::<f32>()
    }
}

/// Produces masks for a stack's layers
pub trait MaskSynthesizer {
    /// Generate a fresh mask. `resolution` is clamped; only zero fails.
    fn synthesize(&mut self, resolution: u32) -> Result<MaskTexture>;
}

/// CPU synthesizer filling tiles in one parallel pass.
///
/// Each tile draws from its own PCG stream, so tiles can be filled in any
/// order on any thread and every texel is written exactly once.
#[derive(Debug, Clone)]
pub struct TiledMaskSynthesizer {
    rng: Pcg32,
}

impl Default for TiledMaskSynthesizer {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl TiledMaskSynthesizer {
    /// Seeded synthesizer (reproducible sequence of masks)
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Synthesizer seeded from the thread RNG
    pub fn from_entropy() -> Self {
        Self::new(rand::rng().random())
    }

    /// Tiles per mask edge for a clamped resolution
    pub fn tiles_per_edge(resolution: u32) -> u32 {
        resolution / MASK_TILE
    }
}

impl MaskSynthesizer for TiledMaskSynthesizer {
    fn synthesize(&mut self, requested: u32) -> Result<MaskTexture> {
        let resolution = clamp_resolution(requested)?;
        if resolution != requested {
            log::warn!(
                "Mask resolution {} clamped to {} (tile {}, max {})",
                requested,
                resolution,
                MASK_TILE,
                MASK_MAX_RESOLUTION
            );
        }

        let res = resolution as usize;
        let tile = MASK_TILE as usize;
        let tiles = Self::tiles_per_edge(resolution) as usize;
        let base_seed: u64 = self.rng.random();

        let mut texels = vec![0.0_f32; res * res];

        // One band = one row of tiles; bands are disjoint slices of the texture
        texels
            .par_chunks_mut(res * tile)
            .enumerate()
            .for_each(|(tile_y, band)| {
                for tile_x in 0..tiles {
                    let stream = (tile_y * tiles + tile_x) as u64;
                    let mut rng = Pcg32::new(base_seed, stream);
                    for row in 0..tile {
                        let start = row * res + tile_x * tile;
                        for texel in &mut band[start..start + tile] {
                            *texel = rng.random::<f32>();
                        }
                    }
                }
            });

        log::debug!(
            "Synthesized {}x{} mask ({}x{} tiles)",
            resolution,
            resolution,
            tiles,
            tiles
        );

        Ok(MaskTexture::new(resolution, texels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_resolution_rounds_down_to_tile() {
        assert_eq!(clamp_resolution(100).unwrap(), 96);
        assert_eq!(clamp_resolution(96).unwrap(), 96);
        assert_eq!(clamp_resolution(32).unwrap(), 32);
    }

    #[test]
    fn test_clamp_resolution_bounds() {
        assert_eq!(clamp_resolution(5).unwrap(), MASK_TILE);
        assert_eq!(clamp_resolution(5000).unwrap(), MASK_MAX_RESOLUTION);
        assert!(matches!(
            clamp_resolution(0),
            Err(ShellError::ZeroResolution)
        ));
    }

    #[test]
    fn test_synthesize_fills_every_texel() {
        let mut synth = TiledMaskSynthesizer::new(7);
        let mask = synth.synthesize(100).unwrap();
        assert_eq!(mask.resolution(), 96);
        assert_eq!(mask.texels().len(), 96 * 96);
        assert!(mask.texels().iter().all(|v| (0.0..1.0).contains(v)));

        // Zero-initialized buffer: an unfilled tile would show as a run of zeros
        let zeros = mask.texels().iter().filter(|v| **v == 0.0).count();
        assert!(zeros < 4, "found {zeros} untouched texels");
    }

    #[test]
    fn test_tiles_are_independent_noise() {
        let mut synth = TiledMaskSynthesizer::new(11);
        let mask = synth.synthesize(16).unwrap();
        // Neighboring tiles use different streams, so their first rows differ
        let a: Vec<f32> = (0..8).map(|x| mask.sample(x, 0)).collect();
        let b: Vec<f32> = (8..16).map(|x| mask.sample(x, 0)).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_each_mask_gets_fresh_id_and_values() {
        let mut synth = TiledMaskSynthesizer::new(3);
        let a = synth.synthesize(32).unwrap();
        let b = synth.synthesize(32).unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.texels(), b.texels());
    }

    #[test]
    fn test_sample_wraps() {
        let mut synth = TiledMaskSynthesizer::new(1);
        let mask = synth.synthesize(8).unwrap();
        assert_eq!(mask.sample(0, 0), mask.sample(8, 8));
        assert_eq!(mask.sample(3, 2), mask.sample(11, 18));
    }

    #[test]
    fn test_rgba8_layout() {
        let mut synth = TiledMaskSynthesizer::new(5);
        let mask = synth.synthesize(8).unwrap();
        let bytes = mask.to_rgba8();
        assert_eq!(bytes.len(), 8 * 8 * 4);
        assert!(bytes.chunks(4).all(|px| px[0] == px[1] && px[1] == px[2] && px[3] == 255));
        assert_eq!(mask.byte_size(), 8 * 8 * 4);
    }
}
