//! Fast approximations for the handful of math routines the light buffer leans on.
//!
//! The inverse square root is seeded from a lookup table indexed by the low exponent
//! bit and the top mantissa bits of the input, then refined with Newton steps.
//! The table has to be built once with [`FastMath::init`] and is then shared
//! (usually behind an `Arc`) by everything that needs it.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::f32::consts::PI;
use std::fmt;

use bevy::math::Vec2;

/// Number of mantissa bits used to index the seed table
const LOOKUP_BITS: u32 = 8;
/// Bit position of the exponent in an IEEE single
const EXP_POS: u32 = 23;
/// IEEE single exponent bias
const EXP_BIAS: u32 = 127;
/// Where the looked up mantissa bits start
const LOOKUP_POS: u32 = EXP_POS - LOOKUP_BITS;
/// Where the seed mantissa bits are placed in the output
const SEED_POS: u32 = EXP_POS - 8;
/// One entry per (exponent parity, mantissa prefix) pair
const SQRT_TABLE_SIZE: usize = 2 << LOOKUP_BITS;
/// Mask selecting the table index out of the shifted input bits
const LOOKUP_MASK: u32 = SQRT_TABLE_SIZE as u32 - 1;

/// Lookup tables for the fast math routines.
///
/// There is no global instance: build it once with [`FastMath::init`] before creating
/// any light buffers and hand it to them.
#[derive(Clone)]
pub struct FastMath {
    /// Mantissa seeds for the inverse square root
    inv_sqrt_seeds: Box<[u32; SQRT_TABLE_SIZE]>,
}

impl fmt::Debug for FastMath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastMath")
            .field("table_size", &self.inv_sqrt_seeds.len())
            .finish()
    }
}

impl FastMath {
    /// Build the seed table.
    pub fn init() -> Self {
        let mut seeds = Box::new([0u32; SQRT_TABLE_SIZE]);
        for (i, seed) in seeds.iter_mut().enumerate() {
            // Bit 8 of `i` lands on the exponent's low bit, so the table covers both parities
            let input = f32::from_bits(((EXP_BIAS - 1) << EXP_POS) | ((i as u32) << LOOKUP_POS));
            let output = (1.0 / f64::from(input).sqrt()) as f32;
            *seed = ((output.to_bits().wrapping_add(1 << (SEED_POS - 2)) >> SEED_POS) & 0xFF)
                << SEED_POS;
        }
        // 1/sqrt(1.0) would round up into the next exponent
        seeds[SQRT_TABLE_SIZE / 2] = 0xFF << SEED_POS;
        Self {
            inv_sqrt_seeds: seeds,
        }
    }

    /// Inverse square root with roughly 32 bits of precision.
    /// Returns a huge number when `x` is zero. Negative inputs are a caller bug.
    pub fn inv_sqrt(&self, x: f32) -> f32 {
        debug_assert!(x >= 0.0, "inv_sqrt of a negative number: {}", x);
        let bits = x.to_bits();
        let half = f64::from(x * 0.5);
        let exponent = ((3 * EXP_BIAS - 1) - ((bits >> EXP_POS) & 0xFF)) >> 1;
        let table_idx = ((bits >> (EXP_POS - LOOKUP_BITS)) & LOOKUP_MASK) as usize;
        let seed = (exponent << EXP_POS) | self.inv_sqrt_seeds[table_idx];
        let mut r = f64::from(f32::from_bits(seed));
        r *= 1.5 - r * r * half;
        r *= 1.5 - r * r * half;
        r as f32
    }

    /// Square root built on [`FastMath::inv_sqrt`]
    pub fn sqrt(&self, x: f32) -> f32 {
        x * self.inv_sqrt(x)
    }

    /// Length of a vector
    pub fn length(&self, v: Vec2) -> f32 {
        self.sqrt(v.length_squared())
    }

    /// Normalize a vector, returning the unit vector and the original length.
    /// Zero length, subnormal or non finite vectors have no direction and return None.
    pub fn normalize(&self, v: Vec2) -> Option<(Vec2, f32)> {
        let length_squared = v.length_squared();
        if !length_squared.is_finite() || length_squared < f32::MIN_POSITIVE {
            return None;
        }
        let inv_length = self.inv_sqrt(length_squared);
        Some((v * inv_length, length_squared * inv_length))
    }

    /// Arc cosine with the input clamped to [-1, 1] so it never returns NaN
    pub fn acos(&self, a: f32) -> f32 {
        if a <= -1.0 {
            return PI;
        }
        if a >= 1.0 {
            return 0.0;
        }
        a.acos()
    }

    /// Polynomial arc cosine, maximum absolute error is about 6.8e-5
    pub fn acos16(&self, a: f32) -> f32 {
        if a.is_sign_negative() {
            if a <= -1.0 {
                return PI;
            }
            let a = a.abs();
            PI - Self::acos16_poly(a) * (1.0 - a).sqrt()
        } else {
            if a >= 1.0 {
                return 0.0;
            }
            Self::acos16_poly(a) * (1.0 - a).sqrt()
        }
    }

    /// The shared polynomial of [`FastMath::acos16`], valid on [0, 1]
    fn acos16_poly(a: f32) -> f32 {
        ((-0.018_729_3 * a + 0.074_261) * a - 0.212_114_4) * a + 1.570_728_8
    }
}
