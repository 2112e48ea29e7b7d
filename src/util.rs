//! Shared utilities

/// Knuth multiplicative hash, used to scatter clear-tile variants
#[inline]
pub fn knuth_hash(seed: u32) -> u32 {
    seed.wrapping_mul(2654435761)
}

/// One color channel `t` of the way from `from` to `to`, `t` clamped to
/// [0, 1]. Truncates toward `from`.
#[inline]
pub fn lerp_channel(from: u8, to: u8, t: f32) -> u8 {
    let t = t.clamp(0.0, 1.0);
    (from as f32 + (to as f32 - from as f32) * t) as u8
}
