use std::f32::consts::{PI, TAU};

/// Signed shortest rotation from `from` to `to`, in `[-π, π)`.
pub fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    (to - from + PI).rem_euclid(TAU) - PI
}

/// Interpolate between two headings along the shorter arc.
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    from + shortest_angle_delta(from, to) * t
}

/// Blend factor for exponential smoothing with the given half-life.
///
/// Applying `current += (target - current) * factor` every frame converges
/// at the same rate regardless of frame timing. A non-positive half-life
/// means "snap".
pub fn smoothing_factor(dt: f32, half_life: f32) -> f32 {
    if half_life <= 0.0 {
        return 1.0;
    }
    1.0 - (-dt * std::f32::consts::LN_2 / half_life).exp()
}

/// Wrap a coordinate into `[0, extent)`.
pub fn wrap_toroidal(value: f32, extent: f32) -> f32 {
    if extent <= 0.0 {
        return value;
    }
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs
    if wrapped >= extent { 0.0 } else { wrapped }
}
