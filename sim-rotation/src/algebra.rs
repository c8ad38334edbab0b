//! Rotation helpers shared by every policy.
//!
//! Everything here is `f64`. Rotations compound across thousands of ticks, so
//! no single precision value is ever introduced.

use na::{Quaternion, Unit, UnitQuaternion, Vector3};

/// Tolerance used by [`rotation_between`] when no configuration is at hand.
pub const DEFAULT_ANTIPARALLEL_TOLERANCE: f64 = 1e-9;

/// Shortest-arc rotation that maps `from` onto `to`.
///
/// The quaternion is built directly from the cross and dot products:
/// `q = normalize(from × to, from · to + |from||to|)`. That form stays
/// accurate for small angles, where going through `acos` loses digits.
///
/// When the two vectors are (nearly) anti-parallel both the vector part and
/// the scalar part vanish together. In that case a half-turn about an axis
/// orthogonal to `from` is returned instead of the 0/0 result. A zero length
/// input has no direction and yields the identity.
pub fn rotation_between(from: &Vector3<f64>, to: &Vector3<f64>) -> UnitQuaternion<f64> {
    rotation_between_with_tolerance(from, to, DEFAULT_ANTIPARALLEL_TOLERANCE)
}

/// [`rotation_between`] with an explicit anti-parallel tolerance, relative to
/// `|from||to|`.
pub fn rotation_between_with_tolerance(
    from: &Vector3<f64>,
    to: &Vector3<f64>,
    tolerance: f64,
) -> UnitQuaternion<f64> {
    let scale = (from.norm_squared() * to.norm_squared()).sqrt();
    if scale == 0.0 || !scale.is_finite() {
        return UnitQuaternion::identity();
    }

    let cross = from.cross(to);
    let w = from.dot(to) + scale;

    if w <= tolerance * scale {
        return half_turn_about(&any_orthogonal(from));
    }

    UnitQuaternion::new_normalize(Quaternion::new(w, cross.x, cross.y, cross.z))
}

/// Rotation of the global frame since `snapshot` was taken, given the frame's
/// current reference axis.
pub fn frame_shift(snapshot: &Vector3<f64>, current: &Vector3<f64>) -> UnitQuaternion<f64> {
    rotation_between(snapshot, current)
}

/// Rotation by `angle` radians about `axis`. A zero axis gives the identity.
pub fn rotation_about(axis: &Vector3<f64>, angle: f64) -> UnitQuaternion<f64> {
    match Unit::try_new(*axis, f64::EPSILON) {
        Some(axis) if angle != 0.0 => UnitQuaternion::from_axis_angle(&axis, angle),
        _ => UnitQuaternion::identity(),
    }
}

/// Componentwise `momentum / inertia`, with every inertia component below
/// `epsilon` (or not finite) replaced by `epsilon`.
pub fn rate_from_momentum(
    momentum: &Vector3<f64>,
    inertia: &Vector3<f64>,
    epsilon: f64,
) -> Vector3<f64> {
    let guarded = inertia.map(|i| if i.is_finite() && i > epsilon { i } else { epsilon });
    momentum.component_div(&guarded)
}

/// Unit vector from `from` to `to`, or zero when the points coincide.
pub fn unit_towards(from: &Vector3<f64>, to: &Vector3<f64>) -> Vector3<f64> {
    (to - from)
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}

fn half_turn_about(axis: &Unit<Vector3<f64>>) -> UnitQuaternion<f64> {
    UnitQuaternion::new_unchecked(Quaternion::new(0.0, axis.x, axis.y, axis.z))
}

/// Unit axis orthogonal to `v`, crossed with whichever coordinate axis is
/// least aligned with it.
fn any_orthogonal(v: &Vector3<f64>) -> Unit<Vector3<f64>> {
    let abs = v.abs();
    let helper = if abs.x <= abs.y && abs.x <= abs.z {
        Vector3::x()
    } else if abs.y <= abs.z {
        Vector3::y()
    } else {
        Vector3::z()
    };
    Unit::new_normalize(v.cross(&helper))
}
