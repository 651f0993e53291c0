use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// Body axes
// ---------------------------------------------------------------------------

/// Body right axis (pitch).
pub fn right() -> Vector3<f64> {
    Vector3::x()
}

/// Body forward axis, along the nose (roll).
pub fn forward() -> Vector3<f64> {
    Vector3::y()
}

/// Body dorsal axis (yaw).
pub fn up() -> Vector3<f64> {
    Vector3::z()
}

const EPS: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Vector helpers
// ---------------------------------------------------------------------------

/// Remove the component of `v` along `normal`.
pub fn exclude(normal: &Vector3<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    let n2 = normal.norm_squared();
    if n2 < EPS {
        return *v;
    }
    v - normal * (normal.dot(v) / n2)
}

/// Unsigned angle between two vectors, degrees. Zero if either is degenerate.
pub fn angle_between_deg(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let denom = a.norm() * b.norm();
    if denom < EPS {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Gram-Schmidt: normalize `fwd`, then make `up` unit and orthogonal to it.
///
/// When `up` is parallel to `fwd` an arbitrary perpendicular is chosen.
pub fn ortho_normalize(fwd: &Vector3<f64>, up: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let f = fwd.normalize();
    let u = exclude(&f, up);
    if u.norm_squared() > 1e-10 {
        return (f, u.normalize());
    }
    (f, any_perpendicular(&f))
}

fn any_perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    let seed = if v.z.abs() < 0.9 { Vector3::z() } else { Vector3::x() };
    exclude(v, &seed).normalize()
}

/// Swap the second and third components: (x, y, z) -> (x, z, y).
///
/// Converts between body-axis order (pitch, roll, yaw) and control order
/// (pitch, yaw, roll). The mapping is its own inverse.
pub fn reorder_132(v: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(v.x, v.z, v.y)
}

/// Component-wise reciprocal.
pub fn invert(v: &Vector3<f64>) -> Vector3<f64> {
    v.map(|c| 1.0 / c)
}

/// Component-wise sign (zero stays zero).
pub fn sign(v: &Vector3<f64>) -> Vector3<f64> {
    v.map(|c| if c > 0.0 { 1.0 } else if c < 0.0 { -1.0 } else { 0.0 })
}

/// Wrap an angle in degrees into (-180, 180].
pub fn wrap_degrees(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

// ---------------------------------------------------------------------------
// Orientation helpers
// ---------------------------------------------------------------------------

/// Orientation whose body forward axis points along `fwd` and whose dorsal
/// axis is as close as possible to `up`.
///
/// A degenerate forward vector yields the identity.
pub fn look_rotation(fwd: &Vector3<f64>, up: &Vector3<f64>) -> UnitQuaternion<f64> {
    if fwd.norm_squared() < EPS || !fwd.iter().all(|c| c.is_finite()) {
        return UnitQuaternion::identity();
    }
    let (y, z) = ortho_normalize(fwd, up);
    let x = y.cross(&z);
    let m = Matrix3::from_columns(&[x, y, z]);
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(m))
}

/// Heading (clockwise from north), pitch (nose up) and roll (right wing down),
/// all in degrees, expressed in a north/up surface frame.
pub fn from_heading_pitch_roll(heading: f64, pitch: f64, roll: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -heading.to_radians())
        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), pitch.to_radians())
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), roll.to_radians())
}

/// Per-axis Euler error of a body-frame rotation, degrees, control order
/// (pitch, yaw, roll), each wrapped into (-180, 180].
pub fn euler_error_deg(delta: &UnitQuaternion<f64>) -> Vector3<f64> {
    // nalgebra decomposes as Rz(c) * Ry(b) * Rx(a)
    let (about_x, about_y, about_z) = delta.euler_angles();
    Vector3::new(
        wrap_degrees(about_x.to_degrees()),
        wrap_degrees(about_z.to_degrees()),
        wrap_degrees(about_y.to_degrees()),
    )
}

/// True when every quaternion component is finite and the norm is usable.
pub fn is_valid_orientation(q: &UnitQuaternion<f64>) -> bool {
    let c = q.coords;
    c.iter().all(|v| v.is_finite()) && (c.norm() - 1.0).abs() < 1e-6
}
