use cgmath::{Deg, Matrix3, Matrix4, Quaternion, Rotation3, SquareMatrix, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Position in source units (Z-up).
pub type Vertex3 = Vector3<f32>;

/// Texture coordinate; pixels or 0..1 depending on the source format.
pub type Uv2 = Vector2<f32>;

/// Euler angles in degrees as written in level and mesh files.
///
/// Axes follow the engine convention: pitch about X (lateral), yaw about Z
/// (vertical), roll about Y (forward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotation {
    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    pub fn is_zero(&self) -> bool {
        self.pitch == 0.0 && self.yaw == 0.0 && self.roll == 0.0
    }

    /// Successive local-axis rotations: yaw first, then pitch, then roll.
    ///
    /// Each step rotates about the axis as already turned by the previous
    /// steps, so the product is `Rz(yaw) * Rx(pitch) * Ry(roll)`. The order is
    /// not commutative.
    pub fn to_quaternion(self) -> Quaternion<f32> {
        let yaw = Quaternion::from_angle_z(Deg(self.yaw));
        let pitch = Quaternion::from_angle_x(Deg(self.pitch));
        let roll = Quaternion::from_angle_y(Deg(self.roll));
        yaw * pitch * roll
    }

    pub fn to_matrix3(self) -> Matrix3<f32> {
        Matrix3::from_angle_z(Deg(self.yaw))
            * Matrix3::from_angle_x(Deg(self.pitch))
            * Matrix3::from_angle_y(Deg(self.roll))
    }

    pub fn to_matrix4(self) -> Matrix4<f32> {
        Matrix4::from(self.to_matrix3())
    }
}

/// `T(translation) * R(rotation)`: rotate about the local origin, then place.
pub fn translate_rotate(translation: Vertex3, rotation: Rotation) -> Matrix4<f32> {
    if rotation.is_zero() {
        return Matrix4::from_translation(translation);
    }
    Matrix4::from_translation(translation) * rotation.to_matrix4()
}

pub fn identity() -> Matrix4<f32> {
    Matrix4::identity()
}

/// Column-major array form for hosts that take plain floats.
pub fn matrix_to_cols(m: &Matrix4<f32>) -> [[f32; 4]; 4] {
    (*m).into()
}

pub fn vec3_to_array(v: Vertex3) -> [f32; 3] {
    [v.x, v.y, v.z]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Rotation as _, Transform};

    fn assert_vec_close(a: Vertex3, b: Vertex3) {
        assert!((a - b).magnitude() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn yaw_turns_about_vertical_axis() {
        let r = Rotation::new(0.0, 90.0, 0.0);
        assert_vec_close(r.to_matrix3() * Vector3::unit_x(), Vector3::unit_y());
    }

    #[test]
    fn pitch_turns_about_lateral_axis() {
        let r = Rotation::new(90.0, 0.0, 0.0);
        assert_vec_close(r.to_matrix3() * Vector3::unit_y(), Vector3::unit_z());
    }

    #[test]
    fn roll_turns_about_forward_axis() {
        let r = Rotation::new(0.0, 0.0, 90.0);
        assert_vec_close(r.to_matrix3() * Vector3::unit_z(), Vector3::unit_x());
    }

    #[test]
    fn yaw_then_pitch_uses_local_axes() {
        // Yaw 90 swings the local X axis onto world Y; pitching then tilts
        // about that turned axis, lifting local Y (now world -X) to world Z.
        let r = Rotation::new(90.0, 90.0, 0.0);
        assert_vec_close(r.to_matrix3() * Vector3::unit_y(), Vector3::unit_z());
        assert_vec_close(r.to_matrix3() * Vector3::unit_x(), Vector3::unit_y());
    }

    #[test]
    fn composition_order_matters() {
        let r = Rotation::new(30.0, 45.0, 60.0);
        let ordered = r.to_matrix3();
        let reversed = Matrix3::from_angle_y(Deg(r.roll))
            * Matrix3::from_angle_x(Deg(r.pitch))
            * Matrix3::from_angle_z(Deg(r.yaw));
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert!(((ordered * v) - (reversed * v)).magnitude() > 1e-3);
    }

    #[test]
    fn quaternion_matches_matrix() {
        let r = Rotation::new(12.0, -70.0, 33.0);
        let v = Vector3::new(0.3, -1.2, 2.5);
        assert_vec_close(r.to_quaternion().rotate_vector(v), r.to_matrix3() * v);
    }

    #[test]
    fn translate_rotate_rotates_before_placing() {
        let m = translate_rotate(Vector3::new(10.0, 0.0, 0.0), Rotation::new(0.0, 90.0, 0.0));
        let p = m.transform_point(cgmath::Point3::new(1.0, 0.0, 0.0));
        assert_vec_close(Vector3::new(p.x, p.y, p.z), Vector3::new(10.0, 1.0, 0.0));
    }

    #[test]
    fn matrix_cols_are_column_major() {
        let m = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
        let cols = matrix_to_cols(&m);
        assert_eq!(cols[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
