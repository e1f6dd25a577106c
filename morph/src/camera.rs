use cgmath::{Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3};

use crate::constants::{CAMERA_DISTANCE, CAMERA_FAR, CAMERA_FOVY, CAMERA_NEAR};

/// A point after projection: normalized device coordinates plus view depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub ndc: [f32; 2],
    pub depth: f32,
}

pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub aspect: f32,
    pub fovy: f32,
    rotation_y: f32,
    matrix: Matrix4<f32>,
    changed: bool,
}

impl Camera {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            eye: (0.0, 0.0, CAMERA_DISTANCE).into(),
            target: (0.0, 0.0, 0.0).into(),
            up: Vector3::unit_y(),
            aspect: aspect(width, height),
            fovy: CAMERA_FOVY,
            rotation_y: 0.0,
            matrix: Matrix4::identity(),
            changed: true,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        let aspect = aspect(width, height);
        if aspect != self.aspect {
            self.aspect = aspect;
            self.changed = true;
        }
    }

    /// Rotation of the whole cloud about the y axis.
    pub fn set_rotation(&mut self, rotation_y: f32) {
        if rotation_y != self.rotation_y {
            self.rotation_y = rotation_y;
            self.changed = true;
        }
    }

    /// Move the eye along the view direction; positive values move closer.
    pub fn zoom(&mut self, amount: f32) {
        if amount == 0.0 {
            return;
        }
        let to_target = self.target - self.eye;
        let distance = to_target.magnitude();
        let new_distance = (distance - amount).clamp(CAMERA_NEAR * 10.0, CAMERA_FAR * 0.5);
        self.eye = self.target - to_target.normalize() * new_distance;
        self.changed = true;
    }

    pub fn flush_if_needed(&mut self) {
        if self.changed {
            self.matrix = self.build_view_projection_matrix();
            self.changed = false;
        }
    }

    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        let view = Matrix4::look_at_rh(self.eye, self.target, self.up);
        let proj = cgmath::perspective(Deg(self.fovy), self.aspect, CAMERA_NEAR, CAMERA_FAR);
        let model = Matrix4::from_angle_y(Rad(self.rotation_y));
        proj * view * model
    }

    /// Project a model-space point. `None` if it lies behind the near plane.
    /// Call [`Camera::flush_if_needed`] after changing the camera.
    pub fn project(&self, point: Vector3<f32>) -> Option<Projected> {
        let clip = self.matrix * Point3::from_vec(point).to_homogeneous();
        if clip.w < CAMERA_NEAR {
            return None;
        }
        Some(Projected {
            ndc: [clip.x / clip.w, clip.y / clip.w],
            depth: clip.w,
        })
    }
}

fn aspect(width: f32, height: f32) -> f32 {
    if height > 0.0 { width / height } else { 1.0 }
}
