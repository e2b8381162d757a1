use glam::Vec3;

/// Yaw/pitch camera producing the per-frame ray direction.
///
/// Only orientation lives here; position and projection belong to the
/// render backend's own scene setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub yaw: f32,
    pub pitch: f32,
    pub sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            yaw: -90.0_f32.to_radians(),
            pitch: 0.0,
            sensitivity: 0.003,
        }
    }
}

impl Camera {
    /// Normalized forward direction for the current yaw/pitch.
    pub fn direction(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    /// Apply a yaw/pitch delta, clamping pitch away from the poles.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch -= dy * self.sensitivity;
        self.pitch = self.pitch.clamp(
            -89.0_f32.to_radians(),
            89.0_f32.to_radians(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_is_normalized() {
        let mut camera = Camera::default();
        camera.rotate(140.0, -55.0);
        let dir = camera.direction();
        assert!((dir.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn pitch_clamps_at_poles() {
        let mut camera = Camera::default();
        camera.rotate(0.0, -1e6);
        assert!(camera.pitch <= 89.0_f32.to_radians());
        camera.rotate(0.0, 1e6);
        assert!(camera.pitch >= -89.0_f32.to_radians());
    }

    #[test]
    fn rotate_changes_direction() {
        let mut camera = Camera::default();
        let before = camera.direction();
        camera.rotate(200.0, 0.0);
        assert_ne!(before, camera.direction());
    }
}
