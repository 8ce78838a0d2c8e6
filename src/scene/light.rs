//! Light parameters and the shadow-space transforms derived from them.

use glam::{Mat4, Vec3};

use super::Camera;

/// Scene light. Directional mode casts parallel rays through a fixed
/// orthographic shadow volume; positional mode is a spot light whose shadow
/// frustum follows the cone cutoff.
#[derive(Debug, Clone)]
pub struct Light {
    pub directional: bool,
    pub position: Vec3,
    pub direction: Vec3,
    /// Inner cone angle and outer falloff delta, in degrees (spot mode only).
    pub cutoff: [f32; 2],
    /// Falloff distance driving the attenuation coefficients.
    pub distance: f32,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            directional: false,
            position: Vec3::new(2.0, 4.0, 4.0),
            direction: Vec3::new(-0.5, -1.5, -1.0),
            cutoff: [50.0, 5.0],
            distance: 150.0,
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::splat(1.0),
        }
    }
}

/// Pose actually used for lighting and shadow sampling this frame. With the
/// flashlight override this is the camera's pose; the stored [`Light`] fields
/// are never touched.
#[derive(Debug, Clone, Copy)]
pub struct LightPose {
    pub position: Vec3,
    pub direction: Vec3,
}

impl Light {
    /// Resolve the pose for this frame. `flashlight` substitutes the camera
    /// pose without mutating the light.
    pub fn effective_pose(&self, flashlight: bool, camera: &Camera) -> LightPose {
        if flashlight {
            LightPose {
                position: camera.position,
                direction: camera.front(),
            }
        } else {
            LightPose {
                position: self.position,
                direction: self.direction,
            }
        }
    }

    /// View matrix looking from the pose position along its direction.
    pub fn shadow_view(&self, pose: &LightPose) -> Mat4 {
        Mat4::look_at_rh(pose.position, pose.position + pose.direction, Vec3::Y)
    }

    /// Shadow projection chosen by mode: a fixed orthographic box when
    /// directional, otherwise a perspective frustum wide enough for the full
    /// spot cone (vertical fov = 2 * (inner + outer)).
    pub fn shadow_projection(&self) -> Mat4 {
        if self.directional {
            Mat4::orthographic_rh(-10.0, 10.0, -10.0, 10.0, 1.0, 30.0)
        } else {
            let fov = ((self.cutoff[0] + self.cutoff[1]) * 2.0).to_radians();
            Mat4::perspective_rh(fov, 1.0, 1.0, 20.0)
        }
    }

    /// Map the falloff distance to (constant, linear, quadratic) attenuation
    /// coefficients. Larger distances give gentler falloff.
    pub fn attenuation(&self) -> Vec3 {
        let d = self.distance.max(1e-3);
        Vec3::new(1.0, 4.5 / d, 75.0 / (d * d))
    }

    /// Cosines of the inner and outer cone angles, as the lit shader expects.
    pub fn cutoff_cosines(&self) -> [f32; 2] {
        [
            self.cutoff[0].to_radians().cos(),
            (self.cutoff[0] + self.cutoff[1]).to_radians().cos(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn mat_eq(a: Mat4, b: Mat4) -> bool {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .all(|(x, y)| (x - y).abs() < EPS)
    }

    #[test]
    fn mode_toggle_switches_projection() {
        let mut light = Light {
            cutoff: [30.0, 10.0],
            ..Light::default()
        };

        light.directional = false;
        let spot = light.shadow_projection();
        assert!(mat_eq(
            spot,
            Mat4::perspective_rh(80.0_f32.to_radians(), 1.0, 1.0, 20.0)
        ));

        light.directional = true;
        let ortho = light.shadow_projection();
        assert!(mat_eq(
            ortho,
            Mat4::orthographic_rh(-10.0, 10.0, -10.0, 10.0, 1.0, 30.0)
        ));

        // The orthographic volume is fixed regardless of cutoff.
        light.cutoff = [80.0, 1.0];
        assert!(mat_eq(light.shadow_projection(), ortho));
    }

    #[test]
    fn attenuation_monotonic_in_distance() {
        let near = Light {
            distance: 20.0,
            ..Light::default()
        };
        let far = Light {
            distance: 200.0,
            ..Light::default()
        };
        let (a, b) = (near.attenuation(), far.attenuation());
        assert_eq!(a.x, 1.0);
        assert_eq!(b.x, 1.0);
        assert!(b.y < a.y);
        assert!(b.z < a.z);
    }

    #[test]
    fn flashlight_uses_camera_pose_without_mutation() {
        let light = Light::default();
        let stored_pos = light.position;
        let stored_dir = light.direction;

        let mut camera = Camera::default();
        camera.position = Vec3::new(1.0, 2.0, 3.0);
        camera.yaw = 90.0;
        camera.pitch = 0.0;

        let pose = light.effective_pose(true, &camera);
        assert!((pose.position - camera.position).length() < EPS);
        assert!((pose.direction - camera.front()).length() < EPS);

        assert_eq!(light.position, stored_pos);
        assert_eq!(light.direction, stored_dir);

        let pose = light.effective_pose(false, &camera);
        assert_eq!(pose.position, stored_pos);
        assert_eq!(pose.direction, stored_dir);
    }

    #[test]
    fn cutoff_cosines_cover_inner_and_outer_cone() {
        let light = Light {
            cutoff: [50.0, 5.0],
            ..Light::default()
        };
        let [inner, outer] = light.cutoff_cosines();
        assert!((inner - 50.0_f32.to_radians().cos()).abs() < EPS);
        assert!((outer - 55.0_f32.to_radians().cos()).abs() < EPS);
        assert!(outer < inner);
    }
}
