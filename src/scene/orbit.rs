//! Orbital animation: a static body table and pure per-body transforms.

use glam::{Mat4, Vec3};

/// Axial tilt applied to every orbiting body, degrees about +Y.
pub const AXIAL_TILT_DEG: f32 = 50.0;

/// Fixed per-body orbital constants. Decorative, not physical.
#[derive(Debug, Clone, Copy)]
pub struct BodyConstants {
    pub name: &'static str,
    /// Orbital radius as a factor of the tunable distance scale.
    pub radius_factor: f32,
    /// Orbital period divisor for the time accumulator.
    pub period: f32,
    /// Visual scale before the tunable size factor.
    pub base_scale: f32,
}

/// The central body. Radius factor 0 keeps it at the origin; its size is
/// driven by the sun-size tunable rather than the shared body scale.
pub const SUN: BodyConstants = BodyConstants {
    name: "sun",
    radius_factor: 0.0,
    period: 1.0,
    base_scale: 10.0,
};

/// Orbiting bodies, innermost first.
pub const BODIES: [BodyConstants; 4] = [
    BodyConstants {
        name: "mercury",
        radius_factor: 0.33,
        period: 88.0,
        base_scale: 0.34,
    },
    BodyConstants {
        name: "venus",
        radius_factor: 0.66,
        period: 225.0,
        base_scale: 1.0,
    },
    BodyConstants {
        name: "earth",
        radius_factor: 1.0,
        period: 365.0,
        base_scale: 1.0,
    },
    BodyConstants {
        name: "mars",
        radius_factor: 1.4,
        period: 687.0,
        base_scale: 0.5,
    },
];

/// Shared monotonic time accumulator, advanced once per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimClock {
    t: f32,
}

impl SimClock {
    pub fn advance(&mut self, delta: f32) {
        self.t += delta;
    }

    pub fn value(&self) -> f32 {
        self.t
    }
}

/// Model transform for a body at accumulator value `t`:
/// circular orbit in the XZ plane, axial tilt, then uniform scale.
pub fn body_transform(
    body: &BodyConstants,
    t: f32,
    distance_scale: f32,
    size_scale: f32,
) -> Mat4 {
    let angle = (2.0 * t / body.period).to_radians();
    let translation =
        body.radius_factor * distance_scale * Vec3::new(angle.cos(), 0.0, angle.sin());
    Mat4::from_translation(translation)
        * Mat4::from_rotation_y(AXIAL_TILT_DEG.to_radians())
        * Mat4::from_scale(Vec3::splat(body.base_scale * size_scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn translation_at_epoch_lies_on_x_axis() {
        let mercury = &BODIES[0];
        assert_eq!(mercury.radius_factor, 0.33);
        assert_eq!(mercury.period, 88.0);

        let m = body_transform(mercury, 0.0, 300.0, 1.0);
        let t = m.w_axis.truncate();
        assert!((t - Vec3::new(0.33 * 300.0, 0.0, 0.0)).length() < EPS);
    }

    #[test]
    fn translation_follows_circular_formula() {
        let mercury = &BODIES[0];
        let (t, d) = (44.0_f32, 250.0_f32);
        let angle = (2.0 * t / 88.0).to_radians();
        let expected = 0.33 * d * Vec3::new(angle.cos(), 0.0, angle.sin());

        let m = body_transform(mercury, t, d, 1.0);
        assert!((m.w_axis.truncate() - expected).length() < EPS);
    }

    #[test]
    fn transform_is_deterministic() {
        let earth = &BODIES[2];
        let a = body_transform(earth, 123.5, 300.0, 2.0);
        let b = body_transform(earth, 123.5, 300.0, 2.0);
        assert_eq!(a.to_cols_array(), b.to_cols_array());
    }

    #[test]
    fn sun_stays_at_origin() {
        let m = body_transform(&SUN, 500.0, 300.0, 3.0);
        assert!(m.w_axis.truncate().length() < EPS);
        // Scale carries base * tunable.
        assert!((m.x_axis.length() - 30.0).abs() < 1e-2);
    }

    #[test]
    fn clock_accumulates() {
        let mut clock = SimClock::default();
        clock.advance(1.0);
        clock.advance(2.5);
        assert!((clock.value() - 3.5).abs() < EPS);
    }
}
