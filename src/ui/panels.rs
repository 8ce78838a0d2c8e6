//! Scene and orbit tuning windows.
//!
//! The panels edit plain settings structs; the app pushes the merged state to
//! the renderer once per frame.

use egui::Ui;

use crate::scene::{Camera, Light};

/// Rendering and lighting settings edited in the scene window.
#[derive(Clone)]
pub struct SceneSettings {
    pub clear_color: [f32; 4],
    pub gamma: f32,
    pub blinn: bool,
    pub flashlight: bool,
    pub use_ssao: bool,
    pub ssao_radius: f32,
    /// Advance the orbital clock each frame.
    pub animation: bool,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            gamma: 1.0,
            blinn: false,
            flashlight: false,
            use_ssao: true,
            ssao_radius: 0.5,
            animation: true,
        }
    }
}

/// Orbital layout settings edited in the planets window.
#[derive(Clone)]
pub struct OrbitSettings {
    pub distance_scale: f32,
    pub sun_size: f32,
    pub body_scale: f32,
    pub time_speed: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            distance_scale: 300.0,
            sun_size: 1.0,
            body_scale: 1.0,
            time_speed: 1.0,
        }
    }
}

/// Scene window: clear color, gamma, camera pose, light parameters, and the
/// live shadow-map preview.
pub struct ScenePanel;

impl ScenePanel {
    pub fn show(
        ctx: &egui::Context,
        settings: &mut SceneSettings,
        camera: &mut Camera,
        light: &mut Light,
        shadow_debug: egui::TextureId,
    ) {
        egui::Window::new("Scene")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Clear color");
                    ui.color_edit_button_rgba_unmultiplied(&mut settings.clear_color);
                });
                ui.horizontal(|ui| {
                    ui.label("Gamma");
                    ui.add(
                        egui::DragValue::new(&mut settings.gamma)
                            .speed(0.01)
                            .range(0.0..=2.0),
                    );
                });
                ui.checkbox(&mut settings.animation, "Animate orbits");

                ui.separator();
                Self::camera_section(ui, camera);

                ui.separator();
                Self::light_section(ui, settings, light);

                ui.separator();
                ui.collapsing("Shadow map", |ui| {
                    ui.image(egui::load::SizedTexture::new(
                        shadow_debug,
                        egui::vec2(256.0, 256.0),
                    ));
                });
            });
    }

    fn camera_section(ui: &mut Ui, camera: &mut Camera) {
        ui.label("Camera");
        ui.horizontal(|ui| {
            ui.label("Position");
            ui.add(egui::DragValue::new(&mut camera.position.x).speed(0.1));
            ui.add(egui::DragValue::new(&mut camera.position.y).speed(0.1));
            ui.add(egui::DragValue::new(&mut camera.position.z).speed(0.1));
        });
        ui.horizontal(|ui| {
            ui.label("Yaw");
            ui.add(egui::DragValue::new(&mut camera.yaw).speed(0.5));
            ui.label("Pitch");
            ui.add(
                egui::DragValue::new(&mut camera.pitch)
                    .speed(0.5)
                    .range(-89.0..=89.0),
            );
        });
        camera.yaw = camera.yaw.rem_euclid(360.0);
        if ui.button("Reset camera").clicked() {
            camera.reset();
        }
    }

    fn light_section(ui: &mut Ui, settings: &mut SceneSettings, light: &mut Light) {
        ui.collapsing("Light", |ui| {
            ui.checkbox(&mut light.directional, "Directional");
            ui.checkbox(&mut settings.flashlight, "Flashlight");
            ui.checkbox(&mut settings.blinn, "Blinn specular");

            ui.horizontal(|ui| {
                ui.label("Position");
                ui.add(egui::DragValue::new(&mut light.position.x).speed(0.1));
                ui.add(egui::DragValue::new(&mut light.position.y).speed(0.1));
                ui.add(egui::DragValue::new(&mut light.position.z).speed(0.1));
            });
            ui.horizontal(|ui| {
                ui.label("Direction");
                ui.add(egui::DragValue::new(&mut light.direction.x).speed(0.05));
                ui.add(egui::DragValue::new(&mut light.direction.y).speed(0.05));
                ui.add(egui::DragValue::new(&mut light.direction.z).speed(0.05));
            });

            ui.add(egui::Slider::new(&mut light.cutoff[0], 1.0..=80.0).text("Cone angle"));
            ui.add(egui::Slider::new(&mut light.cutoff[1], 0.0..=30.0).text("Cone falloff"));
            ui.add(egui::Slider::new(&mut light.distance, 1.0..=600.0).text("Distance"));

            Self::light_colors(ui, light);

            ui.separator();
            ui.checkbox(&mut settings.use_ssao, "Ambient occlusion");
            ui.add(egui::Slider::new(&mut settings.ssao_radius, 0.05..=2.0).text("AO radius"));
        });
    }

    /// Per-channel RGB editors for the three light terms.
    fn light_colors(ui: &mut Ui, light: &mut Light) {
        let color_edit = |ui: &mut Ui, value: &mut glam::Vec3, label: &str| {
            ui.horizontal(|ui| {
                let mut rgb = value.to_array();
                ui.color_edit_button_rgb(&mut rgb);
                *value = glam::Vec3::from_array(rgb);
                ui.label(label);
            });
        };
        color_edit(ui, &mut light.ambient, "Ambient");
        color_edit(ui, &mut light.diffuse, "Diffuse");
        color_edit(ui, &mut light.specular, "Specular");
    }
}

/// Planets window: orbital layout and animation speed.
pub struct OrbitPanel;

impl OrbitPanel {
    pub fn show(ctx: &egui::Context, settings: &mut OrbitSettings) {
        egui::Window::new("Planets")
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.add(
                    egui::Slider::new(&mut settings.distance_scale, 100.0..=400.0)
                        .text("Planet distance"),
                );
                ui.add(egui::Slider::new(&mut settings.sun_size, 0.1..=10.0).text("Sun size"));
                ui.add(egui::Slider::new(&mut settings.body_scale, 1.0..=10.0).text("Planet size"));
                ui.add(egui::Slider::new(&mut settings.time_speed, 1.0..=10.0).text("Time speed"));
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_startup_state() {
        let scene = SceneSettings::default();
        assert_eq!(scene.gamma, 1.0);
        assert!(scene.animation);
        assert!(!scene.flashlight);

        let orbit = OrbitSettings::default();
        assert_eq!(orbit.distance_scale, 300.0);
        assert_eq!(orbit.time_speed, 1.0);
    }

    #[test]
    fn light_colors_keep_independent_channels() {
        let ctx = egui::Context::default();
        let mut light = Light {
            ambient: glam::Vec3::new(0.1, 0.2, 0.3),
            diffuse: glam::Vec3::new(0.8, 0.4, 0.2),
            ..Light::default()
        };

        // Rendering the editors without input must not collapse the
        // channels to a single gray level.
        let _ = ctx.run(Default::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                ScenePanel::light_colors(ui, &mut light);
            });
        });

        assert_eq!(light.ambient, glam::Vec3::new(0.1, 0.2, 0.3));
        assert_eq!(light.diffuse, glam::Vec3::new(0.8, 0.4, 0.2));
        assert_eq!(light.specular, Light::default().specular);
    }
}
