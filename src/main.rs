//! Orrery - Interactive Solar System Visualizer
//!
//! A miniature solar system rendered with shadow mapping and screen-space
//! ambient occlusion, with live tuning panels for the camera, light, and
//! orbital layout.

mod render;
mod scene;
mod ui;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use eframe::egui;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use render::{AssetPaths, SceneCallback, SceneRenderData, SceneRenderResources};
use scene::{Camera, Light, MoveKeys, PointerButton, SimClock};
use ui::{OrbitPanel, OrbitSettings, ScenePanel, SceneSettings};

/// Fixed seed for the occlusion sampling kernel, so frames are reproducible
/// across runs.
const SSAO_SEED: u64 = 0x5eed_0b1e;

#[derive(Parser, Debug)]
#[command(name = "orrery", about = "Interactive solar system visualizer")]
struct Args {
    /// Directory holding shaders/, models/, and images/
    #[arg(long, default_value = "assets")]
    asset_root: PathBuf,
}

/// Application state
pub struct OrreryApp {
    camera: Camera,
    light: Light,
    scene_settings: SceneSettings,
    orbit_settings: OrbitSettings,
    clock: SimClock,
    shadow_debug_tex: egui::TextureId,
    last_frame_time: std::time::Instant,
    last_frame_delta: f64,
}

impl OrreryApp {
    pub fn new(cc: &eframe::CreationContext<'_>, args: &Args) -> Result<Self> {
        let wgpu_render_state = cc
            .wgpu_render_state
            .as_ref()
            .ok_or_else(|| anyhow!("wgpu render state unavailable"))?;
        let device = &wgpu_render_state.device;
        let queue = &wgpu_render_state.queue;
        let target_format = wgpu_render_state.target_format;

        let assets = AssetPaths::new(&args.asset_root);
        let mut rng = ChaCha8Rng::seed_from_u64(SSAO_SEED);

        let resources =
            SceneRenderResources::new(device, queue, target_format, 1280, 720, &assets, &mut rng)
                .context("Failed to initialize renderer")?;

        let mut renderer = wgpu_render_state.renderer.write();
        let shadow_debug_tex = renderer.register_native_texture(
            device,
            resources.shadow_debug_view(),
            wgpu::FilterMode::Nearest,
        );
        renderer.callback_resources.insert(resources);
        drop(renderer);

        log::info!("Renderer initialized");

        Ok(Self {
            camera: Camera::default(),
            light: Light::default(),
            scene_settings: SceneSettings::default(),
            orbit_settings: OrbitSettings::default(),
            clock: SimClock::default(),
            shadow_debug_tex,
            last_frame_time: std::time::Instant::now(),
            last_frame_delta: 0.0,
        })
    }

    /// Route pointer and key input inside the viewport to the camera.
    fn handle_camera_input(&mut self, ctx: &egui::Context, viewport_rect: egui::Rect) {
        let keys = ctx.input(|input| {
            for event in &input.events {
                match event {
                    egui::Event::PointerButton {
                        pos,
                        button,
                        pressed,
                        ..
                    } => {
                        // Presses must start inside the viewport; releases
                        // are honored anywhere so control cannot get stuck
                        if *pressed && !viewport_rect.contains(*pos) {
                            continue;
                        }
                        let button = match button {
                            egui::PointerButton::Primary => PointerButton::Primary,
                            egui::PointerButton::Secondary => PointerButton::Secondary,
                            egui::PointerButton::Middle => PointerButton::Middle,
                            _ => continue,
                        };
                        self.camera.handle_button(button, *pressed, pos.x, pos.y);
                    }
                    egui::Event::PointerMoved(pos) => {
                        self.camera.handle_move(pos.x, pos.y);
                    }
                    _ => {}
                }
            }

            MoveKeys {
                forward: input.key_down(egui::Key::W),
                back: input.key_down(egui::Key::S),
                left: input.key_down(egui::Key::A),
                right: input.key_down(egui::Key::D),
                up: input.key_down(egui::Key::E),
                down: input.key_down(egui::Key::Q),
            }
        });
        self.camera.handle_keys(&keys);
    }

    fn update_render_data(&self, frame: &eframe::Frame, aspect_ratio: f32) {
        if let Some(wgpu_render_state) = frame.wgpu_render_state() {
            let renderer = wgpu_render_state.renderer.read();
            if let Some(resources) = renderer.callback_resources.get::<SceneRenderResources>() {
                resources.set_render_data(SceneRenderData {
                    camera: self.camera.clone(),
                    light: self.light.clone(),
                    aspect_ratio,
                    time: self.clock.value(),
                    distance_scale: self.orbit_settings.distance_scale,
                    sun_size: self.orbit_settings.sun_size,
                    body_scale: self.orbit_settings.body_scale,
                    flashlight: self.scene_settings.flashlight,
                    blinn: self.scene_settings.blinn,
                    use_ssao: self.scene_settings.use_ssao,
                    ssao_radius: self.scene_settings.ssao_radius,
                    gamma: self.scene_settings.gamma,
                    clear_color: self.scene_settings.clear_color,
                });
            }
        }
    }

    fn render_viewport(&mut self, ui: &mut egui::Ui, frame: &eframe::Frame) {
        let viewport_rect = ui.available_rect_before_wrap();
        let pixels_per_point = ui.ctx().pixels_per_point();
        let viewport_width = (viewport_rect.width() * pixels_per_point).round().max(1.0) as u32;
        let viewport_height = (viewport_rect.height() * pixels_per_point).round().max(1.0) as u32;

        self.handle_camera_input(ui.ctx(), viewport_rect);

        let aspect_ratio = viewport_rect.width() / viewport_rect.height();
        self.update_render_data(frame, aspect_ratio);

        let (response, painter) =
            ui.allocate_painter(viewport_rect.size(), egui::Sense::click_and_drag());

        painter.add(egui_wgpu::Callback::new_paint_callback(
            response.rect,
            SceneCallback {
                viewport_size: (viewport_width, viewport_height),
            },
        ));

        let frame_time = self.last_frame_delta.max(0.001);
        painter.text(
            response.rect.left_top() + egui::vec2(10.0, 10.0),
            egui::Align2::LEFT_TOP,
            format!(
                "Camera: ({:.1}, {:.1}, {:.1}) yaw={:.0} pitch={:.0}\n\
                 Right-drag to look | WASD to move | E/Q up/down\n\
                 FPS: {:.0}",
                self.camera.position.x,
                self.camera.position.y,
                self.camera.position.z,
                self.camera.yaw,
                self.camera.pitch,
                1.0 / frame_time,
            ),
            egui::FontId::monospace(12.0),
            egui::Color32::from_rgb(150, 150, 150),
        );
    }
}

impl eframe::App for OrreryApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let now = std::time::Instant::now();
        self.last_frame_delta = (now - self.last_frame_time).as_secs_f64();
        self.last_frame_time = now;

        if self.scene_settings.animation {
            self.clock.advance(self.orbit_settings.time_speed);
        }

        ScenePanel::show(
            ctx,
            &mut self.scene_settings,
            &mut self.camera,
            &mut self.light,
            self.shadow_debug_tex,
        );
        OrbitPanel::show(ctx, &mut self.orbit_settings);

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_viewport(ui, frame);
        });

        ctx.request_repaint();
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Starting Orrery (assets: {:?})", args.asset_root);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1600.0, 900.0])
            .with_title("Orrery - Solar System Visualizer"),
        renderer: eframe::Renderer::Wgpu,
        ..Default::default()
    };

    eframe::run_native(
        "Orrery",
        options,
        Box::new(move |cc| match OrreryApp::new(cc, &args) {
            Ok(app) => Ok(Box::new(app)),
            Err(e) => {
                log::error!("Failed to initialize app: {}", e);
                Err(e.into())
            }
        }),
    )
    .map_err(|e| anyhow!("eframe error: {}", e))
}
