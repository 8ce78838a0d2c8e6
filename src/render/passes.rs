//! egui_wgpu integration for 3D scene rendering.
//!
//! Renders the scene offscreen through a fixed pass sequence (shadow map,
//! geometry prepass, SSAO, blur, lit color pass), then blits the result into
//! egui's render pass with gamma correction. The geometry, SSAO, and blur
//! passes are skipped while ambient occlusion is toggled off.

use anyhow::Result;
use glam::{Mat4, Vec3};
use parking_lot::RwLock;
use rand::Rng;

use crate::scene::{body_transform, Camera, Light, BODIES, SUN};

use super::assets::{load_cubemap, load_planet_mesh, load_texture, AssetPaths, ShaderCatalog};
use super::mesh::{generate_cube, GpuMesh, MeshVertex};
use super::targets::{
    create_ssao_noise_texture, generate_ssao_kernel, generate_ssao_noise, FrameTargets, ShadowMap,
    SSAO_KERNEL_SIZE,
};

/// Side length of the fixed shadow-map preview texture shown in the overlay.
pub const SHADOW_DEBUG_SIZE: u32 = 256;

/// One model matrix slot per drawn body: the sun plus the orbiting planets.
const MODEL_COUNT: usize = 1 + BODIES.len();
/// Dynamic-offset stride; uniform offsets must be 256-aligned.
const MODEL_STRIDE: u64 = 256;

/// Per-frame data passed to the callback.
#[derive(Clone)]
pub struct SceneRenderData {
    pub camera: Camera,
    pub light: Light,
    pub aspect_ratio: f32,
    /// Orbital time accumulator.
    pub time: f32,
    pub distance_scale: f32,
    pub sun_size: f32,
    pub body_scale: f32,
    pub flashlight: bool,
    pub blinn: bool,
    pub use_ssao: bool,
    pub ssao_radius: f32,
    pub gamma: f32,
    pub clear_color: [f32; 4],
}

impl Default for SceneRenderData {
    fn default() -> Self {
        Self {
            camera: Camera::default(),
            light: Light::default(),
            aspect_ratio: 16.0 / 9.0,
            time: 0.0,
            distance_scale: 300.0,
            sun_size: 1.0,
            body_scale: 1.0,
            flashlight: false,
            blinn: false,
            use_ssao: true,
            ssao_radius: 0.5,
            gamma: 1.0,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl SceneRenderData {
    /// Whether the geometry prepass, SSAO, and blur passes run this frame.
    /// The lit shader ignores the occlusion texture while this is off, so
    /// the whole chain can be skipped.
    fn occlusion_enabled(&self) -> bool {
        self.use_ssao
    }
}

/// Camera matrices shared by the geometry and main passes.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
}

/// Per-body model matrix, one 256-byte slot per body in a shared buffer
/// addressed with dynamic offsets.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelUniform {
    model: [[f32; 4]; 4],
}

/// Light-space transform for the shadow pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ShadowUniform {
    light_view_proj: [[f32; 4]; 4],
}

/// Everything the lit fragment shader needs. Flags are packed as u32 because
/// WGSL uniforms have no bool layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct LitUniforms {
    view_proj: [[f32; 4]; 4],
    light_transform: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    light_pos: [f32; 4],
    light_dir: [f32; 4],
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
    /// (constant, linear, quadratic, 0).
    attenuation: [f32; 4],
    /// Cosines of the inner and outer cone angles.
    cutoff: [f32; 2],
    screen_size: [f32; 2],
    /// (directional, blinn, use_ssao, 0).
    flags: [u32; 4],
}

/// Occlusion pass parameters: projection, hemisphere kernel, and tuning.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct SsaoUniforms {
    proj: [[f32; 4]; 4],
    kernel: [[f32; 4]; SSAO_KERNEL_SIZE],
    radius: f32,
    bias: f32,
    _padding: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct SkyboxUniform {
    transform: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct GizmoUniform {
    transform: [[f32; 4]; 4],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BlitUniforms {
    gamma: f32,
    _padding: [f32; 3],
}

fn vec4(v: Vec3, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

/// GPU resources for 3D scene rendering, stored in callback_resources.
pub struct SceneRenderResources {
    target_format: wgpu::TextureFormat,
    targets: FrameTargets,
    shadow_map: ShadowMap,

    // Uniform buffers
    camera_buffer: wgpu::Buffer,
    model_buffer: wgpu::Buffer,
    shadow_buffer: wgpu::Buffer,
    lit_buffer: wgpu::Buffer,
    ssao_buffer: wgpu::Buffer,
    skybox_buffer: wgpu::Buffer,
    gizmo_buffer: wgpu::Buffer,
    blit_buffer: wgpu::Buffer,

    // Meshes
    planet_mesh: GpuMesh,
    cube_mesh: GpuMesh,

    // Shadow pass (depth only)
    shadow_pipeline: wgpu::RenderPipeline,
    shadow_bind_group: wgpu::BindGroup,

    // Geometry prepass (view-space position + normal)
    geometry_pipeline: wgpu::RenderPipeline,
    camera_bind_group: wgpu::BindGroup,
    model_bind_group: wgpu::BindGroup,

    // SSAO + blur
    ssao_pipeline: wgpu::RenderPipeline,
    ssao_uniform_bind_group: wgpu::BindGroup,
    ssao_inputs_layout: wgpu::BindGroupLayout,
    ssao_inputs_bind_group: wgpu::BindGroup,
    ssao_kernel: [[f32; 4]; SSAO_KERNEL_SIZE],
    noise_view: wgpu::TextureView,
    blur_pipeline: wgpu::RenderPipeline,
    blur_layout: wgpu::BindGroupLayout,
    blur_bind_group: wgpu::BindGroup,

    // Main color pass
    skybox_pipeline: wgpu::RenderPipeline,
    skybox_bind_group: wgpu::BindGroup,
    gizmo_pipeline: wgpu::RenderPipeline,
    gizmo_bind_group: wgpu::BindGroup,
    lit_pipeline: wgpu::RenderPipeline,
    lit_frame_layout: wgpu::BindGroupLayout,
    lit_frame_bind_group: wgpu::BindGroup,
    material_bind_group: wgpu::BindGroup,

    // Shadow-map preview for the overlay
    shadow_debug_pipeline: wgpu::RenderPipeline,
    shadow_debug_bind_group: wgpu::BindGroup,
    shadow_debug_view: wgpu::TextureView,

    // Blit to egui's render pass
    blit_pipeline: wgpu::RenderPipeline,
    blit_layout: wgpu::BindGroupLayout,
    blit_bind_group: wgpu::BindGroup,

    // Samplers kept for bind-group rebuilds on resize
    linear_sampler: wgpu::Sampler,
    shadow_sampler: wgpu::Sampler,

    // Shared render data (updated each frame)
    render_data: RwLock<SceneRenderData>,
}

impl SceneRenderResources {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        assets: &AssetPaths,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        log::info!("Initializing SceneRenderResources ({}x{})", width, height);

        let shaders = ShaderCatalog::new(assets.shaders.clone());

        let targets = FrameTargets::new(device, width, height, target_format);
        let shadow_map = ShadowMap::new(device);

        // Meshes
        let (planet_vertices, planet_indices) = load_planet_mesh(&assets.models)?;
        let planet_mesh = GpuMesh::new(device, &planet_vertices, &planet_indices, "Planet");
        let (cube_vertices, cube_indices) = generate_cube();
        let cube_mesh = GpuMesh::new(device, &cube_vertices, &cube_indices, "Cube");

        // Textures
        let planet_texture = load_texture(device, queue, &assets.images.join("planet.jpg"))?;
        let planet_view = planet_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let cubemap = load_cubemap(device, queue, &assets.images)?;
        let cubemap_view = cubemap.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        let ssao_kernel = generate_ssao_kernel(rng);
        let noise = generate_ssao_noise(rng);
        let (_noise_texture, noise_view) = create_ssao_noise_texture(device, queue, &noise);

        // Samplers
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        // Uniform buffers
        let uniform_buffer = |label: &str, size: u64| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let camera_buffer = uniform_buffer(
            "Camera Buffer",
            std::mem::size_of::<CameraUniform>() as u64,
        );
        let model_buffer = uniform_buffer("Model Buffer", MODEL_COUNT as u64 * MODEL_STRIDE);
        let shadow_buffer = uniform_buffer(
            "Shadow Buffer",
            std::mem::size_of::<ShadowUniform>() as u64,
        );
        let lit_buffer = uniform_buffer("Lit Buffer", std::mem::size_of::<LitUniforms>() as u64);
        let ssao_buffer = uniform_buffer("SSAO Buffer", std::mem::size_of::<SsaoUniforms>() as u64);
        let skybox_buffer = uniform_buffer(
            "Skybox Buffer",
            std::mem::size_of::<SkyboxUniform>() as u64,
        );
        let gizmo_buffer = uniform_buffer(
            "Gizmo Buffer",
            std::mem::size_of::<GizmoUniform>() as u64,
        );
        let blit_buffer = uniform_buffer("Blit Buffer", std::mem::size_of::<BlitUniforms>() as u64);

        // Common bind group layout entries
        let uniform_entry = |binding: u32, visibility: wgpu::ShaderStages| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let texture_entry = |binding: u32, dimension: wgpu::TextureViewDimension| {
            wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: dimension,
                    multisampled: false,
                },
                count: None,
            }
        };
        let sampler_entry = |binding: u32, ty: wgpu::SamplerBindingType| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(ty),
            count: None,
        };
        let depth_texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        // Camera bind group (geometry prepass)
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Model bind group: one slot per body, selected with a dynamic offset
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Model Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ModelUniform>() as u64
                    ),
                },
                count: None,
            }],
        });
        let model_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout: &model_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &model_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniform>() as u64),
                }),
            }],
        });

        // Shadow pass: light transform + per-body model, no fragment stage
        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Bind Group"),
            layout: &shadow_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: shadow_buffer.as_entire_binding(),
            }],
        });

        let shadow_shader = shaders.load(device, "shadow")?;
        let shadow_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Shadow Pipeline Layout"),
                bind_group_layouts: &[&shadow_layout, &model_layout],
                push_constant_ranges: &[],
            });
        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shadow Pipeline"),
            layout: Some(&shadow_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shadow_shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Geometry prepass: view-space position and normal for SSAO
        let geometry_shader = shaders.load(device, "geometry")?;
        let geometry_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Geometry Pipeline Layout"),
                bind_group_layouts: &[&camera_layout, &model_layout],
                push_constant_ranges: &[],
            });
        let geometry_target = |format| {
            Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })
        };
        let geometry_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Geometry Pipeline"),
            layout: Some(&geometry_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &geometry_shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &geometry_shader,
                entry_point: Some("fs_main"),
                targets: &[
                    geometry_target(wgpu::TextureFormat::Rgba16Float),
                    geometry_target(wgpu::TextureFormat::Rgba16Float),
                ],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // SSAO pass
        let ssao_uniform_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("SSAO Uniform Bind Group Layout"),
                entries: &[uniform_entry(0, wgpu::ShaderStages::FRAGMENT)],
            });
        let ssao_uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSAO Uniform Bind Group"),
            layout: &ssao_uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ssao_buffer.as_entire_binding(),
            }],
        });

        let ssao_inputs_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Inputs Bind Group Layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                texture_entry(1, wgpu::TextureViewDimension::D2),
                texture_entry(2, wgpu::TextureViewDimension::D2),
                sampler_entry(3, wgpu::SamplerBindingType::Filtering),
            ],
        });
        let ssao_inputs_bind_group = Self::create_ssao_inputs_bind_group(
            device,
            &ssao_inputs_layout,
            &targets,
            &noise_view,
            &linear_sampler,
        );

        let ssao_shader = shaders.load(device, "ssao")?;
        let ssao_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("SSAO Pipeline Layout"),
            bind_group_layouts: &[&ssao_uniform_layout, &ssao_inputs_layout],
            push_constant_ranges: &[],
        });
        let ssao_pipeline = Self::create_post_pipeline(
            device,
            "SSAO Pipeline",
            &ssao_shader,
            &ssao_pipeline_layout,
            wgpu::TextureFormat::R8Unorm,
        );

        // SSAO blur: 5x5 box filter read with textureLoad, no sampler
        let blur_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blur Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });
        let blur_bind_group =
            Self::create_blur_bind_group(device, &blur_layout, &targets.ssao_view);

        let blur_shader = shaders.load(device, "blur")?;
        let blur_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blur Pipeline Layout"),
            bind_group_layouts: &[&blur_layout],
            push_constant_ranges: &[],
        });
        let blur_pipeline = Self::create_post_pipeline(
            device,
            "Blur Pipeline",
            &blur_shader,
            &blur_pipeline_layout,
            wgpu::TextureFormat::R8Unorm,
        );

        // Skybox: cube shell recentered on the camera each frame
        let skybox_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skybox Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX),
                texture_entry(1, wgpu::TextureViewDimension::Cube),
                sampler_entry(2, wgpu::SamplerBindingType::Filtering),
            ],
        });
        let skybox_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skybox Bind Group"),
            layout: &skybox_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: skybox_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&cubemap_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&linear_sampler),
                },
            ],
        });

        let skybox_shader = shaders.load(device, "skybox")?;
        let skybox_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Skybox Pipeline Layout"),
                bind_group_layouts: &[&skybox_layout],
                push_constant_ranges: &[],
            });
        let skybox_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Skybox Pipeline"),
            layout: Some(&skybox_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &skybox_shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &skybox_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Viewed from inside the cube
                cull_mode: Some(wgpu::Face::Front),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Light gizmo: small solid cube at the light position
        let gizmo_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Gizmo Bind Group Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });
        let gizmo_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Gizmo Bind Group"),
            layout: &gizmo_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: gizmo_buffer.as_entire_binding(),
            }],
        });

        let gizmo_shader = shaders.load(device, "gizmo")?;
        let gizmo_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Gizmo Pipeline Layout"),
                bind_group_layouts: &[&gizmo_layout],
                push_constant_ranges: &[],
            });
        let gizmo_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Gizmo Pipeline"),
            layout: Some(&gizmo_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &gizmo_shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &gizmo_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Lit pass: Blinn/Phong with shadow comparison and occlusion lookup
        let lit_frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lit Frame Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                depth_texture_entry(1),
                sampler_entry(2, wgpu::SamplerBindingType::Comparison),
                texture_entry(3, wgpu::TextureViewDimension::D2),
                sampler_entry(4, wgpu::SamplerBindingType::Filtering),
            ],
        });
        let lit_frame_bind_group = Self::create_lit_frame_bind_group(
            device,
            &lit_frame_layout,
            &lit_buffer,
            &shadow_map.view,
            &shadow_sampler,
            &targets.ssao_blur_view,
            &linear_sampler,
        );

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                sampler_entry(1, wgpu::SamplerBindingType::Filtering),
            ],
        });
        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&planet_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&linear_sampler),
                },
            ],
        });

        let lit_shader = shaders.load(device, "lit")?;
        let lit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lit Pipeline Layout"),
            bind_group_layouts: &[&lit_frame_layout, &model_layout, &material_layout],
            push_constant_ranges: &[],
        });
        let lit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Lit Pipeline"),
            layout: Some(&lit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &lit_shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &lit_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Shadow-map preview: fixed-size grayscale render of the depth map,
        // registered once with egui so the texture id stays valid
        let shadow_debug_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Debug Texture"),
            size: wgpu::Extent3d {
                width: SHADOW_DEBUG_SIZE,
                height: SHADOW_DEBUG_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let shadow_debug_view =
            shadow_debug_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let shadow_debug_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Shadow Debug Bind Group Layout"),
                entries: &[depth_texture_entry(0)],
            });
        let shadow_debug_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Debug Bind Group"),
            layout: &shadow_debug_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            }],
        });

        let shadow_debug_shader = shaders.load(device, "shadow_debug")?;
        let shadow_debug_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Shadow Debug Pipeline Layout"),
                bind_group_layouts: &[&shadow_debug_layout],
                push_constant_ranges: &[],
            });
        let shadow_debug_pipeline = Self::create_post_pipeline(
            device,
            "Shadow Debug Pipeline",
            &shadow_debug_shader,
            &shadow_debug_pipeline_layout,
            wgpu::TextureFormat::Rgba8Unorm,
        );

        // Blit pipeline (to draw the offscreen texture to egui's render pass)
        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Bind Group Layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                sampler_entry(1, wgpu::SamplerBindingType::Filtering),
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let blit_bind_group = Self::create_blit_bind_group(
            device,
            &blit_layout,
            &targets.color_view,
            &linear_sampler,
            &blit_buffer,
        );

        let blit_shader = shaders.load(device, "blit")?;
        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&blit_layout],
            push_constant_ranges: &[],
        });
        let blit_pipeline = Self::create_post_pipeline(
            device,
            "Blit Pipeline",
            &blit_shader,
            &blit_pipeline_layout,
            target_format,
        );

        Ok(Self {
            target_format,
            targets,
            shadow_map,
            camera_buffer,
            model_buffer,
            shadow_buffer,
            lit_buffer,
            ssao_buffer,
            skybox_buffer,
            gizmo_buffer,
            blit_buffer,
            planet_mesh,
            cube_mesh,
            shadow_pipeline,
            shadow_bind_group,
            geometry_pipeline,
            camera_bind_group,
            model_bind_group,
            ssao_pipeline,
            ssao_uniform_bind_group,
            ssao_inputs_layout,
            ssao_inputs_bind_group,
            ssao_kernel,
            noise_view,
            blur_pipeline,
            blur_layout,
            blur_bind_group,
            skybox_pipeline,
            skybox_bind_group,
            gizmo_pipeline,
            gizmo_bind_group,
            lit_pipeline,
            lit_frame_layout,
            lit_frame_bind_group,
            material_bind_group,
            shadow_debug_pipeline,
            shadow_debug_bind_group,
            shadow_debug_view,
            blit_pipeline,
            blit_layout,
            blit_bind_group,
            linear_sampler,
            shadow_sampler,
            render_data: RwLock::new(SceneRenderData::default()),
        })
    }

    /// Fullscreen-triangle pipeline with no vertex buffers and no depth.
    fn create_post_pipeline(
        device: &wgpu::Device,
        label: &str,
        shader: &wgpu::ShaderModule,
        layout: &wgpu::PipelineLayout,
        format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_ssao_inputs_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        targets: &FrameTargets,
        noise_view: &wgpu::TextureView,
        linear_sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSAO Inputs Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.position_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.normal_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(noise_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(linear_sampler),
                },
            ],
        })
    }

    fn create_blur_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        ssao_view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blur Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(ssao_view),
            }],
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn create_lit_frame_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        lit_buffer: &wgpu::Buffer,
        shadow_view: &wgpu::TextureView,
        shadow_sampler: &wgpu::Sampler,
        ao_view: &wgpu::TextureView,
        ao_sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lit Frame Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: lit_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(shadow_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(ao_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(ao_sampler),
                },
            ],
        })
    }

    fn create_blit_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        color_view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        blit_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: blit_buffer.as_entire_binding(),
                },
            ],
        })
    }

    /// Update render data (called from app each frame).
    pub fn set_render_data(&self, data: SceneRenderData) {
        *self.render_data.write() = data;
    }

    /// View of the shadow-map preview texture, for egui registration.
    pub fn shadow_debug_view(&self) -> &wgpu::TextureView {
        &self.shadow_debug_view
    }

    /// Resize the offscreen targets if needed. The full target set and every
    /// bind group referencing it are replaced together.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.targets.size == (width, height) || width == 0 || height == 0 {
            return;
        }
        log::debug!("Resizing frame targets to {}x{}", width, height);

        self.targets = FrameTargets::new(device, width, height, self.target_format);
        self.ssao_inputs_bind_group = Self::create_ssao_inputs_bind_group(
            device,
            &self.ssao_inputs_layout,
            &self.targets,
            &self.noise_view,
            &self.linear_sampler,
        );
        self.blur_bind_group =
            Self::create_blur_bind_group(device, &self.blur_layout, &self.targets.ssao_view);
        self.lit_frame_bind_group = Self::create_lit_frame_bind_group(
            device,
            &self.lit_frame_layout,
            &self.lit_buffer,
            &self.shadow_map.view,
            &self.shadow_sampler,
            &self.targets.ssao_blur_view,
            &self.linear_sampler,
        );
        self.blit_bind_group = Self::create_blit_bind_group(
            device,
            &self.blit_layout,
            &self.targets.color_view,
            &self.linear_sampler,
            &self.blit_buffer,
        );
    }

    /// Model matrices for this frame: the sun in slot 0, then the planets.
    fn write_model_uniforms(&self, queue: &wgpu::Queue, data: &SceneRenderData) {
        let sun = body_transform(&SUN, data.time, data.distance_scale, data.sun_size);
        queue.write_buffer(
            &self.model_buffer,
            0,
            bytemuck::bytes_of(&ModelUniform {
                model: sun.to_cols_array_2d(),
            }),
        );
        for (i, body) in BODIES.iter().enumerate() {
            let model = body_transform(body, data.time, data.distance_scale, data.body_scale);
            queue.write_buffer(
                &self.model_buffer,
                (i as u64 + 1) * MODEL_STRIDE,
                bytemuck::bytes_of(&ModelUniform {
                    model: model.to_cols_array_2d(),
                }),
            );
        }
    }

    fn write_frame_uniforms(&self, queue: &wgpu::Queue, data: &SceneRenderData) {
        let view = data.camera.view_matrix();
        let proj = data.camera.projection_matrix(data.aspect_ratio);
        let view_proj = proj * view;

        let camera_uniform = CameraUniform {
            view_proj: view_proj.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            camera_pos: vec4(data.camera.position, 1.0),
        };
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera_uniform));

        let pose = data.light.effective_pose(data.flashlight, &data.camera);
        let light_vp = data.light.shadow_projection() * data.light.shadow_view(&pose);
        queue.write_buffer(
            &self.shadow_buffer,
            0,
            bytemuck::bytes_of(&ShadowUniform {
                light_view_proj: light_vp.to_cols_array_2d(),
            }),
        );

        let (width, height) = self.targets.size;
        let cutoff = data.light.cutoff_cosines();
        let lit_uniforms = LitUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            light_transform: light_vp.to_cols_array_2d(),
            camera_pos: vec4(data.camera.position, 1.0),
            light_pos: vec4(pose.position, 1.0),
            light_dir: vec4(pose.direction, 0.0),
            ambient: vec4(data.light.ambient, 1.0),
            diffuse: vec4(data.light.diffuse, 1.0),
            specular: vec4(data.light.specular, 1.0),
            attenuation: vec4(data.light.attenuation(), 0.0),
            cutoff,
            screen_size: [width as f32, height as f32],
            flags: [
                data.light.directional as u32,
                data.blinn as u32,
                data.use_ssao as u32,
                0,
            ],
        };
        queue.write_buffer(&self.lit_buffer, 0, bytemuck::bytes_of(&lit_uniforms));

        let ssao_uniforms = SsaoUniforms {
            proj: proj.to_cols_array_2d(),
            kernel: self.ssao_kernel,
            radius: data.ssao_radius,
            bias: 0.025,
            _padding: [0.0; 2],
        };
        queue.write_buffer(&self.ssao_buffer, 0, bytemuck::bytes_of(&ssao_uniforms));

        // Skybox shell: scaled cube recentered on the camera, so it never
        // comes into reach
        let skybox_transform = view_proj
            * Mat4::from_translation(data.camera.position)
            * Mat4::from_scale(Vec3::splat(50.0));
        queue.write_buffer(
            &self.skybox_buffer,
            0,
            bytemuck::bytes_of(&SkyboxUniform {
                transform: skybox_transform.to_cols_array_2d(),
            }),
        );

        let gizmo_color = (data.light.ambient + data.light.diffuse).extend(1.0);
        let gizmo_transform = view_proj
            * Mat4::from_translation(pose.position)
            * Mat4::from_scale(Vec3::splat(0.1));
        queue.write_buffer(
            &self.gizmo_buffer,
            0,
            bytemuck::bytes_of(&GizmoUniform {
                transform: gizmo_transform.to_cols_array_2d(),
                color: gizmo_color.to_array(),
            }),
        );

        queue.write_buffer(
            &self.blit_buffer,
            0,
            bytemuck::bytes_of(&BlitUniforms {
                gamma: data.gamma.max(0.01),
                _padding: [0.0; 3],
            }),
        );
    }

    fn draw_bodies(&self, render_pass: &mut wgpu::RenderPass<'_>, model_group_index: u32) {
        for slot in 0..MODEL_COUNT as u32 {
            render_pass.set_bind_group(
                model_group_index,
                &self.model_bind_group,
                &[slot * MODEL_STRIDE as u32],
            );
            self.planet_mesh.draw(render_pass, 0..1);
        }
    }

    /// Render the scene to the offscreen targets.
    pub fn render_offscreen(
        &self,
        _device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        let data = self.render_data.read().clone();

        self.write_frame_uniforms(queue, &data);
        self.write_model_uniforms(queue, &data);

        // Shadow pass: scene depth from the light's viewpoint
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            render_pass.set_pipeline(&self.shadow_pipeline);
            render_pass.set_bind_group(0, &self.shadow_bind_group, &[]);
            self.draw_bodies(&mut render_pass, 1);
        }

        // Geometry prepass: view-space position and normal for SSAO
        if data.occlusion_enabled() {
            let clear_target = |view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Geometry Prepass"),
                color_attachments: &[
                    clear_target(&self.targets.position_view),
                    clear_target(&self.targets.normal_view),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            render_pass.set_pipeline(&self.geometry_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            self.draw_bodies(&mut render_pass, 1);
        }

        // SSAO pass
        if data.occlusion_enabled() {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("SSAO Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.ssao_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            render_pass.set_pipeline(&self.ssao_pipeline);
            render_pass.set_bind_group(0, &self.ssao_uniform_bind_group, &[]);
            render_pass.set_bind_group(1, &self.ssao_inputs_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        // Blur pass
        if data.occlusion_enabled() {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("SSAO Blur Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.ssao_blur_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            render_pass.set_pipeline(&self.blur_pipeline);
            render_pass.set_bind_group(0, &self.blur_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        // Main color pass
        {
            let [r, g, b, a] = data.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Color Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            render_pass.set_pipeline(&self.skybox_pipeline);
            render_pass.set_bind_group(0, &self.skybox_bind_group, &[]);
            self.cube_mesh.draw(&mut render_pass, 0..1);

            // With the flashlight on the gizmo would sit inside the camera
            if !data.flashlight {
                render_pass.set_pipeline(&self.gizmo_pipeline);
                render_pass.set_bind_group(0, &self.gizmo_bind_group, &[]);
                self.cube_mesh.draw(&mut render_pass, 0..1);
            }

            render_pass.set_pipeline(&self.lit_pipeline);
            render_pass.set_bind_group(0, &self.lit_frame_bind_group, &[]);
            render_pass.set_bind_group(2, &self.material_bind_group, &[]);
            self.draw_bodies(&mut render_pass, 1);
        }

        // Shadow-map preview for the overlay
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Debug Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.shadow_debug_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            render_pass.set_pipeline(&self.shadow_debug_pipeline);
            render_pass.set_bind_group(0, &self.shadow_debug_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }
    }

    /// Blit the offscreen color target to egui's render pass, applying gamma.
    pub fn blit(&self, render_pass: &mut wgpu::RenderPass<'static>) {
        render_pass.set_pipeline(&self.blit_pipeline);
        render_pass.set_bind_group(0, &self.blit_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

/// The callback that egui_wgpu will invoke.
pub struct SceneCallback {
    pub viewport_size: (u32, u32),
}

impl egui_wgpu::CallbackTrait for SceneCallback {
    fn prepare(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        _screen_descriptor: &egui_wgpu::ScreenDescriptor,
        egui_encoder: &mut wgpu::CommandEncoder,
        callback_resources: &mut egui_wgpu::CallbackResources,
    ) -> Vec<wgpu::CommandBuffer> {
        if let Some(resources) = callback_resources.get_mut::<SceneRenderResources>() {
            resources.resize(device, self.viewport_size.0, self.viewport_size.1);
            resources.render_offscreen(device, queue, egui_encoder);
        }
        Vec::new()
    }

    fn paint(
        &self,
        _info: egui::PaintCallbackInfo,
        render_pass: &mut wgpu::RenderPass<'static>,
        callback_resources: &egui_wgpu::CallbackResources,
    ) {
        if let Some(resources) = callback_resources.get::<SceneRenderResources>() {
            resources.blit(render_pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // WGSL uniform blocks require 16-byte struct alignment.
    #[test]
    fn uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<CameraUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<LitUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<SsaoUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<GizmoUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<BlitUniforms>() % 16, 0);
    }

    // Must stay in sync with the SsaoUniforms block in ssao.wgsl:
    // proj (64) + kernel (16 * 64) + radius + bias + padding (16).
    #[test]
    fn ssao_uniform_layout_matches_shader_block() {
        assert_eq!(
            std::mem::size_of::<SsaoUniforms>(),
            64 + 16 * SSAO_KERNEL_SIZE + 16
        );
    }

    #[test]
    fn occlusion_chain_follows_toggle() {
        let mut data = SceneRenderData::default();
        assert!(data.occlusion_enabled());
        data.use_ssao = false;
        assert!(!data.occlusion_enabled());
    }

    #[test]
    fn model_slots_fit_the_stride() {
        assert!(std::mem::size_of::<ModelUniform>() as u64 <= MODEL_STRIDE);
        assert_eq!(MODEL_COUNT, 5);
    }

    #[test]
    fn render_data_defaults_match_startup_view() {
        let data = SceneRenderData::default();
        assert_eq!(data.distance_scale, 300.0);
        assert_eq!(data.sun_size, 1.0);
        assert_eq!(data.body_scale, 1.0);
        assert!(!data.flashlight);
        assert!(data.use_ssao);
    }
}
