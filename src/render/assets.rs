//! Startup asset loading: WGSL shaders, textures, the skybox cubemap, and the
//! planet mesh. Everything here runs exactly once during initialization and
//! any failure is fatal to startup.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use super::mesh::MeshVertex;

/// Asset directory layout under a single configurable root.
#[derive(Debug, Clone)]
pub struct AssetPaths {
    pub shaders: PathBuf,
    pub models: PathBuf,
    pub images: PathBuf,
}

impl AssetPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            shaders: root.join("shaders"),
            models: root.join("models"),
            images: root.join("images"),
        }
    }
}

/// Loads WGSL shader modules by name from the shaders directory
/// (`<name>.wgsl`). A missing or unreadable file aborts initialization.
pub struct ShaderCatalog {
    dir: PathBuf,
}

impl ShaderCatalog {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn load(&self, device: &wgpu::Device, name: &str) -> Result<wgpu::ShaderModule> {
        let path = self.dir.join(format!("{name}.wgsl"));
        log::info!("Loading shader: {:?}", path);
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read shader: {:?}", path))?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        }))
    }
}

/// Load an image file into an sRGB 2D texture.
pub fn load_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
) -> Result<wgpu::Texture> {
    log::info!("Loading texture: {:?}", path);

    let img = image::open(path).with_context(|| format!("Failed to load texture: {:?}", path))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: path.file_name().and_then(|n| n.to_str()),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    Ok(texture)
}

/// Face order expected by cube texture views: +X, -X, +Y, -Y, +Z, -Z.
const CUBE_FACES: [&str; 6] = [
    "space_right.jpg",
    "space_left.jpg",
    "space_top.jpg",
    "space_bottom.jpg",
    "space_front.jpg",
    "space_back.jpg",
];

/// Load the six skybox faces into a single cube texture. All faces must share
/// the same square dimensions.
pub fn load_cubemap(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    images_dir: &Path,
) -> Result<wgpu::Texture> {
    let mut faces = Vec::with_capacity(6);
    let mut size = None;

    for name in CUBE_FACES {
        let path = images_dir.join(name);
        log::info!("Loading cubemap face: {:?}", path);
        let img = image::open(&path)
            .with_context(|| format!("Failed to load cubemap face: {:?}", path))?;
        let rgba = img.to_rgba8();
        let dims = rgba.dimensions();
        match size {
            None => size = Some(dims),
            Some(expected) if expected != dims => {
                bail!(
                    "Cubemap face {:?} is {}x{}, expected {}x{}",
                    path,
                    dims.0,
                    dims.1,
                    expected.0,
                    expected.1
                );
            }
            Some(_) => {}
        }
        faces.push(rgba);
    }

    let (width, height) = size.context("no cubemap faces loaded")?;
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Skybox Cubemap"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 6,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (layer, rgba) in faces.iter().enumerate() {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    Ok(texture)
}

/// Load the planet OBJ mesh. Normals missing from the file are approximated
/// from the vertex position, which is exact for a unit sphere.
pub fn load_planet_mesh(models_dir: &Path) -> Result<(Vec<MeshVertex>, Vec<u32>)> {
    let path = models_dir.join("planet.obj");
    log::info!("Loading model: {:?}", path);

    let (models, _materials) = tobj::load_obj(&path, &tobj::GPU_LOAD_OPTIONS)
        .with_context(|| format!("Failed to load model: {:?}", path))?;

    let model = models
        .first()
        .with_context(|| format!("Model {:?} contains no meshes", path))?;
    let mesh = &model.mesh;

    if mesh.positions.is_empty() || mesh.indices.is_empty() {
        bail!("Model {:?} has no geometry", path);
    }

    let vertex_count = mesh.positions.len() / 3;
    let mut vertices = Vec::with_capacity(vertex_count);
    for i in 0..vertex_count {
        let position = [
            mesh.positions[3 * i],
            mesh.positions[3 * i + 1],
            mesh.positions[3 * i + 2],
        ];
        let normal = if mesh.normals.len() >= 3 * (i + 1) {
            [
                mesh.normals[3 * i],
                mesh.normals[3 * i + 1],
                mesh.normals[3 * i + 2],
            ]
        } else {
            glam::Vec3::from_array(position)
                .normalize_or(glam::Vec3::Y)
                .to_array()
        };
        let uv = if mesh.texcoords.len() >= 2 * (i + 1) {
            [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
        } else {
            [0.0, 0.0]
        };
        vertices.push(MeshVertex {
            position,
            normal,
            uv,
        });
    }

    Ok((vertices, mesh.indices.clone()))
}
