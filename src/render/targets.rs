//! Render targets: the fixed-size shadow map, the viewport-sized frame target
//! set replaced atomically on resize, and the seeded SSAO sampling kernel.

use rand::Rng;

/// Shadow map resolution. Created once at startup, never resized.
pub const SHADOW_MAP_SIZE: u32 = 1024;

/// Number of hemisphere samples in the occlusion kernel.
pub const SSAO_KERNEL_SIZE: usize = 64;

/// Side length of the tangent-rotation noise tile.
pub const SSAO_NOISE_SIZE: u32 = 4;

fn create_depth_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
    label: &str,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Depth32Float,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn create_color_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    label: &str,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

/// Depth-only target rendered from the light's viewpoint.
pub struct ShadowMap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl ShadowMap {
    pub fn new(device: &wgpu::Device) -> Self {
        let (texture, view) = create_depth_texture(
            device,
            SHADOW_MAP_SIZE,
            SHADOW_MAP_SIZE,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            "Shadow Map",
        );
        Self { texture, view }
    }
}

/// All viewport-sized surfaces. A resize builds a complete replacement set so
/// later passes never see a mix of old and new dimensions.
pub struct FrameTargets {
    pub color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
    /// View-space position, SSAO input.
    pub position: wgpu::Texture,
    pub position_view: wgpu::TextureView,
    /// View-space normal, SSAO input.
    pub normal: wgpu::Texture,
    pub normal_view: wgpu::TextureView,
    pub ssao: wgpu::Texture,
    pub ssao_view: wgpu::TextureView,
    pub ssao_blur: wgpu::Texture,
    pub ssao_blur_view: wgpu::TextureView,
    pub size: (u32, u32),
}

impl FrameTargets {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        let (color, color_view) =
            create_color_texture(device, width, height, color_format, "Scene Color");
        let (depth, depth_view) = create_depth_texture(
            device,
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
            "Scene Depth",
        );
        let (position, position_view) = create_color_texture(
            device,
            width,
            height,
            wgpu::TextureFormat::Rgba16Float,
            "View Position",
        );
        let (normal, normal_view) = create_color_texture(
            device,
            width,
            height,
            wgpu::TextureFormat::Rgba16Float,
            "View Normal",
        );
        let (ssao, ssao_view) =
            create_color_texture(device, width, height, wgpu::TextureFormat::R8Unorm, "SSAO");
        let (ssao_blur, ssao_blur_view) = create_color_texture(
            device,
            width,
            height,
            wgpu::TextureFormat::R8Unorm,
            "SSAO Blur",
        );

        Self {
            color,
            color_view,
            depth,
            depth_view,
            position,
            position_view,
            normal,
            normal_view,
            ssao,
            ssao_view,
            ssao_blur,
            ssao_blur_view,
            size: (width, height),
        }
    }
}

/// Hemisphere sampling kernel for the occlusion pass, generated from an
/// injected seeded generator so runs are reproducible.
pub fn generate_ssao_kernel(rng: &mut impl Rng) -> [[f32; 4]; SSAO_KERNEL_SIZE] {
    let mut kernel = [[0.0; 4]; SSAO_KERNEL_SIZE];
    for (i, sample) in kernel.iter_mut().enumerate() {
        // Uniformly randomized point in the +Z unit hemisphere.
        let v = glam::Vec3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(0.0..=1.0),
        )
        .normalize_or(glam::Vec3::Z)
            * rng.random_range(0.0..=1.0_f32);

        // Bias samples toward the center as the kernel fills up.
        let t = i as f32 / SSAO_KERNEL_SIZE as f32;
        let t2 = t * t;
        let scale = (1.0 - t2) * 0.1 + t2;

        let v = v * scale;
        *sample = [v.x, v.y, v.z, 0.0];
    }
    kernel
}

/// 4x4 tile of random tangent rotations, encoded as signed bytes for an
/// `Rgba8Snorm` texture.
pub fn generate_ssao_noise(rng: &mut impl Rng) -> Vec<i8> {
    let count = (SSAO_NOISE_SIZE * SSAO_NOISE_SIZE) as usize;
    let mut data = Vec::with_capacity(count * 4);
    for _ in 0..count {
        let x: f32 = rng.random_range(-1.0..=1.0);
        let y: f32 = rng.random_range(-1.0..=1.0);
        data.push((x * 127.0) as i8);
        data.push((y * 127.0) as i8);
        data.push(0);
        data.push(0);
    }
    data
}

/// Upload the noise tile as a repeating `Rgba8Snorm` texture.
pub fn create_ssao_noise_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    noise: &[i8],
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("SSAO Noise"),
        size: wgpu::Extent3d {
            width: SSAO_NOISE_SIZE,
            height: SSAO_NOISE_SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Snorm,
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
        bytemuck::cast_slice(noise),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * SSAO_NOISE_SIZE),
            rows_per_image: Some(SSAO_NOISE_SIZE),
        },
        wgpu::Extent3d {
            width: SSAO_NOISE_SIZE,
            height: SSAO_NOISE_SIZE,
            depth_or_array_layers: 1,
        },
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn kernel_generation_is_reproducible() {
        let a = generate_ssao_kernel(&mut ChaCha8Rng::seed_from_u64(7));
        let b = generate_ssao_kernel(&mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);

        let c = generate_ssao_kernel(&mut ChaCha8Rng::seed_from_u64(8));
        assert_ne!(a, c);
    }

    #[test]
    fn kernel_samples_lie_in_hemisphere() {
        let kernel = generate_ssao_kernel(&mut ChaCha8Rng::seed_from_u64(42));
        for sample in kernel {
            let v = glam::Vec3::new(sample[0], sample[1], sample[2]);
            assert!(v.z >= 0.0, "sample below hemisphere: {:?}", v);
            assert!(v.length() <= 1.0 + 1e-5, "sample outside unit ball: {:?}", v);
        }
    }

    #[test]
    fn kernel_scale_ramp_biases_later_samples_outward() {
        // The scale factor applied at index i is (1 - t^2)*0.1 + t^2, which is
        // strictly increasing; later samples may reach the full radius.
        let t = |i: usize| {
            let t = i as f32 / SSAO_KERNEL_SIZE as f32;
            (1.0 - t * t) * 0.1 + t * t
        };
        for i in 1..SSAO_KERNEL_SIZE {
            assert!(t(i) > t(i - 1));
        }
    }

    #[test]
    fn noise_tile_has_expected_shape() {
        let noise = generate_ssao_noise(&mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(noise.len(), (SSAO_NOISE_SIZE * SSAO_NOISE_SIZE * 4) as usize);
        // z and w channels stay zero: rotations live in the tangent plane.
        for px in noise.chunks_exact(4) {
            assert_eq!(px[2], 0);
            assert_eq!(px[3], 0);
        }
    }
}
