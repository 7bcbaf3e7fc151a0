//! Renderer: wgpu init + depth + one OBJ mesh with a flat placeholder material.
//! wgpu = 23.x, winit = 0.30.x
//!
//! Anything drawn on top of the scene (text) goes through [`OverlayPass`].

use std::num::NonZeroU64;
use std::sync::Arc;

use asset::MeshData;
use bytemuck::{Pod, Zeroable};
use corelib::FrameParams;
use glam::Vec3;
use thiserror::Error;
use wgpu::{
    BindGroup, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState, Buffer,
    BufferBindingType, BufferUsages, ColorTargetState, ColorWrites, CommandBuffer, CommandEncoder,
    CommandEncoderDescriptor,
    DepthBiasState, DepthStencilState, Device, DeviceDescriptor, Extent3d, Features,
    FragmentState, Instance, InstanceDescriptor, Limits, LoadOp, Operations,
    PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, ShaderModuleDescriptor,
    ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration, SurfaceError,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor, VertexBufferLayout, VertexState, VertexStepMode, util::DeviceExt,
};
use winit::window::Window;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// Extra drawing recorded onto a frame after the scene pass.
pub trait OverlayPass {
    /// Record into `target.encoder`. Returned buffers are submitted ahead of it.
    fn record(&mut self, target: OverlayTarget<'_>) -> Vec<CommandBuffer>;
}

pub struct OverlayTarget<'a> {
    pub device: &'a Device,
    pub queue: &'a Queue,
    pub encoder: &'a mut CommandEncoder,
    pub view: &'a TextureView,
    /// Surface size in physical pixels.
    pub size: (u32, u32),
}

/// Vertex: position + normal.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
}
impl Vertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
    };
}

/// Scene UBO (16-byte aligned, mirrors `Scene` in mesh.wgsl).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SceneUniform {
    mvp: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    base_color: [f32; 4],
    ambient: [f32; 4],
    lights: [[f32; 4]; 2],
}

/// Directional light: direction towards the light plus intensity.
#[derive(Clone, Copy, Debug)]
pub struct DirectionalLight {
    pub towards: Vec3,
    pub intensity: f32,
}

/// Ambient light plus two directional lights, white.
#[derive(Clone, Copy, Debug)]
pub struct Lighting {
    pub ambient: f32,
    pub key: DirectionalLight,
    pub fill: DirectionalLight,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: 0.6,
            key: DirectionalLight {
                towards: Vec3::new(1.0, 1.0, 1.0),
                intensity: 0.8,
            },
            fill: DirectionalLight {
                towards: Vec3::new(-1.0, 0.5, -1.0),
                intensity: 0.4,
            },
        }
    }
}

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
/// #f5f5f5 in linear space.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.913,
    g: 0.913,
    b: 0.913,
    a: 1.0,
};
/// #888888 in linear space.
const BASE_COLOR: [f32; 4] = [0.246, 0.246, 0.246, 1.0];

struct GpuMesh {
    vertex_buf: Buffer,
    vertex_count: u32,
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline & geometry
    pipeline: RenderPipeline,
    mesh: Option<GpuMesh>,

    // Scene uniforms
    scene_bg: BindGroup,
    scene_buf: Buffer,
    lighting: Lighting,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>, sized `width` x `height`.
    pub async fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        width: u32,
        height: u32,
    ) -> Result<Self, RendererError> {
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RendererError::NoAdapter)?;
        log::debug!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Meshview Device"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RendererError::NoSurfaceFormat)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        // Configure surface
        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Shaders ====
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Mesh WGSL"),
            source: ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        // ==== Scene BGL/BG ====
        let scene_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Scene BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<SceneUniform>() as u64),
                },
                count: None,
            }],
        });

        let lighting = Lighting::default();
        let scene_init = scene_uniform(&FrameParams::identity(), &lighting);
        let scene_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene UBO"),
            contents: bytemuck::bytes_of(&scene_init),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let scene_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene BG"),
            layout: &scene_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buf.as_entire_binding(),
            }],
        });

        // ==== Pipeline ====
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Mesh PipelineLayout"),
            bind_group_layouts: &[&scene_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // OBJ winding is not reliable; draw both sides.
            primitive: wgpu::PrimitiveState {
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::info!(
            "GPU ready: {}x{}, surface format {:?}",
            width,
            height,
            surface_format
        );

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline,
            mesh: None,
            scene_bg,
            scene_buf,
            lighting,
            depth_view,
            width,
            height,
        })
    }

    /// Upload a mesh, replacing any previous one. Empty meshes draw nothing.
    pub fn set_mesh(&mut self, mesh: &MeshData) {
        self.mesh = None;
        if mesh.is_empty() {
            return;
        }
        let Some(vertex_count) = draw_count(mesh.vertex_count()) else {
            return;
        };
        let vertices: Vec<Vertex> = mesh
            .vertices()
            .map(|v| Vertex {
                pos: v.position,
                normal: v.normal,
            })
            .collect();
        let vertex_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh VB"),
                contents: bytemuck::cast_slice(&vertices),
                usage: BufferUsages::VERTEX,
            });
        self.mesh = Some(GpuMesh {
            vertex_buf,
            vertex_count,
        });
    }

    pub fn clear_mesh(&mut self) {
        self.mesh = None;
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn surface_format(&self) -> TextureFormat {
        self.surface_config.format
    }

    /// Render one frame. `None` (or `draw_mesh == false`) clears to the
    /// background only; `overlay` then draws on top.
    pub fn render(
        &mut self,
        frame_params: Option<&FrameParams>,
        overlay: Option<&mut dyn OverlayPass>,
    ) -> Result<(), SurfaceError> {
        let draw = frame_params.filter(|f| f.draw_mesh);
        if let Some(params) = draw {
            let scene = scene_uniform(params, &self.lighting);
            self.queue
                .write_buffer(&self.scene_buf, 0, bytemuck::bytes_of(&scene));
        }

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let (Some(_), Some(mesh)) = (draw, self.mesh.as_ref()) {
                rpass.set_pipeline(&self.pipeline);
                rpass.set_bind_group(0, &self.scene_bg, &[]);
                rpass.set_vertex_buffer(0, mesh.vertex_buf.slice(..));
                rpass.draw(0..mesh.vertex_count, 0..1);
            }
        }

        let mut buffers = match overlay {
            Some(overlay) => overlay.record(OverlayTarget {
                device: &self.device,
                queue: &self.queue,
                encoder: &mut encoder,
                view: &view,
                size: (self.width, self.height),
            }),
            None => Vec::new(),
        };
        buffers.push(encoder.finish());
        self.queue.submit(buffers);
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

/// Vertex count for one draw call, `None` (logged) when it does not fit in u32.
fn draw_count(vertices: usize) -> Option<u32> {
    match u32::try_from(vertices) {
        Ok(count) => Some(count),
        Err(_) => {
            log::error!("Mesh has {vertices} vertices, too many for one draw call; skipped");
            None
        }
    }
}

fn scene_uniform(params: &FrameParams, lighting: &Lighting) -> SceneUniform {
    let light = |l: &DirectionalLight| {
        let d = l.towards.normalize_or_zero();
        [d.x, d.y, d.z, l.intensity]
    };
    SceneUniform {
        mvp: (params.view_proj * params.model).to_cols_array_2d(),
        model: params.model.to_cols_array_2d(),
        base_color: BASE_COLOR,
        ambient: [lighting.ambient, lighting.ambient, lighting.ambient, 0.0],
        lights: [light(&lighting.key), light(&lighting.fill)],
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[test]
    fn scene_uniform_matches_wgsl_layout() {
        // mat4 + mat4 + vec4 + vec4 + array<vec4, 2>
        assert_eq!(std::mem::size_of::<SceneUniform>(), 64 + 64 + 16 + 16 + 32);
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
    }

    #[test]
    fn draw_count_rejects_oversized_meshes() {
        assert_eq!(draw_count(36), Some(36));
        assert_eq!(draw_count(u32::MAX as usize), Some(u32::MAX));
        if let Some(too_many) = (u32::MAX as usize).checked_add(1) {
            assert_eq!(draw_count(too_many), None);
        }
    }

    #[test]
    fn vertex_stride_is_six_floats() {
        assert_eq!(Vertex::LAYOUT.array_stride, 24);
    }

    #[test]
    fn scene_uniform_combines_matrices_and_normalizes_lights() {
        let params = FrameParams {
            model: Mat4::from_scale(Vec3::splat(2.0)),
            view_proj: Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)),
            draw_mesh: true,
        };
        let u = scene_uniform(&params, &Lighting::default());
        assert_eq!(u.mvp, (params.view_proj * params.model).to_cols_array_2d());
        let [x, y, z, w] = u.lights[0];
        assert!((Vec3::new(x, y, z).length() - 1.0).abs() < 1e-6);
        assert_eq!(w, 0.8);
        assert_eq!(u.ambient[0], 0.6);
    }
}
