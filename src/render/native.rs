use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::{bytes_of, Pod, Zeroable};
use glam::{Mat3, Mat4};
use log::{error, info, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use super::program::WgslProgram;
use super::shaders::{LAMP_SHADER, SCENE_SHADER, SCREEN_SHADER};
use crate::app::{FrameDriver, FrameUniforms, DEFAULT_EXPOSURE};
use crate::error::{GpuError, GpuResult};
use crate::gpu::{BufferId, BufferUsage, GraphicsDevice, ShaderProgram};
use crate::light_buffer::{LIGHT_BLOCK_BINDING, LIGHT_BLOCK_SIZE};
use crate::mesh::{MeshData, Vertex};
use crate::scene::{MeshSource, SceneDescription, SceneObject};

/// Named uniforms of the lit scene program.
const SCENE_UNIFORMS: &[&str] = &["view", "projection", "camera_position"];
const LAMP_UNIFORMS: &[&str] = &["view", "projection"];
const SCREEN_UNIFORMS: &[&str] = &["exposure"];

/// [`GraphicsDevice`] over a wgpu device and queue.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffers: Vec<(wgpu::Buffer, u64)>,
    bindings: BTreeMap<u32, BufferId>,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: Vec::new(),
            bindings: BTreeMap::new(),
        }
    }

    pub fn buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        self.buffers.get(id.index()).map(|(buffer, _)| buffer)
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_buffer(&mut self, label: &str, size: u64, usage: BufferUsage) -> BufferId {
        let usage = match usage {
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        });
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push((buffer, size));
        id
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> GpuResult<()> {
        let (buffer, size) = self
            .buffers
            .get(id.index())
            .ok_or(GpuError::UnknownBuffer(id))?;
        let len = data.len();
        if offset.checked_add(len as u64).map_or(true, |end| end > *size) {
            return Err(GpuError::WriteOutOfBounds {
                offset,
                len,
                size: *size,
            });
        }
        self.queue.write_buffer(buffer, offset, data);
        Ok(())
    }

    fn bind_buffer_base(&mut self, binding: u32, id: BufferId) -> GpuResult<()> {
        if id.index() >= self.buffers.len() {
            return Err(GpuError::UnknownBuffer(id));
        }
        self.bindings.insert(binding, id);
        Ok(())
    }

    fn bound_buffer(&self, binding: u32) -> Option<BufferId> {
        self.bindings.get(&binding).copied()
    }
}

/// GPU renderer that draws the scene lit by the `Lights` block plus a small
/// emissive cube at every punctual light.
///
/// Each frame runs two passes. The scene pass renders linear HDR color and
/// depth into an off-screen target; the screen pass draws one full-screen
/// triangle that samples that target and applies exposure tone mapping.
pub struct Renderer {
    // The surface must be dropped before the window it was created from.
    surface: wgpu::Surface,
    gpu: WgpuDevice,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    hdr: HdrTarget,
    hdr_layout: wgpu::BindGroupLayout,
    hdr_sampler: wgpu::Sampler,
    scene_program: WgslProgram,
    lamp_program: WgslProgram,
    screen_program: WgslProgram,
    scene_pipeline: wgpu::RenderPipeline,
    lamp_pipeline: wgpu::RenderPipeline,
    screen_pipeline: wgpu::RenderPipeline,
    lights_layout: wgpu::BindGroupLayout,
    lights_bind_group: Option<wgpu::BindGroup>,
    scene_camera: UniformSlot,
    lamp_camera: UniformSlot,
    screen_uniform: UniformSlot,
    objects: Vec<DrawObject>,
    lamp_mesh: MeshBuffers,
    window: Arc<Window>,
}

impl Renderer {
    /// Initializes the GPU renderer and uploads the scene's meshes.
    pub async fn new(window: Arc<Window>, scene: &SceneDescription) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        // SAFETY: the renderer owns the window and drops the surface first.
        let surface = unsafe { instance.create_surface(window.as_ref()) }?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;
        info!("using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("lantern-device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|mode| matches!(mode, wgpu::PresentMode::Mailbox))
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);
        let hdr_layout = HdrTarget::layout(&device);
        let hdr_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("hdr-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let hdr = HdrTarget::create(&device, &hdr_layout, &hdr_sampler, config.width, config.height);

        let lights_layout = uniform_layout(&device, "lights-bind-layout", LIGHT_BLOCK_SIZE);
        let camera_layout =
            uniform_layout(&device, "camera-bind-layout", std::mem::size_of::<CameraUniform>() as u64);
        let object_layout =
            uniform_layout(&device, "object-bind-layout", std::mem::size_of::<ObjectConstants>() as u64);
        let screen_layout =
            uniform_layout(&device, "screen-bind-layout", std::mem::size_of::<ScreenUniform>() as u64);

        let scene_program = WgslProgram::new("scene", SCENE_SHADER, SCENE_UNIFORMS);
        let lamp_program = WgslProgram::new("lamp", LAMP_SHADER, LAMP_UNIFORMS);
        let screen_program = WgslProgram::new("screen", SCREEN_SHADER, SCREEN_UNIFORMS);

        let scene_pipeline = create_pipeline(
            &device,
            &scene_program,
            &[&lights_layout, &camera_layout, &object_layout],
            &[vertex_layout(&VERTEX_ATTRIBUTES)],
            HdrTarget::FORMAT,
            true,
        );
        let lamp_pipeline = create_pipeline(
            &device,
            &lamp_program,
            &[&lights_layout, &camera_layout],
            &[vertex_layout(&VERTEX_ATTRIBUTES[..1])],
            HdrTarget::FORMAT,
            true,
        );
        let screen_pipeline = create_pipeline(
            &device,
            &screen_program,
            &[&hdr_layout, &screen_layout],
            &[],
            surface_format,
            false,
        );

        let scene_camera = UniformSlot::new::<CameraUniform>(&device, &camera_layout, "scene-camera");
        let lamp_camera = UniformSlot::new::<CameraUniform>(&device, &camera_layout, "lamp-camera");
        let screen_uniform = UniformSlot::new::<ScreenUniform>(&device, &screen_layout, "screen");

        let mut gpu = WgpuDevice::new(device, queue);
        let objects = scene
            .objects
            .iter()
            .map(|object| DrawObject::new(&mut gpu, &object_layout, object))
            .collect::<GpuResult<Vec<_>>>()
            .context("failed to upload scene meshes")?;
        let lamp_mesh = MeshBuffers::upload(&mut gpu, &MeshData::cube(), "lamp-cube")
            .context("failed to upload lamp mesh")?;

        Ok(Self {
            surface,
            gpu,
            config,
            size,
            depth,
            hdr,
            hdr_layout,
            hdr_sampler,
            scene_program,
            lamp_program,
            screen_program,
            scene_pipeline,
            lamp_pipeline,
            screen_pipeline,
            lights_layout,
            lights_bind_group: None,
            scene_camera,
            lamp_camera,
            screen_uniform,
            objects,
            lamp_mesh,
            window,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device_mut(&mut self) -> &mut WgpuDevice {
        &mut self.gpu
    }

    /// Binds the driver's light block to both programs and builds the bind
    /// group from whatever buffer now occupies the light binding point.
    pub fn attach_lights(&mut self, driver: &FrameDriver) -> GpuResult<()> {
        driver.bind_program(&mut self.gpu, &mut self.scene_program)?;
        driver.bind_program(&mut self.gpu, &mut self.lamp_program)?;

        let id = self
            .gpu
            .bound_buffer(LIGHT_BLOCK_BINDING)
            .ok_or(GpuError::UnknownBuffer(driver.packer().buffer()))?;
        let buffer = self.gpu.buffer(id).ok_or(GpuError::UnknownBuffer(id))?;
        self.lights_bind_group = Some(self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lights-bind-group"),
            layout: &self.lights_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        }));
        Ok(())
    }

    /// Resizes the swap chain and both off-screen attachments.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.gpu.device, &self.config);
        self.depth = DepthBuffer::create(&self.gpu.device, new_size.width, new_size.height);
        self.hdr = HdrTarget::create(
            &self.gpu.device,
            &self.hdr_layout,
            &self.hdr_sampler,
            new_size.width,
            new_size.height,
        );
    }

    /// Draws one frame with the uniforms produced by [`FrameDriver::update`].
    pub fn render(
        &mut self,
        uniforms: &FrameUniforms,
        punctual_count: usize,
    ) -> Result<(), wgpu::SurfaceError> {
        uniforms.apply_to(&mut self.scene_program);
        uniforms.apply_to(&mut self.lamp_program);
        uniforms.apply_to(&mut self.screen_program);
        self.scene_camera
            .upload(&self.gpu.queue, &CameraUniform::from_program(&self.scene_program));
        self.lamp_camera
            .upload(&self.gpu.queue, &CameraUniform::from_program(&self.lamp_program));
        self.screen_uniform
            .upload(&self.gpu.queue, &ScreenUniform::from_program(&self.screen_program));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.hdr.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.01,
                            g: 0.01,
                            b: 0.015,
                            a: 1.0,
                        }),
                        store: true,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: true,
                    }),
                    stencil_ops: None,
                }),
            });

            match self.lights_bind_group.as_ref() {
                Some(lights) => {
                    pass.set_pipeline(&self.scene_pipeline);
                    pass.set_bind_group(0, lights, &[]);
                    pass.set_bind_group(1, &self.scene_camera.bind_group, &[]);
                    for object in &self.objects {
                        pass.set_bind_group(2, &object.bind_group, &[]);
                        object.mesh.draw(&self.gpu, &mut pass, 1);
                    }

                    if punctual_count > 0 {
                        pass.set_pipeline(&self.lamp_pipeline);
                        pass.set_bind_group(0, lights, &[]);
                        pass.set_bind_group(1, &self.lamp_camera.bind_group, &[]);
                        self.lamp_mesh.draw(&self.gpu, &mut pass, punctual_count as u32);
                    }
                }
                None => warn!("light block not attached; skipping scene draw"),
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("screen-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            pass.set_pipeline(&self.screen_pipeline);
            pass.set_bind_group(0, &self.hdr.bind_group, &[]);
            pass.set_bind_group(1, &self.screen_uniform.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3
];

fn uniform_layout(device: &wgpu::Device, label: &str, size: u64) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(size),
            },
            count: None,
        }],
    })
}

fn vertex_layout(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'_> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    program: &WgslProgram,
    layouts: &[&wgpu::BindGroupLayout],
    vertex_buffers: &[wgpu::VertexBufferLayout<'_>],
    format: wgpu::TextureFormat,
    depth_tested: bool,
) -> wgpu::RenderPipeline {
    let label = program.label();
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(program.source().into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: vertex_buffers,
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: depth_tested.then(|| wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
    })
}

fn object_model_matrix(object: &SceneObject) -> Mat4 {
    Mat4::from_translation(object.position) * Mat4::from_scale(object.scale)
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

fn load_mesh(object: &SceneObject) -> MeshData {
    match &object.mesh {
        MeshSource::Cube => MeshData::cube(),
        MeshSource::Plane => MeshData::plane(),
        MeshSource::Obj(path) => match MeshData::load_obj(path) {
            Ok(mesh) if !mesh.indices.is_empty() => mesh,
            Ok(_) => {
                warn!("mesh for {} has no faces; drawing a cube instead", object.name);
                MeshData::cube()
            }
            Err(err) => {
                error!("failed to load mesh for {}: {err:?}", object.name);
                MeshData::cube()
            }
        },
    }
}

struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformSlot {
    fn new<T: Pod>(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<T>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    fn upload<T: Pod>(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytes_of(value));
    }
}

struct DrawObject {
    mesh: MeshBuffers,
    bind_group: wgpu::BindGroup,
}

impl DrawObject {
    fn new(
        gpu: &mut WgpuDevice,
        layout: &wgpu::BindGroupLayout,
        object: &SceneObject,
    ) -> GpuResult<Self> {
        let model = object_model_matrix(object);
        let normal = Mat3::from_mat4(model).inverse().transpose();
        let constants = ObjectConstants {
            model: model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
            color_shininess: object.color.extend(object.shininess).into(),
        };
        let buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(object.name.as_str()),
            contents: bytes_of(&constants),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(object.name.as_str()),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Ok(Self {
            mesh: MeshBuffers::upload(gpu, &load_mesh(object), &object.name)?,
            bind_group,
        })
    }
}

/// Vertex and index buffers of one mesh, owned by a [`GraphicsDevice`].
#[derive(Debug, Clone, Copy)]
struct MeshBuffers {
    vertex: BufferId,
    index: BufferId,
    index_count: u32,
}

impl MeshBuffers {
    fn upload<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        mesh: &MeshData,
        label: &str,
    ) -> GpuResult<Self> {
        let vertices: &[u8] = bytemuck::cast_slice(&mesh.vertices);
        let indices: &[u8] = bytemuck::cast_slice(&mesh.indices);
        let vertex = device.create_buffer(
            &format!("{label}-vertices"),
            vertices.len() as u64,
            BufferUsage::Vertex,
        );
        device.write_buffer(vertex, 0, vertices)?;
        let index = device.create_buffer(
            &format!("{label}-indices"),
            indices.len() as u64,
            BufferUsage::Index,
        );
        device.write_buffer(index, 0, indices)?;
        Ok(Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        })
    }

    fn draw<'a>(&self, gpu: &'a WgpuDevice, pass: &mut wgpu::RenderPass<'a>, instances: u32) {
        let (Some(vertex), Some(index)) = (gpu.buffer(self.vertex), gpu.buffer(self.index)) else {
            warn!("mesh buffers {:?}/{:?} are gone; skipping draw", self.vertex, self.index);
            return;
        };
        pass.set_vertex_buffer(0, vertex.slice(..));
        pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..instances);
    }
}

/// Off-screen HDR color target sampled by the screen pass.
struct HdrTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

impl HdrTarget {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    fn layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("hdr-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn create(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("hdr-color"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("hdr-bind-group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        Self {
            _texture: texture,
            view,
            bind_group,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct CameraUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    position: [f32; 4],
}

impl CameraUniform {
    fn from_program(program: &WgslProgram) -> Self {
        Self {
            view: program.mat4_or_identity("view").to_cols_array_2d(),
            projection: program.mat4_or_identity("projection").to_cols_array_2d(),
            position: program.vec3_or_zero("camera_position").extend(1.0).into(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct ScreenUniform {
    exposure: [f32; 4],
}

impl ScreenUniform {
    fn from_program(program: &WgslProgram) -> Self {
        Self {
            exposure: [program.float_or("exposure", DEFAULT_EXPOSURE), 0.0, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ObjectConstants {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    color_shininess: [f32; 4],
}
