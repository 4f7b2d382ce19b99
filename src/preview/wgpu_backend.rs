// SPDX-License-Identifier: GPL-3.0-only

//! wgpu render backend
//!
//! Owns the GPU resources of one context:
//! - the compositor program (shader, layouts, pipeline, uniforms, sampler)
//! - the static quad vertex buffer
//! - the source texture, reallocated only when the frame size changes
//! - the offscreen target and its readback buffer
//! - the visible surface, a headless texture sized to the last repaint
//!
//! Every resource is an owned wgpu handle, released when dropped.

use super::RenderBackend;
use crate::errors::GpuError;
use crate::gpu::{GpuDeviceInfo, create_render_device, wgpu};
use crate::media::{Frame, PixelFormat, Size};
use crate::shaders::{
    CachedDimensions, CompositePass, CompositeUniforms, FILTER_COMPOSITE_SHADER, QUAD_VERTICES,
    Vertex, padded_bytes_per_row, read_buffer_async, strip_row_padding,
};
use std::sync::Arc;
use tracing::{debug, info};
use wgpu::util::DeviceExt;

/// Format of the source texture and of both render targets
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct Program {
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
}

struct SourceTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    dims: CachedDimensions,
}

struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    readback: wgpu::Buffer,
    padded_bytes_per_row: u32,
    size: Size,
}

/// Texture the visible pass draws into
struct VisibleSurface {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: Size,
}

/// GPU implementation of [`RenderBackend`]
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    info: GpuDeviceInfo,
    program: Option<Program>,
    quad: Option<wgpu::Buffer>,
    source: Option<SourceTexture>,
    offscreen: Option<OffscreenTarget>,
    surface: Option<VisibleSurface>,
}

impl WgpuBackend {
    /// Create a backend on a new device
    pub fn new() -> Result<Self, GpuError> {
        let (device, queue, info) = pollster::block_on(create_render_device("vcam-filter compositor"))?;
        Ok(Self::from_device(device, queue, info))
    }

    /// Create a backend on an existing device (e.g. the host window's)
    pub fn from_device(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        info: GpuDeviceInfo,
    ) -> Self {
        Self {
            device,
            queue,
            info,
            program: None,
            quad: None,
            source: None,
            offscreen: None,
            surface: None,
        }
    }

    pub fn device_info(&self) -> &GpuDeviceInfo {
        &self.info
    }

    /// Run `f` inside validation and out-of-memory error scopes
    fn scoped<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        (value, validation.or(oom))
    }

    fn create_pipeline(
        device: &wgpu::Device,
        shader: &wgpu::ShaderModule,
        layout: &wgpu::PipelineLayout,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("filter composite pipeline"),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
                }],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TEXTURE_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        })
    }

    /// Encode one compositor pass into `view`
    ///
    /// Clears to opaque black; draws the quad only when a texture exists.
    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        pass: &CompositePass,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("filter composite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let (Some(program), Some(quad), Some(source)) =
            (self.program.as_ref(), self.quad.as_ref(), self.source.as_ref())
        else {
            return;
        };
        let uniforms: CompositeUniforms = pass.uniforms();
        self.queue
            .write_buffer(&program.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        render_pass.set_pipeline(&program.pipeline);
        render_pass.set_bind_group(0, &source.bind_group, &[]);
        render_pass.set_vertex_buffer(0, quad.slice(..));
        render_pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }

    fn create_visible_surface(device: &wgpu::Device, size: Size) -> VisibleSurface {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("headless preview surface"),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        VisibleSurface {
            _texture: texture,
            view,
            size,
        }
    }
}

fn extent(size: Size) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}

impl RenderBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn ensure_program(&mut self) -> Result<(), GpuError> {
        if self.program.is_some() {
            return Ok(());
        }

        let (program, error) = self.scoped(|device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("filter composite shader"),
                source: wgpu::ShaderSource::Wgsl(FILTER_COMPOSITE_SHADER.into()),
            });

            let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("filter composite bind group layout"),
                entries: &[
                    // Uniforms
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Source texture
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    // Sampler
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("filter composite pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("filter composite uniforms"),
                size: std::mem::size_of::<CompositeUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("filter composite sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            });

            let pipeline = Self::create_pipeline(device, &shader, &pipeline_layout);

            Program {
                bind_group_layout,
                pipeline,
                uniform_buffer,
                sampler,
            }
        });

        if let Some(e) = error {
            return Err(GpuError::ShaderCompilation(e.to_string()));
        }
        self.program = Some(program);

        info!(
            adapter = %self.info.adapter_name,
            backend = ?self.info.backend,
            "Compositor program ready"
        );
        Ok(())
    }

    fn ensure_geometry(&mut self) -> Result<(), GpuError> {
        if self.quad.is_some() {
            return Ok(());
        }
        let quad = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("filter composite quad"),
                contents: bytemuck::cast_slice(&QUAD_VERTICES),
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.quad = Some(quad);
        Ok(())
    }

    fn upload(&mut self, rgba_flipped: &Frame) -> Result<(), GpuError> {
        if rgba_flipped.format != PixelFormat::Rgba {
            return Err(GpuError::ResourceAllocation(format!(
                "texture upload expects RGBA, got {:?}",
                rgba_flipped.format
            )));
        }
        let Some(program) = self.program.as_ref() else {
            return Err(GpuError::ShaderCompilation("program not built".into()));
        };
        let size = rgba_flipped.size();

        let needs_alloc = self
            .source
            .as_ref()
            .is_none_or(|source| source.dims.needs_update(size.width, size.height));
        if needs_alloc {
            self.source = None;
            let (source, error) = self.scoped(|device| {
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("filter source texture"),
                    size: extent(size),
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: TEXTURE_FORMAT,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                });
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("filter composite bind group"),
                    layout: &program.bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: program.uniform_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&program.sampler),
                        },
                    ],
                });
                SourceTexture {
                    texture,
                    bind_group,
                    dims: CachedDimensions::new(size.width, size.height),
                }
            });
            if let Some(e) = error {
                return Err(GpuError::ResourceAllocation(e.to_string()));
            }
            debug!(
                width = size.width,
                height = size.height,
                "Allocated source texture"
            );
            self.source = Some(source);
        }

        let Some(source) = self.source.as_ref() else {
            return Err(GpuError::ResourceAllocation("source texture missing".into()));
        };
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &source.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba_flipped.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * 4),
                rows_per_image: Some(size.height),
            },
            extent(size),
        );
        Ok(())
    }

    fn ensure_offscreen_target(&mut self, size: Size) -> Result<(), GpuError> {
        if size.is_empty() {
            self.offscreen = None;
            return Ok(());
        }
        if self.offscreen.as_ref().is_some_and(|t| t.size == size) {
            return Ok(());
        }
        self.offscreen = None;

        let padded = padded_bytes_per_row(size.width, 4);
        let (target, error) = self.scoped(|device| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("filter offscreen target"),
                size: extent(size),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TEXTURE_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let readback = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("filter offscreen readback"),
                size: padded as u64 * size.height as u64,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            OffscreenTarget {
                texture,
                view,
                readback,
                padded_bytes_per_row: padded,
                size,
            }
        });
        if let Some(e) = error {
            return Err(GpuError::ResourceAllocation(e.to_string()));
        }

        debug!(
            width = size.width,
            height = size.height,
            "Allocated offscreen target"
        );
        self.offscreen = Some(target);
        Ok(())
    }

    fn has_offscreen_target(&self) -> bool {
        self.offscreen.is_some()
    }

    fn render_visible(&mut self, pass: &CompositePass, size: Size) -> Result<(), GpuError> {
        if self.surface.as_ref().is_none_or(|surface| surface.size != size) {
            self.surface = None;
            let (surface, error) = self.scoped(|device| Self::create_visible_surface(device, size));
            if let Some(e) = error {
                return Err(GpuError::ResourceAllocation(e.to_string()));
            }
            debug!(
                width = size.width,
                height = size.height,
                "Allocated visible surface"
            );
            self.surface = Some(surface);
        }
        let Some(surface) = self.surface.as_ref() else {
            return Ok(());
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("filter visible encoder"),
            });
        self.encode_pass(&mut encoder, &surface.view, pass);
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn render_offscreen(&mut self, pass: &CompositePass) -> Result<Vec<u8>, GpuError> {
        let target = self
            .offscreen
            .as_ref()
            .ok_or_else(|| GpuError::ResourceAllocation("no offscreen target".into()))?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("filter offscreen encoder"),
            });
        self.encode_pass(&mut encoder, &target.view, pass);
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &target.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(target.padded_bytes_per_row),
                    rows_per_image: Some(target.size.height),
                },
            },
            extent(target.size),
        );
        self.queue.submit(Some(encoder.finish()));

        let padded = pollster::block_on(read_buffer_async(&self.device, &target.readback))?;
        Ok(strip_row_padding(
            &padded,
            target.size.width as usize * 4,
            target.padded_bytes_per_row as usize,
            target.size.height as usize,
        ))
    }

    fn release(&mut self) {
        self.offscreen = None;
        self.source = None;
        self.quad = None;
        self.program = None;
        self.surface = None;
        debug!("Released compositor resources");
    }
}
