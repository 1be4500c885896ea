// Curlflow - GPU Curl-Noise Dye Advection
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use crate::params::Resolution;

/// Texel format shared by the velocity field and both dye fields.
pub const FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Full-surface quad drawn as a triangle strip.
pub const QUAD_VERTICES: u32 = 4;

/// What sits at one binding ordinal of a kernel's group 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Uniform,
    /// Field read with `textureLoad`.
    FieldRead,
    /// Field written as a write-only storage texture.
    FieldWrite,
}

/// How much work one invocation of a kernel covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Dispatch { x: u32, y: u32 },
    Draw { vertices: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    Noise,
    Advection,
    PassThrough,
    Upscale,
}

impl Kernel {
    #[cfg(test)]
    pub const ALL: [Kernel; 4] = [
        Kernel::Noise,
        Kernel::Advection,
        Kernel::PassThrough,
        Kernel::Upscale,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Kernel::Noise => "Curl Noise",
            Kernel::Advection => "Advection",
            Kernel::PassThrough => "Pass Through",
            Kernel::Upscale => "Upscale",
        }
    }

    /// Binding layout of group 0, indexed by binding ordinal. Shader sources
    /// may change freely as long as this stays the same.
    pub fn bindings(self) -> &'static [BindingKind] {
        use BindingKind::*;
        match self {
            Kernel::Noise => &[Uniform, FieldWrite],
            Kernel::Advection | Kernel::PassThrough => {
                &[Uniform, FieldRead, FieldRead, FieldWrite]
            }
            Kernel::Upscale => &[FieldRead, Uniform, Uniform],
        }
    }

    pub fn granularity(self, resolution: Resolution) -> Granularity {
        match self {
            Kernel::Upscale => Granularity::Draw {
                vertices: QUAD_VERTICES,
            },
            _ => Granularity::Dispatch {
                x: resolution.workgroups(),
                y: resolution.workgroups(),
            },
        }
    }

    fn stage(self) -> wgpu::ShaderStages {
        match self {
            Kernel::Upscale => wgpu::ShaderStages::FRAGMENT,
            _ => wgpu::ShaderStages::COMPUTE,
        }
    }

    fn source(self) -> &'static str {
        match self {
            Kernel::Noise => include_str!("../shaders/noise.wgsl"),
            Kernel::Advection => include_str!("../shaders/advection.wgsl"),
            Kernel::PassThrough => include_str!("../shaders/pass_through.wgsl"),
            Kernel::Upscale => include_str!("../shaders/upscale.wgsl"),
        }
    }

    fn layout_entries(self) -> Vec<wgpu::BindGroupLayoutEntry> {
        let visibility = self.stage();
        self.bindings()
            .iter()
            .enumerate()
            .map(|(binding, kind)| wgpu::BindGroupLayoutEntry {
                binding: binding as u32,
                visibility,
                ty: match kind {
                    BindingKind::Uniform => wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    BindingKind::FieldRead => wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    BindingKind::FieldWrite => wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: FIELD_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                },
                count: None,
            })
            .collect()
    }
}

/// Bind group layouts for every kernel. Built before any pipeline so binding
/// sets can be wired without compiling shaders.
pub struct KernelLayouts {
    noise: wgpu::BindGroupLayout,
    advection: wgpu::BindGroupLayout,
    pass_through: wgpu::BindGroupLayout,
    upscale: wgpu::BindGroupLayout,
}

impl KernelLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let make = |kernel: Kernel| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(kernel.label()),
                entries: &kernel.layout_entries(),
            })
        };

        Self {
            noise: make(Kernel::Noise),
            advection: make(Kernel::Advection),
            pass_through: make(Kernel::PassThrough),
            upscale: make(Kernel::Upscale),
        }
    }

    pub fn get(&self, kernel: Kernel) -> &wgpu::BindGroupLayout {
        match kernel {
            Kernel::Noise => &self.noise,
            Kernel::Advection => &self.advection,
            Kernel::PassThrough => &self.pass_through,
            Kernel::Upscale => &self.upscale,
        }
    }
}

/// Compiled pipelines for the three compute kernels and the upscale blit.
pub struct KernelSet {
    pub layouts: KernelLayouts,
    noise_pipeline: wgpu::ComputePipeline,
    advection_pipeline: wgpu::ComputePipeline,
    pass_through_pipeline: wgpu::ComputePipeline,
    upscale_pipeline: wgpu::RenderPipeline,
}

impl KernelSet {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let layouts = KernelLayouts::new(device);

        let compute = |kernel: Kernel| {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(kernel.label()),
                source: wgpu::ShaderSource::Wgsl(kernel.source().into()),
            });
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(kernel.label()),
                bind_group_layouts: &[layouts.get(kernel)],
                push_constant_ranges: &[],
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(kernel.label()),
                layout: Some(&layout),
                module: &module,
                entry_point: "main",
                compilation_options: Default::default(),
                cache: None,
            })
        };

        let noise_pipeline = compute(Kernel::Noise);
        let advection_pipeline = compute(Kernel::Advection);
        let pass_through_pipeline = compute(Kernel::PassThrough);

        let upscale_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(Kernel::Upscale.label()),
            source: wgpu::ShaderSource::Wgsl(Kernel::Upscale.source().into()),
        });
        let upscale_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Upscale Pipeline Layout"),
            bind_group_layouts: &[layouts.get(Kernel::Upscale)],
            push_constant_ranges: &[],
        });
        let upscale_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Upscale Pipeline"),
            layout: Some(&upscale_layout),
            vertex: wgpu::VertexState {
                module: &upscale_shader,
                entry_point: "vs_main",
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &upscale_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        Self {
            layouts,
            noise_pipeline,
            advection_pipeline,
            pass_through_pipeline,
            upscale_pipeline,
        }
    }

    fn compute_pipeline(&self, kernel: Kernel) -> Option<&wgpu::ComputePipeline> {
        match kernel {
            Kernel::Noise => Some(&self.noise_pipeline),
            Kernel::Advection => Some(&self.advection_pipeline),
            Kernel::PassThrough => Some(&self.pass_through_pipeline),
            Kernel::Upscale => None,
        }
    }

    /// Record one compute pass for `kernel` over the whole field.
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        kernel: Kernel,
        bind_group: &wgpu::BindGroup,
        resolution: Resolution,
    ) {
        let (Some(pipeline), Granularity::Dispatch { x, y }) =
            (self.compute_pipeline(kernel), kernel.granularity(resolution))
        else {
            log::error!("{} is not a compute kernel", kernel.label());
            return;
        };

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(kernel.label()),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(x, y, 1);
    }

    /// Record the upscale draw into an already open render pass.
    pub fn draw_upscale(&self, pass: &mut wgpu::RenderPass<'_>, bind_group: &wgpu::BindGroup) {
        pass.set_pipeline(&self.upscale_pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..QUAD_VERTICES, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_kernels_share_one_binding_shape() {
        assert_eq!(
            Kernel::Advection.bindings(),
            Kernel::PassThrough.bindings()
        );
        assert_eq!(Kernel::Advection.bindings().len(), 4);
    }

    #[test]
    fn upscale_reads_one_field_and_two_sizes() {
        let bindings = Kernel::Upscale.bindings();
        let reads = bindings
            .iter()
            .filter(|b| **b == BindingKind::FieldRead)
            .count();
        let uniforms = bindings
            .iter()
            .filter(|b| **b == BindingKind::Uniform)
            .count();
        assert_eq!((reads, uniforms), (1, 2));
        assert!(!bindings.contains(&BindingKind::FieldWrite));
    }

    #[test]
    fn compute_kernels_dispatch_over_eight_by_eight_tiles() {
        for kernel in [Kernel::Noise, Kernel::Advection, Kernel::PassThrough] {
            assert_eq!(
                kernel.granularity(Resolution::R512),
                Granularity::Dispatch { x: 64, y: 64 }
            );
            assert_eq!(
                kernel.granularity(Resolution::R64),
                Granularity::Dispatch { x: 8, y: 8 }
            );
        }
    }

    #[test]
    fn upscale_draws_a_quad_regardless_of_resolution() {
        for res in Resolution::ALL {
            assert_eq!(
                Kernel::Upscale.granularity(res),
                Granularity::Draw { vertices: 4 }
            );
        }
    }

    #[test]
    fn layout_entries_follow_declared_ordinals() {
        for kernel in Kernel::ALL {
            let entries = kernel.layout_entries();
            assert_eq!(entries.len(), kernel.bindings().len());
            for (i, entry) in entries.iter().enumerate() {
                assert_eq!(entry.binding, i as u32);
            }
        }
    }
}
