// Curlflow - GPU Curl-Noise Dye Advection
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use crate::kernels::{Kernel, KernelLayouts, FIELD_FORMAT};
use crate::params::Resolution;
use crate::uniforms::UniformStore;

/// Which of the two dye fields is current. Only ever 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DyeSwap {
    current: usize,
}

impl DyeSwap {
    pub fn current(self) -> usize {
        self.current
    }

    /// The field the transport kernel writes this frame.
    pub fn next(self) -> usize {
        1 - self.current
    }

    pub fn toggle(&mut self) {
        self.current = self.next();
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }
}

struct Field {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Texture size of every field at `resolution`.
pub fn field_extent(resolution: Resolution) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: resolution.side(),
        height: resolution.side(),
        depth_or_array_layers: 1,
    }
}

impl Field {
    fn new(device: &wgpu::Device, label: &str, resolution: Resolution) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: field_extent(resolution),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FIELD_FORMAT,
            usage: wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Every binding set that references the fields. Replaced as a whole when
/// the fields are reallocated so nothing can point at a destroyed texture.
struct BindingSets {
    noise: wgpu::BindGroup,
    // Index i reads dye i and writes dye 1 - i.
    advection: [wgpu::BindGroup; 2],
    pass_through: [wgpu::BindGroup; 2],
    render: wgpu::BindGroup,
}

/// Sole owner of the velocity field, the two dye fields and their bindings.
#[derive(Default)]
pub struct ResourceManager {
    velocity: Option<Field>,
    dyes: [Option<Field>; 2],
    swap: DyeSwap,
    resolution: Option<Resolution>,
    bindings: Option<BindingSets>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reallocate all fields at `resolution` and rebuild every binding set.
    ///
    /// Does nothing until the kernel layouts exist. `resolution` must divide
    /// into 8x8 workgroups, which every [`Resolution`] does.
    pub fn configure(
        &mut self,
        device: &wgpu::Device,
        layouts: Option<&KernelLayouts>,
        uniforms: &UniformStore,
        resolution: Resolution,
    ) -> bool {
        let Some(layouts) = layouts else {
            log::debug!(
                "ignoring configure({}) before kernels exist",
                resolution.side()
            );
            return false;
        };

        self.destroy_fields();

        self.velocity = Some(Field::new(device, "Velocity Field", resolution));
        self.dyes = [
            Some(Field::new(device, "Dye Field 0", resolution)),
            Some(Field::new(device, "Dye Field 1", resolution)),
        ];
        self.record_allocation(resolution);
        self.bindings = self.build_bindings(device, layouts, uniforms);

        let side = resolution.side();
        log::info!("fields reallocated at {side}x{side}");
        true
    }

    /// Bookkeeping for a fresh allocation: new fields always start reading
    /// dye 0.
    fn record_allocation(&mut self, resolution: Resolution) {
        self.swap.reset();
        self.resolution = Some(resolution);
    }

    /// Destroy whatever fields exist. Missing fields are skipped, so calling
    /// this twice is harmless.
    pub fn destroy_fields(&mut self) {
        self.bindings = None;
        let slots = std::iter::once(&mut self.velocity).chain(self.dyes.iter_mut());
        for slot in slots {
            if let Some(field) = slot.take() {
                field.texture.destroy();
            }
        }
        self.resolution = None;
    }

    fn build_bindings(
        &self,
        device: &wgpu::Device,
        layouts: &KernelLayouts,
        uniforms: &UniformStore,
    ) -> Option<BindingSets> {
        let velocity = &self.velocity.as_ref()?.view;
        let dye0 = &self.dyes[0].as_ref()?.view;
        let dye1 = &self.dyes[1].as_ref()?.view;

        let noise = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Noise Bind Group"),
            layout: layouts.get(Kernel::Noise),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(velocity),
                },
            ],
        });

        let transport = |kernel: Kernel, src: &wgpu::TextureView, dst: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(kernel.label()),
                layout: layouts.get(kernel),
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(velocity),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(src),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(dst),
                    },
                ],
            })
        };

        let advection = [
            transport(Kernel::Advection, dye0, dye1),
            transport(Kernel::Advection, dye1, dye0),
        ];
        let pass_through = [
            transport(Kernel::PassThrough, dye0, dye1),
            transport(Kernel::PassThrough, dye1, dye0),
        ];
        let render = self.render_binding_for(device, layouts, uniforms, self.swap.current())?;

        Some(BindingSets {
            noise,
            advection,
            pass_through,
            render,
        })
    }

    fn render_binding_for(
        &self,
        device: &wgpu::Device,
        layouts: &KernelLayouts,
        uniforms: &UniformStore,
        dye: usize,
    ) -> Option<wgpu::BindGroup> {
        let view = &self.dyes[dye].as_ref()?.view;
        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Upscale Bind Group"),
            layout: layouts.get(Kernel::Upscale),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniforms.surface_size_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniforms.field_size_buffer.as_entire_binding(),
                },
            ],
        }))
    }

    /// Point the render binding at whichever dye field is current now.
    pub fn rebind_render(
        &mut self,
        device: &wgpu::Device,
        layouts: &KernelLayouts,
        uniforms: &UniformStore,
    ) {
        let Some(render) = self.render_binding_for(device, layouts, uniforms, self.swap.current())
        else {
            return;
        };
        if let Some(bindings) = self.bindings.as_mut() {
            bindings.render = render;
        }
    }

    /// Make the freshly written dye field current.
    pub fn swap_dye(&mut self) {
        self.swap.toggle();
    }

    pub fn dye_swap(&self) -> DyeSwap {
        self.swap
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn noise_binding(&self) -> Option<&wgpu::BindGroup> {
        self.bindings.as_ref().map(|b| &b.noise)
    }

    /// Transport binding that reads dye field `read` and writes the other.
    pub fn transport_binding(&self, kernel: Kernel, read: usize) -> Option<&wgpu::BindGroup> {
        let bindings = self.bindings.as_ref()?;
        match kernel {
            Kernel::Advection => bindings.advection.get(read),
            Kernel::PassThrough => bindings.pass_through.get(read),
            Kernel::Noise | Kernel::Upscale => None,
        }
    }

    pub fn render_binding(&self) -> Option<&wgpu::BindGroup> {
        self.bindings.as_ref().map(|b| &b.render)
    }

    /// Dimensions of (velocity, dye 0, dye 1), where allocated.
    #[cfg(test)]
    pub fn field_dimensions(&self) -> [Option<(u32, u32)>; 3] {
        let dims = |f: &Option<Field>| f.as_ref().map(|f| (f.texture.width(), f.texture.height()));
        [dims(&self.velocity), dims(&self.dyes[0]), dims(&self.dyes[1])]
    }
}
