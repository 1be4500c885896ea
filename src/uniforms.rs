// Curlflow - GPU Curl-Noise Dye Advection
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use bytemuck::{Pod, Zeroable};

use crate::params::SimulationParameters;

/// Kernel-facing parameter record. Field order is part of the shader contract:
/// the kernels index it by offset, so never reorder.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FlowUniforms {
    pub phase: f32,            // offset 0: temporal_frequency * time
    pub spatial_frequency: f32, // offset 4
    pub field_width: f32,      // offset 8
    pub field_height: f32,     // offset 12
    pub octaves: f32,          // offset 16
    pub flow_velocity: f32,    // offset 20
    pub click: [f32; 2],       // offset 24
    pub radius: f32,           // offset 32
    pub density: f32,          // offset 36
    pub viscosity: f32,        // offset 40
    pub lifespan: f32,         // offset 44
    pub colorfulness: f32,     // offset 48
    pub _pad: [f32; 3],        // uniform structs round up to 16 bytes
}

const _: [(); 64] = [(); std::mem::size_of::<FlowUniforms>()];

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SurfaceSize {
    pub size: [f32; 2],
}

/// Field size padded to a vec4 block.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FieldSize {
    pub size: [f32; 2],
    pub _pad: [f32; 2],
}

impl FlowUniforms {
    /// Pack the current parameters. Consumes the pending click, so a click is
    /// seen by exactly one upload.
    pub fn pack(params: &mut SimulationParameters, time: f32) -> Self {
        let side = params.resolution.side() as f32;
        Self {
            phase: params.temporal_frequency * time,
            spatial_frequency: params.spatial_frequency,
            field_width: side,
            field_height: side,
            octaves: params.octaves as f32,
            flow_velocity: params.flow_velocity,
            click: params.take_click(),
            radius: params.radius,
            density: params.density,
            viscosity: params.viscosity,
            lifespan: params.lifespan,
            colorfulness: params.colorfulness,
            _pad: [0.0; 3],
        }
    }
}

/// Owns the three small uniform buffers the kernels bind.
pub struct UniformStore {
    pub params_buffer: wgpu::Buffer,
    pub surface_size_buffer: wgpu::Buffer,
    pub field_size_buffer: wgpu::Buffer,
}

impl UniformStore {
    pub fn new(device: &wgpu::Device) -> Self {
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Flow Uniforms"),
            size: std::mem::size_of::<FlowUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let surface_size_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Surface Size"),
            size: std::mem::size_of::<SurfaceSize>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let field_size_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Field Size"),
            size: std::mem::size_of::<FieldSize>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            params_buffer,
            surface_size_buffer,
            field_size_buffer,
        }
    }

    /// Write all three buffers for this frame. The surface can be resized at
    /// any time, so the size buffers are rewritten unconditionally.
    pub fn upload(
        &self,
        queue: &wgpu::Queue,
        params: &mut SimulationParameters,
        time: f32,
        surface_size: [u32; 2],
    ) {
        let side = params.resolution.side() as f32;
        let surface = SurfaceSize {
            size: [surface_size[0] as f32, surface_size[1] as f32],
        };
        let field = FieldSize {
            size: [side, side],
            _pad: [0.0; 2],
        };
        queue.write_buffer(&self.surface_size_buffer, 0, bytemuck::bytes_of(&surface));
        queue.write_buffer(&self.field_size_buffer, 0, bytemuck::bytes_of(&field));

        if params.has_click() {
            log::debug!("dye injected at {:?}", params.click());
        }
        let uniforms = FlowUniforms::pack(params, time);
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&uniforms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Resolution, NO_CLICK};

    fn kernel_floats(uniforms: &FlowUniforms) -> [f32; 13] {
        let all: &[f32; 16] = bytemuck::cast_ref(uniforms);
        let mut out = [0.0; 13];
        out.copy_from_slice(&all[..13]);
        out
    }

    #[test]
    fn layout_matches_kernel_offsets() {
        assert_eq!(std::mem::size_of::<FlowUniforms>(), 64);
        assert_eq!(std::mem::size_of::<SurfaceSize>(), 8);
        assert_eq!(std::mem::size_of::<FieldSize>(), 16);
    }

    #[test]
    fn pack_orders_fields_for_the_kernels() {
        let mut params = SimulationParameters::default();
        params.spatial_frequency = 3.0;
        params.temporal_frequency = 0.5;
        params.octaves = 4;
        params.flow_velocity = 0.2;
        params.resolution = Resolution::R256;
        params.radius = 0.05;
        params.density = 0.8;
        params.viscosity = 0.1;
        params.lifespan = 20.0;
        params.colorfulness = 0.3;
        params.set_click([0.5, 0.125]);

        let packed = FlowUniforms::pack(&mut params, 10.0);
        assert_eq!(
            kernel_floats(&packed),
            [5.0, 3.0, 256.0, 256.0, 4.0, 0.2, 0.5, 0.125, 0.05, 0.8, 0.1, 20.0, 0.3]
        );
    }

    #[test]
    fn click_reaches_exactly_one_upload() {
        let mut params = SimulationParameters::default();
        params.set_click([0.75, 0.25]);

        let first = FlowUniforms::pack(&mut params, 1.0);
        let second = FlowUniforms::pack(&mut params, 2.0);
        let third = FlowUniforms::pack(&mut params, 3.0);

        assert_eq!(first.click, [0.75, 0.25]);
        assert_eq!(second.click, NO_CLICK);
        assert_eq!(third.click, NO_CLICK);
        assert!(!params.has_click());
    }

    #[test]
    fn phase_scales_with_time() {
        let mut params = SimulationParameters::default();
        let packed = FlowUniforms::pack(&mut params, 4.0);
        assert!((packed.phase - 0.4).abs() < 1e-6);
    }
}
