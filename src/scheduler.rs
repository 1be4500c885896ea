// Curlflow - GPU Curl-Noise Dye Advection
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use std::time::Instant;

use crate::gpu::GpuContext;
use crate::kernels::{Kernel, KernelSet};
use crate::panel::{EventQueue, ParamEvent};
use crate::params::{DisplayMode, Resolution, SimulationParameters};
use crate::resources::{DyeSwap, ResourceManager};
use crate::uniforms::UniformStore;
use crate::viewport;

/// Something drawn over the field in the same render pass, after the upscale.
pub trait FrameOverlay {
    /// Upload overlay data. Returned command buffers are submitted ahead of
    /// the frame's own encoder, in the same submission.
    fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Vec<wgpu::CommandBuffer>;

    fn draw(&self, pass: &mut wgpu::RenderPass<'static>);

    /// Called once the frame has been submitted.
    fn finish(&mut self) {}
}

/// Transport kernel for a display mode. Both read the current dye field and
/// write the other one; only the kernel differs.
pub fn transport_kernel(mode: DisplayMode) -> Kernel {
    match mode {
        DisplayMode::Composite => Kernel::Advection,
        DisplayMode::DebugVelocityField => Kernel::PassThrough,
    }
}

/// One frame's transport pass: the kernel, the dye field it reads and the
/// one it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportStep {
    pub kernel: Kernel,
    pub read: usize,
    pub write: usize,
}

pub fn plan_transport(mode: DisplayMode, swap: DyeSwap) -> TransportStep {
    TransportStep {
        kernel: transport_kernel(mode),
        read: swap.current(),
        write: swap.next(),
    }
}

/// Orders the passes of one frame and owns everything they touch.
pub struct FrameScheduler {
    kernels: KernelSet,
    uniforms: UniformStore,
    resources: ResourceManager,
    started: Instant,
}

impl FrameScheduler {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        resolution: Resolution,
    ) -> Self {
        let kernels = KernelSet::new(device, surface_format);
        let uniforms = UniformStore::new(device);
        let mut resources = ResourceManager::new();
        resources.configure(device, Some(&kernels.layouts), &uniforms, resolution);

        Self {
            kernels,
            uniforms,
            resources,
            started: Instant::now(),
        }
    }

    /// Apply a queued parameter event. Runs between frames only, so a
    /// rebuild always finishes before anything reads the new fields.
    pub fn apply(
        &mut self,
        device: &wgpu::Device,
        params: &mut SimulationParameters,
        event: ParamEvent,
    ) {
        match event {
            ParamEvent::ResolutionChanged(resolution) => {
                params.resolution = resolution;
                if self.resources.resolution() != Some(resolution) {
                    self.resources.configure(
                        device,
                        Some(&self.kernels.layouts),
                        &self.uniforms,
                        resolution,
                    );
                }
            }
        }
    }

    /// Upload uniforms, record the noise and transport passes, swap the dye
    /// fields and repoint the render binding at the new current field.
    fn record_simulation(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        params: &mut SimulationParameters,
        time: f32,
        surface_size: [u32; 2],
    ) {
        self.uniforms.upload(queue, params, time, surface_size);

        let Some(resolution) = self.resources.resolution() else {
            log::warn!("no fields allocated, skipping simulation passes");
            return;
        };

        if let Some(noise) = self.resources.noise_binding() {
            self.kernels.dispatch(encoder, Kernel::Noise, noise, resolution);
        }

        let step = plan_transport(params.display, self.resources.dye_swap());
        log::trace!(
            "{}: dye {} -> dye {}",
            step.kernel.label(),
            step.read,
            step.write
        );
        if let Some(binding) = self.resources.transport_binding(step.kernel, step.read) {
            self.kernels.dispatch(encoder, step.kernel, binding, resolution);
        }

        self.resources.swap_dye();
        self.resources
            .rebind_render(device, &self.kernels.layouts, &self.uniforms);
    }

    /// Run one full frame. Surface errors are returned after the recorded
    /// simulation and overlay uploads have still been submitted, so the dye
    /// swap stays in step with what the GPU actually wrote.
    pub fn run_frame(
        &mut self,
        gpu: &mut GpuContext,
        live_size: [u32; 2],
        params: &mut SimulationParameters,
        events: &mut EventQueue,
        overlay: &mut dyn FrameOverlay,
    ) -> Result<(), wgpu::SurfaceError> {
        if let Some(size) = viewport::reconcile(gpu.surface_size(), live_size) {
            gpu.reconfigure(size);
        }

        let pending: Vec<ParamEvent> = events.drain().collect();
        for event in pending {
            self.apply(&gpu.device, params, event);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let time = self.started.elapsed().as_secs_f32();
        let surface_size = gpu.surface_size();
        self.record_simulation(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            params,
            time,
            surface_size,
        );

        let overlay_buffers = overlay.prepare(&gpu.device, &gpu.queue, &mut encoder);

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(err) => {
                gpu.queue
                    .submit(overlay_buffers.into_iter().chain(std::iter::once(encoder.finish())));
                overlay.finish();
                return Err(err);
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Upscale Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();

            if let Some(binding) = self.resources.render_binding() {
                self.kernels.draw_upscale(&mut pass, binding);
            }
            overlay.draw(&mut pass);
        }

        gpu.queue
            .submit(overlay_buffers.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();
        overlay.finish();

        Ok(())
    }

    /// Release the fields ahead of shutdown.
    pub fn release(&mut self) {
        self.resources.destroy_fields();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_gpu::headless_device;

    #[test]
    fn display_mode_only_picks_the_transport_kernel() {
        assert_eq!(transport_kernel(DisplayMode::Composite), Kernel::Advection);
        assert_eq!(
            transport_kernel(DisplayMode::DebugVelocityField),
            Kernel::PassThrough
        );
        assert_eq!(
            transport_kernel(DisplayMode::Composite).bindings(),
            transport_kernel(DisplayMode::DebugVelocityField).bindings()
        );
    }

    #[test]
    fn transport_alternates_dye_fields_across_a_mode_switch() {
        let mut swap = DyeSwap::default();
        let mut steps = Vec::new();
        for frame in 0..6 {
            let mode = if frame < 3 {
                DisplayMode::Composite
            } else {
                DisplayMode::DebugVelocityField
            };
            steps.push(plan_transport(mode, swap));
            swap.toggle();
        }

        let reads: Vec<usize> = steps.iter().map(|s| s.read).collect();
        assert_eq!(reads, vec![0, 1, 0, 1, 0, 1]);
        assert!(steps.iter().all(|s| s.write == 1 - s.read));
        let kernels: Vec<Kernel> = steps.iter().map(|s| s.kernel).collect();
        assert_eq!(
            kernels,
            vec![
                Kernel::Advection,
                Kernel::Advection,
                Kernel::Advection,
                Kernel::PassThrough,
                Kernel::PassThrough,
                Kernel::PassThrough,
            ]
        );
    }

    #[test]
    #[ignore = "needs a GPU adapter"]
    fn frames_alternate_dye_fields_in_both_modes() {
        let (device, queue) = headless_device();
        let mut scheduler =
            FrameScheduler::new(&device, wgpu::TextureFormat::Rgba8Unorm, Resolution::R64);
        let mut params = SimulationParameters::default();
        params.resolution = Resolution::R64;
        params.set_click([0.5, 0.5]);

        let mut seen = Vec::new();
        for frame in 0..6 {
            if frame == 3 {
                params.display = DisplayMode::DebugVelocityField;
            }
            seen.push(scheduler.resources.dye_swap().current());

            let mut encoder =
                device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
            scheduler.record_simulation(
                &device,
                &queue,
                &mut encoder,
                &mut params,
                frame as f32 * 0.016,
                [640, 480],
            );
            queue.submit(std::iter::once(encoder.finish()));

            assert!(!params.has_click());
            assert_eq!(scheduler.resources.resolution(), Some(Resolution::R64));
        }
        device.poll(wgpu::Maintain::Wait);

        assert_eq!(seen, vec![0, 1, 0, 1, 0, 1]);
        assert_eq!(scheduler.resources.dye_swap().current(), 0);
    }

    #[test]
    #[ignore = "needs a GPU adapter"]
    fn resolution_event_rebuilds_before_next_frame() {
        let (device, _queue) = headless_device();
        let mut scheduler =
            FrameScheduler::new(&device, wgpu::TextureFormat::Rgba8Unorm, Resolution::R64);
        let mut params = SimulationParameters::default();
        params.resolution = Resolution::R64;
        scheduler.resources.swap_dye();

        scheduler.apply(
            &device,
            &mut params,
            ParamEvent::ResolutionChanged(Resolution::R128),
        );

        assert_eq!(params.resolution, Resolution::R128);
        assert_eq!(scheduler.resources.resolution(), Some(Resolution::R128));
        assert_eq!(scheduler.resources.dye_swap().current(), 0);
        assert_eq!(
            scheduler.resources.field_dimensions(),
            [Some((128, 128)); 3]
        );

        scheduler.release();
        assert_eq!(scheduler.resources.field_dimensions(), [None; 3]);
    }
}
