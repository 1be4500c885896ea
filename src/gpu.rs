// Curlflow - GPU Curl-Noise Dye Advection
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use std::sync::Arc;

use anyhow::{bail, Context};

/// Device, queue and the configured presentation surface.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Bring up the GPU for `window`. Any missing capability is fatal.
    pub fn new(window: Arc<winit::window::Window>, size: [u32; 2]) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("failed to create a presentation surface for the window")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no GPU adapter can present to this window")?;

        let info = adapter.get_info();
        log::info!("using {} ({:?})", info.name, info.backend);

        if !adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            bail!("{} does not support compute shaders", info.name);
        }

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Curlflow Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("GPU device request failed")?;

        // Uncaptured errors are logged, not fatal.
        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            log::error!("GPU error: {err}");
        }));

        let caps = surface.get_capabilities(&adapter);
        let format = preferred_format(&caps.formats)
            .context("surface reports no supported color formats")?;
        log::info!("surface format {format:?}");

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size[0].max(1),
            height: size[1].max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
        })
    }

    pub fn surface_size(&self) -> [u32; 2] {
        [self.surface_config.width, self.surface_config.height]
    }

    pub fn reconfigure(&mut self, size: [u32; 2]) {
        log::debug!("surface {:?} -> {size:?}", self.surface_size());
        self.surface_config.width = size[0];
        self.surface_config.height = size[1];
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Reapply the current configuration after the surface was lost.
    pub fn restore_surface(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }
}

/// The device-preferred format, skipping sRGB variants when a linear one is
/// offered so dye colors are shown unconverted.
fn preferred_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_formats_win_over_srgb() {
        let formats = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm,
        ];
        assert_eq!(
            preferred_format(&formats),
            Some(wgpu::TextureFormat::Bgra8Unorm)
        );
    }

    #[test]
    fn srgb_only_surfaces_still_get_a_format() {
        let formats = [wgpu::TextureFormat::Rgba8UnormSrgb];
        assert_eq!(
            preferred_format(&formats),
            Some(wgpu::TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(preferred_format(&[]), None);
    }
}
