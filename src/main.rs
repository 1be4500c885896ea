// Curlflow - GPU Curl-Noise Dye Advection
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

mod gpu;
mod kernels;
mod panel;
mod params;
mod resources;
mod scheduler;
#[cfg(test)]
mod test_gpu;
mod uniforms;
mod viewport;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use egui_wgpu::ScreenDescriptor;
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::gpu::GpuContext;
use crate::panel::{EguiOverlay, EventQueue};
use crate::params::SimulationParameters;
use crate::scheduler::FrameScheduler;

const WINDOW_TITLE: &str = "Curlflow";

struct FpsCounter {
    frames: u32,
    since: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            since: Instant::now(),
        }
    }

    fn tick(&mut self, window: &Window) {
        self.frames += 1;
        let elapsed = self.since.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frames as f32 / elapsed;
            window.set_title(&format!("{WINDOW_TITLE} - {fps:.1} FPS"));
            self.frames = 0;
            self.since = Instant::now();
        }
    }
}

/// Window size in surface pixels, derived from the logical size and the
/// current scale factor.
fn live_surface_size(window: &Window) -> [u32; 2] {
    let scale = window.scale_factor();
    let logical: LogicalSize<f64> = window.inner_size().to_logical(scale);
    viewport::surface_size((logical.width, logical.height), scale)
}

fn run() -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("failed to create the event loop")?;
    let window = Arc::new(
        event_loop
            .create_window(
                winit::window::WindowAttributes::default()
                    .with_title(WINDOW_TITLE)
                    .with_inner_size(LogicalSize::new(1024, 768)),
            )
            .context("failed to create the window")?,
    );

    let mut gpu = GpuContext::new(window.clone(), live_surface_size(&window))?;
    let mut params = SimulationParameters::default();
    let mut scheduler =
        FrameScheduler::new(&gpu.device, gpu.surface_config.format, params.resolution);
    let mut events = EventQueue::default();

    let mut egui_state = egui_winit::State::new(
        egui::Context::default(),
        egui::ViewportId::ROOT,
        &window,
        Some(window.scale_factor() as f32),
        None,
        None,
    );
    let mut egui_renderer =
        egui_wgpu::Renderer::new(&gpu.device, gpu.surface_config.format, None, 1, false);

    let mut ui_visible = true;
    let mut cursor: Option<[f32; 2]> = None;
    let mut fps = FpsCounter::new();

    log::info!(
        "field {}x{}, surface {:?}",
        params.resolution.side(),
        params.resolution.side(),
        gpu.surface_size()
    );

    event_loop
        .run(move |event, target| match event {
            Event::WindowEvent { event, window_id } if window_id == window.id() => {
                let response = egui_state.on_window_event(&window, &event);

                match event {
                    WindowEvent::CloseRequested => {
                        scheduler.release();
                        target.exit();
                    }
                    WindowEvent::Resized(_) => window.request_redraw(),
                    WindowEvent::RedrawRequested => {
                        let raw_input = egui_state.take_egui_input(&window);
                        let full_output = egui_state.egui_ctx().run(raw_input, |ctx| {
                            if ui_visible {
                                panel::draw(ctx, &mut params, &mut events);
                            }
                        });
                        egui_state.handle_platform_output(&window, full_output.platform_output);

                        let primitives = egui_state
                            .egui_ctx()
                            .tessellate(full_output.shapes, full_output.pixels_per_point);

                        let live = live_surface_size(&window);
                        let frame_size =
                            viewport::reconcile(gpu.surface_size(), live).unwrap_or(gpu.surface_size());
                        let mut overlay = EguiOverlay {
                            renderer: &mut egui_renderer,
                            primitives,
                            textures: full_output.textures_delta,
                            screen: ScreenDescriptor {
                                size_in_pixels: frame_size,
                                pixels_per_point: full_output.pixels_per_point,
                            },
                        };

                        match scheduler.run_frame(
                            &mut gpu,
                            live,
                            &mut params,
                            &mut events,
                            &mut overlay,
                        ) {
                            Ok(()) => fps.tick(&window),
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                gpu.restore_surface()
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("GPU out of memory, exiting");
                                scheduler.release();
                                target.exit();
                            }
                            Err(err) => log::warn!("frame skipped: {err}"),
                        }
                    }
                    // Input below only reaches the field when the panel didn't take it.
                    _ if response.consumed => {}
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                physical_key: PhysicalKey::Code(code),
                                state: ElementState::Pressed,
                                repeat: false,
                                ..
                            },
                        ..
                    } => match code {
                        KeyCode::Escape => {
                            scheduler.release();
                            target.exit();
                        }
                        KeyCode::Space => ui_visible = !ui_visible,
                        KeyCode::KeyD => {
                            params.display = params.display.toggled();
                            log::debug!("display mode {:?}", params.display);
                        }
                        _ => {}
                    },
                    WindowEvent::CursorMoved { position, .. } => {
                        cursor = Some([position.x as f32, position.y as f32]);
                    }
                    WindowEvent::CursorLeft { .. } => cursor = None,
                    WindowEvent::MouseInput {
                        state: ElementState::Pressed,
                        button: MouseButton::Left,
                        ..
                    } => {
                        if let Some(position) = cursor {
                            let [width, height] = gpu.surface_size();
                            let side = params.resolution.side() as f32;
                            if let Some(click) = viewport::normalize_click(
                                position,
                                [width as f32, height as f32],
                                [side, side],
                            ) {
                                params.set_click(click);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => window.request_redraw(),
            _ => {}
        })
        .context("event loop exited with an error")?;

    Ok(())
}

fn main() {
    use env_logger::Env;
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    if let Err(err) = run() {
        log::error!("{err:#}");
        eprintln!("curlflow: {err:#}");
        std::process::exit(1);
    }
}
