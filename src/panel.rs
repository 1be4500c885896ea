// Curlflow - GPU Curl-Noise Dye Advection
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use std::collections::VecDeque;

use crate::params::{DisplayMode, Resolution, SimulationParameters};
use crate::scheduler::FrameOverlay;

/// Changes the frame scheduler has to act on before the next dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamEvent {
    ResolutionChanged(Resolution),
}

#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<ParamEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: ParamEvent) {
        self.pending.push_back(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = ParamEvent> + '_ {
        self.pending.drain(..)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Parameter panel. Edits `params` in place, except the resolution, which is
/// only requested here and applied by the scheduler.
pub fn draw(ctx: &egui::Context, params: &mut SimulationParameters, events: &mut EventQueue) {
    egui::SidePanel::left("parameters")
        .default_width(260.0)
        .resizable(true)
        .frame(
            egui::Frame::none()
                .fill(egui::Color32::from_rgba_unmultiplied(40, 40, 40, 230))
                .inner_margin(egui::Margin::same(10.0)),
        )
        .show(ctx, |ui| {
            egui::CollapsingHeader::new("Curl Noise")
                .default_open(true)
                .show(ui, |ui| {
                    ui.add(
                        egui::Slider::new(&mut params.spatial_frequency, 0.0..=10.0)
                            .step_by(0.01)
                            .text("Spatial Freq."),
                    );
                    ui.add(
                        egui::Slider::new(&mut params.temporal_frequency, 0.0..=2.0)
                            .step_by(0.01)
                            .text("Temporal Freq."),
                    );
                    ui.add(egui::Slider::new(&mut params.octaves, 1..=5).text("Octaves count"));
                    ui.add(
                        egui::Slider::new(&mut params.flow_velocity, 0.0..=1.0)
                            .step_by(0.1)
                            .text("Flow velocity"),
                    );

                    let mut requested = params.resolution;
                    egui::ComboBox::from_label("Resolution")
                        .selected_text(requested.label())
                        .show_ui(ui, |ui| {
                            for res in Resolution::ALL {
                                ui.selectable_value(&mut requested, res, res.label());
                            }
                        });
                    if requested != params.resolution {
                        events.push(ParamEvent::ResolutionChanged(requested));
                    }

                    egui::ComboBox::from_label("Display")
                        .selected_text(params.display.label())
                        .show_ui(ui, |ui| {
                            for mode in [DisplayMode::Composite, DisplayMode::DebugVelocityField] {
                                ui.selectable_value(&mut params.display, mode, mode.label());
                            }
                        });
                });

            egui::CollapsingHeader::new("Dye")
                .default_open(true)
                .show(ui, |ui| {
                    ui.add(
                        egui::Slider::new(&mut params.radius, 0.0..=1.0)
                            .step_by(0.01)
                            .text("Radius"),
                    );
                    ui.add(
                        egui::Slider::new(&mut params.density, 0.0..=1.0)
                            .step_by(0.1)
                            .text("Density"),
                    );
                    ui.add(
                        egui::Slider::new(&mut params.viscosity, 0.0..=1.0)
                            .step_by(0.01)
                            .text("Viscosity"),
                    );
                    ui.add(
                        egui::Slider::new(&mut params.lifespan, 0.0..=500.0)
                            .step_by(1.0)
                            .text("Lifespan (s)"),
                    );
                    ui.add(
                        egui::Slider::new(&mut params.colorfulness, 0.0..=1.0)
                            .step_by(0.01)
                            .text("Colorfulness"),
                    );
                });

            ui.separator();
            ui.label("Click the field to inject dye. Space hides this panel, D toggles the display.");
        });

    params.sanitize();
}

/// One frame of tessellated panel output, drawn on top of the field.
pub struct EguiOverlay<'a> {
    pub renderer: &'a mut egui_wgpu::Renderer,
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures: egui::TexturesDelta,
    pub screen: egui_wgpu::ScreenDescriptor,
}

impl FrameOverlay for EguiOverlay<'_> {
    fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Vec<wgpu::CommandBuffer> {
        for (id, image_delta) in &self.textures.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &self.primitives, &self.screen)
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'static>) {
        self.renderer.render(pass, &self.primitives, &self.screen);
    }

    fn finish(&mut self) {
        for id in &self.textures.free {
            self.renderer.free_texture(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_drain_in_order() {
        let mut events = EventQueue::default();
        events.push(ParamEvent::ResolutionChanged(Resolution::R128));
        events.push(ParamEvent::ResolutionChanged(Resolution::R1024));

        let drained: Vec<_> = events.drain().collect();
        assert_eq!(
            drained,
            vec![
                ParamEvent::ResolutionChanged(Resolution::R128),
                ParamEvent::ResolutionChanged(Resolution::R1024),
            ]
        );
        assert!(events.is_empty());
    }

    #[test]
    fn drawing_without_input_changes_nothing() {
        let ctx = egui::Context::default();
        let mut params = SimulationParameters::default();
        let mut events = EventQueue::default();

        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            draw(ctx, &mut params, &mut events);
        });

        assert_eq!(params, SimulationParameters::default());
        assert!(events.is_empty());
    }
}
