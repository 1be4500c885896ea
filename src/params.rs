// Curlflow - GPU Curl-Noise Dye Advection
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

/// Click position meaning "no click this frame".
pub const NO_CLICK: [f32; 2] = [-1.0, -1.0];

/// Compute kernels run 8x8 invocations per workgroup.
pub const WORKGROUP_SIZE: u32 = 8;

/// Side length of the square compute fields.
///
/// Every variant is a multiple of [`WORKGROUP_SIZE`], so `side / 8` is always a
/// whole dispatch grid. Callers that build a field size by other means must
/// keep that property themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Resolution {
    R64,
    R128,
    R256,
    #[default]
    R512,
    R1024,
}

impl Resolution {
    pub const ALL: [Resolution; 5] = [
        Resolution::R64,
        Resolution::R128,
        Resolution::R256,
        Resolution::R512,
        Resolution::R1024,
    ];

    pub fn side(self) -> u32 {
        match self {
            Resolution::R64 => 64,
            Resolution::R128 => 128,
            Resolution::R256 => 256,
            Resolution::R512 => 512,
            Resolution::R1024 => 1024,
        }
    }

    /// Workgroups along each axis of the dispatch grid.
    pub fn workgroups(self) -> u32 {
        self.side() / WORKGROUP_SIZE
    }

    #[cfg(test)]
    pub fn from_side(side: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.side() == side)
    }

    pub fn label(self) -> &'static str {
        match self {
            Resolution::R64 => "64",
            Resolution::R128 => "128",
            Resolution::R256 => "256",
            Resolution::R512 => "512",
            Resolution::R1024 => "1024",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Dye advected along the curl-noise field.
    #[default]
    Composite,
    /// Raw velocity field pushed through the dye ping-pong.
    DebugVelocityField,
}

impl DisplayMode {
    pub fn label(self) -> &'static str {
        match self {
            DisplayMode::Composite => "Texture",
            DisplayMode::DebugVelocityField => "Debug - Curl Noise",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Composite => DisplayMode::DebugVelocityField,
            DisplayMode::DebugVelocityField => DisplayMode::Composite,
        }
    }
}

/// Everything the user can tune, plus the one-shot click signal.
///
/// Owned by the application and handed to the parameter panel mutably and to
/// the frame scheduler for the uniform upload. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    pub spatial_frequency: f32,
    pub temporal_frequency: f32,
    pub octaves: u32,
    pub flow_velocity: f32,
    pub resolution: Resolution,
    pub display: DisplayMode,
    pub radius: f32,
    pub density: f32,
    pub viscosity: f32,
    pub lifespan: f32,
    pub colorfulness: f32,
    click: [f32; 2],
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            spatial_frequency: 2.0,
            temporal_frequency: 0.1,
            octaves: 3,
            flow_velocity: 0.0,
            resolution: Resolution::default(),
            display: DisplayMode::default(),
            radius: 0.01,
            density: 1.0,
            viscosity: 0.0,
            lifespan: 10.0,
            colorfulness: 0.5,
            click: NO_CLICK,
        }
    }
}

impl SimulationParameters {
    /// Clamp every tunable to the range the parameter panel exposes.
    pub fn sanitize(&mut self) {
        self.spatial_frequency = self.spatial_frequency.clamp(0.0, 10.0);
        self.temporal_frequency = self.temporal_frequency.clamp(0.0, 2.0);
        self.octaves = self.octaves.clamp(1, 5);
        self.flow_velocity = self.flow_velocity.clamp(0.0, 1.0);
        self.radius = self.radius.clamp(0.0, 1.0);
        self.density = self.density.clamp(0.0, 1.0);
        self.viscosity = self.viscosity.clamp(0.0, 1.0);
        self.lifespan = self.lifespan.clamp(0.0, 500.0);
        self.colorfulness = self.colorfulness.clamp(0.0, 1.0);
    }

    /// Record a click in normalized field coordinates. A later click in the
    /// same frame replaces an earlier one.
    pub fn set_click(&mut self, normalized: [f32; 2]) {
        self.click = normalized;
    }

    pub fn click(&self) -> [f32; 2] {
        self.click
    }

    pub fn has_click(&self) -> bool {
        self.click != NO_CLICK
    }

    /// Hand out the pending click and reset to [`NO_CLICK`].
    pub fn take_click(&mut self) -> [f32; 2] {
        std::mem::replace(&mut self.click, NO_CLICK)
    }
}
