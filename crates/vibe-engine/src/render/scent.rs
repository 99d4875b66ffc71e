use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vibe_contracts::models::{ScentSetting, ScentType};

use super::color::Rgb;

pub const MAX_PARTICLES: usize = 100;
pub const MAX_LABEL_SPRITES: usize = 8;
pub const LABEL_SPAWN_INTERVAL_SECS: f64 = 0.8;
pub const LABEL_LIFETIME_SECS: f64 = 3.0;
/// Height above which particles recycle and labels are dropped.
pub const TRAVEL_CEILING_Y: f64 = 2.0;
const MOTION_SCALE: f64 = 10.0;
const OUTLET: [f64; 3] = [0.3, 0.88, -0.48];
const OUTLET_JITTER: f64 = 0.05;
const RING_IDLE_OPACITY: f64 = 0.3;
const RING_ACTIVE_OPACITY: f64 = 0.8;
const RING_IDLE_COLOR: u32 = 0x00ff88;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScentStyle {
    pub color: u32,
    pub label: &'static str,
    pub emoji: &'static str,
}

pub fn scent_style(scent: ScentType) -> ScentStyle {
    let (color, label, emoji) = match scent {
        ScentType::Lavender => (0x9370db, "stress ↓↓", "🪻"),
        ScentType::Peppermint => (0x98fb98, "alertness ↑↑", "🌿"),
        ScentType::Ocean => (0x00ced1, "relaxation ↑", "🌊"),
        ScentType::Forest => (0x228b22, "focus ↑", "🌲"),
        ScentType::Citrus => (0xffa500, "energy ↑", "🍊"),
        ScentType::Vanilla => (0xffe4c4, "happiness ↑", "🍦"),
        ScentType::None => (0x000000, "", ""),
    };
    ScentStyle {
        color,
        label,
        emoji,
    }
}

/// Number of live particles for an intensity.
pub fn spawn_count(intensity: u32) -> usize {
    (intensity as usize).saturating_mul(10).min(MAX_PARTICLES)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelSprite {
    pub text: &'static str,
    pub color: Rgb,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub life: f64,
    pub opacity: f64,
}

/// Rising particle plume and fading effect labels at the scent outlet.
pub struct ScentRenderer {
    rng: StdRng,
    particles: Vec<Particle>,
    active: usize,
    style: Option<ScentStyle>,
    labels: Vec<LabelSprite>,
    spawn_timer: f64,
    ring_color: Rgb,
    ring_opacity: f64,
}

impl Default for ScentRenderer {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl ScentRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic jitter, for snapshots and tests.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            particles: Vec::new(),
            active: 0,
            style: None,
            labels: Vec::new(),
            spawn_timer: 0.0,
            ring_color: Rgb::from_u32(RING_IDLE_COLOR),
            ring_opacity: RING_IDLE_OPACITY,
        }
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles[..self.active.min(self.particles.len())]
    }

    pub fn labels(&self) -> &[LabelSprite] {
        &self.labels
    }

    pub fn style(&self) -> Option<ScentStyle> {
        self.style
    }

    pub fn ring(&self) -> (Rgb, f64) {
        (self.ring_color, self.ring_opacity)
    }

    /// `None`, `NONE` or zero intensity switch the plume off.
    pub fn apply(&mut self, setting: Option<&ScentSetting>) {
        self.labels.clear();
        let Some(setting) = setting.filter(|setting| !setting.is_off()) else {
            self.active = 0;
            self.style = None;
            self.ring_opacity = RING_IDLE_OPACITY;
            return;
        };

        let style = scent_style(setting.scent_type);
        self.active = spawn_count(setting.intensity);
        self.style = Some(style);
        self.ring_color = Rgb::from_u32(style.color);
        self.ring_opacity = RING_ACTIVE_OPACITY;
        if self.particles.is_empty() {
            self.particles = (0..MAX_PARTICLES)
                .map(|_| fresh_particle(&mut self.rng))
                .collect();
        }
        log::debug!(
            "scent {} at intensity {} -> {} particles",
            setting.scent_type,
            setting.intensity,
            self.active
        );
    }

    pub fn tick(&mut self, delta: f64) {
        if let Some(style) = self.style.filter(|_| self.active > 0) {
            self.spawn_timer += delta;
            if self.spawn_timer >= LABEL_SPAWN_INTERVAL_SECS {
                self.spawn_timer = 0.0;
                if self.labels.len() < MAX_LABEL_SPRITES {
                    let seed = fresh_particle(&mut self.rng);
                    self.labels.push(LabelSprite {
                        text: style.label,
                        color: Rgb::from_u32(style.color),
                        position: seed.position,
                        velocity: seed.velocity,
                        life: 0.0,
                        opacity: 1.0,
                    });
                }
            }
        }

        for label in &mut self.labels {
            label.life += delta;
            advance(&mut label.position, &label.velocity, delta);
            label.opacity = (1.0 - label.life / LABEL_LIFETIME_SECS).max(0.0);
        }
        self.labels
            .retain(|label| label.position[1] <= TRAVEL_CEILING_Y && label.opacity > 0.0);

        let active = self.active.min(self.particles.len());
        for index in 0..active {
            let particle = &mut self.particles[index];
            advance(&mut particle.position, &particle.velocity, delta);
            if particle.position[1] > TRAVEL_CEILING_Y {
                self.particles[index] = fresh_particle(&mut self.rng);
            }
        }
    }
}

fn advance(position: &mut [f64; 3], velocity: &[f64; 3], delta: f64) {
    for axis in 0..3 {
        position[axis] += velocity[axis] * delta * MOTION_SCALE;
    }
}

fn fresh_particle(rng: &mut StdRng) -> Particle {
    Particle {
        position: [
            OUTLET[0] + (rng.gen::<f64>() - 0.5) * OUTLET_JITTER,
            OUTLET[1],
            OUTLET[2] + (rng.gen::<f64>() - 0.5) * OUTLET_JITTER,
        ],
        velocity: [
            (rng.gen::<f64>() - 0.5) * 0.02,
            0.02 + rng.gen::<f64>() * 0.03,
            (rng.gen::<f64>() - 0.5) * 0.02,
        ],
    }
}
