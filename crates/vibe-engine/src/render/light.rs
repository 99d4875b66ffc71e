use std::f64::consts::TAU;

use vibe_contracts::models::{LightMode, LightSetting};

use super::color::Rgb;

pub const DASH_BASE_INTENSITY: f64 = 20.0;
pub const DOOR_BASE_INTENSITY: f64 = 10.0;
pub const SCREEN_LIGHT_INTENSITY: f64 = 15.0;
/// Speed used when neither an explicit speed nor a known mode is given.
pub const FALLBACK_SPEED: f64 = 1.5;
const SECONDARY_HSL_OFFSET: (f64, f64, f64) = (0.1, 0.2, 0.3);

/// Animation speed of each named light mode.
pub fn mode_speed(mode: Option<LightMode>) -> f64 {
    match mode {
        Some(LightMode::Static) => 0.0,
        Some(LightMode::Breathing) => 1.0,
        Some(LightMode::Gradient) => 2.0,
        Some(LightMode::Pulse) => 4.0,
        None => FALLBACK_SPEED,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripUniforms {
    pub time: f64,
    pub color_a: Rgb,
    pub color_b: Rgb,
    pub speed: f64,
    pub sharpness: f64,
    /// 0..1.
    pub brightness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaLight {
    pub name: &'static str,
    pub color: Rgb,
    pub intensity: f64,
}

/// Ambient strip lighting: one shared animated signal plus the area lights
/// that follow it.
#[derive(Debug, Clone)]
pub struct LightRenderer {
    uniforms: StripUniforms,
    dash: AreaLight,
    left_door: AreaLight,
    right_door: AreaLight,
    screen: AreaLight,
}

impl Default for LightRenderer {
    fn default() -> Self {
        let accent = Rgb::from_u32(0x00aaff);
        Self {
            uniforms: StripUniforms {
                time: 0.0,
                color_a: accent,
                color_b: Rgb::from_u32(0x44ddff),
                speed: 0.5,
                sharpness: 1.0,
                brightness: 1.0,
            },
            dash: AreaLight {
                name: "dash",
                color: accent,
                intensity: DASH_BASE_INTENSITY,
            },
            left_door: AreaLight {
                name: "left_door",
                color: accent,
                intensity: DOOR_BASE_INTENSITY,
            },
            right_door: AreaLight {
                name: "right_door",
                color: accent,
                intensity: DOOR_BASE_INTENSITY,
            },
            screen: AreaLight {
                name: "screen",
                color: Rgb::WHITE,
                intensity: SCREEN_LIGHT_INTENSITY,
            },
        }
    }
}

impl LightRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uniforms(&self) -> &StripUniforms {
        &self.uniforms
    }

    pub fn area_lights(&self) -> [&AreaLight; 4] {
        [&self.dash, &self.left_door, &self.right_door, &self.screen]
    }

    pub fn apply(&mut self, setting: &LightSetting) {
        log::debug!("apply light {setting:?}");
        let primary = setting
            .color
            .as_ref()
            .and_then(|color| color.hex.as_deref())
            .and_then(Rgb::parse_hex);
        if let Some(primary) = primary {
            self.uniforms.color_a = primary;
            self.dash.color = primary;
            self.left_door.color = primary;
            self.right_door.color = primary;
        }

        let secondary = setting
            .color_b
            .as_ref()
            .and_then(|color| color.hex.as_deref())
            .and_then(Rgb::parse_hex);
        if let Some(secondary) = secondary {
            self.uniforms.color_b = secondary;
        } else if let Some(primary) = primary {
            let (dh, ds, dl) = SECONDARY_HSL_OFFSET;
            self.uniforms.color_b = primary.offset_hsl(dh, ds, dl);
        }

        let ratio = setting.brightness / 100.0;
        self.uniforms.brightness = ratio;
        self.dash.intensity = DASH_BASE_INTENSITY * ratio;
        self.left_door.intensity = DOOR_BASE_INTENSITY * ratio;
        self.right_door.intensity = DOOR_BASE_INTENSITY * ratio;

        self.uniforms.speed = setting.speed.unwrap_or_else(|| mode_speed(setting.mode));
        if let Some(sharpness) = setting.sharpness {
            self.uniforms.sharpness = sharpness;
        }
    }

    pub fn tick(&mut self, delta: f64) {
        self.uniforms.time += delta;
    }

    /// Strip color at coordinate `u` (0..1 along the strip) for the current time.
    pub fn sample(&self, u: f64) -> Rgb {
        let uniforms = &self.uniforms;
        let wave = (u * TAU + uniforms.time * uniforms.speed).sin();
        let wave = ((wave + 1.0) * 0.5).powf(uniforms.sharpness);
        Rgb::mix(uniforms.color_a, uniforms.color_b, wave).scale(0.5 + 0.5 * uniforms.brightness)
    }
}
