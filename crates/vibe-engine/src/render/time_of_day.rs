use vibe_contracts::models::TimeOfDay;

use super::color::Rgb;

/// Below this elevation the sky dome is hidden and the flat background shows.
pub const SKY_HIDDEN_BELOW_DEG: f64 = -10.0;
/// Below this elevation the headlights are switched on.
pub const HEADLIGHTS_BELOW_DEG: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeLighting {
    pub ambient: Rgb,
    pub ambient_intensity: f64,
    pub sun: Rgb,
    pub sun_intensity: f64,
    pub sun_position: [f64; 3],
    pub background: Rgb,
    pub sky_elevation: f64,
    pub sky_azimuth: f64,
}

impl TimeLighting {
    pub fn for_time(time: TimeOfDay) -> Self {
        let (ambient, ambient_intensity, sun, sun_intensity, sun_position, background, elevation, azimuth) =
            match time {
                TimeOfDay::Dawn => (0xffeedd, 0.3, 0xff8844, 0.4, [-3.0, 1.0, -5.0], 0x1a1520, 5.0, 180.0),
                TimeOfDay::Morning => (0xffffff, 0.5, 0xffffee, 0.6, [-2.0, 3.0, -4.0], 0x202530, 30.0, 180.0),
                TimeOfDay::Noon => (0xffffff, 0.7, 0xffffff, 0.8, [0.0, 5.0, -3.0], 0x303540, 80.0, 180.0),
                TimeOfDay::Afternoon => (0xffffff, 0.6, 0xffffdd, 0.7, [2.0, 3.0, -4.0], 0x252535, 50.0, 200.0),
                TimeOfDay::Evening => (0xffddcc, 0.4, 0xff6633, 0.5, [3.0, 1.0, -5.0], 0x1a1015, 10.0, 250.0),
                TimeOfDay::Night => (0x334455, 0.15, 0x111122, 0.05, [0.0, -2.0, -5.0], 0x020204, -30.0, 270.0),
                TimeOfDay::Midnight => (0x223344, 0.1, 0x111111, 0.02, [0.0, -3.0, -5.0], 0x010102, -30.0, 270.0),
            };
        Self {
            ambient: Rgb::from_u32(ambient),
            ambient_intensity,
            sun: Rgb::from_u32(sun),
            sun_intensity,
            sun_position,
            background: Rgb::from_u32(background),
            sky_elevation: elevation,
            sky_azimuth: azimuth,
        }
    }

    pub fn sky_visible(&self) -> bool {
        self.sky_elevation >= SKY_HIDDEN_BELOW_DEG
    }

    pub fn headlights_on(&self) -> bool {
        self.sky_elevation < HEADLIGHTS_BELOW_DEG
    }

    /// Unit vector toward the sun on the sky dome.
    pub fn sun_direction(&self) -> [f64; 3] {
        let phi = (90.0 - self.sky_elevation).to_radians();
        let theta = self.sky_azimuth.to_radians();
        [
            phi.sin() * theta.sin(),
            phi.cos(),
            phi.sin() * theta.cos(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct TimeOfDayRenderer {
    time: TimeOfDay,
    lighting: TimeLighting,
}

impl Default for TimeOfDayRenderer {
    fn default() -> Self {
        Self {
            time: TimeOfDay::Noon,
            lighting: TimeLighting::for_time(TimeOfDay::Noon),
        }
    }
}

impl TimeOfDayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time(&self) -> TimeOfDay {
        self.time
    }

    pub fn lighting(&self) -> &TimeLighting {
        &self.lighting
    }

    pub fn update(&mut self, time: TimeOfDay) {
        if time != self.time {
            log::debug!("time of day {} -> {}", self.time.as_str(), time.as_str());
        }
        self.time = time;
        self.lighting = TimeLighting::for_time(time);
    }
}

#[cfg(test)]
mod tests {
    use vibe_contracts::models::TimeOfDay;

    use super::{TimeLighting, TimeOfDayRenderer};

    #[test]
    fn starts_at_noon() {
        let renderer = TimeOfDayRenderer::new();
        assert_eq!(renderer.time(), TimeOfDay::Noon);
        assert_eq!(renderer.lighting().ambient_intensity, 0.7);
        assert!(renderer.lighting().sky_visible());
        assert!(!renderer.lighting().headlights_on());
    }

    #[test]
    fn night_hides_sky_and_turns_on_headlights() {
        let mut renderer = TimeOfDayRenderer::new();
        renderer.update(TimeOfDay::Night);
        let lighting = renderer.lighting();
        assert!(!lighting.sky_visible());
        assert!(lighting.headlights_on());
        assert_eq!(lighting.background.to_hex(), "#020204");
    }

    #[test]
    fn evening_keeps_sky_with_headlights() {
        let lighting = TimeLighting::for_time(TimeOfDay::Evening);
        assert!(lighting.sky_visible());
        assert!(lighting.headlights_on());
        assert_eq!(lighting.sun.to_hex(), "#ff6633");
    }

    #[test]
    fn sun_direction_follows_elevation() {
        let noon = TimeLighting::for_time(TimeOfDay::Noon).sun_direction();
        assert!(noon[1] > 0.98);
        let length = noon.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((length - 1.0).abs() < 1e-9);

        let midnight = TimeLighting::for_time(TimeOfDay::Midnight).sun_direction();
        assert!(midnight[1] < 0.0);
    }
}
