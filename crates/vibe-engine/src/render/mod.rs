//! Projections of the plan onto the car-interior scene.
//!
//! Each renderer owns its engine-facing state, is re-applied when its input
//! setting changes and is advanced once per frame through `tick`.

mod color;
mod light;
mod scent;
mod screen;
mod time_of_day;

pub use color::Rgb;
pub use light::{mode_speed, AreaLight, LightRenderer, StripUniforms};
pub use scent::{scent_style, spawn_count, LabelSprite, Particle, ScentRenderer, ScentStyle};
pub use screen::{format_time, measure_text, DrawOp, NowPlaying, ScreenRenderer};
pub use time_of_day::{TimeLighting, TimeOfDayRenderer};

use vibe_contracts::models::{LightSetting, ScentSetting, TimeOfDay};

use crate::store::VibeStore;

/// Every renderer of the interior, fed from one store.
#[derive(Default)]
pub struct AmbienceScene {
    pub light: LightRenderer,
    pub scent: ScentRenderer,
    pub screen: ScreenRenderer,
    pub time_of_day: TimeOfDayRenderer,
    applied: Applied,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Applied {
    light: Option<LightSetting>,
    scent: Option<ScentSetting>,
    song: Option<NowPlaying>,
    progress: Option<f64>,
    time: Option<TimeOfDay>,
}

impl AmbienceScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-applies the settings that differ from the last sync.
    ///
    /// A plan without a light keeps the strip as it is; a missing scent turns
    /// the emitter off.
    pub fn sync(&mut self, store: &VibeStore) {
        let plan = store.plan();
        let light = plan.as_ref().and_then(|plan| plan.light.clone());
        if light != self.applied.light {
            if let Some(setting) = &light {
                self.light.apply(setting);
            }
            self.applied.light = light;
        }

        let scent = plan.as_ref().and_then(|plan| plan.scent.clone());
        if scent != self.applied.scent {
            self.scent.apply(scent.as_ref());
            self.applied.scent = scent;
        }

        let song = store.now_playing().as_ref().map(NowPlaying::from);
        if song != self.applied.song {
            self.screen.update_song(song.clone());
            self.applied.song = song;
            self.applied.progress = None;
        }

        let progress = store.audio_progress() / 100.0;
        if self.applied.progress != Some(progress) {
            self.screen.update_progress(progress);
            self.applied.progress = Some(progress);
        }

        let time = store.environment().map(|environment| environment.time_of_day);
        if time != self.applied.time {
            if let Some(time) = time {
                self.time_of_day.update(time);
            }
            self.applied.time = time;
        }
    }

    pub fn tick(&mut self, delta: f64) {
        self.light.tick(delta);
        self.scent.tick(delta);
        self.screen.tick(delta);
    }
}
