use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::enums::{LightMode, MassageMode, MassageZone, NarrativeEmotion, SafetyMode, ScentType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BpmRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicRecommendation {
    #[serde(default)]
    pub songs: Vec<Song>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm_range: Option<BpmRange>,
}

/// A song with a resolved playback address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

impl PlayResult {
    pub fn playable_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(default)]
    pub songs: Vec<PlayResult>,
    #[serde(default)]
    pub current_index: usize,
}

impl Playlist {
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightColor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    /// Kelvin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<u32>,
}

impl LightColor {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self {
            hex: Some(hex.into()),
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSetting {
    pub zone: String,
    /// `#RRGGBB`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub brightness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightSetting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<LightColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_b: Option<LightColor>,
    /// 0-100.
    #[serde(default)]
    pub brightness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<LightMode>,
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<ZoneSetting>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharpness: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    pub text: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_narrative_speed")]
    pub speed: f64,
    #[serde(default = "default_narrative_volume")]
    pub volume: f64,
    #[serde(default = "default_emotion", deserialize_with = "lenient_emotion")]
    pub emotion: NarrativeEmotion,
}

pub const DEFAULT_NARRATIVE_VOLUME: f64 = 0.8;

fn default_voice() -> String {
    "default".to_string()
}

fn default_narrative_speed() -> f64 {
    1.0
}

fn default_narrative_volume() -> f64 {
    DEFAULT_NARRATIVE_VOLUME
}

fn default_emotion() -> NarrativeEmotion {
    NarrativeEmotion::Calm
}

/// Unknown or null emotions fall back to the default instead of failing the
/// whole narrative.
fn lenient_emotion<'de, D>(deserializer: D) -> Result<NarrativeEmotion, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref().and_then(NarrativeEmotion::parse) {
        Some(emotion) => emotion,
        None => {
            if let Some(raw) = raw {
                log::debug!("unknown narrative emotion '{raw}', using default");
            }
            default_emotion()
        }
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScentSetting {
    #[serde(rename = "type")]
    pub scent_type: ScentType,
    /// 0-10, 0 disables emission.
    #[serde(default)]
    pub intensity: u32,
    #[serde(default)]
    pub duration_minutes: u32,
}

impl ScentSetting {
    pub fn is_off(&self) -> bool {
        self.scent_type == ScentType::None || self.intensity == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassageSetting {
    pub mode: MassageMode,
    #[serde(default)]
    pub zones: Vec<MassageZone>,
    #[serde(default)]
    pub intensity: u32,
}

/// Recommendation bundle produced by one analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbiencePlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music: Option<MusicRecommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<LightSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<Narrative>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scent: Option<ScentSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub massage: Option<MassageSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<Playlist>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_result: Option<PlayResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_mode: Option<SafetyMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl AmbiencePlan {
    /// True when the plan carries no music, light, narrative or scent.
    pub fn is_stimulus_free(&self) -> bool {
        self.music.is_none()
            && self.light.is_none()
            && self.narrative.is_none()
            && self.scent.is_none()
    }
}

/// Plan field a tool result is merged into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanField {
    Light,
    Scent,
    Massage,
    Playlist,
    PlayResult,
    Narrative,
}

impl PlanField {
    pub fn for_tool(tool_name: &str) -> Option<Self> {
        match tool_name {
            "setLight" => Some(PlanField::Light),
            "setScent" => Some(PlanField::Scent),
            "setMassage" => Some(PlanField::Massage),
            "batchPlayMusic" => Some(PlanField::Playlist),
            "playMusic" => Some(PlanField::PlayResult),
            "generateNarrative" => Some(PlanField::Narrative),
            _ => None,
        }
    }

    /// Returns a copy of `plan` with `value` decoded into this field.
    pub fn merged(&self, plan: &AmbiencePlan, value: Value) -> serde_json::Result<AmbiencePlan> {
        let mut next = plan.clone();
        match self {
            PlanField::Light => next.light = Some(serde_json::from_value(value)?),
            PlanField::Scent => next.scent = Some(serde_json::from_value(value)?),
            PlanField::Massage => next.massage = Some(serde_json::from_value(value)?),
            PlanField::Playlist => next.playlist = Some(serde_json::from_value(value)?),
            PlanField::PlayResult => next.play_result = Some(serde_json::from_value(value)?),
            PlanField::Narrative => next.narrative = Some(serde_json::from_value(value)?),
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AmbiencePlan, PlanField};
    use crate::models::{LightMode, NarrativeEmotion, ScentType};

    #[test]
    fn tool_names_map_to_plan_fields() {
        assert_eq!(PlanField::for_tool("setLight"), Some(PlanField::Light));
        assert_eq!(PlanField::for_tool("batchPlayMusic"), Some(PlanField::Playlist));
        assert_eq!(PlanField::for_tool("playMusic"), Some(PlanField::PlayResult));
        assert_eq!(PlanField::for_tool("searchMusic"), None);
    }

    #[test]
    fn merge_light_keeps_other_fields() -> anyhow::Result<()> {
        let base = AmbiencePlan {
            reasoning: Some("quiet road".to_string()),
            ..AmbiencePlan::default()
        };
        let merged = PlanField::Light.merged(
            &base,
            json!({"color":{"hex":"#ff0000"},"brightness":50,"mode":"PULSE","transitionDuration":1}),
        )?;
        let light = merged.light.as_ref().expect("light merged");
        assert_eq!(
            light.color.as_ref().and_then(|color| color.hex.as_deref()),
            Some("#ff0000")
        );
        assert_eq!(light.brightness, 50.0);
        assert_eq!(light.mode, Some(LightMode::Pulse));
        assert_eq!(merged.reasoning.as_deref(), Some("quiet road"));
        assert!(base.light.is_none());
        Ok(())
    }

    #[test]
    fn plan_with_only_massage_is_stimulus_free() -> anyhow::Result<()> {
        let plan: AmbiencePlan = serde_json::from_value(json!({
            "id": "p-1",
            "massage": {"mode": "RELAX", "zones": ["BACK"], "intensity": 3},
            "safetyMode": "L3_SILENT",
        }))?;
        assert!(plan.is_stimulus_free());

        let scented = PlanField::Scent.merged(
            &plan,
            json!({"type": "LAVENDER", "intensity": 4, "durationMinutes": 20}),
        )?;
        assert!(!scented.is_stimulus_free());
        assert_eq!(
            scented.scent.as_ref().map(|scent| scent.scent_type),
            Some(ScentType::Lavender)
        );
        Ok(())
    }

    #[test]
    fn narrative_defaults_fill_missing_fields() -> anyhow::Result<()> {
        let plan = PlanField::Narrative.merged(&AmbiencePlan::default(), json!({"text": "hello"}))?;
        let narrative = plan.narrative.expect("narrative merged");
        assert_eq!(narrative.voice, "default");
        assert_eq!(narrative.volume, 0.8);
        Ok(())
    }

    #[test]
    fn backend_light_with_string_zone_colors_merges() -> anyhow::Result<()> {
        let merged = PlanField::Light.merged(
            &AmbiencePlan::default(),
            json!({
                "color": {"hex": "#87CEEB", "temperature": null},
                "colorB": {"hex": "#ADD8E6", "temperature": null},
                "brightness": 60,
                "mode": "GRADIENT",
                "speed": 1.5,
                "sharpness": 3.0,
                "transitionDuration": 1500,
                "zones": [
                    {"zone": "dashboard", "color": "#87CEEB", "brightness": 60},
                    {"zone": "door", "color": "#87CEEB", "brightness": 50},
                    {"zone": "footwell", "color": "#87CEEB", "brightness": 40}
                ]
            }),
        )?;
        let light = merged.light.expect("light merged");
        let zones = light.zones.expect("zones kept");
        assert_eq!(zones.len(), 3);
        assert_eq!(zones[1].zone, "door");
        assert_eq!(zones[1].color.as_deref(), Some("#87CEEB"));
        assert_eq!(zones[2].brightness, 40.0);
        Ok(())
    }

    #[test]
    fn narrative_emotion_accepts_backend_names_and_tolerates_unknown() -> anyhow::Result<()> {
        let romantic = PlanField::Narrative.merged(
            &AmbiencePlan::default(),
            json!({"text": "sea breeze", "emotion": "ROMANTIC"}),
        )?;
        assert_eq!(
            romantic.narrative.map(|narrative| narrative.emotion),
            Some(NarrativeEmotion::Romantic)
        );

        let plan: AmbiencePlan = serde_json::from_value(json!({
            "id": "p-2",
            "narrative": {"text": "hi", "emotion": "MELANCHOLIC"}
        }))?;
        assert_eq!(plan.id.as_deref(), Some("p-2"));
        assert_eq!(
            plan.narrative.map(|narrative| narrative.emotion),
            Some(NarrativeEmotion::Calm)
        );
        Ok(())
    }
}
