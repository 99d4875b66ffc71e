use serde::{Deserialize, Serialize};

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            /// Case-insensitive lookup by wire name.
            pub fn parse(raw: &str) -> Option<Self> {
                let normalized = raw.trim().to_ascii_uppercase().replace('-', "_");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|value| value.as_str() == normalized)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(GpsTag {
    Highway => "HIGHWAY",
    Tunnel => "TUNNEL",
    Bridge => "BRIDGE",
    Urban => "URBAN",
    Suburban => "SUBURBAN",
    Mountain => "MOUNTAIN",
    Coastal => "COASTAL",
    Parking => "PARKING",
});

wire_enum!(Weather {
    Sunny => "SUNNY",
    Cloudy => "CLOUDY",
    Rainy => "RAINY",
    Snowy => "SNOWY",
    Foggy => "FOGGY",
});

wire_enum!(UserMood {
    Happy => "HAPPY",
    Calm => "CALM",
    Tired => "TIRED",
    Stressed => "STRESSED",
    Excited => "EXCITED",
});

wire_enum!(TimeOfDay {
    Dawn => "DAWN",
    Morning => "MORNING",
    Noon => "NOON",
    Afternoon => "AFTERNOON",
    Evening => "EVENING",
    Night => "NIGHT",
    Midnight => "MIDNIGHT",
});

wire_enum!(RouteType {
    Highway => "HIGHWAY",
    Urban => "URBAN",
    Mountain => "MOUNTAIN",
    Coastal => "COASTAL",
    Tunnel => "TUNNEL",
});

wire_enum!(
    /// Three stimulus tiers derived from vehicle speed.
    SafetyMode {
        L1Normal => "L1_NORMAL",
        L2Focus => "L2_FOCUS",
        L3Silent => "L3_SILENT",
    }
);

wire_enum!(LightMode {
    Static => "STATIC",
    Breathing => "BREATHING",
    Gradient => "GRADIENT",
    Pulse => "PULSE",
});

wire_enum!(FeedbackType {
    Like => "LIKE",
    Dislike => "DISLIKE",
    Skip => "SKIP",
});

wire_enum!(NarrativeEmotion {
    Neutral => "NEUTRAL",
    Warm => "WARM",
    Energetic => "ENERGETIC",
    Romantic => "ROMANTIC",
    Adventurous => "ADVENTUROUS",
    Calm => "CALM",
    Gentle => "GENTLE",
});

wire_enum!(AnalyzeAction {
    Apply => "APPLY",
    NoAction => "NO_ACTION",
});

wire_enum!(ScenarioType {
    LateNightReturn => "LATE_NIGHT_RETURN",
    WeekendFamilyTrip => "WEEKEND_FAMILY_TRIP",
    MorningCommute => "MORNING_COMMUTE",
    Random => "RANDOM",
});

wire_enum!(ScentType {
    Lavender => "LAVENDER",
    Peppermint => "PEPPERMINT",
    Ocean => "OCEAN",
    Forest => "FOREST",
    Citrus => "CITRUS",
    Vanilla => "VANILLA",
    None => "NONE",
});

wire_enum!(MassageMode {
    Relax => "RELAX",
    Energize => "ENERGIZE",
    Comfort => "COMFORT",
    Sport => "SPORT",
    Off => "OFF",
});

wire_enum!(MassageZone {
    Back => "BACK",
    Lumbar => "LUMBAR",
    Shoulder => "SHOULDER",
    Thigh => "THIGH",
    All => "ALL",
});

/// Speed (km/h) at which the focus tier starts.
pub const FOCUS_SPEED_KMH: f64 = 60.0;
/// Speed (km/h) at which the silenced tier starts.
pub const SILENT_SPEED_KMH: f64 = 100.0;

impl SafetyMode {
    pub fn from_speed(speed: f64) -> Self {
        let speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
        if speed >= SILENT_SPEED_KMH {
            SafetyMode::L3Silent
        } else if speed >= FOCUS_SPEED_KMH {
            SafetyMode::L2Focus
        } else {
            SafetyMode::L1Normal
        }
    }

    pub fn allows_dynamic_lighting(&self) -> bool {
        matches!(self, SafetyMode::L1Normal)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SafetyMode::L1Normal => "normal",
            SafetyMode::L2Focus => "focus",
            SafetyMode::L3Silent => "silent",
        }
    }
}

impl Default for SafetyMode {
    fn default() -> Self {
        SafetyMode::L1Normal
    }
}

impl ScenarioType {
    pub fn label(&self) -> &'static str {
        match self {
            ScenarioType::LateNightReturn => "late night return",
            ScenarioType::WeekendFamilyTrip => "weekend family trip",
            ScenarioType::MorningCommute => "morning commute",
            ScenarioType::Random => "random",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LightMode, SafetyMode, ScentType};

    #[test]
    fn safety_mode_thresholds() {
        assert_eq!(SafetyMode::from_speed(0.0), SafetyMode::L1Normal);
        assert_eq!(SafetyMode::from_speed(59.0), SafetyMode::L1Normal);
        assert_eq!(SafetyMode::from_speed(59.9), SafetyMode::L1Normal);
        assert_eq!(SafetyMode::from_speed(60.0), SafetyMode::L2Focus);
        assert_eq!(SafetyMode::from_speed(99.0), SafetyMode::L2Focus);
        assert_eq!(SafetyMode::from_speed(100.0), SafetyMode::L3Silent);
        assert_eq!(SafetyMode::from_speed(180.0), SafetyMode::L3Silent);
        assert!(SafetyMode::L1Normal.allows_dynamic_lighting());
        assert!(!SafetyMode::L2Focus.allows_dynamic_lighting());
        assert_eq!(SafetyMode::L3Silent.display_name(), "silent");
    }

    #[test]
    fn safety_mode_negative_and_nan_speed_is_normal() {
        assert_eq!(SafetyMode::from_speed(-20.0), SafetyMode::L1Normal);
        assert_eq!(SafetyMode::from_speed(f64::NAN), SafetyMode::L1Normal);
    }

    #[test]
    fn wire_names_round_trip_through_serde() -> anyhow::Result<()> {
        let raw = serde_json::to_string(&SafetyMode::L3Silent)?;
        assert_eq!(raw, "\"L3_SILENT\"");
        let mode: LightMode = serde_json::from_str("\"BREATHING\"")?;
        assert_eq!(mode, LightMode::Breathing);
        Ok(())
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(ScentType::parse("lavender"), Some(ScentType::Lavender));
        assert_eq!(SafetyMode::parse("l2-focus"), Some(SafetyMode::L2Focus));
        assert_eq!(ScentType::parse("smoke"), None);
    }
}
