mod enums;
mod environment;
mod plan;
mod thinking;

pub use enums::{
    AnalyzeAction, FeedbackType, GpsTag, LightMode, MassageMode, MassageZone, NarrativeEmotion,
    RouteType, SafetyMode, ScenarioType, ScentType, TimeOfDay, UserMood, Weather,
    FOCUS_SPEED_KMH, SILENT_SPEED_KMH,
};
pub use environment::{DriverBiometrics, Environment, EnvironmentPatch, LocationInfo, PoiInfo};
pub use plan::{
    AmbiencePlan, BpmRange, LightColor, LightSetting, MassageSetting, MusicRecommendation,
    Narrative, PlanField, PlayResult, Playlist, ScentSetting, Song, ZoneSetting,
    DEFAULT_NARRATIVE_VOLUME,
};
pub use thinking::{ChatMessage, ChatRole, StepKind, ThinkingStep, ToolCall};
