use serde::{Deserialize, Serialize};

use super::enums::{GpsTag, RouteType, SafetyMode, TimeOfDay, UserMood, Weather};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoiInfo {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub distance_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearby_pois: Option<Vec<PoiInfo>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverBiometrics {
    pub heart_rate: f64,
    pub stress_level: f64,
    pub fatigue_level: f64,
    pub body_temperature: f64,
}

/// Sensed or simulated driving context sent with every analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub gps_tag: GpsTag,
    pub weather: Weather,
    pub speed: f64,
    pub user_mood: UserMood,
    pub time_of_day: TimeOfDay,
    pub passenger_count: u32,
    pub route_type: RouteType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biometrics: Option<DriverBiometrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            gps_tag: GpsTag::Urban,
            weather: Weather::Sunny,
            speed: 0.0,
            user_mood: UserMood::Calm,
            time_of_day: TimeOfDay::Noon,
            passenger_count: 1,
            route_type: RouteType::Urban,
            biometrics: None,
            location: None,
            timestamp: None,
        }
    }
}

impl Environment {
    pub fn safety_mode(&self) -> SafetyMode {
        SafetyMode::from_speed(self.speed)
    }

    /// Shallow merge: every field present in `patch` replaces the current one.
    pub fn apply(&mut self, patch: &EnvironmentPatch) {
        if let Some(value) = patch.gps_tag {
            self.gps_tag = value;
        }
        if let Some(value) = patch.weather {
            self.weather = value;
        }
        if let Some(value) = patch.speed {
            self.speed = value;
        }
        if let Some(value) = patch.user_mood {
            self.user_mood = value;
        }
        if let Some(value) = patch.time_of_day {
            self.time_of_day = value;
        }
        if let Some(value) = patch.passenger_count {
            self.passenger_count = value;
        }
        if let Some(value) = patch.route_type {
            self.route_type = value;
        }
        if let Some(value) = &patch.biometrics {
            self.biometrics = Some(value.clone());
        }
        if let Some(value) = &patch.location {
            self.location = Some(value.clone());
        }
        if let Some(value) = &patch.timestamp {
            self.timestamp = Some(value.clone());
        }
    }
}

/// Partial environment used for incremental updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_tag: Option<GpsTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_mood: Option<UserMood>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passenger_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_type: Option<RouteType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biometrics: Option<DriverBiometrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl EnvironmentPatch {
    pub fn speed(value: f64) -> Self {
        Self {
            speed: Some(value),
            ..Self::default()
        }
    }
}

impl From<Environment> for EnvironmentPatch {
    fn from(env: Environment) -> Self {
        Self {
            gps_tag: Some(env.gps_tag),
            weather: Some(env.weather),
            speed: Some(env.speed),
            user_mood: Some(env.user_mood),
            time_of_day: Some(env.time_of_day),
            passenger_count: Some(env.passenger_count),
            route_type: Some(env.route_type),
            biometrics: env.biometrics,
            location: env.location,
            timestamp: env.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Environment, EnvironmentPatch};
    use crate::models::{SafetyMode, UserMood, Weather};

    #[test]
    fn environment_uses_camel_case_wire_names() -> anyhow::Result<()> {
        let env: Environment = serde_json::from_value(json!({
            "gpsTag": "HIGHWAY",
            "weather": "RAINY",
            "speed": 110,
            "userMood": "TIRED",
            "timeOfDay": "NIGHT",
            "passengerCount": 2,
            "routeType": "HIGHWAY",
        }))?;
        assert_eq!(env.weather, Weather::Rainy);
        assert_eq!(env.safety_mode(), SafetyMode::L3Silent);

        let back = serde_json::to_value(&env)?;
        assert_eq!(back["userMood"], json!("TIRED"));
        assert!(back.get("biometrics").is_none());
        Ok(())
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut env = Environment::default();
        env.apply(&EnvironmentPatch {
            speed: Some(72.0),
            user_mood: Some(UserMood::Happy),
            ..EnvironmentPatch::default()
        });
        assert_eq!(env.speed, 72.0);
        assert_eq!(env.user_mood, UserMood::Happy);
        assert_eq!(env.weather, Weather::Sunny);
        assert_eq!(env.passenger_count, 1);
    }
}
