use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, ENVIRONMENT_COMMANDS, FEEDBACK_COMMAND, NO_ARG_COMMANDS, PLAY_COMMAND,
    RAW_TEXT_COMMANDS, SCENARIO_COMMAND,
};
use crate::models::{
    EnvironmentPatch, FeedbackType, GpsTag, RouteType, ScenarioType, TimeOfDay, UserMood, Weather,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub message: Option<String>,
    pub environment_update: Option<EnvironmentPatch>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            message: None,
            environment_update: None,
            command_args: BTreeMap::new(),
        }
    }

    fn invalid(raw: &str, command: &str, reason: String) -> Self {
        let mut intent = Intent::new("invalid", raw);
        intent
            .command_args
            .insert("command".to_string(), Value::String(command.to_string()));
        intent
            .command_args
            .insert("reason".to_string(), Value::String(reason));
        intent
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn split_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg.split_whitespace().map(str::to_string).collect(),
    }
}

fn environment_patch(action: &str, arg: &str) -> Result<EnvironmentPatch, String> {
    let mut patch = EnvironmentPatch::default();
    match action {
        "set_speed" => {
            let speed: f64 = arg
                .parse()
                .map_err(|_| format!("'{arg}' is not a speed in km/h"))?;
            if !(0.0..=200.0).contains(&speed) {
                return Err(format!("speed {speed} outside 0-200 km/h"));
            }
            patch.speed = Some(speed);
        }
        "set_passengers" => {
            let count: u32 = arg
                .parse()
                .map_err(|_| format!("'{arg}' is not a passenger count"))?;
            if !(1..=7).contains(&count) {
                return Err(format!("passenger count {count} outside 1-7"));
            }
            patch.passenger_count = Some(count);
        }
        "set_mood" => patch.user_mood = Some(parse_enum(arg, UserMood::parse)?),
        "set_weather" => patch.weather = Some(parse_enum(arg, Weather::parse)?),
        "set_time_of_day" => patch.time_of_day = Some(parse_enum(arg, TimeOfDay::parse)?),
        "set_gps_tag" => patch.gps_tag = Some(parse_enum(arg, GpsTag::parse)?),
        "set_route" => patch.route_type = Some(parse_enum(arg, RouteType::parse)?),
        _ => return Err(format!("unsupported environment action '{action}'")),
    }
    Ok(patch)
}

fn parse_enum<T>(arg: &str, parse: fn(&str) -> Option<T>) -> Result<T, String> {
    parse(arg).ok_or_else(|| format!("unknown value '{arg}'"))
}

pub fn parse_command(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, ENVIRONMENT_COMMANDS) {
                return match environment_patch(action, arg) {
                    Ok(patch) => {
                        let mut intent = Intent::new(action, text);
                        intent.environment_update = Some(patch);
                        intent
                    }
                    Err(reason) => Intent::invalid(text, &command, reason),
                };
            }

            if let Some(action) = find_action(&command, RAW_TEXT_COMMANDS) {
                if arg.is_empty() {
                    return Intent::invalid(text, &command, "missing text".to_string());
                }
                let mut intent = Intent::new(action, text);
                intent.message = Some(arg.to_string());
                return intent;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            if command == SCENARIO_COMMAND.command {
                let scenario = if arg.is_empty() {
                    ScenarioType::Random
                } else {
                    match ScenarioType::parse(arg) {
                        Some(value) => value,
                        None => {
                            return Intent::invalid(
                                text,
                                &command,
                                format!("unknown scenario '{arg}'"),
                            )
                        }
                    }
                };
                let mut intent = Intent::new(SCENARIO_COMMAND.action, text);
                intent.command_args.insert(
                    "scenario".to_string(),
                    Value::String(scenario.as_str().to_string()),
                );
                return intent;
            }

            if command == PLAY_COMMAND.command {
                return match arg.parse::<u64>() {
                    Ok(index) => {
                        let mut intent = Intent::new(PLAY_COMMAND.action, text);
                        intent
                            .command_args
                            .insert("index".to_string(), Value::from(index));
                        intent
                    }
                    Err(_) => Intent::invalid(text, &command, format!("'{arg}' is not a track index")),
                };
            }

            if command == FEEDBACK_COMMAND.command {
                let parts = split_args(arg);
                let Some(feedback_type) = parts.first().and_then(|head| FeedbackType::parse(head))
                else {
                    return Intent::invalid(
                        text,
                        &command,
                        "expected like, dislike or skip".to_string(),
                    );
                };
                let mut intent = Intent::new(FEEDBACK_COMMAND.action, text);
                intent.command_args.insert(
                    "type".to_string(),
                    Value::String(feedback_type.as_str().to_string()),
                );
                let comment = parts[1..].join(" ");
                intent.command_args.insert(
                    "comment".to_string(),
                    if comment.is_empty() {
                        Value::Null
                    } else {
                        Value::String(comment)
                    },
                );
                return intent;
            }

            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    let mut intent = Intent::new("chat", text);
    intent.message = Some(raw_trimmed.to_string());
    intent
}
