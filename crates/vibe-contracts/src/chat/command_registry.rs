#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose argument sets one environment field.
pub(crate) const ENVIRONMENT_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "speed",
        action: "set_speed",
    },
    CommandSpec {
        command: "mood",
        action: "set_mood",
    },
    CommandSpec {
        command: "weather",
        action: "set_weather",
    },
    CommandSpec {
        command: "time",
        action: "set_time_of_day",
    },
    CommandSpec {
        command: "gps",
        action: "set_gps_tag",
    },
    CommandSpec {
        command: "route",
        action: "set_route",
    },
    CommandSpec {
        command: "passengers",
        action: "set_passengers",
    },
];

/// Commands that pass the remainder of the line through as `text`.
pub(crate) const RAW_TEXT_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "describe",
        action: "generate_environment",
    },
    CommandSpec {
        command: "say",
        action: "speak",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "analyze",
        action: "analyze_stream",
    },
    CommandSpec {
        command: "analyze_sync",
        action: "analyze",
    },
    CommandSpec {
        command: "reset",
        action: "reset_session",
    },
    CommandSpec {
        command: "next",
        action: "play_next",
    },
    CommandSpec {
        command: "prev",
        action: "play_previous",
    },
    CommandSpec {
        command: "pause",
        action: "toggle_audio",
    },
    CommandSpec {
        command: "hush",
        action: "stop_speech",
    },
    CommandSpec {
        command: "theme",
        action: "toggle_theme",
    },
    CommandSpec {
        command: "plan",
        action: "show_plan",
    },
    CommandSpec {
        command: "steps",
        action: "show_steps",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
];

pub(crate) const SCENARIO_COMMAND: CommandSpec = CommandSpec {
    command: "scenario",
    action: "load_scenario",
};

pub(crate) const PLAY_COMMAND: CommandSpec = CommandSpec {
    command: "play",
    action: "play_song_at",
};

pub(crate) const FEEDBACK_COMMAND: CommandSpec = CommandSpec {
    command: "feedback",
    action: "feedback",
};

pub const DRIVE_HELP_COMMANDS: &[&str] = &[
    "/speed <km/h>",
    "/mood <HAPPY|CALM|TIRED|STRESSED|EXCITED>",
    "/weather <SUNNY|CLOUDY|RAINY|SNOWY|FOGGY>",
    "/time <DAWN|MORNING|NOON|AFTERNOON|EVENING|NIGHT|MIDNIGHT>",
    "/gps <tag>",
    "/route <type>",
    "/passengers <1-7>",
    "/scenario [LATE_NIGHT_RETURN|WEEKEND_FAMILY_TRIP|MORNING_COMMUTE|RANDOM]",
    "/describe <free text>",
    "/analyze",
    "/analyze_sync",
    "/reset",
    "/play <index>",
    "/next",
    "/prev",
    "/pause",
    "/say <text>",
    "/hush",
    "/feedback <like|dislike|skip> [comment]",
    "/theme",
    "/plan",
    "/steps",
    "/status",
    "/help",
    "/quit",
];
