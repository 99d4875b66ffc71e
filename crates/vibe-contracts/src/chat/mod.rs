mod command_parser;
mod command_registry;

pub use command_parser::{parse_command, Intent};
pub use command_registry::DRIVE_HELP_COMMANDS;
