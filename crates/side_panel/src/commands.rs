#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    /// `/key <secret>`; an empty secret removes the stored credential.
    Key(String),
    Models,
    Model(String),
    Lang(String),
    Select(String),
    Clear,
    Reload,
    Quit,
    Unknown(String),
}

pub const HELP_TEXT: &str = "Commands: /help, /key <secret>, /models, /model <id>, /lang <language>, /select <text>, /clear, /reload, /quit";

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, argument) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (trimmed, ""),
    };

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/key" => SlashCommand::Key(argument.to_string()),
        "/models" => SlashCommand::Models,
        "/model" => SlashCommand::Model(argument.to_string()),
        "/lang" => SlashCommand::Lang(argument.to_string()),
        "/select" => SlashCommand::Select(argument.to_string()),
        "/clear" => SlashCommand::Clear,
        "/reload" => SlashCommand::Reload,
        "/quit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}
