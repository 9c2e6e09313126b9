//! Command-line parsing for the status-bar prompt.

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Quit,
    Load(String),
    /// Save to the current file, or to the given path
    Save(Option<String>),
    /// Anything that is not built in; dispatched to plugins
    Plugin { name: String, args: Vec<String> },
    /// A built-in command used with the wrong arguments
    Invalid(String),
}

/// Result of executing a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Nothing to report
    Continue,
    Quit,
    Message(String),
    /// Bytes returned by a plugin command, passed through uninterpreted
    PluginOutput(Vec<u8>),
    Error(String),
}

impl CommandOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, CommandOutcome::Error(_))
    }
}

/// Splits a command line on whitespace. Built-in names are matched first.
pub fn parse_command(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Command::Empty;
    };
    let args: Vec<String> = words.map(str::to_string).collect();

    match name {
        "quit" => Command::Quit,
        "load" => match args.as_slice() {
            [path] => Command::Load(path.clone()),
            _ => Command::Invalid(
                "the \"load\" command expects exactly one argument (without spaces)".to_string(),
            ),
        },
        "save" => match args.as_slice() {
            [] => Command::Save(None),
            [path] => Command::Save(Some(path.clone())),
            _ => Command::Invalid(
                "the \"save\" command expects at most one argument (without spaces)".to_string(),
            ),
        },
        _ => Command::Plugin {
            name: name.to_string(),
            args,
        },
    }
}
