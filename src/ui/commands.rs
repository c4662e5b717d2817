use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Exit,
    Clear,
    Key(String),
    Validate,
    Models,
    Model(String),
    Status,
    Message(String),
}

impl FromStr for Command {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (head, rest) = match s.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (s, ""),
        };
        Ok(match (head.to_lowercase().as_str(), rest) {
            ("exit", "") => Command::Exit,
            ("clear", "") => Command::Clear,
            ("/validate", "") => Command::Validate,
            ("/models", "") => Command::Models,
            ("/status", "") => Command::Status,
            ("/key", key) if !key.is_empty() => Command::Key(key.to_string()),
            ("/model", model) if !model.is_empty() => Command::Model(model.to_string()),
            _ => Command::Message(s.to_string()),
        })
    }
}

pub const COMMAND_BOX: &str = "\
┌──────────────────────────────────────┐\n\
│          Available Commands          │\n\
├──────────────────────────────────────┤\n\
│  `exit`        - Quit                │\n\
│  `clear`       - Start over          │\n\
├──────────────────────────────────────┤\n\
│  `/key <key>`  - Use another API key │\n\
│  `/validate`   - Check the API key   │\n\
│  `/status`     - Check API status    │\n\
├──────────────────────────────────────┤\n\
│  `/models`     - List models         │\n\
│  `/model <id>` - Switch model        │\n\
└──────────────────────────────────────┘";
