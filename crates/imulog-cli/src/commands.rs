//! Operator commands read from stdin

use std::str::FromStr;

/// One operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Start a new session, or stop and export the active one
    ToggleRecord,
    /// Pause or resume the active session
    TogglePause,
    /// Set the name the next sealed session is exported under
    SetName(String),
    /// Print recorder state and counters
    Status,
    /// Re-export sessions whose export failed
    Retry,
    /// Print the command list
    Help,
    /// Stop capturing and exit
    Quit,
}

pub const HELP: &str = "\
commands:
  r, record       start recording / stop and export
  p, pause        pause / resume the active recording
  n, name <name>  set the session (file) name
  s, status       show state and counters
  retry           re-export sessions that failed to save
  h, help         show this list
  q, quit         stop and exit (an active recording is exported)";

impl FromStr for OperatorCommand {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let (word, rest) = match input.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (input, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "r" | "record" => Ok(Self::ToggleRecord),
            "p" | "pause" => Ok(Self::TogglePause),
            "n" | "name" if rest.is_empty() => Err("usage: name <session name>".to_string()),
            "n" | "name" => Ok(Self::SetName(rest.to_string())),
            "s" | "status" => Ok(Self::Status),
            "retry" => Ok(Self::Retry),
            "h" | "help" | "?" => Ok(Self::Help),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            "" => Err(String::new()),
            other => Err(format!("unknown command '{}' (try 'help')", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_commands() {
        let parse = |s: &str| s.parse::<OperatorCommand>();
        assert_eq!(parse("r"), Ok(OperatorCommand::ToggleRecord));
        assert_eq!(parse(" PAUSE "), Ok(OperatorCommand::TogglePause));
        assert_eq!(
            parse("name  bench run 2"),
            Ok(OperatorCommand::SetName("bench run 2".to_string()))
        );
        assert_eq!(parse("q"), Ok(OperatorCommand::Quit));
        assert_eq!(parse("retry"), Ok(OperatorCommand::Retry));
    }

    #[test]
    fn test_parse_errors() {
        assert!("name".parse::<OperatorCommand>().is_err());
        assert!("jump".parse::<OperatorCommand>().is_err());
        assert_eq!("".parse::<OperatorCommand>(), Err(String::new()));
    }
}
