//! Stdin control commands

use std::str::FromStr;

use workmate_core::CharacterState;

/// One line of player input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Move the character to a state
    State(CharacterState),
    /// Start the focus timer
    Start,
    /// Pause the focus timer
    Pause,
    /// Start or pause the focus timer
    Toggle,
    /// Reset the focus timer
    Reset,
    /// Print the companion status
    Status,
    /// Exit the player
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim().to_ascii_lowercase();
        match word.as_str() {
            "start" => Ok(Self::Start),
            "pause" => Ok(Self::Pause),
            "toggle" => Ok(Self::Toggle),
            "reset" => Ok(Self::Reset),
            "status" | "" => Ok(Self::Status),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => other
                .parse::<CharacterState>()
                .map(Self::State)
                .map_err(|_| format!("unknown command '{other}'")),
        }
    }
}

/// Help text listing every command
pub const HELP: &str =
    "commands: work | break | away | slacking | start | pause | toggle | reset | status | quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("start".parse(), Ok(Command::Start));
        assert_eq!(" Toggle \n".parse(), Ok(Command::Toggle));
        assert_eq!("".parse(), Ok(Command::Status));
        assert_eq!("q".parse(), Ok(Command::Quit));
        assert_eq!(
            "slacking".parse(),
            Ok(Command::State(CharacterState::Slacking))
        );
        assert_eq!("BREAK".parse(), Ok(Command::State(CharacterState::Break)));
    }

    #[test]
    fn test_unknown_command() {
        let err = "dance".parse::<Command>().unwrap_err();
        assert!(err.contains("dance"));
    }
}
