//! Parsing of interactive input lines into loop commands.

/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Exit,
    Help,
    Project(String),
    List,
    Cat(String),
    Exec(String),
    /// A known command missing its argument; carries the usage line.
    Usage(&'static str),
    Unknown(String),
    /// Anything that is not a `!` command goes to the model.
    Prompt(String),
    Blank,
}

pub const HELP: &str = "\
Available commands:
!project <name>  - Set or create a project
!list            - List files in the current project
!cat <file>      - Show the content of a file
!exec <command>  - Execute a shell command
!help            - Show this help message

For any other input, the assistant will process it as a coding task.";

pub fn parse_command(input: &str) -> ReplCommand {
    let input = input.trim();
    if input.is_empty() {
        return ReplCommand::Blank;
    }
    if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "bye") {
        return ReplCommand::Exit;
    }
    let Some(rest) = input.strip_prefix('!') else {
        return ReplCommand::Prompt(input.to_string());
    };

    let rest = rest.trim();
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };
    let arg = arg.map(str::to_string);

    match name.to_lowercase().as_str() {
        "project" => arg.map_or(ReplCommand::Usage("!project <project_name>"), ReplCommand::Project),
        "list" => ReplCommand::List,
        "cat" => arg.map_or(ReplCommand::Usage("!cat <file_path>"), ReplCommand::Cat),
        "exec" => arg.map_or(ReplCommand::Usage("!exec <shell_command>"), ReplCommand::Exec),
        "help" => ReplCommand::Help,
        _ => ReplCommand::Unknown(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_words_are_case_insensitive() {
        assert_eq!(parse_command("Quit"), ReplCommand::Exit);
        assert_eq!(parse_command("  bye "), ReplCommand::Exit);
    }

    #[test]
    fn bang_commands_take_rest_of_line() {
        assert_eq!(
            parse_command("!exec npm install  --save express"),
            ReplCommand::Exec("npm install  --save express".to_string())
        );
        assert_eq!(
            parse_command("!PROJECT todo"),
            ReplCommand::Project("todo".to_string())
        );
        assert_eq!(parse_command("!list"), ReplCommand::List);
    }

    #[test]
    fn missing_argument_reports_usage() {
        assert_eq!(
            parse_command("!cat   "),
            ReplCommand::Usage("!cat <file_path>")
        );
        assert_eq!(
            parse_command("!project"),
            ReplCommand::Usage("!project <project_name>")
        );
    }

    #[test]
    fn unknown_and_prompt() {
        assert_eq!(parse_command("!deploy now"), ReplCommand::Unknown("deploy".to_string()));
        assert_eq!(
            parse_command("build a flask app"),
            ReplCommand::Prompt("build a flask app".to_string())
        );
        assert_eq!(parse_command("   "), ReplCommand::Blank);
    }
}
