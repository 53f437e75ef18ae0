//! Interactive console input

/// One line typed at the console prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// `analyze <question>`
    Analyze(String),
    /// `xrun <command>`: run and record in the session history
    Xrun(String),
    /// `history`
    History,
    /// `quit`, `exit` or end of input
    Quit,
    /// Any other debugger command
    Command(String),
    /// Blank line
    Empty,
    /// A console command used without its argument
    Usage(&'static str),
}

pub const ANALYZE_USAGE: &str = "Usage: analyze <question>\n\nExample: analyze \"Why did the program crash?\"";
pub const XRUN_USAGE: &str = "No arguments provided for xrun command";

impl ConsoleInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word {
            "" => ConsoleInput::Empty,
            "quit" | "exit" | "q" if rest.is_empty() => ConsoleInput::Quit,
            "history" if rest.is_empty() => ConsoleInput::History,
            "analyze" if rest.is_empty() => ConsoleInput::Usage(ANALYZE_USAGE),
            "analyze" => ConsoleInput::Analyze(unquote(rest).to_string()),
            "xrun" if rest.is_empty() => ConsoleInput::Usage(XRUN_USAGE),
            "xrun" => ConsoleInput::Xrun(rest.to_string()),
            _ => ConsoleInput::Command(line.to_string()),
        }
    }
}

/// Drop one pair of surrounding quotes
fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}
