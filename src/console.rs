use std::io::{self, BufRead, Write};

/// How a console message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    General,
    Info,
    Warning,
    Error,
}

/// User-facing console used for notifications and yes/no prompts.
pub trait Console {
    fn print(&self, message: &str, style: Style);
    fn input(&self, prompt: &str) -> String;
}

/// Console backed by the process stdout/stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn print(&self, message: &str, style: Style) {
        let prefix = match style {
            Style::General => "",
            Style::Info => "[info] ",
            Style::Warning => "[warning] ",
            Style::Error => "[error] ",
        };
        println!("{prefix}{message}");
    }

    fn input(&self, prompt: &str) -> String {
        print!("{prompt}");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return String::new();
        }
        line.trim_end_matches(['\r', '\n']).to_string()
    }
}
