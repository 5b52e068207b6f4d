//! Terminal implementations of the editor collaborators.
//!
//! Prompts go to stderr and read one line from stdin, so stdout stays
//! machine-readable.

use std::io::{BufRead, Write};
use std::path::Path;

use foldex::{Notification, Notifier, Opener, Prompt};

pub struct TerminalPrompt;

impl TerminalPrompt {
    fn read_line(&self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

impl Prompt for TerminalPrompt {
    /// Accepts either a list number or a literal choice.
    fn choose(&self, choices: &[String], placeholder: &str) -> Option<String> {
        for (i, choice) in choices.iter().enumerate() {
            eprintln!("{:>4}  {}", i + 1, choice);
        }
        if placeholder.is_empty() {
            eprint!("folder> ");
        } else {
            eprint!("{}> ", placeholder);
        }
        let _ = std::io::stderr().flush();

        let answer = self.read_line()?;
        let answer = answer.trim();
        if answer.is_empty() {
            return None;
        }
        if let Ok(n) = answer.parse::<usize>() {
            return choices.get(n.checked_sub(1)?).cloned();
        }
        choices.iter().find(|c| c.as_str() == answer).cloned()
    }

    fn input(&self, message: &str, placeholder: &str) -> Option<String> {
        if !message.is_empty() {
            eprintln!("{}", message);
        }
        if placeholder.is_empty() {
            eprint!("> ");
        } else {
            eprint!("{}> ", placeholder);
        }
        let _ = std::io::stderr().flush();
        self.read_line()
    }
}

pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: &Notification) {
        eprintln!("{}: {}", notification.title, notification.body);
    }
}

/// Prints what an editor would open.
pub struct TerminalOpener;

impl Opener for TerminalOpener {
    fn open(&self, path: &Path, focus: bool) {
        if focus {
            println!("FOCUS {}", path.display());
        } else {
            println!("OPEN {}", path.display());
        }
    }
}
