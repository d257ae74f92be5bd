//! Terminal prompt: tables and questions on stdout, answers from stdin.

use std::io::{self, BufRead, Write};

use edsession_core::prompt::{format_table, Prompt};
use edsession_core::types::session::SessionSummary;


pub struct TerminalPrompt;


impl Prompt for TerminalPrompt {
    fn display_table(&mut self, rows: &[SessionSummary]) {
        print!("{}", format_table(rows));
    }

    /// End of input reads as an empty answer.
    fn request_input(&mut self, prompt: &str) -> String {
        print!("{}", prompt);
        let _ = io::stdout().flush();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => line.trim_end_matches(['\r', '\n']).to_string(),
            Err(_) => String::new(),
        }
    }

    fn display_text(&mut self, text: &str) {
        println!("{}", text);
    }
}
