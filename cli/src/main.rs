//! eds CLI: the command-line entry point for editor sessions.
//!
//! Without a live editor binding the CLI drives the in-memory editor, whose
//! state is read from and written back to a YAML file between runs.

mod prompt;

use std::path::{Path, PathBuf};
use std::process;

use edsession_core::command::Command;
use edsession_core::editor::memory::MemoryEditor;
use edsession_core::response::Response;
use edsession_core::store::paths;
use edsession_core::sys::Sys;
use edsession_core::types::config::Settings;
use tracing_subscriber::EnvFilter;

use crate::prompt::TerminalPrompt;


fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let arg_refs: Vec<&str> = args[1..].iter().map(|s| s.as_str()).collect();

    let (state_path, rest) = match split_state_flag(&arg_refs) {
        Ok(parts) => parts,
        Err(e) => fail(&e),
    };
    let cmd = match parse_args(&rest) {
        Ok(c) => c,
        Err(e) => fail(&e),
    };
    if let Command::Help { topic } = &cmd {
        println!("{}", edsession_core::help::help_text(topic.as_deref()));
        return;
    }

    let settings = match Settings::load(&paths::settings_path()) {
        Ok(s) => s,
        Err(e) => fail(&e.to_string()),
    };
    let state_path = state_path.unwrap_or_else(paths::editor_state_path);
    let editor = match load_editor(&state_path) {
        Ok(ed) => ed,
        Err(e) => fail(&e),
    };

    let mut sys = match Sys::new(settings, editor, TerminalPrompt) {
        Ok(sys) => sys,
        Err(e) => fail(&e.to_string()),
    };
    let response = sys.execute(cmd);
    let (editor, _) = sys.into_parts();
    if let Err(e) = save_editor(&state_path, &editor) {
        eprintln!("eds: {}", e);
    }

    match response {
        Response::Ok { output } => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Response::Error { message } => {
            eprintln!("eds error: {}", message);
            process::exit(1);
        }
    }
}


fn fail(message: &str) -> ! {
    eprintln!("eds: {}", message);
    process::exit(1);
}


/// Log filter comes from `EDS_LOG`, defaulting to warnings only.
fn init_logging() {
    let filter = EnvFilter::try_from_env("EDS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}


fn load_editor(path: &Path) -> Result<MemoryEditor, String> {
    match std::fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(MemoryEditor::default()),
        Ok(text) => serde_yaml::from_str(&text)
            .map_err(|e| format!("bad editor state {}: {}", path.display(), e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MemoryEditor::default()),
        Err(e) => Err(format!("reading {}: {}", path.display(), e)),
    }
}


fn save_editor(path: &Path, editor: &MemoryEditor) -> Result<(), String> {
    let text = serde_yaml::to_string(editor).map_err(|e| format!("encoding editor state: {}", e))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("creating {}: {}", parent.display(), e))?;
    }
    std::fs::write(path, text).map_err(|e| format!("writing {}: {}", path.display(), e))
}


/// Pull `--state <file>` out of the arguments, wherever it appears.
fn split_state_flag<'a>(args: &[&'a str]) -> Result<(Option<PathBuf>, Vec<&'a str>), String> {
    let mut state = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "--state" {
            match iter.next() {
                Some(path) => state = Some(PathBuf::from(path)),
                None => return Err("--state needs a file argument".into()),
            }
        } else {
            rest.push(*arg);
        }
    }
    Ok((state, rest))
}


fn parse_args(args: &[&str]) -> Result<Command, String> {
    if args.is_empty() {
        return Err("No command specified. Run 'eds help' for usage.".into());
    }
    let positional = positionals(&args[1..]);
    let arg = |i: usize| positional.get(i).map(|s| s.to_string());

    match args[0] {
        "save" => Ok(Command::Save { name: arg(0) }),
        "open" => Ok(Command::Open { name: arg(0) }),
        "delete" => {
            let confirm = if has_flag(args, "--yes") {
                Some(false)
            } else if has_flag(args, "--confirm") {
                Some(true)
            } else {
                None
            };
            Ok(Command::Delete {
                name: arg(0),
                confirm,
            })
        }
        "rename" => Ok(Command::Rename {
            name: arg(0),
            new_name: arg(1),
        }),
        "view" => Ok(Command::View { name: arg(0) }),
        "list" | "ls" => Ok(Command::List),
        "manage" => Ok(Command::Manage),
        "help" | "--help" | "-h" => Ok(Command::Help { topic: arg(0) }),
        _ => Err(format!("Unknown command: '{}'. Run 'eds help' for usage.", args[0])),
    }
}


fn positionals<'a>(args: &[&'a str]) -> Vec<&'a str> {
    args.iter().copied().filter(|a| !a.starts_with("--")).collect()
}


fn has_flag(args: &[&str], flag: &str) -> bool {
    args.iter().any(|a| *a == flag)
}
