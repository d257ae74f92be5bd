//! Help system for eds commands.

pub fn help_text(topic: Option<&str>) -> String {
    match topic {
        None => overview(),
        Some(t) => {
            if let Some(text) = command_help(t) {
                return text;
            }
            if let Some(text) = group_help(t) {
                return text;
            }
            format!("Unknown help topic: '{}'. Run 'eds help' for a list of commands.", t)
        }
    }
}


fn overview() -> String {
    "\
eds — save and restore editor sessions

Usage: eds [--state <file>] <command> [args...]

Session commands:
  save [name]                  Snapshot the editor into a named session
  open [name]                  Restore a saved session
  delete [name] [--yes]        Delete one or more sessions
  rename [name] [new-name]     Rename a session
  view [name]                  Show the details of a session
  list                         List saved sessions
  manage                       Interactive session manager

Other:
  help [topic]                 Show help

A missing name or one that does not match exactly opens a chooser that
accepts a number, a name, or a name prefix.

Run 'eds help <command>' for detailed help on a specific command."
        .into()
}


fn group_help(group: &str) -> Option<String> {
    let text = match group {
        "choose" | "choosing" => "\
Choosing a session

  Answers are matched against the listing shown, in this order:
    1. a row number (delete also accepts several, separated by spaces or commas)
    2. the exact name
    3. the exact name ignoring case
    4. a name prefix

  A name that matches several sessions narrows the listing to just those.
  An empty answer goes back one level, or cancels at the full listing.",

        "restore" => "\
How open restores a session

  The saved grid is rebuilt from the relative position of its tiles, then
  marker files are used to learn which live tile landed in each cell.
  Each saved file is then checked against the editor:
    open at the saved path       stays open
    loadable at the saved path   is opened
    open somewhere else          you choose to keep, relocate or close it
    loadable somewhere else      you choose to open, relocate or drop it
    not found                    you choose to drop it or keep it
  Open files that are not part of the session can be closed.",

        "config" => "\
Configuration — <config-dir>/config.yaml

  store_path                Session store file (default <config-dir>/sessions.yaml)
  delete_confirmation       Ask before deleting (default true)
  marker_dir                Where tile marker files are written
  marker_prefix             Marker file name prefix
  marker_timeout_ms         How long to wait for a marker to open (default 1000)
  marker_poll_interval_ms   Poll interval while waiting (default 10)

  EDS_CONFIG_DIR overrides the config directory. EDS_LOG sets the log
  filter (default warn). --state names the editor state file
  (default <config-dir>/editor.yaml).",

        _ => return None,
    };
    Some(text.into())
}


fn command_help(command: &str) -> Option<String> {
    let text = match command {
        "save" => "eds save — snapshot the editor\n\nUsage: eds save [name]\n\nSaving under an existing name replaces that session.",
        "open" => "eds open — restore a saved session\n\nUsage: eds open [name]\n\nSee 'eds help restore'.",
        "delete" => "eds delete — delete sessions\n\nUsage: eds delete [name] [--yes | --confirm]",
        "rename" => "eds rename — rename a session\n\nUsage: eds rename [name] [new-name]",
        "view" => "eds view — show a session\n\nUsage: eds view [name]",
        "list" => "eds list — list saved sessions\n\nUsage: eds list",
        "manage" => "eds manage — interactive manager\n\nUsage: eds manage\n\nActions: o(pen) s(ave) d(elete) r(ename) v(iew), each optionally followed by a name.",
        "help" => "eds help — show help\n\nUsage: eds help [topic]",
        _ => return None,
    };
    Some(text.into())
}
