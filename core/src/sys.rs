use tracing::{info, warn};

use crate::choice::{self, Mode, Selection};
use crate::command::Command;
use crate::editor::Editor;
use crate::error::SessionError;
use crate::layout::capture::capture;
use crate::layout::correlate::{apply_plan, correlate};
use crate::layout::grid;
use crate::prompt::{format_table, Prompt};
use crate::reconcile::{is_yes, Reconciler};
use crate::response::Response;
use crate::store::{now_rfc3339, SessionStore};
use crate::types::config::Settings;
use crate::types::session::{SessionRecord, TileNumber};


/// Central runtime for eds. Owns the store and dispatches session commands
/// against an editor and a prompt.
pub struct Sys<E: Editor, P: Prompt> {
    settings: Settings,
    store: SessionStore,
    editor: E,
    prompt: P,
}


impl<E: Editor, P: Prompt> Sys<E, P> {
    pub fn new(settings: Settings, editor: E, prompt: P) -> Result<Sys<E, P>, SessionError> {
        let store = SessionStore::open(&settings.store_path)?;
        Ok(Sys {
            settings,
            store,
            editor,
            prompt,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    pub fn prompt_mut(&mut self) -> &mut P {
        &mut self.prompt
    }

    pub fn into_parts(self) -> (E, P) {
        (self.editor, self.prompt)
    }

    /// The single dispatch method.
    pub fn execute(&mut self, cmd: Command) -> Response {
        let result = match cmd {
            Command::Save { name } => self.cmd_save(name),
            Command::Open { name } => self.cmd_open(name),
            Command::Delete { name, confirm } => self.cmd_delete(name, confirm),
            Command::Rename { name, new_name } => self.cmd_rename(name, new_name),
            Command::View { name } => self.cmd_view(name),
            Command::List => Ok(self.cmd_list()),
            Command::Manage => self.cmd_manage(),
            Command::Help { topic } => Ok(crate::help::help_text(topic.as_deref())),
        };
        match result {
            Ok(output) => Response::ok(output),
            Err(e) => {
                warn!(error = %e, "command failed");
                Response::error(e.to_string())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Save / Open
    // -----------------------------------------------------------------------

    fn cmd_save(&mut self, name: Option<String>) -> Result<String, SessionError> {
        let name = match non_blank(name) {
            Some(n) => n,
            None => match self.ask_save_name() {
                Some(n) => n,
                None => return Ok(CANCELLED.into()),
            },
        };
        let now = now_rfc3339()?;
        let record = capture(&self.editor, &name, &now)?;
        let files = record.files.len();

        let replaced = match self.store.find_exact(&name) {
            Some(index) => {
                self.store.remove(index)?;
                true
            }
            None => false,
        };
        self.store.append(record);
        self.store.persist()?;
        info!(session = %name, files, replaced, "saved session");

        let verb = if replaced { "Replaced" } else { "Saved" };
        Ok(format!("{} session '{}' ({} files).", verb, name, files))
    }

    /// A number picks an existing session to overwrite; anything else is a name.
    fn ask_save_name(&mut self) -> Option<String> {
        let rows = self.store.list();
        if !rows.is_empty() {
            self.prompt.display_table(&rows);
        }
        let answer = self
            .prompt
            .request_input("Session name, or number to overwrite (empty to cancel): ");
        let answer = answer.trim();
        if answer.is_empty() {
            return None;
        }
        if let Ok(n) = answer.parse::<usize>() {
            if let Some(row) = rows.iter().find(|r| r.index == n) {
                return Some(row.name.clone());
            }
        }
        Some(answer.to_string())
    }

    fn cmd_open(&mut self, name: Option<String>) -> Result<String, SessionError> {
        let Some(index) = self.choose_one(name.as_deref()) else {
            return Ok(CANCELLED.into());
        };
        let record = self.store.load(index)?.clone();
        let plan = grid::plan(&record.name, &record.layout)?;
        let dangling: Vec<TileNumber> = record
            .dangling_tiles()
            .into_iter()
            .filter(|t| *t >= 0)
            .collect();
        if !dangling.is_empty() {
            return Err(SessionError::layout(
                &record.name,
                format!("files reference tiles {:?} that have no geometry", dangling),
            ));
        }

        self.editor.set_working_directory(&record.working_directory)?;
        self.editor.set_search_path(&record.search_path)?;

        let previous = self.editor.grid_dimensions()?;
        apply_plan(&mut self.editor, &plan, previous)?;
        let tiles = correlate(&mut self.editor, &plan, &self.settings)?;

        let report =
            Reconciler::new(&mut self.editor, &mut self.prompt, &mut self.store, index).run(&tiles)?;

        let mut updated = self.store.load(index)?.clone();
        updated.last_used = now_rfc3339()?;
        self.store.replace(index, updated)?;
        self.store.persist()?;

        info!(session = %record.name, placed = report.placed, unrepaired = report.unrepaired_views, "opened session");
        Ok(format!("Opened session '{}': {}.", record.name, report.summary()))
    }

    // -----------------------------------------------------------------------
    // Delete / Rename / View / List
    // -----------------------------------------------------------------------

    fn cmd_delete(&mut self, name: Option<String>, confirm: Option<bool>) -> Result<String, SessionError> {
        let rows = self.store.list();
        let indices = match choice::resolve(name.as_deref(), &rows, &mut self.prompt, Mode::Multi) {
            Selection::Chosen(indices) => indices,
            Selection::Cancelled => return Ok(CANCELLED.into()),
        };
        let names = indices
            .iter()
            .map(|&i| self.store.load(i).map(|r| format!("'{}'", r.name)))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");

        if confirm.unwrap_or(self.settings.delete_confirmation) {
            let answer = self
                .prompt
                .request_input(&format!("Delete {}? (y/N): ", names));
            if !is_yes(&answer) {
                return Ok("Nothing deleted.".into());
            }
        }
        self.store.remove_many(&indices)?;
        self.store.persist()?;
        info!(sessions = %names, "deleted sessions");
        Ok(format!("Deleted {}.", names))
    }

    fn cmd_rename(&mut self, name: Option<String>, new_name: Option<String>) -> Result<String, SessionError> {
        let Some(index) = self.choose_one(name.as_deref()) else {
            return Ok(CANCELLED.into());
        };
        let old = self.store.load(index)?.name.clone();
        let new_name = match non_blank(new_name) {
            Some(n) => n,
            None => {
                let answer = self
                    .prompt
                    .request_input(&format!("New name for '{}' (empty to cancel): ", old));
                match non_blank(Some(answer)) {
                    Some(n) => n,
                    None => return Ok(CANCELLED.into()),
                }
            }
        };
        self.store.rename(index, &new_name)?;
        self.store.persist()?;
        info!(from = %old, to = %new_name, "renamed session");
        Ok(format!("Renamed '{}' to '{}'.", old, new_name))
    }

    fn cmd_view(&mut self, name: Option<String>) -> Result<String, SessionError> {
        let Some(index) = self.choose_one(name.as_deref()) else {
            return Ok(CANCELLED.into());
        };
        Ok(describe(self.store.load(index)?))
    }

    fn cmd_list(&self) -> String {
        let rows = self.store.list();
        if rows.is_empty() {
            return "No saved sessions.".into();
        }
        format_table(&rows)
    }

    // -----------------------------------------------------------------------
    // Manage
    // -----------------------------------------------------------------------

    fn cmd_manage(&mut self) -> Result<String, SessionError> {
        loop {
            let rows = self.store.list();
            if rows.is_empty() {
                self.prompt.display_text("No saved sessions.");
            } else {
                self.prompt.display_table(&rows);
            }
            let answer = self
                .prompt
                .request_input("(o)pen (s)ave (d)elete (r)ename (v)iew [name], empty to quit: ");
            let answer = answer.trim();
            if answer.is_empty() {
                break;
            }
            let (action, rest) = match answer.split_once(char::is_whitespace) {
                Some((action, rest)) => (action, non_blank(Some(rest.to_string()))),
                None => (answer, None),
            };
            let result = match action.to_lowercase().as_str() {
                "o" | "open" => self.cmd_open(rest),
                "s" | "save" => self.cmd_save(rest),
                "d" | "delete" => self.cmd_delete(rest, None),
                "r" | "rename" => self.cmd_rename(rest, None),
                "v" | "view" => self.cmd_view(rest),
                other => {
                    self.prompt
                        .display_text(&format!("Unknown action '{}'.", other));
                    continue;
                }
            };
            match result {
                Ok(output) => self.prompt.display_text(&output),
                Err(e) => {
                    warn!(error = %e, "manage action failed");
                    self.prompt.display_text(&format!("Error: {}", e));
                }
            }
        }
        Ok("Done.".into())
    }

    fn choose_one(&mut self, name: Option<&str>) -> Option<usize> {
        let rows = self.store.list();
        choice::resolve(name, &rows, &mut self.prompt, Mode::Single).single()
    }
}

const CANCELLED: &str = "Cancelled.";

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Detailed, human-readable description of one record.
fn describe(record: &SessionRecord) -> String {
    let mut out = format!("Session '{}'\n", record.name);
    out.push_str(&format!("  Directory:   {}\n", record.working_directory.display()));
    out.push_str(&format!("  Search path: {}\n", record.search_path));
    out.push_str(&format!("  Last used:   {}\n", record.last_used));
    out.push_str(&format!("  Last saved:  {}\n", record.last_saved));
    out.push_str(&format!(
        "  Grid:        {}x{}\n",
        record.layout.grid_width, record.layout.grid_height
    ));
    if let Some(active) = &record.active_file {
        out.push_str(&format!(
            "  Active:      {} (line {})\n",
            active.display(),
            record.active_file_position
        ));
    }

    let mut order: Vec<TileNumber> = Vec::new();
    for f in &record.files {
        if !order.contains(&f.tile_number) {
            order.push(f.tile_number);
        }
    }
    for tile in order {
        if tile < 0 {
            out.push_str(&format!("  Floating {}:\n", tile));
        } else {
            out.push_str(&format!("  Tile {}:\n", tile));
        }
        for f in record.files.iter().filter(|f| f.tile_number == tile) {
            out.push_str(&format!("    {}\n", f.path.display()));
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::memory::MemoryEditor;
    use crate::prompt::ScriptedPrompt;
    use std::path::{Path, PathBuf};

    fn paths(prefix: &str, n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("/{}/f{}.m", prefix, i))).collect()
    }

    fn sys(dir: &Path) -> Sys<MemoryEditor, ScriptedPrompt> {
        let editor = MemoryEditor::default()
            .with_files(paths("this", 10))
            .with_files(paths("that", 11));
        Sys::new(Settings::in_dir(dir), editor, ScriptedPrompt::default()).unwrap()
    }

    fn open_all(sys: &mut Sys<MemoryEditor, ScriptedPrompt>, files: &[PathBuf]) {
        for f in files {
            sys.editor_mut().open_file(f).unwrap();
        }
    }

    fn close_all(sys: &mut Sys<MemoryEditor, ScriptedPrompt>) {
        let open = sys.editor().list_open_files().unwrap();
        for f in open {
            sys.editor_mut().close_file(&f).unwrap();
        }
    }

    fn names(sys: &Sys<MemoryEditor, ScriptedPrompt>) -> Vec<String> {
        sys.store().list().into_iter().map(|r| r.name).collect()
    }

    fn output(resp: Response) -> String {
        match resp {
            Response::Ok { output } => output,
            Response::Error { message } => panic!("Unexpected error: {}", message),
        }
    }

    /// Store holding thisSession (10 files) then thatSession (11 files).
    fn two_sessions(dir: &Path) -> Sys<MemoryEditor, ScriptedPrompt> {
        let mut s = sys(dir);
        open_all(&mut s, &paths("this", 10));
        output(s.execute(Command::Save {
            name: Some("thisSession".into()),
        }));
        close_all(&mut s);
        open_all(&mut s, &paths("that", 11));
        output(s.execute(Command::Save {
            name: Some("thatSession".into()),
        }));
        close_all(&mut s);
        s
    }

    #[test]
    fn save_records_open_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = sys(dir.path());
        open_all(&mut s, &paths("this", 3));
        let out = output(s.execute(Command::Save {
            name: Some("work".into()),
        }));
        assert!(out.contains("Saved session 'work' (3 files)"));
        let reopened = SessionStore::open(&s.settings().store_path).unwrap();
        assert_eq!(reopened.load(1).unwrap().files.len(), 3);
    }

    #[test]
    fn save_over_existing_name_moves_it_last() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = sys(dir.path());
        for n in ["a", "b", "c"] {
            output(s.execute(Command::Save {
                name: Some(n.into()),
            }));
        }
        let out = output(s.execute(Command::Save {
            name: Some("a".into()),
        }));
        assert!(out.starts_with("Replaced"));
        assert_eq!(names(&s), vec!["b", "c", "a"]);
    }

    #[test]
    fn save_prompt_number_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = sys(dir.path());
        for n in ["a", "b"] {
            output(s.execute(Command::Save {
                name: Some(n.into()),
            }));
        }
        s.prompt_mut().push("1");
        output(s.execute(Command::Save { name: None }));
        assert_eq!(names(&s), vec!["b", "a"]);
    }

    #[test]
    fn save_prompt_empty_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = sys(dir.path());
        let out = output(s.execute(Command::Save { name: None }));
        assert_eq!(out, "Cancelled.");
        assert!(s.store().is_empty());
    }

    #[test]
    fn open_lists_sessions_and_restores_the_choice() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = two_sessions(dir.path());
        s.prompt_mut().push("2");
        let out = output(s.execute(Command::Open { name: None }));
        assert!(out.contains("Opened session 'thatSession'"), "{}", out);

        let table = &s.prompt().tables[0];
        assert_eq!(
            table.iter().map(|r| (r.index, r.name.as_str(), r.file_count)).collect::<Vec<_>>(),
            vec![(1, "thisSession", 10), (2, "thatSession", 11)]
        );
        let open = s.editor().list_open_files().unwrap();
        assert_eq!(open, paths("that", 11));
    }

    #[test]
    fn open_cancel_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = two_sessions(dir.path());
        let before = std::fs::read_to_string(&s.settings().store_path).unwrap();
        s.prompt_mut().push("");
        let out = output(s.execute(Command::Open { name: None }));
        assert_eq!(out, "Cancelled.");
        assert!(s.editor().list_open_files().unwrap().is_empty());
        let after = std::fs::read_to_string(&s.settings().store_path).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn open_inconsistent_layout_fails_before_touching_editor() {
        let dir = tempfile::tempdir().unwrap();
        let s = two_sessions(dir.path());
        let mut store = SessionStore::open(&s.settings().store_path).unwrap();
        let mut record = store.load(1).unwrap().clone();
        record.layout.grid_width = 3;
        store.replace(1, record).unwrap();
        store.persist().unwrap();

        let mut s = Sys::new(s.settings().clone(), MemoryEditor::default(), ScriptedPrompt::default()).unwrap();
        s.editor_mut().reset_counters();
        let resp = s.execute(Command::Open {
            name: Some("thisSession".into()),
        });
        match resp {
            Response::Error { message } => assert!(message.contains("thisSession"), "{}", message),
            other => panic!("expected error, got {:?}", other),
        }
        assert_eq!(s.editor().counters().grid_applies, 0);
    }

    #[test]
    fn delete_waits_for_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = two_sessions(dir.path());
        s.prompt_mut().push("n");
        let out = output(s.execute(Command::Delete {
            name: Some("thisSession".into()),
            confirm: Some(true),
        }));
        assert_eq!(out, "Nothing deleted.");
        assert_eq!(names(&s), vec!["thisSession", "thatSession"]);

        s.prompt_mut().push("y");
        output(s.execute(Command::Delete {
            name: Some("thisSession".into()),
            confirm: Some(true),
        }));
        assert_eq!(names(&s), vec!["thatSession"]);
    }

    #[test]
    fn delete_without_confirmation_is_immediate() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = two_sessions(dir.path());
        output(s.execute(Command::Delete {
            name: Some("thatSession".into()),
            confirm: Some(false),
        }));
        assert_eq!(names(&s), vec!["thisSession"]);
        assert!(s.prompt().asked.is_empty());
    }

    #[test]
    fn delete_several_by_number() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = two_sessions(dir.path());
        s.prompt_mut().push("1,2");
        s.prompt_mut().push("yes");
        output(s.execute(Command::Delete {
            name: None,
            confirm: None,
        }));
        assert!(s.store().is_empty());
    }

    #[test]
    fn rename_asks_for_new_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = two_sessions(dir.path());
        s.prompt_mut().push("other");
        let out = output(s.execute(Command::Rename {
            name: Some("thisSession".into()),
            new_name: None,
        }));
        assert_eq!(out, "Renamed 'thisSession' to 'other'.");
        assert_eq!(names(&s), vec!["thatSession", "other"]);
    }

    #[test]
    fn view_groups_files_by_tile() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = sys(dir.path());
        s.editor_mut().open_in_tile("/this/f0.m", 0).unwrap();
        s.editor_mut()
            .open_floating("/this/f1.m", crate::types::session::Rect::new(5, 5, 50, 50))
            .unwrap();
        output(s.execute(Command::Save {
            name: Some("v".into()),
        }));
        let out = output(s.execute(Command::View {
            name: Some("v".into()),
        }));
        assert!(out.contains("Tile 0:\n    /this/f0.m"), "{}", out);
        assert!(out.contains("Floating -1:\n    /this/f1.m"), "{}", out);
        assert!(out.contains("Grid:        1x1"));
    }

    #[test]
    fn open_refuses_files_in_tiles_without_geometry() {
        use crate::types::session::{FileEntry, Layout, Rect, TileRect};

        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::in_dir(dir.path());
        let mut store = SessionStore::open(&settings.store_path).unwrap();
        store.append(SessionRecord {
            name: "broken".into(),
            working_directory: "/elsewhere".into(),
            search_path: String::new(),
            active_file: None,
            active_file_position: 0,
            last_used: "2026-01-01T00:00:00Z".into(),
            last_saved: "2026-01-01T00:00:00Z".into(),
            layout: Layout {
                grid_width: 1,
                grid_height: 1,
                tiles: vec![TileRect::new(0, Rect::new(0, 0, 800, 600))],
            },
            files: vec![
                FileEntry::new("/this/f0.m", 0),
                FileEntry::new("/this/f1.m", 5),
            ],
        });
        store.persist().unwrap();

        let mut s = sys(dir.path());
        match s.execute(Command::Open {
            name: Some("broken".into()),
        }) {
            Response::Error { message } => {
                assert!(message.contains("[5] that have no geometry"), "{}", message)
            }
            other => panic!("expected an error, got {:?}", other),
        }
        assert!(s.editor().documents().is_empty());
        assert_ne!(s.editor().working_directory().unwrap(), PathBuf::from("/elsewhere"));
    }

    #[test]
    fn list_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = sys(dir.path());
        assert_eq!(output(s.execute(Command::List)), "No saved sessions.");
    }

    #[test]
    fn manage_runs_actions_until_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = two_sessions(dir.path());
        for a in ["v thatSession", "x", "r thisSession", "renamed", ""] {
            s.prompt_mut().push(a);
        }
        assert_eq!(output(s.execute(Command::Manage)), "Done.");
        let texts = &s.prompt().texts;
        assert!(texts.iter().any(|t| t.starts_with("Session 'thatSession'")));
        assert!(texts.iter().any(|t| t.contains("Unknown action 'x'")));
        assert_eq!(names(&s), vec!["thatSession", "renamed"]);
    }

    #[test]
    fn help_returns_overview() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = sys(dir.path());
        assert!(output(s.execute(Command::Help { topic: None })).contains("eds"));
    }
}
