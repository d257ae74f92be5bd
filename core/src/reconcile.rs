//! File reconciliation: bring the live editor in line with a saved session.
//!
//! Every saved file is classified against what is open right now and what
//! exists on disk. Unambiguous cases are handled silently. Moved or missing
//! files ask the user, and every answer that changes the session is written
//! to the store straight away. Files that are open but not part of the
//! session are offered for closing, then session files are moved into the
//! live tiles found by correlation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::editor::Editor;
use crate::error::{EditorError, SessionError};
use crate::layout::correlate::TileMap;
use crate::prompt::Prompt;
use crate::store::SessionStore;
use crate::types::session::{file_name_of, FileEntry, Layout, SessionRecord};

/// Where a saved file stands relative to the live editor and the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    NotFound,
    /// Open under the saved path.
    OpenSame,
    /// Not open, but the saved path is loadable.
    OpenableSame,
    /// Files with the same base name are open from other locations.
    OpenDifferentLocation(Vec<PathBuf>),
    /// Files with the same base name are loadable from other locations.
    OpenableDifferentLocation(Vec<PathBuf>),
}

pub fn classify(path: &Path, open: &[PathBuf], editor: &dyn Editor) -> FileStatus {
    if open.iter().any(|p| p == path) {
        return FileStatus::OpenSame;
    }
    if editor.file_exists(path) {
        return FileStatus::OpenableSame;
    }
    let Some(name) = file_name_of(path) else {
        return FileStatus::NotFound;
    };
    let open_elsewhere: Vec<PathBuf> = open
        .iter()
        .filter(|p| file_name_of(p) == Some(name))
        .cloned()
        .collect();
    if !open_elsewhere.is_empty() {
        return FileStatus::OpenDifferentLocation(open_elsewhere);
    }
    let elsewhere: Vec<PathBuf> = editor
        .locate(name)
        .into_iter()
        .filter(|p| p != path)
        .collect();
    if !elsewhere.is_empty() {
        return FileStatus::OpenableDifferentLocation(elsewhere);
    }
    FileStatus::NotFound
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Status of each saved entry at the time it was processed.
    pub classified: Vec<(PathBuf, FileStatus)>,
    pub opened: Vec<PathBuf>,
    pub closed: Vec<PathBuf>,
    pub dropped: Vec<PathBuf>,
    /// Saved path and the paths it was rewritten to.
    pub rewritten: Vec<(PathBuf, Vec<PathBuf>)>,
    pub placed: usize,
    /// Files that could not be moved into their tile even after a retry.
    pub unrepaired_views: usize,
}

impl ReconcileReport {
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} placed, {} opened, {} closed, {} dropped, {} relocated",
            self.placed,
            self.opened.len(),
            self.closed.len(),
            self.dropped.len(),
            self.rewritten.len()
        );
        if self.unrepaired_views > 0 {
            out.push_str(&format!(
                "; {} view(s) could not be placed",
                self.unrepaired_views
            ));
        }
        out
    }
}

pub struct Reconciler<'a> {
    editor: &'a mut dyn Editor,
    prompt: &'a mut dyn Prompt,
    store: &'a mut SessionStore,
    index: usize,
}

impl<'a> Reconciler<'a> {
    /// `index` is the 1-based store index of the session being opened.
    pub fn new(
        editor: &'a mut dyn Editor,
        prompt: &'a mut dyn Prompt,
        store: &'a mut SessionStore,
        index: usize,
    ) -> Reconciler<'a> {
        Reconciler {
            editor,
            prompt,
            store,
            index,
        }
    }

    pub fn run(&mut self, tiles: &TileMap) -> Result<ReconcileReport, SessionError> {
        let mut record = self.store.load(self.index)?.clone();
        let mut report = ReconcileReport::default();
        let mut scheduled: Vec<FileEntry> = Vec::new();
        let mut referenced: HashSet<PathBuf> = HashSet::new();

        let mut i = 0;
        while i < record.files.len() {
            let entry = record.files[i].clone();
            let open = self.editor.list_open_files()?;
            let status = classify(&entry.path, &open, self.editor);
            debug!(path = %entry.path.display(), ?status, "classified session file");
            report.classified.push((entry.path.clone(), status.clone()));

            match status {
                FileStatus::OpenSame => {
                    referenced.insert(entry.path.clone());
                    scheduled.push(entry);
                    i += 1;
                }
                FileStatus::OpenableSame => {
                    if self.open(&entry.path, &mut report) {
                        referenced.insert(entry.path.clone());
                        scheduled.push(entry);
                    }
                    i += 1;
                }
                FileStatus::NotFound => {
                    let answer = self.prompt.request_input(&format!(
                        "'{}' was not found. Remove it from session '{}'? (y/N): ",
                        entry.path.display(),
                        record.name
                    ));
                    if is_yes(&answer) {
                        record.files.remove(i);
                        self.commit(&record)?;
                        report.dropped.push(entry.path);
                    } else {
                        i += 1;
                    }
                }
                FileStatus::OpenDifferentLocation(candidates) => {
                    let choice = self.ask(
                        &entry,
                        "is open from a different location",
                        &candidates,
                        &[
                            "keep open, leave session unchanged",
                            "keep open and update session to the open location",
                            "close and remove from session",
                            "close, leave session unchanged",
                        ],
                        1,
                    );
                    match choice {
                        2 => {
                            i += self.rewrite(&mut record, i, &candidates, &mut report)?;
                            self.keep(&entry, &candidates, &mut scheduled, &mut referenced);
                        }
                        3 => {
                            self.close_all(&candidates, &mut report);
                            record.files.remove(i);
                            self.commit(&record)?;
                            report.dropped.push(entry.path);
                        }
                        4 => {
                            self.close_all(&candidates, &mut report);
                            i += 1;
                        }
                        _ => {
                            self.keep(&entry, &candidates, &mut scheduled, &mut referenced);
                            i += 1;
                        }
                    }
                }
                FileStatus::OpenableDifferentLocation(candidates) => {
                    let choice = self.ask(
                        &entry,
                        "was found in a different location",
                        &candidates,
                        &[
                            "open and update session to the new location",
                            "remove from session",
                            "open, leave session unchanged",
                            "leave closed, session unchanged",
                        ],
                        4,
                    );
                    let picked = match choice {
                        1 | 3 => self.pick_candidate(&entry, &candidates),
                        _ => None,
                    };
                    match (choice, picked) {
                        (1, Some(path)) if self.open(&path, &mut report) => {
                            let opened = vec![path];
                            i += self.rewrite(&mut record, i, &opened, &mut report)?;
                            self.keep(&entry, &opened, &mut scheduled, &mut referenced);
                        }
                        (2, _) => {
                            record.files.remove(i);
                            self.commit(&record)?;
                            report.dropped.push(entry.path);
                        }
                        (3, Some(path)) if self.open(&path, &mut report) => {
                            self.keep(&entry, &[path], &mut scheduled, &mut referenced);
                            i += 1;
                        }
                        _ => i += 1,
                    }
                }
            }
        }

        self.close_unreferenced(&referenced, &mut report)?;
        self.place(&scheduled, tiles, &record.layout, &mut report);
        self.restore_focus(&record);

        info!(session = %record.name, summary = %report.summary(), "reconciled session files");
        Ok(report)
    }

    fn commit(&mut self, record: &SessionRecord) -> Result<(), SessionError> {
        self.store.replace(self.index, record.clone())?;
        self.store.persist()
    }

    /// Replace entry `at` with one entry per path. Returns how many entries
    /// now stand in its place.
    fn rewrite(
        &mut self,
        record: &mut SessionRecord,
        at: usize,
        paths: &[PathBuf],
        report: &mut ReconcileReport,
    ) -> Result<usize, SessionError> {
        let old = record.files[at].clone();
        let replacement: Vec<FileEntry> = paths
            .iter()
            .map(|p| FileEntry::new(p.clone(), old.tile_number))
            .collect();
        record.files.splice(at..at + 1, replacement);
        self.commit(record)?;
        report.rewritten.push((old.path, paths.to_vec()));
        Ok(paths.len())
    }

    fn keep(
        &self,
        entry: &FileEntry,
        paths: &[PathBuf],
        scheduled: &mut Vec<FileEntry>,
        referenced: &mut HashSet<PathBuf>,
    ) {
        for p in paths {
            referenced.insert(p.clone());
            scheduled.push(FileEntry::new(p.clone(), entry.tile_number));
        }
    }

    fn open(&mut self, path: &Path, report: &mut ReconcileReport) -> bool {
        match self.editor.open_file(path) {
            Ok(()) => {
                report.opened.push(path.to_path_buf());
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open session file");
                false
            }
        }
    }

    fn close_all(&mut self, paths: &[PathBuf], report: &mut ReconcileReport) {
        for p in paths {
            match self.editor.close_file(p) {
                Ok(()) => report.closed.push(p.clone()),
                Err(e) => warn!(path = %p.display(), error = %e, "failed to close file"),
            }
        }
    }

    /// Present numbered options and return the chosen one (1-based).
    /// Anything unparsable picks `default`.
    fn ask(
        &mut self,
        entry: &FileEntry,
        situation: &str,
        candidates: &[PathBuf],
        options: &[&str],
        default: usize,
    ) -> usize {
        let mut text = format!("'{}' {}:\n", entry.path.display(), situation);
        for c in candidates {
            text.push_str(&format!("    {}\n", c.display()));
        }
        for (n, option) in options.iter().enumerate() {
            let marker = if n + 1 == default { " [default]" } else { "" };
            text.push_str(&format!("  {}) {}{}\n", n + 1, option, marker));
        }
        self.prompt.display_text(&text);
        let answer = self.prompt.request_input(&format!("Choice [{}]: ", default));
        match answer.trim().parse::<usize>() {
            Ok(n) if n >= 1 && n <= options.len() => n,
            _ => default,
        }
    }

    /// Which of several files found on disk stands in for `entry`. A single
    /// candidate is taken as is; an unparsable answer picks none.
    fn pick_candidate(&mut self, entry: &FileEntry, candidates: &[PathBuf]) -> Option<PathBuf> {
        if let [only] = candidates {
            return Some(only.clone());
        }
        let mut text = format!(
            "Several files could stand in for '{}':\n",
            entry.path.display()
        );
        for (n, c) in candidates.iter().enumerate() {
            text.push_str(&format!("  {}) {}\n", n + 1, c.display()));
        }
        self.prompt.display_text(&text);
        let answer = self
            .prompt
            .request_input("Use which one? (empty to leave it closed): ");
        match answer.trim().parse::<usize>() {
            Ok(n) if n >= 1 && n <= candidates.len() => Some(candidates[n - 1].clone()),
            _ => None,
        }
    }

    fn close_unreferenced(
        &mut self,
        referenced: &HashSet<PathBuf>,
        report: &mut ReconcileReport,
    ) -> Result<(), SessionError> {
        let extra: Vec<PathBuf> = self
            .editor
            .list_open_files()?
            .into_iter()
            .filter(|p| !referenced.contains(p))
            .collect();
        if extra.is_empty() {
            return Ok(());
        }

        let mut text = String::from("These open files are not part of the session:\n");
        for p in &extra {
            text.push_str(&format!("    {}\n", p.display()));
        }
        self.prompt.display_text(&text);
        let answer = self
            .prompt
            .request_input("Close them? (a)ll, (k)eep all, (i)ndividually [k]: ");
        match answer.trim().to_lowercase().as_str() {
            "a" | "all" => self.close_all(&extra, report),
            "i" | "individually" => {
                for p in &extra {
                    let answer = self
                        .prompt
                        .request_input(&format!("Close '{}'? (y/N): ", p.display()));
                    if is_yes(&answer) {
                        self.close_all(std::slice::from_ref(p), report);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Move scheduled files into their live tiles, retrying failed views once.
    fn place(&mut self, scheduled: &[FileEntry], tiles: &TileMap, layout: &Layout, report: &mut ReconcileReport) {
        let mut failed: Vec<&FileEntry> = Vec::new();
        for entry in scheduled {
            match place_one(self.editor, entry, tiles, layout) {
                Ok(true) => report.placed += 1,
                Ok(false) => {}
                Err(e) => {
                    debug!(path = %entry.path.display(), error = %e, "placement failed, will retry");
                    failed.push(entry);
                }
            }
        }
        for entry in failed {
            match place_one(self.editor, entry, tiles, layout) {
                Ok(true) => report.placed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %entry.path.display(), error = %e, "could not place file");
                    report.unrepaired_views += 1;
                }
            }
        }
    }

    fn restore_focus(&mut self, record: &SessionRecord) {
        let Some(active) = &record.active_file else {
            return;
        };
        if let Err(e) = self
            .editor
            .open_and_focus(active, record.active_file_position)
        {
            warn!(path = %active.display(), error = %e, "could not restore active file");
        }
    }
}

/// Returns `Ok(false)` when the file has no saved tile to go to.
fn place_one(
    editor: &mut dyn Editor,
    entry: &FileEntry,
    tiles: &TileMap,
    layout: &Layout,
) -> Result<bool, EditorError> {
    let handle = editor
        .resolve_handle(&entry.path)
        .ok_or_else(|| EditorError::ViewNotReady(entry.path.clone()))?;
    if entry.tile_number >= 0 {
        let Some(&live) = tiles.get(&entry.tile_number) else {
            warn!(path = %entry.path.display(), tile = entry.tile_number, "saved tile has no live counterpart");
            return Ok(false);
        };
        editor.set_tile(handle, live)?;
    } else {
        let Some(saved) = layout.tile(entry.tile_number) else {
            warn!(path = %entry.path.display(), tile = entry.tile_number, "no saved geometry for floating file");
            return Ok(false);
        };
        editor.set_external(handle, saved.rect())?;
    }
    Ok(true)
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::memory::MemoryEditor;

    fn editor() -> MemoryEditor {
        MemoryEditor::default().with_files(["/w/a.m", "/w/b.m", "/old/c.m", "/new/c.m"])
    }

    #[test]
    fn open_under_saved_path_is_open_same() {
        let mut ed = editor();
        ed.open_file(Path::new("/w/a.m")).unwrap();
        let open = ed.list_open_files().unwrap();
        assert_eq!(classify(Path::new("/w/a.m"), &open, &ed), FileStatus::OpenSame);
    }

    #[test]
    fn loadable_saved_path_is_openable_same() {
        let ed = editor();
        assert_eq!(classify(Path::new("/w/b.m"), &[], &ed), FileStatus::OpenableSame);
    }

    #[test]
    fn moved_and_open_is_open_elsewhere() {
        let mut ed = editor();
        ed.remove_file(Path::new("/old/c.m"));
        ed.open_file(Path::new("/new/c.m")).unwrap();
        let open = ed.list_open_files().unwrap();
        assert_eq!(
            classify(Path::new("/old/c.m"), &open, &ed),
            FileStatus::OpenDifferentLocation(vec!["/new/c.m".into()])
        );
    }

    #[test]
    fn moved_and_closed_is_openable_elsewhere() {
        let mut ed = editor();
        ed.remove_file(Path::new("/old/c.m"));
        assert_eq!(
            classify(Path::new("/old/c.m"), &[], &ed),
            FileStatus::OpenableDifferentLocation(vec!["/new/c.m".into()])
        );
    }

    #[test]
    fn unknown_file_is_not_found() {
        let ed = editor();
        assert_eq!(classify(Path::new("/gone/z.m"), &[], &ed), FileStatus::NotFound);
    }

    #[test]
    fn yes_answers() {
        assert!(is_yes(" Y "));
        assert!(is_yes("yes"));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
        assert!(!is_yes("1"));
    }

    #[test]
    fn summary_mentions_unrepaired_views_only_when_present() {
        let mut r = ReconcileReport {
            placed: 3,
            ..ReconcileReport::default()
        };
        assert!(!r.summary().contains("could not"));
        r.unrepaired_views = 1;
        assert!(r.summary().contains("1 view(s) could not be placed"));
    }
}
