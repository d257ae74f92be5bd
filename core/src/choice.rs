//! Choice resolution: turns a name, a number, or an interactive answer into
//! one or more session indices.
//!
//! Answers are matched against the displayed listing in a fixed order:
//!
//! 1. an integer (or, in multi-select mode, a list of integers) is a 1-based
//!    row number of the displayed listing;
//! 2. an exact, case-sensitive name;
//! 3. an exact, case-insensitive name;
//! 4. a name prefix. A prefix only resolves when it is unambiguous without
//!    regard to case. Otherwise the listing narrows to every
//!    case-insensitive hit, case-sensitive hits first.
//!
//! Narrowing keeps a stack of candidate sets. An empty answer pops one level,
//! or cancels when already at the full listing.

use crate::prompt::Prompt;
use crate::types::session::SessionSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Single,
    Multi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Cancelled,
    /// Store indices (1-based) of the chosen sessions.
    Chosen(Vec<usize>),
}

impl Selection {
    pub fn single(&self) -> Option<usize> {
        match self {
            Selection::Chosen(indices) if indices.len() == 1 => Some(indices[0]),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Selection::Cancelled)
    }
}

/// Outcome of matching one answer against a candidate list.
/// Positions refer to the candidate list, not to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    Resolved(Vec<usize>),
    Ambiguous(Vec<usize>),
    NoMatch,
}

/// Resolve a session choice, prompting when `name` does not match exactly.
pub fn resolve(
    name: Option<&str>,
    rows: &[SessionSummary],
    prompt: &mut dyn Prompt,
    mode: Mode,
) -> Selection {
    if rows.is_empty() {
        prompt.display_text("No saved sessions.");
        return Selection::Cancelled;
    }

    if let Some(name) = name {
        if let Some(row) = rows.iter().find(|r| r.name == name) {
            return Selection::Chosen(vec![row.index]);
        }
        prompt.display_text(&format!("No session named '{}'.", name));
    }

    let question = match mode {
        Mode::Single => "Choose a session by number or name (empty to cancel): ",
        Mode::Multi => "Choose sessions by number(s) or name (empty to cancel): ",
    };

    let mut stack: Vec<Vec<usize>> = vec![(0..rows.len()).collect()];
    while let Some(current) = stack.last().cloned() {
        let shown: Vec<SessionSummary> = current
            .iter()
            .enumerate()
            .map(|(pos, &i)| SessionSummary {
                index: pos + 1,
                ..rows[i].clone()
            })
            .collect();
        prompt.display_table(&shown);

        let answer = prompt.request_input(question);
        let answer = answer.trim();
        if answer.is_empty() {
            stack.pop();
            continue;
        }

        let names: Vec<&str> = shown.iter().map(|r| r.name.as_str()).collect();
        match match_answer(answer, &names, mode) {
            Match::Resolved(positions) => {
                return Selection::Chosen(positions.iter().map(|&p| rows[current[p]].index).collect());
            }
            Match::Ambiguous(positions) => {
                if positions.len() == current.len() {
                    prompt.display_text(&format!(
                        "'{}' matches several sessions; choose one by number.",
                        answer
                    ));
                } else {
                    stack.push(positions.iter().map(|&p| current[p]).collect());
                }
            }
            Match::NoMatch => {
                prompt.display_text(&format!("No session matches '{}'.", answer));
            }
        }
    }
    Selection::Cancelled
}

/// Match one non-empty answer against candidate names.
pub fn match_answer(answer: &str, names: &[&str], mode: Mode) -> Match {
    if let Some(numbers) = parse_numbers(answer, mode) {
        if !numbers.is_empty() && numbers.iter().all(|&n| n >= 1 && n <= names.len()) {
            let mut positions: Vec<usize> = Vec::new();
            for n in numbers {
                if !positions.contains(&(n - 1)) {
                    positions.push(n - 1);
                }
            }
            return Match::Resolved(positions);
        }
        return Match::NoMatch;
    }

    let exact: Vec<usize> = positions_where(names, |n| n == answer);
    if let Some(m) = narrow(exact) {
        return m;
    }

    let lower = answer.to_lowercase();
    let exact_ci = positions_where(names, |n| n.to_lowercase() == lower);
    if let Some(m) = narrow(exact_ci) {
        return m;
    }

    let prefix_cs = positions_where(names, |n| n.starts_with(answer));
    let prefix_ci = positions_where(names, |n| n.to_lowercase().starts_with(&lower));
    match prefix_ci.len() {
        0 => Match::NoMatch,
        1 => Match::Resolved(prefix_ci),
        _ => {
            let mut ordered = prefix_cs.clone();
            ordered.extend(prefix_ci.into_iter().filter(|p| !prefix_cs.contains(p)));
            Match::Ambiguous(ordered)
        }
    }
}

fn narrow(hits: Vec<usize>) -> Option<Match> {
    match hits.len() {
        0 => None,
        1 => Some(Match::Resolved(hits)),
        _ => Some(Match::Ambiguous(hits)),
    }
}

fn positions_where(names: &[&str], pred: impl Fn(&str) -> bool) -> Vec<usize> {
    names
        .iter()
        .enumerate()
        .filter(|(_, n)| pred(n))
        .map(|(i, _)| i)
        .collect()
}

/// `Some` when the whole answer is numeric: one integer in single mode,
/// integers separated by spaces or commas in multi mode.
fn parse_numbers(answer: &str, mode: Mode) -> Option<Vec<usize>> {
    match mode {
        Mode::Single => answer.parse::<usize>().ok().map(|n| vec![n]),
        Mode::Multi => answer
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| t.parse::<usize>().ok())
            .collect(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompt;

    fn rows(names: &[&str]) -> Vec<SessionSummary> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| SessionSummary {
                index: i + 1,
                name: n.to_string(),
                file_count: 0,
                working_directory: "/".into(),
                last_used: String::new(),
                last_saved: String::new(),
            })
            .collect()
    }

    const NAMES: [&str; 3] = ["alpha", "Alpha2", "beta"];

    #[test]
    fn exact_name_beats_prefix_ambiguity() {
        assert_eq!(match_answer("alpha", &NAMES, Mode::Single), Match::Resolved(vec![0]));
    }

    #[test]
    fn shared_prefix_is_ambiguous() {
        assert_eq!(
            match_answer("al", &NAMES, Mode::Single),
            Match::Ambiguous(vec![0, 1])
        );
    }

    #[test]
    fn case_insensitive_exact_and_prefix() {
        assert_eq!(match_answer("ALPHA2", &NAMES, Mode::Single), Match::Resolved(vec![1]));
        assert_eq!(match_answer("B", &NAMES, Mode::Single), Match::Resolved(vec![2]));
    }

    #[test]
    fn case_sensitive_prefix_hits_listed_first() {
        let names = ["Alpine", "alpha"];
        assert_eq!(
            match_answer("al", &names, Mode::Single),
            Match::Ambiguous(vec![1, 0])
        );
    }

    #[test]
    fn numbers_index_the_listing() {
        assert_eq!(match_answer("3", &NAMES, Mode::Single), Match::Resolved(vec![2]));
        assert_eq!(match_answer("4", &NAMES, Mode::Single), Match::NoMatch);
        assert_eq!(match_answer("0", &NAMES, Mode::Single), Match::NoMatch);
    }

    #[test]
    fn multi_mode_accepts_lists() {
        assert_eq!(
            match_answer("3, 1 3", &NAMES, Mode::Multi),
            Match::Resolved(vec![2, 0])
        );
        assert_eq!(match_answer("1 9", &NAMES, Mode::Multi), Match::NoMatch);
        // A list is just a name in single mode.
        assert_eq!(match_answer("1 2", &NAMES, Mode::Single), Match::NoMatch);
    }

    #[test]
    fn exact_name_argument_skips_prompt() {
        let mut p = ScriptedPrompt::new(Vec::<String>::new());
        let sel = resolve(Some("beta"), &rows(&NAMES), &mut p, Mode::Single);
        assert_eq!(sel, Selection::Chosen(vec![3]));
        assert!(p.asked.is_empty());
    }

    #[test]
    fn unknown_name_argument_falls_back_to_prompt() {
        let mut p = ScriptedPrompt::new(["2"]);
        let sel = resolve(Some("gamma"), &rows(&NAMES), &mut p, Mode::Single);
        assert_eq!(sel.single(), Some(2));
        assert!(p.texts[0].contains("gamma"));
    }

    #[test]
    fn empty_answer_at_top_cancels() {
        let mut p = ScriptedPrompt::new([""]);
        let sel = resolve(None, &rows(&NAMES), &mut p, Mode::Single);
        assert!(sel.is_cancelled());
        assert_eq!(p.tables.len(), 1);
    }

    #[test]
    fn ambiguous_answer_narrows_then_resolves() {
        let mut p = ScriptedPrompt::new(["al", "2"]);
        let sel = resolve(None, &rows(&NAMES), &mut p, Mode::Single);
        assert_eq!(sel, Selection::Chosen(vec![2]));
        assert_eq!(p.tables.len(), 2);
        let narrowed: Vec<&str> = p.tables[1].iter().map(|r| r.name.as_str()).collect();
        assert_eq!(narrowed, vec!["alpha", "Alpha2"]);
        // The narrowed listing is renumbered from 1.
        assert_eq!(p.tables[1][1].index, 2);
    }

    #[test]
    fn empty_answer_in_subchoice_pops_one_level() {
        let mut p = ScriptedPrompt::new(["al", "", "beta"]);
        let sel = resolve(None, &rows(&NAMES), &mut p, Mode::Single);
        assert_eq!(sel, Selection::Chosen(vec![3]));
        assert_eq!(p.tables.len(), 3);
        assert_eq!(p.tables[2].len(), 3);
    }

    #[test]
    fn unmatched_answer_asks_again() {
        let mut p = ScriptedPrompt::new(["zeta", "1"]);
        let sel = resolve(None, &rows(&NAMES), &mut p, Mode::Single);
        assert_eq!(sel.single(), Some(1));
        assert!(p.texts.iter().any(|t| t.contains("zeta")));
    }

    #[test]
    fn empty_store_cancels_without_asking() {
        let mut p = ScriptedPrompt::new(["1"]);
        assert!(resolve(None, &[], &mut p, Mode::Single).is_cancelled());
        assert!(p.asked.is_empty());
    }

    #[test]
    fn repeated_ambiguity_terminates() {
        let mut p = ScriptedPrompt::new(["al", "al", "al"]);
        let sel = resolve(None, &rows(&NAMES), &mut p, Mode::Single);
        // Script runs dry: empty answers pop back out and cancel.
        assert!(sel.is_cancelled());
    }
}
