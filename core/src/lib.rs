//! edsession core: save, store, and restore editor sessions.
//!
//! A session is a snapshot of which files are open, how the editor's tile
//! grid is arranged, and where the user was working. Restoring one rebuilds
//! the grid, learns which live tile sits in each saved cell, and reconciles
//! the saved files against whatever the editor has open right now.

pub mod choice;
pub mod command;
pub mod editor;
pub mod error;
pub mod help;
pub mod layout;
pub mod prompt;
pub mod reconcile;
pub mod response;
pub mod store;
pub mod sys;
pub mod types;
