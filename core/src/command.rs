//! Command: the typed interface for every session operation.
//!
//! Every argument is optional where the operation can ask for it
//! interactively instead.

use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command")]
pub enum Command {
    // -----------------------------------------------------------------
    // Session commands
    // -----------------------------------------------------------------

    #[serde(rename = "save")]
    Save {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    #[serde(rename = "open")]
    Open {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    #[serde(rename = "delete")]
    Delete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Overrides the configured `delete_confirmation`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confirm: Option<bool>,
    },

    #[serde(rename = "rename")]
    Rename {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_name: Option<String>,
    },

    #[serde(rename = "view")]
    View {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    #[serde(rename = "list")]
    List,

    #[serde(rename = "manage")]
    Manage,

    // -----------------------------------------------------------------
    // Help
    // -----------------------------------------------------------------

    #[serde(rename = "help")]
    Help {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
    },
}
