//! Deployment environments a world can live in.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The environment that owns a store.
///
/// A world identifier is only unique within one environment; the pair
/// `(environment, world id)` is the real key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Environment {
    Local,
    Beta,
    Prod,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Local
    }
}

impl Environment {
    /// Directory name used by the file-system stores.
    pub fn dir_name(&self) -> String {
        self.to_string()
    }
}
