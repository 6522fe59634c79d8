//! Status - status subresource に書き込む観測結果
//!
//! # 状態遷移（ReleaseKey ごと）
//! - Unset --(release なし)--> Installed
//! - Installed --(release あり)--> Upgraded
//! - Upgraded --(再 reconcile)--> Upgraded（冪等）
//!
//! Failed は存在しません。失敗は reconcile のエラーとして返し、
//! phase は最後に成功した値のまま残ります。

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase reported in the status subresource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Never converged. Serialized as the empty string.
    #[default]
    #[serde(rename = "")]
    Unset,

    /// The last convergence created the release.
    Installed,

    /// The last convergence upgraded an existing release.
    Upgraded,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Unset => "",
            Phase::Installed => "Installed",
            Phase::Upgraded => "Upgraded",
        }
    }

    /// Parse a phase written by this controller. Anything unknown reads as `Unset`.
    pub fn parse(value: &str) -> Self {
        match value {
            "Installed" => Phase::Installed,
            "Upgraded" => Phase::Upgraded,
            _ => Phase::Unset,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Phase::Unset)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Unset => f.write_str("Unset"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Observed outcome of the last successful convergence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedStatus {
    #[serde(default, skip_serializing_if = "Phase::is_unset")]
    pub phase: Phase,

    /// Empty until the first successful convergence.
    #[serde(rename = "frontendURL", default, skip_serializing_if = "String::is_empty")]
    pub frontend_url: String,

    /// Generation of the spec this status was computed from.
    #[serde(
        rename = "observedGeneration",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub observed_generation: Option<i64>,
}

impl ObservedStatus {
    pub fn converged(phase: Phase, frontend_url: impl Into<String>, generation: i64) -> Self {
        Self {
            phase,
            frontend_url: frontend_url.into(),
            observed_generation: Some(generation),
        }
    }
}
