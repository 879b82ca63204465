// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command normalization and derived telemetry effects.
//!
//! Session peers exchange typed control-plane commands. Legacy consoles send
//! older type names, so every inbound command passes through a fixed alias
//! table first. Known commands map to telemetry activity flags; unrecognized
//! types pass through unchanged with no derived effect.

/// A normalized control-plane command exchanged between session peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandType {
    ShareStart,
    ShareStop,
    RemoteGrant,
    RemoteRevoke,
    CallStart,
    CallEnd,
    /// Ends the session: clears all activity flags and closes it.
    End,
    /// Unrecognized command, relayed verbatim.
    Other(String),
}

/// Telemetry keys for the derived activity flags.
pub const SHARE_ACTIVE: &str = "shareActive";
pub const REMOTE_ACTIVE: &str = "remoteActive";
pub const CALL_ACTIVE: &str = "callActive";

impl CommandType {
    /// Normalize a raw command type via the legacy alias table.
    ///
    /// Aliases: `remote_disable` -> `remote_revoke`, `remote_enable` ->
    /// `remote_grant`, `session_end` -> `end`. Normalization is total and
    /// idempotent: canonical names map to themselves and unknown names pass
    /// through as [`CommandType::Other`].
    pub fn normalize(raw: &str) -> Self {
        match raw {
            "share_start" => Self::ShareStart,
            "share_stop" => Self::ShareStop,
            "remote_grant" | "remote_enable" => Self::RemoteGrant,
            "remote_revoke" | "remote_disable" => Self::RemoteRevoke,
            "call_start" => Self::CallStart,
            "call_end" => Self::CallEnd,
            "end" | "session_end" => Self::End,
            other => Self::Other(other.to_string()),
        }
    }

    /// The canonical type string recorded in the event log and relayed to peers.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ShareStart => "share_start",
            Self::ShareStop => "share_stop",
            Self::RemoteGrant => "remote_grant",
            Self::RemoteRevoke => "remote_revoke",
            Self::CallStart => "call_start",
            Self::CallEnd => "call_end",
            Self::End => "end",
            Self::Other(raw) => raw,
        }
    }

    /// Telemetry flag writes this command implies.
    pub fn telemetry_effect(&self) -> &'static [(&'static str, bool)] {
        match self {
            Self::ShareStart => &[(SHARE_ACTIVE, true)],
            Self::ShareStop => &[(SHARE_ACTIVE, false)],
            Self::RemoteGrant => &[(REMOTE_ACTIVE, true)],
            Self::RemoteRevoke => &[(REMOTE_ACTIVE, false)],
            Self::CallStart => &[(CALL_ACTIVE, true)],
            Self::CallEnd => &[(CALL_ACTIVE, false)],
            Self::End => &[
                (SHARE_ACTIVE, false),
                (REMOTE_ACTIVE, false),
                (CALL_ACTIVE, false),
            ],
            Self::Other(_) => &[],
        }
    }

    /// Whether this command terminates the session.
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}
