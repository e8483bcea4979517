/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Editors and viewers.
//!
//! Every terminal on a channel is either the editor, whose mutations are authoritative and broadcast
//! to everyone else, or a viewer, which only displays the replicated ledger. The role is resolved
//! locally from hints supplied when the terminal starts (and again on explicit user action); it is not
//! negotiated over the network, and nothing prevents two terminals from both resolving to editor.
//!
//! ## Resolution order
//!
//! The first matching rule wins:
//! 1. An explicit view override (e.g. a launch parameter).
//! 2. The viewport heuristic: narrow viewports default to viewer.
//! 3. Editor.
//!
//! ## Authority arbitration
//!
//! Optionally, editors stamp their messages with the [epoch](Epoch) at which they became editor, and
//! viewers only accept snapshots from the highest epoch they have seen (see [`AuthorityTracker`]).
//! This is off by default, in which case the last snapshot observed always wins.

use std::fmt::{self, Display, Formatter};

use crate::types::basic::{ChannelKey, Epoch};

/// Viewports narrower than this many pixels default to [`Role::Viewer`].
pub const DEFAULT_NARROW_VIEWPORT_WIDTH: u32 = 768;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Editor,
    Viewer,
}

impl Role {
    pub fn may_mutate(&self) -> bool {
        matches!(self, Role::Editor)
    }

    /// Parse a view override. Device names are accepted as aliases, matching how the display modes are
    /// labelled: laptops edit, phones view.
    pub fn from_override(view: &str) -> Option<Role> {
        match view.trim().to_ascii_lowercase().as_str() {
            "editor" | "edit" | "laptop" | "master" => Some(Role::Editor),
            "viewer" | "view" | "mobile" | "android" | "iphone" => Some(Role::Viewer),
            _ => None,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Role::Editor => f.write_str("Editor"),
            Role::Viewer => f.write_str("Viewer"),
        }
    }
}

/// Local, out-of-band information used to resolve a terminal's role.
#[derive(Clone, Debug, Default)]
pub struct RoleHint {
    /// Explicit view override. Unrecognized values are ignored.
    pub view_override: Option<String>,
    /// Width of the display, in pixels, if known.
    pub viewport_width: Option<u32>,
}

impl RoleHint {
    pub fn editor() -> Self {
        Self {
            view_override: Some("editor".to_string()),
            viewport_width: None,
        }
    }

    pub fn viewer() -> Self {
        Self {
            view_override: Some("viewer".to_string()),
            viewport_width: None,
        }
    }
}

/// Resolve the role of a terminal from `hint`.
pub fn resolve_role(hint: &RoleHint, narrow_viewport_width: u32) -> Role {
    if let Some(role) = hint.view_override.as_deref().and_then(Role::from_override) {
        return role;
    }
    match hint.viewport_width {
        Some(width) if width < narrow_viewport_width => Role::Viewer,
        _ => Role::Editor,
    }
}

/// Resolve the channel key: an explicit query parameter wins, then the key this device used last,
/// then the default.
pub fn resolve_channel_key(query: Option<&str>, last_used: Option<ChannelKey>) -> ChannelKey {
    query
        .and_then(ChannelKey::parse)
        .or(last_used)
        .unwrap_or_default()
}

/// Viewer-side record of the highest authority epoch observed on the channel.
#[derive(Clone, Debug, Default)]
pub struct AuthorityTracker {
    highest: Option<Epoch>,
}

impl AuthorityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highest(&self) -> Option<Epoch> {
        self.highest
    }

    /// Record `epoch` and return whether a message carrying it is authoritative. Messages without an
    /// epoch are only authoritative while no epoch has been seen.
    pub fn admit(&mut self, epoch: Option<Epoch>) -> bool {
        match (epoch, self.highest) {
            (Some(epoch), Some(highest)) if epoch < highest => false,
            (Some(epoch), _) => {
                self.highest = Some(epoch);
                true
            }
            (None, highest) => highest.is_none(),
        }
    }

    pub fn reset(&mut self) {
        self.highest = None
    }
}
