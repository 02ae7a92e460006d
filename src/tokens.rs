//! Per-role request tokens used to discard stale asynchronous results

use std::fmt;

/// Independent supersession lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestRole {
    Original,
    Transformed,
    Background,
    Gallery,
}

impl RequestRole {
    const COUNT: usize = 4;

    fn index(self) -> usize {
        match self {
            Self::Original => 0,
            Self::Transformed => 1,
            Self::Background => 2,
            Self::Gallery => 3,
        }
    }
}

impl fmt::Display for RequestRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Original => "original",
            Self::Transformed => "transformed",
            Self::Background => "background",
            Self::Gallery => "gallery",
        };
        f.write_str(name)
    }
}

/// A ticket identifying one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    role: RequestRole,
    sequence: u64,
}

impl RequestToken {
    #[must_use]
    pub fn role(&self) -> RequestRole {
        self.role
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Monotonic counters, one per role
#[derive(Debug, Default, Clone)]
pub struct RequestTokens {
    latest: [u64; RequestRole::COUNT],
}

impl RequestTokens {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token, superseding every earlier token of the same role
    pub fn issue(&mut self, role: RequestRole) -> RequestToken {
        let slot = &mut self.latest[role.index()];
        *slot += 1;
        RequestToken {
            role,
            sequence: *slot,
        }
    }

    /// Whether `token` is still the most recently issued one for its role
    #[must_use]
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest[token.role.index()] == token.sequence
    }
}
