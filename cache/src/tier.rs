use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three independent storage backends an entry can live in.
///
/// The same key in two tiers refers to two unrelated entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
  /// Process-lifetime map. Never serialized.
  #[default]
  Memory,
  /// Survives restarts. Entries are stored as JSON in the local backend.
  DurableLocal,
  /// Lives as long as the session backend does. Same encoding as `DurableLocal`.
  DurableSession,
}

impl Tier {
  pub const ALL: [Tier; 3] = [Tier::Memory, Tier::DurableLocal, Tier::DurableSession];

  pub fn as_str(&self) -> &'static str {
    match self {
      Tier::Memory => "memory",
      Tier::DurableLocal => "durable-local",
      Tier::DurableSession => "durable-session",
    }
  }

  /// Whether entries in this tier go through JSON encoding.
  pub fn is_durable(&self) -> bool {
    !matches!(self, Tier::Memory)
  }
}

impl fmt::Display for Tier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
