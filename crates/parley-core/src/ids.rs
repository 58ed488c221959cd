//! Client identifiers and the haiku-style generator that produces them.
//!
//! An [`Identifier`] names one currently-connected client. Identifiers are
//! short, human-readable tokens such as `silent-river-0412`, built from two
//! fixed 64-word vocabularies and a numeric token. Uniqueness is not the
//! generator's concern; the connection registry retries on collision.

use std::borrow::Borrow;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default exclusive upper bound of the numeric token.
pub const DEFAULT_TOKEN_RANGE: u32 = 10_000;

const ADJECTIVES: [&str; 64] = [
    "autumn", "hidden", "bitter", "misty", "silent", "empty", "dry", "dark",
    "summer", "icy", "delicate", "quiet", "white", "cool", "spring", "winter",
    "patient", "twilight", "dawn", "crimson", "wispy", "weathered", "blue", "billowing",
    "broken", "cold", "damp", "falling", "frosty", "green", "long", "late",
    "lingering", "bold", "little", "morning", "muddy", "old", "red", "rough",
    "still", "small", "sparkling", "shy", "wandering", "withered", "wild", "black",
    "young", "holy", "solitary", "fragrant", "aged", "snowy", "proud", "floral",
    "restless", "divine", "polished", "ancient", "purple", "lively", "nameless", "gentle",
];

const NOUNS: [&str; 64] = [
    "waterfall", "river", "breeze", "moon", "rain", "wind", "sea", "morning",
    "snow", "lake", "sunset", "pine", "shadow", "leaf", "dawn", "glitter",
    "forest", "hill", "cloud", "meadow", "sun", "glade", "bird", "brook",
    "butterfly", "bush", "dew", "dust", "field", "fire", "flower", "firefly",
    "feather", "grass", "haze", "mountain", "night", "pond", "darkness", "snowflake",
    "silence", "sound", "sky", "shape", "surf", "thunder", "violet", "water",
    "wildflower", "wave", "resonance", "wood", "dream", "cherry", "tree", "fog",
    "frost", "voice", "paper", "frog", "smoke", "star", "stone", "harbor",
];

/// A client identifier, unique among currently-registered connections.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Wrap an existing string value.
    #[must_use]
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume self and return the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Source of candidate identifiers.
///
/// Implementations must always return a candidate and must be cheap to call
/// repeatedly. They know nothing about which identifiers are in use.
pub trait IdGenerator: Send + Sync {
    /// Produce one candidate identifier.
    fn generate(&self) -> Identifier;
}

/// `adjective-noun-NNNN` generator backed by the thread-local RNG.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HaikuGenerator {
    token_range: u32,
}

impl HaikuGenerator {
    /// Create a generator whose numeric token is drawn from `0..token_range`.
    ///
    /// A `token_range` of zero disables the numeric suffix.
    pub fn new(token_range: u32) -> Self {
        Self { token_range }
    }

    /// Exclusive upper bound of the numeric token.
    pub fn token_range(&self) -> u32 {
        self.token_range
    }

    /// Number of distinct identifiers this generator can produce.
    pub fn space_size(&self) -> u64 {
        let words = (ADJECTIVES.len() * NOUNS.len()) as u64;
        words * u64::from(self.token_range.max(1))
    }

    fn token_width(&self) -> usize {
        match self.token_range {
            0 | 1 => 1,
            n => (n - 1).to_string().len(),
        }
    }
}

impl Default for HaikuGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_RANGE)
    }
}

impl IdGenerator for HaikuGenerator {
    fn generate(&self) -> Identifier {
        let mut rng = rand::rng();
        let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
        let noun = NOUNS[rng.random_range(0..NOUNS.len())];
        if self.token_range == 0 {
            return Identifier(format!("{adjective}-{noun}"));
        }
        let token = rng.random_range(0..self.token_range);
        let width = self.token_width();
        Identifier(format!("{adjective}-{noun}-{token:0width$}"))
    }
}
