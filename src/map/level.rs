use std::{fmt, str::FromStr};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A layer of the administrative/electoral hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    District,       // Single-member electoral district (小選挙区)
    Municipality,   // City, town, village or designated-city ward
    Prefecture,     // Municipality -> Prefecture
    Block,          // Prefecture -> Proportional-representation block
}

impl Level {
    /// All levels, in build order.
    pub const ALL: [Level; 4] = [Level::District, Level::Municipality, Level::Prefecture, Level::Block];

    /// Lowercase name used for file names and config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::District => "district",
            Level::Municipality => "municipality",
            Level::Prefecture => "prefecture",
            Level::Block => "block",
        }
    }

    /// Fixed width of a normalized code at this level.
    pub fn code_width(&self) -> usize {
        match self {
            Level::District => 4,
            Level::Municipality => 5,
            Level::Prefecture => 2,
            Level::Block => 2,
        }
    }

    /// Exact number of units this level must contain, if the level has a fixed cardinality.
    pub fn expected_count(&self) -> Option<usize> {
        match self {
            Level::District => Some(289),
            Level::Municipality => None,
            Level::Prefecture => Some(47),
            Level::Block => Some(11),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "district" | "senkyoku" => Level::District,
            "municipality" | "muni" => Level::Municipality,
            "prefecture" | "pref" => Level::Prefecture,
            "block" => Level::Block,
            other => bail!("unknown level: {other:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_cardinalities() {
        assert_eq!(Level::District.expected_count(), Some(289));
        assert_eq!(Level::Prefecture.expected_count(), Some(47));
        assert_eq!(Level::Block.expected_count(), Some(11));
        assert_eq!(Level::Municipality.expected_count(), None);
    }

    #[test]
    fn parse_round_trips_display() {
        for level in Level::ALL {
            assert_eq!(level.to_string().parse::<Level>().unwrap(), level);
        }
        assert!("county".parse::<Level>().is_err());
    }
}
