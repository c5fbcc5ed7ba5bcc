use std::{fmt, sync::{Arc, LazyLock}};

use regex::Regex;

use crate::{error::BuildError, map::Level};

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("static regex"));

/// Stable key for a unit within a level.
/// Keeps the zero-padded code text but avoids repeated owned Strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitCode {
    level: Level,
    code: Arc<str>, // e.g. "13101" for a municipality, "1301" for a district
}

impl UnitCode {
    /// Normalize a raw code to the level's fixed width.
    ///
    /// Accepts spreadsheet artefacts such as `"1100.0"` and surrounding text
    /// (`"01100_札幌市"`); the first run of digits is taken as the code. A
    /// municipality code given at the prefecture level is truncated to its
    /// 2-digit prefecture prefix.
    pub fn normalize(level: Level, raw: &str) -> Result<Self, BuildError> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        let digits = DIGITS.find(trimmed)
            .map(|m| m.as_str())
            .ok_or_else(|| BuildError::InvalidCode { level, raw: raw.to_string() })?;

        let width = level.code_width();
        let code = match digits.len() {
            n if n <= width => format!("{digits:0>width$}"),
            4 | 5 if level == Level::Prefecture => format!("{digits:0>5}")[..2].to_string(),
            _ => return Err(BuildError::InvalidCode { level, raw: raw.to_string() }),
        };

        Ok(Self { level, code: Arc::from(code) })
    }

    /// Build a code from text already known to be normalized.
    pub(crate) fn new_unchecked(level: Level, code: &str) -> Self {
        debug_assert_eq!(code.len(), level.code_width(), "code {code:?} has wrong width for {level}");
        Self { level, code: Arc::from(code) }
    }

    #[inline] pub fn level(&self) -> Level { self.level }

    #[inline] pub fn as_str(&self) -> &str { &self.code }

    /// The 2-digit prefecture prefix shared by district and municipality codes.
    pub fn prefecture_prefix(&self) -> Option<UnitCode> {
        match self.level {
            Level::District | Level::Municipality => {
                Some(UnitCode::new_unchecked(Level::Prefecture, &self.code[..2]))
            }
            Level::Prefecture => Some(self.clone()),
            Level::Block => None,
        }
    }
}

impl fmt::Display for UnitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}
