//! Aspect ratio values and parsing.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fixed width:height ratio, both sides strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AspectRatio {
    pub width: f64,
    pub height: f64,
}

impl AspectRatio {
    /// 4:3, the default crop ratio.
    pub const FOUR_THREE: Self = Self {
        width: 4.0,
        height: 3.0,
    };

    /// 1:1 square.
    pub const SQUARE: Self = Self {
        width: 1.0,
        height: 1.0,
    };

    pub fn new(width: f64, height: f64) -> Result<Self> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(width) && ok(height) {
            Ok(Self { width, height })
        } else {
            Err(AppError::InvalidRatio(format!("{}:{}", width, height)))
        }
    }

    /// Width divided by height.
    pub fn value(&self) -> f64 {
        self.width / self.height
    }

    /// File-name friendly form, e.g. `4x3`.
    pub fn suffix(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AppError;

    /// Accepts `4:3`, `4x3`, `4/3` or a bare decimal such as `1.5`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || AppError::InvalidRatio(s.to_string());
        let number = |part: &str| part.trim().parse::<f64>().map_err(|_| invalid());

        match s.split_once([':', 'x', 'X', '/']) {
            Some((w, h)) => Self::new(number(w)?, number(h)?).map_err(|_| invalid()),
            None => Self::new(number(s)?, 1.0).map_err(|_| invalid()),
        }
    }
}

/// Which aspect ratio an export targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AspectRatioMode {
    /// A fixed target ratio.
    Fixed(AspectRatio),
    /// Keep the source image's own ratio.
    Original,
}

impl AspectRatioMode {
    /// Resolves the mode to a concrete ratio for the given source ratio.
    pub fn resolve(&self, source_ratio: f64) -> AspectRatio {
        match self {
            Self::Fixed(ratio) => *ratio,
            Self::Original => AspectRatio {
                width: source_ratio,
                height: 1.0,
            },
        }
    }

    /// Suffix used in output file names: `4x3`, `1x1`, `original`.
    pub fn suffix(&self) -> String {
        match self {
            Self::Fixed(ratio) => ratio.suffix(),
            Self::Original => "original".to_string(),
        }
    }
}

impl Default for AspectRatioMode {
    fn default() -> Self {
        Self::Fixed(AspectRatio::FOUR_THREE)
    }
}

impl fmt::Display for AspectRatioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(ratio) => write!(f, "{}", ratio),
            Self::Original => f.write_str("original"),
        }
    }
}

impl FromStr for AspectRatioMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("original") {
            Ok(Self::Original)
        } else {
            s.parse().map(Self::Fixed)
        }
    }
}

impl TryFrom<String> for AspectRatioMode {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AspectRatioMode> for String {
    fn from(mode: AspectRatioMode) -> Self {
        mode.to_string()
    }
}
