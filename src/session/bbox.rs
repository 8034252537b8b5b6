use crate::session::{Person, SessionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::IntErrorKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BboxParseError {
    #[error("expected 4 comma separated values, got {0}")]
    Arity(usize),
    #[error("invalid integer {0:?}")]
    NotInteger(String),
    #[error("integer {0} does not fit in a pixel coordinate")]
    OutOfRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub const PERSON1_DEFAULT: Self = Self::new(350, 600, 220, 400);
    pub const PERSON2_DEFAULT: Self = Self::new(300, 300, 280, 300);

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn default_for(person: Person) -> Self {
        match person {
            Person::Person1 => Self::PERSON1_DEFAULT,
            Person::Person2 => Self::PERSON2_DEFAULT,
        }
    }

    pub fn parse(text: &str) -> Result<Self, BboxParseError> {
        let values = text
            .trim()
            .split(',')
            .map(|token| {
                let token = token.trim();
                token.parse::<i32>().map_err(|err| match err.kind() {
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                        BboxParseError::OutOfRange(token.to_string())
                    }
                    _ => BboxParseError::NotInteger(token.to_string()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match values.as_slice() {
            &[x, y, width, height] => Ok(Self::new(x, y, width, height)),
            other => Err(BboxParseError::Arity(other.len())),
        }
    }

    /// Blank or missing text falls back to the person's default box.
    pub fn resolve(person: Person, text: Option<&str>) -> Result<Self, SessionError> {
        let Some(text) = text.map(str::trim).filter(|text| !text.is_empty()) else {
            return Ok(Self::default_for(person));
        };

        Self::parse(text).map_err(|err| match err {
            BboxParseError::Arity(count) => SessionError::BboxArity { person, count },
            BboxParseError::NotInteger(token) => SessionError::BboxNotInteger { person, token },
            BboxParseError::OutOfRange(token) => SessionError::BboxOutOfRange { person, token },
        })
    }

    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from([x, y, width, height]: [i32; 4]) -> Self {
        Self::new(x, y, width, height)
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x, bbox.y, bbox.width, bbox.height]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x={}, y={}, w={}, h={}",
            self.x, self.y, self.width, self.height
        )
    }
}
