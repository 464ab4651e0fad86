//! Path grammar — `:`-separated segments, literal keys or numeric indices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PathError, Result};

/// The segment delimiter used in field paths and submitted input names.
pub const SEPARATOR: char = ':';

/// One segment of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    /// Numeric index into an array (or a numeric object key).
    Index(usize),
    /// Literal object key.
    Key(String),
}

impl Segment {
    fn parse(raw: &str) -> Segment {
        // All-digit segments address array positions. A leading zero on a
        // multi-digit segment is treated as a literal key ("007" is a key).
        if !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
            && (raw.len() == 1 || !raw.starts_with('0'))
        {
            if let Ok(i) = raw.parse::<usize>() {
                return Segment::Index(i);
            }
        }
        Segment::Key(raw.to_string())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Index(i) => write!(f, "{i}"),
            Segment::Key(k) => f.write_str(k),
        }
    }
}

/// A parsed path through a nested submission payload.
///
/// ```
/// use formloom_path::Path;
///
/// let path: Path = "item:0:qty".parse().unwrap();
/// assert_eq!(path.segments().len(), 3);
/// assert_eq!(path.marker_position(), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Build a path from already-parsed segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// The parsed segments, in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Position of the first numeric segment, if any.
    ///
    /// A numeric segment marks the repetition point of a field that occurs
    /// once per row of a dynamically-sized group.
    pub fn marker_position(&self) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| matches!(s, Segment::Index(_)))
    }

    /// A sibling path with the segment at `position` replaced by `index`.
    pub fn with_index(&self, position: usize, index: usize) -> Path {
        let mut segments = self.segments.clone();
        if position < segments.len() {
            segments[position] = Segment::Index(index);
        }
        Path { segments }
    }

    /// A new path with `segment` appended.
    pub fn join(&self, segment: Segment) -> Path {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Path { segments }
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        let mut segments = Vec::new();
        for (position, raw) in s.split(SEPARATOR).enumerate() {
            if raw.is_empty() {
                return Err(PathError::EmptySegment {
                    path: s.to_string(),
                    position,
                });
            }
            segments.push(Segment::parse(raw));
        }
        Ok(Path { segments })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_key() {
        let path: Path = "bio".parse().unwrap();
        assert_eq!(path.segments(), &[Segment::Key("bio".into())]);
        assert_eq!(path.marker_position(), None);
    }

    #[test]
    fn parse_mixed_segments() {
        let path: Path = "item:0:qty".parse().unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("item".into()),
                Segment::Index(0),
                Segment::Key("qty".into()),
            ]
        );
    }

    #[test]
    fn display_round_trips() {
        for raw in ["bio", "item:0:qty", "a:b:c:12"] {
            let path: Path = raw.parse().unwrap();
            assert_eq!(path.to_string(), raw);
        }
    }

    #[test]
    fn leading_zero_is_a_key() {
        let path: Path = "item:007".parse().unwrap();
        assert_eq!(path.segments()[1], Segment::Key("007".into()));
    }

    #[test]
    fn empty_path_rejected() {
        assert_eq!("".parse::<Path>(), Err(PathError::Empty));
    }

    #[test]
    fn empty_segment_rejected() {
        let err = "item::qty".parse::<Path>().unwrap_err();
        assert_eq!(
            err,
            PathError::EmptySegment {
                path: "item::qty".into(),
                position: 1
            }
        );
    }

    #[test]
    fn with_index_substitutes_marker() {
        let path: Path = "item:0:qty".parse().unwrap();
        let sibling = path.with_index(1, 4);
        assert_eq!(sibling.to_string(), "item:4:qty");
        // Original untouched
        assert_eq!(path.to_string(), "item:0:qty");
    }

    #[test]
    fn marker_position_finds_first_index() {
        let path: Path = "a:2:b:5".parse().unwrap();
        assert_eq!(path.marker_position(), Some(1));
    }
}
