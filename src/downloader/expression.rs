// Format selector expressions
//
// The selection policy is built as a typed value; `Display` renders it in
// yt-dlp's selector grammar:
//   a/b      alternatives, first satisfiable wins
//   v+a      merge a video stream with an audio stream
//   bestvideo / bestaudio / best, optional `*`, optional [ext=...] filter

use std::fmt;

use super::errors::DownloadError;

/// Which track kind a `best` wildcard looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Any,
}

/// One stream reference inside an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRef {
    /// A literal format id from a probe
    Id(String),
    /// Best stream of a kind, optionally restricted to a container.
    /// `mixed` also admits streams that carry the other track kind.
    Best {
        kind: TrackKind,
        ext: Option<String>,
        mixed: bool,
    },
}

impl StreamRef {
    /// Literal id; rejects characters that would change the expression's meaning
    pub fn id(format_id: &str) -> Result<Self, DownloadError> {
        let id = format_id.trim();
        let has_metachar = id
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '+' | '[' | ']' | '(' | ')' | ',' | '*'));
        if id.is_empty() || has_metachar {
            return Err(DownloadError::InvalidIntent(format!(
                "format id '{}' is not a plain id",
                format_id
            )));
        }
        Ok(Self::Id(id.to_string()))
    }

    pub fn best(kind: TrackKind) -> Self {
        Self::Best {
            kind,
            ext: None,
            mixed: false,
        }
    }

    pub fn best_in(kind: TrackKind, ext: &str) -> Self {
        Self::Best {
            kind,
            ext: Some(ext.to_string()),
            mixed: false,
        }
    }

    pub fn best_mixed(kind: TrackKind) -> Self {
        Self::Best {
            kind,
            ext: None,
            mixed: true,
        }
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.write_str(id),
            Self::Best { kind, ext, mixed } => {
                let word = match kind {
                    TrackKind::Video => "bestvideo",
                    TrackKind::Audio => "bestaudio",
                    TrackKind::Any => "best",
                };
                f.write_str(word)?;
                if *mixed {
                    f.write_str("*")?;
                }
                if let Some(ext) = ext {
                    write!(f, "[ext={}]", ext)?;
                }
                Ok(())
            }
        }
    }
}

/// One alternative: a single stream or a video+audio merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Single(StreamRef),
    Merge(StreamRef, StreamRef),
}

impl Choice {
    pub fn is_merge(&self) -> bool {
        matches!(self, Self::Merge(..))
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(stream) => write!(f, "{}", stream),
            Self::Merge(video, audio) => write!(f, "{}+{}", video, audio),
        }
    }
}

/// Ordered fallback chain of choices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorExpr {
    alternatives: Vec<Choice>,
}

impl SelectorExpr {
    pub fn new(first: Choice) -> Self {
        Self {
            alternatives: vec![first],
        }
    }

    /// Append a fallback evaluated when everything before it is unsatisfiable
    pub fn or(mut self, next: Choice) -> Self {
        self.alternatives.push(next);
        self
    }

    /// Whether the preferred alternative merges two streams
    pub fn prefers_merge(&self) -> bool {
        self.alternatives.first().is_some_and(Choice::is_merge)
    }
}

impl fmt::Display for SelectorExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, choice) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", choice)?;
        }
        Ok(())
    }
}
