//! Incremental narration/answer classification of streamed agent text.
//!
//! Agent text interleaves user-facing answer text with narration regions
//! wrapped in a delimiter pair (`<thinking>` ... `</thinking>` by default).
//! Deltas arrive split at arbitrary points, so a delimiter can straddle two
//! or more chunks. [`StreamClassifier`] holds back any tail that could still
//! grow into the delimiter it is waiting for and emits everything else as
//! soon as it is unambiguous.

use regex::Regex;

use quarry_core::config::ChatConfig;

// =============================================================================
// Delimiters
// =============================================================================

/// The opening/closing pair that marks a narration region.
#[derive(Debug, Clone)]
pub struct Delimiters {
    open: String,
    close: String,
    region: Regex,
}

impl Delimiters {
    /// Build a delimiter pair. Returns `None` if either side is empty.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Option<Self> {
        let open = open.into();
        let close = close.into();
        if open.is_empty() || close.is_empty() {
            return None;
        }
        let pattern = format!("(?s){}(.*?){}", regex::escape(&open), regex::escape(&close));
        let region = Regex::new(&pattern).ok()?;
        Some(Self {
            open,
            close,
            region,
        })
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }

    /// Split a complete text into `(narration, answer)`.
    ///
    /// Each narration region's inner text is trimmed and the regions are
    /// joined with newlines. The answer is the text with every region
    /// removed, trimmed. An unterminated opening delimiter stays in the
    /// answer as literal text.
    pub fn split_narration(&self, text: &str) -> (String, String) {
        let narration = self
            .region
            .captures_iter(text)
            .map(|caps| caps[1].trim().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let answer = self.region.replace_all(text, "").trim().to_string();
        (narration, answer)
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        let defaults = ChatConfig::default();
        Self::from(&defaults)
    }
}

impl From<&ChatConfig> for Delimiters {
    fn from(config: &ChatConfig) -> Self {
        Self::new(config.narration_open.clone(), config.narration_close.clone())
            .or_else(|| {
                tracing::warn!("Empty narration delimiter in config; using <thinking> tags");
                Self::new("<thinking>", "</thinking>")
            })
            .expect("built-in narration delimiters are valid")
    }
}

// =============================================================================
// Segments
// =============================================================================

/// Classification of an emitted segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Narration,
    Answer,
}

/// A classified, non-empty run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub content: String,
}

impl Segment {
    fn new(kind: SegmentKind, content: String) -> Self {
        Self { kind, content }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Outside,
    Inside,
}

// =============================================================================
// StreamClassifier
// =============================================================================

/// Stateful splitter for one exchange's text deltas.
#[derive(Debug)]
pub struct StreamClassifier {
    delimiters: Delimiters,
    buffer: String,
    region: Region,
}

impl StreamClassifier {
    pub fn new(delimiters: Delimiters) -> Self {
        Self {
            delimiters,
            buffer: String::new(),
            region: Region::Outside,
        }
    }

    /// Whether the classifier is currently inside a narration region.
    pub fn in_narration(&self) -> bool {
        self.region == Region::Inside
    }

    /// Bytes currently held back.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Append a delta and return every segment that is now unambiguous.
    pub fn feed(&mut self, delta: &str) -> Vec<Segment> {
        self.buffer.push_str(delta);
        let mut segments = Vec::new();

        while !self.buffer.is_empty() {
            let (delimiter, kind) = match self.region {
                Region::Outside => (self.delimiters.open.as_str(), SegmentKind::Answer),
                Region::Inside => (self.delimiters.close.as_str(), SegmentKind::Narration),
            };

            if let Some(idx) = self.buffer.find(delimiter) {
                if idx > 0 {
                    segments.push(Segment::new(kind, self.buffer[..idx].to_string()));
                }
                self.buffer.drain(..idx + delimiter.len());
                self.region = match self.region {
                    Region::Outside => Region::Inside,
                    Region::Inside => Region::Outside,
                };
                continue;
            }

            let held = partial_delimiter_len(&self.buffer, delimiter);
            let ready = self.buffer.len() - held;
            if ready > 0 {
                segments.push(Segment::new(kind, self.buffer.drain(..ready).collect()));
            }
            break;
        }

        segments
    }

    /// Emit whatever is still buffered under the current classification.
    pub fn flush(&mut self) -> Option<Segment> {
        if self.buffer.is_empty() {
            return None;
        }
        let kind = match self.region {
            Region::Outside => SegmentKind::Answer,
            Region::Inside => SegmentKind::Narration,
        };
        Some(Segment::new(kind, std::mem::take(&mut self.buffer)))
    }
}

/// Length of the longest proper prefix of `delimiter` that `text` ends with.
fn partial_delimiter_len(text: &str, delimiter: &str) -> usize {
    (1..delimiter.len())
        .rev()
        .filter(|&i| delimiter.is_char_boundary(i))
        .find(|&i| text.ends_with(&delimiter[..i]))
        .unwrap_or(0)
}

// =============================================================================
// Tests
// =============================================================================
