//! # Inline Text Segments
//!
//! A block's content is an ordered run of segments, each sharing one format.
//! All offsets in this module are character offsets (Unicode scalar values),
//! never byte offsets.
//!
//! Every operation here preserves the concatenated text exactly: formatting
//! only moves segment boundaries around.

use serde::{Deserialize, Serialize};

/// Inline formatting attached to a segment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFormat {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TextFormat {
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: true,
            ..Self::default()
        }
    }

    pub fn link(href: impl Into<String>) -> Self {
        Self {
            link: Some(href.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layer `other` on top of `self`
    ///
    /// Flags are additive; `link` and `color` from `other` win when set.
    pub fn merged(&self, other: &TextFormat) -> TextFormat {
        TextFormat {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            underline: self.underline || other.underline,
            strikethrough: self.strikethrough || other.strikethrough,
            code: self.code || other.code,
            link: other.link.clone().or_else(|| self.link.clone()),
            color: other.color.clone().or_else(|| self.color.clone()),
        }
    }
}

/// A run of text sharing one format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegment {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<TextFormat>,
}

impl TextSegment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: None,
        }
    }

    pub fn formatted(text: impl Into<String>, format: TextFormat) -> Self {
        Self {
            text: text.into(),
            format: normalize_format(Some(format)),
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

fn normalize_format(format: Option<TextFormat>) -> Option<TextFormat> {
    format.filter(|f| !f.is_empty())
}

/// Concatenated plain text of a segment run
pub fn plain_text(segments: &[TextSegment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}

/// Total length in characters
pub fn char_len(segments: &[TextSegment]) -> usize {
    segments.iter().map(TextSegment::char_len).sum()
}

/// Byte index of the `char_offset`-th character (clamped to the end)
pub fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Drop empty segments, clear empty formats, and coalesce equal neighbours
pub fn normalize(segments: Vec<TextSegment>) -> Vec<TextSegment> {
    let mut out: Vec<TextSegment> = Vec::with_capacity(segments.len());

    for segment in segments {
        if segment.text.is_empty() {
            continue;
        }
        let segment = TextSegment {
            text: segment.text,
            format: normalize_format(segment.format),
        };

        match out.last_mut() {
            Some(last) if last.format == segment.format => last.text.push_str(&segment.text),
            _ => out.push(segment),
        }
    }

    out
}

/// Split a segment run at a character offset, keeping formats on both halves
pub fn split_segments(segments: &[TextSegment], offset: usize) -> (Vec<TextSegment>, Vec<TextSegment>) {
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut pos = 0;

    for segment in segments {
        let len = segment.char_len();
        if pos + len <= offset {
            before.push(segment.clone());
        } else if pos >= offset {
            after.push(segment.clone());
        } else {
            let cut = byte_index(&segment.text, offset - pos);
            before.push(TextSegment {
                text: segment.text[..cut].to_string(),
                format: segment.format.clone(),
            });
            after.push(TextSegment {
                text: segment.text[cut..].to_string(),
                format: segment.format.clone(),
            });
        }
        pos += len;
    }

    (normalize(before), normalize(after))
}

/// Insert `text` at a character offset
///
/// The inserted run takes the format of the character before it, so typing
/// at the end of a bold word stays bold.
pub fn insert_text(segments: &[TextSegment], offset: usize, text: &str) -> Vec<TextSegment> {
    let offset = offset.min(char_len(segments));
    let (mut before, after) = split_segments(segments, offset);
    let format = before.last().and_then(|s| s.format.clone());

    before.push(TextSegment {
        text: text.to_string(),
        format,
    });
    before.extend(after);
    normalize(before)
}

/// Remove the characters in `[start, end)`, keeping the remaining formats
pub fn delete_range(segments: &[TextSegment], start: usize, end: usize) -> Vec<TextSegment> {
    let len = char_len(segments);
    let start = start.min(len);
    let end = end.clamp(start, len);

    let (mut before, _) = split_segments(segments, start);
    let (_, after) = split_segments(segments, end);
    before.extend(after);
    normalize(before)
}

/// Merge `format` into the characters in `[start, end)`
///
/// Offsets are clamped to the text. On unformatted text the result has at
/// most three segments: before, formatted middle, after.
pub fn format_range(
    segments: &[TextSegment],
    start: usize,
    end: usize,
    format: &TextFormat,
) -> Vec<TextSegment> {
    let len = char_len(segments);
    let start = start.min(len);
    let end = end.clamp(start, len);

    if start == end || format.is_empty() {
        return normalize(segments.to_vec());
    }

    let mut out = Vec::with_capacity(segments.len() + 2);
    let mut pos = 0;

    for segment in segments {
        let seg_len = segment.char_len();
        let seg_end = pos + seg_len;

        let a = start.clamp(pos, seg_end) - pos;
        let b = end.clamp(pos, seg_end) - pos;
        let a_byte = byte_index(&segment.text, a);
        let b_byte = byte_index(&segment.text, b);

        let existing = segment.format.clone().unwrap_or_default();

        out.push(TextSegment {
            text: segment.text[..a_byte].to_string(),
            format: segment.format.clone(),
        });
        out.push(TextSegment {
            text: segment.text[a_byte..b_byte].to_string(),
            format: Some(existing.merged(format)),
        });
        out.push(TextSegment {
            text: segment.text[b_byte..].to_string(),
            format: segment.format.clone(),
        });

        pos = seg_end;
    }

    normalize(out)
}
