//! Codec module - Line-oriented record file codec
//!
//! Record files are ordered sequences of text blocks. A block starts at a
//! line beginning with `### [` and runs to the line before the next such
//! header (or end of file). Anything before the first header is the file
//! headline.
//!
//! Blocks that fail to parse are carried as raw text and re-emitted
//! byte-for-byte on encode: a hand-edited or half-corrupted file loses
//! nothing when the store rewrites it. Parsed blocks re-encode in
//! canonical form, so `encode(decode(t))` is textually stable for any
//! file this codec wrote.

mod handoff;
mod lesson;

/// Line prefix that opens a record block
pub const BLOCK_HEADER_PREFIX: &str = "### [";

// ============================================================================
// CODEC TRAIT
// ============================================================================

/// A record type that can be read from and written to a text block.
pub trait Codec: Sized {
    /// Parse one block. `None` means the block should be kept raw.
    fn decode_block(block: &str) -> Option<Self>;

    /// Render the canonical block text, ending in a single newline.
    fn encode_block(&self) -> String;
}

// ============================================================================
// BLOCK / DOCUMENT
// ============================================================================

/// One block of a record file
#[derive(Debug, Clone, PartialEq)]
pub enum Block<T> {
    /// A block this codec understands
    Parsed(T),
    /// Unparseable text, preserved byte-for-byte
    Raw(String),
}

/// An in-memory record file: headline plus ordered blocks
#[derive(Debug, Clone, PartialEq)]
pub struct Document<T> {
    /// Text before the first block header, preserved byte-for-byte
    pub headline: String,
    /// Blocks in file order
    pub blocks: Vec<Block<T>>,
}

impl<T> Default for Document<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Document<T> {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            headline: String::new(),
            blocks: Vec::new(),
        }
    }

    /// Create an empty document with a headline
    pub fn with_headline(headline: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            blocks: Vec::new(),
        }
    }

    /// Iterate parsed records in file order
    pub fn records(&self) -> impl Iterator<Item = &T> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Parsed(r) => Some(r),
            Block::Raw(_) => None,
        })
    }

    /// Iterate parsed records mutably
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.blocks.iter_mut().filter_map(|b| match b {
            Block::Parsed(r) => Some(r),
            Block::Raw(_) => None,
        })
    }

    /// Number of parsed records
    pub fn record_count(&self) -> usize {
        self.records().count()
    }

    /// Number of raw (unparseable) blocks
    pub fn raw_count(&self) -> usize {
        self.blocks.len() - self.record_count()
    }

    /// Append a parsed record at the end of the file
    pub fn push(&mut self, record: T) {
        self.blocks.push(Block::Parsed(record));
    }

    /// Remove and return the first parsed record matching the predicate.
    /// Raw blocks are never removed.
    pub fn remove_record<F>(&mut self, mut pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let idx = self.blocks.iter().position(|b| match b {
            Block::Parsed(r) => pred(r),
            Block::Raw(_) => false,
        })?;
        match self.blocks.remove(idx) {
            Block::Parsed(r) => Some(r),
            Block::Raw(_) => unreachable!("position matched a parsed block"),
        }
    }

    /// Remove every parsed record matching the predicate, returning them
    /// in file order. Raw blocks stay put.
    pub fn drain_records<F>(&mut self, mut pred: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.blocks.len());
        for block in self.blocks.drain(..) {
            match block {
                Block::Parsed(r) if pred(&r) => removed.push(r),
                other => kept.push(other),
            }
        }
        self.blocks = kept;
        removed
    }
}

impl<T: Codec> Document<T> {
    /// Parse a whole record file.
    pub fn decode(text: &str) -> Self {
        let (headline, raw_blocks) = split_blocks(text);
        let blocks = raw_blocks
            .into_iter()
            .map(|raw| match T::decode_block(&raw) {
                Some(record) => Block::Parsed(record),
                None => Block::Raw(raw),
            })
            .collect();
        Self { headline, blocks }
    }

    /// Render the whole record file.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(1024);
        out.push_str(&self.headline);
        for block in &self.blocks {
            match block {
                Block::Raw(raw) => out.push_str(raw),
                Block::Parsed(record) => {
                    out.push_str(&record.encode_block());
                    out.push('\n');
                }
            }
        }
        out
    }
}

// ============================================================================
// TEXT HELPERS
// ============================================================================

/// Split file text into the headline and the raw text of each block.
/// Every byte of the input lands in exactly one of the pieces.
pub fn split_blocks(text: &str) -> (String, Vec<String>) {
    let mut headline = String::new();
    let mut blocks: Vec<String> = Vec::new();

    for line in text.split_inclusive('\n') {
        if line.starts_with(BLOCK_HEADER_PREFIX) {
            blocks.push(String::from(line));
        } else if let Some(current) = blocks.last_mut() {
            current.push_str(line);
        } else {
            headline.push_str(line);
        }
    }

    (headline, blocks)
}

/// Scan raw file text for the highest numeric id stem carrying `prefix`.
///
/// Looks at block header lines only, but deliberately at ALL of them,
/// parsed or not: an id inside a malformed block is still taken, and
/// must never be reassigned.
pub fn max_id_stem(text: &str, prefix: char) -> u32 {
    text.lines()
        .filter_map(|line| header_id(line))
        .filter_map(|id| {
            let rest = id.strip_prefix(prefix)?;
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u32>().ok()
        })
        .max()
        .unwrap_or(0)
}

/// Extract the bracketed id from a block header line.
pub fn header_id(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(BLOCK_HEADER_PREFIX)?;
    let end = rest.find(']')?;
    let id = &rest[..end];
    if id.is_empty() { None } else { Some(id) }
}

/// Split one `- **Key**: value | **Key**: value | (flag)` metadata line
/// into its ` | `-separated segments.
pub(crate) fn meta_segments(line: &str) -> impl Iterator<Item = &str> {
    line.trim_start()
        .trim_start_matches('-')
        .trim_start()
        .split(" | ")
        .map(str::trim)
}

/// Parse one `**Key**: value` segment. Returns `None` for bare segments
/// such as the `(no-promote)` flag.
pub(crate) fn parse_pair(segment: &str) -> Option<(&str, &str)> {
    let rest = segment.strip_prefix("**")?;
    let (key, value) = rest.split_once("**:")?;
    Some((key, value.trim()))
}

/// Render a single-line field value: interior newlines collapse to
/// spaces so the line-oriented format cannot be broken from inside.
pub(crate) fn single_line(value: &str) -> String {
    value.replace(['\n', '\r'], " ").trim().to_string()
}
