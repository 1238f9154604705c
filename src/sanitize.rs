//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Zixport.
//! The Zixport project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Cell Sanitization
//!
//! Text cleanup applied to every exported cell.
//!
//! The work is split into stages implementing [`ZiCellStage`] and composed
//! by [`ZiCellPipeline`]:
//!
//! 1. [`ZiStripHtml`] (only when the form enables HTML stripping) removes
//!    markup before anything else sees the text.
//! 2. [`ZiSanitize`] runs [`sanitize`]: separators and line breaks become
//!    spaces, optional punctuation becomes spaces, anything outside
//!    printable ASCII is dropped, whitespace runs collapse, and the result
//!    is trimmed.
//!
//! Every stage is pure and total.

use std::sync::OnceLock;

use regex::Regex;

/// Characters replaced by a space unconditionally (besides line breaks and U+00A0).
pub const SEPARATOR_CHARS: [char; 11] = ['/', '\\', '(', ')', '[', ']', '<', '>', '{', '}', '|'];

/// Characters replaced by a space when punctuation stripping is enabled.
pub const PUNCTUATION_CHARS: [char; 14] = [
    ',', '.', ':', ';', '?', '!', '&', '"', '\u{201C}', '\u{201D}', '\u{2026}', '^', '#', '*',
];

const NO_BREAK_SPACE: char = '\u{00A0}';

/// Sanitizes one raw value into CSV-safe, printable-ASCII text.
///
/// The output contains only bytes `0x20..=0x7E`, never two consecutive
/// spaces, and no leading or trailing space. Applying it twice with the
/// same flag yields the same text.
pub fn sanitize(value: &str, strip_punctuation: bool) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        let mapped = match c {
            // CRLF is one line break, not two.
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                ' '
            }
            '\n' | NO_BREAK_SPACE => ' ',
            c if SEPARATOR_CHARS.contains(&c) => ' ',
            c if strip_punctuation && PUNCTUATION_CHARS.contains(&c) => ' ',
            c => c,
        };

        if !is_printable_ascii(mapped) {
            continue;
        }
        if mapped == ' ' {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(mapped);
    }

    out
}

fn is_printable_ascii(c: char) -> bool {
    ('\u{20}'..='\u{7E}').contains(&c)
}

/// Removes markup from `value`.
///
/// `<script>` and `<style>` elements are dropped together with their
/// content, then comments and every remaining tag. Quoted attribute values
/// may contain `>`; an unterminated tag or quote swallows the rest of the
/// text. A `<` followed by whitespace is left alone, any other `<` opens a
/// tag. The result is trimmed.
pub fn strip_html_tags(value: &str) -> String {
    static BLOCKS: OnceLock<Regex> = OnceLock::new();
    static TAGS: OnceLock<Regex> = OnceLock::new();

    let blocks = BLOCKS.get_or_init(|| {
        Regex::new(r"(?is)<script[^>]*?>.*?</script\s*>|<style[^>]*?>.*?</style\s*>")
            .expect("static script/style pattern")
    });
    let tags = TAGS.get_or_init(|| {
        Regex::new(
            r#"(?s)<!--.*?(?:-->|$)|<(?:>|[^\s>](?:"[^"]*(?:"|$)|'[^']*(?:'|$)|[^'">])*(?:>|$))"#,
        )
        .expect("static tag pattern")
    });

    let without_blocks = blocks.replace_all(value, "");
    tags.replace_all(&without_blocks, "").trim().to_string()
}

/// One transformation applied to a cell value.
pub trait ZiCellStage: std::fmt::Debug + Send + Sync {
    /// Stable stage name, used in logs.
    fn name(&self) -> &'static str;

    fn apply(&self, value: String) -> String;
}

/// Markup removal stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZiStripHtml;

impl ZiCellStage for ZiStripHtml {
    fn name(&self) -> &'static str {
        "cell.strip_html"
    }

    fn apply(&self, value: String) -> String {
        strip_html_tags(&value)
    }
}

/// Character-level sanitization stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZiSanitize {
    pub strip_punctuation: bool,
}

impl ZiCellStage for ZiSanitize {
    fn name(&self) -> &'static str {
        "cell.sanitize"
    }

    fn apply(&self, value: String) -> String {
        sanitize(&value, self.strip_punctuation)
    }
}

/// Ordered composition of cell stages.
#[derive(Debug)]
pub struct ZiCellPipeline {
    stages: Vec<Box<dyn ZiCellStage>>,
}

impl ZiCellPipeline {
    pub fn new(stages: Vec<Box<dyn ZiCellStage>>) -> Self {
        Self { stages }
    }

    /// Standard pipeline for a form's text policy.
    pub fn for_policy(strip_html: bool, strip_punctuation: bool) -> Self {
        let mut stages: Vec<Box<dyn ZiCellStage>> = Vec::with_capacity(2);
        if strip_html {
            stages.push(Box::new(ZiStripHtml));
        }
        stages.push(Box::new(ZiSanitize { strip_punctuation }));
        Self::new(stages)
    }

    pub fn run(&self, value: String) -> String {
        self.stages.iter().fold(value, |acc, stage| stage.apply(acc))
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}
