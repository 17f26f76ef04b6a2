// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Preprocessing: turns raw source text into an ordered list of logical
//! lines with balanced braces, one statement header per line.

use crate::error::{LexError, SourceLocation};

/// One logical line of source, paired with its 1-based line number in
/// the original submission (used for error reporting downstream).
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLine {
    pub text: String,
    pub line: usize,
}

/// Normalize `src` into logical lines: blank lines dropped, `} ... else
/// ...` split across three lines, block headers validated to end in `{`.
pub fn preprocess(src: &str) -> Result<Vec<LogicalLine>, LexError> {
    let raw: Vec<(usize, String)> = src
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim().to_string()))
        .filter(|(_, l)| !l.is_empty())
        .collect();

    let mut out = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        let (line_no, line) = &raw[i];

        if line.contains('}') && line.contains("else") {
            if let Some((before, closing_and_after)) = split_on_brace(line) {
                if !before.is_empty() {
                    out.push(LogicalLine { text: before, line: *line_no });
                }
                out.push(LogicalLine { text: "}".to_string(), line: *line_no });
                let after = closing_and_after.trim_start();
                if !after.is_empty() {
                    out.push(LogicalLine { text: after.to_string(), line: *line_no });
                }
                i += 1;
                continue;
            }
        }

        if is_block_header(line) {
            if !line.ends_with('{') {
                return Err(LexError::MissingOpeningBrace(SourceLocation::new(*line_no, line.clone())));
            }
            out.push(LogicalLine { text: line.clone(), line: *line_no });
            let mut depth = 1i64;
            i += 1;
            while i < raw.len() && depth > 0 {
                let (bline_no, bline) = &raw[i];
                depth += bline.matches('{').count() as i64 - bline.matches('}').count() as i64;
                out.push(LogicalLine { text: bline.clone(), line: *bline_no });
                i += 1;
            }
            if depth != 0 {
                return Err(LexError::UnbalancedBraces(SourceLocation::new(*line_no, line.clone())));
            }
            continue;
        }

        out.push(LogicalLine { text: line.clone(), line: *line_no });
        i += 1;
    }

    let total_open = out.iter().map(|l| l.text.matches('{').count()).sum::<usize>();
    let total_close = out.iter().map(|l| l.text.matches('}').count()).sum::<usize>();
    if total_open != total_close {
        return Err(LexError::UnbalancedBraces(SourceLocation::unknown()));
    }

    Ok(out)
}

fn is_block_header(line: &str) -> bool {
    for kw in ["if", "while", "for"] {
        if let Some(rest) = line.strip_prefix(kw) {
            if rest.trim_start().starts_with('(') {
                return true;
            }
        }
    }
    false
}

/// Split `"... } else ..."` into `("...", "} else ...")`.
fn split_on_brace(line: &str) -> Option<(String, String)> {
    let idx = line.find('}')?;
    let before = line[..idx].trim().to_string();
    let rest = line[idx..].to_string();
    Some((before, rest))
}
