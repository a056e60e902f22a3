// File: diff.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

//! Line diffing between captured response bodies: a unified diff for the
//! operator's diff view and an opcode-based block diff for side-by-side
//! highlighting. Both bound their *input* to a byte budget before any
//! computation so arbitrarily large bodies cannot stall the tool, and both
//! only borrow the bodies - stored results are never mutated.

use std::collections::HashMap;

/// Input byte budget for unified diffs.
pub const UNIFIED_INPUT_BUDGET: usize = 100_000;
/// Input byte budget for the side-by-side block diff.
pub const BLOCK_INPUT_BUDGET: usize = 50_000;

const CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// One edit operation over line ranges `a[a_start..a_end]` /
/// `b[b_start..b_end]`, in the classic longest-matching-block style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpTag,
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

fn truncate_to_budget(text: &str, budget: usize) -> (&str, bool) {
    if text.len() <= budget {
        return (text, false);
    }
    let mut cut = budget;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    (&text[..cut], true)
}

fn find_longest_match(
    a: &[&str],
    b2j: &HashMap<&str, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best_i = alo;
    let mut best_j = blo;
    let mut best_size = 0usize;
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, line) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut new_j2len: HashMap<usize, usize> = HashMap::new();
        if let Some(indices) = b2j.get(line) {
            for &j in indices {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = if j > 0 {
                    j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
                } else {
                    1
                };
                new_j2len.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        j2len = new_j2len;
    }

    (best_i, best_j, best_size)
}

/// Compute the edit opcode sequence between two line slices.
pub fn opcodes(a: &[&str], b: &[&str]) -> Vec<Opcode> {
    let mut b2j: HashMap<&str, Vec<usize>> = HashMap::new();
    for (j, line) in b.iter().enumerate() {
        b2j.entry(line).or_default().push(j);
    }

    let mut queue = vec![(0usize, a.len(), 0usize, b.len())];
    let mut matching: Vec<(usize, usize, usize)> = Vec::new();
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = find_longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k > 0 {
            matching.push((i, j, k));
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
    }
    matching.sort_unstable();
    matching.push((a.len(), b.len(), 0));

    let mut ops = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    for (ai, bj, size) in matching {
        let tag = if i < ai && j < bj {
            Some(OpTag::Replace)
        } else if i < ai {
            Some(OpTag::Delete)
        } else if j < bj {
            Some(OpTag::Insert)
        } else {
            None
        };
        if let Some(tag) = tag {
            ops.push(Opcode {
                tag,
                a_start: i,
                a_end: ai,
                b_start: j,
                b_end: bj,
            });
        }
        if size > 0 {
            ops.push(Opcode {
                tag: OpTag::Equal,
                a_start: ai,
                a_end: ai + size,
                b_start: bj,
                b_end: bj + size,
            });
        }
        i = ai + size;
        j = bj + size;
    }
    ops
}

fn grouped_opcodes(mut codes: Vec<Opcode>, context: usize) -> Vec<Vec<Opcode>> {
    if codes.is_empty() {
        return Vec::new();
    }

    if codes[0].tag == OpTag::Equal {
        let c = codes[0];
        codes[0] = Opcode {
            a_start: c.a_start.max(c.a_end.saturating_sub(context)),
            b_start: c.b_start.max(c.b_end.saturating_sub(context)),
            ..c
        };
    }
    if let Some(last) = codes.last_mut() {
        if last.tag == OpTag::Equal {
            last.a_end = last.a_end.min(last.a_start + context);
            last.b_end = last.b_end.min(last.b_start + context);
        }
    }

    let mut groups: Vec<Vec<Opcode>> = Vec::new();
    let mut group: Vec<Opcode> = Vec::new();
    for code in codes {
        let mut code = code;
        if code.tag == OpTag::Equal && code.a_end - code.a_start > 2 * context {
            group.push(Opcode {
                a_end: (code.a_start + context).min(code.a_end),
                b_end: (code.b_start + context).min(code.b_end),
                ..code
            });
            groups.push(std::mem::take(&mut group));
            code.a_start = code.a_start.max(code.a_end.saturating_sub(context));
            code.b_start = code.b_start.max(code.b_end.saturating_sub(context));
        }
        group.push(code);
    }
    if !group.is_empty() && !(group.len() == 1 && group[0].tag == OpTag::Equal) {
        groups.push(group);
    }
    groups
}

fn format_range(start: usize, end: usize) -> String {
    let length = end - start;
    if length == 1 {
        return format!("{}", start + 1);
    }
    let beginning = if length == 0 { start } else { start + 1 };
    format!("{},{}", beginning, length)
}

fn display_line(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}

/// Line-oriented unified diff between two bodies, capped at `max_lines`
/// emitted lines. Overflow is marked explicitly, never dropped silently.
/// Line terminators participate in the comparison, so a missing trailing
/// newline is a real difference.
pub fn unified_diff(
    primary: &str,
    other: &str,
    from_label: &str,
    to_label: &str,
    max_lines: usize,
) -> Vec<String> {
    let (primary, primary_truncated) = truncate_to_budget(primary, UNIFIED_INPUT_BUDGET);
    let (other, other_truncated) = truncate_to_budget(other, UNIFIED_INPUT_BUDGET);

    let a: Vec<&str> = primary.split_inclusive('\n').collect();
    let b: Vec<&str> = other.split_inclusive('\n').collect();
    if a == b {
        return Vec::new();
    }

    let mut out: Vec<String> = Vec::new();
    if primary_truncated || other_truncated {
        out.push(format!(
            "[input truncated to {}KB per side before diffing]",
            UNIFIED_INPUT_BUDGET / 1000
        ));
    }
    out.push(format!("--- {}", from_label));
    out.push(format!("+++ {}", to_label));

    'groups: for group in grouped_opcodes(opcodes(&a, &b), CONTEXT_LINES) {
        let first = group[0];
        let last = group[group.len() - 1];
        out.push(format!(
            "@@ -{} +{} @@",
            format_range(first.a_start, last.a_end),
            format_range(first.b_start, last.b_end)
        ));

        for code in group {
            match code.tag {
                OpTag::Equal => {
                    for line in &a[code.a_start..code.a_end] {
                        out.push(format!(" {}", display_line(line)));
                        if out.len() >= max_lines {
                            break 'groups;
                        }
                    }
                }
                OpTag::Replace | OpTag::Delete => {
                    for line in &a[code.a_start..code.a_end] {
                        out.push(format!("-{}", display_line(line)));
                        if out.len() >= max_lines {
                            break 'groups;
                        }
                    }
                    if code.tag == OpTag::Replace {
                        for line in &b[code.b_start..code.b_end] {
                            out.push(format!("+{}", display_line(line)));
                            if out.len() >= max_lines {
                                break 'groups;
                            }
                        }
                    }
                }
                OpTag::Insert => {
                    for line in &b[code.b_start..code.b_end] {
                        out.push(format!("+{}", display_line(line)));
                        if out.len() >= max_lines {
                            break 'groups;
                        }
                    }
                }
            }
        }
    }

    if out.len() >= max_lines {
        out.push(format!(
            "... [diff truncated, showing first {} lines]",
            max_lines
        ));
    }
    out
}

/// Classification of one rendered line in a side-by-side pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Unchanged,
    Replace,
    Delete,
    Insert,
}

#[derive(Debug, Clone)]
pub struct BlockLine {
    pub kind: BlockKind,
    pub text: String,
}

/// Two aligned panes for side-by-side rendering, each line classified for
/// independent highlighting.
#[derive(Debug, Clone)]
pub struct BlockDiff {
    pub left: Vec<BlockLine>,
    pub right: Vec<BlockLine>,
    pub left_truncated: bool,
    pub right_truncated: bool,
}

/// Opcode-based equal/replace/delete/insert decomposition between exactly
/// two bodies.
pub fn block_diff(left: &str, right: &str) -> BlockDiff {
    let (left, left_truncated) = truncate_to_budget(left, BLOCK_INPUT_BUDGET);
    let (right, right_truncated) = truncate_to_budget(right, BLOCK_INPUT_BUDGET);

    let a: Vec<&str> = left.lines().collect();
    let b: Vec<&str> = right.lines().collect();

    let mut out = BlockDiff {
        left: Vec::new(),
        right: Vec::new(),
        left_truncated,
        right_truncated,
    };

    for code in opcodes(&a, &b) {
        match code.tag {
            OpTag::Equal => {
                for line in &a[code.a_start..code.a_end] {
                    out.left.push(BlockLine {
                        kind: BlockKind::Unchanged,
                        text: line.to_string(),
                    });
                }
                for line in &b[code.b_start..code.b_end] {
                    out.right.push(BlockLine {
                        kind: BlockKind::Unchanged,
                        text: line.to_string(),
                    });
                }
            }
            OpTag::Replace => {
                for line in &a[code.a_start..code.a_end] {
                    out.left.push(BlockLine {
                        kind: BlockKind::Replace,
                        text: line.to_string(),
                    });
                }
                for line in &b[code.b_start..code.b_end] {
                    out.right.push(BlockLine {
                        kind: BlockKind::Replace,
                        text: line.to_string(),
                    });
                }
            }
            OpTag::Delete => {
                for line in &a[code.a_start..code.a_end] {
                    out.left.push(BlockLine {
                        kind: BlockKind::Delete,
                        text: line.to_string(),
                    });
                }
            }
            OpTag::Insert => {
                for line in &b[code.b_start..code.b_end] {
                    out.right.push(BlockLine {
                        kind: BlockKind::Insert,
                        text: line.to_string(),
                    });
                }
            }
        }
    }

    out
}
