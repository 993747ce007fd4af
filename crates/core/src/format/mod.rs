//! Token dumps and tokenizer statistics for whole script files.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::error::{VnError, VnResult};
use crate::graph::CallGraph;
use crate::script::ScriptFile;
use crate::token::{Token, TokenKind, TokenType};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    pub dump_tokens: bool,
    pub raw: bool,
    pub offsets: bool,
    /// ANSI colors by token kind.
    pub color: bool,
    pub token_frequency: bool,
    pub follow_frequency: bool,
    pub element_lengths: bool,
    /// Prefix length over which chunk start frequencies are counted.
    pub element_start_len: Option<usize>,
    /// Number of tokens before a failure counted by type.
    pub pre_error_len: Option<usize>,
    /// Collect the contents of every chunk with exactly this length.
    pub dump_length: Option<usize>,
    pub continue_on_failure: bool,
    pub callgraph: bool,
}

/// Chunk counts and byte totals split by tokenizer outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub succeeded: usize,
    pub succeeded_bytes: usize,
    pub failed: usize,
    pub failed_bytes: usize,
}

impl ParseStats {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn total_bytes(&self) -> usize {
        self.succeeded_bytes + self.failed_bytes
    }

    /// The summary line; percentages are zero when nothing failed.
    pub fn failure_line(&self) -> String {
        format!(
            "-------- Failed to parse {}/{}({:.2}%) data blocks containing {}/{}({:.2}%) bytes",
            self.failed,
            self.total(),
            percent(self.failed, self.total()),
            self.failed_bytes,
            self.total_bytes(),
            percent(self.failed_bytes, self.total_bytes()),
        )
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if part == 0 || total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChunkKind {
    Event,
    Conv,
}

impl ChunkKind {
    fn prefix(self) -> &'static str {
        match self {
            ChunkKind::Event => "es",
            ChunkKind::Conv => "cs",
        }
    }
}

type FollowKey = (Option<TokenType>, Option<TokenType>);

/// Accumulates token dumps and statistics over any number of script files.
#[derive(Debug, Default)]
pub struct TokenFormatter {
    options: FormatOptions,
    out: String,
    stats: ParseStats,
    token_freq: BTreeMap<TokenType, usize>,
    follow_freq: BTreeMap<FollowKey, usize>,
    element_lengths: BTreeMap<usize, usize>,
    element_starts: BTreeMap<Vec<u8>, usize>,
    length_dump: BTreeMap<Vec<u8>, usize>,
    pre_error: BTreeMap<String, usize>,
    callgraph: Option<CallGraph>,
}

impl TokenFormatter {
    pub fn new(options: FormatOptions) -> Self {
        let callgraph = options.callgraph.then(CallGraph::new);
        Self {
            options,
            callgraph,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn callgraph(&self) -> Option<&CallGraph> {
        self.callgraph.as_ref()
    }

    /// Text written so far.
    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.out)
    }

    /// Tokenizes every event chunk of `script`.
    pub fn process_event_chunks(&mut self, script: &ScriptFile) -> VnResult<()> {
        self.process_chunks(script, ChunkKind::Event)
    }

    /// Tokenizes every conversation chunk of `script`.
    pub fn process_conv_chunks(&mut self, script: &ScriptFile) -> VnResult<()> {
        self.process_chunks(script, ChunkKind::Conv)
    }

    fn process_chunks(&mut self, script: &ScriptFile, kind: ChunkKind) -> VnResult<()> {
        let count = match kind {
            ChunkKind::Event => script.event_count(),
            ChunkKind::Conv => script.conv_count(),
        };
        if count == 0 {
            return Ok(());
        }
        if self.options.dump_tokens {
            let _ = writeln!(self.out, "-------- tokenized {}:", script.name());
        }
        let capture_raw = self.options.raw || script.options().capture_raw;

        for index in 0..count {
            let data = match kind {
                ChunkKind::Event => script.event_chunk(index)?,
                ChunkKind::Conv => script.conv_chunk(index)?,
            }
            .get_data();
            let size = data.len();
            if let Some(len) = self.options.element_start_len {
                *self
                    .element_starts
                    .entry(data[..len.min(size)].to_vec())
                    .or_default() += 1;
            }
            if self.options.element_lengths {
                *self.element_lengths.entry(size).or_default() += 1;
            }
            if self.options.dump_length == Some(size) {
                *self.length_dump.entry(data.to_vec()).or_default() += 1;
            }

            let segment = format!("{}:{}{index}", script.name(), kind.prefix());
            let tokenized = match kind {
                ChunkKind::Event => script.tokenize_event(index, capture_raw),
                ChunkKind::Conv => script.tokenize_conv(index, capture_raw),
            };
            match tokenized {
                Ok(tokens) => {
                    self.stats.succeeded += 1;
                    self.stats.succeeded_bytes += size;
                    self.process_tokens(&tokens, Some(&segment), script);
                    if let (Some(graph), ChunkKind::Event) = (self.callgraph.as_mut(), kind) {
                        graph.add_chunk(script, index, &tokens);
                    }
                }
                Err(failure) => {
                    self.stats.failed += 1;
                    self.stats.failed_bytes += size;
                    let _ = writeln!(
                        self.out,
                        "-------- Failed to tokenize({segment}): {}\n  '{}'\n  {}.",
                        failure.error,
                        data.escape_ascii(),
                        hex_bytes(data)
                    );
                    if !self.options.continue_on_failure {
                        return Err(VnError::AtToken {
                            position: segment,
                            source: Box::new(failure.error),
                        });
                    }
                    tracing::warn!(segment = %segment, error = %failure.error, "chunk failed to tokenize");
                    if failure.tokens.is_empty() {
                        continue;
                    }
                    if let Some(len) = self.options.pre_error_len {
                        let skip = failure.tokens.len().saturating_sub(len);
                        for token in &failure.tokens[skip..] {
                            *self
                                .pre_error
                                .entry(token.token_type().to_string())
                                .or_default() += 1;
                        }
                    }
                    self.process_tokens(&failure.tokens, None, script);
                    if let (Some(graph), ChunkKind::Event) = (self.callgraph.as_mut(), kind) {
                        graph.add_partial_chunk(script, index, &failure.tokens);
                    }
                }
            }
        }
        tracing::info!(
            script = script.name(),
            chunks = count,
            failed = self.stats.failed,
            "processed {} chunks",
            kind.prefix()
        );
        Ok(())
    }

    fn process_tokens(&mut self, tokens: &[Token], segment: Option<&str>, script: &ScriptFile) {
        if self.options.follow_frequency {
            let mut prev = None;
            for token in tokens {
                let current = Some(token.token_type());
                *self.follow_freq.entry((prev, current)).or_default() += 1;
                prev = current;
            }
            *self.follow_freq.entry((prev, None)).or_default() += 1;
        }
        if self.options.token_frequency {
            for token in tokens {
                *self.token_freq.entry(token.token_type()).or_default() += 1;
            }
        }
        if self.options.dump_tokens {
            if let Some(segment) = segment {
                let _ = writeln!(self.out, "-------- {} tokens({segment})", script.name());
            }
            let table = self.format_tokens_hr(tokens, script);
            self.out.push_str(&table);
        }
    }

    /// Token rows, two-space indented. A row ends after each token that
    /// carries the line-break hint.
    pub fn format_tokens_hr(&self, tokens: &[Token], script: &ScriptFile) -> String {
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut row: Vec<String> = Vec::new();
        for token in tokens {
            if row.is_empty() && self.options.offsets {
                row.push(format!("{:#x}", token.offset()));
            }
            row.push(self.format_token(token, script));
            if token.linebreak() {
                rows.push(std::mem::take(&mut row));
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
        if rows.is_empty() {
            return String::new();
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut builder = Builder::default();
        for mut row in rows {
            row.resize(width, String::new());
            builder.push_record(row);
        }
        let table = builder.build().with(Style::blank()).to_string();
        let mut out = String::with_capacity(table.len());
        for line in table.lines() {
            let _ = writeln!(out, "  {}", line.trim_end());
        }
        out
    }

    fn format_token(&self, token: &Token, script: &ScriptFile) -> String {
        let mut cell = token.format_hr(script);
        if self.options.raw {
            if let Some(raw) = token.raw() {
                let _ = write!(cell, " [{}]", hex_bytes(raw.get_data()));
            }
        }
        if self.options.color {
            cell = format!("\x1b[{}m{cell}\x1b[0m", color_code(token));
        }
        cell
    }

    /// Statistics tables for everything processed so far.
    pub fn summary(&self, name: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "---------------- Summary ({name}):");
        let _ = writeln!(out, "{}", self.stats.failure_line());

        if self.options.element_lengths {
            let _ = writeln!(out, "-------- Element length frequency dump:");
            let entries: Vec<(String, usize)> = self
                .element_lengths
                .iter()
                .rev()
                .map(|(len, count)| (len.to_string(), *count))
                .collect();
            out.push_str(&frequency_table("length", entries));
        }

        if self.options.token_frequency {
            let _ = writeln!(out, "-------- token frequency dump:");
            let mut entries: Vec<(String, usize)> = self
                .token_freq
                .iter()
                .map(|(tt, count)| (tt.to_string(), *count))
                .collect();
            entries.sort_by_key(|(_, count)| *count);
            out.push_str(&frequency_table("type", entries));
        }

        if self.options.follow_frequency {
            let _ = writeln!(out, "-------- token follow frequency dump:");
            out.push_str(&self.follow_table());
        }

        if let Some(len) = self.options.element_start_len {
            let _ = writeln!(out, "-------- element start frequencies ({len} bytes):");
            out.push_str(&frequency_table(
                "start",
                sorted_entries(&self.element_starts, |start| hex_bytes(start)),
            ));
        }

        if let Some(len) = self.options.dump_length {
            let _ = writeln!(out, "-------- Elements with length {len}:");
            out.push_str(&frequency_table(
                "data",
                sorted_entries(&self.length_dump, |data| data.escape_ascii().to_string()),
            ));
        }

        if self.options.pre_error_len.is_some() {
            let _ = writeln!(out, "-------- Pre-error token frequencies:");
            out.push_str(&frequency_table(
                "type",
                sorted_entries(&self.pre_error, Clone::clone),
            ));
        }
        out
    }

    /// Predecessor-by-successor matrix over every type seen, with the chunk
    /// boundary as `-`.
    fn follow_table(&self) -> String {
        let types: BTreeSet<Option<TokenType>> = self
            .follow_freq
            .keys()
            .flat_map(|(prev, next)| [*prev, *next])
            .collect();
        let label = |tt: &Option<TokenType>| tt.map_or_else(|| "-".to_string(), |tt| tt.to_string());

        let mut builder = Builder::default();
        builder.push_record(
            std::iter::once("p\\suc".to_string()).chain(types.iter().map(label)),
        );
        for prev in &types {
            builder.push_record(std::iter::once(label(prev)).chain(types.iter().map(|next| {
                self.follow_freq
                    .get(&(*prev, *next))
                    .copied()
                    .unwrap_or(0)
                    .to_string()
            })));
        }
        let mut table = builder.build().with(Style::markdown()).to_string();
        table.push('\n');
        table
    }
}

fn sorted_entries<K>(map: &BTreeMap<K, usize>, label: impl Fn(&K) -> String) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = map.iter().map(|(key, count)| (label(key), *count)).collect();
    entries.sort_by_key(|(_, count)| *count);
    entries
}

fn frequency_table(key: &str, entries: Vec<(String, usize)>) -> String {
    let mut builder = Builder::default();
    builder.push_record(["count".to_string(), key.to_string()]);
    for (label, count) in entries {
        builder.push_record([count.to_string(), label]);
    }
    let mut table = builder.build().with(Style::markdown()).to_string();
    table.push('\n');
    table
}

fn color_code(token: &Token) -> &'static str {
    match token.kind() {
        TokenKind::Event(_) => "36",
        TokenKind::Conv(_) => "33",
        TokenKind::Text(_) => "32",
        TokenKind::Textblock(_) => "35",
        TokenKind::NonTokenData(_) => "90",
    }
}

pub(crate) fn hex_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
#[path = "tests/format_tests.rs"]
mod tests;
