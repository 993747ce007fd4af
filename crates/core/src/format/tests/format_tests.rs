use super::*;
use crate::games::Game;
use crate::graph::NodeId;
use crate::tests_fixture::{av, concat, Sc3Builder};

/// es0 is a delay followed by an end; es1 hits an unknown opcode after one token.
fn sample_script() -> ScriptFile {
    Sc3Builder::new()
        .event(concat(&[&[0x10, 0x1e], &av(1), &[0x00, 0x06]]))
        .event(vec![0x10, 0x04, 0x77])
        .parse(Game::Ever17)
}

/// Trimmed cells of every markdown table row in `text`.
fn table_rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .filter(|line| line.starts_with('|'))
        .map(|line| {
            line.trim_matches('|')
                .split('|')
                .map(|cell| cell.trim().to_string())
                .collect()
        })
        .collect()
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

fn tolerant(options: FormatOptions) -> FormatOptions {
    FormatOptions {
        continue_on_failure: true,
        ..options
    }
}

#[test]
fn failure_line_reports_ratios() {
    let stats = ParseStats {
        succeeded: 3,
        succeeded_bytes: 30,
        failed: 1,
        failed_bytes: 10,
    };
    assert_eq!(
        stats.failure_line(),
        "-------- Failed to parse 1/4(25.00%) data blocks containing 10/40(25.00%) bytes"
    );
    assert_eq!(
        ParseStats::default().failure_line(),
        "-------- Failed to parse 0/0(0.00%) data blocks containing 0/0(0.00%) bytes"
    );
}

#[test]
fn failed_chunks_are_counted_and_dumped() {
    let script = sample_script();
    let mut formatter = TokenFormatter::new(tolerant(FormatOptions::default()));
    formatter.process_event_chunks(&script).expect("continues");

    let stats = formatter.stats();
    assert_eq!((stats.succeeded, stats.failed), (1, 1));
    assert_eq!((stats.succeeded_bytes, stats.failed_bytes), (7, 3));
    assert!(formatter
        .output()
        .contains("-------- Failed to tokenize(test:es1): "));
    assert!(formatter.output().contains("10 04 77."));
    assert!(formatter
        .summary("test")
        .contains("Failed to parse 1/2(50.00%) data blocks containing 3/10(30.00%) bytes"));
}

#[test]
fn failures_stop_processing_by_default() {
    let script = sample_script();
    let mut formatter = TokenFormatter::new(FormatOptions::default());
    let err = formatter
        .process_event_chunks(&script)
        .expect_err("unknown opcode");
    match &err {
        VnError::AtToken { position, .. } => assert_eq!(position, "test:es1"),
        other => panic!("expected positioned error, got {other:?}"),
    }
    assert!(matches!(err.root(), VnError::UnknownOpcode { .. }));
    assert_eq!(formatter.stats().failed, 1);
}

#[test]
fn token_rows_carry_offsets_and_break_after_chunk_ends() {
    let script = sample_script();
    let mut formatter = TokenFormatter::new(tolerant(FormatOptions {
        dump_tokens: true,
        offsets: true,
        ..FormatOptions::default()
    }));
    formatter.process_event_chunks(&script).expect("continues");
    let output = formatter.take_output();
    assert!(output.contains("-------- tokenized test:"));
    assert!(output.contains("-------- test tokens(test:es0)"));

    let row = output
        .lines()
        .find(|line| line.contains("10-1e delay"))
        .expect("delay row");
    assert!(row.trim_start().starts_with("0x14"));
    assert!(row.contains("00-06 end"));
    assert!(formatter.output().is_empty());
}

#[test]
fn frequency_tables_cover_partial_tokens() {
    let script = sample_script();
    let mut formatter = TokenFormatter::new(tolerant(FormatOptions {
        token_frequency: true,
        follow_frequency: true,
        pre_error_len: Some(2),
        ..FormatOptions::default()
    }));
    formatter.process_event_chunks(&script).expect("continues");
    let summary = formatter.summary("test");

    assert!(summary.contains("-------- token frequency dump:"));
    for op in ["10-1e", "00-06", "10-04"] {
        assert!(summary.contains(op), "{op} missing from\n{summary}");
    }
    assert!(summary.contains("-------- token follow frequency dump:"));
    assert!(summary.contains("p\\suc"));
    assert!(summary.contains("-------- Pre-error token frequencies:"));
}

#[test]
fn length_tables_collect_chunk_data() {
    let script = sample_script();
    let mut formatter = TokenFormatter::new(tolerant(FormatOptions {
        element_lengths: true,
        element_start_len: Some(2),
        dump_length: Some(3),
        ..FormatOptions::default()
    }));
    formatter.process_event_chunks(&script).expect("continues");
    let summary = formatter.summary("test");

    assert!(summary.contains("-------- Element length frequency dump:"));
    let rows = table_rows(&summary);
    assert!(rows.contains(&row(&["count", "length"])));
    assert!(rows.contains(&row(&["1", "7"])));
    assert!(rows.contains(&row(&["1", "3"])));
    assert!(rows.contains(&row(&["1", "10 1e"])));
    assert!(rows.contains(&row(&["1", "10 04"])));
    assert!(summary.contains("-------- Elements with length 3:"));
    assert!(summary.contains("\\x10\\x04w"));
}

#[test]
fn callgraph_includes_failed_chunks_without_fall_through() {
    let script = sample_script();
    let mut formatter = TokenFormatter::new(tolerant(FormatOptions {
        callgraph: true,
        ..FormatOptions::default()
    }));
    formatter.process_event_chunks(&script).expect("continues");
    let graph = formatter.callgraph().expect("callgraph enabled");
    assert!(graph.contains(&NodeId::new("test", 0)));
    assert!(graph.contains(&NodeId::new("test", 1)));
    assert_eq!(graph.edges().count(), 0);
}

#[test]
fn conversation_chunks_are_processed_separately() {
    let script = Sc3Builder::new()
        .event(vec![0x00, 0x06])
        .conv(vec![0x02, 0x02])
        .parse(Game::Ever17);
    let mut formatter = TokenFormatter::new(FormatOptions {
        token_frequency: true,
        ..FormatOptions::default()
    });
    formatter.process_conv_chunks(&script).expect("tokenizes");
    assert_eq!(formatter.stats().succeeded, 1);
    assert_eq!(formatter.stats().succeeded_bytes, 2);
    assert!(table_rows(&formatter.summary("test")).contains(&row(&["2", "02"])));
}
