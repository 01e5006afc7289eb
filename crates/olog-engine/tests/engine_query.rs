//! End-to-end queries over on-disk log chains.

mod common;

use common::{CollectSink, delivered, schema, write_log};
use olog_core::compose::{ComposeRecord, RecordForm, compose, compose_header};
use olog_engine::{Engine, EngineConfig, NullResolver, Query};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn engine_for(dir: &TempDir) -> Engine {
    Engine::new(EngineConfig::new(dir.path()))
}

async fn run_query(dir: &TempDir, query: &Query) -> (CollectSink, olog_engine::RunOutput) {
    let engine = engine_for(dir);
    let mut sink = CollectSink::default();
    let output = engine
        .run(query, &mut NullResolver, &mut sink, CancellationToken::new())
        .await
        .unwrap();
    (sink, output)
}

#[tokio::test]
async fn scenario_a_exact_window() {
    let dir = TempDir::new().unwrap();
    write_log(
        &dir.path().join("OUTPUT_LOG.0"),
        &[
            delivered(0x6000_0000, "one.dat"),
            delivered(0x6000_0010, "two.dat"),
            delivered(0x6000_0020, "three.dat"),
        ],
    );

    let query = Query::new(0x6000_0005).with_end_time(0x6000_0018);
    let (sink, output) = run_query(&dir, &query).await;

    let rows = sink.rows();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].text.contains("two.dat"));
    assert_eq!(output.state.total_matched, 1);
    assert_eq!(output.state.total_bytes, 1024);
    assert_eq!(output.state.first_ts, Some(0x6000_0010));
    assert_eq!(output.state.last_ts, Some(0x6000_0010));
}

#[tokio::test]
async fn scenario_d_negated_glob() {
    let dir = TempDir::new().unwrap();
    write_log(
        &dir.path().join("OUTPUT_LOG.0"),
        &[
            delivered(100, "a.txt"),
            delivered(101, "b.bak"),
            delivered(102, "c.dat"),
        ],
    );

    let query = Query::new(0)
        .with_end_time(1000)
        .with_file_name_filters(["!*.bak", "*"]);
    let (sink, _) = run_query(&dir, &query).await;

    let names: Vec<&str> = sink
        .rows()
        .iter()
        .map(|r| {
            if r.text.contains("a.txt") {
                "a.txt"
            } else if r.text.contains("c.dat") {
                "c.dat"
            } else {
                "?"
            }
        })
        .collect();
    assert_eq!(names, vec!["a.txt", "c.dat"]);
}

#[tokio::test]
async fn list_limit_stops_delivery() {
    let dir = TempDir::new().unwrap();
    let records: Vec<_> = (0..10u64).map(|i| delivered(100 + i, "f.dat")).collect();
    write_log(&dir.path().join("OUTPUT_LOG.0"), &records);

    let query = Query::new(0).with_end_time(1000).with_list_limit(3);
    let (sink, output) = run_query(&dir, &query).await;

    assert_eq!(sink.rows().len(), 3);
    assert_eq!(output.state.total_matched, 3);
    assert!(
        sink.statuses()
            .iter()
            .any(|s| s.contains("List limit (3) reached!")),
        "statuses: {:?}",
        sink.statuses()
    );
}

#[tokio::test]
async fn no_data_found_status() {
    let dir = TempDir::new().unwrap();
    write_log(
        &dir.path().join("OUTPUT_LOG.0"),
        &[delivered(100, "a.dat")],
    );

    // Window entirely before the only record.
    let query = Query::new(10).with_end_time(20);
    let (sink, output) = run_query(&dir, &query).await;

    assert_eq!(output.state.total_matched, 0);
    assert_eq!(sink.statuses(), vec!["No data found"]);
}

#[tokio::test]
async fn rotation_idempotence() {
    // Property: scanning OUTPUT_LOG.1 (older) and OUTPUT_LOG.0 (newer)
    // separately matches the same set as their concatenation in one file.
    let older: Vec<_> = (0..5u64).map(|i| delivered(100 + i, "old.dat")).collect();
    let newer: Vec<_> = (0..5u64).map(|i| delivered(200 + i, "new.dat")).collect();

    let split_dir = TempDir::new().unwrap();
    write_log(&split_dir.path().join("OUTPUT_LOG.1"), &older);
    write_log(&split_dir.path().join("OUTPUT_LOG.0"), &newer);

    let joined_dir = TempDir::new().unwrap();
    let mut joined = older.clone();
    joined.extend(newer.clone());
    write_log(&joined_dir.path().join("OUTPUT_LOG.0"), &joined);

    let query = Query::new(0).with_end_time(1000);
    let (split_sink, _) = run_query(&split_dir, &query).await;
    let (joined_sink, _) = run_query(&joined_dir, &query).await;

    let mut split_rows: Vec<String> = split_sink.rows().iter().map(|r| r.text.clone()).collect();
    let mut joined_rows: Vec<String> = joined_sink.rows().iter().map(|r| r.text.clone()).collect();
    split_rows.sort();
    joined_rows.sort();
    assert_eq!(split_rows, joined_rows);

    // And the split scan delivered the newer file first.
    let first_file_numbers: Vec<u32> = split_sink.rows().iter().map(|r| r.file_number).collect();
    assert_eq!(first_file_numbers[..5], [0, 0, 0, 0, 0]);
    assert_eq!(first_file_numbers[5..], [1, 1, 1, 1, 1]);
}

#[tokio::test]
async fn cancellation_emits_final_summary_once() {
    let dir = TempDir::new().unwrap();
    let records: Vec<_> = (0..50u64).map(|i| delivered(100 + i, "f.dat")).collect();
    write_log(&dir.path().join("OUTPUT_LOG.0"), &records);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let engine = engine_for(&dir);
    let mut sink = CollectSink::default();
    let query = Query::new(0).with_end_time(1000);
    engine
        .run(&query, &mut NullResolver, &mut sink, cancel)
        .await
        .unwrap();

    // No batches after the cancel was observed, and exactly one terminal
    // summary.
    assert!(sink.rows().is_empty());
    assert_eq!(sink.summary_count(), 1);
    assert_eq!(sink.statuses().len(), 1);
}

#[tokio::test]
async fn scenario_f_confirmation_toggle() {
    let dir = TempDir::new().unwrap();
    let mut confirmation = delivered(100, "c.dat");
    confirmation.form = RecordForm::V2 { output_digit: '7' };
    write_log(
        &dir.path().join("OUTPUT_LOG.0"),
        &[delivered(99, "a.dat"), confirmation],
    );

    let query = Query::new(0).with_end_time(1000);
    let (sink, _) = run_query(&dir, &query).await;
    assert_eq!(sink.rows().len(), 1, "confirmation must be skipped");

    let mut query = Query::new(0).with_end_time(1000);
    query.view_confirmation = true;
    let (sink, _) = run_query(&dir, &query).await;
    assert_eq!(sink.rows().len(), 2);
    // The confirmation row carries its kind letter as archive marker.
    assert!(sink.rows().iter().any(|r| r.text.ends_with('r')));
}

#[tokio::test]
async fn archived_only_requires_live_archive() {
    let dir = TempDir::new().unwrap();

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let keep_until = format!("h1/0/{:x}_42/kept.dat", now + 10_000);

    let mut archived = delivered(100, "kept.dat");
    archived.archive = Some(&keep_until);
    write_log(
        &dir.path().join("OUTPUT_LOG.0"),
        &[archived, delivered(101, "plain.dat")],
    );

    let mut query = Query::new(0).with_end_time(1000);
    query.view_archived_only = true;
    let (sink, _) = run_query(&dir, &query).await;

    let rows = sink.rows();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].text.contains("kept.dat"));
    assert!(rows[0].archived);
    assert!(rows[0].text.ends_with('Y'));
}

#[tokio::test]
async fn item_offsets_reopen_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("OUTPUT_LOG.0");
    write_log(
        &path,
        &[delivered(100, "a.dat"), delivered(101, "b.dat")],
    );

    let query = Query::new(0).with_end_time(1000);
    let (_, output) = run_query(&dir, &query).await;

    let content = std::fs::read(&path).unwrap();
    assert_eq!(output.item_lists.len(), 1);
    let items = &output.item_lists[0];
    assert_eq!(items.len(), 2);

    let header_len = compose_header(&schema()).len() as u64;
    let first = items.get(0).unwrap();
    assert_eq!(first.line_offset, header_len);

    // The data offset anchors the job-id field of the record.
    for entry in items.iter() {
        let at = entry.data_offset as usize;
        assert!(content[at..].starts_with(b"12345678"));
        // And the line offset is a record start.
        let line_start = entry.line_offset as usize;
        assert!(line_start == 0 || content[line_start - 1] == b'\n');
    }
}

#[tokio::test]
async fn mixed_generations_in_one_file() {
    // Old rotated chains can contain records of every head layout.
    let dir = TempDir::new().unwrap();
    let schema = schema();
    let mut content = compose_header(&schema);
    for (i, form) in [
        RecordForm::V0,
        RecordForm::V1 { output_digit: '0' },
        RecordForm::V2 { output_digit: '0' },
    ]
    .into_iter()
    .enumerate()
    {
        let record = ComposeRecord {
            form,
            ..delivered(100 + i as u64, "gen.dat")
        };
        content.push_str(&compose(&schema, &record));
    }
    std::fs::write(dir.path().join("OUTPUT_LOG.0"), content).unwrap();

    let query = Query::new(0).with_end_time(1000);
    let (sink, output) = run_query(&dir, &query).await;
    assert_eq!(sink.rows().len(), 3);
    assert_eq!(output.state.total_matched, 3);
}
