// Contract tests for the line store lifecycle through the public api.
use std::fs;

use tabline::api::{DelimitedLineStore, ErrorKind, LineFormat, Mode, Row, StoreOptions};

fn row(fields: &[&str]) -> Row {
    fields.iter().map(|field| field.to_string()).collect()
}

fn read_all(store: &mut DelimitedLineStore) -> Vec<Row> {
    store.rows().collect::<Result<_, _>>().expect("rows")
}

#[test]
fn example_scenario() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("data.txt");

    let mut store = DelimitedLineStore::new();
    store.open(&path, Mode::Write).expect("open write");
    store.write_row(["a", "b", "c"]).expect("write");
    store.write_row(["d", "e"]).expect("write");
    store.close().expect("close");

    store.open(&path, Mode::Read).expect("open read");
    assert_eq!(store.read_row().expect("read"), Some(row(&["a", "b", "c"])));
    assert_eq!(store.read_row().expect("read"), Some(row(&["d", "e"])));
    assert_eq!(store.read_row().expect("read"), None);
    store.close().expect("close");
}

#[test]
fn sequential_integrity_and_round_trip() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("rows.tsv");
    let rows = vec![
        row(&["id", "name", "note"]),
        row(&["1", "alpha", ""]),
        row(&[" spaced ", "x"]),
        row(&["only"]),
        row(&["", "", ""]),
        row(&["unicode ✓", "naïve"]),
    ];

    let mut store = DelimitedLineStore::new();
    store.open(&path, Mode::Write).expect("open write");
    for r in &rows {
        store.write_row(r).expect("write");
    }
    store.close().expect("close");

    store.open(&path, Mode::Read).expect("open read");
    assert_eq!(read_all(&mut store), rows);
    assert_eq!(store.read_row().expect("after eof"), None);
}

#[test]
fn mode_isolation_never_touches_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("rows.tsv");
    fs::write(&path, "keep\tme\n").expect("seed");

    let mut store = DelimitedLineStore::new();
    store.open(&path, Mode::Read).expect("open read");
    let err = store.write_row(["nope"]).expect_err("write on reader");
    assert_eq!(err.kind(), ErrorKind::Mode);
    assert_eq!(store.read_row().expect("read"), Some(row(&["keep", "me"])));
    store.close().expect("close");

    store.open(&path, Mode::Write).expect("open write");
    let err = store.read_row().expect_err("read on writer");
    assert_eq!(err.kind(), ErrorKind::Mode);
    store.close().expect("close");

    assert_eq!(fs::read_to_string(&path).expect("read"), "keep\tme\n");
}

#[test]
fn row_operations_require_open_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("rows.tsv");

    let mut store = DelimitedLineStore::new();
    assert_eq!(store.read_row().expect_err("before open").kind(), ErrorKind::NotOpen);
    assert_eq!(store.write_row(["a"]).expect_err("before open").kind(), ErrorKind::NotOpen);

    store.open(&path, Mode::Write).expect("open");
    store.close().expect("close");

    assert_eq!(store.read_row().expect_err("after close").kind(), ErrorKind::NotOpen);
    assert_eq!(store.write_row(["a"]).expect_err("after close").kind(), ErrorKind::NotOpen);
}

#[test]
fn write_mode_appends_to_existing_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("rows.tsv");
    fs::write(&path, "one\t1\ntwo\t2\n").expect("seed");

    let mut store = DelimitedLineStore::new();
    store.open(&path, Mode::Write).expect("open write");
    store.write_row(["three", "3"]).expect("write");
    store.close().expect("close");

    assert_eq!(
        fs::read_to_string(&path).expect("read"),
        "one\t1\ntwo\t2\nthree\t3\n"
    );
}

#[test]
fn zero_column_rows_and_empty_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    let empty = temp.path().join("empty.tsv");
    let blank = temp.path().join("blank.tsv");

    let mut store = DelimitedLineStore::new();
    store.open(&empty, Mode::Write).expect("create");
    store.close().expect("close");
    store.open(&empty, Mode::Read).expect("open read");
    assert_eq!(store.read_row().expect("first read"), None);
    store.close().expect("close");

    store.open(&blank, Mode::Write).expect("open write");
    store.write_row(Vec::<String>::new()).expect("zero columns");
    store.write_row(["after"]).expect("write");
    store.close().expect("close");
    assert_eq!(fs::read_to_string(&blank).expect("read"), "\nafter\n");

    store.open(&blank, Mode::Read).expect("open read");
    assert_eq!(read_all(&mut store), vec![Row::new(), row(&["after"])]);
}

#[test]
fn reopen_starts_fresh_lifecycle() {
    let temp = tempfile::tempdir().expect("tempdir");
    let first = temp.path().join("first.csv");
    let second = temp.path().join("second.csv");
    let options = StoreOptions::new().with_format(LineFormat::new(",").expect("format"));

    let mut store = DelimitedLineStore::with_options(options);
    store.open(&first, Mode::Write).expect("open");
    store.write_row(["a", "b"]).expect("write");
    store.close().expect("close");

    store.open(&second, Mode::Write).expect("open second");
    assert_eq!(store.lines_processed(), 0);
    store.write_row(["c"]).expect("write");
    store.close().expect("close");

    store.open(&first, Mode::Read).expect("reopen first");
    assert_eq!(read_all(&mut store), vec![row(&["a", "b"])]);
    store.close().expect("close");

    assert_eq!(fs::read_to_string(&second).expect("read"), "c\n");
}

#[test]
fn crlf_files_read_without_carriage_returns() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("dos.tsv");
    fs::write(&path, "a\tb\r\nc\r\n").expect("seed");

    let mut store = DelimitedLineStore::new();
    store.open(&path, Mode::Read).expect("open");
    assert_eq!(read_all(&mut store), vec![row(&["a", "b"]), row(&["c"])]);
}
