//! Purpose: Hold top-level CLI command dispatch for `tabline`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: `read` emits one JSON array per row on stdout, in file order.
//! Invariants: `write` appends rows one at a time; rows before a bad input line stay written.

use std::io::{BufRead, Write};

use super::*;

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "tabline", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Read { path, format } => {
            let options = StoreOptions::new().with_format(format.line_format()?);
            let mut store = DelimitedLineStore::with_options(options);
            store.open(&path, Mode::Read)?;

            let stdout = io::stdout();
            let mut out = stdout.lock();
            for row in store.rows() {
                let row = row?;
                let json = serde_json::to_string(&row).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("json encode failed")
                        .with_source(err)
                })?;
                writeln!(out, "{json}").map_err(stdout_error)?;
            }
            out.flush().map_err(stdout_error)?;
            store.close()?;
            Ok(RunOutcome::ok())
        }
        Command::Write {
            path,
            format,
            sync,
            lock,
        } => {
            let durability = if sync {
                Durability::Flush
            } else {
                Durability::Fast
            };
            let options = StoreOptions::new()
                .with_format(format.line_format()?)
                .with_durability(durability)
                .with_lock(lock);
            let mut store = DelimitedLineStore::with_options(options);
            store.open(&path, Mode::Write)?;

            let stdin = io::stdin();
            for (idx, line) in stdin.lock().lines().enumerate() {
                let line_no = idx as u64 + 1;
                let line = line.map_err(|err| {
                    Error::new(ErrorKind::Read)
                        .with_message("failed to read stdin")
                        .with_line(line_no)
                        .with_source(err)
                })?;
                if line.trim().is_empty() {
                    continue;
                }
                let row = parse_input_row(&line, line_no)?;
                store.write_row(&row)?;
            }

            let rows = store.lines_processed();
            store.close()?;
            println!(
                "{}",
                json!({ "path": path.display().to_string(), "rows": rows })
            );
            Ok(RunOutcome::ok())
        }
    }
}

fn parse_input_row(line: &str, line_no: u64) -> Result<Vec<String>, Error> {
    let value: Value = serde_json::from_str(line).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("stdin line {line_no} is not valid JSON"))
            .with_hint("Each input line must be a JSON array of strings, e.g. [\"a\",\"b\"].")
            .with_source(err)
    })?;
    let Value::Array(items) = value else {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("stdin line {line_no} is not a JSON array")));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(col, item)| match item {
            Value::String(text) => Ok(text),
            other => Err(Error::new(ErrorKind::Usage).with_message(format!(
                "stdin line {line_no}, column {}: expected a string, found {other}",
                col + 1
            ))),
        })
        .collect()
}

fn stdout_error(err: io::Error) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("failed to write stdout")
        .with_source(err)
}
