//! LayerDB - CLI Client
//!
//! `layerdb-cli [PATH]` opens the snapshot at PATH (or `LAYERDB_PATH`, or an
//! in-memory database) and reads statements until `.quit` or end of input.

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use layerdb::{DatabaseConfig, ExecOutcome, ExecutionEngine, ResultRow};

/// Print welcome banner
fn print_banner(config: &DatabaseConfig) {
    println!("LayerDB - a small layered relational database");
    match &config.path {
        Some(path) => println!("Connected to {}", path.display()),
        None => println!("Connected to a transient in-memory database"),
    }
    println!("Type '.help' for help, '.quit' to exit");
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help               Show this help message
  .quit               Exit LayerDB
  .tables             List all tables
  .describe <table>   Show table schema
  .schema             Show every table and its columns
  .sample <table>     Show up to 5 rows of a table
  .stats              Show execution statistics
  .cache [cleanup]    Show cache statistics, or sweep expired entries

SQL Commands (end with ';'):
  CREATE TABLE t (col TYPE [constraints], ...)
  INSERT INTO t VALUES (value, ...)
  SELECT * | col, ... FROM t [WHERE col op value]
  DELETE FROM t [WHERE col op value]
  DESCRIBE t

Examples:
  CREATE TABLE heroes (id INTEGER PRIMARY KEY, name TEXT, strength INTEGER);
  INSERT INTO heroes VALUES (1, 'Arjuna', 95);
  SELECT name FROM heroes WHERE strength > 90;
"#
    );
}

fn cell(value: &Option<layerdb::Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "NULL".to_string(),
    }
}

/// Format rows as an ASCII table
fn format_results(columns: &[String], rows: &[ResultRow]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in rows {
        for (i, value) in row.iter().enumerate() {
            let len = cell(value).len();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    let mut output = String::new();
    output.push_str(&separator);
    let header: String = widths
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let name = columns.get(i).map(String::as_str).unwrap_or("");
            format!(" {:^width$} ", name, width = *w)
        })
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    for row in rows {
        let line: String = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:>width$} ", cell(v), width = *w))
            .collect::<Vec<_>>()
            .join("|");
        output.push_str(&format!("|{}|\n", line));
    }
    if !rows.is_empty() {
        output.push_str(&separator);
    }

    output.push_str(&format!("{} row(s) returned\n", rows.len()));
    output
}

/// Header for a result set; named projections keep the requested names
fn result_columns(engine: &mut ExecutionEngine, sql: &str) -> Vec<String> {
    match layerdb::sql::parse(sql) {
        Ok(layerdb::sql::Statement::Select(stmt)) => match stmt.projection {
            layerdb::sql::ast::Projection::Columns(names) => names,
            layerdb::sql::ast::Projection::Wildcard => engine
                .table_summary(&stmt.table_name)
                .map(|s| s.columns.into_iter().map(|c| c.name).collect())
                .unwrap_or_default(),
        },
        Ok(layerdb::sql::Statement::Describe(_)) => {
            vec!["column".into(), "type".into(), "constraints".into()]
        }
        _ => Vec::new(),
    }
}

/// Execute a SQL statement
fn execute_sql(sql: &str, engine: &mut ExecutionEngine) {
    let sql = sql.trim();
    if sql.is_empty() {
        return;
    }

    let is_insert = sql
        .split_whitespace()
        .next()
        .is_some_and(|w| w.eq_ignore_ascii_case("INSERT"));

    match engine.execute(sql) {
        Ok(ExecOutcome::Rows(rows)) => {
            let columns = result_columns(engine, sql);
            print!("{}", format_results(&columns, &rows));
        }
        Ok(ExecOutcome::Count(n)) if is_insert => println!("Inserted row with id {}", n),
        Ok(ExecOutcome::Count(n)) => println!("{} row(s) deleted", n),
        Ok(ExecOutcome::Message(msg)) => println!("{}", msg),
        Err(e) => eprintln!("{}", e),
    }
}

/// Print every table with its column names and types
fn print_schema(engine: &mut ExecutionEngine) {
    let tables = engine.table_names();
    if tables.is_empty() {
        println!("No tables found.");
        return;
    }

    for table in tables {
        match engine.table_summary(&table) {
            Ok(summary) => {
                println!("Table: {}", table);
                for column in summary.columns {
                    println!("  {:<15} {}", column.name, column.data_type);
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }
}

/// Print the first rows of `table`
fn print_sample(engine: &mut ExecutionEngine, table: &str) {
    const SAMPLE_ROWS: usize = 5;

    let rows = match engine.select(table, None, None) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    if rows.is_empty() {
        println!("No data in table '{}'", table);
        return;
    }

    let columns = engine
        .table_summary(table)
        .map(|s| s.columns.into_iter().map(|c| c.name).collect::<Vec<_>>())
        .unwrap_or_default();
    let shown = rows.len().min(SAMPLE_ROWS);
    print!("{}", format_results(&columns, &rows[..shown]));
    if rows.len() > shown {
        println!("... and {} more row(s)", rows.len() - shown);
    }
}

/// Handle dot commands; returns true when the REPL should exit
fn handle_special_command(cmd: &str, engine: &mut ExecutionEngine) -> bool {
    let parts: Vec<&str> = cmd.split_whitespace().collect();

    match parts.first().copied() {
        Some(".help") => print_help(),
        Some(".quit") | Some(".exit") => return true,
        Some(".tables") => {
            let tables = engine.table_names();
            if tables.is_empty() {
                println!("No tables found.");
            } else {
                println!("Tables:");
                for table in tables {
                    println!("  {}", table);
                }
            }
        }
        Some(".describe") => match parts.get(1) {
            Some(table) => execute_sql(&format!("DESCRIBE {}", table), engine),
            None => eprintln!("Usage: .describe <table>"),
        },
        Some(".schema") => print_schema(engine),
        Some(".sample") => match parts.get(1) {
            Some(table) => print_sample(engine, table),
            None => eprintln!("Usage: .sample <table>"),
        },
        Some(".stats") => {
            let stats = engine.stats();
            println!("Tables:             {}", stats.tables.len());
            println!("Statements:         {}", stats.statements_executed);
            println!("Cache hits:         {}", stats.cache_hits);
            println!("Cache misses:       {}", stats.cache_misses);
        }
        Some(".cache") => {
            if parts.get(1) == Some(&"cleanup") {
                println!("Swept {} expired entries", engine.cleanup_cache());
            }
            let cache = engine.stats().cache;
            println!("Hit rate:            {:.1}%", cache.hit_rate);
            println!("Query cache size:    {}", cache.query_cache_size);
            println!("Metadata cache size: {}", cache.metadata_cache_size);
        }
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Type '.help' for available commands.");
        }
        None => {}
    }
    false
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("layerdb=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Main REPL loop
fn run_repl(mut engine: ExecutionEngine) -> Result<()> {
    let mut editor = DefaultEditor::new().context("failed to initialize line editor")?;
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "layerdb> " } else { "   ...> " };

        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if let Err(e) = editor.add_history_entry(trimmed) {
                    debug!(error = %e, "failed to record history entry");
                }

                if buffer.is_empty() && trimmed.starts_with('.') {
                    if handle_special_command(trimmed, &mut engine) {
                        break;
                    }
                    continue;
                }

                buffer.push_str(&line);
                buffer.push('\n');
                if trimmed.ends_with(';') {
                    execute_sql(&buffer, &mut engine);
                    buffer.clear();
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        }
    }

    engine.close().context("failed to close database")?;
    println!("Goodbye!");
    Ok(())
}

fn main() -> Result<()> {
    init_logging();

    let mut config = DatabaseConfig::from_env();
    if let Some(path) = std::env::args().nth(1) {
        config = config.path(path);
    }

    let engine = ExecutionEngine::open(config.clone()).context("failed to open database")?;
    print_banner(&config);
    run_repl(engine)
}
