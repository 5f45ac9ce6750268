//! josedb - interactive shell

use std::io::{self, BufRead, Write};

use josedb::executor::{Executor, QueryResult};
use josedb::storage::ResultRow;

/// Print welcome banner
fn print_banner() {
    println!(
        r#"
   _                    _ _
  (_) ___  ___  ___  __| | |__
  | |/ _ \/ __|/ _ \/ _` | '_ \
  | | (_) \__ \  __/ (_| | |_) |
 _/ |\___/|___/\___|\__,_|_.__/
|__/

 A small relational database engine
 Type '.help' for help, '.exit' to quit
"#
    );
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help               Show this help message
  .exit               Exit the shell
  .tables             List all tables
  .describe <table>   Show table schema

SQL Commands (terminate with ;):
  CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
  INSERT INTO users VALUES (1, 'Alice');
  SELECT * FROM users WHERE id = 1;
  SELECT users.name, orders.amt FROM users JOIN orders ON users.id = orders.user_id;
  UPDATE users SET name = 'Bob' WHERE id = 1;
  DELETE FROM users WHERE id = 1;
  DROP TABLE users;
"#
    );
}

/// Format result rows as an aligned text table
fn format_rows(rows: &[ResultRow]) -> String {
    if rows.is_empty() {
        return "(0 rows)\n".to_string();
    }

    let headers: Vec<String> = rows[0].columns().map(str::to_string).collect();

    // Column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, header) in headers.iter().enumerate() {
            if let Some(value) = row.get(header) {
                widths[i] = widths[i].max(format!("{}", value).len());
            }
        }
    }

    let mut output = String::new();

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<width$}", h, width = *w))
        .collect();
    output.push_str(&header_line.join(" | "));
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');

    for row in rows {
        let cells: Vec<String> = headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| {
                let text = row
                    .get(h)
                    .map(|v| format!("{}", v))
                    .unwrap_or_default();
                format!("{:<width$}", text, width = *w)
            })
            .collect();
        output.push_str(&cells.join(" | "));
        output.push('\n');
    }

    output.push_str(&format!("({} rows)\n", rows.len()));
    output
}

/// Handle a meta command; returns false when the shell should exit
fn handle_meta_command(line: &str, executor: &Executor) -> bool {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or("");

    match command {
        ".exit" | ".quit" => {
            println!("Goodbye!");
            return false;
        }
        ".help" => print_help(),
        ".tables" => {
            let names = executor.list_table_names();
            if names.is_empty() {
                println!("  (no tables)");
            }
            for name in names {
                println!("  - {}", name);
            }
        }
        ".describe" | ".schema" => match parts.next() {
            None => println!("Usage: .describe <table_name>"),
            Some(table) => match executor.describe(table) {
                Err(e) => println!("Error: {}", e),
                Ok(info) => {
                    println!("Table: {}", table);
                    println!(
                        "Primary Key: {}",
                        info.primary_key.as_deref().unwrap_or("(none)")
                    );
                    println!("Columns:");
                    for column in &info.columns {
                        let mut flags = Vec::new();
                        if Some(column.name.as_str()) == info.primary_key.as_deref() {
                            flags.push("PK");
                        }
                        if info.unique_columns.contains(&column.name) {
                            flags.push("UNIQUE");
                        }
                        let flags_str = if flags.is_empty() {
                            String::new()
                        } else {
                            format!(" [{}]", flags.join(", "))
                        };
                        println!("  - {} ({}){}", column.name, column.data_type, flags_str);
                    }
                }
            },
        },
        _ => println!("Unknown command: {}", line),
    }

    true
}

fn run(executor: &mut Executor) -> io::Result<()> {
    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        if buffer.is_empty() {
            print!("josedb> ");
        } else {
            print!("   ...> ");
        }
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let line = line.trim_end();

        if line.is_empty() && buffer.is_empty() {
            continue;
        }

        // Meta commands only on a fresh line
        if buffer.is_empty() && line.trim_start().starts_with('.') {
            if !handle_meta_command(line.trim(), executor) {
                break;
            }
            continue;
        }

        buffer.push_str(line);
        buffer.push(' ');

        if buffer.contains(';') {
            let statements: Vec<String> = buffer
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            buffer.clear();

            for statement in statements {
                match executor.execute(&statement) {
                    Ok(QueryResult::Message(message)) => println!("{}", message),
                    Ok(QueryResult::Rows(rows)) => print!("{}", format_rows(&rows)),
                    Err(e) => println!("Error: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn main() {
    print_banner();

    let mut executor = match std::env::args().nth(1) {
        Some(path) => match Executor::open(&path) {
            Ok(executor) => {
                println!("Opened database: {}", path);
                executor
            }
            Err(e) => {
                eprintln!("Error opening '{}': {}", path, e);
                std::process::exit(1);
            }
        },
        None => Executor::in_memory(),
    };

    if let Err(e) = run(&mut executor) {
        eprintln!("I/O error: {}", e);
    }
    if let Err(e) = executor.close() {
        eprintln!("Error saving database: {}", e);
    }
}
