//! Terminal output.
//!
//! Data goes to stdout as JSON, one document per line unless pretty
//! printing was asked for. Status lines go to stderr so stdout stays
//! machine-readable.

use std::io::{self, Write};

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn note(msg: &str) {
    eprintln!("{}", msg.dimmed());
}

/// Print a labeled field to stdout.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print one value as a compact JSON line.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Print one value, pretty-printed when asked to.
pub fn value<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    } else {
        json(value)
    }
}

/// Print values as NDJSON under a single stdout lock.
pub fn ndjson<'a, T, I>(values: I) -> Result<usize>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut written = 0;
    for value in values {
        serde_json::to_writer(&mut out, value)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}
