use crate::io::error::Error;
use crate::model::cif::{Category, DataBlock};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

enum Formatted {
    Inline(String),
    TextField(String),
}

fn format_value(value: &str) -> Formatted {
    if value.is_empty() {
        return Formatted::Inline("?".to_string());
    }
    if value.contains('\n') {
        return Formatted::TextField(value.to_string());
    }

    let first = value.chars().next().unwrap_or(' ');
    let lower = value.to_ascii_lowercase();
    let needs_quotes = value.chars().any(char::is_whitespace)
        || matches!(first, '_' | '#' | '$' | '\'' | '"' | ';' | '[' | ']')
        || lower.starts_with("data_")
        || lower.starts_with("save_")
        || matches!(lower.as_str(), "loop_" | "global_" | "stop_");

    if !needs_quotes {
        Formatted::Inline(value.to_string())
    } else if !value.contains('\'') {
        Formatted::Inline(format!("'{}'", value))
    } else if !value.contains('"') {
        Formatted::Inline(format!("\"{}\"", value))
    } else {
        Formatted::TextField(value.to_string())
    }
}

pub fn write<W: Write>(mut writer: W, blocks: &[DataBlock]) -> Result<(), Error> {
    for block in blocks {
        writeln!(writer, "data_{}", block.name())?;
        for category in block.categories() {
            if category.is_empty() || category.attributes().is_empty() {
                continue;
            }
            writeln!(writer, "#")?;
            if category.row_count() == 1 {
                write_pairs(&mut writer, category)?;
            } else {
                write_loop(&mut writer, category)?;
            }
        }
        writeln!(writer, "#")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_path(path: &Path, blocks: &[DataBlock]) -> Result<(), Error> {
    let file = File::create(path)?;
    write(BufWriter::new(file), blocks)
}

fn write_pairs<W: Write>(writer: &mut W, category: &Category) -> Result<(), Error> {
    let tags: Vec<String> = category
        .attributes()
        .iter()
        .map(|a| format!("_{}.{}", category.name(), a))
        .collect();
    let width = tags.iter().map(String::len).max().unwrap_or(0) + 1;

    for (tag, value) in tags.iter().zip(category.rows()[0].iter()) {
        match format_value(value) {
            Formatted::Inline(s) => writeln!(writer, "{:<width$}{}", tag, s)?,
            Formatted::TextField(s) => {
                writeln!(writer, "{}", tag)?;
                write_text_field(writer, &s)?;
            }
        }
    }
    Ok(())
}

/// The opening `;` gets a line of its own, so the reader's dropped first line
/// is always empty and leading newlines survive.
fn write_text_field<W: Write>(writer: &mut W, value: &str) -> Result<(), Error> {
    writeln!(writer, ";")?;
    writeln!(writer, "{}", value)?;
    writeln!(writer, ";")?;
    Ok(())
}

fn write_loop<W: Write>(writer: &mut W, category: &Category) -> Result<(), Error> {
    writeln!(writer, "loop_")?;
    for attribute in category.attributes() {
        writeln!(writer, "_{}.{}", category.name(), attribute)?;
    }

    let formatted: Vec<Vec<Formatted>> = category
        .rows()
        .iter()
        .map(|row| row.iter().map(|v| format_value(v)).collect())
        .collect();

    let mut widths = vec![0usize; category.attributes().len()];
    for row in &formatted {
        for (col, value) in row.iter().enumerate() {
            if let Formatted::Inline(s) = value {
                widths[col] = widths[col].max(s.chars().count());
            }
        }
    }

    for row in &formatted {
        let mut line = String::new();
        for (col, value) in row.iter().enumerate() {
            match value {
                Formatted::Inline(s) => {
                    line.push_str(&format!("{:<w$} ", s, w = widths[col]));
                }
                Formatted::TextField(s) => {
                    if !line.trim().is_empty() {
                        writeln!(writer, "{}", line.trim_end())?;
                    }
                    line.clear();
                    write_text_field(writer, s)?;
                }
            }
        }
        if !line.trim().is_empty() {
            writeln!(writer, "{}", line.trim_end())?;
        }
    }
    Ok(())
}
