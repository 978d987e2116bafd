//! Terminal output: status notes and plain tables.

// ---------------------------------------------------------------------------
// ANSI styles
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const CYAN: &str = "\x1b[36m";

/// Whether stdout should get colors.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}i{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// A dimmed line, for secondary detail.
pub fn dim(msg: &str) -> String {
    if supports_color() {
        format!("{DIM}{msg}{RESET}")
    } else {
        msg.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Render left-aligned columns separated by two spaces. Width counts chars,
/// so CJK cells come out a little narrow; good enough for a terminal listing.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell}{}", " ".repeat(width - cell.chars().count())))
            .collect();
        format!("  {}\n", padded.join("  ").trim_end())
    };

    let mut out = line(headers.to_vec());
    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&line(sep.iter().map(String::as_str).collect()));
    for row in rows {
        let cells: Vec<&str> = (0..widths.len())
            .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
            .collect();
        out.push_str(&line(cells));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_pads_columns_to_widest_cell() {
        let rows = vec![
            vec!["weather".to_string(), "get_weather".to_string()],
            vec!["rmd ls".to_string(), "list_reminders".to_string()],
        ];
        let table = render_table(&["Command", "Function"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "  Command  Function");
        assert_eq!(lines[1], "  -------  --------------");
        assert_eq!(lines[3], "  rmd ls   list_reminders");
    }

    #[test]
    fn short_rows_get_empty_cells() {
        let table = render_table(&["A", "B"], &[vec!["x".to_string()]]);
        assert!(table.ends_with("  x\n"));
    }
}
