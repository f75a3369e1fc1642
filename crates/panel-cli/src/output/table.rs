/// Layout knobs for a rendered table.
#[derive(Clone, Copy, Debug)]
pub struct TableStyle {
    pub max_width: Option<usize>,
    pub color: bool,
}

const GAP: &str = "  ";
const MIN_COLUMN: usize = 4;

/// A header plus string rows, aligned on render.
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    #[must_use]
    pub const fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row. Missing trailing cells render as `-`.
    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn render(&self, style: TableStyle) -> String {
        let mut widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(index, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(index))
                    .map(|value| value.chars().count())
                    .fold(header.chars().count(), usize::max)
            })
            .collect();
        if let Some(limit) = style.max_width {
            shrink_to(&mut widths, &self.headers, limit);
        }

        let header = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(text, width)| pad(&clip(text, *width), *width, false))
            .collect::<Vec<_>>()
            .join(GAP);

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(header.trim_end().to_string());
        lines.push("-".repeat(widths.iter().sum::<usize>() + GAP.len() * widths.len().saturating_sub(1)));
        for row in &self.rows {
            let line = widths
                .iter()
                .enumerate()
                .map(|(index, width)| {
                    let text = clip(row.get(index).map_or("-", String::as_str), *width);
                    let padded = pad(&text, *width, is_number(&text));
                    if style.color {
                        paint(&text, padded)
                    } else {
                        padded
                    }
                })
                .collect::<Vec<_>>()
                .join(GAP);
            lines.push(line.trim_end().to_string());
        }
        lines.join("\n")
    }
}

/// Narrow the widest columns one character at a time until the row fits.
fn shrink_to(widths: &mut [usize], headers: &[String], limit: usize) {
    let gaps = GAP.len() * widths.len().saturating_sub(1);
    while widths.iter().sum::<usize>() + gaps > limit {
        let widest = widths
            .iter()
            .enumerate()
            .filter(|(index, width)| **width > headers[*index].chars().count().max(MIN_COLUMN))
            .max_by_key(|(_, width)| **width)
            .map(|(index, _)| index);
        match widest {
            Some(index) => widths[index] -= 1,
            None => break,
        }
    }
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

fn pad(text: &str, width: usize, right_align: bool) -> String {
    if right_align {
        format!("{text:>width$}")
    } else {
        format!("{text:<width$}")
    }
}

fn is_number(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| ch.is_ascii_digit() || ch == '.')
}

/// Color a padded cell by the workflow status it names, if any.
fn paint(text: &str, padded: String) -> String {
    let code = match text {
        "approved" | "completed" | "true" => "32",
        "rejected" | "false" => "31",
        "needs_revision" | "pending" | "submitted" => "33",
        "in_review" | "in_progress" => "36",
        "archived" | "draft" => "2",
        _ => return padded,
    };
    format!("\u{1b}[{code}m{padded}\u{1b}[0m")
}
