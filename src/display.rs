use crate::annotation::Annotation;
use crate::text::Text;
use std::fmt::Write;
use unicode_width::UnicodeWidthChar;

/// One underline row: display columns and the rendered annotation.
struct IncludedRow {
    start_col: usize,
    end_col: usize,
    label: String,
}

/// Renders a text with the annotations of selected layers underneath.
///
/// ```text
/// Hello world.
/// ╰───╯words
///       ╰───╯words
///            ╰words
/// ╰──────────╯sentences { kind: "plain" }
/// ```
pub struct TextDisplay<'a> {
    text: &'a Text,
    columns: Vec<usize>,
    rows: Vec<IncludedRow>,
}

impl<'a> TextDisplay<'a> {
    pub fn new(text: &'a Text) -> Self {
        // display column of every byte offset, including the end of the text
        let mut columns = vec![0; text.text().len() + 1];
        let mut col = 0;
        for (offset, c) in text.text().char_indices() {
            for slot in &mut columns[offset..offset + c.len_utf8()] {
                *slot = col;
            }
            col += c.width().unwrap_or(1);
        }
        if let Some(last) = columns.last_mut() {
            *last = col;
        }

        TextDisplay {
            text,
            columns,
            rows: Vec::new(),
        }
    }

    fn column(&self, offset: usize) -> usize {
        self.columns
            .get(offset)
            .copied()
            .unwrap_or_else(|| self.columns.last().copied().unwrap_or(0))
    }

    /// Adds one row per annotation of layer `name`; unknown layers add nothing.
    pub fn include(&mut self, name: &str) {
        let layer = match self.text.layer(name) {
            Some(layer) => layer,
            None => return,
        };
        for span in layer.spans() {
            for annotation in span.annotations() {
                let row = IncludedRow {
                    start_col: self.column(span.start()),
                    end_col: self.column(span.end()),
                    label: render_annotation(layer.name(), annotation),
                };
                self.rows.push(row);
            }
        }
    }

    /// Takes self
    pub fn with(mut self, name: &str) -> Self {
        self.include(name);
        self
    }
}

fn render_annotation(layer: &str, annotation: &Annotation) -> String {
    if annotation.is_empty() {
        return layer.to_string();
    }
    let mut out = String::new();
    out.push_str(layer);
    out.push_str(" { ");
    for (i, (attribute, value)) in annotation.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}: {}", attribute, value);
    }
    out.push_str(" }");
    out
}

impl<'a> std::fmt::Display for TextDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in self.text.text().chars() {
            if c.is_control() {
                f.write_char(' ')?;
            } else {
                f.write_char(c)?;
            }
        }

        for row in &self.rows {
            f.write_char('\n')?;

            for _ in 0..row.start_col {
                f.write_char(' ')?;
            }

            f.write_char('╰')?;

            for _ in (row.start_col + 1)..row.end_col.saturating_sub(1) {
                f.write_char('─')?;
            }

            if row.end_col - row.start_col > 1 {
                f.write_char('╯')?;
            }

            f.write_str(&row.label)?;
        }

        Ok(())
    }
}
