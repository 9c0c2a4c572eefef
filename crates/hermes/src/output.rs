//! Rendering of command results in the `--output` format.
//!
//! Lists go through `tabled` rows, single entities through a hand-written
//! detail view; `json`, `json-compact` and `yaml` serialize the entity itself
//! and `plain` prints one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Structured formats ───────────────────────────────────────────────

/// Serialize `data` for the structured formats; `None` for table and plain.
fn structured<T: Serialize + ?Sized>(
    format: &OutputFormat,
    data: &T,
) -> Option<Result<String, CliError>> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(data).map_err(serialize_error),
        OutputFormat::JsonCompact => json_line(data),
        OutputFormat::Yaml => serde_yaml::to_string(data)
            .map(|yaml| yaml.trim_end().to_owned())
            .map_err(serialize_error),
        OutputFormat::Table | OutputFormat::Plain => return None,
    };
    Some(rendered)
}

/// One-line JSON, used for streamed output.
pub fn json_line<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string(data).map_err(serialize_error)
}

fn serialize_error(e: impl std::fmt::Display) -> CliError {
    CliError::Internal(format!("could not serialize output: {e}"))
}

// ── Entry points ─────────────────────────────────────────────────────

/// Render a collection: a rounded table of `to_row` rows, the serialized
/// items, or `id_fn` per line.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    if let Some(rendered) = structured(format, data) {
        return rendered;
    }
    Ok(match format {
        OutputFormat::Plain => data.iter().map(id_fn).collect::<Vec<_>>().join("\n"),
        _ => Table::new(data.iter().map(to_row))
            .with(Style::rounded())
            .to_string(),
    })
}

/// Render one entity: `detail_fn` for tables, `id_fn` for plain.
pub fn render_single<T: Serialize>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError> {
    if let Some(rendered) = structured(format, data) {
        return rendered;
    }
    Ok(match format {
        OutputFormat::Plain => id_fn(data),
        _ => detail_fn(data),
    })
}

/// Write `output` to stdout unless quiet or empty.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Color ────────────────────────────────────────────────────────────

/// Tone of a status word.
#[derive(Debug, Clone, Copy)]
pub enum Tone {
    Good,
    Warn,
    Bad,
    Muted,
}

/// Paints status words when color is enabled.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    /// `auto` colors only an interactive stdout without `NO_COLOR`.
    pub fn new(mode: &ColorMode) -> Self {
        let enabled = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        };
        Self { enabled }
    }

    pub fn paint(self, text: &str, tone: Tone) -> String {
        if !self.enabled {
            return text.to_owned();
        }
        match tone {
            Tone::Good => text.green().to_string(),
            Tone::Warn => text.yellow().to_string(),
            Tone::Bad => text.red().bold().to_string(),
            Tone::Muted => text.dimmed().to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Item {
        id: u64,
        name: &'static str,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "ID")]
        id: u64,
    }

    fn items() -> Vec<Item> {
        vec![Item { id: 1, name: "uno" }, Item { id: 2, name: "mega" }]
    }

    fn render(format: &OutputFormat) -> String {
        render_list(format, &items(), |i| Row { id: i.id }, |i| i.id.to_string()).unwrap()
    }

    #[test]
    fn plain_prints_one_id_per_line() {
        assert_eq!(render(&OutputFormat::Plain), "1\n2");
    }

    #[test]
    fn structured_formats_serialize_items() {
        assert_eq!(
            render(&OutputFormat::JsonCompact),
            r#"[{"id":1,"name":"uno"},{"id":2,"name":"mega"}]"#
        );
        assert!(render(&OutputFormat::Yaml).starts_with("- id: 1\n  name: uno"));
    }

    #[test]
    fn table_has_header_row() {
        let table = render(&OutputFormat::Table);
        assert!(table.contains("ID"));
        assert!(table.contains('2'));
    }

    #[test]
    fn disabled_palette_leaves_text_alone() {
        let palette = Palette::new(&ColorMode::Never);
        assert_eq!(palette.paint("connected", Tone::Good), "connected");
        assert_ne!(Palette::new(&ColorMode::Always).paint("lost", Tone::Bad), "lost");
    }
}
