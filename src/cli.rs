//! Command-line surface

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "fablegen",
    version,
    about = "Batch illustration engine for illustrated storybook projects"
)]
pub struct Cli {
    /// Path to the project configuration document
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a character hero shot (or all of them)
    Hero {
        /// Character id
        #[arg(required_unless_present = "all")]
        character_id: Option<String>,

        /// Generate hero shots for every character
        #[arg(long, conflicts_with = "character_id")]
        all: bool,

        /// Restrict --all to these comma-separated ids
        #[arg(long, value_delimiter = ',', requires = "all")]
        characters: Vec<String>,

        /// Reference image path or URL
        #[arg(long = "ref")]
        reference: Option<String>,

        /// Location id for the background
        #[arg(long)]
        location: Option<String>,

        /// Output file stem (extension added automatically)
        #[arg(long)]
        output: Option<String>,
    },

    /// Generate a multi-character group shot
    Group {
        /// Comma-separated character ids
        #[arg(value_delimiter = ',', required = true)]
        character_ids: Vec<String>,

        #[arg(long = "ref")]
        reference: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        output: Option<String>,
    },

    /// Generate a single scene illustration
    Scene {
        /// What happens in the scene
        #[arg(long)]
        prompt: String,

        /// Comma-separated character ids appearing in the scene
        #[arg(long, value_delimiter = ',')]
        characters: Vec<String>,

        /// Reference image path or URL (required for consistency)
        #[arg(long = "ref")]
        reference: String,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        output: Option<String>,

        /// Extra instructions appended to the prompt variables
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Generate a book cover
    Cover {
        book_id: String,

        #[arg(long = "ref")]
        reference: String,

        #[arg(long)]
        output: Option<String>,
    },

    /// Generate every page of a book
    Book {
        book_id: String,

        #[arg(long = "ref")]
        reference: String,

        /// Inclusive page range, e.g. 2-5
        #[arg(long, value_parser = parse_page_range)]
        pages: Option<(u32, u32)>,

        /// Skip the cover
        #[arg(long)]
        no_cover: bool,
    },

    /// List stored entities
    List {
        /// characters | locations | books | styles | all
        #[arg(default_value = "all")]
        kind: String,
    },

    /// Inspect or edit the project configuration
    Config {
        /// Print a summary of the loaded document
        #[arg(long)]
        summary: bool,

        /// Read a value by dot path, e.g. api.cost_per_image
        #[arg(long)]
        get: Option<String>,

        /// Set a value by dot path, e.g. active_style=watercolor
        /// (values parse as JSON, falling back to plain strings)
        #[arg(long, value_parser = parse_assignment)]
        set: Option<(String, serde_json::Value)>,

        /// Switch the active style preset
        #[arg(long)]
        style: Option<String>,

        /// Print the full document as JSON
        #[arg(long)]
        export: bool,
    },

    /// Run the dashboard server
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

fn parse_page_range(raw: &str) -> Result<(u32, u32), String> {
    let (start, end) = raw
        .split_once('-')
        .ok_or_else(|| format!("expected START-END, got '{raw}'"))?;
    let start: u32 = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid start page '{start}'"))?;
    let end: u32 = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid end page '{end}'"))?;
    if start > end {
        return Err(format!("start page {start} is after end page {end}"));
    }
    Ok((start, end))
}

fn parse_assignment(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn page_range_parsing() {
        assert_eq!(parse_page_range("2-5"), Ok((2, 5)));
        assert_eq!(parse_page_range(" 1 - 3 "), Ok((1, 3)));
        assert!(parse_page_range("5-2").is_err());
        assert!(parse_page_range("abc").is_err());
    }

    #[test]
    fn assignment_values_parse_as_json_with_string_fallback() {
        let (key, value) = parse_assignment("api.cost_per_image=0.05").unwrap();
        assert_eq!(key, "api.cost_per_image");
        assert_eq!(value, serde_json::json!(0.05));

        let (_, value) = parse_assignment("active_style=watercolor").unwrap();
        assert_eq!(value, serde_json::json!("watercolor"));

        assert!(parse_assignment("no_equals_sign").is_err());
    }

    #[test]
    fn book_command_parses_pages() {
        let cli = Cli::parse_from([
            "fablegen", "book", "book_01", "--ref", "./ref.jpg", "--pages", "2-5",
        ]);
        match cli.command {
            Command::Book { pages, no_cover, .. } => {
                assert_eq!(pages, Some((2, 5)));
                assert!(!no_cover);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
