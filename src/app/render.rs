use crate::config::OutputFormat;
use crate::core::cards::{
    CardResults, FeedCard, ProfileView, ResultCard, FEED_RESULTS_PENDING, PROFILE_RESULTS_MISSING,
};
use crate::core::catalog::AthleteRow;
use crate::domain::model::{Category, DisplayField, User};
use crate::utils::error::Result;
use serde::Serialize;
use std::fmt::Write as _;

pub const EMPTY_FEED: &str =
    "Your feed is empty.\nFollow athletes to see their latest results here!";
pub const NO_ATHLETES: &str = "No athletes found.";

/// Turns views into stdout text in the selected output format.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    format: OutputFormat,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn feed(&self, cards: &[FeedCard]) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(&cards),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer.write_record(["athlete", "title", "date", "label", "value"])?;
                for card in cards {
                    write_card_rows(&mut writer, &card.athlete_name, &card.card)?;
                }
                finish_csv(writer)
            }
            OutputFormat::Text => {
                if cards.is_empty() {
                    return Ok(format!("{}\n", EMPTY_FEED));
                }
                let mut out = String::new();
                for card in cards {
                    let _ = writeln!(out, "{}", card.athlete_name);
                    let _ = writeln!(out, "{} • {}", card.card.title, card.card.date);
                    write_results(&mut out, &card.card.results, FEED_RESULTS_PENDING);
                    out.push('\n');
                }
                Ok(out)
            }
        }
    }

    pub fn profile(&self, view: &ProfileView) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(view),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer.write_record(["athlete", "title", "date", "label", "value"])?;
                for card in &view.results {
                    write_card_rows(&mut writer, &view.name, card)?;
                }
                finish_csv(writer)
            }
            OutputFormat::Text => {
                let mut out = String::new();
                let _ = writeln!(out, "{}", view.name);
                let _ = writeln!(out, "{}", view.category);
                out.push('\n');
                let _ = writeln!(out, "Recent Results");
                for card in &view.results {
                    out.push('\n');
                    let _ = writeln!(out, "{} | {}", card.title, card.date);
                    write_results(&mut out, &card.results, PROFILE_RESULTS_MISSING);
                }
                Ok(out)
            }
        }
    }

    pub fn athletes(&self, rows: &[AthleteRow]) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(&rows),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer.write_record(["id", "name", "category", "following"])?;
                for row in rows {
                    writer.write_record([
                        row.id.as_str(),
                        row.name.as_str(),
                        row.category.as_str(),
                        if row.following { "true" } else { "false" },
                    ])?;
                }
                finish_csv(writer)
            }
            OutputFormat::Text => {
                if rows.is_empty() {
                    return Ok(format!("{}\n", NO_ATHLETES));
                }
                let mut out = String::new();
                for row in rows {
                    let marker = if row.following { "[following]" } else { "           " };
                    let _ = writeln!(
                        out,
                        "{} {}  ({})  id={}",
                        marker, row.name, row.category, row.id
                    );
                }
                Ok(out)
            }
        }
    }

    pub fn fields(&self, fields: &[DisplayField]) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(&fields),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer.write_record(["label", "value"])?;
                for field in fields {
                    writer.write_record([field.label.as_str(), field.value.as_str()])?;
                }
                finish_csv(writer)
            }
            OutputFormat::Text => {
                let mut out = String::new();
                write_field_rows(&mut out, fields);
                Ok(out)
            }
        }
    }

    pub fn categories(&self, categories: &[Category]) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(&categories),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer.write_record(["id", "name", "icon"])?;
                for category in categories {
                    writer.write_record([&category.id, &category.name, &category.icon])?;
                }
                finish_csv(writer)
            }
            OutputFormat::Text => Ok(categories
                .iter()
                .map(|c| format!("{:<12} {}\n", c.id, c.name))
                .collect()),
        }
    }

    pub fn user(&self, user: &User) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(user),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer.write_record(["id", "email"])?;
                writer.write_record([user.id.as_str(), user.email.as_deref().unwrap_or("")])?;
                finish_csv(writer)
            }
            OutputFormat::Text => Ok(format!(
                "{} ({})\n",
                user.email.as_deref().unwrap_or("no email"),
                user.id
            )),
        }
    }

    /// One-line status messages; JSON callers get `{"message": ...}`.
    pub fn message(&self, message: &str) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(&serde_json::json!({ "message": message })),
            _ => Ok(format!("{}\n", message)),
        }
    }
}

fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_card_rows(
    writer: &mut csv::Writer<Vec<u8>>,
    athlete: &str,
    card: &ResultCard,
) -> Result<()> {
    match &card.results {
        CardResults::Fields(fields) => {
            for field in fields {
                writer.write_record([
                    athlete,
                    card.title.as_str(),
                    card.date.as_str(),
                    field.label.as_str(),
                    field.value.as_str(),
                ])?;
            }
        }
        // 沒有結果的賽事仍輸出一列，方便對照
        CardResults::Missing => {
            writer.write_record([athlete, card.title.as_str(), card.date.as_str(), "", ""])?;
        }
    }
    Ok(())
}

fn write_results(out: &mut String, results: &CardResults, placeholder: &str) {
    match results {
        CardResults::Fields(fields) => write_field_rows(out, fields),
        CardResults::Missing => {
            let _ = writeln!(out, "  {}", placeholder);
        }
    }
}

fn write_field_rows(out: &mut String, fields: &[DisplayField]) {
    let width = fields
        .iter()
        .map(|f| f.label.chars().count())
        .max()
        .unwrap_or(0);
    for field in fields {
        let _ = writeln!(out, "  {:<width$}  {}", field.label, field.value, width = width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::EntityId;

    fn card(results: CardResults) -> FeedCard {
        FeedCard {
            athlete_id: Some(EntityId::from("a1")),
            athlete_name: "Usain Bolt".to_string(),
            avatar_url: "https://via.placeholder.com/150".to_string(),
            card: ResultCard {
                event_id: EntityId::from("e1"),
                title: "100m Final".to_string(),
                date: "8/16/2009".to_string(),
                results,
            },
        }
    }

    fn fields() -> Vec<DisplayField> {
        vec![
            DisplayField::new("Place", "1st"),
            DisplayField::new("Mark", "9.58"),
        ]
    }

    #[test]
    fn test_feed_text() {
        let out = Renderer::new(OutputFormat::Text)
            .feed(&[card(CardResults::Fields(fields())), card(CardResults::Missing)])
            .unwrap();

        assert_eq!(
            out,
            "Usain Bolt\n100m Final • 8/16/2009\n  Place  1st\n  Mark   9.58\n\n\
             Usain Bolt\n100m Final • 8/16/2009\n  Detailed results pending...\n\n"
        );
    }

    #[test]
    fn test_empty_feed_text() {
        let out = Renderer::new(OutputFormat::Text).feed(&[]).unwrap();
        assert!(out.starts_with("Your feed is empty."));
    }

    #[test]
    fn test_feed_csv() {
        let out = Renderer::new(OutputFormat::Csv)
            .feed(&[card(CardResults::Fields(fields())), card(CardResults::Missing)])
            .unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "athlete,title,date,label,value");
        assert_eq!(lines[1], "Usain Bolt,100m Final,8/16/2009,Place,1st");
        assert_eq!(lines[2], "Usain Bolt,100m Final,8/16/2009,Mark,9.58");
        assert_eq!(lines[3], "Usain Bolt,100m Final,8/16/2009,,");
    }

    #[test]
    fn test_feed_json_tags_results() {
        let out = Renderer::new(OutputFormat::Json)
            .feed(&[card(CardResults::Missing)])
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value[0]["athlete_name"], "Usain Bolt");
        assert_eq!(value[0]["title"], "100m Final");
        assert_eq!(value[0]["results"]["kind"], "missing");
    }

    #[test]
    fn test_athlete_rows_text() {
        let rows = vec![AthleteRow {
            id: EntityId::from("3"),
            name: "Coco Gauff".to_string(),
            category: "tennis".to_string(),
            avatar_url: String::new(),
            following: true,
        }];

        let out = Renderer::new(OutputFormat::Text).athletes(&rows).unwrap();
        assert_eq!(out, "[following] Coco Gauff  (tennis)  id=3\n");

        let none = Renderer::new(OutputFormat::Text).athletes(&[]).unwrap();
        assert_eq!(none, "No athletes found.\n");
    }
}
