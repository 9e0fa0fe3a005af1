use std::{fs, path::Path};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, trace_span};

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported fixture format {0:?}, expected .csv or .json")]
    Format(String),
}

/// Loads rows from a `.csv` file with a header row, or a `.json` array.
pub fn load_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, FixtureError> {
    let span = trace_span!("loading fixture", path = %path.display());
    let _guard = span.enter();

    let contents = fs::read_to_string(path).map_err(|source| FixtureError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let rows = match extension.as_str() {
        "csv" => parse_csv(&contents)?,
        "json" => serde_json::from_str(&contents)?,
        other => return Err(FixtureError::Format(other.to_owned())),
    };
    debug!("Read {} rows", rows.len());

    Ok(rows)
}

pub fn parse_csv<T: DeserializeOwned>(contents: &str) -> Result<Vec<T>, FixtureError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes())
        .deserialize()
        .map(|row| row.map_err(FixtureError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{ingredient::NewIngredient, tag::NewTag};

    #[test]
    fn parses_ingredients_with_header() {
        let rows: Vec<NewIngredient> =
            parse_csv("name,measurement_unit\nабрикосовое варенье,г\nFlour, g\n").unwrap();

        assert_eq!(
            rows,
            vec![
                NewIngredient::new("абрикосовое варенье".to_owned(), "г".to_owned()),
                NewIngredient::new("Flour".to_owned(), "g".to_owned()),
            ]
        );
    }

    #[test]
    fn parses_tags_from_json() {
        let rows: Vec<NewTag> =
            serde_json::from_str(r#"[{"name": "Завтрак", "slug": "breakfast"}]"#).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].slug, "breakfast");
    }

    #[test]
    fn rejects_unknown_extension() {
        let path = std::env::temp_dir().join("foodgram-fixture-test.txt");
        fs::write(&path, "name\n").unwrap();

        let err = load_rows::<NewTag>(&path).unwrap_err();

        assert!(matches!(err, FixtureError::Format(ext) if ext == "txt"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_column_is_an_error() {
        assert!(matches!(
            parse_csv::<NewIngredient>("name\nFlour\n"),
            Err(FixtureError::Csv(_))
        ));
    }
}
