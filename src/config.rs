use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub pool_size: u32,
    pub port: u16,
    pub short_link_length: usize,
    pub short_link_attempts: u32,
    pub export_filename: String,
}

impl Config {
    pub const DEFAULT_SHORT_LINK_LENGTH: usize = 10;
    pub const DEFAULT_SHORT_LINK_ATTEMPTS: u32 = 5;
    pub const DEFAULT_EXPORT_FILENAME: &'static str = "shopping_cart.csv";
    /// Width of the `short_links.token` column.
    pub const MAX_SHORT_LINK_LENGTH: usize = 32;

    /// Reads the process environment, after merging an optional `.env` file.
    pub fn load() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_err() {
            info!("No .env file found, using process environment only");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            pool_size: try_load("DATABASE_POOL_SIZE", "10")?,
            port: try_load("RUST_PORT", "8000")?,
            short_link_length: check_bounds(
                "SHORT_LINK_LENGTH",
                try_load("SHORT_LINK_LENGTH", &Self::DEFAULT_SHORT_LINK_LENGTH.to_string())?,
                1,
                Self::MAX_SHORT_LINK_LENGTH,
            )?,
            short_link_attempts: check_bounds(
                "SHORT_LINK_ATTEMPTS",
                try_load(
                    "SHORT_LINK_ATTEMPTS",
                    &Self::DEFAULT_SHORT_LINK_ATTEMPTS.to_string(),
                )?,
                1,
                u32::MAX,
            )?,
            export_filename: try_load("EXPORT_FILENAME", Self::DEFAULT_EXPORT_FILENAME)?,
        })
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    match value.parse() {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            warn!("Invalid {key} value: {e}");
            Err(ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        }
    }
}

fn check_bounds<T: PartialOrd + Display>(
    key: &'static str,
    value: T,
    min: T,
    max: T,
) -> Result<T, ConfigError> {
    if value < min || value > max {
        warn!("{key} value {value} out of range");
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: format!("must be between {min} and {max}"),
        });
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn falls_back_to_default_when_unset() {
        let port: u16 = try_load("FOODGRAM_TEST_UNSET_PORT", "8000").unwrap();
        assert_eq!(port, 8000);
    }

    #[test]
    fn rejects_malformed_default() {
        let err = try_load::<u16>("FOODGRAM_TEST_UNSET_PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "FOODGRAM_TEST_UNSET_PORT", .. }));
    }

    #[rstest]
    #[case::empty_token("SHORT_LINK_LENGTH", 0, 1, Config::MAX_SHORT_LINK_LENGTH)]
    #[case::wider_than_column("SHORT_LINK_LENGTH", 33, 1, Config::MAX_SHORT_LINK_LENGTH)]
    #[case::no_attempts("SHORT_LINK_ATTEMPTS", 0, 1, usize::MAX)]
    fn rejects_out_of_range_values(
        #[case] key: &'static str,
        #[case] value: usize,
        #[case] min: usize,
        #[case] max: usize,
    ) {
        let err = check_bounds(key, value, min, max).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: k, .. } if k == key));
    }

    #[rstest]
    #[case(1)]
    #[case(10)]
    #[case(Config::MAX_SHORT_LINK_LENGTH)]
    fn accepts_token_lengths_that_fit_the_column(#[case] length: usize) {
        assert_eq!(
            check_bounds("SHORT_LINK_LENGTH", length, 1, Config::MAX_SHORT_LINK_LENGTH).unwrap(),
            length
        );
    }
}
