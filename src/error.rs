use diesel::result::Error as DieselError;
use diesel_migrations::RunMigrationsError;
use serde_yaml::Error as YAMLError;
use std::io::Error as IOError;
use url::ParseError as URLError;

use err_derive::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(display = "Configuration error: {}", _0)]
    Config(String),
    #[error(display = "Cannot determine latest comic id: {}", _0)]
    Discovery(String),
    #[error(display = "Cannot fetch {}: {}", url, reason)]
    Fetch { url: String, reason: String },
    #[error(display = "Comic {} has no {}", id, missing)]
    Parse { id: i32, missing: &'static str },
    #[error(display = "Cannot download {}: {}", url, reason)]
    Download { url: String, reason: String },
    #[error(display = "Diesel failure")]
    Diesel(#[error(source)] DieselError),
    #[error(display = "Database migration failure")]
    Migration(#[error(source)] RunMigrationsError),
    #[error(display = "std::io failure")]
    IO(#[error(source)] IOError),
    #[error(display = "URL parse error")]
    URL(#[error(source)] URLError),
    #[error(display = "YAML deserialization failure")]
    Yaml(#[error(source)] YAMLError),
}

impl Error {
    pub(crate) fn fetch(url: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn download(url: &str, reason: impl ToString) -> Self {
        Self::Download {
            url: url.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// Errors which abort the whole run rather than a single comic.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Discovery(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
