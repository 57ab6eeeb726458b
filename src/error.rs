use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrateError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("API request error: {0}")]
    ApiRequestError(reqwest::Error),

    #[error("{service} returned an error status: {status}")]
    ApiStatusError {
        service: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("Failed to decode API JSON response: {0}")]
    ApiJsonDecodeError(reqwest::Error),

    #[error("Failed to parse API response content: {0}")]
    ApiResponseParseError(serde_json::Error),

    #[error("Failed to serialize output: {0}")]
    SerializeError(serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration file: {0}")]
    ConfigParseError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, CrateError>;
