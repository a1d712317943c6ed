use thiserror::Error;

#[derive(Error, Debug)]
pub enum MealForgeError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Template Error: {0}")]
    Template(String),

    #[error("Not Found: {0}")]
    NotFound(String),
}

pub type MfResult<T> = Result<T, MealForgeError>;

/// Joins collected validation problems into the multi-line form used by
/// `Config` and `Template` errors.
pub fn aggregate(header: &str, problems: &[String]) -> String {
    let mut out = String::from(header);
    for p in problems {
        out.push_str("\n  - ");
        out.push_str(p);
    }
    out
}
