pub mod envelope;
pub mod io;
pub mod isotopes;
pub mod mass;
pub mod monocle;
pub mod peak;
pub mod processor;
pub mod scan;
pub mod scoring;
pub mod selector;
pub mod settings;
pub mod specificity;
pub mod vector;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// No reader or writer handles this kind of file
    Unsupported(String),
    Cancelled,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::Json(e) => e.fmt(f),
            Self::Unsupported(path) => write!(f, "unsupported file format: `{}`", path),
            Self::Cancelled => f.write_str("processing was cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Deserialize a JSON file, e.g. a parameter file
pub fn read_json<P, T>(path: P) -> Result<T, Error>
where
    P: AsRef<std::path::Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(Error::Json)
}
