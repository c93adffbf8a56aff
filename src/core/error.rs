use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RecordNotFound,
    IdError,
    ReservedField,
    InvalidArgument,
    NoMethod,
    FileTypeMismatch,
    Io,
    Parse,
}

/// What a failed lookup was looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub model: String,
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
    pub lookup: Option<Lookup>,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context, lookup: None }
    }

    pub fn not_found(model: &str, context: String) -> Self {
        Error {
            kind: ErrorKind::RecordNotFound,
            context,
            lookup: Some(Lookup {
                model: model.to_string(),
                key: None,
                value: None,
            }),
        }
    }

    pub fn not_found_with(model: &str, key: &str, value: Option<String>, context: String) -> Self {
        Error {
            kind: ErrorKind::RecordNotFound,
            context,
            lookup: Some(Lookup {
                model: model.to_string(),
                key: Some(key.to_string()),
                value,
            }),
        }
    }

    pub fn missing_arguments(method: &str) -> Self {
        Error::new(
            ErrorKind::InvalidArgument,
            format!("The method .{}() must contain arguments.", method),
        )
    }

    pub fn no_method(method: &str, model: &str) -> Self {
        Error::new(
            ErrorKind::NoMethod,
            format!("undefined method '{}' for {}", method, model),
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::RecordNotFound
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorKind::Parse, err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::new(ErrorKind::Parse, format!("Invalid pattern: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
