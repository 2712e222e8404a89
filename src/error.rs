use std::fmt;

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A single sum type for all errors surfaced at the driver boundary.
///
/// Planning errors (everything except `Runtime`) abort a query before any
/// row is produced. `Runtime` errors surface from inside `produce()` and
/// terminate iteration; rows already yielded are retained by the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Unknown table identifier at planning time.
    TableDoesNotExist(String),
    /// Reserved for persistent-table creation; unused by the read-only
    /// provider-backed catalog.
    TableAlreadyExists(String),
    /// Column not present in the source registry.
    UnknownColumn(String),
    /// An unqualified column name resolves against more than one source.
    AmbiguousColumn(String),
    /// A provider exposes no column metadata.
    ColumnMetadataUndefined(String),
    /// A JOIN was written without an equi-join ON clause.
    JoinHasNoOnClause,
    /// A parse-layer operator outside the supported set.
    UnknownOperator(String),
    /// Propagated from the SQL front-end: 1-based line, 1-based column,
    /// and a human-readable message, per spec.md §7's
    /// `SyntaxError(line, column, message)`.
    SyntaxError(u64, u64, String),
    /// Catch-all for malformed input discovered during planning or
    /// evaluation (bad literal, wrong arity, non-boolean predicate, ...).
    InvalidInput(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableDoesNotExist(name) => write!(f, "table '{name}' does not exist"),
            Self::TableAlreadyExists(name) => write!(f, "table '{name}' already exists"),
            Self::UnknownColumn(id) => write!(f, "unknown column '{id}'"),
            Self::AmbiguousColumn(name) => write!(f, "column '{name}' is ambiguous"),
            Self::ColumnMetadataUndefined(table) => {
                write!(f, "table '{table}' does not expose column metadata")
            }
            Self::JoinHasNoOnClause => write!(f, "join has no ON clause"),
            Self::UnknownOperator(text) => write!(f, "unknown operator '{text}'"),
            Self::SyntaxError(line, column, message) => {
                write!(f, "syntax error at {line}:{column}: {message}")
            }
            Self::InvalidInput(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for Error {}

/// Builds and returns an `Err(Error::InvalidInput(...))`, formatting its
/// arguments like `format!`.
#[macro_export]
macro_rules! errinput {
    ($($args:tt)*) => {
        return Err($crate::error::Error::InvalidInput(format!($($args)*)))
    };
}
