use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic error type covering every failure this library can return.
///
/// The variants split into three families that callers are expected to treat
/// differently:
///
/// - **Metadata failures** ([`Error::Malformed`], [`Error::OutOfBounds`],
///   [`Error::InvalidOffset`], [`Error::Empty`]): the input file is not a
///   usable `.winmd`. These are fatal for the generator instance.
/// - **Request failures** ([`Error::NotSupported`],
///   [`Error::TypeNotFound`]): a single generation request cannot be
///   honored; the generator remains usable for other requests.
/// - **Cooperative cancellation** ([`Error::Cancelled`]): the caller's
///   token was observed; already accumulated fragments remain readable but
///   the session is incomplete.
#[derive(Error, Debug)]
pub enum Error {
    /// Encountered an invalid offset while resolving addresses in the PE
    /// container or the metadata streams.
    #[error("Could not retrieve a valid offset!")]
    InvalidOffset,

    /// The metadata file is damaged and could not be parsed.
    ///
    /// Includes the source location where the malformation was detected for
    /// debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The caller explicitly requested something the generator refuses to
    /// produce, e.g. a direct request for `GetLastError`.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// A metadata token did not resolve to a loaded entity.
    ///
    /// The associated [`Token`] identifies the dangling reference.
    #[error("Failed to resolve metadata token - {0}")]
    TypeNotFound(Token),

    /// Recursion limit reached while parsing a signature blob.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reached the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// Cooperative cancellation was observed via the caller's token.
    #[error("The generation request was cancelled")]
    Cancelled,
}
