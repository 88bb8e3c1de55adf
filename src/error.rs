use thiserror::Error;

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

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every variant describes a violation of the IR contract the passes rely on. None of them is a
/// recoverable runtime condition: a well-formed input procedure never reaches an error path, so
/// an error always points at an upstream defect (the parser, a previous pass, or a caller that
/// composed passes in an unsupported order).
///
/// # Error Categories
///
/// ## Contract Violations
/// - [`Error::Malformed`] - An expression, instruction or terminator has a shape a pass rejects
/// - [`Error::UnknownCallee`] - A call names a function with no known signature
/// - [`Error::UnknownLabel`] - A jump names a block that does not exist
/// - [`Error::ArityMismatch`] - A jump passes the wrong number of block arguments
/// - [`Error::Rebound`] - An identifier is bound more than once
/// - [`Error::ShapeViolation`] - Pipeline output does not satisfy the backend contract
///
/// ## Fresh Name Exhaustion
/// - [`Error::LabelExhausted`] - No unused label could be found for a new block
/// - [`Error::IdentExhausted`] - The identifier counter ran out of values
///
/// ## Context
/// - [`Error::Pass`] - Wraps any of the above with the procedure and pass that failed
///
/// # Examples
///
/// ```rust,no_run
/// use cfgnorm::{compiler::PassScheduler, ir::Module, Error};
///
/// # fn load() -> Module { unimplemented!() }
/// let module = load();
/// match PassScheduler::default().run(&module) {
///     Ok(normalized) => println!("{normalized}"),
///     Err(Error::Pass { procedure, pass, source }) => {
///         eprintln!("{pass} failed on {procedure}: {source}");
///     }
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The IR handed to a pass violates a shape the pass depends on.
    ///
    /// The error includes the source location where the violation was detected for
    /// debugging purposes. The message names the offending instruction or terminator.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A call names a function that is neither declared nor defined in the module.
    ///
    /// Call flattening needs the callee's return type to annotate the temporary that
    /// receives the call result.
    #[error("Unknown callee `{0}`")]
    UnknownCallee(String),

    /// A terminator references a block label that does not exist in the procedure.
    #[error("Jump to unknown block `{0}`")]
    UnknownLabel(String),

    /// A jump passes a different number of arguments than the target block declares.
    #[error("Jump to `{label}` passes {found} arguments, block declares {expected}")]
    ArityMismatch {
        /// The target block
        label: String,
        /// Number of parameters the target declares
        expected: usize,
        /// Number of arguments the jump passes
        found: usize,
    },

    /// An identifier is bound by more than one assignment or parameter.
    #[error("Identifier `{0}` is bound more than once")]
    Rebound(String),

    /// The output of the pipeline does not satisfy the backend shape contract.
    #[error("Procedure `{procedure}` violates the backend shape: {message}")]
    ShapeViolation {
        /// The offending procedure
        procedure: String,
        /// What was found
        message: String,
    },

    /// The fresh label generator could not find an unused label.
    ///
    /// The associated value is the label template that was being probed.
    #[error("No fresh label available for template `{0}`")]
    LabelExhausted(String),

    /// The fresh identifier counter overflowed or ran past its probe budget.
    #[error("No fresh identifier available for prefix `{0}`")]
    IdentExhausted(String),

    /// A pass failed on a procedure.
    ///
    /// This is how errors surface from the [`crate::compiler::PassScheduler`]: the inner error
    /// is tagged with the procedure and the pass that rejected it.
    #[error("Pass `{pass}` failed on procedure `{procedure}`: {source}")]
    Pass {
        /// Name of the procedure whose rewrite was aborted
        procedure: String,
        /// Name of the pass that failed
        pass: &'static str,
        /// The underlying error
        #[source]
        source: Box<Error>,
    },

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Wraps this error with the procedure and pass it occurred in.
    ///
    /// Errors that already carry that context are returned unchanged.
    #[must_use]
    pub fn in_pass(self, procedure: &str, pass: &'static str) -> Self {
        match self {
            Error::Pass { .. } => self,
            other => Error::Pass {
                procedure: procedure.to_string(),
                pass,
                source: Box::new(other),
            },
        }
    }
}
