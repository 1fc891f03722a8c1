//! Types for error handling go here.
use std::io::Error as IOError;

quick_error! {
    /// Error type for all conversion errors.
    #[derive(Debug)]
    pub enum FlowError {
        /// A required header parameter is absent.
        MissingKey(key: &'static str) {
            display("Parameter \"{}\" not found in header", key)
        }
        /// A header parameter holds a value outside of the supported set.
        InvalidValue { key: &'static str, expected: &'static str, found: String } {
            display("Parameter \"{}\" must be \"{}\", found \"{}\"", key, expected, found)
        }
        /// A header parameter could not be parsed into the expected type.
        ParseValue { key: &'static str, value: String } {
            display("Problem parsing parameter \"{}\" (value \"{}\")", key, value)
        }
        /// A header line is not of the form `key = value`.
        MalformedLine(line: String) {
            display("Malformed header line: {:?}", line)
        }
        /// Only scalar (1) and vector (3) fields are supported.
        UnsupportedChannels(channels: usize) {
            display("Unsupported number of channels: {}", channels)
        }
        /// The number of channels differs from the one requested by the caller.
        UnexpectedChannels { expected: usize, found: usize } {
            display("Expected {} channel(s), found {}", expected, found)
        }
        /// A grid dimension or spacing is not strictly positive.
        InvalidGeometry(reason: String) {
            display("Invalid grid geometry: {}", reason)
        }
        /// The voxel payload holds fewer bytes than the header announces.
        PayloadTooShort { expected: usize, actual: usize } {
            display("Data length less than expected: {} of {} bytes", actual, expected)
        }
        /// The compressed voxel payload could not be inflated.
        Decompress(err: IOError) {
            display("Failed to decompress payload: {}", err)
            source(err)
        }
        /// The voxel buffer length does not match the grid shape.
        IncompatibleLength(len: usize, expected: usize) {
            display("Voxel buffer of length {} does not fit a grid of {} values", len, expected)
        }
        /// Two inputs that must be compared have different shapes.
        ShapeMismatch(left: Vec<usize>, right: Vec<usize>) {
            display("Input files have different dimensions: {:?} vs {:?}", left, right)
        }
        /// The input rows do not form a regularly spaced grid.
        IrregularGrid { rows: usize, dims: [usize; 3] } {
            display("{} rows do not form a regular {}x{}x{} grid (mesh input is not supported)",
                rows, dims[0], dims[1], dims[2])
        }
        /// A length or velocity unit is not recognised.
        UnknownUnit(unit: String) {
            display("Unknown unit \"{}\"", unit)
        }
        /// A text table row is malformed.
        MalformedRow { line: usize, reason: String } {
            display("Line {}: {}", line, reason)
        }
        /// An image container has a structure that cannot be converted.
        UnsupportedStructure(reason: String) {
            display("Unsupported file structure: {}", reason)
        }
        /// Failure reported by an external format library.
        External(reason: String) {
            display("{}", reason)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
            display("I/O error: {}", err)
        }
    }
}

/// Alias type for results originating from this crate.
pub type Result<T> = ::std::result::Result<T, FlowError>;

/// A non-fatal condition met while decoding. Warnings are logged as they
/// occur and collected on the decoded object so that callers can act on them.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeWarning {
    /// An optional header key was absent and its default was assumed.
    DefaultedKey {
        /// The header key
        key: &'static str,
        /// The value assumed in its place
        default: &'static str,
    },
    /// The payload length was not a multiple of the element size and was
    /// truncated to the previous multiple.
    UnalignedPayload {
        /// Payload length in bytes
        len: usize,
    },
    /// The payload was longer than the grid requires. Extra bytes were ignored.
    OversizedPayload {
        /// Payload length in bytes
        len: usize,
        /// Length required by the header, in bytes
        expected: usize,
    },
    /// The number of table rows differs from the declared node count.
    NodeCountMismatch {
        /// Rows actually read
        rows: usize,
        /// Rows announced in the header
        declared: usize,
    },
    /// A point data array was skipped because of its component count.
    SkippedArray {
        /// Name of the array
        name: String,
        /// Number of components
        components: usize,
    },
    /// Two headers disagree on the given keys.
    HeaderMismatch(Vec<&'static str>),
}

impl ::std::fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        match self {
            DecodeWarning::DefaultedKey { key, default } => {
                write!(f, "\"{}\" not found in header, assuming \"{}\"", key, default)
            }
            DecodeWarning::UnalignedPayload { len } => write!(
                f,
                "payload length {} is not a multiple of 4, truncating to {}",
                len,
                len - len % 4
            ),
            DecodeWarning::OversizedPayload { len, expected } => write!(
                f,
                "data length greater than expected ({} > {} bytes), truncating",
                len, expected
            ),
            DecodeWarning::NodeCountMismatch { rows, declared } => write!(
                f,
                "{} data rows read but the header declares {} nodes",
                rows, declared
            ),
            DecodeWarning::SkippedArray { name, components } => write!(
                f,
                "skipping array \"{}\" with {} components",
                name, components
            ),
            DecodeWarning::HeaderMismatch(keys) => {
                write!(f, "headers differ in: {}", keys.join(", "))
            }
        }
    }
}

impl DecodeWarning {
    /// Log the warning and hand it back, for collecting.
    pub(crate) fn logged(self) -> Self {
        log::warn!("{}", self);
        self
    }
}
