use std::error::Error;
use std::fmt::{Display, Formatter};

pub type HerculesResult<T> = Result<T, HerculesError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HerculesErrorKind {
    Schema,
    Arity,
    Index,
    NotFound,
    Version,
    Format,
    Calibration,
    InvalidArgument,
    Io,
}

impl HerculesErrorKind {
    pub const fn exit_placeholder(self) -> ExitPlaceholder {
        match self {
            Self::NotFound => ExitPlaceholder {
                exit_code: 1,
                category: "NotFoundError",
                severity: "WARNING",
            },
            Self::Arity => ExitPlaceholder {
                exit_code: 2,
                category: "ArityError",
                severity: "ERROR",
            },
            Self::Index => ExitPlaceholder {
                exit_code: 2,
                category: "IndexError",
                severity: "ERROR",
            },
            Self::InvalidArgument => ExitPlaceholder {
                exit_code: 2,
                category: "InvalidArgumentError",
                severity: "ERROR",
            },
            Self::Schema => ExitPlaceholder {
                exit_code: 3,
                category: "SchemaError",
                severity: "ERROR",
            },
            Self::Version => ExitPlaceholder {
                exit_code: 4,
                category: "VersionError",
                severity: "ERROR",
            },
            Self::Format => ExitPlaceholder {
                exit_code: 5,
                category: "FormatError",
                severity: "ERROR",
            },
            Self::Calibration => ExitPlaceholder {
                exit_code: 5,
                category: "CalibrationError",
                severity: "ERROR",
            },
            Self::Io => ExitPlaceholder {
                exit_code: 6,
                category: "IoError",
                severity: "ERROR",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_placeholder().exit_code
    }

    pub const fn category(self) -> &'static str {
        self.exit_placeholder().category
    }

    /// Structural errors abort the operation; per-query errors only fail
    /// the call that raised them. Only a missing grid point is recoverable.
    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::NotFound)
    }

    pub const fn is_per_query(self) -> bool {
        matches!(
            self,
            Self::Arity | Self::Index | Self::NotFound | Self::InvalidArgument
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitPlaceholder {
    pub exit_code: i32,
    pub category: &'static str,
    pub severity: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HerculesError {
    kind: HerculesErrorKind,
    placeholder: &'static str,
    message: String,
}

impl HerculesError {
    pub fn new(
        kind: HerculesErrorKind,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            placeholder,
            message: message.into(),
        }
    }

    pub fn schema(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HerculesErrorKind::Schema, placeholder, message)
    }

    pub fn arity(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HerculesErrorKind::Arity, placeholder, message)
    }

    pub fn index(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HerculesErrorKind::Index, placeholder, message)
    }

    pub fn not_found(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HerculesErrorKind::NotFound, placeholder, message)
    }

    pub fn version(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HerculesErrorKind::Version, placeholder, message)
    }

    pub fn format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HerculesErrorKind::Format, placeholder, message)
    }

    pub fn calibration(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HerculesErrorKind::Calibration, placeholder, message)
    }

    pub fn invalid_argument(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HerculesErrorKind::InvalidArgument, placeholder, message)
    }

    pub fn io(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HerculesErrorKind::Io, placeholder, message)
    }

    pub const fn kind(&self) -> HerculesErrorKind {
        self.kind
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    pub const fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }

    pub fn diagnostic_line(&self) -> String {
        format!(
            "{}: [{}] {}",
            self.kind.exit_placeholder().severity,
            self.placeholder,
            self.message
        )
    }
}

impl Display for HerculesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.kind.category(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for HerculesError {}
