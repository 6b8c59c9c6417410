//! [`Error`]-related definitions.

use std::{
    fmt,
    sync::atomic::{self, AtomicBool},
};

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::typed_header::TypedHeaderRejection;
use derive_more::Error as StdError;
use serde::Serialize;
use service::infra::database;
use tracerr::{Trace, Traced};

/// Whether [`Error`] responses include backtraces.
static EXPOSE_BACKTRACES: AtomicBool = AtomicBool::new(false);

/// Makes [`Error`] responses include (or omit) backtraces.
pub fn expose_backtraces(expose: bool) {
    EXPOSE_BACKTRACES.store(expose, atomic::Ordering::Relaxed);
}

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self::new(
                            $code,
                            ::http::StatusCode::$status_code,
                            $message,
                        ),
                    )*
                }
            }
        }
    };
}

/// REST API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,

    /// Invalid request fields, if any.
    pub fields: Vec<Field>,
}

impl Error {
    /// Creates a new [`Error`] without a backtrace and invalid fields.
    #[must_use]
    pub fn new(
        code: Code,
        status_code: http::StatusCode,
        message: impl ToString,
    ) -> Self {
        Self {
            code,
            status_code,
            backtrace: None,
            message: message.to_string(),
            fields: vec![],
        }
    }

    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self::new(
            "INTERNAL_SERVER_ERROR",
            http::StatusCode::INTERNAL_SERVER_ERROR,
            msg.to_string(),
        )
    }

    /// Creates a new [`Error`] representing a malformed request.
    #[must_use]
    pub fn bad_request(msg: &impl ToString) -> Self {
        Self::new("BAD_REQUEST", http::StatusCode::BAD_REQUEST, msg.to_string())
    }

    /// Creates a new [`Error`] listing the provided invalid [`Field`]s.
    #[must_use]
    pub fn invalid_fields(fields: Vec<Field>) -> Self {
        Self {
            fields,
            ..Self::new(
                "INVALID_FIELDS",
                http::StatusCode::BAD_REQUEST,
                "Request contains invalid fields",
            )
        }
    }

    /// Returns the [`Kind`] of this [`Error`].
    #[must_use]
    pub fn kind(&self) -> Kind {
        Kind::of(self.status_code)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
            fields,
        } = self;

        write!(f, "[{code}]: {message}")?;
        for Field { field, message } in fields {
            write!(f, "\n  `{field}`: {message}")?;
        }
        if let Some(trace) = backtrace {
            write!(f, "\n{trace}")?;
        }
        Ok(())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.status_code.is_server_error() {
            tracing::error!("{self}");
        }

        let backtrace =
            EXPOSE_BACKTRACES.load(atomic::Ordering::Relaxed).then(|| {
                self.backtrace
                    .iter()
                    .flat_map(|trace| trace.iter())
                    .map(|frame| frame.to_string())
                    .collect()
            });
        let body = Body {
            kind: self.kind(),
            code: self.code,
            message: self.message,
            fields: (!self.fields.is_empty()).then_some(self.fields),
            backtrace,
        };
        (self.status_code, Json(body)).into_response()
    }
}

/// JSON body of an [`Error`] response.
#[derive(Debug, Serialize)]
struct Body {
    /// [`Kind`] of the [`Error`].
    kind: Kind,

    /// [`Code`] of the [`Error`].
    code: Code,

    /// Human-readable message.
    message: String,

    /// Invalid request [`Field`]s.
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<Field>>,

    /// Frames of the [`Error`] backtrace.
    #[serde(skip_serializing_if = "Option::is_none")]
    backtrace: Option<Vec<String>>,
}

/// Invalid field of a request.
#[derive(Clone, Debug, Serialize)]
pub struct Field {
    /// Name of the field, as in the request.
    pub field: &'static str,

    /// What is wrong with the field.
    pub message: String,
}

/// [`Error`] code.
pub type Code = &'static str;

/// Category of an [`Error`], derived from its [`http::StatusCode`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    /// Request is malformed or invalid.
    Validation,

    /// Requested entity does not exist or is not visible to the caller.
    NotFound,

    /// Request conflicts with the current state of an entity.
    Conflict,

    /// Caller is not authenticated.
    Unauthorized,

    /// Caller is not allowed to perform the request.
    Forbidden,

    /// A dependency of the server failed.
    Upstream,

    /// Server failed.
    Internal,
}

impl Kind {
    /// Returns the [`Kind`] of the provided [`http::StatusCode`].
    #[must_use]
    pub fn of(status: http::StatusCode) -> Self {
        match status.as_u16() {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            400..=499 => Self::Validation,
            502..=504 => Self::Upstream,
            _ => Self::Internal,
        }
    }
}

/// Collector of invalid request [`Field`]s.
#[derive(Debug, Default)]
pub struct Validation(Vec<Field>);

impl Validation {
    /// Creates a new empty [`Validation`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the provided `field` as invalid.
    pub fn reject(&mut self, field: &'static str, message: impl ToString) {
        self.0.push(Field {
            field,
            message: message.to_string(),
        });
    }

    /// Passes the provided `value` through, recording the provided `field`
    /// as invalid if it's [`None`].
    pub fn check<T>(
        &mut self,
        field: &'static str,
        value: Option<T>,
        message: impl ToString,
    ) -> Option<T> {
        if value.is_none() {
            self.reject(field, message);
        }
        value
    }

    /// Returns the [`Error`] listing all the recorded [`Field`]s.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::invalid_fields(self.0)
    }

    /// Finishes this [`Validation`].
    ///
    /// # Errors
    ///
    /// If any [`Field`] was recorded as invalid.
    pub fn finish(self) -> Result<(), Error> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }
}

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError + fmt::Display> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }

    fn as_error(&self) -> Error {
        let mut error = self.as_ref().as_error();
        error.backtrace = Some(self.trace().clone());
        error
    }
}

impl AsError for TypedHeaderRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(self))
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "DATABASE_UNAVAILABLE"]
                #[status = BAD_GATEWAY]
                #[message = "Database is temporarily unavailable"]
                Unavailable,
            }
        }

        self.is_unavailable().then(|| Error::Unavailable.into())
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(&rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(&rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(&rejection.body_text())
    }
}
