//! Conversions from external infrastructure errors into domain errors.

use macroplan_domain::MacroPlanError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub MacroPlanError);

impl From<InfraError> for MacroPlanError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<MacroPlanError> for InfraError {
    fn from(value: MacroPlanError) -> Self {
        InfraError(value)
    }
}

impl std::fmt::Display for InfraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for InfraError {}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoMacroPlanError {
    fn into_macroplan(self) -> MacroPlanError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → MacroPlanError */
/* -------------------------------------------------------------------------- */

impl IntoMacroPlanError for SqlError {
    fn into_macroplan(self) -> MacroPlanError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        MacroPlanError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        MacroPlanError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        MacroPlanError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        MacroPlanError::Database("foreign key constraint violation".into())
                    }
                    _ => MacroPlanError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                MacroPlanError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                MacroPlanError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                MacroPlanError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                MacroPlanError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidQuery => MacroPlanError::Database("invalid SQL query".into()),
            other => MacroPlanError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_macroplan())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → MacroPlanError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(MacroPlanError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → MacroPlanError */
/* -------------------------------------------------------------------------- */

impl IntoMacroPlanError for HttpError {
    fn into_macroplan(self) -> MacroPlanError {
        if self.is_timeout() {
            return MacroPlanError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return MacroPlanError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => MacroPlanError::Auth(message),
                404 => MacroPlanError::NotFound(message),
                429 => MacroPlanError::Network(message),
                400..=499 => MacroPlanError::InvalidInput(message),
                _ => MacroPlanError::Network(message),
            };
        }

        MacroPlanError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_macroplan())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
