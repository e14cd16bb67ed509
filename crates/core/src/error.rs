use crate::access::{Operation, Role};
use clinica_types::TextError;

#[derive(Debug, thiserror::Error)]
pub enum ClinicaError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid {field}: {source}")]
    InvalidField {
        field: &'static str,
        #[source]
        source: TextError,
    },
    #[error(
        "the patient already has an active admission; discharge it before creating a new one"
    )]
    ActiveAdmissionExists,
    #[error("the selected area does not belong to the selected center")]
    AreaNotInCenter,
    #[error("the responsible staff member must hold the physician role")]
    ResponsibleNotPhysician,

    #[error("authentication required to {operation}")]
    Unauthenticated { operation: Operation },
    #[error("role {role} may not {operation}")]
    Forbidden { role: Role, operation: Operation },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("failed to create database directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("database connection lock poisoned")]
    LockPoisoned,
    #[error("failed to render clinical record document: {0}")]
    Document(String),
}

/// Broad classes of [`ClinicaError`], used by API layers to pick a response status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Internal,
}

impl ClinicaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClinicaError::InvalidInput(_)
            | ClinicaError::InvalidField { .. }
            | ClinicaError::ActiveAdmissionExists
            | ClinicaError::AreaNotInCenter
            | ClinicaError::ResponsibleNotPhysician => ErrorKind::Validation,
            ClinicaError::Unauthenticated { .. } | ClinicaError::Forbidden { .. } => {
                ErrorKind::Authorization
            }
            ClinicaError::NotFound { .. } => ErrorKind::NotFound,
            ClinicaError::StorageDirCreation(_)
            | ClinicaError::Database(_)
            | ClinicaError::LockPoisoned
            | ClinicaError::Document(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        ClinicaError::NotFound { entity, id }
    }

    pub(crate) fn field(field: &'static str) -> impl FnOnce(TextError) -> Self {
        move |source| ClinicaError::InvalidField { field, source }
    }
}

pub type ClinicaResult<T> = std::result::Result<T, ClinicaError>;
