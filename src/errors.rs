//! Centralized error handling for cfkit
//!
//! Every fallible library operation returns [`Result`], whose error type
//! [`CfKitError`] carries enough context (field, axis, construct) to be
//! printed straight to the user by the CLI.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cfkit operations
#[derive(Debug, Error)]
pub enum CfKitError {
    /// NetCDF library errors
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// Failed to open or sniff a dataset file
    #[error("Failed to open file: {path}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No field in a field list matched the selection
    #[error("No field matches '{identity}'")]
    FieldNotFound { identity: String },

    /// Variable not found in a dataset
    #[error("Variable '{var}' not found in file")]
    VariableNotFound { var: String },

    /// Axis not found in a field's domain
    #[error("Axis '{axis}' not found in field '{field}'")]
    AxisNotFound { field: String, axis: String },

    /// Metadata construct not found
    #[error("Construct '{identity}' not found in field '{field}'")]
    ConstructNotFound { field: String, identity: String },

    /// Invalid selection query
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// Invalid subspace request, including empty selections
    #[error("Invalid subspace: {message}")]
    InvalidSubspace { message: String },

    /// Collapse could not be computed
    #[error("Collapse error: {0}")]
    Collapse(String),

    /// Regridding could not be set up or applied
    #[error("Regrid error: {0}")]
    Regrid(String),

    /// A compressed variable could not be uncompressed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Group structure could not be flattened
    #[error("Flattening error: {0}")]
    Flatten(String),

    /// Plotting or rendering failure
    #[error("Plot error: {0}")]
    Plot(String),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl CfKitError {
    /// Create a FieldNotFound error.
    pub fn field_not_found(identity: impl Into<String>) -> Self {
        Self::FieldNotFound {
            identity: identity.into(),
        }
    }

    /// Create an AxisNotFound error.
    pub fn axis_not_found(field: impl Into<String>, axis: impl Into<String>) -> Self {
        Self::AxisNotFound {
            field: field.into(),
            axis: axis.into(),
        }
    }

    /// Create a ConstructNotFound error.
    pub fn construct_not_found(field: impl Into<String>, identity: impl Into<String>) -> Self {
        Self::ConstructNotFound {
            field: field.into(),
            identity: identity.into(),
        }
    }

    /// Create an InvalidQuery error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create an InvalidSubspace error.
    pub fn invalid_subspace(message: impl Into<String>) -> Self {
        Self::InvalidSubspace {
            message: message.into(),
        }
    }
}

/// Result type alias for cfkit operations
pub type Result<T> = std::result::Result<T, CfKitError>;
