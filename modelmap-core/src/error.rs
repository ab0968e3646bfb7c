//! Error types for serialization and population with actionable messages.
//!
//! Every failure the engines can report is a recoverable [`ModelError`]. None of
//! them are fatal to the process: they are meant to propagate to the request
//! handler that called [`as_dict`](crate::Serializable::as_dict) or
//! [`from_dict`](crate::Serializable::from_dict), which typically translates them
//! into an HTTP response with [`ModelError::status_code`] and
//! [`ModelError::to_dict`].
//!
//! # Error Codes
//!
//! Error codes follow a pattern: M{category}{number}
//! - 1xxx: Selection errors (unknown field, unknown relationship, unloaded relation)
//! - 2xxx: Data errors (value conversion, malformed payload, type mismatch)
//! - 3xxx: Population errors (unmatched key, duplicate key, repository)
//! - 4xxx: Descriptor errors (invalid descriptor, missing factory/repository)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use modelmap_core::{ErrorCode, ModelError};
//!
//! let err = ModelError::unknown_field("Parent", "nosuchfield");
//! assert_eq!(err.code, ErrorCode::UnknownField);
//! assert_eq!(err.code.code(), "M1001");
//! assert!(err.to_string().contains("does not exist on Parent"));
//! assert_eq!(err.status_code(), 400);
//! ```

use std::fmt;
use thiserror::Error;

use crate::value::ValueError;

/// Result type for serialization and population operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Selection errors (1xxx)
    /// A requested field is not declared on the entity type (M1001).
    UnknownField = 1001,
    /// A dotted path starts with a name that is not a relationship (M1002).
    UnknownRelationship = 1002,
    /// A relationship was not loaded and the caller asked to fail (M1003).
    RelationshipNotLoaded = 1003,

    // Data errors (2xxx)
    /// A value could not be converted to the attribute type (M2001).
    InvalidValue = 2001,
    /// The payload does not have the expected shape (M2002).
    InvalidPayload = 2002,
    /// A related entity has a different concrete type than declared (M2003).
    TypeMismatch = 2003,

    // Population errors (3xxx)
    /// A primary key in the payload matched no existing record (M3001).
    RecordNotFound = 3001,
    /// The same primary key was listed twice for one relationship (M3002).
    DuplicateKey = 3002,
    /// The repository failed to preload related records (M3003).
    RepositoryFailure = 3003,

    // Descriptor errors (4xxx)
    /// The entity type descriptor is inconsistent (M4001).
    InvalidDescriptor = 4001,
    /// The entity type cannot create new instances (M4002).
    MissingFactory = 4002,
    /// Recursive population needs a repository to preload records (M4003).
    MissingRepository = 4003,

    // Configuration errors (7xxx)
    /// Invalid configuration (M7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (M9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "M1001").
    pub fn code(&self) -> String {
        format!("M{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::UnknownField => "Unknown field",
            Self::UnknownRelationship => "Unknown relationship",
            Self::RelationshipNotLoaded => "Relationship not loaded",
            Self::InvalidValue => "Invalid value",
            Self::InvalidPayload => "Invalid payload",
            Self::TypeMismatch => "Entity type mismatch",
            Self::RecordNotFound => "Record not found",
            Self::DuplicateKey => "Duplicate primary key",
            Self::RepositoryFailure => "Repository failure",
            Self::InvalidDescriptor => "Invalid entity descriptor",
            Self::MissingFactory => "Missing entity factory",
            Self::MissingRepository => "Missing repository",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }

    /// HTTP status an upstream handler should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownField
            | Self::UnknownRelationship
            | Self::InvalidValue
            | Self::InvalidPayload
            | Self::DuplicateKey => 400,
            Self::RecordNotFound => 404,
            _ => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The entity type involved.
    pub model: Option<String>,
    /// The field or relationship involved.
    pub field: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors raised by the resolver, the serialization engine and the population engine.
#[derive(Error, Debug)]
pub struct ModelError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl ModelError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the entity type.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// A plain field name that is neither a column nor a relationship.
    pub fn unknown_field(model: impl Into<String>, field: impl Into<String>) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::UnknownField,
            format!("Field '{}' does not exist on {}.", field, model),
        )
        .with_model(&model)
        .with_field(&field)
        .with_suggestion(format!(
            "Check the spelling of '{}' against the columns declared on {}",
            field, model
        ))
    }

    /// A dotted path whose first segment is not a relationship.
    pub fn unknown_relationship(model: impl Into<String>, relationship: impl Into<String>) -> Self {
        let model = model.into();
        let relationship = relationship.into();
        Self::new(
            ErrorCode::UnknownRelationship,
            format!("Relationship '{}' does not exist on {}.", relationship, model),
        )
        .with_model(&model)
        .with_field(&relationship)
        .with_help("Only relationships can be traversed with the 'relationship.field' notation")
    }

    /// A relationship that is not materialized while the caller refuses implicit fetches.
    pub fn not_loaded(model: impl Into<String>, relationship: impl Into<String>) -> Self {
        let model = model.into();
        let relationship = relationship.into();
        Self::new(
            ErrorCode::RelationshipNotLoaded,
            format!("Relationship '{}' on '{}' is not loaded", relationship, model),
        )
        .with_model(&model)
        .with_field(&relationship)
        .with_suggestion(format!(
            "Eager-load '{}' in the query that produced this {}",
            relationship, model
        ))
    }

    /// A value that cannot be stored in the attribute.
    pub fn invalid_value(model: impl Into<String>, field: impl Into<String>, source: ValueError) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::InvalidValue,
            format!("Invalid value for {}.{}: {}", model, field, source),
        )
        .with_model(&model)
        .with_field(&field)
        .with_source(source)
    }

    /// A payload that does not have the expected shape.
    pub fn invalid_payload(model: impl Into<String>, message: impl Into<String>) -> Self {
        let model = model.into();
        let message = message.into();
        Self::new(
            ErrorCode::InvalidPayload,
            format!("Invalid payload for {}: {}", model, message),
        )
        .with_model(&model)
    }

    /// A related entity whose concrete type differs from the declared target.
    pub fn type_mismatch(model: impl Into<String>, relationship: impl Into<String>, expected: &str) -> Self {
        let model = model.into();
        let relationship = relationship.into();
        Self::new(
            ErrorCode::TypeMismatch,
            format!(
                "Relationship {}.{} expects {} instances",
                model, relationship, expected
            ),
        )
        .with_model(&model)
        .with_field(&relationship)
        .with_help("The repository returned an entity of another type for this relationship")
    }

    /// A primary key in the payload that matched no existing record.
    pub fn not_found(model: impl Into<String>, key: impl fmt::Display) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} record found with primary key {}", model, key),
        )
        .with_model(&model)
        .with_suggestion("Omit the primary key to create a new record")
    }

    /// The same primary key listed twice in one relationship payload.
    pub fn duplicate_key(model: impl Into<String>, relationship: impl Into<String>, key: impl fmt::Display) -> Self {
        let model = model.into();
        let relationship = relationship.into();
        Self::new(
            ErrorCode::DuplicateKey,
            format!(
                "Primary key {} is listed more than once in {}.{}",
                key, model, relationship
            ),
        )
        .with_model(&model)
        .with_field(&relationship)
    }

    /// A repository failure while preloading related records.
    pub fn repository(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::RepositoryFailure,
            format!("Repository error: {}", message),
        )
    }

    /// An inconsistent entity type descriptor.
    pub fn invalid_descriptor(model: impl Into<String>, message: impl Into<String>) -> Self {
        let model = model.into();
        let message = message.into();
        Self::new(
            ErrorCode::InvalidDescriptor,
            format!("Invalid descriptor for {}: {}", model, message),
        )
        .with_model(&model)
    }

    /// An entity type without an instance factory.
    pub fn missing_factory(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::MissingFactory,
            format!("{} has no factory, new instances cannot be created", model),
        )
        .with_model(&model)
        .with_code_suggestion(
            "Register a factory on the descriptor",
            format!("EntityType::builder(\"{}\").factory(|| Box::new({}::default()))", model, model),
        )
    }

    /// Recursive population that needs a repository but was given none.
    pub fn missing_repository(model: impl Into<String>, relationship: impl Into<String>) -> Self {
        let model = model.into();
        let relationship = relationship.into();
        Self::new(
            ErrorCode::MissingRepository,
            format!(
                "Populating {}.{} requires a repository to preload existing records",
                model, relationship
            ),
        )
        .with_model(&model)
        .with_field(&relationship)
        .with_suggestion("Pass a repository with PopulateOptions::repository")
    }

    /// An invalid configuration.
    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::InvalidConfiguration,
            format!("Invalid configuration: {}", message),
        )
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    // ============== Error Checks ==============

    /// Check if this error was caused by the caller's request.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a selection error (unknown field or relationship).
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::UnknownField | ErrorCode::UnknownRelationship
        )
    }

    /// HTTP status an upstream handler should answer with.
    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }

    /// Render the error the way the HTTP layer reports it.
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "message": self.message,
            "status_code": self.status_code(),
            "raisedError": self.code.description(),
            "code": self.code.code(),
        })
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

impl From<toml::de::Error> for ModelError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(err.to_string()).with_source(err)
    }
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! model_error {
    ($code:expr, $msg:expr) => {
        $crate::error::ModelError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::ModelError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}
