//! Action error types.

use miette::Diagnostic;
use thiserror::Error;

use crate::books::{ProviderError, TransformError};
use crate::covers::CoverStoreError;
use crate::db::DbError;

/// Failures raised by actions. Domain variants carry the user-facing message.
#[derive(Error, Diagnostic, Debug)]
pub enum ActionError {
    #[error("{message}")]
    #[diagnostic(code(bookbound::actions::invalid_argument))]
    InvalidArgument { message: String },

    #[error("No data found for identifier: {identifier}")]
    #[diagnostic(code(bookbound::actions::no_data))]
    NoData { identifier: String },

    #[error("Book not found.")]
    #[diagnostic(code(bookbound::actions::book_not_found))]
    BookNotFound,

    #[error("Book already exists in your library.")]
    #[diagnostic(code(bookbound::actions::already_in_library))]
    AlreadyInLibrary,

    #[error("{}", limit_message(.max_books))]
    #[diagnostic(
        code(bookbound::actions::limit_reached),
        help("Upgrade the plan or remove a book first")
    )]
    LimitReached { max_books: Option<i64> },

    /// Removing a book the user never added.
    #[error("Book not found in user library.")]
    #[diagnostic(code(bookbound::actions::not_in_user_library))]
    NotInUserLibrary,

    /// Updating the status of a book the user never added.
    #[error("Book not found in your library.")]
    #[diagnostic(code(bookbound::actions::not_in_library))]
    NotInLibrary,

    #[error("No settings provided.")]
    #[diagnostic(code(bookbound::actions::no_settings))]
    NoSettings,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cover(#[from] CoverStoreError),
}

fn limit_message(max_books: &Option<i64>) -> String {
    match max_books {
        Some(max) => format!(
            "You can have up to {} books in your library. Remove a book or upgrade your plan to add more.",
            max
        ),
        None => "You have reached the maximum number of books allowed by your subscription."
            .to_string(),
    }
}

pub type ActionResult<T> = Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_message_with_max() {
        let err = ActionError::LimitReached { max_books: Some(5) };
        assert_eq!(
            err.to_string(),
            "You can have up to 5 books in your library. Remove a book or upgrade your plan to add more."
        );
    }

    #[test]
    fn test_limit_message_without_max() {
        let err = ActionError::LimitReached { max_books: None };
        assert_eq!(
            err.to_string(),
            "You have reached the maximum number of books allowed by your subscription."
        );
    }

    #[test]
    fn test_no_data_message() {
        let err = ActionError::NoData {
            identifier: "9780000000000".to_string(),
        };
        assert_eq!(err.to_string(), "No data found for identifier: 9780000000000");
    }

    #[test]
    fn test_db_errors_are_transparent() {
        let err = ActionError::from(DbError::Validation {
            message: "bad".to_string(),
        });
        assert_eq!(err.to_string(), "Validation error: bad");
    }
}
