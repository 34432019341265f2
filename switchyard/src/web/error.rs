//! Why a request ended on an error page.

use super::{environ::EnvironError, reply::HttpError};
use switchyard_core::HandlerFailure;
use thiserror::Error;

/// Conditions the pipeline turns into an [`HttpError`] on its own.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// No `request` handler matched, or every match answered with nothing.
    #[error("no handler answered {method} {path}")]
    NotFound {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// A handler answered with a value the pipeline does not understand.
    #[error("unexpected handler result of type `{type_name}`")]
    HandlerResultInvalid {
        /// Type name of the value.
        type_name: &'static str,
    },

    /// A handler failed while answering.
    #[error(transparent)]
    UpstreamFailure(#[from] HandlerFailure),

    /// The transport environment could not be adapted.
    #[error(transparent)]
    Environ(#[from] EnvironError),
}

impl PipelineError {
    /// The error page this condition is answered with.
    pub fn to_http_error(&self) -> HttpError {
        match self {
            Self::NotFound { .. } => HttpError::not_found(),
            Self::HandlerResultInvalid { .. } => HttpError::new(500)
                .with_message("unexpected handler result")
                .with_traceback(self.to_string()),
            Self::UpstreamFailure(failure) => HttpError::internal(failure.trace.clone()),
            Self::Environ(error) => HttpError::new(400).with_traceback(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_status_codes() {
        let not_found = PipelineError::NotFound {
            method: "GET".into(),
            path: "/nope".into(),
        };
        assert_eq!(not_found.to_http_error().status, 404);

        let invalid = PipelineError::HandlerResultInvalid { type_name: "u32" };
        let error = invalid.to_http_error();
        assert_eq!(error.status, 500);
        assert_eq!(error.message(), "unexpected handler result");
        assert!(error.traceback.unwrap().contains("u32"));

        let failure = HandlerFailure::from_error("index", "request", &HttpError::new(418));
        let error = PipelineError::from(failure).to_http_error();
        assert_eq!(error.status, 500);
        assert!(error.traceback.unwrap().starts_with("index: 418"));
    }
}
