//! HTTP handlers. HTML pages re-read the database after every mutation and
//! render the outcome as an inline notice; `api` serves the same reads as JSON.

use axum::response::{IntoResponse, Response};

use crate::error::RosterError;
use crate::views::html_500;

pub mod api;
pub mod dashboard;
pub mod sections;
pub mod session;
pub mod users;

/// Failure while producing an HTML page. Logged, then answered with the
/// static error page.
#[derive(Debug)]
pub struct PageError(pub RosterError);

impl From<RosterError> for PageError {
    fn from(e: RosterError) -> Self {
        Self(e)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "failed to render page");
        html_500()
    }
}
