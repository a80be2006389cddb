//! Content Forms
//!
//! Form handlers that sit between submitted data and the permission-gated
//! content actions:
//!
//! - `AddForm` - create content of a type inside a container
//! - `EditForm` - update the fieldset values of content
//! - `RenameForm` - change the name of content inside its container
//! - `DeleteForm` - remove content (empty containers only)
//! - `ShareForm` - grant local roles
//!
//! # Submission Flow
//!
//! 1. Extract and validate the submitted data against the form fields
//! 2. Add target-specific checks (name uniqueness, non-empty containers)
//! 3. Call the wrapped content action
//! 4. Answer with a redirect or a re-render with field errors, plus messages
//!
//! Errors of the `Error` kind raised by the action are turned into field
//! errors. `NotFound`, `Forbidden` and storage errors are returned to the
//! caller unchanged.

mod add;
mod delete;
mod edit;
mod rename;
mod share;

pub use add::AddForm;
pub use delete::DeleteForm;
pub use edit::EditForm;
pub use rename::RenameForm;
pub use share::ShareForm;

use crate::db::DatabaseError;
use crate::models::{FieldError, Node, NAME_FIELD};
use crate::services::{url_for, CmsError, ErrorKind};
use serde::Serialize;

/// Shown when a submission is re-rendered with errors
pub const FORM_ERROR_MESSAGE: &str = "Please fix indicated errors.";

/// Submit button of a form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Add,
    Save,
    Rename,
    Delete,
    Share,
    Cancel,
}

impl Button {
    pub fn label(&self) -> &'static str {
        match self {
            Button::Add => "Add",
            Button::Save => "Save",
            Button::Rename => "Rename",
            Button::Delete => "Delete",
            Button::Share => "Share",
            Button::Cancel => "Cancel",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [
            Button::Add,
            Button::Save,
            Button::Rename,
            Button::Delete,
            Button::Share,
            Button::Cancel,
        ]
        .into_iter()
        .find(|button| button.label() == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Success,
    Info,
    Warning,
    Error,
}

/// User-facing flash message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    Redirect(String),
    Rerender(Vec<FieldError>),
}

/// Answer to a form submission
#[derive(Debug, Clone, PartialEq)]
pub struct FormResponse {
    pub outcome: FormOutcome,
    pub messages: Vec<Message>,
}

impl FormResponse {
    pub fn redirect(url: impl Into<String>) -> Self {
        Self {
            outcome: FormOutcome::Redirect(url.into()),
            messages: Vec::new(),
        }
    }

    pub fn rerender(errors: Vec<FieldError>) -> Self {
        Self {
            outcome: FormOutcome::Rerender(errors),
            messages: Vec::new(),
        }
    }

    /// Re-render with the standard error message
    pub fn invalid(errors: Vec<FieldError>) -> Self {
        Self::rerender(errors).with_message(MessageKind::Error, FORM_ERROR_MESSAGE)
    }

    pub fn with_message(mut self, kind: MessageKind, text: impl Into<String>) -> Self {
        self.messages.push(Message {
            kind,
            text: text.into(),
        });
        self
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.outcome, FormOutcome::Redirect(_))
    }

    pub fn errors(&self) -> &[FieldError] {
        match &self.outcome {
            FormOutcome::Rerender(errors) => errors,
            FormOutcome::Redirect(_) => &[],
        }
    }
}

/// Turn a domain error into field errors, passing other kinds through
pub(crate) fn field_errors(err: CmsError) -> Result<Vec<FieldError>, CmsError> {
    if err.kind() != ErrorKind::Error {
        return Err(err);
    }
    let error = match &err {
        CmsError::NameInUse { .. } => FieldError::field(NAME_FIELD, "Name already in use"),
        CmsError::InvalidName { reason, .. } => FieldError::field(NAME_FIELD, reason.clone()),
        CmsError::Validation(crate::models::ValidationError::InvalidFieldValue {
            field,
            reason,
        }) => FieldError::field(field.clone(), reason.clone()),
        CmsError::Database(DatabaseError::DuplicateName { .. }) => {
            FieldError::field(NAME_FIELD, "Name already in use")
        }
        _ => FieldError::form(err.to_string()),
    };
    Ok(vec![error])
}

/// URL of `node`, resolved through the application root found in `lineage`
pub(crate) fn content_url(lineage: &[Node], node: &Node) -> String {
    lineage
        .iter()
        .find(|n| n.is_root())
        .and_then(|root| url_for(root, node))
        .unwrap_or_else(|| format!("{}/", node.name()))
}
