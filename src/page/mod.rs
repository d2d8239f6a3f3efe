//! Everything that touches the hosted page: the document seam, stylesheet
//! injection, the page decorators and the notification modal.

pub mod decorators;
pub mod document;
pub mod modal;
pub mod styles;

pub use decorators::{Decorators, NotificationOutcome};
pub use document::{Document, HeadElement, Page};
pub use modal::{AutoDismissModal, Modal};
pub use styles::{InjectMode, InjectReport, StyleInjector};
