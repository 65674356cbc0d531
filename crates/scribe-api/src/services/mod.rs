//! Service layer for business logic.

pub mod accounts;
pub mod media;
pub mod notes;

pub use accounts::AccountService;
pub use notes::NoteService;
