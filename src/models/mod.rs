pub mod category;
pub mod document;
pub mod user;

pub use category::{Category, CategoryRequest};
pub use document::{CreateDocumentRequest, Document, UpdateDocumentRequest};
pub use user::{AuthResponse, Credentials, PublicUser, User};
