// Library editor services

pub mod files;
pub mod scopes;

pub use files::LibraryFilesClient;
pub use scopes::ScopeCatalog;
