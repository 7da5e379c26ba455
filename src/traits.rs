use crate::{
    error::RemoteError,
    query::Query,
    types::book::{Book, IdentityPath},
    workflow::Notification,
};

/// The remote entity collection. Every call is a single attempt.
pub trait BookEndpoint {
    /// Name of the entity set, used to build identity paths.
    fn entity_set(&self) -> &str;

    async fn query(&self, query: &Query) -> Result<Vec<Book>, RemoteError>;

    async fn create(&self, book: &Book) -> Result<(), RemoteError>;

    async fn update(&self, path: &IdentityPath, book: &Book) -> Result<(), RemoteError>;

    async fn delete(&self, path: &IdentityPath) -> Result<(), RemoteError>;
}

/// Receives exactly one message per finished user action.
pub trait Notifier {
    fn notify(&self, notification: Notification);
}
