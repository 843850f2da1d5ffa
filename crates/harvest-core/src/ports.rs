use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    catalog::SessionFile,
    domain::{Group, GroupId, Identity, MessageId, MessageRecord, UserId},
    errors::PlatformError,
    Result,
};

/// Hexagonal port for an already-authorized platform account.
///
/// Implementations map the client library's objects into [`Group`], [`Identity`] and
/// [`MessageRecord`] before returning, and classify failures into [`PlatformError`].
#[async_trait]
pub trait AccountPort: Send + Sync {
    /// Dialogs visible to the account, in the platform's listing order.
    async fn dialogs(&self) -> Result<Vec<Group>>;

    /// Full participant list of a group (one call, all pages).
    async fn members(&self, group: GroupId) -> Result<Vec<Identity>>;

    /// One page of history, newest first, strictly older than `before` when given.
    /// A page may hold fewer than `limit` messages; only an empty page ends the history.
    async fn messages(
        &self,
        group: GroupId,
        before: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<MessageRecord>>;

    /// Role and presence of one user inside `group`; `None` if the user is gone.
    async fn resolve_member(&self, group: GroupId, user: UserId) -> Result<Option<Identity>>;

    /// Add `handle` to the channel/group addressed by `channel` (public username).
    async fn invite(&self, channel: &str, handle: &str) -> std::result::Result<(), PlatformError>;
}

/// Opens an [`AccountPort`] for a stored session. Supplied by the embedding application.
#[async_trait]
pub trait AccountConnector: Send + Sync {
    async fn connect(&self, session: &SessionFile) -> Result<Arc<dyn AccountPort>>;
}
