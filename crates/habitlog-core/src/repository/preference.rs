//! Timezone preference repository trait definition.

use habitlog_types::error::RepositoryError;
use habitlog_types::user::UserId;

/// Durable per-user timezone choice.
///
/// Stores identifiers verbatim. Validation happens in `TimezoneResolver`
/// before anything reaches `set`.
pub trait TimezonePreferenceRepository: Send + Sync {
    /// The stored identifier, or `None` if the user never chose one.
    fn get(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<String>, RepositoryError>> + Send;

    /// Insert or overwrite the user's identifier.
    fn set(
        &self,
        user_id: UserId,
        timezone: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
