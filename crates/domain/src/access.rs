//! Caller authorization checks.

use common::UserId;
use store::AccountRepository;

use crate::error::DomainError;

/// Returns true if the user has an admin account.
pub async fn is_admin<R>(repo: &mut R, user_id: UserId) -> Result<bool, DomainError>
where
    R: AccountRepository + ?Sized,
{
    Ok(repo
        .find_account(user_id)
        .await?
        .is_some_and(|account| account.is_admin))
}

/// Fails with `Unauthorized` unless the caller is `owner` or an admin.
pub async fn ensure_owner_or_admin<R>(
    repo: &mut R,
    caller: UserId,
    owner: Option<UserId>,
    what: &str,
) -> Result<(), DomainError>
where
    R: AccountRepository + ?Sized,
{
    if owner == Some(caller) || is_admin(repo, caller).await? {
        return Ok(());
    }
    Err(DomainError::Unauthorized(format!(
        "{caller} may not access {what}"
    )))
}
