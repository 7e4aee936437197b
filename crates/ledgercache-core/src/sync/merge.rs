use crate::models::{CachedTransaction, CachedUser};

/// Merge `incoming` users into `cached` by id.
///
/// A cached record with the same id is replaced in place; new ids are
/// appended. Cached users missing from `incoming` are kept, so a backend
/// that lost users does not shrink the backup.
pub fn upsert_users(cached: Vec<CachedUser>, incoming: &[CachedUser]) -> Vec<CachedUser> {
    let mut merged: Vec<CachedUser> = Vec::with_capacity(cached.len() + incoming.len());
    for user in cached {
        // Collapse duplicate ids left by older backups
        if !merged.iter().any(|u| u.id == user.id) {
            merged.push(user);
        }
    }
    for user in incoming {
        match merged.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user.clone(),
            None => merged.push(user.clone()),
        }
    }
    merged
}

/// Replace every cached transaction of `user_id` with `fresh`.
///
/// Other users' transactions keep their order and come first.
pub fn replace_user_transactions(
    cached: Vec<CachedTransaction>,
    user_id: i64,
    fresh: &[CachedTransaction],
) -> Vec<CachedTransaction> {
    cached
        .into_iter()
        .filter(|t| t.user_id != user_id)
        .chain(fresh.iter().cloned())
        .collect()
}
