//! Scope filter applied to every edit before it reaches the store

use super::normalizer::CanonicalEdit;

/// An edit is in scope when it belongs to the tracked domain and to an article page.
///
/// Historical edits always pass the domain half (they are normalized with the tracked
/// domain), but go through the same check so that every source is filtered the same way.
pub fn is_in_scope(edit: &CanonicalEdit, tracked_domain: &str) -> bool {
    edit.domain == tracked_domain && edit.namespace_is_article
}
