//! Shared key generation for storage backends.
//!
//! Key format: `orgs/{org_id}/{collection}/{record_id}/{uuid}-{filename}`.

use uuid::Uuid;

const MAX_FILENAME_LEN: usize = 200;

/// Generate a storage key for a file attached to `record_id` in `collection`.
///
/// A random prefix keeps two uploads with the same name apart.
pub fn generate_storage_key(
    org_id: Uuid,
    collection: &str,
    record_id: Uuid,
    filename: &str,
) -> String {
    format!(
        "orgs/{}/{}/{}/{}-{}",
        org_id,
        collection,
        record_id,
        Uuid::new_v4(),
        sanitize_filename(filename)
    )
}

/// True when `key` lives under the organisation's prefix.
pub fn key_belongs_to_org(key: &str, org_id: Uuid) -> bool {
    key.strip_prefix("orgs/")
        .and_then(|rest| rest.strip_prefix(&org_id.to_string()))
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Keep the client-supplied name readable while stripping anything that could
/// change the key's directory structure.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    let cleaned: String = cleaned.chars().take(MAX_FILENAME_LEN).collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
