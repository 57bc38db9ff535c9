//! Object naming and identifier generation.
//!
//! Storage object keys are laid out as `{prefix}/{account_id}/{obj_id}`.
//! Callers refer to stored objects through a composite file id of the form
//! `{account_id}/.../{obj_id}`.

use uuid::Uuid;

use crate::error::DataStoreError;

/// Compute the storage object name for an object owned by an account.
/// Scheme: `{prefix}/{account_id}/{obj_id}`, or `{account_id}/{obj_id}` when
/// the prefix is empty.
pub fn compose_object_name(prefix: &str, account_id: &str, obj_id: &str) -> String {
    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    if prefix.is_empty() {
        format!("{}/{}", account_id, obj_id)
    } else {
        format!("{}/{}/{}", prefix, account_id, obj_id)
    }
}

/// Build the composite file id handed back to callers after an upload.
pub fn compose_file_id(account_id: &str, obj_id: &str) -> String {
    format!("{}/{}", account_id, obj_id)
}

/// Split a composite file id into `(account_id, obj_id)`.
///
/// The account is everything before the first `/` and the object is
/// everything after the last `/`, so intermediate segments are ignored.
pub fn split_file_id(file_id: &str) -> Result<(&str, &str), DataStoreError> {
    let first = file_id.find('/');
    let last = file_id.rfind('/');
    match (first, last) {
        (Some(first), Some(last)) => Ok((&file_id[..first], &file_id[last + 1..])),
        _ => Err(DataStoreError::InvalidArgument(format!(
            "malformed file id '{}': expected account/object",
            file_id
        ))),
    }
}

pub fn new_object_id() -> String {
    Uuid::new_v4().to_string()
}

/// Account ids come from the same generator as object ids.
pub fn new_account_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_object_name() {
        assert_eq!(compose_object_name("tenant", "acct", "obj"), "tenant/acct/obj");
        assert_eq!(compose_object_name("", "acct", "obj"), "acct/obj");
        assert_eq!(compose_object_name("tenant/", "acct", "obj"), "tenant/acct/obj");
        assert_eq!(compose_object_name("a/b", "acct", "obj"), "a/b/acct/obj");
    }

    #[test]
    fn test_split_file_id() {
        assert_eq!(split_file_id("acct/obj").unwrap(), ("acct", "obj"));
        assert_eq!(split_file_id("acct/dir/sub/obj").unwrap(), ("acct", "obj"));
        assert_eq!(split_file_id("/obj").unwrap(), ("", "obj"));
        assert_eq!(split_file_id("acct/").unwrap(), ("acct", ""));
    }

    #[test]
    fn test_split_file_id_without_separator() {
        for bad in ["", "acct", "acct-obj"] {
            let err = split_file_id(bad).unwrap_err();
            assert!(matches!(err, DataStoreError::InvalidArgument(_)), "{bad}");
        }
    }

    #[test]
    fn test_split_recovers_composed_name() {
        for _ in 0..16 {
            let account = new_account_id();
            let obj = new_object_id();
            let name = compose_object_name("", &account, &obj);
            assert_eq!(split_file_id(&name).unwrap(), (account.as_str(), obj.as_str()));
            assert_eq!(name, compose_file_id(&account, &obj));
        }
    }

    #[test]
    fn test_new_ids_are_unique() {
        let ids: std::collections::HashSet<String> =
            (0..1000).map(|_| new_object_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert_ne!(new_account_id(), new_account_id());
    }
}
