//!
//! Sandboxed path resolution. Requested names are mapped into the document
//! root purely lexically - no OS canonicalization - so traversal attempts
//! are rejected even when the target does not exist.

/// Resolves a requested name against the current directory, confined to the
/// document root. A name starting with `/` resets the current directory to
/// the root first. `.` and `..` normalize against a component stack; popping
/// past the root is a traversal attempt and yields `None`.
///
/// The returned identifier is `/`-joined with a leading slash and serves as
/// the session's file id (e.g. `"/sub/b.html"`).
pub(crate) fn resolve(current_dir: &str, name: &str) -> Option<String> {
    let mut stack: Vec<&str> = Vec::new();
    if !name.starts_with('/') {
        stack.extend(current_dir.split('/').filter(|c| !c.is_empty()));
    }
    for component in name.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            component => stack.push(component),
        }
    }
    Some(format!("/{}", stack.join("/")))
}

/// The directory part of a resolved identifier: `"/sub/b.html"` -> `"/sub"`,
/// `"/b.html"` -> `""`.
pub(crate) fn parent_dir(identifier: &str) -> &str {
    match identifier.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    }
}
