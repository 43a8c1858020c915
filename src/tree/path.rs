//! Lexical path handling for namespace lookups.
//!
//! Paths are always treated as rooted: `a/b` and `/a/b` name the same entry.

/// Clean a path lexically: collapse duplicate slashes, drop `.` segments and
/// resolve `..` against the preceding segment. `..` at the root stays at the root.
pub fn clean(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    if parts.is_empty() {
        return "/".to_string();
    }
    let mut cleaned = String::with_capacity(path.len() + 1);
    for part in parts {
        cleaned.push('/');
        cleaned.push_str(part);
    }
    cleaned
}

/// Segments of a cleaned path. The root has none.
pub fn segments(cleaned: &str) -> impl Iterator<Item = &str> {
    cleaned.split('/').filter(|s| !s.is_empty())
}

/// Split a path into its cleaned parent directory and final name.
///
/// The root splits into `("/", "")`.
pub fn split(path: &str) -> (String, String) {
    let cleaned = clean(path);
    match cleaned.rsplit_once('/') {
        Some(("", name)) => ("/".to_string(), name.to_string()),
        Some((parent, name)) => (parent.to_string(), name.to_string()),
        None => ("/".to_string(), cleaned),
    }
}

/// Join a directory path and a child name.
pub fn join(dir: &str, name: &str) -> String {
    let dir = clean(dir);
    if dir == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Whether `name` can be used as a single directory entry.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/')
}
