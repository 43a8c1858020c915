//! Name-set differences between a cached directory and its remote listing.
//!
//! Every function keeps the order of the list it reports from and drops
//! duplicate names.

use std::collections::HashSet;

fn report<'a, S: AsRef<str>>(
    from: &'a [S],
    keep: impl Fn(&str) -> bool,
) -> Vec<String> {
    let mut seen = HashSet::new();
    from.iter()
        .map(AsRef::as_ref)
        .filter(|name| keep(name) && seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Names listed remotely but absent from the cache, in remote order.
pub fn missing_locally<L: AsRef<str>, R: AsRef<str>>(local: &[L], remote: &[R]) -> Vec<String> {
    let local: HashSet<&str> = local.iter().map(AsRef::as_ref).collect();
    report(remote, |name| !local.contains(name))
}

/// Names cached locally but absent from the remote listing, in local order.
pub fn missing_remotely<L: AsRef<str>, R: AsRef<str>>(local: &[L], remote: &[R]) -> Vec<String> {
    let remote: HashSet<&str> = remote.iter().map(AsRef::as_ref).collect();
    report(local, |name| !remote.contains(name))
}

/// Names present on both sides, in local order.
pub fn intersect<L: AsRef<str>, R: AsRef<str>>(local: &[L], remote: &[R]) -> Vec<String> {
    let remote: HashSet<&str> = remote.iter().map(AsRef::as_ref).collect();
    report(local, |name| remote.contains(name))
}
