// Request path templating: `{id}` placement, substitution and query strings.

pub const ID_PLACEHOLDER: &str = "{id}";

/// Ensure `path` carries exactly one `{id}`, inserting `/{id}` before any query.
///
/// Paths that already contain the placeholder are returned unchanged.
pub fn append_id_to_path(path: &str) -> String {
    if path.contains(ID_PLACEHOLDER) {
        return path.to_owned();
    }
    match path.split_once('?') {
        Some((base, query)) => format!("{}/{ID_PLACEHOLDER}?{query}", base.trim_end_matches('/')),
        None => format!("{}/{ID_PLACEHOLDER}", path.trim_end_matches('/')),
    }
}

/// Remove a trailing `/{id}` from the path part, keeping any query.
pub fn strip_id_suffix(path: &str) -> String {
    let (base, query) = match path.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (path, None),
    };
    let suffix = format!("/{ID_PLACEHOLDER}");
    let base = base.strip_suffix(suffix.as_str()).unwrap_or(base);
    match query {
        Some(query) => format!("{base}?{query}"),
        None => base.to_owned(),
    }
}

/// Literal replacement of every `{id}` with `id`.
pub fn substitute_id(path: &str, id: &str) -> String {
    path.replace(ID_PLACEHOLDER, id)
}

/// Append `query` with `?`, or `&` when the path already has a query.
pub fn append_query(path: &str, query: Option<&str>) -> String {
    match query.map(|q| q.trim_start_matches(['?', '&'])) {
        Some(q) if !q.is_empty() => {
            let sep = if path.contains('?') { '&' } else { '?' };
            format!("{path}{sep}{q}")
        }
        _ => path.to_owned(),
    }
}

/// Join two optional query strings with `&`, `first` before `second`.
pub fn join_queries(first: Option<&str>, second: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [first, second]
        .into_iter()
        .flatten()
        .filter(|q| !q.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("&"))
    }
}
