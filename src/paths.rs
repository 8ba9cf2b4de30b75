use crate::error::RuntimeError;
use serde_json::Value as Json;

/// A segment in a navigable path used for assignment.
///
/// # Examples
/// - `$.user.email` → `[Field("user"), Field("email")]`
/// - `$.items[0].sku` → `[Field("items"), Index(0), Field("sku")]`
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Object field access by name
    Field(String),
    /// Array element access by index
    Index(i64),
}

/// The document root a set-path names, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    /// No `$` prefix, or a bare `$.`: resolved by the caller.
    Implicit,
    In,
    Out,
    Meta,
}

/// Parse a set-path string: optional `$`, optional `in`/`out`/`meta` root
/// name, then `.name`, `[0]`, or `['key']` segments.
pub fn parse_set_path(path: &str) -> Result<(PathRoot, Vec<PathSegment>), RuntimeError> {
    let text = path.trim();
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    let mut root = PathRoot::Implicit;

    if chars.get(0) == Some(&'$') {
        pos += 1;
        let mut name = String::new();
        while let Some(&ch) = chars.get(pos + name.len()) {
            if ch.is_alphanumeric() || ch == '_' {
                name.push(ch);
            } else {
                break;
            }
        }
        match name.to_lowercase().as_str() {
            "in" => {
                root = PathRoot::In;
                pos += name.len();
            }
            "out" => {
                root = PathRoot::Out;
                pos += name.len();
            }
            "meta" => {
                root = PathRoot::Meta;
                pos += name.len();
            }
            _ => {}
        }
    }

    let mut segments = Vec::new();
    while pos < chars.len() {
        match chars[pos] {
            '.' => {
                pos += 1;
                let name = read_name(&chars, &mut pos);
                if name.is_empty() {
                    return Err(bad_path(path, "empty segment name"));
                }
                segments.push(PathSegment::Field(name));
            }
            '[' => {
                pos += 1;
                match chars.get(pos) {
                    Some(&q) if q == '\'' || q == '"' => {
                        pos += 1;
                        let mut name = String::new();
                        while pos < chars.len() && chars[pos] != q {
                            name.push(chars[pos]);
                            pos += 1;
                        }
                        if chars.get(pos) != Some(&q) {
                            return Err(bad_path(path, "unterminated quoted segment"));
                        }
                        pos += 1;
                        if chars.get(pos) != Some(&']') {
                            return Err(bad_path(path, "expected ']'"));
                        }
                        pos += 1;
                        segments.push(PathSegment::Field(name));
                    }
                    _ => {
                        let mut digits = String::new();
                        if chars.get(pos) == Some(&'-') {
                            digits.push('-');
                            pos += 1;
                        }
                        while let Some(&ch) = chars.get(pos) {
                            if ch.is_ascii_digit() {
                                digits.push(ch);
                                pos += 1;
                            } else {
                                break;
                            }
                        }
                        if chars.get(pos) != Some(&']') {
                            return Err(bad_path(path, "expected ']'"));
                        }
                        pos += 1;
                        let index: i64 = digits
                            .parse()
                            .map_err(|_| bad_path(path, "invalid index"))?;
                        segments.push(PathSegment::Index(index));
                    }
                }
            }
            _ if segments.is_empty() && pos == 0 => {
                // Bare leading name with no `$`: `a.b[0]`
                let name = read_name(&chars, &mut pos);
                if name.is_empty() {
                    return Err(bad_path(path, "unexpected character"));
                }
                segments.push(PathSegment::Field(name));
            }
            _ => return Err(bad_path(path, "unexpected character")),
        }
    }

    Ok((root, segments))
}

fn read_name(chars: &[char], pos: &mut usize) -> String {
    let mut name = String::new();
    while let Some(&ch) = chars.get(*pos) {
        if ch.is_alphanumeric() || ch == '_' || ch == '-' {
            name.push(ch);
            *pos += 1;
        } else {
            break;
        }
    }
    name
}

fn bad_path(path: &str, reason: &str) -> RuntimeError {
    RuntimeError::new(format!("invalid path '{}': {}", path, reason)).with_path(path)
}

/// Assign `value` at `segments` inside `root`, creating intermediate
/// objects/arrays as needed. Arrays are null-padded out to a requested
/// index. Mismatched container shapes are runtime errors.
pub fn set_by_path(
    root: &mut Json,
    segments: &[PathSegment],
    value: Json,
    path_text: &str,
) -> Result<(), RuntimeError> {
    if segments.is_empty() {
        *root = value;
        return Ok(());
    }

    let mut pending = Some(value);
    let mut current = root;
    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        match segment {
            PathSegment::Field(name) => {
                if current.is_null() {
                    *current = Json::Object(serde_json::Map::new());
                }
                let map = current.as_object_mut().ok_or_else(|| {
                    bad_path(path_text, &format!("cannot set field '{}' on a non-object", name))
                })?;
                if last {
                    map.insert(name.clone(), pending.take().unwrap_or(Json::Null));
                    return Ok(());
                }
                current = map.entry(name.clone()).or_insert(Json::Null);
                prepare_child(current, &segments[i + 1]);
            }
            PathSegment::Index(index) => {
                if *index < 0 {
                    return Err(bad_path(path_text, "negative index in assignment"));
                }
                if current.is_null() {
                    *current = Json::Array(Vec::new());
                }
                let arr = current.as_array_mut().ok_or_else(|| {
                    bad_path(path_text, &format!("cannot set index [{}] on a non-array", index))
                })?;
                let idx = *index as usize;
                while arr.len() <= idx {
                    arr.push(Json::Null);
                }
                if last {
                    arr[idx] = pending.take().unwrap_or(Json::Null);
                    return Ok(());
                }
                current = &mut arr[idx];
                prepare_child(current, &segments[i + 1]);
            }
        }
    }
    unreachable!("the final segment always assigns and returns")
}

/// Replace a null slot with the container shape the next segment needs.
fn prepare_child(slot: &mut Json, next: &PathSegment) {
    if slot.is_null() {
        *slot = match next {
            PathSegment::Field(_) => Json::Object(serde_json::Map::new()),
            PathSegment::Index(_) => Json::Array(Vec::new()),
        };
    }
}

/// Navigate to an existing node without creating anything.
pub fn lookup<'a>(root: &'a Json, segments: &[PathSegment]) -> Option<&'a Json> {
    let mut current = root;
    for segment in segments {
        current = match segment {
            PathSegment::Field(name) => current.as_object()?.get(name)?,
            PathSegment::Index(index) => {
                let arr = current.as_array()?;
                let idx = resolve_index(*index, arr.len())?;
                arr.get(idx)?
            }
        };
    }
    Some(current)
}

/// Mutable navigation to an existing node without creating anything.
pub fn lookup_mut<'a>(root: &'a mut Json, segments: &[PathSegment]) -> Option<&'a mut Json> {
    let mut current = root;
    for segment in segments {
        current = match segment {
            PathSegment::Field(name) => current.as_object_mut()?.get_mut(name)?,
            PathSegment::Index(index) => {
                let len = current.as_array()?.len();
                let idx = resolve_index(*index, len)?;
                current.as_array_mut()?.get_mut(idx)?
            }
        };
    }
    Some(current)
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index < 0 {
        let back = (-index) as usize;
        if back > len {
            None
        } else {
            Some(len - back)
        }
    } else {
        Some(index as usize)
    }
}

// ----------------------------------------------------------------------
// JSONPath queries (jp1 / jpAll / existsPath / indexBy)
// ----------------------------------------------------------------------

/// One step of a JSONPath query.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySegment {
    /// `.name` or `['name']`
    Name(String),
    /// `[0]`, negative counts from the end
    Index(i64),
    /// `[*]`
    Wildcard,
    /// `..name` — recursive descent
    Recursive(String),
}

/// Parse the supported JSONPath subset: `$`, `.name`, `['name']`, `[n]`,
/// `[*]`, and `..name`.
pub fn parse_query(path: &str) -> Result<Vec<QuerySegment>, RuntimeError> {
    let text = path.trim();
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    if chars.get(0) == Some(&'$') {
        pos += 1;
    }

    let mut segments = Vec::new();
    while pos < chars.len() {
        match chars[pos] {
            '.' => {
                pos += 1;
                if chars.get(pos) == Some(&'.') {
                    pos += 1;
                    let name = read_name(&chars, &mut pos);
                    if name.is_empty() {
                        return Err(bad_path(path, "empty name after '..'"));
                    }
                    segments.push(QuerySegment::Recursive(name));
                } else if chars.get(pos) == Some(&'*') {
                    pos += 1;
                    segments.push(QuerySegment::Wildcard);
                } else {
                    let name = read_name(&chars, &mut pos);
                    if name.is_empty() {
                        return Err(bad_path(path, "empty segment name"));
                    }
                    segments.push(QuerySegment::Name(name));
                }
            }
            '[' => {
                pos += 1;
                match chars.get(pos) {
                    Some('*') => {
                        pos += 1;
                        if chars.get(pos) != Some(&']') {
                            return Err(bad_path(path, "expected ']'"));
                        }
                        pos += 1;
                        segments.push(QuerySegment::Wildcard);
                    }
                    Some(&q) if q == '\'' || q == '"' => {
                        pos += 1;
                        let mut name = String::new();
                        while pos < chars.len() && chars[pos] != q {
                            name.push(chars[pos]);
                            pos += 1;
                        }
                        if chars.get(pos) != Some(&q) {
                            return Err(bad_path(path, "unterminated quoted segment"));
                        }
                        pos += 1;
                        if chars.get(pos) != Some(&']') {
                            return Err(bad_path(path, "expected ']'"));
                        }
                        pos += 1;
                        segments.push(QuerySegment::Name(name));
                    }
                    _ => {
                        let mut digits = String::new();
                        if chars.get(pos) == Some(&'-') {
                            digits.push('-');
                            pos += 1;
                        }
                        while let Some(&ch) = chars.get(pos) {
                            if ch.is_ascii_digit() {
                                digits.push(ch);
                                pos += 1;
                            } else {
                                break;
                            }
                        }
                        if chars.get(pos) != Some(&']') {
                            return Err(bad_path(path, "expected ']'"));
                        }
                        pos += 1;
                        let index: i64 = digits
                            .parse()
                            .map_err(|_| bad_path(path, "invalid index"))?;
                        segments.push(QuerySegment::Index(index));
                    }
                }
            }
            _ if pos == 0 => {
                let name = read_name(&chars, &mut pos);
                if name.is_empty() {
                    return Err(bad_path(path, "unexpected character"));
                }
                segments.push(QuerySegment::Name(name));
            }
            _ => return Err(bad_path(path, "unexpected character")),
        }
    }
    Ok(segments)
}

/// Evaluate a query: each segment maps the current result set to the next,
/// in document order.
pub fn eval_query<'a>(doc: &'a Json, segments: &[QuerySegment]) -> Vec<&'a Json> {
    let mut results = vec![doc];
    for segment in segments {
        let mut next = Vec::new();
        for node in results {
            match segment {
                QuerySegment::Name(name) => {
                    if let Json::Object(map) = node {
                        if let Some(child) = map.get(name) {
                            next.push(child);
                        }
                    }
                }
                QuerySegment::Index(index) => {
                    if let Json::Array(arr) = node {
                        if let Some(idx) = resolve_index(*index, arr.len()) {
                            if let Some(child) = arr.get(idx) {
                                next.push(child);
                            }
                        }
                    }
                }
                QuerySegment::Wildcard => match node {
                    Json::Array(arr) => next.extend(arr.iter()),
                    Json::Object(map) => next.extend(map.values()),
                    _ => {}
                },
                QuerySegment::Recursive(name) => {
                    collect_recursive(node, name, &mut next);
                }
            }
        }
        results = next;
    }
    results
}

fn collect_recursive<'a>(node: &'a Json, name: &str, out: &mut Vec<&'a Json>) {
    match node {
        Json::Object(map) => {
            if let Some(child) = map.get(name) {
                out.push(child);
            }
            for child in map.values() {
                collect_recursive(child, name, out);
            }
        }
        Json::Array(arr) => {
            for child in arr {
                collect_recursive(child, name, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_creates_intermediate_containers() {
        let mut doc = json!({});
        let (_, segments) = parse_set_path("$.a.b[2].c").unwrap();
        set_by_path(&mut doc, &segments, json!(1), "$.a.b[2].c").unwrap();
        assert_eq!(doc, json!({"a": {"b": [null, null, {"c": 1}]}}));
    }

    #[test]
    fn set_rejects_index_on_object() {
        let mut doc = json!({"a": {"x": 1}});
        let (_, segments) = parse_set_path("$.a[0]").unwrap();
        assert!(set_by_path(&mut doc, &segments, json!(1), "$.a[0]").is_err());
    }

    #[test]
    fn query_wildcard_and_recursive() {
        let doc = json!({"items": [{"price": 1}, {"price": 2}], "nested": {"price": 3}});
        let segs = parse_query("$.items[*].price").unwrap();
        let found: Vec<_> = eval_query(&doc, &segs);
        assert_eq!(found, vec![&json!(1), &json!(2)]);

        let segs = parse_query("$..price").unwrap();
        assert_eq!(eval_query(&doc, &segs).len(), 3);
    }

    #[test]
    fn roots_are_recognized() {
        assert_eq!(parse_set_path("$out.a").unwrap().0, PathRoot::Out);
        assert_eq!(parse_set_path("$in.a").unwrap().0, PathRoot::In);
        assert_eq!(parse_set_path("$.a").unwrap().0, PathRoot::Implicit);
        assert_eq!(parse_set_path("a.b").unwrap().0, PathRoot::Implicit);
    }
}
