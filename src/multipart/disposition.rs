//! `Content-Disposition` parameter parsing for form-data parts

/// The parameters of a `form-data` disposition that the decoder cares about
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct ContentDisposition {
    pub name: Option<String>,
    pub filename: Option<String>,
}

impl ContentDisposition {
    /// Parses a header value such as `form-data; name="image"; filename="a;b.png"`.
    ///
    /// Semicolons inside quoted values do not split parameters.
    pub fn parse(value: &str) -> Self {
        let mut disposition = Self::default();

        for param in split_params(value).into_iter().skip(1) {
            let Some((key, raw)) = param.split_once('=') else {
                continue;
            };
            let parsed = unquote(raw.trim());
            match key.trim().to_ascii_lowercase().as_str() {
                "name" => disposition.name = Some(parsed),
                "filename" => disposition.filename = Some(parsed),
                _ => {}
            }
        }

        disposition
    }
}

/// Looks up one `key=value` parameter of a header value, quotes removed.
pub(super) fn param(value: &str, key: &str) -> Option<String> {
    split_params(value)
        .into_iter()
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case(key))
        .map(|(_, raw)| unquote(raw.trim()))
}

fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (index, ch) in value.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(value[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    params.push(value[start..].trim());
    params
}

fn unquote(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) else {
        return raw.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}
