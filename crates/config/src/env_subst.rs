//! `${NAME}` / `${NAME:-fallback}` expansion for raw config files.
//!
//! Runs on the file text before parsing so secrets such as the NLU access
//! token can stay out of the file itself.

/// Result of expanding one config file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Expanded {
    pub text: String,
    /// Placeholders with neither a value nor a fallback. They are kept
    /// verbatim in `text`.
    pub unresolved: Vec<String>,
}

/// Expand placeholders from the process environment.
pub fn substitute_env(input: &str) -> Expanded {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> Expanded {
    let mut out = Expanded {
        text: String::with_capacity(input.len()),
        unresolved: Vec::new(),
    };
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.text.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // unterminated
            out.text.push_str(&rest[start..]);
            return out;
        };
        let inner = &after[..end];
        let (name, fallback) = match inner.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (inner, None),
        };

        match (name.is_empty(), lookup(name), fallback) {
            (true, ..) => out.text.push_str(&rest[start..start + 2 + end + 1]),
            (false, Some(value), _) if !value.is_empty() || fallback.is_none() => {
                out.text.push_str(&value);
            },
            (false, _, Some(fallback)) => out.text.push_str(fallback),
            (false, ..) => {
                out.text.push_str(&rest[start..start + 2 + end + 1]);
                out.unresolved.push(name.to_string());
            },
        }
        rest = &after[end + 1..];
    }

    out.text.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> Option<String> {
        match name {
            "NLU_TOKEN" => Some("s3cret".into()),
            "EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn expands_known_names() {
        let out = expand_with("access_token = \"${NLU_TOKEN}\"", env);
        assert_eq!(out.text, "access_token = \"s3cret\"");
        assert!(out.unresolved.is_empty());
    }

    #[test]
    fn fallback_covers_missing_and_empty() {
        assert_eq!(
            expand_with("${NLU_URL:-http://localhost:5005}", env).text,
            "http://localhost:5005"
        );
        assert_eq!(expand_with("${EMPTY:-x}", env).text, "x");
        assert_eq!(expand_with("[${EMPTY}]", env).text, "[]");
    }

    #[test]
    fn unknown_names_are_kept_and_reported() {
        let out = expand_with("a ${NOPE} b ${NLU_TOKEN}", env);
        assert_eq!(out.text, "a ${NOPE} b s3cret");
        assert_eq!(out.unresolved, ["NOPE"]);
    }

    #[test]
    fn malformed_placeholders_pass_through() {
        assert_eq!(expand_with("cost: $5 ${} ${OPEN", env).text, "cost: $5 ${} ${OPEN");
        assert!(expand_with("${}", env).unresolved.is_empty());
    }
}
