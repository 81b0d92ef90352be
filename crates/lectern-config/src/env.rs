use std::sync::OnceLock;

use regex::Regex;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `{{ env.VAR }}` with an optional `| default("fallback")` suffix
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*env\.([A-Za-z0-9_]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("must be valid regex")
    })
}

/// Expand `{{ env.VAR }}` placeholders in raw TOML text
///
/// A missing variable is an error unless the placeholder carries a
/// `| default("...")` clause. Comment lines pass through untouched so a
/// commented-out secret does not fail the load.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut output = String::with_capacity(input.len());

    for (i, line) in input.lines().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        if line.trim_start().starts_with('#') {
            output.push_str(line);
            continue;
        }

        let mut expansion_error = None;
        let expanded = placeholder_re().replace_all(line, |caps: &regex::Captures<'_>| {
            let var = &caps[1];
            match std::env::var(var) {
                Ok(value) => value,
                Err(_) => match caps.get(2) {
                    Some(default) => default.as_str().to_owned(),
                    None => {
                        expansion_error = Some(format!("environment variable not found: `{var}`"));
                        String::new()
                    }
                },
            }
        });

        if let Some(err) = expansion_error {
            return Err(err);
        }
        output.push_str(&expanded);
    }

    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}
