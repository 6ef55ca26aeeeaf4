//! `{{NAME}}` placeholder substitution.
//!
//! Runs once at load time over the raw configuration text, before any of
//! the reference syntax is parsed — a substituted value may itself encode
//! a reference. A missing variable is a hard error, never a silent
//! empty-string substitution, so a blank parameter value cannot reach the
//! backend by accident.

use crate::domain::error::DomainError;

/// Replace every `{{NAME}}` in `input` with `lookup(NAME)`.
///
/// Whitespace inside the braces is trimmed (`{{ NAME }}` works).
/// An unterminated `{{` is passed through verbatim.
pub fn substitute<F>(input: &str, lookup: F) -> Result<String, DomainError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        return Err(DomainError::UnresolvedVariable {
                            name: name.to_owned(),
                        });
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                // no closing braces; keep the tail as-is
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Substitute against the process environment, the production provider.
pub fn substitute_env(input: &str) -> Result<String, DomainError> {
    substitute(input, |name| std::env::var(name).ok())
}
