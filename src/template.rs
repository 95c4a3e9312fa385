//! Literal placeholder substitution for expression templates.

use crate::config::SelectConfig;
use crate::error::SelectError;

/// Replaces each placeholder marker in `expression` with the next unused argument,
/// left to right. Inserted arguments are not scanned again and nothing is escaped.
///
/// With no arguments the expression is returned as written, markers included.
/// Surplus arguments are ignored. Surplus markers are an error when
/// `config.strict_placeholders` is set and are kept verbatim otherwise.
pub fn substitute(expression: &str, args: &[&str], config: &SelectConfig) -> Result<String, SelectError> {
    let marker = config.placeholder.as_str();
    if args.is_empty() || marker.is_empty() {
        return Ok(expression.to_string());
    }

    let mut result = String::with_capacity(expression.len());
    let mut rest = expression;
    let mut used = 0;
    while let Some(found) = rest.find(marker) {
        result.push_str(&rest[..found]);
        match args.get(used) {
            Some(arg) => result.push_str(arg),
            None if config.strict_placeholders => {
                return Err(SelectError::MissingPlaceholderArgument {
                    expression: expression.to_string(),
                    position: used + 1,
                    supplied: args.len(),
                });
            }
            None => result.push_str(marker),
        }
        used += 1;
        rest = &rest[found + marker.len()..];
    }
    result.push_str(rest);

    if used < args.len() {
        log::debug!("{} unused placeholder argument(s) for '{}'", args.len() - used, expression);
    }
    Ok(result)
}
