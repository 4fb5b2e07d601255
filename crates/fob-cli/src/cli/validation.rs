/// Parse a `NAME=VALUE` header argument.
///
/// The name is trimmed and must be non-empty; the value may be empty or
/// contain further `=` characters. HTTP validity is checked later with the
/// rest of the configuration.
pub fn parse_header(s: &str) -> Result<(String, String), String> {
    let Some((name, value)) = s.split_once('=') else {
        return Err(format!("Expected NAME=VALUE, got '{}'", s));
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Header name cannot be empty: '{}'", s));
    }

    Ok((name.to_string(), value.trim().to_string()))
}
