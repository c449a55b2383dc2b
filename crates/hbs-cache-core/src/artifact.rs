//! On-disk artifact layout.
//!
//! ```text
//! // emails/welcome.hbs
//! {"format":2,"flags":63,"template":"...","partials":{},"checksum":"..."}
//! ```
//!
//! The first line names the originating template so a cache directory can be
//! inspected by hand; everything after it is the compiled code, stored verbatim.

const HEADER_PREFIX: &str = "// ";

/// A decoded artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<'a> {
    pub name: &'a str,
    pub code: &'a str,
}

/// Prefix compiled code with the template name comment.
pub fn encode(name: &str, code: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    format!("{HEADER_PREFIX}{name}\n{code}")
}

/// Split an artifact back into template name and compiled code.
pub fn decode(text: &str) -> std::result::Result<Decoded<'_>, String> {
    let (header, code) = text
        .split_once('\n')
        .ok_or_else(|| "artifact has no header line".to_string())?;
    let name = header
        .strip_prefix(HEADER_PREFIX)
        .ok_or_else(|| format!("unexpected artifact header: {header:?}"))?;
    if name.is_empty() {
        return Err("artifact header names no template".to_string());
    }
    Ok(Decoded { name, code })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_template() {
        let text = encode("emails/welcome.hbs", "{}");
        assert!(text.starts_with("// emails/welcome.hbs\n"));
        let decoded = decode(&text).unwrap();
        assert_eq!(decoded.name, "emails/welcome.hbs");
        assert_eq!(decoded.code, "{}");
    }

    #[test]
    fn test_multiline_code_kept_verbatim() {
        let code = "{\n  \"a\": 1\n}\n";
        let text = encode("x", code);
        assert_eq!(decode(&text).unwrap().code, code);
    }

    #[test]
    fn test_newline_in_name_cannot_break_header() {
        let text = encode("evil\nname", "{}");
        let decoded = decode(&text).unwrap();
        assert_eq!(decoded.name, "evil name");
        assert_eq!(decoded.code, "{}");
    }

    #[test]
    fn test_decode_rejects_missing_header() {
        assert!(decode("").is_err());
        assert!(decode("{\"format\":1}").is_err());
        assert!(decode("# x\n{}").is_err());
        assert!(decode("// \n{}").is_err());
    }
}
