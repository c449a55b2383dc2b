//! Lightweight mustache tag scanner.
//!
//! Not a parser: the template has already been validated by
//! [`handlebars::Template::compile`] when these helpers run. The scanner only
//! classifies `{{ ... }}` tags well enough to find partial references and to
//! enforce the syntax gates behind [`super::CompileFlags`].

/// A classified mustache tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Tag<'a> {
    Comment,
    /// `{{> name}}`, or `{{#> name}}` when `block` is set, with a static name.
    Partial { name: &'a str, block: bool },
    /// `{{#*inline "name"}}`.
    InlinePartial(&'a str),
    /// Any other expression, block, or a dynamic/`@partial-block` partial.
    Expression(&'a str),
}

/// Split `source` into tags, in order of appearance.
pub(crate) fn tags(source: &str) -> Vec<Tag<'_>> {
    let mut out = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        if start > 0 && rest.as_bytes()[start - 1] == b'\\' {
            rest = &rest[start + 2..];
            continue;
        }

        let after = &rest[start + 2..];
        let trimmed = after.trim_start_matches('~');
        let (body, consumed) = if trimmed.starts_with("!--") {
            match after.find("--}}") {
                Some(end) => (&after[..end], end + 4),
                None => break,
            }
        } else {
            match after.find("}}") {
                Some(end) => {
                    let mut consumed = end + 2;
                    if after.starts_with('{') && after[consumed..].starts_with('}') {
                        consumed += 1;
                    }
                    (&after[..end], consumed)
                }
                None => break,
            }
        };

        out.push(classify(trim_body(body)));
        rest = &after[consumed..];
    }

    out
}

fn trim_body(body: &str) -> &str {
    body.trim_start_matches(|c: char| c == '{' || c == '~' || c.is_whitespace())
        .trim_end_matches(|c: char| c == '}' || c == '~' || c.is_whitespace())
}

fn classify(body: &str) -> Tag<'_> {
    if body.starts_with('!') {
        return Tag::Comment;
    }
    let partial = body
        .strip_prefix("#>")
        .map(|rest| (rest, true))
        .or_else(|| body.strip_prefix('>').map(|rest| (rest, false)));
    if let Some((rest, block)) = partial {
        return match partial_name(rest) {
            Some(name) => Tag::Partial { name, block },
            None => Tag::Expression(body),
        };
    }
    if let Some(rest) = body.strip_prefix("#*inline") {
        if let Some(name) = partial_name(rest) {
            return Tag::InlinePartial(name);
        }
    }
    Tag::Expression(body)
}

/// Static partial name at the start of `rest`; `None` for dynamic partials
/// (`(lookup ...)`) and `@`-names such as `@partial-block`, quoted or not.
fn partial_name(rest: &str) -> Option<&str> {
    let rest = rest.trim_start();
    let name = match rest.chars().next()? {
        '(' | '@' => return None,
        quote @ ('"' | '\'') => {
            let inner = &rest[1..];
            &inner[..inner.find(quote)?]
        }
        _ => rest.split_whitespace().next()?,
    };
    (!name.is_empty() && !name.starts_with('@')).then_some(name)
}

/// `key=value` hash argument outside quotes and segment literals.
pub(crate) fn has_hash_argument(body: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut bracket = false;
    for c in body.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' if !bracket => quote = Some(c),
                '[' => bracket = true,
                ']' => bracket = false,
                '=' if !bracket => return true,
                _ => {}
            },
        }
    }
    false
}

/// `[segment literal]` outside quotes.
pub(crate) fn has_segment_literal(body: &str) -> bool {
    let mut quote: Option<char> = None;
    for c in body.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '[' => return true,
                _ => {}
            },
        }
    }
    false
}

/// Quoted string argument outside segment literals.
pub(crate) fn has_string_literal(body: &str) -> bool {
    let mut bracket = false;
    for c in body.chars() {
        match c {
            '[' => bracket = true,
            ']' => bracket = false,
            '"' | '\'' if !bracket => return true,
            _ => {}
        }
    }
    false
}
