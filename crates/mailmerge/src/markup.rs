//! Scanners for `{{token}}` markers and inline image references
//!
//! Both scanners are pure functions over a string and return structured
//! match lists; nothing here knows about rows or drafts.

use std::ops::Range;

/// A `{{name}}` marker found in a text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch {
    /// Byte range of the whole marker, braces included
    pub range: Range<usize>,
    /// The text between the braces
    pub name: String,
}

/// An `<img>` tag that embeds a `cid:` image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImageRef {
    /// Content id from `src="cid:..."`
    pub content_id: String,
    /// The `alt` text, which names the inline attachment
    pub alt: String,
}

/// Find every `{{name}}` marker, left to right, without overlaps
///
/// A name is one or more characters containing no `{` or `}`, so
/// `{{{a}}` matches `{{a}}` starting at the second brace.
pub fn find_tokens(text: &str) -> Vec<TokenMatch> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            let start = i + 2;
            let mut j = start;
            while j < bytes.len() && bytes[j] != b'{' && bytes[j] != b'}' {
                j += 1;
            }
            if j > start && j + 1 < bytes.len() && bytes[j] == b'}' && bytes[j + 1] == b'}' {
                tokens.push(TokenMatch {
                    range: i..j + 2,
                    name: text[start..j].to_string(),
                });
                i = j + 2;
                continue;
            }
        }
        i += 1;
    }

    tokens
}

/// Replace every token with the text returned by `value_for`
///
/// Replacement text is never scanned again.
pub fn replace_tokens<F>(text: &str, mut value_for: F) -> String
where
    F: FnMut(&TokenMatch) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for token in find_tokens(text) {
        out.push_str(&text[last..token.range.start]);
        out.push_str(&value_for(&token));
        last = token.range.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Find `<img>` tags whose `src` is a `cid:` reference and that carry `alt`
///
/// Attribute order does not matter; tag and attribute names are matched
/// case-insensitively.
pub fn find_inline_images(html: &str) -> Vec<InlineImageRef> {
    let mut images = Vec::new();
    let lower = html.to_ascii_lowercase();
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find("<img") {
        let tag_start = pos + offset + "<img".len();
        // `<imgx` is some other tag
        if !html[tag_start..]
            .chars()
            .next()
            .is_some_and(|c| c.is_whitespace() || c == '/' || c == '>')
        {
            pos = tag_start;
            continue;
        }
        let tag_end = html[tag_start..]
            .find('>')
            .map(|e| tag_start + e)
            .unwrap_or(html.len());

        let attributes = parse_attributes(&html[tag_start..tag_end]);
        let src = attribute(&attributes, "src");
        let alt = attribute(&attributes, "alt");
        if let (Some(src), Some(alt)) = (src, alt)
            && src.len() > 4
            && src.get(..4).is_some_and(|scheme| scheme.eq_ignore_ascii_case("cid:"))
        {
            images.push(InlineImageRef {
                content_id: src[4..].to_string(),
                alt: alt.to_string(),
            });
        }

        pos = tag_end;
    }

    images
}

fn attribute<'a>(attributes: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Parse `name="value"`, `name='value'`, `name=value` and bare `name`
/// attributes. Names are lowercased.
fn parse_attributes(input: &str) -> Vec<(String, String)> {
    let chars: Vec<char> = input.chars().collect();
    let mut attributes = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        while i < chars.len() && (chars[i].is_whitespace() || chars[i] == '/') {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let mut name = String::new();
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '=' && chars[i] != '/' {
            name.push(chars[i].to_ascii_lowercase());
            i += 1;
        }

        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if i < chars.len() && chars[i] == '=' {
            i += 1;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            if i < chars.len() && (chars[i] == '"' || chars[i] == '\'') {
                let quote = chars[i];
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    value.push(chars[i]);
                    i += 1;
                }
                // closing quote
                i += 1;
            } else {
                while i < chars.len() && !chars[i].is_whitespace() {
                    value.push(chars[i]);
                    i += 1;
                }
            }
        }

        if !name.is_empty() {
            attributes.push((name, value));
        } else {
            i += 1;
        }
    }

    attributes
}
