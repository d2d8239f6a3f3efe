/// Theme tokens: literal placeholder text in a stylesheet -> replacement value,
/// applied in the order they were inserted. The same token may appear twice.
///
/// Placeholders match ASCII case-insensitively (`#FB8521` matches `#fb8521`).
/// Values are CSS-escaped before insertion, see [`escape_css_value`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeTokens(Vec<(String, String)>);

impl ThemeTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token. Empty tokens are ignored.
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        let token = token.into();
        if !token.is_empty() {
            self.0.push((token, value.into()));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }
}

/// Result of applying theme tokens to a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Themed {
    pub text: String,
    /// Number of replacements made.
    pub replaced: usize,
    /// Tokens that never matched.
    pub unmatched: Vec<String>,
}

/// Replace every occurrence of each token, in insertion order. A later token
/// sees the output of earlier ones.
///
/// - Matching is ASCII case-insensitive.
/// - Replacement values are escaped with [`escape_css_value`].
/// - Text produced by one token is not rescanned for that same token.
pub fn apply_theme(template: &str, tokens: &ThemeTokens) -> Themed {
    let mut text = template.to_string();
    let mut replaced = 0;
    let mut unmatched = Vec::new();

    for (token, value) in tokens.iter() {
        let (next, count) = replace_ignore_ascii_case(&text, token, &escape_css_value(value));
        if count == 0 {
            unmatched.push(token.to_string());
        }
        replaced += count;
        text = next;
    }

    Themed {
        text,
        replaced,
        unmatched,
    }
}

/// Escape a value for use inside a CSS declaration.
///
/// Characters outside `[A-Za-z0-9#%.,()+/_\- ]` (and non-ASCII) are written as
/// CSS hex escapes (`\7b ` for `{`), so a value can never close a declaration,
/// a block or the surrounding `<style>` element.
pub fn escape_css_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || "#%.,()+/_- ".contains(c) {
            out.push(c);
        } else {
            out.push_str(&format!("\\{:x} ", c as u32));
        }
    }
    out
}

fn replace_ignore_ascii_case(haystack: &str, needle: &str, with: &str) -> (String, usize) {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    let mut out = String::with_capacity(haystack.len());
    let mut count = 0;
    let mut idx = 0;

    while let Some(start) = find_subslice_ignore_case(hay, pat, idx) {
        out.push_str(&haystack[idx..start]);
        out.push_str(with);
        idx = start + pat.len();
        count += 1;
    }
    out.push_str(&haystack[idx..]);
    (out, count)
}

/// Find the first ASCII case-insensitive occurrence of `needle` in `haystack`
/// starting at `from`. Only returns positions on char boundaries.
fn find_subslice_ignore_case(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() || needle.len() > haystack.len() {
        return None;
    }
    let end = haystack.len() - needle.len() + 1;
    (from..end).find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(pairs: &[(&str, &str)]) -> ThemeTokens {
        let mut t = ThemeTokens::new();
        for (k, v) in pairs {
            t.insert(*k, *v);
        }
        t
    }

    #[test]
    fn replaces_case_insensitively() {
        let css = "a { color: #FB8521; } b { border-color: #fb8521 }";
        let out = apply_theme(css, &tokens(&[("#fb8521", "#00bcd4")]));
        assert_eq!(out.text, "a { color: #00bcd4; } b { border-color: #00bcd4 }");
        assert_eq!(out.replaced, 2);
        assert!(out.unmatched.is_empty());
    }

    #[test]
    fn reports_unmatched_tokens() {
        let out = apply_theme("body {}", &tokens(&[("#fb8521", "#fff")]));
        assert_eq!(out.text, "body {}");
        assert_eq!(out.unmatched, vec!["#fb8521".to_string()]);
    }

    #[test]
    fn escapes_values_that_could_break_out() {
        assert_eq!(escape_css_value("#00bcd4"), "#00bcd4");
        assert_eq!(escape_css_value("rgba(0, 0, 0, .5)"), "rgba(0, 0, 0, .5)");
        assert_eq!(escape_css_value("red;}"), "red\\3b \\7d ");
        let out = apply_theme("a{color:#fb8521}", &tokens(&[("#fb8521", "</style>")]));
        assert!(!out.text.contains("</style>"));
    }

    #[test]
    fn slash_and_underscore_pass_through() {
        assert_eq!(escape_css_value("rgb(0 0 0 / 50%)"), "rgb(0 0 0 / 50%)");
        assert_eq!(escape_css_value("var(--accent_dark)"), "var(--accent_dark)");
        let out = apply_theme("a{color:#fb8521}", &tokens(&[("#fb8521", "hsl(20 90% 55% / .8)")]));
        assert_eq!(out.text, "a{color:hsl(20 90% 55% / .8)}");
    }

    #[test]
    fn tokens_apply_in_insertion_order() {
        let out = apply_theme("x{color:bb}", &tokens(&[("bb", "aa"), ("aa", "cc")]));
        assert_eq!(out.text, "x{color:cc}");
        assert_eq!(out.replaced, 2);

        let out = apply_theme("x{color:bb}", &tokens(&[("aa", "cc"), ("bb", "aa")]));
        assert_eq!(out.text, "x{color:aa}");
        assert_eq!(out.unmatched, vec!["aa".to_string()]);
    }

    #[test]
    fn duplicate_tokens_are_kept() {
        let t = tokens(&[("#fb8521", "#111"), ("#fb8521", "#222")]);
        assert_eq!(t.len(), 2);
        let out = apply_theme("a{color:#fb8521}", &t);
        assert_eq!(out.text, "a{color:#111}");
        assert_eq!(out.unmatched, vec!["#fb8521".to_string()]);
    }

    #[test]
    fn multibyte_text_is_preserved() {
        let out = apply_theme("/* ünïcode */ a { color: #fb8521 }", &tokens(&[("#fb8521", "red")]));
        assert_eq!(out.text, "/* ünïcode */ a { color: red }");
    }

    #[test]
    fn empty_tokens_are_ignored() {
        let t = tokens(&[("", "x")]);
        assert!(t.is_empty());
    }
}
