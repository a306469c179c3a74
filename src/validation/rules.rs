//! Extraction rules over message text
//!
//! Each rule is a pure function from a string to a set, so rules can be
//! tested and replaced independently:
//!
//! - [`placeholders`] - `{name}`, `{{name}}`, ICU compound expressions as one
//!   unit, and `#` inside plural branches
//! - [`icu_keywords`] - `plural`, `select`, `selectordinal` of compound expressions
//! - [`tags`] - `<id>...</id>` pairs and self-closing `<id/>`
//! - [`technical_identifiers`] - snake_case, camelCase and dotted names

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// ICU control keywords that must survive translation
pub const ICU_KEYWORDS: [&str; 3] = ["plural", "select", "selectordinal"];

/// Placeholder tokens of a message
pub fn placeholders(text: &str) -> BTreeSet<String> {
    scan(text).placeholders
}

/// ICU control keywords found inside compound expressions
pub fn icu_keywords(text: &str) -> BTreeSet<String> {
    scan(text).keywords
}

#[derive(Debug, Default)]
struct Scan {
    placeholders: BTreeSet<String>,
    keywords: BTreeSet<String>,
}

fn scan(text: &str) -> Scan {
    let mut out = Scan::default();
    scan_into(text, false, &mut out);
    out
}

/// Walk `text`, classifying every balanced `{...}` group.
/// `number_sign` is set inside plural branches, where `#` stands for the count.
fn scan_into(text: &str, number_sign: bool, out: &mut Scan) {
    let mut pos = 0;
    while let Some(ch) = text[pos..].chars().next() {
        match ch {
            '{' => match matching_brace(&text[pos..]) {
                Some(end) => {
                    classify(&text[pos..=pos + end], number_sign, out);
                    pos += end + 1;
                }
                // Unterminated brace: nothing after it is structural
                None => break,
            },
            '#' if number_sign => {
                out.placeholders.insert("#".to_string());
                pos += 1;
            }
            _ => pos += ch.len_utf8(),
        }
    }
}

/// Byte offset of the brace that closes the one at offset 0
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn classify(expr: &str, number_sign: bool, out: &mut Scan) {
    let inner = &expr[1..expr.len() - 1];

    if inner.starts_with('{') && matching_brace(inner) == Some(inner.len() - 1) {
        let name = inner[1..inner.len() - 1].trim();
        if !name.is_empty() {
            out.placeholders.insert(format!("{{{{{name}}}}}"));
        }
        return;
    }

    let Some((name, rest)) = inner.split_once(',') else {
        let name = inner.trim();
        if !name.is_empty() {
            out.placeholders.insert(format!("{{{name}}}"));
        }
        return;
    };

    let name = name.trim();
    if !name.is_empty() {
        out.placeholders.insert(format!("{{{name}}}"));
    }

    let (kind, body) = match rest.find([',', '{']) {
        Some(i) if rest[i..].starts_with(',') => (rest[..i].trim(), &rest[i + 1..]),
        Some(i) => (rest[..i].trim(), &rest[i..]),
        None => (rest.trim(), ""),
    };

    if ICU_KEYWORDS.contains(&kind) {
        out.keywords.insert(kind.to_string());
    }

    let counts = matches!(kind, "plural" | "selectordinal");
    scan_branches(body, counts || number_sign, out);
}

/// Branch bodies of a compound expression: `selector {body} selector {body}`
fn scan_branches(body: &str, number_sign: bool, out: &mut Scan) {
    let mut pos = 0;
    while let Some(offset) = body[pos..].find('{') {
        let start = pos + offset;
        let Some(end) = matching_brace(&body[start..]) else {
            break;
        };
        scan_into(&body[start + 1..start + end], number_sign, out);
        pos = start + end + 1;
    }
}

/// Text with every balanced `{...}` group removed
pub fn strip_placeholders(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(offset) = text[pos..].find('{') {
        let start = pos + offset;
        out.push_str(&text[pos..start]);
        match matching_brace(&text[start..]) {
            Some(end) => {
                out.push(' ');
                pos = start + end + 1;
            }
            None => {
                pos = start;
                break;
            }
        }
    }
    out.push_str(&text[pos..]);
    out
}

/// Markup tags of a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagScan {
    /// Tag identifiers rendered as `<id>` for pairs and `<id/>` for self-closing
    pub identifiers: BTreeSet<String>,

    /// Whether every opening tag is closed in nesting order
    pub balanced: bool,
}

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| {
        Regex::new(r"<(/?)([A-Za-z0-9_-]+)\s*(/?)>").expect("Invalid regex pattern")
    })
}

/// Markup tags of a message
pub fn tags(text: &str) -> TagScan {
    let mut identifiers = BTreeSet::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut balanced = true;

    for caps in tag_regex().captures_iter(text) {
        let closing = !caps[1].is_empty();
        let self_closing = !caps[3].is_empty();
        let Some(id) = caps.get(2).map(|m| m.as_str()) else {
            continue;
        };

        if self_closing && !closing {
            identifiers.insert(format!("<{id}/>"));
        } else if closing {
            identifiers.insert(format!("<{id}>"));
            if stack.pop() != Some(id) {
                balanced = false;
            }
        } else {
            identifiers.insert(format!("<{id}>"));
            stack.push(id);
        }
    }

    TagScan {
        identifiers,
        balanced: balanced && stack.is_empty(),
    }
}

fn identifier_regexes() -> &'static [Regex; 3] {
    static IDENT_RE: OnceLock<[Regex; 3]> = OnceLock::new();
    IDENT_RE.get_or_init(|| {
        [
            // snake_case
            Regex::new(r"\b[A-Za-z][A-Za-z0-9]*(?:_[A-Za-z0-9]+)+\b").expect("Invalid regex pattern"),
            // camelCase
            Regex::new(r"\b[a-z][a-z0-9]*(?:[A-Z][a-z0-9]*)+\b").expect("Invalid regex pattern"),
            // dotted.names
            Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)+\b")
                .expect("Invalid regex pattern"),
        ]
    })
}

/// Technical identifiers outside placeholders
pub fn technical_identifiers(text: &str) -> BTreeSet<String> {
    let stripped = strip_placeholders(text);
    identifier_regexes()
        .iter()
        .flat_map(|re| re.find_iter(&stripped).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_placeholders() {
        let cases: [(&str, &[&str]); 6] = [
            ("Hello {name}", &["{name}"]),
            ("{count, plural, one {# item} other {# items}}", &["{count}", "#"]),
            ("Hi {user}, you have {count} items", &["{user}", "{count}"]),
            ("Hello {{user}}", &["{{user}}"]),
            ("Привет {имя}", &["{имя}"]),
            ("No placeholders here", &[]),
        ];

        for (text, expected) in cases {
            assert_eq!(placeholders(text), set(expected), "text: {text}");
        }
    }

    #[test]
    fn test_nested_placeholder_inside_branch() {
        let text = "{gender, select, male {He invited {guest}} other {They invited {guest}}}";
        assert_eq!(placeholders(text), set(&["{gender}", "{guest}"]));
    }

    #[test]
    fn test_number_sign_outside_plural_is_text() {
        assert_eq!(placeholders("Issue #42 for {name}"), set(&["{name}"]));
    }

    #[test]
    fn test_unterminated_brace_is_ignored() {
        assert_eq!(placeholders("Broken {name"), BTreeSet::new());
        assert_eq!(placeholders("{a} then {b"), set(&["{a}"]));
    }

    #[test]
    fn test_extract_icu_keywords() {
        assert_eq!(
            icu_keywords("{count, plural, one {# item} other {# items}}"),
            set(&["plural"])
        );
        assert_eq!(
            icu_keywords("{gender, select, male {he} female {she}}"),
            set(&["select"])
        );
        assert_eq!(
            icu_keywords("{pos, selectordinal, one {#st} other {#th}}"),
            set(&["selectordinal"])
        );
        assert_eq!(icu_keywords("Hello {name}"), BTreeSet::new());
        assert_eq!(icu_keywords("{count, один {# штука} другое {# штук}}"), BTreeSet::new());
    }

    #[test]
    fn test_tags() {
        let scan = tags("Read <0>the guide</0> or <link>docs</link><br/>");
        assert_eq!(scan.identifiers, set(&["<0>", "<link>", "<br/>"]));
        assert!(scan.balanced);

        assert!(!tags("<0>open only").balanced);
        assert!(!tags("<0><1>crossed</0></1>").balanced);
        assert!(tags("a < b > c").identifiers.is_empty());
    }

    #[test]
    fn test_technical_identifiers() {
        let found = technical_identifiers("Set user_id in config.yaml via apiKey for {user_name}");
        assert_eq!(found, set(&["user_id", "config.yaml", "apiKey"]));
    }

    #[test]
    fn test_strip_placeholders() {
        assert_eq!(strip_placeholders("a {b} c {d, plural, one {x}}"), "a   c  ");
    }
}
