//! Named output templates
//!
//! An output template is literal text with `{property-name}` placeholders,
//! e.g. `{volume} {media-title}`. It is parsed once at load time into
//! segments so composing a status line is a single pass.

/// A piece of a parsed output template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text emitted verbatim
    Literal(String),
    /// Placeholder replaced by the named property's formatted value
    Property(String),
}

/// Parsed output template
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl OutputTemplate {
    /// Parse a template string.
    ///
    /// Parsing never fails: a `{` without a matching `}` (or with nothing
    /// between the braces) is kept as literal text.
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            match after.find(['{', '}']) {
                Some(close) if close > 0 && after[close..].starts_with('}') => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Property(after[..close].to_string()));
                    rest = &after[close + 1..];
                }
                _ => {
                    literal.push('{');
                    rest = after;
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            source: source.to_string(),
            segments,
        }
    }

    /// The template text as written in the configuration
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of all properties referenced by the template, in order
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Property(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_template() {
        let template = OutputTemplate::parse("{volume} {media-title} | {metadata/by-key/album}");
        assert_eq!(
            template.segments(),
            &[
                Segment::Property("volume".to_string()),
                Segment::Literal(" ".to_string()),
                Segment::Property("media-title".to_string()),
                Segment::Literal(" | ".to_string()),
                Segment::Property("metadata/by-key/album".to_string()),
            ]
        );
    }

    #[test]
    fn test_unmatched_braces_are_literal() {
        let template = OutputTemplate::parse("a { b {} c {title");
        assert_eq!(
            template.segments(),
            &[Segment::Literal("a { b {} c {title".to_string())]
        );
        assert_eq!(template.placeholders().count(), 0);
    }

    #[test]
    fn test_nested_open_brace_restarts_placeholder() {
        let template = OutputTemplate::parse("{{title}");
        assert_eq!(
            template.segments(),
            &[
                Segment::Literal("{".to_string()),
                Segment::Property("title".to_string()),
            ]
        );
    }

    #[test]
    fn test_placeholders_in_order() {
        let template = OutputTemplate::parse("{b}{a}x{b}");
        let names: Vec<&str> = template.placeholders().collect();
        assert_eq!(names, vec!["b", "a", "b"]);
        assert_eq!(template.as_str(), "{b}{a}x{b}");
    }
}
