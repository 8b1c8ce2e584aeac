//! YAML frontmatter splitting and lenient parsing.

use serde_yaml::Value;
use tracing::debug;

const DELIMITER: &str = "---";

/// Split `---\n<yaml>\n---\n<body>` into the raw YAML and the body.
///
/// Returns `(None, text)` when the text does not open with a delimiter line
/// or the block is never closed.
pub fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let src = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = src.split_inclusive('\n');

    let Some(first) = lines.next() else {
        return (None, text);
    };
    if first.trim_end() != DELIMITER || !first.ends_with('\n') {
        return (None, text);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            return (Some(&src[yaml_start..offset]), &src[offset + line.len()..]);
        }
        offset += line.len();
    }

    (None, text)
}

/// Parse the frontmatter mapping, if any, and return it with the body.
///
/// Malformed YAML or a non-mapping document counts as no frontmatter; the
/// body is still split off.
pub fn parse_frontmatter(text: &str) -> (Option<Value>, &str) {
    let (yaml, body) = split_frontmatter(text);
    let Some(yaml) = yaml else {
        return (None, body);
    };

    match serde_yaml::from_str::<Value>(yaml) {
        Ok(value @ Value::Mapping(_)) => (Some(value), body),
        Ok(Value::Null) => (None, body),
        Ok(_) => {
            debug!("frontmatter is not a mapping, ignoring");
            (None, body)
        }
        Err(e) => {
            debug!(error = %e, "malformed frontmatter, ignoring");
            (None, body)
        }
    }
}
