//! Field tag parsing.
//!
//! A tag is the metadata string attached to a field at declaration time:
//!
//! ```text
//! env:"HOME" map:"home_dir" doc:"say \"hi\""
//! ```
//!
//! Pairs are separated by spaces, keys are bare words, values are always
//! double-quoted and may contain backslash escapes.

use std::collections::BTreeMap;

/// Parsed key → value pairs of one field tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct TagMap {
    entries: BTreeMap<String, String>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, `None` when the tag does not mention it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Malformed tag. Every variant carries the literal tag text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("malformed tag: missing name: `{tag}`")]
    MissingName { tag: String },

    #[error("malformed tag: missing colon after `{name}`: `{tag}`")]
    MissingColon { tag: String, name: String },

    #[error("malformed tag: missing quotes for `{name}`: `{tag}`")]
    MissingQuotes { tag: String, name: String },

    #[error("malformed tag: missing end quote for `{name}`: `{tag}`")]
    MissingEndQuote { tag: String, name: String },

    #[error("malformed tag: invalid escape `\\{escape}` in `{name}`: `{tag}`")]
    InvalidEscape {
        tag: String,
        name: String,
        escape: char,
    },

    #[error("malformed tag: missing space after `{name}`: `{tag}`")]
    MissingSpace { tag: String, name: String },

    #[error("malformed tag: unexpected control character (code {code}): `{tag}`")]
    ControlCharacter { tag: String, code: u32 },
}

impl TagError {
    /// The literal tag text that failed to parse.
    pub fn tag(&self) -> &str {
        match self {
            TagError::MissingName { tag }
            | TagError::MissingColon { tag, .. }
            | TagError::MissingQuotes { tag, .. }
            | TagError::MissingEndQuote { tag, .. }
            | TagError::InvalidEscape { tag, .. }
            | TagError::MissingSpace { tag, .. }
            | TagError::ControlCharacter { tag, .. } => tag,
        }
    }

    fn control(tag: &str, c: char) -> Self {
        TagError::ControlCharacter {
            tag: tag.to_owned(),
            code: c as u32,
        }
    }
}

/// Parse a raw tag string into its key/value pairs.
///
/// When a key appears more than once the first occurrence wins.
pub fn parse_tags(raw: &str) -> Result<TagMap, TagError> {
    let mut tags = TagMap::new();
    let mut rest = raw;

    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return Ok(tags);
        }

        let key_len = rest
            .find(|c: char| c.is_whitespace() || c.is_control() || c == ':' || c == '"')
            .unwrap_or(rest.len());
        let (name, after_name) = rest.split_at(key_len);

        if name.is_empty() {
            return Err(match after_name.chars().next() {
                Some(c) if c.is_control() => TagError::control(raw, c),
                _ => TagError::MissingName {
                    tag: raw.to_owned(),
                },
            });
        }

        let after_colon = match after_name.chars().next() {
            Some(':') => &after_name[1..],
            Some(c) if c.is_control() => return Err(TagError::control(raw, c)),
            _ => {
                return Err(TagError::MissingColon {
                    tag: raw.to_owned(),
                    name: name.to_owned(),
                });
            }
        };

        let quoted = match after_colon.chars().next() {
            Some('"') => &after_colon[1..],
            Some(c) if c.is_control() => return Err(TagError::control(raw, c)),
            _ => {
                return Err(TagError::MissingQuotes {
                    tag: raw.to_owned(),
                    name: name.to_owned(),
                });
            }
        };

        let (value, consumed) = unquote(quoted, raw, name)?;
        tags.entries.entry(name.to_owned()).or_insert(value);

        rest = &quoted[consumed..];
        match rest.chars().next() {
            None | Some(' ') => {}
            Some(c) if c.is_control() => return Err(TagError::control(raw, c)),
            Some(_) => {
                return Err(TagError::MissingSpace {
                    tag: raw.to_owned(),
                    name: name.to_owned(),
                });
            }
        }
    }
}

/// Reads a quoted value whose opening quote was already consumed.
///
/// Returns the unescaped value and the number of bytes consumed, closing
/// quote included.
fn unquote(quoted: &str, raw: &str, name: &str) -> Result<(String, usize), TagError> {
    let missing_end = || TagError::MissingEndQuote {
        tag: raw.to_owned(),
        name: name.to_owned(),
    };

    let mut value = String::new();
    let mut chars = quoted.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, i + 1)),
            '\\' => match chars.next() {
                Some((_, '"')) => value.push('"'),
                Some((_, '\\')) => value.push('\\'),
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, escape)) => {
                    return Err(TagError::InvalidEscape {
                        tag: raw.to_owned(),
                        name: name.to_owned(),
                        escape,
                    });
                }
                None => return Err(missing_end()),
            },
            c if c.is_control() => return Err(TagError::control(raw, c)),
            c => value.push(c),
        }
    }

    Err(missing_end())
}
