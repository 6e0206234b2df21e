use std::collections::BTreeMap;

use super::section::{Entry, Section, DEFAULT_BPM};
use crate::error::{ParseError, ParseErrorKind};
use crate::Mode;

/// A single meaningful script line.
#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
    Section(String),
    Bpm(f64),
    Repeat { count: u32, length: f64 },
    Time(f64),
    Entry(Entry),
    Unknown(String),
}

impl Directive {
    /// Parse one comment-free, trimmed, non-empty line.
    pub fn parse(line: &str) -> Result<Self, ParseErrorKind> {
        if let Some(name) = strip_prefix_ignore_case(line, "section:") {
            let name = name.trim();
            if name.is_empty() {
                return Err(ParseErrorKind::EmptySectionName);
            }
            return Ok(Directive::Section(name.to_string()));
        }

        if let Some(value) = strip_prefix_ignore_case(line, "bpm:") {
            let bpm = parse_float("tempo", value)?;
            if bpm <= 0.0 {
                return Err(ParseErrorKind::InvalidNumber {
                    field: "tempo",
                    value: value.trim().to_string(),
                });
            }
            return Ok(Directive::Bpm(bpm));
        }

        if let Some(value) = strip_prefix_ignore_case(line, "repeat:") {
            let (count, length) = value
                .split_once(['b', 'B'])
                .ok_or(ParseErrorKind::MalformedRepeat)?;
            let count = count
                .trim()
                .parse::<u32>()
                .map_err(|_| ParseErrorKind::InvalidNumber {
                    field: "repeat count",
                    value: count.trim().to_string(),
                })?;
            let length = parse_float("repeat length", length)?;
            return Ok(Directive::Repeat { count, length });
        }

        if let Some(value) = strip_prefix_ignore_case(line, "time:") {
            return Ok(Directive::Time(parse_float("time", value)?));
        }

        if line.starts_with('[') {
            return parse_entry(line).map(Directive::Entry);
        }

        Ok(Directive::Unknown(line.to_string()))
    }

    fn name(&self) -> &'static str {
        match self {
            Directive::Section(_) => "section",
            Directive::Bpm(_) => "bpm",
            Directive::Repeat { .. } => "repeat",
            Directive::Time(_) => "time",
            Directive::Entry(_) => "entry",
            Directive::Unknown(_) => "unknown",
        }
    }
}

/// Accumulates the sections of one show across all of its script files.
#[derive(Debug, Default)]
pub struct ScriptParser {
    sections: BTreeMap<String, Section>,
}

impl ScriptParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one script file. `file` is only used to label errors.
    pub fn parse_file(&mut self, file: &str, text: &str) -> Result<(), ParseError> {
        // Tempo carries from section to section within a file, not across files.
        let mut bpm = DEFAULT_BPM;
        let mut current: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = strip_comment(raw);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let error = |kind: ParseErrorKind| ParseError {
                file: file.to_string(),
                line: index + 1,
                kind,
            };

            let directive = Directive::parse(line).map_err(error)?;

            if let Directive::Section(name) = directive {
                self.sections
                    .entry(name.clone())
                    .or_insert_with(|| Section::new(name.clone(), bpm));
                current = Some(name);
                continue;
            }

            let Some(section) = current.as_ref().and_then(|name| self.sections.get_mut(name))
            else {
                match directive {
                    Directive::Unknown(_) => continue,
                    other => return Err(error(ParseErrorKind::OutsideSection(other.name()))),
                }
            };

            match directive {
                Directive::Bpm(value) => {
                    bpm = value;
                    section.bpm = value;
                }
                Directive::Repeat { count, length } => {
                    section.repeat = count;
                    section.length = length;
                }
                Directive::Time(time) => section.times.push(time),
                Directive::Entry(entry) => section.entries.push(entry),
                Directive::Unknown(text) => {
                    return Err(error(ParseErrorKind::UnknownDirective(text)))
                }
                Directive::Section(_) => unreachable!("handled above"),
            }
        }

        Ok(())
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Sections in name order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    pub fn into_sections(self) -> Vec<Section> {
        self.sections.into_values().collect()
    }
}

/// Drop everything after the first unescaped `#`; `\#` stands for a literal `#`.
fn strip_comment(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'#') => {
                out.push('#');
                chars.next();
            }
            '#' => break,
            _ => out.push(c),
        }
    }
    out
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &line[prefix.len()..])
}

fn parse_float(field: &'static str, value: &str) -> Result<f64, ParseErrorKind> {
    let value = value.trim();
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseErrorKind::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn parse_entry(line: &str) -> Result<Entry, ParseErrorKind> {
    let inner = line
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or(ParseErrorKind::UnclosedEntry)?;
    let fields: Vec<&str> = inner.split(',').map(str::trim).collect();

    let (channel, mode, start, duration) = match fields.as_slice() {
        [channel, start, duration] => (*channel, None, *start, *duration),
        [channel, mode, start, duration] => (*channel, Some(*mode), *start, *duration),
        other => return Err(ParseErrorKind::Arity(other.len())),
    };

    let channel = channel
        .parse::<i64>()
        .map_err(|_| ParseErrorKind::InvalidNumber {
            field: "channel",
            value: channel.to_string(),
        })?;

    let mode = match mode {
        None => Mode::On,
        Some(mode) => {
            let digit = mode
                .parse::<u8>()
                .map_err(|_| ParseErrorKind::InvalidNumber {
                    field: "mode",
                    value: mode.to_string(),
                })?;
            Mode::from_digit(digit).ok_or(ParseErrorKind::InvalidMode(digit))?
        }
    };

    let start = parse_float("start", start)?;
    let duration = parse_float("duration", duration)?;
    if duration < 0.0 {
        return Err(ParseErrorKind::InvalidNumber {
            field: "duration",
            value: duration.to_string(),
        });
    }

    Ok(Entry::new(channel, mode, start, duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ScriptParser, ParseError> {
        let mut parser = ScriptParser::new();
        parser.parse_file("show.txt", text)?;
        Ok(parser)
    }

    #[test]
    fn test_directives_are_case_insensitive() {
        let parser = parse(
            "SECTION: Intro\nBpm: 120\nRePeat: 2 b 4\nTIME: 1.5\n[1, 2, 0, 1]\n",
        )
        .unwrap();

        let intro = parser.section("Intro").unwrap();
        assert_eq!(intro.bpm, 120.0);
        assert_eq!(intro.repeat, 2);
        assert_eq!(intro.length, 4.0);
        assert_eq!(intro.times, vec![1.5]);
        assert_eq!(intro.entries, vec![Entry::new(1, Mode::Random, 0.0, 1.0)]);
    }

    #[test]
    fn test_three_field_entry_defaults_to_on() {
        let parser = parse("section: A\n[3, 0.5, 2]").unwrap();
        assert_eq!(
            parser.section("A").unwrap().entries,
            vec![Entry::new(3, Mode::On, 0.5, 2.0)]
        );
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let parser = parse(
            "# header comment\n\n  section: Hash \\# Tag  # trailing\n   \ntime: 2 # seconds\n",
        )
        .unwrap();
        let section = parser.section("Hash # Tag").unwrap();
        assert_eq!(section.times, vec![2.0]);
    }

    #[test]
    fn test_new_section_inherits_file_tempo() {
        let parser = parse("section: A\nbpm: 90\nsection: B\n").unwrap();
        assert_eq!(parser.section("A").unwrap().bpm, 90.0);
        assert_eq!(parser.section("B").unwrap().bpm, 90.0);
    }

    #[test]
    fn test_tempo_resets_per_file() {
        let mut parser = ScriptParser::new();
        parser.parse_file("a.txt", "section: A\nbpm: 140").unwrap();
        parser.parse_file("b.txt", "section: B").unwrap();
        assert_eq!(parser.section("B").unwrap().bpm, DEFAULT_BPM);
    }

    #[test]
    fn test_sections_accumulate_across_files() {
        let mut parser = ScriptParser::new();
        parser
            .parse_file("a.txt", "section: Chorus\n[1, 0, 1]\ntime: 10")
            .unwrap();
        parser
            .parse_file("b.txt", "section: Chorus\n[2, 0, 1]\ntime: 20")
            .unwrap();

        let chorus = parser.section("Chorus").unwrap();
        assert_eq!(chorus.entries.len(), 2);
        assert_eq!(chorus.times, vec![10.0, 20.0]);
        // Reselecting an existing section keeps its tempo.
        assert_eq!(chorus.bpm, DEFAULT_BPM);
    }

    #[test]
    fn test_section_names_are_case_sensitive_and_sorted() {
        let parser = parse("section: beta\nsection: Beta\nsection: alpha").unwrap();
        let names: Vec<&str> = parser.sections().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Beta", "alpha", "beta"]);
    }

    #[test]
    fn test_unknown_lines_outside_section_are_ignored() {
        let parser = parse("Title: Carol of the Bells\nsection: A").unwrap();
        assert_eq!(parser.sections().count(), 1);
    }

    #[test]
    fn test_unknown_line_inside_section_fails() {
        let err = parse("section: A\nflash everything").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(
            err.kind,
            ParseErrorKind::UnknownDirective("flash everything".to_string())
        );
    }

    #[test]
    fn test_section_directives_require_section() {
        for line in ["[1, 0, 1]", "time: 3", "bpm: 100", "repeat: 2 b 4"] {
            let err = parse(line).unwrap_err();
            assert!(
                matches!(err.kind, ParseErrorKind::OutsideSection(_)),
                "{line} should fail outside a section"
            );
        }
    }

    #[test]
    fn test_malformed_entries() {
        let err = parse("section: A\n[1, 2]").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Arity(2));

        let err = parse("section: A\n[1, 2, 3, 4, 5]").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Arity(5));

        let err = parse("section: A\n[1, 7, 0, 1]").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidMode(7));

        let err = parse("section: A\n[one, 0, 1]").unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::InvalidNumber {
                field: "channel",
                ..
            }
        ));

        let err = parse("section: A\n[1, 0, 1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnclosedEntry);
    }

    #[test]
    fn test_malformed_numbers() {
        let err = parse("section: A\ntime: soon").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { field: "time", .. }));

        let err = parse("section: A\nrepeat: 4").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MalformedRepeat);

        let err = parse("section: A\nrepeat: 2.5 b 4").unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::InvalidNumber {
                field: "repeat count",
                ..
            }
        ));

        let err = parse("section: A\nbpm: 0").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { field: "tempo", .. }));
    }

    #[test]
    fn test_error_reports_file_and_line() {
        let mut parser = ScriptParser::new();
        let err = parser
            .parse_file("chorus.txt", "section: A\n\n# note\ntime: x")
            .unwrap_err();
        assert_eq!(err.to_string(), "chorus.txt:4: invalid time 'x'");
    }
}
