//! Line-oriented text form of a compiled show.
//!
//! Each instruction is a timing line followed by a state line:
//!
//! ```text
//! a0
//! sIntro
//! 3,0,0
//! w1.0
//! 1,0,0
//! ```
//!
//! `w<seconds>` waits relative to the previous instruction, `a<seconds>` aligns
//! to an absolute show time and is followed by one `s<label>` line per section
//! starting there. The state line holds one digit per channel.

use std::fmt::Write;

use super::instruction::{Instruction, Timing};
use crate::error::CodecError;
use crate::Mode;

/// Shortest exact decimal form of `seconds`, always with a decimal point,
/// except that zero is written `0` so an empty wait reads `w0`.
pub fn format_seconds(seconds: f64) -> String {
    if seconds == 0.0 {
        "0".to_string()
    } else {
        format!("{:?}", seconds)
    }
}

pub fn encode(instructions: &[Instruction]) -> String {
    let mut out = String::new();
    for instruction in instructions {
        match &instruction.timing {
            Timing::Wait(delta) => {
                let _ = writeln!(out, "w{}", format_seconds(*delta));
            }
            Timing::Align { at, labels } => {
                let _ = writeln!(out, "a{}", format_seconds(*at));
                for label in labels {
                    let _ = writeln!(out, "s{}", label);
                }
            }
        }

        let states: Vec<String> = instruction
            .states
            .iter()
            .map(|mode| mode.to_string())
            .collect();
        let _ = writeln!(out, "{}", states.join(","));
    }
    out
}

/// Parse compiled text back into instructions carrying `channel_count` states each.
///
/// Section labels may sit between an alignment and its states, or directly
/// before the alignment they belong to.
pub fn decode(text: &str, channel_count: usize) -> Result<Vec<Instruction>, CodecError> {
    let mut instructions = Vec::new();
    let mut pending: Option<(usize, Timing)> = None;
    let mut early_labels: Vec<String> = Vec::new();
    let mut early_label_line = 0;

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let line = raw.trim();
        let Some(tag) = line.chars().next() else {
            continue;
        };

        match tag {
            'w' | 'a' => {
                if let Some((line, _)) = pending {
                    return Err(CodecError::MissingStates { line });
                }
                let seconds = parse_seconds(number, &line[1..])?;
                let timing = if tag == 'a' {
                    Timing::Align {
                        at: seconds,
                        labels: std::mem::take(&mut early_labels),
                    }
                } else if early_labels.is_empty() {
                    Timing::Wait(seconds)
                } else {
                    return Err(CodecError::LabelWithoutAlignment {
                        line: early_label_line,
                    });
                };
                pending = Some((number, timing));
            }
            's' => {
                let label = line[1..].trim_start().to_string();
                match &mut pending {
                    Some((_, Timing::Align { labels, .. })) => labels.push(label),
                    Some((_, Timing::Wait(_))) => {
                        return Err(CodecError::LabelWithoutAlignment { line: number })
                    }
                    None => {
                        if early_labels.is_empty() {
                            early_label_line = number;
                        }
                        early_labels.push(label);
                    }
                }
            }
            '0'..='9' => {
                let Some((_, timing)) = pending.take() else {
                    return Err(CodecError::StatesWithoutTiming { line: number });
                };
                let states = parse_states(number, line, channel_count)?;
                instructions.push(Instruction { timing, states });
            }
            _ => {
                return Err(CodecError::UnknownLine {
                    line: number,
                    text: line.to_string(),
                })
            }
        }
    }

    if let Some((line, _)) = pending {
        return Err(CodecError::MissingStates { line });
    }
    if !early_labels.is_empty() {
        return Err(CodecError::LabelWithoutAlignment {
            line: early_label_line,
        });
    }

    Ok(instructions)
}

fn parse_seconds(line: usize, text: &str) -> Result<f64, CodecError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite())
        .ok_or_else(|| CodecError::InvalidSeconds {
            line,
            text: text.to_string(),
        })
}

fn parse_states(line: usize, text: &str, channel_count: usize) -> Result<Vec<Mode>, CodecError> {
    let states = text
        .split(',')
        .map(|value| {
            let value = value.trim();
            value
                .parse::<u8>()
                .ok()
                .and_then(Mode::from_digit)
                .ok_or_else(|| CodecError::InvalidState {
                    line,
                    value: value.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if states.len() != channel_count {
        return Err(CodecError::ChannelCount {
            line,
            expected: channel_count,
            found: states.len(),
        });
    }
    Ok(states)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intro_show() -> Vec<Instruction> {
        vec![
            Instruction::align(
                0.0,
                vec!["Intro".to_string()],
                vec![Mode::On, Mode::Hold, Mode::Hold],
            ),
            Instruction::wait(1.0, vec![Mode::Off, Mode::Hold, Mode::Hold]),
        ]
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "0");
        assert_eq!(format_seconds(-0.0), "0");
        assert_eq!(format_seconds(1.0), "1.0");
        assert_eq!(format_seconds(0.25), "0.25");
        assert_eq!(format_seconds(12.3456), "12.3456");
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(&intro_show()), "a0\nsIntro\n3,0,0\nw1.0\n1,0,0\n");
    }

    #[test]
    fn test_decode() {
        let decoded = decode("a0\nsIntro\n3,0,0\nw1.0\n1,0,0\n", 3).unwrap();
        assert_eq!(decoded, intro_show());
    }

    #[test]
    fn test_round_trip_preserves_text() {
        let text = "w0\n0,0\na2.5\nsBass\nsLead\n3,2\nw0.1\n1,2\nw0.30000000000000004\n1,1\n";
        assert_eq!(encode(&decode(text, 2).unwrap()), text);
    }

    #[test]
    fn test_multiple_labels() {
        let decoded = decode("a4.0\nsVerse\nsBells\n3\n", 1).unwrap();
        assert_eq!(decoded[0].label_text().as_deref(), Some("Verse\nBells"));
    }

    #[test]
    fn test_labels_before_alignment_attach_to_it() {
        let decoded = decode("sChorus\na8.0\n2\n", 1).unwrap();
        assert_eq!(decoded[0].labels(), &["Chorus".to_string()]);
    }

    #[test]
    fn test_spaced_labels_and_crlf() {
        let decoded = decode("a0\r\ns Intro\r\n3,1\r\n", 2).unwrap();
        assert_eq!(decoded[0].labels(), &["Intro".to_string()]);
        assert_eq!(decoded[0].states, vec![Mode::On, Mode::Off]);
    }

    #[test]
    fn test_leading_zero_wait_is_kept() {
        let decoded = decode("w0\n0\nw1.0\n3\n", 1).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].is_zero_wait());
    }

    #[test]
    fn test_wrong_channel_count() {
        let err = decode("w1.0\n1,1,1\n", 2).unwrap_err();
        assert!(matches!(
            err,
            CodecError::ChannelCount {
                line: 2,
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn test_invalid_lines() {
        assert!(matches!(
            decode("w1.0\n1,4\n", 2),
            Err(CodecError::InvalidState { line: 2, .. })
        ));
        assert!(matches!(
            decode("wsoon\n1\n", 1),
            Err(CodecError::InvalidSeconds { line: 1, .. })
        ));
        assert!(matches!(
            decode("1,1\n", 2),
            Err(CodecError::StatesWithoutTiming { line: 1 })
        ));
        assert!(matches!(
            decode("w1.0\nw2.0\n1\n", 1),
            Err(CodecError::MissingStates { line: 1 })
        ));
        assert!(matches!(
            decode("a1.0\n1\nw2.0\n", 1),
            Err(CodecError::MissingStates { line: 3 })
        ));
        assert!(matches!(
            decode("w1.0\nsIntro\n1\n", 1),
            Err(CodecError::LabelWithoutAlignment { line: 2 })
        ));
        assert!(matches!(
            decode("x1.0\n", 1),
            Err(CodecError::UnknownLine { line: 1, .. })
        ));
    }
}
