use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CompileError;
use crate::instruction::codec;
use crate::instruction::instruction::show_length;
use crate::script::parser::ScriptParser;
use crate::timeline::compiler::{CompileOptions, TimelineCompiler};

use super::show::Show;

#[derive(Clone, Debug, PartialEq)]
pub struct SectionSummary {
    pub name: String,
    pub bpm: f64,
    pub times: Vec<f64>,
}

/// What a successful compile produced.
#[derive(Clone, Debug, PartialEq)]
pub struct CompileReport {
    pub show: String,
    pub sections: Vec<SectionSummary>,
    pub instructions: usize,
    /// Nominal length of the light show in seconds.
    pub length: f64,
    pub output: PathBuf,
    pub recompiled: bool,
}

impl fmt::Display for CompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(f, "{}, {}", section.name, section.bpm)?;
            for time in &section.times {
                writeln!(f, " - {}", time)?;
            }
        }
        write!(
            f,
            "Show '{}' successfully {}compiled ({} instructions, {:.2}s)",
            self.show,
            if self.recompiled { "re" } else { "" },
            self.instructions,
            self.length
        )
    }
}

/// Parse every script of `show`, compile the timeline and write the lightmap.
///
/// Nothing is written and the compiled flag is left alone unless every step
/// succeeds.
pub fn compile_show(show: &mut Show, options: CompileOptions) -> Result<CompileReport, CompileError> {
    if show.lightmap_conflicts() {
        return Err(CompileError::NameConflict {
            show: show.name.clone(),
            file: show.metadata.lightmap.clone(),
        });
    }

    let mut parser = ScriptParser::new();
    for (script, path) in show.metadata.compile.iter().zip(show.script_paths()) {
        let text = fs::read_to_string(&path).map_err(|source| CompileError::Io {
            path: path.clone(),
            source,
        })?;
        parser.parse_file(script, &text)?;
    }

    let sections = parser.into_sections();
    let instructions = TimelineCompiler::new(options).compile(&sections);
    let output = show.lightmap_path();
    let previous = set_aside(&output)?;
    if let Err(e) = write_atomically(&output, &codec::encode(&instructions)) {
        restore(&output, previous.as_deref());
        return Err(e);
    }

    let recompiled = show.is_compiled();
    if let Err(e) = show.mark_compiled() {
        restore(&output, previous.as_deref());
        return Err(e.into());
    }
    if let Some(previous) = previous {
        if let Err(e) = fs::remove_file(&previous) {
            log::warn!("Failed to remove {}: {}", previous.display(), e);
        }
    }

    let report = CompileReport {
        show: show.name.clone(),
        sections: sections
            .iter()
            .map(|section| SectionSummary {
                name: section.name.clone(),
                bpm: section.bpm,
                times: section.times.clone(),
            })
            .collect(),
        instructions: instructions.len(),
        length: show_length(&instructions),
        output,
        recompiled,
    };
    log::info!(
        "Compiled '{}': {} sections, {} instructions written to {}",
        report.show,
        report.sections.len(),
        report.instructions,
        report.output.display()
    );
    Ok(report)
}

/// Hidden sibling of `path`, e.g. `.song.lm.tmp`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}", file_name, suffix))
}

/// Move an existing lightmap out of the way so a failed compile can put it back.
fn set_aside(path: &Path) -> Result<Option<PathBuf>, CompileError> {
    if !path.is_file() {
        return Ok(None);
    }
    let previous = sibling(path, "prev");
    fs::rename(path, &previous).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(previous))
}

fn restore(path: &Path, previous: Option<&Path>) {
    let result = match previous {
        Some(previous) => fs::rename(previous, path),
        None if path.exists() => fs::remove_file(path),
        None => Ok(()),
    };
    if let Err(e) = result {
        log::error!("Failed to restore {}: {}", path.display(), e);
    }
}

fn write_atomically(path: &Path, contents: &str) -> Result<(), CompileError> {
    let temp = sibling(path, "tmp");

    fs::write(&temp, contents).map_err(|source| CompileError::Io {
        path: temp.clone(),
        source,
    })?;
    fs::rename(&temp, path).map_err(|source| {
        let _ = fs::remove_file(&temp);
        CompileError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}
