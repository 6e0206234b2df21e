use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Print, PrintStyledContent, Stylize};

use super::{FrameResolver, LightOutput};
use crate::error::OutputError;
use crate::Mode;

const LIT: &str = "*";
const DARK: &str = ".";

/// Draws every frame as one row of characters, for rehearsing a show
/// without relays attached.
pub struct ConsoleRenderer<W: Write> {
    out: W,
    resolver: FrameResolver,
    color: bool,
}

impl ConsoleRenderer<io::Stdout> {
    pub fn stdout(channel_count: usize, random_probability: f64) -> Self {
        Self::new(
            io::stdout(),
            FrameResolver::new(channel_count, random_probability),
        )
    }
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, resolver: FrameResolver) -> Self {
        Self {
            out,
            resolver,
            color: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, lit: &[bool]) -> io::Result<()> {
        for (i, &on) in lit.iter().enumerate() {
            if i > 0 {
                queue!(self.out, Print(' '))?;
            }
            match (on, self.color) {
                (true, true) => queue!(self.out, PrintStyledContent(LIT.yellow().bold()))?,
                (true, false) => queue!(self.out, Print(LIT))?,
                (false, true) => queue!(self.out, PrintStyledContent(DARK.dark_grey()))?,
                (false, false) => queue!(self.out, Print(DARK))?,
            }
        }
        queue!(self.out, Print('\n'))?;
        self.out.flush()
    }
}

impl<W: Write> LightOutput for ConsoleRenderer<W> {
    fn channel_count(&self) -> usize {
        self.resolver.channel_count()
    }

    fn apply(&mut self, states: &[Mode]) -> Result<(), OutputError> {
        let lit = self.resolver.resolve(states)?.to_vec();
        self.draw(&lit)?;
        Ok(())
    }

    fn all_off(&mut self) -> Result<(), OutputError> {
        let lit = self.resolver.clear().to_vec();
        self.draw(&lit)?;
        Ok(())
    }
}
