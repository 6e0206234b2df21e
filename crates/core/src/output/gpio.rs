use std::fs;
use std::path::{Path, PathBuf};

use twinkle_fixtures::LightLayout;

use super::{FrameResolver, LightOutput};
use crate::error::OutputError;
use crate::Mode;

pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

struct Line {
    pin: u32,
    value: PathBuf,
}

/// Relay board driven through the kernel's sysfs GPIO interface.
pub struct GpioBoard {
    lines: Vec<Line>,
    active_low: bool,
    resolver: FrameResolver,
}

impl GpioBoard {
    pub fn open(layout: &LightLayout, random_probability: f64) -> Result<Self, OutputError> {
        Self::open_at(
            Path::new(SYSFS_GPIO_ROOT),
            layout,
            FrameResolver::new(layout.channel_count(), random_probability),
        )
    }

    /// Export every channel's pin under `root` as an output and start dark.
    pub fn open_at(
        root: &Path,
        layout: &LightLayout,
        resolver: FrameResolver,
    ) -> Result<Self, OutputError> {
        let fixtures = layout.fixtures()?;
        if resolver.channel_count() != fixtures.len() {
            return Err(OutputError::ChannelCount {
                expected: fixtures.len(),
                found: resolver.channel_count(),
            });
        }

        let mut lines = Vec::with_capacity(fixtures.len());
        for fixture in fixtures {
            let pin = fixture.pin;
            log::trace!("{} on GPIO {}", fixture.name, pin);
            let dir = root.join(format!("gpio{}", pin));
            if !dir.exists() {
                fs::write(root.join("export"), pin.to_string())
                    .map_err(|source| OutputError::Gpio { pin, source })?;
            }
            fs::write(dir.join("direction"), "out")
                .map_err(|source| OutputError::Gpio { pin, source })?;
            lines.push(Line {
                pin,
                value: dir.join("value"),
            });
        }
        log::debug!("Exported {} GPIO lines under {}", lines.len(), root.display());

        let mut board = Self {
            lines,
            active_low: layout.active_low,
            resolver,
        };
        board.all_off()?;
        Ok(board)
    }

    fn write(&self, lit: &[bool]) -> Result<(), OutputError> {
        for (line, &on) in self.lines.iter().zip(lit) {
            let level = if on != self.active_low { "1" } else { "0" };
            fs::write(&line.value, level).map_err(|source| OutputError::Gpio {
                pin: line.pin,
                source,
            })?;
        }
        Ok(())
    }
}

impl LightOutput for GpioBoard {
    fn channel_count(&self) -> usize {
        self.lines.len()
    }

    fn apply(&mut self, states: &[Mode]) -> Result<(), OutputError> {
        let lit = self.resolver.resolve(states)?.to_vec();
        self.write(&lit)
    }

    fn all_off(&mut self) -> Result<(), OutputError> {
        let lit = self.resolver.clear().to_vec();
        self.write(&lit)
    }
}

impl Drop for GpioBoard {
    fn drop(&mut self) {
        if let Err(e) = self.all_off() {
            log::warn!("Failed to switch lights off: {}", e);
        }
    }
}
