use serde::{Deserialize, Serialize};

/// One relay-switched light string, addressed by its script channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fixture {
    pub name: String,
    pub pin: u32,
}

/// The fixed, statically configured ordering of lights.
///
/// `order[i]` is the 1-based script channel wired to `pins[i]`. The order must
/// be a permutation of `1..=order.len()`, and there must be at least as many
/// pins as orderings. Pins beyond the ordering are left unassigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightLayout {
    pub order: Vec<usize>,
    pub pins: Vec<u32>,
    /// Relays that switch on when the line is driven low.
    #[serde(default)]
    pub active_low: bool,
}

impl Default for LightLayout {
    fn default() -> Self {
        // Four groups of four strings with the white surround on 9-12 and the
        // star on 13.
        Self {
            order: (1..=13).collect(),
            pins: vec![19, 13, 6, 5, 11, 9, 10, 22, 2, 3, 4, 17, 27],
            active_low: false,
        }
    }
}

impl LightLayout {
    pub fn new(order: Vec<usize>, pins: Vec<u32>) -> Self {
        Self {
            order,
            pins,
            active_low: false,
        }
    }

    /// A layout of `count` channels wired in order to pins `0..count`.
    pub fn sequential(count: usize) -> Self {
        Self::new((1..=count).collect(), (0..count as u32).collect())
    }

    /// Number of channels N every compiled frame carries.
    pub fn channel_count(&self) -> usize {
        self.order.len()
    }

    /// Pins that no ordering refers to.
    pub fn unused_pins(&self) -> &[u32] {
        let used = self.order.len().min(self.pins.len());
        &self.pins[used..]
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.order.is_empty() {
            return Err(LayoutError::Empty);
        }
        if self.order.len() > self.pins.len() {
            return Err(LayoutError::NotEnoughPins {
                channels: self.order.len(),
                pins: self.pins.len(),
            });
        }

        let mut seen = vec![false; self.order.len()];
        for &ordinal in &self.order {
            if ordinal == 0 || ordinal > self.order.len() {
                return Err(LayoutError::OrdinalOutOfRange(ordinal));
            }
            if seen[ordinal - 1] {
                return Err(LayoutError::DuplicateOrdinal(ordinal));
            }
            seen[ordinal - 1] = true;
        }

        Ok(())
    }

    /// Pin for each channel index, i.e. `result[order[i] - 1] = pins[i]`.
    pub fn pins_by_channel(&self) -> Result<Vec<u32>, LayoutError> {
        self.validate()?;

        let mut by_channel = vec![0; self.order.len()];
        for (slot, &ordinal) in self.order.iter().enumerate() {
            by_channel[ordinal - 1] = self.pins[slot];
        }
        Ok(by_channel)
    }

    pub fn fixtures(&self) -> Result<Vec<Fixture>, LayoutError> {
        Ok(self
            .pins_by_channel()?
            .into_iter()
            .enumerate()
            .map(|(channel, pin)| Fixture {
                name: format!("Light {}", channel + 1),
                pin,
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    Empty,
    NotEnoughPins { channels: usize, pins: usize },
    OrdinalOutOfRange(usize),
    DuplicateOrdinal(usize),
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::Empty => write!(f, "Light layout has no channels"),
            LayoutError::NotEnoughPins { channels, pins } => write!(
                f,
                "There are more orderings ({}) than pins ({})",
                channels, pins
            ),
            LayoutError::OrdinalOutOfRange(ordinal) => {
                write!(f, "Channel ordinal {} is outside the ordering", ordinal)
            }
            LayoutError::DuplicateOrdinal(ordinal) => {
                write!(f, "Channel ordinal {} appears more than once", ordinal)
            }
        }
    }
}

impl std::error::Error for LayoutError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        let layout = LightLayout::default();
        assert!(layout.validate().is_ok());
        assert_eq!(layout.channel_count(), 13);
        assert!(layout.unused_pins().is_empty());
    }

    #[test]
    fn test_pins_follow_order() {
        let layout = LightLayout::new(vec![1, 4, 3, 2], vec![10, 11, 12, 13, 14]);
        assert_eq!(layout.pins_by_channel().unwrap(), vec![10, 13, 12, 11]);
        assert_eq!(layout.unused_pins(), &[14]);
    }

    #[test]
    fn test_gap_in_order_rejected() {
        let layout = LightLayout::new(vec![1, 2, 3, 5], vec![1, 2, 3, 4]);
        assert_eq!(layout.validate(), Err(LayoutError::OrdinalOutOfRange(5)));

        let layout = LightLayout::new(vec![1, 2, 2], vec![1, 2, 3]);
        assert_eq!(layout.validate(), Err(LayoutError::DuplicateOrdinal(2)));
    }

    #[test]
    fn test_too_few_pins_rejected() {
        let layout = LightLayout::new(vec![1, 2, 3], vec![7, 8]);
        assert!(matches!(
            layout.validate(),
            Err(LayoutError::NotEnoughPins {
                channels: 3,
                pins: 2
            })
        ));
    }

    #[test]
    fn test_layout_from_json() {
        let layout: LightLayout =
            serde_json::from_str(r#"{"order":[2,1],"pins":[5,6]}"#).unwrap();
        assert!(!layout.active_low);
        let fixtures = layout.fixtures().unwrap();
        assert_eq!(fixtures[0].pin, 6);
        assert_eq!(fixtures[1].name, "Light 2");
    }
}
