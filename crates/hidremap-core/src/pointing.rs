// hidremap Pointing Buttons
// Button bitset of relative pointer events

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

bitflags! {
    /// Buttons held on a relative pointing device
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u32 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const MIDDLE = 1 << 2;
        const BUTTON4 = 1 << 3;
        const BUTTON5 = 1 << 4;
        const BUTTON6 = 1 << 5;
        const BUTTON7 = 1 << 6;
        const BUTTON8 = 1 << 7;
    }
}

/// A single pointing button (or none)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PointingButton(Buttons);

impl PointingButton {
    pub const NONE: PointingButton = PointingButton(Buttons::empty());
    pub const LEFT: PointingButton = PointingButton(Buttons::LEFT);
    pub const RIGHT: PointingButton = PointingButton(Buttons::RIGHT);
    pub const MIDDLE: PointingButton = PointingButton(Buttons::MIDDLE);
    pub const BUTTON4: PointingButton = PointingButton(Buttons::BUTTON4);
    pub const BUTTON5: PointingButton = PointingButton(Buttons::BUTTON5);

    pub fn is_none(self) -> bool {
        self.0.is_empty()
    }

    pub fn buttons(self) -> Buttons {
        self.0
    }

    /// Zero-based button number, if any
    pub fn index(self) -> Option<usize> {
        if self.is_none() {
            None
        } else {
            Some(self.0.bits().trailing_zeros() as usize)
        }
    }

    /// Build from a zero-based button number
    pub fn from_index(index: usize) -> Option<Self> {
        Buttons::from_bits(1u32.checked_shl(index as u32)?).map(PointingButton)
    }
}

impl From<PointingButton> for Buttons {
    fn from(button: PointingButton) -> Self {
        button.0
    }
}

impl fmt::Display for PointingButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            None => write!(f, "NONE"),
            Some(0) => write!(f, "LEFT"),
            Some(1) => write!(f, "RIGHT"),
            Some(2) => write!(f, "MIDDLE"),
            Some(i) => write!(f, "BUTTON{}", i + 1),
        }
    }
}

impl FromStr for PointingButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        match upper.as_str() {
            "NONE" => return Ok(PointingButton::NONE),
            "LEFT" => return Ok(PointingButton::LEFT),
            "RIGHT" => return Ok(PointingButton::RIGHT),
            "MIDDLE" => return Ok(PointingButton::MIDDLE),
            _ => {}
        }
        upper
            .strip_prefix("BUTTON")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .and_then(|n| PointingButton::from_index(n - 1))
            .ok_or_else(|| format!("Unknown pointing button: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_parse() {
        assert_eq!("left".parse::<PointingButton>(), Ok(PointingButton::LEFT));
        assert_eq!("Button5".parse::<PointingButton>(), Ok(PointingButton::BUTTON5));
        assert_eq!("BUTTON3".parse::<PointingButton>(), Ok(PointingButton::MIDDLE));
        assert!("BUTTON0".parse::<PointingButton>().is_err());
        assert!("BUTTON9".parse::<PointingButton>().is_err());
    }

    #[test]
    fn test_button_display() {
        assert_eq!(PointingButton::LEFT.to_string(), "LEFT");
        assert_eq!(PointingButton::BUTTON4.to_string(), "BUTTON4");
        assert_eq!(PointingButton::NONE.to_string(), "NONE");
    }

    #[test]
    fn test_button_index() {
        assert_eq!(PointingButton::NONE.index(), None);
        assert_eq!(PointingButton::MIDDLE.index(), Some(2));
        assert_eq!(PointingButton::from_index(1), Some(PointingButton::RIGHT));
    }
}
