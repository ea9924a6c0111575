use std::fmt;

/// Represents the kind of a key event.
///
/// Ordinary keys report `Down`/`Up`. Modifier keys report `Modify`; whether
/// the modifier went down or up is read from the event's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EventType {
    Up = 0,
    Down = 1,
    Modify = 2,
}

impl EventType {
    /// Returns true if this is a DOWN event
    pub fn is_down(self) -> bool {
        matches!(self, EventType::Down)
    }

    /// Returns true if this is an UP event
    pub fn is_up(self) -> bool {
        matches!(self, EventType::Up)
    }

    /// Returns true if this is a MODIFY event
    pub fn is_modify(self) -> bool {
        matches!(self, EventType::Modify)
    }

    /// Create EventType from i32 value
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(EventType::Up),
            1 => Some(EventType::Down),
            2 => Some(EventType::Modify),
            _ => None,
        }
    }

    /// Convert EventType to its i32 representation
    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// DOWN for a press, UP for a release
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            EventType::Down
        } else {
            EventType::Up
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Up => write!(f, "up"),
            EventType::Down => write!(f, "down"),
            EventType::Modify => write!(f, "modify"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_properties() {
        assert!(EventType::Down.is_down());
        assert!(!EventType::Down.is_up());
        assert!(EventType::Up.is_up());
        assert!(EventType::Modify.is_modify());
        assert!(!EventType::Modify.is_down());
    }

    #[test]
    fn test_event_type_from_i32() {
        assert_eq!(EventType::from_i32(0), Some(EventType::Up));
        assert_eq!(EventType::from_i32(1), Some(EventType::Down));
        assert_eq!(EventType::from_i32(2), Some(EventType::Modify));
        assert_eq!(EventType::from_i32(3), None);
    }

    #[test]
    fn test_event_type_to_i32() {
        assert_eq!(EventType::Up.to_i32(), 0);
        assert_eq!(EventType::Down.to_i32(), 1);
        assert_eq!(EventType::Modify.to_i32(), 2);
    }

    #[test]
    fn test_from_pressed() {
        assert_eq!(EventType::from_pressed(true), EventType::Down);
        assert_eq!(EventType::from_pressed(false), EventType::Up);
    }
}
