//! Pointer injection seam
//!
//! These traits allow for dependency injection, so the dispatcher can be
//! driven against a recording mock instead of the real desktop pointer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{CookbotError, Result};
use crate::region::Point;

/// How a click is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickStyle {
    Single,
    /// Two press/release pairs separated by the click gap
    Double,
}

impl fmt::Display for ClickStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClickStyle::Single => write!(f, "click"),
            ClickStyle::Double => write!(f, "double click"),
        }
    }
}

/// Trait for moving and clicking the system pointer
pub trait PointerDevice {
    /// Move to an absolute screen position
    fn move_to(&mut self, at: Point) -> Result<()>;

    /// Press the left button
    fn press(&mut self) -> Result<()>;

    /// Release the left button
    fn release(&mut self) -> Result<()>;

    /// Full left click at the current position
    fn click(&mut self) -> Result<()>;

    /// Current pointer position
    fn position(&self) -> Result<Point>;

    /// Move to `at` and click in the given style. A double click is
    /// press, gap, release, gap, press, gap, release.
    fn click_at(&mut self, at: Point, style: ClickStyle, gap: Duration) -> Result<()> {
        self.move_to(at)?;
        match style {
            ClickStyle::Single => self.click(),
            ClickStyle::Double => {
                self.press()?;
                pause(gap);
                self.release()?;
                pause(gap);
                self.press()?;
                pause(gap);
                self.release()
            }
        }
    }
}

fn pause(gap: Duration) {
    if !gap.is_zero() {
        std::thread::sleep(gap);
    }
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

/// One recorded pointer call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOp {
    Move(Point),
    Press,
    Release,
    Click,
}

/// Pointer that records every call instead of touching the desktop
#[derive(Debug)]
pub struct MockPointer {
    ops: Vec<PointerOp>,
    position: Point,
    /// Position reported regardless of moves
    pinned: Option<Point>,
    fail: bool,
}

impl Default for MockPointer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPointer {
    /// Pointer starting in the middle of a 1280x720 screen
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            position: Point::new(640, 360),
            pinned: None,
            fail: false,
        }
    }

    /// Always report `at` as the pointer position, as if the user were
    /// holding the mouse there
    pub fn pinned_at(mut self, at: Point) -> Self {
        self.pinned = Some(at);
        self
    }

    /// Make every call fail
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn ops(&self) -> &[PointerOp] {
        &self.ops
    }

    /// Positions moved to, in order
    pub fn moves(&self) -> Vec<Point> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                PointerOp::Move(at) => Some(*at),
                _ => None,
            })
            .collect()
    }

    /// Number of button presses, counting a full click as one press
    pub fn presses(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, PointerOp::Press | PointerOp::Click))
            .count()
    }

    fn record(&mut self, op: PointerOp) -> Result<()> {
        if self.fail {
            return Err(CookbotError::Input("mock pointer failure".to_string()));
        }
        if let PointerOp::Move(at) = op {
            self.position = at;
        }
        self.ops.push(op);
        Ok(())
    }
}

impl PointerDevice for MockPointer {
    fn move_to(&mut self, at: Point) -> Result<()> {
        self.record(PointerOp::Move(at))
    }

    fn press(&mut self) -> Result<()> {
        self.record(PointerOp::Press)
    }

    fn release(&mut self) -> Result<()> {
        self.record(PointerOp::Release)
    }

    fn click(&mut self) -> Result<()> {
        self.record(PointerOp::Click)
    }

    fn position(&self) -> Result<Point> {
        Ok(self.pinned.unwrap_or(self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_click() {
        let mut pointer = MockPointer::new();
        pointer
            .click_at(Point::new(10, 20), ClickStyle::Single, Duration::ZERO)
            .unwrap();
        assert_eq!(
            pointer.ops(),
            &[PointerOp::Move(Point::new(10, 20)), PointerOp::Click]
        );
        assert_eq!(pointer.position().unwrap(), Point::new(10, 20));
    }

    #[test]
    fn test_double_click_sequence() {
        let mut pointer = MockPointer::new();
        pointer
            .click_at(Point::new(5, 5), ClickStyle::Double, Duration::ZERO)
            .unwrap();
        assert_eq!(
            pointer.ops(),
            &[
                PointerOp::Move(Point::new(5, 5)),
                PointerOp::Press,
                PointerOp::Release,
                PointerOp::Press,
                PointerOp::Release,
            ]
        );
        assert_eq!(pointer.presses(), 2);
    }

    #[test]
    fn test_pinned_position() {
        let mut pointer = MockPointer::new().pinned_at(Point::new(0, 0));
        pointer.move_to(Point::new(300, 300)).unwrap();
        assert_eq!(pointer.position().unwrap(), Point::new(0, 0));
    }

    #[test]
    fn test_failing_pointer() {
        let mut pointer = MockPointer::new().failing();
        let err = pointer
            .click_at(Point::new(1, 1), ClickStyle::Single, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, CookbotError::Input(_)));
        assert!(pointer.ops().is_empty());
    }
}
