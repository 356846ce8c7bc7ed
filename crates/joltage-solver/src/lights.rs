//! Minimal button presses to reach a light pattern, where each press toggles
//! a fixed set of lights.
//!
//! Pressing a button twice cancels out, so only subsets of buttons are
//! explored, in order of increasing size. The search keeps an explicit stack
//! of immutable frames instead of toggling and untoggling shared state.

/// Lights and buttons as bitmasks over at most 64 lights.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightsPuzzle {
    /// Number of lights
    pub width: usize,
    /// Lights that must end up on
    pub target: u64,
    /// Lights toggled by each button
    pub buttons: Vec<u64>,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    state: u64,
    remaining: usize,
    next_button: usize,
}

impl LightsPuzzle {
    pub fn new(width: usize, target: u64, buttons: Vec<u64>) -> Self {
        Self { width, target, buttons }
    }

    /// Fewest presses that turn the all-off state into `target`, trying at
    /// most `max_presses` presses.
    pub fn min_presses(&self, max_presses: usize) -> Option<usize> {
        if self.target == 0 {
            return Some(0);
        }
        let limit = max_presses.min(self.buttons.len());
        (1..=limit).find(|&presses| self.reachable_in(presses))
    }

    fn reachable_in(&self, presses: usize) -> bool {
        let mut stack = vec![Frame {
            state: 0,
            remaining: presses,
            next_button: 0,
        }];

        while let Some(frame) = stack.pop() {
            if frame.remaining == 0 {
                if frame.state == self.target {
                    return true;
                }
                continue;
            }
            // Not enough buttons left to spend the remaining presses.
            if self.buttons.len() - frame.next_button < frame.remaining {
                continue;
            }
            for (i, &button) in self.buttons.iter().enumerate().skip(frame.next_button).rev() {
                stack.push(Frame {
                    state: frame.state ^ button,
                    remaining: frame.remaining - 1,
                    next_button: i + 1,
                });
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(indices: &[usize]) -> u64 {
        indices.iter().fold(0, |acc, &i| acc | 1 << i)
    }

    #[test]
    fn test_first_sample_machine() {
        // [.##.] (3) (1,3) (2) (2,3) (0,2) (0,1)
        let puzzle = LightsPuzzle::new(
            4,
            mask(&[1, 2]),
            vec![mask(&[3]), mask(&[1, 3]), mask(&[2]), mask(&[2, 3]), mask(&[0, 2]), mask(&[0, 1])],
        );
        assert_eq!(puzzle.min_presses(10), Some(2));
    }

    #[test]
    fn test_all_off_needs_no_presses() {
        let puzzle = LightsPuzzle::new(3, 0, vec![mask(&[0])]);
        assert_eq!(puzzle.min_presses(10), Some(0));
    }

    #[test]
    fn test_unreachable_pattern() {
        let puzzle = LightsPuzzle::new(3, mask(&[2]), vec![mask(&[0]), mask(&[0, 1])]);
        assert_eq!(puzzle.min_presses(10), None);
    }

    #[test]
    fn test_press_limit_is_respected() {
        let puzzle = LightsPuzzle::new(3, mask(&[0, 1, 2]), vec![mask(&[0]), mask(&[1]), mask(&[2])]);
        assert_eq!(puzzle.min_presses(2), None);
        assert_eq!(puzzle.min_presses(3), Some(3));
    }
}
