//! The two interactive sub-views. Each owns its own state and accepts forwarded
//! terminal events through `apply`; the dispatcher decides which one receives them.

mod content;
mod history;

pub use content::ContentPane;
pub use history::HistoryPane;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneEffect {
    Ignored,
    Consumed,
}

/// Moves `current` by `delta` inside `0..len`.
fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = (current as isize).saturating_add(delta);
    next.clamp(0, (len - 1) as isize) as usize
}

#[cfg(test)]
mod tests {
    use super::step;

    #[test]
    fn step_clamps_to_bounds() {
        assert_eq!(step(0, -1, 5), 0);
        assert_eq!(step(3, 10, 5), 4);
        assert_eq!(step(2, 1, 5), 3);
        assert_eq!(step(7, 1, 0), 0);
    }
}
