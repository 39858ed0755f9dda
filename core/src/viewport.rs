/// Scroll decisions for the message viewport
///
/// Pure state: the embedding surface reports its scroll offset and applies
/// whatever action the coordinator decides after a store mutation.

/// What the view should do with its scroll position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollAction {
    None,
    /// First non-loading render after a conversation switch: no animation
    JumpToBottom,
    /// Tail growth (live push or local send) after the initial render
    SmoothToBottom,
    /// Backfill landed: restore the offset captured before the fetch so the
    /// visual anchor does not jump when content height grows above it
    RestoreOffset(f64),
}

pub struct ViewportCoordinator {
    initial_load_complete: bool,
    /// Offset from viewport top, as last reported by the view
    offset_from_top: f64,
    /// Offset captured when a backfill started
    saved_offset: Option<f64>,
}

impl ViewportCoordinator {
    pub fn new() -> Self {
        Self {
            initial_load_complete: false,
            offset_from_top: 0.0,
            saved_offset: None,
        }
    }

    /// Forget everything. Called on conversation switch.
    pub fn reset(&mut self) {
        self.initial_load_complete = false;
        self.offset_from_top = 0.0;
        self.saved_offset = None;
    }

    /// The view reports its current scroll offset here
    pub fn set_offset(&mut self, offset_from_top: f64) {
        self.offset_from_top = offset_from_top;
    }

    /// Capture the anchor before a backfill fetch goes out
    pub fn begin_backfill(&mut self) {
        self.saved_offset = Some(self.offset_from_top);
    }

    /// Initial page rendered for a newly selected conversation
    pub fn after_initial_load(&mut self) -> ScrollAction {
        self.initial_load_complete = true;
        ScrollAction::JumpToBottom
    }

    /// Store grew at the tail
    pub fn after_tail_growth(&mut self) -> ScrollAction {
        if self.saved_offset.is_some() {
            // A backfill is in flight; moving now would fight the anchor
            // restore that lands when it resolves
            return ScrollAction::None;
        }
        if self.initial_load_complete {
            ScrollAction::SmoothToBottom
        } else {
            // Still in the initial render window; the initial jump covers it
            ScrollAction::None
        }
    }

    /// Backfill page merged into the store
    pub fn after_backfill(&mut self) -> ScrollAction {
        match self.saved_offset.take() {
            Some(offset) => ScrollAction::RestoreOffset(offset),
            None => ScrollAction::None,
        }
    }

    /// Backfill fetch failed; drop the captured anchor without moving
    pub fn cancel_backfill(&mut self) {
        self.saved_offset = None;
    }
}

impl Default for ViewportCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_load_jumps_then_tail_scrolls_smoothly() {
        let mut vp = ViewportCoordinator::new();
        assert_eq!(vp.after_tail_growth(), ScrollAction::None);
        assert_eq!(vp.after_initial_load(), ScrollAction::JumpToBottom);
        assert_eq!(vp.after_tail_growth(), ScrollAction::SmoothToBottom);
    }

    #[test]
    fn test_backfill_restores_captured_offset() {
        let mut vp = ViewportCoordinator::new();
        vp.after_initial_load();
        vp.set_offset(128.5);
        vp.begin_backfill();
        // User keeps scrolling while the fetch is in flight; the anchor is
        // the offset at capture time
        vp.set_offset(40.0);
        assert_eq!(vp.after_backfill(), ScrollAction::RestoreOffset(128.5));
        // Anchor is consumed
        assert_eq!(vp.after_backfill(), ScrollAction::None);
    }

    #[test]
    fn test_tail_growth_during_backfill_takes_no_action() {
        let mut vp = ViewportCoordinator::new();
        vp.after_initial_load();
        vp.set_offset(50.0);
        vp.begin_backfill();
        // A live push lands while the older page is still in flight; the
        // viewport must hold still so the anchor restore stays meaningful
        assert_eq!(vp.after_tail_growth(), ScrollAction::None);
        assert_eq!(vp.after_backfill(), ScrollAction::RestoreOffset(50.0));
        // Once the backfill resolves, tail growth scrolls again
        assert_eq!(vp.after_tail_growth(), ScrollAction::SmoothToBottom);
    }

    #[test]
    fn test_cancelled_backfill_does_not_move() {
        let mut vp = ViewportCoordinator::new();
        vp.after_initial_load();
        vp.set_offset(99.0);
        vp.begin_backfill();
        vp.cancel_backfill();
        assert_eq!(vp.after_backfill(), ScrollAction::None);
    }

    #[test]
    fn test_reset_returns_to_initial_behavior() {
        let mut vp = ViewportCoordinator::new();
        vp.after_initial_load();
        vp.reset();
        assert_eq!(vp.after_tail_growth(), ScrollAction::None);
        assert_eq!(vp.after_initial_load(), ScrollAction::JumpToBottom);
    }
}
