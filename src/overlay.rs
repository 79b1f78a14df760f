//! The dual-buffer wrapper behind interactive editing.
//!
//! While a node is being dragged the view has to show where it currently is,
//! but the history log must only ever see the position it had before the
//! gesture began. An [`Overlay`] therefore keeps two copies of its value: the
//! `committed` one, which always reflects the last completed command, and an
//! optional work-in-progress copy that exists only during a gesture.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay<T> {
    wip: Option<T>,
    committed: T,
}

impl<T: Clone> Overlay<T> {
    pub fn new(committed: T) -> Self {
        Self {
            wip: None,
            committed,
        }
    }

    /// The most up-to-date value: the work-in-progress copy if one exists,
    /// otherwise the committed value.
    pub fn latest(&self) -> &T {
        self.wip.as_ref().unwrap_or(&self.committed)
    }

    pub fn committed(&self) -> &T {
        &self.committed
    }

    /// Mutable access to the committed value. Any work in progress is dropped
    /// first so an edit never races with a half-finished gesture.
    pub fn committed_mut(&mut self) -> &mut T {
        self.wip = None;
        &mut self.committed
    }

    pub fn has_wip(&self) -> bool {
        self.wip.is_some()
    }

    /// Starts a work-in-progress copy from the committed value, replacing any
    /// previous one.
    pub fn begin(&mut self) -> &mut T {
        self.wip.insert(self.committed.clone())
    }

    /// The work-in-progress copy, if a gesture is active.
    pub fn wip_mut(&mut self) -> Option<&mut T> {
        self.wip.as_mut()
    }

    /// Promotes the work-in-progress copy to committed. Returns `false` when
    /// there was nothing to promote.
    pub fn commit(&mut self) -> bool {
        match self.wip.take() {
            Some(wip) => {
                self.committed = wip;
                true
            }
            None => false,
        }
    }

    /// Drops the work-in-progress copy without merging it.
    pub fn discard(&mut self) {
        self.wip = None;
    }

    /// Replaces the committed value and drops any work in progress.
    pub fn replace(&mut self, committed: T) {
        self.wip = None;
        self.committed = committed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_prefers_wip() {
        let mut overlay = Overlay::new(1);
        assert_eq!(*overlay.latest(), 1);

        *overlay.begin() = 5;
        assert_eq!(*overlay.latest(), 5);
        assert_eq!(*overlay.committed(), 1);
    }

    #[test]
    fn test_commit_and_discard() {
        let mut overlay = Overlay::new(String::from("a"));
        overlay.begin().push('b');
        assert!(overlay.commit());
        assert_eq!(overlay.committed(), "ab");
        assert!(!overlay.commit());

        overlay.begin().push('c');
        overlay.discard();
        assert_eq!(overlay.latest(), "ab");
        assert!(!overlay.has_wip());
    }

    #[test]
    fn test_committed_mut_drops_wip() {
        let mut overlay = Overlay::new(vec![1]);
        overlay.begin().push(2);
        overlay.committed_mut().push(3);
        assert_eq!(overlay.latest(), &vec![1, 3]);
    }
}
