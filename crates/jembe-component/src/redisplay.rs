//! Redisplay policy.
//!
//! Decides which live instances are included in a patch response after
//! the command queue drains. A component newly materialised during the
//! request is always included, regardless of policy.

use bitflags::bitflags;

bitflags! {
    /// Conditions under which an instance re-renders into the response.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Redisplay: u8 {
        /// Include when post-execution state differs from the
        /// client-reported pre-request state. The default.
        const WHEN_STATE_CHANGED = 1;
        /// Include whenever the client reported the instance present.
        const WHEN_ON_PAGE = 1 << 1;
        /// Include only when an action ran on the instance this request.
        const WHEN_EXECUTED = 1 << 2;
    }
}

impl Default for Redisplay {
    fn default() -> Self {
        Self::WHEN_STATE_CHANGED
    }
}

impl Redisplay {
    /// Evaluates the policy for one instance.
    #[must_use]
    pub fn wants(&self, state_changed: bool, on_page: bool, executed: bool) -> bool {
        (self.contains(Self::WHEN_STATE_CHANGED) && state_changed)
            || (self.contains(Self::WHEN_ON_PAGE) && on_page)
            || (self.contains(Self::WHEN_EXECUTED) && executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tracks_state_changes() {
        let policy = Redisplay::default();
        assert!(policy.wants(true, true, false));
        assert!(!policy.wants(false, true, true));
    }

    #[test]
    fn when_on_page_ignores_state() {
        let policy = Redisplay::WHEN_ON_PAGE;
        assert!(policy.wants(false, true, false));
        assert!(!policy.wants(true, false, false));
    }

    #[test]
    fn when_executed_requires_a_call() {
        let policy = Redisplay::WHEN_EXECUTED;
        assert!(policy.wants(false, true, true));
        assert!(!policy.wants(true, true, false));
    }

    #[test]
    fn policies_combine() {
        let policy = Redisplay::WHEN_STATE_CHANGED | Redisplay::WHEN_EXECUTED;
        assert!(policy.wants(true, false, false));
        assert!(policy.wants(false, false, true));
        assert!(!policy.wants(false, true, false));
    }
}
