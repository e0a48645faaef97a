pub const MAX_IMMEDIATE_AUTH_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct AuthRetryState {
    consecutive_expired: u32,
    limit: u32,
}

impl AuthRetryState {
    pub fn new() -> Self {
        Self::with_limit(MAX_IMMEDIATE_AUTH_RETRIES)
    }

    pub fn with_limit(limit: u32) -> Self {
        Self {
            consecutive_expired: 0,
            limit,
        }
    }

    pub fn record_settled(&mut self) {
        self.consecutive_expired = 0;
    }

    pub fn record_expired(&mut self) -> bool {
        self.consecutive_expired = self.consecutive_expired.saturating_add(1);
        self.consecutive_expired <= self.limit
    }

    pub fn consecutive_expired(&self) -> u32 {
        self.consecutive_expired
    }
}

impl Default for AuthRetryState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = AuthRetryState::new();
        assert_eq!(state.consecutive_expired(), 0);
    }

    #[test]
    fn test_retries_until_limit() {
        let mut state = AuthRetryState::new();

        for _ in 0..MAX_IMMEDIATE_AUTH_RETRIES {
            assert!(state.record_expired());
        }
        assert!(!state.record_expired());
    }

    #[test]
    fn test_settled_resets_streak() {
        let mut state = AuthRetryState::with_limit(1);

        assert!(state.record_expired());
        assert!(!state.record_expired());

        state.record_settled();
        assert_eq!(state.consecutive_expired(), 0);
        assert!(state.record_expired());
    }

    #[test]
    fn test_counter_saturates() {
        let mut state = AuthRetryState::with_limit(u32::MAX);
        state.consecutive_expired = u32::MAX - 1;

        assert!(state.record_expired());
        assert!(state.record_expired());
        assert_eq!(state.consecutive_expired(), u32::MAX);
    }
}
