//! Domain error types.

/// Domain-level errors raised while assembling routes and trips.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Every stop of the trip was excluded, so it has no representative time.
    #[error("trip {trip_id} has no stops left after exclusion")]
    EmptyTrip { trip_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::EmptyTrip {
            trip_id: "T1".into(),
        };
        assert_eq!(err.to_string(), "trip T1 has no stops left after exclusion");
    }
}
