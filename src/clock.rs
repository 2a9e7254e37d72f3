//! Clock-class compatibility validation.
//!
//! The first clock class (or absence of one) observed across every
//! upstream locks a regime for the lifetime of the iterator. Every
//! subsequent observation is checked against that regime unless the filter
//! was configured to assume all clocks are absolute and therefore
//! comparable without checking.

use crate::error::{
    ClockExpectationDescription,
    MuxerError,
};
use crate::message::ClockClass;

/// The locked clock-class regime for a [`crate::iterator::MuxerIterator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockExpectation {
    /// No message carrying (or lacking) a clock class has been observed
    /// yet; any regime may still be adopted.
    Any,
    /// Every stream lacks a clock class.
    None,
    /// Every clock class has a Unix-epoch origin.
    Absolute,
    /// Every clock class is non-absolute and carries this UUID.
    RelativeWithUuid([u8; 16]),
    /// Every clock class is non-absolute and carries no UUID.
    RelativeNoUuid,
}

impl ClockExpectation {
    fn describe(&self) -> ClockExpectationDescription {
        let s = match self {
            ClockExpectation::Any => "any clock class (unconstrained)".to_string(),
            ClockExpectation::None => "no clock class".to_string(),
            ClockExpectation::Absolute => "an absolute (Unix epoch origin) clock class".to_string(),
            ClockExpectation::RelativeWithUuid(uuid) => {
                format!("a non-absolute clock class with UUID {}", format_uuid(uuid))
            },
            ClockExpectation::RelativeNoUuid => "a non-absolute clock class with no UUID".to_string(),
        };
        ClockExpectationDescription::new(s)
    }
}

fn format_uuid(uuid: &[u8; 16]) -> String {
    uuid.iter().map(|b| format!("{b:02x}")).collect::<String>()
}

fn describe_clock_class(clock_class: Option<&ClockClass>) -> ClockExpectationDescription {
    match clock_class {
        None => ClockExpectationDescription::new("no clock class"),
        Some(cc) if cc.origin_is_unix_epoch => {
            ClockExpectationDescription::new(format!("absolute clock class \"{}\"", cc.name))
        },
        Some(cc) => match cc.uuid {
            Some(uuid) => ClockExpectationDescription::new(format!(
                "non-absolute clock class \"{}\" with UUID {}",
                cc.name,
                format_uuid(&uuid)
            )),
            None => ClockExpectationDescription::new(format!(
                "non-absolute clock class \"{}\" with no UUID",
                cc.name
            )),
        },
    }
}

/// Validates clock classes observed across upstreams and locks the regime
/// for the iterator's lifetime. Owned by [`crate::iterator::MuxerIterator`].
#[derive(Debug, Clone)]
pub struct ClockPolicy {
    expectation: ClockExpectation,
    assume_absolute: bool,
}

impl ClockPolicy {
    pub fn new(assume_absolute: bool) -> Self {
        Self {
            expectation: ClockExpectation::Any,
            assume_absolute,
        }
    }

    pub fn expectation(&self) -> &ClockExpectation {
        &self.expectation
    }

    pub fn reset(&mut self) {
        self.expectation = ClockExpectation::Any;
    }

    /// Validates the default clock class of a newly-begun stream.
    pub fn validate_new_stream(
        &mut self,
        clock_class: Option<&ClockClass>,
        stream_id: Option<u64>,
        stream_class_id: Option<u64>,
    ) -> Result<(), MuxerError> {
        self.validate(clock_class, stream_id, stream_class_id)
    }

    /// Validates the clock class backing a clock snapshot directly (used
    /// for `MessageIteratorInactivity` messages).
    pub fn validate_clock_class(
        &mut self,
        clock_class: &ClockClass,
        stream_id: Option<u64>,
        stream_class_id: Option<u64>,
    ) -> Result<(), MuxerError> {
        self.validate(Some(clock_class), stream_id, stream_class_id)
    }

    fn validate(
        &mut self,
        clock_class: Option<&ClockClass>,
        stream_id: Option<u64>,
        stream_class_id: Option<u64>,
    ) -> Result<(), MuxerError> {
        let observed = Self::classify(clock_class);

        if self.expectation == ClockExpectation::Any {
            tracing::debug!(?observed, "locking clock-class regime on first observation");
            self.expectation = observed;
            return Ok(());
        }

        if self.assume_absolute {
            return Ok(());
        }

        if observed == self.expectation {
            return Ok(());
        }

        tracing::warn!(
            expected = %self.expectation.describe(),
            observed = %describe_clock_class(clock_class),
            ?stream_id,
            ?stream_class_id,
            "clock class incompatible with locked regime"
        );
        Err(MuxerError::ClockIncompatible {
            expected: self.expectation.describe(),
            observed: describe_clock_class(clock_class),
            stream_id,
            stream_class_id,
        })
    }

    fn classify(clock_class: Option<&ClockClass>) -> ClockExpectation {
        match clock_class {
            None => ClockExpectation::None,
            Some(cc) if cc.origin_is_unix_epoch => ClockExpectation::Absolute,
            Some(cc) => match cc.uuid {
                Some(uuid) => ClockExpectation::RelativeWithUuid(uuid),
                None => ClockExpectation::RelativeNoUuid,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn absolute(name: &str) -> ClockClass {
        ClockClass::new(name, true, None)
    }

    fn relative_with_uuid(name: &str, uuid: [u8; 16]) -> ClockClass {
        ClockClass::new(name, false, Some(uuid))
    }

    fn relative_no_uuid(name: &str) -> ClockClass {
        ClockClass::new(name, false, None)
    }

    #[test]
    fn first_observation_locks_regime() {
        let mut policy = ClockPolicy::new(false);
        assert_eq!(policy.expectation(), &ClockExpectation::Any);
        policy.validate_new_stream(Some(&absolute("a")), None, None).unwrap();
        assert_eq!(policy.expectation(), &ClockExpectation::Absolute);
    }

    #[test]
    fn no_clock_class_locks_none() {
        let mut policy = ClockPolicy::new(false);
        policy.validate_new_stream(None, None, None).unwrap();
        assert_eq!(policy.expectation(), &ClockExpectation::None);
        // A later stream without a clock class is fine.
        policy.validate_new_stream(None, None, Some(2)).unwrap();
        // But one with a clock class now conflicts.
        assert!(policy.validate_new_stream(Some(&absolute("a")), None, Some(3)).is_err());
    }

    #[test]
    fn mismatched_absolute_vs_relative_is_rejected() {
        let mut policy = ClockPolicy::new(false);
        policy.validate_new_stream(Some(&absolute("a")), None, Some(1)).unwrap();
        let err = policy
            .validate_new_stream(Some(&relative_with_uuid("b", [1; 16])), None, Some(2))
            .unwrap_err();
        assert!(matches!(err, MuxerError::ClockIncompatible { .. }));
    }

    #[test]
    fn mismatched_uuid_is_rejected() {
        let mut policy = ClockPolicy::new(false);
        policy
            .validate_new_stream(Some(&relative_with_uuid("a", [1; 16])), None, Some(1))
            .unwrap();
        assert!(policy
            .validate_new_stream(Some(&relative_with_uuid("b", [2; 16])), None, Some(2))
            .is_err());
        // Same UUID is fine.
        policy
            .validate_new_stream(Some(&relative_with_uuid("c", [1; 16])), None, Some(3))
            .unwrap();
    }

    #[test]
    fn relative_no_uuid_vs_with_uuid_conflict() {
        let mut policy = ClockPolicy::new(false);
        policy.validate_new_stream(Some(&relative_no_uuid("a")), None, None).unwrap();
        assert!(policy
            .validate_new_stream(Some(&relative_with_uuid("b", [9; 16])), None, None)
            .is_err());
    }

    #[test]
    fn assume_absolute_skips_validation_after_first() {
        let mut policy = ClockPolicy::new(true);
        policy.validate_new_stream(Some(&absolute("a")), None, None).unwrap();
        // Would normally conflict, but the flag disables the check.
        policy
            .validate_new_stream(Some(&relative_no_uuid("b")), None, None)
            .unwrap();
    }

    #[test]
    fn reset_returns_to_any() {
        let mut policy = ClockPolicy::new(false);
        policy.validate_new_stream(Some(&absolute("a")), None, None).unwrap();
        policy.reset();
        assert_eq!(policy.expectation(), &ClockExpectation::Any);
    }
}
