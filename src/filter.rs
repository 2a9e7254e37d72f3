//! The component-facing half of the muxer: configuration and the dynamic
//! set of input ports.

use std::collections::HashMap;

use crate::cursor::UpstreamIterator;
use crate::error::MuxerError;
use crate::iterator::MuxerIterator;

const ASSUME_ABSOLUTE_CLOCK_CLASSES_PARAM: &str = "assume-absolute-clock-classes";

/// A single recognized configuration value. A real framework's parameter
/// object supports many more shapes (strings, maps, arrays); this crate
/// only needs to recognize booleans, so that's all `ConfigValue` models.
#[derive(Debug, Clone)]
pub enum ConfigValue {
    Bool(bool),
    Other,
}

/// Parsed muxer configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    pub assume_absolute_clock_classes: bool,
}

impl Config {
    /// Reads recognized options out of a parameter mapping. Unknown keys
    /// are ignored; a non-bool value for a recognized key is fatal.
    pub fn from_params(params: &HashMap<String, ConfigValue>) -> Result<Self, MuxerError> {
        let assume_absolute_clock_classes = match params.get(ASSUME_ABSOLUTE_CLOCK_CLASSES_PARAM) {
            None => false,
            Some(ConfigValue::Bool(b)) => *b,
            Some(ConfigValue::Other) => {
                return Err(MuxerError::ConfigInvalid(format!(
                    "'{ASSUME_ABSOLUTE_CLOCK_CLASSES_PARAM}' must be a boolean"
                )));
            },
        };

        Ok(Self {
            assume_absolute_clock_classes,
        })
    }
}

/// An input port, named `"in<N>"`, and whether anything is connected to
/// it.
#[derive(Debug, Clone)]
struct InputPort {
    name: String,
    connected: bool,
}

/// Owns the muxer's configuration and dynamic input-port set, and builds a
/// [`MuxerIterator`] once a downstream subscriber requests one.
pub struct MuxerFilter {
    config: Config,
    next_port_id: u64,
    ports: Vec<InputPort>,
    /// Guards against a re-entrant `message_iterator_init` call, which
    /// would otherwise be free to observe a half-constructed port set.
    building: bool,
}

impl MuxerFilter {
    /// Creates the fixed output port `"out"` (implicit — this crate models
    /// only the input side) and one spare input port, `"in0"`.
    pub fn new(config: Config) -> Self {
        let mut filter = Self {
            config,
            next_port_id: 0,
            ports: Vec::new(),
            building: false,
        };
        filter.add_spare_port();
        filter
    }

    /// Parses `params` and constructs the filter, per the component
    /// contract's `init`.
    pub fn init(params: &HashMap<String, ConfigValue>) -> Result<Self, MuxerError> {
        Ok(Self::new(Config::from_params(params)?))
    }

    pub fn assume_absolute_clock_classes(&self) -> bool {
        self.config.assume_absolute_clock_classes
    }

    /// Names of every input port, in creation order.
    pub fn input_ports(&self) -> impl Iterator<Item = &str> {
        self.ports.iter().map(|p| p.name.as_str())
    }

    fn add_spare_port(&mut self) {
        let name = format!("in{}", self.next_port_id);
        self.next_port_id += 1;
        self.ports.push(InputPort { name, connected: false });
    }

    /// Marks `port` connected and, preserving the invariant that exactly
    /// one spare input port is always available, adds a fresh one.
    pub fn on_input_port_connected(&mut self, port: &str) -> Result<(), MuxerError> {
        let target = self
            .ports
            .iter_mut()
            .find(|p| p.name == port)
            .ok_or_else(|| MuxerError::ConfigInvalid(format!("unknown input port '{port}'")))?;
        target.connected = true;
        tracing::debug!(port, "input port connected");
        self.add_spare_port();
        Ok(())
    }

    /// Builds a [`MuxerIterator`] over every connected input port's
    /// upstream iterator. `create_upstream` constructs the upstream
    /// iterator for a given connected port name; this crate doesn't model
    /// the rest of the processing graph, so that construction is left to
    /// the caller.
    pub fn message_iterator_init(
        &mut self,
        mut create_upstream: impl FnMut(&str) -> Result<Box<dyn UpstreamIterator>, MuxerError>,
    ) -> Result<MuxerIterator, MuxerError> {
        if self.building {
            tracing::warn!("rejecting re-entrant message iterator construction");
            return Err(MuxerError::ConfigInvalid(
                "recursive message iterator construction".to_string(),
            ));
        }
        self.building = true;

        let result = (|| {
            let mut upstreams = Vec::new();
            for port in self.ports.iter().filter(|p| p.connected) {
                upstreams.push(create_upstream(&port.name)?);
            }
            tracing::debug!(connected = upstreams.len(), "built message iterator");
            Ok(MuxerIterator::new(upstreams, self.config.assume_absolute_clock_classes))
        })();

        self.building = false;
        result
    }

    /// Releases any resources held by the filter. This crate holds none
    /// beyond its own fields, so this is a no-op; kept to mirror the
    /// component contract's `finalize`.
    pub fn finalize(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{
        SeekOutcome,
        UpstreamNext,
    };

    struct EmptyUpstream;
    impl UpstreamIterator for EmptyUpstream {
        fn next(&mut self, _capacity: usize) -> Result<UpstreamNext, MuxerError> {
            Ok(UpstreamNext::End)
        }

        fn can_seek_beginning(&self) -> bool {
            true
        }

        fn seek_beginning(&mut self) -> Result<SeekOutcome, MuxerError> {
            Ok(SeekOutcome::Done)
        }
    }

    #[test]
    fn starts_with_one_spare_port() {
        let filter = MuxerFilter::new(Config::default());
        assert_eq!(filter.input_ports().collect::<Vec<_>>(), vec!["in0"]);
    }

    #[test]
    fn connecting_a_port_adds_a_spare() {
        let mut filter = MuxerFilter::new(Config::default());
        filter.on_input_port_connected("in0").unwrap();
        assert_eq!(filter.input_ports().collect::<Vec<_>>(), vec!["in0", "in1"]);
    }

    #[test]
    fn connecting_unknown_port_is_an_error() {
        let mut filter = MuxerFilter::new(Config::default());
        assert!(filter.on_input_port_connected("in99").is_err());
    }

    #[test]
    fn config_rejects_non_bool_value() {
        let mut params = HashMap::new();
        params.insert(ASSUME_ABSOLUTE_CLOCK_CLASSES_PARAM.to_string(), ConfigValue::Other);
        assert!(Config::from_params(&params).is_err());
    }

    #[test]
    fn config_ignores_unknown_keys() {
        let mut params = HashMap::new();
        params.insert("some-unrelated-option".to_string(), ConfigValue::Bool(true));
        let config = Config::from_params(&params).unwrap();
        assert!(!config.assume_absolute_clock_classes);
    }

    #[test]
    fn zero_connected_inputs_builds_an_iterator_that_ends_immediately() {
        let mut filter = MuxerFilter::new(Config::default());
        let mut iter = filter
            .message_iterator_init(|_| Ok(Box::new(EmptyUpstream) as Box<dyn UpstreamIterator>))
            .unwrap();
        let (batch, status) = iter.next(8).unwrap();
        assert!(batch.is_empty());
        assert_eq!(status, Some(crate::iterator::NextBatchStatus::End));
    }
}
