use thiserror::Error;

/// Returned by the `from_config` constructors when a tuning parameter
/// would make the policy meaningless.
///
/// A capacity of zero is deliberately not an error: such a cache accepts
/// every call and simply never stores anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("LRU-K admission threshold `k` must be at least 1")]
    ZeroK,
    #[error("LFU `max_average_num` must be at least 1")]
    ZeroMaxAverage,
    #[error("ARC `transform_threshold` must be at least 1")]
    ZeroTransformThreshold,
}
