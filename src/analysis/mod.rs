//! Frequency analysis of the emitted signal.
//!
//! The renderer copies every output pair into an [`AnalysisTap`]; a
//! [`FrequencyAnalyser`] thread reads fixed windows from the other end,
//! estimates the dominant frequency of each channel and publishes the pair to
//! every registered [`FrequencyListener`].

pub mod analyser;
pub mod estimator;
pub mod frequency;
pub mod tap;

pub use analyser::{window_len, FrequencyAnalyser, ListenerRegistry};
pub use estimator::PeakEstimator;
pub use frequency::{FrequencyCell, FrequencyListener, FrequencySnapshot};
pub use tap::{analysis_channel, AnalysisInput, AnalysisTap};
