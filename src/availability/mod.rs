//! Service availability polling.
//!
//! - [`PollPolicy`]: retry spacing and total budget
//! - [`AvailabilityPoller`]: the bounded retry loop
//! - [`AvailabilityProbe`]: what gets polled
//! - [`Clock`]: injectable time source

mod clock;
mod policy;
mod poller;
mod probe;

pub use clock::{Clock, TokioClock};
pub use policy::{Backoff, PollPolicy};
pub use poller::{AvailabilityPoller, PollStats};
pub use probe::{ApiPathProbe, AvailabilityProbe, METRICS_API_PATH, ProbeError};

#[cfg(test)]
pub use probe::MockAvailabilityProbe;
