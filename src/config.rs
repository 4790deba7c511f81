//! Types for configuring the capacity and reclamation frequency of a
//! [`Domain`][crate::Domain].

include!(concat!(env!("OUT_DIR"), "/build_constants.rs"));

////////////////////////////////////////////////////////////////////////////////////////////////////
// Config
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Runtime configuration parameters.
///
/// The defaults can be changed at build time through the
/// `HAZARD_RECLAIM_CAPACITY` and `HAZARD_RECLAIM_SCAN_THRESHOLD` environment
/// variables.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Config {
    capacity: usize,
    scan_threshold: u32,
}

/********** impl Default **************************************************************************/

impl Default for Config {
    #[inline]
    fn default() -> Self {
        ConfigBuilder::new().build()
    }
}

/********** impl inherent *************************************************************************/

impl Config {
    /// Creates a new [`Config`] with the given parameters.
    ///
    /// # Panics
    ///
    /// This function panics, if either `capacity` or `scan_threshold` is 0.
    #[inline]
    pub fn with_params(capacity: usize, scan_threshold: u32) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        assert!(scan_threshold > 0, "scan threshold must be greater than 0");
        Self { capacity, scan_threshold }
    }

    /// Returns the number of hazard slots, which is the maximum number of
    /// handles that can exist at the same time.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the scan threshold.
    ///
    /// Every call to
    /// [`retire_and_maybe_reclaim`][crate::LocalHandle::retire_and_maybe_reclaim]
    /// counts towards this threshold.
    /// Once it is reached, the handle initiates a reclamation pass.
    #[inline]
    pub fn scan_threshold(&self) -> u32 {
        self.scan_threshold
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// ConfigBuilder
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A builder type for gradually initializing a [`Config`].
#[derive(Copy, Clone, Debug, Default)]
pub struct ConfigBuilder {
    capacity: Option<usize>,
    scan_threshold: Option<u32>,
}

impl ConfigBuilder {
    /// Creates a new [`ConfigBuilder`] with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of hazard slots.
    #[inline]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Sets the scan threshold.
    #[inline]
    pub fn scan_threshold(mut self, scan_threshold: u32) -> Self {
        self.scan_threshold = Some(scan_threshold);
        self
    }

    /// Consumes the [`ConfigBuilder`] and returns a initialized [`Config`].
    ///
    /// Unspecified parameters are initialized with their default values.
    ///
    /// # Panics
    ///
    /// Panics if any parameter was explicitly set to 0.
    #[inline]
    pub fn build(self) -> Config {
        Config::with_params(
            self.capacity.unwrap_or(DEFAULT_CAPACITY),
            self.scan_threshold.unwrap_or(DEFAULT_SCAN_THRESHOLD),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigBuilder, DEFAULT_CAPACITY, DEFAULT_SCAN_THRESHOLD};

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.capacity(), DEFAULT_CAPACITY);
        assert_eq!(config.scan_threshold(), DEFAULT_SCAN_THRESHOLD);
    }

    #[test]
    fn builder_keeps_unset_defaults() {
        let config = ConfigBuilder::new().capacity(4).build();
        assert_eq!(config.capacity(), 4);
        assert_eq!(config.scan_threshold(), DEFAULT_SCAN_THRESHOLD);
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than 0")]
    fn zero_capacity() {
        let _ = ConfigBuilder::new().capacity(0).build();
    }

    #[test]
    #[should_panic(expected = "scan threshold must be greater than 0")]
    fn zero_scan_threshold() {
        let _ = Config::with_params(1, 0);
    }
}
