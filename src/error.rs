use std::error;
use std::fmt;

/// A specialized [`Result`][core::result::Result] for hazard pointer
/// operations.
pub type Result<T> = core::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////////////////
// Error
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Error type for claiming hazard slots.
///
/// Failed compare-and-swap attempts are retried internally and never surface
/// as errors.
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Error {
    /// Every slot of the hazard table is owned by a live handle.
    ///
    /// The claim is not retried, the caller decides whether to retry later,
    /// wait or fail its own operation.
    ResourceExhausted {
        /// The fixed number of slots in the exhausted table.
        capacity: usize,
    },
}

/********** impl Display **************************************************************************/

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::ResourceExhausted { capacity } => {
                write!(f, "all {} hazard slots are owned by live handles", capacity)
            }
        }
    }
}

/********** impl Error ****************************************************************************/

impl error::Error for Error {}
