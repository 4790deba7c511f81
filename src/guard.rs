use core::fmt;

use crate::local::LocalHandle;

////////////////////////////////////////////////////////////////////////////////////////////////////
// Guard
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A scoped protection, that clears its handle's hazard slot when dropped.
///
/// While the guard is alive the handle can not be used to protect anything
/// else, since it is mutably borrowed.
pub struct Guard<'h, 'd> {
    handle: &'h LocalHandle<'d>,
}

/********** impl inherent *************************************************************************/

impl<'h, 'd> Guard<'h, 'd> {
    #[inline]
    pub(crate) fn new(handle: &'h mut LocalHandle<'d>) -> Self {
        Self { handle }
    }

    /// Returns the protected address or `null`.
    #[inline]
    pub fn protected(&self) -> *const () {
        self.handle.protected()
    }

    /// Clears the protection right away.
    ///
    /// This is the same as dropping the guard.
    #[inline]
    pub fn release(self) {}
}

/********** impl Debug ****************************************************************************/

impl fmt::Debug for Guard<'_, '_> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Guard").field("protected", &self.protected()).finish()
    }
}

/********** impl Drop *****************************************************************************/

impl Drop for Guard<'_, '_> {
    #[inline]
    fn drop(&mut self) {
        self.handle.clear();
    }
}
