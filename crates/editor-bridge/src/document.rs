/// An engine document, identified by the pointer the engine hands out.
///
/// The handle does not own a reference by itself; use
/// [`crate::editor::Editor::add_ref_document`] and
/// [`crate::editor::Editor::release_document`] to manage the engine's count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Document(usize);

impl Document {
    /// Returns `None` for the null document.
    #[must_use]
    pub fn from_pointer(pointer: usize) -> Option<Self> {
        (pointer != 0).then_some(Self(pointer))
    }

    #[inline]
    #[must_use]
    pub fn pointer(&self) -> usize {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn as_word(&self) -> isize {
        bridge_core::dispatch::to_word(self.0)
    }
}
