//! The synchronous call bridge to the engine.
//!
//! Everything the bridge asks of the engine goes through [`Dispatch::send`].
//! The engine may deliver notifications back to the host while `send` is
//! still running, so implementors must never hold borrows across the call.

use std::ffi::c_void;

/// The engine's single exported entry point.
pub type DirectFunction = unsafe extern "system" fn(*mut c_void, u32, usize, isize) -> isize;

/// `send(code, word1, word2) -> word`. Decoding the result is the caller's job.
pub trait Dispatch {
    fn send(&self, code: u32, w_param: usize, l_param: isize) -> isize;
}

impl<T: Dispatch + ?Sized> Dispatch for std::rc::Rc<T> {
    #[inline]
    fn send(&self, code: u32, w_param: usize, l_param: isize) -> isize {
        (**self).send(code, w_param, l_param)
    }
}

/// Converts a byte position or length into the signed word the engine expects.
#[inline]
#[must_use]
pub fn to_word(value: usize) -> isize {
    isize::try_from(value).unwrap_or(isize::MAX)
}

/// Converts an engine reply into an unsigned value; negative replies clamp to zero.
#[inline]
#[must_use]
pub fn from_word(value: isize) -> usize {
    usize::try_from(value).unwrap_or(0)
}

/// Typed wrappers for the messages the index and translator rely on.
pub trait DispatchExt: Dispatch {
    #[inline]
    fn line_count(&self) -> usize {
        from_word(self.send(crate::protocol::SCI_GETLINECOUNT, 0, 0)).max(1)
    }

    /// Byte length of `line` including its line ending.
    #[inline]
    fn line_length(&self, line: usize) -> usize {
        from_word(self.send(crate::protocol::SCI_LINELENGTH, line, 0))
    }

    #[inline]
    fn position_from_line(&self, line: usize) -> usize {
        from_word(self.send(crate::protocol::SCI_POSITIONFROMLINE, line, 0))
    }

    /// Total document length in bytes.
    #[inline]
    fn byte_length(&self) -> usize {
        from_word(self.send(crate::protocol::SCI_GETLENGTH, 0, 0))
    }

    #[inline]
    fn doc_pointer(&self) -> usize {
        from_word(self.send(crate::protocol::SCI_GETDOCPOINTER, 0, 0))
    }

    /// Copies the bytes in `start..end` out of the engine into an owned buffer.
    fn text_range(&self, start: usize, end: usize) -> Vec<u8> {
        if end <= start {
            return Vec::new();
        }

        let len = end - start;
        // Room for the terminating NUL the engine always writes.
        let mut buf = vec![0u8; len + 1];
        let mut range = crate::protocol::TextRangeFull {
            chrg: crate::protocol::CharacterRangeFull {
                cp_min: to_word(start),
                cp_max: to_word(end),
            },
            text: buf.as_mut_ptr().cast(),
        };
        let copied = from_word(self.send(
            crate::protocol::SCI_GETTEXTRANGEFULL,
            0,
            std::ptr::addr_of_mut!(range) as isize,
        ));

        buf.truncate(copied.min(len));

        buf
    }
}

impl<T: Dispatch + ?Sized> DispatchExt for T {}

/*

===========================
===== THREAD AFFINITY =====
===========================

*/

/// Remembers the thread that bound the engine. The engine does no locking of
/// its own, so every call has to come from that thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: std::thread::ThreadId,
}

impl ThreadAffinity {
    #[must_use]
    pub fn current() -> Self {
        Self {
            owner: std::thread::current().id(),
        }
    }

    #[inline]
    #[must_use]
    pub fn owner(&self) -> std::thread::ThreadId {
        self.owner
    }

    /// # Errors
    ///
    /// Returns [`crate::errors::BridgeError::WrongThread`] when called off the owner thread.
    #[inline]
    pub fn check(&self) -> crate::errors::BridgeResult<()> {
        let caller = std::thread::current().id();

        if caller == self.owner {
            Ok(())
        } else {
            Err(crate::errors::BridgeError::WrongThread {
                owner: self.owner,
                caller,
            })
        }
    }

    /// # Panics
    ///
    /// Panics when called off the owner thread.
    #[inline]
    pub fn enforce(&self) {
        if let Err(err) = self.check() {
            panic!("{err}");
        }
    }
}

/*

=============================
===== DIRECT DISPATCHER =====
=============================

*/

/// Opaque pointer identifying one engine instance, obtained by the hosting shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineHandle(std::ptr::NonNull<c_void>);

impl EngineHandle {
    /// Returns `None` for a null pointer.
    #[must_use]
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        std::ptr::NonNull::new(ptr).map(Self)
    }

    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Calls straight into the engine's entry point for one engine instance.
#[derive(Debug)]
pub struct DirectDispatcher {
    function: DirectFunction,
    handle: EngineHandle,
    affinity: ThreadAffinity,
}

impl DirectDispatcher {
    /// Binds `function` to `handle` on the current thread.
    ///
    /// # Safety
    ///
    /// `function` must be the engine's direct entry point and `handle` must
    /// identify an engine instance that outlives the dispatcher.
    #[must_use]
    pub unsafe fn new(function: DirectFunction, handle: EngineHandle) -> Self {
        Self {
            function,
            handle,
            affinity: ThreadAffinity::current(),
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }
}

impl Dispatch for DirectDispatcher {
    /// # Panics
    ///
    /// Panics when called from a thread other than the one that created the dispatcher.
    fn send(&self, code: u32, w_param: usize, l_param: isize) -> isize {
        self.affinity.enforce();

        // SAFETY: the constructor's contract guarantees a live engine instance
        // behind `handle` and a matching entry point.
        let result = unsafe { (self.function)(self.handle.as_ptr(), code, w_param, l_param) };

        tracing::trace!(code, w_param, l_param, result, "send");

        result
    }
}
