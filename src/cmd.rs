use std::ffi::{CString, NulError};
use std::io;
use std::os::raw::c_char;

/// Command to execute in the tracee role after [`Tracer::fork`].
///
/// The argument vector is converted to owned NUL-terminated strings up
/// front, so the child role can exec without allocating between `fork`
/// and `exec`.
///
/// [`Tracer::fork`]: crate::Tracer::fork
#[derive(Clone, Debug)]
pub struct Command {
    /// Argument vector to pass to `execvp()`.
    argv: Vec<CString>,
}

impl Command {
    pub fn new(argv: Vec<impl Into<Vec<u8>>>) -> Result<Self, NulError> {
        if argv.is_empty() {
            panic!("Command exe required");
        }

        let argv: Result<Vec<_>, _> = argv.into_iter().map(CString::new).collect();
        let argv = argv?;

        Ok(Self { argv })
    }

    /// Replace the current process image, resolving `argv[0]` against
    /// `PATH` and inheriting the environment.
    ///
    /// Only returns if the exec failed; the child role should report the
    /// error and `_exit` without unwinding back into the tracer's code.
    pub fn exec(&self) -> io::Error {
        let argv = NullTerminatedPointerArray::new(&self.argv);

        unsafe {
            libc::execvp(argv[0], argv.as_ptr());
        }

        io::Error::last_os_error()
    }
}

// View of a slice of `CString` values, as a null-terminated array of
// pointers to `c_char`. For passing args to `execvp()`.
struct NullTerminatedPointerArray<'a> {
    // Owned pointer array which must always be NULL-terminated.
    array: Vec<*const libc::c_char>,

    // Borrow of pointed-to `CString` data. Pointers in `array` are valid
    // only while we have this borrow.
    _data: &'a [CString],
}

impl<'a> NullTerminatedPointerArray<'a> {
    pub fn new(data: &'a [CString]) -> Self {
        let mut array: Vec<_> = data.iter().map(|s| s.as_ptr()).collect();
        array.push(std::ptr::null());

        Self { array, _data: data }
    }
}

impl<'a> std::ops::Deref for NullTerminatedPointerArray<'a> {
    type Target = [*const c_char];

    fn deref(&self) -> &Self::Target {
        &self.array
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_array_is_null_terminated() {
        let argv = vec![CString::new("echo").unwrap(), CString::new("hi").unwrap()];
        let array = NullTerminatedPointerArray::new(&argv);

        assert_eq!(array.len(), 3);
        assert!(array[2].is_null());
        assert!(!array[0].is_null());
    }

    #[test]
    fn interior_nul_is_rejected() {
        assert!(Command::new(vec![&b"a\0b"[..]]).is_err());
    }
}
