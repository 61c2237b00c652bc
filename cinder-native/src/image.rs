use std::ffi::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::ptr;

use cinder_core::{CoreError, ENTRY_POINT, ExecutionError};
use libloading::{Library, Symbol};
use tracing::debug;

type EntryPoint = unsafe extern "C" fn(c_int, *const *const c_char) -> c_int;

/// A linked shared object loaded into this process.
///
/// Dropping the image unloads it.
#[derive(Debug)]
pub struct CcImage {
    library: Library,
    path: PathBuf,
}

impl CcImage {
    pub(crate) fn load(path: PathBuf) -> Result<Self, CoreError> {
        // SAFETY: the object was just linked from the session's own units;
        // running its initialisers is the point of loading it.
        let library = unsafe { Library::new(&path) }.map_err(|err| ExecutionError::Load {
            message: err.to_string(),
        })?;
        debug!(image = %path.display(), "linked image loaded");
        Ok(Self { library, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Calls `main(0, {NULL})`.
    pub(crate) fn call_entry_point(&self) -> Result<i32, CoreError> {
        // SAFETY: `main` is declared by C as `int main(void)` or
        // `int main(int, char **)`; both accept this call under the C ABI.
        let entry: Symbol<EntryPoint> = unsafe { self.library.get(ENTRY_POINT.as_bytes()) }
            .map_err(|_| ExecutionError::MissingEntryPoint {
                symbol: ENTRY_POINT.to_string(),
            })?;
        let argv: [*const c_char; 1] = [ptr::null()];
        // SAFETY: arbitrary user code; the trust boundary is the caller's.
        let result = unsafe { entry(0, argv.as_ptr()) };
        Ok(result)
    }
}
