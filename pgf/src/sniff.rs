use std::io::{Read, Seek};

use pcore::stream::CursorGuard;

use crate::magic::read_magic;

/// Check the leading signature and version at the current position.
///
/// Never fails: unreadable or foreign streams are simply not PGF. The
/// position is restored unless the stream matched and `advance` is set, in
/// which case it is left after the 4 magic bytes.
pub fn is_pgf_type<S: Read + Seek + ?Sized>(stream: &mut S, advance: bool) -> bool {
    let mut guard = match CursorGuard::new(stream) {
        Ok(guard) => guard,
        Err(_) => return false,
    };

    let matched = read_magic(&mut *guard).is_ok();
    if matched && advance {
        guard.keep();
    }
    matched
}
