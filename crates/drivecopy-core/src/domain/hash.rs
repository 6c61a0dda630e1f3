//! Local content hashing
//!
//! Drive reports an MD5 checksum for every stored file, so local files are
//! hashed with the same algorithm to verify transfers and detect content
//! that is already in sync.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};
use tracing::debug;

use super::newtypes::ContentHash;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Computes the MD5 digest of the file at `path`
pub fn compute_file_hash(path: &Path) -> io::Result<ContentHash> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let hex = format!("{:x}", hasher.finalize());
    debug!(path = %path.display(), hash = %hex, "computed local MD5");

    ContentHash::new(hex).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
