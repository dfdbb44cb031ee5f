use crate::Engine;
use config::{DbOptions, IndexType};
use std::path::Path;

/// Default test options rooted at `dir`: a small `data_file_size` so tests
/// can force rotation without writing megabytes of filler.
pub(crate) fn default_options(dir: &Path) -> DbOptions {
    DbOptions {
        dir_path: dir.to_path_buf(),
        data_file_size: 64 * 1024,
        sync_writes: false,
        bytes_per_sync: 0,
        mmap_at_startup: false,
        index_type: IndexType::BTree,
        data_file_merge_ratio: 0.5,
    }
}

/// Opens an engine at `dir` with `index_type` substituted into the default
/// options, for tests that need to exercise a specific index backend.
pub(crate) fn open_with(dir: &Path, index_type: IndexType) -> crate::Result<Engine> {
    let mut options = default_options(dir);
    options.index_type = index_type;
    Engine::open(options)
}
