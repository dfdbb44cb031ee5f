use super::*;
use tempfile::tempdir;

#[test]
fn file_io_round_trips_positioned_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000000000.data");
    let mut io = FileIo::new(&path).unwrap();

    io.write(b"hello").unwrap();
    io.write(b"world").unwrap();
    assert_eq!(io.size().unwrap(), 10);

    let mut buf = [0u8; 5];
    io.read_at(&mut buf, 0).unwrap();
    assert_eq!(&buf, b"hello");
    io.read_at(&mut buf, 5).unwrap();
    assert_eq!(&buf, b"world");
}

#[test]
fn file_io_read_at_clamps_at_eof() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000000000.data");
    let mut io = FileIo::new(&path).unwrap();
    io.write(b"abc").unwrap();

    let mut buf = [0u8; 10];
    let n = io.read_at(&mut buf, 0).unwrap();
    assert_eq!(n, 3);
    assert_eq!(&buf[..3], b"abc");
}

#[test]
fn mmap_io_reads_existing_contents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000000000.data");
    {
        let mut io = FileIo::new(&path).unwrap();
        io.write(b"mapped-bytes").unwrap();
        io.sync().unwrap();
    }

    let mmap_io = MmapIo::new(&path).unwrap();
    assert_eq!(mmap_io.size().unwrap(), 12);
    let mut buf = [0u8; 6];
    mmap_io.read_at(&mut buf, 0).unwrap();
    assert_eq!(&buf, b"mapped");
}

#[test]
fn mmap_io_rejects_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000000000.data");
    FileIo::new(&path).unwrap();

    let mut mmap_io = MmapIo::new(&path).unwrap();
    assert!(matches!(mmap_io.write(b"x"), Err(IoError::ReadOnly)));
    assert!(matches!(mmap_io.sync(), Err(IoError::ReadOnly)));
}

#[test]
fn mmap_io_handles_empty_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000000000.data");
    FileIo::new(&path).unwrap();

    let mmap_io = MmapIo::new(&path).unwrap();
    assert_eq!(mmap_io.size().unwrap(), 0);
    let mut buf = [0u8; 4];
    assert_eq!(mmap_io.read_at(&mut buf, 0).unwrap(), 0);
}

#[test]
fn new_io_manager_selects_backend() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000000000.data");
    let mut standard = new_io_manager(&path, IoType::Standard).unwrap();
    standard.write(b"xyz").unwrap();
    standard.sync().unwrap();
    drop(standard);

    let mapped = new_io_manager(&path, IoType::ReadOnlyMapped).unwrap();
    assert_eq!(mapped.size().unwrap(), 3);
}
