use super::helpers::default_options;
use crate::{Engine, Errors};
use config::IndexType;
use tempfile::tempdir;

// --------------------- Basic put / get / delete ---------------------

#[test]
fn put_and_get() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = Engine::open(default_options(dir.path()))?;

    engine.put(b"name".to_vec(), b"alice".to_vec())?;
    assert_eq!(engine.get(b"name")?, b"alice".to_vec());
    Ok(())
}

#[test]
fn get_missing_key() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = Engine::open(default_options(dir.path()))?;

    let err = engine.get(b"nope").unwrap_err();
    assert!(matches!(err, Errors::KeyNotFound));
    Ok(())
}

#[test]
fn delete_removes_key() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = Engine::open(default_options(dir.path()))?;

    engine.put(b"k".to_vec(), b"v".to_vec())?;
    assert!(engine.get(b"k").is_ok());

    engine.delete(b"k")?;
    assert!(matches!(engine.get(b"k").unwrap_err(), Errors::KeyNotFound));
    Ok(())
}

#[test]
fn delete_of_missing_key_is_a_noop() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = Engine::open(default_options(dir.path()))?;

    engine.delete(b"never-written")?;
    Ok(())
}

#[test]
fn overwrite_key_is_last_writer_wins() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = Engine::open(default_options(dir.path()))?;

    engine.put(b"k".to_vec(), b"v1".to_vec())?;
    engine.put(b"k".to_vec(), b"v2".to_vec())?;
    assert_eq!(engine.get(b"k")?, b"v2".to_vec());
    Ok(())
}

#[test]
fn put_after_delete_resurrects() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = Engine::open(default_options(dir.path()))?;

    engine.put(b"k".to_vec(), b"v1".to_vec())?;
    engine.delete(b"k")?;
    engine.put(b"k".to_vec(), b"v2".to_vec())?;
    assert_eq!(engine.get(b"k")?, b"v2".to_vec());
    Ok(())
}

#[test]
fn put_rejects_empty_key() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = Engine::open(default_options(dir.path()))?;

    let result = engine.put(Vec::new(), b"value".to_vec());
    assert!(matches!(result, Err(Errors::KeyIsEmpty)));
    Ok(())
}

#[test]
fn delete_rejects_empty_key() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = Engine::open(default_options(dir.path()))?;

    let result = engine.delete(&[]);
    assert!(matches!(result, Err(Errors::KeyIsEmpty)));
    Ok(())
}

// --------------------- Active file rotation ---------------------

#[test]
fn writes_past_data_file_size_rotate_into_a_new_active_file() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let mut options = default_options(dir.path());
    options.data_file_size = 256;
    let engine = Engine::open(options)?;

    for i in 0..64u32 {
        engine.put(format!("key-{i:04}").into_bytes(), vec![b'v'; 32])?;
    }

    let stat = engine.stat()?;
    assert!(
        stat.data_file_num > 1,
        "expected rotation to have produced more than one data file, got {}",
        stat.data_file_num
    );
    for i in 0..64u32 {
        assert_eq!(
            engine.get(format!("key-{i:04}").as_bytes())?,
            vec![b'v'; 32]
        );
    }
    Ok(())
}

// --------------------- Index backend parity ---------------------

#[test]
fn art_backend_matches_btree_semantics() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = super::open_with(dir.path(), IndexType::Art)?;

    engine.put(b"a".to_vec(), b"1".to_vec())?;
    engine.put(b"b".to_vec(), b"2".to_vec())?;
    engine.delete(b"a")?;
    assert!(matches!(engine.get(b"a").unwrap_err(), Errors::KeyNotFound));
    assert_eq!(engine.get(b"b")?, b"2".to_vec());
    Ok(())
}

#[test]
fn bplus_tree_backend_matches_btree_semantics() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = super::open_with(dir.path(), IndexType::BPlusTree)?;

    engine.put(b"a".to_vec(), b"1".to_vec())?;
    engine.put(b"b".to_vec(), b"2".to_vec())?;
    engine.delete(b"a")?;
    assert!(matches!(engine.get(b"a").unwrap_err(), Errors::KeyNotFound));
    assert_eq!(engine.get(b"b")?, b"2".to_vec());
    Ok(())
}
