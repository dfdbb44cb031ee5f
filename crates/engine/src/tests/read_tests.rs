use super::helpers::default_options;
use crate::Engine;
use config::IteratorOptions;
use tempfile::tempdir;

fn seeded_engine(dir: &std::path::Path) -> crate::Result<Engine> {
    let engine = Engine::open(default_options(dir))?;
    for (k, v) in [("a", "1"), ("b", "2"), ("c", "3"), ("ba", "4")] {
        engine.put(k.as_bytes().to_vec(), v.as_bytes().to_vec())?;
    }
    Ok(engine)
}

#[test]
fn list_keys_returns_every_live_key() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = seeded_engine(dir.path())?;

    let mut keys = engine.list_keys()?;
    keys.sort();
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"ba".to_vec(), b"c".to_vec()]);
    Ok(())
}

#[test]
fn list_keys_omits_deleted_entries() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = seeded_engine(dir.path())?;
    engine.delete(b"b")?;

    let keys = engine.list_keys()?;
    assert!(!keys.contains(&b"b".to_vec()));
    assert!(keys.contains(&b"a".to_vec()));
    Ok(())
}

#[test]
fn fold_visits_every_live_pair_and_can_stop_early() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = seeded_engine(dir.path())?;

    let mut seen = Vec::new();
    engine.fold(|k, v| {
        seen.push((k.to_vec(), v.to_vec()));
        true
    })?;
    assert_eq!(seen.len(), 4);

    let mut count = 0;
    engine.fold(|_, _| {
        count += 1;
        count < 2
    })?;
    assert_eq!(count, 2);
    Ok(())
}

#[test]
fn forward_iterator_is_sorted() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = seeded_engine(dir.path())?;

    let mut it = engine.iter(IteratorOptions::default())?;
    let mut keys = Vec::new();
    it.rewind();
    while it.valid() {
        keys.push(it.key().to_vec());
        it.next();
    }
    assert_eq!(
        keys,
        vec![b"a".to_vec(), b"b".to_vec(), b"ba".to_vec(), b"c".to_vec()]
    );
    Ok(())
}

#[test]
fn reverse_iterator_is_sorted_descending() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = seeded_engine(dir.path())?;

    let options = IteratorOptions {
        prefix: Vec::new(),
        reverse: true,
    };
    let mut it = engine.iter(options)?;
    let mut keys = Vec::new();
    it.rewind();
    while it.valid() {
        keys.push(it.key().to_vec());
        it.next();
    }
    assert_eq!(
        keys,
        vec![b"c".to_vec(), b"ba".to_vec(), b"b".to_vec(), b"a".to_vec()]
    );
    Ok(())
}

#[test]
fn prefix_filter_only_yields_matching_keys() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = seeded_engine(dir.path())?;

    let options = IteratorOptions {
        prefix: b"b".to_vec(),
        reverse: false,
    };
    let mut it = engine.iter(options)?;
    let mut keys = Vec::new();
    it.rewind();
    while it.valid() {
        keys.push(it.key().to_vec());
        it.next();
    }
    assert_eq!(keys, vec![b"b".to_vec(), b"ba".to_vec()]);
    Ok(())
}

#[test]
fn iterator_value_resolves_through_the_log() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = seeded_engine(dir.path())?;

    let mut it = engine.iter(IteratorOptions::default())?;
    it.rewind();
    assert_eq!(it.key(), b"a");
    assert_eq!(it.value()?, b"1".to_vec());
    Ok(())
}

#[test]
fn seek_positions_at_the_first_matching_key() -> crate::Result<()> {
    let dir = tempdir().unwrap();
    let engine = seeded_engine(dir.path())?;

    let mut it = engine.iter(IteratorOptions::default())?;
    it.seek(b"b");
    assert_eq!(it.key(), b"b");
    Ok(())
}
