//! # CLI - RiptideKV Interactive Shell
//!
//! A REPL-style command-line interface for the RiptideKV bitcask storage
//! engine. Reads commands from stdin, executes them against the engine, and
//! prints results to stdout. Designed for both interactive use and scripted
//! testing (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! PUT key value      Insert or update a key-value pair
//! GET key            Look up a key (prints value or "(nil)")
//! DEL key            Delete a key (writes a tombstone)
//! SCAN [prefix]      List live keys, optionally filtered by prefix
//! MERGE              Compact the data directory, reclaiming dead space
//! STAT               Print key count, file count, reclaimable/disk size
//! EXIT / QUIT        Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! RIPTIDE_DIR_PATH      Database directory          (default: "riptide-data")
//! RIPTIDE_DATA_FILE_MB  Active file rotation size    (default: 64)
//! RIPTIDE_SYNC_WRITES   fsync every append           (default: "false")
//! RIPTIDE_BYTES_PER_SYNC  Byte-budget sync threshold (default: 0 = disabled)
//! RIPTIDE_MMAP_STARTUP  Use mmap for startup rebuild (default: "false")
//! RIPTIDE_INDEX_TYPE    btree | art | bptree         (default: "btree")
//! RIPTIDE_MERGE_RATIO   Merge admission ratio        (default: 0.5)
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! RiptideKV started (dir=riptide-data, index=BTree, keys=0)
//! > PUT name Alice
//! OK
//! > GET name
//! Alice
//! > SCAN
//! name -> Alice
//! (1 entries)
//! > EXIT
//! bye
//! ```
use anyhow::{anyhow, Result};
use config::{DbOptions, IndexType, IteratorOptions};
use engine::Engine;
use std::io::{self, BufRead, Write};

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_index_type(raw: &str) -> Result<IndexType> {
    match raw.to_lowercase().as_str() {
        "btree" => Ok(IndexType::BTree),
        "art" => Ok(IndexType::Art),
        "bptree" | "b+tree" | "bplustree" => Ok(IndexType::BPlusTree),
        other => Err(anyhow!("unknown RIPTIDE_INDEX_TYPE: {other}")),
    }
}

fn options_from_env() -> Result<DbOptions> {
    let dir_path = env_or("RIPTIDE_DIR_PATH", "riptide-data").into();
    let data_file_mb: u64 = env_or("RIPTIDE_DATA_FILE_MB", "64").parse()?;
    let sync_writes: bool = env_or("RIPTIDE_SYNC_WRITES", "false").parse()?;
    let bytes_per_sync: usize = env_or("RIPTIDE_BYTES_PER_SYNC", "0").parse()?;
    let mmap_at_startup: bool = env_or("RIPTIDE_MMAP_STARTUP", "false").parse()?;
    let index_type = parse_index_type(&env_or("RIPTIDE_INDEX_TYPE", "btree"))?;
    let data_file_merge_ratio: f32 = env_or("RIPTIDE_MERGE_RATIO", "0.5").parse()?;

    Ok(DbOptions {
        dir_path,
        data_file_size: data_file_mb * 1024 * 1024,
        sync_writes,
        bytes_per_sync,
        mmap_at_startup,
        index_type,
        data_file_merge_ratio,
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let options = options_from_env()?;
    let dir_path = options.dir_path.clone();
    let index_type = options.index_type;
    let engine = Engine::open(options)?;

    println!(
        "RiptideKV started (dir={}, index={:?}, keys={})",
        dir_path.display(),
        index_type,
        engine.stat()?.key_num
    );
    println!("Commands: PUT key value | GET key | DEL key | SCAN [prefix]");
    println!("          MERGE | STAT | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "PUT" => {
                    if let Some(k) = parts.next() {
                        let v: String = parts.collect::<Vec<&str>>().join(" ");
                        if v.is_empty() {
                            println!("ERR usage: PUT key value");
                        } else {
                            match engine.put(k.as_bytes().to_vec(), v.as_bytes().to_vec()) {
                                Ok(()) => println!("OK"),
                                Err(e) => println!("ERR put failed: {}", e),
                            }
                        }
                    } else {
                        println!("ERR usage: PUT key value");
                    }
                }
                "GET" => {
                    if let Some(k) = parts.next() {
                        match engine.get(k.as_bytes()) {
                            Ok(v) => println!("{}", String::from_utf8_lossy(&v)),
                            Err(engine::Errors::KeyNotFound) => println!("(nil)"),
                            Err(e) => println!("ERR get failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: GET key");
                    }
                }
                "DEL" => {
                    if let Some(k) = parts.next() {
                        match engine.delete(k.as_bytes()) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR del failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: DEL key");
                    }
                }
                "SCAN" => {
                    let prefix = parts.next().unwrap_or("").as_bytes().to_vec();
                    let options = IteratorOptions {
                        prefix,
                        reverse: false,
                    };
                    match engine.iter(options) {
                        Ok(mut it) => {
                            let mut count = 0usize;
                            it.rewind();
                            while it.valid() {
                                match it.value() {
                                    Ok(v) => println!(
                                        "{} -> {}",
                                        String::from_utf8_lossy(it.key()),
                                        String::from_utf8_lossy(&v)
                                    ),
                                    Err(e) => println!("ERR scan failed: {}", e),
                                }
                                count += 1;
                                it.next();
                            }
                            if count == 0 {
                                println!("(empty)");
                            } else {
                                println!("({} entries)", count);
                            }
                        }
                        Err(e) => println!("ERR scan failed: {}", e),
                    }
                }
                "MERGE" => match engine.merge() {
                    Ok(()) => println!("OK (merge committed, reopen to see reclaimed space)"),
                    Err(e) => println!("ERR merge failed: {}", e),
                },
                "STAT" => match engine.stat() {
                    Ok(stat) => println!(
                        "keys={} files={} reclaim_size={} disk_size={}",
                        stat.key_num, stat.data_file_num, stat.reclaim_size, stat.disk_size
                    ),
                    Err(e) => println!("ERR stat failed: {}", e),
                },
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("unknown command: {}", other);
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}
