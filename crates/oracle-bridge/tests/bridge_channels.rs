//! End-to-end cycles over real files and named pipes.

use oracle_bridge::{BridgeConfig, CycleStats, MalformedPolicy, OracleBridge};
use std::path::Path;
use tempfile::TempDir;

const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn config(dir: &Path, cycles: u64) -> BridgeConfig {
    BridgeConfig {
        inbound: dir.join("in"),
        outbound: dir.join("out"),
        on_malformed: MalformedPolicy::Reply,
        max_cycles: Some(cycles),
    }
}

#[test]
fn regular_files_are_served_in_one_cycle() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), 1);
    std::fs::write(&config.inbound, format!("{}\nbogus\n", STARTPOS)).unwrap();

    let stats = OracleBridge::new(config.clone()).run();

    assert_eq!(std::fs::read_to_string(&config.outbound).unwrap(), "20\nerror\n");
    assert_eq!(
        stats,
        CycleStats {
            answered: 1,
            malformed: 1
        }
    );
}

#[test]
fn missing_inbound_is_retried_not_fatal() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), 2);

    let stats = OracleBridge::new(config.clone()).run();

    assert_eq!(stats, CycleStats::default());
    assert!(!config.outbound.exists());
}

#[cfg(unix)]
mod fifo {
    use super::*;
    use std::fs::{File, OpenOptions};
    use std::io::{Read, Write};
    use std::process::Command;
    use std::thread;

    fn mkfifo(path: &Path) -> bool {
        Command::new("mkfifo")
            .arg(path)
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// One client session: connect, send a line, collect the answers.
    fn query(config: &BridgeConfig, line: &str) -> String {
        let mut request = OpenOptions::new().write(true).open(&config.inbound).unwrap();
        writeln!(request, "{}", line).unwrap();
        let mut response = File::open(&config.outbound).unwrap();
        drop(request);

        let mut answer = String::new();
        response.read_to_string(&mut answer).unwrap();
        answer
    }

    #[test]
    fn bridge_reopens_pipes_between_clients() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path(), 2);
        if !mkfifo(&config.inbound) || !mkfifo(&config.outbound) {
            eprintln!("mkfifo unavailable, skipping");
            return;
        }

        let bridge = {
            let config = config.clone();
            thread::spawn(move || OracleBridge::new(config).run())
        };

        assert_eq!(query(&config, STARTPOS), "20\n");
        assert_eq!(query(&config, "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1"), "0\n");

        let stats = bridge.join().unwrap();
        assert_eq!(stats.answered, 2);
    }
}
