//! Minimal CLI surface (spec.md §6, "CLI surface"). Argument parsing and
//! colorized human-readable printing are named out of scope for the core
//! (spec.md §1); this binary is the thin glue spec.md §6 says must exist
//! for the core to be runnable on its own, not a reimplementation of the
//! excluded presentation layer. It parses `[<host>]:[<port>]` plus either a
//! `test_…` id or a comma-separated batch list, invokes `TestRunner`, and
//! prints each `TestResult` as JSON — one line per test, so the surrounding
//! service layer (also out of scope) can consume the exact same shape this
//! binary prints.

use std::path::PathBuf;

use httpconform::registry::TestRegistry;
use httpconform::runner::TestRunner;
use httpconform::suites::core_suite;

fn print_usage() {
    eprintln!("usage: httpconform [<host>]:[<port>] <test_id | batch[,batch...] | --all | --list>");
}

#[tokio::main]
async fn main() {
    let filter = std::env::var("HTTPCONFORM_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        std::process::exit(1);
    }

    let (host, port) = match parse_hostport(&args[0]) {
        Some(pair) => pair,
        None => {
            print_usage();
            std::process::exit(1);
        }
    };

    let mut registry = TestRegistry::new();
    let fixture_dir: PathBuf = std::env::var("HTTPCONFORM_FIXTURES")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("fixtures/core"));
    registry.register(core_suite(fixture_dir));
    let runner = TestRunner::new(registry, host, port);

    let selector = args.get(1).map(String::as_str).unwrap_or("--all");
    let results = match selector {
        "--list" => {
            for id in runner.registry().list() {
                println!("{}", id);
            }
            std::process::exit(0);
        }
        "--all" => runner.run_all().await,
        s if s.starts_with("test_") => match runner.run_single(s).await {
            Ok(result) => vec![result],
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        s => {
            let mut all = Vec::new();
            let mut failed_to_resolve = false;
            for part in s.split(',') {
                match part.trim().parse::<u32>() {
                    Ok(batch) => match runner.run_batch(batch).await {
                        Ok(mut results) => all.append(&mut results),
                        Err(e) => {
                            eprintln!("{}", e);
                            failed_to_resolve = true;
                        }
                    },
                    Err(_) => {
                        eprintln!("invalid batch number: {:?}", part);
                        failed_to_resolve = true;
                    }
                }
            }
            if failed_to_resolve && all.is_empty() {
                std::process::exit(1);
            }
            all
        }
    };

    let mut any_failed = false;
    for result in &results {
        any_failed |= !result.passed;
        match result.to_json() {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("failed to serialize result for {}: {}", result.id, e),
        }
    }

    // Exit code is 0 on a clean run even if individual tests failed
    // (spec.md §6); tests failing is data, not a tool failure.
    let _ = any_failed;
    std::process::exit(0);
}

fn parse_hostport(spec: &str) -> Option<(String, u16)> {
    let (host_part, port_part) = spec.split_once(':')?;
    let host = if host_part.is_empty() {
        "localhost".to_string()
    } else {
        host_part.to_string()
    };
    let port = if port_part.is_empty() {
        80
    } else {
        port_part.parse().ok()?
    };
    Some((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_host_and_port_when_blank() {
        assert_eq!(
            parse_hostport(":"),
            Some(("localhost".to_string(), 80))
        );
    }

    #[test]
    fn parses_explicit_host_and_port() {
        assert_eq!(
            parse_hostport("example.com:8080"),
            Some(("example.com".to_string(), 8080))
        );
    }

    #[test]
    fn rejects_missing_colon() {
        assert_eq!(parse_hostport("example.com"), None);
    }
}
