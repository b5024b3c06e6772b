// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use std::fs::File;

use simplelog::{Config, LevelFilter, SimpleLogger, WriteLogger};

fn level_from_env() -> LevelFilter {
    match std::env::var("P11STORE_TRACE_LEVEL") {
        Err(_) => LevelFilter::Error,
        Ok(l) => match l.as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Trace,
        },
    }
}

/// Installs a logger when P11STORE_TRACE is set
///
/// `stdout` logs to standard output, any other value names the file to
/// log into. Initialization errors are ignored and leave tracing disabled.
///
/// The level comes from P11STORE_TRACE_LEVEL (off, error, warn, info,
/// debug, trace), defaults to error, and unknown values mean trace.
pub fn log_init() {
    let level = level_from_env();
    match std::env::var("P11STORE_TRACE") {
        Err(_) => return,
        Ok(t) => match t.as_str() {
            "stdout" => {
                let _ = SimpleLogger::init(level, Config::default());
            }
            file_name => {
                let file = match File::create(file_name) {
                    Ok(w) => w,
                    Err(_) => return,
                };
                let _ = WriteLogger::init(level, Config::default(), file);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serial_test::serial;

    #[test]
    #[serial]
    fn trace_level_from_env() {
        std::env::remove_var("P11STORE_TRACE_LEVEL");
        assert_eq!(level_from_env(), LevelFilter::Error);
        std::env::set_var("P11STORE_TRACE_LEVEL", "debug");
        assert_eq!(level_from_env(), LevelFilter::Debug);
        std::env::set_var("P11STORE_TRACE_LEVEL", "verbose");
        assert_eq!(level_from_env(), LevelFilter::Trace);
        std::env::remove_var("P11STORE_TRACE_LEVEL");
    }

    #[test]
    #[serial]
    fn test_init() {
        std::env::remove_var("P11STORE_TRACE");
        log_init();

        /* an unusable log file is not an error */
        std::env::set_var("P11STORE_TRACE", "/nonexistent/dir/p11store.log");
        log_init();
        std::env::remove_var("P11STORE_TRACE");
    }
}
