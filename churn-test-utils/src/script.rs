//! Shell scripts standing in for the external worker.
//!
//! Each script is meant to be run as `sh -c <script>`. They print a readiness line first so
//! tests can tell the process actually started.

/// Exits 0 on SIGQUIT or SIGTERM, otherwise idles.
pub const OBEYS_SHUTDOWN: &str = r#"
trap 'echo "worker: shutting down"; exit 0' QUIT TERM
echo "worker: ready"
while true; do sleep 0.05; done
"#;

/// Ignores SIGQUIT and SIGTERM; only SIGKILL stops it.
pub const IGNORES_SHUTDOWN: &str = r#"
trap '' QUIT TERM
echo "worker: ready"
while true; do sleep 0.05; done
"#;

/// Dies on a cold shutdown with the pool teardown traceback, like a worker that lost the race.
pub const FAILS_ON_SHUTDOWN: &str = r#"
trap 'echo "AttributeError: '"'"'ForkProcess'"'"' object has no attribute '"'"'_sentinel_poll'"'"'" >&2; exit 1' QUIT
trap 'exit 0' TERM
echo "worker: ready"
while true; do sleep 0.05; done
"#;

/// Exits with code 3 right after starting.
pub const CRASHES_ON_START: &str = r#"
echo "worker: cannot connect to broker" >&2
exit 3
"#;

/// Exits 0 on its own one second after starting, whether signalled or not.
pub const EXITS_AFTER_ONE_SECOND: &str = r#"
echo "worker: ready"
sleep 1
echo "worker: done"
exit 0
"#;
