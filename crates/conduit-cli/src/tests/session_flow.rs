//! End-to-end client runs against a fake host.

use std::process::ExitCode;

use conduit_config::{Config, SocketEndpoint};
use conduit_protocol::{MessageTag, split_fields};
use rstest::{fixture, rstest};

use super::support::{FakeHost, HostFlavour, run_client};

#[fixture]
fn session_host() -> FakeHost {
    FakeHost::spawn(HostFlavour::Session)
}

#[rstest]
fn inline_fragments_run_in_one_session(session_host: FakeHost) {
    let outcome = run_client(session_host.config(), &["conduit", "-c", "1", "-c", "2"], "");

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(outcome.stdout, "out:1\n1\nout:2\n2\n");
    assert!(outcome.stderr.is_empty(), "stderr: {}", outcome.stderr);
    assert_eq!(session_host.tags(), [900, 100, 500, 500, 200]);

    let requests = session_host.requests();
    let (id, _) = split_fields(&requests[1].payload);
    assert!(id.starts_with("cli-"), "session id {id}");
    assert_eq!(requests[2].payload, format!("{id}\u{0}1"));
    assert_eq!(requests[4].payload, id);
    assert_eq!(session_host.registered_args(), ["conduit"]);
}

#[rstest]
fn failing_fragment_fails_the_run_but_continues(session_host: FakeHost) {
    let outcome = run_client(
        session_host.config(),
        &["conduit", "-c", "fail()", "-c", "3"],
        "",
    );

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert_eq!(outcome.stderr, "boom: fail()\n");
    assert_eq!(outcome.stdout, "out:3\n3\n");
    assert_eq!(session_host.tags().last(), Some(&MessageTag::Unregister.code()));
}

#[rstest]
fn stdin_lines_become_fragments(session_host: FakeHost) {
    let outcome = run_client(session_host.config(), &["conduit"], "a\n\nb\n");

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(outcome.stdout, "out:a\na\nout:b\nb\n");
    assert_eq!(session_host.tags(), [900, 100, 500, 500, 200]);
}

#[rstest]
fn registration_carries_flags_and_script_arguments(session_host: FakeHost) {
    let outcome = run_client(
        session_host.config(),
        &["conduit", "-q", "-C", "./job.lua", "x"],
        "",
    );

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(
        session_host.registered_args(),
        ["conduit", "-q", "-C", "./job.lua", "x"]
    );
    assert_eq!(session_host.tags(), [900, 100, 200]);
}

#[rstest]
fn reverse_socket_is_removed_after_the_run(session_host: FakeHost) {
    let outcome = run_client(session_host.config(), &["conduit", "-c", "1"], "");
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(session_host.leftover_session_sockets(), 0);
}

#[test]
fn rejected_registration_is_reported() {
    let host = FakeHost::spawn(HostFlavour::RejectsRegistration);
    let outcome = run_client(host.config(), &["conduit", "-c", "1"], "");

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(
        outcome.stderr.contains("host rejected the request: bad arguments"),
        "stderr: {}",
        outcome.stderr
    );
    assert_eq!(host.tags(), [900, 100]);
    assert_eq!(host.leftover_session_sockets(), 0);
}

#[test]
fn legacy_host_gets_one_shot_requests() {
    let host = FakeHost::spawn(HostFlavour::Legacy);
    let outcome = run_client(host.config(), &["conduit", "-c", "1+1", "-c", "2"], "");

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(outcome.stdout, "legacy:x1+1\nlegacy:x2\n");
    assert_eq!(host.tags(), [900, 0, 0]);
}

#[test]
fn unreachable_host_fails_cleanly() {
    let dir = tempfile::tempdir().expect("temp dir");
    let socket = dir.path().join("absent.sock");
    let config = Config {
        daemon_socket: SocketEndpoint::unix(socket.to_str().expect("utf8 path")),
        ..Config::default()
    };
    let outcome = run_client(config, &["conduit", "-c", "1"], "");

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(
        outcome.stderr.contains("failed to connect to host"),
        "stderr: {}",
        outcome.stderr
    );
}

#[rstest]
#[case::help(&["conduit", "--help"], ExitCode::SUCCESS)]
#[case::version(&["conduit", "--version"], ExitCode::SUCCESS)]
#[case::unknown_flag(&["conduit", "-Z"], ExitCode::FAILURE)]
#[case::missing_code(&["conduit", "-c"], ExitCode::FAILURE)]
fn argument_errors_never_contact_the_host(#[case] args: &[&str], #[case] expected: ExitCode) {
    let host = FakeHost::spawn(HostFlavour::Session);
    let outcome = run_client(host.config(), args, "");
    assert_eq!(outcome.exit, expected);
    assert!(host.tags().is_empty());
}
