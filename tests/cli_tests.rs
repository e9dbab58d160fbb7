mod common;

use common::{run_scrivener, TestEnv};

#[test]
fn scrivener_help_shows_usage() {
    let output = run_scrivener(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "--help should succeed\nstdout:\n{}\nstderr:\n{}",
        stdout,
        stderr
    );
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("Commands:"));
    assert!(stdout.contains("record"));
    assert!(stdout.contains("worker"));
}

#[test]
fn scrivener_version_shows_version() {
    let output = run_scrivener(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("scrivener "));
}

#[test]
fn completions_bash_outputs_script() {
    let output = run_scrivener(&["completions", "bash"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "completions bash should succeed\nstdout:\n{}\nstderr:\n{}",
        stdout,
        stderr
    );
    assert!(
        stdout.contains("scrivener"),
        "expected completion output to reference command name\nstdout:\n{}",
        stdout
    );
}

#[test]
fn config_show_works() {
    let output = run_scrivener(&["config", "show"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "config show should succeed\nstdout:\n{}\nstderr:\n{}",
        stdout,
        stderr
    );
    assert!(stdout.contains("[general]"));
    assert!(stdout.contains("[worker]"));
    assert!(stdout.contains("transcription_timeout_secs = 30"));
}

#[test]
fn config_path_returns_valid_path() {
    let output = run_scrivener(&["config", "path"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("config.toml"));
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let env = TestEnv::new();

    let first = env.run(&["config", "init"]);
    assert!(
        first.status.success(),
        "first init should succeed\nstderr:\n{}",
        String::from_utf8_lossy(&first.stderr)
    );
    assert!(env.config_path().exists());

    let second = env.run(&["config", "init"]);
    assert!(!second.status.success());
    assert!(String::from_utf8_lossy(&second.stderr).contains("--force"));

    let forced = env.run(&["config", "init", "--force"]);
    assert!(forced.status.success());
}

#[test]
fn config_file_values_are_used() {
    let env = TestEnv::new();
    env.write_config(
        r#"
        [worker]
        model = "medium"
        "#,
    );

    let output = env.run(&["config", "show"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("model = \"medium\""));
}

#[test]
fn history_list_works_with_empty_database() {
    let output = run_scrivener(&["history", "list"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "history list should succeed\nstdout:\n{}\nstderr:\n{}",
        stdout,
        stderr
    );
    assert!(stdout.contains("No transcriptions found"));
}

#[test]
fn history_show_unknown_id_fails() {
    let output = run_scrivener(&["history", "show", "deadbeef"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Transcription not found"));
}

#[test]
fn history_stats_and_clear_on_empty_database() {
    let env = TestEnv::new();

    let stats = env.run(&["history", "stats"]);
    assert!(stats.status.success());
    assert!(String::from_utf8_lossy(&stats.stdout).contains("Transcriptions: 0"));

    let clear = env.run(&["history", "clear"]);
    assert!(clear.status.success());
    assert!(String::from_utf8_lossy(&clear.stdout).contains("Deleted 0 transcriptions"));
}

#[test]
fn worker_status_reports_not_running() {
    let output = run_scrivener(&["worker", "status"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "worker status should succeed\nstdout:\n{}\nstderr:\n{}",
        stdout,
        stderr
    );
    assert!(stdout.contains("Worker is not running"));
}

#[test]
fn worker_stop_without_worker_is_a_no_op() {
    let env = TestEnv::new();

    for _ in 0..2 {
        let output = env.run(&["worker", "stop"]);
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("Worker stopped"));
    }

    assert!(!env.data_dir().join("worker.sock").exists());
    assert!(!env.data_dir().join("worker.sock.pid").exists());
}

#[test]
fn worker_start_without_script_fails_cleanly() {
    let output = run_scrivener(&["worker", "start"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Worker failed to start"));
}

#[test]
fn worker_download_without_script_fails_cleanly() {
    let output = run_scrivener(&["worker", "download", "tiny"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Worker failed to start"));
}

#[test]
fn worker_models_requires_running_worker() {
    let output = run_scrivener(&["worker", "models"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not running"));
}

#[test]
fn transcribe_missing_file_fails() {
    let output = run_scrivener(&["transcribe", "/nonexistent/take.wav"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("File not found"));
}

#[test]
fn record_with_cloud_requires_api_key() {
    let output = run_scrivener(&["record", "--cloud", "gemini"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No gemini API key configured"));
}

#[test]
fn record_rejects_model_and_cloud_together() {
    let output = run_scrivener(&["record", "--model", "base", "--cloud", "openai"]);
    assert!(!output.status.success());
}
