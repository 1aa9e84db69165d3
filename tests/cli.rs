use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command running in an empty directory with no per-user config.
fn deskchat(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("deskchat").unwrap();
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env("HOME", dir.path())
        .env_remove("DESKCHAT_LOG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn render_html_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    deskchat(&dir)
        .arg("render")
        .write_stdin("## Fix\n- Restart **Outlook**\n- Check `File`\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "<h2>Fix</h2><ul><li>Restart <strong>Outlook</strong></li><li>Check <code>File</code></li></ul>",
        ));
}

#[test]
fn render_escapes_markup_once() {
    let dir = tempfile::tempdir().unwrap();
    deskchat(&dir)
        .arg("render")
        .write_stdin("<script>alert('x')</script> & more")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more</p>",
        ))
        .stdout(predicate::str::contains("&amp;amp;").not());
}

#[test]
fn render_json_document() {
    let dir = tempfile::tempdir().unwrap();
    deskchat(&dir)
        .args(["render", "--format", "json"])
        .write_stdin("# Title\n1. one\n2. two\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"heading\""))
        .stdout(predicate::str::contains("\"type\": \"ordered_list\""));
}

#[test]
fn render_text_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reply.md");
    std::fs::write(&path, "### VPN\n1. Install\n2. Connect\n").unwrap();
    deskchat(&dir)
        .args(["render", "--format", "text"])
        .arg(&path)
        .assert()
        .success()
        .stdout("VPN\n1. Install\n2. Connect\n");
}

#[test]
fn render_link_icons_follow_config_and_flag() {
    let dir = tempfile::tempdir().unwrap();
    let input = "[LinkedIn](https://www.linkedin.com/in/someone)";
    deskchat(&dir)
        .arg("render")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("class=\"icon\""));
    deskchat(&dir)
        .args(["render", "--no-link-icons"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains(">LinkedIn</a>"));

    std::fs::write(dir.path().join(".deskchat.toml"), "[render]\nlink_icons = false\n").unwrap();
    deskchat(&dir)
        .arg("render")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("class=\"icon\"").not());
}

#[test]
fn reveal_text_types_whole_message() {
    let dir = tempfile::tempdir().unwrap();
    deskchat(&dir)
        .args(["reveal", "--format", "text", "--mode", "timer", "--delay-ms", "0"])
        .write_stdin("Use **Wi-Fi** & retry")
        .assert()
        .success()
        .stdout("Use Wi-Fi & retry\n");
}

#[test]
fn classify_offers_after_unresolved_reply() {
    let dir = tempfile::tempdir().unwrap();
    let conversation = r#"[
        {"role": "user", "content": "wifi down"},
        {"role": "assistant", "content": "try X"},
        {"role": "user", "content": "still not fixed"}
    ]"#;
    deskchat(&dir)
        .args(["classify", "--format", "json"])
        .write_stdin(conversation)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"offer\": true"))
        .stdout(predicate::str::contains("\"trigger\": \"not-resolved\""));
}

#[test]
fn classify_soft_ack_needs_two_replies() {
    let dir = tempfile::tempdir().unwrap();
    let conversation = r#"{"messages": [
        {"role": "user", "content": "wifi down"},
        {"role": "assistant", "content": "try X"},
        {"role": "user", "content": "ok"}
    ]}"#;
    deskchat(&dir)
        .args(["classify", "--format", "text"])
        .write_stdin(conversation)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("keep chatting"));
    deskchat(&dir)
        .args(["classify", "--format", "text", "--offered"])
        .write_stdin(conversation)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("offer ticket (already offered"));
}

#[test]
fn classify_rejects_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    deskchat(&dir)
        .arg("classify")
        .write_stdin("not json")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid conversation JSON"));
}

#[test]
fn invalid_config_exits_with_config_code() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".deskchat.toml"), "[reveal]\nbatch_min = 0\n").unwrap();
    deskchat(&dir)
        .arg("render")
        .write_stdin("hi")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config error"));
}

#[test]
fn init_writes_config_once() {
    let dir = tempfile::tempdir().unwrap();
    deskchat(&dir)
        .args(["init", "--no-interactive", "--chat-url", "http://localhost:8888/chat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated"));
    let written = std::fs::read_to_string(dir.path().join(".deskchat.toml")).unwrap();
    assert!(written.contains("chat_url = \"http://localhost:8888/chat\""));

    deskchat(&dir)
        .args(["init", "--no-interactive"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn schema_describes_config() {
    let dir = tempfile::tempdir().unwrap();
    deskchat(&dir)
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"backend\""))
        .stdout(predicate::str::contains("\"reveal\""));
}

#[test]
fn piped_chat_escalates_and_files_ticket() {
    let dir = tempfile::tempdir().unwrap();
    deskchat(&dir)
        .args(["chat", "--format", "text"])
        .write_stdin("/tickets\nmy vpn is down\nno luck\n/ticket\n/history\n/tickets\n/quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tickets yet."))
        .stdout(predicate::str::is_match(r"T-0001\s+open\s+\d{4}-\d{2}-\d{2}").unwrap())
        .stdout(predicate::str::contains("VPN Setup (Quick):"))
        .stdout(predicate::str::contains("Still stuck? Type /ticket"))
        .stdout(predicate::str::contains("Ticket T-0001 created"))
        .stdout(predicate::str::contains("* 1. my vpn is down"));
}

#[test]
fn piped_chat_refuses_early_ticket() {
    let dir = tempfile::tempdir().unwrap();
    deskchat(&dir)
        .args(["chat", "--format", "text"])
        .write_stdin("printer jam\n/ticket\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo mode"))
        .stdout(predicate::str::contains("Tickets open once"))
        .stdout(predicate::str::contains("created").not());
}
