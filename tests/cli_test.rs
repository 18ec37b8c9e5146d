use assert_cmd::Command;
use predicates::prelude::*;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temp dir holding fake `rpcinfo`/`showmount` scripts and a config that
/// points at them.
struct FakeTools {
    dir: TempDir,
}

impl FakeTools {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn marker(&self) -> PathBuf {
        self.dir.path().join("invoked")
    }

    /// Writes a script that records its arguments, prints `stdout`/`stderr`
    /// and exits with `code`.
    fn tool(&self, name: &str, stdout: &str, stderr: &str, code: i32) -> &Self {
        let path = self.dir.path().join(name);
        let script = format!(
            "#!/bin/sh\necho \"{name} $*\" >> '{marker}'\nprintf '%s' '{stdout}'\nprintf '%s' '{stderr}' >&2\nexit {code}\n",
            name = name,
            marker = self.marker().display(),
            stdout = stdout,
            stderr = stderr,
            code = code,
        );
        write_executable(&path, &script);
        self
    }

    fn slow_tool(&self, name: &str) -> &Self {
        write_executable(&self.dir.path().join(name), "#!/bin/sh\nexec sleep 30\n");
        self
    }

    fn config(&self, timeout_secs: u64) -> PathBuf {
        let path = self.dir.path().join("config.toml");
        let content = format!(
            "[checks]\ntimeout_secs = {}\n\n[tools]\nrpcinfo = \"{}\"\nshowmount = \"{}\"\n",
            timeout_secs,
            self.dir.path().join("rpcinfo").display(),
            self.dir.path().join("showmount").display(),
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    fn invocations(&self) -> String {
        std::fs::read_to_string(self.marker()).unwrap_or_default()
    }
}

fn write_executable(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
}

fn nfs_check(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nfs-check").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

const RPCINFO_V3_V4: &str = "program 100003 version 4 ready and waiting
program 100003 version 3 ready and waiting
";

const SHOWMOUNT_AB: &str = "Export list for localhost:
/srv/a 10.0.0.0/24
/srv/b *
";

#[test]
fn help_exits_zero() {
    Command::cargo_bin("nfs-check")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("version"))
        .stdout(predicate::str::contains("share"));
}

#[test]
fn no_args_exits_one() {
    Command::cargo_bin("nfs-check").unwrap().assert().code(1);
}

#[test]
fn unknown_action_exits_one() {
    Command::cargo_bin("nfs-check")
        .unwrap()
        .args(["mount", "localhost"])
        .assert()
        .code(1);
}

#[test]
fn share_without_shares_exits_one() {
    Command::cargo_bin("nfs-check")
        .unwrap()
        .args(["share", "localhost"])
        .assert()
        .code(1);
}

#[test]
fn missing_config_file_exits_one() {
    let tools = FakeTools::new();
    nfs_check(&tools.dir.path().join("absent.toml"))
        .args(["version", "localhost"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config not found"));
}

#[test]
fn version_reports_highest() {
    let tools = FakeTools::new();
    tools.tool("rpcinfo", RPCINFO_V3_V4, "", 0);
    nfs_check(&tools.config(10))
        .args(["version", "localhost"])
        .assert()
        .success()
        .stdout("4\n");
    assert_eq!(tools.invocations(), "rpcinfo -t localhost nfs\n");
}

#[test]
fn version_without_ready_lines_prints_zero() {
    let tools = FakeTools::new();
    tools.tool("rpcinfo", "program 100003 version 3 is not available\n", "", 0);
    nfs_check(&tools.config(10))
        .args(["version", "127.0.0.1"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn version_tool_failure_prints_error_and_exits_zero() {
    let tools = FakeTools::new();
    tools.tool("rpcinfo", "", "rpcinfo: cannot contact portmapper", 1);
    nfs_check(&tools.config(10))
        .args(["version", "localhost"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Error: "))
        .stdout(predicate::str::contains("cannot contact portmapper"));
}

#[test]
fn version_timeout_prints_error_and_exits_zero() {
    let tools = FakeTools::new();
    tools.slow_tool("rpcinfo");
    nfs_check(&tools.config(1))
        .args(["version", "localhost"])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains("timed out after 1s"));
}

#[test]
fn share_reports_missing() {
    let tools = FakeTools::new();
    tools.tool("showmount", SHOWMOUNT_AB, "", 0);
    nfs_check(&tools.config(10))
        .args(["share", "localhost", "/srv/a,/srv/c"])
        .assert()
        .success()
        .stdout("[\"/srv/c\"]\n");
    assert_eq!(tools.invocations(), "showmount -e localhost\n");
}

#[test]
fn share_all_present_prints_empty_line() {
    let tools = FakeTools::new();
    tools.tool("showmount", SHOWMOUNT_AB, "", 0);
    nfs_check(&tools.config(10))
        .args(["share", "localhost", "/srv/a,/srv/b"])
        .assert()
        .success()
        .stdout("\n");
}

#[test]
fn share_tool_failure_embeds_stderr() {
    let tools = FakeTools::new();
    tools.tool("showmount", "", "clnt_create: RPC: Program not registered", 1);
    nfs_check(&tools.config(10))
        .args(["share", "localhost", "/srv/a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Error: "))
        .stdout(predicate::str::contains("Program not registered"));
}

#[test]
fn json_output_carries_structured_result() {
    let tools = FakeTools::new();
    tools.tool("showmount", SHOWMOUNT_AB, "", 0);
    let output = nfs_check(&tools.config(10))
        .args(["--json", "share", "localhost", "/srv/a,/srv/c"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["server"], "localhost");
    assert_eq!(report["result"]["ok"], true);
    assert_eq!(report["result"]["value"], serde_json::json!(["/srv/c"]));
    assert!(report["result"]["error"].is_null());
    assert!(report["checked_at"].is_string());
}

#[test]
fn json_output_marks_failures() {
    let tools = FakeTools::new();
    tools.tool("rpcinfo", "", "rpcinfo: RPC: Timed out", 1);
    let output = nfs_check(&tools.config(10))
        .args(["version", "localhost", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["result"]["ok"], false);
    assert!(report["result"]["value"].is_null());
    assert!(report["result"]["error"]
        .as_str()
        .unwrap()
        .contains("RPC: Timed out"));
}

#[test]
fn unresolvable_host_exits_one_before_running_tools() {
    let tools = FakeTools::new();
    tools.tool("rpcinfo", RPCINFO_V3_V4, "", 0);
    tools.tool("showmount", SHOWMOUNT_AB, "", 0);
    let config = tools.config(10);

    nfs_check(&config)
        .args(["version", "nfs-check.invalid"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "Unable to resolve hostname nfs-check.invalid",
        ));

    nfs_check(&config)
        .args(["share", "nfs-check.invalid", "/srv/a"])
        .assert()
        .code(1);

    assert!(tools.invocations().is_empty());
}
