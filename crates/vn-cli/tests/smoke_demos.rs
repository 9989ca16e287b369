use std::fs;
use std::process::Command;

#[test]
fn check_and_agent_run_accept_all_demos() {
    let bin = env!("CARGO_BIN_EXE_vn-cli");
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let demos_root = manifest_dir.join("..").join("..").join("demos");

    let mut scripts = fs::read_dir(&demos_root)
        .expect("demos root must exist")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "vns"))
        .collect::<Vec<_>>();
    scripts.sort();

    assert!(!scripts.is_empty(), "expected demo scripts");

    for script in scripts {
        for mode in [&["check"][..], &["agent", "run"][..]] {
            let output = Command::new(bin)
                .args(mode)
                .arg("--script")
                .arg(&script)
                .output()
                .expect("cli should execute");

            if !output.status.success() {
                panic!(
                    "{} {:?} failed\nstdout:\n{}\nstderr:\n{}",
                    script.display(),
                    mode,
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                );
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            assert!(
                stdout.starts_with("RESULT:OK"),
                "stdout missing RESULT:OK for {}",
                script.display()
            );
        }
    }
}

#[test]
fn agent_run_reports_missing_script() {
    let bin = env!("CARGO_BIN_EXE_vn-cli");
    let output = Command::new(bin)
        .args(["agent", "run", "--script", "/definitely/not/here.vns"])
        .output()
        .expect("cli should execute");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("RESULT:ERROR"));
    assert!(stdout.contains("ERROR_CODE:CLI_SOURCE_NOT_FOUND"));
}
