use std::io::Write;
use std::process::{Command, Output, Stdio};

fn cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_fz85"))
}

fn run(args: &[&str], input: &[u8]) -> Output {
    let mut child = cmd()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(input).unwrap();
    child.wait_with_output().unwrap()
}

const HELLO: &[u8] = b"\x86\x4F\xD2\x6F\xB5\x59\xF7\x5B";

#[test]
fn test_help() {
    let output = cmd().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("--decode"));
    assert!(stdout.contains("--ignore-garbage"));
}

#[test]
fn test_version() {
    let output = cmd().arg("--version").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("z85"));
}

#[test]
fn test_encode_stdin() {
    let output = run(&[], HELLO);
    assert!(output.status.success());
    assert_eq!(output.stdout, b"HelloWorld\n");
}

#[test]
fn test_encode_with_tail() {
    let mut input = HELLO.to_vec();
    input.push(0xAF);
    let output = run(&[], &input);
    assert!(output.status.success());
    assert_eq!(output.stdout, b"HelloWorld52\n");
}

#[test]
fn test_encode_empty() {
    let output = run(&[], b"");
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_encode_wrap() {
    let output = run(&["-w", "4"], HELLO);
    assert!(output.status.success());
    assert_eq!(output.stdout, b"Hell\noWor\nld\n");
}

#[test]
fn test_encode_no_wrap() {
    let output = run(&["-w", "0"], HELLO);
    assert!(output.status.success());
    assert_eq!(output.stdout, b"HelloWorld");
}

#[test]
fn test_decode() {
    let output = run(&["-d"], b"HelloWorld-e:i\n");
    assert!(output.status.success());
    assert_eq!(output.stdout, b"\x86\x4F\xD2\x6F\xB5\x59\xF7\x5B\xAF\xBF\xCF");
}

#[test]
fn test_decode_invalid_character() {
    let output = run(&["-d"], b"Hello~World");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("z85: invalid input"), "stderr: {}", stderr);
}

#[test]
fn test_decode_error_offset_counts_stripped_bytes() {
    // Offsets refer to the input as given, newlines included.
    let output = run(&["-d"], b"Hello\n\n\n\nWorl~");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("0x7e at offset 13"), "stderr: {}", stderr);
}

#[test]
fn test_decode_ignore_garbage() {
    let output = run(&["-d", "-i"], b"Hello~World");
    assert!(output.status.success());
    assert_eq!(output.stdout, HELLO);
}

#[test]
fn test_decode_invalid_length() {
    let output = run(&["--decode"], b"HelloW");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid length 6"), "stderr: {}", stderr);
}

#[test]
fn test_roundtrip_binary() {
    let input: Vec<u8> = (0..=255).cycle().take(10007).collect();
    let enc = run(&[], &input);
    assert!(enc.status.success());
    let dec = run(&["-d"], &enc.stdout);
    assert!(dec.status.success());
    assert_eq!(dec.stdout, input);
}

#[test]
fn test_file_argument() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.bin");
    std::fs::write(&path, HELLO).unwrap();
    let output = cmd().arg(&path).output().unwrap();
    assert!(output.status.success());
    assert_eq!(output.stdout, b"HelloWorld\n");
}

#[test]
fn test_missing_file() {
    let output = cmd().arg("/nonexistent/input.z85").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("z85: /nonexistent/input.z85: No such file or directory"));
}
