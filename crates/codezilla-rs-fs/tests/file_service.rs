//! File service behaviour in local and sandboxed modes.

use codezilla_rs_fs::{FileService, FsError};
use codezilla_rs_protocol::{EntryKind, FileEntry, PathError};
use codezilla_rs_sandbox::{ContainerLifecycleManager, LifecycleOptions, SandboxError};
use codezilla_rs_test_utils::FakeRuntime;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// How the service under test reaches the filesystem.
#[derive(Debug, Clone, Copy)]
enum Mode {
    /// The runtime is unreachable, so the host filesystem is used.
    Local,
    /// A managed sandbox backed by the project directory.
    Managed,
    /// A pre-existing target whose project root differs from the managed one.
    Attached,
}

const MODES: [Mode; 3] = [Mode::Local, Mode::Managed, Mode::Attached];

struct Harness {
    _temp: TempDir,
    project: PathBuf,
    runtime: Arc<FakeRuntime>,
    service: FileService,
}

fn harness(mode: Mode) -> Harness {
    let temp = tempfile::tempdir().expect("tempdir");
    let project = temp.path().join("project");
    std::fs::create_dir_all(&project).expect("project dir");
    let helper = temp.path().join("codezilla-fs-helper");
    std::fs::write(&helper, b"").expect("helper");

    let runtime = match mode {
        Mode::Local => FakeRuntime::new().unreachable(),
        Mode::Managed => FakeRuntime::new(),
        Mode::Attached => {
            FakeRuntime::new().with_running_target("codezilla-app", "/srv/app", &project)
        }
    };
    let runtime = Arc::new(runtime);
    let options = LifecycleOptions {
        target_name: "codezilla-app".to_string(),
        target_project_root: "/srv/app".to_string(),
        auto_create: true,
        image: "debian:bookworm-slim".to_string(),
        managed_project_root: "/app".to_string(),
        name_prefix: "codezilla-fs".to_string(),
        host_project_dir: project.clone(),
        helper_host_path: Some(helper),
        helper_sandbox_path: "/usr/local/bin/codezilla-fs-helper".to_string(),
        cleanup_on_signal: false,
        teardown_timeout: Duration::from_secs(10),
    };
    let manager = ContainerLifecycleManager::new(runtime.clone(), options);
    Harness {
        _temp: temp,
        project,
        runtime,
        service: FileService::from_manager(manager),
    }
}

fn names(entries: &[FileEntry]) -> Vec<&str> {
    entries.iter().map(|entry| entry.name.as_str()).collect()
}

fn binary_payload() -> Vec<u8> {
    let mut payload: Vec<u8> = (0..=255u8).rev().collect();
    payload.extend_from_slice(b"\0\0middle\xc3\x28\xff\0");
    payload.extend(std::iter::repeat_n(0u8, 64 * 1024));
    payload
}

/// Written bytes read back unchanged, including NUL and invalid UTF-8.
#[tokio::test]
async fn binary_round_trip_in_every_mode() {
    for mode in MODES {
        let harness = harness(mode);
        let payload = binary_payload();
        harness
            .service
            .write_file("assets/blob.bin", &payload)
            .await
            .expect("write");
        let read = harness
            .service
            .read_file("assets/blob.bin")
            .await
            .expect("read");
        assert!(read == payload, "round trip differs in {mode:?}");
        assert!(
            std::fs::read(harness.project.join("assets/blob.bin")).expect("host file") == payload,
            "host copy differs in {mode:?}"
        );
    }
}

/// Text with multi-byte characters survives a round trip.
#[tokio::test]
async fn text_round_trip_in_every_mode() {
    for mode in MODES {
        let harness = harness(mode);
        let text = "export const greeting = \"héllo wörld ✓\";\n";
        harness
            .service
            .write_file("src/app/page.tsx", text.as_bytes())
            .await
            .expect("write");
        let read = harness
            .service
            .read_file("src/app/page.tsx")
            .await
            .expect("read");
        assert_eq!(String::from_utf8(read).expect("utf8"), text);
    }
}

/// Entries whose names are not UTF-8 are left out of listings, so every
/// listed path can be read back.
#[cfg(unix)]
#[tokio::test]
async fn listing_skips_non_utf8_names_in_every_mode() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    for mode in MODES {
        let harness = harness(mode);
        std::fs::write(harness.project.join(OsStr::from_bytes(b"caf\xe9.txt")), "x")
            .expect("latin-1 name");
        std::fs::write(harness.project.join("readme.md"), "# hi").expect("readme");

        let root = harness.service.list_directory("").await.expect("list root");
        assert_eq!(names(&root), vec!["readme.md"], "{mode:?}");
        for entry in &root {
            harness
                .service
                .read_file(&entry.path)
                .await
                .expect("listed path is readable");
        }
    }
}

/// Dotfiles are filtered and paths are project-relative.
#[tokio::test]
async fn listing_filters_dotfiles_in_every_mode() {
    for mode in MODES {
        let harness = harness(mode);
        std::fs::create_dir_all(harness.project.join(".git")).expect("git dir");
        std::fs::write(harness.project.join("a.txt"), "a").expect("a.txt");
        std::fs::create_dir_all(harness.project.join("b")).expect("b");
        std::fs::write(harness.project.join("b/.env"), "SECRET=1").expect(".env");
        std::fs::write(harness.project.join("b/c.rs"), "fn main() {}").expect("c.rs");

        let root = harness.service.list_directory("").await.expect("list root");
        assert_eq!(
            root,
            vec![
                FileEntry {
                    name: "a.txt".to_string(),
                    path: "a.txt".to_string(),
                    kind: EntryKind::File,
                },
                FileEntry {
                    name: "b".to_string(),
                    path: "b".to_string(),
                    kind: EntryKind::Directory,
                },
            ],
            "root listing in {mode:?}"
        );

        let nested = harness.service.list_directory("b").await.expect("list b");
        assert_eq!(names(&nested), vec!["c.rs"], "nested listing in {mode:?}");
        assert_eq!(nested[0].path, "b/c.rs");
    }
}

/// Creating the same directory twice succeeds.
#[tokio::test]
async fn make_directory_is_idempotent_in_every_mode() {
    for mode in MODES {
        let harness = harness(mode);
        harness.service.make_directory("x/y").await.expect("first");
        harness.service.make_directory("x/y").await.expect("second");
        assert!(harness.project.join("x/y").is_dir(), "{mode:?}");
    }
}

/// Invalid paths fail before the runtime or filesystem is touched.
#[tokio::test]
async fn invalid_paths_are_rejected_before_any_call() {
    for mode in MODES {
        let harness = harness(mode);
        let service = &harness.service;

        let cases: [(&str, fn(&PathError) -> bool); 4] = [
            ("a/../b", |err| matches!(err, PathError::Traversal(_))),
            ("/abs", |err| matches!(err, PathError::Absolute(_))),
            ("", |err| matches!(err, PathError::Empty)),
            ("a//b", |err| matches!(err, PathError::EmptySegment(_))),
        ];
        for (input, expected) in cases {
            for result in [
                service.read_file(input).await.map(|_| ()),
                service.write_file(input, b"x").await,
                service.make_directory(input).await,
            ] {
                match result {
                    Err(FsError::InvalidPath(err)) => assert!(expected(&err), "{input}: {err}"),
                    other => panic!("{input} in {mode:?}: unexpected {other:?}"),
                }
            }
        }
        for input in ["../etc", "/", "a//b"] {
            assert!(matches!(
                service.list_directory(input).await,
                Err(FsError::InvalidPath(_))
            ));
        }
        let long = "a/".repeat(200) + "b";
        assert!(matches!(
            service.read_file(&long).await,
            Err(FsError::InvalidPath(PathError::TooLong { .. }))
        ));

        assert_eq!(harness.runtime.total_calls(), 0, "{mode:?}");
        assert_eq!(
            std::fs::read_dir(&harness.project).expect("project").count(),
            0
        );
    }
}

/// Backslash separators are accepted and normalized.
#[tokio::test]
async fn backslash_paths_are_normalized() {
    for mode in MODES {
        let harness = harness(mode);
        harness
            .service
            .write_file(r"src\lib.rs", b"pub fn lib() {}")
            .await
            .expect("write");
        assert!(harness.project.join("src/lib.rs").is_file(), "{mode:?}");
        assert!(matches!(
            harness.service.read_file(r"src\..\secret").await,
            Err(FsError::InvalidPath(PathError::Traversal(_)))
        ));
    }
}

/// Local reads of a directory fail with `NotAFile`.
#[tokio::test]
async fn local_read_of_directory_is_not_a_file() {
    let harness = harness(Mode::Local);
    std::fs::create_dir_all(harness.project.join("src")).expect("src");
    match harness.service.read_file("src").await {
        Err(FsError::NotAFile(path)) => assert_eq!(path, "src"),
        other => panic!("unexpected {other:?}"),
    }
}

/// Sandboxed failures surface the helper's stderr.
#[tokio::test]
async fn remote_failures_surface_stderr() {
    let harness = harness(Mode::Managed);
    match harness.service.read_file("missing.txt").await {
        Err(FsError::Remote(SandboxError::RemoteExecution(message))) => {
            assert!(message.starts_with("read /app/missing.txt:"), "{message}")
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        harness.service.list_directory("nope").await,
        Err(FsError::Remote(_))
    ));
}

/// Missing local files surface the system error.
#[tokio::test]
async fn local_failures_are_io_errors() {
    let harness = harness(Mode::Local);
    match harness.service.read_file("missing.txt").await {
        Err(FsError::LocalIo(err)) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected {other:?}"),
    }
}

/// With the runtime unreachable every operation runs against the host.
#[tokio::test]
async fn unreachable_runtime_falls_back_transparently() {
    let harness = harness(Mode::Local);
    assert_eq!(harness.service.manager().ensure_context().await, None);

    harness.service.make_directory("docs").await.expect("mkdir");
    harness
        .service
        .write_file("docs/readme.md", b"# readme")
        .await
        .expect("write");
    assert_eq!(
        harness.service.read_file("docs/readme.md").await.expect("read"),
        b"# readme".to_vec()
    );
    let listed = harness.service.list_directory("docs").await.expect("list");
    assert_eq!(names(&listed), vec!["readme.md"]);
    assert_eq!(harness.runtime.execs(), 0);
    assert_eq!(harness.service.local_root(), Path::new(&harness.project));
}

/// Sandboxed operations go through the runtime, one exec each.
#[tokio::test]
async fn sandboxed_operations_use_one_exec_each() {
    let harness = harness(Mode::Managed);
    harness.service.make_directory("d").await.expect("mkdir");
    harness
        .service
        .write_file("d/f.txt", b"f")
        .await
        .expect("write");
    harness.service.read_file("d/f.txt").await.expect("read");
    harness.service.list_directory("d").await.expect("list");
    assert_eq!(harness.runtime.execs(), 4);
    assert_eq!(harness.runtime.starts(), 1);
}

/// Concurrent writers to one path leave one complete version behind.
#[tokio::test]
async fn concurrent_writes_are_last_write_wins() {
    let harness = harness(Mode::Managed);
    let service = &harness.service;
    let first = vec![b'a'; 4096];
    let second = vec![b'b'; 4096];
    let (left, right) = futures_util::join!(
        service.write_file("race.txt", &first),
        service.write_file("race.txt", &second)
    );
    left.expect("first write");
    right.expect("second write");
    let content = service.read_file("race.txt").await.expect("read");
    assert!(content == first || content == second);
}
