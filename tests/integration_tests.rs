//! Integration tests for the bookbinder pipeline
//!
//! The collaborators are replaced by small shell scripts that honor the same
//! command lines and log every call, so these tests exercise the real process
//! handling, workspace lifecycle and stage ordering without needing unzip,
//! curl, ImageMagick, mp3wrap, mplayer or faac installed.
#![cfg(unix)]

use bookbinder::acquire::Fetcher;
use bookbinder::config::{ExplicitMetadata, MetadataRequest, Settings};
use bookbinder::discovery::classifier::remote_file_name;
use bookbinder::tools::Toolchain;
use bookbinder::{pipeline, BookbinderError};
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Serves "remote" files from a local directory by their last URL segment
struct DirFetcher {
    root: PathBuf,
}

impl Fetcher for DirFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> bookbinder::Result<()> {
        let name = remote_file_name(url).expect("URL should have a file name");
        fs::copy(self.root.join(name), dest).map_err(|e| BookbinderError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "dir"
    }
}

/// Temp directories and fake tools for one test
struct Harness {
    root: TempDir,
    tools: Toolchain,
}

impl Harness {
    /// Fake collaborators; `mplayer_marker` is the format line the decoder prints
    fn new(mplayer_marker: &str) -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        for dir in ["bin", "remote", "dest", "work"] {
            fs::create_dir(root.path().join(dir)).unwrap();
        }
        let bin = root.path().join("bin");
        let log = root.path().join("calls.log");
        let log = log.display();

        // Archives are text files listing one track name per line;
        // a line reading CORRUPT makes extraction fail.
        let unzip = write_script(
            &bin,
            "unzip",
            &format!(
                "echo \"unzip $3\" >> '{log}'\n\
                 if grep -q CORRUPT \"$3\"; then echo 'error: invalid zip file' >&2; exit 9; fi\n\
                 while read -r name; do printf 'frames-%s;' \"$name\" > \"$5/$name\"; done < \"$3\"\n"
            ),
        );
        let identify = write_script(&bin, "identify", "f=\"${3%'[0]'}\"\ncat \"$f\"\n");
        let convert = write_script(
            &bin,
            "convert",
            &format!("echo \"convert $1\" >> '{log}'\necho 300x300 > \"$4\"\n"),
        );
        let mp3wrap = write_script(
            &bin,
            "mp3wrap",
            &format!(
                "echo \"mp3wrap $#\" >> '{log}'\n\
                 out=\"${{1%.mp3}}_MP3WRAP.mp3\"\nshift\ncat \"$@\" > \"$out\"\n"
            ),
        );
        let mplayer = write_script(
            &bin,
            "mplayer",
            &format!(
                "echo \"mplayer $7\" >> '{log}'\n\
                 raw=\"${{6#*file=%*%}}\"\ncp \"$7\" \"$raw\"\n\
                 echo 'MPlayer test build'\necho '{mplayer_marker}'\n"
            ),
        );
        let faac = write_script(
            &bin,
            "faac",
            &format!(
                "echo \"faac $*\" >> '{log}'\n\
                 while [ $# -gt 0 ]; do case \"$1\" in -o) out=\"$2\"; shift;; esac; shift; done\n\
                 printf 'm4b' > \"$out\"\n"
            ),
        );

        // FTP downloads are served from the remote directory by file name
        let remote = root.path().join("remote");
        let curl = write_script(
            &bin,
            "curl",
            &format!(
                "while [ $# -gt 0 ]; do case \"$1\" in --output) out=\"$2\"; shift;; --url) url=\"$2\"; shift;; esac; shift; done\n\
                 echo \"curl $url\" >> '{log}'\n\
                 cp '{remote}'/\"${{url##*/}}\" \"$out\"\n",
                remote = remote.display()
            ),
        );

        let tools = Toolchain {
            curl,
            unzip,
            identify,
            convert,
            mp3wrap,
            mplayer,
            faac,
            ..Toolchain::default()
        };

        Self { root, tools }
    }

    fn remote_dir(&self) -> PathBuf {
        self.root.path().join("remote")
    }

    fn dest(&self) -> PathBuf {
        self.root.path().join("dest")
    }

    fn work(&self) -> PathBuf {
        self.root.path().join("work")
    }

    fn fetcher(&self) -> DirFetcher {
        DirFetcher {
            root: self.remote_dir(),
        }
    }

    /// Write a fake archive listing the given track names
    fn archive(&self, name: &str, tracks: &[&str]) -> PathBuf {
        let path = self.remote_dir().join(name);
        fs::write(&path, tracks.join("\n") + "\n").unwrap();
        path
    }

    /// Write a fake image whose contents are its geometry
    fn image(&self, name: &str, geometry: &str) -> PathBuf {
        let path = self.remote_dir().join(name);
        fs::write(&path, geometry).unwrap();
        path
    }

    fn settings(&self, sources: Vec<String>, metadata: MetadataRequest) -> Settings {
        Settings {
            sources,
            destination: self.dest(),
            metadata,
            picture: None,
            default_cover_url: "https://covers.example.org/default.jpg".to_string(),
            tools: self.tools.clone(),
            workspace_root: self.work(),
            keep_going: false,
            show_progress: false, // Disable spinner in tests
        }
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.root.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn calls_to(&self, tool: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(&format!("{} ", tool)))
            .collect()
    }

    fn workspaces_left(&self) -> usize {
        fs::read_dir(self.work()).unwrap().count()
    }
}

const STEREO_MARKER: &str = "AO: [pcm] 44100Hz 2ch s16le (2 bytes per sample)";

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).expect("Failed to create script");
    file.write_all(format!("#!/bin/sh\n{}", body).as_bytes()).unwrap();
    file.sync_all().unwrap();
    drop(file);
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn test_two_remote_archives_are_inferred_and_named_after_archives() {
    let h = Harness::new(STEREO_MARKER);
    h.archive("on_liberty_64kb_mp3_librivox.zip", &["01.mp3", "02.mp3", "03.mp3"]);
    h.archive("walden_64kb_mp3_librivox.zip", &["01.mp3", "02.mp3"]);
    h.image("default.jpg", "300x300");

    let settings = h.settings(
        vec![
            "https://example.org/dl/on_liberty_64kb_mp3_librivox.zip".to_string(),
            "http://example.org/dl/walden_64kb_mp3_librivox.zip".to_string(),
        ],
        MetadataRequest::Infer,
    );
    let result = pipeline::run_with(&settings, &h.fetcher()).expect("Run should succeed");

    assert_eq!(result.total_jobs, 2);
    assert_eq!(result.successful, 2);
    assert_eq!(result.failed, 0);
    assert_eq!(
        result.outputs,
        vec![
            h.dest().join("on_liberty_64kb_mp3_librivox.m4b"),
            h.dest().join("walden_64kb_mp3_librivox.m4b"),
        ]
    );
    for output in &result.outputs {
        assert!(output.is_file(), "{} should exist", output.display());
    }

    let faac = h.calls_to("faac");
    assert_eq!(faac.len(), 2);
    assert!(faac[0].contains("--title On Liberty"), "got: {}", faac[0]);
    assert!(faac[0].contains("--writer On Liberty"));
    assert!(faac[0].contains("--album On Liberty"));
    assert!(faac[0].contains("--genre Spoken Word"));
    assert!(faac[0].contains("--track 1"));
    assert!(faac[0].contains("-R 44100 -C 2 -B 16"));
    assert!(faac[1].contains("--title Walden"));

    // Wrapped output was renamed back before decoding
    let mplayer = h.calls_to("mplayer");
    assert!(mplayer.iter().all(|c| c.ends_with("merged.mp3")));

    // Default cover was already square
    assert!(h.calls_to("convert").is_empty());
    assert_eq!(h.workspaces_left(), 0, "workspaces should be removed");
}

#[test]
fn test_first_extraction_failure_aborts_remaining_jobs() {
    let h = Harness::new(STEREO_MARKER);
    h.archive("broken.zip", &["01.mp3", "CORRUPT"]);
    h.archive("walden.zip", &["01.mp3", "02.mp3"]);
    h.image("default.jpg", "300x300");

    let settings = h.settings(
        vec![
            "https://example.org/broken.zip".to_string(),
            "https://example.org/walden.zip".to_string(),
        ],
        MetadataRequest::Infer,
    );
    let err = pipeline::run_with(&settings, &h.fetcher()).unwrap_err();

    assert!(matches!(err, BookbinderError::Extraction { .. }), "got: {err}");
    assert!(err.to_string().contains("invalid zip file"));
    assert_eq!(h.calls_to("unzip").len(), 1, "second job must not start");
    assert!(h.calls_to("faac").is_empty());
    assert!(!h.dest().join("walden.m4b").exists());
    assert_eq!(h.workspaces_left(), 0, "failed workspace should be removed");
}

#[test]
fn test_keep_going_continues_after_failure() {
    let h = Harness::new(STEREO_MARKER);
    h.archive("broken.zip", &["CORRUPT"]);
    h.archive("walden.zip", &["01.mp3", "02.mp3"]);
    h.image("default.jpg", "300x300");

    let mut settings = h.settings(
        vec![
            "https://example.org/broken.zip".to_string(),
            "https://example.org/walden.zip".to_string(),
        ],
        MetadataRequest::Infer,
    );
    settings.keep_going = true;

    let result = pipeline::run_with(&settings, &h.fetcher()).expect("Run should report failures");

    assert_eq!(result.successful, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].stage, pipeline::JobStage::Extract);
    assert_eq!(result.outputs, vec![h.dest().join("walden.m4b")]);
    assert_eq!(h.workspaces_left(), 0);
}

#[test]
fn test_directory_source_uses_title_and_is_read_in_place() {
    let h = Harness::new(STEREO_MARKER);
    let tracks = h.root.path().join("tracks");
    fs::create_dir(&tracks).unwrap();
    fs::write(tracks.join("01.mp3"), b"one;").unwrap();
    fs::write(tracks.join("02.mp3"), b"two;").unwrap();
    let cover = h.image("front.png", "300x300");

    let mut settings = h.settings(
        vec![tracks.display().to_string()],
        MetadataRequest::Explicit(ExplicitMetadata {
            title: Some("C".to_string()),
            writer: Some("A".to_string()),
            album: Some("B".to_string()),
            year: Some("1900".to_string()),
        }),
    );
    settings.picture = Some(cover.display().to_string());

    let result = pipeline::run_with(&settings, &h.fetcher()).expect("Run should succeed");

    assert_eq!(result.outputs, vec![h.dest().join("C.m4b")]);
    assert!(h.calls_to("unzip").is_empty(), "directories are never extracted");
    assert_eq!(h.calls_to("mp3wrap"), vec!["mp3wrap 3"]);

    let faac = &h.calls_to("faac")[0];
    assert!(faac.contains("--writer A"));
    assert!(faac.contains("--album B"));
    assert!(faac.contains("--title C"));
    assert!(faac.contains("--year 1900"));
    assert!(faac.contains(&format!("--cover-art {}", cover.display())));

    // Source directory untouched
    let mut names: Vec<_> = fs::read_dir(&tracks)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["01.mp3", "02.mp3"]);
}

#[test]
fn test_directory_source_requires_explicit_metadata() {
    let h = Harness::new(STEREO_MARKER);
    let tracks = h.root.path().join("tracks");
    fs::create_dir(&tracks).unwrap();
    fs::write(tracks.join("01.mp3"), b"one").unwrap();

    let settings = h.settings(
        vec![tracks.display().to_string()],
        MetadataRequest::Explicit(ExplicitMetadata {
            title: Some("C".to_string()),
            ..ExplicitMetadata::default()
        }),
    );
    let err = pipeline::run_with(&settings, &h.fetcher()).unwrap_err();
    assert!(matches!(err, BookbinderError::MissingMetadata { .. }), "got: {err}");
    assert!(h.calls().is_empty());
    assert_eq!(h.workspaces_left(), 0);
}

#[test]
fn test_non_square_cover_is_resized_exactly_once() {
    let h = Harness::new(STEREO_MARKER);
    h.archive("flatland.zip", &["01.mp3", "02.mp3"]);
    h.image("poster.jpg", "640x480");

    let mut settings = h.settings(
        vec!["https://example.org/flatland.zip".to_string()],
        MetadataRequest::Infer,
    );
    settings.picture = Some("https://images.example.org/poster.jpg".to_string());

    pipeline::run_with(&settings, &h.fetcher()).expect("Run should succeed");

    assert_eq!(h.calls_to("convert").len(), 1);
    let faac = &h.calls_to("faac")[0];
    assert!(faac.contains("cover.jpg"), "resized cover should be embedded: {}", faac);
}

#[test]
fn test_missing_format_line_is_a_detection_error() {
    let h = Harness::new("Exiting... (End of file)");
    h.archive("flatland.zip", &["01.mp3", "02.mp3"]);
    h.image("default.jpg", "300x300");

    let settings = h.settings(
        vec!["https://example.org/flatland.zip".to_string()],
        MetadataRequest::Infer,
    );
    let err = pipeline::run_with(&settings, &h.fetcher()).unwrap_err();

    assert!(matches!(err, BookbinderError::FormatDetection { .. }), "got: {err}");
    assert!(h.calls_to("faac").is_empty());
    assert_eq!(h.workspaces_left(), 0);
}

#[test]
fn test_missing_collaborator_is_reported_before_any_job() {
    let mut h = Harness::new(STEREO_MARKER);
    h.archive("flatland.zip", &["01.mp3", "02.mp3"]);
    h.tools.faac = h.root.path().join("bin").join("not-faac");

    let settings = h.settings(
        vec!["https://example.org/flatland.zip".to_string()],
        MetadataRequest::Infer,
    );
    let err = pipeline::run_with(&settings, &h.fetcher()).unwrap_err();

    match err {
        BookbinderError::MissingDependency { tools } => {
            assert_eq!(tools.len(), 1);
            assert!(tools[0].ends_with("not-faac"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(h.calls().is_empty());
}

#[test]
fn test_destination_is_created_when_absent() {
    let h = Harness::new(STEREO_MARKER);
    h.archive("flatland.zip", &["01.mp3", "02.mp3"]);
    h.image("default.jpg", "300x300");

    let mut settings = h.settings(
        vec!["https://example.org/flatland.zip".to_string()],
        MetadataRequest::Infer,
    );
    settings.destination = h.dest().join("nested").join("books");

    let result = pipeline::run_with(&settings, &h.fetcher()).expect("Run should succeed");
    assert_eq!(result.outputs, vec![settings.destination.join("flatland.m4b")]);
}

#[test]
fn test_ftp_sources_download_through_curl() {
    let h = Harness::new(STEREO_MARKER);
    h.archive("flatland.zip", &["01.mp3", "02.mp3"]);
    h.image("default.jpg", "300x300");

    let mut settings = h.settings(
        vec!["ftp://ftp.example.org/pub/flatland.zip".to_string()],
        MetadataRequest::Infer,
    );
    settings.default_cover_url = "ftp://ftp.example.org/pub/default.jpg".to_string();

    let result = pipeline::run(&settings).expect("Run should succeed");

    assert_eq!(result.outputs, vec![h.dest().join("flatland.m4b")]);
    assert_eq!(
        h.calls_to("curl"),
        vec![
            "curl ftp://ftp.example.org/pub/default.jpg",
            "curl ftp://ftp.example.org/pub/flatland.zip",
        ]
    );
    assert_eq!(h.calls_to("unzip").len(), 1);
    assert_eq!(h.workspaces_left(), 0);
}

#[test]
fn test_missing_curl_is_reported_for_ftp_sources() {
    let mut h = Harness::new(STEREO_MARKER);
    h.tools.curl = h.root.path().join("bin").join("not-curl");

    let settings = h.settings(
        vec!["ftp://ftp.example.org/pub/flatland.zip".to_string()],
        MetadataRequest::Infer,
    );
    let err = pipeline::run(&settings).unwrap_err();

    match err {
        BookbinderError::MissingDependency { tools } => {
            assert_eq!(tools.len(), 1);
            assert!(tools[0].ends_with("not-curl"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(h.calls().is_empty());
}

/// 1x1 PNG used as cover art for the real encoder
const TINY_PNG: [u8; 68] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x04, 0x00, 0x00, 0x00, 0xb5, 0x1c, 0x0c,
    0x02, 0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64, 0x60, 0x00, 0x00,
    0x00, 0x06, 0x00, 0x02, 0x30, 0x81, 0xd0, 0x2f, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44,
    0xae, 0x42, 0x60, 0x82,
];

#[test]
#[ignore = "needs a real faac on PATH"]
fn test_encoded_tags_round_trip_with_real_faac() {
    use bookbinder::tools::locate;
    use bookbinder::types::{CoverArt, CoverOrigin, DecodedAudio, Metadata, PcmFormat};

    let faac = locate(Path::new("faac")).expect("faac should be installed for this test");

    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("decoded.pcm");
    fs::write(&raw, vec![0u8; 22050 * 2]).unwrap(); // 1s of 16-bit mono silence
    let cover_path = dir.path().join("cover.png");
    fs::write(&cover_path, TINY_PNG).unwrap();
    let output = dir.path().join("book.m4b");

    let metadata = Metadata {
        writer: "A".to_string(),
        title: "C".to_string(),
        album: "B".to_string(),
        year: "1900".to_string(),
    };
    let decoded = DecodedAudio {
        raw_path: raw,
        format: PcmFormat {
            rate: 22050,
            channels: 1,
            bit_depth: 16,
        },
    };
    let cover = CoverArt {
        path: cover_path,
        width: 300,
        height: 300,
        origin: CoverOrigin::UserLocal,
    };
    let tools = Toolchain {
        faac,
        ..Toolchain::default()
    };

    bookbinder::audio::encode(&decoded, &metadata, &cover, &output, &tools).expect("faac should encode");

    let tags = bookbinder::metadata::read_tags(&output).expect("tags should be readable");
    assert_eq!(tags.mismatches(&metadata), Vec::<&str>::new());
    assert_eq!(tags.genre.as_deref(), Some("Spoken Word"));
    assert_eq!(tags.track, Some(1));
}
