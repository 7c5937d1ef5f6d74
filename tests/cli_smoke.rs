use std::path::PathBuf;

use thumbforge::ThumbnailState;

fn cli_exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_thumbforge")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "thumbforge.exe"
            } else {
                "thumbforge"
            });
            p
        })
}

#[test]
fn cli_render_writes_jpeg() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let state_path = dir.join("state.json");
    let out_path = dir.join("out.jpg");
    let _ = std::fs::remove_file(&out_path);

    // Empty text blocks keep the render font-free.
    let state = ThumbnailState {
        title: String::new(),
        subtitle: String::new(),
        ..ThumbnailState::default()
    };
    let f = std::fs::File::create(&state_path).unwrap();
    serde_json::to_writer_pretty(f, &state).unwrap();

    let state_arg = state_path.to_string_lossy().to_string();
    let out_arg = out_path.to_string_lossy().to_string();

    let status = std::process::Command::new(cli_exe())
        .args(["render", "--in", state_arg.as_str(), "--out"])
        .arg(out_arg.as_str())
        .status()
        .unwrap();

    assert!(status.success());
    let bytes = std::fs::read(&out_path).unwrap();
    assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF], "expected JPEG magic");
}

#[test]
fn cli_presets_lists_builtin_ids() {
    let out = std::process::Command::new(cli_exe())
        .arg("presets")
        .output()
        .unwrap();

    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    for id in ["impacto", "moderno", "elegante", "ousado", "minimalista"] {
        assert!(text.contains(id), "preset list missing '{id}'");
    }
}

#[test]
fn cli_init_writes_parseable_state() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();
    let out_path = dir.join("init.json");
    let _ = std::fs::remove_file(&out_path);

    let status = std::process::Command::new(cli_exe())
        .args(["init", "--out"])
        .arg(out_path.to_string_lossy().to_string())
        .status()
        .unwrap();

    assert!(status.success());
    let bytes = std::fs::read(&out_path).unwrap();
    let state: ThumbnailState = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(state.title, "GERADOR DE THUMBNAILS");
    state.validate().unwrap();
}
