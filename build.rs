use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=FFMPEG_DIR");
    println!("cargo:rerun-if-env-changed=VCPKG_ROOT");
    println!("cargo:rerun-if-env-changed=VCPKGRS_TRIPLET");

    // Only the FFmpeg backend links native libraries.
    if env::var_os("CARGO_FEATURE_FFMPEG").is_none() {
        return;
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "windows" || env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=vidthumb: the `ffmpeg` feature needs FFmpeg. On Windows, install it via vcpkg and set FFMPEG_DIR."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let ffmpeg_dir = PathBuf::from(&vcpkg_root).join("installed").join(&triplet);
    if ffmpeg_dir.exists() {
        println!(
            "cargo:warning=vidthumb: found vcpkg FFmpeg at {}; set FFMPEG_DIR to that path to use it.",
            ffmpeg_dir.display(),
        );
    } else {
        println!(
            "cargo:warning=vidthumb: VCPKG_ROOT is set but no FFmpeg install was found at {}.",
            ffmpeg_dir.display(),
        );
    }
}
