use std::{env, path::PathBuf};

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

fn warn(message: &str) {
    println!("cargo:warning=vidsift: {message}");
}

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // Linux and macOS find FFmpeg through pkg-config; only Windows needs hints.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") || env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        warn("FFMPEG_DIR is not set; install FFmpeg (e.g. with vcpkg) and point FFMPEG_DIR at it");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install = PathBuf::from(vcpkg_root).join("installed").join(triplet);

    if !install.exists() {
        warn(&format!("no vcpkg FFmpeg install found at {}", install.display()));
        return;
    }

    warn(&format!("found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to use it explicitly", install.display()));
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        warn("set VCPKGRS_DYNAMIC=1 when linking a dynamic vcpkg FFmpeg build");
    }
}
