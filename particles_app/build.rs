// Build script for Vulkan shader compilation.
//
// Compiles the GLSL sources under resources/shaders to SPIR-V next to
// them when the Vulkan SDK is available; without the SDK the build
// proceeds and any .spv files already present are used at runtime.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=../resources/shaders");
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");

    let vulkan_sdk = match env::var("VULKAN_SDK") {
        Ok(sdk) => sdk,
        Err(_) => {
            eprintln!("warning: VULKAN_SDK not set, shader compilation skipped");
            return;
        }
    };

    let glslc = if cfg!(target_os = "windows") {
        format!("{vulkan_sdk}\\Bin\\glslc.exe")
    } else {
        format!("{vulkan_sdk}/bin/glslc")
    };
    if !Path::new(&glslc).exists() {
        eprintln!("warning: glslc not found at {glslc}, shader compilation skipped");
        return;
    }

    let shader_dir = PathBuf::from("../resources/shaders");
    let sources = match std::fs::read_dir(&shader_dir) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("warning: cannot read {}: {e}", shader_dir.display());
            return;
        }
    };

    for entry in sources.flatten() {
        let path = entry.path();
        let is_glsl = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("vert") | Some("frag")
        );
        if !is_glsl {
            continue;
        }

        let mut output = path.clone().into_os_string();
        output.push(".spv");

        let status = Command::new(&glslc)
            .arg(&path)
            .arg("-o")
            .arg(&output)
            .status();

        match status {
            Ok(status) if status.success() => {}
            Ok(status) => panic!("glslc failed on {}: {status}", path.display()),
            Err(e) => panic!("failed to run glslc: {e}"),
        }
    }
}
