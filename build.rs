//! Build script.
//!
//! Compiles the order-management protobuf/gRPC service and handles coverage
//! instrumentation.
//!
//! Coverage exclusions are handled via:
//! 1. `#[cfg(not(coverage))]` attributes on code
//! 2. `LLVM_PROFILE_FILE` environment variable
//! 3. `cargo-llvm-cov` ignore comments

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set profile file pattern for coverage runs
    // This ensures unique profile files per process/module
    #[cfg(coverage)]
    {
        println!("cargo:rustc-env=LLVM_PROFILE_FILE=coverage-%p-%m.profraw");
    }

    // Rerun build script if it changes
    println!("cargo:rerun-if-changed=build.rs");

    println!("cargo:rerun-if-changed=proto/oms.proto");

    let mut prost_config = prost_build::Config::new();
    if std::env::var_os("PROTOC").is_none() {
        prost_config.protoc_executable(protoc_bin_vendored::protoc_bin_path()?);
    }
    tonic_prost_build::configure().compile_with_config(
        prost_config,
        &["proto/oms.proto"],
        &["proto"],
    )?;

    // Emit cfg for coverage detection
    // Usage: #[cfg(coverage)] or #[cfg(not(coverage))]
    if std::env::var("CARGO_LLVM_COV").is_ok()
        || std::env::var("LLVM_PROFILE_FILE").is_ok()
        || std::env::var("RUSTFLAGS")
            .map(|f| f.contains("instrument-coverage"))
            .unwrap_or(false)
    {
        println!("cargo:rustc-cfg=coverage");
    }

    Ok(())
}
