//! Build script for generating protobuf code
//!
//! Generates the recorder service from its protobuf definition when the
//! `proto-gen` feature is enabled and protoc is available. Otherwise the
//! checked-in definitions in `src/proto` are used.

use std::path::PathBuf;
use std::process::Command;

const PROTO_FILE: &str = "../../proto/recorder/v1/recorder.proto";
const PROTO_ROOT: &str = "../../proto";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed={}", PROTO_FILE);

    if std::env::var_os("CARGO_FEATURE_PROTO_GEN").is_none() {
        return Ok(());
    }

    let protoc_available =
        std::env::var("PROTOC").is_ok() || Command::new("protoc").arg("--version").output().is_ok();

    if !protoc_available {
        println!("cargo:warning=protoc not found, skipping proto generation");
        println!("cargo:warning=Install protoc or set PROTOC env var to generate proto code");
        return Ok(());
    }

    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);

    // The daemon serves the API, the CLI consumes it
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .out_dir(&out_dir)
        .compile(&[PROTO_FILE], &[PROTO_ROOT])?;

    Ok(())
}
