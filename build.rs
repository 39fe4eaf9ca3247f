use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let protos = [
        "proto/commander.proto",
        "proto/loader.proto",
        "proto/runner.proto",
    ];

    for proto in &protos {
        println!("cargo:rerun-if-changed={}", proto);
    }

    // Descriptor set feeds the reflection service
    tonic_build::configure()
        .file_descriptor_set_path(out_dir.join("runrpc_descriptor.bin"))
        .compile(&protos, &["proto"])?;

    Ok(())
}
