//! Example: Print download URLs without downloading anything
//!
//! Run with: cargo run -p toolchain --example resolve_url -- kubectl v1.30.2

use toolchain::{Client, InstallOptions};

const PLATFORMS: &[(&str, &str)] = &[
    ("linux", "x86_64"),
    ("linux", "aarch64"),
    ("darwin", "arm64"),
    ("mingw64_nt-10.0", "x86_64"),
];

fn main() {
    let mut args = std::env::args().skip(1);
    let name = args.next().unwrap_or_else(|| "kind".to_string());
    let version = args.next().unwrap_or_else(|| "v0.23.0".to_string());

    let client = Client::new();
    let tool = match client.tool(&name) {
        Ok(tool) => tool,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    println!("{} {}", tool.name, version);
    for (os, arch) in PLATFORMS {
        let options = InstallOptions::new().version(&version).os(*os).arch(*arch);
        match client.resolve_artifact(tool, &options) {
            Ok(artifact) => println!("  {os}/{arch}: {}", artifact.url),
            Err(e) => println!("  {os}/{arch}: {e}"),
        }
    }
}
