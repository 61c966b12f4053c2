// Build script to capture the build timestamp shown by --version

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build_time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S %Z").to_string();
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_time);

    Ok(())
}
