use rustc_version::{version_meta, Channel};

// NOTE: This activates the 'nightly' feature described in the Cargo.toml file, so the
//       on_unimplemented diagnostics are available when building on a nightly toolchain
fn main() {
    if version_meta().unwrap().channel == Channel::Nightly {
        println!("cargo:rustc-cfg=feature=\"nightly\"");
    }
}
