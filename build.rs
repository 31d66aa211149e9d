// build.rs
use std::env;

fn main() {
    //required for X11 binding connection, only when the desktop backends are compiled in
    let desktop = env::var_os("CARGO_FEATURE_DESKTOP").is_some();
    if desktop && env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("linux") {
        println!("cargo:rustc-link-lib=X11");
        println!("cargo:rustc-link-lib=Xtst");
    }
}
