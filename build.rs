// Hands the target triple Cargo gives build scripts to the crate as
// `env!("TARGET")`. `release::build_target` reads it to pick this binary's
// artifact from the release matrix.

fn main() {
    let target = std::env::var("TARGET")
        .expect("Cargo sets TARGET for build scripts");

    println!("cargo:rustc-env=TARGET={target}");
    println!("cargo:rerun-if-changed=build.rs");
}
