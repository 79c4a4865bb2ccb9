use which::which;

fn main() {
    // bpf-linker is an undeclared input of the eBPF build. Track the resolved
    // binary so a linker upgrade invalidates the cached probe object.
    if let Ok(bpf_linker) = which("bpf-linker") {
        println!("cargo:rerun-if-changed={}", bpf_linker.display());
    }
}
