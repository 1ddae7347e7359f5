fn main() {
    // abigen! reads the ABI at compile time; rebuild the bindings when it changes.
    println!("cargo:rerun-if-changed=abi/rock-paper-scissors-abi.json");
}
