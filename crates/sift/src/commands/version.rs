pub fn run() -> anyhow::Result<()> {
    println!("sift {}", env!("CARGO_PKG_VERSION"));
    println!("Context pruning, sub-agents and terminals for OpenCode");
    Ok(())
}
