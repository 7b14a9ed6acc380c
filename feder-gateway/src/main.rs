//! Main entry point for CLI command to start the gateway.

fn main() -> anyhow::Result<()> {
    feder_gateway::main()
}
