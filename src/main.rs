fn main() -> anyhow::Result<()> {
    objroute::cli::run_cli()
}
