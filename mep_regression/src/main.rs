fn main() -> anyhow::Result<()> {
    mep_regression::cli::run()
}
