use engine_core::cli::RunConfig;
use engine_core::driver;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = RunConfig::parse_args();
    let exit_code = driver::run(config);
    std::process::exit(exit_code);
}
