use clap::Parser;
use easydeploy::cli::{
    auth_context, handle_completions, handle_config_init, load_config_with_overrides, logs,
    metrics, session, Cli, Commands, ConfigCommands, SessionCommands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Logs(args) => logs::run_logs(&cli.global, &args).await,
        Commands::AppLogs(args) => logs::run_app_logs(&cli.global, &args).await,
        Commands::Metrics(args) => metrics::run_metrics(&cli.global, &args).await,
        Commands::Session(cmd) => match load_config_with_overrides(&cli.global) {
            Ok(config) => {
                let auth = auth_context(&config.auth);
                let output = match cmd {
                    SessionCommands::Show(args) => session::handle_session_show(&args, &auth),
                    SessionCommands::SetToken(args) => {
                        session::handle_session_set_token(&args, &auth)
                    }
                    SessionCommands::Clear => session::handle_session_clear(&auth),
                };
                output.map(|out| println!("{}", out))
            }
            Err(e) => Err(e),
        },
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    // Exit explicitly: a pending stdin read would otherwise hold up runtime shutdown
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
